//! Thin client over the simulator's HTTP surface (§6.1, §5).
//!
//! Every call retries up to 3 attempts, 1s apart, with a 30s per-attempt
//! timeout — the teacher pulls in no backoff/retry crate elsewhere, so this
//! is a direct loop rather than a dependency.

use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SimClientError;
use crate::models::{aggregate_lane_data, PlanRequest, PlanResponse, RawSnapshot, Snapshot};

const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CYCLE_PERIOD_SECONDS: f64 = 60.0;

pub struct SimClient {
    http: reqwest::Client,
    base_url: String,
}

impl SimClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    async fn get_with_retry(&self, path: &str) -> Result<reqwest::Response, SimClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.get(&url).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!("simulator GET {path} attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.expect("loop always runs at least once").into())
    }

    async fn post_with_retry(&self, path: &str, body: &impl serde::Serialize) -> Result<reqwest::Response, SimClientError> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.http.post(&url).json(body).send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    warn!("simulator POST {path} attempt {attempt}/{MAX_ATTEMPTS} failed: {e}");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }
        Err(last_err.expect("loop always runs at least once").into())
    }

    /// `GET /snapshots/latest`, aggregated from lane level to edge level.
    pub async fn latest_snapshot(&self) -> Result<Snapshot, SimClientError> {
        let resp = self.get_with_retry("/snapshots/latest").await?;
        let raw: RawSnapshot = resp.json().await.map_err(|e| SimClientError::Decode(e.to_string()))?;
        let edges = aggregate_lane_data(&raw);
        let cycle_number = (raw.time / CYCLE_PERIOD_SECONDS) as i64;
        debug!(
            "latest_snapshot: {} edges, {} intersections, cycle {cycle_number}",
            edges.len(),
            raw.current_phase.len()
        );
        Ok(Snapshot {
            cycle_number,
            timestamp: raw.time,
            edges,
            current_phase: raw.current_phase,
            average_travel_time: raw.average_travel_time,
        })
    }

    /// `POST /intersections/{id}/plan`.
    pub async fn apply_plan(&self, intersection_id: &str, phase_id: i64) -> Result<(), SimClientError> {
        let path = format!("/intersections/{intersection_id}/plan");
        let resp = self
            .post_with_retry(&path, &PlanRequest { phase_id })
            .await?;
        let decoded: PlanResponse = resp.json().await.map_err(|e| SimClientError::Decode(e.to_string()))?;
        if !decoded.success {
            return Err(SimClientError::PlanRejected(intersection_id.to_string()));
        }
        Ok(())
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<bool, SimClientError> {
        let resp = self.get_with_retry("/health").await?;
        Ok(resp.status().is_success())
    }

    /// `GET /gettraveltime` — informational, not on the critical path.
    pub async fn get_travel_time(&self) -> Result<serde_json::Value, SimClientError> {
        let resp = self.get_with_retry("/gettraveltime").await?;
        resp.json().await.map_err(|e| SimClientError::Decode(e.to_string()))
    }

    /// `GET /files/paths` — informational, not on the critical path.
    pub async fn get_file_paths(&self) -> Result<serde_json::Value, SimClientError> {
        let resp = self.get_with_retry("/files/paths").await?;
        resp.json().await.map_err(|e| SimClientError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::{get, post}, Json, Router};
    use std::net::SocketAddr;

    async fn spawn_fake_simulator() -> String {
        let app = Router::new()
            .route(
                "/snapshots/latest",
                get(|| async {
                    Json(serde_json::json!({
                        "lane_vehicle_count": {"AB_0": 4, "AB_1": 2},
                        "lane_waiting_vehicle_count": {"AB_0": 2, "AB_1": 0},
                        "current_phase": {"A": 0},
                        "current_time": 120.0,
                    }))
                }),
            )
            .route(
                "/intersections/:id/plan",
                post(|| async { Json(serde_json::json!({"success": true})) }),
            )
            .route("/health", get(|| async { "ok" }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn latest_snapshot_aggregates_lanes_into_edges() {
        let base_url = spawn_fake_simulator().await;
        let client = SimClient::new(base_url);
        let snapshot = client.latest_snapshot().await.unwrap();
        assert_eq!(snapshot.cycle_number, 2);
        let ab = snapshot.edges.get("AB").unwrap();
        assert_eq!(ab.total_vehicles, 6.0);
        assert_eq!(ab.estimated_delay(), 2.0);
    }

    #[tokio::test]
    async fn apply_plan_succeeds_against_fake_simulator() {
        let base_url = spawn_fake_simulator().await;
        let client = SimClient::new(base_url);
        client.apply_plan("A", 1).await.unwrap();
    }

    #[tokio::test]
    async fn health_reports_liveness() {
        let base_url = spawn_fake_simulator().await;
        let client = SimClient::new(base_url);
        assert!(client.health().await.unwrap());
    }

    #[tokio::test]
    async fn get_with_retry_gives_up_after_max_attempts() {
        let unreachable = "http://127.0.0.1:1".to_string();
        let client = SimClient::new(unreachable);
        let result = client.health().await;
        assert!(result.is_err());
    }
}
