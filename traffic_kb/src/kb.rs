//! The Knowledge Base: the only abstraction that touches persistent
//! storage (§4.2).
//!
//! All writes are best-effort: a failed write is logged and the call
//! returns as if it had succeeded with no effect, it never propagates an
//! error that would abort a cycle (§7). Reads return `None`/empty on
//! absence, including on a failed query. Each operation borrows a
//! connection from the pool rather than holding a long-lived transaction
//! (§4.2, §5).

use std::collections::HashMap;

use parking_lot::Mutex;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use traffic_common::config::CostCoefficients;
use tracing::error;

use crate::error::KbError;
use crate::models::{AppliedConfiguration, BanditArm, EdgeRow, LastKnownGood, PerformanceMetrics, PhaseLibraryEntry};
use crate::schema;

pub struct KnowledgeBase {
    pool: SqlitePool,
    lkg_cache: Mutex<HashMap<String, Option<LastKnownGood>>>,
    bandit_cache: Mutex<HashMap<(String, String), Option<BanditArm>>>,
    cost_coefficients: CostCoefficients,
}

impl KnowledgeBase {
    /// Connect and bootstrap schema. The one database failure that is
    /// fatal to the process (§6.5 exit code 1) happens here.
    pub async fn connect(database_url: &str, cost_coefficients: CostCoefficients) -> Result<Self, KbError> {
        Self::connect_with_pool_size(database_url, cost_coefficients, 8).await
    }

    /// Convenience constructor over an in-memory SQLite database, used by
    /// this crate's own tests and by dependent crates' test suites. Capped
    /// at one connection: SQLite's `:memory:` database is private to the
    /// connection that created it, so a larger pool would silently scatter
    /// state across isolated databases.
    pub async fn connect_in_memory(cost_coefficients: CostCoefficients) -> Result<Self, KbError> {
        Self::connect_with_pool_size("sqlite::memory:", cost_coefficients, 1).await
    }

    async fn connect_with_pool_size(
        database_url: &str,
        cost_coefficients: CostCoefficients,
        max_connections: u32,
    ) -> Result<Self, KbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        schema::initialize(&pool).await?;
        Ok(Self {
            pool,
            lkg_cache: Mutex::new(HashMap::new()),
            bandit_cache: Mutex::new(HashMap::new()),
            cost_coefficients,
        })
    }

    /// Point-in-time read of persisted edge dynamic state, optionally
    /// filtered by endpoint.
    pub async fn get_graph_state(&self, from: Option<&str>, to: Option<&str>) -> Vec<EdgeRow> {
        let result = self.get_graph_state_inner(from, to).await;
        match result {
            Ok(rows) => rows,
            Err(e) => {
                error!("get_graph_state failed: {e}");
                Vec::new()
            }
        }
    }

    async fn get_graph_state_inner(&self, from: Option<&str>, to: Option<&str>) -> Result<Vec<EdgeRow>, KbError> {
        let rows = sqlx::query(
            "SELECT edge_id, from_intersection, to_intersection, capacity, free_flow_time, \
             length, lane_count, current_queue, current_delay, current_flow, \
             spillback_active, incident_active, edge_cost, last_updated_cycle \
             FROM graph_state \
             WHERE (?1 IS NULL OR from_intersection = ?1) AND (?2 IS NULL OR to_intersection = ?2)",
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| EdgeRow {
                edge_id: row.get("edge_id"),
                from: row.get("from_intersection"),
                to: row.get("to_intersection"),
                capacity: row.get("capacity"),
                free_flow_time: row.get("free_flow_time"),
                length: row.get("length"),
                lane_count: row.get("lane_count"),
                current_queue: row.get("current_queue"),
                current_delay: row.get("current_delay"),
                current_flow: row.get("current_flow"),
                spillback_active: row.get::<i64, _>("spillback_active") != 0,
                incident_active: row.get::<i64, _>("incident_active") != 0,
                edge_cost: row.get("edge_cost"),
                last_updated_cycle: row.get("last_updated_cycle"),
            })
            .collect())
    }

    /// Write-through update; preserves static fields if the row exists.
    pub async fn upsert_edge(&self, cycle: i64, row: &EdgeRow) {
        if let Err(e) = self.upsert_edge_inner(cycle, row).await {
            error!("upsert_edge failed for {}: {e}", row.edge_id);
        }
    }

    async fn upsert_edge_inner(&self, cycle: i64, row: &EdgeRow) -> Result<(), KbError> {
        sqlx::query(
            "INSERT INTO graph_state (edge_id, from_intersection, to_intersection, capacity, \
             free_flow_time, length, lane_count, current_queue, current_delay, current_flow, \
             spillback_active, incident_active, edge_cost, last_updated_cycle) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14) \
             ON CONFLICT(edge_id) DO UPDATE SET \
             current_queue = excluded.current_queue, \
             current_delay = excluded.current_delay, \
             current_flow = excluded.current_flow, \
             spillback_active = excluded.spillback_active, \
             incident_active = excluded.incident_active, \
             edge_cost = excluded.edge_cost, \
             last_updated_cycle = excluded.last_updated_cycle",
        )
        .bind(&row.edge_id)
        .bind(&row.from)
        .bind(&row.to)
        .bind(row.capacity)
        .bind(row.free_flow_time)
        .bind(row.length)
        .bind(row.lane_count)
        .bind(row.current_queue)
        .bind(row.current_delay)
        .bind(row.current_flow)
        .bind(row.spillback_active as i64)
        .bind(row.incident_active as i64)
        .bind(row.edge_cost)
        .bind(cycle)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append a raw per-cycle per-edge observation (§4.3 step 5).
    pub async fn insert_snapshot(
        &self,
        cycle: i64,
        ts: f64,
        from: &str,
        to: &str,
        edge_id: &str,
        queue: f64,
        delay: f64,
        throughput: f64,
        spillback: bool,
        incident: bool,
    ) {
        let result = sqlx::query(
            "INSERT OR REPLACE INTO simulation_snapshots \
             (cycle_number, timestamp, edge_id, from_intersection, to_intersection, \
              queue_length, delay, throughput, spillback_flag, incident_flag) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(cycle)
        .bind(ts)
        .bind(edge_id)
        .bind(from)
        .bind(to)
        .bind(queue)
        .bind(delay)
        .bind(throughput)
        .bind(spillback as i64)
        .bind(incident as i64)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            error!("insert_snapshot failed for {edge_id} at cycle {cycle}: {e}");
        }
    }

    /// Cache-aside read of the last-known-good plan for an intersection.
    pub async fn get_last_known_good(&self, intersection: &str) -> Option<LastKnownGood> {
        if let Some(cached) = self.lkg_cache.lock().get(intersection).cloned() {
            return cached;
        }
        let fetched = self.get_last_known_good_inner(intersection).await.unwrap_or_else(|e| {
            error!("get_last_known_good failed for {intersection}: {e}");
            None
        });
        self.lkg_cache
            .lock()
            .insert(intersection.to_string(), fetched.clone());
        fetched
    }

    async fn get_last_known_good_inner(&self, intersection: &str) -> Result<Option<LastKnownGood>, KbError> {
        let row = sqlx::query(
            "SELECT cycle_number, intersection_id, plan_id, phase_id, offset, cycle_length \
             FROM signal_configurations \
             WHERE intersection_id = ?1 AND rolled_back = 0 \
             ORDER BY cycle_number DESC LIMIT 1",
        )
        .bind(intersection)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| LastKnownGood {
            cycle: r.get("cycle_number"),
            intersection_id: r.get("intersection_id"),
            plan_id: r.get::<Option<String>, _>("plan_id").unwrap_or_default(),
            phase_id: r.get::<Option<i64>, _>("phase_id").unwrap_or_default(),
            offset: r.get::<Option<f64>, _>("offset").unwrap_or_default(),
            cycle_length: r.get::<Option<f64>, _>("cycle_length").unwrap_or_default(),
        }))
    }

    /// Persist every applied adaptation for `cycle` and invalidate the
    /// LKG cache entries it touches (§4.2, §4.6).
    pub async fn update_last_known_good(&self, cycle: i64, adaptations: &[AppliedConfiguration]) {
        for adaptation in adaptations {
            let result = sqlx::query(
                "INSERT INTO signal_configurations \
                 (intersection_id, cycle_number, plan_id, phase_id, offset, cycle_length, \
                  is_incident_mode, rolled_back) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&adaptation.intersection_id)
            .bind(cycle)
            .bind(&adaptation.plan_id)
            .bind(adaptation.phase_id)
            .bind(adaptation.offset)
            .bind(adaptation.cycle_length)
            .bind(adaptation.is_incident_mode as i64)
            .bind(adaptation.rolled_back as i64)
            .execute(&self.pool)
            .await;
            if let Err(e) = result {
                error!(
                    "update_last_known_good failed for {} at cycle {cycle}: {e}",
                    adaptation.intersection_id
                );
            }
            self.lkg_cache.lock().remove(&adaptation.intersection_id);
        }
    }

    /// Read bandit arm statistics, creating nothing (§3: "created lazily
    /// when an unseen arm is first referenced" — `None` signals "unseen"
    /// to the caller, which is where creation happens).
    pub async fn get_bandit_stats(&self, intersection: &str, plan: &str) -> Option<BanditArm> {
        let key = (intersection.to_string(), plan.to_string());
        if let Some(cached) = self.bandit_cache.lock().get(&key).cloned() {
            return cached;
        }
        let fetched = self
            .get_bandit_stats_inner(intersection, plan)
            .await
            .unwrap_or_else(|e| {
                error!("get_bandit_stats failed for {intersection}/{plan}: {e}");
                None
            });
        self.bandit_cache.lock().insert(key, fetched);
        fetched
    }

    async fn get_bandit_stats_inner(&self, intersection: &str, plan: &str) -> Result<Option<BanditArm>, KbError> {
        let row = sqlx::query(
            "SELECT times_selected, total_reward, avg_reward, confidence FROM bandit_state \
             WHERE intersection_id = ?1 AND plan_id = ?2",
        )
        .bind(intersection)
        .bind(plan)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BanditArm {
            times_selected: r.get::<i64, _>("times_selected") as u64,
            total_reward: r.get("total_reward"),
            avg_reward: r.get("avg_reward"),
            confidence: r.get("confidence"),
        }))
    }

    /// Upsert bandit arm statistics; counters must be monotone
    /// non-decreasing (§3 invariant — enforced by the caller, which only
    /// ever passes forward-accumulated values).
    pub async fn update_bandit_stats(&self, intersection: &str, plan: &str, arm: BanditArm) {
        let result = sqlx::query(
            "INSERT INTO bandit_state (intersection_id, plan_id, times_selected, total_reward, \
             avg_reward, confidence) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
             ON CONFLICT(intersection_id, plan_id) DO UPDATE SET \
             times_selected = excluded.times_selected, \
             total_reward = excluded.total_reward, \
             avg_reward = excluded.avg_reward, \
             confidence = excluded.confidence",
        )
        .bind(intersection)
        .bind(plan)
        .bind(arm.times_selected as i64)
        .bind(arm.total_reward)
        .bind(arm.avg_reward)
        .bind(arm.confidence)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            error!("update_bandit_stats failed for {intersection}/{plan}: {e}");
        }
        self.bandit_cache
            .lock()
            .insert((intersection.to_string(), plan.to_string()), Some(arm));
    }

    /// Structured per-stage decision log (§4.2, §10 supplement).
    pub async fn log_decision(
        &self,
        cycle: i64,
        stage: &str,
        decision_type: &str,
        reasoning: &serde_json::Value,
        context: &serde_json::Value,
    ) {
        let result = sqlx::query(
            "INSERT INTO adaptation_decisions (cycle_number, stage, decision_type, reasoning, context) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(cycle)
        .bind(stage)
        .bind(decision_type)
        .bind(reasoning.to_string())
        .bind(context.to_string())
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            error!("log_decision failed for stage {stage} at cycle {cycle}: {e}");
        }
    }

    /// Free-form per-cycle event (rollback, overrun, ...).
    pub async fn log_cycle_event(&self, cycle: i64, stage: &str, data: &serde_json::Value) {
        let result = sqlx::query("INSERT INTO cycle_logs (cycle, stage, data) VALUES (?1, ?2, ?3)")
            .bind(cycle)
            .bind(stage)
            .bind(data.to_string())
            .execute(&self.pool)
            .await;
        if let Err(e) = result {
            error!("log_cycle_event failed for stage {stage} at cycle {cycle}: {e}");
        }
    }

    pub async fn insert_performance_metrics(&self, cycle: i64, ts: f64, metrics: &PerformanceMetrics) {
        let result = sqlx::query(
            "INSERT INTO performance_metrics \
             (cycle_number, timestamp, avg_delay, avg_queue, network_cost, total_spillbacks, \
              avg_trip_time, utility_score) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(cycle)
        .bind(ts)
        .bind(metrics.avg_delay)
        .bind(metrics.avg_queue)
        .bind(metrics.network_cost)
        .bind(metrics.total_spillbacks)
        .bind(metrics.avg_trip_time)
        .bind(metrics.utility_score)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            error!("insert_performance_metrics failed at cycle {cycle}: {e}");
        }
    }

    /// Cost coefficients `(a, b, c, d)`. Currently sourced from the static
    /// configuration loaded at startup (§6.4); kept as a KB method so the
    /// Analyzer never reaches into configuration directly (§4.2 contract).
    pub fn get_cost_coefficients(&self) -> (f64, f64, f64, f64) {
        let c = &self.cost_coefficients;
        (c.a, c.b, c.c, c.d)
    }

    /// Load every pre-validated plan for an intersection.
    pub async fn get_phase_library(&self, intersection: &str) -> Vec<PhaseLibraryEntry> {
        match self.get_phase_library_inner(intersection).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("get_phase_library failed for {intersection}: {e}");
                Vec::new()
            }
        }
    }

    async fn get_phase_library_inner(&self, intersection: &str) -> Result<Vec<PhaseLibraryEntry>, KbError> {
        let rows = sqlx::query(
            "SELECT plan_id, intersection_id, plan_name, tags, cycle_length, phase_id, timing \
             FROM phase_libraries WHERE intersection_id = ?1",
        )
        .bind(intersection)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let tags_str: String = r.get("tags");
                let timing_str: String = r.get("timing");
                Ok(PhaseLibraryEntry {
                    plan_id: r.get("plan_id"),
                    intersection_id: r.get("intersection_id"),
                    plan_name: r.get("plan_name"),
                    tags: serde_json::from_str(&tags_str)?,
                    cycle_length: r.get("cycle_length"),
                    phase_id: r.get::<Option<i64>, _>("phase_id"),
                    timing: serde_json::from_str(&timing_str)?,
                })
            })
            .collect()
    }

    /// Seed one phase-library entry. Plans are immutable after load (§3);
    /// this is used only at startup, never mid-cycle.
    pub async fn seed_phase_library_entry(&self, entry: &PhaseLibraryEntry) -> Result<(), KbError> {
        sqlx::query(
            "INSERT OR REPLACE INTO phase_libraries \
             (plan_id, intersection_id, plan_name, tags, cycle_length, phase_id, timing) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&entry.plan_id)
        .bind(&entry.intersection_id)
        .bind(&entry.plan_name)
        .bind(serde_json::to_string(&entry.tags)?)
        .bind(entry.cycle_length)
        .bind(entry.phase_id)
        .bind(entry.timing.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coeffs() -> CostCoefficients {
        CostCoefficients::default()
    }

    #[tokio::test]
    async fn upsert_edge_then_get_graph_state_round_trips() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        let row = EdgeRow {
            edge_id: "AB".into(),
            from: "A".into(),
            to: "B".into(),
            capacity: 1800.0,
            free_flow_time: 20.0,
            length: 400.0,
            lane_count: 2,
            current_queue: 5.0,
            current_delay: 1.0,
            current_flow: 2.0,
            spillback_active: false,
            incident_active: false,
            edge_cost: 3.5,
            last_updated_cycle: 1,
        };
        kb.upsert_edge(1, &row).await;
        let fetched = kb.get_graph_state(Some("A"), Some("B")).await;
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0], row);
    }

    #[tokio::test]
    async fn upsert_edge_preserves_static_fields_on_second_write() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        let mut row = EdgeRow {
            edge_id: "AB".into(),
            from: "A".into(),
            to: "B".into(),
            capacity: 1800.0,
            free_flow_time: 20.0,
            length: 400.0,
            lane_count: 2,
            current_queue: 5.0,
            current_delay: 1.0,
            current_flow: 2.0,
            spillback_active: false,
            incident_active: false,
            edge_cost: 3.5,
            last_updated_cycle: 1,
        };
        kb.upsert_edge(1, &row).await;
        row.current_queue = 80.0;
        row.capacity = 999.0; // changed locally, but ON CONFLICT does not update static fields
        kb.upsert_edge(2, &row).await;

        let fetched = kb.get_graph_state(Some("A"), Some("B")).await;
        assert_eq!(fetched[0].current_queue, 80.0);
        assert_eq!(fetched[0].capacity, 1800.0);
    }

    #[tokio::test]
    async fn unseen_bandit_arm_is_none() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        assert!(kb.get_bandit_stats("A", "plan_default").await.is_none());
    }

    #[tokio::test]
    async fn bandit_stats_round_trip_through_cache() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        let arm = BanditArm {
            times_selected: 3,
            total_reward: -30.0,
            avg_reward: -10.0,
            confidence: 1.0 / 3f64.sqrt(),
        };
        kb.update_bandit_stats("A", "plan_default", arm).await;
        let fetched = kb.get_bandit_stats("A", "plan_default").await.unwrap();
        assert_eq!(fetched.times_selected, 3);
        assert_eq!(fetched.avg_reward, -10.0);
    }

    #[tokio::test]
    async fn last_known_good_reflects_latest_non_rolled_back_row() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        assert!(kb.get_last_known_good("A").await.is_none());

        kb.update_last_known_good(
            1,
            &[AppliedConfiguration {
                intersection_id: "A".into(),
                plan_id: "plan_default".into(),
                phase_id: 0,
                offset: 0.0,
                cycle_length: 60.0,
                is_incident_mode: false,
                rolled_back: false,
            }],
        )
        .await;
        let lkg = kb.get_last_known_good("A").await.unwrap();
        assert_eq!(lkg.cycle, 1);
        assert_eq!(lkg.plan_id, "plan_default");

        // A rolled-back row must not become the new LKG.
        kb.update_last_known_good(
            2,
            &[AppliedConfiguration {
                intersection_id: "A".into(),
                plan_id: "plan_ns_priority".into(),
                phase_id: 0,
                offset: 0.0,
                cycle_length: 60.0,
                is_incident_mode: false,
                rolled_back: true,
            }],
        )
        .await;
        let lkg = kb.get_last_known_good("A").await.unwrap();
        assert_eq!(lkg.cycle, 1);
        assert_eq!(lkg.plan_id, "plan_default");
    }

    #[tokio::test]
    async fn cost_coefficients_match_configured_defaults() {
        let kb = KnowledgeBase::connect_in_memory(coeffs()).await.unwrap();
        assert_eq!(kb.get_cost_coefficients(), (1.0, 0.5, 10.0, 20.0));
    }
}
