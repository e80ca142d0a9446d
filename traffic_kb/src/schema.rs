//! SQLite schema bootstrap (§6.3, §4.2).
//!
//! Eight append-mostly tables, grounded on
//! `original_source/aegislights-controller/db_manager/init_db.py`. Indexed
//! on cycle number, edge id, and intersection id. Bootstrap is idempotent
//! (`CREATE TABLE IF NOT EXISTS`) — there is no migration framework; a
//! genuine schema mismatch at startup is the one database failure that is
//! fatal to the process (§7).

use sqlx::SqlitePool;

const CREATE_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS simulation_snapshots (
        snapshot_id INTEGER PRIMARY KEY AUTOINCREMENT,
        cycle_number INTEGER NOT NULL,
        timestamp REAL NOT NULL,
        edge_id TEXT NOT NULL,
        from_intersection TEXT NOT NULL,
        to_intersection TEXT NOT NULL,
        queue_length REAL,
        delay REAL,
        throughput REAL,
        spillback_flag INTEGER,
        incident_flag INTEGER,
        UNIQUE(cycle_number, edge_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS graph_state (
        edge_id TEXT PRIMARY KEY,
        from_intersection TEXT NOT NULL,
        to_intersection TEXT NOT NULL,
        capacity REAL NOT NULL,
        free_flow_time REAL NOT NULL,
        length REAL DEFAULT 0.0,
        lane_count INTEGER DEFAULT 0,
        current_queue REAL DEFAULT 0.0,
        current_delay REAL DEFAULT 0.0,
        current_flow REAL DEFAULT 0.0,
        spillback_active INTEGER DEFAULT 0,
        incident_active INTEGER DEFAULT 0,
        edge_cost REAL DEFAULT 0.0,
        last_updated_cycle INTEGER DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS signal_configurations (
        config_id INTEGER PRIMARY KEY AUTOINCREMENT,
        intersection_id TEXT NOT NULL,
        cycle_number INTEGER NOT NULL,
        plan_id TEXT,
        phase_id INTEGER,
        offset REAL,
        cycle_length REAL,
        is_incident_mode INTEGER DEFAULT 0,
        rolled_back INTEGER DEFAULT 0
    )"#,
    r#"CREATE TABLE IF NOT EXISTS phase_libraries (
        plan_id TEXT PRIMARY KEY,
        intersection_id TEXT NOT NULL,
        plan_name TEXT NOT NULL,
        tags TEXT NOT NULL,
        cycle_length REAL NOT NULL,
        phase_id INTEGER,
        timing TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS performance_metrics (
        metric_id INTEGER PRIMARY KEY AUTOINCREMENT,
        cycle_number INTEGER NOT NULL,
        timestamp REAL NOT NULL,
        avg_delay REAL,
        avg_queue REAL,
        network_cost REAL,
        total_spillbacks INTEGER,
        avg_trip_time REAL,
        utility_score REAL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS adaptation_decisions (
        decision_id INTEGER PRIMARY KEY AUTOINCREMENT,
        cycle_number INTEGER NOT NULL,
        stage TEXT NOT NULL,
        decision_type TEXT,
        reasoning TEXT,
        context TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS bandit_state (
        state_id INTEGER PRIMARY KEY AUTOINCREMENT,
        intersection_id TEXT NOT NULL,
        plan_id TEXT NOT NULL,
        times_selected INTEGER DEFAULT 0,
        total_reward REAL DEFAULT 0.0,
        avg_reward REAL DEFAULT 0.0,
        confidence REAL DEFAULT 0.0,
        UNIQUE(intersection_id, plan_id)
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cycle_logs (
        log_id INTEGER PRIMARY KEY AUTOINCREMENT,
        cycle INTEGER NOT NULL,
        stage TEXT NOT NULL,
        data TEXT
    )"#,
];

const CREATE_INDICES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_snapshots_cycle ON simulation_snapshots(cycle_number)",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_edge_id ON simulation_snapshots(edge_id)",
    "CREATE INDEX IF NOT EXISTS idx_graph_from_intersection ON graph_state(from_intersection)",
    "CREATE INDEX IF NOT EXISTS idx_graph_to_intersection ON graph_state(to_intersection)",
    "CREATE INDEX IF NOT EXISTS idx_configs_cycle ON signal_configurations(cycle_number)",
    "CREATE INDEX IF NOT EXISTS idx_configs_intersection ON signal_configurations(intersection_id)",
    "CREATE INDEX IF NOT EXISTS idx_metrics_cycle ON performance_metrics(cycle_number)",
    "CREATE INDEX IF NOT EXISTS idx_decisions_cycle ON adaptation_decisions(cycle_number)",
    "CREATE INDEX IF NOT EXISTS idx_cycle_logs_cycle ON cycle_logs(cycle)",
];

/// Create all eight tables and their indices if they do not already exist.
pub async fn initialize(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for ddl in CREATE_TABLES.iter().chain(CREATE_INDICES.iter()) {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}
