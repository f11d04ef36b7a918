//! Table definitions and migrations

use rusqlite::Connection;
use tracing::info;

/// Bumped whenever `MIGRATIONS` grows
const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS guides (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    state            TEXT NOT NULL,
    launch_method    TEXT,
    app_id           INTEGER,
    steps_json       TEXT NOT NULL,
    created_at       INTEGER,
    last_updated_at  INTEGER,
    raw_json         TEXT NOT NULL,
    synced_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS features (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    kind             TEXT,
    app_id           INTEGER,
    created_at       INTEGER,
    last_updated_at  INTEGER,
    raw_json         TEXT NOT NULL,
    synced_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS pages (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    kind             TEXT,
    app_id           INTEGER,
    created_at       INTEGER,
    last_updated_at  INTEGER,
    raw_json         TEXT NOT NULL,
    synced_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS reports (
    id               TEXT PRIMARY KEY,
    name             TEXT NOT NULL,
    kind             TEXT,
    app_id           INTEGER,
    created_at       INTEGER,
    last_updated_at  INTEGER,
    raw_json         TEXT NOT NULL,
    synced_at        INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS guide_events (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    guide_id         TEXT NOT NULL,
    step_id          TEXT NOT NULL DEFAULT '',
    visitor_id       TEXT NOT NULL,
    account_id       TEXT,
    kind             TEXT NOT NULL,
    browser_time     INTEGER NOT NULL,
    country          TEXT,
    region           TEXT,
    user_agent       TEXT,
    UNIQUE (guide_id, step_id, visitor_id, kind, browser_time)
);

CREATE INDEX IF NOT EXISTS idx_guide_events_guide_time
    ON guide_events (guide_id, browser_time);

CREATE TABLE IF NOT EXISTS usage_events (
    target_kind      TEXT NOT NULL,
    target_id        TEXT NOT NULL,
    visitor_id       TEXT NOT NULL,
    day              INTEGER NOT NULL,
    account_id       TEXT,
    num_events       INTEGER NOT NULL DEFAULT 0,
    num_minutes      INTEGER NOT NULL DEFAULT 0,
    rage_clicks      INTEGER NOT NULL DEFAULT 0,
    dead_clicks      INTEGER NOT NULL DEFAULT 0,
    error_clicks     INTEGER NOT NULL DEFAULT 0,
    u_turns          INTEGER NOT NULL DEFAULT 0,
    country          TEXT,
    user_agent       TEXT,
    PRIMARY KEY (target_kind, target_id, visitor_id, day)
);

CREATE INDEX IF NOT EXISTS idx_usage_events_day
    ON usage_events (day);

CREATE TABLE IF NOT EXISTS sync_runs (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    trigger          TEXT NOT NULL,
    started_at       INTEGER NOT NULL,
    finished_at      INTEGER,
    outcome          TEXT NOT NULL,
    records_synced   INTEGER NOT NULL DEFAULT 0,
    events_synced    INTEGER NOT NULL DEFAULT 0,
    errors_json      TEXT NOT NULL DEFAULT '[]'
);
"#;

/// Create missing tables; safe to run on every open
pub(crate) fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    conn.execute_batch(MIGRATIONS)?;

    if current < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Database schema migrated from v{} to v{}", current, SCHEMA_VERSION);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 7);
    }
}
