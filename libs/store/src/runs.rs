//! Sync run ledger

use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::store::Store;

/// What started a sync run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    Startup,
    Schedule,
    Manual,
    Api,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Schedule => "schedule",
            SyncTrigger::Manual => "manual",
            SyncTrigger::Api => "api",
        }
    }

    fn from_db(value: &str) -> Self {
        match value {
            "startup" => SyncTrigger::Startup,
            "schedule" => SyncTrigger::Schedule,
            "api" => SyncTrigger::Api,
            _ => SyncTrigger::Manual,
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    /// Row written when the run starts
    Running,
    Success,
    /// Some stages failed, at least one succeeded
    Partial,
    Failed,
}

impl SyncOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOutcome::Running => "running",
            SyncOutcome::Success => "success",
            SyncOutcome::Partial => "partial",
            SyncOutcome::Failed => "failed",
        }
    }

    fn from_db(value: &str) -> Self {
        match value {
            "running" => SyncOutcome::Running,
            "success" => SyncOutcome::Success,
            "partial" => SyncOutcome::Partial,
            _ => SyncOutcome::Failed,
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a run as recorded on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub outcome: SyncOutcome,
    pub records_synced: u64,
    pub events_synced: u64,
    pub errors: Vec<String>,
}

/// One row of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: i64,
    pub trigger: SyncTrigger,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub outcome: SyncOutcome,
    pub records_synced: u64,
    pub events_synced: u64,
    pub errors: Vec<String>,
}

const RUN_COLUMNS: &str =
    "id, trigger, started_at, finished_at, outcome, records_synced, events_synced, errors_json";

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(SyncRun, String)> {
    let trigger: String = row.get(1)?;
    let outcome: String = row.get(4)?;
    let run = SyncRun {
        id: row.get(0)?,
        trigger: SyncTrigger::from_db(&trigger),
        started_at: row.get(2)?,
        finished_at: row.get(3)?,
        outcome: SyncOutcome::from_db(&outcome),
        records_synced: row.get(5)?,
        events_synced: row.get(6)?,
        errors: Vec::new(),
    };
    Ok((run, row.get(7)?))
}

fn decode_errors((mut run, errors_json): (SyncRun, String)) -> Result<SyncRun> {
    run.errors = serde_json::from_str(&errors_json)?;
    Ok(run)
}

impl Store {
    /// Record the start of a run and return its id
    pub fn begin_sync_run(&self, trigger: SyncTrigger, started_at: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sync_runs (trigger, started_at, outcome) VALUES (?1, ?2, ?3)",
                params![trigger.as_str(), started_at, SyncOutcome::Running.as_str()],
            )?;
            let id = conn.last_insert_rowid();
            debug!("Sync run {} started ({})", id, trigger);
            Ok(id)
        })
    }

    pub fn finish_sync_run(&self, id: i64, summary: &RunSummary, finished_at: i64) -> Result<()> {
        let errors_json = serde_json::to_string(&summary.errors)?;
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE sync_runs
                 SET finished_at = ?2, outcome = ?3, records_synced = ?4,
                     events_synced = ?5, errors_json = ?6
                 WHERE id = ?1",
                params![
                    id,
                    finished_at,
                    summary.outcome.as_str(),
                    summary.records_synced,
                    summary.events_synced,
                    errors_json,
                ],
            )?;

            if updated == 0 {
                return Err(StoreError::NotFound {
                    what: "sync run",
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    /// Most recently started run
    pub fn last_sync_run(&self) -> Result<Option<SyncRun>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY id DESC LIMIT 1"),
                    [],
                    run_from_row,
                )
                .optional()?;
            row.map(decode_errors).transpose()
        })
    }

    /// Newest runs first
    pub fn recent_sync_runs(&self, limit: usize) -> Result<Vec<SyncRun>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RUN_COLUMNS} FROM sync_runs ORDER BY id DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map(params![limit as i64], run_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows.into_iter().map(decode_errors).collect()
        })
    }

    /// Finish time of the newest run that stored any data
    pub fn last_successful_sync_at(&self) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            let at: Option<i64> = conn.query_row(
                "SELECT MAX(finished_at) FROM sync_runs WHERE outcome IN ('success', 'partial')",
                [],
                |row| row.get(0),
            )?;
            Ok(at)
        })
    }
}
