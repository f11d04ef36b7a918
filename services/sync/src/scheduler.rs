//! Cron-driven sync loop

use chrono::{DateTime, Utc};
use cron::Schedule;
use pulse_config::SyncSettings;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::engine::SyncEngine;
use crate::error::{Result, SyncError};
use store::SyncTrigger;

pub struct Scheduler {
    expression: String,
    schedule: Schedule,
    run_on_start: bool,
}

impl Scheduler {
    /// Parse a cron expression
    ///
    /// Five fields (`min hour dom month dow`) run at second zero; six or seven
    /// fields include seconds and an optional year.
    pub fn new(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let normalized = match trimmed.split_whitespace().count() {
            5 => format!("0 {}", trimmed),
            6 | 7 => trimmed.to_string(),
            n => {
                return Err(SyncError::Schedule {
                    expression: expression.to_string(),
                    message: format!("expected 5, 6 or 7 fields, found {}", n),
                })
            }
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| SyncError::Schedule {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            expression: trimmed.to_string(),
            schedule,
            run_on_start: false,
        })
    }

    pub fn from_settings(settings: &SyncSettings) -> Result<Self> {
        Ok(Self::new(&settings.schedule)?.run_on_start(settings.run_on_start))
    }

    pub fn run_on_start(mut self, enabled: bool) -> Self {
        self.run_on_start = enabled;
        self
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Sync on every fire time until `shutdown` flips to true or its sender drops
    pub async fn run(&self, engine: SyncEngine, mut shutdown: watch::Receiver<bool>) {
        info!("Sync scheduler started with '{}'", self.expression);

        if self.run_on_start {
            tick(&engine, SyncTrigger::Startup).await;
        }

        loop {
            if *shutdown.borrow() {
                break;
            }

            let now = Utc::now();
            let Some(next) = self.next_after(now) else {
                warn!("Schedule '{}' has no future fire times", self.expression);
                break;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!("Next sync at {}", next);

            tokio::select! {
                _ = sleep(wait) => tick(&engine, SyncTrigger::Schedule).await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("Sync scheduler stopped");
    }
}

async fn tick(engine: &SyncEngine, trigger: SyncTrigger) {
    match engine.run_once(trigger).await {
        Ok(report) => info!(
            "Scheduled sync {} finished: {}",
            report.run_id, report.outcome
        ),
        Err(SyncError::AlreadyRunning) => {
            warn!("Skipping {} sync: previous run still in progress", trigger)
        }
        Err(e) => error!("Sync run could not start: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_five_field_expression() {
        let scheduler = Scheduler::new("0 */6 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 1, 30, 0).unwrap();
        assert_eq!(
            scheduler.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_next_after_is_strict() {
        let scheduler = Scheduler::new("0 0 * * *").unwrap();
        let midnight = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            scheduler.next_after(midnight),
            Some(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_six_field_expression_with_seconds() {
        let scheduler = Scheduler::new("30 * * * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(
            scheduler.next_after(from),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 30).unwrap())
        );
    }

    #[test]
    fn test_invalid_expressions() {
        assert!(matches!(
            Scheduler::new("every day"),
            Err(SyncError::Schedule { .. })
        ));
        assert!(matches!(
            Scheduler::new("99 * * * *"),
            Err(SyncError::Schedule { .. })
        ));
        assert!(Scheduler::new("").is_err());
    }

    fn idle_engine() -> SyncEngine {
        let client = pendo_adapter::PendoClient::new(pendo_adapter::PendoAdapterConfig {
            api_key: "test-key".to_string(),
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .unwrap();
        let settings = SyncSettings {
            entities: Vec::new(),
            sync_events: false,
            retention_days: 0,
            ..Default::default()
        };
        SyncEngine::new(client, store::Store::in_memory().unwrap(), settings)
    }

    #[tokio::test]
    async fn test_tick_skips_while_run_in_progress() {
        let engine = idle_engine();

        let guard = engine.try_begin().unwrap();
        tick(&engine, SyncTrigger::Schedule).await;
        assert!(engine.store().recent_sync_runs(10).unwrap().is_empty());
        assert!(engine.status().last_report.is_none());

        drop(guard);
        tick(&engine, SyncTrigger::Schedule).await;
        let runs = engine.store().recent_sync_runs(10).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].trigger, SyncTrigger::Schedule);
    }

    #[test]
    fn test_from_settings() {
        let settings = SyncSettings::default();
        let scheduler = Scheduler::from_settings(&settings).unwrap();
        assert_eq!(scheduler.expression(), "0 */6 * * *");
        assert!(scheduler.run_on_start);
    }
}
