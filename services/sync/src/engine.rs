//! One synchronization pass and the guard that keeps passes from overlapping

use parking_lot::Mutex;
use pendo_adapter::{parse_items, PendoClient};
use pulse_config::SyncSettings;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::{RunSummary, Store, SyncOutcome, SyncTrigger};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use types::{
    day_bucket_ms, now_ms, CatalogEntity, EntityKind, Guide, TimeWindow, UsageTarget, MS_PER_DAY,
};

use crate::error::{Result, SyncError};

/// Outcome of one stage of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: String,
    /// Rows written (or removed, for pruning)
    pub records: u64,
    /// Items the API returned that could not be decoded
    pub skipped: u64,
    pub error: Option<String>,
    /// Stage read from the Pendo API; only these count towards a success
    #[serde(default)]
    pub remote: bool,
}

impl StageReport {
    fn from_result(stage: impl Into<String>, result: Result<(u64, u64)>) -> Self {
        let stage = stage.into();
        match result {
            Ok((records, skipped)) => {
                info!(stage = %stage, records, skipped, "Stage complete");
                Self {
                    stage,
                    records,
                    skipped,
                    error: None,
                    remote: true,
                }
            }
            Err(e) => {
                error!(stage = %stage, "Stage failed: {}", e);
                Self {
                    stage,
                    records: 0,
                    skipped: 0,
                    error: Some(e.to_string()),
                    remote: true,
                }
            }
        }
    }

    /// Mark a stage that made no API request
    fn local(mut self) -> Self {
        self.remote = false;
        self
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything one run did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub run_id: i64,
    pub trigger: SyncTrigger,
    pub started_at: i64,
    pub finished_at: i64,
    pub outcome: SyncOutcome,
    pub stages: Vec<StageReport>,
    pub records_synced: u64,
    pub events_synced: u64,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn new(run_id: i64, trigger: SyncTrigger, started_at: i64) -> Self {
        Self {
            run_id,
            trigger,
            started_at,
            finished_at: started_at,
            outcome: SyncOutcome::Running,
            stages: Vec::new(),
            records_synced: 0,
            events_synced: 0,
            errors: Vec::new(),
        }
    }

    fn record_catalog(&mut self, stage: StageReport) {
        self.records_synced += stage.records;
        self.push(stage);
    }

    fn record_events(&mut self, stage: StageReport) {
        self.events_synced += stage.records;
        self.push(stage);
    }

    fn push(&mut self, stage: StageReport) {
        if let Some(error) = &stage.error {
            self.errors.push(format!("{}: {}", stage.stage, error));
        }
        self.stages.push(stage);
    }

    /// A run with failures is partial only if some API stage succeeded
    fn finish(&mut self, finished_at: i64) {
        let failed = self.stages.iter().filter(|s| !s.succeeded()).count();
        let fetched = self
            .stages
            .iter()
            .filter(|s| s.remote && s.succeeded())
            .count();

        self.finished_at = finished_at;
        self.outcome = match (fetched, failed) {
            (_, 0) => SyncOutcome::Success,
            (0, _) => SyncOutcome::Failed,
            _ => SyncOutcome::Partial,
        };
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            outcome: self.outcome,
            records_synced: self.records_synced,
            events_synced: self.events_synced,
            errors: self.errors.clone(),
        }
    }
}

/// Snapshot for status endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub running: bool,
    pub last_report: Option<SyncReport>,
}

#[derive(Default)]
struct SyncState {
    running: AtomicBool,
    last_report: Mutex<Option<SyncReport>>,
}

/// Held for the duration of a run; releases the engine on drop
pub(crate) struct RunGuard {
    state: Arc<SyncState>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.state.running.store(false, Ordering::Release);
    }
}

/// Fetch-and-upsert pass over the configured entities and events
///
/// Clones share the overlap guard and the last report.
#[derive(Clone)]
pub struct SyncEngine {
    client: PendoClient,
    store: Store,
    settings: SyncSettings,
    state: Arc<SyncState>,
}

impl SyncEngine {
    pub fn new(client: PendoClient, store: Store, settings: SyncSettings) -> Self {
        Self {
            client,
            store,
            settings,
            state: Arc::new(SyncState::default()),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn status(&self) -> SyncStatus {
        SyncStatus {
            running: self.is_running(),
            last_report: self.state.last_report.lock().clone(),
        }
    }

    pub(crate) fn try_begin(&self) -> Option<RunGuard> {
        self.state
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard {
                state: Arc::clone(&self.state),
            })
    }

    /// Run a store call on the blocking pool
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> store::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        Ok(tokio::task::spawn_blocking(move || f(&store)).await??)
    }

    /// Run one pass now, or fail with `AlreadyRunning`
    pub async fn run_once(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let guard = self.try_begin().ok_or(SyncError::AlreadyRunning)?;
        self.run_guarded(guard, trigger).await
    }

    /// Start a pass in the background
    ///
    /// The guard is taken before returning, so a second call made right after
    /// this one fails with `AlreadyRunning`.
    pub fn spawn(&self, trigger: SyncTrigger) -> Result<JoinHandle<Result<SyncReport>>> {
        let guard = self.try_begin().ok_or(SyncError::AlreadyRunning)?;
        let engine = self.clone();
        Ok(tokio::spawn(async move {
            engine.run_guarded(guard, trigger).await
        }))
    }

    #[instrument(skip(self, _guard))]
    async fn run_guarded(&self, _guard: RunGuard, trigger: SyncTrigger) -> Result<SyncReport> {
        let started_at = now_ms();
        let run_id = self
            .with_store(move |store| store.begin_sync_run(trigger, started_at))
            .await?;
        info!("Sync run {} started ({})", run_id, trigger);

        let mut report = SyncReport::new(run_id, trigger, started_at);

        for kind in &self.settings.entities {
            let stage = self.sync_entities(*kind).await;
            report.record_catalog(stage);
        }

        if self.settings.sync_events {
            let window = TimeWindow::last_days(now_ms(), self.settings.lookback_days);
            report.record_events(self.sync_guide_events(window).await);
            for target in [UsageTarget::Feature, UsageTarget::Page] {
                report.record_events(self.sync_usage(target, window).await);
            }
        }

        if self.settings.retention_days > 0 {
            report.push(self.prune().await);
        }

        report.finish(now_ms());

        let summary = report.summary();
        let finished_at = report.finished_at;
        if let Err(e) = self
            .with_store(move |store| store.finish_sync_run(run_id, &summary, finished_at))
            .await
        {
            warn!("Failed to record completion of sync run {}: {}", run_id, e);
        }

        info!(
            "Sync run {} finished: {} ({} records, {} events, {} errors)",
            run_id,
            report.outcome,
            report.records_synced,
            report.events_synced,
            report.errors.len()
        );

        *self.state.last_report.lock() = Some(report.clone());
        Ok(report)
    }

    async fn sync_entities(&self, kind: EntityKind) -> StageReport {
        let result = async {
            let raw = self.client.list(kind).await?;
            let synced_at = now_ms();

            let (written, skipped) = match kind {
                EntityKind::Guide => {
                    let parsed = parse_items::<Guide>(raw, "guide");
                    let items = parsed.items;
                    let written = self
                        .with_store(move |store| store.upsert_guides(&items, synced_at))
                        .await?;
                    (written, parsed.skipped)
                }
                _ => {
                    let parsed = parse_items::<CatalogEntity>(raw, kind.label());
                    let items = parsed.items;
                    let written = self
                        .with_store(move |store| store.upsert_catalog(kind, &items, synced_at))
                        .await?;
                    (written, parsed.skipped)
                }
            };

            Ok::<_, SyncError>((written as u64, skipped as u64))
        }
        .await;

        StageReport::from_result(kind.label(), result)
    }

    async fn sync_guide_events(&self, window: TimeWindow) -> StageReport {
        let guides = match self.with_store(|store| store.list_guides()).await {
            Ok(guides) => guides,
            Err(e) => return StageReport::from_result("guide events", Err(e)).local(),
        };

        let selected: Vec<&Guide> = guides
            .iter()
            .filter(|g| !self.settings.active_guides_only || g.state.is_active())
            .collect();

        if selected.is_empty() {
            info!("No guides selected for event sync");
            return StageReport::from_result("guide events", Ok((0, 0))).local();
        }

        let mut inserted = 0u64;
        let mut skipped = 0u64;
        let mut failures = Vec::new();

        for guide in selected {
            let result = async {
                let events = self.client.guide_events(&guide.id, window).await?;
                skipped += events.skipped as u64;
                let items = events.items;
                inserted += self
                    .with_store(move |store| store.insert_guide_events(&items))
                    .await? as u64;
                Ok::<_, SyncError>(())
            }
            .await;

            if let Err(e) = result {
                warn!("Guide events for {} failed: {}", guide.id, e);
                failures.push(format!("{}: {}", guide.id, e));
            }
        }

        if failures.is_empty() {
            return StageReport::from_result("guide events", Ok((inserted, skipped)));
        }

        // Events from guides that did succeed are kept and counted
        let message = failures.join("; ");
        error!(stage = "guide events", "Stage failed: {}", message);
        StageReport {
            stage: "guide events".to_string(),
            records: inserted,
            skipped,
            error: Some(message),
            remote: true,
        }
    }

    async fn sync_usage(&self, target: UsageTarget, window: TimeWindow) -> StageReport {
        let result = async {
            let parsed = match target {
                UsageTarget::Feature => self.client.feature_events(window).await?,
                UsageTarget::Page => self.client.page_events(window).await?,
            };
            let items = parsed.items;
            let written = self
                .with_store(move |store| store.upsert_usage_events(&items))
                .await?;
            Ok::<_, SyncError>((written as u64, parsed.skipped as u64))
        }
        .await;

        StageReport::from_result(format!("{} usage", target), result)
    }

    async fn prune(&self) -> StageReport {
        let cutoff = day_bucket_ms(now_ms()) - self.settings.retention_days as i64 * MS_PER_DAY;
        let result = self
            .with_store(move |store| store.prune_events(cutoff))
            .await
            .map(|removed| (removed as u64, 0));
        StageReport::from_result("prune", result).local()
    }
}
