//! Request handlers

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use sync_service::{SyncEngine, SyncError, SyncTrigger};
use tracing::{info, warn};
use types::{now_ms, TimeWindow, UsageTarget};
use warp::http::StatusCode;
use warp::{Rejection, Reply};

use crate::error::DashboardError;

/// Default and maximum report windows, in days
pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 365;

const DEFAULT_RUN_LIMIT: usize = 20;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub days: Option<u32>,
}

impl WindowQuery {
    fn window(&self) -> TimeWindow {
        let days = self
            .days
            .unwrap_or(DEFAULT_WINDOW_DAYS)
            .clamp(1, MAX_WINDOW_DAYS);
        TimeWindow::last_days(now_ms(), days)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    status: u16,
}

/// Run store work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, Rejection>
where
    F: FnOnce() -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            warp::reject::custom(DashboardError::Internal {
                message: e.to_string(),
            })
        })?
        .map_err(warp::reject::custom)
}

pub async fn status(engine: SyncEngine) -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&json!({
        "status": "running",
        "service": "pulse-dashboard",
        "version": env!("CARGO_PKG_VERSION"),
        "sync": engine.status(),
    })))
}

pub async fn overview(engine: SyncEngine) -> Result<impl Reply, Rejection> {
    let store = engine.store().clone();
    let overview = blocking(move || Ok(store.data_overview()?)).await?;
    Ok(warp::reply::json(&overview))
}

pub async fn list_guides(engine: SyncEngine) -> Result<impl Reply, Rejection> {
    let store = engine.store().clone();
    let guides = blocking(move || Ok(store.list_guides()?)).await?;
    Ok(warp::reply::json(&guides))
}

pub async fn guide_metrics(
    guide_id: String,
    query: WindowQuery,
    engine: SyncEngine,
) -> Result<impl Reply, Rejection> {
    let store = engine.store().clone();
    let window = query.window();

    let report = blocking(move || {
        let guide = store
            .get_guide(&guide_id)?
            .ok_or_else(|| DashboardError::NotFound {
                what: "guide",
                id: guide_id.clone(),
            })?;
        let events = store.guide_events(&guide_id, window.first_day)?;
        Ok(analytics::guide_report(&guide, &events, window))
    })
    .await?;

    Ok(warp::reply::json(&report))
}

pub async fn frustration(
    target_id: String,
    target: UsageTarget,
    query: WindowQuery,
    engine: SyncEngine,
) -> Result<impl Reply, Rejection> {
    let store = engine.store().clone();
    let window = query.window();

    let report = blocking(move || {
        let usage = store.usage_events(target, &target_id, window.first_day)?;
        Ok(analytics::frustration_report(&target_id, &usage, window))
    })
    .await?;

    Ok(warp::reply::json(&report))
}

pub async fn sync_runs(query: RunsQuery, engine: SyncEngine) -> Result<impl Reply, Rejection> {
    let store = engine.store().clone();
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).clamp(1, 500);
    let runs = blocking(move || Ok(store.recent_sync_runs(limit)?)).await?;
    Ok(warp::reply::json(&runs))
}

/// Start a sync in the background: 202 when started, 409 while one runs
pub async fn trigger_sync(engine: SyncEngine) -> Result<impl Reply, Infallible> {
    let (body, status) = match engine.spawn(SyncTrigger::Api) {
        Ok(_) => {
            info!("Sync run started from the API");
            (json!({"status": "started"}), StatusCode::ACCEPTED)
        }
        Err(SyncError::AlreadyRunning) => {
            warn!("Sync requested while a run is in progress");
            (
                json!({"error": SyncError::AlreadyRunning.to_string(), "status": 409}),
                StatusCode::CONFLICT,
            )
        }
        Err(e) => (
            json!({"error": e.to_string(), "status": 500}),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    };

    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}

/// Turn rejections into JSON error bodies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if let Some(e) = err.find::<DashboardError>() {
        (e.status_code(), e.to_string())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        warn!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    let body = ErrorBody {
        error: message,
        status: status.as_u16(),
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
