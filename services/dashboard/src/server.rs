//! Dashboard HTTP server

use crate::api;
use crate::error::{DashboardError, Result};
use pulse_config::ServerSettings;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use sync_service::SyncEngine;
use tracing::info;
use types::UsageTarget;
use warp::{Filter, Reply};

fn with_engine(
    engine: SyncEngine,
) -> impl Filter<Extract = (SyncEngine,), Error = Infallible> + Clone {
    warp::any().map(move || engine.clone())
}

fn with_target(
    target: UsageTarget,
) -> impl Filter<Extract = (UsageTarget,), Error = Infallible> + Clone {
    warp::any().map(move || target)
}

/// Every route the dashboard serves, with JSON error bodies
pub fn routes(
    engine: SyncEngine,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(api::status);

    let overview_route = warp::path!("api" / "overview")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(api::overview);

    let guides_route = warp::path!("api" / "guides")
        .and(warp::get())
        .and(with_engine(engine.clone()))
        .and_then(api::list_guides);

    let guide_metrics_route = warp::path!("api" / "guides" / String / "metrics")
        .and(warp::get())
        .and(warp::query::<api::WindowQuery>())
        .and(with_engine(engine.clone()))
        .and_then(api::guide_metrics);

    let feature_route = warp::path!("api" / "features" / String / "frustration")
        .and(warp::get())
        .and(with_target(UsageTarget::Feature))
        .and(warp::query::<api::WindowQuery>())
        .and(with_engine(engine.clone()))
        .and_then(api::frustration);

    let page_route = warp::path!("api" / "pages" / String / "frustration")
        .and(warp::get())
        .and(with_target(UsageTarget::Page))
        .and(warp::query::<api::WindowQuery>())
        .and(with_engine(engine.clone()))
        .and_then(api::frustration);

    let runs_route = warp::path!("api" / "sync" / "runs")
        .and(warp::get())
        .and(warp::query::<api::RunsQuery>())
        .and(with_engine(engine.clone()))
        .and_then(api::sync_runs);

    let trigger_route = warp::path!("api" / "sync")
        .and(warp::post())
        .and(with_engine(engine))
        .and_then(api::trigger_sync);

    health_route
        .or(status_route)
        .or(overview_route)
        .or(guides_route)
        .or(guide_metrics_route)
        .or(feature_route)
        .or(page_route)
        .or(runs_route)
        .or(trigger_route)
        .recover(api::handle_rejection)
}

/// Dashboard API server
pub struct DashboardServer {
    settings: ServerSettings,
    engine: SyncEngine,
}

impl DashboardServer {
    pub fn new(settings: ServerSettings, engine: SyncEngine) -> Self {
        Self { settings, engine }
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.settings.bind_address, self.settings.port)
            .parse()
            .map_err(|e| DashboardError::Configuration {
                message: format!("Invalid bind address: {}", e),
            })
    }

    /// Serve until `shutdown` resolves
    pub async fn start<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.addr()?;
        let routes = routes(self.engine.clone());

        info!("Starting dashboard API on {}", addr);

        if self.settings.enable_cors {
            let cors = warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST"])
                .allow_header("content-type");
            let (bound, server) = warp::serve(routes.with(cors))
                .try_bind_with_graceful_shutdown(addr, shutdown)
                .map_err(|e| DashboardError::Internal {
                    message: format!("Failed to bind {}: {}", addr, e),
                })?;
            info!("Dashboard API listening on {}", bound);
            server.await;
        } else {
            let (bound, server) = warp::serve(routes)
                .try_bind_with_graceful_shutdown(addr, shutdown)
                .map_err(|e| DashboardError::Internal {
                    message: format!("Failed to bind {}: {}", addr, e),
                })?;
            info!("Dashboard API listening on {}", bound);
            server.await;
        }

        info!("Dashboard API stopped");
        Ok(())
    }
}
