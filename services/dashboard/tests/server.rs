//! Server startup failures surface as errors

use pendo_adapter::{PendoAdapterConfig, PendoClient};
use pulse_config::{ServerSettings, SyncSettings};
use pulse_dashboard::error::DashboardError;
use pulse_dashboard::DashboardServer;
use store::Store;
use sync_service::SyncEngine;

fn offline_engine() -> SyncEngine {
    let client = PendoClient::new(PendoAdapterConfig {
        api_key: "offline-key".to_string(),
        base_url: "http://127.0.0.1:9".to_string(),
        ..Default::default()
    })
    .unwrap();
    SyncEngine::new(client, Store::in_memory().unwrap(), SyncSettings::default())
}

#[tokio::test]
async fn test_start_fails_when_port_is_taken() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    for enable_cors in [true, false] {
        let settings = ServerSettings {
            bind_address: "127.0.0.1".to_string(),
            port,
            enable_cors,
        };
        let server = DashboardServer::new(settings, offline_engine());

        let result = server.start(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(DashboardError::Internal { .. })));
    }

    drop(listener);
}

#[tokio::test]
async fn test_start_rejects_bad_bind_address() {
    let settings = ServerSettings {
        bind_address: "not an address".to_string(),
        ..Default::default()
    };
    let server = DashboardServer::new(settings, offline_engine());

    let result = server.start(std::future::pending::<()>()).await;
    assert!(matches!(result, Err(DashboardError::Configuration { .. })));
}
