//! On-disk persistence across store handles

use serde_json::json;
use store::{RunSummary, Store, SyncOutcome, SyncTrigger};
use tempfile::tempdir;
use types::{EntityKind, Guide};

#[test]
fn test_data_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("pulse.sqlite");

    {
        let store = Store::open(&path).unwrap();
        let raw = json!({"id": "g1", "name": "Tour", "state": "public"});
        let guide: Guide = serde_json::from_value(raw.clone()).unwrap();
        store.upsert_guides(&[(guide, raw)], 1).unwrap();

        let run = store.begin_sync_run(SyncTrigger::Startup, 1).unwrap();
        store
            .finish_sync_run(
                run,
                &RunSummary {
                    outcome: SyncOutcome::Success,
                    records_synced: 1,
                    events_synced: 0,
                    errors: vec![],
                },
                2,
            )
            .unwrap();
    }

    let reopened = Store::open(&path).unwrap();
    assert_eq!(reopened.count(EntityKind::Guide).unwrap(), 1);
    assert_eq!(reopened.data_overview().unwrap().last_synced_at, Some(2));
}

#[test]
fn test_clones_share_connection() {
    let store = Store::in_memory().unwrap();
    let clone = store.clone();

    let raw = json!({"id": "g1", "name": "Tour"});
    let guide: Guide = serde_json::from_value(raw.clone()).unwrap();
    clone.upsert_guides(&[(guide, raw)], 1).unwrap();

    assert!(store.get_guide("g1").unwrap().is_some());
}
