//! Cross-backend conformance suite: the same assertions run against
//! [`crate::log::LogActivityStorage`] and
//! [`crate::memory::MemoryActivityStorage`] so invariants 2–4 (append
//! idempotency, scan-order preservation, upsert-in-place) hold for both.
//!
//! Not a `#[cfg(test)]` module itself — each backend's test module calls
//! these functions from its own `#[tokio::test]`s, so failures point at
//! the backend, not at a shared file.

use remote_agents_core::{Activity, ActivityType, Originator};

use crate::activity_store::ActivityStorage;

fn activity(id: &str, create_time: &str, message: &str) -> Activity {
    Activity {
        id: id.into(),
        create_time: create_time.into(),
        originator: Originator::Agent,
        activity_type: ActivityType::AgentMessaged {
            message: message.into(),
        },
        artifacts: vec![],
    }
}

/// Appending distinct ids preserves insertion order on `scan`.
pub async fn append_preserves_scan_order(store: &dyn ActivityStorage) {
    store.init().await.unwrap();
    for i in 0..5 {
        store
            .append(activity(&format!("a{i}"), &format!("t{i}"), "m"))
            .await
            .unwrap();
    }
    let scanned = store.scan().await.unwrap();
    let ids: Vec<_> = scanned.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["a0", "a1", "a2", "a3", "a4"]);
}

/// Re-appending the same id is a no-op for scan order and does not grow
/// the store.
pub async fn append_same_id_is_idempotent_in_position(store: &dyn ActivityStorage) {
    store.init().await.unwrap();
    store.append(activity("a1", "t1", "first")).await.unwrap();
    store.append(activity("a2", "t2", "second")).await.unwrap();
    store.append(activity("a1", "t1", "first")).await.unwrap();

    let scanned = store.scan().await.unwrap();
    assert_eq!(scanned.len(), 2);
    assert_eq!(scanned[0].id, "a1");
    assert_eq!(scanned[1].id, "a2");
}

/// `latest` tracks the most recently appended activity, including after
/// an upsert of an older id.
pub async fn latest_tracks_last_append(store: &dyn ActivityStorage) {
    store.init().await.unwrap();
    assert!(store.latest().await.unwrap().is_none());

    store.append(activity("a1", "t1", "m")).await.unwrap();
    store.append(activity("a2", "t2", "m")).await.unwrap();
    assert_eq!(store.latest().await.unwrap().unwrap().id, "a2");

    let mut updated = activity("a1", "t1", "updated");
    updated.activity_type = ActivityType::AgentMessaged {
        message: "updated".into(),
    };
    store.append(updated).await.unwrap();
    assert_eq!(store.latest().await.unwrap().unwrap().id, "a2");
}

/// `get` returns the current value of an upserted id, not a stale copy.
pub async fn get_reflects_upsert(store: &dyn ActivityStorage) {
    store.init().await.unwrap();
    store.append(activity("a1", "t1", "first")).await.unwrap();
    let mut updated = activity("a1", "t1", "second");
    updated.activity_type = ActivityType::AgentMessaged {
        message: "second".into(),
    };
    store.append(updated).await.unwrap();

    let fetched = store.get("a1").await.unwrap().unwrap();
    match fetched.activity_type {
        ActivityType::AgentMessaged { message } => assert_eq!(message, "second"),
        other => panic!("unexpected {other:?}"),
    }
}
