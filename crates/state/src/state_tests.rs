// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::kv::FakeKv;
use serde_json::json;
use std::sync::Arc;

const RT: &str = "2026-08-01 10:00:00.000001";

fn backends() -> Vec<(&'static str, StateStore)> {
    vec![
        ("memory", StateStore::in_memory()),
        ("kv", StateStore::with_kv(Arc::new(FakeKv::new()))),
    ]
}

#[tokio::test]
async fn set_replaces_and_read_returns_scalar() {
    for (name, store) in backends() {
        store
            .write(RT, "svc-1", "status", json!("Running"), WriteMethod::Set)
            .await
            .unwrap();
        store
            .write(RT, "svc-1", "status", json!("Completed"), WriteMethod::Set)
            .await
            .unwrap();
        let value = store.read(RT, "svc-1", "status").await.unwrap();
        assert_eq!(value, Some(json!("Completed")), "backend {name}");
    }
}

#[tokio::test]
async fn increment_creates_at_zero_and_accumulates() {
    for (name, store) in backends() {
        for _ in 0..3 {
            store
                .write(RT, "svc-1", "progress/device/total", json!(2), WriteMethod::Increment)
                .await
                .unwrap();
        }
        let value = store.read(RT, "svc-1", "progress/device/total").await.unwrap();
        assert_eq!(value, Some(json!(6)), "backend {name}");
    }
}

#[tokio::test]
async fn increment_rejects_non_integers() {
    for (name, store) in backends() {
        let err = store
            .write(RT, "svc-1", "progress/device/total", json!("x"), WriteMethod::Increment)
            .await;
        assert!(err.is_err(), "backend {name}");
    }
}

#[tokio::test]
async fn append_preserves_arrival_order() {
    for (name, store) in backends() {
        for item in ["first", "second", "third"] {
            store
                .write(RT, "svc-1", "log", json!(item), WriteMethod::Append)
                .await
                .unwrap();
        }
        let value = store.read(RT, "svc-1", "log").await.unwrap();
        assert_eq!(value, Some(json!(["first", "second", "third"])), "backend {name}");
    }
}

#[tokio::test]
async fn booleans_survive_both_backends() {
    for (name, store) in backends() {
        store
            .write(RT, "svc-1", "success", json!(true), WriteMethod::Set)
            .await
            .unwrap();
        let value = store.read(RT, "svc-1", "success").await.unwrap();
        assert_eq!(value, Some(json!(true)), "backend {name}");
    }
}

#[tokio::test]
async fn read_returns_subtrees() {
    for (name, store) in backends() {
        store
            .write(RT, "svc-1", "progress/device/success", json!(2), WriteMethod::Increment)
            .await
            .unwrap();
        store
            .write(RT, "svc-1", "progress/device/failure", json!(1), WriteMethod::Increment)
            .await
            .unwrap();
        let value = store.read(RT, "svc-1", "progress/device").await.unwrap();
        assert_eq!(
            value,
            Some(json!({"success": 2, "failure": 1})),
            "backend {name}"
        );
    }
}

#[tokio::test]
async fn read_absent_path_is_none() {
    for (name, store) in backends() {
        let value = store.read(RT, "svc-1", "progress/device").await.unwrap();
        assert_eq!(value, None, "backend {name}");
    }
}

#[tokio::test]
async fn snapshot_collects_all_runner_paths() {
    for (name, store) in backends() {
        store
            .write(RT, "svc-1", "status", json!("Running"), WriteMethod::Set)
            .await
            .unwrap();
        store
            .write(RT, "svc-1>svc-2", "success", json!(false), WriteMethod::Set)
            .await
            .unwrap();
        let snapshot = store.snapshot(RT).await.unwrap();
        assert_eq!(
            snapshot.get("svc-1").and_then(|v| v.get("status")),
            Some(&json!("Running")),
            "backend {name}"
        );
        assert_eq!(
            snapshot.get("svc-1>svc-2").and_then(|v| v.get("success")),
            Some(&json!(false)),
            "backend {name}"
        );
    }
}

#[tokio::test]
async fn clear_drops_the_whole_run() {
    for (name, store) in backends() {
        store
            .write(RT, "svc-1", "status", json!("Running"), WriteMethod::Set)
            .await
            .unwrap();
        store.clear(RT).await.unwrap();
        let value = store.read(RT, "svc-1", "status").await.unwrap();
        assert_eq!(value, None, "backend {name}");
    }
}

#[tokio::test]
async fn runs_are_isolated_by_parent_runtime() {
    let store = StateStore::in_memory();
    store
        .write(RT, "svc-1", "status", json!("Running"), WriteMethod::Set)
        .await
        .unwrap();
    let other = store.read("other-rt", "svc-1", "status").await.unwrap();
    assert_eq!(other, None);
}

#[tokio::test]
async fn init_path_reports_existing_paths_in_memory() {
    let store = StateStore::in_memory();
    assert!(store.init_path(RT, "svc-1").await.unwrap());
    assert!(!store.init_path(RT, "svc-1").await.unwrap());
    assert!(store.init_path(RT, "svc-1>svc-2").await.unwrap());
}

#[tokio::test]
async fn concurrent_increments_do_not_lose_updates() {
    let store = Arc::new(StateStore::in_memory());
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for _ in 0..50 {
                store
                    .write(RT, "svc-1", "progress/device/success", json!(1), WriteMethod::Increment)
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    let value = store.read(RT, "svc-1", "progress/device/success").await.unwrap();
    assert_eq!(value, Some(json!(400)));
}
