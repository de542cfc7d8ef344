// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use nr_adapters::{FakeSession, ProtocolFamily};

const RT: &str = "rt-1";

fn key(device: &str, name: &str) -> ConnectionKey {
    ConnectionKey::new(ProtocolFamily::CliAutomation, RT, device, name)
}

#[tokio::test]
async fn get_returns_live_cached_sessions() {
    let cache = ConnectionCache::default();
    let session = FakeSession::new("edge1", ProtocolFamily::CliAutomation);
    cache.put(key("edge1", "default"), session.clone());
    assert!(cache.get(&key("edge1", "default"), false).await.is_some());
    assert!(!session.is_closed());
}

#[tokio::test]
async fn dead_sessions_are_closed_and_evicted() {
    let cache = ConnectionCache::default();
    let session = FakeSession::new("edge1", ProtocolFamily::CliAutomation);
    session.set_alive(false);
    cache.put(key("edge1", "default"), session.clone());
    assert!(cache.get(&key("edge1", "default"), false).await.is_none());
    assert!(session.is_closed());
    assert_eq!(cache.count(RT), 0);
}

#[tokio::test]
async fn start_new_closes_even_live_sessions() {
    let cache = ConnectionCache::default();
    let session = FakeSession::new("edge1", ProtocolFamily::CliAutomation);
    cache.put(key("edge1", "default"), session.clone());
    assert!(cache.get(&key("edge1", "default"), true).await.is_none());
    assert!(session.is_closed());
}

#[tokio::test]
async fn connection_names_do_not_collide() {
    let cache = ConnectionCache::default();
    let a = FakeSession::new("edge1", ProtocolFamily::CliAutomation);
    let b = FakeSession::new("edge1", ProtocolFamily::CliAutomation);
    cache.put(key("edge1", "default"), a);
    cache.put(key("edge1", "secondary"), b);
    assert_eq!(cache.count(RT), 2);
    cache.evict(&key("edge1", "default")).await;
    assert_eq!(cache.count(RT), 1);
    assert!(cache.get(&key("edge1", "secondary"), false).await.is_some());
}

#[tokio::test]
async fn close_device_spans_families_and_names() {
    let cache = ConnectionCache::default();
    cache.put(
        key("edge1", "default"),
        FakeSession::new("edge1", ProtocolFamily::CliAutomation),
    );
    cache.put(
        ConnectionKey::new(ProtocolFamily::Netconf, RT, "edge1", "default"),
        FakeSession::new("edge1", ProtocolFamily::Netconf),
    );
    cache.put(
        key("edge2", "default"),
        FakeSession::new("edge2", ProtocolFamily::CliAutomation),
    );
    cache.close_device(RT, "edge1").await;
    assert_eq!(cache.count(RT), 1);
}

#[tokio::test]
async fn close_all_empties_the_run_and_leaves_others() {
    let cache = ConnectionCache::default();
    let sessions: Vec<_> = (0..4)
        .map(|i| {
            let session = FakeSession::new(&format!("edge{i}"), ProtocolFamily::StreamingCli);
            cache.put(
                ConnectionKey::new(ProtocolFamily::StreamingCli, RT, &format!("edge{i}"), "default"),
                session.clone(),
            );
            session
        })
        .collect();
    cache.put(
        ConnectionKey::new(ProtocolFamily::StreamingCli, "other-rt", "edge9", "default"),
        FakeSession::new("edge9", ProtocolFamily::StreamingCli),
    );

    cache.close_all(RT).await;
    assert_eq!(cache.count(RT), 0);
    assert_eq!(cache.count("other-rt"), 1);
    for session in sessions {
        assert!(session.is_closed());
    }
}
