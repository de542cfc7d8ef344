// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::records::RunId;
use std::collections::{HashMap, HashSet};

crate::define_id! {
    /// Test-only identifier.
    pub struct ProbeId;
}

#[test]
fn ids_round_trip_through_strings() {
    let id = ProbeId::new("alpha");
    assert_eq!(id.as_str(), "alpha");
    assert_eq!(id.to_string(), "alpha");
    assert_eq!(ProbeId::from("alpha".to_string()), id);
    assert_eq!(ProbeId::from("alpha"), id);
    assert!(id == "alpha");
}

#[test]
fn ids_serialize_transparently() {
    let id = ProbeId::new("edge1");
    assert_eq!(serde_json::to_string(&id).unwrap(), r#""edge1""#);
    let back: ProbeId = serde_json::from_str(r#""edge1""#).unwrap();
    assert_eq!(back, id);
}

#[test]
fn id_keyed_maps_accept_string_lookups() {
    let mut statuses: HashMap<ProbeId, &str> = HashMap::new();
    statuses.insert(ProbeId::new("svc-1"), "Idle");
    // Borrow<str> lets plain strings address id-keyed maps
    assert_eq!(statuses.get("svc-1"), Some(&"Idle"));
    assert_eq!(statuses.get("svc-9"), None);
}

#[test]
fn random_run_ids_are_unique() {
    let ids: HashSet<String> = (0..100).map(|_| RunId::random().0).collect();
    assert_eq!(ids.len(), 100);
}
