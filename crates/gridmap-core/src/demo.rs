//! Offline sample topology.

use crate::geom::LatLng;
use crate::model::{Node, NodeId, SyncState};

pub const PROVIDER_TYPES: [&str; 3] = ["Exchange", "Broker", "Market Maker"];

const PROVIDERS: [(&str, &str, f64, f64, &str); 5] = [
    ("demo-1", "Provider A", 40.7128, -74.0060, "Exchange"),
    ("demo-2", "Provider B", 34.0522, -118.2437, "Broker"),
    ("demo-3", "Provider C", 51.5074, -0.1278, "Market Maker"),
    ("demo-4", "Provider D", 48.8566, 2.3522, "Exchange"),
    ("demo-5", "Provider E", 35.6762, 139.6503, "Broker"),
];

/// Five local providers spread over New York, Los Angeles, London, Paris and Tokyo.
pub fn demo_nodes() -> Vec<Node> {
    PROVIDERS
        .iter()
        .map(|&(id, name, lat, lng, kind)| {
            let mut node = Node::new(NodeId::from(id), name, LatLng::new(lat, lng)).with_kind(kind);
            node.sync = SyncState::Local;
            node
        })
        .collect()
}
