//! Domain records held by the topology store.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geom::LatLng;
use crate::health::TimerHandle;

const TEMPORARY_PREFIX: &str = "tmp-";

/// Node identity: server-assigned once persisted, `tmp-<uuid>` before that.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn temporary() -> Self {
        Self(format!("{TEMPORARY_PREFIX}{}", uuid::Uuid::new_v4()))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMPORARY_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    Running,
    Stopped,
    Unknown,
}

impl Status {
    /// Lenient parse: anything other than `Running`/`Stopped` is `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "Running" => Status::Running,
            "Stopped" => Status::Stopped,
            _ => Status::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Running => "Running",
            Status::Stopped => "Stopped",
            Status::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a local entity has been acknowledged by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SyncState {
    #[default]
    Confirmed,
    Pending,
    Failed { attempts: u32 },
    /// Never persisted (demo topology, random connections).
    Local,
}

impl SyncState {
    pub fn is_confirmed(self) -> bool {
        matches!(self, SyncState::Confirmed)
    }

    pub fn is_local(self) -> bool {
        matches!(self, SyncState::Local)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub address: String,
    pub zone: String,
    pub phone1: String,
    pub phone2: String,
    pub ip: String,
    /// Hardware / owner identifier.
    pub provider: Option<String>,
    pub position: LatLng,
    pub kind: String,
    pub status: Status,
    pub previous: Option<NodeId>,
    pub sync: SyncState,
}

impl Node {
    pub fn new(id: NodeId, name: impl Into<String>, position: LatLng) -> Self {
        Self {
            id,
            name: name.into(),
            address: String::new(),
            zone: String::new(),
            phone1: String::new(),
            phone2: String::new(),
            ip: String::new(),
            provider: None,
            position,
            kind: String::new(),
            status: Status::Running,
            previous: None,
            sync: SyncState::Confirmed,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    pub fn with_previous(mut self, previous: impl Into<NodeId>) -> Self {
        self.previous = Some(previous.into());
        self
    }

    /// `"Name (Type)"`, or just the name when the type is empty.
    pub fn label(&self) -> String {
        if self.kind.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.kind)
        }
    }

    pub fn apply(&mut self, attrs: &NodeAttributes) {
        if let Some(v) = &attrs.name {
            self.name = v.clone();
        }
        if let Some(v) = &attrs.address {
            self.address = v.clone();
        }
        if let Some(v) = &attrs.zone {
            self.zone = v.clone();
        }
        if let Some(v) = &attrs.phone1 {
            self.phone1 = v.clone();
        }
        if let Some(v) = &attrs.phone2 {
            self.phone2 = v.clone();
        }
        if let Some(v) = &attrs.ip {
            self.ip = v.clone();
        }
        if let Some(v) = &attrs.provider {
            self.provider = Some(v.clone());
        }
        if let Some(v) = attrs.position {
            self.position = v;
        }
        if let Some(v) = &attrs.kind {
            self.kind = v.clone();
        }
        if let Some(v) = attrs.status {
            self.status = v;
        }
    }
}

/// Partial node update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeAttributes {
    pub name: Option<String>,
    pub address: Option<String>,
    pub zone: Option<String>,
    pub phone1: Option<String>,
    pub phone2: Option<String>,
    pub ip: Option<String>,
    pub provider: Option<String>,
    pub position: Option<LatLng>,
    pub kind: Option<String>,
    pub status: Option<Status>,
}

impl NodeAttributes {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn position(position: LatLng) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    /// Every editable field of `node`.
    pub fn from_node(node: &Node) -> Self {
        Self {
            name: Some(node.name.clone()),
            address: Some(node.address.clone()),
            zone: Some(node.zone.clone()),
            phone1: Some(node.phone1.clone()),
            phone2: Some(node.phone2.clone()),
            ip: Some(node.ip.clone()),
            provider: node.provider.clone(),
            position: Some(node.position),
            kind: Some(node.kind.clone()),
            status: Some(node.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EdgePath {
    Straight,
    Zigzag { segments: usize, variation: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EdgeColor {
    Healthy,
    Down,
}

/// Connection record. The blink handle is present iff `both_down`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub both_down: bool,
    pub blink: Option<TimerHandle>,
    pub opacity: f64,
    pub path: EdgePath,
    pub sync: SyncState,
}

impl Edge {
    pub fn new(path: EdgePath, sync: SyncState) -> Self {
        Self {
            both_down: false,
            blink: None,
            opacity: 1.0,
            path,
            sync,
        }
    }

    pub fn color(&self) -> EdgeColor {
        if self.both_down {
            EdgeColor::Down
        } else {
            EdgeColor::Healthy
        }
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_ids_are_unique_and_flagged() {
        let a = NodeId::temporary();
        let b = NodeId::temporary();
        assert_ne!(a, b);
        assert!(a.is_temporary());
        assert!(!NodeId::from("65f0c2").is_temporary());
    }

    #[test]
    fn unknown_status_strings_map_to_unknown() {
        assert_eq!(Status::parse("Running"), Status::Running);
        assert_eq!(Status::parse(" Stopped "), Status::Stopped);
        assert_eq!(Status::parse("Degraded"), Status::Unknown);
        assert_eq!(Status::parse(""), Status::Unknown);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let mut node = Node::new("n1".into(), "Alpha", LatLng::new(1.0, 2.0)).with_kind("Broker");
        node.apply(&NodeAttributes {
            zone: Some("EU".to_string()),
            status: Some(Status::Stopped),
            ..Default::default()
        });
        assert_eq!(node.name, "Alpha");
        assert_eq!(node.zone, "EU");
        assert_eq!(node.status, Status::Stopped);
        assert_eq!(node.label(), "Alpha (Broker)");
    }
}
