//! JSON wire format of the remote node store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::error::RemoteError;
use crate::geom::LatLng;
use crate::model::{Node, NodeId, Status, SyncState};

/// Header carrying the session credential.
pub const AUTH_HEADER: &str = "auth-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// A remote endpoint, relative to the API base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ListNodes,
    CreateNode,
    UpdateNode(NodeId),
    DeleteNode(NodeId),
    Connect { to: NodeId },
    Disconnect { from: NodeId, to: NodeId },
}

impl Route {
    pub fn method(&self) -> Method {
        match self {
            Route::ListNodes => Method::Get,
            Route::CreateNode => Method::Post,
            Route::UpdateNode(_) | Route::Connect { .. } => Method::Put,
            Route::DeleteNode(_) | Route::Disconnect { .. } => Method::Delete,
        }
    }

    /// Unescaped path segments; node ids may contain any character.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            Route::ListNodes => vec!["point", "list"],
            Route::CreateNode => vec!["point"],
            Route::UpdateNode(id) | Route::DeleteNode(id) => vec!["point", id.as_str()],
            Route::Connect { to } => vec!["point", to.as_str(), "previous"],
            Route::Disconnect { from, to } => {
                vec!["point", to.as_str(), "previous", from.as_str()]
            }
        }
    }

    /// Human-readable path for logs. Not escaped.
    pub fn path(&self) -> String {
        self.segments().join("/")
    }
}

/// One node record as the remote store sends it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WireNode {
    #[serde(rename = "_id", default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "Address", default, deserialize_with = "lenient_string")]
    pub address: String,
    #[serde(rename = "Zone", default, deserialize_with = "lenient_string")]
    pub zone: String,
    #[serde(rename = "Phone1", default, deserialize_with = "lenient_string")]
    pub phone1: String,
    #[serde(rename = "Phone2", default, deserialize_with = "lenient_string")]
    pub phone2: String,
    #[serde(rename = "IP", default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(rename = "Status", default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(rename = "Lat", default)]
    pub lat: Value,
    #[serde(rename = "Lng", default)]
    pub lng: Value,
    #[serde(rename = "Provider", default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(rename = "Type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(rename = "PreviousPoint", default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn coordinate(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

impl WireNode {
    /// Converts into a domain node. `None` when the id is empty or a coordinate is missing
    /// or not a finite number.
    pub fn into_node(self) -> Option<Node> {
        if self.id.trim().is_empty() {
            return None;
        }
        let position = LatLng::new(coordinate(&self.lat)?, coordinate(&self.lng)?);
        let previous = self
            .previous
            .filter(|p| !p.trim().is_empty())
            .map(NodeId::from);
        Some(Node {
            id: NodeId::from(self.id),
            name: self.name,
            address: self.address,
            zone: self.zone,
            phone1: self.phone1,
            phone2: self.phone2,
            ip: self.ip,
            provider: self.provider.filter(|p| !p.is_empty()),
            position,
            kind: self.kind,
            status: Status::parse(&self.status),
            previous,
            sync: SyncState::Confirmed,
        })
    }

    pub fn from_node(node: &Node) -> Self {
        Self {
            id: if node.id.is_temporary() {
                String::new()
            } else {
                node.id.to_string()
            },
            name: node.name.clone(),
            address: node.address.clone(),
            zone: node.zone.clone(),
            phone1: node.phone1.clone(),
            phone2: node.phone2.clone(),
            ip: node.ip.clone(),
            status: node.status.to_string(),
            lat: Value::String(node.position.lat.to_string()),
            lng: Value::String(node.position.lng.to_string()),
            provider: node.provider.clone(),
            kind: node.kind.clone(),
            previous: node.previous.as_ref().map(NodeId::to_string),
        }
    }
}

/// Parsed node list plus the number of records that had to be skipped.
#[derive(Debug, Clone, Default)]
pub struct NodeList {
    pub nodes: Vec<Node>,
    pub skipped: usize,
}

/// Accepts either `{ success, data: [...], message }` or a bare array.
pub fn parse_node_list(body: &Value) -> Result<NodeList, RemoteError> {
    let records = match body {
        Value::Array(items) => items,
        Value::Object(map) => {
            if map.get("success").and_then(Value::as_bool) == Some(false) {
                return Err(RemoteError::Rejected {
                    status: 200,
                    reason: error_reason(body)
                        .unwrap_or_else(|| "Failed to fetch providers".to_string()),
                });
            }
            match map.get("data") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(RemoteError::Unavailable {
                        message: "node list response has no data array".to_string(),
                    });
                }
            }
        }
        _ => {
            return Err(RemoteError::Unavailable {
                message: "node list response is not JSON array or object".to_string(),
            });
        }
    };

    let mut out = NodeList::default();
    for record in records {
        let parsed = WireNode::deserialize(record)
            .ok()
            .and_then(WireNode::into_node);
        match parsed {
            Some(node) => out.nodes.push(node),
            None => {
                out.skipped += 1;
                let id = record.get("_id").cloned().unwrap_or(Value::Null);
                tracing::warn!(%id, "skipping malformed node record");
            }
        }
    }
    Ok(out)
}

pub fn parse_node_list_str(body: &str) -> Result<NodeList, RemoteError> {
    let value: Value = serde_json::from_str(body).map_err(|e| RemoteError::Unavailable {
        message: format!("invalid node list JSON: {e}"),
    })?;
    parse_node_list(&value)
}

/// Server id of a freshly created record, from `{ data: { _id } }` or `{ _id }`.
pub fn created_id(body: &Value) -> Option<NodeId> {
    let record = body.get("data").unwrap_or(body);
    record
        .get("_id")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(NodeId::from)
}

/// `message` of an error envelope.
pub fn error_reason(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

pub fn create_payload(node: &Node) -> Value {
    let mut wire = WireNode::from_node(node);
    wire.id = String::new();
    let mut value = serde_json::to_value(wire).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("_id");
    }
    value
}

/// Edit-form payload. Coordinates travel as strings.
pub fn update_payload(node: &Node) -> Value {
    json!({
        "name": node.name,
        "address": node.address,
        "zone": node.zone,
        "phone1": node.phone1,
        "phone2": node.phone2,
        "ip": node.ip,
        "status": node.status.as_str(),
        "lat": node.position.lat.to_string(),
        "lng": node.position.lng.to_string(),
    })
}

pub fn connect_payload(from: &NodeId) -> Value {
    json!({ "PreviousPoint": from.as_str() })
}
