//! The single info display.

use serde::Serialize;

use gridmap_graphlib::EdgeId;

use crate::geom::LatLng;
use crate::model::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum InfoTarget {
    Node(NodeId),
    #[serde(serialize_with = "serialize_edge_id")]
    Edge(EdgeId),
}

fn serialize_edge_id<S: serde::Serializer>(id: &EdgeId, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(id.get())
}

/// Rendered popup body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum InfoContent {
    #[serde(rename_all = "camelCase")]
    Node {
        title: String,
        lines: Vec<String>,
        anchor: LatLng,
        editable: bool,
    },
    #[serde(rename_all = "camelCase")]
    Edge {
        title: String,
        lines: Vec<String>,
        anchor: LatLng,
    },
}

impl InfoContent {
    pub fn title(&self) -> &str {
        match self {
            InfoContent::Node { title, .. } | InfoContent::Edge { title, .. } => title,
        }
    }

    pub fn lines(&self) -> &[String] {
        match self {
            InfoContent::Node { lines, .. } | InfoContent::Edge { lines, .. } => lines,
        }
    }

    pub fn anchor(&self) -> LatLng {
        match self {
            InfoContent::Node { anchor, .. } | InfoContent::Edge { anchor, .. } => *anchor,
        }
    }
}

/// At most one open target. Opening a new one closes the previous.
#[derive(Debug, Clone, Default)]
pub struct InfoDisplay {
    active: Option<InfoTarget>,
}

impl InfoDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `target`, returning whatever was open before.
    pub fn open(&mut self, target: InfoTarget) -> Option<InfoTarget> {
        let previous = self.active.replace(target);
        if let Some(prev) = &previous {
            tracing::debug!(?prev, "info display replaced");
        }
        previous
    }

    pub fn close_active(&mut self) -> Option<InfoTarget> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&InfoTarget> {
        self.active.as_ref()
    }

    pub fn is_showing_node(&self, id: &NodeId) -> bool {
        matches!(&self.active, Some(InfoTarget::Node(n)) if n == id)
    }

    pub fn is_showing_edge(&self, id: EdgeId) -> bool {
        matches!(&self.active, Some(InfoTarget::Edge(e)) if *e == id)
    }
}
