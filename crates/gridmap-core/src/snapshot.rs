//! Render-ready copy of the editor state.

use serde::Serialize;

use gridmap_graphlib::EdgeId;

use crate::editor::Editor;
use crate::geom::{self, LatLng};
use crate::health::BlinkTimers;
use crate::model::{EdgeColor, NodeId, Status, SyncState};
use crate::notice::NoticeKind;
use crate::popup::{InfoContent, InfoTarget};
use crate::ready::ReadyState;
use crate::selection::SelectionState;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub map: MapView,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub selection: SelectionState,
    pub info: Option<InfoView>,
    pub notices: Vec<NoticeView>,
    pub controls: Controls,
    pub summary: Summary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub state: MapState,
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum MapState {
    Loading,
    Ready,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub id: NodeId,
    pub name: String,
    pub kind: String,
    pub status: Status,
    pub position: LatLng,
    pub color: String,
    pub highlighted: bool,
    pub sync: SyncState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeView {
    pub id: u64,
    pub from: NodeId,
    pub to: NodeId,
    pub path: Vec<LatLng>,
    pub color: EdgeColor,
    pub stroke: String,
    pub opacity: f64,
    pub both_down: bool,
    pub blinking: bool,
    pub sync: SyncState,
}

impl EdgeView {
    pub fn edge_id(&self) -> EdgeId {
        EdgeId(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoView {
    pub target: InfoTarget,
    pub content: InfoContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeView {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Control {
    pub visible: bool,
    pub active: bool,
    pub glyph: &'static str,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Controls {
    pub add_node: Control,
    pub connect: Control,
    pub cancel_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub provider_count: usize,
    pub connection_count: usize,
    pub providers: Vec<String>,
    pub connections: Vec<String>,
    pub down_links: usize,
}

pub(crate) fn build<T: BlinkTimers>(editor: &Editor<T>) -> Snapshot {
    let cfg = editor.config();
    let store = editor.store();
    let selection = editor.selection().clone();
    let highlighted = selection.highlighted();

    let nodes: Vec<NodeView> = store
        .nodes()
        .map(|n| NodeView {
            id: n.id.clone(),
            name: n.name.clone(),
            kind: n.kind.clone(),
            status: n.status,
            position: n.position,
            color: cfg.colors.type_color(&n.kind).to_string(),
            highlighted: highlighted == Some(&n.id),
            sync: n.sync,
        })
        .collect();

    let edges: Vec<EdgeView> = store
        .edges()
        .map(|e| {
            let color = e.label.color();
            EdgeView {
                id: e.id.get(),
                from: NodeId::from(e.v),
                to: NodeId::from(e.w),
                path: store.edge_path(e.id).unwrap_or_default(),
                color,
                stroke: match color {
                    EdgeColor::Healthy => cfg.colors.healthy.clone(),
                    EdgeColor::Down => cfg.colors.down.clone(),
                },
                opacity: e.label.opacity,
                both_down: e.label.both_down,
                blinking: e.label.is_blinking(),
                sync: e.label.sync,
            }
        })
        .collect();

    let info = editor
        .info()
        .active()
        .and_then(|target| info_view(editor, target));

    let notices = editor
        .notices()
        .iter()
        .map(|n| NoticeView {
            id: n.id,
            kind: n.kind,
            message: n.message.clone(),
        })
        .collect();

    let state = match editor.map_ready().state() {
        ReadyState::Pending => MapState::Loading,
        ReadyState::Ready => MapState::Ready,
        ReadyState::Failed(message) => MapState::Failed(message),
    };
    let ready = state == MapState::Ready;

    let controls = Controls {
        add_node: Control {
            visible: ready,
            active: selection.is_placing(),
            glyph: if selection.is_placing() { "✕" } else { "+" },
            title: if selection.is_placing() {
                "Cancel adding marker"
            } else {
                "Add Marker"
            },
        },
        connect: Control {
            visible: ready && store.node_count() >= 2,
            active: selection.is_selecting(),
            glyph: if selection.is_selecting() { "✕" } else { "⚡" },
            title: if selection.is_selecting() {
                "Cancel marker selection"
            } else {
                "Connect Markers"
            },
        },
        cancel_visible: selection != SelectionState::Idle,
    };

    let summary = Summary {
        provider_count: nodes.len(),
        connection_count: edges.len(),
        providers: store.nodes().map(|n| n.label()).collect(),
        connections: edges
            .iter()
            .map(|e| {
                let name = |id: &NodeId| {
                    store
                        .node(id)
                        .map(|n| n.name.clone())
                        .unwrap_or_else(|| id.to_string())
                };
                format!("{} → {}", name(&e.from), name(&e.to))
            })
            .collect(),
        down_links: store.down_edge_count(),
    };

    Snapshot {
        map: MapView {
            state,
            center: cfg.map.center,
            zoom: cfg.map.zoom,
        },
        nodes,
        edges,
        selection,
        info,
        notices,
        controls,
        summary,
    }
}

/// Popup body for `target`, or `None` when it no longer exists.
pub fn info_view<T: BlinkTimers>(editor: &Editor<T>, target: &InfoTarget) -> Option<InfoView> {
    let store = editor.store();
    let content = match target {
        InfoTarget::Node(id) => {
            let n = store.node(id)?;
            InfoContent::Node {
                title: n.name.clone(),
                lines: vec![
                    format!("Type: {}", n.kind),
                    format!("Status: {}", n.status),
                    format!(
                        "Position: {:.6}, {:.6}",
                        n.position.lat, n.position.lng
                    ),
                ],
                anchor: n.position,
                editable: true,
            }
        }
        InfoTarget::Edge(id) => {
            let (from, to) = store.edge_endpoints(*id)?;
            let path = store.edge_path(*id)?;
            let a = store.node(&from)?;
            let b = store.node(&to)?;
            InfoContent::Edge {
                title: format!("Connection {id}"),
                lines: vec![
                    format!("From: {}", a.label()),
                    format!("To: {}", b.label()),
                ],
                anchor: geom::path_midpoint(&path)?,
            }
        }
    };
    Some(InfoView {
        target: target.clone(),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::model::NodeAttributes;

    fn demo_editor() -> Editor<crate::health::ManualTimers> {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.seed_demo();
        ed
    }

    #[test]
    fn controls_hide_until_the_map_is_ready() {
        let ed = Editor::headless(EditorConfig::default());
        let snap = ed.snapshot();
        assert_eq!(snap.map.state, MapState::Loading);
        assert!(!snap.controls.add_node.visible);
        assert!(!snap.controls.connect.visible);
    }

    #[test]
    fn connect_control_needs_two_nodes() {
        let mut ed = Editor::headless(EditorConfig::default());
        ed.mark_map_ready();
        ed.reconcile(vec![crate::model::Node::new(
            "a".into(),
            "Alpha",
            LatLng::new(0.0, 0.0),
        )]);
        let snap = ed.snapshot();
        assert!(snap.controls.add_node.visible);
        assert!(!snap.controls.connect.visible);
    }

    #[test]
    fn selection_highlights_first_endpoint() {
        let mut ed = demo_editor();
        ed.toggle_connect().unwrap();
        let first = NodeId::from("demo-1");
        ed.click_node(&first).unwrap();
        let snap = ed.snapshot();
        assert!(snap.controls.connect.active);
        assert_eq!(snap.controls.connect.glyph, "✕");
        assert!(snap.controls.cancel_visible);
        let highlighted: Vec<&NodeId> = snap
            .nodes
            .iter()
            .filter(|n| n.highlighted)
            .map(|n| &n.id)
            .collect();
        assert_eq!(highlighted, vec![&first]);
    }

    #[test]
    fn down_edges_render_red_and_blink() {
        let mut ed = demo_editor();
        let a = NodeId::from("demo-1");
        let b = NodeId::from("demo-2");
        let e = ed.add_edge(&a, &b).unwrap();
        for id in [&a, &b] {
            ed.update_node(id, &NodeAttributes::status(Status::Stopped))
                .unwrap();
        }
        let snap = ed.snapshot();
        let edge = snap.edges.iter().find(|v| v.edge_id() == e).unwrap();
        assert_eq!(edge.color, EdgeColor::Down);
        assert_eq!(edge.stroke, "#DB4437");
        assert!(edge.blinking);
        assert_eq!(snap.summary.down_links, 1);
        assert_eq!(snap.summary.connections, vec!["Provider A → Provider B"]);
    }

    #[test]
    fn edge_popup_anchors_on_the_path_midpoint() {
        let mut ed = demo_editor();
        let e = ed.add_edge(&"demo-1".into(), &"demo-3".into()).unwrap();
        assert!(ed.click_edge(e).unwrap());
        let info = ed.snapshot().info.unwrap();
        assert_eq!(info.content.title(), format!("Connection {e}"));
        assert_eq!(
            info.content.lines(),
            &[
                "From: Provider A (Exchange)".to_string(),
                "To: Provider C (Market Maker)".to_string(),
            ]
        );
        // Straight path of two points: index 1 is the far end.
        assert_eq!(info.content.anchor(), LatLng::new(51.5074, -0.1278));
    }

    #[test]
    fn node_popup_lists_type_status_and_position() {
        let mut ed = demo_editor();
        let id = NodeId::from("demo-2");
        ed.click_node(&id).unwrap();
        let info = ed.snapshot().info.unwrap();
        assert_eq!(info.target, InfoTarget::Node(id));
        assert_eq!(
            info.content.lines(),
            &[
                "Type: Broker".to_string(),
                "Status: Running".to_string(),
                "Position: 34.052200, -118.243700".to_string(),
            ]
        );
    }
}
