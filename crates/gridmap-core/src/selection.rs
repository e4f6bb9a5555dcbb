//! What a pointer click currently means.

use serde::Serialize;

use crate::geom::LatLng;
use crate::model::NodeId;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "first", rename_all = "camelCase")]
pub enum SelectionState {
    #[default]
    Idle,
    PlacingNode,
    AwaitingFirstEndpoint,
    AwaitingSecondEndpoint(NodeId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    ToggleAddNode,
    ToggleConnect,
    Cancel,
    MapClick(LatLng),
    NodeClick(NodeId),
}

/// Store-level consequence of a gesture, applied by the editor in the same step.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    PlaceNode(LatLng),
    Connect { from: NodeId, to: NodeId },
    OpenNodeInfo(NodeId),
}

impl SelectionState {
    pub fn is_selecting(&self) -> bool {
        matches!(
            self,
            SelectionState::AwaitingFirstEndpoint | SelectionState::AwaitingSecondEndpoint(_)
        )
    }

    pub fn is_placing(&self) -> bool {
        matches!(self, SelectionState::PlacingNode)
    }

    /// The first endpoint while awaiting the second.
    pub fn highlighted(&self) -> Option<&NodeId> {
        match self {
            SelectionState::AwaitingSecondEndpoint(id) => Some(id),
            _ => None,
        }
    }

    pub fn handle(&mut self, gesture: Gesture) -> Effect {
        let prev = std::mem::take(self);
        let (next, effect) = match (prev, gesture) {
            (SelectionState::PlacingNode, Gesture::ToggleAddNode) => {
                (SelectionState::Idle, Effect::None)
            }
            (_, Gesture::ToggleAddNode) => (SelectionState::PlacingNode, Effect::None),

            (s, Gesture::ToggleConnect) if s.is_selecting() => (SelectionState::Idle, Effect::None),
            (_, Gesture::ToggleConnect) => (SelectionState::AwaitingFirstEndpoint, Effect::None),

            (_, Gesture::Cancel) => (SelectionState::Idle, Effect::None),

            (SelectionState::PlacingNode, Gesture::MapClick(at)) => {
                (SelectionState::Idle, Effect::PlaceNode(at))
            }
            (s, Gesture::MapClick(_)) => (s, Effect::None),

            (SelectionState::AwaitingFirstEndpoint, Gesture::NodeClick(id)) => {
                (SelectionState::AwaitingSecondEndpoint(id), Effect::None)
            }
            (SelectionState::AwaitingSecondEndpoint(first), Gesture::NodeClick(id)) => {
                if first == id {
                    (SelectionState::AwaitingSecondEndpoint(first), Effect::None)
                } else {
                    (
                        SelectionState::Idle,
                        Effect::Connect {
                            from: first,
                            to: id,
                        },
                    )
                }
            }
            (s, Gesture::NodeClick(id)) => (s, Effect::OpenNodeInfo(id)),
        };
        *self = next;
        effect
    }
}
