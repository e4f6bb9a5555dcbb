//! Internal storage entries for [`Graph`](super::Graph).

use super::EdgeId;

#[derive(Debug, Clone)]
pub(in crate::graph) struct NodeEntry<N> {
    pub(in crate::graph) id: String,
    pub(in crate::graph) label: N,
}

#[derive(Debug, Clone)]
pub(in crate::graph) struct EdgeEntry<E> {
    pub(in crate::graph) id: EdgeId,
    pub(in crate::graph) v: String,
    pub(in crate::graph) w: String,
    pub(in crate::graph) label: E,
}
