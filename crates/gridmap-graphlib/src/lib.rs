#![forbid(unsafe_code)]

//! Graph container APIs used by `gridmap-core`.
//!
//! Nodes are keyed by caller-chosen string ids and keep insertion order. Edges are keyed by
//! sequential [`EdgeId`]s handed out by the graph itself; ids are never reused for the
//! lifetime of a graph value, even across removals, so a stale id can never address a newer
//! edge.

pub mod graph;

pub use graph::{EdgeId, EdgeRef, EdgeRejection, Graph, GraphOptions};
