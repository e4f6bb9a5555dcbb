//! Graph configuration options.

/// Both relaxations are off by default: one edge per ordered pair, no self loops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphOptions {
    /// Allow several edges between the same ordered `(v, w)` pair.
    pub multigraph: bool,
    /// Allow edges whose endpoints are the same node.
    pub self_loops: bool,
}
