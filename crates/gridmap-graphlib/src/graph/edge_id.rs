//! Edge identity types.

use std::fmt;

/// Sequential edge identity, unique within one [`Graph`](super::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub u64);

impl EdgeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Borrowed view of one stored edge.
#[derive(Debug, Clone, Copy)]
pub struct EdgeRef<'a, E> {
    pub id: EdgeId,
    pub v: &'a str,
    pub w: &'a str,
    pub label: &'a E,
}

/// Why [`Graph::add_edge`](super::Graph::add_edge) refused an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeRejection {
    MissingEndpoint,
    SelfLoop,
    Duplicate,
}

impl fmt::Display for EdgeRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeRejection::MissingEndpoint => write!(f, "edge endpoint is not in the graph"),
            EdgeRejection::SelfLoop => write!(f, "self loops are not allowed"),
            EdgeRejection::Duplicate => write!(f, "edge already exists for this endpoint pair"),
        }
    }
}

impl std::error::Error for EdgeRejection {}
