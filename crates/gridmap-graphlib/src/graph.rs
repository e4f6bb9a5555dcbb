//! Graph container APIs used by `gridmap-core`.
//!
//! Storage is two insertion-ordered vectors (nodes and edges) plus hash indexes from id to
//! slot. Removal shifts the tail and rewrites the affected index slots, so iteration order
//! always matches insertion order.

mod edge_id;
mod entries;
mod options;

pub use edge_id::{EdgeId, EdgeRef, EdgeRejection};
pub use options::GraphOptions;

use entries::{EdgeEntry, NodeEntry};
use rustc_hash::FxBuildHasher;

type HashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    options: GraphOptions,

    nodes: Vec<NodeEntry<N>>,
    node_index: HashMap<String, usize>,

    edges: Vec<EdgeEntry<E>>,
    edge_index: HashMap<EdgeId, usize>,

    next_edge_id: u64,
}

impl<N, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::new(GraphOptions::default())
    }
}

impl<N, E> Graph<N, E> {
    pub fn new(options: GraphOptions) -> Self {
        Self {
            options,
            nodes: Vec::new(),
            node_index: HashMap::default(),
            edges: Vec::new(),
            edge_index: HashMap::default(),
            next_edge_id: 1,
        }
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Inserts or replaces a node label. Returns the previous label when the id existed.
    pub fn set_node(&mut self, id: impl Into<String>, label: N) -> Option<N> {
        let id = id.into();
        if let Some(&idx) = self.node_index.get(&id) {
            return Some(std::mem::replace(&mut self.nodes[idx].label, label));
        }
        let idx = self.nodes.len();
        self.nodes.push(NodeEntry {
            id: id.clone(),
            label,
        });
        self.node_index.insert(id, idx);
        None
    }

    pub fn node(&self, id: &str) -> Option<&N> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx].label)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut N> {
        self.node_index
            .get(id)
            .copied()
            .map(move |idx| &mut self.nodes[idx].label)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &N)> {
        self.nodes.iter().map(|n| (n.id.as_str(), &n.label))
    }

    pub fn for_each_node_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&str, &mut N),
    {
        for n in &mut self.nodes {
            f(n.id.as_str(), &mut n.label);
        }
    }

    /// Removes a node and every incident edge. The removed edges are returned in insertion
    /// order so callers can release resources attached to their labels.
    pub fn remove_node(&mut self, id: &str) -> Option<(N, Vec<(EdgeId, E)>)> {
        let idx = self.node_index.remove(id)?;
        let entry = self.nodes.remove(idx);
        for i in idx..self.nodes.len() {
            let node_id = self.nodes[i].id.as_str();
            if let Some(slot) = self.node_index.get_mut(node_id) {
                *slot = i;
            }
        }

        let removed = self.retain_edges(|e| e.v != id && e.w != id);
        Some((entry.label, removed))
    }

    /// Re-keys a node, rewriting every edge endpoint that referenced the old id.
    ///
    /// Fails (returns `false`) when `from` is unknown or `to` is already taken.
    pub fn rename_node(&mut self, from: &str, to: impl Into<String>) -> bool {
        let to = to.into();
        if from == to {
            return self.has_node(from);
        }
        if self.node_index.contains_key(&to) {
            return false;
        }
        let Some(idx) = self.node_index.remove(from) else {
            return false;
        };
        self.nodes[idx].id = to.clone();
        self.node_index.insert(to.clone(), idx);

        for e in &mut self.edges {
            if e.v == from {
                e.v = to.clone();
            }
            if e.w == from {
                e.w = to.clone();
            }
        }
        true
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&E> {
        self.edge_index.get(&id).map(|&idx| &self.edges[idx].label)
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut E> {
        self.edge_index
            .get(&id)
            .copied()
            .map(move |idx| &mut self.edges[idx].label)
    }

    pub fn edge_ref(&self, id: EdgeId) -> Option<EdgeRef<'_, E>> {
        self.edge_index.get(&id).map(|&idx| {
            let e = &self.edges[idx];
            EdgeRef {
                id: e.id,
                v: e.v.as_str(),
                w: e.w.as_str(),
                label: &e.label,
            }
        })
    }

    pub fn endpoints(&self, id: EdgeId) -> Option<(&str, &str)> {
        self.edge_ref(id).map(|e| (e.v, e.w))
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_, E>> {
        self.edges.iter().map(|e| EdgeRef {
            id: e.id,
            v: e.v.as_str(),
            w: e.w.as_str(),
            label: &e.label,
        })
    }

    pub fn edge_ids(&self) -> Vec<EdgeId> {
        self.edges.iter().map(|e| e.id).collect()
    }

    /// Adds a directed edge `v -> w` and returns its freshly allocated id.
    pub fn add_edge(&mut self, v: &str, w: &str, label: E) -> Result<EdgeId, EdgeRejection> {
        if !self.has_node(v) || !self.has_node(w) {
            return Err(EdgeRejection::MissingEndpoint);
        }
        if v == w && !self.options.self_loops {
            return Err(EdgeRejection::SelfLoop);
        }
        if !self.options.multigraph && !self.edges_between(v, w).is_empty() {
            return Err(EdgeRejection::Duplicate);
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        let idx = self.edges.len();
        self.edges.push(EdgeEntry {
            id,
            v: v.to_string(),
            w: w.to_string(),
            label,
        });
        self.edge_index.insert(id, idx);
        Ok(id)
    }

    fn remove_edge_at_index(&mut self, idx: usize) -> EdgeEntry<E> {
        let entry = self.edges.remove(idx);
        self.edge_index.remove(&entry.id);
        for i in idx..self.edges.len() {
            let id = self.edges[i].id;
            if let Some(slot) = self.edge_index.get_mut(&id) {
                *slot = i;
            }
        }
        entry
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<E> {
        let idx = self.edge_index.get(&id).copied()?;
        Some(self.remove_edge_at_index(idx).label)
    }

    /// Keeps only the edges for which `keep` returns `true`; returns the dropped ones.
    pub fn retain_edges<F>(&mut self, mut keep: F) -> Vec<(EdgeId, E)>
    where
        F: FnMut(EdgeRef<'_, E>) -> bool,
    {
        let mut kept = Vec::with_capacity(self.edges.len());
        let mut removed = Vec::new();
        for e in self.edges.drain(..) {
            let view = EdgeRef {
                id: e.id,
                v: e.v.as_str(),
                w: e.w.as_str(),
                label: &e.label,
            };
            if keep(view) {
                kept.push(e);
            } else {
                removed.push((e.id, e.label));
            }
        }
        self.edges = kept;

        if !removed.is_empty() {
            self.edge_index.clear();
            for (i, e) in self.edges.iter().enumerate() {
                self.edge_index.insert(e.id, i);
            }
        }
        removed
    }

    /// Ids of every edge with `v` as either endpoint, in insertion order.
    pub fn node_edges(&self, v: &str) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.v == v || e.w == v)
            .map(|e| e.id)
            .collect()
    }

    /// Ids of every edge going exactly `v -> w`.
    pub fn edges_between(&self, v: &str, w: &str) -> Vec<EdgeId> {
        self.edges
            .iter()
            .filter(|e| e.v == v && e.w == w)
            .map(|e| e.id)
            .collect()
    }
}
