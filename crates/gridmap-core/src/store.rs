//! In-memory topology: nodes, edges and derived edge health.

use std::collections::HashSet;
use std::time::Duration;

use gridmap_graphlib::{EdgeId, EdgeRef, EdgeRejection, Graph, GraphOptions};

use crate::error::{Error, Result};
use crate::geom::{self, LatLng};
use crate::health::{self, BlinkTimers};
use crate::model::{Edge, EdgePath, Node, NodeAttributes, NodeId, Status, SyncState};

/// What a reconciliation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub nodes: usize,
    pub removed_nodes: Vec<NodeId>,
    pub pruned_edges: Vec<EdgeId>,
    pub regenerated_edges: Vec<EdgeId>,
}

/// Owns every node and edge plus the blink scheduler their health drives.
#[derive(Debug)]
pub struct TopologyStore<T> {
    graph: Graph<Node, Edge>,
    timers: T,
    blink_interval: Duration,
}

impl<T: BlinkTimers> TopologyStore<T> {
    pub fn new(timers: T, blink_interval: Duration) -> Self {
        Self {
            graph: Graph::new(GraphOptions {
                multigraph: true,
                self_loops: false,
            }),
            timers,
            blink_interval,
        }
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.graph.has_node(id.as_str())
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.graph.node(id.as_str())
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.nodes().map(|(_, n)| n)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.graph.edge(id)
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_, Edge>> {
        self.graph.edges()
    }

    pub fn edge_endpoints(&self, id: EdgeId) -> Option<(NodeId, NodeId)> {
        self.graph
            .endpoints(id)
            .map(|(v, w)| (NodeId::from(v), NodeId::from(w)))
    }

    pub fn edges_between(&self, from: &NodeId, to: &NodeId) -> Vec<EdgeId> {
        self.graph.edges_between(from.as_str(), to.as_str())
    }

    /// Rendered coordinates of an edge, following its endpoints' current positions.
    pub fn edge_path(&self, id: EdgeId) -> Option<Vec<LatLng>> {
        let e = self.graph.edge_ref(id)?;
        let a = self.graph.node(e.v)?.position;
        let b = self.graph.node(e.w)?.position;
        Some(match e.label.path {
            EdgePath::Straight => geom::straight_path(a, b),
            EdgePath::Zigzag {
                segments,
                variation,
            } => geom::zigzag_path(a, b, segments, variation),
        })
    }

    pub fn down_edge_count(&self) -> usize {
        self.graph.edges().filter(|e| e.label.both_down).count()
    }

    /// Inserts a node under a fresh temporary id, status `Running` unless given.
    pub fn add_node(&mut self, position: LatLng, attrs: &NodeAttributes) -> Result<NodeId> {
        if !position.is_finite() {
            return Err(Error::InvalidAttributes {
                message: "coordinates must be finite".to_string(),
            });
        }
        let id = NodeId::temporary();
        let mut node = Node::new(id.clone(), String::new(), position);
        node.apply(attrs);
        node.position = position;
        node.sync = SyncState::Pending;
        tracing::debug!(node = %id, "node added");
        self.graph.set_node(id.as_str(), node);
        Ok(id)
    }

    /// Inserts or replaces a node verbatim, then re-derives health around it.
    pub fn insert_node(&mut self, node: Node) {
        let id = node.id.clone();
        self.graph.set_node(id.as_str(), node);
        self.refresh_node_edges(&id);
    }

    pub fn update_node(&mut self, id: &NodeId, attrs: &NodeAttributes) -> Result<()> {
        let Some(node) = self.graph.node_mut(id.as_str()) else {
            return Err(Error::UnknownNode { id: id.clone() });
        };
        if let Some(p) = attrs.position {
            if !p.is_finite() {
                return Err(Error::InvalidAttributes {
                    message: "coordinates must be finite".to_string(),
                });
            }
        }
        node.apply(attrs);
        tracing::debug!(node = %id, status = %node.status, "node updated");
        self.refresh_node_edges(id);
        Ok(())
    }

    pub fn set_node_sync(&mut self, id: &NodeId, sync: SyncState) -> bool {
        match self.graph.node_mut(id.as_str()) {
            Some(node) => {
                node.sync = sync;
                true
            }
            None => false,
        }
    }

    pub fn set_edge_sync(&mut self, id: EdgeId, sync: SyncState) -> bool {
        match self.graph.edge_mut(id) {
            Some(edge) => {
                edge.sync = sync;
                true
            }
            None => false,
        }
    }

    /// Re-keys a temporary node under its server id. Edges follow.
    pub fn confirm_node(&mut self, temp: &NodeId, server: &NodeId) -> bool {
        if temp != server && !self.graph.rename_node(temp.as_str(), server.as_str()) {
            return false;
        }
        if let Some(node) = self.graph.node_mut(server.as_str()) {
            node.id = server.clone();
            node.sync = SyncState::Confirmed;
        }
        let temp_str = temp.as_str();
        self.graph.for_each_node_mut(|_, n| {
            if n.previous.as_ref().is_some_and(|p| p.as_str() == temp_str) {
                n.previous = Some(server.clone());
            }
        });
        tracing::debug!(from = %temp, to = %server, "node confirmed");
        true
    }

    pub fn add_edge(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        path: EdgePath,
        sync: SyncState,
    ) -> Result<EdgeId> {
        let both_down = match (self.node(from), self.node(to)) {
            (Some(a), Some(b)) if from != to => health::both_endpoints_down(a.status, b.status),
            _ => {
                return Err(Error::InvalidEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                });
            }
        };
        let id = self
            .graph
            .add_edge(from.as_str(), to.as_str(), Edge::new(path, sync))
            .map_err(|rejection: EdgeRejection| {
                tracing::warn!(%rejection, "edge rejected");
                Error::InvalidEndpoint {
                    from: from.clone(),
                    to: to.clone(),
                }
            })?;
        if let Some(edge) = self.graph.edge_mut(id) {
            health::apply_health(id, edge, both_down, &mut self.timers, self.blink_interval);
        }
        tracing::debug!(edge = id.get(), %from, %to, both_down, "edge added");
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<(NodeId, NodeId, Edge)> {
        let (from, to) = self
            .edge_endpoints(id)
            .ok_or(Error::UnknownEdge { id: id.get() })?;
        let mut edge = self
            .graph
            .remove_edge(id)
            .ok_or(Error::UnknownEdge { id: id.get() })?;
        health::release(&mut edge, &mut self.timers);
        tracing::debug!(edge = id.get(), "edge removed");
        Ok((from, to, edge))
    }

    /// Removes a node and every incident edge, canceling their timers.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<(Node, Vec<EdgeId>)> {
        let (node, edges) = self
            .graph
            .remove_node(id.as_str())
            .ok_or_else(|| Error::UnknownNode { id: id.clone() })?;
        let removed = self.release_all(edges);
        tracing::debug!(node = %id, edges = removed.len(), "node removed");
        Ok((node, removed))
    }

    /// Flips opacity of a blinking edge. Ticks for unknown or healthy edges are ignored.
    pub fn blink_tick(&mut self, id: EdgeId, dim: f64) -> bool {
        self.graph
            .edge_mut(id)
            .is_some_and(|edge| health::toggle_blink(edge, dim))
    }

    /// Replaces the node set with `remote` and re-derives every edge.
    ///
    /// Local nodes that are still temporary survive; other local nodes missing from `remote`
    /// are removed along with their edges. The remote store records one previous-node reference
    /// per node, and those `previous -> node` pairs are the only links it backs:
    ///
    /// - a backed pair with no edge yet gets one `Confirmed` edge;
    /// - a `Confirmed` edge survives only as the first edge of a backed pair;
    /// - `Pending`, `Failed` and `Local` edges are kept as they are.
    ///
    /// Pairs in `unsent_disconnects` are treated as unbacked, so a link removed locally is not
    /// brought back before its removal reaches the remote store.
    pub fn reconcile(
        &mut self,
        remote: Vec<Node>,
        unsent_disconnects: &[(NodeId, NodeId)],
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let incoming: HashSet<String> = remote.iter().map(|n| n.id.to_string()).collect();
        let vanished: Vec<String> = self
            .graph
            .nodes()
            .filter(|(id, n)| !incoming.contains(*id) && !n.id.is_temporary())
            .map(|(id, _)| id.to_string())
            .collect();
        for id in vanished {
            if let Some((_, edges)) = self.graph.remove_node(&id) {
                report.pruned_edges.extend(self.release_all(edges));
            }
            report.removed_nodes.push(NodeId::from(id));
        }

        let mut links: Vec<(NodeId, NodeId)> = Vec::new();
        for node in &remote {
            let Some(from) = &node.previous else {
                continue;
            };
            let pair = (from.clone(), node.id.clone());
            if from != &node.id
                && incoming.contains(from.as_str())
                && !unsent_disconnects.contains(&pair)
                && !links.contains(&pair)
            {
                links.push(pair);
            }
        }

        for mut node in remote {
            node.sync = SyncState::Confirmed;
            let key = node.id.to_string();
            self.graph.set_node(key, node);
        }

        let mut claimed: HashSet<(String, String)> = HashSet::new();
        let stale = self.graph.retain_edges(|e| {
            if e.label.sync != SyncState::Confirmed {
                return true;
            }
            let backed = links
                .iter()
                .any(|(from, to)| from.as_str() == e.v && to.as_str() == e.w);
            backed && claimed.insert((e.v.to_string(), e.w.to_string()))
        });
        if !stale.is_empty() {
            tracing::debug!(edges = stale.len(), "dropping links the remote store no longer backs");
        }
        report.pruned_edges.extend(self.release_all(stale));

        for (from, to) in &links {
            let existing = self.edges_between(from, to);
            if existing.is_empty() {
                if let Ok(id) = self.add_edge(from, to, EdgePath::Straight, SyncState::Confirmed) {
                    report.regenerated_edges.push(id);
                }
                continue;
            }
            if claimed.contains(&(from.to_string(), to.to_string())) {
                continue;
            }
            // The remote link exists, so a pending or failed connect for it has landed.
            let landed = existing
                .into_iter()
                .find(|id| self.graph.edge(*id).is_some_and(|e| !e.sync.is_local()));
            if let Some(edge) = landed.and_then(|id| self.graph.edge_mut(id)) {
                edge.sync = SyncState::Confirmed;
            }
        }

        self.refresh_all();
        report.nodes = self.graph.node_count();
        tracing::info!(
            nodes = report.nodes,
            edges = self.graph.edge_count(),
            pruned = report.pruned_edges.len(),
            regenerated = report.regenerated_edges.len(),
            "topology reconciled"
        );
        report
    }

    pub fn refresh_all(&mut self) {
        for id in self.graph.edge_ids() {
            self.refresh_edge(id);
        }
    }

    fn refresh_node_edges(&mut self, id: &NodeId) {
        for edge in self.graph.node_edges(id.as_str()) {
            self.refresh_edge(edge);
        }
    }

    fn refresh_edge(&mut self, id: EdgeId) {
        let Some((v, w)) = self.graph.endpoints(id) else {
            return;
        };
        let status = |n: Option<&Node>| n.map(|n| n.status).unwrap_or(Status::Unknown);
        let both_down = health::both_endpoints_down(
            status(self.graph.node(v)),
            status(self.graph.node(w)),
        );
        if let Some(edge) = self.graph.edge_mut(id) {
            health::apply_health(id, edge, both_down, &mut self.timers, self.blink_interval);
        }
    }

    fn release_all(&mut self, edges: Vec<(EdgeId, Edge)>) -> Vec<EdgeId> {
        edges
            .into_iter()
            .map(|(id, mut edge)| {
                health::release(&mut edge, &mut self.timers);
                id
            })
            .collect()
    }
}
