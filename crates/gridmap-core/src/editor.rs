//! The editor session: gestures in, snapshots out.

use std::time::{Duration, Instant};

use rand::Rng;
use rand::seq::SliceRandom;

use gridmap_graphlib::EdgeId;

use crate::config::EditorConfig;
use crate::demo;
use crate::dialog::EditOutcome;
use crate::error::{Error, Result};
use crate::geom::{Bounds, LatLng};
use crate::health::{BlinkTimers, ManualTimers};
use crate::model::{EdgePath, Node, NodeAttributes, NodeId, SyncState};
use crate::notice::{NoticeKind, Notices};
use crate::popup::{InfoDisplay, InfoTarget};
use crate::ready::{MapReadyRegistry, ReadyState};
use crate::selection::{Effect, Gesture, SelectionState};
use crate::snapshot::{self, Snapshot};
use crate::store::{ReconcileReport, TopologyStore};
use crate::sync::{Mutation, Outbox};

/// What a node click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeClick {
    Ignored,
    FirstEndpoint(NodeId),
    Connected(EdgeId),
    InfoOpened(NodeId),
}

#[derive(Debug)]
pub struct Editor<T> {
    config: EditorConfig,
    store: TopologyStore<T>,
    selection: SelectionState,
    info: InfoDisplay,
    notices: Notices,
    ready: MapReadyRegistry,
    pub(crate) outbox: Outbox,
}

impl Editor<ManualTimers> {
    /// Editor driven by a [`ManualTimers`] clock.
    pub fn headless(config: EditorConfig) -> Self {
        Self::new(config, ManualTimers::new())
    }

    /// Advances the manual clock and applies every resulting blink tick.
    pub fn advance_timers(&mut self, elapsed: Duration) -> usize {
        let fired = self.store.timers_mut().advance(elapsed);
        fired.into_iter().filter(|id| self.blink_tick(*id)).count()
    }
}

impl<T: BlinkTimers> Editor<T> {
    pub fn new(config: EditorConfig, timers: T) -> Self {
        let store = TopologyStore::new(timers, config.blink_interval());
        let notices = Notices::new(config.notice_ttl());
        Self {
            config,
            store,
            selection: SelectionState::Idle,
            info: InfoDisplay::new(),
            notices,
            ready: MapReadyRegistry::new(),
            outbox: Outbox::default(),
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &TopologyStore<T> {
        &self.store
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn info(&self) -> &InfoDisplay {
        &self.info
    }

    pub fn notices(&self) -> &Notices {
        &self.notices
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Shared readiness registry; clone it to hand to other initializers.
    pub fn map_ready(&self) -> &MapReadyRegistry {
        &self.ready
    }

    pub fn mark_map_ready(&mut self) -> usize {
        self.ready.mark_ready()
    }

    /// Records that the map resource failed; the editor stays non-interactive.
    pub fn mark_map_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.ready.mark_failed(message.clone()) {
            self.notices.push(NoticeKind::Error, message);
        }
    }

    fn ensure_interactive(&self) -> Result<()> {
        match self.ready.state() {
            ReadyState::Ready => Ok(()),
            ReadyState::Pending => Err(Error::MapNotReady),
            ReadyState::Failed(message) => Err(Error::ResourceLoadFailed { message }),
        }
    }

    pub fn toggle_add_node(&mut self) -> Result<()> {
        self.ensure_interactive()?;
        self.selection.handle(Gesture::ToggleAddNode);
        Ok(())
    }

    pub fn toggle_connect(&mut self) -> Result<()> {
        self.ensure_interactive()?;
        self.selection.handle(Gesture::ToggleConnect);
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.ensure_interactive()?;
        self.selection.handle(Gesture::Cancel);
        Ok(())
    }

    /// A click on empty map. Creates a node when placing.
    pub fn click_map(&mut self, at: LatLng) -> Result<Option<NodeId>> {
        self.ensure_interactive()?;
        match self.selection.handle(Gesture::MapClick(at)) {
            Effect::PlaceNode(at) => {
                let kind = self.config.colors.types.keys().next().cloned().unwrap_or_default();
                self.place_node(at, kind).map(Some)
            }
            _ => Ok(None),
        }
    }

    pub fn click_node(&mut self, id: &NodeId) -> Result<NodeClick> {
        self.ensure_interactive()?;
        if !self.store.contains_node(id) {
            return Err(Error::UnknownNode { id: id.clone() });
        }
        match self.selection.handle(Gesture::NodeClick(id.clone())) {
            Effect::Connect { from, to } => self.add_edge(&from, &to).map(NodeClick::Connected),
            Effect::OpenNodeInfo(id) => {
                self.info.open(InfoTarget::Node(id.clone()));
                Ok(NodeClick::InfoOpened(id))
            }
            Effect::None => Ok(match &self.selection {
                SelectionState::AwaitingSecondEndpoint(first) => {
                    NodeClick::FirstEndpoint(first.clone())
                }
                _ => NodeClick::Ignored,
            }),
            Effect::PlaceNode(_) => Ok(NodeClick::Ignored),
        }
    }

    /// Opens the connection popup. Ignored while a mode is active.
    pub fn click_edge(&mut self, id: EdgeId) -> Result<bool> {
        self.ensure_interactive()?;
        if self.store.edge(id).is_none() {
            return Err(Error::UnknownEdge { id: id.get() });
        }
        if self.selection != SelectionState::Idle {
            return Ok(false);
        }
        self.info.open(InfoTarget::Edge(id));
        Ok(true)
    }

    pub fn close_info(&mut self) -> Option<InfoTarget> {
        self.info.close_active()
    }

    /// Pin drag finished: move the node and persist the new position.
    pub fn drag_node_end(&mut self, id: &NodeId, to: LatLng) -> Result<()> {
        self.ensure_interactive()?;
        self.update_node(id, &NodeAttributes::position(to))
    }

    /// Applies what the edit dialog returned. `Ok(false)` when it was canceled.
    pub fn apply_edit_outcome(&mut self, id: &NodeId, outcome: EditOutcome) -> Result<bool> {
        match outcome {
            EditOutcome::Canceled => Ok(false),
            EditOutcome::Updated(edit) => {
                edit.validate()?;
                self.update_node(id, &edit.attributes)?;
                Ok(true)
            }
        }
    }

    /// Local update plus a queued remote update.
    pub fn update_node(&mut self, id: &NodeId, attrs: &NodeAttributes) -> Result<()> {
        self.store.update_node(id, attrs)?;
        if self.store.node(id).is_some_and(|n| !n.sync.is_local()) {
            self.store.set_node_sync(id, SyncState::Pending);
            self.outbox.push(Mutation::UpdateNode(id.clone()));
        }
        Ok(())
    }

    /// Optimistically inserts a node and queues its creation.
    pub fn add_node(&mut self, position: LatLng, attrs: &NodeAttributes) -> Result<NodeId> {
        let id = self.store.add_node(position, attrs)?;
        self.outbox.push(Mutation::CreateNode(id.clone()));
        Ok(id)
    }

    fn place_node(&mut self, at: LatLng, kind: String) -> Result<NodeId> {
        let attrs = NodeAttributes {
            name: Some(format!("Provider {}", self.store.node_count() + 1)),
            kind: Some(kind),
            ..Default::default()
        };
        self.add_node(at, &attrs)
    }

    /// Connects two nodes with a straight edge and queues the remote link.
    /// Edges touching a never-persisted node stay local.
    pub fn add_edge(&mut self, from: &NodeId, to: &NodeId) -> Result<EdgeId> {
        let local = [from, to]
            .iter()
            .any(|id| self.store.node(id).is_some_and(|n| n.sync.is_local()));
        let sync = if local {
            SyncState::Local
        } else {
            SyncState::Pending
        };
        let id = self.store.add_edge(from, to, EdgePath::Straight, sync)?;
        if !local {
            self.outbox.push(Mutation::Connect { edge: id });
        }
        Ok(id)
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<()> {
        let (from, to, edge) = self.store.remove_edge(id)?;
        if self.info.is_showing_edge(id) {
            self.info.close_active();
        }
        let unsent = self.outbox.discard_edge(id);
        if !unsent && !edge.sync.is_local() {
            self.outbox.push(Mutation::Disconnect { from, to });
        }
        Ok(())
    }

    /// Removes a node and its edges. Temporary nodes never reach the remote store.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<()> {
        let (node, edges) = self.store.remove_node(id)?;
        for edge in &edges {
            self.outbox.discard_edge(*edge);
        }
        self.forget_removed(&[id.clone()], &edges);
        if node.id.is_temporary() {
            self.outbox.discard_node(id);
        } else if !node.sync.is_local() {
            self.outbox.discard_node(id);
            self.outbox.push(Mutation::DeleteNode(id.clone()));
        }
        Ok(())
    }

    /// Host timer callback.
    pub fn blink_tick(&mut self, id: EdgeId) -> bool {
        self.store.blink_tick(id, self.config.blink_dim_opacity)
    }

    /// Places a node of random type uniformly inside `bounds`.
    pub fn add_random_node<R: Rng + ?Sized>(&mut self, bounds: &Bounds, rng: &mut R) -> Result<NodeId> {
        self.ensure_interactive()?;
        let types: Vec<&String> = self.config.colors.types.keys().collect();
        let kind = types
            .choose(rng)
            .map(|s| (*s).clone())
            .unwrap_or_default();
        let at = bounds.random_point(rng);
        self.place_node(at, kind)
    }

    /// Joins two distinct random nodes with a local zigzag. `None` with fewer than two nodes.
    pub fn connect_random_pair<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<EdgeId>> {
        self.ensure_interactive()?;
        let ids: Vec<NodeId> = self.store.nodes().map(|n| n.id.clone()).collect();
        let picked: Vec<&NodeId> = ids.choose_multiple(rng, 2).collect();
        let [from, to] = picked.as_slice() else {
            return Ok(None);
        };
        let path = EdgePath::Zigzag {
            segments: self.config.zigzag_segments,
            variation: self.config.zigzag_variation,
        };
        self.store
            .add_edge(from, to, path, SyncState::Local)
            .map(Some)
    }

    /// Loads the offline demo topology.
    pub fn seed_demo(&mut self) {
        for node in demo::demo_nodes() {
            self.store.insert_node(node);
        }
    }

    /// Replaces local state with a remote node list. Links with an unsent removal stay removed.
    pub fn reconcile(&mut self, remote: Vec<Node>) -> ReconcileReport {
        let unsent = self.outbox.unsent_disconnects();
        let report = self.store.reconcile(remote, &unsent);
        self.forget_removed(&report.removed_nodes, &report.pruned_edges);
        report
    }

    fn forget_removed(&mut self, nodes: &[NodeId], edges: &[EdgeId]) {
        let stale_info = match self.info.active() {
            Some(InfoTarget::Node(n)) => nodes.contains(n),
            Some(InfoTarget::Edge(e)) => edges.contains(e),
            None => false,
        };
        if stale_info {
            self.info.close_active();
        }
        let lost_first = self
            .selection
            .highlighted()
            .is_some_and(|first| nodes.contains(first));
        if lost_first {
            self.selection = SelectionState::AwaitingFirstEndpoint;
        }
    }

    pub fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        self.notices.push(kind, message)
    }

    pub fn dismiss_notice(&mut self, id: u64) -> bool {
        self.notices.dismiss(id)
    }

    pub fn prune_notices(&mut self, now: Instant) -> usize {
        self.notices.prune_at(now)
    }

    pub fn snapshot(&self) -> Snapshot {
        snapshot::build(self)
    }

    pub(crate) fn store_mut(&mut self) -> &mut TopologyStore<T> {
        &mut self.store
    }
}
