//! Outbox of durable mutations and the adapter that pushes them to the remote store.
//!
//! Gestures never await. They mutate the store optimistically and append a [`Mutation`] to the
//! editor's [`Outbox`]. A host later drives [`SyncAdapter::flush`] on its event loop, which
//! resolves each mutation against the current store (so a connection queued while an endpoint
//! was temporary goes out with the server id), sends it, and finishes with one reconciling
//! refetch if anything succeeded.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use indexmap::IndexMap;

use gridmap_graphlib::EdgeId;

use crate::editor::Editor;
use crate::error::{Error, RemoteError, Result};
use crate::health::BlinkTimers;
use crate::model::{Node, NodeAttributes, NodeId, Status, SyncState};
use crate::notice::NoticeKind;
use crate::store::ReconcileReport;

type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A durable local change awaiting the remote store. Targets are resolved at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateNode(NodeId),
    UpdateNode(NodeId),
    DeleteNode(NodeId),
    Connect { edge: EdgeId },
    Disconnect { from: NodeId, to: NodeId },
}

impl Mutation {
    fn touches_node(&self, id: &NodeId) -> bool {
        match self {
            Mutation::CreateNode(n) | Mutation::UpdateNode(n) | Mutation::DeleteNode(n) => n == id,
            Mutation::Disconnect { from, to } => from == id || to == id,
            Mutation::Connect { .. } => false,
        }
    }

    fn remap(&mut self, temp: &NodeId, server: &NodeId) {
        let swap = |n: &mut NodeId| {
            if n == temp {
                *n = server.clone();
            }
        };
        match self {
            Mutation::CreateNode(n) | Mutation::UpdateNode(n) | Mutation::DeleteNode(n) => swap(n),
            Mutation::Disconnect { from, to } => {
                swap(from);
                swap(to);
            }
            Mutation::Connect { .. } => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEntry {
    pub mutation: Mutation,
    pub attempts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Outbox {
    queued: VecDeque<OutboxEntry>,
    failed: Vec<OutboxEntry>,
}

impl Outbox {
    /// Queues a mutation. A second update for a node that already has one queued is dropped.
    pub fn push(&mut self, mutation: Mutation) {
        if matches!(mutation, Mutation::UpdateNode(_))
            && self.queued.iter().any(|e| e.mutation == mutation)
        {
            return;
        }
        self.queued.push_back(OutboxEntry {
            mutation,
            attempts: 0,
        });
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    pub fn queued(&self) -> impl Iterator<Item = &OutboxEntry> {
        self.queued.iter()
    }

    pub fn failed(&self) -> &[OutboxEntry] {
        &self.failed
    }

    /// Drops any connect for `edge`. Returns `true` when one was still unsent.
    pub fn discard_edge(&mut self, edge: EdgeId) -> bool {
        let target = Mutation::Connect { edge };
        let before = self.queued.len() + self.failed.len();
        self.queued.retain(|e| e.mutation != target);
        self.failed.retain(|e| e.mutation != target);
        before != self.queued.len() + self.failed.len()
    }

    /// Drops every create/update/delete/disconnect naming `id`.
    pub fn discard_node(&mut self, id: &NodeId) {
        self.queued.retain(|e| !e.mutation.touches_node(id));
        self.failed.retain(|e| !e.mutation.touches_node(id));
    }

    /// Links removed locally whose disconnect is still queued or failed.
    pub fn unsent_disconnects(&self) -> Vec<(NodeId, NodeId)> {
        self.queued
            .iter()
            .chain(&self.failed)
            .filter_map(|e| match &e.mutation {
                Mutation::Disconnect { from, to } => Some((from.clone(), to.clone())),
                _ => None,
            })
            .collect()
    }

    fn remap(&mut self, temp: &NodeId, server: &NodeId) {
        for e in self.queued.iter_mut().chain(self.failed.iter_mut()) {
            e.mutation.remap(temp, server);
        }
    }

    fn pop_front(&mut self) -> Option<OutboxEntry> {
        self.queued.pop_front()
    }

    fn push_front(&mut self, entry: OutboxEntry) {
        self.queued.push_front(entry);
    }

    fn fail(&mut self, entry: OutboxEntry) {
        self.failed.push(entry);
    }

    fn requeue(&mut self, entry: OutboxEntry) {
        self.queued.push_back(entry);
    }
}

/// Credential / login capability of the host.
pub trait Session {
    fn credential(&self) -> Option<String>;
    fn clear_credential(&mut self);
    fn redirect_to_login(&mut self, after: Duration);
}

#[derive(Debug, Clone, Default)]
pub struct MemorySession {
    credential: Option<String>,
    redirects: Vec<Duration>,
}

impl MemorySession {
    pub fn signed_in(token: impl Into<String>) -> Self {
        Self {
            credential: Some(token.into()),
            redirects: Vec::new(),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, token: impl Into<String>) {
        self.credential = Some(token.into());
    }

    /// Every requested login redirect, with its delay.
    pub fn redirects(&self) -> &[Duration] {
        &self.redirects
    }
}

impl Session for MemorySession {
    fn credential(&self) -> Option<String> {
        self.credential.clone()
    }

    fn clear_credential(&mut self) {
        self.credential = None;
    }

    fn redirect_to_login(&mut self, after: Duration) {
        self.redirects.push(after);
    }
}

/// Remote node store.
#[allow(async_fn_in_trait)]
pub trait TopologyBackend {
    async fn fetch_nodes(&self) -> RemoteResult<Vec<Node>>;
    async fn create_node(&self, credential: &str, node: &Node) -> RemoteResult<NodeId>;
    async fn update_node(&self, credential: &str, node: &Node) -> RemoteResult<()>;
    async fn delete_node(&self, credential: &str, id: &NodeId) -> RemoteResult<()>;
    async fn connect(&self, credential: &str, from: &NodeId, to: &NodeId) -> RemoteResult<()>;
    async fn disconnect(&self, credential: &str, from: &NodeId, to: &NodeId)
    -> RemoteResult<()>;
}

#[derive(Debug, Default)]
struct MemoryState {
    nodes: IndexMap<String, Node>,
    next_id: u64,
    token: Option<String>,
    failures: VecDeque<RemoteError>,
    calls: Vec<String>,
}

/// In-process remote store. Connecting sets the target's previous-node reference, so a later
/// fetch reproduces the edge.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RefCell<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let backend = Self::new();
        {
            let mut st = backend.state.borrow_mut();
            for mut node in nodes {
                node.sync = SyncState::Confirmed;
                st.nodes.insert(node.id.to_string(), node);
            }
        }
        backend
    }

    /// Rejects mutations whose credential differs from `token` with `Unauthorized`.
    pub fn require_token(&self, token: impl Into<String>) {
        self.state.borrow_mut().token = Some(token.into());
    }

    /// Makes the next call fail with `err`. Queued failures are consumed in order.
    pub fn fail_next(&self, err: RemoteError) {
        self.state.borrow_mut().failures.push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn node(&self, id: &str) -> Option<Node> {
        self.state.borrow().nodes.get(id).cloned()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.state.borrow().nodes.values().cloned().collect()
    }

    /// Simulates an out-of-band status change on the server.
    pub fn set_status(&self, id: &str, status: Status) -> bool {
        match self.state.borrow_mut().nodes.get_mut(id) {
            Some(node) => {
                node.status = status;
                true
            }
            None => false,
        }
    }

    fn begin(&self, call: String, credential: Option<&str>) -> RemoteResult<()> {
        let mut st = self.state.borrow_mut();
        st.calls.push(call);
        if let (Some(expected), Some(given)) = (&st.token, credential) {
            if expected != given {
                return Err(RemoteError::Unauthorized);
            }
        }
        match st.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn not_found() -> RemoteError {
        RemoteError::Rejected {
            status: 404,
            reason: "Provider not found".to_string(),
        }
    }
}

impl TopologyBackend for MemoryBackend {
    async fn fetch_nodes(&self) -> RemoteResult<Vec<Node>> {
        self.begin("list".to_string(), None)?;
        Ok(self.nodes())
    }

    async fn create_node(
        &self,
        credential: &str,
        node: &Node,
    ) -> RemoteResult<NodeId> {
        self.begin(format!("create {}", node.name), Some(credential))?;
        let mut st = self.state.borrow_mut();
        st.next_id += 1;
        let id = NodeId::from(format!("n{}", st.next_id));
        let mut stored = node.clone();
        stored.id = id.clone();
        stored.sync = SyncState::Confirmed;
        st.nodes.insert(id.to_string(), stored);
        Ok(id)
    }

    async fn update_node(&self, credential: &str, node: &Node) -> RemoteResult<()> {
        self.begin(format!("update {}", node.id), Some(credential))?;
        let mut st = self.state.borrow_mut();
        let stored = st.nodes.get_mut(node.id.as_str()).ok_or_else(Self::not_found)?;
        stored.apply(&NodeAttributes::from_node(node));
        Ok(())
    }

    async fn delete_node(&self, credential: &str, id: &NodeId) -> RemoteResult<()> {
        self.begin(format!("delete {id}"), Some(credential))?;
        let mut st = self.state.borrow_mut();
        st.nodes
            .shift_remove(id.as_str())
            .map(|_| ())
            .ok_or_else(Self::not_found)
    }

    async fn connect(
        &self,
        credential: &str,
        from: &NodeId,
        to: &NodeId,
    ) -> RemoteResult<()> {
        self.begin(format!("connect {from} {to}"), Some(credential))?;
        let mut st = self.state.borrow_mut();
        if !st.nodes.contains_key(from.as_str()) {
            return Err(Self::not_found());
        }
        let target = st.nodes.get_mut(to.as_str()).ok_or_else(Self::not_found)?;
        target.previous = Some(from.clone());
        Ok(())
    }

    async fn disconnect(
        &self,
        credential: &str,
        from: &NodeId,
        to: &NodeId,
    ) -> RemoteResult<()> {
        self.begin(format!("disconnect {from} {to}"), Some(credential))?;
        let mut st = self.state.borrow_mut();
        let target = st.nodes.get_mut(to.as_str()).ok_or_else(Self::not_found)?;
        if target.previous.as_ref() == Some(from) {
            target.previous = None;
        }
        Ok(())
    }
}

/// Outcome of one [`SyncAdapter::flush`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub sent: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub reconciled: Option<ReconcileReport>,
    pub reconcile_error: Option<String>,
}

/// Outcome of [`Editor::retry_failed`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryReport {
    pub requeued: usize,
    pub discarded: usize,
}

enum Call {
    Create(Node),
    Update(Node),
    Delete(NodeId),
    Connect { from: NodeId, to: NodeId },
    Disconnect { from: NodeId, to: NodeId },
}

enum Resolution {
    Send(Call),
    Skip,
    Blocked(&'static str),
}

enum Ack {
    Created(NodeId),
    Done,
}

pub struct SyncAdapter<B, S> {
    backend: B,
    session: S,
}

impl<B: TopologyBackend, S: Session> SyncAdapter<B, S> {
    pub fn new(backend: B, session: S) -> Self {
        Self { backend, session }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Fetches the remote node list and reconciles the editor with it.
    pub async fn load_all<T: BlinkTimers>(&mut self, editor: &mut Editor<T>) -> Result<ReconcileReport> {
        match self.backend.fetch_nodes().await {
            Ok(nodes) => Ok(editor.reconcile(nodes)),
            Err(RemoteError::Unauthorized) => {
                self.expire_session(editor);
                Err(Error::SessionExpired)
            }
            Err(err) => {
                tracing::warn!(error = %err, "node list fetch failed");
                let err = Error::from(err);
                editor.notify(NoticeKind::Error, err.to_string());
                Err(err)
            }
        }
    }

    /// Sends every queued mutation in order.
    ///
    /// Without a credential nothing is sent: queued mutations move to the failed list and a
    /// login redirect is requested. An `Unauthorized` answer clears the credential, requests a
    /// redirect and stops, leaving the rest queued. Other failures are recorded and the flush
    /// continues. Any success triggers one reconciling [`load_all`](Self::load_all).
    pub async fn flush<T: BlinkTimers>(&mut self, editor: &mut Editor<T>) -> Result<FlushReport> {
        let mut report = FlushReport::default();
        if editor.outbox.is_empty() {
            return Ok(report);
        }

        let Some(credential) = self.session.credential() else {
            while let Some(entry) = editor.outbox.pop_front() {
                report.failed += 1;
                mark_failed(editor, entry, None);
            }
            let err = Error::AuthenticationRequired;
            editor.notify(NoticeKind::Error, err.to_string());
            let delay = editor.config().login_redirect_delay();
            self.session.redirect_to_login(delay);
            tracing::info!(failed = report.failed, "flush blocked: no credential");
            return Err(err);
        };

        while let Some(entry) = editor.outbox.pop_front() {
            let call = match resolve(editor, &entry.mutation) {
                Resolution::Send(call) => call,
                Resolution::Skip => {
                    report.skipped += 1;
                    continue;
                }
                Resolution::Blocked(reason) => {
                    report.failed += 1;
                    let err = RemoteError::Unavailable {
                        message: reason.to_string(),
                    };
                    mark_failed(editor, entry, Some(&err));
                    continue;
                }
            };

            report.sent += 1;
            match self.dispatch(&credential, &call).await {
                Ok(ack) => {
                    report.succeeded += 1;
                    acknowledge(editor, &entry.mutation, ack);
                }
                Err(RemoteError::Unauthorized) => {
                    editor.outbox.push_front(entry);
                    self.expire_session(editor);
                    return Err(Error::SessionExpired);
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(mutation = ?entry.mutation, error = %err, "remote call failed");
                    mark_failed(editor, entry, Some(&err));
                }
            }
        }

        if report.succeeded > 0 {
            match self.load_all(editor).await {
                Ok(reconciled) => report.reconciled = Some(reconciled),
                Err(Error::SessionExpired) => return Err(Error::SessionExpired),
                Err(err) => report.reconcile_error = Some(err.to_string()),
            }
        }
        tracing::debug!(
            sent = report.sent,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "flush finished"
        );
        Ok(report)
    }

    async fn dispatch(&self, credential: &str, call: &Call) -> RemoteResult<Ack> {
        match call {
            Call::Create(node) => self
                .backend
                .create_node(credential, node)
                .await
                .map(Ack::Created),
            Call::Update(node) => self
                .backend
                .update_node(credential, node)
                .await
                .map(|_| Ack::Done),
            Call::Delete(id) => self
                .backend
                .delete_node(credential, id)
                .await
                .map(|_| Ack::Done),
            Call::Connect { from, to } => self
                .backend
                .connect(credential, from, to)
                .await
                .map(|_| Ack::Done),
            Call::Disconnect { from, to } => self
                .backend
                .disconnect(credential, from, to)
                .await
                .map(|_| Ack::Done),
        }
    }

    fn expire_session<T: BlinkTimers>(&mut self, editor: &mut Editor<T>) {
        tracing::info!("session expired; redirecting to login");
        self.session.clear_credential();
        editor.notify(NoticeKind::Error, Error::SessionExpired.to_string());
        let delay = editor.config().login_redirect_delay();
        self.session.redirect_to_login(delay);
    }
}

fn resolve<T: BlinkTimers>(editor: &Editor<T>, mutation: &Mutation) -> Resolution {
    let store = editor.store();
    match mutation {
        Mutation::CreateNode(id) => match store.node(id) {
            Some(node) if id.is_temporary() => Resolution::Send(Call::Create(node.clone())),
            _ => Resolution::Skip,
        },
        // A temporary node's pending create already carries its latest state.
        Mutation::UpdateNode(id) => match store.node(id) {
            Some(node) if !id.is_temporary() => Resolution::Send(Call::Update(node.clone())),
            _ => Resolution::Skip,
        },
        Mutation::DeleteNode(id) if id.is_temporary() => Resolution::Skip,
        Mutation::DeleteNode(id) => Resolution::Send(Call::Delete(id.clone())),
        Mutation::Connect { edge } => match store.edge_endpoints(*edge) {
            None => Resolution::Skip,
            Some((from, to)) if from.is_temporary() || to.is_temporary() => {
                Resolution::Blocked("endpoint has not been saved yet")
            }
            Some((from, to)) => Resolution::Send(Call::Connect { from, to }),
        },
        Mutation::Disconnect { from, to } if from.is_temporary() || to.is_temporary() => {
            Resolution::Skip
        }
        Mutation::Disconnect { from, to } => Resolution::Send(Call::Disconnect {
            from: from.clone(),
            to: to.clone(),
        }),
    }
}

fn acknowledge<T: BlinkTimers>(editor: &mut Editor<T>, mutation: &Mutation, ack: Ack) {
    match (mutation, ack) {
        (Mutation::CreateNode(temp), Ack::Created(server)) => {
            editor.store_mut().confirm_node(temp, &server);
            editor.outbox.remap(temp, &server);
        }
        (Mutation::UpdateNode(id), _) => {
            editor.store_mut().set_node_sync(id, SyncState::Confirmed);
            editor.notify(NoticeKind::Success, "Provider updated successfully");
        }
        (Mutation::Connect { edge }, _) => {
            editor.store_mut().set_edge_sync(*edge, SyncState::Confirmed);
        }
        _ => {}
    }
}

/// Moves `entry` to the failed list. `err` is `None` when nothing was attempted.
fn mark_failed<T: BlinkTimers>(editor: &mut Editor<T>, mut entry: OutboxEntry, err: Option<&RemoteError>) {
    if let Some(err) = err {
        entry.attempts += 1;
        editor.notify(NoticeKind::Error, failure_message(err));
    }
    let sync = SyncState::Failed {
        attempts: entry.attempts,
    };
    match &entry.mutation {
        Mutation::CreateNode(id) | Mutation::UpdateNode(id) => {
            editor.store_mut().set_node_sync(id, sync);
        }
        Mutation::Connect { edge } => {
            editor.store_mut().set_edge_sync(*edge, sync);
        }
        _ => {}
    }
    editor.outbox.fail(entry);
}

fn failure_message(err: &RemoteError) -> String {
    match err {
        RemoteError::Rejected { reason, .. } if !reason.is_empty() => reason.clone(),
        RemoteError::Unavailable { message } if !message.is_empty() => {
            format!("Failed to update provider. Please try again. ({message})")
        }
        _ => "Failed to update provider. Please try again.".to_string(),
    }
}

impl<T: BlinkTimers> Editor<T> {
    /// Re-queues failed mutations. Those that already used every allowed attempt are discarded,
    /// and an unconfirmed entity they created is removed locally.
    pub fn retry_failed(&mut self) -> RetryReport {
        let mut report = RetryReport::default();
        let max = self.config().max_sync_attempts;
        let failed = std::mem::take(&mut self.outbox.failed);
        for entry in failed {
            if entry.attempts >= max {
                report.discarded += 1;
                tracing::warn!(mutation = ?entry.mutation, attempts = entry.attempts, "giving up");
                match &entry.mutation {
                    Mutation::CreateNode(id) if id.is_temporary() => {
                        if let Err(err) = self.remove_node(id) {
                            tracing::debug!(%err, "discarded node already gone");
                        }
                    }
                    Mutation::Connect { edge } => {
                        if self.store_mut().remove_edge(*edge).is_ok()
                            && self.info().is_showing_edge(*edge)
                        {
                            self.close_info();
                        }
                    }
                    _ => {}
                }
                continue;
            }
            match &entry.mutation {
                Mutation::CreateNode(id) | Mutation::UpdateNode(id) => {
                    self.store_mut().set_node_sync(id, SyncState::Pending);
                }
                Mutation::Connect { edge } => {
                    self.store_mut().set_edge_sync(*edge, SyncState::Pending);
                }
                _ => {}
            }
            report.requeued += 1;
            self.outbox.requeue(entry);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_coalesces_repeated_updates() {
        let mut ob = Outbox::default();
        ob.push(Mutation::UpdateNode("a".into()));
        ob.push(Mutation::UpdateNode("a".into()));
        ob.push(Mutation::UpdateNode("b".into()));
        assert_eq!(ob.len(), 2);
    }

    #[test]
    fn outbox_remaps_temporary_ids() {
        let mut ob = Outbox::default();
        let tmp = NodeId::temporary();
        ob.push(Mutation::UpdateNode(tmp.clone()));
        ob.push(Mutation::Disconnect {
            from: tmp.clone(),
            to: "b".into(),
        });
        ob.remap(&tmp, &"srv".into());
        let muts: Vec<_> = ob.queued().map(|e| e.mutation.clone()).collect();
        assert_eq!(
            muts,
            vec![
                Mutation::UpdateNode("srv".into()),
                Mutation::Disconnect {
                    from: "srv".into(),
                    to: "b".into()
                }
            ]
        );
    }

    #[test]
    fn discard_node_drops_every_mention() {
        let mut ob = Outbox::default();
        ob.push(Mutation::CreateNode("t".into()));
        ob.push(Mutation::UpdateNode("t".into()));
        ob.push(Mutation::Connect { edge: EdgeId(1) });
        ob.discard_node(&"t".into());
        assert_eq!(ob.len(), 1);
        assert!(ob.discard_edge(EdgeId(1)));
        assert!(!ob.discard_edge(EdgeId(1)));
    }
}
