use futures::executor::block_on;

use gridmap_core::dialog::{EditOutcome, NodeEdit};
use gridmap_core::model::EdgeColor;
use gridmap_core::notice::NoticeKind;
use gridmap_core::{
    Editor, EditorConfig, Error, LatLng, ManualTimers, MemoryBackend, MemorySession, Node,
    NodeClick, NodeId, RemoteError, Session, Status, SyncAdapter, SyncState, TopologyBackend,
};

fn two_running() -> MemoryBackend {
    MemoryBackend::with_nodes([
        Node::new("p1".into(), "Alpha", LatLng::new(40.0, -74.0)).with_kind("Exchange"),
        Node::new("p2".into(), "Beta", LatLng::new(51.5, -0.1)).with_kind("Broker"),
    ])
}

fn editor() -> Editor<ManualTimers> {
    let mut ed = Editor::headless(EditorConfig::default());
    ed.mark_map_ready();
    ed
}

fn stop_via_dialog(ed: &mut Editor<ManualTimers>, id: &NodeId) {
    let node = ed.store().node(id).unwrap().clone();
    let mut edit = NodeEdit::for_node(&node);
    edit.attributes.status = Some(Status::Stopped);
    assert!(ed.apply_edit_outcome(id, EditOutcome::Updated(edit)).unwrap());
}

#[test]
fn connect_then_stop_both_endpoints() {
    let mut ed = editor();
    let mut sync = SyncAdapter::new(two_running(), MemorySession::signed_in("t0k"));

    block_on(sync.load_all(&mut ed)).unwrap();
    assert_eq!(ed.store().node_count(), 2);
    assert_eq!(ed.store().edge_count(), 0);

    let p1 = NodeId::from("p1");
    let p2 = NodeId::from("p2");
    ed.toggle_connect().unwrap();
    ed.click_node(&p1).unwrap();
    let NodeClick::Connected(edge) = ed.click_node(&p2).unwrap() else {
        panic!("second click should connect");
    };
    assert_eq!(ed.store().edge(edge).unwrap().sync, SyncState::Pending);

    let report = block_on(sync.flush(&mut ed)).unwrap();
    assert_eq!(report.succeeded, 1);
    assert_eq!(sync.backend().node("p2").unwrap().previous, Some(p1.clone()));

    // The refetch sees p2.previous = p1 but keeps the single existing edge.
    assert_eq!(ed.store().edge_count(), 1);
    let snap = ed.snapshot();
    assert_eq!(snap.edges[0].color, EdgeColor::Healthy);
    assert!(!snap.edges[0].blinking);
    assert_eq!(snap.edges[0].sync, SyncState::Confirmed);

    stop_via_dialog(&mut ed, &p1);
    block_on(sync.flush(&mut ed)).unwrap();
    let snap = ed.snapshot();
    assert_eq!(snap.edges[0].color, EdgeColor::Healthy);
    assert!(!snap.edges[0].blinking);

    stop_via_dialog(&mut ed, &p2);
    block_on(sync.flush(&mut ed)).unwrap();
    let snap = ed.snapshot();
    assert_eq!(snap.edges[0].color, EdgeColor::Down);
    assert!(snap.edges[0].blinking);
    assert_eq!(ed.store().timers().active_count(), 1);
    assert_eq!(
        ed.notices().iter().last().map(|n| n.message.as_str()),
        Some("Provider updated successfully")
    );
}

#[test]
fn created_node_is_rekeyed_and_its_edge_follows() {
    let mut ed = editor();
    let mut sync = SyncAdapter::new(two_running(), MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();

    ed.toggle_add_node().unwrap();
    let temp = ed.click_map(LatLng::new(35.0, 139.0)).unwrap().unwrap();
    assert!(temp.is_temporary());
    ed.add_edge(&NodeId::from("p1"), &temp).unwrap();
    assert_eq!(ed.outbox().len(), 2);

    let report = block_on(sync.flush(&mut ed)).unwrap();
    assert_eq!(report.succeeded, 2);
    assert!(!ed.store().contains_node(&temp));

    let server = NodeId::from("n1");
    let node = ed.store().node(&server).unwrap();
    assert_eq!(node.sync, SyncState::Confirmed);
    assert_eq!(node.previous, Some(NodeId::from("p1")));
    assert_eq!(ed.store().edges_between(&"p1".into(), &server).len(), 1);
    assert_eq!(
        sync.backend().calls(),
        vec!["list", "create Provider 3", "connect p1 n1", "list"]
    );
}

#[test]
fn signed_out_flush_fails_everything_and_redirects() {
    let mut ed = editor();
    let mut sync = SyncAdapter::new(two_running(), MemorySession::signed_out());
    block_on(sync.load_all(&mut ed)).unwrap();

    ed.add_edge(&"p1".into(), &"p2".into()).unwrap();
    let err = block_on(sync.flush(&mut ed)).unwrap_err();
    assert_eq!(err, Error::AuthenticationRequired);
    assert!(ed.outbox().is_empty());
    assert_eq!(ed.outbox().failed().len(), 1);
    assert_eq!(sync.session().redirects().len(), 1);
    assert_eq!(
        ed.notices().latest_error().map(|n| n.message.as_str()),
        Some("You must be logged in to update markers")
    );
    // Optimistic edge stays.
    assert_eq!(ed.store().edge_count(), 1);

    sync.session_mut().sign_in("t0k");
    assert_eq!(ed.retry_failed().requeued, 1);
    let report = block_on(sync.flush(&mut ed)).unwrap();
    assert_eq!(report.succeeded, 1);
}

#[test]
fn unauthorized_answer_expires_the_session() {
    let mut ed = editor();
    let backend = two_running();
    backend.require_token("good");
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("stale"));
    block_on(sync.load_all(&mut ed)).unwrap();

    ed.drag_node_end(&"p1".into(), LatLng::new(1.0, 2.0)).unwrap();
    let err = block_on(sync.flush(&mut ed)).unwrap_err();
    assert_eq!(err, Error::SessionExpired);
    assert_eq!(sync.session().credential(), None);
    assert_eq!(sync.session().redirects().len(), 1);
    assert_eq!(ed.outbox().len(), 1);
    // The local move is kept.
    assert_eq!(
        ed.store().node(&"p1".into()).unwrap().position,
        LatLng::new(1.0, 2.0)
    );
}

#[test]
fn remote_failure_keeps_state_and_gives_up_after_max_attempts() {
    let mut ed = editor();
    let mut sync = SyncAdapter::new(two_running(), MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();
    let e = ed.add_edge(&"p1".into(), &"p2".into()).unwrap();

    let max = ed.config().max_sync_attempts;
    for attempt in 1..=max {
        sync.backend().fail_next(RemoteError::Unavailable {
            message: "timeout".to_string(),
        });
        let report = block_on(sync.flush(&mut ed)).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(
            ed.store().edge(e).unwrap().sync,
            SyncState::Failed { attempts: attempt }
        );
        let latest = ed.notices().latest_error().unwrap();
        assert_eq!(latest.kind, NoticeKind::Error);
        if attempt < max {
            assert_eq!(ed.retry_failed().requeued, 1);
        }
    }

    let report = ed.retry_failed();
    assert_eq!(report.discarded, 1);
    assert_eq!(ed.store().edge_count(), 0);
    assert_eq!(ed.store().node_count(), 2);
}

#[test]
fn load_failure_surfaces_a_notice() {
    let mut ed = editor();
    let backend = two_running();
    backend.fail_next(RemoteError::Unavailable {
        message: "connection refused".to_string(),
    });
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_out());
    let err = block_on(sync.load_all(&mut ed)).unwrap_err();
    assert!(matches!(err, Error::RemoteUnavailable { .. }));
    assert_eq!(ed.store().node_count(), 0);
    assert!(ed.notices().latest_error().is_some());
}

#[test]
fn server_side_removal_prunes_edges_on_reload() {
    let mut ed = editor();
    let backend = MemoryBackend::with_nodes([
        Node::new("p1".into(), "Alpha", LatLng::new(0.0, 0.0)),
        Node::new("p2".into(), "Beta", LatLng::new(1.0, 1.0)).with_previous("p1"),
    ]);
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();
    assert_eq!(ed.store().edge_count(), 1);

    block_on(sync.backend().delete_node("t0k", &"p1".into())).unwrap();
    let report = block_on(sync.load_all(&mut ed)).unwrap();
    assert_eq!(report.removed_nodes, vec![NodeId::from("p1")]);
    assert_eq!(report.pruned_edges.len(), 1);
    assert_eq!(ed.store().edge_count(), 0);
}

#[test]
fn unauthorized_node_list_expires_the_session() {
    let mut ed = editor();
    let backend = two_running();
    backend.fail_next(RemoteError::Unauthorized);
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("stale"));

    let err = block_on(sync.load_all(&mut ed)).unwrap_err();
    assert_eq!(err, Error::SessionExpired);
    assert_eq!(sync.session().credential(), None);
    assert_eq!(sync.session().redirects(), &[ed.config().login_redirect_delay()]);
    assert_eq!(ed.store().node_count(), 0);
    assert_eq!(
        ed.notices().latest_error().map(|n| n.message.clone()),
        Some(Error::SessionExpired.to_string())
    );
}

#[test]
fn second_link_into_a_target_replaces_the_first() {
    let mut ed = editor();
    let backend = MemoryBackend::with_nodes([
        Node::new("a".into(), "Alpha", LatLng::new(0.0, 0.0)),
        Node::new("b".into(), "Beta", LatLng::new(1.0, 1.0)),
        Node::new("c".into(), "Gamma", LatLng::new(2.0, 2.0)),
    ]);
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();

    let (a, b, c) = (NodeId::from("a"), NodeId::from("b"), NodeId::from("c"));
    let ab = ed.add_edge(&a, &b).unwrap();
    let cb = ed.add_edge(&c, &b).unwrap();
    let report = block_on(sync.flush(&mut ed)).unwrap();
    assert_eq!(report.succeeded, 2);
    // One previous-node reference per node: the later link wins.
    assert_eq!(sync.backend().node("b").unwrap().previous, Some(c.clone()));

    let reconciled = report.reconciled.unwrap();
    assert_eq!(reconciled.pruned_edges, vec![ab]);
    assert_eq!(ed.store().edge_count(), 1);
    assert_eq!(ed.store().edge_endpoints(cb), Some((c, b)));
    assert_eq!(ed.store().edge(cb).unwrap().sync, SyncState::Confirmed);

    let mut fresh = editor();
    block_on(sync.load_all(&mut fresh)).unwrap();
    assert_eq!(fresh.store().edge_count(), ed.store().edge_count());
}

#[test]
fn link_cleared_elsewhere_is_dropped_on_reload() {
    let mut ed = editor();
    let backend = MemoryBackend::with_nodes([
        Node::new("p1".into(), "Alpha", LatLng::new(0.0, 0.0)).with_status(Status::Stopped),
        Node::new("p2".into(), "Beta", LatLng::new(1.0, 1.0))
            .with_status(Status::Stopped)
            .with_previous("p1"),
    ]);
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();
    assert_eq!(ed.store().edge_count(), 1);
    assert_eq!(ed.store().timers().active_count(), 1);

    block_on(sync.backend().disconnect("other", &"p1".into(), &"p2".into())).unwrap();
    let report = block_on(sync.load_all(&mut ed)).unwrap();
    assert_eq!(report.pruned_edges.len(), 1);
    assert!(report.removed_nodes.is_empty());
    assert_eq!(ed.store().edge_count(), 0);
    assert_eq!(ed.store().timers().active_count(), 0);
}

#[test]
fn removed_link_is_not_restored_before_its_disconnect_is_sent() {
    let mut ed = editor();
    let backend = MemoryBackend::with_nodes([
        Node::new("p1".into(), "Alpha", LatLng::new(0.0, 0.0)),
        Node::new("p2".into(), "Beta", LatLng::new(1.0, 1.0)).with_previous("p1"),
    ]);
    let mut sync = SyncAdapter::new(backend, MemorySession::signed_in("t0k"));
    block_on(sync.load_all(&mut ed)).unwrap();
    let edge = ed.store().edges().next().unwrap().id;

    ed.remove_edge(edge).unwrap();
    assert_eq!(ed.outbox().unsent_disconnects().len(), 1);
    let report = block_on(sync.load_all(&mut ed)).unwrap();
    assert!(report.regenerated_edges.is_empty());
    assert_eq!(ed.store().edge_count(), 0);

    let flushed = block_on(sync.flush(&mut ed)).unwrap();
    assert_eq!(flushed.succeeded, 1);
    assert_eq!(sync.backend().node("p2").unwrap().previous, None);
    assert_eq!(ed.store().edge_count(), 0);
}
