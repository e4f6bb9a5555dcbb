use gridmap_graphlib::{EdgeId, EdgeRejection, Graph, GraphOptions};

fn multigraph() -> Graph<u32, &'static str> {
    Graph::new(GraphOptions {
        multigraph: true,
        ..Default::default()
    })
}

#[test]
fn nodes_keep_insertion_order_and_replace_labels() {
    let mut g = multigraph();
    assert_eq!(g.set_node("b", 1), None);
    assert_eq!(g.set_node("a", 2), None);
    assert_eq!(g.set_node("b", 3), Some(1));

    let ids: Vec<&str> = g.nodes().map(|(id, _)| id).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(g.node("b"), Some(&3));
    assert_eq!(g.node_count(), 2);
}

#[test]
fn add_edge_rejects_missing_endpoints_and_self_loops() {
    let mut g = multigraph();
    g.set_node("a", 0);
    assert_eq!(g.add_edge("a", "zz", "x"), Err(EdgeRejection::MissingEndpoint));
    assert_eq!(g.add_edge("a", "a", "x"), Err(EdgeRejection::SelfLoop));
    assert_eq!(g.edge_count(), 0);
}

#[test]
fn simple_graph_rejects_parallel_edges_but_multigraph_allows_them() {
    let mut simple: Graph<(), ()> = Graph::default();
    simple.set_node("a", ());
    simple.set_node("b", ());
    assert!(simple.add_edge("a", "b", ()).is_ok());
    assert_eq!(simple.add_edge("a", "b", ()), Err(EdgeRejection::Duplicate));
    assert!(simple.add_edge("b", "a", ()).is_ok());

    let mut g = multigraph();
    g.set_node("a", 0);
    g.set_node("b", 0);
    let e1 = g.add_edge("a", "b", "first").unwrap();
    let e2 = g.add_edge("a", "b", "second").unwrap();
    assert_ne!(e1, e2);
    assert_eq!(g.edges_between("a", "b"), vec![e1, e2]);
}

#[test]
fn edge_ids_are_never_reused_after_removal() {
    let mut g = multigraph();
    g.set_node("a", 0);
    g.set_node("b", 0);
    let e1 = g.add_edge("a", "b", "x").unwrap();
    assert_eq!(g.remove_edge(e1), Some("x"));
    let e2 = g.add_edge("a", "b", "y").unwrap();
    assert!(e2 > e1);
    assert_eq!(g.edge(e1), None);
    assert_eq!(g.remove_edge(e1), None);
}

#[test]
fn removal_keeps_index_consistent() {
    let mut g = multigraph();
    for id in ["a", "b", "c"] {
        g.set_node(id, 0);
    }
    let ab = g.add_edge("a", "b", "ab").unwrap();
    let bc = g.add_edge("b", "c", "bc").unwrap();
    let ca = g.add_edge("c", "a", "ca").unwrap();

    g.remove_edge(ab);
    assert_eq!(g.edge(bc), Some(&"bc"));
    assert_eq!(g.edge(ca), Some(&"ca"));
    assert_eq!(g.endpoints(ca), Some(("c", "a")));
}

#[test]
fn remove_node_returns_incident_edges() {
    let mut g = multigraph();
    for id in ["a", "b", "c"] {
        g.set_node(id, 0);
    }
    let ab = g.add_edge("a", "b", "ab").unwrap();
    let bc = g.add_edge("b", "c", "bc").unwrap();
    let ca = g.add_edge("c", "a", "ca").unwrap();

    let (_, removed) = g.remove_node("b").unwrap();
    let removed_ids: Vec<EdgeId> = removed.iter().map(|(id, _)| *id).collect();
    assert_eq!(removed_ids, vec![ab, bc]);
    assert_eq!(g.edge_ids(), vec![ca]);
    assert!(!g.has_node("b"));
    assert_eq!(g.node("c"), Some(&0));
    assert!(g.remove_node("b").is_none());
}

#[test]
fn rename_node_rewrites_edge_endpoints() {
    let mut g = multigraph();
    g.set_node("tmp-1", 7);
    g.set_node("b", 0);
    g.set_node("c", 0);
    let e = g.add_edge("tmp-1", "b", "x").unwrap();
    let f = g.add_edge("c", "tmp-1", "y").unwrap();

    assert!(g.rename_node("tmp-1", "srv-9"));
    assert!(!g.has_node("tmp-1"));
    assert_eq!(g.node("srv-9"), Some(&7));
    assert_eq!(g.endpoints(e), Some(("srv-9", "b")));
    assert_eq!(g.endpoints(f), Some(("c", "srv-9")));

    assert!(!g.rename_node("b", "c"));
    assert!(!g.rename_node("missing", "d"));
}

#[test]
fn retain_edges_reports_dropped_edges() {
    let mut g = multigraph();
    g.set_node("a", 0);
    g.set_node("b", 0);
    let keep = g.add_edge("a", "b", "keep").unwrap();
    let drop = g.add_edge("b", "a", "drop").unwrap();

    let removed = g.retain_edges(|e| *e.label == "keep");
    assert_eq!(removed, vec![(drop, "drop")]);
    assert_eq!(g.edge(keep), Some(&"keep"));
    assert_eq!(g.node_edges("a"), vec![keep]);
}
