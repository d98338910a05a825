//! End-to-end edit scenarios through the public graph API.

use float_cmp::approx_eq;

use weft::{
    Anchor, GraphBuilder,
    geometry::Bounds,
    graph::{InteractionGraph, MarkKind, NodeId, NodeKind},
    identifier::Id,
    model::{Interaction, ViewLayout},
    semantic::{InteractionOperator, MessageSort},
};

fn diagram(name: &str, lifelines: usize) -> (Interaction, InteractionGraph) {
    let mut model = Interaction::new(Id::new(name));
    for index in 0..lifelines {
        model.add_lifeline(Id::new(&format!("{name}_l{index}")));
    }
    let graph = GraphBuilder::default().build(&model, &ViewLayout::new());
    (model, graph)
}

fn row_ys(graph: &InteractionGraph) -> Vec<f32> {
    graph.rows().iter().filter_map(|row| row.y()).collect()
}

fn min_x(graph: &InteractionGraph, node: NodeId) -> f32 {
    graph.bounds(node).map_or(f32::NAN, Bounds::min_x)
}

#[test]
fn test_sync_call_then_delete_leaves_nothing() {
    let (mut model, mut graph) = diagram("scn_sync", 2);
    let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);

    let call = graph
        .add_message(
            &mut model,
            MessageSort::Synchronous,
            Some(Anchor::new(a, 100.0)),
            Some(Anchor::new(b, 100.0)),
        )
        .expect("call should be added");
    assert_eq!(graph.links().count(), 2, "call and its reply");
    assert_eq!(graph.children(b).len(), 1, "one execution on the callee");
    assert_eq!(graph.kind(graph.children(b)[0]), Some(NodeKind::ExecutionSpecification));

    graph.delete_message(call).expect("call should be deleted");
    assert!(graph.children(a).is_empty(), "caller is empty: {:?}", graph.children(a));
    assert!(graph.children(b).is_empty(), "callee is empty: {:?}", graph.children(b));
    assert_eq!(graph.links().count(), 0);
}

#[test]
fn test_nudging_lifeline_moves_its_column_only() {
    let (mut model, mut graph) = diagram("scn_nudge", 2);
    let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
    graph
        .add_message(
            &mut model,
            MessageSort::Synchronous,
            Some(Anchor::new(a, 100.0)),
            Some(Anchor::new(b, 100.0)),
        )
        .expect("call should be added");
    let execution = graph.children(b)[0];

    let rows_before = row_ys(&graph);
    let lifeline_before = min_x(&graph, b);
    let execution_before = min_x(&graph, execution);
    let caller_before = min_x(&graph, a);

    graph.nudge_lifeline(b, 20.0).expect("nudge should be allowed");

    assert!(approx_eq!(f32, min_x(&graph, b), lifeline_before + 20.0, epsilon = 0.01));
    assert!(approx_eq!(f32, min_x(&graph, execution), execution_before + 20.0, epsilon = 0.01));
    assert!(approx_eq!(f32, min_x(&graph, a), caller_before, epsilon = 0.01));
    assert_eq!(row_ys(&graph), rows_before, "rows do not move");
}

#[test]
fn test_opt_wraps_two_messages() {
    let (mut model, mut graph) = diagram("scn_opt", 2);
    let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
    for y in [100.0, 140.0] {
        graph
            .add_message(
                &mut model,
                MessageSort::Asynchronous,
                Some(Anchor::new(a, y)),
                Some(Anchor::new(b, y)),
            )
            .expect("message should be added");
    }

    let max_x = graph.bounds(b).map_or(0.0, Bounds::max_x);
    let rect = Bounds::from_extents(min_x(&graph, a), 80.0, max_x, 160.0);
    let opt = graph
        .add_combined_fragment(&mut model, InteractionOperator::Opt, &rect)
        .expect("opt should be added");

    let lanes = graph.parts(opt).map(|parts| parts.lanes().to_vec()).unwrap_or_default();
    assert_eq!(lanes.len(), 2, "one lane per lifeline");
    for lane in &lanes {
        let children = graph.children(*lane);
        assert_eq!(graph.kind(children[0]), Some(NodeKind::Mark(MarkKind::Start)));
        assert_eq!(graph.kind(children[children.len() - 1]), Some(NodeKind::Mark(MarkKind::End)));
        assert_eq!(children.len(), 4, "two message ends between the marks");
    }
    let start_rows: Vec<_> = graph
        .marks(opt, MarkKind::Start)
        .into_iter()
        .map(|mark| graph.row_of(mark))
        .collect();
    assert!(start_rows.windows(2).all(|pair| pair[0] == pair[1]), "start marks share a row");
    assert!(
        graph.bounds(opt).is_some_and(|bounds| bounds.min_y() <= 80.0 && bounds.max_y() >= 160.0),
        "frame covers its lanes: {:?}",
        graph.bounds(opt)
    );
}

#[test]
fn test_refused_edit_leaves_graph_untouched() {
    let (mut model, mut graph) = diagram("scn_refuse", 2);
    let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
    graph
        .add_message(
            &mut model,
            MessageSort::Asynchronous,
            Some(Anchor::new(a, 100.0)),
            Some(Anchor::new(b, 100.0)),
        )
        .expect("message should be added");
    let ordered = graph.ordered_nodes().to_vec();
    let rows = row_ys(&graph);

    let refused = graph.add_message(
        &mut model,
        MessageSort::Asynchronous,
        Some(Anchor::new(a, 200.0)),
        Some(Anchor::new(b, 150.0)),
    );
    assert!(refused.is_err(), "receive above send is refused");
    assert_eq!(graph.ordered_nodes(), ordered.as_slice());
    assert_eq!(row_ys(&graph), rows);
}
