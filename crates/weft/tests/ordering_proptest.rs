//! Property tests: random message edits keep the graph ordered and the
//! layout stable.

use proptest::prelude::*;

use weft::{
    Anchor, GraphBuilder,
    graph::InteractionGraph,
    identifier::Id,
    model::{Interaction, ViewLayout},
    semantic::MessageSort,
};

#[derive(Debug, Clone)]
struct MessageEdit {
    from: usize,
    to: usize,
    y: f32,
    synchronous: bool,
}

fn message_edit() -> impl Strategy<Value = MessageEdit> {
    (0usize..3, 0usize..3, 70.0f32..400.0, any::<bool>()).prop_map(
        |(from, to, y, synchronous)| MessageEdit {
            from,
            to,
            y: y.round(),
            synchronous,
        },
    )
}

fn apply(edits: &[MessageEdit]) -> InteractionGraph {
    let mut model = Interaction::new(Id::new("prop"));
    for index in 0..3 {
        model.add_lifeline(Id::new(&format!("prop_l{index}")));
    }
    let mut graph = GraphBuilder::default().build(&model, &ViewLayout::new());
    for edit in edits {
        let lifelines = graph.lifelines().to_vec();
        let sort = if edit.synchronous {
            MessageSort::Synchronous
        } else {
            MessageSort::Asynchronous
        };
        let source = Some(Anchor::new(lifelines[edit.from], edit.y));
        let target = Some(Anchor::new(lifelines[edit.to], edit.y));
        if graph.can_add_message(sort, source, target) {
            let added = graph.add_message(&mut model, sort, source, target);
            assert!(added.is_ok(), "checked edit failed: {added:?}");
        }
    }
    graph
}

fn snapshot(graph: &InteractionGraph) -> (Vec<Option<f32>>, Vec<String>) {
    let rows = graph.rows().iter().map(|row| row.y()).collect();
    let bounds = graph
        .ordered_nodes()
        .iter()
        .chain(graph.lifelines())
        .map(|node| format!("{:?}", graph.bounds(*node)))
        .collect();
    (rows, bounds)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_sends_never_follow_receives(edits in prop::collection::vec(message_edit(), 1..12)) {
        let graph = apply(&edits);
        for id in graph.links() {
            let Some(link) = graph.link(id) else { continue };
            let (Some(source), Some(target)) = (link.source(), link.target()) else { continue };
            let send = graph.row_of(source);
            let receive = graph.row_of(target);
            prop_assert!(
                send <= receive,
                "link {id}: send row {send:?} after receive row {receive:?}"
            );
        }
    }

    #[test]
    fn prop_rows_strictly_descend(edits in prop::collection::vec(message_edit(), 1..12)) {
        let graph = apply(&edits);
        let ys: Vec<f32> = graph.rows().iter().filter_map(|row| row.y()).collect();
        prop_assert_eq!(ys.len(), graph.rows().len(), "every row is placed");
        prop_assert!(ys.windows(2).all(|pair| pair[0] < pair[1]), "rows out of order: {:?}", ys);
    }

    #[test]
    fn prop_layout_is_idempotent(edits in prop::collection::vec(message_edit(), 1..12)) {
        let mut graph = apply(&edits);
        let before = snapshot(&graph);
        graph.layout();
        prop_assert_eq!(snapshot(&graph), before);
    }

    #[test]
    fn prop_every_leaf_sits_in_one_row(edits in prop::collection::vec(message_edit(), 1..12)) {
        let graph = apply(&edits);
        for node in graph.ordered_nodes() {
            let rows = graph.rows().iter().filter(|row| row.nodes().contains(node)).count();
            prop_assert_eq!(rows, 1, "node {} is in {} rows", node, rows);
        }
    }
}
