use std::collections::HashSet;

use log::debug;

use weft_core::{
    geometry::Bounds,
    semantic::{ElementKind, InteractionOperator},
};

use super::{ensure, new_element};
use crate::{
    error::EditError,
    graph::{FragmentKind, InteractionGraph, MarkKind, Node, NodeId, NodeKind},
    model::SemanticModel,
};

/// The lanes a new combined fragment would open, one per covered lifeline.
struct Wrapping {
    parent: NodeId,
    lanes: Vec<LanePlan>,
    nested: Vec<NodeId>,
}

struct LanePlan {
    lifeline: NodeId,
    container: NodeId,
    index: usize,
    wrapped: Vec<NodeId>,
}

impl InteractionGraph {
    fn plan_wrapping(&self, rect: &Bounds) -> Option<Wrapping> {
        let (top, bottom) = (rect.min_y(), rect.max_y());
        if !top.is_finite() || !bottom.is_finite() || bottom <= top {
            return None;
        }
        let covered = self.lifelines_in(rect);
        let parent = self.fragment_at(*covered.first()?, top);

        let mut lanes = Vec::new();
        let mut enclosed: HashSet<NodeId> = HashSet::new();
        for lifeline in covered {
            if top <= self.header_bottom(lifeline)
                || self.after_destruction(lifeline, top, &[])
                || self.in_interaction_use(lifeline, top, None)
                || self.in_interaction_use(lifeline, bottom, None)
                || self.fragment_at(lifeline, top) != parent
            {
                return None;
            }
            let container = self.container_at(lifeline, top);
            if container != self.container_at(lifeline, bottom) {
                return None;
            }
            let wrapped = self.children_within(container, top, bottom, &[])?;
            let index = self
                .children(container)
                .iter()
                .position(|child| self.span(*child).is_some_and(|(child_top, _)| child_top >= top))
                .unwrap_or(self.children(container).len());
            for child in &wrapped {
                enclosed.extend(self.descendants(*child));
            }
            lanes.push(LanePlan {
                lifeline,
                container,
                index,
                wrapped,
            });
        }

        // a fragment is wrapped whole or not at all
        let mut nested = Vec::new();
        for lane in enclosed.iter().filter(|node| self.kind(**node) == Some(NodeKind::Lane)) {
            let Some(fragment) = self.node(*lane).and_then(Node::fragment) else {
                continue;
            };
            let whole = self
                .parts(fragment)
                .is_some_and(|parts| parts.lanes().iter().all(|lane| enclosed.contains(lane)));
            if !whole {
                return None;
            }
            if self.parent(fragment) == Some(parent) && !nested.contains(&fragment) {
                nested.push(fragment);
            }
        }
        Some(Wrapping {
            parent,
            lanes,
            nested,
        })
    }

    /// Whether a combined fragment can frame `rect`: on every lifeline the
    /// rect meets, it must neither straddle a container boundary nor cut
    /// through another fragment.
    pub fn can_add_combined_fragment(&self, rect: &Bounds) -> bool {
        self.plan_wrapping(rect).is_some()
    }

    /// Frames the nodes inside `rect` in a new combined fragment. Fragments
    /// inside the rect become nested in it.
    pub fn add_combined_fragment<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        operator: InteractionOperator,
        rect: &Bounds,
    ) -> Result<NodeId, EditError> {
        let wrapping = self
            .plan_wrapping(rect)
            .ok_or_else(|| EditError::precondition("add_combined_fragment"))?;
        let (top, bottom) = (rect.min_y(), rect.max_y());
        let covered: Vec<NodeId> = wrapping.lanes.iter().map(|plan| plan.lifeline).collect();

        let mut graph = self.begin_batch();
        let interaction = model.interaction();
        let covered_elements = graph.lifeline_elements(&covered);
        let element = new_element(
            model,
            ElementKind::CombinedFragment(operator),
            interaction,
            &covered_elements,
        );
        let fragment = graph.alloc(Node::new(
            NodeKind::Fragment(FragmentKind::CombinedFragment),
            Some(element),
            None,
        ));

        for plan in wrapping.lanes {
            let lane = graph.alloc(Node::new(NodeKind::Lane, None, None));
            let start = graph.alloc(Node::new(NodeKind::Mark(MarkKind::Start), None, None));
            let end = graph.alloc(Node::new(NodeKind::Mark(MarkKind::End), None, None));
            graph.set_y(start, top);
            graph.set_y(end, bottom);

            graph.push_child(lane, start);
            for child in plan.wrapped {
                graph.detach(child);
                graph.push_child(lane, child);
            }
            graph.push_child(lane, end);
            graph.insert_child(plan.container, lane, plan.index);
            graph.attach_lane(fragment, lane);
        }
        for nested in wrapping.nested {
            graph.detach(nested);
            graph.attach_fragment(fragment, nested);
        }
        graph.attach_fragment(wrapping.parent, fragment);
        debug!(
            fragment:% = fragment,
            operator:% = operator,
            covered = covered.len();
            "Added combined fragment"
        );
        graph.layout();
        Ok(fragment)
    }

    pub fn can_nudge_combined_fragment(&self, fragment: NodeId, dy: f32) -> bool {
        self.is_combined_fragment(fragment)
            && self
                .first_row(self.marks(fragment, MarkKind::Start))
                .is_some_and(|row| self.can_nudge_rows(row, dy))
    }

    /// Nudges the rows from the top of the fragment onward.
    pub fn nudge_combined_fragment(&mut self, fragment: NodeId, dy: f32) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_nudge_combined_fragment(fragment, dy), "nudge_combined_fragment")?;
        let row = self
            .first_row(self.marks(fragment, MarkKind::Start))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_rows_from(row, dy, &[]);
        graph.layout();
        Ok(())
    }

    pub fn can_delete_combined_fragment(&self, fragment: NodeId) -> bool {
        self.is_combined_fragment(fragment)
    }

    /// Removes the frame of `fragment`. The framed nodes go back to the
    /// containers around it and nested fragments move up one level.
    pub fn delete_combined_fragment(&mut self, fragment: NodeId) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_delete_combined_fragment(fragment), "delete_combined_fragment")?;
        let parent = self.parent(fragment).unwrap_or(self.root());
        let (lanes, nested) = self
            .parts(fragment)
            .map(|parts| (parts.lanes().to_vec(), parts.nested().to_vec()))
            .unwrap_or_default();

        let mut graph = self.begin_batch();
        for lane in lanes {
            let children = graph.children(lane).to_vec();
            let inner = match children.len() {
                0..=2 => &[][..],
                len => &children[1..len - 1],
            };
            let Some((container, index)) = graph.detach(lane) else {
                continue;
            };
            for (offset, child) in inner.iter().enumerate() {
                graph.detach(*child);
                graph.insert_child(container, *child, index + offset);
            }
        }
        for inner in nested {
            graph.detach(inner);
            graph.attach_fragment(parent, inner);
        }
        graph.remove_node(fragment);
        debug!(fragment:% = fragment; "Deleted combined fragment");
        graph.layout();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{identifier::Id, semantic::MessageSort};

    use super::*;
    use crate::{
        Anchor, GraphBuilder,
        model::{Interaction, ViewLayout},
    };

    fn setup(name: &str) -> (Interaction, InteractionGraph) {
        let mut model = Interaction::new(Id::new(name));
        model.add_lifeline(Id::new(&format!("{name}_a")));
        model.add_lifeline(Id::new(&format!("{name}_b")));
        let graph = GraphBuilder::default().build(&model, &ViewLayout::new());
        (model, graph)
    }

    fn message(model: &mut Interaction, graph: &mut InteractionGraph, sort: MessageSort, y: f32) {
        let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
        let (from, to) = (Some(Anchor::new(a, y)), Some(Anchor::new(b, y)));
        let added = graph.add_message(model, sort, from, to);
        assert!(added.is_ok(), "message at {y}: {added:?}");
    }

    fn frame(graph: &InteractionGraph, top: f32, bottom: f32) -> Bounds {
        let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
        let min_x = graph.bounds(a).map_or(0.0, Bounds::min_x);
        let max_x = graph.bounds(b).map_or(0.0, Bounds::max_x);
        Bounds::from_extents(min_x, top, max_x, bottom)
    }

    #[test]
    fn test_opt_wraps_messages() {
        let (mut model, mut graph) = setup("cf_opt");
        message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        message(&mut model, &mut graph, MessageSort::Asynchronous, 140.0);

        let rect = frame(&graph, 80.0, 160.0);
        let fragment = graph
            .add_combined_fragment(&mut model, InteractionOperator::Opt, &rect)
            .unwrap_or_else(|e| panic!("fragment refused: {e}"));

        let lanes = graph.parts(fragment).map(|p| p.lanes().to_vec()).unwrap_or_default();
        assert_eq!(lanes.len(), 2);
        for lane in lanes {
            let children = graph.children(lane);
            assert_eq!(children.len(), 4, "start, two message ends, end");
            assert_eq!(graph.kind(children[0]), Some(NodeKind::Mark(MarkKind::Start)));
            assert_eq!(graph.kind(children[3]), Some(NodeKind::Mark(MarkKind::End)));
        }
        assert_eq!(graph.parts(graph.root()).map(|p| p.nested().to_vec()), Some(vec![fragment]));
    }

    #[test]
    fn test_refuses_straddling_execution() {
        let (mut model, mut graph) = setup("cf_straddle");
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);

        assert!(!graph.can_add_combined_fragment(&frame(&graph, 120.0, 200.0)));
        assert!(graph.can_add_combined_fragment(&frame(&graph, 80.0, 200.0)));
    }

    #[test]
    fn test_wrapped_fragment_becomes_nested() {
        let (mut model, mut graph) = setup("cf_nest");
        message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        message(&mut model, &mut graph, MessageSort::Asynchronous, 140.0);
        let rect = frame(&graph, 90.0, 110.0);
        let inner = graph
            .add_combined_fragment(&mut model, InteractionOperator::Loop, &rect)
            .unwrap_or_else(|e| panic!("inner refused: {e}"));

        let cutting = frame(&graph, 95.0, 160.0);
        assert!(!graph.can_add_combined_fragment(&cutting), "cuts through the loop");
        let rect = frame(&graph, 80.0, 160.0);
        let outer = graph
            .add_combined_fragment(&mut model, InteractionOperator::Opt, &rect)
            .unwrap_or_else(|e| panic!("outer refused: {e}"));

        assert_eq!(graph.parts(outer).map(|p| p.nested().to_vec()), Some(vec![inner]));
        assert_eq!(graph.parent(inner), Some(outer));

        assert!(graph.delete_combined_fragment(outer).is_ok());
        assert_eq!(graph.parent(inner), Some(graph.root()), "nested fragment moves up");
        let a = graph.lifelines()[0];
        assert_eq!(graph.children(a).len(), 2, "inner lane and second send are back");
        assert!(!graph.contains(outer));
    }

    #[test]
    fn test_nudge_combined_fragment() {
        let (mut model, mut graph) = setup("cf_nudge");
        message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        let rect = frame(&graph, 80.0, 120.0);
        let fragment = graph
            .add_combined_fragment(&mut model, InteractionOperator::Alt, &rect)
            .unwrap_or_else(|e| panic!("fragment refused: {e}"));

        assert!(graph.nudge_combined_fragment(fragment, 10.0).is_ok());
        assert_eq!(graph.span(fragment), Some((90.0, 130.0)));
    }
}
