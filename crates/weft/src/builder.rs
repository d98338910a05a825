//! One-time traversal of a semantic interaction into an [`InteractionGraph`].
//!
//! Lifelines are taken in model order, then the formal gates. The fragment
//! list is walked recursively through combined fragments while every lifeline
//! keeps a stack of open containers: an occurrence that starts an execution
//! opens that execution's cluster, its finish closes it, and a combined
//! fragment's lane stays open until the fragment's enclosed list is done.
//! Messages are wired last.
//!
//! A malformed model never makes the walk panic; dangling references are
//! skipped with a warning.

use std::collections::HashMap;

use log::{debug, trace, warn};

use weft_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
    semantic::{CombinedFragment, Element, InteractionUse, Occurrence, OccurrenceKind},
};

use crate::{
    config::LayoutConfig,
    graph::{FragmentKind, InteractionGraph, Link, MarkKind, Node, NodeId, NodeKind},
    model::{SemanticModel, ViewGeometry},
};

/// Walks a model and its view into a fresh graph.
pub(crate) struct ModelWalker<'a, M: ?Sized, V: ?Sized> {
    model: &'a M,
    view: &'a V,
    graph: InteractionGraph,
    containers: HashMap<NodeId, Vec<NodeId>>,
    fragments: Vec<NodeId>,
    execution_by_start: HashMap<Id, Id>,
    execution_by_finish: HashMap<Id, Id>,
}

impl<'a, M, V> ModelWalker<'a, M, V>
where
    M: SemanticModel + ?Sized,
    V: ViewGeometry + ?Sized,
{
    pub(crate) fn new(model: &'a M, view: &'a V, config: LayoutConfig) -> Self {
        let graph = InteractionGraph::new(model.interaction(), config);
        let root = graph.root();
        Self {
            model,
            view,
            graph,
            containers: HashMap::new(),
            fragments: vec![root],
            execution_by_start: HashMap::new(),
            execution_by_finish: HashMap::new(),
        }
    }

    /// Builds the graph and runs the initial layout.
    pub(crate) fn build(mut self) -> InteractionGraph {
        let model = self.model;
        self.index_executions(model.fragments());
        self.lifelines();
        self.formal_gates();
        self.walk(model.fragments());
        self.messages();

        debug!(
            lifelines = self.graph.lifelines().len(),
            links = self.graph.links().count();
            "Built interaction graph"
        );
        self.graph.layout();
        self.graph
    }

    fn index_executions(&mut self, fragments: &[Id]) {
        let model = self.model;
        for id in fragments {
            match model.element(*id) {
                Some(Element::ExecutionSpecification(execution)) => {
                    if let Some(start) = execution.start() {
                        self.execution_by_start.insert(start, *id);
                    }
                    if let Some(finish) = execution.finish() {
                        self.execution_by_finish.insert(finish, *id);
                    }
                }
                Some(Element::CombinedFragment(fragment)) => {
                    self.index_executions(fragment.fragments());
                }
                _ => {}
            }
        }
    }

    fn lifelines(&mut self) {
        let model = self.model;
        for id in model.lifelines() {
            if !matches!(model.element(*id), Some(Element::Lifeline)) {
                warn!(element:% = id; "Skipping lifeline entry that is not a lifeline");
                continue;
            }
            let node = self
                .graph
                .alloc(Node::new(NodeKind::Lifeline, Some(*id), self.view.bounds(*id)));
            let index = self.graph.lifelines().len();
            self.graph.insert_lifeline(index, node);
            self.containers.insert(node, vec![node]);
        }
    }

    fn formal_gates(&mut self) {
        let root = self.graph.root();
        let model = self.model;
        for id in model.formal_gates() {
            let node = self
                .graph
                .alloc(Node::new(NodeKind::Gate, Some(*id), self.view.bounds(*id)));
            self.graph.attach_gate(root, node, false);
        }
    }

    fn walk(&mut self, fragments: &[Id]) {
        let model = self.model;
        for id in fragments {
            match model.element(*id) {
                Some(Element::Occurrence(occurrence)) => self.occurrence(*id, occurrence),
                // opened and closed by its start and finish occurrences
                Some(Element::ExecutionSpecification(_)) => {}
                Some(Element::InteractionUse(interaction_use)) => {
                    self.interaction_use(*id, interaction_use)
                }
                Some(Element::CombinedFragment(fragment)) => self.combined_fragment(*id, fragment),
                Some(_) => warn!(element:% = id; "Skipping fragment entry of unexpected kind"),
                None => warn!(element:% = id; "Skipping dangling fragment reference"),
            }
        }
    }

    fn lifeline_node(&self, element: Id) -> Option<NodeId> {
        self.graph
            .node_for(element)
            .filter(|node| self.graph.kind(*node) == Some(NodeKind::Lifeline))
    }

    /// The innermost open container on a lifeline.
    fn container(&self, lifeline: NodeId) -> NodeId {
        self.containers
            .get(&lifeline)
            .and_then(|stack| stack.last())
            .copied()
            .unwrap_or(lifeline)
    }

    fn occurrence(&mut self, id: Id, occurrence: &Occurrence) {
        let lifeline = occurrence
            .covered()
            .and_then(|covered| self.lifeline_node(covered));
        let Some(lifeline) = lifeline else {
            warn!(element:% = id; "Skipping occurrence without a known lifeline");
            return;
        };
        let container = self.container(lifeline);
        let kind = match occurrence.kind() {
            OccurrenceKind::Destruction => NodeKind::Destruction,
            _ => NodeKind::Occurrence,
        };
        let node = self.graph.alloc(Node::new(kind, Some(id), self.view.bounds(id)));

        let finishes = self
            .execution_by_finish
            .get(&id)
            .and_then(|execution| self.graph.node_for(*execution))
            .filter(|execution| *execution == container);
        let starts = self.execution_by_start.get(&id).copied();

        match (starts, finishes) {
            (Some(execution), None) => {
                let cluster = self.graph.alloc(Node::new(
                    NodeKind::ExecutionSpecification,
                    Some(execution),
                    self.view.bounds(execution),
                ));
                self.graph.push_child(container, cluster);
                self.graph.push_child(cluster, node);
                self.containers.entry(lifeline).or_default().push(cluster);
                trace!(execution:% = execution; "Open execution cluster");
            }
            (_, Some(_)) => {
                self.graph.push_child(container, node);
                if let Some(stack) = self.containers.get_mut(&lifeline) {
                    stack.pop();
                }
            }
            (None, None) => self.graph.push_child(container, node),
        }
    }

    fn mark(&mut self, kind: MarkKind, y: Option<f32>) -> NodeId {
        let bounds = y.map(|y| Bounds::new_from_center(Point::new(0.0, y), Size::default()));
        self.graph.alloc(Node::new(NodeKind::Mark(kind), None, bounds))
    }

    /// Covered lifeline nodes, in graph order.
    fn covered_lifelines(&self, covered: &[Id]) -> Vec<NodeId> {
        self.graph
            .lifelines()
            .iter()
            .copied()
            .filter(|lifeline| {
                self.graph
                    .node(*lifeline)
                    .and_then(Node::element)
                    .is_some_and(|element| covered.contains(&element))
            })
            .collect()
    }

    fn open_fragment(&mut self, id: Id, kind: FragmentKind) -> (NodeId, Option<Bounds>) {
        let bounds = self.view.bounds(id);
        let node = self
            .graph
            .alloc(Node::new(NodeKind::Fragment(kind), Some(id), bounds));
        let parent = self.fragments.last().copied().unwrap_or(self.graph.root());
        self.graph.attach_fragment(parent, node);
        (node, bounds)
    }

    fn interaction_use(&mut self, id: Id, interaction_use: &InteractionUse) {
        let (fragment, bounds) = self.open_fragment(id, FragmentKind::InteractionUse);
        for lifeline in self.covered_lifelines(interaction_use.covered()) {
            let container = self.container(lifeline);
            let lane = self.graph.alloc(Node::new(NodeKind::Lane, None, None));
            self.graph.push_child(container, lane);
            self.graph.attach_lane(fragment, lane);
            let start = self.mark(MarkKind::Start, bounds.map(Bounds::min_y));
            let end = self.mark(MarkKind::End, bounds.map(Bounds::max_y));
            self.graph.push_child(lane, start);
            self.graph.push_child(lane, end);
        }
        for gate in interaction_use.gates() {
            let node = self
                .graph
                .alloc(Node::new(NodeKind::Gate, Some(*gate), self.view.bounds(*gate)));
            self.graph.attach_gate(fragment, node, true);
        }
    }

    fn combined_fragment(&mut self, id: Id, combined: &CombinedFragment) {
        let (fragment, bounds) = self.open_fragment(id, FragmentKind::CombinedFragment);
        let mut lanes = Vec::new();
        for lifeline in self.covered_lifelines(combined.covered()) {
            let container = self.container(lifeline);
            let lane = self.graph.alloc(Node::new(NodeKind::Lane, None, None));
            self.graph.push_child(container, lane);
            self.graph.attach_lane(fragment, lane);
            let start = self.mark(MarkKind::Start, bounds.map(Bounds::min_y));
            self.graph.push_child(lane, start);
            self.containers.entry(lifeline).or_default().push(lane);
            lanes.push((lifeline, lane));
        }

        self.fragments.push(fragment);
        self.walk(combined.fragments());
        self.fragments.pop();

        for (lifeline, lane) in lanes {
            if let Some(stack) = self.containers.get_mut(&lifeline) {
                while let Some(open) = stack.pop() {
                    if open == lane {
                        break;
                    }
                    warn!(
                        fragment:% = id;
                        "Closing execution left open inside a combined fragment"
                    );
                }
            }
            let end = self.mark(MarkKind::End, bounds.map(Bounds::max_y));
            self.graph.push_child(lane, end);
        }
    }

    fn messages(&mut self) {
        let model = self.model;
        for id in model.messages() {
            let Some(message) = model.element(*id).and_then(Element::as_message) else {
                warn!(element:% = id; "Skipping message entry that is not a message");
                continue;
            };
            let end = |element: Option<Id>| -> Option<NodeId> {
                let element = element?;
                let node = self.graph.node_for(element);
                if node.is_none() {
                    warn!(element:% = element; "Skipping dangling message end");
                }
                node
            };
            let source = end(message.send());
            let target = end(message.receive());
            if source.is_none() && target.is_none() {
                warn!(element:% = id; "Skipping message without ends");
                continue;
            }

            self.graph
                .add_link(Link::new(Some(*id), message.sort(), source, target));
            if let (Some(source), Some(target)) = (source, target) {
                let target = self.graph.started_execution(target).unwrap_or(target);
                self.graph.connect(source, target);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::semantic::{InteractionOperator, MessageSort};

    use super::*;
    use crate::model::{Interaction, ViewLayout};

    fn build(model: &Interaction) -> InteractionGraph {
        ModelWalker::new(model, &ViewLayout::new(), LayoutConfig::default()).build()
    }

    #[test]
    fn test_message_connects_ends() {
        let mut model = Interaction::new(Id::new("b_msg"));
        let a = model.add_lifeline(Id::new("b_msg_a"));
        let b = model.add_lifeline(Id::new("b_msg_b"));
        let message = model.add_message(MessageSort::Asynchronous, Some(a), Some(b));

        let graph = build(&model);
        let link = graph.link_for(message).and_then(|link| graph.link(link));
        let (source, target) = link.map(|l| (l.source(), l.target())).unwrap_or_default();

        assert!(source.is_some() && target.is_some(), "both ends resolved");
        assert_eq!(graph.connects_to(source.unwrap_or(graph.root())), target);
        assert_eq!(graph.lifeline(b), graph.node_for(b));
    }

    #[test]
    fn test_execution_opens_cluster() {
        let mut model = Interaction::new(Id::new("b_exec"));
        let a = model.add_lifeline(Id::new("b_exec_a"));
        let b = model.add_lifeline(Id::new("b_exec_b"));
        let call = model.add_message(MessageSort::Synchronous, Some(a), Some(b));
        let receive = model
            .element(call)
            .and_then(Element::as_message)
            .and_then(|m| m.receive())
            .unwrap_or(a);
        let reply = model.add_message(MessageSort::Reply, Some(b), Some(a));
        let reply_send = model
            .element(reply)
            .and_then(Element::as_message)
            .and_then(|m| m.send())
            .unwrap_or(a);
        let execution = model.add_execution(receive, reply_send);

        let graph = build(&model);
        let cluster = graph.cluster_for(execution);
        assert!(cluster.is_some(), "execution cluster exists");
        let cluster = cluster.unwrap_or(graph.root());
        assert_eq!(graph.children(cluster).len(), 2, "receive and reply send");
        let send = graph.link_for(call).and_then(|l| graph.link(l)).and_then(|l| l.source());
        assert_eq!(
            send.and_then(|send| graph.connects_to(send)),
            Some(cluster),
            "the call connects to the execution it starts"
        );
    }

    #[test]
    fn test_combined_fragment_wraps_enclosed() {
        let mut model = Interaction::new(Id::new("b_cf"));
        let a = model.add_lifeline(Id::new("b_cf_a"));
        let b = model.add_lifeline(Id::new("b_cf_b"));
        model.add_message(MessageSort::Asynchronous, Some(a), Some(b));
        let enclosed = model.fragments().to_vec();
        let fragment = model.add_combined_fragment(InteractionOperator::Opt, vec![a, b], enclosed);

        let graph = build(&model);
        let node = graph.node_for(fragment).unwrap_or(graph.root());
        let lanes = graph.parts(node).map(|p| p.lanes().to_vec()).unwrap_or_default();

        assert_eq!(lanes.len(), 2);
        for lane in lanes {
            let children = graph.children(lane);
            assert_eq!(children.len(), 3, "start mark, occurrence, end mark");
            assert_eq!(graph.kind(children[0]), Some(NodeKind::Mark(MarkKind::Start)));
            assert_eq!(graph.kind(children[2]), Some(NodeKind::Mark(MarkKind::End)));
        }
    }

    #[test]
    fn test_interaction_use_lanes_hold_only_marks() {
        let mut model = Interaction::new(Id::new("b_iu"));
        let a = model.add_lifeline(Id::new("b_iu_a"));
        let use_ = model.add_interaction_use(vec![a]);
        let gate = model.add_actual_gate(use_);

        let graph = build(&model);
        let node = graph.node_for(use_).unwrap_or(graph.root());
        let parts = graph.parts(node);
        assert_eq!(parts.map(|p| p.lanes().len()), Some(1));
        assert_eq!(parts.map(|p| p.outer_gates().len()), Some(1));
        assert!(gate.and_then(|g| graph.node_for(g)).is_some());
    }

    #[test]
    fn test_dangling_references_are_skipped() {
        let mut model = Interaction::new(Id::new("b_dangling"));
        model.add_lifeline(Id::new("b_dangling_a"));
        model.add_message_with_ends(
            MessageSort::Asynchronous,
            Some(Id::new("b_dangling_nowhere")),
            None,
        );

        let graph = build(&model);
        assert_eq!(graph.links().count(), 0, "message without resolvable ends is skipped");
    }
}
