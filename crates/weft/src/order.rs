//! Global causal order of the graph's leaf nodes.
//!
//! Each lifeline contributes its flattened sequence of leaves. The resolver
//! merges those sequences: among the lifeline heads that are ready it emits the
//! one with the smallest effective y, then follows the message the emitted node
//! sends when its receiver can share the row. Fragment marks are emitted as
//! alignment groups and gates are slotted in beside the nodes they connect to.

use std::collections::{HashMap, HashSet};

use log::{trace, warn};

use crate::graph::{InteractionGraph, NodeId, NodeKind};

/// Merges the per-lifeline sequences of a graph into one ordered list.
pub(crate) struct NodeOrderResolver<'g> {
    graph: &'g InteractionGraph,
    lanes: Vec<Vec<NodeId>>,
    heads: Vec<usize>,
    position: HashMap<NodeId, (usize, usize)>,
    effective: HashMap<NodeId, f32>,
    emitted: HashSet<NodeId>,
    order: Vec<NodeId>,
}

impl<'g> NodeOrderResolver<'g> {
    pub(crate) fn new(graph: &'g InteractionGraph) -> Self {
        let lanes: Vec<Vec<NodeId>> = graph
            .lifelines()
            .iter()
            .map(|lifeline| graph.flatten(*lifeline))
            .collect();
        let position = lanes
            .iter()
            .enumerate()
            .flat_map(|(lane, nodes)| {
                nodes
                    .iter()
                    .enumerate()
                    .map(move |(index, node)| (*node, (lane, index)))
            })
            .collect();

        Self {
            graph,
            heads: vec![0; lanes.len()],
            lanes,
            position,
            effective: HashMap::new(),
            emitted: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Consumes the resolver and returns every leaf of the graph in order.
    pub(crate) fn resolve(mut self) -> Vec<NodeId> {
        let total = self.position.len();
        while self.order.len() < total {
            if let Some(lane) = self.pick_ready() {
                self.emit_head(lane);
            } else if let Some(lane) = self.pick_any() {
                let node = self.lanes[lane][self.heads[lane]];
                warn!(node:% = node; "No ready node in the order merge, forcing emission");
                self.emit(node);
            } else {
                break;
            }
        }
        self.insert_gates();
        trace!(count = self.order.len(); "Resolved node order");
        self.order
    }

    fn head(&self, lane: usize) -> Option<NodeId> {
        self.lanes[lane].get(self.heads[lane]).copied()
    }

    fn is_head(&self, node: NodeId) -> bool {
        self.position
            .get(&node)
            .is_some_and(|(lane, index)| self.heads[*lane] == *index)
    }

    /// The in-lane node that causes `node`. Gates are not part of any lane
    /// and never hold a node back.
    fn cause(&self, node: NodeId) -> Option<NodeId> {
        self.graph
            .cause_of(node)
            .filter(|cause| self.position.contains_key(cause))
    }

    fn cause_emitted(&self, node: NodeId) -> bool {
        self.cause(node)
            .is_none_or(|cause| self.emitted.contains(&cause))
    }

    /// Other marks of the alignment group `node` belongs to.
    fn group(&self, node: NodeId) -> Option<Vec<NodeId>> {
        let (fragment, kind) = self.graph.alignment_group(node)?;
        let members: Vec<NodeId> = self
            .graph
            .marks(fragment, kind)
            .into_iter()
            .filter(|mark| self.position.contains_key(mark))
            .collect();
        (members.len() > 1).then_some(members)
    }

    fn is_ready(&self, node: NodeId) -> bool {
        if !self.is_head(node) || !self.cause_emitted(node) {
            return false;
        }
        match self.group(node) {
            Some(members) => members
                .iter()
                .all(|member| self.is_head(*member) && self.cause_emitted(*member)),
            None => true,
        }
    }

    /// Effective y of a head about to be emitted: its own y, or the latest of
    /// its lane predecessor and its cause.
    fn candidate_y(&self, node: NodeId) -> f32 {
        if let Some(y) = self.graph.y(node) {
            return y;
        }
        let predecessor = self.position.get(&node).and_then(|(lane, index)| {
            index
                .checked_sub(1)
                .and_then(|previous| self.lanes[*lane].get(previous))
                .and_then(|previous| self.effective.get(previous))
        });
        let cause = self.cause(node).and_then(|cause| self.effective.get(&cause));
        predecessor
            .into_iter()
            .chain(cause)
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }

    fn pick(&self, ready_only: bool) -> Option<usize> {
        (0..self.lanes.len())
            .filter_map(|lane| self.head(lane).map(|node| (lane, node)))
            .filter(|(_, node)| !ready_only || self.is_ready(*node))
            .map(|(lane, node)| (self.candidate_y(node), lane))
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, lane)| lane)
    }

    fn pick_ready(&self) -> Option<usize> {
        self.pick(true)
    }

    fn pick_any(&self) -> Option<usize> {
        self.pick(false)
    }

    fn emit(&mut self, node: NodeId) {
        let y = self.candidate_y(node);
        if let Some((lane, _)) = self.position.get(&node).copied() {
            self.heads[lane] += 1;
        }
        self.effective.insert(node, y);
        self.emitted.insert(node);
        self.order.push(node);
    }

    /// Emits the head of `lane`, its whole alignment group, and the chain of
    /// horizontally connected receivers that follows it.
    fn emit_head(&mut self, lane: usize) {
        let Some(node) = self.head(lane) else {
            return;
        };
        if let Some(members) = self.group(node) {
            for member in members {
                self.emit(member);
            }
            return;
        }

        self.emit(node);
        let mut current = node;
        while let Some(target) = self.graph.effect_of(current) {
            let same_lane = self.position.get(&target).map(|(lane, _)| *lane)
                == self.position.get(&current).map(|(lane, _)| *lane);
            if same_lane
                || self.emitted.contains(&target)
                || !self.is_ready(target)
                || !self.graph.is_horizontally_connected(current, target)
            {
                break;
            }
            self.emit(target);
            current = target;
        }
    }

    /// Places each gate next to the node it connects with: before a receiver
    /// it sends to, after a sender it receives from, otherwise at the end.
    fn insert_gates(&mut self) {
        let graph = self.graph;
        let gates: Vec<NodeId> = std::iter::once(graph.root())
            .chain(graph.fragments())
            .filter_map(|fragment| graph.parts(fragment))
            .flat_map(|parts| parts.gates().collect::<Vec<_>>())
            .filter(|gate| graph.kind(*gate) == Some(NodeKind::Gate))
            .collect();

        for gate in gates {
            let before = graph
                .effect_of(gate)
                .and_then(|target| self.order.iter().position(|n| *n == target));
            let after = graph
                .connected_by(gate)
                .and_then(|source| self.order.iter().position(|n| *n == source));
            match (before, after) {
                (Some(index), _) => self.order.insert(index, gate),
                (None, Some(index)) => self.order.insert(index + 1, gate),
                (None, None) => self.order.push(gate),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{
        geometry::{Bounds, Point, Size},
        identifier::Id,
        semantic::MessageSort,
    };

    use super::*;
    use crate::{
        config::LayoutConfig,
        graph::{Link, Node},
    };

    struct Fixture {
        graph: InteractionGraph,
    }

    impl Fixture {
        fn new(name: &str) -> Self {
            Self {
                graph: InteractionGraph::new(Id::new(name), LayoutConfig::default()),
            }
        }

        fn lifeline(&mut self) -> NodeId {
            let node = self.graph.alloc(Node::new(NodeKind::Lifeline, None, None));
            let index = self.graph.lifelines().len();
            self.graph.insert_lifeline(index, node);
            node
        }

        fn leaf(&mut self, parent: NodeId, y: Option<f32>) -> NodeId {
            let bounds = y.map(|y| Bounds::new_from_center(Point::new(0.0, y), Size::default()));
            let node = self
                .graph
                .alloc(Node::new(NodeKind::Occurrence, None, bounds));
            self.graph.push_child(parent, node);
            node
        }

        fn message(&mut self, source: NodeId, target: NodeId) {
            self.graph.connect(source, target);
            self.graph.add_link(Link::new(
                None,
                MessageSort::Asynchronous,
                Some(source),
                Some(target),
            ));
        }

        fn resolve(&self) -> Vec<NodeId> {
            NodeOrderResolver::new(&self.graph).resolve()
        }
    }

    #[test]
    fn test_orders_by_y_across_lifelines() {
        let mut f = Fixture::new("order_y");
        let a = f.lifeline();
        let b = f.lifeline();
        let a1 = f.leaf(a, Some(100.0));
        let b1 = f.leaf(b, Some(80.0));
        let a2 = f.leaf(a, Some(120.0));

        assert_eq!(f.resolve(), vec![b1, a1, a2]);
    }

    #[test]
    fn test_cause_is_emitted_before_effect() {
        let mut f = Fixture::new("order_cause");
        let a = f.lifeline();
        let b = f.lifeline();
        let send = f.leaf(a, Some(100.0));
        // drawn above its sender, still comes after it
        let receive = f.leaf(b, Some(60.0));
        f.message(send, receive);

        let order = f.resolve();
        let send_at = order.iter().position(|n| *n == send);
        let receive_at = order.iter().position(|n| *n == receive);
        assert!(send_at < receive_at, "receive must follow its send: {order:?}");
    }

    #[test]
    fn test_connected_receiver_follows_sender_immediately() {
        let mut f = Fixture::new("order_branch");
        let a = f.lifeline();
        let b = f.lifeline();
        let c = f.lifeline();
        let send = f.leaf(c, Some(100.0));
        let other = f.leaf(b, Some(100.0));
        let receive = f.leaf(a, Some(102.0));
        f.message(send, receive);

        // `other` has the same y as `send` but lies left of it
        assert_eq!(f.resolve(), vec![other, send, receive]);
    }

    #[test]
    fn test_unknown_y_inherits_predecessor() {
        let mut f = Fixture::new("order_unknown");
        let a = f.lifeline();
        let b = f.lifeline();
        let a1 = f.leaf(a, Some(100.0));
        let a2 = f.leaf(a, None);
        let b1 = f.leaf(b, Some(110.0));

        assert_eq!(f.resolve(), vec![a1, a2, b1]);
    }

    #[test]
    fn test_cycle_is_forced_not_looped() {
        let mut f = Fixture::new("order_cycle");
        let a = f.lifeline();
        let b = f.lifeline();
        let a1 = f.leaf(a, Some(100.0));
        let a2 = f.leaf(a, Some(110.0));
        let b1 = f.leaf(b, Some(100.0));
        let b2 = f.leaf(b, Some(110.0));
        // each lifeline's first node is caused by the other's second node
        f.message(b2, a1);
        f.message(a2, b1);

        let order = f.resolve();
        assert_eq!(order.len(), 4, "every node is still emitted once");
    }

    #[test]
    fn test_unconnected_gate_goes_last() {
        let mut f = Fixture::new("order_gate");
        let a = f.lifeline();
        let a1 = f.leaf(a, Some(100.0));
        let gate = f.graph.alloc(Node::new(NodeKind::Gate, None, None));
        let root = f.graph.root();
        f.graph.attach_gate(root, gate, false);

        assert_eq!(f.resolve(), vec![a1, gate]);
    }

    #[test]
    fn test_sending_gate_precedes_its_receiver() {
        let mut f = Fixture::new("order_gate_send");
        let a = f.lifeline();
        let a1 = f.leaf(a, Some(100.0));
        let a2 = f.leaf(a, Some(120.0));
        let gate = f.graph.alloc(Node::new(NodeKind::Gate, None, None));
        let root = f.graph.root();
        f.graph.attach_gate(root, gate, false);
        f.message(gate, a2);

        assert_eq!(f.resolve(), vec![a1, gate, a2]);
    }
}
