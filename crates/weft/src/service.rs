//! Structural edits on an [`InteractionGraph`].
//!
//! Every edit comes as a pair: `can_x` answers whether the edit is valid
//! without touching the graph, and `x` performs it. `x` re-runs the check and
//! fails with [`EditError::Precondition`] before mutating anything when it
//! does not hold. Mutations run inside a [`LayoutBatch`](crate::graph::LayoutBatch)
//! so the layout runs once, after the last primitive change.
//!
//! Positions passed to the edits are absolute diagram coordinates. The edits
//! only move seeds (a node's y, a lifeline's x); rows and columns follow from
//! the layout pass that closes the batch.

mod combined_fragment;
mod execution;
mod gate;
mod interaction_use;
mod lifeline;
mod message;

use std::collections::{HashMap, HashSet};

use log::{debug, trace};

use weft_core::{
    geometry::Bounds,
    identifier::Id,
    semantic::{ElementKind, MessageSort, OccurrenceKind},
};

use crate::{
    error::EditError,
    graph::{FragmentKind, InteractionGraph, LinkId, MarkKind, Node, NodeId, NodeKind},
    model::{Interaction, SemanticModel},
};

/// Where an edit attaches something: a target node and a y coordinate.
///
/// The target is a lifeline, an execution cluster or a lane for an
/// occurrence; an interaction use for an actual gate on its border; or the
/// graph root for a formal gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    target: NodeId,
    y: f32,
}

impl Anchor {
    pub fn new(target: NodeId, y: f32) -> Self {
        Self { target, y }
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

/// Boundary of an execution specification moved by a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionSide {
    Top,
    Bottom,
}

/// What an anchor resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnchorTarget {
    Lifeline(NodeId),
    Gate(NodeId),
}

/// Turns a failed check into a refused edit.
fn ensure(allowed: bool, operation: &'static str) -> Result<(), EditError> {
    if allowed {
        Ok(())
    } else {
        debug!(operation; "Edit refused");
        Err(EditError::precondition(operation))
    }
}

/// Creates a detached element and sets its covered lifeline.
fn new_element<M: SemanticModel + ?Sized>(
    model: &mut M,
    kind: ElementKind,
    owner: Id,
    covered: &[Id],
) -> Id {
    let id = model.create_element(kind, owner);
    if !covered.is_empty() {
        if let Some(element) = model.element_mut(id) {
            element.set_covered(covered);
        }
    }
    trace!(element:% = id; "Created element");
    id
}

impl InteractionGraph {
    // =========================================================================
    // Handle checks
    // =========================================================================

    fn ensure_node(&self, id: NodeId) -> Result<(), EditError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(EditError::StaleHandle)
        }
    }

    fn ensure_link(&self, id: LinkId) -> Result<(), EditError> {
        self.link(id).map(|_| ()).ok_or(EditError::StaleHandle)
    }

    fn ensure_anchor(&self, anchor: Option<&Anchor>) -> Result<(), EditError> {
        anchor.map_or(Ok(()), |anchor| self.ensure_node(anchor.target))
    }

    fn is_lifeline(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Lifeline)
    }

    fn is_execution(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::ExecutionSpecification)
    }

    fn is_interaction_use(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Fragment(FragmentKind::InteractionUse))
    }

    fn is_combined_fragment(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Fragment(FragmentKind::CombinedFragment))
    }

    fn node_element(&self, id: NodeId) -> Option<Id> {
        self.node(id).and_then(Node::element)
    }

    // =========================================================================
    // Vertical geometry
    // =========================================================================

    /// Bottom edge of a lifeline's header.
    fn header_bottom(&self, lifeline: NodeId) -> f32 {
        let top = self
            .bounds(lifeline)
            .map_or(self.config().origin().y(), Bounds::min_y);
        top + self.config().lifeline_header_height()
    }

    /// y of the header row's top edge, shared by every lifeline that is not
    /// created by a message.
    fn header_top(&self) -> f32 {
        self.row_y(0).map_or(self.config().origin().y(), |y| {
            y - self.config().lifeline_header_height() / 2.0
        })
    }

    /// Leaves of a lifeline with a y in `top..=bottom`, ignoring `except`.
    fn leaves_between(
        &self,
        lifeline: NodeId,
        top: f32,
        bottom: f32,
        except: &[NodeId],
    ) -> Vec<NodeId> {
        self.flatten(lifeline)
            .into_iter()
            .filter(|leaf| !except.contains(leaf))
            .filter(|leaf| self.y(*leaf).is_some_and(|y| y >= top && y <= bottom))
            .collect()
    }

    /// Whether `y` falls inside an interaction use on `lifeline`.
    fn in_interaction_use(&self, lifeline: NodeId, y: f32, except: Option<NodeId>) -> bool {
        self.descendants(lifeline).into_iter().any(|lane| {
            self.kind(lane) == Some(NodeKind::Lane)
                && self
                    .node(lane)
                    .and_then(Node::fragment)
                    .is_some_and(|fragment| {
                        Some(fragment) != except && self.is_interaction_use(fragment)
                    })
                && self.span(lane).is_some_and(|(top, bottom)| y >= top && y <= bottom)
        })
    }

    /// Whether `y` lies at or after the destruction of `lifeline`.
    fn after_destruction(&self, lifeline: NodeId, y: f32, except: &[NodeId]) -> bool {
        self.flatten(lifeline).into_iter().any(|leaf| {
            !except.contains(&leaf)
                && self.kind(leaf) == Some(NodeKind::Destruction)
                && self.y(leaf).is_some_and(|destroyed| y >= destroyed)
        })
    }

    /// Whether an occurrence may sit on `lifeline` at `y`.
    fn occurrence_allowed(&self, lifeline: NodeId, y: f32, except: &[NodeId]) -> bool {
        y > self.header_bottom(lifeline)
            && !self.in_interaction_use(lifeline, y, None)
            && !self.after_destruction(lifeline, y, except)
    }

    fn resolve_anchor(&self, anchor: &Anchor) -> Option<AnchorTarget> {
        match self.kind(anchor.target)? {
            NodeKind::Lifeline | NodeKind::ExecutionSpecification | NodeKind::Lane => {
                self.lifeline_of(anchor.target).map(AnchorTarget::Lifeline)
            }
            NodeKind::Fragment(FragmentKind::InteractionUse) | NodeKind::Interaction => {
                Some(AnchorTarget::Gate(anchor.target))
            }
            _ => None,
        }
    }

    /// Whether a message end may be placed at `anchor`. Nodes in `except`
    /// are the ones being moved.
    fn anchor_allowed(&self, anchor: &Anchor, except: &[NodeId]) -> bool {
        match self.resolve_anchor(anchor) {
            Some(AnchorTarget::Lifeline(lifeline)) => {
                self.occurrence_allowed(lifeline, anchor.y, except)
            }
            Some(AnchorTarget::Gate(owner)) => self.gate_position_allowed(owner, anchor.y),
            None => false,
        }
    }

    /// Whether a gate of `owner` may sit at `y`.
    fn gate_position_allowed(&self, owner: NodeId, y: f32) -> bool {
        if owner == self.root() {
            return y > self.header_top();
        }
        self.span(owner)
            .is_some_and(|(top, bottom)| y >= top && y <= bottom)
    }

    /// Innermost execution or combined fragment lane on `lifeline` whose span
    /// strictly contains `y`, or the lifeline itself. Interaction use lanes
    /// hold nothing but their marks and are never returned.
    fn container_at(&self, lifeline: NodeId, y: f32) -> NodeId {
        self.container_outside(lifeline, y, None)
    }

    /// Like [`container_at`](Self::container_at), ignoring the lanes of
    /// `fragment`.
    fn container_outside(&self, lifeline: NodeId, y: f32, fragment: Option<NodeId>) -> NodeId {
        let mut current = lifeline;
        loop {
            let inner = self.children(current).iter().copied().find(|child| {
                let candidate = match self.kind(*child) {
                    Some(NodeKind::ExecutionSpecification) => true,
                    Some(NodeKind::Lane) => {
                        let owner = self.node(*child).and_then(Node::fragment);
                        owner != fragment
                            && owner.is_some_and(|owner| !self.is_interaction_use(owner))
                    }
                    _ => false,
                };
                candidate && self.span(*child).is_some_and(|(top, bottom)| top < y && y < bottom)
            });
            match inner {
                Some(inner) => current = inner,
                None => return current,
            }
        }
    }

    /// The fragment a new container on `lifeline` at `y` would nest in.
    fn fragment_at(&self, lifeline: NodeId, y: f32) -> NodeId {
        self.fragment_outside(lifeline, y, None)
    }

    /// Like [`fragment_at`](Self::fragment_at), ignoring the lanes of
    /// `fragment`.
    fn fragment_outside(&self, lifeline: NodeId, y: f32, fragment: Option<NodeId>) -> NodeId {
        let container = self.container_outside(lifeline, y, fragment);
        if self.kind(container) == Some(NodeKind::Lane) {
            return self.node(container).and_then(Node::fragment).unwrap_or(self.root());
        }
        self.enclosing_fragment(container)
    }

    /// Lifelines whose horizontal extent meets `rect`, left to right.
    fn lifelines_in(&self, rect: &Bounds) -> Vec<NodeId> {
        self.lifelines()
            .iter()
            .copied()
            .filter(|lifeline| {
                self.bounds(*lifeline)
                    .is_some_and(|bounds| bounds.overlaps_horizontally(rect))
            })
            .collect()
    }

    /// Whether giving the leaves in `moved` their new y keeps every message
    /// sending no later than it is received.
    fn keeps_causality(&self, moved: &HashMap<NodeId, f32>) -> bool {
        let y_of = |node: NodeId| moved.get(&node).copied().or_else(|| self.y(node));
        moved.iter().all(|(leaf, y)| {
            let cause_ok = self
                .cause_of(*leaf)
                .and_then(|cause| y_of(cause))
                .is_none_or(|cause_y| cause_y <= *y);
            let effect_ok = self
                .effect_of(*leaf)
                .and_then(|effect| y_of(effect))
                .is_none_or(|effect_y| effect_y >= *y);
            cause_ok && effect_ok
        })
    }

    /// Leaves of `unit` (a leaf or a cluster) mapped to their y shifted by `dy`.
    fn shifted_leaves(&self, unit: NodeId, dy: f32) -> HashMap<NodeId, f32> {
        let leaves = match self.kind(unit) {
            Some(kind) if kind.is_leaf() => vec![unit],
            _ => self.flatten(unit),
        };
        leaves
            .into_iter()
            .filter_map(|leaf| self.y(leaf).map(|y| (leaf, y + dy)))
            .collect()
    }

    // =========================================================================
    // Trial runs
    // =========================================================================

    /// Runs `edit` on a laid-out copy of the graph, against a scratch model,
    /// and reports whether it succeeds and leaves a well-formed graph.
    fn dry_run(
        &self,
        edit: impl FnOnce(&mut InteractionGraph, &mut Interaction) -> Result<(), EditError>,
    ) -> bool {
        let mut preview = self.preview();
        let mut scratch = Interaction::new(Id::new("weft_preview"));
        match edit(&mut preview, &mut scratch) {
            Ok(()) => preview.is_well_formed(),
            Err(err) => {
                trace!(err:% = err; "Trial edit failed");
                false
            }
        }
    }

    /// Whether the laid-out graph keeps the structural invariants: every
    /// message is sent no later than it is received, interaction uses hold
    /// only their marks and no occurrence falls inside one, a created
    /// lifeline starts with its creation and a destroyed one ends with it.
    /// Occurrences on each lifeline run top to bottom.
    pub(crate) fn is_well_formed(&self) -> bool {
        let causal = self.links().all(|link| {
            let Some(record) = self.link(link) else {
                return true;
            };
            let row = |end: Option<NodeId>| end.and_then(|end| self.row_of(end));
            match (row(record.source()), row(record.target())) {
                (Some(send), Some(receive)) => send <= receive,
                _ => true,
            }
        });
        if !causal {
            debug!("Trial edit breaks message causality");
            return false;
        }

        for fragment in self.fragments() {
            if !self.is_interaction_use(fragment) {
                continue;
            }
            let lanes = self.parts(fragment).map(|parts| parts.lanes().to_vec());
            let only_marks = lanes.unwrap_or_default().iter().all(|lane| {
                self.children(*lane)
                    .iter()
                    .all(|child| matches!(self.kind(*child), Some(NodeKind::Mark(_))))
            });
            if !only_marks {
                debug!(fragment:% = fragment; "Trial edit fills an interaction use");
                return false;
            }
        }

        self.lifelines().iter().all(|lifeline| {
            let leaves = self.flatten(*lifeline);
            let covered = leaves.iter().any(|leaf| {
                !matches!(self.kind(*leaf), Some(NodeKind::Mark(_)))
                    && self
                        .y(*leaf)
                        .is_some_and(|y| self.in_interaction_use(*lifeline, y, None))
            });
            let destroyed_early = leaves
                .iter()
                .rev()
                .skip(1)
                .any(|leaf| self.kind(*leaf) == Some(NodeKind::Destruction));
            let created_late = leaves.iter().skip(1).any(|leaf| {
                self.incoming_link(*leaf)
                    .and_then(|link| self.link(link))
                    .is_some_and(|link| link.sort() == MessageSort::Create)
            });
            let ordered = leaves.windows(2).all(|pair| match (self.y(pair[0]), self.y(pair[1])) {
                (Some(upper), Some(lower)) => upper <= lower,
                _ => true,
            });
            !covered && !destroyed_early && !created_late && ordered
        })
    }

    // =========================================================================
    // Row nudging
    // =========================================================================

    /// Whether the rows from `row` onward may move by `dy`: the row may not
    /// climb onto the row above it.
    fn can_nudge_rows(&self, row: usize, dy: f32) -> bool {
        if row == 0 || !dy.is_finite() {
            return false;
        }
        let Some(y) = self.row_y(row) else {
            return false;
        };
        let limit = if row == 1 {
            self.header_top() + self.config().lifeline_header_height()
        } else {
            match self.row_y(row - 1) {
                Some(previous) => previous + self.config().min_row_gap(),
                None => return false,
            }
        };
        y + dy >= limit
    }

    /// First row holding any of `nodes`.
    fn first_row(&self, nodes: impl IntoIterator<Item = NodeId>) -> Option<usize> {
        nodes.into_iter().filter_map(|node| self.row_of(node)).min()
    }

    // =========================================================================
    // Placement
    // =========================================================================

    /// Moves `unit` (a leaf or a cluster) to `lifeline` at `y`, shifting its
    /// leaves by the same amount.
    fn place_unit(&mut self, unit: NodeId, lifeline: NodeId, y: f32) {
        let top = self.span(unit).map_or(y, |(top, _)| top);
        for (leaf, new_y) in self.shifted_leaves(unit, y - top) {
            self.set_y(leaf, new_y);
        }
        if self.kind(unit).is_some_and(NodeKind::is_leaf) && self.y(unit).is_none() {
            self.set_y(unit, y);
        }
        self.detach(unit);
        let container = self.container_at(lifeline, y);
        self.insert_child_at_y(container, unit, y);
    }

    /// Allocates an occurrence node and element on `lifeline` at `y`,
    /// without placing it in a container.
    fn new_occurrence<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        lifeline: NodeId,
        kind: OccurrenceKind,
        y: f32,
    ) -> Option<NodeId> {
        let covered = self.node_element(lifeline)?;
        let interaction = model.interaction();
        let element = new_element(model, ElementKind::Occurrence(kind), interaction, &[covered]);
        let node_kind = match kind {
            OccurrenceKind::Destruction => NodeKind::Destruction,
            _ => NodeKind::Occurrence,
        };
        let node = self.alloc(Node::new(node_kind, Some(element), None));
        self.set_y(node, y);
        Some(node)
    }

    /// Allocates the node for a new message end at `anchor`: an occurrence on
    /// a lifeline or a gate on a fragment border.
    fn new_end<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        anchor: &Anchor,
        kind: OccurrenceKind,
    ) -> Option<NodeId> {
        match self.resolve_anchor(anchor)? {
            AnchorTarget::Lifeline(lifeline) => {
                let node = self.new_occurrence(model, lifeline, kind, anchor.y)?;
                let container = self.container_at(lifeline, anchor.y);
                self.insert_child_at_y(container, node, anchor.y);
                Some(node)
            }
            AnchorTarget::Gate(owner) => {
                let owner_element = if owner == self.root() {
                    model.interaction()
                } else {
                    self.node_element(owner)?
                };
                let element = new_element(model, ElementKind::Gate, owner_element, &[]);
                let node = self.alloc(Node::new(NodeKind::Gate, Some(element), None));
                self.set_y(node, anchor.y);
                self.attach_gate(owner, node, owner != self.root());
                Some(node)
            }
        }
    }

    /// Units that move with the message end `end`: the end itself or the
    /// execution it starts, plus the receive of that execution's reply.
    fn moving_units(&self, end: NodeId) -> Vec<NodeId> {
        let Some(execution) = self.started_execution(end) else {
            return vec![end];
        };
        let mut units = vec![execution];
        let reply_receive = self
            .children(execution)
            .last()
            .and_then(|finish| self.outgoing_link(*finish))
            .and_then(|link| self.link(link))
            .filter(|link| link.sort() == MessageSort::Reply)
            .and_then(|link| link.target());
        if let Some(receive) = reply_receive {
            if !self.descendants(execution).contains(&receive) {
                units.push(receive);
            }
        }
        units
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Links and top-level nodes of the blocks of `seed`: the message ends,
    /// the executions they start with everything inside, and transitively
    /// every message attached to those nodes.
    fn message_block(&self, seed: &[LinkId]) -> (Vec<LinkId>, Vec<NodeId>) {
        let mut links: Vec<LinkId> = Vec::new();
        let mut nodes: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut pending: Vec<LinkId> = seed.to_vec();

        while let Some(link) = pending.pop() {
            if links.contains(&link) {
                continue;
            }
            let Some(record) = self.link(link) else {
                continue;
            };
            links.push(link);
            for end in record.ends() {
                let unit = self.started_execution(end).unwrap_or(end);
                if !seen.insert(unit) {
                    continue;
                }
                nodes.push(unit);
                for inner in self.descendants(unit) {
                    if let Some(attached) = self.link_of(inner) {
                        pending.push(attached);
                    }
                }
            }
        }
        (links, nodes)
    }

    /// Removes the blocks of `seed` and any fragment left without lanes.
    fn remove_blocks(&mut self, seed: &[LinkId]) {
        let (links, nodes) = self.message_block(seed);
        debug!(links = links.len(), nodes = nodes.len(); "Remove message blocks");
        for link in links {
            self.remove_link(link);
        }
        for node in nodes {
            self.remove_node(node);
        }
        self.prune_fragments();
    }

    /// Removes fragments that no longer cover any lifeline, innermost first.
    fn prune_fragments(&mut self) {
        for fragment in self.fragments().into_iter().rev() {
            let empty = self
                .parts(fragment)
                .is_some_and(|parts| parts.lanes().is_empty());
            if empty {
                trace!(fragment:% = fragment; "Remove empty fragment");
                self.remove_node(fragment);
            }
        }
    }

    /// Re-sorts every fragment's lanes after lifelines were reordered.
    fn resort_lanes(&mut self) {
        for fragment in self.fragments() {
            let lanes: Vec<NodeId> = self
                .parts(fragment)
                .map(|parts| parts.lanes().to_vec())
                .unwrap_or_default();
            for lane in lanes {
                self.detach_lane(lane);
                self.attach_lane(fragment, lane);
            }
        }
    }

    /// Replaces the end `old` of `link` by `new`, rewiring the connection.
    fn rewire_end(&mut self, link: LinkId, old: NodeId, new: NodeId) {
        let Some(record) = self.link(link) else {
            return;
        };
        let is_source = record.source() == Some(old);
        let (source, target) = if is_source {
            (Some(new), record.target())
        } else {
            (record.source(), Some(new))
        };
        if let Some(record) = self.link_mut(link) {
            record.source = source;
            record.target = target;
        }
        self.disconnect(old);
        self.disconnect_target(old);
        if let Some(execution) = self.started_execution(old) {
            self.disconnect_target(execution);
        }
        if let (Some(source), Some(target)) = (source, target) {
            let target = self.started_execution(target).unwrap_or(target);
            self.connect(source, target);
        }
    }

    /// Replaces the message end `old` by a fresh end at `anchor`, removing the
    /// old node. Used when an end changes between occurrence and gate.
    fn replace_end<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        link: LinkId,
        old: NodeId,
        anchor: &Anchor,
    ) -> Result<NodeId, EditError> {
        let new = self
            .new_end(model, anchor, OccurrenceKind::Message)
            .ok_or_else(|| {
                EditError::Inconsistent(format!("no end can be created at {}", anchor.target))
            })?;
        self.rewire_end(link, old, new);
        self.remove_node(old);
        Ok(new)
    }

    /// Covered lifeline elements of `lifelines`.
    fn lifeline_elements(&self, lifelines: &[NodeId]) -> Vec<Id> {
        lifelines
            .iter()
            .filter_map(|lifeline| self.node_element(*lifeline))
            .collect()
    }

    /// Allocates a lane of `fragment` on `lifeline` spanning `top..bottom`,
    /// holding only its marks.
    fn new_lane(&mut self, fragment: NodeId, lifeline: NodeId, top: f32, bottom: f32) -> NodeId {
        let lane = self.alloc(Node::new(NodeKind::Lane, None, None));
        let start = self.alloc(Node::new(NodeKind::Mark(MarkKind::Start), None, None));
        let end = self.alloc(Node::new(NodeKind::Mark(MarkKind::End), None, None));
        self.set_y(start, top);
        self.set_y(end, bottom);
        self.push_child(lane, start);
        self.push_child(lane, end);
        let container = self.container_at(lifeline, top);
        self.insert_child_at_y(container, lane, top);
        self.attach_lane(fragment, lane);
        lane
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{geometry::Point, semantic::MessageSort};

    use super::*;
    use crate::{
        config::LayoutConfig,
        model::{Interaction, ViewLayout},
        GraphBuilder,
    };

    fn two_lifelines() -> (Interaction, InteractionGraph) {
        let mut model = Interaction::new(Id::new("svc"));
        model.add_lifeline(Id::new("svc_a"));
        model.add_lifeline(Id::new("svc_b"));
        let graph = GraphBuilder::default().build(&model, &ViewLayout::new());
        (model, graph)
    }

    #[test]
    fn test_container_at_descends_into_execution() {
        let (mut model, mut graph) = two_lifelines();
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let y = graph.header_bottom(a) + 40.0;
        let (from, to) = (Some(Anchor::new(a, y)), Some(Anchor::new(b, y)));
        let link = graph.add_message(&mut model, MessageSort::Synchronous, from, to);
        assert!(link.is_ok(), "sync message added");

        let execution = graph.children(b).first().copied();
        assert_eq!(execution.and_then(|e| graph.kind(e)), Some(NodeKind::ExecutionSpecification));
        let (top, bottom) = execution.and_then(|e| graph.span(e)).unwrap_or_default();
        let inside = graph.container_at(b, (top + bottom) / 2.0);
        assert_eq!(Some(inside), execution, "midpoint lies in the execution");
        assert_eq!(graph.container_at(b, bottom + 100.0), b);
    }

    #[test]
    fn test_anchor_below_header_only() {
        let (_, graph) = two_lifelines();
        let a = graph.lifelines()[0];
        let header = graph.header_bottom(a);
        assert!(!graph.anchor_allowed(&Anchor::new(a, header - 1.0), &[]));
        assert!(graph.anchor_allowed(&Anchor::new(a, header + 1.0), &[]));
        assert!(graph.anchor_allowed(&Anchor::new(graph.root(), header + 1.0), &[]));
    }

    #[test]
    fn test_nudge_rows_respects_previous_row() {
        let (mut model, mut graph) = two_lifelines();
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let y = graph.header_bottom(a) + 40.0;
        let (from, to) = (Some(Anchor::new(a, y)), Some(Anchor::new(b, y)));
        let _ = graph.add_message(&mut model, MessageSort::Asynchronous, from, to);

        assert!(graph.can_nudge_rows(1, 10.0));
        assert!(!graph.can_nudge_rows(1, -200.0), "cannot climb into the header");
        assert!(!graph.can_nudge_rows(0, 10.0), "the header row never moves");
    }

    #[test]
    fn test_lifelines_in_rect() {
        let (_, graph) = two_lifelines();
        let a = graph.lifelines()[0];
        let center = graph.bounds(a).map(|b| b.center()).unwrap_or(Point::new(0.0, 0.0));
        let rect = Bounds::from_extents(center.x() - 5.0, 0.0, center.x() + 5.0, 10.0);
        assert_eq!(graph.lifelines_in(&rect), vec![a]);
    }
}
