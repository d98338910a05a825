use std::collections::HashMap;

use log::debug;

use weft_core::semantic::{Element, ElementKind, MessageSort, OccurrenceKind};

use super::{Anchor, AnchorTarget, ExecutionSide, ensure, new_element};
use crate::{
    error::EditError,
    graph::{InteractionGraph, LinkId, Node, NodeId, NodeKind},
    model::SemanticModel,
};

impl InteractionGraph {
    /// Start and finish occurrences of an execution cluster.
    fn execution_ends(&self, cluster: NodeId) -> Option<(NodeId, NodeId)> {
        if !self.is_execution(cluster) {
            return None;
        }
        let children = self.children(cluster);
        let start = *children.first()?;
        let finish = *children.last()?;
        (start != finish).then_some((start, finish))
    }

    /// The message whose end starts the execution, if any.
    fn start_link(&self, cluster: NodeId) -> Option<LinkId> {
        self.children(cluster)
            .first()
            .and_then(|start| self.link_of(*start))
    }

    /// Children of `container` lying in `top..=bottom`. `None` when one of
    /// them straddles a bound.
    pub(super) fn children_within(
        &self,
        container: NodeId,
        top: f32,
        bottom: f32,
        skip: &[NodeId],
    ) -> Option<Vec<NodeId>> {
        let mut inside = Vec::new();
        for child in self.children(container) {
            if skip.contains(child) {
                continue;
            }
            let Some((child_top, child_bottom)) = self.span(*child) else {
                continue;
            };
            if child_bottom < top || child_top > bottom {
                continue;
            }
            if child_top < top || child_bottom > bottom {
                return None;
            }
            inside.push(*child);
        }
        Some(inside)
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Whether an execution spanning `y..y + height` can be added on the
    /// lifeline of `lifeline` (a lifeline, execution or lane cluster).
    pub fn can_add_execution_specification(&self, lifeline: NodeId, y: f32, height: f32) -> bool {
        if !y.is_finite() || !height.is_finite() || height <= 0.0 {
            return false;
        }
        let Some(AnchorTarget::Lifeline(lifeline)) =
            self.resolve_anchor(&Anchor::new(lifeline, y))
        else {
            return false;
        };
        let bottom = y + height;
        if !self.occurrence_allowed(lifeline, y, &[])
            || !self.occurrence_allowed(lifeline, bottom, &[])
        {
            return false;
        }
        let container = self.container_at(lifeline, y);
        container == self.container_at(lifeline, bottom)
            && self.children_within(container, y, bottom, &[]).is_some()
    }

    /// Adds an execution spanning `y..y + height`. Siblings inside the range
    /// become its children.
    pub fn add_execution_specification<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        lifeline: NodeId,
        y: f32,
        height: f32,
    ) -> Result<NodeId, EditError> {
        self.ensure_node(lifeline)?;
        ensure(
            self.can_add_execution_specification(lifeline, y, height),
            "add_execution_specification",
        )?;
        let lifeline = self.lifeline_of(lifeline).ok_or(EditError::StaleHandle)?;
        let bottom = y + height;
        let container = self.container_at(lifeline, y);
        let wrapped = self.children_within(container, y, bottom, &[]).unwrap_or_default();
        let index = self
            .children(container)
            .iter()
            .position(|child| self.span(*child).is_some_and(|(top, _)| top >= y))
            .unwrap_or(self.children(container).len());

        let mut graph = self.begin_batch();
        let interaction = model.interaction();
        let covered: Vec<_> = graph.node_element(lifeline).into_iter().collect();
        let element = new_element(
            model,
            ElementKind::ExecutionSpecification,
            interaction,
            &covered,
        );
        let start = graph
            .new_occurrence(model, lifeline, OccurrenceKind::Execution, y)
            .ok_or_else(|| {
                EditError::Inconsistent("cannot create the execution start".to_string())
            })?;
        let finish = graph
            .new_occurrence(model, lifeline, OccurrenceKind::Execution, bottom)
            .ok_or_else(|| {
                EditError::Inconsistent("cannot create the execution finish".to_string())
            })?;

        let cluster = graph.alloc(Node::new(
            NodeKind::ExecutionSpecification,
            Some(element),
            None,
        ));
        for child in &wrapped {
            graph.detach(*child);
        }
        graph.insert_child(container, cluster, index);
        graph.push_child(cluster, start);
        for child in wrapped {
            graph.push_child(cluster, child);
        }
        graph.push_child(cluster, finish);

        let start_element = graph.node_element(start);
        let finish_element = graph.node_element(finish);
        if let Some(spec) = model.element_mut(element).and_then(Element::as_execution_mut) {
            spec.set_start(start_element);
            spec.set_finish(finish_element);
        }
        debug!(execution:% = cluster, y, height; "Added execution specification");
        graph.layout();
        Ok(cluster)
    }

    // =========================================================================
    // Nudge
    // =========================================================================

    pub fn can_nudge_execution_specification(&self, cluster: NodeId, dy: f32) -> bool {
        let Some((start, _)) = self.execution_ends(cluster) else {
            return false;
        };
        match self.start_link(cluster) {
            Some(link) => self.can_nudge_message(link, dy),
            None => self
                .first_row([start])
                .is_some_and(|row| self.can_nudge_rows(row, dy)),
        }
    }

    /// Nudges the rows from the start of the execution onward. An execution
    /// started by a message nudges that message.
    pub fn nudge_execution_specification(
        &mut self,
        cluster: NodeId,
        dy: f32,
    ) -> Result<(), EditError> {
        self.ensure_node(cluster)?;
        ensure(
            self.can_nudge_execution_specification(cluster, dy),
            "nudge_execution_specification",
        )?;
        if let Some(link) = self.start_link(cluster) {
            return self.nudge_message(link, dy);
        }
        let row = self
            .execution_ends(cluster)
            .and_then(|(start, _)| self.first_row([start]))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_rows_from(row, dy, &[]);
        graph.layout();
        Ok(())
    }

    // =========================================================================
    // Resize
    // =========================================================================

    /// The reply receive that follows the finish of `cluster`.
    fn reply_receive(&self, finish: NodeId) -> Option<NodeId> {
        let link = self.outgoing_link(finish)?;
        let record = self.link(link)?;
        (record.sort() == MessageSort::Reply)
            .then(|| record.target())
            .flatten()
    }

    /// Nodes that change cluster when `side` of `cluster` moves to `y`, or
    /// `None` when the move is invalid.
    fn resize_transfer(
        &self,
        cluster: NodeId,
        side: ExecutionSide,
        y: f32,
    ) -> Option<Vec<NodeId>> {
        let (start, finish) = self.execution_ends(cluster)?;
        let (top, bottom) = (self.y(start)?, self.y(finish)?);
        let parent = self.parent(cluster)?;
        let lifeline = self.lifeline_of(cluster)?;

        let (new_top, new_bottom) = match side {
            ExecutionSide::Top => (y, bottom),
            ExecutionSide::Bottom => (top, y),
        };
        if new_top >= new_bottom {
            return None;
        }
        if self.is_lifeline(parent) {
            if new_top <= self.header_bottom(lifeline)
                || self.after_destruction(lifeline, new_bottom, &[])
            {
                return None;
            }
        } else {
            let (parent_top, parent_bottom) = self.span(parent)?;
            if new_top <= parent_top || new_bottom >= parent_bottom {
                return None;
            }
        }

        let siblings = self.children(parent);
        let inner = self.children(cluster);
        let inner = &inner[1..inner.len() - 1];
        let position = siblings.iter().position(|child| *child == cluster)?;
        let mut nodes = Vec::new();

        match side {
            ExecutionSide::Top if new_top < top => {
                for sibling in siblings[..position].iter().rev() {
                    let (sibling_top, sibling_bottom) = self.span(*sibling)?;
                    if sibling_bottom < new_top {
                        break;
                    }
                    if sibling_top < new_top {
                        return None;
                    }
                    nodes.insert(0, *sibling);
                }
            }
            ExecutionSide::Top => {
                for child in inner {
                    let (child_top, child_bottom) = self.span(*child)?;
                    if child_top >= new_top {
                        break;
                    }
                    if child_bottom >= new_top {
                        return None;
                    }
                    nodes.push(*child);
                }
            }
            ExecutionSide::Bottom if new_bottom > bottom => {
                for sibling in &siblings[position + 1..] {
                    let (sibling_top, sibling_bottom) = self.span(*sibling)?;
                    if sibling_top > new_bottom {
                        break;
                    }
                    if sibling_bottom > new_bottom {
                        return None;
                    }
                    nodes.push(*sibling);
                }
            }
            ExecutionSide::Bottom => {
                for child in inner.iter().rev() {
                    let (child_top, child_bottom) = self.span(*child)?;
                    if child_bottom <= new_bottom {
                        break;
                    }
                    if child_top <= new_bottom {
                        return None;
                    }
                    nodes.insert(0, *child);
                }
            }
        }
        Some(nodes)
    }

    /// Whether `side` of `cluster` can move by `delta`.
    ///
    /// Moving the top of an execution started by a message would replace its
    /// start occurrence, which is not supported.
    pub fn can_resize_execution_specification(
        &self,
        cluster: NodeId,
        side: ExecutionSide,
        delta: f32,
    ) -> bool {
        if !delta.is_finite() {
            return false;
        }
        let Some((start, finish)) = self.execution_ends(cluster) else {
            return false;
        };
        let boundary = match side {
            ExecutionSide::Top => start,
            ExecutionSide::Bottom => finish,
        };
        let reply = self.reply_receive(finish);
        match side {
            ExecutionSide::Top if self.link_of(start).is_some() => return false,
            ExecutionSide::Bottom if self.link_of(finish).is_some() && reply.is_none() => {
                return false;
            }
            _ => {}
        }
        let Some(y) = self.y(boundary).map(|y| y + delta) else {
            return false;
        };
        if self.resize_transfer(cluster, side, y).is_none() {
            return false;
        }

        if let (ExecutionSide::Bottom, Some(receive)) = (side, reply) {
            let Some(caller) = self.lifeline_of(receive) else {
                return false;
            };
            if !self.anchor_allowed(&Anchor::new(caller, y), &[receive]) {
                return false;
            }
            let moved = HashMap::from([(finish, y), (receive, y)]);
            if !self.keeps_causality(&moved) {
                return false;
            }
        }
        self.dry_run(|graph, _| graph.resize_boundary(cluster, side, delta))
    }

    /// Moves the top or bottom of `cluster` by `delta`, moving the siblings
    /// the new boundary passes into or out of the cluster. The reply of a
    /// synchronous call follows the bottom.
    pub fn resize_execution_specification(
        &mut self,
        cluster: NodeId,
        side: ExecutionSide,
        delta: f32,
    ) -> Result<(), EditError> {
        self.ensure_node(cluster)?;
        if side == ExecutionSide::Top && self.start_link(cluster).is_some() {
            return Err(EditError::NotImplemented(
                "replacing the start occurrence of an execution specification",
            ));
        }
        ensure(
            self.can_resize_execution_specification(cluster, side, delta),
            "resize_execution_specification",
        )?;
        self.resize_boundary(cluster, side, delta)?;
        debug!(execution:% = cluster, delta; "Resized execution specification");
        Ok(())
    }

    fn resize_boundary(
        &mut self,
        cluster: NodeId,
        side: ExecutionSide,
        delta: f32,
    ) -> Result<(), EditError> {
        let (start, finish) = self.execution_ends(cluster).ok_or(EditError::StaleHandle)?;
        let boundary = match side {
            ExecutionSide::Top => start,
            ExecutionSide::Bottom => finish,
        };
        let y = self.y(boundary).map(|y| y + delta).ok_or(EditError::StaleHandle)?;
        let reply = self.reply_receive(finish);

        let mut graph = self.begin_batch();
        graph.shift_execution_boundary(cluster, side, y)?;
        if let (ExecutionSide::Bottom, Some(receive)) = (side, reply) {
            if let Some(caller) = graph.lifeline_of(receive) {
                graph.place_unit(receive, caller, y);
            }
        }
        graph.layout();
        Ok(())
    }

    /// Puts `side` of `cluster` at `y`, handing over the siblings the new
    /// boundary passes. Message peers are left to the caller.
    fn shift_execution_boundary(
        &mut self,
        cluster: NodeId,
        side: ExecutionSide,
        y: f32,
    ) -> Result<(), EditError> {
        let (start, finish) = self.execution_ends(cluster).ok_or(EditError::StaleHandle)?;
        let boundary = match side {
            ExecutionSide::Top => start,
            ExecutionSide::Bottom => finish,
        };
        let current = self.y(boundary).ok_or(EditError::StaleHandle)?;
        let transfer = self.resize_transfer(cluster, side, y).ok_or_else(|| {
            EditError::Inconsistent(format!("execution {cluster} cannot end at {y}"))
        })?;
        let inward = match side {
            ExecutionSide::Top => y < current,
            ExecutionSide::Bottom => y > current,
        };

        for node in &transfer {
            self.detach(*node);
        }
        let (parent, at) = if inward {
            let at = match side {
                ExecutionSide::Top => 1,
                ExecutionSide::Bottom => self.children(cluster).len() - 1,
            };
            (cluster, at)
        } else {
            let parent = self.parent(cluster).ok_or_else(|| {
                EditError::Inconsistent(format!("execution {cluster} has no parent"))
            })?;
            let position = self
                .children(parent)
                .iter()
                .position(|child| *child == cluster)
                .unwrap_or_default();
            match side {
                ExecutionSide::Top => (parent, position),
                ExecutionSide::Bottom => (parent, position + 1),
            }
        };
        for (offset, node) in transfer.into_iter().enumerate() {
            self.insert_child(parent, node, at + offset);
        }
        self.set_y(boundary, y);
        Ok(())
    }

    // =========================================================================
    // Occurrence move
    // =========================================================================

    /// The execution `occurrence` opens or closes, and which side it is.
    fn boundary_of(&self, occurrence: NodeId) -> Option<(NodeId, ExecutionSide)> {
        if let Some(cluster) = self.started_execution(occurrence) {
            return Some((cluster, ExecutionSide::Top));
        }
        self.finished_execution(occurrence)
            .map(|cluster| (cluster, ExecutionSide::Bottom))
    }

    /// The other end of the message attached to `node`.
    fn message_peer(&self, node: NodeId) -> Option<NodeId> {
        let record = self.link(self.link_of(node)?)?;
        record.ends().find(|end| *end != node)
    }

    /// Whether the start or finish `occurrence` of an execution can move to
    /// `y`. The execution keeps a positive height inside its parent, and the
    /// other end of a message attached to the occurrence moves to `y` too.
    pub fn can_move_execution_occurrence(&self, occurrence: NodeId, y: f32) -> bool {
        if !y.is_finite() {
            return false;
        }
        let Some((cluster, side)) = self.boundary_of(occurrence) else {
            return false;
        };
        let Some(lifeline) = self.lifeline_of(cluster) else {
            return false;
        };
        if self.resize_transfer(cluster, side, y).is_none()
            || !self.anchor_allowed(&Anchor::new(lifeline, y), &[occurrence])
        {
            return false;
        }

        let mut moved = HashMap::from([(occurrence, y)]);
        if let Some(peer) = self.message_peer(occurrence) {
            if self.boundary_of(peer).is_some() {
                return false;
            }
            let Some(anchor) = self.y(peer).and_then(|peer_y| self.anchor_of(peer, y - peer_y))
            else {
                return false;
            };
            if !self.anchor_allowed(&anchor, &[peer]) {
                return false;
            }
            moved.insert(peer, y);
        }
        self.keeps_causality(&moved)
            && self.dry_run(|graph, _| graph.shift_execution_occurrence(occurrence, y))
    }

    /// Moves the start or finish `occurrence` of an execution to `y`,
    /// resizing the execution, and brings the other end of its message
    /// along.
    pub fn move_execution_occurrence(
        &mut self,
        occurrence: NodeId,
        y: f32,
    ) -> Result<(), EditError> {
        self.ensure_node(occurrence)?;
        ensure(
            self.can_move_execution_occurrence(occurrence, y),
            "move_execution_occurrence",
        )?;
        self.shift_execution_occurrence(occurrence, y)?;
        debug!(occurrence:% = occurrence, y; "Moved execution occurrence");
        Ok(())
    }

    fn shift_execution_occurrence(&mut self, occurrence: NodeId, y: f32) -> Result<(), EditError> {
        let (cluster, side) = self.boundary_of(occurrence).ok_or(EditError::StaleHandle)?;
        let peer = self.message_peer(occurrence);

        let mut graph = self.begin_batch();
        graph.shift_execution_boundary(cluster, side, y)?;
        match peer {
            Some(peer) if graph.kind(peer) == Some(NodeKind::Gate) => graph.set_y(peer, y),
            Some(peer) => {
                if let Some(lifeline) = graph.lifeline_of(peer) {
                    graph.place_unit(peer, lifeline, y);
                }
            }
            None => {}
        }
        graph.layout();
        Ok(())
    }

    // =========================================================================
    // Move
    // =========================================================================

    /// Anchor keeping `node` where it is, shifted down by `dy`.
    fn anchor_of(&self, node: NodeId, dy: f32) -> Option<Anchor> {
        let y = self.y(node)? + dy;
        let target = match self.kind(node)? {
            NodeKind::Gate => self.parent(node)?,
            _ => self.lifeline_of(node)?,
        };
        Some(Anchor::new(target, y))
    }

    /// The message move equivalent to moving a message-started `cluster` to
    /// `anchor`.
    fn execution_as_message_move(
        &self,
        cluster: NodeId,
        anchor: &Anchor,
    ) -> Option<(LinkId, Option<Anchor>, Option<Anchor>)> {
        let link = self.start_link(cluster)?;
        let record = self.link(link)?;
        let (start, _) = self.execution_ends(cluster)?;
        let dy = anchor.y() - self.y(start)?;
        let same_lifeline = matches!(
            self.resolve_anchor(anchor),
            Some(AnchorTarget::Lifeline(lifeline)) if Some(lifeline) == self.lifeline_of(cluster)
        );

        let peer = if record.source() == Some(start) {
            record.target()
        } else {
            record.source()
        };
        let peer_anchor = match (same_lifeline, peer) {
            (true, Some(peer)) => Some(self.anchor_of(peer, dy)?),
            _ => None,
        };
        if record.source() == Some(start) {
            Some((link, Some(*anchor), peer_anchor))
        } else {
            Some((link, peer_anchor, Some(*anchor)))
        }
    }

    /// Whether `cluster` can move so that its start sits at `anchor`. Every
    /// leaf inside lands on a free stretch of the destination lifeline.
    pub fn can_move_execution_specification(&self, cluster: NodeId, anchor: Anchor) -> bool {
        self.execution_move_allowed(cluster, &anchor)
            && self.dry_run(|graph, model| graph.relocate_execution(model, cluster, anchor))
    }

    fn execution_move_allowed(&self, cluster: NodeId, anchor: &Anchor) -> bool {
        let Some((start, finish)) = self.execution_ends(cluster) else {
            return false;
        };
        if !self.contains(anchor.target()) {
            return false;
        }
        let Some(AnchorTarget::Lifeline(lifeline)) = self.resolve_anchor(anchor) else {
            return false;
        };
        if self.start_link(cluster).is_some() {
            return self
                .execution_as_message_move(cluster, anchor)
                .is_some_and(|(link, source, target)| {
                    self.message_move_allowed(link, source, target)
                });
        }
        if self.link_of(finish).is_some() {
            return false;
        }

        let subtree = self.descendants(cluster);
        if subtree.iter().any(|node| self.kind(*node) == Some(NodeKind::Lane)) {
            return false;
        }
        let (Some(top), Some(bottom)) = (self.y(start), self.y(finish)) else {
            return false;
        };
        let dy = anchor.y() - top;
        self.unit_fits(cluster, lifeline, top + dy, bottom + dy, &subtree)
            && self.keeps_causality(&self.shifted_leaves(cluster, dy))
    }

    /// Moves `cluster` with everything in it so that its start sits at
    /// `anchor`. An execution started by a message moves that message.
    pub fn move_execution_specification<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        cluster: NodeId,
        anchor: Anchor,
    ) -> Result<(), EditError> {
        self.ensure_node(cluster)?;
        self.ensure_anchor(Some(&anchor))?;
        ensure(
            self.can_move_execution_specification(cluster, anchor),
            "move_execution_specification",
        )?;
        self.relocate_execution(model, cluster, anchor)?;
        debug!(execution:% = cluster, target:% = anchor.target(); "Moved execution specification");
        Ok(())
    }

    fn relocate_execution<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        cluster: NodeId,
        anchor: Anchor,
    ) -> Result<(), EditError> {
        if let Some((link, source, target)) = self.execution_as_message_move(cluster, &anchor) {
            return self.relocate_message(model, link, source, target);
        }
        let Some(AnchorTarget::Lifeline(lifeline)) = self.resolve_anchor(&anchor) else {
            return Err(EditError::precondition("move_execution_specification"));
        };

        let mut graph = self.begin_batch();
        graph.place_unit(cluster, lifeline, anchor.y());
        graph.layout();
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    pub fn can_delete_execution_specification(&self, cluster: NodeId) -> bool {
        let Some((_, finish)) = self.execution_ends(cluster) else {
            return false;
        };
        match self.start_link(cluster) {
            Some(link) => self.can_delete_message(link),
            None => self.link_of(finish).is_none(),
        }
    }

    /// Deletes `cluster`. An execution started by a message goes with that
    /// message's block; any other execution is unwrapped, its children
    /// returning to the parent.
    pub fn delete_execution_specification(&mut self, cluster: NodeId) -> Result<(), EditError> {
        self.ensure_node(cluster)?;
        ensure(
            self.can_delete_execution_specification(cluster),
            "delete_execution_specification",
        )?;
        if let Some(link) = self.start_link(cluster) {
            return self.delete_message(link);
        }
        let children = self.children(cluster).to_vec();
        let inner = &children[1..children.len() - 1];

        let mut graph = self.begin_batch();
        let (parent, index) = graph
            .detach(cluster)
            .ok_or_else(|| EditError::Inconsistent(format!("execution {cluster} has no parent")))?;
        for (offset, child) in inner.iter().enumerate() {
            graph.detach(*child);
            graph.insert_child(parent, *child, index + offset);
        }
        graph.remove_node(cluster);
        debug!(execution:% = cluster, children = inner.len(); "Deleted execution specification");
        graph.layout();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use weft_core::identifier::Id;

    use super::*;
    use crate::{
        GraphBuilder,
        model::{Interaction, ViewLayout},
    };

    fn setup(name: &str, lifelines: usize) -> (Interaction, InteractionGraph) {
        let mut model = Interaction::new(Id::new(name));
        for index in 0..lifelines {
            model.add_lifeline(Id::new(&format!("{name}_{index}")));
        }
        let graph = GraphBuilder::default().build(&model, &ViewLayout::new());
        (model, graph)
    }

    fn message(
        model: &mut Interaction,
        graph: &mut InteractionGraph,
        sort: MessageSort,
        y: f32,
    ) -> LinkId {
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        graph
            .add_message(model, sort, Some(Anchor::new(a, y)), Some(Anchor::new(b, y)))
            .unwrap_or_else(|e| panic!("message at {y} refused: {e}"))
    }

    fn call_execution(graph: &InteractionGraph) -> NodeId {
        graph.children(graph.lifelines()[1])[0]
    }

    #[test]
    fn test_add_execution_wraps_siblings() {
        let (mut model, mut graph) = setup("ex_add", 2);
        message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        let b = graph.lifelines()[1];

        let execution = graph.add_execution_specification(&mut model, b, 80.0, 60.0);
        let execution = execution.unwrap_or_else(|e| panic!("execution refused: {e}"));
        assert_eq!(graph.children(b), &[execution]);
        assert_eq!(graph.children(execution).len(), 3, "start, receive, finish");
        assert!(graph.started_execution(graph.children(execution)[0]).is_some());
    }

    #[test]
    fn test_add_execution_refuses_straddle() {
        let (mut model, mut graph) = setup("ex_straddle", 2);
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let b = graph.lifelines()[1];
        let (top, bottom) = graph.span(graph.children(b)[0]).unwrap_or_default();

        assert!(
            !graph.can_add_execution_specification(b, (top + bottom) / 2.0, bottom - top),
            "would span two parents"
        );
        assert!(graph.can_add_execution_specification(b, top + 5.0, (bottom - top) / 2.0));
    }

    #[test]
    fn test_resize_top_of_call_execution_not_implemented() {
        let (mut model, mut graph) = setup("ex_top", 2);
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = graph.children(graph.lifelines()[1])[0];

        assert!(!graph.can_resize_execution_specification(execution, ExecutionSide::Top, -10.0));
        assert!(matches!(
            graph.resize_execution_specification(execution, ExecutionSide::Top, -10.0),
            Err(EditError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_resize_bottom_absorbs_and_expels() {
        let (mut model, mut graph) = setup("ex_resize", 2);
        let b = graph.lifelines()[1];
        let execution = graph
            .add_execution_specification(&mut model, b, 80.0, 40.0)
            .unwrap_or_else(|e| panic!("execution refused: {e}"));
        message(&mut model, &mut graph, MessageSort::Asynchronous, 160.0);
        assert_eq!(graph.children(b).len(), 2, "execution and receive side by side");

        let grown = graph.resize_execution_specification(execution, ExecutionSide::Bottom, 60.0);
        assert!(grown.is_ok());
        assert_eq!(graph.children(b), &[execution]);
        assert_eq!(graph.children(execution).len(), 3);

        let shrunk = graph.resize_execution_specification(execution, ExecutionSide::Bottom, -60.0);
        assert!(shrunk.is_ok());
        assert_eq!(graph.children(b).len(), 2, "receive pushed back out");
        assert_eq!(graph.children(b)[0], execution);
    }

    #[test]
    fn test_resize_bottom_moves_reply() {
        let (mut model, mut graph) = setup("ex_reply", 2);
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = graph.children(graph.lifelines()[1])[0];
        let finish = graph.children(execution)[1];
        let before = graph.y(finish).unwrap_or_default();

        let resized = graph.resize_execution_specification(execution, ExecutionSide::Bottom, 30.0);
        assert!(resized.is_ok());
        let receive = graph.reply_receive(finish);
        let after = graph.y(finish).unwrap_or_default();
        assert!((after - before - 30.0).abs() < 0.01);
        assert_eq!(receive.and_then(|r| graph.y(r)), Some(after), "reply stays horizontal");
    }

    #[test]
    fn test_delete_execution_splices_children() {
        let (mut model, mut graph) = setup("ex_delete", 2);
        message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        let b = graph.lifelines()[1];
        let receive = graph.children(b)[0];
        let execution = graph
            .add_execution_specification(&mut model, b, 80.0, 60.0)
            .unwrap_or_else(|e| panic!("execution refused: {e}"));

        assert!(graph.delete_execution_specification(execution).is_ok());
        assert_eq!(graph.children(b), &[receive]);
        assert!(!graph.contains(execution));
    }

    #[test]
    fn test_delete_call_execution_deletes_message() {
        let (mut model, mut graph) = setup("ex_delete_call", 2);
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = graph.children(graph.lifelines()[1])[0];

        assert!(graph.delete_execution_specification(execution).is_ok());
        assert_eq!(graph.links().count(), 0);
    }

    #[test]
    fn test_nudge_call_execution_nudges_message() {
        let (mut model, mut graph) = setup("ex_nudge", 2);
        let link = message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = graph.children(graph.lifelines()[1])[0];
        let send = graph.link(link).and_then(|l| l.source());
        let before = send.and_then(|s| graph.y(s)).unwrap_or_default();

        assert!(graph.nudge_execution_specification(execution, 20.0).is_ok());
        let after = send.and_then(|s| graph.y(s)).unwrap_or_default();
        assert!((after - before - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_move_execution_to_other_lifeline() {
        let (mut model, mut graph) = setup("ex_move", 3);
        let b = graph.lifelines()[1];
        let c = graph.lifelines()[2];
        let execution = graph
            .add_execution_specification(&mut model, b, 80.0, 40.0)
            .unwrap_or_else(|e| panic!("execution refused: {e}"));

        let anchor = Anchor::new(c, 100.0);
        assert!(graph.move_execution_specification(&mut model, execution, anchor).is_ok());
        assert!(graph.children(b).is_empty());
        assert_eq!(graph.children(c), &[execution]);
        assert_eq!(graph.span(execution), Some((100.0, 140.0)));
        assert!(graph.is_well_formed());
    }

    #[test]
    fn test_move_call_execution_over_busy_lifeline_refused() {
        let (mut model, mut graph) = setup("ex_move_busy", 3);
        let a = graph.lifelines()[0];
        let c = graph.lifelines()[2];
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = call_execution(&graph);
        let (top, bottom) = graph.span(execution).unwrap_or_default();
        let middle = (top + bottom) / 2.0;
        let link = graph
            .add_message(
                &mut model,
                MessageSort::Asynchronous,
                Some(Anchor::new(a, middle)),
                Some(Anchor::new(c, middle)),
            )
            .unwrap_or_else(|e| panic!("message refused: {e}"));
        let receive = graph.link(link).and_then(|l| l.target()).unwrap_or_else(|| panic!());
        let receive_y = graph.y(receive).unwrap_or_default();
        let (top, bottom) = graph.span(execution).unwrap_or_default();
        assert!(top < receive_y && receive_y < bottom, "receive lies beside the execution");

        assert!(!graph.can_move_execution_specification(execution, Anchor::new(c, top)));
        let moved = graph.move_execution_specification(&mut model, execution, Anchor::new(c, top));
        assert!(matches!(moved, Err(EditError::Precondition(_))));
        assert_eq!(graph.children(c), &[receive], "nothing moved onto the busy lifeline");
        assert!(graph.is_well_formed());
    }

    #[test]
    fn test_move_execution_finish_resizes() {
        let (mut model, mut graph) = setup("ex_occurrence", 2);
        let b = graph.lifelines()[1];
        let execution = graph
            .add_execution_specification(&mut model, b, 80.0, 40.0)
            .unwrap_or_else(|e| panic!("execution refused: {e}"));
        let finish = graph.children(execution)[1];

        assert!(!graph.can_move_execution_occurrence(finish, 50.0), "above the start");
        assert!(graph.move_execution_occurrence(finish, 150.0).is_ok());
        assert_eq!(graph.span(execution), Some((80.0, 150.0)));
    }

    #[test]
    fn test_move_reply_send_brings_reply_receive() {
        let (mut model, mut graph) = setup("ex_occurrence_reply", 2);
        message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = call_execution(&graph);
        let finish = graph.children(execution)[1];
        let receive = graph.reply_receive(finish).unwrap_or_else(|| panic!("reply expected"));
        let y = graph.y(finish).unwrap_or_default() + 30.0;

        assert!(graph.move_execution_occurrence(finish, y).is_ok());
        assert_eq!(graph.y(finish), Some(y));
        assert_eq!(graph.y(receive), Some(y), "reply stays horizontal");
        assert!(graph.is_well_formed());
    }

    #[test]
    fn test_move_call_start_brings_send() {
        let (mut model, mut graph) = setup("ex_occurrence_call", 2);
        let link = message(&mut model, &mut graph, MessageSort::Synchronous, 100.0);
        let execution = call_execution(&graph);
        let start = graph.children(execution)[0];
        let send = graph.link(link).and_then(|l| l.source()).unwrap_or_else(|| panic!());

        assert!(graph.move_execution_occurrence(start, 90.0).is_ok());
        assert_eq!(graph.y(start), Some(90.0));
        assert_eq!(graph.y(send), Some(90.0));
        assert_eq!(graph.start_link(execution), Some(link), "the call still starts it");
    }

    #[test]
    fn test_move_occurrence_needs_execution_end() {
        let (mut model, mut graph) = setup("ex_occurrence_plain", 2);
        let link = message(&mut model, &mut graph, MessageSort::Asynchronous, 100.0);
        let receive = graph.link(link).and_then(|l| l.target()).unwrap_or_else(|| panic!());

        assert!(!graph.can_move_execution_occurrence(receive, 120.0));
        assert!(matches!(
            graph.move_execution_occurrence(receive, 120.0),
            Err(EditError::Precondition(_))
        ));
    }
}
