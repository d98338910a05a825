use std::collections::HashMap;

use log::debug;

use weft_core::semantic::{Element, ElementKind, MessageSort, OccurrenceKind};

use super::{Anchor, AnchorTarget, ensure, new_element};
use crate::{
    error::EditError,
    graph::{InteractionGraph, Link, LinkId, Node, NodeId, NodeKind},
    model::SemanticModel,
};

impl InteractionGraph {
    /// Whether a message of `sort` can be added between the two anchors.
    ///
    /// A found message has no source and a lost message no target; every
    /// other sort needs both. The anchors must still be valid once the rows
    /// below them have moved down to make room.
    pub fn can_add_message(
        &self,
        sort: MessageSort,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> bool {
        self.message_allowed(sort, source, target)
            && self.dry_run(|graph, model| {
                graph.insert_message(model, sort, source, target).map(|_| ())
            })
    }

    fn message_allowed(
        &self,
        sort: MessageSort,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> bool {
        match (sort, source, target) {
            (MessageSort::Found, None, Some(target)) => {
                self.contains(target.target()) && self.anchor_allowed(&target, &[])
            }
            (MessageSort::Lost, Some(source), None) => {
                self.contains(source.target()) && self.anchor_allowed(&source, &[])
            }
            (MessageSort::Found | MessageSort::Lost | MessageSort::Reply, _, _) => false,
            (_, Some(source), Some(target)) => self.can_connect(sort, &source, &target),
            _ => false,
        }
    }

    fn can_connect(&self, sort: MessageSort, source: &Anchor, target: &Anchor) -> bool {
        if !self.contains(source.target()) || !self.contains(target.target()) {
            return false;
        }
        if target.y() < source.y()
            || !self.anchor_allowed(source, &[])
            || !self.anchor_allowed(target, &[])
        {
            return false;
        }
        let source_end = self.resolve_anchor(source);
        let target_end = self.resolve_anchor(target);
        if matches!(
            (source_end, target_end),
            (Some(AnchorTarget::Gate(_)), Some(AnchorTarget::Gate(_)))
        ) {
            return false;
        }

        match sort {
            MessageSort::Create => {
                let Some(AnchorTarget::Lifeline(lifeline)) = target_end else {
                    return false;
                };
                self.is_lifeline(target.target())
                    && source_end != target_end
                    && self.creator(lifeline).is_none()
                    && self
                        .first_leaf(lifeline)
                        .and_then(|first| self.y(first))
                        .is_none_or(|first| target.y() < first)
            }
            MessageSort::Delete => {
                let Some(AnchorTarget::Lifeline(lifeline)) = target_end else {
                    return false;
                };
                self.is_lifeline(target.target())
                    && !self.is_destroyed(lifeline)
                    && self
                        .last_leaf(lifeline)
                        .and_then(|last| self.y(last))
                        .is_none_or(|last| target.y() > last)
            }
            _ => true,
        }
    }

    /// Adds a message between two anchors and returns its link.
    ///
    /// Rows at and below the upper anchor move down to make room. A
    /// synchronous call between lifelines, including a call a lifeline makes
    /// to itself, also gets an execution on the receiving side and a reply
    /// message closing it.
    pub fn add_message<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        sort: MessageSort,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> Result<LinkId, EditError> {
        self.ensure_anchor(source.as_ref())?;
        self.ensure_anchor(target.as_ref())?;
        ensure(self.can_add_message(sort, source, target), "add_message")?;
        let link = self.insert_message(model, sort, source, target)?;
        debug!(link:% = link, sort:% = sort; "Added message");
        Ok(link)
    }

    fn insert_message<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        sort: MessageSort,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> Result<LinkId, EditError> {
        let lifeline = |anchor: Option<Anchor>| match anchor.and_then(|a| self.resolve_anchor(&a)) {
            Some(AnchorTarget::Lifeline(lifeline)) => Some(lifeline),
            _ => None,
        };
        let (from, to) = (lifeline(source), lifeline(target));
        let call = sort == MessageSort::Synchronous && from.is_some() && to.is_some();
        let extra = match (call, from == to) {
            (true, false) => self.config().sync_offset(),
            (true, true) => self.config().self_sync_offset(),
            _ => 0.0,
        };
        let top = source
            .iter()
            .chain(target.iter())
            .map(Anchor::y)
            .fold(f32::INFINITY, f32::min);

        let mut graph = self.begin_batch();
        let spacing = graph.config().row_spacing();
        graph.shift_below(top, spacing + extra);
        // the shift may have stretched an interaction use over an anchor
        if !graph.message_allowed(sort, source, target) {
            return Err(EditError::precondition("add_message"));
        }

        let send = match source {
            Some(anchor) => {
                let end = graph.new_end(model, &anchor, OccurrenceKind::Message);
                Some(end.ok_or_else(|| EditError::Inconsistent("cannot place the send".into()))?)
            }
            None => None,
        };
        let receive_kind = match sort {
            MessageSort::Delete => OccurrenceKind::Destruction,
            _ => OccurrenceKind::Message,
        };
        let receive = match target {
            Some(anchor) => {
                let end = graph.new_end(model, &anchor, receive_kind);
                Some(end.ok_or_else(|| EditError::Inconsistent("cannot place the receive".into()))?)
            }
            None => None,
        };

        let link = graph.new_link(model, sort, send, receive);
        if call {
            graph.add_reply(model, link)?;
        }
        graph.layout();
        Ok(link)
    }

    /// Creates the message element and link between two placed ends.
    pub(super) fn new_link<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        sort: MessageSort,
        send: Option<NodeId>,
        receive: Option<NodeId>,
    ) -> LinkId {
        let interaction = model.interaction();
        let element = new_element(model, ElementKind::Message(sort), interaction, &[]);
        let send_element = send.and_then(|node| self.node_element(node));
        let receive_element = receive.and_then(|node| self.node_element(node));
        if let Some(message) = model.element_mut(element).and_then(Element::as_message_mut) {
            message.set_send(send_element);
            message.set_receive(receive_element);
        }

        let link = self.add_link(Link::new(Some(element), sort, send, receive));
        if let (Some(send), Some(receive)) = (send, receive) {
            let receive = self.started_execution(receive).unwrap_or(receive);
            self.connect(send, receive);
        }
        link
    }

    /// Wraps the receive end of the call `link` in a new execution and closes
    /// it with a reply `reply_offset` below. The reply of a self call lands a
    /// row's spacing under its send.
    fn add_reply<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        link: LinkId,
    ) -> Result<LinkId, EditError> {
        let (send, receive) = self
            .link(link)
            .and_then(|link| Some((link.source()?, link.target()?)))
            .ok_or_else(|| EditError::Inconsistent(format!("call {link} has a missing end")))?;
        let (Some(caller), Some(callee)) = (self.lifeline_of(send), self.lifeline_of(receive))
        else {
            return Err(EditError::Inconsistent(format!("call {link} is not between lifelines")));
        };
        let receive_y = self
            .y(receive)
            .ok_or_else(|| EditError::Inconsistent(format!("call {link} is not placed")))?;
        let reply_y = receive_y + self.config().reply_offset();
        let return_y = if caller == callee {
            reply_y + self.config().row_spacing()
        } else {
            reply_y
        };

        let interaction = model.interaction();
        let callee_element = self.node_element(callee).into_iter().collect::<Vec<_>>();
        let execution = new_element(
            model,
            ElementKind::ExecutionSpecification,
            interaction,
            &callee_element,
        );
        let cluster =
            self.alloc(Node::new(NodeKind::ExecutionSpecification, Some(execution), None));
        let (parent, index) = self.detach(receive).ok_or_else(|| {
            EditError::Inconsistent(format!("receive of {link} has no container"))
        })?;
        self.insert_child(parent, cluster, index);
        self.push_child(cluster, receive);

        let reply_send = self
            .new_occurrence(model, callee, OccurrenceKind::Message, reply_y)
            .ok_or_else(|| EditError::Inconsistent("cannot create the reply send".to_string()))?;
        self.push_child(cluster, reply_send);
        let reply_receive = self
            .new_occurrence(model, caller, OccurrenceKind::Message, return_y)
            .ok_or_else(|| EditError::Inconsistent("cannot create the reply receive".to_string()))?;
        let container = self.container_at(caller, return_y);
        self.insert_child_at_y(container, reply_receive, return_y);

        self.connect(send, cluster);
        let start = self.node_element(receive);
        let finish = self.node_element(reply_send);
        if let Some(spec) = model.element_mut(execution).and_then(Element::as_execution_mut) {
            spec.set_start(start);
            spec.set_finish(finish);
        }
        Ok(self.new_link(model, MessageSort::Reply, Some(reply_send), Some(reply_receive)))
    }

    // =========================================================================
    // Move
    // =========================================================================

    /// Whether the ends of `link` can move to the given anchors. `None` keeps
    /// an end where it is. Executions started by a moving end go along, and
    /// must land on free stretches of their lifeline.
    pub fn can_move_message(
        &self,
        link: LinkId,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> bool {
        self.message_move_allowed(link, source, target)
            && self.dry_run(|graph, model| graph.relocate_message(model, link, source, target))
    }

    pub(super) fn message_move_allowed(
        &self,
        link: LinkId,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> bool {
        let Some(record) = self.link(link) else {
            return false;
        };
        let ends = [(record.source(), source), (record.target(), target)];
        let mut except: Vec<NodeId> = Vec::new();
        for (end, anchor) in ends {
            match (end, anchor) {
                (None, Some(_)) => return false,
                (Some(end), Some(_)) => {
                    for unit in self.moving_units(end) {
                        except.extend(self.descendants(unit));
                    }
                }
                _ => {}
            }
        }

        let mut moved: HashMap<NodeId, f32> = HashMap::new();
        for (end, anchor) in ends {
            let (Some(end), Some(anchor)) = (end, anchor) else {
                continue;
            };
            if !self.contains(anchor.target()) || !self.anchor_allowed(&anchor, &except) {
                return false;
            }
            let Some(y) = self.y(end) else {
                return false;
            };
            let dy = anchor.y() - y;
            let destination = match self.resolve_anchor(&anchor) {
                Some(AnchorTarget::Lifeline(lifeline)) => Some(lifeline),
                _ => None,
            };
            let units = self.moving_units(end);
            if destination.is_none() && units != [end] {
                return false;
            }
            if units.iter().any(|unit| {
                self.descendants(*unit)
                    .iter()
                    .any(|node| self.kind(*node) == Some(NodeKind::Lane))
            }) {
                return false;
            }
            for (index, unit) in units.iter().enumerate() {
                let lifeline = if index == 0 {
                    destination
                } else {
                    self.lifeline_of(*unit)
                };
                if let (Some(lifeline), Some((top, bottom))) = (lifeline, self.span(*unit)) {
                    if !self.unit_fits(*unit, lifeline, top + dy, bottom + dy, &except) {
                        return false;
                    }
                }
                moved.extend(self.shifted_leaves(*unit, dy));
            }
            moved.insert(end, anchor.y());
        }

        let send_y = source
            .map(|a| a.y())
            .or_else(|| record.source().and_then(|s| self.y(s)));
        let receive_y = target
            .map(|a| a.y())
            .or_else(|| record.target().and_then(|t| self.y(t)));
        if let (Some(send_y), Some(receive_y)) = (send_y, receive_y) {
            if receive_y < send_y {
                return false;
            }
        }
        if !self.sort_allows_move(record.sort(), record, source, target) {
            return false;
        }
        self.keeps_causality(&moved)
    }

    /// Whether `unit` may occupy `top..=bottom` on `lifeline`: both ends on
    /// open lifeline, and a cluster only over a stretch no other leaf uses.
    pub(super) fn unit_fits(
        &self,
        unit: NodeId,
        lifeline: NodeId,
        top: f32,
        bottom: f32,
        except: &[NodeId],
    ) -> bool {
        let cluster = self.kind(unit).is_some_and(NodeKind::is_cluster);
        self.occurrence_allowed(lifeline, top, except)
            && self.occurrence_allowed(lifeline, bottom, except)
            && (!cluster || self.leaves_between(lifeline, top, bottom, except).is_empty())
    }

    fn sort_allows_move(
        &self,
        sort: MessageSort,
        record: &Link,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> bool {
        let current = |end: Option<NodeId>| end.and_then(|end| self.lifeline_of(end));
        let destination = |anchor: &Anchor| match self.resolve_anchor(anchor) {
            Some(AnchorTarget::Lifeline(lifeline)) => Some(lifeline),
            _ => None,
        };
        match sort {
            MessageSort::Create => target.is_none_or(|anchor| {
                let Some(lifeline) = destination(&anchor) else {
                    return false;
                };
                let receive = record.target();
                (Some(lifeline) == current(receive) || self.creator(lifeline).is_none())
                    && self
                        .flatten(lifeline)
                        .into_iter()
                        .filter(|leaf| Some(*leaf) != receive)
                        .filter_map(|leaf| self.y(leaf))
                        .all(|y| y > anchor.y())
            }),
            MessageSort::Delete => target.is_none_or(|anchor| {
                let Some(lifeline) = destination(&anchor) else {
                    return false;
                };
                let receive = record.target();
                (Some(lifeline) == current(receive) || !self.is_destroyed(lifeline))
                    && self
                        .flatten(lifeline)
                        .into_iter()
                        .filter(|leaf| Some(*leaf) != receive)
                        .filter_map(|leaf| self.y(leaf))
                        .all(|y| y < anchor.y())
            }),
            MessageSort::Reply => {
                let stays = |end: Option<NodeId>, anchor: Option<Anchor>| {
                    anchor.is_none_or(|anchor| {
                        destination(&anchor).is_some() && destination(&anchor) == current(end)
                    })
                };
                if !stays(record.source(), source) || !stays(record.target(), target) {
                    return false;
                }
                let Some(send) = record.source() else {
                    return true;
                };
                source.is_none_or(|anchor| {
                    self.finished_execution(send).is_some_and(|execution| {
                        self.flatten(execution)
                            .into_iter()
                            .filter(|leaf| *leaf != send)
                            .filter_map(|leaf| self.y(leaf))
                            .all(|y| y < anchor.y())
                    })
                })
            }
            _ => true,
        }
    }

    /// Moves the ends of `link` to the given anchors, bringing along the
    /// executions they start.
    pub fn move_message<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        link: LinkId,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> Result<(), EditError> {
        self.ensure_link(link)?;
        self.ensure_anchor(source.as_ref())?;
        self.ensure_anchor(target.as_ref())?;
        ensure(self.can_move_message(link, source, target), "move_message")?;
        self.relocate_message(model, link, source, target)?;
        debug!(link:% = link; "Moved message");
        Ok(())
    }

    pub(super) fn relocate_message<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        link: LinkId,
        source: Option<Anchor>,
        target: Option<Anchor>,
    ) -> Result<(), EditError> {
        let Some(record) = self.link(link) else {
            return Err(EditError::StaleHandle);
        };
        let sort = record.sort();
        let ends = [(record.source(), source), (record.target(), target)];

        let mut graph = self.begin_batch();
        for (end, anchor) in ends {
            let (Some(end), Some(anchor)) = (end, anchor) else {
                continue;
            };
            graph.move_end(model, link, sort, end, &anchor)?;
        }
        graph.layout();
        Ok(())
    }

    fn move_end<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        link: LinkId,
        sort: MessageSort,
        end: NodeId,
        anchor: &Anchor,
    ) -> Result<(), EditError> {
        let is_gate = self.kind(end) == Some(NodeKind::Gate);
        match (self.resolve_anchor(anchor), is_gate) {
            (Some(AnchorTarget::Gate(owner)), true) => {
                if self.parent(end) != Some(owner) {
                    self.detach(end);
                    self.attach_gate(owner, end, owner != self.root());
                }
                self.set_y(end, anchor.y());
            }
            (Some(AnchorTarget::Gate(_)), false) | (Some(AnchorTarget::Lifeline(_)), true) => {
                self.replace_end(model, link, end, anchor)?;
            }
            (Some(AnchorTarget::Lifeline(lifeline)), false) => {
                if sort == MessageSort::Reply {
                    if self.finished_execution(end).is_some() {
                        self.set_y(end, anchor.y());
                    } else {
                        self.place_unit(end, lifeline, anchor.y());
                    }
                    return Ok(());
                }
                let y = self
                    .y(end)
                    .ok_or_else(|| EditError::Inconsistent(format!("end {end} is not placed")))?;
                let dy = anchor.y() - y;
                let units = self.moving_units(end);
                for (index, unit) in units.into_iter().enumerate() {
                    let destination = if index == 0 {
                        Some(lifeline)
                    } else {
                        self.lifeline_of(unit)
                    };
                    let (Some(destination), Some((top, _))) = (destination, self.span(unit))
                    else {
                        continue;
                    };
                    self.place_unit(unit, destination, top + dy);
                }
            }
            (None, _) => {
                return Err(EditError::Inconsistent(format!(
                    "anchor {} cannot hold a message end",
                    anchor.target()
                )));
            }
        }
        Ok(())
    }

    // =========================================================================
    // Nudge and delete
    // =========================================================================

    /// Whether the rows from the first row of `link` onward can move by `dy`.
    pub fn can_nudge_message(&self, link: LinkId, dy: f32) -> bool {
        let Some(record) = self.link(link) else {
            return false;
        };
        self.first_row(record.ends())
            .is_some_and(|row| self.can_nudge_rows(row, dy))
    }

    /// Moves every row from the first row of `link` onward by `dy`.
    pub fn nudge_message(&mut self, link: LinkId, dy: f32) -> Result<(), EditError> {
        self.ensure_link(link)?;
        ensure(self.can_nudge_message(link, dy), "nudge_message")?;
        let row = self
            .link(link)
            .and_then(|record| self.first_row(record.ends()))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_rows_from(row, dy, &[]);
        graph.layout();
        Ok(())
    }

    /// Whether the message end `end` can move by `dy` on its own.
    ///
    /// A receive takes every later row along and may not rise above its
    /// send. A send moves alone, between its neighbours on the lifeline, and
    /// may not sink below its receive. The ends of a self message stay a
    /// row gap apart.
    pub fn can_nudge_message_end(&self, end: NodeId, dy: f32) -> bool {
        self.message_end_nudge_allowed(end, dy)
            && self.dry_run(|graph, _| graph.shift_message_end(end, dy))
    }

    fn message_end_nudge_allowed(&self, end: NodeId, dy: f32) -> bool {
        if !dy.is_finite() {
            return false;
        }
        let Some(record) = self.link_of(end).and_then(|link| self.link(link)) else {
            return false;
        };
        let (Some(y), Some(row)) = (self.y(end), self.row_of(end)) else {
            return false;
        };
        let new_y = y + dy;
        let ends = (record.source(), record.target());
        let self_message = match ends {
            (Some(send), Some(receive)) => {
                self.lifeline_of(send).is_some()
                    && self.lifeline_of(send) == self.lifeline_of(receive)
            }
            _ => false,
        };
        let gap = if self_message { self.config().min_row_gap() } else { 0.0 };

        if ends.1 == Some(end) {
            return ends
                .0
                .and_then(|send| self.y(send))
                .is_none_or(|send_y| new_y >= send_y + gap)
                && self.can_nudge_rows(row, dy);
        }
        if self.started_execution(end).is_some() || self.finished_execution(end).is_some() {
            return false;
        }
        let above_receive = ends
            .1
            .and_then(|receive| self.y(receive))
            .is_none_or(|receive_y| new_y <= receive_y - gap);
        if !above_receive {
            return false;
        }
        if self.kind(end) == Some(NodeKind::Gate) {
            return self
                .parent(end)
                .is_some_and(|owner| self.gate_position_allowed(owner, new_y));
        }

        let Some(lifeline) = self.lifeline_of(end) else {
            return false;
        };
        let leaves = self.flatten(lifeline);
        let Some(index) = leaves.iter().position(|leaf| *leaf == end) else {
            return false;
        };
        let gap = self.config().min_row_gap();
        let after_previous = index
            .checked_sub(1)
            .and_then(|previous| self.y(leaves[previous]))
            .is_none_or(|previous| new_y >= previous + gap);
        let before_next = leaves
            .get(index + 1)
            .and_then(|next| self.y(*next))
            .is_none_or(|next| new_y <= next - gap);
        after_previous && before_next && self.anchor_allowed(&Anchor::new(lifeline, new_y), &[end])
    }

    /// Moves one end of a message by `dy`; a receive shifts every row from
    /// its own onward, its send excepted.
    pub fn nudge_message_end(&mut self, end: NodeId, dy: f32) -> Result<(), EditError> {
        self.ensure_node(end)?;
        ensure(self.can_nudge_message_end(end, dy), "nudge_message_end")?;
        self.shift_message_end(end, dy)?;
        debug!(end:% = end, dy; "Nudged message end");
        Ok(())
    }

    fn shift_message_end(&mut self, end: NodeId, dy: f32) -> Result<(), EditError> {
        let (send, receive) = self
            .link_of(end)
            .and_then(|link| self.link(link))
            .map(|record| (record.source(), record.target()))
            .ok_or(EditError::StaleHandle)?;
        let (Some(y), Some(row)) = (self.y(end), self.row_of(end)) else {
            return Err(EditError::Inconsistent(format!("end {end} is not laid out")));
        };

        let mut graph = self.begin_batch();
        if receive == Some(end) {
            let keep: Vec<NodeId> = send.into_iter().collect();
            graph.shift_rows_from(row, dy, &keep);
        } else {
            graph.set_y(end, y + dy);
        }
        graph.layout();
        Ok(())
    }

    /// Replies go away with their call only.
    pub fn can_delete_message(&self, link: LinkId) -> bool {
        self.link(link)
            .is_some_and(|record| record.sort() != MessageSort::Reply)
    }

    /// Deletes `link` with its block: its ends, the executions they start and
    /// everything inside them, including the reply.
    pub fn delete_message(&mut self, link: LinkId) -> Result<(), EditError> {
        self.ensure_link(link)?;
        ensure(self.can_delete_message(link), "delete_message")?;

        let mut graph = self.begin_batch();
        graph.remove_blocks(&[link]);
        graph.layout();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{geometry::Bounds, identifier::Id};

    use super::*;
    use crate::{
        GraphBuilder,
        model::{Interaction, ViewLayout},
    };

    fn setup(lifelines: usize) -> (Interaction, InteractionGraph) {
        let mut model = Interaction::new(Id::new("msg"));
        for index in 0..lifelines {
            model.add_lifeline(Id::new(&format!("msg_l{index}")));
        }
        let graph = GraphBuilder::default().build(&model, &ViewLayout::new());
        (model, graph)
    }

    fn anchors(graph: &InteractionGraph, y: f32) -> (Anchor, Anchor) {
        let lifelines = graph.lifelines();
        (Anchor::new(lifelines[0], y), Anchor::new(lifelines[1], y))
    }

    fn end_y(
        graph: &InteractionGraph,
        link: LinkId,
        end: impl Fn(&Link) -> Option<NodeId>,
    ) -> Option<f32> {
        graph.link(link).and_then(end).and_then(|node| graph.y(node))
    }

    fn signal(model: &mut Interaction, graph: &mut InteractionGraph, y: f32) -> LinkId {
        let (a, b) = anchors(graph, y);
        graph
            .add_message(model, MessageSort::Asynchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"))
    }

    #[test]
    fn test_sync_call_creates_execution_and_reply() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph.add_message(&mut model, MessageSort::Synchronous, Some(a), Some(b));
        assert!(link.is_ok(), "sync call added: {link:?}");

        assert_eq!(graph.links().count(), 2, "call and reply");
        let callee = graph.lifelines()[1];
        let execution = graph.children(callee)[0];
        assert_eq!(graph.kind(execution), Some(NodeKind::ExecutionSpecification));
        assert_eq!(graph.children(execution).len(), 2);

        let reply = graph
            .links()
            .find(|l| graph.link(*l).is_some_and(|l| l.sort() == MessageSort::Reply));
        let finish = graph.children(execution).last().copied();
        assert_eq!(reply.and_then(|r| graph.link(r)).and_then(Link::source), finish);
    }

    #[test]
    fn test_target_above_source_refused() {
        let (mut model, mut graph) = setup(2);
        let (a, _) = anchors(&graph, 120.0);
        let (_, b) = anchors(&graph, 100.0);
        assert!(!graph.can_add_message(MessageSort::Asynchronous, Some(a), Some(b)));
        let result = graph.add_message(&mut model, MessageSort::Asynchronous, Some(a), Some(b));
        assert!(matches!(result, Err(EditError::Precondition(_))));
        assert_eq!(graph.links().count(), 0, "nothing changed");
    }

    #[test]
    fn test_create_needs_uncreated_lifeline() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        assert!(graph.add_message(&mut model, MessageSort::Create, Some(a), Some(b)).is_ok());

        let (a, b) = anchors(&graph, 90.0);
        assert!(
            !graph.can_add_message(MessageSort::Create, Some(a), Some(b)),
            "a lifeline is created at most once"
        );
    }

    #[test]
    fn test_delete_blocks_later_messages() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        assert!(graph.add_message(&mut model, MessageSort::Delete, Some(a), Some(b)).is_ok());

        let last = graph.flatten(graph.lifelines()[1]).last().copied();
        let y = last.and_then(|n| graph.y(n)).unwrap_or(0.0);
        let (a, b) = anchors(&graph, y + 40.0);
        assert!(
            !graph.can_add_message(MessageSort::Asynchronous, Some(a), Some(b)),
            "nothing after a destruction"
        );
    }

    #[test]
    fn test_delete_sync_removes_block() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph
            .add_message(&mut model, MessageSort::Synchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"));

        let reply = graph
            .links()
            .find(|l| *l != link)
            .unwrap_or_else(|| panic!("reply missing"));
        assert!(!graph.can_delete_message(reply), "replies go with their call");
        assert!(graph.delete_message(link).is_ok());
        for lifeline in graph.lifelines() {
            assert!(graph.children(*lifeline).is_empty(), "lifeline emptied");
        }
        assert_eq!(graph.links().count(), 0);
        assert_eq!(graph.delete_message(link), Err(EditError::StaleHandle));
    }

    #[test]
    fn test_nudge_message_moves_rows() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph
            .add_message(&mut model, MessageSort::Asynchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        let before = graph.row_y(1).unwrap_or_default();

        assert!(graph.nudge_message(link, 30.0).is_ok());
        let after = graph.row_y(1).unwrap_or_default();
        assert!((after - before - 30.0).abs() < 0.01, "row moved by the nudge");
    }

    #[test]
    fn test_move_message_to_other_lifeline() {
        let (mut model, mut graph) = setup(3);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph
            .add_message(&mut model, MessageSort::Asynchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        let c = graph.lifelines()[2];
        let y = end_y(&graph, link, Link::target).unwrap_or(100.0);

        assert!(graph.move_message(&mut model, link, None, Some(Anchor::new(c, y))).is_ok());
        let target = graph.link(link).and_then(Link::target);
        assert_eq!(target.and_then(|t| graph.lifeline_of(t)), Some(c));
        assert!(graph.children(graph.lifelines()[1]).is_empty());
    }

    #[test]
    fn test_move_end_onto_gate() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph
            .add_message(&mut model, MessageSort::Asynchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        let y = end_y(&graph, link, Link::source).unwrap_or(100.0);
        let root = graph.root();

        assert!(graph.move_message(&mut model, link, Some(Anchor::new(root, y)), None).is_ok());
        let source = graph.link(link).and_then(Link::source);
        assert_eq!(source.and_then(|s| graph.kind(s)), Some(NodeKind::Gate));
        assert_eq!(graph.parts(root).map(|p| p.inner_gates().len()), Some(1));
        assert!(graph.children(graph.lifelines()[0]).is_empty());
    }

    #[test]
    fn test_self_call_gets_execution_and_reply() {
        let (mut model, mut graph) = setup(1);
        let lifeline = graph.lifelines()[0];
        let (send, receive) = (Anchor::new(lifeline, 100.0), Anchor::new(lifeline, 120.0));
        let link = graph
            .add_message(&mut model, MessageSort::Synchronous, Some(send), Some(receive))
            .unwrap_or_else(|e| panic!("self call refused: {e}"));

        assert_eq!(graph.links().count(), 2, "call and reply");
        let children = graph.children(lifeline).to_vec();
        assert_eq!(children.len(), 3, "send, execution, reply receive");
        let execution = children[1];
        assert_eq!(graph.kind(execution), Some(NodeKind::ExecutionSpecification));
        let call_receive = graph.link(link).and_then(Link::target);
        assert_eq!(call_receive, graph.children(execution).first().copied());

        let reply = graph
            .links()
            .find(|l| *l != link)
            .and_then(|l| graph.link(l))
            .unwrap_or_else(|| panic!("reply missing"));
        assert_eq!(reply.sort(), MessageSort::Reply);
        assert_eq!(reply.source(), graph.children(execution).last().copied());
        assert_eq!(reply.target(), Some(children[2]));
        let (reply_send, reply_receive) = (
            reply.source().and_then(|n| graph.y(n)).unwrap_or_default(),
            reply.target().and_then(|n| graph.y(n)).unwrap_or_default(),
        );
        assert!(reply_receive > reply_send, "reply returns below its send");
        assert!(graph.is_well_formed());
    }

    /// An interaction use on the second lifeline from 100 to 140.
    fn interaction_use(model: &mut Interaction, graph: &mut InteractionGraph) -> NodeId {
        let bounds = graph.bounds(graph.lifelines()[1]).unwrap_or_default();
        let rect = Bounds::from_extents(bounds.min_x() + 10.0, 100.0, bounds.max_x() - 10.0, 140.0);
        graph
            .add_interaction_use(model, &rect)
            .unwrap_or_else(|e| panic!("interaction use refused: {e}"))
    }

    #[test]
    fn test_add_refused_when_room_making_covers_receive() {
        let (mut model, mut graph) = setup(2);
        let fragment = interaction_use(&mut model, &mut graph);
        assert_eq!(graph.span(fragment), Some((100.0, 140.0)));
        let (a, b) = (graph.lifelines()[0], graph.lifelines()[1]);
        let (send, receive) = (Anchor::new(a, 130.0), Anchor::new(b, 150.0));

        assert!(
            graph.message_allowed(MessageSort::Asynchronous, Some(send), Some(receive)),
            "the receive is below the use before rows move"
        );
        assert!(!graph.can_add_message(MessageSort::Asynchronous, Some(send), Some(receive)));
        let result =
            graph.add_message(&mut model, MessageSort::Asynchronous, Some(send), Some(receive));
        assert!(matches!(result, Err(EditError::Precondition(_))));
        assert_eq!(graph.links().count(), 0);
        assert_eq!(graph.span(fragment), Some((100.0, 140.0)), "nothing moved");
    }

    #[test]
    fn test_interaction_use_lane_never_contains() {
        let (mut model, mut graph) = setup(2);
        interaction_use(&mut model, &mut graph);
        let b = graph.lifelines()[1];

        assert_eq!(graph.container_at(b, 120.0), b);
        assert!(!graph.can_add_message(
            MessageSort::Asynchronous,
            Some(Anchor::new(graph.lifelines()[0], 120.0)),
            Some(Anchor::new(b, 120.0)),
        ));
    }

    #[test]
    fn test_nudge_receive_moves_rows_below() {
        let (mut model, mut graph) = setup(2);
        let link = signal(&mut model, &mut graph, 100.0);
        let later = signal(&mut model, &mut graph, 160.0);
        let receive = graph.link(link).and_then(Link::target).unwrap_or_else(|| panic!());

        assert!(!graph.can_nudge_message_end(receive, -10.0), "receive above its send");
        assert!(graph.nudge_message_end(receive, 30.0).is_ok());
        assert_eq!(end_y(&graph, link, Link::source), Some(100.0), "send stays");
        assert_eq!(end_y(&graph, link, Link::target), Some(130.0));
        assert_eq!(end_y(&graph, later, Link::source), Some(190.0), "later rows follow");
        assert!(graph.is_well_formed());
    }

    #[test]
    fn test_nudge_send_alone() {
        let (mut model, mut graph) = setup(2);
        let link = signal(&mut model, &mut graph, 100.0);
        let send = graph.link(link).and_then(Link::source).unwrap_or_else(|| panic!());

        assert!(!graph.can_nudge_message_end(send, 10.0), "send below its receive");
        assert!(graph.nudge_message_end(send, -20.0).is_ok());
        assert_eq!(end_y(&graph, link, Link::source), Some(80.0));
        assert_eq!(end_y(&graph, link, Link::target), Some(100.0), "receive stays");
        let receive = graph.link(link).and_then(Link::target).unwrap_or(send);
        assert_ne!(graph.row_of(send), graph.row_of(receive), "no longer one row");
    }

    #[test]
    fn test_nudge_execution_start_refused() {
        let (mut model, mut graph) = setup(2);
        let (a, b) = anchors(&graph, 100.0);
        let link = graph
            .add_message(&mut model, MessageSort::Synchronous, Some(a), Some(b))
            .unwrap_or_else(|e| panic!("add failed: {e}"));
        let reply = graph.links().find(|l| *l != link).unwrap_or_else(|| panic!());
        let finish = graph.link(reply).and_then(Link::source).unwrap_or_else(|| panic!());

        assert!(!graph.can_nudge_message_end(finish, -5.0), "finish belongs to the execution");
        assert!(matches!(
            graph.nudge_message_end(finish, -5.0),
            Err(EditError::Precondition(_))
        ));
    }
}
