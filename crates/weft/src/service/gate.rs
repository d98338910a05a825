use std::collections::HashMap;

use log::debug;

use weft_core::semantic::OccurrenceKind;

use super::{Anchor, AnchorTarget, ensure};
use crate::{
    error::EditError,
    graph::{InteractionGraph, LinkId, NodeId, NodeKind},
    model::SemanticModel,
};

impl InteractionGraph {
    fn is_gate(&self, id: NodeId) -> bool {
        self.kind(id) == Some(NodeKind::Gate)
    }

    /// The message attached to `gate` and the lifeline of its other end.
    fn gate_peer(&self, gate: NodeId) -> Option<(LinkId, Option<NodeId>)> {
        let link = self.link_of(gate)?;
        let peer = self
            .link(link)?
            .ends()
            .find(|end| *end != gate)
            .and_then(|end| self.lifeline_of(end));
        Some((link, peer))
    }

    /// Whether `gate` may hang on `owner` given the lifeline of its peer:
    /// an interaction use never covers the other end of its own gates.
    fn gate_fits_owner(&self, gate: NodeId, owner: NodeId) -> bool {
        if owner == self.root() {
            return true;
        }
        let peer = self.gate_peer(gate).and_then(|(_, peer)| peer);
        peer.is_none_or(|peer| !self.covered_lifelines(owner).contains(&peer))
    }

    /// Whether an unconnected gate can be added to `owner` at `y`. The owner
    /// is the graph root (a formal gate) or an interaction use (an actual
    /// gate).
    pub fn can_add_gate(&self, owner: NodeId, y: f32) -> bool {
        y.is_finite()
            && matches!(
                self.resolve_anchor(&Anchor::new(owner, y)),
                Some(AnchorTarget::Gate(_))
            )
            && self.gate_position_allowed(owner, y)
    }

    pub fn add_gate<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        owner: NodeId,
        y: f32,
    ) -> Result<NodeId, EditError> {
        self.ensure_node(owner)?;
        ensure(self.can_add_gate(owner, y), "add_gate")?;

        let mut graph = self.begin_batch();
        let gate = graph
            .new_end(model, &Anchor::new(owner, y), OccurrenceKind::Message)
            .ok_or_else(|| EditError::Inconsistent(format!("no gate can be created on {owner}")))?;
        debug!(gate:% = gate, owner:% = owner; "Added gate");
        graph.layout();
        Ok(gate)
    }

    /// Whether `gate` can slide by `dy` along its owner's border without
    /// passing the other end of its message.
    pub fn can_nudge_gate(&self, gate: NodeId, dy: f32) -> bool {
        if !self.is_gate(gate) || !dy.is_finite() {
            return false;
        }
        let (Some(owner), Some(y)) = (self.parent(gate), self.y(gate)) else {
            return false;
        };
        self.gate_position_allowed(owner, y + dy)
            && self.keeps_causality(&HashMap::from([(gate, y + dy)]))
    }

    pub fn nudge_gate(&mut self, gate: NodeId, dy: f32) -> Result<(), EditError> {
        self.ensure_node(gate)?;
        ensure(self.can_nudge_gate(gate, dy), "nudge_gate")?;
        let y = self.y(gate).ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.set_y(gate, y + dy);
        graph.layout();
        Ok(())
    }

    /// Whether `gate` can move to `anchor`: onto another owner's border, or
    /// onto a lifeline when a message is attached to it.
    pub fn can_move_gate(&self, gate: NodeId, anchor: Anchor) -> bool {
        if !self.is_gate(gate) || !self.contains(anchor.target()) || !anchor.y().is_finite() {
            return false;
        }
        let destination = self.resolve_anchor(&anchor);
        if let Some(AnchorTarget::Gate(owner)) = destination {
            if !self.gate_fits_owner(gate, owner) {
                return false;
            }
        }
        match (self.gate_peer(gate), destination) {
            (Some((link, _)), Some(_)) => {
                let is_source = self.link(link).is_some_and(|record| record.source() == Some(gate));
                if is_source {
                    self.can_move_message(link, Some(anchor), None)
                } else {
                    self.can_move_message(link, None, Some(anchor))
                }
            }
            (None, Some(AnchorTarget::Gate(owner))) => {
                self.gate_position_allowed(owner, anchor.y())
            }
            // a gate with no message has nothing to turn into
            (None, Some(AnchorTarget::Lifeline(_))) => false,
            (_, None) => false,
        }
    }

    /// Moves `gate` to `anchor`. Returns the node now standing for the
    /// message end: the gate itself, or the occurrence that replaced it when
    /// it moved onto a lifeline.
    pub fn move_gate<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        gate: NodeId,
        anchor: Anchor,
    ) -> Result<NodeId, EditError> {
        self.ensure_node(gate)?;
        self.ensure_node(anchor.target())?;
        ensure(self.can_move_gate(gate, anchor), "move_gate")?;

        let Some((link, _)) = self.gate_peer(gate) else {
            let mut graph = self.begin_batch();
            graph.detach(gate);
            let owner = anchor.target();
            let outer = owner != graph.root();
            graph.attach_gate(owner, gate, outer);
            graph.set_y(gate, anchor.y());
            debug!(gate:% = gate, owner:% = owner; "Moved gate");
            graph.layout();
            return Ok(gate);
        };

        let is_source = self.link(link).is_some_and(|record| record.source() == Some(gate));
        if is_source {
            self.move_message(model, link, Some(anchor), None)?;
        } else {
            self.move_message(model, link, None, Some(anchor))?;
        }
        let record = self.link(link).ok_or(EditError::StaleHandle)?;
        let end = if is_source { record.source() } else { record.target() };
        end.ok_or_else(|| EditError::Inconsistent(format!("message {link} lost its end")))
    }
}
