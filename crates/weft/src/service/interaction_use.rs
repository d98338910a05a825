use std::collections::HashMap;

use log::debug;

use weft_core::{geometry::Bounds, semantic::ElementKind};

use super::{ensure, new_element};
use crate::{
    error::EditError,
    graph::{FragmentKind, InteractionGraph, LinkId, MarkKind, Node, NodeId, NodeKind},
    model::SemanticModel,
};

/// Where a reshaped interaction use goes.
struct Placement {
    covered: Vec<NodeId>,
    top: f32,
    bottom: f32,
    parent: NodeId,
}

impl InteractionGraph {
    fn is_finite_rect(rect: &Bounds) -> bool {
        [rect.min_x(), rect.min_y(), rect.max_x(), rect.max_y()]
            .iter()
            .all(|value| value.is_finite())
    }

    /// Links attached to the gates of `fragment`.
    fn gate_links(&self, fragment: NodeId) -> Vec<LinkId> {
        self.parts(fragment)
            .map(|parts| {
                parts
                    .gates()
                    .filter_map(|gate| self.link_of(gate))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Lifelines holding the far end of a message through a gate of `fragment`.
    fn gate_peer_lifelines(&self, fragment: NodeId) -> Vec<NodeId> {
        self.gate_links(fragment)
            .into_iter()
            .filter_map(|link| self.link(link))
            .flat_map(|link| link.ends())
            .filter_map(|end| self.lifeline_of(end))
            .collect()
    }

    // =========================================================================
    // Add
    // =========================================================================

    /// Whether an interaction use can open at the top of `rect` on the
    /// lifelines the rect meets.
    pub fn can_add_interaction_use(&self, rect: &Bounds) -> bool {
        if !Self::is_finite_rect(rect) {
            return false;
        }
        let covered = self.lifelines_in(rect);
        let top = rect.min_y();
        let Some(first) = covered.first() else {
            return false;
        };
        let parent = self.fragment_at(*first, top);
        covered.iter().all(|lifeline| {
            self.occurrence_allowed(*lifeline, top, &[])
                && self.fragment_at(*lifeline, top) == parent
        })
    }

    /// Adds an interaction use at the top of `rect`, covering the lifelines
    /// the rect meets. Rows from the top down move to make room.
    pub fn add_interaction_use<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        rect: &Bounds,
    ) -> Result<NodeId, EditError> {
        ensure(self.can_add_interaction_use(rect), "add_interaction_use")?;
        let covered = self.lifelines_in(rect);
        let top = rect.min_y();
        let parent = covered
            .first()
            .map_or(self.root(), |lifeline| self.fragment_at(*lifeline, top));

        let mut graph = self.begin_batch();
        let height = graph.config().interaction_use_height();
        let spacing = graph.config().row_spacing();
        graph.shift_below(top, height + spacing);

        let interaction = model.interaction();
        let covered_elements = graph.lifeline_elements(&covered);
        let element = new_element(
            model,
            ElementKind::InteractionUse,
            interaction,
            &covered_elements,
        );
        let fragment = graph.alloc(Node::new(
            NodeKind::Fragment(FragmentKind::InteractionUse),
            Some(element),
            None,
        ));
        for lifeline in &covered {
            graph.new_lane(fragment, *lifeline, top, top + height);
        }
        graph.attach_fragment(parent, fragment);
        debug!(fragment:% = fragment, covered = covered.len(); "Added interaction use");
        graph.layout();
        Ok(fragment)
    }

    // =========================================================================
    // Nudge
    // =========================================================================

    pub fn can_nudge_interaction_use(&self, fragment: NodeId, dy: f32) -> bool {
        self.is_interaction_use(fragment)
            && self
                .first_row(self.marks(fragment, MarkKind::Start))
                .is_some_and(|row| self.can_nudge_rows(row, dy))
    }

    /// Nudges the rows from the start of the interaction use onward.
    pub fn nudge_interaction_use(&mut self, fragment: NodeId, dy: f32) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_nudge_interaction_use(fragment, dy), "nudge_interaction_use")?;
        let row = self
            .first_row(self.marks(fragment, MarkKind::Start))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_rows_from(row, dy, &[]);
        graph.layout();
        Ok(())
    }

    // =========================================================================
    // Resize and move
    // =========================================================================

    /// Checks the new shape `top..bottom` over the lifelines `rect` meets.
    /// Gates are checked at their y shifted by `dy`.
    fn reshape_placement(
        &self,
        fragment: NodeId,
        rect: &Bounds,
        top: f32,
        bottom: f32,
        dy: f32,
    ) -> Option<Placement> {
        if !self.is_interaction_use(fragment) || !Self::is_finite_rect(rect) || bottom <= top {
            return None;
        }
        let covered = self.lifelines_in(rect);
        let first = covered.first()?;
        let own: Vec<NodeId> = self
            .parts(fragment)?
            .lanes()
            .iter()
            .flat_map(|lane| self.descendants(*lane))
            .collect();
        let parent = self.fragment_outside(*first, top, Some(fragment));
        let peers = self.gate_peer_lifelines(fragment);

        for lifeline in &covered {
            let fits = top > self.header_bottom(*lifeline)
                && !self.after_destruction(*lifeline, bottom, &own)
                && !self.in_interaction_use(*lifeline, top, Some(fragment))
                && self.leaves_between(*lifeline, top, bottom, &own).is_empty()
                && self.container_outside(*lifeline, top, Some(fragment))
                    == self.container_outside(*lifeline, bottom, Some(fragment))
                && self.fragment_outside(*lifeline, top, Some(fragment)) == parent
                && !peers.contains(lifeline);
            if !fits {
                return None;
            }
        }

        let gates: Vec<NodeId> = self.parts(fragment)?.gates().collect();
        let moved: HashMap<NodeId, f32> = gates
            .iter()
            .filter_map(|gate| self.y(*gate).map(|y| (*gate, y + dy)))
            .collect();
        if moved.values().any(|y| *y < top || *y > bottom) || !self.keeps_causality(&moved) {
            return None;
        }
        Some(Placement {
            covered,
            top,
            bottom,
            parent,
        })
    }

    /// Lays the lanes of `fragment` out on `placement`, adding and removing
    /// lanes as the covered set changes.
    fn apply_placement(&mut self, fragment: NodeId, placement: Placement) {
        let lanes: Vec<NodeId> = self
            .parts(fragment)
            .map(|parts| parts.lanes().to_vec())
            .unwrap_or_default();
        let mut kept: Vec<(NodeId, NodeId)> = Vec::new();
        for lane in lanes {
            match self.lifeline_of(lane) {
                Some(lifeline) if placement.covered.contains(&lifeline) => {
                    self.detach(lane);
                    kept.push((lifeline, lane));
                }
                _ => self.remove_node(lane),
            }
        }

        for (lifeline, lane) in &kept {
            let children = self.children(*lane).to_vec();
            if let (Some(start), Some(end)) = (children.first(), children.last()) {
                self.set_y(*start, placement.top);
                self.set_y(*end, placement.bottom);
            }
            let container = self.container_at(*lifeline, placement.top);
            self.insert_child_at_y(container, *lane, placement.top);
        }
        for lifeline in &placement.covered {
            if !kept.iter().any(|(covered, _)| covered == lifeline) {
                self.new_lane(fragment, *lifeline, placement.top, placement.bottom);
            }
        }

        self.detach(fragment);
        self.attach_fragment(placement.parent, fragment);
    }

    fn interaction_use_span(&self, fragment: NodeId) -> Option<(f32, f32)> {
        self.is_interaction_use(fragment).then(|| self.span(fragment)).flatten()
    }

    /// Whether `fragment` can take the lifelines `rect` meets and end at the
    /// bottom of `rect`. Its top stays.
    pub fn can_resize_interaction_use(&self, fragment: NodeId, rect: &Bounds) -> bool {
        self.interaction_use_span(fragment)
            .and_then(|(top, _)| self.reshape_placement(fragment, rect, top, rect.max_y(), 0.0))
            .is_some()
    }

    /// Re-covers `fragment` with the lifelines `rect` meets and moves its
    /// end marks to the bottom of `rect`.
    pub fn resize_interaction_use(
        &mut self,
        fragment: NodeId,
        rect: &Bounds,
    ) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_resize_interaction_use(fragment, rect), "resize_interaction_use")?;
        let placement = self
            .interaction_use_span(fragment)
            .and_then(|(top, _)| self.reshape_placement(fragment, rect, top, rect.max_y(), 0.0))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.apply_placement(fragment, placement);
        debug!(fragment:% = fragment; "Resized interaction use");
        graph.layout();
        Ok(())
    }

    /// Whether `fragment` can take the lifelines `rect` meets and end at the
    /// bottom of `rect`, with everything from its end onward moving by the
    /// same amount.
    pub fn can_nudge_resize_interaction_use(&self, fragment: NodeId, rect: &Bounds) -> bool {
        self.stretch_allowed(fragment, rect)
            && self.dry_run(|graph, _| graph.stretch_interaction_use(fragment, rect))
    }

    fn stretch_allowed(&self, fragment: NodeId, rect: &Bounds) -> bool {
        let Some((top, bottom)) = self.interaction_use_span(fragment) else {
            return false;
        };
        if !Self::is_finite_rect(rect) || rect.max_y() <= top {
            return false;
        }
        let dy = rect.max_y() - bottom;
        self.first_row(self.marks(fragment, MarkKind::End))
            .is_some_and(|row| dy >= 0.0 || self.can_nudge_rows(row, dy))
    }

    /// Resizes `fragment` to `rect` like [`Self::resize_interaction_use`],
    /// nudging the rows from its end onward so nothing below is swallowed.
    pub fn nudge_resize_interaction_use(
        &mut self,
        fragment: NodeId,
        rect: &Bounds,
    ) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(
            self.can_nudge_resize_interaction_use(fragment, rect),
            "nudge_resize_interaction_use",
        )?;
        self.stretch_interaction_use(fragment, rect)?;
        debug!(fragment:% = fragment, bottom = rect.max_y(); "Nudge-resized interaction use");
        Ok(())
    }

    fn stretch_interaction_use(
        &mut self,
        fragment: NodeId,
        rect: &Bounds,
    ) -> Result<(), EditError> {
        let (top, bottom) = self
            .interaction_use_span(fragment)
            .ok_or(EditError::StaleHandle)?;
        let row = self
            .first_row(self.marks(fragment, MarkKind::End))
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_rows_from(row, rect.max_y() - bottom, &[]);
        let placement = graph
            .reshape_placement(fragment, rect, top, rect.max_y(), 0.0)
            .ok_or_else(|| EditError::precondition("nudge_resize_interaction_use"))?;
        graph.apply_placement(fragment, placement);
        graph.layout();
        Ok(())
    }

    fn move_placement(&self, fragment: NodeId, rect: &Bounds) -> Option<Placement> {
        let (top, bottom) = self.interaction_use_span(fragment)?;
        let dy = rect.min_y() - top;
        self.reshape_placement(fragment, rect, top + dy, bottom + dy, dy)
    }

    /// Whether `fragment` can move as a block to the top of `rect` and the
    /// lifelines it meets.
    pub fn can_move_interaction_use(&self, fragment: NodeId, rect: &Bounds) -> bool {
        self.move_placement(fragment, rect).is_some()
    }

    /// Moves `fragment` with its gates to the top of `rect`, keeping its
    /// height.
    pub fn move_interaction_use(
        &mut self,
        fragment: NodeId,
        rect: &Bounds,
    ) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_move_interaction_use(fragment, rect), "move_interaction_use")?;
        let placement = self.move_placement(fragment, rect).ok_or(EditError::StaleHandle)?;
        let top = self
            .interaction_use_span(fragment)
            .map_or(placement.top, |(top, _)| top);
        let dy = placement.top - top;
        let gates: Vec<NodeId> = self
            .parts(fragment)
            .map(|parts| parts.gates().collect())
            .unwrap_or_default();

        let mut graph = self.begin_batch();
        for gate in gates {
            if let Some(y) = graph.y(gate) {
                graph.set_y(gate, y + dy);
            }
        }
        graph.apply_placement(fragment, placement);
        debug!(fragment:% = fragment, dy; "Moved interaction use");
        graph.layout();
        Ok(())
    }

    // =========================================================================
    // Delete
    // =========================================================================

    pub fn can_delete_interaction_use(&self, fragment: NodeId) -> bool {
        self.is_interaction_use(fragment)
    }

    /// Deletes `fragment` with its lanes and gates, and the messages through
    /// those gates.
    pub fn delete_interaction_use(&mut self, fragment: NodeId) -> Result<(), EditError> {
        self.ensure_node(fragment)?;
        ensure(self.can_delete_interaction_use(fragment), "delete_interaction_use")?;
        let links = self.gate_links(fragment);

        let mut graph = self.begin_batch();
        graph.remove_blocks(&links);
        graph.remove_node(fragment);
        debug!(fragment:% = fragment, messages = links.len(); "Deleted interaction use");
        graph.layout();
        Ok(())
    }
}
