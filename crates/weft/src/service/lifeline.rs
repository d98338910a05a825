use log::debug;

use weft_core::{geometry::Bounds, semantic::ElementKind};

use super::{ensure, new_element};
use crate::{
    error::EditError,
    graph::{InteractionGraph, LinkId, Node, NodeId, NodeKind},
    model::SemanticModel,
};

impl InteractionGraph {
    pub fn can_add_lifeline(&self, rect: &Bounds) -> bool {
        rect.width().is_finite() && rect.width() > 1.0 && rect.center().x().is_finite()
    }

    /// Adds a lifeline with the horizontal extent of `rect`.
    ///
    /// The lifeline goes before the first lifeline whose centre lies right of
    /// the rect's centre; those lifelines move right to make room. Its header
    /// joins the header row.
    pub fn add_lifeline<M: SemanticModel + ?Sized>(
        &mut self,
        model: &mut M,
        rect: &Bounds,
    ) -> Result<NodeId, EditError> {
        ensure(self.can_add_lifeline(rect), "add_lifeline")?;

        let center = rect.center().x();
        let index = self
            .lifelines()
            .iter()
            .position(|lifeline| {
                self.bounds(*lifeline)
                    .is_some_and(|bounds| bounds.center().x() > center)
            })
            .unwrap_or(self.lifelines().len());
        let top = self.header_top();
        let bounds = Bounds::from_extents(
            rect.min_x(),
            top,
            rect.max_x(),
            top + self.config().lifeline_header_height(),
        );

        let mut graph = self.begin_batch();
        let padding = graph.config().column_padding();
        graph.shift_right_of(center, rect.width() + padding);

        let interaction = model.interaction();
        let element = new_element(model, ElementKind::Lifeline, interaction, &[]);
        let lifeline = graph.alloc(Node::new(NodeKind::Lifeline, Some(element), Some(bounds)));
        graph.insert_lifeline(index, lifeline);
        debug!(lifeline:% = lifeline, index; "Added lifeline");
        graph.layout();
        Ok(lifeline)
    }

    pub fn can_move_lifeline(&self, lifeline: NodeId, x: f32) -> bool {
        self.is_lifeline(lifeline) && self.bounds(lifeline).is_some() && x.is_finite()
    }

    /// Moves the header of `lifeline` to `x`, reordering the lifelines by
    /// their new centres.
    pub fn move_lifeline(&mut self, lifeline: NodeId, x: f32) -> Result<(), EditError> {
        self.ensure_node(lifeline)?;
        ensure(self.can_move_lifeline(lifeline, x), "move_lifeline")?;

        let mut graph = self.begin_batch();
        graph.detach(lifeline);
        let index = graph
            .lifelines()
            .iter()
            .filter(|other| {
                graph
                    .bounds(**other)
                    .is_some_and(|bounds| bounds.center().x() < x)
            })
            .count();
        graph.insert_lifeline(index, lifeline);
        graph.set_x(lifeline, x);
        graph.resort_lanes();
        debug!(lifeline:% = lifeline, index; "Moved lifeline");
        graph.layout();
        Ok(())
    }

    /// Whether `lifeline` can move by `dx` without its left edge crossing
    /// the right edge of the previous lifeline.
    pub fn can_nudge_lifeline(&self, lifeline: NodeId, dx: f32) -> bool {
        if !self.is_lifeline(lifeline) || !dx.is_finite() {
            return false;
        }
        let (Some(index), Some(bounds)) = (self.lifeline_index(lifeline), self.bounds(lifeline))
        else {
            return false;
        };
        let previous_right = index
            .checked_sub(1)
            .and_then(|previous| self.lifelines().get(previous))
            .and_then(|previous| self.bounds(*previous))
            .map(Bounds::max_x);
        previous_right.is_none_or(|right| bounds.min_x() + dx >= right)
    }

    /// Moves `lifeline`, every lifeline right of it and the gates right of its
    /// centre by `dx`.
    pub fn nudge_lifeline(&mut self, lifeline: NodeId, dx: f32) -> Result<(), EditError> {
        self.ensure_node(lifeline)?;
        ensure(self.can_nudge_lifeline(lifeline, dx), "nudge_lifeline")?;
        let center = self
            .bounds(lifeline)
            .map(|bounds| bounds.center().x())
            .ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_right_of(center, dx);
        graph.layout();
        Ok(())
    }

    pub fn can_resize_lifeline(&self, lifeline: NodeId, dw: f32) -> bool {
        self.is_lifeline(lifeline)
            && dw.is_finite()
            && self
                .bounds(lifeline)
                .is_some_and(|bounds| bounds.width() + dw > 1.0)
    }

    /// Widens `lifeline` by `dw` on its right edge; later lifelines follow.
    pub fn resize_lifeline(&mut self, lifeline: NodeId, dw: f32) -> Result<(), EditError> {
        self.ensure_node(lifeline)?;
        ensure(self.can_resize_lifeline(lifeline, dw), "resize_lifeline")?;
        let bounds = self.bounds(lifeline).ok_or(EditError::StaleHandle)?;

        let mut graph = self.begin_batch();
        graph.shift_right_of(bounds.max_x(), dw);
        graph.set_bounds(
            lifeline,
            Some(Bounds::from_extents(
                bounds.min_x(),
                bounds.min_y(),
                bounds.max_x() + dw,
                bounds.max_y(),
            )),
        );
        graph.layout();
        Ok(())
    }

    pub fn can_delete_lifeline(&self, lifeline: NodeId) -> bool {
        self.is_lifeline(lifeline)
    }

    /// Deletes `lifeline` with every message block attached to it and its
    /// fragment lanes. Later lifelines close the gap.
    pub fn delete_lifeline(&mut self, lifeline: NodeId) -> Result<(), EditError> {
        self.ensure_node(lifeline)?;
        ensure(self.can_delete_lifeline(lifeline), "delete_lifeline")?;

        let bounds = self.bounds(lifeline);
        let mut attached: Vec<LinkId> = Vec::new();
        for node in self.descendants(lifeline) {
            if let Some(link) = self.link_of(node) {
                if !attached.contains(&link) {
                    attached.push(link);
                }
            }
        }

        let mut graph = self.begin_batch();
        graph.remove_blocks(&attached);
        graph.remove_node(lifeline);
        graph.prune_fragments();
        if let Some(bounds) = bounds {
            let gap = bounds.width() + graph.config().column_padding();
            graph.shift_right_of(bounds.center().x(), -gap);
        }
        debug!(lifeline:% = lifeline, messages = attached.len(); "Deleted lifeline");
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

    fn center_x(graph: &InteractionGraph, lifeline: NodeId) -> f32 {
        graph
            .bounds(lifeline)
            .map(|bounds| bounds.center().x())
            .unwrap_or(f32::NAN)
    }

    #[test]
    fn test_add_lifeline_inserts_by_center() {
        let (mut model, mut graph) = setup("ll_add");
        let b = graph.lifelines()[1];
        let before = center_x(&graph, b);
        let rect = Bounds::from_extents(80.0, 0.0, 180.0, 50.0);

        let added = graph.add_lifeline(&mut model, &rect);
        assert!(added.is_ok(), "lifeline added: {added:?}");
        assert_eq!(graph.lifelines().len(), 3);
        assert_eq!(Some(graph.lifelines()[1]), added.ok());
        assert!(center_x(&graph, b) > before, "later lifelines move right");
        assert!(!graph.can_add_lifeline(&Bounds::from_extents(0.0, 0.0, 0.5, 10.0)));
    }

    #[test]
    fn test_nudge_lifeline_respects_previous() {
        let (_, mut graph) = setup("ll_nudge");
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let before = center_x(&graph, b);

        assert!(graph.nudge_lifeline(a, 20.0).is_ok());
        assert!((center_x(&graph, b) - before - 20.0).abs() < 0.01, "later columns follow");

        let gap = graph.bounds(b).map_or(0.0, Bounds::min_x)
            - graph.bounds(a).map_or(0.0, Bounds::max_x);
        assert!(!graph.can_nudge_lifeline(b, -(gap + 1.0)), "cannot overlap the previous lifeline");
        assert!(graph.can_nudge_lifeline(b, -gap));
    }

    #[test]
    fn test_resize_lifeline_shifts_later() {
        let (_, mut graph) = setup("ll_resize");
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let width = graph.bounds(a).map_or(0.0, Bounds::width);
        let before = center_x(&graph, b);

        assert!(!graph.can_resize_lifeline(a, 1.0 - width));
        assert!(graph.resize_lifeline(a, 40.0).is_ok());
        assert!((graph.bounds(a).map_or(0.0, Bounds::width) - width - 40.0).abs() < 0.01);
        assert!((center_x(&graph, b) - before - 40.0).abs() < 0.01);
    }

    #[test]
    fn test_move_lifeline_reorders() {
        let (_, mut graph) = setup("ll_move");
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let x = center_x(&graph, b) + 200.0;

        assert!(graph.move_lifeline(a, x).is_ok());
        assert_eq!(graph.lifelines(), &[b, a]);
        assert!((center_x(&graph, a) - x).abs() < 0.01);
    }

    #[test]
    fn test_delete_lifeline_removes_attached_messages() {
        let (mut model, mut graph) = setup("ll_delete");
        let a = graph.lifelines()[0];
        let b = graph.lifelines()[1];
        let y = graph.header_bottom(a) + 40.0;
        let added = graph.add_message(
            &mut model,
            MessageSort::Synchronous,
            Some(Anchor::new(a, y)),
            Some(Anchor::new(b, y)),
        );
        assert!(added.is_ok());

        assert!(graph.delete_lifeline(b).is_ok());
        assert_eq!(graph.lifelines(), &[a]);
        assert_eq!(graph.links().count(), 0, "call and reply are gone");
        assert!(graph.children(a).is_empty(), "send and reply receive are gone");
        assert!(!graph.contains(b));
        assert_eq!(graph.delete_lifeline(b), Err(EditError::StaleHandle));
    }
}
