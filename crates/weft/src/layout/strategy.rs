//! Per-kind layout strategies.
//!
//! Every node kind maps to one [`NodeLayout`] implementation. The layout
//! manager calls them bottom-up, so a strategy can rely on the bounds of the
//! nodes it contains being current.

use std::collections::HashMap;

use weft_core::geometry::{Bounds, Point, Size};

use crate::{
    config::LayoutConfig,
    graph::{Column, InteractionGraph, MarkKind, NodeId, NodeKind, Row},
};

/// Grid and constants shared by the strategies during one layout pass.
pub(crate) struct LayoutContext<'a> {
    pub(crate) config: &'a LayoutConfig,
    pub(crate) rows: &'a [Row],
    pub(crate) columns: &'a [Column],
    pub(crate) lifeline_widths: &'a HashMap<NodeId, f32>,
    pub(crate) header_top: f32,
    pub(crate) last_row_y: f32,
}

impl LayoutContext<'_> {
    fn row_y(&self, graph: &InteractionGraph, node: NodeId) -> Option<f32> {
        let row = graph.row_of(node)?;
        self.rows.get(row).and_then(Row::y)
    }

    fn column_x(&self, graph: &InteractionGraph, node: NodeId) -> Option<f32> {
        let column = graph.node(node)?.column()?;
        self.columns.get(column).map(Column::x)
    }

    /// Grid point of a node: its column's x and its row's y.
    fn point(&self, graph: &InteractionGraph, node: NodeId) -> Option<Point> {
        Some(Point::new(
            self.column_x(graph, node)?,
            self.row_y(graph, node)?,
        ))
    }

    fn lifeline_width(&self, lifeline: NodeId) -> f32 {
        self.lifeline_widths
            .get(&lifeline)
            .copied()
            .unwrap_or(self.config.lifeline_width())
    }
}

/// Computes the bounds of one kind of node.
pub(crate) trait NodeLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        context: &LayoutContext<'_>,
    ) -> Option<Bounds>;
}

/// Returns the strategy responsible for `kind`.
pub(crate) fn strategy_for(kind: NodeKind) -> &'static dyn NodeLayout {
    match kind {
        NodeKind::Interaction => &InteractionLayout,
        NodeKind::Lifeline => &LifelineLayout,
        NodeKind::ExecutionSpecification => &ExecutionLayout,
        NodeKind::Lane => &LaneLayout,
        NodeKind::Fragment(_) => &FragmentLayout,
        NodeKind::Gate => &SquareLayout::Gate,
        NodeKind::Destruction => &SquareLayout::Destruction,
        NodeKind::Occurrence | NodeKind::Mark(_) => &PointLayout,
    }
}

/// Zero-size box on the grid point.
struct PointLayout;

impl NodeLayout for PointLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        ctx.point(graph, node)
            .map(|point| Bounds::new_from_center(point, Size::default()))
    }
}

/// Fixed-size square centred on the grid point.
enum SquareLayout {
    Gate,
    Destruction,
}

impl NodeLayout for SquareLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let side = match self {
            Self::Gate => ctx.config.gate_size(),
            Self::Destruction => ctx.config.destruction_size(),
        };
        ctx.point(graph, node)
            .map(|point| Bounds::new_from_center(point, Size::new(side, side)))
    }
}

struct LifelineLayout;

impl NodeLayout for LifelineLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let x = ctx.column_x(graph, node)?;
        let width = ctx.lifeline_width(node);
        let header = ctx.config.lifeline_header_height();

        let top = match graph.creator(node) {
            Some(_) => ctx.row_y(graph, node).map_or(ctx.header_top, |y| y - header / 2.0),
            None => ctx.header_top,
        };
        let destruction = graph
            .flatten(node)
            .into_iter()
            .find(|leaf| graph.kind(*leaf) == Some(NodeKind::Destruction))
            .and_then(|leaf| ctx.row_y(graph, leaf));
        let bottom = match destruction {
            Some(y) => y.max(top + header),
            None => (top + ctx.config.min_lifeline_height())
                .max(ctx.last_row_y + ctx.config.lifeline_bottom_padding()),
        };

        Some(Bounds::from_extents(
            x - width / 2.0,
            top,
            x + width / 2.0,
            bottom,
        ))
    }
}

struct ExecutionLayout;

impl NodeLayout for ExecutionLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let column_x = ctx.column_x(graph, node)?;
        let (top, bottom) = graph.span(node)?;
        let width = ctx.config.execution_width();
        let x = column_x + ctx.config.execution_offset() * graph.execution_depth(node) as f32;
        let height = (bottom - top).max(ctx.config.execution_min_height());

        Some(Bounds::new_from_top_left(
            Point::new(x - width / 2.0, top),
            Size::new(width, height),
        ))
    }
}

/// Padding levels of a lane: one for the lane itself plus the deepest chain
/// of lanes nested inside it.
pub(crate) fn lane_levels(graph: &InteractionGraph, lane: NodeId) -> usize {
    let base = graph.lane_depth(lane);
    graph
        .descendants(lane)
        .into_iter()
        .filter(|node| graph.kind(*node) == Some(NodeKind::Lane))
        .map(|node| graph.lane_depth(node) - base + 1)
        .max()
        .unwrap_or(1)
}

struct LaneLayout;

impl NodeLayout for LaneLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let lifeline = graph.lifeline_of(node)?;
        let x = ctx.column_x(graph, lifeline)?;
        let half = ctx.lifeline_width(lifeline) / 2.0
            + ctx.config.fragment_padding() * lane_levels(graph, node) as f32;

        let children = graph.children(node);
        let mark_y = |mark: Option<&NodeId>, kind| {
            mark.filter(|mark| graph.kind(**mark) == Some(NodeKind::Mark(kind)))
                .and_then(|mark| graph.y(*mark))
        };
        let top = mark_y(children.first(), MarkKind::Start)?;
        let bottom = mark_y(children.last(), MarkKind::End).unwrap_or(top);

        Some(Bounds::from_extents(x - half, top, x + half, bottom))
    }
}

struct FragmentLayout;

impl NodeLayout for FragmentLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        _ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let parts = graph.parts(node)?;
        let lanes = parts.lanes().iter().filter_map(|lane| graph.bounds(*lane));
        let gates = parts.gates().filter_map(|gate| graph.bounds(gate));
        lanes.chain(gates).reduce(|a, b| a.merge(&b))
    }
}

struct InteractionLayout;

impl NodeLayout for InteractionLayout {
    fn layout(
        &self,
        graph: &InteractionGraph,
        node: NodeId,
        _ctx: &LayoutContext<'_>,
    ) -> Option<Bounds> {
        let lifelines = graph.lifelines().iter().filter_map(|l| graph.bounds(*l));
        let gates = graph
            .parts(node)
            .into_iter()
            .flat_map(|parts| {
                parts
                    .gates()
                    .filter_map(|gate| graph.bounds(gate))
                    .collect::<Vec<_>>()
            });
        lifelines.chain(gates).reduce(|a, b| a.merge(&b))
    }
}
