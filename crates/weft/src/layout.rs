//! Grid and pixel layout of an interaction graph.
//!
//! A layout pass runs in four steps:
//!
//! 1. [`NodeOrderResolver`] merges the lifelines into one ordered leaf list.
//! 2. The list is carved into rows, and every row gets a concrete y.
//! 3. Lifelines and gates get columns.
//! 4. The per-kind strategies in [`strategy`] compute bounds bottom-up.
//!
//! Running the pass twice in a row leaves rows, columns and bounds unchanged.

mod strategy;

use std::collections::HashMap;

use log::debug;

use crate::{
    config::LayoutConfig,
    graph::{Column, ColumnKind, FragmentKind, InteractionGraph, MarkKind, NodeId, NodeKind, Row},
    order::NodeOrderResolver,
};

use strategy::{LayoutContext, lane_levels, strategy_for};

/// Runs layout passes with one configuration.
pub(crate) struct LayoutManager<'c> {
    config: &'c LayoutConfig,
}

impl<'c> LayoutManager<'c> {
    pub(crate) fn new(config: &'c LayoutConfig) -> Self {
        Self { config }
    }

    pub(crate) fn run(&self, graph: &mut InteractionGraph) {
        let ordered = NodeOrderResolver::new(graph).resolve();
        let carved = self.carve_rows(graph, &ordered);
        let header_top = self.header_top(graph);
        let rows = self.place_rows(graph, carved, header_top);
        let (mut columns, lifeline_widths) = self.place_columns(graph);
        let last_row_y = rows
            .iter()
            .skip(1)
            .filter_map(Row::y)
            .fold(header_top + self.config.lifeline_header_height(), f32::max);

        self.assign_grid(graph, &rows, &mut columns);
        let context = LayoutContext {
            config: self.config,
            rows: &rows,
            columns: &columns,
            lifeline_widths: &lifeline_widths,
            header_top,
            last_row_y,
        };
        self.apply_strategies(graph, &ordered, &context);

        debug!(
            rows = rows.len(),
            columns = columns.len(),
            nodes = ordered.len();
            "Laid out interaction graph"
        );
        graph.set_grid(ordered, rows, columns);
    }

    // =========================================================================
    // Rows
    // =========================================================================

    /// Splits the ordered list into rows. A node joins the previous node's
    /// row when it is that node's horizontally connected receiver on another
    /// lifeline, or a mark of the same alignment group.
    fn carve_rows(&self, graph: &InteractionGraph, ordered: &[NodeId]) -> Vec<Vec<NodeId>> {
        let mut rows: Vec<Vec<NodeId>> = Vec::new();
        let mut previous: Option<NodeId> = None;
        for node in ordered {
            let joins = previous.is_some_and(|previous| Self::joins_row(graph, previous, *node));
            match rows.last_mut() {
                Some(row) if joins => row.push(*node),
                _ => rows.push(vec![*node]),
            }
            previous = Some(*node);
        }
        rows
    }

    fn joins_row(graph: &InteractionGraph, previous: NodeId, node: NodeId) -> bool {
        if let Some(group) = graph.alignment_group(previous) {
            if graph.alignment_group(node) == Some(group) {
                return true;
            }
        }
        graph.effect_of(previous) == Some(node)
            && graph.is_horizontally_connected(previous, node)
            && graph.lifeline_of(previous) != graph.lifeline_of(node)
    }

    /// Top of the lifeline headers that sit in row 0.
    fn header_top(&self, graph: &InteractionGraph) -> f32 {
        graph
            .lifelines()
            .iter()
            .filter(|lifeline| graph.creator(**lifeline).is_none())
            .filter_map(|lifeline| graph.bounds(*lifeline))
            .map(|bounds| bounds.min_y())
            .reduce(f32::min)
            .unwrap_or(self.config.origin().y())
    }

    /// Turns carved rows into [`Row`]s with concrete y values. Row 0 is the
    /// header row.
    fn place_rows(
        &self,
        graph: &InteractionGraph,
        carved: Vec<Vec<NodeId>>,
        header_top: f32,
    ) -> Vec<Row> {
        let header = self.config.lifeline_header_height();
        let gap = self.config.min_row_gap();
        let spacing = self.config.row_spacing().max(gap);

        let headers: Vec<NodeId> = graph
            .lifelines()
            .iter()
            .copied()
            .filter(|lifeline| graph.creator(*lifeline).is_none())
            .collect();
        let mut rows = vec![Row::new(0, Some(header_top + header / 2.0), headers)];

        let mut previous = header_top + header;
        let mut use_starts: HashMap<NodeId, f32> = HashMap::new();
        for nodes in carved {
            let seed = nodes.iter().find_map(|node| graph.y(*node));
            let mut y = seed.map_or(previous + spacing, |seed| seed.max(previous + gap));

            for node in &nodes {
                let Some((fragment, kind)) = graph.alignment_group(*node) else {
                    continue;
                };
                if graph.kind(fragment) != Some(NodeKind::Fragment(FragmentKind::InteractionUse)) {
                    continue;
                }
                match kind {
                    MarkKind::Start => {
                        use_starts.insert(fragment, y);
                    }
                    MarkKind::End => {
                        if let Some(start) = use_starts.get(&fragment) {
                            y = y.max(start + self.config.interaction_use_height());
                        }
                    }
                }
            }

            previous = y;
            rows.push(Row::new(rows.len(), Some(y), nodes));
        }

        // created lifelines take the row of their create message's receive
        for lifeline in graph.lifelines() {
            let Some(first) = graph
                .creator(*lifeline)
                .and_then(|link| graph.link(link))
                .and_then(|link| link.target())
            else {
                continue;
            };
            if let Some(row) = rows.iter_mut().skip(1).find(|row| row.nodes.contains(&first)) {
                row.nodes.push(*lifeline);
            }
        }
        rows
    }

    // =========================================================================
    // Columns
    // =========================================================================

    fn place_columns(&self, graph: &InteractionGraph) -> (Vec<Column>, HashMap<NodeId, f32>) {
        let padding = self.config.column_padding();
        let mut columns = Vec::new();
        let mut widths = HashMap::new();
        let mut previous_right: Option<f32> = None;

        for lifeline in graph.lifelines() {
            let bounds = graph.bounds(*lifeline);
            let width = bounds
                .map(|bounds| bounds.width())
                .filter(|width| *width > 0.0)
                .unwrap_or(self.config.lifeline_width());
            let earliest = previous_right.map(|right| right + padding + width / 2.0);
            let desired = bounds
                .map(|bounds| bounds.center().x())
                .or(earliest)
                .unwrap_or(self.config.origin().x() + width / 2.0);
            let x = earliest.map_or(desired, |earliest| desired.max(earliest));

            previous_right = Some(x + width / 2.0);
            widths.insert(*lifeline, width);
            columns.push(Column::new(x, ColumnKind::Lifeline(*lifeline)));
        }

        let left = columns
            .first()
            .map(|column| column.x - Self::width_of(&widths, column) / 2.0)
            .unwrap_or(self.config.origin().x());
        let right = previous_right.unwrap_or(self.config.origin().x());
        let margin = self.config.gate_margin();
        columns.push(Column::new(left - margin, ColumnKind::LeftGates));
        columns.push(Column::new(right + margin, ColumnKind::RightGates));

        let lifeline_x: HashMap<NodeId, f32> = columns
            .iter()
            .filter_map(|column| column.lifeline().map(|lifeline| (lifeline, column.x)))
            .collect();
        for fragment in graph.fragments() {
            let extent = self.fragment_extent(graph, fragment, &lifeline_x, &widths);
            let Some((min_x, max_x)) = extent else {
                continue;
            };
            columns.push(Column::new(min_x, ColumnKind::FragmentLeft(fragment)));
            columns.push(Column::new(max_x, ColumnKind::FragmentRight(fragment)));
        }

        columns.sort_by(|a, b| a.x.total_cmp(&b.x));
        for (index, column) in columns.iter_mut().enumerate() {
            column.index = index;
        }
        (columns, widths)
    }

    fn width_of(widths: &HashMap<NodeId, f32>, column: &Column) -> f32 {
        column
            .lifeline()
            .and_then(|lifeline| widths.get(&lifeline))
            .copied()
            .unwrap_or_default()
    }

    /// Horizontal extent of a fragment's lanes, before any gate widens it.
    fn fragment_extent(
        &self,
        graph: &InteractionGraph,
        fragment: NodeId,
        lifeline_x: &HashMap<NodeId, f32>,
        widths: &HashMap<NodeId, f32>,
    ) -> Option<(f32, f32)> {
        let parts = graph.parts(fragment)?;
        parts
            .lanes()
            .iter()
            .filter_map(|lane| {
                let lifeline = graph.lifeline_of(*lane)?;
                let x = lifeline_x.get(&lifeline)?;
                let levels = lane_levels(graph, *lane);
                let width = widths
                    .get(&lifeline)
                    .copied()
                    .unwrap_or(self.config.lifeline_width());
                let half = width / 2.0 + self.config.fragment_padding() * levels as f32;
                Some((x - half, x + half))
            })
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
    }

    /// Picks the column of a gate: formal gates go to the interaction's left
    /// or right border, fragment gates to the border facing their peer.
    fn gate_column(
        &self,
        graph: &InteractionGraph,
        gate: NodeId,
        columns: &[Column],
    ) -> Option<usize> {
        let owner = graph.parent(gate)?;
        let peer = graph
            .effect_of(gate)
            .or_else(|| graph.connected_by(gate))
            .and_then(|peer| graph.lifeline_of(peer))
            .and_then(|lifeline| Self::lifeline_column(columns, lifeline))
            .map(|column| column.x);

        let (left_kind, right_kind) = if owner == graph.root() {
            (ColumnKind::LeftGates, ColumnKind::RightGates)
        } else {
            (ColumnKind::FragmentLeft(owner), ColumnKind::FragmentRight(owner))
        };
        let left = columns.iter().find(|column| column.kind == left_kind)?;
        let right = columns.iter().find(|column| column.kind == right_kind)?;
        let middle = (left.x + right.x) / 2.0;

        let on_left = if owner == graph.root() {
            match graph.bounds(gate) {
                Some(bounds) => bounds.center().x() < middle,
                None => graph.connects_to(gate).is_some(),
            }
        } else {
            match (peer, graph.bounds(gate)) {
                (Some(x), _) => x < middle,
                (None, Some(bounds)) => bounds.center().x() < middle,
                (None, None) => true,
            }
        };
        Some(if on_left { left.index } else { right.index })
    }

    fn lifeline_column(columns: &[Column], lifeline: NodeId) -> Option<&Column> {
        columns
            .iter()
            .find(|column| column.kind == ColumnKind::Lifeline(lifeline))
    }

    // =========================================================================
    // Grid assignment and bounds
    // =========================================================================

    fn assign_grid(&self, graph: &mut InteractionGraph, rows: &[Row], columns: &mut [Column]) {
        let mut row_of: HashMap<NodeId, usize> = HashMap::new();
        for row in rows {
            for node in &row.nodes {
                row_of.insert(*node, row.index);
            }
        }

        let mut placements: Vec<(NodeId, Option<usize>, Option<usize>)> = Vec::new();
        for lifeline in graph.lifelines() {
            let column = Self::lifeline_column(columns, *lifeline).map(|column| column.index);
            for node in graph.descendants(*lifeline) {
                let row = match graph.kind(node) {
                    Some(NodeKind::Lifeline) => row_of.get(&node).copied(),
                    Some(kind) if kind.is_leaf() => row_of.get(&node).copied(),
                    _ => graph
                        .first_leaf(node)
                        .and_then(|leaf| row_of.get(&leaf).copied()),
                };
                placements.push((node, row, column));
            }
        }
        for fragment in std::iter::once(graph.root()).chain(graph.fragments()) {
            let Some(parts) = graph.parts(fragment) else {
                continue;
            };
            if fragment != graph.root() {
                let lane = parts.lanes().first().copied();
                let row = lane
                    .and_then(|lane| graph.first_leaf(lane))
                    .and_then(|leaf| row_of.get(&leaf).copied());
                let column = lane
                    .and_then(|lane| graph.lifeline_of(lane))
                    .and_then(|lifeline| Self::lifeline_column(columns, lifeline))
                    .map(|column| column.index);
                placements.push((fragment, row, column));
            }
            for gate in parts.gates() {
                let column = self.gate_column(graph, gate, columns);
                placements.push((gate, row_of.get(&gate).copied(), column));
            }
        }

        for (id, row, column) in placements {
            if let Some(column) = column.and_then(|column| columns.get_mut(column)) {
                column.nodes.push(id);
            }
            if let Some(node) = graph.node_mut(id) {
                node.row = row;
                node.column = column;
            }
        }
    }

    fn apply_strategies(
        &self,
        graph: &mut InteractionGraph,
        ordered: &[NodeId],
        context: &LayoutContext<'_>,
    ) {
        let mut sequence: Vec<NodeId> = ordered.to_vec();
        for lifeline in graph.lifelines() {
            let mut clusters: Vec<NodeId> = graph
                .descendants(*lifeline)
                .into_iter()
                .filter(|node| {
                    matches!(
                        graph.kind(*node),
                        Some(NodeKind::ExecutionSpecification | NodeKind::Lane)
                    )
                })
                .collect();
            clusters.reverse();
            sequence.extend(clusters);
        }
        sequence.extend(graph.fragments().into_iter().rev());
        sequence.extend(graph.lifelines().iter().copied());
        sequence.push(graph.root());

        for node in sequence {
            let Some(kind) = graph.kind(node) else {
                continue;
            };
            let bounds = strategy_for(kind).layout(graph, node, context);
            graph.set_bounds(node, bounds);
        }

        let links: Vec<_> = graph.links().collect();
        for id in links {
            let bounds = graph.link(id).and_then(|link| {
                link.ends()
                    .filter_map(|end| graph.bounds(end))
                    .reduce(|a, b| a.merge(&b))
            });
            if let Some(link) = graph.link_mut(id) {
                link.bounds = bounds;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::{
        geometry::Bounds,
        identifier::Id,
        semantic::MessageSort,
    };

    use super::*;
    use crate::{
        Anchor, GraphBuilder,
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
        (from, send_y): (usize, f32),
        (to, receive_y): (usize, f32),
    ) -> (NodeId, NodeId) {
        let source = Anchor::new(graph.lifelines()[from], send_y);
        let target = Anchor::new(graph.lifelines()[to], receive_y);
        let link = graph
            .add_message(model, sort, Some(source), Some(target))
            .unwrap_or_else(|e| panic!("message refused: {e}"));
        graph
            .link(link)
            .and_then(|link| Some((link.source()?, link.target()?)))
            .unwrap_or_else(|| panic!("message with a missing end"))
    }

    type Snapshot = (Vec<Option<f32>>, Vec<f32>, Vec<Option<Bounds>>);

    fn snapshot(graph: &InteractionGraph) -> Snapshot {
        let rows = graph.rows().iter().map(Row::y).collect();
        let columns = graph.columns().iter().map(Column::x).collect();
        let bounds = graph
            .lifelines()
            .iter()
            .chain(graph.ordered_nodes())
            .map(|node| graph.bounds(*node))
            .collect();
        (rows, columns, bounds)
    }

    #[test]
    fn test_header_row_and_lifeline_columns() {
        let (_, graph) = setup("layout_columns", 3);

        let header = graph.rows().first().unwrap_or_else(|| panic!("no header row"));
        assert_eq!(header.y(), Some(40.0));
        assert_eq!(header.nodes(), graph.lifelines());
        let xs: Vec<f32> = graph
            .columns()
            .iter()
            .filter(|column| column.lifeline().is_some())
            .map(Column::x)
            .collect();
        assert_eq!(xs, vec![70.0, 190.0, 310.0]);
        let kinds: Vec<ColumnKind> = graph.columns().iter().map(Column::kind).collect();
        assert_eq!(kinds.first(), Some(&ColumnKind::LeftGates));
        assert_eq!(kinds.last(), Some(&ColumnKind::RightGates));
    }

    #[test]
    fn test_horizontal_message_shares_a_row() {
        let (mut model, mut graph) = setup("layout_join", 2);
        let (send, receive) = message(
            &mut model,
            &mut graph,
            MessageSort::Asynchronous,
            (0, 100.0),
            (1, 100.0),
        );
        let (slanted_send, slanted_receive) = message(
            &mut model,
            &mut graph,
            MessageSort::Asynchronous,
            (0, 160.0),
            (1, 190.0),
        );

        assert_eq!(graph.row_of(send), graph.row_of(receive));
        assert_ne!(graph.row_of(slanted_send), graph.row_of(slanted_receive));
        assert_eq!(graph.rows().len(), 4, "header, one joined row, two slanted rows");
    }

    #[test]
    fn test_rows_keep_the_minimum_gap() {
        let (mut model, mut graph) = setup("layout_gap", 2);
        message(&mut model, &mut graph, MessageSort::Asynchronous, (0, 100.0), (1, 100.0));
        let (send, receive) =
            message(&mut model, &mut graph, MessageSort::Asynchronous, (0, 160.0), (1, 160.0));
        graph.set_y(send, 103.0);
        graph.set_y(receive, 103.0);
        graph.layout();

        let ys: Vec<f32> = graph.rows().iter().filter_map(Row::y).collect();
        assert_eq!(ys, vec![40.0, 100.0, 110.0], "crowded row pushed to the gap");
        assert_eq!(graph.row_of(send), graph.row_of(receive));
    }

    #[test]
    fn test_interaction_use_keeps_its_height() {
        let (mut model, mut graph) = setup("layout_use", 2);
        let rect = Bounds::from_extents(30.0, 100.0, 230.0, 140.0);
        let fragment = graph
            .add_interaction_use(&mut model, &rect)
            .unwrap_or_else(|e| panic!("interaction use refused: {e}"));
        let ends = graph.marks(fragment, MarkKind::End);
        for end in &ends {
            graph.set_y(*end, 105.0);
        }
        graph.layout();

        let rows: Vec<Option<usize>> = ends.iter().map(|end| graph.row_of(*end)).collect();
        assert!(rows.windows(2).all(|pair| pair[0] == pair[1]), "end marks share a row");
        let end_y = rows[0].and_then(|row| graph.row_y(row));
        assert_eq!(end_y, Some(140.0), "end row held at the minimum height");
    }

    #[test]
    fn test_created_lifeline_starts_at_create_row() {
        let (mut model, mut graph) = setup("layout_create", 2);
        let (_, receive) =
            message(&mut model, &mut graph, MessageSort::Create, (0, 100.0), (1, 100.0));
        let created = graph.lifelines()[1];

        assert_eq!(graph.row_of(created), graph.row_of(receive));
        assert!(!graph.rows()[0].nodes().contains(&created), "not in the header row");
        let top = graph.bounds(created).map(Bounds::min_y);
        let header = graph.config().lifeline_header_height();
        assert_eq!(top, Some(100.0 - header / 2.0));
    }

    #[test]
    fn test_layout_twice_changes_nothing() {
        let (mut model, mut graph) = setup("layout_idempotent", 3);
        message(&mut model, &mut graph, MessageSort::Synchronous, (0, 100.0), (1, 100.0));
        message(&mut model, &mut graph, MessageSort::Asynchronous, (1, 120.0), (2, 130.0));
        let rect = Bounds::from_extents(30.0, 250.0, 350.0, 290.0);
        graph
            .add_interaction_use(&mut model, &rect)
            .unwrap_or_else(|e| panic!("interaction use refused: {e}"));

        let before = snapshot(&graph);
        graph.layout();
        assert_eq!(snapshot(&graph), before);
    }
}
