//! The interaction graph: an arena of nodes, clusters and links.
//!
//! # Architecture
//!
//! - [`Node`]: one record per lifeline, execution, lane, fragment, occurrence,
//!   gate or mark. Clusters hold an ordered list of children; insertion order
//!   is time order.
//! - [`Link`]: one record per message, with weak references to its ends.
//! - Connections: at most one outgoing *connects-to* edge and one incoming
//!   *connected-by* edge per node, kept in two maps beside the arena.
//! - [`Row`] and [`Column`]: the grid produced by the layout pass.
//!
//! Handles ([`NodeId`], [`LinkId`]) carry the epoch of the graph that issued
//! them, so every query answers `None` for a handle from another graph or one
//! whose node has been removed.

mod batch;
mod grid;
mod node;

use std::sync::atomic::{AtomicU32, Ordering};

use indexmap::IndexMap;
use log::trace;

use weft_core::{
    geometry::{Bounds, Point, Size},
    identifier::Id,
    semantic::MessageSort,
};

use crate::{config::LayoutConfig, layout::LayoutManager};

pub use batch::LayoutBatch;
pub use grid::{Column, ColumnKind, Row};
pub use node::{FragmentKind, FragmentParts, Link, LinkId, MarkKind, Node, NodeId, NodeKind};

static NEXT_EPOCH: AtomicU32 = AtomicU32::new(1);

/// The graph of one interaction.
///
/// The root node is a fragment cluster standing for the interaction itself;
/// its inner gates are the formal gates and its nested fragments the
/// top-level interaction uses and combined fragments.
#[derive(Debug, Clone)]
pub struct InteractionGraph {
    epoch: u32,
    config: LayoutConfig,
    nodes: Vec<Option<Node>>,
    links: Vec<Option<Link>>,
    root: NodeId,
    lifelines: Vec<NodeId>,
    connects: IndexMap<NodeId, NodeId>,
    connected_by: IndexMap<NodeId, NodeId>,
    node_cache: IndexMap<Id, NodeId>,
    link_cache: IndexMap<Id, LinkId>,
    rows: Vec<Row>,
    columns: Vec<Column>,
    ordered: Vec<NodeId>,
    layout_disabled: usize,
    layout_pending: bool,
}

impl InteractionGraph {
    /// Creates an empty graph for the interaction `element`.
    pub fn new(element: Id, config: LayoutConfig) -> Self {
        let epoch = NEXT_EPOCH.fetch_add(1, Ordering::Relaxed);
        let root = NodeId::new(epoch, 0);
        let mut node_cache = IndexMap::new();
        node_cache.insert(element, root);

        Self {
            epoch,
            config,
            nodes: vec![Some(Node::new(NodeKind::Interaction, Some(element), None))],
            links: Vec::new(),
            root,
            lifelines: Vec::new(),
            connects: IndexMap::new(),
            connected_by: IndexMap::new(),
            node_cache,
            link_cache: IndexMap::new(),
            rows: Vec::new(),
            columns: Vec::new(),
            ordered: Vec::new(),
            layout_disabled: 0,
            layout_pending: false,
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// The root fragment cluster.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The interaction element.
    pub fn element(&self) -> Option<Id> {
        self.node(self.root).and_then(Node::element)
    }

    // =========================================================================
    // Node and link access
    // =========================================================================

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.nodes.get(id.index())?.as_ref()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.nodes.get_mut(id.index())?.as_mut()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.links.get(id.index())?.as_ref()
    }

    pub(crate) fn link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        if id.epoch() != self.epoch {
            return None;
        }
        self.links.get_mut(id.index())?.as_mut()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(Node::kind)
    }

    pub fn bounds(&self, id: NodeId) -> Option<Bounds> {
        self.node(id).and_then(Node::bounds)
    }

    /// Vertical center of a node, if it has geometry.
    pub fn y(&self, id: NodeId) -> Option<f32> {
        self.node(id).and_then(Node::y)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Ordered children of a cluster; empty for other nodes and stale handles.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parts(&self, id: NodeId) -> Option<&FragmentParts> {
        self.node(id).and_then(Node::parts)
    }

    /// Lifeline clusters, left to right.
    pub fn lifelines(&self) -> &[NodeId] {
        &self.lifelines
    }

    /// Live links in creation order.
    pub fn links(&self) -> impl Iterator<Item = LinkId> + '_ {
        self.links
            .iter()
            .enumerate()
            .filter(|(_, link)| link.is_some())
            .map(|(index, _)| LinkId::new(self.epoch, index))
    }

    /// All fragment clusters below the root, outer fragments first.
    pub fn fragments(&self) -> Vec<NodeId> {
        let mut fragments = Vec::new();
        let mut stack = vec![self.root];
        while let Some(fragment) = stack.pop() {
            if fragment != self.root {
                fragments.push(fragment);
            }
            if let Some(parts) = self.parts(fragment) {
                stack.extend(parts.nested.iter().rev().copied());
            }
        }
        fragments
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Leaf nodes in the global order produced by the last layout pass.
    pub fn ordered_nodes(&self) -> &[NodeId] {
        &self.ordered
    }

    /// Row index of a node, once laid out.
    pub fn row_of(&self, id: NodeId) -> Option<usize> {
        self.node(id).and_then(Node::row)
    }

    /// Pixel position of a row.
    pub fn row_y(&self, row: usize) -> Option<f32> {
        self.rows.get(row).and_then(Row::y)
    }

    // =========================================================================
    // Element lookups
    // =========================================================================

    /// The node standing for `element`.
    pub fn node_for(&self, element: Id) -> Option<NodeId> {
        self.node_cache
            .get(&element)
            .copied()
            .filter(|node| self.contains(*node))
    }

    /// The link standing for the message `element`.
    pub fn link_for(&self, element: Id) -> Option<LinkId> {
        self.link_cache
            .get(&element)
            .copied()
            .filter(|link| self.link(*link).is_some())
    }

    /// The cluster or fragment cluster standing for `element`.
    pub fn cluster_for(&self, element: Id) -> Option<NodeId> {
        self.node_for(element).filter(|node| {
            self.kind(*node)
                .is_some_and(|kind| kind.is_cluster() || kind.is_fragment())
        })
    }

    /// The lifeline cluster of a lifeline element, or the lifeline holding the
    /// node of any other element.
    pub fn lifeline(&self, element: Id) -> Option<NodeId> {
        self.lifeline_of(self.node_for(element)?)
    }

    /// The link of a message element, or the link attached to the node of an
    /// occurrence or gate element.
    pub fn message(&self, element: Id) -> Option<LinkId> {
        self.link_for(element)
            .or_else(|| self.link_of(self.node_for(element)?))
    }

    // =========================================================================
    // Structure queries
    // =========================================================================

    /// The node `id` connects to.
    pub fn connects_to(&self, id: NodeId) -> Option<NodeId> {
        self.connects.get(&id).copied()
    }

    /// The node connecting to `id`.
    pub fn connected_by(&self, id: NodeId) -> Option<NodeId> {
        self.connected_by.get(&id).copied()
    }

    /// The lifeline cluster that (transitively) owns `id`.
    pub fn lifeline_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let node = self.node(current)?;
            if node.kind == NodeKind::Lifeline {
                return Some(current);
            }
            current = node.parent?;
        }
    }

    /// Position of a lifeline cluster, left to right.
    pub fn lifeline_index(&self, lifeline: NodeId) -> Option<usize> {
        self.lifelines.iter().position(|l| *l == lifeline)
    }

    /// The link that has `id` as one of its ends.
    pub fn link_of(&self, id: NodeId) -> Option<LinkId> {
        self.links().find(|link| {
            self.link(*link)
                .is_some_and(|link| link.source == Some(id) || link.target == Some(id))
        })
    }

    /// The link whose source is `id`.
    pub fn outgoing_link(&self, id: NodeId) -> Option<LinkId> {
        self.links()
            .find(|link| self.link(*link).is_some_and(|link| link.source == Some(id)))
    }

    /// The link whose target is `id`.
    pub fn incoming_link(&self, id: NodeId) -> Option<LinkId> {
        self.links()
            .find(|link| self.link(*link).is_some_and(|link| link.target == Some(id)))
    }

    /// Leaves of a cluster in time order, descending into nested clusters.
    pub fn flatten(&self, cluster: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_leaves(cluster, &mut leaves);
        leaves
    }

    fn collect_leaves(&self, cluster: NodeId, leaves: &mut Vec<NodeId>) {
        for child in self.children(cluster) {
            match self.kind(*child) {
                Some(kind) if kind.is_leaf() => leaves.push(*child),
                Some(kind) if kind.is_cluster() => self.collect_leaves(*child, leaves),
                _ => {}
            }
        }
    }

    /// Every node in the subtree of `id`, `id` included, parents first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut all = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            all.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        all
    }

    pub fn first_leaf(&self, cluster: NodeId) -> Option<NodeId> {
        self.flatten(cluster).first().copied()
    }

    pub fn last_leaf(&self, cluster: NodeId) -> Option<NodeId> {
        self.flatten(cluster).last().copied()
    }

    /// A leaf stands for itself; a cluster for its first leaf.
    pub fn resolve_leaf(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id)? {
            kind if kind.is_leaf() => Some(id),
            kind if kind.is_cluster() => self.first_leaf(id),
            _ => None,
        }
    }

    /// The node that causes the leaf `id`: its connected-by source, also when
    /// the connection targets the execution cluster `id` starts.
    pub fn cause_of(&self, id: NodeId) -> Option<NodeId> {
        self.connected_by(id).or_else(|| {
            self.started_execution(id)
                .and_then(|execution| self.connected_by(execution))
        })
    }

    /// The leaf caused by `id`.
    pub fn effect_of(&self, id: NodeId) -> Option<NodeId> {
        self.connects_to(id).and_then(|target| self.resolve_leaf(target))
    }

    /// The execution cluster whose first child is `id`.
    pub fn started_execution(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        (self.kind(parent) == Some(NodeKind::ExecutionSpecification)
            && self.children(parent).first() == Some(&id))
        .then_some(parent)
    }

    /// The execution cluster whose last child is `id`.
    pub fn finished_execution(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        (self.kind(parent) == Some(NodeKind::ExecutionSpecification)
            && self.children(parent).len() > 1
            && self.children(parent).last() == Some(&id))
        .then_some(parent)
    }

    /// Vertical extent of a node: its own y for a leaf, first to last leaf for
    /// a cluster, start to end marks for a fragment.
    pub fn span(&self, id: NodeId) -> Option<(f32, f32)> {
        let kind = self.kind(id)?;
        if kind.is_leaf() {
            let y = self.y(id)?;
            return Some((y, y));
        }
        if kind.is_fragment() && kind != NodeKind::Interaction {
            let lanes = self.parts(id)?.lanes.clone();
            return lanes
                .iter()
                .filter_map(|lane| self.span(*lane))
                .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)));
        }
        let leaves = self.flatten(id);
        let top = leaves.iter().find_map(|leaf| self.y(*leaf))?;
        let bottom = leaves.iter().rev().find_map(|leaf| self.y(*leaf))?;
        Some((top, bottom))
    }

    /// Two nodes share a row when their centres are within the threshold or
    /// when either position is unknown.
    pub fn is_horizontally_connected(&self, a: NodeId, b: NodeId) -> bool {
        match (self.y(a), self.y(b)) {
            (Some(ya), Some(yb)) => (ya - yb).abs() <= self.config.horizontal_threshold(),
            _ => true,
        }
    }

    /// Number of execution clusters above `id`.
    pub fn execution_depth(&self, id: NodeId) -> usize {
        self.ancestors(id)
            .filter(|ancestor| self.kind(*ancestor) == Some(NodeKind::ExecutionSpecification))
            .count()
    }

    /// Number of lanes above `id`.
    pub fn lane_depth(&self, id: NodeId) -> usize {
        self.ancestors(id)
            .filter(|ancestor| self.kind(*ancestor) == Some(NodeKind::Lane))
            .count()
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |current| self.parent(*current))
    }

    /// The innermost fragment whose lane contains `id`, or the root.
    pub fn enclosing_fragment(&self, id: NodeId) -> NodeId {
        self.ancestors(id)
            .find(|ancestor| self.kind(*ancestor) == Some(NodeKind::Lane))
            .and_then(|lane| self.node(lane).and_then(Node::fragment))
            .unwrap_or(self.root)
    }

    /// The fragment and kind shared by the marks of one alignment group.
    pub fn alignment_group(&self, mark: NodeId) -> Option<(NodeId, MarkKind)> {
        let NodeKind::Mark(kind) = self.kind(mark)? else {
            return None;
        };
        let lane = self.parent(mark)?;
        let fragment = self.node(lane)?.fragment?;
        Some((fragment, kind))
    }

    /// The start or end marks of a fragment, one per lane.
    pub fn marks(&self, fragment: NodeId, kind: MarkKind) -> Vec<NodeId> {
        let Some(parts) = self.parts(fragment) else {
            return Vec::new();
        };
        parts
            .lanes
            .iter()
            .filter_map(|lane| {
                let children = self.children(*lane);
                match kind {
                    MarkKind::Start => children.first(),
                    MarkKind::End => children.last(),
                }
                .copied()
                .filter(|mark| self.kind(*mark) == Some(NodeKind::Mark(kind)))
            })
            .collect()
    }

    /// The lane of `fragment` on `lifeline`.
    pub fn lane_on(&self, fragment: NodeId, lifeline: NodeId) -> Option<NodeId> {
        self.parts(fragment)?
            .lanes
            .iter()
            .copied()
            .find(|lane| self.lifeline_of(*lane) == Some(lifeline))
    }

    /// Lifelines covered by a fragment, left to right.
    pub fn covered_lifelines(&self, fragment: NodeId) -> Vec<NodeId> {
        let Some(parts) = self.parts(fragment) else {
            return Vec::new();
        };
        let covered: Vec<NodeId> = parts
            .lanes
            .iter()
            .filter_map(|lane| self.lifeline_of(*lane))
            .collect();
        self.lifelines
            .iter()
            .copied()
            .filter(|lifeline| covered.contains(lifeline))
            .collect()
    }

    /// Whether the lifeline holds a destruction occurrence.
    pub fn is_destroyed(&self, lifeline: NodeId) -> bool {
        self.flatten(lifeline)
            .iter()
            .any(|leaf| self.kind(*leaf) == Some(NodeKind::Destruction))
    }

    /// The create message whose receive node opens the lifeline.
    pub fn creator(&self, lifeline: NodeId) -> Option<LinkId> {
        let first = self.first_leaf(lifeline)?;
        self.incoming_link(first).filter(|link| {
            self.link(*link)
                .is_some_and(|link| link.sort == MessageSort::Create)
        })
    }

    // =========================================================================
    // Primitive mutations
    // =========================================================================

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let element = node.element;
        let id = NodeId::new(self.epoch, self.nodes.len());
        self.nodes.push(Some(node));
        if let Some(element) = element {
            self.node_cache.insert(element, id);
        }
        id
    }

    /// Inserts `child` into a cluster at `index`, clamped to the end.
    pub(crate) fn insert_child(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        }
    }

    pub(crate) fn push_child(&mut self, parent: NodeId, child: NodeId) {
        self.insert_child(parent, child, usize::MAX);
    }

    /// Inserts `child` into `parent` before the first child that starts below
    /// `y`; appends when none does.
    pub(crate) fn insert_child_at_y(&mut self, parent: NodeId, child: NodeId, y: f32) {
        let index = self.insertion_index(parent, y);
        self.insert_child(parent, child, index);
    }

    /// Index of the first child of `parent` that starts strictly below `y`.
    pub fn insertion_index(&self, parent: NodeId, y: f32) -> usize {
        let children = self.children(parent);
        children
            .iter()
            .position(|child| self.span(*child).is_some_and(|(top, _)| top > y))
            .unwrap_or(children.len())
    }

    /// Removes `child` from whatever list its parent keeps it in. Returns the
    /// former parent and position.
    pub(crate) fn detach(&mut self, child: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(child)?;
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        if let Some(index) = self.lifelines.iter().position(|l| *l == child) {
            self.lifelines.remove(index);
            return Some((parent, index));
        }
        let node = self.node_mut(parent)?;
        if let Some(index) = node.children.iter().position(|c| *c == child) {
            node.children.remove(index);
            return Some((parent, index));
        }
        let parts = node.parts.as_mut()?;
        for list in [
            &mut parts.inner_gates,
            &mut parts.outer_gates,
            &mut parts.nested,
        ] {
            if let Some(index) = list.iter().position(|c| *c == child) {
                list.remove(index);
                return Some((parent, index));
            }
        }
        None
    }

    pub(crate) fn insert_lifeline(&mut self, index: usize, lifeline: NodeId) {
        let root = self.root;
        if let Some(node) = self.node_mut(lifeline) {
            node.parent = Some(root);
        }
        let index = index.min(self.lifelines.len());
        self.lifelines.insert(index, lifeline);
    }

    /// Registers `lane` with `fragment`, keeping lanes in lifeline order.
    pub(crate) fn attach_lane(&mut self, fragment: NodeId, lane: NodeId) {
        if let Some(node) = self.node_mut(lane) {
            node.fragment = Some(fragment);
        }
        let Some(mut lanes) = self.parts(fragment).map(|parts| parts.lanes.clone()) else {
            return;
        };
        lanes.push(lane);
        lanes.sort_by_key(|lane| {
            self.lifeline_of(*lane)
                .and_then(|lifeline| self.lifeline_index(lifeline))
                .unwrap_or(usize::MAX)
        });
        if let Some(parts) = self.node_mut(fragment).and_then(|node| node.parts.as_mut()) {
            parts.lanes = lanes;
        }
    }

    pub(crate) fn detach_lane(&mut self, lane: NodeId) {
        let Some(fragment) = self.node(lane).and_then(Node::fragment) else {
            return;
        };
        if let Some(parts) = self.node_mut(fragment).and_then(|node| node.parts.as_mut()) {
            parts.lanes.retain(|l| *l != lane);
        }
    }

    pub(crate) fn attach_gate(&mut self, owner: NodeId, gate: NodeId, outer: bool) {
        if let Some(node) = self.node_mut(gate) {
            node.parent = Some(owner);
        }
        if let Some(parts) = self.node_mut(owner).and_then(|node| node.parts.as_mut()) {
            if outer {
                parts.outer_gates.push(gate);
            } else {
                parts.inner_gates.push(gate);
            }
        }
    }

    /// Nests `fragment` in `parent`, keeping siblings ordered by their top.
    pub(crate) fn attach_fragment(&mut self, parent: NodeId, fragment: NodeId) {
        if let Some(node) = self.node_mut(fragment) {
            node.parent = Some(parent);
        }
        let top = self.span(fragment).map(|(top, _)| top);
        let Some(nested) = self.parts(parent).map(|parts| parts.nested.clone()) else {
            return;
        };
        let index = nested
            .iter()
            .position(|sibling| match (top, self.span(*sibling)) {
                (Some(top), Some((sibling_top, _))) => sibling_top > top,
                _ => false,
            })
            .unwrap_or(nested.len());
        if let Some(parts) = self.node_mut(parent).and_then(|node| node.parts.as_mut()) {
            parts.nested.insert(index, fragment);
        }
    }

    pub(crate) fn connect(&mut self, from: NodeId, to: NodeId) {
        self.disconnect(from);
        if let Some(previous) = self.connected_by.swap_remove(&to) {
            self.connects.swap_remove(&previous);
        }
        trace!(from:% = from, to:% = to; "Connect nodes");
        self.connects.insert(from, to);
        self.connected_by.insert(to, from);
    }

    pub(crate) fn disconnect(&mut self, from: NodeId) {
        if let Some(to) = self.connects.swap_remove(&from) {
            self.connected_by.swap_remove(&to);
        }
    }

    /// Drops the connection that ends in `to`.
    pub(crate) fn disconnect_target(&mut self, to: NodeId) {
        if let Some(from) = self.connected_by.swap_remove(&to) {
            self.connects.swap_remove(&from);
        }
    }

    pub(crate) fn add_link(&mut self, link: Link) -> LinkId {
        let id = LinkId::new(self.epoch, self.links.len());
        if let Some(element) = link.element {
            self.link_cache.insert(element, id);
        }
        self.links.push(Some(link));
        id
    }

    pub(crate) fn remove_link(&mut self, id: LinkId) -> Option<Link> {
        if id.epoch() != self.epoch {
            return None;
        }
        let link = self.links.get_mut(id.index())?.take()?;
        if let Some(source) = link.source {
            self.disconnect(source);
        }
        if let Some(element) = link.element {
            self.link_cache.swap_remove(&element);
        }
        Some(link)
    }

    /// Removes a node with its whole subtree, the lanes and gates of a
    /// fragment, and every link attached to a removed node.
    pub(crate) fn remove_node(&mut self, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        let mut owned: Vec<NodeId> = node.children.clone();
        if let Some(parts) = &node.parts {
            owned.extend(parts.lanes.iter().copied());
            owned.extend(parts.gates());
            owned.extend(parts.nested.iter().copied());
        }
        for child in owned {
            self.remove_node(child);
        }

        let attached: Vec<LinkId> = self
            .links()
            .filter(|link| {
                self.link(*link)
                    .is_some_and(|link| link.source == Some(id) || link.target == Some(id))
            })
            .collect();
        for link in attached {
            self.remove_link(link);
        }

        self.disconnect(id);
        self.disconnect_target(id);
        self.detach_lane(id);
        self.detach(id);
        if let Some(element) = self.node(id).and_then(Node::element) {
            if self.node_cache.get(&element) == Some(&id) {
                self.node_cache.swap_remove(&element);
            }
        }
        trace!(node:% = id; "Remove node");
        self.nodes[id.index()] = None;
    }

    pub(crate) fn set_bounds(&mut self, id: NodeId, bounds: Option<Bounds>) {
        if let Some(node) = self.node_mut(id) {
            node.bounds = bounds;
        }
    }

    /// Moves a node's centre to `y`, giving it a zero-size box when it has no
    /// geometry yet.
    pub(crate) fn set_y(&mut self, id: NodeId, y: f32) {
        let bounds = self.bounds(id).map_or_else(
            || Bounds::new_from_center(Point::new(0.0, y), Size::default()),
            |bounds| bounds.with_center_y(y),
        );
        self.set_bounds(id, Some(bounds));
    }

    /// Moves a node's centre to `x`.
    pub(crate) fn set_x(&mut self, id: NodeId, x: f32) {
        if let Some(bounds) = self.bounds(id) {
            self.set_bounds(id, Some(bounds.with_center_x(x)));
        }
    }

    /// Shifts every leaf at or below `y` down by `dy`.
    pub(crate) fn shift_below(&mut self, y: f32, dy: f32) {
        let leaves: Vec<NodeId> = self
            .ordered
            .iter()
            .copied()
            .filter(|leaf| self.y(*leaf).is_some_and(|leaf_y| leaf_y >= y))
            .collect();
        for leaf in leaves {
            if let Some(leaf_y) = self.y(leaf) {
                self.set_y(leaf, leaf_y + dy);
            }
        }
    }

    /// Shifts the nodes of every row from `row` onward by `dy`, leaving the
    /// nodes in `except` where they are.
    pub(crate) fn shift_rows_from(&mut self, row: usize, dy: f32, except: &[NodeId]) {
        let nodes: Vec<NodeId> = self
            .rows
            .iter()
            .skip(row.max(1))
            .flat_map(|row| row.nodes.iter().copied())
            .filter(|node| !except.contains(node))
            .filter(|node| self.kind(*node).is_some_and(NodeKind::is_leaf))
            .collect();
        for node in nodes {
            if let Some(y) = self.y(node) {
                self.set_y(node, y + dy);
            }
        }
    }

    /// Shifts lifeline headers and gates at or right of `x` by `dx`.
    pub(crate) fn shift_right_of(&mut self, x: f32, dx: f32) {
        let lifelines: Vec<NodeId> = self
            .lifelines
            .iter()
            .copied()
            .filter(|lifeline| {
                self.bounds(*lifeline)
                    .is_some_and(|bounds| bounds.center().x() >= x)
            })
            .collect();
        let gates: Vec<NodeId> = std::iter::once(self.root)
            .chain(self.fragments())
            .filter_map(|fragment| self.parts(fragment))
            .flat_map(|parts| parts.gates().collect::<Vec<_>>())
            .filter(|gate| self.bounds(*gate).is_some_and(|b| b.center().x() >= x))
            .collect();
        for node in lifelines.into_iter().chain(gates) {
            if let Some(bounds) = self.bounds(node) {
                self.set_bounds(node, Some(bounds.with_center_x(bounds.center().x() + dx)));
            }
        }
    }

    pub(crate) fn set_grid(&mut self, ordered: Vec<NodeId>, rows: Vec<Row>, columns: Vec<Column>) {
        self.ordered = ordered;
        self.rows = rows;
        self.columns = columns;
    }

    // =========================================================================
    // Layout control
    // =========================================================================

    /// Recomputes order, rows, columns and bounds. Deferred while layout is
    /// disabled.
    pub fn layout(&mut self) {
        if self.layout_disabled > 0 {
            self.layout_pending = true;
            return;
        }
        self.layout_pending = false;
        let config = self.config.clone();
        LayoutManager::new(&config).run(self);
    }

    /// Suspends layout until the matching [`enable_layout`](Self::enable_layout).
    pub fn disable_layout(&mut self) {
        self.layout_disabled += 1;
    }

    /// Resumes layout, running a deferred pass when the last suspension ends.
    pub fn enable_layout(&mut self) {
        self.layout_disabled = self.layout_disabled.saturating_sub(1);
        if self.layout_disabled == 0 && self.layout_pending {
            self.layout();
        }
    }

    pub fn is_layout_disabled(&self) -> bool {
        self.layout_disabled > 0
    }

    /// Opens a batch scope; see [`LayoutBatch`].
    pub fn begin_batch(&mut self) -> LayoutBatch<'_> {
        LayoutBatch::new(self)
    }

    /// A copy of the graph with layout enabled, for trying an edit out.
    pub(crate) fn preview(&self) -> Self {
        let mut preview = self.clone();
        preview.layout_disabled = 0;
        preview.layout_pending = false;
        preview
    }
}
