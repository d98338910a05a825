//! Node, cluster and link records stored in the graph arena.

use std::fmt;

use weft_core::{geometry::Bounds, identifier::Id, semantic::MessageSort};

/// Handle of a node in an [`InteractionGraph`](super::InteractionGraph).
///
/// Handles are plain indices tagged with the epoch of the graph that issued
/// them. A handle from another graph, or from a previous build of the same
/// interaction, never resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    epoch: u32,
    index: u32,
}

impl NodeId {
    pub(crate) fn new(epoch: u32, index: usize) -> Self {
        Self {
            epoch,
            index: index as u32,
        }
    }

    pub(crate) fn epoch(self) -> u32 {
        self.epoch
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.index)
    }
}

/// Handle of a link (message) in an [`InteractionGraph`](super::InteractionGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId {
    epoch: u32,
    index: u32,
}

impl LinkId {
    pub(crate) fn new(epoch: u32, index: usize) -> Self {
        Self {
            epoch,
            index: index as u32,
        }
    }

    pub(crate) fn epoch(self) -> u32 {
        self.epoch
    }

    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.index)
    }
}

/// Boundary marker kind of a fragment lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkKind {
    Start,
    End,
}

/// Kind of a fragment cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentKind {
    InteractionUse,
    CombinedFragment,
}

/// What a node stands for in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The root fragment cluster of the whole interaction.
    Interaction,
    /// A lifeline cluster.
    Lifeline,
    /// An execution specification cluster, nested in a lifeline.
    ExecutionSpecification,
    /// The slice of a fragment that lies on one covered lifeline.
    Lane,
    /// An interaction use or combined fragment.
    Fragment(FragmentKind),
    /// A message or execution occurrence.
    Occurrence,
    /// A destruction occurrence.
    Destruction,
    /// A formal or actual gate.
    Gate,
    /// A zero-size marker opening or closing a lane.
    Mark(MarkKind),
}

impl NodeKind {
    /// Returns true for kinds that hold an ordered list of children.
    pub fn is_cluster(self) -> bool {
        matches!(
            self,
            Self::Lifeline | Self::ExecutionSpecification | Self::Lane
        )
    }

    /// Returns true for kinds that own lanes, gates and nested fragments.
    pub fn is_fragment(self) -> bool {
        matches!(self, Self::Interaction | Self::Fragment(_))
    }

    /// Returns true for kinds that take a place in a row.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Self::Occurrence | Self::Destruction | Self::Gate | Self::Mark(_)
        )
    }
}

/// Lanes, gates and nested fragments owned by a fragment cluster.
#[derive(Debug, Clone, Default)]
pub struct FragmentParts {
    pub(crate) lanes: Vec<NodeId>,
    pub(crate) inner_gates: Vec<NodeId>,
    pub(crate) outer_gates: Vec<NodeId>,
    pub(crate) nested: Vec<NodeId>,
}

impl FragmentParts {
    /// One lane per covered lifeline, in lifeline order.
    pub fn lanes(&self) -> &[NodeId] {
        &self.lanes
    }

    /// Gates on the inside of the border (formal gates for the root).
    pub fn inner_gates(&self) -> &[NodeId] {
        &self.inner_gates
    }

    /// Gates on the outside of the border (actual gates of an interaction use).
    pub fn outer_gates(&self) -> &[NodeId] {
        &self.outer_gates
    }

    /// Fragment clusters directly nested in this one.
    pub fn nested(&self) -> &[NodeId] {
        &self.nested
    }

    /// All gates, inner first.
    pub fn gates(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.inner_gates.iter().chain(self.outer_gates.iter()).copied()
    }
}

/// A node of the interaction graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) element: Option<Id>,
    pub(crate) bounds: Option<Bounds>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) fragment: Option<NodeId>,
    pub(crate) parts: Option<FragmentParts>,
    pub(crate) row: Option<usize>,
    pub(crate) column: Option<usize>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, element: Option<Id>, bounds: Option<Bounds>) -> Self {
        let parts = kind.is_fragment().then(FragmentParts::default);
        Self {
            kind,
            element,
            bounds,
            parent: None,
            children: Vec::new(),
            fragment: None,
            parts,
            row: None,
            column: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The semantic element this node stands for; `None` for marks and lanes.
    pub fn element(&self) -> Option<Id> {
        self.element
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// The owning cluster or fragment.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Ordered children of a cluster. Empty for other kinds.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// For a lane, the fragment cluster it belongs to.
    pub fn fragment(&self) -> Option<NodeId> {
        self.fragment
    }

    /// Lanes, gates and nested fragments of a fragment cluster.
    pub fn parts(&self) -> Option<&FragmentParts> {
        self.parts.as_ref()
    }

    /// Index of the row this node sits in, once laid out.
    pub fn row(&self) -> Option<usize> {
        self.row
    }

    /// Index of the column this node sits in, once laid out.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Vertical center of the node, if it has geometry.
    pub fn y(&self) -> Option<f32> {
        self.bounds.map(|bounds| bounds.center().y())
    }
}

/// A message between two nodes.
///
/// The ends are weak references used for traversal; a lost message has no
/// target and a found message has no source.
#[derive(Debug, Clone)]
pub struct Link {
    pub(crate) element: Option<Id>,
    pub(crate) sort: MessageSort,
    pub(crate) source: Option<NodeId>,
    pub(crate) target: Option<NodeId>,
    pub(crate) bounds: Option<Bounds>,
}

impl Link {
    pub(crate) fn new(
        element: Option<Id>,
        sort: MessageSort,
        source: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Self {
        Self {
            element,
            sort,
            source,
            target,
            bounds: None,
        }
    }

    /// The message element.
    pub fn element(&self) -> Option<Id> {
        self.element
    }

    pub fn sort(&self) -> MessageSort {
        self.sort
    }

    pub fn source(&self) -> Option<NodeId> {
        self.source
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Union of the endpoints' bounds.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Both ends, skipping the missing one of a lost or found message.
    pub fn ends(&self) -> impl Iterator<Item = NodeId> {
        self.source.into_iter().chain(self.target)
    }
}
