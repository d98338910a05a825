//! Rows and columns of the interaction grid.

use super::NodeId;

/// A time slot: the nodes that share one vertical position.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub(crate) index: usize,
    pub(crate) y: Option<f32>,
    pub(crate) nodes: Vec<NodeId>,
}

impl Row {
    pub(crate) fn new(index: usize, y: Option<f32>, nodes: Vec<NodeId>) -> Self {
        Self { index, y, nodes }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Vertical pixel position, unset while no node of the row has geometry.
    pub fn y(&self) -> Option<f32> {
        self.y
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }
}

/// What a column is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// The column of a lifeline cluster.
    Lifeline(NodeId),
    /// Formal gates on the left border of the interaction.
    LeftGates,
    /// Formal gates on the right border of the interaction.
    RightGates,
    /// Gates on the left border of a fragment.
    FragmentLeft(NodeId),
    /// Gates on the right border of a fragment.
    FragmentRight(NodeId),
}

/// A lifeline slot: the nodes that share one horizontal position.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) index: usize,
    pub(crate) x: f32,
    pub(crate) kind: ColumnKind,
    pub(crate) nodes: Vec<NodeId>,
}

impl Column {
    pub(crate) fn new(x: f32, kind: ColumnKind) -> Self {
        Self {
            index: 0,
            x,
            kind,
            nodes: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Horizontal pixel position.
    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The lifeline cluster this column belongs to, if any.
    pub fn lifeline(&self) -> Option<NodeId> {
        match self.kind {
            ColumnKind::Lifeline(lifeline) => Some(lifeline),
            _ => None,
        }
    }
}
