//! Layout batching scope.

use std::ops::{Deref, DerefMut};

use super::InteractionGraph;

/// Guard that suspends re-layout while several primitive edits run.
///
/// Created by [`InteractionGraph::begin_batch`]. Guards nest, and the layout
/// runs once when the outermost guard drops, including on early returns.
///
/// ```
/// # use weft::{graph::InteractionGraph, config::LayoutConfig};
/// # use weft_core::identifier::Id;
/// let mut graph = InteractionGraph::new(Id::new("batch_doc"), LayoutConfig::default());
/// {
///     let batch = graph.begin_batch();
///     assert!(batch.is_layout_disabled());
/// }
/// assert!(!graph.is_layout_disabled());
/// ```
#[derive(Debug)]
pub struct LayoutBatch<'g> {
    graph: &'g mut InteractionGraph,
}

impl<'g> LayoutBatch<'g> {
    pub(super) fn new(graph: &'g mut InteractionGraph) -> Self {
        graph.disable_layout();
        // Any edit made under the guard may have moved nodes.
        graph.layout();
        Self { graph }
    }
}

impl Deref for LayoutBatch<'_> {
    type Target = InteractionGraph;

    fn deref(&self) -> &Self::Target {
        self.graph
    }
}

impl DerefMut for LayoutBatch<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.graph
    }
}

impl Drop for LayoutBatch<'_> {
    fn drop(&mut self) {
        self.graph.enable_layout();
    }
}
