use std::collections::HashMap;

use weft_core::{geometry::Bounds, identifier::Id};

use super::{GridSettings, ViewGeometry};
use crate::graph::InteractionGraph;

/// In-memory [`ViewGeometry`]: a bounds table keyed by element.
#[derive(Debug, Clone, Default)]
pub struct ViewLayout {
    bounds: HashMap<Id, Bounds>,
    containers: HashMap<Id, Id>,
    grid: GridSettings,
}

impl ViewLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, grid: GridSettings) -> Self {
        self.grid = grid;
        self
    }

    pub fn insert(&mut self, element: Id, bounds: Bounds) {
        self.bounds.insert(element, bounds);
    }

    pub fn set_container(&mut self, element: Id, container: Id) {
        self.containers.insert(element, container);
    }

    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Captures the laid-out bounds of every element node and message of
    /// `graph`, recording each node's enclosing element as its container.
    pub fn capture(graph: &InteractionGraph) -> Self {
        let mut view = Self::new();
        let nodes = std::iter::once(graph.root())
            .chain(graph.lifelines().iter().flat_map(|l| graph.descendants(*l)))
            .chain(graph.fragments())
            .chain(
                std::iter::once(graph.root())
                    .chain(graph.fragments())
                    .filter_map(|fragment| graph.parts(fragment))
                    .flat_map(|parts| parts.gates().collect::<Vec<_>>()),
            )
            .collect::<Vec<_>>();

        for node in nodes {
            let Some(element) = graph.node(node).and_then(|node| node.element()) else {
                continue;
            };
            if let Some(bounds) = graph.bounds(node) {
                view.insert(element, bounds);
            }
            let container = graph
                .ancestors(node)
                .find_map(|ancestor| graph.node(ancestor).and_then(|node| node.element()));
            if let Some(container) = container {
                view.set_container(element, container);
            }
        }
        for link in graph.links() {
            let Some(link) = graph.link(link) else {
                continue;
            };
            if let (Some(element), Some(bounds)) = (link.element(), link.bounds()) {
                view.insert(element, bounds);
            }
        }
        view
    }
}

impl ViewGeometry for ViewLayout {
    fn bounds(&self, element: Id) -> Option<Bounds> {
        self.bounds.get(&element).copied()
    }

    fn container(&self, element: Id) -> Option<Id> {
        self.containers.get(&element).copied()
    }

    fn grid(&self) -> GridSettings {
        self.grid
    }
}
