//! Collaborator interfaces consumed by the graph.
//!
//! The graph reads the semantic interaction through [`SemanticModel`] and the
//! initial geometry through [`ViewGeometry`]. Both come with in-memory
//! implementations, [`Interaction`] and [`ViewLayout`], used by the CLI and the
//! tests.

mod interaction;
mod view;

use weft_core::{
    geometry::Bounds,
    identifier::Id,
    semantic::{Element, ElementKind},
};

pub use interaction::Interaction;
pub use view::ViewLayout;

/// Read and create access to a semantic interaction.
///
/// New elements are created detached: they exist in the model and can be
/// edited through [`element_mut`](Self::element_mut), but no collection of the
/// interaction references them until the diff computed by the graph is applied.
pub trait SemanticModel {
    /// The interaction element itself.
    fn interaction(&self) -> Id;

    /// Lifelines in model order.
    fn lifelines(&self) -> &[Id];

    /// Messages in model order.
    fn messages(&self) -> &[Id];

    /// Top-level fragments (occurrences, executions, interaction uses and
    /// combined fragments) in time order.
    fn fragments(&self) -> &[Id];

    /// Formal gates of the interaction.
    fn formal_gates(&self) -> &[Id];

    fn element(&self, id: Id) -> Option<&Element>;

    fn element_mut(&mut self, id: Id) -> Option<&mut Element>;

    /// Creates a detached element of `kind` owned by `owner` and returns its id.
    fn create_element(&mut self, kind: ElementKind, owner: Id) -> Id;
}

/// Snapping grid of a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSettings {
    spacing: f32,
    snap: bool,
}

impl GridSettings {
    pub fn new(spacing: f32, snap: bool) -> Self {
        Self { spacing, snap }
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    pub fn is_snapping(&self) -> bool {
        self.snap
    }

    /// Rounds `value` to the nearest grid line when snapping is on.
    pub fn snap(&self, value: f32) -> f32 {
        if self.snap && self.spacing > 0.0 {
            (value / self.spacing).round() * self.spacing
        } else {
            value
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self::new(20.0, false)
    }
}

/// Geometry of the shapes currently drawn for an interaction.
pub trait ViewGeometry {
    /// Absolute bounds of the shape drawn for `element`.
    fn bounds(&self, element: Id) -> Option<Bounds>;

    /// The element whose shape visually contains the shape of `element`.
    fn container(&self, element: Id) -> Option<Id>;

    fn grid(&self) -> GridSettings;
}
