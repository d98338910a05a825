//! Weft - the interaction graph behind sequence diagram editing.
//!
//! A semantic interaction (lifelines, messages, occurrences, execution
//! specifications, interaction uses, combined fragments, gates) is turned into
//! an [`InteractionGraph`](graph::InteractionGraph): one global time order of
//! its events, a grid of rows and columns with pixel bounds, and a set of
//! precondition-checked structural edits. After editing, the graph reports the
//! changes the semantic model needs through
//! [`calculate_differences`](graph::InteractionGraph::calculate_differences).

pub mod config;
pub mod diff;
pub mod graph;
pub mod model;

mod builder;
mod error;
mod layout;
mod order;
mod service;

pub use weft_core::{geometry, identifier, semantic};

pub use error::{EditError, WeftError};
pub use service::{Anchor, ExecutionSide};

use log::{debug, info};

use builder::ModelWalker;
use config::AppConfig;
use graph::InteractionGraph;
use model::{SemanticModel, ViewGeometry};

/// Builds interaction graphs from a semantic model and its view.
///
/// # Examples
///
/// ```
/// use weft::{GraphBuilder, config::AppConfig, model::{Interaction, ViewLayout}};
/// use weft::{identifier::Id, semantic::MessageSort};
///
/// let mut model = Interaction::new(Id::new("doc_builder"));
/// let client = model.add_lifeline(Id::new("doc_builder_client"));
/// let server = model.add_lifeline(Id::new("doc_builder_server"));
/// model.add_message(MessageSort::Asynchronous, Some(client), Some(server));
///
/// let builder = GraphBuilder::new(AppConfig::default());
/// let graph = builder.build(&model, &ViewLayout::new());
///
/// assert_eq!(graph.lifelines().len(), 2);
/// assert_eq!(graph.rows().len(), 2, "header row and one message row");
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    config: AppConfig,
}

impl GraphBuilder {
    /// Create a new graph builder with the given configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration holding the layout constants
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Build and lay out the graph of `model`, seeding geometry from `view`.
    ///
    /// Dangling references in the model are skipped with a warning; building
    /// never fails.
    pub fn build<M, V>(&self, model: &M, view: &V) -> InteractionGraph
    where
        M: SemanticModel + ?Sized,
        V: ViewGeometry + ?Sized,
    {
        info!(interaction:% = model.interaction(); "Building interaction graph");
        let graph = ModelWalker::new(model, view, self.config.layout().clone()).build();
        debug!(
            rows = graph.rows().len(),
            columns = graph.columns().len();
            "Interaction graph ready"
        );
        graph
    }
}
