//! Configuration types for interaction graph layout.
//!
//! This module provides the configuration structures that control how the
//! interaction grid is turned into pixel geometry and how far edits nudge
//! existing rows. All types implement [`serde::Deserialize`] so they can be
//! loaded from external sources; every field falls back to its default.
//!
//! # Overview
//!
//! - [`AppConfig`] - Top-level configuration root.
//! - [`LayoutConfig`] - Sizes, paddings and spacings used by the layout
//!   manager and the graph service.
//!
//! # Example
//!
//! ```
//! # use weft::config::AppConfig;
//! let config = AppConfig::default();
//! assert_eq!(config.layout().horizontal_threshold(), 5.0);
//! assert_eq!(config.layout().destruction_size(), 40.0);
//! ```

use serde::Deserialize;

use weft_core::geometry::Point;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Layout configuration section.
    #[serde(default)]
    layout: LayoutConfig,
}

impl AppConfig {
    /// Creates a new [`AppConfig`] with the given layout configuration.
    pub fn new(layout: LayoutConfig) -> Self {
        Self { layout }
    }

    /// Returns the layout configuration.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }
}

/// Geometry constants for the interaction grid.
///
/// Distances are in diagram pixels. The defaults reproduce the classic
/// sequence-diagram look: 100px wide lifelines, a 20px grid, 15px wide
/// execution bars and 40px destruction crosses.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    origin_x: f32,
    origin_y: f32,
    lifeline_width: f32,
    lifeline_header_height: f32,
    min_lifeline_height: f32,
    lifeline_bottom_padding: f32,
    column_padding: f32,
    row_spacing: f32,
    min_row_gap: f32,
    horizontal_threshold: f32,
    sync_offset: f32,
    self_sync_offset: f32,
    reply_offset: f32,
    execution_width: f32,
    execution_offset: f32,
    execution_min_height: f32,
    gate_size: f32,
    gate_margin: f32,
    destruction_size: f32,
    interaction_use_height: f32,
    fragment_padding: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 20.0,
            origin_y: 20.0,
            lifeline_width: 100.0,
            lifeline_header_height: 40.0,
            min_lifeline_height: 300.0,
            lifeline_bottom_padding: 40.0,
            column_padding: 20.0,
            row_spacing: 20.0,
            min_row_gap: 10.0,
            horizontal_threshold: 5.0,
            sync_offset: 40.0,
            self_sync_offset: 60.0,
            reply_offset: 40.0,
            execution_width: 15.0,
            execution_offset: 5.0,
            execution_min_height: 20.0,
            gate_size: 16.0,
            gate_margin: 30.0,
            destruction_size: 40.0,
            interaction_use_height: 40.0,
            fragment_padding: 10.0,
        }
    }
}

impl LayoutConfig {
    /// Top-left corner of the interaction's content area.
    pub fn origin(&self) -> Point {
        Point::new(self.origin_x, self.origin_y)
    }

    /// Width of a lifeline whose view has no bounds yet.
    pub fn lifeline_width(&self) -> f32 {
        self.lifeline_width
    }

    /// Height of the lifeline header box.
    pub fn lifeline_header_height(&self) -> f32 {
        self.lifeline_header_height
    }

    /// Minimum total height of a lifeline, header included.
    pub fn min_lifeline_height(&self) -> f32 {
        self.min_lifeline_height
    }

    /// Space kept below the last row on every non-destroyed lifeline.
    pub fn lifeline_bottom_padding(&self) -> f32 {
        self.lifeline_bottom_padding
    }

    /// Minimum horizontal gap between two neighbouring lifelines.
    pub fn column_padding(&self) -> f32 {
        self.column_padding
    }

    /// Vertical distance between a row without geometry and its predecessor.
    ///
    /// Also the grid spacing used to make room for new elements.
    pub fn row_spacing(&self) -> f32 {
        self.row_spacing
    }

    /// Smallest distance kept between two consecutive rows.
    ///
    /// Must exceed the horizontal threshold, otherwise two rows could merge
    /// on the next layout pass.
    pub fn min_row_gap(&self) -> f32 {
        self.min_row_gap
    }

    /// Maximum vertical distance at which two connected nodes share a row.
    pub fn horizontal_threshold(&self) -> f32 {
        self.horizontal_threshold
    }

    /// Room made for a new synchronous call and its reply.
    pub fn sync_offset(&self) -> f32 {
        self.sync_offset
    }

    /// Room made for a new synchronous self call and its reply.
    pub fn self_sync_offset(&self) -> f32 {
        self.self_sync_offset
    }

    /// Vertical distance between a synchronous call and its reply.
    pub fn reply_offset(&self) -> f32 {
        self.reply_offset
    }

    pub fn execution_width(&self) -> f32 {
        self.execution_width
    }

    /// Horizontal shift applied per level of nested execution.
    pub fn execution_offset(&self) -> f32 {
        self.execution_offset
    }

    pub fn execution_min_height(&self) -> f32 {
        self.execution_min_height
    }

    pub fn gate_size(&self) -> f32 {
        self.gate_size
    }

    /// Distance between the outermost lifelines and the formal gate columns.
    pub fn gate_margin(&self) -> f32 {
        self.gate_margin
    }

    pub fn destruction_size(&self) -> f32 {
        self.destruction_size
    }

    /// Height of a freshly inserted interaction use.
    pub fn interaction_use_height(&self) -> f32 {
        self.interaction_use_height
    }

    /// Horizontal padding added around a lifeline per nested fragment level.
    pub fn fragment_padding(&self) -> f32 {
        self.fragment_padding
    }

    /// Returns a copy with a different horizontal threshold.
    pub fn with_horizontal_threshold(mut self, threshold: f32) -> Self {
        self.horizontal_threshold = threshold;
        self
    }

    /// Returns a copy with a different row spacing.
    pub fn with_row_spacing(mut self, spacing: f32) -> Self {
        self.row_spacing = spacing;
        self
    }
}
