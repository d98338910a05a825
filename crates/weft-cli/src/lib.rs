//! CLI logic for the Weft edit runner.
//!
//! A run reads an interaction document, builds the interaction graph for its
//! lifelines, applies the scripted edits in order, brings the semantic model
//! in line with the edited graph and writes a report of the result.

pub mod error_adapter;

mod args;
mod config;
mod document;
mod error;
mod report;
mod session;

pub use args::{Args, Format};
pub use config::ConfigError;
pub use document::{Document, Edit};
pub use error::CliError;
pub use report::Report;
pub use session::{Handle, Session};

use std::fs;

use log::info;

/// Run the Weft CLI application
///
/// # Arguments
///
/// * `args` - Command-line arguments
///
/// # Errors
///
/// Returns `CliError` for:
/// - File I/O errors
/// - Configuration loading errors
/// - Invalid documents
/// - Unknown labels and refused edits
/// - Differences the model cannot apply
pub fn run(args: &Args) -> Result<(), CliError> {
    info!(
        input_path = args.input,
        output_path = args.output;
        "Processing interaction document"
    );

    let app_config = config::load_config(args.config.as_ref())?;

    let source = fs::read_to_string(&args.input)?;
    let document = Document::parse(&source)?;

    let mut session = Session::open(&document, app_config);
    session.run(&document.edits)?;
    let diffs = session.commit()?;

    let report = Report::new(&document.name, &session, &diffs);
    let output = match args.format {
        Format::Text => report.to_text(),
        Format::Toml => report.to_toml()?,
    };
    fs::write(&args.output, output)?;

    info!(output_file = args.output, differences = diffs.len(); "Report written");

    Ok(())
}
