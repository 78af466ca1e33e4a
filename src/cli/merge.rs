//! Merge command handler.
//!
//! Implements the `merge` subcommand: ordered contextual merge of a
//! component document with its parent documents.

use crate::error::Result;
use crate::merge::{merge, RootSelector};
use crate::model::SbomFormat;
use crate::pipeline::{load_documents, write_document, OutputTarget};
use std::path::PathBuf;

/// Configuration for the merge command
#[derive(Debug)]
pub struct MergeConfig {
    /// Input paths in merge order; the first is the component document
    pub inputs: Vec<PathBuf>,
    /// Output path, stdout when absent
    pub output: Option<PathBuf>,
    /// Output family, defaulting to the family of the inputs
    pub format: Option<SbomFormat>,
    /// Root document selection by source label instead of first-document
    pub root_label: Option<String>,
}

/// Run the merge command.
pub fn run_merge(config: MergeConfig) -> Result<()> {
    let documents = load_documents(&config.inputs)?;

    let selector = match config.root_label {
        Some(label) => RootSelector::Label(label),
        None => RootSelector::FirstDocument,
    };
    let outcome = merge(&documents, &selector)?;

    let format = config.format.unwrap_or(outcome.document.metadata.format);
    let target = OutputTarget::from_option(config.output);
    write_document(&outcome.document, format, &target)
}
