//! Input loading for the CLI pipeline.
//!
//! Reads, detects, and parses the input files with a data-parallel map
//! before the single-threaded merge begins. Output order equals input
//! order; that order is the merge contract (first document is the
//! component, later documents are its parents in base-image order).

use crate::error::{Result, SbomMergeError};
use crate::model::{Document, SourceLabel};
use crate::parsers;
use std::path::{Path, PathBuf};

/// Read and parse every input file.
///
/// The first failure wins; already-parsed siblings are discarded.
pub fn load_documents(paths: &[PathBuf]) -> Result<Vec<Document>> {
    use rayon::prelude::*;

    paths
        .par_iter()
        .enumerate()
        .map(|(position, path)| load_document(position, path))
        .collect()
}

/// Read and parse one input file at the given merge position.
pub fn load_document(position: usize, path: &Path) -> Result<Document> {
    tracing::debug!(path = %path.display(), position, "loading input document");
    let content = std::fs::read_to_string(path).map_err(|e| SbomMergeError::io(path, e))?;
    let source = SourceLabel::new(position, source_label_for(path));
    parsers::parse_document(&content, source)
}

/// Label for diagnostics: the file name, or the whole path if there is none.
fn source_label_for(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}
