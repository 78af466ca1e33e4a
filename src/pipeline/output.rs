//! Output handling for merged documents.

use crate::error::{Result, SbomMergeError};
use crate::model::{Document, SbomFormat};
use crate::parsers;
use std::path::PathBuf;

/// Target for output, either stdout or a file
#[derive(Debug, Clone)]
pub enum OutputTarget {
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    /// Create output target from an optional path
    #[must_use]
    pub fn from_option(path: Option<PathBuf>) -> Self {
        match path {
            Some(p) => OutputTarget::File(p),
            None => OutputTarget::Stdout,
        }
    }
}

/// Serialize the document in the requested family and write it out.
pub fn write_document(
    document: &Document,
    format: SbomFormat,
    target: &OutputTarget,
) -> Result<()> {
    let content = parsers::serialize_document(document, format)?;
    write_output(&content, target)
}

/// Write already-rendered content to the target.
pub fn write_output(content: &str, target: &OutputTarget) -> Result<()> {
    match target {
        OutputTarget::Stdout => {
            println!("{content}");
            Ok(())
        }
        OutputTarget::File(path) => {
            std::fs::write(path, content).map_err(|e| SbomMergeError::io(path.clone(), e))?;
            tracing::info!(path = %path.display(), "document written");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocumentMetadata, Package, Relationship, SourceLabel};

    #[test]
    fn test_output_target_from_option_none() {
        let target = OutputTarget::from_option(None);
        assert!(matches!(target, OutputTarget::Stdout));
    }

    #[test]
    fn test_output_target_from_option_some() {
        let path = PathBuf::from("/tmp/test.json");
        let target = OutputTarget::from_option(Some(path.clone()));
        match target {
            OutputTarget::File(p) => assert_eq!(p, path),
            OutputTarget::Stdout => panic!("Expected File variant"),
        }
    }

    #[test]
    fn test_write_document_to_file() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("merged.spdx.json");

        let mut document = Document::new(
            DocumentMetadata::new(SbomFormat::Spdx, "2.3"),
            SourceLabel::new(0, "(merged)"),
        );
        document.add_package(Package::new("SPDXRef-app", "app"));
        document.add_relationship(Relationship::describes("SPDXRef-app"));

        write_document(&document, SbomFormat::Spdx, &OutputTarget::File(path.clone()))
            .expect("write");

        let written = std::fs::read_to_string(&path).expect("read back");
        assert!(written.contains("SPDX-2.3"));
        assert!(written.contains("SPDXRef-app"));
    }

    #[test]
    fn test_write_to_unwritable_path_is_io_error() {
        let err = write_output("content", &OutputTarget::File(PathBuf::from("/nonexistent/out.json")))
            .expect_err("must fail");
        assert!(matches!(err, SbomMergeError::Io { .. }));
    }
}
