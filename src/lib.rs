//! **SBOM graph merge and contextualization for container builds.**
//!
//! `sbom-merge` takes the SBOM documents a container build produces along
//! the way (one per build stage, per parent image, per architecture) and
//! merges them into a single consistent document. It supports **CycloneDX**
//! 1.x JSON and **SPDX** 2.x JSON in both directions, with automatic
//! per-document format detection.
//!
//! ## Key Features
//!
//! - **Contextual merge**: unions package graphs from N documents,
//!   deduplicates packages by canonical identity (purl-first), and keeps
//!   every relationship edge referentially valid.
//! - **Lineage contextualization**: connects the component image to the
//!   parent images it was built from with `DESCENDANT_OF` edges,
//!   translating the legacy `BUILD_TOOL_OF` base-image shape and pruning
//!   builder-stage records that did not end up in the final image.
//! - **Multi-arch index composition**: merges per-architecture documents
//!   under a synthetic manifest-list root, tagging each package with the
//!   architectures it was observed in.
//! - **Format detection**: confidence-scored detection routes each input
//!   to the right codec and rejects encodings (XML, tag-value) and spec
//!   versions outside the supported window with precise errors.
//!
//! ## Core Concepts & Modules
//!
//! - **[`model`]**: the normalized representation. Every input parses into
//!   a [`Document`] of packages and typed relationship edges; the engine
//!   never operates on format-specific wire types.
//! - **[`parsers`]**: codecs for both families plus detection. Each codec
//!   parses and serializes, so any parsed document can be written back out
//!   in either family.
//! - **[`merge`]**: the engine. [`merge()`](merge::merge) for the ordered
//!   contextual merge, [`compose_index`](merge::compose_index) for
//!   multi-arch composition, both returning the merged [`Document`] plus
//!   diagnostics describing every rewrite and recovered condition.
//! - **[`pipeline`]**: parallel input loading and output writing for the
//!   CLI shell.
//!
//! ## Getting Started: Merging Documents
//!
//! ```no_run
//! use sbom_merge::merge::{merge, RootSelector};
//! use sbom_merge::pipeline::load_documents;
//! use std::path::PathBuf;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Order matters: the first document is the component, later
//!     // documents are its parents in base-image order.
//!     let documents = load_documents(&[
//!         PathBuf::from("component.spdx.json"),
//!         PathBuf::from("parent.spdx.json"),
//!     ])?;
//!
//!     let outcome = merge(&documents, &RootSelector::FirstDocument)?;
//!     for warning in &outcome.diagnostics.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!
//!     println!(
//!         "merged {} packages, {} relationships",
//!         outcome.document.package_count(),
//!         outcome.document.relationship_count()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Command-Line Interface (CLI)
//!
//! This documentation is for the library crate. The `sbom-merge` binary
//! wraps it with `merge`, `index`, and `inspect` subcommands; see
//! `sbom-merge --help`.

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
// Pedantic lints: allow categories that are design choices for this codebase
#![allow(
    // Doc completeness: # Errors / # Panics sections are not maintained per-fn
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    // MergeOutcome, MergeDiagnostics etc. read better with the prefix
    clippy::module_name_repetitions,
    // from/to and old/new pairs are clear in graph-rewrite context
    clippy::similar_names
)]

pub mod cli;
pub mod error;
pub mod merge;
pub mod model;
pub mod parsers;
pub mod pipeline;
pub mod utils;

// Re-export main types for convenience
pub use error::{ErrorContext, OptionContext, Result, SbomMergeError};
pub use merge::{
    compose_index, IndexDescriptor, IndexEntry, MergeDiagnostics, MergeOutcome, MergeWarning,
    RootSelector,
};
pub use model::{
    CanonicalIdentity, Document, DocumentMetadata, IdentityResolver, Package, Relationship,
    RelationshipType, SbomFormat, SourceLabel,
};
pub use parsers::{detect_format, parse_document, serialize_document, FormatDetector, SbomCodec};
