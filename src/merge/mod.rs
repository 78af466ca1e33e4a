//! The merge and contextualization engine.
//!
//! This module turns N parsed SBOM documents into one consistent document:
//! a deduplicated package union, a referentially valid edge union, and a
//! contextualized lineage chain connecting the component image to the
//! parent images it was built from.
//!
//! # Architecture
//!
//! The engine is a fixed sequence of pure passes over value-typed
//! documents:
//!
//! - [`rewrite`]: per-document rule passes (legacy lineage translation,
//!   builder-record pruning), each returning a fresh document plus a
//!   record of what fired
//! - [`GlobalIdAllocator`]: canonical identity to global id, first-seen
//!   order, with forced aliases for self-reference disambiguation
//! - remap: local ids to global ids, DESCRIBES stripped, dangling edges
//!   dropped and reported
//! - [`merge`]: the assembler, producing a [`MergeOutcome`]
//! - [`compose_index`]: the multi-arch specialization with a synthetic
//!   manifest-list root
//!
//! # Example
//!
//! ```ignore
//! use sbom_merge::merge::{merge, RootSelector};
//!
//! let outcome = merge(&documents, &RootSelector::FirstDocument)?;
//! for warning in &outcome.diagnostics.warnings {
//!     eprintln!("{warning}");
//! }
//! let merged = outcome.document;
//! ```

mod allocator;
mod assemble;
mod diagnostics;
mod index;
mod remap;
pub mod rewrite;

pub use allocator::{global_id, GlobalIdAllocator};
pub use assemble::{merge, MergeOutcome, RootSelector};
pub use diagnostics::{MergeDiagnostics, MergeWarning};
pub use index::{compose_index, normalize_architecture, IndexDescriptor, IndexEntry};
pub use remap::{remap_document, remap_document_for_index, RemappedDocument};
pub use rewrite::{AppliedRule, RewriteRule};
