//! Intermediate representation for normalized SBOM documents.
//!
//! This module defines the canonical data structures every input format is
//! parsed into before merging. Both `CycloneDX` and SPDX documents are
//! normalized to a [`Document`] of packages and typed relationship edges;
//! merge, rewrite, and composition passes operate only on this
//! representation and never see format-specific wire types.

mod document;
mod identity;
mod metadata;

pub use document::*;
pub use identity::*;
pub use metadata::*;
