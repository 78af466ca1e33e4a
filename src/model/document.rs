//! Core document graph structures.
//!
//! A [`Document`] is one parsed SBOM: packages keyed by their local
//! identifier, typed relationships between node references, and document
//! metadata. Local identifiers are unique only within their source
//! document; the merge pipeline translates them to global identifiers
//! before any union.

use super::{Checksum, DocumentMetadata, ExternalRef, RelationshipType, SourceLabel};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use xxhash_rust::xxh3::xxh3_64;

/// Marker key flagging a package as the base image a build started from
pub const BASE_IMAGE_MARKER: &str = "konflux:container:is_base_image";

/// Marker key flagging a package as a builder image; the value is the
/// build stage index
pub const BUILDER_IMAGE_MARKER: &str = "konflux:container:is_builder_image:for_stage";

/// Marker key tagging a package with the architectures it was observed in
pub const ARCHITECTURE_MARKER: &str = "konflux:container:architecture";

/// Annotator string for JSON-encoded SPDX marker annotations
pub const MARKER_ANNOTATOR: &str = "Tool: konflux:jsonencoded";

/// One parsed SBOM document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Document-level metadata
    pub metadata: DocumentMetadata,
    /// Packages indexed by local identifier (insertion order preserved)
    pub packages: IndexMap<String, Package>,
    /// Typed relationship edges
    pub relationships: Vec<Relationship>,
    /// Which merge input this document came from
    pub source: SourceLabel,
}

impl Document {
    /// Create an empty document
    #[must_use]
    pub fn new(metadata: DocumentMetadata, source: SourceLabel) -> Self {
        Self {
            metadata,
            packages: IndexMap::new(),
            relationships: Vec::new(),
            source,
        }
    }

    /// Add a package.
    ///
    /// Returns `true` if a package with the same local identifier was
    /// already present and has been overwritten. Duplicate local ids in a
    /// single document indicate a malformed generator and are logged.
    pub fn add_package(&mut self, package: Package) -> bool {
        let id = package.local_id.clone();
        let collided = self.packages.insert(id.clone(), package).is_some();
        if collided {
            tracing::warn!(local_id = %id, source = %self.source, "duplicate local identifier, keeping the later entry");
        }
        collided
    }

    /// Add a relationship edge
    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    /// Local identifier of the package this document describes.
    ///
    /// Resolved from the first DESCRIBES edge; parsers normalize
    /// family-specific root pointers (`documentDescribes`,
    /// `metadata.component`) into such an edge.
    #[must_use]
    pub fn describes_target(&self) -> Option<&str> {
        self.relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::Describes)
            .and_then(|r| r.to.package_id())
    }

    /// The root package, if the describes pointer resolves
    #[must_use]
    pub fn root_package(&self) -> Option<&Package> {
        self.describes_target().and_then(|id| self.packages.get(id))
    }

    /// Whether any edge of the given type exists
    #[must_use]
    pub fn has_relationship_of_type(&self, rel_type: &RelationshipType) -> bool {
        self.relationships.iter().any(|r| &r.rel_type == rel_type)
    }

    /// Edges whose subject is the given package
    #[must_use]
    pub fn relationships_from(&self, local_id: &str) -> Vec<&Relationship> {
        self.relationships
            .iter()
            .filter(|r| r.from.package_id() == Some(local_id))
            .collect()
    }

    /// Content hash over the package set and edge set, independent of
    /// package insertion order. Used for cheap equality checks in tests
    /// and idempotence assertions.
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        let mut hasher_input = Vec::new();

        let mut ids: Vec<_> = self.packages.keys().collect();
        ids.sort();
        for id in ids {
            hasher_input.extend(id.as_bytes());
            if let Some(package) = self.packages.get(id) {
                hasher_input.extend(package.name.as_bytes());
                if let Some(version) = &package.version {
                    hasher_input.extend(version.as_bytes());
                }
            }
        }

        let mut edge_keys: Vec<_> = self.relationships.iter().map(Relationship::key).collect();
        edge_keys.sort();
        for (from, rel, to) in edge_keys {
            hasher_input.extend(from.as_bytes());
            hasher_input.extend(rel.as_bytes());
            hasher_input.extend(to.as_bytes());
        }

        xxh3_64(&hasher_input)
    }

    /// Package count
    #[must_use]
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    /// Relationship count
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }
}

/// Reference to one endpoint of a relationship: either a package in the
/// document's local namespace, or the document pseudo-node itself (the
/// subject of DESCRIBES edges).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    /// The document pseudo-node
    Document,
    /// A package, by local (pre-merge) or global (post-merge) identifier
    Package(String),
}

impl NodeRef {
    /// Package identifier, if this endpoint is a package
    #[must_use]
    pub fn package_id(&self) -> Option<&str> {
        match self {
            Self::Document => None,
            Self::Package(id) => Some(id),
        }
    }

    /// Stable text used in hashes and diagnostics
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Document => "(document)",
            Self::Package(id) => id,
        }
    }
}

impl std::fmt::Display for NodeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed edge between two node references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from: NodeRef,
    pub rel_type: RelationshipType,
    pub to: NodeRef,
}

impl Relationship {
    #[must_use]
    pub fn new(from: NodeRef, rel_type: RelationshipType, to: NodeRef) -> Self {
        Self { from, rel_type, to }
    }

    /// Edge between two packages
    #[must_use]
    pub fn between(from: impl Into<String>, rel_type: RelationshipType, to: impl Into<String>) -> Self {
        Self::new(
            NodeRef::Package(from.into()),
            rel_type,
            NodeRef::Package(to.into()),
        )
    }

    /// DESCRIBES edge from the document pseudo-node to the root package
    #[must_use]
    pub fn describes(root: impl Into<String>) -> Self {
        Self::new(
            NodeRef::Document,
            RelationshipType::Describes,
            NodeRef::Package(root.into()),
        )
    }

    /// Dedup/sort key
    #[must_use]
    pub fn key(&self) -> (String, String, String) {
        (
            self.from.as_str().to_string(),
            self.rel_type.to_string(),
            self.to.as_str().to_string(),
        )
    }
}

/// One package node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    /// Identifier unique within the source document only
    pub local_id: String,
    /// Display name
    pub name: String,
    /// Version, if declared
    pub version: Option<String>,
    /// Package URL, if declared
    pub purl: Option<String>,
    /// Type string ("container", "library", ...), family spelling
    pub package_type: Option<String>,
    /// Supplier/originator text
    pub supplier: Option<String>,
    /// Download location (SPDX)
    pub download_location: Option<String>,
    /// License strings, carried through verbatim
    pub license_concluded: Option<String>,
    pub license_declared: Option<String>,
    /// Checksums
    pub checksums: Vec<Checksum>,
    /// External references (minus the purl, which is lifted into `purl`)
    pub external_refs: Vec<ExternalRef>,
    /// Out-of-band markers (key -> value), e.g. the base-image flag
    pub annotations: IndexMap<String, String>,
    /// Architectures this package was observed in (filled by the index
    /// composer; empty for single-arch merges)
    pub architectures: BTreeSet<String>,
}

impl Package {
    /// Create a package with just an identifier and a name
    #[must_use]
    pub fn new(local_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            name: name.into(),
            version: None,
            purl: None,
            package_type: None,
            supplier: None,
            download_location: None,
            license_concluded: None,
            license_declared: None,
            checksums: Vec::new(),
            external_refs: Vec::new(),
            annotations: IndexMap::new(),
            architectures: BTreeSet::new(),
        }
    }

    /// Look up a marker value
    #[must_use]
    pub fn marker(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }

    /// Set a marker
    pub fn set_marker(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.annotations.insert(key.into(), value.into());
    }

    /// Whether this package carries the base-image marker
    #[must_use]
    pub fn is_base_image(&self) -> bool {
        self.marker(BASE_IMAGE_MARKER) == Some("true")
    }

    /// Whether this package carries a builder-image marker
    #[must_use]
    pub fn is_builder_image(&self) -> bool {
        self.annotations
            .keys()
            .any(|k| k.starts_with(BUILDER_IMAGE_MARKER))
    }
}
