//! Metadata structures for SBOM documents: format family, creation info,
//! source labels, and relationship typing.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// SBOM format family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum SbomFormat {
    #[value(name = "cyclonedx")]
    CycloneDx,
    #[value(name = "spdx")]
    Spdx,
}

impl SbomFormat {
    /// Spec versions the codecs handle for this family
    #[must_use]
    pub const fn supported_versions(self) -> &'static str {
        match self {
            Self::CycloneDx => "1.4, 1.5, 1.6",
            Self::Spdx => "2.2, 2.3",
        }
    }
}

impl std::fmt::Display for SbomFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CycloneDx => write!(f, "CycloneDX"),
            Self::Spdx => write!(f, "SPDX"),
        }
    }
}

/// Identifies one input document by its position in the caller-supplied
/// order plus a human-readable label (usually the file name). Fatal errors
/// and diagnostics carry this so the caller can map failures back to the
/// CI step that produced the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLabel {
    /// Zero-based position in the merge input order
    pub position: usize,
    /// Human-readable label
    pub label: String,
}

impl SourceLabel {
    #[must_use]
    pub fn new(position: usize, label: impl Into<String>) -> Self {
        Self {
            position,
            label: label.into(),
        }
    }
}

impl std::fmt::Display for SourceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "document #{} ({})", self.position + 1, self.label)
    }
}

/// Document-level metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// SBOM format family
    pub format: SbomFormat,
    /// Spec version as declared by the document ("2.3", "1.5", ...)
    pub spec_version: String,
    /// Document name
    pub name: Option<String>,
    /// Document namespace (SPDX) or serial number (CycloneDX)
    pub namespace: Option<String>,
    /// Data license (SPDX; carried through verbatim)
    pub data_license: Option<String>,
    /// Creation timestamp
    pub created: Option<DateTime<Utc>>,
    /// Tools that produced the document
    pub tools: Vec<Tool>,
}

impl DocumentMetadata {
    /// Minimal metadata for a freshly assembled document
    #[must_use]
    pub fn new(format: SbomFormat, spec_version: impl Into<String>) -> Self {
        Self {
            format,
            spec_version: spec_version.into(),
            name: None,
            namespace: None,
            data_license: None,
            created: None,
            tools: Vec::new(),
        }
    }
}

/// A tool recorded in the document's creation info.
///
/// SPDX spells these as `Tool: name-version` creator strings; CycloneDX
/// uses `metadata.tools` in either the 1.4 list shape or the 1.5+ object
/// shape. Both normalize to this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    pub version: Option<String>,
}

impl Tool {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse an SPDX creator string. Only `Tool:` creators produce a value;
    /// `Person:`/`Organization:` creators are not tools.
    #[must_use]
    pub fn from_spdx_creator(creator: &str) -> Option<Self> {
        let rest = creator.strip_prefix("Tool:")?.trim();
        if rest.is_empty() {
            return None;
        }
        // The conventional spelling is name-version with the version after
        // the last hyphen; a trailing hyphen means no version.
        match rest.rsplit_once('-') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Some(Self::new(name, Some(version.to_string())))
            }
            _ => Some(Self::new(rest, None)),
        }
    }

    /// Render back to the SPDX creator spelling
    #[must_use]
    pub fn to_spdx_creator(&self) -> String {
        match &self.version {
            Some(version) => format!("Tool: {}-{}", self.name, version),
            None => format!("Tool: {}", self.name),
        }
    }
}

/// Relationship type between two SBOM nodes.
///
/// The engine interprets the lineage types and passes everything else
/// through unchanged as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// Structural containment (image contains RPM, index contains image)
    Contains,
    /// Image lineage: built from
    DescendantOf,
    /// Legacy "was used to build" marker, superseded by `DescendantOf`
    /// when the related node is a base image
    BuildToolOf,
    /// Document-root pointer
    Describes,
    /// CycloneDX dependency graph edge
    DependsOn,
    /// Pass-through for anything else
    Other(String),
}

impl RelationshipType {
    /// Parse the SPDX relationshipType spelling
    #[must_use]
    pub fn from_spdx(value: &str) -> Self {
        match value {
            "CONTAINS" => Self::Contains,
            "DESCENDANT_OF" => Self::DescendantOf,
            "BUILD_TOOL_OF" => Self::BuildToolOf,
            "DESCRIBES" => Self::Describes,
            "DEPENDS_ON" => Self::DependsOn,
            other => Self::Other(other.to_string()),
        }
    }

    /// The SPDX relationshipType spelling
    #[must_use]
    pub fn as_spdx(&self) -> &str {
        match self {
            Self::Contains => "CONTAINS",
            Self::DescendantOf => "DESCENDANT_OF",
            Self::BuildToolOf => "BUILD_TOOL_OF",
            Self::Describes => "DESCRIBES",
            Self::DependsOn => "DEPENDS_ON",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_spdx())
    }
}

/// Cryptographic checksum carried through from the source document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    /// Algorithm spelling as the source document had it ("SHA256", ...)
    pub algorithm: String,
    /// Hex-encoded value
    pub value: String,
}

impl Checksum {
    #[must_use]
    pub fn new(algorithm: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            value: value.into(),
        }
    }
}

/// External reference carried through from the source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalRef {
    /// SPDX referenceCategory; absent for CycloneDX references
    pub category: Option<String>,
    /// Reference type ("purl", "vcs", ...)
    pub ref_type: String,
    /// URL or locator
    pub locator: String,
}

impl ExternalRef {
    #[must_use]
    pub fn new(
        category: Option<String>,
        ref_type: impl Into<String>,
        locator: impl Into<String>,
    ) -> Self {
        Self {
            category,
            ref_type: ref_type.into(),
            locator: locator.into(),
        }
    }

    /// Case-insensitive dedup key over (category, type, locator)
    #[must_use]
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.category.as_deref().unwrap_or("").to_lowercase(),
            self.ref_type.to_lowercase(),
            self.locator.to_lowercase(),
        )
    }

    /// Whether this reference carries a package URL
    #[must_use]
    pub fn is_purl(&self) -> bool {
        self.ref_type.eq_ignore_ascii_case("purl") || self.locator.starts_with("pkg:")
    }
}
