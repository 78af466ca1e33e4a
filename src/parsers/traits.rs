//! Codec trait definitions and parse error types.
//!
//! Each SBOM family implements [`SbomCodec`]: shape-based detection with a
//! confidence score, parsing into the normalized [`Document`] graph, and
//! serialization of a merged graph back to the family's JSON wire form.

use crate::error::{MalformedKind, SbomMergeError, SerializeErrorKind};
use crate::model::{Document, SbomFormat, SourceLabel};
use thiserror::Error;

/// Errors from format-specific parsing and serialization.
///
/// These are label-free; the pipeline attaches the offending document's
/// [`SourceLabel`] via [`ParseError::into_merge_error`].
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON parse error: {0}")]
    JsonError(String),

    #[error("Invalid SBOM structure: {0}")]
    InvalidStructure(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unsupported {family} version {version} (supported: {supported})")]
    UnsupportedVersion {
        family: String,
        version: String,
        supported: String,
    },

    #[error("Unsupported {family} encoding: {encoding} (only JSON is handled)")]
    UnsupportedEncoding { family: String, encoding: String },

    #[error("Unknown SBOM format: {0}")]
    UnknownFormat(String),

    #[error("Cannot express document as {family}: {reason}")]
    Unrepresentable { family: String, reason: String },
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl ParseError {
    /// Attach the source document's label, producing the crate-level error.
    #[must_use]
    pub fn into_merge_error(self, source: &SourceLabel) -> SbomMergeError {
        let label = source.to_string();
        match self {
            Self::JsonError(message) => {
                SbomMergeError::malformed(label, MalformedKind::InvalidJson(message))
            }
            Self::InvalidStructure(message) => SbomMergeError::malformed(
                label,
                MalformedKind::InvalidValue {
                    field: "document".to_string(),
                    message,
                },
            ),
            Self::MissingField(field) => SbomMergeError::missing_field(label, field, "document"),
            Self::UnsupportedVersion {
                family,
                version,
                supported,
            } => SbomMergeError::unsupported_format(label, family, version, supported),
            Self::UnsupportedEncoding { family, encoding } => {
                SbomMergeError::unsupported_format(label, family, encoding, "JSON")
            }
            Self::UnknownFormat(_) => SbomMergeError::unknown_format(label),
            Self::Unrepresentable { family, reason } => SbomMergeError::serialize(
                label,
                SerializeErrorKind::Unrepresentable { family, reason },
            ),
        }
    }
}

/// Confidence level for format detection
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FormatConfidence(f32);

impl FormatConfidence {
    /// No confidence - definitely not this format
    pub const NONE: Self = Self(0.0);
    /// Low confidence - might be this format
    pub const LOW: Self = Self(0.25);
    /// Medium confidence - likely this format
    pub const MEDIUM: Self = Self(0.5);
    /// High confidence - almost certainly this format
    pub const HIGH: Self = Self(0.75);
    /// Certain - definitely this format
    pub const CERTAIN: Self = Self(1.0);

    /// Get the confidence value
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.0
    }

    /// Check if this confidence indicates the format can be parsed
    #[must_use]
    pub fn can_parse(&self) -> bool {
        self.0 >= super::detection::MIN_CONFIDENCE_THRESHOLD
    }
}

impl Default for FormatConfidence {
    fn default() -> Self {
        Self::NONE
    }
}

/// Detection result from a codec
#[derive(Debug, Clone, Default)]
pub struct FormatDetection {
    /// Confidence that this codec can handle the content
    pub confidence: FormatConfidence,
    /// Detected encoding variant ("JSON", "XML", "tag-value")
    pub variant: Option<String>,
    /// Detected spec version if applicable
    pub version: Option<String>,
    /// Any issues detected that might affect parsing
    pub warnings: Vec<String>,
}

impl FormatDetection {
    /// Create a detection result indicating no match
    #[must_use]
    pub fn no_match() -> Self {
        Self::default()
    }

    /// Create a detection result with confidence
    #[must_use]
    pub fn with_confidence(confidence: FormatConfidence) -> Self {
        Self {
            confidence,
            ..Self::default()
        }
    }

    /// Set the detected variant
    #[must_use]
    pub fn variant(mut self, variant: &str) -> Self {
        self.variant = Some(variant.to_string());
        self
    }

    /// Set the detected version
    #[must_use]
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Add a warning
    #[must_use]
    pub fn warning(mut self, warning: &str) -> Self {
        self.warnings.push(warning.to_string());
        self
    }
}

/// Trait for SBOM family codecs.
///
/// Implementors provide shape-based detection via `detect()`, parsing via
/// `parse_str()`, and the inverse `serialize()`. Detection allows format
/// selection without trial-and-error parsing; it never looks at filenames.
pub trait SbomCodec {
    /// The family this codec handles
    fn format(&self) -> SbomFormat;

    /// Parse SBOM content into the normalized graph.
    ///
    /// The [`SourceLabel`] identifies this input's position in the merge
    /// order and flows into every diagnostic derived from the document.
    fn parse_str(&self, content: &str, source: SourceLabel) -> Result<Document, ParseError>;

    /// Serialize a normalized graph into this family's JSON form
    fn serialize(&self, document: &Document) -> Result<String, ParseError>;

    /// Detect whether this codec can handle the given content.
    ///
    /// Lightweight structural checks only, no full parse.
    fn detect(&self, content: &str) -> FormatDetection;

    /// Quick check if this codec can likely handle the content
    fn can_parse(&self, content: &str) -> bool {
        self.detect(content).confidence.can_parse()
    }

    /// Confidence score for parsing this content
    fn confidence(&self, content: &str) -> FormatConfidence {
        self.detect(content).confidence
    }
}

/// Scan raw JSON text for a top-level-ish string field without parsing.
///
/// Good enough for detection heuristics; the full parse re-reads the field
/// properly.
pub(crate) fn scan_json_string_field(content: &str, field: &str) -> Option<String> {
    let needle = format!("\"{field}\"");
    let idx = content.find(&needle)?;
    let after = &content[idx + needle.len()..];
    let colon = after.find(':')?;
    let value_part = &after[colon + 1..];
    let quote_start = value_part.find('"')?;
    let after_quote = &value_part[quote_start + 1..];
    let quote_end = after_quote.find('"')?;
    Some(after_quote[..quote_end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_thresholds() {
        assert!(!FormatConfidence::NONE.can_parse());
        assert!(FormatConfidence::LOW.can_parse());
        assert!(FormatConfidence::CERTAIN.can_parse());
        assert!(FormatConfidence::HIGH > FormatConfidence::MEDIUM);
    }

    #[test]
    fn test_scan_json_string_field() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5"}"#;
        assert_eq!(
            scan_json_string_field(content, "specVersion").as_deref(),
            Some("1.5")
        );
        assert_eq!(scan_json_string_field(content, "spdxVersion"), None);
    }

    #[test]
    fn test_parse_error_picks_up_source_label() {
        let source = SourceLabel::new(1, "parent.json");
        let err = ParseError::UnsupportedVersion {
            family: "SPDX".to_string(),
            version: "SPDX-3.0".to_string(),
            supported: "2.2, 2.3".to_string(),
        }
        .into_merge_error(&source);

        let display = err.to_string();
        assert!(display.contains("document #2 (parent.json)"));
        assert!(display.contains("SPDX-3.0"));
    }

    #[test]
    fn test_unknown_format_maps_to_malformed() {
        let source = SourceLabel::new(0, "mystery.bin");
        let err = ParseError::UnknownFormat("no markers".to_string()).into_merge_error(&source);
        assert!(matches!(err, SbomMergeError::MalformedInput { .. }));
    }
}
