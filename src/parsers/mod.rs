//! SBOM format codecs.
//!
//! This module provides codecs for the CycloneDX and SPDX families,
//! converting between their JSON wire forms and the normalized graph
//! representation.
//!
//! ## Format Detection
//!
//! A confidence-based detection system identifies formats from content:
//! - Each codec reports a confidence score (0.0-1.0) for handling content
//! - The codec with the highest confidence is selected
//! - Detection includes the encoding variant (JSON, XML, tag-value) and
//!   version information, so unsupported encodings fail with a precise
//!   error rather than a JSON parse failure

mod cyclonedx;
mod detection;
mod spdx;
mod traits;

pub use cyclonedx::CycloneDxCodec;
pub use detection::{DetectionResult, FormatDetector, MIN_CONFIDENCE_THRESHOLD};
pub use spdx::SpdxCodec;
pub use traits::{FormatConfidence, FormatDetection, ParseError, SbomCodec};

use crate::error::Result;
use crate::model::{Document, SbomFormat, SourceLabel};

/// Detect SBOM format from content without parsing.
///
/// Returns None if no format could be detected with sufficient confidence.
#[must_use]
pub fn detect_format(content: &str) -> Option<DetectionResult> {
    let result = FormatDetector::new().detect(content);
    if result.can_parse() {
        Some(result)
    } else {
        None
    }
}

/// Parse SBOM content into the normalized graph, detecting the format.
pub fn parse_document(content: &str, source: SourceLabel) -> Result<Document> {
    FormatDetector::new().parse_str(content, source)
}

/// Serialize a normalized graph into the given family's JSON form.
///
/// The document may have been parsed from the other family; family-specific
/// concepts that do not translate are folded or dropped with debug logs.
pub fn serialize_document(document: &Document, format: SbomFormat) -> Result<String> {
    let detector = FormatDetector::new();
    detector
        .codec_for(format)
        .serialize(document)
        .map_err(|e| e.into_merge_error(&document.source))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_cyclonedx_json() {
        let content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.5"}"#;
        let detected = detect_format(content).expect("Should detect format");
        assert_eq!(detected.format, Some(SbomFormat::CycloneDx));
        assert!(detected.confidence.value() >= 0.75);
        assert_eq!(detected.variant, Some("JSON".to_string()));
        assert_eq!(detected.version, Some("1.5".to_string()));
    }

    #[test]
    fn test_detect_spdx_json() {
        let content = r#"{"spdxVersion": "SPDX-2.3", "SPDXID": "SPDXRef-DOCUMENT"}"#;
        let detected = detect_format(content).expect("Should detect format");
        assert_eq!(detected.format, Some(SbomFormat::Spdx));
        assert!(detected.confidence.value() >= 0.75);
        assert_eq!(detected.variant, Some("JSON".to_string()));
        assert_eq!(detected.version, Some("2.3".to_string()));
    }

    #[test]
    fn test_detect_spdx_tag_value() {
        let content = "SPDXVersion: SPDX-2.3\nDataLicense: CC0-1.0\nSPDXID: SPDXRef-DOCUMENT";
        let detected = detect_format(content).expect("Should detect format");
        assert_eq!(detected.format, Some(SbomFormat::Spdx));
        assert_eq!(detected.variant, Some("tag-value".to_string()));
        assert_eq!(detected.version, Some("2.3".to_string()));
    }

    #[test]
    fn test_detect_unknown_format() {
        let content = r#"{"some": "random", "json": "content"}"#;
        assert!(detect_format(content).is_none());
    }

    #[test]
    fn test_confidence_based_selection() {
        // CycloneDX should have higher confidence for this content
        let cdx_content = r#"{"bomFormat": "CycloneDX", "specVersion": "1.6", "components": []}"#;
        let cdx_codec = CycloneDxCodec::new();
        let spdx_codec = SpdxCodec::new();

        let cdx_conf = cdx_codec.confidence(cdx_content);
        let spdx_conf = spdx_codec.confidence(cdx_content);

        assert!(cdx_conf.value() > spdx_conf.value());
    }

    #[test]
    fn test_cross_family_serialization() {
        let source = SourceLabel::new(0, "app.spdx.json");
        let content = r#"{
            "spdxVersion": "SPDX-2.3",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "crossing",
            "packages": [{"SPDXID": "SPDXRef-a", "name": "a", "versionInfo": "1.0"}],
            "relationships": [
                {
                    "spdxElementId": "SPDXRef-DOCUMENT",
                    "relationshipType": "DESCRIBES",
                    "relatedSpdxElement": "SPDXRef-a"
                }
            ]
        }"#;
        let document = parse_document(content, source).expect("parse");

        let out = serialize_document(&document, SbomFormat::CycloneDx).expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&out).expect("json");
        assert_eq!(value["bomFormat"], "CycloneDX");
        assert_eq!(value["metadata"]["component"]["name"], "a");
    }
}
