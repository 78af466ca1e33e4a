//! Centralized format detection.
//!
//! Both codecs score their own confidence; the detector runs them side
//! by side and picks the winner, so a document that looks vaguely like
//! both families goes to the one with the stronger signal.

use super::cyclonedx::CycloneDxCodec;
use super::spdx::SpdxCodec;
use super::traits::{FormatConfidence, SbomCodec};
use crate::error::{Result, SbomMergeError};
use crate::model::{Document, SbomFormat, SourceLabel};

/// Minimum confidence threshold for accepting a format detection.
/// This is LOW confidence (0.25) - the codec believes it might be able
/// to handle the content.
pub const MIN_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Result of format detection.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// The format that should handle this content, if detected.
    pub format: Option<SbomFormat>,
    /// Confidence level of the detection.
    pub confidence: FormatConfidence,
    /// Detected format variant (e.g., "JSON", "XML", "tag-value").
    pub variant: Option<String>,
    /// Detected version if available.
    pub version: Option<String>,
    /// Any warnings about the detection.
    pub warnings: Vec<String>,
}

impl DetectionResult {
    /// Create a result indicating no format was detected.
    pub fn unknown(reason: &str) -> Self {
        Self {
            format: None,
            confidence: FormatConfidence::NONE,
            variant: None,
            version: None,
            warnings: vec![reason.to_string()],
        }
    }

    /// Check whether the detected format can actually be parsed.
    pub fn can_parse(&self) -> bool {
        self.format.is_some() && self.confidence.value() >= MIN_CONFIDENCE_THRESHOLD
    }
}

/// Detects the format of SBOM content and routes it to the right codec.
pub struct FormatDetector {
    cyclonedx: CycloneDxCodec,
    spdx: SpdxCodec,
    min_confidence: f32,
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDetector {
    /// Create a detector with the default confidence threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cyclonedx: CycloneDxCodec::new(),
            spdx: SpdxCodec::new(),
            min_confidence: MIN_CONFIDENCE_THRESHOLD,
        }
    }

    /// Create a detector with a custom confidence threshold.
    #[must_use]
    pub fn with_threshold(min_confidence: f32) -> Self {
        Self {
            cyclonedx: CycloneDxCodec::new(),
            spdx: SpdxCodec::new(),
            min_confidence,
        }
    }

    /// Detect which SBOM format the content is in.
    pub fn detect(&self, content: &str) -> DetectionResult {
        let cdx = self.cyclonedx.detect(content);
        let spdx = self.spdx.detect(content);

        tracing::debug!(
            cyclonedx_confidence = cdx.confidence.value(),
            spdx_confidence = spdx.confidence.value(),
            "format detection scores"
        );

        let (format, detection) = if spdx.confidence.value() > cdx.confidence.value() {
            (SbomFormat::Spdx, spdx)
        } else if cdx.confidence.value() > spdx.confidence.value() {
            (SbomFormat::CycloneDx, cdx)
        } else if cdx.confidence.value() >= self.min_confidence {
            // Tied above threshold: prefer CycloneDX but say so.
            let mut detection = cdx;
            detection
                .warnings
                .push("ambiguous content scored equally for both formats".to_string());
            (SbomFormat::CycloneDx, detection)
        } else {
            return DetectionResult::unknown("content does not match any known SBOM format");
        };

        if detection.confidence.value() < self.min_confidence {
            return DetectionResult::unknown("content does not match any known SBOM format");
        }

        DetectionResult {
            format: Some(format),
            confidence: detection.confidence,
            variant: detection.variant,
            version: detection.version,
            warnings: detection.warnings,
        }
    }

    /// Look up the codec for a known format.
    #[must_use]
    pub fn codec_for(&self, format: SbomFormat) -> &dyn SbomCodec {
        match format {
            SbomFormat::CycloneDx => &self.cyclonedx,
            SbomFormat::Spdx => &self.spdx,
        }
    }

    /// Detect the format of `content` and parse it into a document.
    ///
    /// Detection failures and parse failures both surface as merge errors
    /// that name the offending source.
    pub fn parse_str(&self, content: &str, source: SourceLabel) -> Result<Document> {
        let detection = self.detect(content);
        let Some(format) = detection.format else {
            return Err(SbomMergeError::unknown_format(source.to_string()));
        };

        for warning in &detection.warnings {
            tracing::warn!(source = %source, warning, "format detection warning");
        }
        tracing::debug!(
            source = %source,
            format = %format,
            variant = detection.variant.as_deref().unwrap_or("unknown"),
            version = detection.version.as_deref().unwrap_or("unknown"),
            "detected SBOM format"
        );

        self.codec_for(format)
            .parse_str(content, source.clone())
            .map_err(|e| e.into_merge_error(&source))
    }
}
