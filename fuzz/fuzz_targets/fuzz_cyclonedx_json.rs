#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::model::SourceLabel;
use sbom_merge::parsers::{CycloneDxCodec, SbomCodec};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the CycloneDX JSON codec directly.
///
/// Prefixes input with a minimal CycloneDX JSON wrapper to increase
/// the likelihood of reaching deep parsing logic rather than failing
/// at format detection.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let codec = CycloneDxCodec::new();

        // Try raw input first
        let _ = codec.parse_str(s, SourceLabel::new(0, "fuzz"));

        // Also try wrapping in CycloneDX JSON envelope
        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"bomFormat":"CycloneDX","specVersion":"1.5","components":[{s}]}}"#,
            );
            let _ = codec.parse_str(&wrapped, SourceLabel::new(0, "fuzz"));
        }
    }
});
