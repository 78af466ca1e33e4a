#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::model::SourceLabel;
use sbom_merge::parsers::{SbomCodec, SpdxCodec};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the SPDX JSON codec directly.
///
/// Wraps input in an SPDX JSON envelope to reach the package and
/// relationship parsing internals rather than failing at detection.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let codec = SpdxCodec::new();

        // Try raw input
        let _ = codec.parse_str(s, SourceLabel::new(0, "fuzz"));

        // Try wrapping in SPDX JSON envelope
        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"spdxVersion":"SPDX-2.3","SPDXID":"SPDXRef-DOCUMENT","name":"fuzz","documentNamespace":"https://example.com/fuzz","packages":[{s}]}}"#,
            );
            let _ = codec.parse_str(&wrapped, SourceLabel::new(0, "fuzz"));
        }
    }
});
