#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::model::SourceLabel;

/// Fuzz the main SBOM parsing entry point.
///
/// Feeds arbitrary UTF-8 strings to `parse_document`, which runs format
/// detection and dispatches to the appropriate codec. This exercises all
/// format detection heuristics and every codec path.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = sbom_merge::parsers::parse_document(s, SourceLabel::new(0, "fuzz"));
    }
});
