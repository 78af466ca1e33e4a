#![no_main]
use libfuzzer_sys::fuzz_target;
use sbom_merge::merge::{merge, RootSelector};
use sbom_merge::model::SourceLabel;
use sbom_merge::parsers::parse_document;

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

/// Fuzz the contextual merge through the parsing front door.
///
/// Splits the input in two, parses each half as an SBOM document, and
/// merges whatever parses. Also wraps each half in an SPDX envelope so
/// fuzzed package fragments reach the rewrite and union logic instead
/// of dying at detection.
fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let (left, right) = s.split_at(s.len() / 2);

    let mut documents = Vec::new();
    for (position, part) in [left, right].into_iter().enumerate() {
        if let Ok(document) = parse_document(part, SourceLabel::new(position, "fuzz")) {
            documents.push(document);
            continue;
        }
        if part.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(
                r#"{{"spdxVersion":"SPDX-2.3","SPDXID":"SPDXRef-DOCUMENT","name":"fuzz","documentNamespace":"https://example.com/fuzz","packages":[{part}]}}"#,
            );
            if let Ok(document) = parse_document(&wrapped, SourceLabel::new(position, "fuzz")) {
                documents.push(document);
            }
        }
    }

    let _ = merge(&documents, &RootSelector::FirstDocument);
});
