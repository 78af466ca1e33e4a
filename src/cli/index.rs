//! Index command handler.
//!
//! Implements the `index` subcommand: composing per-architecture documents
//! into one multi-arch index document.

use crate::error::{Result, SbomMergeError};
use crate::merge::{compose_index, IndexDescriptor, IndexEntry};
use crate::model::SbomFormat;
use crate::pipeline::{load_documents, write_document, OutputTarget};
use std::path::PathBuf;

/// Configuration for the index command
#[derive(Debug)]
pub struct IndexConfig {
    /// Raw `--arch` values, `ARCH=FILE` or `ARCH=DIGEST=FILE`
    pub arch_specs: Vec<String>,
    /// Image reference the index describes
    pub name: String,
    /// Manifest list digest
    pub digest: String,
    /// Output path, stdout when absent
    pub output: Option<PathBuf>,
    /// Output family, defaulting to the family of the inputs
    pub format: Option<SbomFormat>,
}

/// One parsed `--arch` value.
#[derive(Debug, PartialEq, Eq)]
struct ArchSpec {
    architecture: String,
    digest: Option<String>,
    path: PathBuf,
}

/// Run the index command.
pub fn run_index(config: IndexConfig) -> Result<()> {
    let specs = config
        .arch_specs
        .iter()
        .map(|raw| parse_arch_spec(raw))
        .collect::<Result<Vec<_>>>()?;

    let paths: Vec<PathBuf> = specs.iter().map(|s| s.path.clone()).collect();
    let documents = load_documents(&paths)?;

    let entries = specs
        .into_iter()
        .zip(documents)
        .map(|(spec, document)| IndexEntry {
            architecture: spec.architecture,
            digest: spec.digest,
            document,
        })
        .collect();
    let descriptor = IndexDescriptor {
        name: config.name,
        digest: config.digest,
    };
    let outcome = compose_index(entries, &descriptor)?;

    let format = config.format.unwrap_or(outcome.document.metadata.format);
    let target = OutputTarget::from_option(config.output);
    write_document(&outcome.document, format, &target)
}

/// Parse one `--arch` value.
///
/// The middle segment of a three-part value is a digest only when it has
/// the `algo:hex` shape, so file paths containing `=` still parse.
fn parse_arch_spec(raw: &str) -> Result<ArchSpec> {
    let Some((architecture, rest)) = raw.split_once('=') else {
        return Err(invalid_arch_spec(raw));
    };
    if architecture.is_empty() || rest.is_empty() {
        return Err(invalid_arch_spec(raw));
    }
    let (digest, path) = match rest.split_once('=') {
        Some((head, tail)) if head.contains(':') && !tail.is_empty() => {
            (Some(head.to_string()), tail)
        }
        _ => (None, rest),
    };
    Ok(ArchSpec {
        architecture: architecture.to_string(),
        digest,
        path: PathBuf::from(path),
    })
}

fn invalid_arch_spec(raw: &str) -> SbomMergeError {
    SbomMergeError::invalid(format!(
        "invalid --arch value '{raw}', expected ARCH=FILE or ARCH=DIGEST=FILE"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_spec_two_part_form() {
        let spec = parse_arch_spec("amd64=build/app-amd64.spdx.json").expect("parse");
        assert_eq!(spec.architecture, "amd64");
        assert_eq!(spec.digest, None);
        assert_eq!(spec.path, PathBuf::from("build/app-amd64.spdx.json"));
    }

    #[test]
    fn test_arch_spec_three_part_form() {
        let spec = parse_arch_spec("aarch64=sha256:abc123=app-arm64.json").expect("parse");
        assert_eq!(spec.architecture, "aarch64");
        assert_eq!(spec.digest.as_deref(), Some("sha256:abc123"));
        assert_eq!(spec.path, PathBuf::from("app-arm64.json"));
    }

    #[test]
    fn test_arch_spec_path_with_equals_sign() {
        let spec = parse_arch_spec("amd64=out/build=final/app.json").expect("parse");
        assert_eq!(spec.digest, None);
        assert_eq!(spec.path, PathBuf::from("out/build=final/app.json"));
    }

    #[test]
    fn test_arch_spec_missing_separator_fails() {
        assert!(parse_arch_spec("amd64").is_err());
        assert!(parse_arch_spec("=file.json").is_err());
        assert!(parse_arch_spec("amd64=").is_err());
    }

    #[test]
    fn test_run_index_end_to_end() {
        const ARCH_SBOM: &str = r#"{
            "spdxVersion": "SPDX-2.3",
            "SPDXID": "SPDXRef-DOCUMENT",
            "name": "app-ARCH",
            "dataLicense": "CC0-1.0",
            "packages": [
                {"SPDXID": "SPDXRef-image", "name": "app", "versionInfo": "1.0"},
                {"SPDXID": "SPDXRef-zlib", "name": "zlib", "versionInfo": "1.2.13"}
            ],
            "relationships": [
                {"spdxElementId": "SPDXRef-DOCUMENT", "relationshipType": "DESCRIBES", "relatedSpdxElement": "SPDXRef-image"},
                {"spdxElementId": "SPDXRef-image", "relationshipType": "CONTAINS", "relatedSpdxElement": "SPDXRef-zlib"}
            ]
        }"#;

        let dir = tempfile::tempdir().expect("create temp dir");
        let amd = dir.path().join("app-amd64.spdx.json");
        let arm = dir.path().join("app-arm64.spdx.json");
        let out = dir.path().join("index.spdx.json");
        std::fs::write(&amd, ARCH_SBOM).expect("write file");
        std::fs::write(&arm, ARCH_SBOM).expect("write file");

        run_index(IndexConfig {
            arch_specs: vec![
                format!("x86_64=sha256:aaa={}", amd.display()),
                format!("aarch64=sha256:bbb={}", arm.display()),
            ],
            name: "registry.example/team/app:1.0".to_string(),
            digest: "sha256:1234".to_string(),
            output: Some(out.clone()),
            format: None,
        })
        .expect("compose");

        let written = std::fs::read_to_string(&out).expect("read back");
        assert!(written.contains("SPDXRef-Image-"));
        assert!(written.contains("konflux:container:architecture"));
        assert!(written.contains("pkg:oci/app@sha256:1234?repository_url=registry.example/team/app"));
    }
}
