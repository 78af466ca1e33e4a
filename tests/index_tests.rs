//! Multi-architecture index composition tests.
//!
//! These tests compose per-architecture fixture documents into an index
//! document and check the synthetic root, per-arch root separation,
//! cross-architecture package collapsing, and architecture tagging.

use sbom_merge::merge::{
    compose_index, normalize_architecture, IndexDescriptor, IndexEntry, MergeOutcome,
};
use sbom_merge::model::{NodeRef, Package, RelationshipType, ARCHITECTURE_MARKER};
use sbom_merge::pipeline::load_document;
use sbom_merge::SbomMergeError;
use std::path::{Path, PathBuf};

// ============================================================================
// Test Fixtures
// ============================================================================

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

const INDEX_DIGEST: &str = "sha256:ffff0000111122223333444455556666777788889999aaaabbbbccccddddeeee";

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn descriptor() -> IndexDescriptor {
    IndexDescriptor {
        name: "quay.io/acme/app".to_string(),
        digest: INDEX_DIGEST.to_string(),
    }
}

/// The two per-arch fixtures, labelled with `uname -m` spellings so the
/// composition also exercises architecture normalization.
fn fixture_entries() -> Vec<IndexEntry> {
    vec![
        IndexEntry {
            architecture: "x86_64".to_string(),
            digest: Some("sha256:d1d1d1".to_string()),
            document: load_document(0, &fixture_path("spdx/arch-amd64.spdx.json"))
                .expect("load amd64 fixture"),
        },
        IndexEntry {
            architecture: "aarch64".to_string(),
            digest: Some("sha256:e2e2e2".to_string()),
            document: load_document(1, &fixture_path("spdx/arch-arm64.spdx.json"))
                .expect("load arm64 fixture"),
        },
    ]
}

fn compose_fixtures() -> MergeOutcome {
    compose_index(fixture_entries(), &descriptor()).expect("compose index")
}

fn find_package<'a>(outcome: &'a MergeOutcome, name: &str) -> &'a Package {
    outcome
        .document
        .packages
        .values()
        .find(|p| p.name == name)
        .unwrap_or_else(|| panic!("package '{name}' not in composed document"))
}

// ============================================================================
// Index Composition
// ============================================================================

mod composition {
    use super::*;

    #[test]
    fn synthetic_root_describes_the_manifest_list() {
        let outcome = compose_fixtures();
        let composed = &outcome.document;

        let root_id = composed.describes_target().expect("described root");
        assert!(root_id.starts_with("SPDXRef-Image-"), "got: {root_id}");

        // The synthetic root is the first package in the document.
        let (first_id, root) = composed.packages.first().expect("at least one package");
        assert_eq!(first_id.as_str(), root_id);
        assert_eq!(root.name, "quay.io/acme/app");
        assert_eq!(root.version.as_deref(), Some(INDEX_DIGEST));
        assert_eq!(root.package_type.as_deref(), Some("container"));
        assert_eq!(
            root.purl.as_deref(),
            Some(format!("pkg:oci/app@{INDEX_DIGEST}?repository_url=quay.io/acme/app").as_str())
        );
        assert_eq!(root.checksums.len(), 1);
        assert_eq!(root.checksums[0].algorithm, "SHA256");
        assert_eq!(
            format!("sha256:{}", root.checksums[0].value),
            INDEX_DIGEST
        );
    }

    #[test]
    fn per_arch_roots_stay_distinct_under_the_root() {
        let outcome = compose_fixtures();
        let composed = &outcome.document;
        let root_id = composed.describes_target().expect("described root");

        // Both arch images carry the same name; identity still separates
        // them because their digests differ.
        let arch_root_ids: Vec<&str> = composed
            .packages
            .iter()
            .filter(|(id, p)| p.name == "quay.io/acme/app" && id.as_str() != root_id)
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(arch_root_ids.len(), 2, "got: {arch_root_ids:?}");

        for arch_root in &arch_root_ids {
            assert!(
                composed.relationships.iter().any(|r| {
                    r.rel_type == RelationshipType::Contains
                        && r.from.package_id() == Some(root_id)
                        && r.to.package_id() == Some(arch_root)
                }),
                "no CONTAINS edge from index root to {arch_root}"
            );
        }
    }

    #[test]
    fn shared_packages_collapse_across_architectures() {
        let outcome = compose_fixtures();

        // openssl appears in both inputs with the same purl.
        assert_eq!(outcome.document.package_count(), 6);
        assert!(outcome.diagnostics.deduplicated_packages >= 1);

        let openssl = find_package(&outcome, "openssl");
        assert_eq!(openssl.marker(ARCHITECTURE_MARKER), Some("all"));
        let architectures: Vec<&str> =
            openssl.architectures.iter().map(String::as_str).collect();
        assert_eq!(architectures, vec!["amd64", "arm64"]);
    }

    #[test]
    fn arch_only_packages_keep_their_subset() {
        let outcome = compose_fixtures();

        let ld_linux = find_package(&outcome, "ld-linux-x86-64");
        assert_eq!(ld_linux.marker(ARCHITECTURE_MARKER), Some("amd64"));

        let libgcc = find_package(&outcome, "libgcc-aarch64");
        assert_eq!(libgcc.marker(ARCHITECTURE_MARKER), Some("arm64"));
    }

    #[test]
    fn arch_contents_hang_off_their_own_root() {
        let outcome = compose_fixtures();
        let composed = &outcome.document;
        let openssl_id = find_package(&outcome, "openssl").local_id.clone();

        // Each arch root contributed its own CONTAINS edge to the shared
        // openssl node.
        let containing: Vec<&str> = composed
            .relationships
            .iter()
            .filter(|r| {
                r.rel_type == RelationshipType::Contains
                    && r.to.package_id() == Some(openssl_id.as_str())
            })
            .filter_map(|r| r.from.package_id())
            .collect();
        assert_eq!(containing.len(), 2, "got: {containing:?}");
        assert_ne!(containing[0], containing[1]);
    }

    #[test]
    fn composed_document_has_exactly_one_describes() {
        let outcome = compose_fixtures();
        let composed = &outcome.document;

        let describes: Vec<_> = composed
            .relationships
            .iter()
            .filter(|r| r.rel_type == RelationshipType::Describes)
            .collect();
        assert_eq!(describes.len(), 1);
        assert_eq!(
            composed.relationships[0].rel_type,
            RelationshipType::Describes
        );
    }

    #[test]
    fn every_edge_endpoint_resolves() {
        let outcome = compose_fixtures();
        let composed = &outcome.document;

        for relationship in &composed.relationships {
            for node in [&relationship.from, &relationship.to] {
                if let NodeRef::Package(id) = node {
                    assert!(
                        composed.packages.contains_key(id),
                        "edge endpoint {id} is not a package"
                    );
                }
            }
        }
    }

    #[test]
    fn composition_is_deterministic() {
        let first = compose_fixtures();
        let second = compose_fixtures();

        assert_eq!(first.document.content_hash(), second.document.content_hash());
        let first_ids: Vec<&String> = first.document.packages.keys().collect();
        let second_ids: Vec<&String> = second.document.packages.keys().collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn metadata_unions_tools_and_names_the_image() {
        let outcome = compose_fixtures();
        let metadata = &outcome.document.metadata;

        assert_eq!(metadata.name.as_deref(), Some("quay.io/acme/app"));
        assert_eq!(metadata.data_license.as_deref(), Some("CC0-1.0"));
        // Both inputs name the same generator; it appears once.
        assert_eq!(metadata.tools.len(), 1);
        assert_eq!(metadata.tools[0].name, "syft");
        assert!(metadata.created.is_some());
    }
}

// ============================================================================
// Architecture Normalization
// ============================================================================

mod architecture_labels {
    use super::*;

    #[test]
    fn uname_spellings_normalize_to_goarch() {
        assert_eq!(normalize_architecture("x86_64"), "amd64");
        assert_eq!(normalize_architecture("aarch64"), "arm64");
        assert_eq!(normalize_architecture("ppc64"), "ppc64le");
        assert_eq!(normalize_architecture("s390"), "s390x");
    }

    #[test]
    fn platform_prefixes_are_stripped() {
        assert_eq!(normalize_architecture("linux/amd64"), "amd64");
        assert_eq!(normalize_architecture("linux/x86_64"), "amd64");
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(normalize_architecture("riscv64"), "riscv64");
        assert_eq!(normalize_architecture("wasm32"), "wasm32");
    }
}

// ============================================================================
// Input Validation
// ============================================================================

mod input_validation {
    use super::*;
    use sbom_merge::model::SourceLabel;
    use sbom_merge::parse_document;

    #[test]
    fn empty_entry_list_is_rejected() {
        let err = compose_index(Vec::new(), &descriptor()).expect_err("no inputs");
        assert!(matches!(err, SbomMergeError::Invalid(_)));
    }

    #[test]
    fn mixed_families_are_rejected() {
        let mut entries = fixture_entries();
        entries.push(IndexEntry {
            architecture: "s390x".to_string(),
            digest: None,
            document: parse_document(
                r#"{
                    "bomFormat": "CycloneDX",
                    "specVersion": "1.5",
                    "metadata": {
                        "component": {"type": "container", "bom-ref": "img", "name": "app"}
                    }
                }"#,
                SourceLabel::new(2, "app-s390x.cdx.json"),
            )
            .expect("parse inline document"),
        });

        let err = compose_index(entries, &descriptor()).expect_err("mixed families");
        match err {
            SbomMergeError::FormatMismatch {
                expected,
                found,
                source_label,
            } => {
                assert_eq!(expected, "SPDX");
                assert_eq!(found, "CycloneDX");
                assert!(source_label.contains("app-s390x.cdx.json"), "got: {source_label}");
            }
            other => panic!("expected FormatMismatch, got {other:?}"),
        }
    }

    #[test]
    fn rootless_entry_is_fatal() {
        let mut entries = fixture_entries();
        entries[1].document = parse_document(
            r#"{
                "spdxVersion": "SPDX-2.3",
                "SPDXID": "SPDXRef-DOCUMENT",
                "name": "rootless",
                "packages": [{"SPDXID": "SPDXRef-a", "name": "a"}]
            }"#,
            SourceLabel::new(1, "rootless.spdx.json"),
        )
        .expect("parse inline document");

        let err = compose_index(entries, &descriptor()).expect_err("rootless input");
        assert!(matches!(err, SbomMergeError::NoRootCandidate { .. }));
    }
}

// ============================================================================
// Command Handler
// ============================================================================

mod handler {
    use super::*;
    use sbom_merge::cli::{run_index, IndexConfig};
    use sbom_merge::model::{SbomFormat, SourceLabel};
    use sbom_merge::parse_document;

    fn arch_spec(arch: &str, digest: &str, fixture: &str) -> String {
        format!("{arch}={digest}={}", fixture_path(fixture).display())
    }

    #[test]
    fn run_index_writes_the_composed_document() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let output = dir.path().join("index.spdx.json");

        run_index(IndexConfig {
            arch_specs: vec![
                arch_spec("x86_64", "sha256:d1d1d1", "spdx/arch-amd64.spdx.json"),
                arch_spec("aarch64", "sha256:e2e2e2", "spdx/arch-arm64.spdx.json"),
            ],
            name: "quay.io/acme/app".to_string(),
            digest: INDEX_DIGEST.to_string(),
            output: Some(output.clone()),
            format: None,
        })
        .expect("run index");

        let content = std::fs::read_to_string(&output).expect("read output");
        let composed = parse_document(&content, SourceLabel::new(0, "index.spdx.json"))
            .expect("parse output");
        assert_eq!(composed.metadata.format, SbomFormat::Spdx);
        assert_eq!(composed.package_count(), 6);
        assert_eq!(
            composed.root_package().map(|p| p.name.as_str()),
            Some("quay.io/acme/app")
        );
    }

    #[test]
    fn run_index_can_cross_families_on_output() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let output = dir.path().join("index.cdx.json");

        run_index(IndexConfig {
            arch_specs: vec![
                arch_spec("x86_64", "sha256:d1d1d1", "spdx/arch-amd64.spdx.json"),
                arch_spec("aarch64", "sha256:e2e2e2", "spdx/arch-arm64.spdx.json"),
            ],
            name: "quay.io/acme/app".to_string(),
            digest: INDEX_DIGEST.to_string(),
            output: Some(output.clone()),
            format: Some(SbomFormat::CycloneDx),
        })
        .expect("run index");

        let content = std::fs::read_to_string(&output).expect("read output");
        let wire: serde_json::Value = serde_json::from_str(&content).expect("valid JSON");
        assert_eq!(wire["bomFormat"], "CycloneDX");
        assert_eq!(wire["metadata"]["component"]["name"], "quay.io/acme/app");
    }

    #[test]
    fn run_index_rejects_malformed_arch_specs() {
        let err = run_index(IndexConfig {
            arch_specs: vec!["amd64".to_string()],
            name: "quay.io/acme/app".to_string(),
            digest: INDEX_DIGEST.to_string(),
            output: None,
            format: None,
        })
        .expect_err("spec without separator");
        assert!(matches!(err, SbomMergeError::Invalid(_)));
    }
}
