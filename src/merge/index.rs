//! Multi-architecture index composition.
//!
//! Takes one document per architecture of a manifest list and produces a
//! single document describing the index: a synthetic root package for the
//! manifest list with a CONTAINS edge to each per-arch image root,
//! shared packages collapsed across architectures, and every package
//! tagged with the architectures it was observed in.

use super::allocator::GlobalIdAllocator;
use super::assemble::{union_package, MergeOutcome};
use super::diagnostics::MergeDiagnostics;
use super::remap::remap_document_for_index;
use crate::error::{Result, SbomMergeError};
use crate::model::{
    Checksum, Document, DocumentMetadata, IdentityResolver, Package, Relationship,
    RelationshipType, SourceLabel, Tool, ARCHITECTURE_MARKER,
};
use crate::utils::{sanitize_id_component, sha256_hex};
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeSet, HashSet};

/// One per-architecture document plus the image metadata it was built for.
#[derive(Debug)]
pub struct IndexEntry {
    /// Architecture label as the build pipeline spells it (normalized
    /// internally, see [`normalize_architecture`])
    pub architecture: String,
    /// Manifest digest of the per-arch image, when known
    pub digest: Option<String>,
    pub document: Document,
}

/// The manifest list the composed document describes.
#[derive(Debug, Clone)]
pub struct IndexDescriptor {
    /// Image reference, with or without tag (`registry.io/ns/app:1.0`)
    pub name: String,
    /// Manifest list digest (`sha256:...`)
    pub digest: String,
}

/// Compose per-architecture documents into one index document.
///
/// Per-arch image roots keep distinct identities even when scanners emit
/// identical name/version pairs for every arch; all other packages
/// collapse on canonical identity and accumulate the architectures they
/// appear in. Packages present in every input architecture are tagged
/// `all`, the rest carry their sorted architecture subset.
pub fn compose_index(
    entries: Vec<IndexEntry>,
    descriptor: &IndexDescriptor,
) -> Result<MergeOutcome> {
    let Some(first) = entries.first() else {
        return Err(SbomMergeError::invalid(
            "index composition requires at least one per-architecture document",
        ));
    };
    let family = first.document.metadata.format;
    for entry in &entries {
        if entry.document.metadata.format != family {
            return Err(SbomMergeError::format_mismatch(
                family.to_string(),
                entry.document.metadata.format.to_string(),
                entry.document.source.to_string(),
            ));
        }
    }

    let mut diagnostics = MergeDiagnostics::new();
    diagnostics.input_documents = entries.len();

    let mut metadata = DocumentMetadata::new(family, first.document.metadata.spec_version.clone());
    metadata.name = Some(descriptor.name.clone());
    metadata.data_license = entries
        .iter()
        .find_map(|e| e.document.metadata.data_license.clone());
    metadata.created = Some(Utc::now());
    let mut seen_tools: HashSet<Tool> = HashSet::new();
    for entry in &entries {
        for tool in &entry.document.metadata.tools {
            if seen_tools.insert(tool.clone()) {
                metadata.tools.push(tool.clone());
            }
        }
    }

    let (repository, short_name) = image_parts(&descriptor.name);
    let root_purl = format!(
        "pkg:oci/{short_name}@{}?repository_url={repository}",
        descriptor.digest
    );
    let root_id = synthetic_image_id(&descriptor.name, &root_purl);

    let resolver = IdentityResolver::standard();
    let mut allocator = GlobalIdAllocator::new();
    let mut packages: IndexMap<String, Package> = IndexMap::new();
    let mut relationships: IndexSet<Relationship> = IndexSet::new();
    let mut all_architectures: BTreeSet<String> = BTreeSet::new();

    for mut entry in entries {
        let architecture = normalize_architecture(&entry.architecture);
        all_architectures.insert(architecture.clone());
        stamp_architecture(&mut entry.document, &architecture);
        enrich_root(
            &mut entry.document,
            &repository,
            &short_name,
            entry.digest.as_deref(),
        );

        let root_resolver = IdentityResolver::architecture_significant(&architecture);
        let remapped =
            remap_document_for_index(&entry.document, &resolver, &root_resolver, &mut allocator);
        for warning in remapped.warnings {
            diagnostics.warn(warning);
        }
        for package in remapped.packages {
            union_package(&mut packages, package, &mut diagnostics);
        }
        for relationship in remapped.relationships {
            relationships.insert(relationship);
        }

        let Some(arch_root) = remapped.root else {
            let reason = match entry.document.describes_target() {
                None => "document declares no DESCRIBES relationship".to_string(),
                Some(target) => {
                    format!("DESCRIBES target {target} is not in the package set")
                }
            };
            return Err(SbomMergeError::no_root(
                entry.document.source.to_string(),
                reason,
            ));
        };
        relationships.insert(Relationship::between(
            &root_id,
            RelationshipType::Contains,
            arch_root,
        ));
    }

    tag_architectures(&mut packages, &all_architectures);

    let mut root = Package::new(&root_id, &descriptor.name);
    root.version = Some(descriptor.digest.clone());
    root.purl = Some(root_purl);
    root.package_type = Some("container".to_string());
    if let Some(value) = descriptor.digest.strip_prefix("sha256:") {
        root.checksums.push(Checksum::new("SHA256", value));
    }

    let mut merged = Document::new(metadata, SourceLabel::new(0, "(index)"));
    merged.packages.insert(root_id.clone(), root);
    merged.packages.extend(packages);
    merged.relationships = relationships.into_iter().collect();
    merged
        .relationships
        .insert(0, Relationship::describes(&root_id));

    diagnostics.merged_packages = merged.package_count();
    tracing::info!(
        architectures = all_architectures.len(),
        packages = diagnostics.merged_packages,
        deduplicated = diagnostics.deduplicated_packages,
        relationships = merged.relationship_count(),
        warnings = diagnostics.warnings.len(),
        "index composition complete"
    );

    Ok(MergeOutcome {
        document: merged,
        diagnostics,
    })
}

/// Translate an architecture label to its GOARCH spelling.
///
/// Accepts `uname -m` spellings and an optional `linux/` platform prefix;
/// unknown labels pass through unchanged.
#[must_use]
pub fn normalize_architecture(raw: &str) -> String {
    let arch = raw.strip_prefix("linux/").unwrap_or(raw);
    match arch {
        "x86_64" | "x64" => "amd64",
        "arm" | "aarch64" | "aarch64_be" | "armv8b" | "armv8l" => "arm64",
        "powerpc" | "ppc" | "ppc64" | "ppcle" => "ppc64le",
        "s390" => "s390x",
        other => other,
    }
    .to_string()
}

fn stamp_architecture(document: &mut Document, architecture: &str) {
    for package in document.packages.values_mut() {
        package.architectures.insert(architecture.to_string());
    }
}

/// Fill in digest-derived fields on a thin per-arch root.
///
/// Scanners sometimes emit the image root as a bare name; the per-arch
/// digest supplies a version, an oci purl, and a checksum so the root is
/// a usable image record in the composed output.
fn enrich_root(document: &mut Document, repository: &str, short_name: &str, digest: Option<&str>) {
    let Some(digest) = digest else { return };
    let Some(root_id) = document.describes_target().map(ToString::to_string) else {
        return;
    };
    let Some(root) = document.packages.get_mut(&root_id) else {
        return;
    };
    if root.version.is_none() {
        root.version = Some(digest.to_string());
    }
    if root.purl.is_none() {
        root.purl = Some(format!(
            "pkg:oci/{short_name}@{digest}?repository_url={repository}"
        ));
    }
    if root.checksums.is_empty() {
        if let Some(value) = digest.strip_prefix("sha256:") {
            root.checksums.push(Checksum::new("SHA256", value));
        }
    }
}

/// Tag every package with the architectures it was observed in.
fn tag_architectures(packages: &mut IndexMap<String, Package>, all: &BTreeSet<String>) {
    for package in packages.values_mut() {
        let value = if &package.architectures == all {
            "all".to_string()
        } else {
            package
                .architectures
                .iter()
                .cloned()
                .collect::<Vec<_>>()
                .join(",")
        };
        package.set_marker(ARCHITECTURE_MARKER, value);
    }
}

/// Deterministic global id for the synthetic index root.
fn synthetic_image_id(name: &str, purl: &str) -> String {
    let mut sanitized = sanitize_id_component(name);
    if sanitized.is_empty() {
        sanitized = "Index".to_string();
    }
    format!("SPDXRef-Image-{sanitized}-{}", sha256_hex(purl.as_bytes()))
}

/// Split an image reference into (repository, short name).
///
/// `registry.io:5000/ns/app:1.0@sha256:...` gives
/// (`registry.io:5000/ns/app`, `app`). A colon introduces a tag only when
/// no path separator follows it, so registry ports survive.
fn image_parts(reference: &str) -> (String, String) {
    let no_digest = match reference.split_once('@') {
        Some((head, _)) => head,
        None => reference,
    };
    let repository = match no_digest.rsplit_once(':') {
        Some((head, tail)) if !tail.contains('/') => head,
        _ => no_digest,
    };
    let name = match repository.rsplit_once('/') {
        Some((_, name)) => name,
        None => repository,
    };
    (repository.to_string(), name.to_string())
}
