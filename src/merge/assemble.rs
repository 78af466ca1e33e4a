//! The merge assembler.
//!
//! Takes N parsed documents in caller order and produces one merged
//! document: deduplicated package union, referentially valid deduplicated
//! edge union, exactly one DESCRIBES edge, contextualized lineage. The
//! caller order is a contract: the first document is the component, later
//! documents are parents (or additional scans of the same image, which
//! unify with the component root by identity); first-seen wins for every
//! metadata conflict.

use super::allocator::GlobalIdAllocator;
use super::diagnostics::MergeDiagnostics;
use super::remap::remap_document;
use super::rewrite::{self, AppliedRule, RewriteRule};
use crate::error::{Result, SbomMergeError};
use crate::model::{
    Document, DocumentMetadata, ExternalRef, IdentityResolver, Package, Relationship,
    RelationshipType, SourceLabel, Tool,
};
use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

/// Which input document supplies the merged DESCRIBES root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RootSelector {
    /// The first document's root (the component document)
    #[default]
    FirstDocument,
    /// The root of the document at this position in the input order
    Position(usize),
    /// The root of the document with this source label
    Label(String),
}

/// A merged document plus everything observed while producing it.
#[derive(Debug)]
pub struct MergeOutcome {
    pub document: Document,
    pub diagnostics: MergeDiagnostics,
}

/// Merge documents in caller order into one contextualized document.
///
/// Fails without partial output on empty input, mixed format families,
/// an unresolvable root selector, or a selected document that supplies
/// no root. Dangling edges and skipped rule applications are recovered
/// and recorded in the returned diagnostics instead.
pub fn merge(documents: &[Document], root_selector: &RootSelector) -> Result<MergeOutcome> {
    if documents.is_empty() {
        return Err(SbomMergeError::invalid(
            "merge requires at least one input document",
        ));
    }
    check_single_family(documents)?;

    let mut diagnostics = MergeDiagnostics::new();
    diagnostics.input_documents = documents.len();

    // Rule 1 normalizes the legacy base-image shape per document before
    // any identities are resolved.
    let mut rewritten = Vec::with_capacity(documents.len());
    for document in documents {
        let outcome = rewrite::translate_legacy_lineage(document);
        for warning in outcome.warnings {
            diagnostics.warn(warning);
        }
        diagnostics.applied_rules.extend(outcome.applied);
        rewritten.push(outcome.document);
    }

    let resolver = IdentityResolver::standard();
    let mut allocator = GlobalIdAllocator::new();

    let mut packages: IndexMap<String, Package> = IndexMap::new();
    let mut relationships: IndexSet<Relationship> = IndexSet::new();
    let mut roots: Vec<Option<String>> = Vec::with_capacity(documents.len());

    let mut component_root: Option<String> = None;
    // Lineage targets already matched to some input document.
    let mut claimed: HashSet<String> = HashSet::new();

    for (position, document) in rewritten.iter().enumerate() {
        // Rule 2 must pin the parent root's identity before this
        // document's packages are allocated.
        if position > 0 {
            if let Some(root) = component_root.as_deref() {
                alias_parent_root(
                    document,
                    &resolver,
                    root,
                    &relationships,
                    &mut allocator,
                    &mut claimed,
                    &mut diagnostics,
                );
            }
        }

        let remapped = remap_document(document, &resolver, &mut allocator);
        for warning in remapped.warnings {
            diagnostics.warn(warning);
        }
        for package in remapped.packages {
            union_package(&mut packages, package, &mut diagnostics);
        }
        for relationship in remapped.relationships {
            relationships.insert(relationship);
        }

        if position == 0 {
            component_root.clone_from(&remapped.root);
            if component_root.is_none() {
                tracing::warn!(
                    source = %document.source,
                    "first document has no resolvable root, lineage rules disabled"
                );
            }
        } else if let (Some(root), Some(parent_root)) =
            (component_root.as_deref(), remapped.root.as_deref())
        {
            // Rule 3.
            insert_lineage(
                root,
                parent_root,
                &mut relationships,
                &mut claimed,
                &mut diagnostics,
            );
        }

        roots.push(remapped.root);
    }

    let root = select_root(root_selector, documents, &roots)?;

    let mut merged = Document::new(
        merge_metadata(documents),
        SourceLabel::new(0, "(merged)"),
    );
    merged.packages = packages;
    merged.relationships = relationships.into_iter().collect();
    merged
        .relationships
        .insert(0, Relationship::describes(root));

    // Rule 4 runs on the union; the DESCRIBES edge is already in place so
    // the root can never be pruned.
    let outcome = rewrite::prune_builder_records(&merged);
    diagnostics.applied_rules.extend(outcome.applied);
    let merged = outcome.document;

    diagnostics.merged_packages = merged.package_count();
    tracing::info!(
        documents = diagnostics.input_documents,
        packages = diagnostics.merged_packages,
        deduplicated = diagnostics.deduplicated_packages,
        relationships = merged.relationship_count(),
        dropped_edges = diagnostics.dropped_relationships,
        warnings = diagnostics.warnings.len(),
        "merge complete"
    );

    Ok(MergeOutcome {
        document: merged,
        diagnostics,
    })
}

fn check_single_family(documents: &[Document]) -> Result<()> {
    let family = documents[0].metadata.format;
    for document in documents {
        if document.metadata.format != family {
            return Err(SbomMergeError::format_mismatch(
                family.to_string(),
                document.metadata.format.to_string(),
                document.source.to_string(),
            ));
        }
    }
    Ok(())
}

/// Rule 2: unify a parent document's root with the lineage target the
/// component already references.
///
/// If the parent root's canonical identity is already known to the
/// allocator, unification happens through ordinary allocation. Otherwise
/// the root is aliased onto the first unclaimed DESCENDANT_OF target of
/// the component root; lineage targets and input parents correspond in
/// declaration order.
fn alias_parent_root(
    parent: &Document,
    resolver: &IdentityResolver,
    component_root: &str,
    relationships: &IndexSet<Relationship>,
    allocator: &mut GlobalIdAllocator,
    claimed: &mut HashSet<String>,
    diagnostics: &mut MergeDiagnostics,
) {
    let Some(root_local) = parent.describes_target() else {
        tracing::debug!(source = %parent.source, "document has no root, self-reference rule skipped");
        return;
    };
    let Some(root_package) = parent.packages.get(root_local) else {
        return;
    };

    let identity = resolver.identity(root_package);
    if let Some(existing) = allocator.lookup(&identity) {
        claimed.insert(existing.to_string());
        return;
    }

    let target = relationships
        .iter()
        .filter(|r| {
            r.rel_type == RelationshipType::DescendantOf
                && r.from.package_id() == Some(component_root)
        })
        .filter_map(|r| r.to.package_id())
        .find(|target| !claimed.contains(*target));

    if let Some(target) = target {
        allocator.add_alias(identity, target);
        claimed.insert(target.to_string());
        diagnostics.record(AppliedRule::new(
            RewriteRule::SelfReferenceAlias,
            format!(
                "root {root_local} of {} unified with lineage target {target}",
                parent.source
            ),
        ));
    }
}

/// Rule 3: connect a parent root to the component root.
fn insert_lineage(
    component_root: &str,
    parent_root: &str,
    relationships: &mut IndexSet<Relationship>,
    claimed: &mut HashSet<String>,
    diagnostics: &mut MergeDiagnostics,
) {
    if parent_root == component_root {
        // A second scan of the same image, not a parent.
        tracing::debug!("document root unified with the component root, no lineage edge");
        return;
    }
    claimed.insert(parent_root.to_string());

    let edge = Relationship::between(
        component_root,
        RelationshipType::DescendantOf,
        parent_root,
    );
    if relationships.insert(edge) {
        diagnostics.record(AppliedRule::new(
            RewriteRule::LineageInsertion,
            format!("DESCENDANT_OF ({component_root} -> {parent_root})"),
        ));
    }
}

/// Union one remapped package into the accumulating package map.
pub(super) fn union_package(
    packages: &mut IndexMap<String, Package>,
    incoming: Package,
    diagnostics: &mut MergeDiagnostics,
) {
    match packages.entry(incoming.local_id.clone()) {
        indexmap::map::Entry::Vacant(entry) => {
            entry.insert(incoming);
        }
        indexmap::map::Entry::Occupied(mut entry) => {
            diagnostics.deduplicated_packages += 1;
            fold_package(entry.get_mut(), incoming);
        }
    }
}

/// Fold a later occurrence of a package into the first-seen one.
///
/// Scalar metadata is first-seen-wins (absent fields fill in); checksums,
/// external references, annotations, and architecture sets union.
fn fold_package(existing: &mut Package, incoming: Package) {
    if existing.version.is_none() {
        existing.version = incoming.version;
    }
    if existing.purl.is_none() {
        existing.purl = incoming.purl;
    }
    if existing.package_type.is_none() {
        existing.package_type = incoming.package_type;
    }
    if existing.supplier.is_none() {
        existing.supplier = incoming.supplier;
    }
    if existing.download_location.is_none() {
        existing.download_location = incoming.download_location;
    }
    if existing.license_concluded.is_none() {
        existing.license_concluded = incoming.license_concluded;
    }
    if existing.license_declared.is_none() {
        existing.license_declared = incoming.license_declared;
    }

    for checksum in incoming.checksums {
        if !existing
            .checksums
            .iter()
            .any(|c| c.algorithm == checksum.algorithm && c.value == checksum.value)
        {
            existing.checksums.push(checksum);
        }
    }

    let mut changed = false;
    for reference in incoming.external_refs {
        if !existing
            .external_refs
            .iter()
            .any(|r| r.dedup_key() == reference.dedup_key())
        {
            existing.external_refs.push(reference);
            changed = true;
        }
    }
    if changed {
        existing.external_refs.sort_by_key(ExternalRef::dedup_key);
    }

    for (key, value) in incoming.annotations {
        existing.annotations.entry(key).or_insert(value);
    }

    existing.architectures.extend(incoming.architectures);
}

/// Document-level metadata union: first-seen name/namespace/license,
/// tool lists unioned with name+version dedup, fresh creation time.
fn merge_metadata(documents: &[Document]) -> DocumentMetadata {
    let first = &documents[0].metadata;
    let mut metadata = DocumentMetadata::new(first.format, first.spec_version.clone());
    metadata.name = documents.iter().find_map(|d| d.metadata.name.clone());
    metadata.namespace = documents.iter().find_map(|d| d.metadata.namespace.clone());
    metadata.data_license = documents
        .iter()
        .find_map(|d| d.metadata.data_license.clone());
    metadata.created = Some(Utc::now());

    let mut seen: HashSet<Tool> = HashSet::new();
    for document in documents {
        for tool in &document.metadata.tools {
            if seen.insert(tool.clone()) {
                metadata.tools.push(tool.clone());
            }
        }
    }
    metadata
}

fn select_root(
    selector: &RootSelector,
    documents: &[Document],
    roots: &[Option<String>],
) -> Result<String> {
    let position = match selector {
        RootSelector::FirstDocument => 0,
        RootSelector::Position(position) => *position,
        RootSelector::Label(label) => documents
            .iter()
            .position(|d| d.source.label == *label)
            .ok_or_else(|| {
                SbomMergeError::invalid(format!("no input document labeled '{label}'"))
            })?,
    };
    let document = documents.get(position).ok_or_else(|| {
        SbomMergeError::invalid(format!(
            "root selector position {position} out of range ({} documents)",
            documents.len()
        ))
    })?;

    match roots.get(position).cloned().flatten() {
        Some(root) => Ok(root),
        None => {
            let reason = match document.describes_target() {
                None => "document declares no DESCRIBES relationship".to_string(),
                Some(target) => {
                    format!("DESCRIBES target {target} is not in the package set")
                }
            };
            Err(SbomMergeError::no_root(document.source.to_string(), reason))
        }
    }
}
