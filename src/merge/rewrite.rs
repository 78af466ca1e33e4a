//! Relationship rewrite rules.
//!
//! The rewrite rule set is an explicit ordered list of guarded
//! predicate -> transform pairs:
//!
//! 1. Legacy translation: a BUILD_TOOL_OF edge whose subject carries the
//!    base-image marker flips into a DESCENDANT_OF lineage edge.
//! 2. Self-reference disambiguation: the parent document's root is forced
//!    onto the node the component document already uses for that image.
//! 3. Lineage insertion: the merged graph gets a DESCENDANT_OF edge from
//!    the component root to each parent root that lacks one.
//! 4. Builder pruning: remaining BUILD_TOOL_OF edges are removed together
//!    with their now-unreferenced subject packages.
//!
//! Rules 1 and 4 are pure document passes defined here. Rules 2 and 3
//! need merge state (the allocation table, the component root) and are
//! applied by the assembler, which records them with the same taxonomy.
//! Every rule is guarded so re-running on already rewritten input is a
//! no-op.

use super::diagnostics::MergeWarning;
use crate::model::{Document, NodeRef, Relationship, RelationshipType};
use std::collections::HashSet;
use std::fmt;

/// Which rewrite rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    LegacyTranslation,
    SelfReferenceAlias,
    LineageInsertion,
    BuilderPruning,
}

impl fmt::Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LegacyTranslation => "legacy-translation",
            Self::SelfReferenceAlias => "self-reference-alias",
            Self::LineageInsertion => "lineage-insertion",
            Self::BuilderPruning => "builder-pruning",
        };
        write!(f, "{name}")
    }
}

/// Record of one rule application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRule {
    pub rule: RewriteRule,
    pub detail: String,
}

impl AppliedRule {
    #[must_use]
    pub fn new(rule: RewriteRule, detail: impl Into<String>) -> Self {
        Self {
            rule,
            detail: detail.into(),
        }
    }
}

/// Result of a pure rewrite pass.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub document: Document,
    pub applied: Vec<AppliedRule>,
    pub warnings: Vec<MergeWarning>,
}

impl RewriteOutcome {
    fn unchanged(document: &Document) -> Self {
        Self {
            document: document.clone(),
            applied: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// Rule 1: translate the legacy base-image shape into lineage.
///
/// In documents produced before lineage edges existed, the base image G is
/// annotated with the base-image marker and recorded as
/// `BUILD_TOOL_OF (G -> R)` against the image R it was the base of. The
/// modern shape is `DESCENDANT_OF (R -> G)`.
///
/// Guards: a document that already carries any DESCENDANT_OF edge is
/// already contextualized and passes through untouched; a document with
/// no marked package (scratch and archive builds) passes through
/// silently; a marked package with zero or several BUILD_TOOL_OF edges,
/// or whose related element is unresolvable, produces a warning and no
/// transform. Edges of other types from the marked package are left
/// alone.
#[must_use]
pub fn translate_legacy_lineage(document: &Document) -> RewriteOutcome {
    if document.has_relationship_of_type(&RelationshipType::DescendantOf) {
        tracing::debug!(source = %document.source, "already contextualized, legacy translation skipped");
        return RewriteOutcome::unchanged(document);
    }

    let marked: Vec<String> = document
        .packages
        .values()
        .filter(|p| p.is_base_image())
        .map(|p| p.local_id.clone())
        .collect();
    if marked.is_empty() {
        return RewriteOutcome::unchanged(document);
    }

    let mut outcome = RewriteOutcome::unchanged(document);

    for base_id in marked {
        let edges: Vec<usize> = document
            .relationships
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.rel_type == RelationshipType::BuildToolOf
                    && r.from.package_id() == Some(base_id.as_str())
            })
            .map(|(i, _)| i)
            .collect();

        let skip = |reason: String| MergeWarning::LegacyTranslationSkipped {
            source: document.source.to_string(),
            package: base_id.clone(),
            reason,
        };

        match edges.as_slice() {
            [] => outcome
                .warnings
                .push(skip("no BUILD_TOOL_OF relationship to translate".to_string())),
            [index] => {
                let edge = &document.relationships[*index];
                let Some(related) = edge.to.package_id() else {
                    outcome
                        .warnings
                        .push(skip("related element is the document node".to_string()));
                    continue;
                };
                if !document.packages.contains_key(related) {
                    outcome.warnings.push(skip(format!(
                        "related element {related} is not in the package set"
                    )));
                    continue;
                }
                outcome.document.relationships[*index] = Relationship::between(
                    related,
                    RelationshipType::DescendantOf,
                    base_id.clone(),
                );
                outcome.applied.push(AppliedRule::new(
                    RewriteRule::LegacyTranslation,
                    format!(
                        "BUILD_TOOL_OF ({base_id} -> {related}) rewritten to DESCENDANT_OF ({related} -> {base_id})"
                    ),
                ));
            }
            many => outcome.warnings.push(skip(format!(
                "{} BUILD_TOOL_OF relationships, expected exactly one",
                many.len()
            ))),
        }
    }

    outcome
}

/// Rule 4: remove builder records from the merged graph.
///
/// Any BUILD_TOOL_OF edge still present after legacy translation is a
/// builder-image record: the builder contributed nothing to the final
/// artifact's contents. The edge is removed; its subject package is
/// removed too unless some surviving edge still references it.
#[must_use]
pub fn prune_builder_records(document: &Document) -> RewriteOutcome {
    if !document.has_relationship_of_type(&RelationshipType::BuildToolOf) {
        return RewriteOutcome::unchanged(document);
    }

    let mut outcome = RewriteOutcome::unchanged(document);
    let (pruned, kept): (Vec<Relationship>, Vec<Relationship>) = document
        .relationships
        .iter()
        .cloned()
        .partition(|r| r.rel_type == RelationshipType::BuildToolOf);

    let mut referenced: HashSet<String> = HashSet::new();
    for edge in &kept {
        for node in [&edge.from, &edge.to] {
            if let NodeRef::Package(id) = node {
                referenced.insert(id.clone());
            }
        }
    }

    let mut subjects: Vec<String> = Vec::new();
    for edge in &pruned {
        outcome.applied.push(AppliedRule::new(
            RewriteRule::BuilderPruning,
            format!("removed BUILD_TOOL_OF ({} -> {})", edge.from, edge.to),
        ));
        if let Some(subject) = edge.from.package_id() {
            if !subjects.iter().any(|s| s == subject) {
                subjects.push(subject.to_string());
            }
        }
    }

    outcome.document.relationships = kept;

    for subject in subjects {
        if referenced.contains(subject.as_str()) {
            tracing::debug!(package = %subject, "builder package retained, still referenced");
            continue;
        }
        if outcome.document.packages.shift_remove(&subject).is_some() {
            outcome.applied.push(AppliedRule::new(
                RewriteRule::BuilderPruning,
                format!("removed builder package {subject}"),
            ));
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        DocumentMetadata, Package, SbomFormat, SourceLabel, BASE_IMAGE_MARKER,
        BUILDER_IMAGE_MARKER,
    };

    fn doc() -> Document {
        Document::new(
            DocumentMetadata::new(SbomFormat::Spdx, "2.3"),
            SourceLabel::new(1, "parent.json"),
        )
    }

    fn legacy_parent() -> Document {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "ubi9"));
        let mut grandparent = Package::new("SPDXRef-gp", "ubi8");
        grandparent.set_marker(BASE_IMAGE_MARKER, "true");
        d.add_package(grandparent);
        d.add_relationship(Relationship::describes("SPDXRef-root"));
        d.add_relationship(Relationship::between(
            "SPDXRef-gp",
            RelationshipType::BuildToolOf,
            "SPDXRef-root",
        ));
        d
    }

    #[test]
    fn test_legacy_translation_flips_the_edge() {
        let outcome = translate_legacy_lineage(&legacy_parent());

        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].rule, RewriteRule::LegacyTranslation);
        assert!(outcome.warnings.is_empty());

        let flipped = outcome
            .document
            .relationships
            .iter()
            .find(|r| r.rel_type == RelationshipType::DescendantOf)
            .expect("lineage edge");
        assert_eq!(flipped.from.package_id(), Some("SPDXRef-root"));
        assert_eq!(flipped.to.package_id(), Some("SPDXRef-gp"));
        assert!(!outcome
            .document
            .has_relationship_of_type(&RelationshipType::BuildToolOf));
    }

    #[test]
    fn test_legacy_translation_is_idempotent() {
        let once = translate_legacy_lineage(&legacy_parent());
        let twice = translate_legacy_lineage(&once.document);

        assert!(twice.applied.is_empty());
        assert_eq!(once.document.content_hash(), twice.document.content_hash());
    }

    #[test]
    fn test_already_contextualized_document_is_untouched() {
        let mut d = legacy_parent();
        d.add_relationship(Relationship::between(
            "SPDXRef-root",
            RelationshipType::DescendantOf,
            "SPDXRef-gp",
        ));

        let outcome = translate_legacy_lineage(&d);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.document.content_hash(), d.content_hash());
    }

    #[test]
    fn test_scratch_parent_skips_silently() {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "scratch-build"));
        d.add_relationship(Relationship::describes("SPDXRef-root"));

        let outcome = translate_legacy_lineage(&d);
        assert!(outcome.applied.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[test]
    fn test_marked_package_with_wrong_shape_warns_and_skips() {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "ubi9"));
        let mut marked = Package::new("SPDXRef-gp", "ubi8");
        marked.set_marker(BASE_IMAGE_MARKER, "true");
        d.add_package(marked);
        d.add_relationship(Relationship::between(
            "SPDXRef-gp",
            RelationshipType::Contains,
            "SPDXRef-root",
        ));

        let outcome = translate_legacy_lineage(&d);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(matches!(
            outcome.warnings[0],
            MergeWarning::LegacyTranslationSkipped { .. }
        ));
        assert_eq!(outcome.document.content_hash(), d.content_hash());
    }

    #[test]
    fn test_other_edges_from_the_marked_package_do_not_block_translation() {
        let mut d = legacy_parent();
        d.add_package(Package::new("SPDXRef-p3", "bash"));
        d.add_relationship(Relationship::between(
            "SPDXRef-gp",
            RelationshipType::Contains,
            "SPDXRef-p3",
        ));

        let outcome = translate_legacy_lineage(&d);

        assert_eq!(outcome.applied.len(), 1);
        assert!(outcome.warnings.is_empty());
        assert!(!outcome
            .document
            .has_relationship_of_type(&RelationshipType::BuildToolOf));
        assert!(outcome.document.relationships.contains(&Relationship::between(
            "SPDXRef-gp",
            RelationshipType::Contains,
            "SPDXRef-p3",
        )));
    }

    #[test]
    fn test_marked_package_with_several_legacy_edges_warns_and_skips() {
        let mut d = legacy_parent();
        d.add_package(Package::new("SPDXRef-other", "other-image"));
        d.add_relationship(Relationship::between(
            "SPDXRef-gp",
            RelationshipType::BuildToolOf,
            "SPDXRef-other",
        ));

        let outcome = translate_legacy_lineage(&d);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_builder_pruning_removes_edge_and_orphaned_package() {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "app"));
        let mut builder = Package::new("SPDXRef-builder", "golang");
        builder.set_marker(BUILDER_IMAGE_MARKER, "0");
        d.add_package(builder);
        d.add_relationship(Relationship::between(
            "SPDXRef-builder",
            RelationshipType::BuildToolOf,
            "SPDXRef-root",
        ));

        let outcome = prune_builder_records(&d);

        assert!(!outcome
            .document
            .has_relationship_of_type(&RelationshipType::BuildToolOf));
        assert!(!outcome.document.packages.contains_key("SPDXRef-builder"));
        assert_eq!(outcome.applied.len(), 2);
    }

    #[test]
    fn test_builder_pruning_keeps_still_referenced_subjects() {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "app"));
        d.add_package(Package::new("SPDXRef-dual", "toolchain"));
        d.add_relationship(Relationship::between(
            "SPDXRef-dual",
            RelationshipType::BuildToolOf,
            "SPDXRef-root",
        ));
        d.add_relationship(Relationship::between(
            "SPDXRef-root",
            RelationshipType::Contains,
            "SPDXRef-dual",
        ));

        let outcome = prune_builder_records(&d);

        assert!(outcome.document.packages.contains_key("SPDXRef-dual"));
        assert!(!outcome
            .document
            .has_relationship_of_type(&RelationshipType::BuildToolOf));
    }

    #[test]
    fn test_builder_pruning_without_builders_is_a_no_op() {
        let mut d = doc();
        d.add_package(Package::new("SPDXRef-root", "app"));
        let outcome = prune_builder_records(&d);
        assert!(outcome.applied.is_empty());
        assert_eq!(outcome.document.content_hash(), d.content_hash());
    }
}
