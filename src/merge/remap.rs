//! Namespace remapping: local identifiers to global identifiers.
//!
//! Every package in a document is translated, including the root and
//! structurally unreferenced packages. Edges are rewritten through the
//! translation map; an edge whose endpoint is absent from the package set
//! is dropped and reported rather than carried into the merged graph.
//! Input DESCRIBES edges are stripped here; the assembler re-emits
//! exactly one.

use super::allocator::GlobalIdAllocator;
use super::diagnostics::MergeWarning;
use crate::model::{Document, IdentityResolver, NodeRef, Package, Relationship, RelationshipType};
use indexmap::IndexMap;

/// A document translated into the run-wide global namespace.
#[derive(Debug)]
pub struct RemappedDocument {
    /// Packages in source order; `local_id` now holds the global id
    pub packages: Vec<Package>,
    /// Translated edges, in source order, DESCRIBES stripped
    pub relationships: Vec<Relationship>,
    /// Global id of the document's root, if its describes pointer resolved
    pub root: Option<String>,
    /// Dangling-reference warnings for dropped edges
    pub warnings: Vec<MergeWarning>,
}

/// Remap a document with one resolver for every package.
pub fn remap_document(
    document: &Document,
    resolver: &IdentityResolver,
    allocator: &mut GlobalIdAllocator,
) -> RemappedDocument {
    remap(document, resolver, None, allocator)
}

/// Remap a document using a separate resolver for its root package.
///
/// The index composer resolves per-arch roots architecture-significantly
/// (two arch variants of the same image are different artifacts) while
/// ordinary packages stay architecture-insignificant so they collapse
/// across architectures.
pub fn remap_document_for_index(
    document: &Document,
    resolver: &IdentityResolver,
    root_resolver: &IdentityResolver,
    allocator: &mut GlobalIdAllocator,
) -> RemappedDocument {
    remap(document, resolver, Some(root_resolver), allocator)
}

fn remap(
    document: &Document,
    resolver: &IdentityResolver,
    root_resolver: Option<&IdentityResolver>,
    allocator: &mut GlobalIdAllocator,
) -> RemappedDocument {
    let root_local = document.describes_target();

    let mut translation: IndexMap<&str, String> = IndexMap::with_capacity(document.packages.len());
    let mut packages = Vec::with_capacity(document.packages.len());

    for (local_id, package) in &document.packages {
        let effective = match root_resolver {
            Some(r) if root_local == Some(local_id.as_str()) => r,
            _ => resolver,
        };
        let identity = effective.identity(package);
        let global_id = allocator.allocate(&identity, &package.name);

        let mut translated = package.clone();
        translated.local_id = global_id.clone();
        packages.push(translated);
        translation.insert(local_id.as_str(), global_id);
    }

    let mut relationships = Vec::with_capacity(document.relationships.len());
    let mut warnings = Vec::new();

    for relationship in &document.relationships {
        if relationship.rel_type == RelationshipType::Describes {
            continue;
        }
        match (
            translate_node(&relationship.from, &translation),
            translate_node(&relationship.to, &translation),
        ) {
            (Some(from), Some(to)) => {
                relationships.push(Relationship::new(from, relationship.rel_type.clone(), to));
            }
            (from, _) => {
                // Report the input document's own identifier spelling.
                let missing = if from.is_none() {
                    relationship.from.as_str()
                } else {
                    relationship.to.as_str()
                };
                warnings.push(MergeWarning::DanglingReference {
                    source: document.source.to_string(),
                    from: relationship.from.as_str().to_string(),
                    rel_type: relationship.rel_type.to_string(),
                    to: relationship.to.as_str().to_string(),
                    missing: missing.to_string(),
                });
            }
        }
    }

    let root = root_local.and_then(|local| translation.get(local)).cloned();

    RemappedDocument {
        packages,
        relationships,
        root,
        warnings,
    }
}

fn translate_node(node: &NodeRef, translation: &IndexMap<&str, String>) -> Option<NodeRef> {
    match node {
        NodeRef::Document => Some(NodeRef::Document),
        NodeRef::Package(local) => translation
            .get(local.as_str())
            .map(|global| NodeRef::Package(global.clone())),
    }
}
