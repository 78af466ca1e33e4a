//! Global identifier allocation.
//!
//! One allocation table per merge run, keyed by canonical identity. The
//! first time an identity is seen it gets a fresh global id; every later
//! occurrence reuses it, which is what collapses equal packages from
//! different inputs onto one node. First-seen order is preserved and is a
//! caller-visible determinism contract.

use crate::model::CanonicalIdentity;
use crate::utils::{sanitize_id_component, sha256_hex};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Allocates stable global identifiers for canonical identities.
#[derive(Debug, Default)]
pub struct GlobalIdAllocator {
    /// identity -> global id, in first-seen order
    table: IndexMap<CanonicalIdentity, String>,
    /// Forced unifications: identity -> already-allocated global id.
    /// Aliases are consulted before the table, so an aliased identity can
    /// never allocate a fresh id.
    aliases: HashMap<CanonicalIdentity, String>,
}

impl GlobalIdAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Global id for an identity, allocating on first sight.
    ///
    /// The display name is embedded in the id text for readability; it
    /// plays no part in uniqueness, which comes from the identity digest.
    pub fn allocate(&mut self, identity: &CanonicalIdentity, display_name: &str) -> String {
        if let Some(id) = self.aliases.get(identity) {
            return id.clone();
        }
        if let Some(id) = self.table.get(identity) {
            return id.clone();
        }
        let id = global_id(display_name, identity);
        self.table.insert(identity.clone(), id.clone());
        id
    }

    /// Global id for an identity, if one was already allocated or aliased
    #[must_use]
    pub fn lookup(&self, identity: &CanonicalIdentity) -> Option<&str> {
        self.aliases
            .get(identity)
            .or_else(|| self.table.get(identity))
            .map(String::as_str)
    }

    /// Force an identity onto an existing global id.
    ///
    /// Used by self-reference disambiguation: the parent document's root
    /// identity is pinned to the global id the component document already
    /// uses for that image, so the parent's internal edges land on the
    /// same node.
    pub fn add_alias(&mut self, identity: CanonicalIdentity, global_id: impl Into<String>) {
        let global_id = global_id.into();
        tracing::debug!(identity = %identity, global_id = %global_id, "identity aliased");
        self.aliases.insert(identity, global_id);
    }

    /// Number of distinct identities allocated (aliases not counted)
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Build the global id text for an identity.
///
/// `SPDXRef-<name>-<digest>` where the name is sanitized to the SPDX
/// idstring alphabet and the digest is the sha256 of the identity value.
/// The same identity always yields the same text.
#[must_use]
pub fn global_id(display_name: &str, identity: &CanonicalIdentity) -> String {
    let mut name = sanitize_id_component(display_name);
    if name.is_empty() {
        name = "Package".to_string();
    }
    format!(
        "SPDXRef-{name}-{}",
        sha256_hex(identity.value().as_bytes())
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(purl: &str) -> CanonicalIdentity {
        CanonicalIdentity::from_purl(purl).expect("purl")
    }

    #[test]
    fn test_first_seen_wins() {
        let mut allocator = GlobalIdAllocator::new();
        let id = identity("pkg:rpm/redhat/openssl@3.0.7");

        let first = allocator.allocate(&id, "openssl");
        let second = allocator.allocate(&id, "openssl-different-display");

        assert_eq!(first, second, "later occurrences reuse the first id");
        assert_eq!(allocator.len(), 1);
    }

    #[test]
    fn test_distinct_identities_get_distinct_ids() {
        let mut allocator = GlobalIdAllocator::new();
        let a = allocator.allocate(&identity("pkg:rpm/redhat/openssl@3.0.7"), "openssl");
        let b = allocator.allocate(&identity("pkg:rpm/redhat/zlib@1.2.13"), "zlib");
        assert_ne!(a, b);
        assert_eq!(allocator.len(), 2);
    }

    #[test]
    fn test_id_text_is_deterministic_and_sanitized() {
        let id = identity("pkg:oci/app@sha256:abc");
        let a = global_id("registry.io/team/app:1.0", &id);
        let b = global_id("registry.io/team/app:1.0", &id);
        assert_eq!(a, b);
        assert!(a.starts_with("SPDXRef-registry.io-team-app-1.0-"));
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'));
    }

    #[test]
    fn test_empty_display_name_falls_back() {
        let id = identity("pkg:generic/x@1");
        assert!(global_id("???", &id).starts_with("SPDXRef-Package-"));
    }

    #[test]
    fn test_alias_redirects_allocation() {
        let mut allocator = GlobalIdAllocator::new();
        let component_view = identity("pkg:oci/ubi9@sha256:aaa");
        let parent_view = identity("pkg:oci/ubi@sha256:bbb");

        let target = allocator.allocate(&component_view, "ubi9");
        allocator.add_alias(parent_view.clone(), target.clone());

        assert_eq!(allocator.allocate(&parent_view, "ubi"), target);
        assert_eq!(allocator.lookup(&parent_view), Some(target.as_str()));
        assert_eq!(allocator.len(), 1, "aliases never allocate");
    }
}
