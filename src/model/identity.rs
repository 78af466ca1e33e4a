//! Canonical identities for cross-document package matching.
//!
//! Two packages from independently generated documents with the same
//! canonical identity are the same real-world artifact and collapse to one
//! node in merged output. Resolution is purl-first: the purl is parsed,
//! stripped of qualifiers and subpath, and folded with ecosystem-specific
//! rules so cosmetically different spellings collide. Packages without a
//! usable purl fall back to (type, name, version).
//!
//! Identity is a pure function of package attributes; nothing here looks
//! at local identifiers or pointer equality.

use super::Package;
use packageurl::PackageUrl;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Canonical identity of a package.
///
/// Equality and hashing consider only the normalized value, so identities
/// from different resolution paths compare naturally.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct CanonicalIdentity {
    /// The normalized identity string
    value: String,
    /// How the identity was derived
    source: IdentitySource,
}

/// How a canonical identity was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentitySource {
    /// From a well-formed purl (most reliable)
    Purl,
    /// From the (type, name, version) tuple
    NameVersion,
}

impl CanonicalIdentity {
    /// Derive an identity from a purl string.
    ///
    /// Returns `None` when the purl does not parse; callers fall back to
    /// [`CanonicalIdentity::from_name_version_type`].
    #[must_use]
    pub fn from_purl(purl: &str) -> Option<Self> {
        canonicalize_purl(purl).map(|value| Self {
            value,
            source: IdentitySource::Purl,
        })
    }

    /// Derive an identity from the name/version/type tuple
    #[must_use]
    pub fn from_name_version_type(
        name: &str,
        version: Option<&str>,
        package_type: Option<&str>,
    ) -> Self {
        let ptype = package_type.unwrap_or("unknown").to_lowercase();
        let name = name.to_lowercase();
        let value = match version {
            Some(v) => format!("{ptype}:{name}@{}", v.to_lowercase()),
            None => format!("{ptype}:{name}"),
        };
        Self {
            value,
            source: IdentitySource::NameVersion,
        }
    }

    /// Return this identity with the architecture joined into the key.
    ///
    /// Used in architecture-significant mode so equal name/version packages
    /// built for different architectures stay distinct.
    #[must_use]
    pub fn with_architecture(self, architecture: &str) -> Self {
        Self {
            value: format!("{}#{architecture}", self.value),
            source: self.source,
        }
    }

    /// The normalized identity string
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// How the identity was derived
    #[must_use]
    pub fn source(&self) -> IdentitySource {
        self.source
    }
}

impl PartialEq for CanonicalIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Hash for CanonicalIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl fmt::Display for CanonicalIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Resolves canonical identities for packages, parameterized by the
/// architecture-significance the caller needs.
///
/// The Merge Assembler uses [`IdentityResolver::standard`]; the Index
/// Composer creates one resolver per input document via
/// [`IdentityResolver::architecture_significant`] with that document's
/// normalized architecture.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    architecture: Option<String>,
}

impl IdentityResolver {
    /// Architecture-insignificant resolution
    #[must_use]
    pub const fn standard() -> Self {
        Self { architecture: None }
    }

    /// Architecture-significant resolution for one input architecture
    #[must_use]
    pub fn architecture_significant(architecture: impl Into<String>) -> Self {
        Self {
            architecture: Some(architecture.into()),
        }
    }

    /// Compute the canonical identity of a package
    #[must_use]
    pub fn identity(&self, package: &Package) -> CanonicalIdentity {
        let base = package
            .purl
            .as_deref()
            .and_then(CanonicalIdentity::from_purl)
            .unwrap_or_else(|| {
                CanonicalIdentity::from_name_version_type(
                    &package.name,
                    package.version.as_deref(),
                    package.package_type.as_deref(),
                )
            });

        match &self.architecture {
            Some(arch) => base.with_architecture(arch),
            None => base,
        }
    }
}

/// Canonicalize a purl string into an identity value.
///
/// Parsing percent-decodes namespace, name, and version (so npm `%40scope`
/// and golang `%2Bincompatible` spellings converge). Qualifiers and
/// subpath are dropped: independently generated documents disagree on
/// `arch=`/`repository_url=` noise, and version-bearing subpaths do not
/// split identity.
#[must_use]
pub fn canonicalize_purl(raw: &str) -> Option<String> {
    let purl = PackageUrl::from_str(raw).ok()?;

    let ptype = purl.ty().to_lowercase();
    let namespace = purl.namespace().map(ToString::to_string);
    let name = purl.name().to_string();
    let version = purl.version().map(ToString::to_string);

    let (namespace, name, version) = fold_ecosystem(&ptype, namespace, name, version);

    let mut value = format!("pkg:{ptype}");
    if let Some(ns) = namespace {
        value.push('/');
        value.push_str(&ns);
    }
    value.push('/');
    value.push_str(&name);
    if let Some(v) = version {
        value.push('@');
        value.push_str(&v);
    }
    Some(value)
}

/// Ecosystem-specific case and separator folding.
///
/// pypi treats `-`, `_`, `.` as equivalent separators; cargo treats `-`
/// and `_` as equivalent; npm and nuget names are case-insensitive; maven
/// and golang are case-sensitive and pass through unchanged.
fn fold_ecosystem(
    ptype: &str,
    namespace: Option<String>,
    name: String,
    version: Option<String>,
) -> (Option<String>, String, Option<String>) {
    match ptype {
        "pypi" => (
            namespace,
            name.to_lowercase().replace(['_', '.'], "-"),
            version.map(|v| v.to_lowercase()),
        ),
        "npm" => (
            namespace.map(|ns| ns.to_lowercase()),
            name.to_lowercase(),
            version.map(|v| v.to_lowercase()),
        ),
        "cargo" => (
            namespace,
            name.to_lowercase().replace('-', "_"),
            version.map(|v| v.to_lowercase()),
        ),
        "nuget" => (
            namespace,
            name.to_lowercase(),
            version.map(|v| v.to_lowercase()),
        ),
        "golang" | "maven" => (namespace, name, version),
        _ => (
            namespace.map(|ns| ns.to_lowercase()),
            name.to_lowercase(),
            version.map(|v| v.to_lowercase()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pypi_separator_folding() {
        let a = canonicalize_purl("pkg:pypi/python-dateutil@2.8.2").expect("purl");
        let b = canonicalize_purl("pkg:pypi/Python_Dateutil@2.8.2").expect("purl");
        assert_eq!(a, b);
    }

    #[test]
    fn test_qualifiers_and_subpath_do_not_split_identity() {
        let bare = canonicalize_purl("pkg:rpm/redhat/openssl@3.0.7-18.el9").expect("purl");
        let qualified =
            canonicalize_purl("pkg:rpm/redhat/openssl@3.0.7-18.el9?arch=x86_64&distro=rhel-9.2")
                .expect("purl");
        assert_eq!(bare, qualified);

        let with_subpath =
            canonicalize_purl("pkg:golang/github.com/foo/bar@v1.0.0#cmd/bar").expect("purl");
        let without = canonicalize_purl("pkg:golang/github.com/foo/bar@v1.0.0").expect("purl");
        assert_eq!(with_subpath, without);
    }

    #[test]
    fn test_npm_scope_decoding() {
        let encoded = canonicalize_purl("pkg:npm/%40Angular/Core@15.0.0").expect("purl");
        let folded = canonicalize_purl("pkg:npm/%40angular/core@15.0.0").expect("purl");
        assert_eq!(encoded, folded);
    }

    #[test]
    fn test_golang_preserves_case_and_decodes_version() {
        let plus = canonicalize_purl("pkg:golang/github.com/foo/Bar@v2.0.0%2Bincompatible")
            .expect("purl");
        let decoded =
            canonicalize_purl("pkg:golang/github.com/foo/Bar@v2.0.0+incompatible").expect("purl");
        assert_eq!(plus, decoded);
        assert!(plus.contains("Bar"), "golang names keep their case: {plus}");
    }

    #[test]
    fn test_malformed_purl_is_rejected() {
        assert!(canonicalize_purl("not-a-purl").is_none());
        assert!(CanonicalIdentity::from_purl("://").is_none());
    }

    #[test]
    fn test_name_version_fallback() {
        let id = CanonicalIdentity::from_name_version_type("OpenSSL", Some("3.0.7"), None);
        assert_eq!(id.value(), "unknown:openssl@3.0.7");
        assert_eq!(id.source(), IdentitySource::NameVersion);

        let typed =
            CanonicalIdentity::from_name_version_type("ubi9", Some("9.3"), Some("container"));
        assert_eq!(typed.value(), "container:ubi9@9.3");
    }

    #[test]
    fn test_purl_and_fallback_identities_compare_by_value_only() {
        let a = CanonicalIdentity::from_purl("pkg:pypi/requests@2.31.0").expect("purl");
        let b = CanonicalIdentity::from_purl("pkg:pypi/Requests@2.31.0").expect("purl");
        assert_eq!(a, b);

        let c = CanonicalIdentity::from_name_version_type("requests", Some("2.31.0"), None);
        assert_ne!(a, c, "fallback identities use a different namespace");
    }

    #[test]
    fn test_architecture_significant_mode() {
        let package = {
            let mut p = Package::new("SPDXRef-x", "openssl");
            p.purl = Some("pkg:rpm/redhat/openssl@3.0.7-18.el9".to_string());
            p
        };

        let plain = IdentityResolver::standard().identity(&package);
        let amd = IdentityResolver::architecture_significant("amd64").identity(&package);
        let arm = IdentityResolver::architecture_significant("arm64").identity(&package);

        assert_ne!(plain, amd);
        assert_ne!(amd, arm);
        assert!(amd.value().ends_with("#amd64"));
    }
}
