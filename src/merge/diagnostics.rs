//! Structured diagnostics accumulated during a merge.
//!
//! Recovered conditions (dropped edges, skipped rule applications) never
//! fail the merge; they are recorded here so callers can surface them or
//! fail their own pipelines on policy.

use super::rewrite::AppliedRule;
use std::fmt;

/// A recovered, non-fatal condition observed during merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeWarning {
    /// A relationship endpoint was absent from the merged package set;
    /// the edge was dropped.
    DanglingReference {
        /// Which input document carried the edge
        source: String,
        from: String,
        rel_type: String,
        to: String,
        /// The endpoint that failed to resolve
        missing: String,
    },
    /// A base-image-marked package did not match the legacy lineage shape,
    /// so no translation was attempted.
    LegacyTranslationSkipped {
        source: String,
        package: String,
        reason: String,
    },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference {
                source,
                from,
                rel_type,
                to,
                missing,
            } => write!(
                f,
                "dropped {rel_type} edge {from} -> {to}: {missing} is not in the package set ({source})"
            ),
            Self::LegacyTranslationSkipped {
                source,
                package,
                reason,
            } => write!(
                f,
                "legacy lineage translation skipped for {package}: {reason} ({source})"
            ),
        }
    }
}

/// Everything a merge wants to tell the caller besides the document itself.
#[derive(Debug, Clone, Default)]
pub struct MergeDiagnostics {
    /// Recovered conditions, in the order they were observed
    pub warnings: Vec<MergeWarning>,
    /// Rewrite rule applications, in the order they fired
    pub applied_rules: Vec<AppliedRule>,
    /// Number of input documents
    pub input_documents: usize,
    /// Packages in the merged output
    pub merged_packages: usize,
    /// Identity collisions folded during union
    pub deduplicated_packages: usize,
    /// Edges dropped (dangling references)
    pub dropped_relationships: usize,
}

impl MergeDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recovered condition
    pub fn warn(&mut self, warning: MergeWarning) {
        tracing::warn!(warning = %warning, "merge warning");
        if matches!(warning, MergeWarning::DanglingReference { .. }) {
            self.dropped_relationships += 1;
        }
        self.warnings.push(warning);
    }

    /// Record a rewrite rule application
    pub fn record(&mut self, rule: AppliedRule) {
        tracing::debug!(rule = %rule.rule, detail = %rule.detail, "rewrite rule applied");
        self.applied_rules.push(rule);
    }

    /// Absorb the records of another diagnostics value, preserving order
    pub fn absorb(&mut self, other: MergeDiagnostics) {
        for warning in other.warnings {
            self.warn(warning);
        }
        self.applied_rules.extend(other.applied_rules);
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
