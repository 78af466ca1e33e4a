//! Unified error types for sbom-merge.
//!
//! Fatal merge errors always name the input document that triggered them
//! (by position and source label), since the caller maps failures back to
//! the CI step that produced that document.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sbom-merge operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SbomMergeError {
    /// Input bytes are not valid structured data for any supported family.
    #[error("Malformed input in {source_label}: {source}")]
    MalformedInput {
        source_label: String,
        #[source]
        source: MalformedKind,
    },

    /// Recognized family or encoding, but a version/encoding we do not handle.
    #[error("Unsupported format in {source_label}: {family} {version} (supported: {supported})")]
    UnsupportedFormat {
        source_label: String,
        family: String,
        version: String,
        supported: String,
    },

    /// Inputs mix SPDX and CycloneDX; cross-family translation is not attempted.
    #[error("Format mismatch: {source_label} is {found}, earlier inputs are {expected}")]
    FormatMismatch {
        expected: String,
        found: String,
        source_label: String,
    },

    /// No input document supplies a resolvable DESCRIBES root.
    #[error("No root candidate in {source_label}: {reason}")]
    NoRootCandidate {
        source_label: String,
        reason: String,
    },

    /// Errors while writing a merged document back out.
    #[error("Serialization failed: {context}")]
    Serialize {
        context: String,
        #[source]
        source: SerializeErrorKind,
    },

    /// IO errors with path context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Caller contract violations (empty input set, unknown label, bad selector)
    #[error("Invalid input: {0}")]
    Invalid(String),
}

/// Specific malformed-input kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum MalformedKind {
    #[error("Unknown SBOM format - expected CycloneDX or SPDX markers")]
    UnknownFormat,

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Missing required field: {field} in {context}")]
    MissingField { field: String, context: String },

    #[error("Invalid field value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Specific serialization error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SerializeErrorKind {
    #[error("JSON serialization failed: {0}")]
    Json(String),

    #[error("Document cannot be expressed as {family}: {reason}")]
    Unrepresentable { family: String, reason: String },
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for sbom-merge operations
pub type Result<T> = std::result::Result<T, SbomMergeError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl SbomMergeError {
    /// Create a malformed-input error tied to a source document
    pub fn malformed(source_label: impl Into<String>, source: MalformedKind) -> Self {
        Self::MalformedInput {
            source_label: source_label.into(),
            source,
        }
    }

    /// Create a malformed-input error for unknown format markers
    pub fn unknown_format(source_label: impl Into<String>) -> Self {
        Self::malformed(source_label, MalformedKind::UnknownFormat)
    }

    /// Create a malformed-input error for a missing required field
    pub fn missing_field(
        source_label: impl Into<String>,
        field: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self::malformed(
            source_label,
            MalformedKind::MissingField {
                field: field.into(),
                context: context.into(),
            },
        )
    }

    /// Create an unsupported-format error
    pub fn unsupported_format(
        source_label: impl Into<String>,
        family: impl Into<String>,
        version: impl Into<String>,
        supported: impl Into<String>,
    ) -> Self {
        Self::UnsupportedFormat {
            source_label: source_label.into(),
            family: family.into(),
            version: version.into(),
            supported: supported.into(),
        }
    }

    /// Create a format-mismatch error
    pub fn format_mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        source_label: impl Into<String>,
    ) -> Self {
        Self::FormatMismatch {
            expected: expected.into(),
            found: found.into(),
            source_label: source_label.into(),
        }
    }

    /// Create a no-root-candidate error
    pub fn no_root(source_label: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::NoRootCandidate {
            source_label: source_label.into(),
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialize(context: impl Into<String>, source: SerializeErrorKind) -> Self {
        Self::Serialize {
            context: context.into(),
            source,
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create an invalid-input error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for SbomMergeError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// The added context is prepended to the error's existing leading string,
/// creating a chain that shows the path through the code.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure (lazy evaluation).
    ///
    /// The closure is only called if the result is an error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<SbomMergeError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with the variant's leading string.
fn add_context_to_error(err: SbomMergeError, new_ctx: &str) -> SbomMergeError {
    match err {
        SbomMergeError::MalformedInput {
            source_label,
            source,
        } => SbomMergeError::MalformedInput {
            source_label: chain_context(new_ctx, &source_label),
            source,
        },
        SbomMergeError::UnsupportedFormat {
            source_label,
            family,
            version,
            supported,
        } => SbomMergeError::UnsupportedFormat {
            source_label: chain_context(new_ctx, &source_label),
            family,
            version,
            supported,
        },
        SbomMergeError::FormatMismatch {
            expected,
            found,
            source_label,
        } => SbomMergeError::FormatMismatch {
            expected,
            found,
            source_label: chain_context(new_ctx, &source_label),
        },
        SbomMergeError::NoRootCandidate {
            source_label,
            reason,
        } => SbomMergeError::NoRootCandidate {
            source_label: chain_context(new_ctx, &source_label),
            reason,
        },
        SbomMergeError::Serialize { context, source } => SbomMergeError::Serialize {
            context: chain_context(new_ctx, &context),
            source,
        },
        SbomMergeError::Io {
            path,
            message,
            source,
        } => SbomMergeError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        SbomMergeError::Invalid(msg) => SbomMergeError::Invalid(chain_context(new_ctx, &msg)),
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to an error with the given context.
    fn context_none(self, context: impl Into<String>) -> Result<T>;

    /// Convert None to an error with context from a closure.
    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T> OptionContext<T> for Option<T> {
    fn context_none(self, context: impl Into<String>) -> Result<T> {
        self.ok_or_else(|| SbomMergeError::Invalid(context.into()))
    }

    fn with_context_none<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.ok_or_else(|| SbomMergeError::Invalid(f().into()))
    }
}
