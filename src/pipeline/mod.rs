//! Pipeline orchestration for the CLI.
//!
//! Shared load → merge → write plumbing for the command handlers: parallel
//! input loading, output targets, and the exit-code convention.

mod load;
mod output;

pub use load::{load_document, load_documents};
pub use output::{write_document, write_output, OutputTarget};

use crate::error::SbomMergeError;

/// Exit codes for CI integration
pub mod exit_codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// Usage or input error (bad arguments, unreadable or malformed inputs)
    pub const INPUT_ERROR: i32 = 1;
    /// The merge engine could not produce a consistent document
    pub const ENGINE_ERROR: i32 = 3;
}

/// Map an error to the exit code convention.
///
/// Everything caused by what the caller passed in (unreadable paths, bad
/// flags, malformed or mixed-family documents) is an input error; failures
/// arising inside the transformation itself are engine errors.
#[must_use]
pub fn exit_code_for(error: &SbomMergeError) -> i32 {
    match error {
        SbomMergeError::Io { .. }
        | SbomMergeError::Invalid(_)
        | SbomMergeError::MalformedInput { .. }
        | SbomMergeError::UnsupportedFormat { .. }
        | SbomMergeError::FormatMismatch { .. } => exit_codes::INPUT_ERROR,
        _ => exit_codes::ENGINE_ERROR,
    }
}
