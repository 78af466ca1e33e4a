//! Inspect command handler.
//!
//! Implements the `inspect` subcommand: a detection report for one file,
//! for checking what the merge would make of it before running it.

use crate::error::{Result, SbomMergeError};
use crate::model::SourceLabel;
use crate::parsers::{FormatDetector, MIN_CONFIDENCE_THRESHOLD};
use crate::pipeline::{write_output, OutputTarget};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Configuration for the inspect command
#[derive(Debug)]
pub struct InspectConfig {
    /// File to inspect
    pub input: PathBuf,
    /// Output path, stdout when absent
    pub output: Option<PathBuf>,
}

/// Run the inspect command.
pub fn run_inspect(config: InspectConfig) -> Result<()> {
    let content = std::fs::read_to_string(&config.input)
        .map_err(|e| SbomMergeError::io(config.input.clone(), e))?;

    let detector = FormatDetector::new();
    let detection = detector.detect(&content);

    let mut report = String::new();
    let _ = writeln!(report, "file:        {}", config.input.display());
    match detection.format {
        Some(format) => {
            let _ = writeln!(report, "format:      {format}");
        }
        None => {
            let _ = writeln!(report, "format:      unknown");
        }
    }
    if let Some(variant) = &detection.variant {
        let _ = writeln!(report, "variant:     {variant}");
    }
    if let Some(version) = &detection.version {
        let _ = writeln!(report, "version:     {version}");
    }
    let _ = writeln!(
        report,
        "confidence:  {} ({:.2})",
        confidence_label(detection.confidence.value()),
        detection.confidence.value()
    );
    for warning in &detection.warnings {
        let _ = writeln!(report, "warning:     {warning}");
    }

    if !detection.can_parse() {
        write_output(&report, &OutputTarget::from_option(config.output))?;
        return Err(SbomMergeError::unknown_format(
            SourceLabel::new(0, config.input.display().to_string()).to_string(),
        ));
    }

    let label = config
        .input
        .file_name()
        .map_or_else(|| config.input.display().to_string(), |n| n.to_string_lossy().into_owned());
    let document = detector.parse_str(&content, SourceLabel::new(0, label))?;

    let _ = writeln!(report, "packages:    {}", document.package_count());
    let _ = writeln!(report, "edges:       {}", document.relationship_count());
    match document.root_package() {
        Some(root) => {
            let spelled = match &root.version {
                Some(version) => format!("{}@{version}", root.name),
                None => root.name.clone(),
            };
            let _ = writeln!(report, "root:        {spelled} ({})", root.local_id);
        }
        None => {
            let _ = writeln!(report, "root:        (none declared)");
        }
    }

    write_output(&report, &OutputTarget::from_option(config.output))
}

fn confidence_label(value: f32) -> &'static str {
    if value >= 1.0 {
        "certain"
    } else if value >= 0.75 {
        "high"
    } else if value >= 0.5 {
        "medium"
    } else if value >= MIN_CONFIDENCE_THRESHOLD {
        "low"
    } else {
        "none"
    }
}
