//! sbom-merge: SBOM graph merge and contextualization tool
//!
//! Merges per-stage, per-parent-image, and per-architecture SBOMs into one
//! consistent document, for `CycloneDX` and SPDX formats.

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sbom_merge::model::SbomFormat;
use sbom_merge::pipeline::{exit_code_for, exit_codes};
use sbom_merge::{cli, error::Result};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Build long version string with format support info
const fn build_long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\nSupported SBOM Formats:",
        "\n  CycloneDX: 1.4, 1.5, 1.6 (JSON)",
        "\n  SPDX:      2.2, 2.3 (JSON)",
        "\n\nFeatures:",
        "\n  Contextual merge, lineage rewriting, multi-arch index composition"
    )
}

#[derive(Parser)]
#[command(name = "sbom-merge")]
#[command(version, long_version = build_long_version())]
#[command(about = "SBOM graph merge and contextualization tool", long_about = None)]
#[command(after_help = "EXIT CODES:
    0  Success
    1  Usage or input error
    3  Merge engine error

EXAMPLES:
    # Contextualize a component SBOM with its parent image SBOMs
    sbom-merge merge component.spdx.json parent.spdx.json -o merged.spdx.json

    # Same, emitting CycloneDX regardless of input family
    sbom-merge merge component.cdx.json parent.cdx.json --format cyclonedx

    # Compose a multi-arch index SBOM from per-arch documents
    sbom-merge index \\
        --arch x86_64=sha256:aaa...=app-amd64.spdx.json \\
        --arch aarch64=sha256:bbb...=app-arm64.spdx.json \\
        --name registry.io/team/app:1.0 --digest sha256:ccc... \\
        -o index.spdx.json

    # Report what a file detects as
    sbom-merge inspect scan.json")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Arguments for the `merge` subcommand
#[derive(Parser)]
struct MergeArgs {
    /// Input SBOMs in merge order: the component document first, then its
    /// parent image documents in base-image order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format family (defaults to the family of the inputs)
    #[arg(long, value_enum)]
    format: Option<SbomFormat>,

    /// Take the merged root from the input with this file name instead of
    /// the first input
    #[arg(long, value_name = "LABEL")]
    root_label: Option<String>,
}

/// Arguments for the `index` subcommand
#[derive(Parser)]
struct IndexArgs {
    /// Per-architecture document, as ARCH=FILE or ARCH=DIGEST=FILE.
    /// Repeat once per architecture.
    #[arg(long = "arch", value_name = "SPEC", required = true)]
    arch: Vec<String>,

    /// Image reference the index describes (registry.io/ns/app:tag)
    #[arg(long)]
    name: String,

    /// Manifest list digest (sha256:...)
    #[arg(long)]
    digest: String,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format family (defaults to the family of the inputs)
    #[arg(long, value_enum)]
    format: Option<SbomFormat>,
}

/// Arguments for the `inspect` subcommand
#[derive(Parser)]
struct InspectArgs {
    /// SBOM file to inspect
    input: PathBuf,

    /// Output file path (stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a component SBOM with its parent SBOMs (ordered contextual merge)
    Merge(MergeArgs),

    /// Compose per-architecture SBOMs into a multi-arch index SBOM
    Index(IndexArgs),

    /// Report detected format, confidence, and graph shape of one file
    Inspect(InspectArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders help/version on stdout, usage errors on stderr
            let is_usage_error = e.use_stderr();
            let _ = e.print();
            std::process::exit(if is_usage_error {
                exit_codes::INPUT_ERROR
            } else {
                exit_codes::SUCCESS
            });
        }
    };

    // Initialize logging
    let log_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    if let Err(error) = run(cli.command) {
        tracing::error!("{error}");
        std::process::exit(exit_code_for(&error));
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Merge(args) => cli::run_merge(cli::MergeConfig {
            inputs: args.inputs,
            output: args.output,
            format: args.format,
            root_label: args.root_label,
        }),

        Commands::Index(args) => cli::run_index(cli::IndexConfig {
            arch_specs: args.arch,
            name: args.name,
            digest: args.digest,
            output: args.output,
            format: args.format,
        }),

        Commands::Inspect(args) => cli::run_inspect(cli::InspectConfig {
            input: args.input,
            output: args.output,
        }),

        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sbom-merge", &mut io::stdout());
            Ok(())
        }
    }
}
