//! CLI command handlers.
//!
//! This module provides testable command handlers that are invoked by
//! main.rs. Each handler implements the business logic for a specific
//! CLI subcommand.

mod index;
mod inspect;
mod merge;

pub use index::{run_index, IndexConfig};
pub use inspect::{run_inspect, InspectConfig};
pub use merge::{run_merge, MergeConfig};
