//! Shared utilities.

mod hash;
mod ids;

pub use hash::{content_hash, sha256_hex};
pub use ids::sanitize_id_component;
