//! Content hashing utilities.

use sha2::{Digest, Sha256};
use xxhash_rust::xxh3::xxh3_64;

/// Compute a content hash for arbitrary bytes
pub fn content_hash(data: &[u8]) -> u64 {
    xxh3_64(data)
}

/// Lowercase hex SHA-256 digest of arbitrary bytes.
///
/// Used for the stable suffix of merged element identifiers, where the
/// digest must survive re-serialization across tools and languages.
pub fn sha256_hex(data: &[u8]) -> String {
    use std::fmt::Write;

    let digest = Sha256::digest(data);
    let mut out = String::with_capacity(64);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}
