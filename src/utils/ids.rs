//! Element identifier helpers.

use regex::Regex;
use std::sync::LazyLock;

/// Sanitize a name for embedding in an SPDX element identifier.
///
/// SPDX idstrings only allow letters, digits, `.` and `-`. Runs of any
/// other character (registry slashes, colons, `@` in scoped names)
/// collapse to a single `-`.
pub fn sanitize_id_component(raw: &str) -> String {
    static INVALID: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^A-Za-z0-9.\-]+").expect("static regex"));

    let cleaned = INVALID.replace_all(raw, "-");
    cleaned.trim_matches('-').to_string()
}
