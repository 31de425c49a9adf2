//! Name normalization for cross-tenant path matching.
//!
//! Some migration tools replace characters that are illegal on the target with
//! `_`. Normalizing both sides the same way lets `My*File.docx` at the source
//! match `My_File.docx` at the target.

use crate::config::{NORMALIZATION_REPLACEMENT, NORMALIZED_CHARACTERS};

/// Maps a remote-reported path to its comparison key.
///
/// Every character in [`NORMALIZED_CHARACTERS`] becomes `_`; everything else,
/// including case, is preserved.
pub fn normalize(path: &str) -> String {
    path.chars()
        .map(|c| {
            if NORMALIZED_CHARACTERS.contains(&c) {
                NORMALIZATION_REPLACEMENT
            } else {
                c
            }
        })
        .collect()
}

/// Comparison key for a path under the configured policy.
pub fn comparison_key(path: &str, use_normalization: bool) -> String {
    if use_normalization {
        normalize(path)
    } else {
        path.to_string()
    }
}
