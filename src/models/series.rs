//! Series model and slug helpers.

use serde::{Deserialize, Serialize};

/// Bounds on accepted slug length, in characters.
pub const SLUG_MIN_LEN: usize = 2;
pub const SLUG_MAX_LEN: usize = 40;

/// A named collection of quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Internal surrogate key
    pub id: i64,
    /// External identifier, lowercase and dash-separated
    pub slug: String,
    /// Display name
    pub name: String,
}

/// Trim and lowercase a slug taken from external input.
pub fn normalize_slug(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Whether `slug` matches `[a-z0-9-]{2,40}`.
pub fn is_valid_slug(slug: &str) -> bool {
    (SLUG_MIN_LEN..=SLUG_MAX_LEN).contains(&slug.len())
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Title-cased display name derived from a slug: `murder-drones` -> `Murder Drones`.
pub fn humanize_slug(slug: &str) -> String {
    slug.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
