// src/trends/normalize.rs
//! Query normalization and the drop filter applied before anything is collected.

use once_cell::sync::OnceCell;
use regex::Regex;

/// Queries keep at most this many whitespace-separated tokens.
pub const MAX_QUERY_TOKENS: usize = 6;

/// A query is numeric noise when more than this share of its tokens are numeric.
pub const NUMERIC_TOKEN_RATIO: f64 = 0.6;

const GENERIC_TOKENS: [&str; 3] = ["news", "update", "latest"];

fn re_strip() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    // letters (with their combining marks), digits, whitespace and `+ # -` survive
    RE.get_or_init(|| Regex::new(r"[^\p{L}\p{M}\p{N}\s+#-]").unwrap())
}

fn re_personal() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"\b(?:my|me|account|password)\b").unwrap())
}

fn re_numeric_token() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| Regex::new(r"^\d+(?:[./-]\d+)*$").unwrap())
}

/// Normalize a raw candidate: lowercase, strip punctuation except `+ # -`,
/// collapse whitespace and keep the first six tokens.
///
/// Returns an empty string when nothing meaningful is left; callers drop those.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = re_strip().replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .take(MAX_QUERY_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decide whether an already-normalized query is noise.
pub fn should_drop(query: &str) -> bool {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return true;
    }

    if re_personal().is_match(query) {
        return true;
    }

    let numeric = tokens
        .iter()
        .filter(|t| re_numeric_token().is_match(t))
        .count();
    if numeric as f64 / tokens.len() as f64 > NUMERIC_TOKEN_RATIO {
        return true;
    }

    tokens.iter().all(|t| GENERIC_TOKENS.contains(t))
}
