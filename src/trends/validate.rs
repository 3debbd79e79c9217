// src/trends/validate.rs
//! Post-condition checks on the aggregator output. A failure here is a logic
//! defect in the aggregator, never a property of the input.

use std::collections::HashSet;

use super::scoring::MAX_ITEMS;
use super::types::{SourceType, TrendItem};
use crate::error::{Result, TrendError};

pub const MAX_REASON_WORDS: usize = 12;

pub fn validate_items(items: &[TrendItem]) -> Result<()> {
    if items.len() > MAX_ITEMS {
        return Err(TrendError::invariant(
            "",
            format!("{} items exceeds cap of {MAX_ITEMS}", items.len()),
        ));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(items.len());
    for it in items {
        validate_item(it)?;
        if !seen.insert(it.query.as_str()) {
            return Err(TrendError::invariant(&it.query, "duplicate query"));
        }
    }
    Ok(())
}

fn validate_item(it: &TrendItem) -> Result<()> {
    if it.query.trim().is_empty() {
        return Err(TrendError::invariant(&it.query, "empty query"));
    }
    if !SourceType::ALL.contains(&it.source_type) {
        return Err(TrendError::invariant(&it.query, "unknown source type"));
    }
    if !it.score.is_finite() || !(0.0..=1.0).contains(&it.score) {
        return Err(TrendError::invariant(
            &it.query,
            format!("score {} outside [0, 1]", it.score),
        ));
    }
    if it.source.is_empty() {
        return Err(TrendError::invariant(&it.query, "no contributing source"));
    }
    if let Some(reason) = &it.reason {
        let words = reason.split_whitespace().count();
        if words > MAX_REASON_WORDS {
            return Err(TrendError::invariant(
                &it.query,
                format!("reason has {words} words (max {MAX_REASON_WORDS})"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(q: &str, score: f64) -> TrendItem {
        TrendItem {
            query: q.to_string(),
            source_type: SourceType::Rss,
            score,
            source: vec!["rss:x".to_string()],
            reason: None,
        }
    }

    #[test]
    fn valid_items_pass() {
        assert!(validate_items(&[item("a", 0.5), item("b", 1.0)]).is_ok());
        assert!(validate_items(&[]).is_ok());
    }

    #[test]
    fn score_out_of_range_is_violation() {
        let err = validate_items(&[item("a", 1.2)]).unwrap_err();
        assert!(matches!(err, TrendError::InvariantViolation { .. }));
        assert!(validate_items(&[item("a", f64::NAN)]).is_err());
    }

    #[test]
    fn empty_query_and_missing_source_are_violations() {
        assert!(validate_items(&[item("  ", 0.5)]).is_err());
        let mut it = item("a", 0.5);
        it.source.clear();
        assert!(validate_items(&[it]).is_err());
    }

    #[test]
    fn long_reason_is_violation() {
        let mut it = item("a", 0.5);
        it.reason = Some("one two three four five six seven eight nine ten eleven twelve thirteen".into());
        assert!(validate_items(&[it]).is_err());
    }

    #[test]
    fn duplicates_and_overflow_are_violations() {
        assert!(validate_items(&[item("a", 0.5), item("a", 0.6)]).is_err());
        let many: Vec<_> = (0..13).map(|i| item(&format!("q{i}"), 0.5)).collect();
        assert!(validate_items(&many).is_err());
    }
}
