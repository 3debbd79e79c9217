// src/trends/scoring.rs
//! Provenance-based scoring, ranking and the source-count summary.
//!
//! Scores are accumulated in whole hundredths and divided once at the end, so
//! `0.5 + 0.1 + 0.1` lands on exactly `0.7`.

use std::collections::BTreeMap;

use super::merge::Candidate;
use super::types::TrendItem;

pub const MAX_ITEMS: usize = 12;
pub const TRENDING_SOURCE_PREFIX: &str = "serp:trending";
pub const MAX_REASON_CHARS: usize = 48;

const BASE_HUNDREDTHS: u32 = 50;
const MULTI_SOURCE_BOOST: u32 = 10;
const TRENDING_BOOST: u32 = 10;

/// Turn a merged candidate into a scored item.
pub fn score_candidate(c: Candidate) -> TrendItem {
    let trending = c
        .sources
        .iter()
        .any(|s| s.starts_with(TRENDING_SOURCE_PREFIX));
    let multi_source = c.sources.len() > 1;

    let mut hundredths = BASE_HUNDREDTHS;
    let mut labels: Vec<&str> = Vec::new();
    if trending {
        hundredths += TRENDING_BOOST;
        labels.push("trending");
    }
    if multi_source {
        hundredths += MULTI_SOURCE_BOOST;
        labels.push("multi-source");
    }
    let score = (f64::from(hundredths) / 100.0).clamp(0.0, 1.0);

    TrendItem {
        query: c.query,
        source_type: c.source_type,
        score,
        source: c.sources,
        reason: build_reason(&labels),
    }
}

fn build_reason(labels: &[&str]) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    Some(labels.join(", ").chars().take(MAX_REASON_CHARS).collect())
}

/// Score descending, then shorter query first; equal keys keep their input order.
pub fn sort_and_cap(mut items: Vec<TrendItem>, cap: usize) -> Vec<TrendItem> {
    items.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.query.chars().count().cmp(&b.query.chars().count()))
    });
    items.truncate(cap);
    items
}

/// Count every `(item, source)` pair of the final list.
pub fn source_counts(items: &[TrendItem]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for s in items.iter().flat_map(|it| it.source.iter()) {
        *counts.entry(s.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trends::types::SourceType;

    fn cand(q: &str, sources: &[&str]) -> Candidate {
        Candidate {
            query: q.to_string(),
            source_type: SourceType::Autocomplete,
            sources: sources.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_plain_source_gets_base_score_and_no_reason() {
        let it = score_candidate(cand("rust", &["serp:autocomplete"]));
        assert_eq!(it.score, 0.5);
        assert!(it.reason.is_none());
    }

    #[test]
    fn both_boosts_sum_exactly() {
        let it = score_candidate(cand("rust", &["serp:autocomplete", "serp:trending"]));
        assert_eq!(it.score, 0.7);
        assert_eq!(it.reason.as_deref(), Some("trending, multi-source"));
    }

    #[test]
    fn trending_boost_matches_prefix() {
        let it = score_candidate(cand("rust", &["serp:trending:us"]));
        assert_eq!(it.score, 0.6);
        assert_eq!(it.reason.as_deref(), Some("trending"));

        let it = score_candidate(cand("rust", &["rss:serp:trending"]));
        assert_eq!(it.score, 0.5);
    }

    #[test]
    fn ties_prefer_shorter_queries_then_input_order() {
        let items = vec![
            score_candidate(cand("longer query", &["a"])),
            score_candidate(cand("bbb", &["a"])),
            score_candidate(cand("aaa", &["a"])),
            score_candidate(cand("boosted entry", &["a", "b"])),
        ];
        let out = sort_and_cap(items, 3);
        let qs: Vec<_> = out.iter().map(|i| i.query.as_str()).collect();
        assert_eq!(qs, vec!["boosted entry", "bbb", "aaa"]);
    }

    #[test]
    fn counts_only_final_items() {
        let items = vec![
            score_candidate(cand("x", &["a", "b"])),
            score_candidate(cand("y", &["a"])),
        ];
        let counts = source_counts(&items);
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
        assert_eq!(counts.values().sum::<usize>(), 3);
    }
}
