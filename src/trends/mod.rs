// src/trends/mod.rs
//! Round 0 trend aggregation: a pure, deterministic transformation from raw
//! candidate buckets to a bounded, ranked list of trend items.
//!
//! Stages, in order:
//! 1) normalize + drop filter ([`normalize`])
//! 2) exact-key collection with provenance merge ([`merge::collect`])
//! 3) greedy near-duplicate merge ([`merge::merge_near_duplicates`])
//! 4) scoring, sort and cap ([`scoring`])
//! 5) source counts over the final list, then post-condition checks ([`validate`])
//!
//! No I/O and no hidden state: the same ordered input always yields the same output.

pub mod merge;
pub mod normalize;
pub mod scoring;
pub mod types;
pub mod validate;

pub use normalize::{normalize, should_drop};
pub use types::{Aggregation, CandidateBucket, SourceType, TrendItem};

use crate::error::Result;

/// Stateless aggregator. Kept as a type so callers can hold it alongside their collaborators.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendAggregator;

/// Counters describing one `process` call; handy for logging at the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    pub raw: usize,
    pub dropped: usize,
    pub distinct: usize,
    pub merged: usize,
    pub kept: usize,
}

impl TrendAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn process(&self, buckets: &[CandidateBucket]) -> Result<Aggregation> {
        self.process_with_stats(buckets).map(|(agg, _)| agg)
    }

    pub fn process_with_stats(
        &self,
        buckets: &[CandidateBucket],
    ) -> Result<(Aggregation, ProcessStats)> {
        let raw = buckets.iter().map(|b| b.items.len()).sum();

        let (collected, dropped) = merge::collect(buckets);
        let distinct = collected.len();
        let merged = merge::merge_near_duplicates(collected);
        let merged_count = merged.len();

        let scored = merged.into_iter().map(scoring::score_candidate).collect();
        let items = scoring::sort_and_cap(scored, scoring::MAX_ITEMS);
        let source_counts = scoring::source_counts(&items);

        validate::validate_items(&items)?;

        let stats = ProcessStats {
            raw,
            dropped,
            distinct,
            merged: distinct - merged_count,
            kept: items.len(),
        };
        Ok((
            Aggregation {
                items,
                source_counts,
            },
            stats,
        ))
    }
}

/// Convenience wrapper around [`TrendAggregator::process`].
pub fn process(buckets: &[CandidateBucket]) -> Result<Aggregation> {
    TrendAggregator.process(buckets)
}
