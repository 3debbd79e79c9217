// src/lib.rs
//! Round 0 of the article pipeline: collect trend candidates from upstream
//! providers and reduce them to a small, ranked, deduplicated list.

pub mod error;
pub mod ingest;
pub mod retry;
pub mod round;
pub mod store;
pub mod telemetry;
pub mod trends;

// ---- Re-exports for stable public API ----
pub use crate::error::TrendError;
pub use crate::round::{RoundOptions, RoundOutcome, TrendRound};
pub use crate::trends::{
    process, Aggregation, CandidateBucket, SourceType, TrendAggregator, TrendItem,
};
