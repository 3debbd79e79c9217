// src/ingest/types.rs
use anyhow::Result;

use crate::trends::{CandidateBucket, SourceType};

/// An upstream provider of raw candidate phrases.
///
/// Implementations parse the provider's loosely-typed payload and hand back a
/// fully materialized [`CandidateBucket`]; nothing unvalidated leaves this edge.
#[async_trait::async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_bucket(&self) -> Result<CandidateBucket>;
    /// Provenance name, e.g. "serp:trending" or "rss:theverge".
    fn name(&self) -> &str;
    fn source_type(&self) -> SourceType;
}
