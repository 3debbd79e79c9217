// src/round.rs
//! Round 0 runner: gather candidate buckets, aggregate, persist the artifact.
//!
//! Re-running with `force = false` against an existing artifact returns the stored
//! result after re-checking its items. Sources are visited strictly in order (cache first, then a
//! retried fetch) so the aggregator always sees buckets in the same order.
//!
//! An aggregator `InvariantViolation` is returned as an `anyhow::Error` wrapping
//! [`TrendError`](crate::error::TrendError); callers can `downcast_ref` it and must
//! treat it as fatal.

use anyhow::{bail, Context, Result};
use metrics::{counter, gauge, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ingest::config::TrendsConfig;
use crate::ingest::types::CandidateSource;
use crate::ingest::{ensure_metrics_described, fetch_source};
use crate::retry::RetryPolicy;
use crate::store::ArtifactStore;
use crate::trends::validate::validate_items;
use crate::trends::{Aggregation, CandidateBucket, TrendAggregator};

pub const ARTIFACT_NAME: &str = "round0_trends.json";

#[derive(Clone, Debug, Default)]
pub struct RoundOptions {
    pub retry: RetryPolicy,
    /// TTL for cached source buckets; `None` disables the cache.
    pub cache_ttl: Option<Duration>,
}

impl RoundOptions {
    pub fn from_config(cfg: &TrendsConfig) -> Self {
        Self {
            retry: cfg.retry.into(),
            cache_ttl: cfg.cache_ttl(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoundOutcome {
    /// Aggregated from freshly gathered buckets and persisted.
    Fresh(Aggregation),
    /// An artifact for this run already existed.
    Skipped(Aggregation),
}

impl RoundOutcome {
    pub fn aggregation(&self) -> &Aggregation {
        match self {
            RoundOutcome::Fresh(a) | RoundOutcome::Skipped(a) => a,
        }
    }

    pub fn into_aggregation(self) -> Aggregation {
        match self {
            RoundOutcome::Fresh(a) | RoundOutcome::Skipped(a) => a,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, RoundOutcome::Skipped(_))
    }
}

pub struct TrendRound {
    sources: Vec<Box<dyn CandidateSource>>,
    store: Arc<dyn ArtifactStore>,
    opts: RoundOptions,
    aggregator: TrendAggregator,
}

impl TrendRound {
    pub fn new(
        sources: Vec<Box<dyn CandidateSource>>,
        store: Arc<dyn ArtifactStore>,
        opts: RoundOptions,
    ) -> Self {
        Self {
            sources,
            store,
            opts,
            aggregator: TrendAggregator::new(),
        }
    }

    pub async fn run(&self, run_id: &str, force: bool) -> Result<RoundOutcome> {
        ensure_metrics_described();
        let path = artifact_path(run_id)?;

        if !force {
            if let Some(existing) = self.store.read_artifact(&path).await? {
                let agg: Aggregation = serde_json::from_value(existing)
                    .with_context(|| format!("decoding existing artifact {path}"))?;
                validate_items(&agg.items)?;
                counter!("trends_runs_skipped_total").increment(1);
                tracing::info!(
                    target: "trends",
                    run_id,
                    items = agg.items.len(),
                    "artifact exists, skipping"
                );
                return Ok(RoundOutcome::Skipped(agg));
            }
        }

        let buckets = self.collect_buckets(force).await?;

        let t0 = Instant::now();
        let (agg, stats) = self.aggregator.process_with_stats(&buckets)?;
        histogram!("trends_process_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let payload = serde_json::to_value(&agg).context("serializing aggregation")?;
        self.store.write_artifact(&path, &payload).await?;

        counter!("trends_runs_total").increment(1);
        counter!("trends_candidates_total").increment(stats.raw as u64);
        counter!("trends_items_total").increment(stats.kept as u64);
        gauge!("trends_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            target: "trends",
            run_id,
            buckets = buckets.len(),
            raw = stats.raw,
            dropped = stats.dropped,
            merged = stats.merged,
            kept = stats.kept,
            "round 0 aggregated"
        );
        Ok(RoundOutcome::Fresh(agg))
    }

    async fn collect_buckets(&self, force: bool) -> Result<Vec<CandidateBucket>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in &self.sources {
            let key = format!("candidates:{}", src.name());

            if !force && self.opts.cache_ttl.is_some() {
                if let Some(bucket) = self.cached_bucket(&key).await? {
                    tracing::debug!(target: "trends", source = src.name(), "cache hit");
                    out.push(bucket);
                    continue;
                }
            }

            let Some(bucket) = fetch_source(src.as_ref(), &self.opts.retry).await else {
                continue;
            };
            if let Some(ttl) = self.opts.cache_ttl {
                let value = serde_json::to_value(&bucket).context("serializing bucket")?;
                self.store.set(&key, value, Some(ttl)).await?;
            }
            out.push(bucket);
        }
        Ok(out)
    }

    async fn cached_bucket(&self, key: &str) -> Result<Option<CandidateBucket>> {
        let Some(v) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(v) {
            Ok(b) => Ok(Some(b)),
            Err(e) => {
                tracing::warn!(target: "trends", error = %e, key, "malformed cached bucket");
                Ok(None)
            }
        }
    }
}

/// Storage path of the Round 0 artifact for `run_id`.
pub fn artifact_path(run_id: &str) -> Result<String> {
    let ok = !run_id.is_empty()
        && run_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !ok {
        bail!("invalid run id {run_id:?}");
    }
    Ok(format!("runs/{run_id}/{ARTIFACT_NAME}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_restricted() {
        assert_eq!(
            artifact_path("2024-05-14_a").unwrap(),
            "runs/2024-05-14_a/round0_trends.json"
        );
        assert!(artifact_path("").is_err());
        assert!(artifact_path("../etc").is_err());
        assert!(artifact_path("a b").is_err());
    }

    #[test]
    fn outcome_accessors() {
        let o = RoundOutcome::Skipped(Aggregation::default());
        assert!(o.is_skipped());
        assert!(o.aggregation().items.is_empty());
        assert!(!RoundOutcome::Fresh(Aggregation::default()).is_skipped());
    }
}
