// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use crate::ingest::types::CandidateSource;
use crate::retry::{with_retry, RetryPolicy};
use crate::trends::CandidateBucket;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on a scrape).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "trends_source_fetches_total",
            "Successful candidate source fetches."
        );
        describe_counter!(
            "trends_source_errors_total",
            "Candidate source fetch/parse errors (after retries)."
        );
        describe_counter!(
            "trends_candidates_total",
            "Raw candidate strings handed to the aggregator."
        );
        describe_counter!("trends_items_total", "Trend items produced by Round 0.");
        describe_counter!("trends_runs_total", "Round 0 runs that aggregated fresh data.");
        describe_counter!(
            "trends_runs_skipped_total",
            "Round 0 runs short-circuited by an existing artifact."
        );
        describe_histogram!("trends_process_ms", "Aggregation time in milliseconds.");
        describe_gauge!("trends_last_run_ts", "Unix ts when Round 0 last ran.");
    });
}

/// Clean a provider headline: decode entities, strip tags, fold quotes and whitespace.
///
/// This only tidies markup; query normalization happens in the aggregator.
pub fn clean_headline(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Fetch one source, retrying transient failures.
///
/// A source that still fails is logged and counted, and yields `None`.
pub async fn fetch_source(
    src: &dyn CandidateSource,
    policy: &RetryPolicy,
) -> Option<CandidateBucket> {
    ensure_metrics_described();

    match with_retry(policy, src.name(), || src.fetch_bucket()).await {
        Ok(bucket) => {
            counter!("trends_source_fetches_total").increment(1);
            tracing::debug!(
                target: "ingest",
                source = src.name(),
                items = bucket.items.len(),
                "source fetched"
            );
            Some(bucket)
        }
        Err(e) => {
            tracing::warn!(target: "ingest", error = ?e, source = src.name(), "source error");
            counter!("trends_source_errors_total").increment(1);
            None
        }
    }
}

/// Fetch every source once, in order. Failing sources are skipped, so the result
/// may hold fewer buckets than there are sources.
pub async fn gather_buckets(
    sources: &[Box<dyn CandidateSource>],
    policy: &RetryPolicy,
) -> Vec<CandidateBucket> {
    let mut out = Vec::with_capacity(sources.len());
    for src in sources {
        if let Some(bucket) = fetch_source(src.as_ref(), policy).await {
            out.push(bucket);
        }
    }
    out
}
