// tests/metrics_round.rs
#![cfg(feature = "strict-metrics")]
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use trend_radar::ingest::providers::serp::{SerpKind, SerpSource};
use trend_radar::ingest::types::CandidateSource;
use trend_radar::retry::RetryPolicy;
use trend_radar::store::MemoryStore;
use trend_radar::{RoundOptions, TrendRound};

#[tokio::test]
async fn metrics_exposed_after_round() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("recorder");

    let trending = std::fs::read_to_string("tests/fixtures/serp_trending.json").expect("fixture");
    let sources: Vec<Box<dyn CandidateSource>> = vec![
        Box::new(SerpSource::from_fixture(SerpKind::Trending, &trending)),
        Box::new(SerpSource::from_fixture(SerpKind::Related, "{}")),
    ];
    let opts = RoundOptions {
        retry: RetryPolicy::none(),
        cache_ttl: None,
    };
    let round = TrendRound::new(sources, Arc::new(MemoryStore::new()), opts);
    round.run("metrics", false).await.expect("round ok");

    // Scrape metrics text and check series presence by substring
    let out = handle.render();
    assert!(out.contains("trends_source_fetches_total"));
    assert!(out.contains("trends_source_errors_total"));
    assert!(out.contains("trends_candidates_total"));
    assert!(out.contains("trends_items_total"));
    assert!(out.contains("trends_runs_total"));
    assert!(out.contains("trends_process_ms"));
}
