// tests/round_e2e.rs
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trend_radar::ingest::providers::rss::RssHeadlineSource;
use trend_radar::ingest::providers::serp::{SerpKind, SerpSource};
use trend_radar::ingest::types::CandidateSource;
use trend_radar::retry::RetryPolicy;
use trend_radar::store::{ArtifactStore, FsArtifactStore, MemoryStore};
use trend_radar::{
    Aggregation, CandidateBucket, RoundOptions, SourceType, TrendError, TrendRound,
};

const TRENDING: &str = include_str!("fixtures/serp_trending.json");
const AUTOCOMPLETE: &str = include_str!("fixtures/serp_autocomplete.json");
const RELATED: &str = include_str!("fixtures/serp_related.json");
const VERGE_XML: &str = include_str!("fixtures/theverge_rss.xml");
const NOW: i64 = 1_715_688_000;

/// Wraps a source and counts real fetches.
struct Counting {
    inner: Box<dyn CandidateSource>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CandidateSource for Counting {
    async fn fetch_bucket(&self) -> Result<CandidateBucket> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch_bucket().await
    }
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn source_type(&self) -> SourceType {
        self.inner.source_type()
    }
}

struct AlwaysDown;

#[async_trait]
impl CandidateSource for AlwaysDown {
    async fn fetch_bucket(&self) -> Result<CandidateBucket> {
        bail!("upstream 503")
    }
    fn name(&self) -> &str {
        "serp:down"
    }
    fn source_type(&self) -> SourceType {
        SourceType::Trending
    }
}

fn fixture_sources(calls: &Arc<AtomicUsize>) -> Vec<Box<dyn CandidateSource>> {
    let raw: Vec<Box<dyn CandidateSource>> = vec![
        Box::new(SerpSource::from_fixture(SerpKind::Trending, TRENDING)),
        Box::new(SerpSource::from_fixture(SerpKind::Autocomplete, AUTOCOMPLETE)),
        Box::new(SerpSource::from_fixture(SerpKind::Related, RELATED)),
        Box::new(
            RssHeadlineSource::from_fixture("theverge", VERGE_XML)
                .with_max_age(Some(Duration::from_secs(48 * 3600)))
                .with_now(NOW),
        ),
    ];
    raw.into_iter()
        .map(|inner| {
            Box::new(Counting {
                inner,
                calls: calls.clone(),
            }) as Box<dyn CandidateSource>
        })
        .collect()
}

fn opts(cache_ttl: Option<Duration>) -> RoundOptions {
    RoundOptions {
        retry: RetryPolicy::none(),
        cache_ttl,
    }
}

fn queries(agg: &Aggregation) -> Vec<&str> {
    agg.items.iter().map(|i| i.query.as_str()).collect()
}

#[tokio::test]
async fn fresh_run_aggregates_all_fixtures() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MemoryStore::new());
    let round = TrendRound::new(fixture_sources(&calls), store.clone(), opts(None));

    let outcome = round.run("r1", false).await.expect("round ok");
    assert!(!outcome.is_skipped());
    let agg = outcome.aggregation();

    assert_eq!(
        queries(agg),
        vec![
            "openai gpt-5",
            "rust async await",
            "rust 2024 edition",
            "solar eclipse 2024",
            "apple vision pro reviews",
            "tokio console",
            "openai gpt-5 - what we know",
            "apple vision pro review the future",
            "rust 178 ships with new diagnostics",
        ]
    );
    let top = &agg.items[0];
    assert_eq!(top.score, 0.7);
    assert_eq!(top.source_type, SourceType::Trending);
    assert_eq!(top.source, vec!["serp:trending", "serp:autocomplete"]);

    for name in ["serp:trending", "serp:autocomplete", "serp:related", "rss:theverge"] {
        assert_eq!(agg.source_counts.get(name), Some(&3), "{name}");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(store.artifact_paths(), vec!["runs/r1/round0_trends.json"]);
}

#[tokio::test]
async fn rerun_without_force_short_circuits() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MemoryStore::new());
    let round = TrendRound::new(fixture_sources(&calls), store.clone(), opts(None));

    let first = round.run("r1", false).await.unwrap().into_aggregation();
    let second = round.run("r1", false).await.unwrap();
    assert!(second.is_skipped());
    assert_eq!(second.aggregation(), &first);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let forced = round.run("r1", true).await.unwrap();
    assert!(!forced.is_skipped());
    assert_eq!(forced.aggregation(), &first);
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn cached_buckets_are_reused_across_runs() {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MemoryStore::new());
    let round = TrendRound::new(
        fixture_sources(&calls),
        store.clone(),
        opts(Some(Duration::from_secs(600))),
    );

    let a = round.run("r1", false).await.unwrap().into_aggregation();
    let b = round.run("r2", false).await.unwrap();
    assert!(!b.is_skipped());
    assert_eq!(b.aggregation(), &a);
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    let cached = store.get("candidates:serp:trending").await.unwrap();
    assert!(cached.is_some());

    // force bypasses the cache
    round.run("r3", true).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[tokio::test]
async fn failing_source_is_skipped() {
    let store = Arc::new(MemoryStore::new());
    let sources: Vec<Box<dyn CandidateSource>> = vec![
        Box::new(AlwaysDown),
        Box::new(SerpSource::from_fixture(SerpKind::Trending, TRENDING)),
    ];
    let round = TrendRound::new(sources, store, opts(Some(Duration::from_secs(60))));
    let agg = round.run("r1", false).await.unwrap().into_aggregation();
    assert_eq!(agg.items.len(), 3);
    assert!(!agg.source_counts.contains_key("serp:down"));
}

#[tokio::test]
async fn fs_store_persists_decodable_artifact() {
    let tmp = tempfile::tempdir().unwrap();
    let store = Arc::new(FsArtifactStore::new(tmp.path()));
    let calls = Arc::new(AtomicUsize::new(0));
    let round = TrendRound::new(
        fixture_sources(&calls),
        store.clone(),
        opts(Some(Duration::from_secs(60))),
    );

    let agg = round.run("2024-05-14", false).await.unwrap().into_aggregation();

    let path = tmp.path().join("runs/2024-05-14/round0_trends.json");
    let raw = std::fs::read_to_string(path).unwrap();
    assert!(raw.contains("\"sourceCounts\""));
    let decoded: Aggregation = serde_json::from_str(&raw).unwrap();
    assert_eq!(decoded, agg);

    // a second round over the same directory picks the artifact up
    let again = TrendRound::new(fixture_sources(&calls), store, opts(None));
    assert!(again.run("2024-05-14", false).await.unwrap().is_skipped());
}

#[tokio::test]
async fn invalid_run_id_is_rejected() {
    let round = TrendRound::new(Vec::new(), Arc::new(MemoryStore::new()), opts(None));
    assert!(round.run("../x", false).await.is_err());
    let empty = round.run("empty", false).await.unwrap().into_aggregation();
    assert!(empty.items.is_empty());
}

#[tokio::test]
async fn tampered_artifact_is_rejected_on_skip() {
    let store = Arc::new(MemoryStore::new());
    let bad = serde_json::json!({
        "items": [{"query": "rust", "type": "trending", "score": 2.0, "source": ["serp:trending"]}],
        "sourceCounts": {"serp:trending": 1}
    });
    store
        .write_artifact("runs/r1/round0_trends.json", &bad)
        .await
        .unwrap();

    let round = TrendRound::new(Vec::new(), store.clone(), opts(None));
    let err = round.run("r1", false).await.expect_err("score out of range");
    assert!(matches!(
        err.downcast_ref::<TrendError>(),
        Some(TrendError::InvariantViolation { .. })
    ));

    // force re-aggregates and overwrites it
    let fresh = round.run("r1", true).await.unwrap();
    assert!(fresh.aggregation().items.is_empty());
}

#[test]
fn invariant_violation_downcasts_from_anyhow() {
    let err: anyhow::Error = TrendError::InvariantViolation {
        query: "q".into(),
        detail: "score 2 outside [0, 1]".into(),
    }
    .into();
    assert!(matches!(
        err.downcast_ref::<TrendError>(),
        Some(TrendError::InvariantViolation { .. })
    ));
}
