// src/ingest/providers/serp.rs
//! SerpApi-shaped payloads (autocomplete, related queries, trending searches).
//!
//! The provider JSON is loosely typed; here it is parsed into strict structs and
//! reduced to plain phrases. A payload missing its expected top-level key, or
//! carrying an `error` field, is rejected outright.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::ingest::providers::{fetch_text, http_client};
use crate::ingest::types::CandidateSource;
use crate::trends::{CandidateBucket, SourceType};

/// Which SerpApi endpoint a payload comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerpKind {
    Autocomplete,
    Related,
    Trending,
}

impl SerpKind {
    pub fn source_type(self) -> SourceType {
        match self {
            SerpKind::Autocomplete => SourceType::Autocomplete,
            SerpKind::Related => SourceType::Related,
            SerpKind::Trending => SourceType::Trending,
        }
    }

    pub fn default_source_name(self) -> &'static str {
        match self {
            SerpKind::Autocomplete => "serp:autocomplete",
            SerpKind::Related => "serp:related",
            SerpKind::Trending => "serp:trending",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AutocompletePayload {
    suggestions: Vec<Suggestion>,
}

#[derive(Debug, Deserialize)]
struct Suggestion {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelatedPayload {
    related_queries: RelatedQueries,
}

#[derive(Debug, Deserialize)]
struct RelatedQueries {
    #[serde(default)]
    rising: Vec<QueryEntry>,
    #[serde(default)]
    top: Vec<QueryEntry>,
}

#[derive(Debug, Deserialize)]
struct TrendingPayload {
    trending_searches: Vec<QueryEntry>,
}

#[derive(Debug, Deserialize)]
struct QueryEntry {
    query: Option<String>,
}

/// Parse one SerpApi response body into raw candidate phrases, in payload order.
pub fn parse_payload(kind: SerpKind, body: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(body).context("serp payload is not json")?;
    if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        bail!("serp api error: {err}");
    }

    let raw: Vec<Option<String>> = match kind {
        SerpKind::Autocomplete => {
            let p: AutocompletePayload =
                serde_json::from_value(value).context("parsing serp autocomplete payload")?;
            p.suggestions.into_iter().map(|s| s.value).collect()
        }
        SerpKind::Related => {
            let p: RelatedPayload =
                serde_json::from_value(value).context("parsing serp related payload")?;
            p.related_queries
                .rising
                .into_iter()
                .chain(p.related_queries.top)
                .map(|q| q.query)
                .collect()
        }
        SerpKind::Trending => {
            let p: TrendingPayload =
                serde_json::from_value(value).context("parsing serp trending payload")?;
            p.trending_searches.into_iter().map(|q| q.query).collect()
        }
    };

    Ok(raw
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// One SerpApi endpoint as a candidate source.
pub struct SerpSource {
    kind: SerpKind,
    name: String,
    mode: Mode,
}

impl SerpSource {
    pub fn from_fixture(kind: SerpKind, json: &str) -> Self {
        Self {
            kind,
            name: kind.default_source_name().to_string(),
            mode: Mode::Fixture(json.to_string()),
        }
    }

    /// `url` is the complete request URL, query parameters included.
    pub fn from_url(kind: SerpKind, url: &str) -> Result<Self> {
        if url.trim().is_empty() {
            return Err(anyhow!("serp source {kind:?} has an empty url"));
        }
        Ok(Self {
            kind,
            name: kind.default_source_name().to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client: http_client()?,
            },
        })
    }

    /// Override the provenance name, e.g. "serp:trending:us".
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.trim().to_string();
        self
    }
}

#[async_trait]
impl CandidateSource for SerpSource {
    async fn fetch_bucket(&self) -> Result<CandidateBucket> {
        let items = match &self.mode {
            Mode::Fixture(s) => parse_payload(self.kind, s)?,
            Mode::Http { url, client } => {
                let body = fetch_text(client, url, &self.name).await?;
                parse_payload(self.kind, &body)?
            }
        };
        Ok(CandidateBucket::new(
            self.kind.source_type(),
            self.name.clone(),
            items,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> SourceType {
        self.kind.source_type()
    }
}
