// src/ingest/providers/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::time::Duration;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::ingest::clean_headline;
use crate::ingest::providers::{fetch_text, http_client};
use crate::ingest::types::CandidateSource;
use crate::trends::{CandidateBucket, SourceType};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> Option<i64> {
    OffsetDateTime::parse(ts.trim(), &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

/// RSS feed whose item titles become `rss` candidates.
pub struct RssHeadlineSource {
    name: String,
    mode: Mode,
    max_items: usize,
    max_age: Option<Duration>,
    // fixed "now" for fixtures; wall clock otherwise
    now_override: Option<i64>,
}

impl RssHeadlineSource {
    pub const DEFAULT_MAX_ITEMS: usize = 20;

    /// `feed` is the short feed id; the source name becomes `rss:<feed>`.
    pub fn from_fixture(feed: &str, xml: &str) -> Self {
        Self {
            name: source_name(feed),
            mode: Mode::Fixture(xml.to_string()),
            max_items: Self::DEFAULT_MAX_ITEMS,
            max_age: None,
            now_override: None,
        }
    }

    pub fn from_url(feed: &str, url: &str) -> Result<Self> {
        Ok(Self {
            name: source_name(feed),
            mode: Mode::Http {
                url: url.to_string(),
                client: http_client()?,
            },
            max_items: Self::DEFAULT_MAX_ITEMS,
            max_age: None,
            now_override: None,
        })
    }

    pub fn with_max_items(mut self, n: usize) -> Self {
        self.max_items = n;
        self
    }

    /// Skip items published longer than `age` ago. Items without a parseable date are kept.
    pub fn with_max_age(mut self, age: Option<Duration>) -> Self {
        self.max_age = age.filter(|d| !d.is_zero());
        self
    }

    pub fn with_now(mut self, unix_ts: i64) -> Self {
        self.now_override = Some(unix_ts);
        self
    }

    fn headlines_from_str(&self, s: &str) -> Result<Vec<String>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.name))?;

        let now = self
            .now_override
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        let cutoff = self
            .max_age
            .map(|age| now.saturating_sub(i64::try_from(age.as_secs()).unwrap_or(i64::MAX)));

        let mut out = Vec::with_capacity(rss.channel.item.len().min(self.max_items));
        for it in rss.channel.item {
            if out.len() >= self.max_items {
                break;
            }
            if let (Some(cutoff), Some(ts)) =
                (cutoff, it.pub_date.as_deref().and_then(parse_rfc2822_to_unix))
            {
                if ts < cutoff {
                    continue;
                }
            }
            let title = clean_headline(it.title.as_deref().unwrap_or_default());
            if title.is_empty() {
                continue;
            }
            out.push(title);
        }
        Ok(out)
    }
}

fn source_name(feed: &str) -> String {
    let feed = feed.trim();
    if feed.starts_with("rss:") {
        feed.to_string()
    } else {
        format!("rss:{feed}")
    }
}

#[async_trait]
impl CandidateSource for RssHeadlineSource {
    async fn fetch_bucket(&self) -> Result<CandidateBucket> {
        let items = match &self.mode {
            Mode::Fixture(s) => self.headlines_from_str(s)?,
            Mode::Http { url, client } => {
                let body = fetch_text(client, url, &self.name).await?;
                self.headlines_from_str(&body)?
            }
        };
        Ok(CandidateBucket::new(SourceType::Rss, self.name.clone(), items))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> SourceType {
        SourceType::Rss
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
