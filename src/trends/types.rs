// src/trends/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Provenance category of a candidate bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Autocomplete,
    Related,
    Trending,
    Rss,
}

impl SourceType {
    pub const ALL: [SourceType; 4] = [
        SourceType::Autocomplete,
        SourceType::Related,
        SourceType::Trending,
        SourceType::Rss,
    ];

    /// Merge priority: trending > related > autocomplete > rss.
    pub fn priority(self) -> u8 {
        match self {
            SourceType::Trending => 3,
            SourceType::Related => 2,
            SourceType::Autocomplete => 1,
            SourceType::Rss => 0,
        }
    }

    /// Returns whichever of the two types ranks higher; `self` wins ties.
    pub fn upgrade(self, other: SourceType) -> SourceType {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Autocomplete => "autocomplete",
            SourceType::Related => "related",
            SourceType::Trending => "trending",
            SourceType::Rss => "rss",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A batch of raw candidate strings from one named source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateBucket {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub source_name: String, // e.g. "serp:trending", "rss:theverge"
    pub items: Vec<String>,  // raw, unnormalized
}

impl CandidateBucket {
    pub fn new<N, I, S>(source_type: SourceType, source_name: N, items: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_type,
            source_name: source_name.into(),
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

/// A normalized, scored candidate topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendItem {
    pub query: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub score: f64,
    pub source: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Aggregator output: ranked items plus per-source counts over the final list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregation {
    pub items: Vec<TrendItem>,
    pub source_counts: BTreeMap<String, usize>,
}
