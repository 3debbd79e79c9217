// src/ingest/config.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::providers::rss::RssHeadlineSource;
use crate::ingest::providers::serp::{SerpKind, SerpSource};
use crate::ingest::types::CandidateSource;
use crate::retry::RetrySettings;

pub const ENV_PATH: &str = "TRENDS_CONFIG_PATH";

/// Round 0 configuration: which sources to ask, in which order, and how to persist.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrendsConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_rss_max_items")]
    pub rss_max_items: usize,
    /// 0 disables the age filter.
    #[serde(default = "default_rss_max_age_hours")]
    pub rss_max_age_hours: u64,
}

/// One configured source. Exactly one of `url` / `fixture` must be set.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    Rss {
        name: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        fixture: Option<PathBuf>,
    },
    Serp {
        endpoint: SerpKind,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        fixture: Option<PathBuf>,
    },
}

fn default_cache_ttl_secs() -> u64 {
    3600
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("data/artifacts")
}
fn default_rss_max_items() -> usize {
    RssHeadlineSource::DEFAULT_MAX_ITEMS
}
fn default_rss_max_age_hours() -> u64 {
    48
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            artifact_dir: default_artifact_dir(),
            retry: RetrySettings::default(),
            rss_max_items: default_rss_max_items(),
            rss_max_age_hours: default_rss_max_age_hours(),
        }
    }
}

impl TrendsConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        (self.cache_ttl_secs > 0).then(|| Duration::from_secs(self.cache_ttl_secs))
    }

    pub fn rss_max_age(&self) -> Option<Duration> {
        (self.rss_max_age_hours > 0)
            .then(|| Duration::from_secs(self.rss_max_age_hours.saturating_mul(3600)))
    }

    /// Reject configs that would produce ambiguous provenance.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for s in &self.sources {
            let name = s.source_name();
            if name.is_empty() || name == "rss:" {
                bail!("source with empty name");
            }
            if !seen.insert(name.clone()) {
                bail!("duplicate source name {name:?}");
            }
            let (url, fixture) = s.location();
            match (url, fixture) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => bail!("source {name:?} needs exactly one of `url` or `fixture`"),
            }
        }
        Ok(())
    }
}

impl SourceConfig {
    /// Provenance name the built source will carry.
    pub fn source_name(&self) -> String {
        match self {
            SourceConfig::Rss { name, .. } => {
                let n = name.trim();
                if n.starts_with("rss:") {
                    n.to_string()
                } else {
                    format!("rss:{n}")
                }
            }
            SourceConfig::Serp { endpoint, name, .. } => name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(endpoint.default_source_name())
                .to_string(),
        }
    }

    fn location(&self) -> (Option<&str>, Option<&Path>) {
        match self {
            SourceConfig::Rss { url, fixture, .. } | SourceConfig::Serp { url, fixture, .. } => {
                (url.as_deref(), fixture.as_deref())
            }
        }
    }
}

/// Build sources in configured order. Fixture files are read eagerly.
pub fn build_sources(cfg: &TrendsConfig) -> Result<Vec<Box<dyn CandidateSource>>> {
    cfg.validate()?;
    let mut out: Vec<Box<dyn CandidateSource>> = Vec::with_capacity(cfg.sources.len());
    for s in &cfg.sources {
        let name = s.source_name();
        let (url, fixture) = s.location();
        let fixture_body = fixture
            .map(|p| {
                fs::read_to_string(p)
                    .with_context(|| format!("reading fixture {} for {name}", p.display()))
            })
            .transpose()?;

        let src: Box<dyn CandidateSource> = match s {
            SourceConfig::Rss { .. } => {
                let base = match (&fixture_body, url) {
                    (Some(body), _) => RssHeadlineSource::from_fixture(&name, body),
                    (None, Some(u)) => RssHeadlineSource::from_url(&name, u)?,
                    (None, None) => return Err(anyhow!("source {name:?} has no location")),
                };
                Box::new(
                    base.with_max_items(cfg.rss_max_items)
                        .with_max_age(cfg.rss_max_age()),
                )
            }
            SourceConfig::Serp { endpoint, .. } => {
                let base = match (&fixture_body, url) {
                    (Some(body), _) => SerpSource::from_fixture(*endpoint, body),
                    (None, Some(u)) => SerpSource::from_url(*endpoint, u)?,
                    (None, None) => return Err(anyhow!("source {name:?} has no location")),
                };
                Box::new(base.with_name(&name))
            }
        };
        out.push(src);
    }
    Ok(out)
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<TrendsConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading trends config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_config(&content, ext.as_str())
}

/// Load config using env var + fallbacks:
/// 1) $TRENDS_CONFIG_PATH (from the environment or `.env`)
/// 2) config/trends.toml
/// 3) config/trends.json
/// 4) built-in defaults (no sources)
pub fn load_config_default() -> Result<TrendsConfig> {
    let _ = dotenvy::dotenv();

    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/trends.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/trends.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(TrendsConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<TrendsConfig> {
    let looks_json = s.trim_start().starts_with('{');
    let try_toml = hint_ext == "toml" || (hint_ext != "json" && !looks_json);
    let cfg = if try_toml {
        toml::from_str::<TrendsConfig>(s)
            .context("parsing trends config as toml")
            .or_else(|e| serde_json::from_str(s).map_err(|_| e))?
    } else {
        serde_json::from_str::<TrendsConfig>(s)
            .context("parsing trends config as json")
            .or_else(|e| toml::from_str(s).map_err(|_| e))?
    };
    cfg.validate()?;
    Ok(cfg)
}
