// src/store.rs
//! Persistence collaborator: a small key/value cache with TTL plus artifact files.
//!
//! `FsArtifactStore` keeps everything under one root directory:
//! - cache entries in `<root>/cache/<sha256-prefix>.json` as `{ "expires_at", "value" }`
//! - artifacts at `<root>/<path>`
//!
//! Writes go through a temp file + rename so readers never see half-written JSON.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Cached value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    /// Cache `value` under `key`; `ttl = None` never expires.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;
    async fn write_artifact(&self, path: &str, payload: &Value) -> Result<()>;
    async fn read_artifact(&self, path: &str) -> Result<Option<Value>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    expires_at: Option<DateTime<Utc>>,
    value: Value,
}

impl CacheEntry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|t| Utc::now() + t);
        Self { expires_at, value }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |t| t > now)
    }
}

/// Filesystem-backed store.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn cache_path(&self, key: &str) -> PathBuf {
        self.root.join("cache").join(format!("{}.json", cache_key(key)))
    }

    fn artifact_path(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        if path.trim().is_empty()
            || rel
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            bail!("invalid artifact path {path:?}");
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let p = self.cache_path(key);
        let Some(raw) = read_optional(&p).await? else {
            return Ok(None);
        };
        // A corrupt cache entry is treated as a miss.
        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(target: "store", error = %e, key, "unreadable cache entry");
                return Ok(None);
            }
        };
        Ok(entry.is_live(Utc::now()).then_some(entry.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let entry = CacheEntry::new(value, ttl);
        let json = serde_json::to_string(&entry).context("serializing cache entry")?;
        write_atomic(&self.cache_path(key), json.as_bytes()).await
    }

    async fn write_artifact(&self, path: &str, payload: &Value) -> Result<()> {
        let p = self.artifact_path(path)?;
        let json = serde_json::to_string_pretty(payload).context("serializing artifact")?;
        write_atomic(&p, json.as_bytes()).await
    }

    async fn read_artifact(&self, path: &str) -> Result<Option<Value>> {
        let p = self.artifact_path(path)?;
        match read_optional(&p).await? {
            Some(raw) => {
                let v = serde_json::from_str(&raw)
                    .with_context(|| format!("parsing artifact {}", p.display()))?;
                Ok(Some(v))
            }
            None => Ok(None),
        }
    }
}

async fn read_optional(p: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(p).await {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("reading {}", p.display())),
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes)
        .await
        .with_context(|| format!("writing {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("renaming into {}", path.display()))?;
    Ok(())
}

fn cache_key(key: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(key.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// In-memory store for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    cache: Mutex<HashMap<String, CacheEntry>>,
    artifacts: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths of all written artifacts, sorted.
    pub fn artifact_paths(&self) -> Vec<String> {
        let g = self.artifacts.lock().expect("memory store poisoned");
        let mut v: Vec<String> = g.keys().cloned().collect();
        v.sort();
        v
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let g = self.cache.lock().expect("memory store poisoned");
        Ok(g.get(key)
            .filter(|e| e.is_live(Utc::now()))
            .map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()> {
        let mut g = self.cache.lock().expect("memory store poisoned");
        g.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn write_artifact(&self, path: &str, payload: &Value) -> Result<()> {
        let mut g = self.artifacts.lock().expect("memory store poisoned");
        g.insert(path.to_string(), payload.clone());
        Ok(())
    }

    async fn read_artifact(&self, path: &str) -> Result<Option<Value>> {
        let g = self.artifacts.lock().expect("memory store poisoned");
        Ok(g.get(path).cloned())
    }
}
