// src/ingest/providers/mod.rs
pub mod rss;
pub mod serp;

use anyhow::{Context, Result};
use std::time::Duration;

pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("trend-radar/0.1")
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()
        .context("building http client")
}

pub(crate) async fn fetch_text(client: &reqwest::Client, url: &str, who: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("{who} http get()"))?
        .error_for_status()
        .with_context(|| format!("{who} http status"))?;
    resp.text()
        .await
        .with_context(|| format!("{who} http .text()"))
}
