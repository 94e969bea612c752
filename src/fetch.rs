use anyhow::Context;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::errors::PipelineError;

/// Where the CSV comes from: an http(s) URL or anything else as a file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote(Url),
    Local(std::path::PathBuf),
}

impl Source {
    pub fn resolve(location: &str) -> Self {
        match Url::parse(location) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => Source::Remote(u),
            _ => Source::Local(location.into()),
        }
    }
}

/// Fetch the raw CSV text. No retries and no timeout; a failure ends the
/// load.
pub async fn fetch_text(client: &Client, location: &str) -> Result<String, PipelineError> {
    let start = std::time::Instant::now();
    debug!("Fetching data - location={}", location);

    let text = match Source::resolve(location) {
        Source::Remote(url) => fetch_remote(client, &url)
            .await
            .map_err(|e| PipelineError::fetch(location, e))?,
        Source::Local(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Reading {}", path.display()))
            .map_err(|e| PipelineError::fetch(location, e))?,
    };

    info!(
        "Data fetch completed - location={}, duration={:.2}s, bytes={}",
        location,
        start.elapsed().as_secs_f32(),
        text.len()
    );
    Ok(text)
}

async fn fetch_remote(client: &Client, url: &Url) -> anyhow::Result<String> {
    let resp = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("Request failed for {}", url))?;

    let resp = resp
        .error_for_status()
        .with_context(|| format!("HTTP error for {}", url))?;

    resp.text()
        .await
        .with_context(|| format!("Reading body of {}", url))
}
