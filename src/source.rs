use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::record::SourceWord;

pub const DEFAULT_SOURCE_URL: &str = "https://vocabdaily.vercel.app/get";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the word-of-the-moment endpoint.
#[derive(Debug, Clone)]
pub struct SourceClient {
    url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SourceEnvelope {
    data: Option<SourceWord>,
}

impl Default for SourceClient {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_URL)
    }
}

impl SourceClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<SourceWord> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .with_context(|| "failed to build HTTP client")?;
        let response = client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("word source request failed: {}", self.url))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| "failed to read word source response")?;
        if !status.is_success() {
            return Err(anyhow!("word source returned {}: {}", status, body.trim()));
        }
        let word = parse_source_body(&body)?;
        debug!("fetched source word '{}'", word.term);
        Ok(word)
    }
}

pub(crate) fn parse_source_body(body: &str) -> Result<SourceWord> {
    let envelope: SourceEnvelope =
        serde_json::from_str(body).with_context(|| "failed to parse word source JSON")?;
    let word = envelope
        .data
        .ok_or_else(|| anyhow!("word source response has no data"))?;
    if word.term.trim().is_empty() {
        return Err(anyhow!("word source returned an empty term"));
    }
    Ok(word)
}
