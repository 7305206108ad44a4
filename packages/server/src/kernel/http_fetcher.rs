// HTTP implementation of BaseFetcher
//
// Plain GETs of public pages with a fixed bot User-Agent and a short
// timeout. No retries, no redirects beyond reqwest defaults.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::BaseFetcher;

pub const BOT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; CourseBuilderBot/1.0; +https://example.local)";
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BOT_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BaseFetcher for HttpFetcher {
    async fn get_text(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            bail!("GET {url} returned {status}");
        }

        response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {url}"))
    }
}
