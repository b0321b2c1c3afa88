//! HTTP client for scraping with rate limiting and error handling.
//!
//! A thin wrapper over reqwest that enforces a per-process request budget
//! so sequential scrape jobs stay polite to the target sites.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// HTTP client configuration for scraping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            timeout_seconds: 30,
            max_requests_per_second: 4,
            follow_redirects: true,
        }
    }
}

/// Rate-limited HTTP client shared by the feed adapters and the static
/// page renderer.
pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .cookie_store(true)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    /// Fetch a URL, waiting on the rate limiter first. Non-2xx statuses
    /// are errors so callers can distinguish a block from an empty page.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP request failed with status {}: {}", response.status(), url);
        }

        Ok(response)
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from: {url}"))
    }

    /// Fetch a URL with query parameters and deserialize the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, params: &[(&str, String)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Fetching JSON: {} {:?}", url, params);

        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to fetch URL: {url}"))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP request failed with status {}: {}", response.status(), url);
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to decode JSON from: {url}"))
    }

    /// Download a binary body (product images).
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read bytes from: {url}"))?;
        Ok(bytes.to_vec())
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn client_creation_with_defaults() {
        let client = HttpClient::new(HttpClientConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn zero_rate_limit_is_rejected() {
        let config = HttpClientConfig {
            max_requests_per_second: 0,
            ..Default::default()
        };
        assert!(HttpClient::new(config).is_err());
    }
}
