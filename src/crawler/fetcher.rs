use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::FetchError;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

const USER_AGENT: &str = "bookprice-scraper/0.3";

/// Fetches one listing page. The HTTP implementation lives behind a trait so
/// the category and orchestrator layers can be exercised without a network.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// TLS verification stays on unless explicitly overridden; the override
    /// is logged so it never disables silently.
    pub fn new(insecure_tls: bool, cancel: CancellationToken) -> anyhow::Result<Self> {
        if insecure_tls {
            warn!("TLS certificate verification disabled by configuration");
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(insecure_tls)
            .build()?;
        Ok(Self { client, cancel })
    }

    async fn attempt(&self, url: &str) -> Result<String, String> {
        match self.client.get(url).send().await {
            Ok(res) if res.status().is_success() => {
                res.text().await.map_err(|e| e.to_string())
            }
            Ok(res) => Err(format!("unexpected status {}", res.status())),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Fixed attempt ceiling with a fixed inter-attempt delay. No backoff.
    async fn fetch_with_retry(&self, url: &str) -> Result<String, FetchError> {
        let mut last = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(url).await {
                Ok(body) => {
                    debug!(url, attempt, "Page fetched");
                    return Ok(body);
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Fetch attempt failed");
                    last = e;
                }
            }
            if attempt < MAX_ATTEMPTS {
                sleep(RETRY_DELAY).await;
            }
        }
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts: MAX_ATTEMPTS,
            last,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FetchError::Cancelled {
                url: url.to_string(),
            }),
            res = self.fetch_with_retry(url) => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancelled_token_short_circuits_fetch() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetcher = HttpFetcher::new(false, cancel).unwrap();

        // Port 9 (discard) is never listening; cancellation must win before
        // any network attempt.
        let err = fetcher.fetch("http://127.0.0.1:9/").await.unwrap_err();
        assert!(matches!(err, FetchError::Cancelled { .. }));
    }
}
