use crate::{ScanError, ScanResult};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Retrieves the HTML of a page under check.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ScanResult<String>;

    /// Upper bound on a single fetch, reported in timeout diagnostics.
    fn timeout(&self) -> Duration;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> ScanResult<Self> {
        if timeout.is_zero() {
            return Err(ScanError::InvalidConfig {
                message: "Timeout must be greater than 0".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScanError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client, timeout })
    }

    async fn get(&self, url: &str) -> ScanResult<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ScanError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                ScanError::Request {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScanError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ScanError::Request {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ScanResult<String> {
        debug!("Fetching {}", url);
        match tokio::time::timeout(self.timeout, self.get(url)).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
