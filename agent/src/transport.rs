use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::collectors::Sample;

/// Upper bound for one POST to the collector.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Delivers samples to the collector.
pub trait Transport {
    /// Returns `true` only when the collector accepted the sample.
    async fn send(&self, sample: &Sample) -> bool;
}

/// HTTP transport posting JSON samples to `{server_url}/data`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    verbose: bool,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(server_url: &str, verbose: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            endpoint: format!("{}/data", server_url.trim_end_matches('/')),
            verbose,
            http,
        })
    }

    async fn post(&self, sample: &Sample) -> Result<()> {
        if self.verbose {
            let payload = serde_json::to_string_pretty(sample)?;
            info!(endpoint = %self.endpoint, "Sending sample\n{payload}");
        }

        let resp = self
            .http
            .post(&self.endpoint)
            .json(sample)
            .send()
            .await
            .context("collector request failed")?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if self.verbose {
            info!(%status, "Collector response: {body}");
        }

        if !status.is_success() {
            anyhow::bail!("collector returned HTTP {status}");
        }
        Ok(())
    }
}

impl Transport for HttpTransport {
    async fn send(&self, sample: &Sample) -> bool {
        match self.post(sample).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Error sending sample: {e:#}");
                false
            }
        }
    }
}
