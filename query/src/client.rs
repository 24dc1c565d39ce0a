use anyhow::{Context, Result};
use reqwest::Url;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::model::HistoryEntry;

/// Maximum samples requested per device.
pub const HISTORY_LIMIT: usize = 100;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only client for the collector's query endpoints.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    base_url: Url,
    http: reqwest::Client,
}

impl CollectorClient {
    /// `base_url` is the scheme + host, e.g. `"http://10.0.0.5:8080"`.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid server URL {base_url:?}"))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { base_url, http })
    }

    /// GET /devices
    pub async fn list_devices(&self) -> Result<Vec<String>> {
        let url = self.endpoint(&["devices"])?;
        debug!(%url, "Fetching devices");
        self.http
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .context("Error fetching devices")?
            .json()
            .await
            .context("Error decoding device list")
    }

    /// GET /data/{device_id}?limit=100&hours={hours}, most recent first.
    pub async fn fetch_history(&self, device_id: &str, hours: u64) -> Result<Vec<HistoryEntry>> {
        let url = self.endpoint(&["data", device_id])?;
        debug!(%url, hours, "Fetching history");
        let values: Vec<Value> = self
            .http
            .get(url)
            .query(&[("limit", HISTORY_LIMIT as u64), ("hours", hours)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("Error fetching stats for device {device_id}"))?
            .json()
            .await
            .with_context(|| format!("Error decoding stats for device {device_id}"))?;
        Ok(HistoryEntry::decode_all(values))
    }

    /// Append percent-encoded path segments to the base URL.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("server URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Json, Router,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_list_devices() {
        let app = Router::new().route("/devices", get(|| async { Json(json!(["a", "b"])) }));
        let client = CollectorClient::new(&spawn_stub(app).await).unwrap();
        assert_eq!(client.list_devices().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fetch_history_sends_limit_and_hours() {
        let app = Router::new().route(
            "/data/:id",
            get(
                |Path(id): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    Json(json!([
                        {"device_id": id, "timestamp": q["limit"], "cpu_usage_percent": q["hours"]},
                        "not an object"
                    ]))
                },
            ),
        );
        let client = CollectorClient::new(&spawn_stub(app).await).unwrap();

        let entries = client.fetch_history("rack 7", 6).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].device_id.as_deref(), Some("rack 7"));
        assert_eq!(entries[0].timestamp, Some(HISTORY_LIMIT as i64));
        assert_eq!(entries[0].cpu_usage_percent, Some(6.0));
    }

    #[tokio::test]
    async fn test_server_error_is_fatal() {
        let app = Router::new().route(
            "/devices",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let client = CollectorClient::new(&spawn_stub(app).await).unwrap();
        let err = client.list_devices().await.unwrap_err();
        assert!(format!("{err:#}").contains("Error fetching devices"));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = CollectorClient::new("http://collector:8080/").unwrap();
        let url = client.endpoint(&["data", "a/b"]).unwrap();
        assert_eq!(url.as_str(), "http://collector:8080/data/a%2Fb");
    }
}
