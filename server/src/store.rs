//! In-memory sample store.
//!
//! Holds every ingested payload for the lifetime of the process, keyed by
//! device id in first-seen order. Payloads that carry no device id go to a
//! flat log. Nothing is persisted; a restart starts empty.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Payload fields consulted, in order, for the reporting device's id.
pub const DEVICE_ID_FIELDS: &[&str] = &["device_id", "id"];

/// An ingested payload plus the time the collector received it.
#[derive(Debug, Clone)]
struct StoredSample {
    received_at: i64,
    payload: Value,
}

impl StoredSample {
    /// Timestamp used for history windows: the payload's own integer
    /// `timestamp`, else the receive time.
    fn effective_timestamp(&self) -> i64 {
        self.payload
            .get("timestamp")
            .and_then(Value::as_i64)
            .unwrap_or(self.received_at)
    }
}

#[derive(Debug, Default)]
struct Inner {
    /// Device ids in the order they were first seen.
    order: Vec<String>,
    histories: HashMap<String, Vec<StoredSample>>,
    unkeyed: Vec<StoredSample>,
}

/// Where an ingested payload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Device(String),
    Unkeyed,
}

/// Process-wide store shared by all handlers.
///
/// A single lock serialises appends, so concurrent ingests for the same
/// device are stored in lock-acquisition order.
#[derive(Debug, Default)]
pub struct SampleStore {
    inner: RwLock<Inner>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a JSON object verbatim, received at `received_at` (epoch secs).
    pub async fn append(&self, payload: Map<String, Value>, received_at: i64) -> Placement {
        let device_id = device_id_of(&payload);
        let entry = StoredSample {
            received_at,
            payload: Value::Object(payload),
        };

        let mut inner = self.inner.write().await;
        match device_id {
            Some(id) => {
                if !inner.histories.contains_key(&id) {
                    inner.order.push(id.clone());
                }
                inner.histories.entry(id.clone()).or_default().push(entry);
                Placement::Device(id)
            }
            None => {
                inner.unkeyed.push(entry);
                Placement::Unkeyed
            }
        }
    }

    /// All known device ids, in first-seen order.
    pub async fn devices(&self) -> Vec<String> {
        self.inner.read().await.order.clone()
    }

    /// Up to `limit` samples for `device_id`, most recent first, whose
    /// timestamp lies within `[now - hours * 3600, now]`.
    ///
    /// Unknown devices yield an empty list.
    pub async fn history(&self, device_id: &str, limit: usize, hours: u64, now: i64) -> Vec<Value> {
        let window = i64::try_from(hours.saturating_mul(3600)).unwrap_or(i64::MAX);
        let since = now.saturating_sub(window);

        let inner = self.inner.read().await;
        let Some(samples) = inner.histories.get(device_id) else {
            return Vec::new();
        };

        samples
            .iter()
            .rev()
            .filter(|s| (since..=now).contains(&s.effective_timestamp()))
            .take(limit)
            .map(|s| s.payload.clone())
            .collect()
    }

    /// Payloads that carried no device id, in arrival order.
    pub async fn unkeyed(&self) -> Vec<Value> {
        self.inner
            .read()
            .await
            .unkeyed
            .iter()
            .map(|s| s.payload.clone())
            .collect()
    }

    /// Number of samples stored for `device_id`.
    pub async fn sample_count(&self, device_id: &str) -> usize {
        self.inner
            .read()
            .await
            .histories
            .get(device_id)
            .map_or(0, Vec::len)
    }
}

/// Extract a non-empty string device id from the payload.
fn device_id_of(payload: &Map<String, Value>) -> Option<String> {
    DEVICE_ID_FIELDS.iter().find_map(|field| {
        payload
            .get(*field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    })
}
