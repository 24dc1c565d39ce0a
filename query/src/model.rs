//! Samples as read back from the collector.
//!
//! The collector stores whatever the agents posted, so every field here is
//! decoded leniently: numbers may arrive as JSON numbers or numeric strings,
//! and anything malformed decodes as missing instead of failing the entry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, alias = "id", deserialize_with = "lenient_string")]
    pub device_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub cpu_usage_percent: Option<f64>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub memory: MemoryUsage,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub network: Vec<NetworkStats>,
    #[serde(default, deserialize_with = "lenient_rows")]
    pub disk: Vec<DiskStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemoryUsage {
    #[serde(default, deserialize_with = "lenient_number")]
    pub kbmemfree: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub kbmemused: Option<u64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub memused_percent: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NetworkStats {
    pub iface: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub rx_kb: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub tx_kb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DiskStats {
    pub device: String,
    #[serde(default, alias = "wait", deserialize_with = "lenient_number")]
    pub wait_ms: Option<f64>,
    #[serde(default, alias = "util", deserialize_with = "lenient_number")]
    pub util_percent: Option<f64>,
}

impl HistoryEntry {
    /// Decode entries returned by the history endpoint, skipping anything
    /// that is not a JSON object.
    pub fn decode_all(values: Vec<Value>) -> Vec<Self> {
        values
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|v| serde_json::from_value(v).ok())
            .collect()
    }
}

fn lenient_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Accept `12`, `12.5` or `"12.5"`; anything else is `None`.
fn lenient_number<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: std::str::FromStr + DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s.trim().parse().ok(),
        n @ Value::Number(_) => serde_json::from_value(n).ok(),
        _ => None,
    })
}

fn lenient_object<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(d)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Decode an array, dropping elements that don't fit `T`.
fn lenient_rows<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
