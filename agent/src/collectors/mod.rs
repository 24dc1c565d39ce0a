pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One observation of this host, sent to the collector as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(alias = "id")]
    pub device_id: String,
    /// Seconds since the Unix epoch, shared by every metric group.
    pub timestamp: i64,
    pub cpu_usage_percent: Option<f64>,
    #[serde(default)]
    pub memory: memory::MemoryUsage,
    #[serde(default)]
    pub network: Vec<network::NetworkStats>,
    #[serde(default)]
    pub disk: Vec<disk::DiskStats>,
}

/// Source of samples for the agent loop.
pub trait Sampler {
    async fn collect(&self, device_id: &str) -> Result<Sample>;
}

/// Samples metrics by shelling out to the sysstat utilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysstatSampler;

impl Sampler for SysstatSampler {
    async fn collect(&self, device_id: &str) -> Result<Sample> {
        let timestamp = chrono::Utc::now().timestamp();

        let (cpu_out, mem_out, disk_out, net_out) = tokio::try_join!(
            run(cpu::COMMAND),
            run(memory::COMMAND),
            run(disk::COMMAND),
            run(network::COMMAND),
        )?;

        let sample = Sample {
            device_id: device_id.to_string(),
            timestamp,
            cpu_usage_percent: cpu::parse(&cpu_out),
            memory: memory::parse(&mem_out),
            network: network::parse(&net_out),
            disk: disk::parse(&disk_out),
        };

        if sample.memory.is_empty() {
            debug!("memory metrics unavailable for this cycle");
        }

        Ok(sample)
    }
}

/// Run one measurement command and return its stdout.
///
/// Only a failure to spawn is an error; a non-zero exit still yields whatever
/// the tool printed.
async fn run((program, args): (&str, &[&str])) -> Result<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .with_context(|| format!("failed to run `{program} {}`", args.join(" ")))?;

    if !output.status.success() {
        debug!(program, status = %output.status, "measurement command exited non-zero");
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sample {
        Sample {
            device_id: "3f1c0a4e-host".to_string(),
            timestamp: 1_792_310_400,
            cpu_usage_percent: Some(12.5),
            memory: memory::MemoryUsage {
                kbmemfree: Some(1024),
                kbmemused: Some(4096),
                memused_percent: Some(80.0),
            },
            network: vec![network::NetworkStats {
                iface: "eth0".to_string(),
                rx_kb: 1.5,
                tx_kb: 0.25,
            }],
            disk: vec![disk::DiskStats {
                device: "sda".to_string(),
                wait_ms: 2.0,
                util_percent: 0.5,
            }],
        }
    }

    #[test]
    fn test_sample_json_round_trip() {
        let original = sample();
        let json = serde_json::to_string(&original).unwrap();
        let decoded: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_sample_serializes_empty_groups() {
        let empty = Sample {
            cpu_usage_percent: None,
            memory: memory::MemoryUsage::default(),
            network: vec![],
            disk: vec![],
            ..sample()
        };
        let value = serde_json::to_value(&empty).unwrap();
        assert_eq!(value["device_id"], "3f1c0a4e-host");
        assert!(value["cpu_usage_percent"].is_null());
        assert_eq!(value["memory"], serde_json::json!({}));
        assert_eq!(value["network"], serde_json::json!([]));
    }

    #[test]
    fn test_id_alias_accepted() {
        let decoded: Sample =
            serde_json::from_str(r#"{"id":"dev1","timestamp":1,"cpu_usage_percent":null}"#)
                .unwrap();
        assert_eq!(decoded.device_id, "dev1");
        assert!(decoded.memory.is_empty());
    }

    #[tokio::test]
    async fn test_missing_command_is_error() {
        let err = run(("sysmon-definitely-not-installed", &[])).await;
        assert!(err.is_err());
    }
}
