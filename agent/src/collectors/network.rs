use serde::{Deserialize, Serialize};

/// Command used to sample per-interface network throughput.
pub const COMMAND: (&str, &[&str]) = ("sar", &["-n", "DEV", "1", "1"]);

/// Interface name prefixes reported by the agent: wired, predictable-name,
/// wireless and loopback.
const IFACE_PREFIXES: &[&str] = &["eth", "en", "wl", "lo"];

/// Receive/transmit throughput for one interface, in kB/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    pub iface: String,
    pub rx_kb: f64,
    pub tx_kb: f64,
}

/// Parse `sar -n DEV` output, keeping only the `Average:` summary rows of
/// matching interfaces.
///
/// Columns: `Average: IFACE rxpck/s txpck/s rxkB/s txkB/s ...`
pub fn parse(raw: &str) -> Vec<NetworkStats> {
    raw.lines()
        .filter(|line| line.starts_with("Average"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 6 {
                return None;
            }
            let iface = parts[1];
            if !IFACE_PREFIXES.iter().any(|p| iface.starts_with(p)) {
                return None;
            }
            let rx_kb = parts[4].parse::<f64>().ok()?;
            let tx_kb = parts[5].parse::<f64>().ok()?;
            Some(NetworkStats {
                iface: iface.to_string(),
                rx_kb,
                tx_kb,
            })
        })
        .collect()
}
