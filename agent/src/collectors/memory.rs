use serde::{Deserialize, Serialize};

/// Command used to sample memory usage once over one second.
pub const COMMAND: (&str, &[&str]) = ("sar", &["-r", "1", "1"]);

/// Memory usage as reported by `sar -r`.
///
/// All fields are absent when the output could not be read, which serializes
/// as an empty object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kbmemfree: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kbmemused: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memused_percent: Option<f64>,
}

impl MemoryUsage {
    pub fn is_empty(&self) -> bool {
        self.kbmemfree.is_none() && self.kbmemused.is_none() && self.memused_percent.is_none()
    }
}

/// Parse `sar -r` output, reading the final line (the most recent sample or
/// the `Average:` summary).
///
/// Columns: `<time|Average:> kbmemfree kbavail kbmemused %memused ...`
pub fn parse(raw: &str) -> MemoryUsage {
    let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
    // banner + header + at least one data line
    if lines.len() < 3 {
        return MemoryUsage::default();
    }

    let parts: Vec<&str> = lines[lines.len() - 1].split_whitespace().collect();
    if parts.len() < 5 {
        return MemoryUsage::default();
    }

    match (
        parts[1].parse::<u64>(),
        parts[3].parse::<u64>(),
        parts[4].parse::<f64>(),
    ) {
        (Ok(free), Ok(used), Ok(pct)) => MemoryUsage {
            kbmemfree: Some(free),
            kbmemused: Some(used),
            memused_percent: Some(pct),
        },
        _ => MemoryUsage::default(),
    }
}
