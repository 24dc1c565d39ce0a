use serde::{Deserialize, Serialize};

/// Command used to sample extended per-device I/O statistics.
pub const COMMAND: (&str, &[&str]) = ("iostat", &["-dx", "1", "1"]);

/// I/O latency and utilisation for one block device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskStats {
    pub device: String,
    pub wait_ms: f64,
    pub util_percent: f64,
}

/// Wait-time column names in order of preference. Older sysstat releases
/// print a combined `await`, newer ones only split read/write.
const WAIT_COLUMNS: &[&str] = &["await", "w_await", "r_await"];
const UTIL_COLUMN: &str = "%util";

/// Column positions resolved from an `iostat -x` header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    wait: usize,
    util: usize,
}

impl Columns {
    fn from_header(parts: &[&str]) -> Option<Self> {
        let util = parts.iter().position(|p| *p == UTIL_COLUMN)?;
        let wait = WAIT_COLUMNS
            .iter()
            .find_map(|name| parts.iter().position(|p| p == name))?;
        Some(Self { wait, util })
    }

    fn min_len(&self) -> usize {
        self.wait.max(self.util) + 1
    }
}

/// Parse `iostat -dx` output into one row per device listed after the
/// `Device` header.
///
/// Lines that are too short or carry non-numeric values are skipped.
pub fn parse(raw: &str) -> Vec<DiskStats> {
    let mut columns: Option<Columns> = None;
    let mut disks = Vec::new();

    for line in raw.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = parts.first() else {
            continue;
        };

        if first.trim_end_matches(':') == "Device" {
            columns = Columns::from_header(&parts);
            continue;
        }

        let Some(cols) = columns else {
            continue;
        };
        if parts.len() < cols.min_len() {
            continue;
        }

        let (Ok(wait_ms), Ok(util_percent)) =
            (parts[cols.wait].parse::<f64>(), parts[cols.util].parse::<f64>())
        else {
            continue;
        };

        disks.push(DiskStats {
            device: first.to_string(),
            wait_ms,
            util_percent,
        });
    }

    disks
}
