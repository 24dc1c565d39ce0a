use chrono::{Local, TimeZone};
use std::io::{self, Write};

use crate::model::HistoryEntry;

/// Rows shown in the verbose history table.
pub const HISTORY_ROWS: usize = 10;

pub const NO_DATA: &str = "No statistics available for this device/time range";

const MISSING: &str = "n/a";

/// Print the latest snapshot of `entries` (most recent first), plus a history
/// table when `verbose` is set.
pub fn render<W: Write>(out: &mut W, entries: &[HistoryEntry], verbose: bool) -> io::Result<()> {
    let Some(latest) = entries.first() else {
        return writeln!(out, "{NO_DATA}");
    };

    snapshot(out, latest)?;

    if verbose {
        history_table(out, &entries[..entries.len().min(HISTORY_ROWS)])?;
    }
    Ok(())
}

fn snapshot<W: Write>(out: &mut W, latest: &HistoryEntry) -> io::Result<()> {
    let mem = &latest.memory;

    writeln!(out)?;
    writeln!(out, " Device: {}", latest.device_id.as_deref().unwrap_or(MISSING))?;
    writeln!(out, "  Last Updated: {}", format_timestamp(latest.timestamp))?;
    writeln!(out)?;
    writeln!(out, " System Metrics:")?;
    writeln!(out, "  CPU Usage: {}%", fmt_f64(latest.cpu_usage_percent, 1))?;
    writeln!(out, "  Memory: {}% used", fmt_f64(mem.memused_percent, 2))?;
    writeln!(out, "    Free: {} KB", fmt_u64(mem.kbmemfree))?;
    writeln!(out, "    Used: {} KB", fmt_u64(mem.kbmemused))?;

    writeln!(out)?;
    writeln!(out, " Network Interfaces:")?;
    for iface in &latest.network {
        writeln!(
            out,
            "  {}: RX {} KB/s / TX {} KB/s",
            iface.iface,
            fmt_f64(iface.rx_kb, 2),
            fmt_f64(iface.tx_kb, 2)
        )?;
    }

    writeln!(out)?;
    writeln!(out, " Disk Activity:")?;
    for disk in &latest.disk {
        writeln!(
            out,
            "  {}: wait {} ms, util {}%",
            disk.device,
            fmt_f64(disk.wait_ms, 1),
            fmt_f64(disk.util_percent, 1)
        )?;
    }
    Ok(())
}

fn history_table<W: Write>(out: &mut W, entries: &[HistoryEntry]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, " Historical Data:")?;
    writeln!(
        out,
        "{:<19}  {:>6}  {:>8}  {:>15}  {:>15}",
        "Time", "CPU%", "Memory%", "Net(RX/TX)", "Disk(Util%)"
    )?;
    writeln!(out, "{}", "-".repeat(19 + 2 + 6 + 2 + 8 + 2 + 15 + 2 + 15))?;

    for entry in entries {
        let net = entry
            .network
            .iter()
            .map(|n| format!("{}/{}", fmt_f64(n.rx_kb, 2), fmt_f64(n.tx_kb, 2)))
            .collect::<Vec<_>>()
            .join("/");
        let disk = entry
            .disk
            .iter()
            .map(|d| fmt_f64(d.util_percent, 1))
            .collect::<Vec<_>>()
            .join("/");

        writeln!(
            out,
            "{:<19}  {:>5}%  {:>7}%  {:>15}  {:>15}",
            format_timestamp(entry.timestamp),
            fmt_f64(entry.cpu_usage_percent, 1),
            fmt_f64(entry.memory.memused_percent, 2),
            net,
            disk
        )?;
    }
    Ok(())
}

/// Local date-time as `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(ts: Option<i64>) -> String {
    ts.and_then(|secs| Local.timestamp_opt(secs, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

fn fmt_f64(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.precision$}"))
}

fn fmt_u64(value: Option<u64>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}
