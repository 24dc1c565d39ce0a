/// Command used to sample CPU utilisation over a single one-second window.
pub const COMMAND: (&str, &[&str]) = ("mpstat", &["1", "1"]);

/// Parse `mpstat` output into a busy percentage (`100 - %idle`).
///
/// Only the last non-empty line is considered; its final column is `%idle`.
/// Returns `None` when that column is missing or not a number.
pub fn parse(raw: &str) -> Option<f64> {
    let last = raw.lines().rev().find(|l| !l.trim().is_empty())?;
    let idle: f64 = last.split_whitespace().last()?.parse().ok()?;
    if !idle.is_finite() {
        return None;
    }
    Some((100.0 - idle).clamp(0.0, 100.0))
}
