use std::time::Duration;

use chrono::{DateTime, Utc};

/// Compact human duration: `42s`, `3m 05s`, `2h 07m`, `3d 4h`.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m {:02}s", mins, secs % 60);
    }
    let hours = mins / 60;
    if hours < 24 {
        return format!("{}h {:02}m", hours, mins % 60);
    }
    format!("{}d {}h", hours / 24, hours % 24)
}

/// Server ETA arrives as (possibly fractional, possibly bogus) seconds.
pub fn format_eta(seconds: Option<f64>) -> String {
    match seconds {
        Some(s) if s.is_finite() && s >= 0.0 => format_duration(Duration::from_secs_f64(s)),
        _ => "--".to_string(),
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
