use chrono::{DateTime, NaiveDate};

/// Parse the string half of a Prometheus `[timestamp, "value"]` pair.
/// Non-finite samples (`NaN`, `+Inf`) are dropped.
pub fn parse_sample_value(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => None,
    }
}

pub fn format_metric_display(metric: &str, instance: &str, mountpoint: Option<&str>, value: f64) -> String {
    let text = match metric {
        "cpu_usage" => format!("Avg CPU Usage: {:.2}%", value),
        "mem_usage" => format!("Max Mem Usage: {:.2}%", value),
        "disk_free" => format!("Min Disk Free ({}): {:.2}%", mountpoint.unwrap_or("/"), value),
        other => format!("{}: {:.2}", other, value),
    };
    format!("[{}] {}", instance, text)
}

pub fn date_from_epoch_secs(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

/// EC2 reports counts as optional signed integers; absent or negative means zero.
pub fn instance_count_from_api(raw: Option<i32>) -> u32 {
    raw.and_then(|c| u32::try_from(c).ok()).unwrap_or(0)
}

pub fn format_percentage(value: f64, precision: usize) -> String {
    format!("{:.*}%", precision, value)
}
