//! Human-readable formatting of rates and link-rate parsing.

use crate::cli::DisplayUnit;

const RATE_PREFIXES: [&str; 6] = [" ", "K", "M", "G", "T", "P"];
const PPS_PREFIXES: [&str; 5] = [" ", "K", "M", "G", "T"];
const BIT_LABELS: [&str; 6] = ["b/s", "Kb/s", "Mb/s", "Gb/s", "Tb/s", "Pb/s"];
const BYTE_LABELS: [&str; 6] = ["B/s", "KB/s", "MB/s", "GB/s", "TB/s", "PB/s"];

/// Divides by 1000 until below 1000 or out of prefixes.
fn scale_down(mut value: f64, steps: usize) -> (f64, usize) {
    let mut index = 0;
    while value.abs() >= 1000.0 && index < steps - 1 {
        value /= 1000.0;
        index += 1;
    }
    (value, index)
}

/// Formats a bytes/sec value in the chosen unit, e.g. `" 12.50 Gb/s"`.
pub fn human_rate(bytes_per_sec: f64, unit: DisplayUnit) -> String {
    let (value, index) = scale_down(bytes_per_sec * unit.factor(), RATE_PREFIXES.len());
    let suffix = match unit {
        DisplayUnit::Bits => "b/s",
        DisplayUnit::Bytes => "B/s",
    };
    format!("{value:6.2} {}{suffix}", RATE_PREFIXES[index])
}

/// Formats a packets/sec value, e.g. `"  1.20 Mpps"`.
pub fn human_pps(packets_per_sec: f64) -> String {
    let (value, index) = scale_down(packets_per_sec, PPS_PREFIXES.len());
    format!("{value:6.2} {}pps", PPS_PREFIXES[index])
}

/// Axis label for a value already expressed in display units.
pub fn scale_label(display_value: f64, unit: DisplayUnit) -> String {
    let (value, index) = scale_down(display_value.max(0.0), BIT_LABELS.len());
    let suffix = match unit {
        DisplayUnit::Bits => BIT_LABELS[index],
        DisplayUnit::Bytes => BYTE_LABELS[index],
    };
    format!("{value:6.2} {suffix}")
}

pub fn zero_label(unit: DisplayUnit) -> &'static str {
    match unit {
        DisplayUnit::Bits => "0.00 b/s",
        DisplayUnit::Bytes => "0.00 B/s",
    }
}

/// Parses the leading number of a link rate string such as
/// `"100 Gb/sec (4X EDR)"`. Returns 0 when absent or unparseable.
pub fn parse_rate_gbps(rate: Option<&str>) -> f64 {
    let Some(rate) = rate else {
        return 0.0;
    };

    let trimmed = rate.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(i, c)| !(c.is_ascii_digit() || *c == '.' || (*i == 0 && (*c == '+' || *c == '-'))))
        .map_or(trimmed.len(), |(i, _)| i);

    match trimmed[..end].parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}
