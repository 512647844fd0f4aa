use chrono::{DateTime, FixedOffset, Timelike};

use crate::config::DATE_TIME_FORMAT;

/// Shortest decimal form of `value` that reads back to the same float.
/// Integral values have no fractional part (`3.0` renders as `3`).
pub fn format_float(value: f64) -> String {
    format!("{}", value)
}

/// Renders an `EXTINF` duration.
///
/// Integer mode rounds up to the next whole second. Float mode keeps three
/// decimals of the single-precision value, which is what players compare
/// against when they round-trip manifests.
pub fn format_duration(duration: f64, as_int: bool) -> String {
    if as_int {
        (duration.ceil() as i64).to_string()
    } else {
        format!("{:.3}", duration as f32)
    }
}

/// Renders a program date-time as RFC 3339 with nanosecond precision.
pub fn format_date_time(value: &DateTime<FixedOffset>) -> String {
    let mut out = value.format(DATE_TIME_FORMAT).to_string();

    // leap seconds are folded into the nanosecond field
    let nanos = value.nanosecond() % 1_000_000_000;
    if nanos > 0 {
        let digits = format!("{:09}", nanos);
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }

    if value.offset().local_minus_utc() == 0 {
        out.push('Z');
    } else {
        out.push_str(&value.format("%:z").to_string());
    }
    out
}

/// Parses an RFC 3339 date-time, also accepting offsets written without a
/// colon (`+0300`) as some packagers emit them.
pub fn parse_date_time(value: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
}
