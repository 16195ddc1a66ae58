//! Duration flags written as `1y2d3h4m`.

use chrono::TimeDelta;

const SECONDS_PER_MINUTE: i64 = 60;
const SECONDS_PER_HOUR: i64 = 60 * SECONDS_PER_MINUTE;
const SECONDS_PER_DAY: i64 = 24 * SECONDS_PER_HOUR;
const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

/// Parse `<n><unit>` groups where unit is one of `y`, `d`, `h`, `m`, `s`.
pub(crate) fn parse_duration(input: &str) -> Result<TimeDelta, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration must not be empty".to_string());
    }

    let mut total: i64 = 0;
    let mut digits = String::new();
    for ch in trimmed.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }
        let unit = match ch {
            'y' => SECONDS_PER_YEAR,
            'd' => SECONDS_PER_DAY,
            'h' => SECONDS_PER_HOUR,
            'm' => SECONDS_PER_MINUTE,
            's' => 1,
            other => return Err(format!("invalid duration '{input}': unknown unit '{other}'")),
        };
        if digits.is_empty() {
            return Err(format!("invalid duration '{input}': unit '{ch}' has no amount"));
        }
        let amount: i64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{input}': amount too large"))?;
        total = amount
            .checked_mul(unit)
            .and_then(|seconds| total.checked_add(seconds))
            .ok_or_else(|| format!("invalid duration '{input}': amount too large"))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("invalid duration '{input}': missing unit after '{digits}'"));
    }
    TimeDelta::try_seconds(total).ok_or_else(|| format!("invalid duration '{input}': out of range"))
}
