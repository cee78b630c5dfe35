//! Compact duration strings such as `30s`, `5m` or `1h`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationParseError {
    #[error("empty duration string")]
    Empty,
    #[error("no numeric part in duration '{0}'")]
    MissingNumber(String),
    #[error("duration '{0}' is out of range")]
    Overflow(String),
    #[error("unknown duration unit '{unit}' in '{raw}'")]
    UnknownUnit { raw: String, unit: String },
}

/// Parse `<integer><unit>` where unit is one of `ns us µs ms s m h`.
pub fn parse_duration(raw: &str) -> Result<Duration, DurationParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::Empty);
    }

    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    if digits.is_empty() {
        return Err(DurationParseError::MissingNumber(raw.to_string()));
    }
    let value: u64 = digits
        .parse()
        .map_err(|_| DurationParseError::Overflow(raw.to_string()))?;

    let duration = match unit.trim().to_ascii_lowercase().as_str() {
        "ns" => Duration::from_nanos(value),
        "us" | "µs" => Duration::from_micros(value),
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(
            value
                .checked_mul(60)
                .ok_or_else(|| DurationParseError::Overflow(raw.to_string()))?,
        ),
        "h" => Duration::from_secs(
            value
                .checked_mul(3600)
                .ok_or_else(|| DurationParseError::Overflow(raw.to_string()))?,
        ),
        other => {
            return Err(DurationParseError::UnknownUnit {
                raw: raw.to_string(),
                unit: other.to_string(),
            });
        }
    };
    Ok(duration)
}
