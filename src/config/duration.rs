//! Duration strings such as `10s`, `250ms` or `1m30s`.
//!
//! Used as a serde adapter (`#[serde(with = "duration")]`) on config fields.

use std::time::Duration;

use serde::{de, Deserialize, Deserializer, Serializer};

/// Error returned for a malformed duration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid duration {input:?}: {reason}")]
pub struct DurationError {
    input: String,
    reason: &'static str,
}

impl DurationError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    Some(match unit {
        "ns" => 1,
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 3_600 * 1_000_000_000,
        _ => return None,
    })
}

/// Parse a sequence of decimal numbers, each with a unit suffix.
///
/// A bare `0` is accepted. Signs are not.
pub fn parse(input: &str) -> Result<Duration, DurationError> {
    let s = input.trim();
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(DurationError::new(input, "empty"));
    }

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let int_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (int_digits, after_int) = rest.split_at(int_len);

        let (frac_digits, after_num) = match after_int.strip_prefix('.') {
            Some(tail) => {
                let frac_len = tail.bytes().take_while(u8::is_ascii_digit).count();
                tail.split_at(frac_len)
            }
            None => ("", after_int),
        };
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(DurationError::new(input, "expected a number"));
        }

        let unit_len = after_num
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() || *c == '.')
            .map(|(i, _)| i)
            .unwrap_or(after_num.len());
        let (unit, tail) = after_num.split_at(unit_len);
        if unit.is_empty() {
            return Err(DurationError::new(input, "missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| DurationError::new(input, "unknown unit"))?;

        let whole: u128 = if int_digits.is_empty() {
            0
        } else {
            int_digits
                .parse()
                .map_err(|_| DurationError::new(input, "number too large"))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| DurationError::new(input, "overflow"))?;

        if !frac_digits.is_empty() {
            // Digits past nanosecond precision contribute nothing.
            let kept = &frac_digits[..frac_digits.len().min(18)];
            let numerator: u128 = kept
                .parse()
                .map_err(|_| DurationError::new(input, "bad fraction"))?;
            let denominator = 10u128.pow(kept.len() as u32);
            nanos = nanos
                .checked_add(numerator * scale / denominator)
                .ok_or_else(|| DurationError::new(input, "overflow"))?;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| DurationError::new(input, "overflow"))?;
        rest = tail;
    }

    let secs = u64::try_from(total / 1_000_000_000)
        .map_err(|_| DurationError::new(input, "overflow"))?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}

/// Render a duration in the shortest exact unit.
pub fn format(duration: &Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else if duration.subsec_nanos() % 1_000_000 == 0 {
        format!("{}ms", duration.as_millis())
    } else {
        format!("{}ns", duration.as_nanos())
    }
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(de::Error::custom)
}
