//! Serde support for durations written either as integer nanoseconds or as
//! strings such as `"1m30s"`, `"1.5s"` or `"250ms"`.
//!
//! Deserialization never fails: `null` and values that are not a valid
//! duration become [`Duration::ZERO`], so one bad field does not discard
//! the rest of the document.

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserializer, Serializer};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid duration {input:?}: {reason}")]
pub struct ParseDurationError {
    input: String,
    reason: &'static str,
}

impl ParseDurationError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(NANOS_PER_SEC),
        "m" => Some(60 * NANOS_PER_SEC),
        "h" => Some(3_600 * NANOS_PER_SEC),
        _ => None,
    }
}

/// Parse a sequence of `<decimal><unit>` terms into a [`Duration`].
pub fn parse(input: &str) -> Result<Duration, ParseDurationError> {
    let s = input.trim();
    let s = s.strip_prefix('+').unwrap_or(s);

    if s.is_empty() {
        return Err(ParseDurationError::new(input, "empty"));
    }
    if s.starts_with('-') {
        return Err(ParseDurationError::new(input, "negative"));
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    let mut rest = s;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(ParseDurationError::new(input, "expected a number"));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        if unit.is_empty() {
            return Err(ParseDurationError::new(input, "missing unit"));
        }
        let scale = unit_nanos(unit).ok_or_else(|| ParseDurationError::new(input, "unknown unit"))?;

        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if fraction.contains('.') {
            return Err(ParseDurationError::new(input, "expected a number"));
        }

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| ParseDurationError::new(input, "overflow"))?
        };
        let mut term = whole
            .checked_mul(scale)
            .ok_or_else(|| ParseDurationError::new(input, "overflow"))?;

        // Digits past nanosecond precision are dropped.
        let mut divisor: u128 = 1;
        for digit in fraction.bytes().take(18) {
            divisor *= 10;
            term += u128::from(digit - b'0') * scale / divisor;
        }

        total = total
            .checked_add(term)
            .ok_or_else(|| ParseDurationError::new(input, "overflow"))?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| ParseDurationError::new(input, "overflow"))?;
    Ok(Duration::from_nanos(nanos))
}

/// Render a [`Duration`] in the string form accepted by [`parse`].
pub fn format(duration: Duration) -> String {
    if duration.is_zero() {
        return "0s".to_string();
    }

    let nanos = duration.as_nanos();
    if nanos < NANOS_PER_SEC {
        return if nanos % 1_000_000 == 0 {
            format!("{}ms", nanos / 1_000_000)
        } else if nanos % 1_000 == 0 {
            format!("{}us", nanos / 1_000)
        } else {
            format!("{}ns", nanos)
        };
    }

    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3_600, (secs % 3_600) / 60, secs % 60);

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }

    let subsec = duration.subsec_nanos();
    if subsec == 0 {
        out.push_str(&format!("{seconds}s"));
    } else {
        let fraction = format!("{subsec:09}");
        out.push_str(&format!("{seconds}.{}s", fraction.trim_end_matches('0')));
    }
    out
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format(*duration))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl DurationVisitor {
    fn zero(found: impl fmt::Display) -> Duration {
        warn!("Ignoring invalid duration ({}), using 0s", found);
        Duration::ZERO
    }
}

impl<'de> Visitor<'de> for DurationVisitor {
    type Value = Duration;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a duration string or an integer number of nanoseconds")
    }

    fn visit_u64<E: de::Error>(self, nanos: u64) -> Result<Duration, E> {
        Ok(Duration::from_nanos(nanos))
    }

    fn visit_i64<E: de::Error>(self, nanos: i64) -> Result<Duration, E> {
        Ok(u64::try_from(nanos)
            .map(Duration::from_nanos)
            .unwrap_or_else(|_| Self::zero(format_args!("negative value {nanos}"))))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<Duration, E> {
        Ok(Self::zero(format_args!("non-integer value {value}")))
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<Duration, E> {
        Ok(Self::zero(format_args!("boolean {value}")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<Duration, E> {
        Ok(parse(value).unwrap_or_else(Self::zero))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Duration, E> {
        Ok(Duration::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Duration, E> {
        Ok(Duration::ZERO)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Duration, D::Error> {
        deserializer.deserialize_any(self)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Duration, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Self::zero("array"))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Duration, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(Self::zero("object"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_terms() {
        assert_eq!(parse("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse("2s"), Ok(Duration::from_secs(2)));
        assert_eq!(parse("3h"), Ok(Duration::from_secs(3 * 3_600)));
        assert_eq!(parse("15us"), Ok(Duration::from_micros(15)));
        assert_eq!(parse("15µs"), Ok(Duration::from_micros(15)));
        assert_eq!(parse("0"), Ok(Duration::ZERO));
    }

    #[test]
    fn parses_compound_and_fractional_terms() {
        assert_eq!(parse("1m30s"), Ok(Duration::from_secs(90)));
        assert_eq!(parse("1.5s"), Ok(Duration::from_millis(1_500)));
        assert_eq!(parse("1h0m0.25s"), Ok(Duration::from_millis(3_600_250)));
        assert_eq!(parse(".5m"), Ok(Duration::from_secs(30)));
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("").is_err());
        assert!(parse("10").is_err());
        assert!(parse("5 parsecs").is_err());
        assert!(parse("-1s").is_err());
        assert!(parse("1.2.3s").is_err());
        assert!(parse("s").is_err());
    }

    #[test]
    fn formats_into_parseable_strings() {
        for d in [
            Duration::ZERO,
            Duration::from_millis(250),
            Duration::from_micros(7),
            Duration::from_nanos(42),
            Duration::from_secs(90),
            Duration::from_millis(3_723_500),
        ] {
            assert_eq!(parse(&format(d)), Ok(d), "{}", format(d));
        }
        assert_eq!(format(Duration::from_secs(90)), "1m30s");
        assert_eq!(format(Duration::from_millis(3_723_500)), "1h2m3.5s");
    }

    #[derive(serde::Deserialize)]
    struct Frequency {
        #[serde(with = "super")]
        frequency: Duration,
    }

    fn frequency_of(json: &str) -> Duration {
        serde_jsonc::from_str::<Frequency>(json).unwrap().frequency
    }

    #[test]
    fn deserializes_strings_and_nanoseconds() {
        assert_eq!(frequency_of(r#"{ "frequency": "1m30s" }"#), Duration::from_secs(90));
        assert_eq!(frequency_of(r#"{ "frequency": 1500 }"#), Duration::from_nanos(1_500));
    }

    #[test]
    fn unusable_values_deserialize_to_zero() {
        for value in ["null", r#""5 sec""#, r#""""#, "-3", "1.5", "true", "[1, 2]", r#"{ "s": 1 }"#] {
            let json = format!(r#"{{ "frequency": {value} }}"#);
            assert_eq!(frequency_of(&json), Duration::ZERO, "{json}");
        }
    }
}
