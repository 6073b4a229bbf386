//! Date and timestamp text formats.
//!
//! Timestamps carry up to nine fractional digits and are normalized to
//! nanoseconds. Rendering prints the fraction only when it is non-zero, always
//! as nine digits.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::error::{WireError, WireResult};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Parse `YYYY-MM-DD`.
pub fn parse_date(text: &str) -> WireResult<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
        .map_err(|e| WireError::coercion(text, "DATE", e.to_string()))
}

/// Parse `YYYY-MM-DD HH:MM:SS[.f{1,9}]`. A `T` separator is accepted too.
pub fn parse_timestamp(text: &str) -> WireResult<NaiveDateTime> {
    parse_naive(text.trim(), "TIMESTAMP")
}

/// Parse a timestamp followed by a UTC offset: `Z`, `+HH`, `+HHMM` or `+HH:MM`.
pub fn parse_timestamptz(text: &str) -> WireResult<DateTime<FixedOffset>> {
    let text = text.trim();
    let invalid = |reason: &str| WireError::coercion(text, "TIMESTAMPTZ", reason);

    let (local, offset) = if let Some(local) = text.strip_suffix('Z') {
        (local, FixedOffset::east_opt(0))
    } else {
        // the offset sign can only appear after the date's own dashes
        let pos = text
            .char_indices()
            .skip(10)
            .find(|&(_, c)| c == '+' || c == '-')
            .map(|(i, _)| i)
            .ok_or_else(|| invalid("missing UTC offset"))?;
        (&text[..pos], parse_offset(&text[pos..]))
    };

    let offset = offset.ok_or_else(|| invalid("invalid UTC offset"))?;
    let naive = parse_naive(local.trim_end(), "TIMESTAMPTZ")?;
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| invalid("ambiguous local time"))
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    let (sign, body) = match text.as_bytes().first()? {
        b'+' => (1, &text[1..]),
        b'-' => (-1, &text[1..]),
        _ => return None,
    };
    let digits: String = body.chars().filter(|c| *c != ':').collect();
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
        _ => return None,
    };
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_naive(text: &str, target: &str) -> WireResult<NaiveDateTime> {
    let invalid = |reason: String| WireError::coercion(text, target, reason);

    let (date, time) = text
        .split_once([' ', 'T'])
        .ok_or_else(|| invalid("expected 'YYYY-MM-DD HH:MM:SS'".to_string()))?;
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).map_err(|e| invalid(e.to_string()))?;

    let (hms, fraction) = match time.split_once('.') {
        Some((hms, fraction)) => (hms, Some(fraction)),
        None => (time, None),
    };
    let time = NaiveTime::parse_from_str(hms, TIME_FORMAT).map_err(|e| invalid(e.to_string()))?;

    let nanos = match fraction {
        None => 0,
        Some(digits) => parse_nanos(digits)
            .ok_or_else(|| invalid("fraction must be 1 to 9 digits".to_string()))?,
    };
    let time = time
        .with_nanosecond(nanos)
        .ok_or_else(|| invalid("invalid fraction".to_string()))?;
    Ok(date.and_time(time))
}

/// `"5"` is 500ms, `"000000001"` is 1ns.
fn parse_nanos(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let base = ts.format("%Y-%m-%d %H:%M:%S");
    match ts.nanosecond() {
        0 => base.to_string(),
        nanos => format!("{base}.{nanos:09}"),
    }
}

pub fn format_timestamptz(ts: &DateTime<FixedOffset>) -> String {
    format!("{}{}", format_timestamp(&ts.naive_local()), ts.format("%:z"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-02-29").unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 2, 29));
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("20240229").is_err());
    }

    #[test]
    fn test_parse_timestamp_fraction_widths() {
        let cases = [
            ("2024-01-02 03:04:05", 0),
            ("2024-01-02 03:04:05.5", 500_000_000),
            ("2024-01-02 03:04:05.123", 123_000_000),
            ("2024-01-02 03:04:05.123456", 123_456_000),
            ("2024-01-02 03:04:05.000000001", 1),
        ];
        for (text, nanos) in cases {
            assert_eq!(parse_timestamp(text).unwrap().nanosecond(), nanos, "{text}");
        }
    }

    #[test]
    fn test_parse_timestamp_rejects_ten_digits() {
        assert!(parse_timestamp("2024-01-02 03:04:05.1234567890").is_err());
        assert!(parse_timestamp("2024-01-02 03:04:05.").is_err());
        assert!(parse_timestamp("2024-01-02").is_err());
    }

    #[test]
    fn test_format_timestamp() {
        let ts = parse_timestamp("2024-01-02 03:04:05").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02 03:04:05");
        let ts = parse_timestamp("2024-01-02 03:04:05.12").unwrap();
        assert_eq!(format_timestamp(&ts), "2024-01-02 03:04:05.120000000");
    }

    #[test]
    fn test_parse_timestamptz() {
        let ts = parse_timestamptz("2024-01-02 03:04:05.25+05:30").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
        assert_eq!(ts.nanosecond(), 250_000_000);

        let ts = parse_timestamptz("2024-01-02 03:04:05-08").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), -8 * 3600);

        let ts = parse_timestamptz("2024-01-02 03:04:05Z").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);

        assert!(parse_timestamptz("2024-01-02 03:04:05").is_err());
    }

    #[test]
    fn test_format_timestamptz() {
        let ts = parse_timestamptz("2024-01-02 03:04:05+01").unwrap();
        assert_eq!(format_timestamptz(&ts), "2024-01-02 03:04:05+01:00");
    }
}
