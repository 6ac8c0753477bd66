// auditor-core/src/domain/classifier/dates.rs

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::domain::patterns::cached;

/// Label used for values only the general parser understood.
pub const GENERAL_FORMAT: &str = "general";

const SPANISH_FORMAT: &str = "%d de %B de %Y";

/// Explicit formats tried in order. The flag tells whether the format carries a time.
const EXPLICIT_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%d", false),
    ("%d/%m/%Y", false),
    ("%m/%d/%Y", false),
    ("%d-%m-%Y", false),
    ("%Y/%m/%d", false),
    ("%d.%m.%Y", false),
    ("%Y%m%d", false),
    ("%Y-%m-%d %H:%M:%S", true),
    ("%d/%m/%Y %H:%M:%S", true),
    ("%Y-%m-%dT%H:%M:%S", true),
    ("%Y-%m-%dT%H:%M:%SZ", true),
    ("%d %b %Y", false),
    ("%B %d, %Y", false),
];

// Fallback shapes for the general parser (no fuzzy matching: the whole value must parse).
const GENERAL_FORMATS: &[(&str, bool)] = &[
    ("%Y-%m-%d %H:%M", true),
    ("%Y-%m-%d %H:%M:%S%.f", true),
    ("%Y-%m-%dT%H:%M:%S%.f", true),
    ("%Y-%m-%dT%H:%M", true),
    ("%Y/%m/%d %H:%M:%S", true),
    ("%m/%d/%Y %H:%M:%S", true),
    ("%m/%d/%Y %H:%M", true),
    ("%d/%m/%Y %H:%M", true),
    ("%d-%b-%Y", false),
    ("%b %d %Y", false),
    ("%b %d, %Y", false),
    ("%B %d %Y", false),
    ("%d %B %Y", false),
    ("%Y.%m.%d", false),
    ("%m-%d-%Y", false),
];

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// A value recognised as a date, with the format that matched it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateMatch {
    pub value: NaiveDateTime,
    pub format: &'static str,
    pub has_time: bool,
}

fn spanish_long_date() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)^(\d{1,2}) de ([a-záéíóú]+) de (\d{4})$")
}

fn parse_with(value: &str, format: &'static str, has_time: bool) -> Option<DateMatch> {
    let parsed = if has_time {
        NaiveDateTime::parse_from_str(value, format).ok()
    } else {
        NaiveDate::parse_from_str(value, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    };
    parsed.map(|value| DateMatch {
        value,
        format,
        has_time,
    })
}

fn parse_spanish(value: &str) -> Option<DateMatch> {
    let caps = spanish_long_date().captures(value)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month_name = caps.get(2)?.as_str().to_lowercase();
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    let month = SPANISH_MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    let value = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    Some(DateMatch {
        value,
        format: SPANISH_FORMAT,
        has_time: false,
    })
}

// A general match carries a time only when the value also holds a space:
// `2024-03-15T08:30:00.123` stays a date, `2024-03-15 08:30` is a datetime.
fn parse_general(value: &str) -> Option<DateMatch> {
    let spaced = value.contains(' ');
    let general = |parsed: NaiveDateTime, has_time: bool| DateMatch {
        value: parsed,
        format: GENERAL_FORMAT,
        has_time: has_time && spaced,
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(general(dt.naive_local(), true));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(general(dt.naive_local(), true));
    }
    GENERAL_FORMATS
        .iter()
        .find_map(|(fmt, has_time)| parse_with(value, fmt, *has_time))
        .map(|m| general(m.value, m.has_time))
}

/// Parses one cell. Explicit formats win over the general parser.
pub fn parse_date(value: &str) -> Option<DateMatch> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    EXPLICIT_FORMATS
        .iter()
        .find_map(|(fmt, has_time)| parse_with(value, fmt, *has_time))
        .or_else(|| parse_spanish(value))
        .or_else(|| parse_general(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_explicit_formats_in_order() {
        let m = parse_date("2024-03-15").unwrap();
        assert_eq!(m.format, "%Y-%m-%d");
        assert!(!m.has_time);

        // Ambiguous day/month: the day-first format is tried first.
        let m = parse_date("05/03/2024").unwrap();
        assert_eq!(m.format, "%d/%m/%Y");
        assert_eq!(m.value.month(), 3);

        let m = parse_date("12/31/2024").unwrap();
        assert_eq!(m.format, "%m/%d/%Y");

        let m = parse_date("2024-03-15T08:30:00Z").unwrap();
        assert_eq!(m.format, "%Y-%m-%dT%H:%M:%SZ");
        assert!(m.has_time);
        assert_eq!(m.value.hour(), 8);
    }

    #[test]
    fn test_spanish_long_dates() {
        let m = parse_date("7 de Marzo de 2023").unwrap();
        assert_eq!(m.format, SPANISH_FORMAT);
        assert_eq!((m.value.day(), m.value.month()), (7, 3));
        assert!(parse_date("7 de brumario de 2023").is_none());
    }

    #[test]
    fn test_general_fallback() {
        let m = parse_date("2024-03-15 08:30").unwrap();
        assert_eq!(m.format, GENERAL_FORMAT);
        assert!(m.has_time);
        let m = parse_date("Mar 15 2024").unwrap();
        assert_eq!(m.format, GENERAL_FORMAT);
        assert!(!m.has_time);
    }

    #[test]
    fn test_general_iso_without_space_is_a_date() {
        let m = parse_date("2024-03-15T08:30:00.123").unwrap();
        assert_eq!(m.format, GENERAL_FORMAT);
        assert!(!m.has_time);
        assert_eq!(m.value.hour(), 8);
        let m = parse_date("2024-03-15T08:30:00+02:00").unwrap();
        assert!(!m.has_time);
        let m = parse_date("2024-03-15 08:30:00.123").unwrap();
        assert!(m.has_time);
    }

    #[test]
    fn test_rejects_non_dates() {
        for v in ["", "   ", "hello", "12.5", "ana@example.com", "2024-13-45"] {
            assert!(parse_date(v).is_none(), "{v} should not parse");
        }
    }
}
