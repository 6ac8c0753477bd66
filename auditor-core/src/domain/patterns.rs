// auditor-core/src/domain/patterns.rs

// Hardcoded regular expressions shared by the classifier and the checks.
// Each one is compiled on first use and cached for the life of the process.

use regex::Regex;
use std::sync::OnceLock;

fn compile(pattern: &'static str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|_| {
        // Patterns are literals; a typo must not panic at runtime, it just never matches.
        Regex::new("$^").unwrap_or_else(|_| unreachable!())
    })
}

pub(crate) fn cached(cell: &'static OnceLock<Regex>, pattern: &'static str) -> &'static Regex {
    cell.get_or_init(|| compile(pattern))
}

pub fn email() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$")
}

pub fn phone() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"^\+?[\d\s\-.()]{7,20}$")
}

/// Structural identifier shapes: UUID-like, `PREFIX-123`, long numbers, uppercase codes.
pub fn id_shapes() -> [&'static Regex; 4] {
    static UUID: OnceLock<Regex> = OnceLock::new();
    static PREFIXED: OnceLock<Regex> = OnceLock::new();
    static LONG_NUMBER: OnceLock<Regex> = OnceLock::new();
    static CODE: OnceLock<Regex> = OnceLock::new();
    [
        cached(&UUID, r"^[A-Fa-f0-9\-]{8,}$"),
        cached(&PREFIXED, r"^[A-Z]{1,5}[\-_]\d+$"),
        cached(&LONG_NUMBER, r"^\d{5,}$"),
        cached(&CODE, r"^[A-Z0-9]{6,}$"),
    ]
}

/// C0/C1 control characters (tab, newlines and carriage return excepted) or U+FFFD.
pub fn encoding_anomaly() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x9f\x{FFFD}]")
}

/// At least two letters at the very end of a value.
pub fn trailing_letters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    cached(&RE, r"(?i)[a-záéíóúñ]{2}$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_and_phone_shapes() {
        assert!(email().is_match("ana.lopez@example.com"));
        assert!(!email().is_match("ana.lopez@example"));
        assert!(phone().is_match("+52 (55) 1234-5678"));
        assert!(!phone().is_match("call me"));
    }

    #[test]
    fn test_id_shapes() {
        let [uuid, prefixed, long_number, code] = id_shapes();
        assert!(uuid.is_match("550e8400-e29b-41d4-a716-446655440000"));
        assert!(prefixed.is_match("CUST-00042"));
        assert!(long_number.is_match("1234567"));
        assert!(code.is_match("AB12CD34"));
        assert!(!code.is_match("ab12"));
    }

    #[test]
    fn test_encoding_anomaly() {
        assert!(encoding_anomaly().is_match("caf\u{FFFD}"));
        assert!(encoding_anomaly().is_match("a\u{0}b"));
        assert!(encoding_anomaly().is_match("x\u{85}"));
        assert!(!encoding_anomaly().is_match("tab\there\r\n"));
        assert!(!encoding_anomaly().is_match("Señor Müller"));
    }
}
