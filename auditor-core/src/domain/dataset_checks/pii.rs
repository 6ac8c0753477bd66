// auditor-core/src/domain/dataset_checks/pii.rs

// Personal data hidden in any column: cards, national ids, emails, phones, IPs, IBANs.

use regex::Regex;

use super::DatasetAnalysis;
use crate::domain::checks::{CheckContext, CheckError, fraction, percent};
use crate::domain::model::{DiagnosticRecord, Severity, is_missing_token};
use crate::domain::stats::round_to;

/// Share of rows that must match before a column is reported.
pub const MIN_MATCH_SHARE: f64 = 0.05;
const MAX_SAMPLES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiKind {
    CreditCard,
    SsnUs,
    CurpMx,
    RfcMx,
    Email,
    PhoneIntl,
    IpAddress,
    Iban,
}

impl PiiKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreditCard => "CREDIT_CARD",
            Self::SsnUs => "SSN_US",
            Self::CurpMx => "CURP_MX",
            Self::RfcMx => "RFC_MX",
            Self::Email => "EMAIL",
            Self::PhoneIntl => "PHONE_INTL",
            Self::IpAddress => "IP_ADDRESS",
            Self::Iban => "IBAN",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::CreditCard => "Credit card number",
            Self::SsnUs => "Social Security Number (US)",
            Self::CurpMx => "CURP (Mexico)",
            Self::RfcMx => "RFC (Mexico)",
            Self::Email => "Email address",
            Self::PhoneIntl => "Phone number",
            Self::IpAddress => "IP address",
            Self::Iban => "IBAN",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::CreditCard | Self::SsnUs | Self::CurpMx => Severity::Critical,
            Self::RfcMx | Self::Email | Self::Iban => Severity::High,
            Self::PhoneIntl | Self::IpAddress => Severity::Medium,
        }
    }

    fn pattern(&self) -> &'static str {
        match self {
            Self::CreditCard => {
                r"\b(?:4\d{3}|5[1-5]\d{2}|3[47]\d{2}|6(?:011|5\d{2}))[- ]?\d{4}[- ]?\d{4}[- ]?\d{1,4}\b"
            }
            Self::SsnUs => r"\b\d{3}-\d{2}-\d{4}\b",
            Self::CurpMx => r"(?i)\b[A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d\b",
            Self::RfcMx => r"(?i)\b[A-ZÑ&]{3,4}\d{6}[A-Z0-9]{3}\b",
            Self::Email => r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b",
            Self::PhoneIntl => r"\b\+?\d{1,3}[-.\s]?\(?\d{2,4}\)?[-.\s]?\d{3,4}[-.\s]?\d{3,4}\b",
            Self::IpAddress => {
                r"\b(?:25[0-5]|2[0-4]\d|[01]?\d{1,2})(?:\.(?:25[0-5]|2[0-4]\d|[01]?\d{1,2})){3}\b"
            }
            Self::Iban => r"\b[A-Z]{2}\d{2}[A-Z0-9]{4,30}\b",
        }
    }

    pub const ALL: [PiiKind; 8] = [
        Self::CreditCard,
        Self::SsnUs,
        Self::CurpMx,
        Self::RfcMx,
        Self::Email,
        Self::PhoneIntl,
        Self::IpAddress,
        Self::Iban,
    ];
}

/// A PII hit inside one cell. Borrows the scanned text.
#[derive(Debug, Clone, PartialEq)]
pub struct PiiMatch<'a> {
    pub kind: PiiKind,
    pub matched_value: &'a str,
}

struct CompiledPattern {
    kind: PiiKind,
    regex: Regex,
}

/// Every PII pattern, compiled once.
pub struct PiiScanner {
    patterns: Vec<CompiledPattern>,
}

impl Default for PiiScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PiiScanner {
    pub fn new() -> Self {
        let patterns = PiiKind::ALL
            .iter()
            // The patterns are literals: one that does not compile is skipped, never fatal.
            .filter_map(|kind| {
                Regex::new(kind.pattern())
                    .ok()
                    .map(|regex| CompiledPattern { kind: *kind, regex })
            })
            .collect();
        Self { patterns }
    }

    /// First hit of each kind found in `text`.
    pub fn scan<'a>(&self, text: &'a str) -> Vec<PiiMatch<'a>> {
        self.patterns
            .iter()
            .filter_map(|p| {
                p.regex
                    .find_iter(text)
                    .map(|m| m.as_str())
                    .find(|m| p.kind != PiiKind::CreditCard || luhn_valid(m))
                    .map(|matched_value| PiiMatch {
                        kind: p.kind,
                        matched_value,
                    })
            })
            .collect()
    }
}

/// Luhn checksum over the digits of `candidate`.
pub fn luhn_valid(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 12 {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                *d
            }
        })
        .sum();
    sum % 10 == 0
}

/// Keeps the first and last quarter of a value visible.
pub fn mask_value(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let show = (chars.len() / 4).max(2);
    let head: String = chars[..show].iter().collect();
    let tail: String = chars[chars.len() - show..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 2 * show), tail)
}

#[derive(Default)]
pub struct PiiDetection {
    scanner: PiiScanner,
}

impl DatasetAnalysis for PiiDetection {
    fn id(&self) -> &'static str {
        "PII_DETECTION"
    }

    fn record_ids(&self) -> &'static [&'static str] {
        &["PII_DETECTED"]
    }

    fn run(&self, ctx: &CheckContext<'_>) -> Result<Vec<DiagnosticRecord>, CheckError> {
        let n_rows = ctx.dataset.n_rows();
        let mut records = Vec::new();
        if n_rows == 0 {
            return Ok(records);
        }

        for raw in ctx.dataset.raw_columns() {
            let cells: Vec<&str> = raw
                .values
                .iter()
                .filter(|v| !is_missing_token(v))
                .map(|v| v.trim())
                .collect();
            if cells.is_empty() {
                continue;
            }
            let hits: Vec<Vec<PiiMatch<'_>>> = cells.iter().map(|c| self.scanner.scan(c)).collect();

            for kind in PiiKind::ALL {
                let matched: Vec<&str> = cells
                    .iter()
                    .zip(&hits)
                    .filter(|(_, h)| h.iter().any(|m| m.kind == kind))
                    .map(|(c, _)| *c)
                    .collect();
                let share = fraction(matched.len(), n_rows);
                if matched.is_empty() || share < MIN_MATCH_SHARE {
                    continue;
                }
                records.push(
                    DiagnosticRecord::new("PII_DETECTED", &raw.name, kind.severity())
                        .with_value(round_to(share, 4))
                        .with_threshold(MIN_MATCH_SHARE)
                        .with_message(format!(
                            "PII detected: {}, {} rows ({})",
                            kind.description(),
                            matched.len(),
                            percent(share)
                        ))
                        .with_affected(matched.len(), share)
                        .with_samples(matched.iter().take(MAX_SAMPLES).map(|v| mask_value(v)))
                        .with_meta("pii_type", kind.as_str())
                        .with_meta("description", kind.description())
                        .with_meta("match_count", matched.len()),
                );
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::model::{ColumnTypes, Dataset, RawColumn};

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111 1111 1111 1111"));
        assert!(luhn_valid("5500-0000-0000-0004"));
        assert!(!luhn_valid("4111 1111 1111 1112"));
        assert!(!luhn_valid("4111"));
    }

    #[test]
    fn test_scanner_finds_hidden_values() {
        let scanner = PiiScanner::new();
        let kinds = |text: &str| -> Vec<PiiKind> { scanner.scan(text).iter().map(|m| m.kind).collect() };

        assert!(kinds("contact: ana.perez@example.com").contains(&PiiKind::Email));
        assert!(kinds("ssn 123-45-6789 on file").contains(&PiiKind::SsnUs));
        assert!(kinds("paid with 4111 1111 1111 1111").contains(&PiiKind::CreditCard));
        assert!(!kinds("paid with 4111 1111 1111 1112").contains(&PiiKind::CreditCard));
        assert!(kinds("from 192.168.1.20").contains(&PiiKind::IpAddress));
        assert!(kinds("GODE800101HDFRRN09").contains(&PiiKind::CurpMx));
        assert!(kinds("nothing to see").is_empty());
    }

    #[test]
    fn test_mask_value() {
        assert_eq!(mask_value("abc"), "****");
        assert_eq!(mask_value("123-45-6789"), "12*******89");
        assert_eq!(mask_value("ana.perez@example.com"), "ana.p***********e.com");
    }

    #[test]
    fn test_column_reported_once_share_is_reached() {
        let mut notes: Vec<String> = (0..40).map(|i| format!("note {}", i)).collect();
        notes[3] = "call 123-45-6789".to_string();
        notes[7] = "ssn 987-65-4321".to_string();
        notes[9] = "ref 111-22-3333".to_string();
        let mut comments: Vec<String> = (0..40).map(|i| format!("ok {}", i)).collect();
        comments[0] = "ssn 123-45-6789".to_string();

        let ds = Dataset::from_raw(vec![
            RawColumn::new("notes", notes),
            RawColumn::new("comments", comments),
        ])
        .unwrap();
        let types = ColumnTypes::new();
        let records = PiiDetection::default()
            .run(&CheckContext::new(&ds, &types))
            .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.column, "notes");
        assert_eq!(record.severity, Severity::Critical);
        assert_eq!(record.affected_count, 3);
        assert_eq!(record.metadata["pii_type"], "SSN_US");
        assert_eq!(record.sample_values[0], "call********6789");
    }
}
