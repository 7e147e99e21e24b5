//! Identifier Formatter
//!
//! Renders and parses the fixed business identifier formats:
//! - Contract number: `C-<K>-<ZONE>-<YY>-<SEQ5>` with `K ∈ {I,P,C,A}`,
//!   `ZONE` 3-4 uppercase letters, `YY` two digits, `SEQ5` zero-padded to 5
//!   digits (`^C-[IPCA]-[A-Z]{3,4}-\d{2}-\d{5}$`)
//! - Meter number: `M-<ZONE>-<CALIBER>-<SERIAL7>` with caliber 1-3 digits
//!   and the serial zero-padded to 7 digits (`^M-[A-Z]{3,4}-\d{1,3}-\d{7}$`)
//!
//! `parse_contract_number` is the exact left inverse of the formatter and
//! returns `None` on any non-conforming input, never panicking.

use shared::models::ContractKind;
use thiserror::Error;

/// Formatter input errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NumberFormatError {
    #[error("Zone '{0}' is not 3-4 uppercase letters")]
    BadZone(String),
    #[error("Sequence {0} outside 1..=99999")]
    SequenceOutOfRange(i64),
    #[error("Caliber {0} outside 1..=999")]
    CaliberOutOfRange(i64),
    #[error("Serial {0} outside 1..=9999999")]
    SerialOutOfRange(i64),
}

/// Parsed contract number components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedContractNumber {
    pub kind: ContractKind,
    pub zone: String,
    /// Two-digit year as stored in the number (0-99)
    pub year: u8,
    pub seq: u32,
}

fn is_zone_code(zone: &str) -> bool {
    (3..=4).contains(&zone.len()) && zone.chars().all(|c| c.is_ascii_uppercase())
}

/// Normalize a contract zone into the business-number alphabet.
///
/// Zones are 2-10 alphanumeric/`-`/`_` characters; only those consisting of
/// 3-4 letters can appear in a business number. Returns `None` otherwise —
/// finalize rejects such contracts instead of minting a malformed number.
pub fn zone_code(zone: &str) -> Option<String> {
    if (3..=4).contains(&zone.len()) && zone.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(zone.to_ascii_uppercase())
    } else {
        None
    }
}

/// Render a contract number. `year` is a full calendar year; the number
/// carries its last two digits.
pub fn format_contract_number(
    kind: ContractKind,
    zone: &str,
    year: i32,
    seq: i64,
) -> Result<String, NumberFormatError> {
    if !is_zone_code(zone) {
        return Err(NumberFormatError::BadZone(zone.to_string()));
    }
    if !(1..=99_999).contains(&seq) {
        return Err(NumberFormatError::SequenceOutOfRange(seq));
    }
    let yy = year.rem_euclid(100);
    Ok(format!("C-{}-{}-{:02}-{:05}", kind.code(), zone, yy, seq))
}

/// Render a meter number.
pub fn format_meter_number(
    zone: &str,
    caliber: i64,
    serial: i64,
) -> Result<String, NumberFormatError> {
    if !is_zone_code(zone) {
        return Err(NumberFormatError::BadZone(zone.to_string()));
    }
    if !(1..=999).contains(&caliber) {
        return Err(NumberFormatError::CaliberOutOfRange(caliber));
    }
    if !(1..=9_999_999).contains(&serial) {
        return Err(NumberFormatError::SerialOutOfRange(serial));
    }
    Ok(format!("M-{}-{}-{:07}", zone, caliber, serial))
}

/// Parse a contract number; `None` on anything that does not match the
/// published format exactly.
pub fn parse_contract_number(number: &str) -> Option<ParsedContractNumber> {
    let mut parts = number.split('-');

    if parts.next()? != "C" {
        return None;
    }

    let kind_part = parts.next()?;
    let mut kind_chars = kind_part.chars();
    let kind = ContractKind::from_code(kind_chars.next()?)?;
    if kind_chars.next().is_some() {
        return None;
    }

    let zone = parts.next()?;
    if !is_zone_code(zone) {
        return None;
    }

    let year_part = parts.next()?;
    if year_part.len() != 2 || !year_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: u8 = year_part.parse().ok()?;

    let seq_part = parts.next()?;
    if seq_part.len() != 5 || !seq_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seq: u32 = seq_part.parse().ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some(ParsedContractNumber {
        kind,
        zone: zone.to_string(),
        year,
        seq,
    })
}

/// Whether the string is a well-formed contract number
pub fn is_valid_contract_number(number: &str) -> bool {
    parse_contract_number(number).is_some()
}

/// Whether the string is a well-formed meter number
pub fn is_valid_meter_number(number: &str) -> bool {
    let mut parts = number.split('-');
    let Some("M") = parts.next() else { return false };
    let Some(zone) = parts.next() else { return false };
    if !is_zone_code(zone) {
        return false;
    }
    let Some(caliber) = parts.next() else { return false };
    if !(1..=3).contains(&caliber.len()) || !caliber.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Some(serial) = parts.next() else { return false };
    if serial.len() != 7 || !serial.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    parts.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_contract_number() {
        let n = format_contract_number(ContractKind::Professional, "TLS", 2025, 42).unwrap();
        assert_eq!(n, "C-P-TLS-25-00042");

        let n = format_contract_number(ContractKind::Administration, "LYON", 2030, 99_999).unwrap();
        assert_eq!(n, "C-A-LYON-30-99999");
    }

    #[test]
    fn test_format_rejects_bad_inputs() {
        assert_eq!(
            format_contract_number(ContractKind::Individual, "T", 2025, 1),
            Err(NumberFormatError::BadZone("T".into()))
        );
        assert_eq!(
            format_contract_number(ContractKind::Individual, "tls", 2025, 1),
            Err(NumberFormatError::BadZone("tls".into()))
        );
        assert_eq!(
            format_contract_number(ContractKind::Individual, "TLS", 2025, 0),
            Err(NumberFormatError::SequenceOutOfRange(0))
        );
        assert_eq!(
            format_contract_number(ContractKind::Individual, "TLS", 2025, 100_000),
            Err(NumberFormatError::SequenceOutOfRange(100_000))
        );
    }

    #[test]
    fn test_parse_is_left_inverse_of_format() {
        for (kind, zone, year, seq) in [
            (ContractKind::Individual, "TLS", 2025, 1),
            (ContractKind::Professional, "NANT", 2029, 12_345),
            (ContractKind::Collectivity, "ABC", 2000, 99_999),
            (ContractKind::Administration, "LYON", 2099, 7),
        ] {
            let n = format_contract_number(kind, zone, year, seq).unwrap();
            let parsed = parse_contract_number(&n).unwrap();
            assert_eq!(parsed.kind, kind);
            assert_eq!(parsed.zone, zone);
            assert_eq!(parsed.year as i32, year % 100);
            assert_eq!(parsed.seq as i64, seq);
        }
    }

    #[test]
    fn test_parse_rejects_garbled_input_without_panicking() {
        for bad in [
            "",
            "C",
            "C-P-TLS-25",
            "C-P-TLS-25-0001",     // 4-digit seq
            "C-P-TLS-25-000123",   // 6-digit seq
            "C-P-TLS-25-00042-X",  // trailing component
            "C-X-TLS-25-00042",    // unknown kind
            "C-PP-TLS-25-00042",   // two-letter kind
            "C-P-TL-25-00042",     // zone too short
            "C-P-TOURS-25-00042",  // zone too long
            "C-P-tls-25-00042",    // lowercase zone
            "C-P-TLS-2A-00042",    // non-digit year
            "C-P-TLS-251-00042",   // 3-digit year
            "C-P-TLS-25-0004a",    // non-digit seq
            "M-TLS-15-0000042",    // meter number, not contract
            "B-P-TLS-25-00042",    // wrong prefix
            "C_P_TLS_25_00042",    // wrong separator
        ] {
            assert_eq!(parse_contract_number(bad), None, "accepted {bad:?}");
        }
    }

    #[test]
    fn test_meter_number_format_and_validation() {
        let n = format_meter_number("TLS", 15, 42).unwrap();
        assert_eq!(n, "M-TLS-15-0000042");
        assert!(is_valid_meter_number(&n));

        assert!(is_valid_meter_number("M-LYON-1-9999999"));
        assert!(is_valid_meter_number("M-TLS-999-0000001"));

        assert!(!is_valid_meter_number("M-TLS-1000-0000001")); // caliber 4 digits
        assert!(!is_valid_meter_number("M-TLS-15-000042")); // serial 6 digits
        assert!(!is_valid_meter_number("M-tls-15-0000042"));
        assert!(!is_valid_meter_number("C-P-TLS-25-00042"));
        assert!(!is_valid_meter_number("M-TLS-15-0000042-X"));
    }

    #[test]
    fn test_zone_code_normalization() {
        assert_eq!(zone_code("tls"), Some("TLS".into()));
        assert_eq!(zone_code("Lyon"), Some("LYON".into()));
        assert_eq!(zone_code("TLS"), Some("TLS".into()));
        assert_eq!(zone_code("TL"), None); // too short for the number format
        assert_eq!(zone_code("TOURS"), None); // too long
        assert_eq!(zone_code("TL-1"), None); // digits/punctuation not encodable
    }
}
