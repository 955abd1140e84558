//! Locale-tolerant price text normalization.
//!
//! Page text such as `"€ 1.299,00"`, `"$1,234.56"` or `"19,99 EUR"` is reduced to
//! digits and separators and then parsed:
//!
//! - both `,` and `.` present: commas are thousands separators and are dropped
//! - only `,` present: the first comma is the decimal separator
//! - the longest leading `digits[.digits]` prefix is parsed

use crate::error::{ExtractError, Strategy};

/// Strip everything that is not a digit or separator and resolve separators.
pub fn clean_price_text(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.contains(',') && cleaned.contains('.') {
        cleaned.replace(',', "")
    } else if cleaned.contains(',') {
        cleaned.replacen(',', ".", 1)
    } else {
        cleaned
    }
}

/// Parse the longest numeric prefix of `s`.
fn parse_leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    let mut seen_dot = false;
    let mut seen_digit = false;

    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return None;
    }

    s[..end].trim_end_matches('.').parse::<f64>().ok()
}

/// Turn raw element text into a number, tagging failures with `strategy`.
pub fn normalize_with(strategy: Strategy, raw: &str) -> Result<f64, ExtractError> {
    let cleaned = clean_price_text(raw);
    parse_leading_float(&cleaned)
        .filter(|v| v.is_finite())
        .ok_or_else(|| ExtractError::parse_failure(strategy, raw.trim()))
}

/// Turn raw element text into a number.
pub fn normalize_price_text(raw: &str) -> Result<f64, ExtractError> {
    normalize_with(Strategy::Http, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma_and_period() {
        assert_eq!(normalize_price_text("1,234.56").unwrap(), 1234.56);
        assert_eq!(normalize_price_text("$ 12,345,678.90").unwrap(), 12345678.90);
    }

    #[test]
    fn test_comma_only_is_decimal() {
        assert_eq!(normalize_price_text("19,99").unwrap(), 19.99);
        assert_eq!(normalize_price_text("19,99 €").unwrap(), 19.99);
    }

    #[test]
    fn test_only_first_comma_becomes_decimal() {
        assert_eq!(normalize_price_text("1,234,567").unwrap(), 1.234);
    }

    #[test]
    fn test_currency_symbols_and_whitespace() {
        assert_eq!(normalize_price_text("  $42.00\n").unwrap(), 42.0);
        assert_eq!(normalize_price_text("Price: 45.50 USD").unwrap(), 45.5);
    }

    #[test]
    fn test_leading_prefix_semantics() {
        assert_eq!(normalize_price_text("1.234.56").unwrap(), 1.234);
        assert_eq!(normalize_price_text(".5").unwrap(), 0.5);
        assert_eq!(normalize_price_text("12.").unwrap(), 12.0);
    }

    #[test]
    fn test_parse_failure_keeps_raw_text() {
        match normalize_price_text("  Sold out ") {
            Err(ExtractError::ParseFailure { strategy, raw }) => {
                assert_eq!(strategy, Strategy::Http);
                assert_eq!(raw, "Sold out");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(normalize_price_text("").is_err());
        assert!(normalize_price_text(".").is_err());
        assert!(normalize_price_text(",").is_err());
    }

    #[test]
    fn test_failure_tagged_with_strategy() {
        let err = normalize_with(Strategy::Browser, "--").unwrap_err();
        assert_eq!(err.strategy(), Strategy::Browser);
    }
}
