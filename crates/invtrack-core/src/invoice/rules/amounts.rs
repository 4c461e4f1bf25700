//! Amount extraction.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::AMOUNT_PATTERNS;
use super::{ExtractionMatch, FieldExtractor};

/// Amount field extractor.
///
/// Tries the labeled totals first (Invoice Total, Open Credit, Item
/// Subtotal, Amount/Balance Due, Credit Amount) and falls back to the first
/// bare dollar amount in the text.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = ExtractionMatch<Decimal>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        AMOUNT_PATTERNS.iter().enumerate().find_map(|(rule, pattern)| {
            pattern.captures_iter(text).find_map(|caps| {
                let group = caps.get(1)?;
                let amount = parse_amount(group.as_str())?;
                Some(
                    ExtractionMatch::new(amount, rule, group.as_str().trim())
                        .with_position(group.start(), group.end()),
                )
            })
        })
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();
        for (rule, pattern) in AMOUNT_PATTERNS.iter().enumerate() {
            for caps in pattern.captures_iter(text) {
                let Some(group) = caps.get(1) else { continue };
                if let Some(amount) = parse_amount(group.as_str()) {
                    results.push(
                        ExtractionMatch::new(amount, rule, group.as_str().trim())
                            .with_position(group.start(), group.end()),
                    );
                }
            }
        }
        results
    }
}

/// Parse a captured money string such as `$1,234.56`, `-$50.00`, `($50.00)`
/// or `AUD 1,000.00`.
///
/// The value is negative when the text contains `-` or `(`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }

    let value = Decimal::from_str(&digits).ok()?;
    if raw.contains('-') || raw.contains('(') {
        Some(-value)
    } else {
        Some(value)
    }
}
