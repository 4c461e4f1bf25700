//! Currency detection.

use std::str::FromStr;

use super::patterns::CURRENCY_CODE;
use super::{ExtractionMatch, FieldExtractor};
use crate::models::invoice::Currency;

/// Currency extractor: ISO code first, then symbol hints.
pub struct CurrencyExtractor;

impl CurrencyExtractor {
    pub fn new() -> Self {
        Self
    }

    fn from_symbols(text: &str) -> Option<ExtractionMatch<Currency>> {
        if text.contains("A$") || (text.contains('$') && text.contains("AUD")) {
            return Some(ExtractionMatch::new(Currency::Aud, 1, "$"));
        }
        if text.contains('€') {
            return Some(ExtractionMatch::new(Currency::Eur, 1, "€"));
        }
        if text.contains('£') {
            return Some(ExtractionMatch::new(Currency::Gbp, 1, "£"));
        }
        None
    }
}

impl Default for CurrencyExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for CurrencyExtractor {
    type Output = ExtractionMatch<Currency>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text)
            .into_iter()
            .next()
            .or_else(|| Self::from_symbols(text))
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CURRENCY_CODE
            .find_iter(text)
            .filter_map(|m| {
                let currency = Currency::from_str(m.as_str()).ok()?;
                Some(ExtractionMatch::new(currency, 0, m.as_str()).with_position(m.start(), m.end()))
            })
            .collect()
    }
}

/// Detect the invoice currency, falling back to `default`.
pub fn detect_currency(text: &str, default: Currency) -> Currency {
    CurrencyExtractor::new()
        .extract(text)
        .map(|m| m.value)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso_code() {
        assert_eq!(detect_currency("Total GBP 100.00", Currency::Usd), Currency::Gbp);
        assert_eq!(detect_currency("Amount in SGD", Currency::Usd), Currency::Sgd);
    }

    #[test]
    fn test_code_must_be_a_word() {
        // "SAUDI" contains AUD but is not a currency code
        assert_eq!(detect_currency("SAUDI ARAMCO", Currency::Usd), Currency::Usd);
    }

    #[test]
    fn test_symbol_fallbacks() {
        assert_eq!(detect_currency("Total: A$500.00", Currency::Usd), Currency::Aud);
        assert_eq!(detect_currency("Total: €500.00", Currency::Usd), Currency::Eur);
        assert_eq!(detect_currency("Total: £500.00", Currency::Usd), Currency::Gbp);
    }

    #[test]
    fn test_default_currency() {
        assert_eq!(detect_currency("Total: $500.00", Currency::Usd), Currency::Usd);
        assert_eq!(detect_currency("", Currency::Aud), Currency::Aud);
    }
}
