//! Services description extraction.
//!
//! The description feeds the classifier and frequency detector, so it only
//! needs to carry the right keywords, not a faithful line-item table.

use super::patterns::{
    ADDRESS_MARKER, INVOICE_NUMBER_REPEAT, LINE_ITEM_NOISE, SERVICES_LABEL, SERVICES_TABLE_HEADER,
    SERVICE_KEYWORDS, SIMPLE_TABLE_HEADER, TABLE_END, TRANSACTION_BLOCK, WHITESPACE,
};
use super::{ExtractionMatch, FieldExtractor};

/// Sentinel stored when no description block is found.
pub const NO_SERVICES: &str = "No service description found";

/// Default cap on the stored description, in characters.
pub const DEFAULT_MAX_LEN: usize = 500;

/// Characters inspected for address markers.
const ADDRESS_WINDOW: usize = 200;

/// Lines taken after a `Services:` label.
const LABEL_WINDOW: usize = 5;

/// Services description extractor.
#[derive(Debug, Clone)]
pub struct ServicesExtractor {
    max_len: usize,
}

impl ServicesExtractor {
    pub fn new() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
        }
    }

    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Lines after the first line matching `header`, up to a totals line.
    fn table_block(lines: &[&str], header: &regex::Regex) -> Option<String> {
        let start = lines.iter().position(|l| header.is_match(l))?;
        let body: Vec<&str> = lines[start + 1..]
            .iter()
            .take_while(|l| !TABLE_END.is_match(l))
            .copied()
            .collect();
        Some(body.join("\n"))
    }

    fn label_block(lines: &[&str]) -> Option<String> {
        let (idx, caps) = lines
            .iter()
            .enumerate()
            .find_map(|(idx, l)| SERVICES_LABEL.captures(l).map(|c| (idx, c)))?;

        let mut parts = vec![caps.get(1).map_or("", |m| m.as_str())];
        parts.extend(
            lines[idx + 1..]
                .iter()
                .take(LABEL_WINDOW)
                .take_while(|l| !l.trim().is_empty() && !TABLE_END.is_match(l))
                .copied(),
        );
        Some(parts.join("\n"))
    }

    fn transaction_block(text: &str) -> Option<String> {
        TRANSACTION_BLOCK
            .captures(text)
            .and_then(|caps| caps.get(1).map(|m| m.as_str().to_string()))
    }

    /// Strip table noise, collapse whitespace and cap the length.
    pub fn clean(&self, block: &str) -> String {
        let without_headers: Vec<&str> = block
            .lines()
            .filter(|l| !SERVICES_TABLE_HEADER.is_match(l) && !SIMPLE_TABLE_HEADER.is_match(l))
            .collect();
        let text = without_headers.join(" ");
        let text = LINE_ITEM_NOISE.replace_all(&text, " ");
        let text = INVOICE_NUMBER_REPEAT.replace_all(&text, " ");
        let text = WHITESPACE.replace_all(&text, " ");
        text.trim().chars().take(self.max_len).collect()
    }

    fn candidates(text: &str) -> Vec<Option<String>> {
        let lines: Vec<&str> = text.lines().collect();
        vec![
            Self::table_block(&lines, &SERVICES_TABLE_HEADER),
            Self::table_block(&lines, &SIMPLE_TABLE_HEADER),
            Self::label_block(&lines),
            Self::transaction_block(text),
        ]
    }
}

impl Default for ServicesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ServicesExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        Self::candidates(text)
            .into_iter()
            .enumerate()
            .filter_map(|(rule, block)| {
                let block = block?;
                let cleaned = self.clean(&block);
                if cleaned.is_empty() || looks_like_address(&cleaned) {
                    return None;
                }
                Some(ExtractionMatch::new(cleaned, rule, block))
            })
            .collect()
    }
}

/// An address block has address markers up front and no service vocabulary.
pub fn looks_like_address(text: &str) -> bool {
    let head: String = text.chars().take(ADDRESS_WINDOW).collect();
    if !ADDRESS_MARKER.is_match(&head) {
        return false;
    }
    let lower = text.to_lowercase();
    !SERVICE_KEYWORDS.iter().any(|k| lower.contains(k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services(text: &str) -> Option<String> {
        ServicesExtractor::new().extract(text).map(|m| m.value)
    }

    #[test]
    fn test_extended_price_table() {
        let text = "Item  Description                 Qty   Extended Price\n\
                    1     Managed SOC Monthly Fee     1     $4,000.00\n\
                    2     After-hours support          1     $500.00\n\
                    Subtotal $4,500.00\n";
        let s = services(text).unwrap();
        assert!(s.contains("Managed SOC Monthly Fee"));
        assert!(s.contains("After-hours support"));
        assert!(!s.contains("Subtotal"));
    }

    #[test]
    fn test_simple_table_strips_line_item_noise() {
        let text = "Quantity Description Taxable Ext Price\n\
                    1 Annual Subscription Renewal Yes $1,200.00\n\
                    Total $1,200.00\n";
        assert_eq!(services(text).unwrap(), "1 Annual Subscription Renewal");
    }

    #[test]
    fn test_services_label() {
        let text = "Services: Penetration testing\nexternal perimeter\n\nThank you";
        assert_eq!(services(text).unwrap(), "Penetration testing external perimeter");
    }

    #[test]
    fn test_transaction_block() {
        let text = "Transaction Type\nCloud hosting Q1 2025\nInvoice Number: 4600012\nItem Subtotal $900.00";
        assert_eq!(services(text).unwrap(), "Cloud hosting Q1 2025");
    }

    #[test]
    fn test_rejects_address_block() {
        let text = "Services:\nAttn: Accounts\n1 George Street\nSydney NSW 2000\n";
        assert_eq!(services(text), None);
    }

    #[test]
    fn test_truncates_to_max_len() {
        let long = "consulting ".repeat(100);
        let text = format!("Services: {long}");
        let s = ServicesExtractor::new().with_max_len(40).extract(&text).unwrap().value;
        assert_eq!(s.chars().count(), 40);
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(services(""), None);
        assert_eq!(services("Invoice Total $5.00"), None);
    }
}
