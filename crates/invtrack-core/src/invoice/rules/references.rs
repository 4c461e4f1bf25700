//! Invoice number, contract and purchase order references.

use super::patterns::{CONTRACT_NUMBER, INVOICE_NUMBER_PATTERNS, PO_NUMBER};
use super::{ExtractionMatch, FieldExtractor};

/// Invoice number extractor.
pub struct InvoiceNumberExtractor;

impl InvoiceNumberExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Known false positives: table labels captured after "Invoice" and
    /// words with no digits at all.
    fn is_plausible(candidate: &str) -> bool {
        candidate != "Total" && candidate.chars().any(|c| c.is_ascii_digit())
    }
}

impl Default for InvoiceNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for InvoiceNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results: Vec<Self::Output> = Vec::new();
        for (rule, pattern) in INVOICE_NUMBER_PATTERNS.iter().enumerate() {
            for caps in pattern.captures_iter(text) {
                let Some(group) = caps.get(1) else { continue };
                let candidate = group.as_str().trim_end_matches(['-', '/']);
                if !Self::is_plausible(candidate) {
                    continue;
                }
                if results.iter().any(|r| r.value == candidate) {
                    continue;
                }
                results.push(
                    ExtractionMatch::new(candidate.to_string(), rule, &caps[0])
                        .with_position(group.start(), group.end()),
                );
            }
        }
        results
    }
}

/// Customer contract extractor.
pub struct ContractExtractor;

impl ContractExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ContractExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ContractExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        CONTRACT_NUMBER
            .captures_iter(text)
            .filter_map(|caps| {
                let group = caps.get(1)?;
                let value = group.as_str().trim();
                if value.is_empty() {
                    return None;
                }
                Some(
                    ExtractionMatch::new(value.to_string(), 0, &caps[0])
                        .with_position(group.start(), group.end()),
                )
            })
            .collect()
    }
}

/// Purchase order number extractor.
pub struct PoNumberExtractor;

impl PoNumberExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PoNumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for PoNumberExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        PO_NUMBER
            .captures_iter(text)
            .filter_map(|caps| {
                let group = caps.get(1)?;
                Some(
                    ExtractionMatch::new(group.as_str().to_string(), 0, &caps[0])
                        .with_position(group.start(), group.end()),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_label_variants() {
        let extractor = InvoiceNumberExtractor::new();
        for (text, expected) in [
            ("Invoice #: 4612345", "4612345"),
            ("Invoice No. INV-2025-001", "INV-2025-001"),
            ("INVOICE NUMBER 4012345", "4012345"),
            ("Tax Invoice 88001", "88001"),
            ("Credit Memo # CM-1002", "CM-1002"),
        ] {
            assert_eq!(extractor.extract(text).unwrap().value, expected, "text {text:?}");
        }
    }

    #[test]
    fn test_invoice_number_rejects_total() {
        let extractor = InvoiceNumberExtractor::new();
        assert!(extractor.extract("Invoice # Total").is_none());
        let text = "Invoice # Total\nInvoice Number: 4700001";
        assert_eq!(extractor.extract(text).unwrap().value, "4700001");
    }

    #[test]
    fn test_tax_invoice_header_without_number() {
        let text = "TAX INVOICE\nBill To\nAcme";
        assert!(InvoiceNumberExtractor::new().extract(text).is_none());
    }

    #[test]
    fn test_contract() {
        let text = "Customer Contract: Acme Managed SOC 2025  \nPO Number: 55120";
        let contract = ContractExtractor::new().extract(text).unwrap();
        assert_eq!(contract.value, "Acme Managed SOC 2025");
        let po = PoNumberExtractor::new().extract(text).unwrap();
        assert_eq!(po.value, "55120");
    }

    #[test]
    fn test_missing_references() {
        assert!(ContractExtractor::new().extract("no references here").is_none());
        assert!(PoNumberExtractor::new().extract("PO Box 99").is_none());
    }
}
