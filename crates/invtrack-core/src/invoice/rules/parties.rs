//! Client name extraction.
//!
//! Strategies run in order and the first one that yields a plausible name
//! wins:
//!
//! 1. the line-by-line `BILL TO` block, skipping attention lines, PO boxes,
//!    ship-to columns, department codes, address and contact lines and bare
//!    city names, and merging a continuation word such as `Health` or `Ltd`
//!    sitting alone on the next line;
//! 2. an explicit `Customer:` / `Client:` label;
//! 3. the first substantial line after a `TO:` header;
//! 4. a guess from the original file name.

use std::fmt;
use std::path::Path;

use super::patterns::{
    ADDRESS_LINE, ATTN_LINE, BILL_TO_HEADER, CITY_NAMES, CONTACT_LINE, CUSTOMER_LABEL,
    DEPARTMENT_CODE, HEADER_LINE, NAME_CONTINUATIONS, PO_BOX, SHIP_TO, TO_HEADER,
};
use super::{ExtractionMatch, FieldExtractor};

/// Placeholder used when no strategy finds a client.
pub const UNKNOWN_CLIENT: &str = "Unknown Client";

/// Lines scanned after a `BILL TO` header.
const BILL_TO_WINDOW: usize = 6;

/// Lines scanned after a `TO:` header.
const TO_WINDOW: usize = 5;

/// File name tokens that never name a client.
const GENERIC_FILENAME_WORDS: &[&str] = &[
    "invoice", "invoices", "inv", "tax", "credit", "memo", "copy", "final", "draft",
    "scan", "scanned", "file", "document", "doc", "pdf", "statement",
];

/// Which strategy produced the client name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSource {
    BillTo,
    CustomerLabel,
    ToHeader,
    Filename,
}

impl ClientSource {
    fn from_rule(rule: usize) -> Self {
        match rule {
            0 => Self::BillTo,
            1 => Self::CustomerLabel,
            2 => Self::ToHeader,
            _ => Self::Filename,
        }
    }
}

impl fmt::Display for ClientSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BillTo => "bill-to block",
            Self::CustomerLabel => "customer label",
            Self::ToHeader => "to header",
            Self::Filename => "file name",
        };
        f.write_str(name)
    }
}

/// Client name extractor over invoice text.
pub struct ClientExtractor;

impl ClientExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Run the text strategies, then the file name guess.
    pub fn resolve(&self, text: &str, filename: &str) -> Option<(String, ClientSource)> {
        if let Some(m) = self.extract(text) {
            return Some((m.value, ClientSource::from_rule(m.rule)));
        }
        guess_client_from_filename(filename).map(|name| (name, ClientSource::Filename))
    }

    fn from_bill_to(lines: &[&str]) -> Option<String> {
        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = BILL_TO_HEADER.captures(line) else {
                continue;
            };

            let mut candidates: Vec<&str> = Vec::with_capacity(BILL_TO_WINDOW + 1);
            if let Some(rest) = caps.get(1) {
                candidates.push(rest.as_str());
            }
            candidates.extend(lines.iter().skip(idx + 1).take(BILL_TO_WINDOW));

            let candidates: Vec<&str> = candidates
                .into_iter()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .collect();

            for (pos, candidate) in candidates.iter().enumerate() {
                if is_noise_line(candidate) {
                    continue;
                }
                let mut name = candidate.to_string();
                if let Some(next) = candidates.get(pos + 1) {
                    if is_name_continuation(next) {
                        name.push(' ');
                        name.push_str(next);
                    }
                }
                return Some(clean_name(&name));
            }
        }
        None
    }

    fn from_customer_label(text: &str) -> Option<String> {
        CUSTOMER_LABEL
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_string()))
            .find(|name| is_plausible_name(name))
            .map(|name| clean_name(&name))
    }

    fn from_to_header(lines: &[&str]) -> Option<String> {
        for (idx, line) in lines.iter().enumerate() {
            let Some(caps) = TO_HEADER.captures(line) else {
                continue;
            };

            if let Some(rest) = caps.get(1).map(|m| m.as_str().trim()) {
                if is_substantial(rest) {
                    return Some(clean_name(rest));
                }
            }

            let found = lines
                .iter()
                .skip(idx + 1)
                .take(TO_WINDOW)
                .map(|l| l.trim())
                .find(|l| is_substantial(l));
            if let Some(name) = found {
                return Some(clean_name(name));
            }
        }
        None
    }
}

impl Default for ClientExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for ClientExtractor {
    type Output = ExtractionMatch<String>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let lines: Vec<&str> = text.lines().collect();
        [
            Self::from_bill_to(&lines),
            Self::from_customer_label(text),
            Self::from_to_header(&lines),
        ]
        .into_iter()
        .enumerate()
        .filter_map(|(rule, name)| name.map(|n| ExtractionMatch::new(n.clone(), rule, n)))
        .collect()
    }
}

/// Guess a client from a file name like `Acme_Health_Invoice_4612345.pdf`.
///
/// Returns `None` when only generic words and numbers remain.
pub fn guess_client_from_filename(filename: &str) -> Option<String> {
    let stem = Path::new(filename).file_stem()?.to_str()?;
    let words: Vec<&str> = stem
        .split(['_', '-', ' ', '.'])
        .filter(|w| !w.is_empty())
        .filter(|w| !w.chars().any(|c| c.is_ascii_digit()))
        .filter(|w| !GENERIC_FILENAME_WORDS.contains(&w.to_lowercase().as_str()))
        .collect();

    if !words.iter().any(|w| w.chars().filter(|c| c.is_alphabetic()).count() >= 3) {
        return None;
    }
    Some(words.join(" "))
}

fn is_noise_line(line: &str) -> bool {
    ATTN_LINE.is_match(line)
        || PO_BOX.is_match(line)
        || SHIP_TO.is_match(line)
        || DEPARTMENT_CODE.is_match(line)
        || ADDRESS_LINE.is_match(line)
        || CONTACT_LINE.is_match(line)
        || HEADER_LINE.is_match(line)
        || is_city(line)
        || !is_plausible_name(line)
}

fn is_city(line: &str) -> bool {
    let lower = line.trim().trim_end_matches([',', '.']).to_lowercase();
    CITY_NAMES.iter().any(|city| {
        lower == *city
            || lower
                .strip_prefix(city)
                .is_some_and(|rest| rest.starts_with([' ', ',']))
    })
}

fn is_name_continuation(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    NAME_CONTINUATIONS.contains(&lower.as_str())
}

fn is_plausible_name(name: &str) -> bool {
    name.chars().filter(|c| c.is_alphabetic()).count() >= 2
}

fn is_substantial(line: &str) -> bool {
    line.len() >= 3
        && is_plausible_name(line)
        && !HEADER_LINE.is_match(line)
        && !ATTN_LINE.is_match(line)
        && !ADDRESS_LINE.is_match(line)
        && !CONTACT_LINE.is_match(line)
}

fn clean_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches([',', ':', ';'])
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(text: &str, filename: &str) -> Option<(String, ClientSource)> {
        ClientExtractor::new().resolve(text, filename)
    }

    #[test]
    fn test_bill_to_block_skips_noise() {
        let text = "TAX INVOICE\nBILL TO:\nAttn: Accounts Payable\nPO Box 1234\nNorthwind Traders\n12 George Street\nSydney NSW 2000\n";
        let (name, source) = resolve(text, "x.pdf").unwrap();
        assert_eq!(name, "Northwind Traders");
        assert_eq!(source, ClientSource::BillTo);
    }

    #[test]
    fn test_bill_to_same_line() {
        let text = "Bill To: Contoso Pty Ltd\nLevel 5, 1 Market St.\n";
        assert_eq!(resolve(text, "x.pdf").unwrap().0, "Contoso Pty Ltd");
    }

    #[test]
    fn test_bill_to_continuation_merge() {
        let text = "BILL TO\nSunrise Coast\nHealth\n45 Beach Road\n";
        assert_eq!(resolve(text, "x.pdf").unwrap().0, "Sunrise Coast Health");
    }

    #[test]
    fn test_bill_to_skips_city_line() {
        let text = "Bill To\nMelbourne\nFabrikam Group\n";
        assert_eq!(resolve(text, "x.pdf").unwrap().0, "Fabrikam Group");
    }

    #[test]
    fn test_customer_label() {
        let text = "Invoice #: 4612345\nCustomer: Tailspin Toys\n";
        let (name, source) = resolve(text, "x.pdf").unwrap();
        assert_eq!(name, "Tailspin Toys");
        assert_eq!(source, ClientSource::CustomerLabel);
    }

    #[test]
    fn test_to_header_skips_headers() {
        let text = "TO:\nInvoice Date: 01-Jan-2025\nWide World Importers\n";
        let (name, source) = resolve(text, "x.pdf").unwrap();
        assert_eq!(name, "Wide World Importers");
        assert_eq!(source, ClientSource::ToHeader);
    }

    #[test]
    fn test_filename_guess() {
        assert_eq!(
            guess_client_from_filename("Acme_Health_Invoice_4612345.pdf").as_deref(),
            Some("Acme Health")
        );
        assert_eq!(guess_client_from_filename("INV-4612345.pdf"), None);
        assert_eq!(guess_client_from_filename("file.pdf"), None);
        assert_eq!(resolve("", "Litware-invoice-0042.pdf").unwrap().1, ClientSource::Filename);
    }

    #[test]
    fn test_nothing_found() {
        assert_eq!(resolve("", "file.pdf"), None);
    }
}
