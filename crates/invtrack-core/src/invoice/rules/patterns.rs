//! Common regex patterns for invoice field extraction.
//!
//! Each field has an ordered list of alternatives; extractors try them top
//! to bottom and take the first usable match.

use lazy_static::lazy_static;
use regex::Regex;

/// A captured date: named month (`15-Mar-2025`, `15 March 2025`) or numeric (`03/12/2025`).
const DATE_VALUE: &str = r"(\d{1,2}[\s\-/.]*[A-Za-z]{3,9}\.?[\s\-/.,]*\d{2,4}|\d{1,2}[\-/]\d{1,2}[\-/]\d{2,4})";

/// A captured money value with optional sign, parentheses, currency code and symbol.
const AMOUNT_VALUE: &str = r"(\(?\s*-?\s*(?:[A-Z]{3}\s*)?-?\s*[A-Z]?\$?\s*-?\s*\d[\d,]*\.\d{2}\s*\)?)";

fn labeled(label: &str, value: &str) -> Regex {
    Regex::new(&format!("{label}{value}")).unwrap()
}

lazy_static! {
    // Invoice number patterns, in priority order
    pub static ref INVOICE_NUMBER_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)invoice\s*(?:#|no\b\.?|num\b\.?|number\b)\s*:?\s*#?\s*([A-Z0-9][A-Z0-9\-/]*)").unwrap(),
        Regex::new(r"(?i)tax[ \t]+invoice[ \t]*(?:#|no\b\.?|number\b)?[ \t]*:?[ \t]*#?[ \t]*([A-Z0-9][A-Z0-9\-/]*)").unwrap(),
        Regex::new(r"(?i)credit[ \t]+memo[ \t]*(?:#|no\b\.?|number\b)?[ \t]*:?[ \t]*#?[ \t]*([A-Z0-9][A-Z0-9\-/]*)").unwrap(),
    ];

    // Client name patterns
    pub static ref BILL_TO_HEADER: Regex = Regex::new(
        r"(?i)^\s*bill(?:ed)?\s*to\b\s*:?\s*(.*)$"
    ).unwrap();

    pub static ref CUSTOMER_LABEL: Regex = Regex::new(
        r"(?im)^[ \t]*(?:customer|client)(?:[ \t]+name)?[ \t]*:[ \t]*(\S.*?)[ \t]*$"
    ).unwrap();

    pub static ref TO_HEADER: Regex = Regex::new(
        r"(?i)^\s*to\s*:\s*(.*)$"
    ).unwrap();

    pub static ref HEADER_LINE: Regex = Regex::new(
        r"(?i)^\s*(?:tax\s+invoice|invoice|credit\s+memo|statement|date|due|bill(?:ed)?\s*to|ship\s*to|from|to\s*:|description|qty|quantity|amount|total|sub\s*total|page|terms|account|abn|gst|remit)\b"
    ).unwrap();

    pub static ref ATTN_LINE: Regex = Regex::new(
        r"(?i)^\s*(?:attn|attention|c/o)\b"
    ).unwrap();

    pub static ref PO_BOX: Regex = Regex::new(
        r"(?i)\bp\.?\s*o\.?\s*box\b"
    ).unwrap();

    pub static ref SHIP_TO: Regex = Regex::new(
        r"(?i)\bship\s*to\b"
    ).unwrap();

    pub static ref DEPARTMENT_CODE: Regex = Regex::new(
        r"(?i)^\s*(?:dept\.?|department|division|cost\s+cent(?:re|er))\b|^\s*[A-Z]{2,6}[-_]?\d{2,}\s*$"
    ).unwrap();

    pub static ref ADDRESS_LINE: Regex = Regex::new(
        r"(?i)^\s*\d+[A-Z]?[\s,/-]+\w+|\b(?:street|road|avenue|drive|lane|boulevard|blvd|highway|hwy|parade|place|suite|floor)\b|\b(?:st|rd|ave|dr)\.|\blevel\s+\d+|\b(?:NSW|VIC|QLD|WA|SA|TAS|ACT|NT)\s+\d{4}\b|\b[A-Z]{2}\s+\d{5}(?:-\d{4})?\b|\d{4,5}\s*$"
    ).unwrap();

    pub static ref CONTACT_LINE: Regex = Regex::new(
        r"(?i)@|\b(?:phone|tel|fax|mobile|email|www\.|abn|acn|gst)\b"
    ).unwrap();

    // Currency
    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"\b(USD|AUD|EUR|GBP|SGD)\b"
    ).unwrap();

    // Labeled dates, in priority order
    pub static ref INVOICE_DATE_PATTERNS: Vec<Regex> = vec![
        labeled(r"(?i)invoice\s+date\s*:?\s*", DATE_VALUE),
        labeled(r"(?i)credit\s+(?:memo\s+)?date\s*:?\s*", DATE_VALUE),
        labeled(r"(?m)^[ \t]*(?:DATE|Date)\b[ \t]*:?[ \t]*", DATE_VALUE),
    ];

    pub static ref DUE_DATE_PATTERNS: Vec<Regex> = vec![
        labeled(r"(?i)due\s+date\s*:?\s*", DATE_VALUE),
        labeled(r"(?i)payment\s+due\s*:?\s*", DATE_VALUE),
    ];

    // Amount patterns, in priority order
    pub static ref AMOUNT_PATTERNS: Vec<Regex> = vec![
        labeled(r"(?i)invoice\s+total\s*:?\s*", AMOUNT_VALUE),
        labeled(r"(?i)open\s+credit\s*:?\s*", AMOUNT_VALUE),
        labeled(r"(?i)item\s+subtotal\s*:?\s*", AMOUNT_VALUE),
        labeled(r"(?i)(?:amount|balance)\s+due\s*:?\s*", AMOUNT_VALUE),
        labeled(r"(?i)credit\s+amount\s*:?\s*", AMOUNT_VALUE),
        Regex::new(r"(\(?\s*-?\s*\$\s*-?\s*\d[\d,]*\.\d{2}\s*\)?)").unwrap(),
    ];

    // Contract and purchase order references
    pub static ref CONTRACT_NUMBER: Regex = Regex::new(
        r"(?im)\b(?:customer[ \t]+)?contract[ \t]*(?:#|no\b\.?|number\b|name\b|ref(?:erence)?\b)?[ \t]*:[ \t]*(\S[^\r\n]*?)[ \t]*$"
    ).unwrap();

    pub static ref PO_NUMBER: Regex = Regex::new(
        r"(?i)(?:\bp\.?\s?o\b\.?|\bpurchase\s+order\b)\s*(?:#|no\b\.?|number\b)?\s*:?\s*#?\s*([A-Z0-9\-/]*\d[A-Z0-9\-/]*)"
    ).unwrap();

    // Services block markers
    pub static ref SERVICES_TABLE_HEADER: Regex = Regex::new(
        r"(?i)description.*extended\s+price"
    ).unwrap();

    pub static ref SIMPLE_TABLE_HEADER: Regex = Regex::new(
        r"(?i)quantity\s+description\s+taxable\s+ext\.?\s*price"
    ).unwrap();

    pub static ref SERVICES_LABEL: Regex = Regex::new(
        r"(?i)^\s*services?\s*:\s*(.*)$"
    ).unwrap();

    pub static ref TRANSACTION_BLOCK: Regex = Regex::new(
        r"(?is)transaction\s+type(.*?)item\s+subtotal"
    ).unwrap();

    pub static ref TABLE_END: Regex = Regex::new(
        r"(?i)^\s*(?:sub\s*-?\s*total|item\s+subtotal|invoice\s+total|total|amount\s+due|balance\s+due|credit\s+amount|open\s+credit|tax|gst|vat|payment|remit|thank)\b"
    ).unwrap();

    // Services cleanup
    pub static ref LINE_ITEM_NOISE: Regex = Regex::new(
        r"(?i)\b(?:yes|no)\s+\(?\s*-?\s*\$?\s*-?[\d,]+\.\d{2}\)?"
    ).unwrap();

    pub static ref INVOICE_NUMBER_REPEAT: Regex = Regex::new(
        r"(?i)invoice\s+(?:number|no\b\.?|#)\s*:?\s*\S*"
    ).unwrap();

    pub static ref ADDRESS_MARKER: Regex = Regex::new(
        r"(?i)\b(?:p\.?\s*o\.?\s*box|street|avenue|suite|attn|attention|bill\s*to|ship\s*to)\b|\b(?:st|rd|ave)\.|\blevel\s+\d+|\b(?:NSW|VIC|QLD|TAS|ACT)\s+\d{4}\b"
    ).unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Known city names that appear on their own line in address blocks.
pub const CITY_NAMES: &[&str] = &[
    "sydney", "melbourne", "brisbane", "perth", "adelaide", "canberra", "hobart",
    "darwin", "gold coast", "auckland", "wellington", "singapore", "london",
    "manchester", "dublin", "new york", "san francisco", "los angeles", "chicago",
    "seattle", "boston", "austin", "toronto", "vancouver",
];

/// Words that continue a company name when they sit alone on the next line.
pub const NAME_CONTINUATIONS: &[&str] = &[
    "health", "healthcare", "group", "limited", "ltd", "ltd.", "pty ltd", "pty. ltd.",
    "inc", "inc.", "llc", "corporation", "corp", "services", "solutions", "holdings",
    "foundation", "trust", "council",
];

/// Words that mark a text block as describing services rather than an address.
pub const SERVICE_KEYWORDS: &[&str] = &[
    "service", "support", "maintenance", "licen", "subscription", "consult",
    "hosting", "managed", "professional", "software", "hardware", "renewal",
    "implementation", "training", "cloud", "project", "monthly", "annual",
    "quarterly", "fee",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(INVOICE_NUMBER_PATTERNS.len(), 3);
        assert_eq!(INVOICE_DATE_PATTERNS.len(), 3);
        assert_eq!(DUE_DATE_PATTERNS.len(), 2);
        assert_eq!(AMOUNT_PATTERNS.len(), 6);
    }

    #[test]
    fn test_invoice_number_ignores_notes() {
        assert!(INVOICE_NUMBER_PATTERNS[0].captures("Invoice Notes apply").is_none());
        let caps = INVOICE_NUMBER_PATTERNS[0].captures("Invoice No. 4612345").unwrap();
        assert_eq!(&caps[1], "4612345");
    }

    #[test]
    fn test_due_date_does_not_satisfy_bare_date_label() {
        assert!(INVOICE_DATE_PATTERNS[2].captures("Due Date: 14-Apr-2025").is_none());
        assert!(INVOICE_DATE_PATTERNS[2].captures("DATE 14-Apr-2025").is_some());
    }

    #[test]
    fn test_po_box_is_not_a_po_number() {
        assert!(PO_NUMBER.captures("PO Box 123").is_none());
        let caps = PO_NUMBER.captures("PO #: 88231").unwrap();
        assert_eq!(&caps[1], "88231");
    }
}
