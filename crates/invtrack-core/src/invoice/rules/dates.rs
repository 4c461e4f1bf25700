//! Date parsing for invoice text.
//!
//! Invoices arrive from both US and international billing entities, so a
//! numeric date like `05-03-2025` is ambiguous. When neither part can only be
//! a day, the invoice number prefix decides the ordering.

use chrono::{Days, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;

use super::patterns::{DUE_DATE_PATTERNS, INVOICE_DATE_PATTERNS};

/// Invoice-number prefixes whose ambiguous dates are month-first.
pub const US_DATE_PREFIXES: &[&str] = &["46", "47", "48", "49"];

lazy_static! {
    static ref NAMED_MONTH_DATE: Regex = Regex::new(
        r"^\s*(\d{1,2})[\s\-/.,]*([A-Za-z]+)\.?[\s\-/.,]*(\d{2,4})\s*$"
    ).unwrap();
}

const MONTH_NAMES: [&str; 12] = [
    "january", "february", "march", "april", "may", "june",
    "july", "august", "september", "october", "november", "december",
];

/// Day/month ordering of a numeric date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    /// DD-MM-YYYY
    DayFirst,
    /// MM-DD-YYYY
    MonthFirst,
}

/// Date parser with a configurable US prefix table.
#[derive(Debug, Clone)]
pub struct DateParser {
    us_prefixes: Vec<String>,
}

impl DateParser {
    pub fn new() -> Self {
        Self::with_us_prefixes(US_DATE_PREFIXES.iter().map(|p| p.to_string()).collect())
    }

    pub fn with_us_prefixes(us_prefixes: Vec<String>) -> Self {
        Self { us_prefixes }
    }

    /// Ordering used for ambiguous numeric dates on this invoice.
    pub fn ambiguous_order(&self, invoice_number: &str) -> DateOrder {
        let number = invoice_number.trim();
        if self.us_prefixes.iter().any(|p| !p.is_empty() && number.starts_with(p.as_str())) {
            DateOrder::MonthFirst
        } else {
            DateOrder::DayFirst
        }
    }

    /// Parse a captured date string into a calendar date.
    ///
    /// Never panics; returns `None` for anything that is not a named-month
    /// date or a three-part numeric date.
    pub fn parse(&self, raw: &str, invoice_number: &str) -> Option<NaiveDate> {
        if let Some(date) = parse_named_month(raw) {
            return Some(date);
        }

        let parts: Vec<&str> = raw.trim().split(['-', '/']).map(str::trim).collect();
        if parts.len() != 3 {
            return None;
        }
        if parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
        {
            return None;
        }

        let first: u32 = parts[0].parse().ok()?;
        let second: u32 = parts[1].parse().ok()?;
        let year = expand_year(parts[2].parse().ok()?);

        let (day, month) = if first > 12 {
            (first, second)
        } else if second > 12 {
            (second, first)
        } else {
            match self.ambiguous_order(invoice_number) {
                DateOrder::MonthFirst => (second, first),
                DateOrder::DayFirst => (first, second),
            }
        };

        build_date(year, month, day)
    }

    /// First label-anchored invoice date that parses.
    pub fn find_invoice_date(&self, text: &str, invoice_number: &str) -> Option<NaiveDate> {
        self.find_labeled(&INVOICE_DATE_PATTERNS, text, invoice_number)
    }

    /// First label-anchored due date that parses.
    pub fn find_due_date(&self, text: &str, invoice_number: &str) -> Option<NaiveDate> {
        self.find_labeled(&DUE_DATE_PATTERNS, text, invoice_number)
    }

    fn find_labeled(&self, patterns: &[Regex], text: &str, invoice_number: &str) -> Option<NaiveDate> {
        patterns.iter().find_map(|pattern| {
            pattern
                .captures_iter(text)
                .find_map(|caps| self.parse(&caps[1], invoice_number))
        })
    }
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse with the default US prefix table.
pub fn parse_date(raw: &str, invoice_number: &str) -> Option<NaiveDate> {
    DateParser::new().parse(raw, invoice_number)
}

/// Resolve a month name or abbreviation (`Mar`, `march`, `Sept`) to 1..=12.
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|full| full.starts_with(name.as_str()))
        .map(|idx| idx as u32 + 1)
}

fn parse_named_month(raw: &str) -> Option<NaiveDate> {
    let caps = NAMED_MONTH_DATE.captures(raw)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = month_from_name(&caps[2])?;
    let year = expand_year(caps[3].parse().ok()?);
    build_date(year, month, day)
}

fn expand_year(year: i32) -> i32 {
    if year < 100 { 2000 + year } else { year }
}

/// Build a date from components the way calendar arithmetic overflows:
/// day 31 of a 30-day month rolls into the next month.
fn build_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, 1)?.checked_add_days(Days::new(u64::from(day - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_named_month_abbreviated() {
        assert_eq!(parse_date("12-Mar-2025", "X"), Some(ymd(2025, 3, 12)));
        assert_eq!(parse_date("5 sept 2024", "X"), Some(ymd(2024, 9, 5)));
        assert_eq!(parse_date("01-Jan-25", "X"), Some(ymd(2025, 1, 1)));
    }

    #[test]
    fn test_named_month_full_name_and_padding() {
        let date = parse_date("15 March 2025", "X").unwrap();
        assert_eq!(date.to_string(), "2025-03-15");
        assert_eq!(parse_date("7-Feb-2025", "X").unwrap().to_string(), "2025-02-07");
    }

    #[test]
    fn test_unknown_month_name() {
        assert_eq!(parse_date("12-Foo-2025", "X"), None);
        assert_eq!(parse_date("12-Marzipan-2025", "X"), None);
    }

    #[test]
    fn test_unambiguous_numeric() {
        // first part can only be a day
        assert_eq!(parse_date("25/03/2025", "4612345"), Some(ymd(2025, 3, 25)));
        // second part can only be a day
        assert_eq!(parse_date("03/25/2025", "4012345"), Some(ymd(2025, 3, 25)));
    }

    #[test]
    fn test_prefix_disambiguation() {
        assert_eq!(parse_date("05-03-2025", "4612345"), Some(ymd(2025, 5, 3)));
        assert_eq!(parse_date("05-03-2025", "4012345"), Some(ymd(2025, 3, 5)));
        assert_eq!(parse_date("05-03-2025", "4912345"), Some(ymd(2025, 5, 3)));
        assert_eq!(parse_date("05-03-2025", "INV-46"), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_two_digit_numeric_year() {
        assert_eq!(parse_date("12-03-25", "X"), Some(ymd(2025, 3, 12)));
    }

    #[test]
    fn test_rejects_out_of_range_components() {
        assert_eq!(parse_date("32-01-2025", "X"), None);
        assert_eq!(parse_date("13-13-2025", "X"), None);
        assert_eq!(parse_date("00-01-2025", "X"), None);
    }

    #[test]
    fn test_day_overflow_rolls_forward() {
        assert_eq!(parse_date("31-02-2025", "X"), Some(ymd(2025, 3, 3)));
        assert_eq!(parse_date("30-Feb-2024", "X"), Some(ymd(2024, 3, 1)));
    }

    #[test]
    fn test_totality_on_garbage() {
        for raw in ["", "   ", "Total", "12/2025", "1-2-3-4", "aa-bb-cccc", "2025-03-15x", "--", "//"] {
            assert_eq!(parse_date(raw, "4612345"), None, "input {raw:?}");
        }
    }

    #[test]
    fn test_custom_prefixes() {
        let parser = DateParser::with_us_prefixes(vec!["9".to_string()]);
        assert_eq!(parser.parse("05-03-2025", "9001"), Some(ymd(2025, 5, 3)));
        assert_eq!(parser.parse("05-03-2025", "4612345"), Some(ymd(2025, 3, 5)));
    }

    #[test]
    fn test_find_labeled_dates() {
        let text = "Invoice Date: 15-Mar-2025\nDue Date: 14-Apr-2025\n";
        let parser = DateParser::new();
        assert_eq!(parser.find_invoice_date(text, "X"), Some(ymd(2025, 3, 15)));
        assert_eq!(parser.find_due_date(text, "X"), Some(ymd(2025, 4, 14)));
    }

    #[test]
    fn test_later_labels_used_when_earlier_missing() {
        let text = "CREDIT MEMO\nCredit Date: 02/03/2025\nPayment Due: 01/04/2025";
        let parser = DateParser::new();
        assert_eq!(parser.find_invoice_date(text, "4800001"), Some(ymd(2025, 2, 3)));
        assert_eq!(parser.find_due_date(text, "4800001"), Some(ymd(2025, 1, 4)));
    }
}
