//! Plain-English invoice filters.
//!
//! Turns phrases like `unpaid managed services for acme over 5000 in 2025`
//! into an [`InvoiceQuery`] that can be matched against invoices.

use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::rules::month_from_name;
use crate::matching::normalize_key;
use crate::models::invoice::{Currency, Frequency, Invoice, InvoiceStatus, InvoiceType};

/// Words that carry no filter meaning.
const FILLER: &[&str] = &[
    "show", "me", "list", "find", "get", "all", "the", "a", "an", "invoice", "invoices",
    "bill", "bills", "that", "which", "are", "is", "were", "with", "of", "and", "from",
    "please", "any", "my",
];

/// Two-word phrases naming an invoice type.
const TYPE_PHRASES: &[(&str, &str, InvoiceType)] = &[
    ("managed", "services", InvoiceType::Ms),
    ("managed", "service", InvoiceType::Ms),
    ("professional", "services", InvoiceType::Ps),
    ("professional", "service", InvoiceType::Ps),
    ("credit", "memo", InvoiceType::CreditMemo),
    ("credit", "memos", InvoiceType::CreditMemo),
    ("credit", "notes", InvoiceType::CreditMemo),
    ("third", "party", InvoiceType::ThirdParty),
];

/// A parsed invoice filter. Empty fields do not constrain the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub overdue: bool,
    pub invoice_types: Vec<InvoiceType>,
    pub frequencies: Vec<Frequency>,
    pub currencies: Vec<Currency>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub client: Option<String>,
    pub contract: Option<String>,
    /// Unrecognized words, matched against client, services and references.
    pub terms: Vec<String>,
}

impl InvoiceQuery {
    /// Parse a free-form query. Never fails; unknown words become terms.
    pub fn parse(input: &str) -> Self {
        let tokens: Vec<String> = input
            .split_whitespace()
            .map(|t| {
                t.trim_matches(|c: char| matches!(c, ',' | ';' | '?' | '!' | '"' | '\''))
                    .trim_end_matches('.')
                    .to_lowercase()
            })
            .filter(|t| !t.is_empty())
            .collect();

        let mut query = Self::default();
        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i].as_str();
            let next = tokens.get(i + 1).map(String::as_str);

            if let Some(ty) = next.and_then(|n| type_phrase(token, n)) {
                push_unique(&mut query.invoice_types, ty);
                i += 2;
                continue;
            }

            match token {
                "paid" | "settled" => query.status = Some(InvoiceStatus::Paid),
                "unpaid" | "pending" | "outstanding" | "open" => {
                    query.status = Some(InvoiceStatus::Pending)
                }
                "overdue" | "late" => {
                    query.overdue = true;
                    query.status = Some(InvoiceStatus::Pending);
                }
                "over" | "above" | ">" | "exceeding" => {
                    if let Some(amount) = next.and_then(parse_query_amount) {
                        query.min_amount = Some(amount);
                        i += 1;
                    }
                }
                "under" | "below" | "<" => {
                    if let Some(amount) = next.and_then(parse_query_amount) {
                        query.max_amount = Some(amount);
                        i += 1;
                    }
                }
                "more" | "greater" | "less" | "fewer"
                    if next == Some("than") =>
                {
                    if let Some(amount) = tokens.get(i + 2).and_then(|t| parse_query_amount(t)) {
                        if token == "more" || token == "greater" {
                            query.min_amount = Some(amount);
                        } else {
                            query.max_amount = Some(amount);
                        }
                        i += 2;
                    }
                }
                "for" | "client" | "customer" => {
                    let (name, used) = collect_name(&tokens[i + 1..]);
                    if !name.is_empty() {
                        query.client = Some(name);
                    }
                    i += used;
                }
                "contract" => {
                    let (name, used) = collect_name(&tokens[i + 1..]);
                    if !name.is_empty() {
                        query.contract = Some(name);
                    }
                    i += used;
                }
                "in" | "during" | "since" | "on" => {}
                _ => {
                    if let Some(ty) = type_word(token) {
                        push_unique(&mut query.invoice_types, ty);
                    } else if let Some(freq) = frequency_word(token) {
                        push_unique(&mut query.frequencies, freq);
                    } else if let Ok(currency) = Currency::from_str(token) {
                        push_unique(&mut query.currencies, currency);
                    } else if let Some(year) = parse_year(token) {
                        query.year = Some(year);
                    } else if let Some(month) = month_from_name(token) {
                        query.month = Some(month);
                    } else if let Some(amount) = token.strip_prefix('>').and_then(parse_query_amount) {
                        query.min_amount = Some(amount);
                    } else if let Some(amount) = token.strip_prefix('<').and_then(parse_query_amount) {
                        query.max_amount = Some(amount);
                    } else if !FILLER.contains(&token) {
                        query.terms.push(token.to_string());
                    }
                }
            }
            i += 1;
        }

        query
    }

    /// True when the query places no constraint at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Does `invoice` satisfy every constraint?
    pub fn matches(&self, invoice: &Invoice, today: NaiveDate) -> bool {
        if self.status.is_some_and(|s| s != invoice.status) {
            return false;
        }
        if self.overdue && !invoice.is_overdue(today) {
            return false;
        }
        if !self.invoice_types.is_empty() && !self.invoice_types.contains(&invoice.invoice_type) {
            return false;
        }
        if !self.frequencies.is_empty() && !self.frequencies.contains(&invoice.frequency) {
            return false;
        }
        if !self.currencies.is_empty() && !self.currencies.contains(&invoice.currency) {
            return false;
        }
        if self.min_amount.is_some_and(|min| invoice.amount_due <= min) {
            return false;
        }
        if self.max_amount.is_some_and(|max| invoice.amount_due >= max) {
            return false;
        }
        if self.year.is_some_and(|y| invoice.invoice_date.year() != y) {
            return false;
        }
        if self.month.is_some_and(|m| invoice.invoice_date.month() != m) {
            return false;
        }
        if let Some(client) = &self.client {
            if !normalize_key(&invoice.client).contains(client.as_str()) {
                return false;
            }
        }
        if let Some(contract) = &self.contract {
            let on_invoice = [&invoice.customer_contract, &invoice.oracle_contract];
            if !on_invoice
                .iter()
                .any(|c| normalize_key(c).contains(contract.as_str()))
            {
                return false;
            }
        }
        if !self.terms.is_empty() {
            let haystack = normalize_key(&format!(
                "{} {} {} {} {} {}",
                invoice.client,
                invoice.invoice_number,
                invoice.services,
                invoice.customer_contract,
                invoice.oracle_contract,
                invoice.po_number
            ));
            if !self.terms.iter().all(|t| haystack.contains(t.as_str())) {
                return false;
            }
        }
        true
    }

    /// Invoices matching this query, in input order.
    pub fn filter<'a>(&self, invoices: &'a [Invoice], today: NaiveDate) -> Vec<&'a Invoice> {
        invoices.iter().filter(|i| self.matches(i, today)).collect()
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn type_phrase(first: &str, second: &str) -> Option<InvoiceType> {
    TYPE_PHRASES
        .iter()
        .find(|(a, b, _)| *a == first && *b == second)
        .map(|(_, _, ty)| *ty)
}

fn type_word(token: &str) -> Option<InvoiceType> {
    let ty = match token {
        "ps" | "consulting" => InvoiceType::Ps,
        "maint" | "maintenance" | "support" => InvoiceType::Maint,
        "sub" | "subs" | "subscription" | "subscriptions" => InvoiceType::Sub,
        "hosting" | "cloud" => InvoiceType::Hosting,
        "ms" => InvoiceType::Ms,
        "sw" | "software" | "license" | "licence" | "licenses" | "licences" => InvoiceType::Sw,
        "hw" | "hardware" => InvoiceType::Hw,
        "3pp" => InvoiceType::ThirdParty,
        "credits" | "credit" => InvoiceType::CreditMemo,
        _ => return None,
    };
    Some(ty)
}

fn frequency_word(token: &str) -> Option<Frequency> {
    let freq = match token {
        "monthly" => Frequency::Monthly,
        "quarterly" => Frequency::Quarterly,
        "tri-annual" | "triannual" => Frequency::TriAnnual,
        "bi-annual" | "biannual" | "semi-annual" | "semiannual" | "half-yearly" => Frequency::BiAnnual,
        "annual" | "annually" | "yearly" => Frequency::Annual,
        "adhoc" | "ad-hoc" | "one-off" => Frequency::Adhoc,
        _ => return None,
    };
    Some(freq)
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() != 4 || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|y| (1990..=2100).contains(y))
}

/// Parse `5000`, `$5,000`, `5k` or `1.5m`.
fn parse_query_amount(token: &str) -> Option<Decimal> {
    let cleaned: String = token
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | '€' | '£'))
        .collect();
    let (number, multiplier) = match cleaned.chars().last()? {
        'k' => (&cleaned[..cleaned.len() - 1], Decimal::from(1_000)),
        'm' => (&cleaned[..cleaned.len() - 1], Decimal::from(1_000_000)),
        _ => (cleaned.as_str(), Decimal::ONE),
    };
    Decimal::from_str(number).ok()?.checked_mul(multiplier)
}

/// Collect a name following `for` / `contract` up to the next keyword.
/// Returns the name and the number of tokens consumed.
fn collect_name(tokens: &[String]) -> (String, usize) {
    let words: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .take_while(|t| !is_keyword(t))
        .collect();
    (words.join(" "), words.len())
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "paid" | "settled" | "unpaid" | "pending" | "outstanding" | "overdue" | "late"
            | "over" | "above" | "under" | "below" | "more" | "less" | "greater" | "exceeding"
            | "in" | "during" | "since" | "on" | "contract" | "for" | "with" | "that" | "which"
            | ">" | "<"
    ) || type_word(token).is_some()
        || frequency_word(token).is_some()
        || parse_year(token).is_some()
        || Currency::from_str(token).is_ok()
}
