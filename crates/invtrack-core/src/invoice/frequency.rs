//! Billing frequency detection.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::models::invoice::Frequency;

lazy_static! {
    static ref MONTHLY: Regex = Regex::new(
        r"(?i)\bmonthly\b|\bper\s+month\b|/\s*month\b|\beach\s+month\b"
    ).unwrap();

    static ref QUARTERLY: Regex = Regex::new(
        r"(?i)\bquarterly\b|\bper\s+quarter\b|\bq[1-4]\b|\b3\s*-?\s*months?\b|\bthree\s*-?\s*months?\b|\b(?:jan(?:uary)?\s*(?:-|–|to)\s*mar(?:ch)?|apr(?:il)?\s*(?:-|–|to)\s*jun(?:e)?|jul(?:y)?\s*(?:-|–|to)\s*sep(?:t(?:ember)?)?|oct(?:ober)?\s*(?:-|–|to)\s*dec(?:ember)?)\b"
    ).unwrap();

    static ref BI_ANNUAL: Regex = Regex::new(
        r"(?i)\bsemi\s*-?\s*annual(?:ly)?\b|\bbi\s*-?\s*annual(?:ly)?\b|\bhalf\s*-?\s*yearly\b|\b6\s*-?\s*months?\b|\bsix\s*-?\s*months?\b"
    ).unwrap();

    static ref TRI_ANNUAL: Regex = Regex::new(
        r"(?i)\btri\s*-?\s*annual(?:ly)?\b|\b4\s*-?\s*months?\b|\bfour\s*-?\s*months?\b"
    ).unwrap();

    static ref ANNUAL: Regex = Regex::new(
        r"(?i)annual|\byearly\b|\bper\s+annum\b|\b12\s*-?\s*months?\b|\btwelve\s*-?\s*months?\b"
    ).unwrap();

    static ref PARTIAL_ANNUAL: Regex = Regex::new(
        r"(?i)\b(?:semi|bi|tri)\s*-?\s*annual"
    ).unwrap();
}

/// Ordered frequency rules; the first match wins.
const RULES: &[(&str, fn(&str) -> bool, Frequency)] = &[
    ("monthly", |t| MONTHLY.is_match(t), Frequency::Monthly),
    ("quarterly", |t| QUARTERLY.is_match(t), Frequency::Quarterly),
    ("bi-annual", |t| BI_ANNUAL.is_match(t), Frequency::BiAnnual),
    ("tri-annual", |t| TRI_ANNUAL.is_match(t), Frequency::TriAnnual),
    (
        "annual",
        |t| ANNUAL.is_match(t) && !PARTIAL_ANNUAL.is_match(t),
        Frequency::Annual,
    ),
];

/// Detect the billing cadence from the services text.
///
/// Credits never recur, so a negative amount is always adhoc.
pub fn detect_frequency(services: &str, amount: Decimal) -> Frequency {
    if amount < Decimal::ZERO {
        return Frequency::Adhoc;
    }
    RULES
        .iter()
        .find(|(_, applies, _)| applies(services))
        .map(|(_, _, frequency)| *frequency)
        .unwrap_or(Frequency::Adhoc)
}
