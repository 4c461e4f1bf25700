//! Payment spreadsheet rows.
//!
//! The import reads rows of `(invoice number, payment date)` exported from
//! the accounting system. Column positions vary between exports, so the
//! header row is inspected to find them.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use crate::invoice::rules::parse_date;
use crate::matching::normalize_key;

/// A payment to apply to an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRecord {
    pub invoice_number: String,
    pub payment_date: NaiveDate,
}

/// Why a spreadsheet row could not become a payment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentRowError {
    #[error("missing invoice number")]
    MissingInvoiceNumber,

    #[error("unreadable payment date: {0:?}")]
    InvalidDate(String),
}

impl PaymentRecord {
    /// Build a record from raw cell text.
    ///
    /// Dates may be ISO (`2025-03-15`, optionally with a time part) or any
    /// format [`parse_date`] understands, disambiguated by the invoice number.
    pub fn from_fields(invoice_number: &str, payment_date: &str) -> Result<Self, PaymentRowError> {
        let invoice_number = invoice_number.trim();
        if invoice_number.is_empty() {
            return Err(PaymentRowError::MissingInvoiceNumber);
        }

        let raw_date = payment_date.trim();
        let date_part = raw_date.split(['T', ' ']).next().unwrap_or(raw_date);
        let payment_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .ok()
            .or_else(|| parse_date(raw_date, invoice_number))
            .ok_or_else(|| PaymentRowError::InvalidDate(raw_date.to_string()))?;

        Ok(Self {
            invoice_number: invoice_number.to_string(),
            payment_date,
        })
    }

    /// Normalized invoice number for matching against stored invoices.
    pub fn key(&self) -> String {
        normalize_key(&self.invoice_number)
    }
}

/// Positions of the invoice number and payment date columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentColumns {
    pub invoice_number: usize,
    pub payment_date: usize,
}

impl Default for PaymentColumns {
    /// First two columns, for files without a header row.
    fn default() -> Self {
        Self {
            invoice_number: 0,
            payment_date: 1,
        }
    }
}

impl PaymentColumns {
    /// Find the columns from a header row.
    ///
    /// A payment-specific date header (`Payment Date`, `Date Paid`) is
    /// preferred over a generic `Date` column.
    pub fn detect<S: AsRef<str>>(headers: &[S]) -> Option<Self> {
        let normalized: Vec<String> = headers.iter().map(|h| normalize_key(h.as_ref())).collect();

        let invoice_number = normalized.iter().position(|h| {
            (h.contains("invoice") || h.starts_with("inv"))
                && !h.contains("date")
                && !h.contains("amount")
        })?;

        let payment_date = normalized
            .iter()
            .position(|h| h.contains("date") && (h.contains("pay") || h.contains("paid")))
            .or_else(|| {
                normalized
                    .iter()
                    .enumerate()
                    .position(|(idx, h)| idx != invoice_number && h.contains("date"))
            })?;

        Some(Self {
            invoice_number,
            payment_date,
        })
    }

    /// Read a record from a row of cells.
    pub fn record<S: AsRef<str>>(&self, row: &[S]) -> Result<PaymentRecord, PaymentRowError> {
        let cell = |idx: usize| row.get(idx).map(|c| c.as_ref()).unwrap_or("");
        PaymentRecord::from_fields(cell(self.invoice_number), cell(self.payment_date))
    }
}
