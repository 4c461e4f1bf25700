//! Invoice field extraction pipeline.

use std::fmt;
use std::path::Path;
use std::time::Instant;

use chrono::{Days, Local, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::config::ExtractionConfig;
use crate::models::invoice::{Currency, InvoiceFields};

use super::classifier::classify;
use super::frequency::detect_frequency;
use super::rules::{
    AmountExtractor, ClientExtractor, ContractExtractor, CurrencyExtractor, DateParser,
    FieldExtractor, InvoiceNumberExtractor, NO_SERVICES, PoNumberExtractor, ServicesExtractor,
    UNKNOWN_CLIENT,
};

/// Invoice number used when neither the text nor the file name yields one.
pub const UNKNOWN_INVOICE_NUMBER: &str = "UNKNOWN";

/// A field that fell back to its default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackField {
    InvoiceNumber,
    Client,
    Currency,
    InvoiceDate,
    DueDate,
    Amount,
    Services,
}

impl fmt::Display for FallbackField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvoiceNumber => "invoice_number",
            Self::Client => "client",
            Self::Currency => "currency",
            Self::InvoiceDate => "invoice_date",
            Self::DueDate => "due_date",
            Self::Amount => "amount",
            Self::Services => "services",
        };
        f.write_str(name)
    }
}

/// Structured record of a fallback taken during extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEvent {
    pub field: FallbackField,
    /// The value that was substituted.
    pub fallback: String,
    pub reason: String,
}

/// Result of invoice field extraction.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    /// Extracted fields, always fully populated.
    pub fields: InvoiceFields,
    /// One entry per field that fell back to a default.
    pub diagnostics: Vec<FallbackEvent>,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

impl ExtractionResult {
    /// True when no field needed a fallback.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn fell_back(&self, field: FallbackField) -> bool {
        self.diagnostics.iter().any(|d| d.field == field)
    }
}

/// Rule-based invoice field extractor.
///
/// Extraction never fails: every field has a terminal fallback, and each
/// fallback is logged and recorded in [`ExtractionResult::diagnostics`].
#[derive(Debug, Clone)]
pub struct InvoiceFieldExtractor {
    dates: DateParser,
    services: ServicesExtractor,
    default_currency: Currency,
    due_days_fallback: u64,
    today: Option<NaiveDate>,
}

impl InvoiceFieldExtractor {
    /// Create an extractor with default settings.
    pub fn new() -> Self {
        Self {
            dates: DateParser::new(),
            services: ServicesExtractor::new(),
            default_currency: Currency::Usd,
            due_days_fallback: 30,
            today: None,
        }
    }

    /// Create an extractor from the `extraction` config section.
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new()
            .with_us_prefixes(config.us_date_prefixes.clone())
            .with_default_currency(config.default_currency)
            .with_due_days_fallback(config.due_days_fallback)
            .with_services_max_len(config.services_max_len)
    }

    /// Pin "today" used by the date fallbacks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Set the invoice-number prefixes whose dates are month-first.
    pub fn with_us_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.dates = DateParser::with_us_prefixes(prefixes);
        self
    }

    pub fn with_default_currency(mut self, currency: Currency) -> Self {
        self.default_currency = currency;
        self
    }

    /// Days after today used as the due date when none is found.
    pub fn with_due_days_fallback(mut self, days: i64) -> Self {
        self.due_days_fallback = days.max(0) as u64;
        self
    }

    pub fn with_services_max_len(mut self, max_len: usize) -> Self {
        self.services = self.services.with_max_len(max_len);
        self
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Extract invoice fields from PDF text.
    pub fn extract(&self, text: &str, original_filename: &str) -> ExtractionResult {
        let start = Instant::now();
        let today = self.today();
        let mut diagnostics = Vec::new();

        info!(
            chars = text.len(),
            file = original_filename,
            "Extracting invoice fields"
        );

        let invoice_number = match InvoiceNumberExtractor::new().extract(text) {
            Some(m) => m.value,
            None => {
                let stem = Path::new(original_filename)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(UNKNOWN_INVOICE_NUMBER)
                    .to_string();
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::InvoiceNumber,
                    &stem,
                    "no invoice number label matched",
                );
                stem
            }
        };

        let client = match ClientExtractor::new().resolve(text, original_filename) {
            Some((name, source)) => {
                debug!(%invoice_number, client = %name, %source, "Resolved client");
                name
            }
            None => {
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::Client,
                    UNKNOWN_CLIENT,
                    "no bill-to, customer or to: block and no usable file name",
                );
                UNKNOWN_CLIENT.to_string()
            }
        };

        let currency = match CurrencyExtractor::new().extract(text) {
            Some(m) => m.value,
            None => {
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::Currency,
                    self.default_currency.as_str(),
                    "no currency code or symbol found",
                );
                self.default_currency
            }
        };

        let invoice_date = match self.dates.find_invoice_date(text, &invoice_number) {
            Some(date) => date,
            None => {
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::InvoiceDate,
                    &today.to_string(),
                    "no parseable invoice date, using today",
                );
                today
            }
        };

        let due_date = match self.dates.find_due_date(text, &invoice_number) {
            Some(date) => date,
            None => {
                let fallback = today
                    .checked_add_days(Days::new(self.due_days_fallback))
                    .unwrap_or(today);
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::DueDate,
                    &fallback.to_string(),
                    "no parseable due date, using today plus payment terms",
                );
                fallback
            }
        };

        let amount_due = match AmountExtractor::new().extract(text) {
            Some(m) => m.value,
            None => {
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::Amount,
                    "0",
                    "no amount found",
                );
                Decimal::ZERO
            }
        };

        let customer_contract = ContractExtractor::new()
            .extract(text)
            .map(|m| m.value)
            .unwrap_or_default();
        let po_number = PoNumberExtractor::new()
            .extract(text)
            .map(|m| m.value)
            .unwrap_or_default();

        let services = match self.services.extract(text) {
            Some(m) => m.value,
            None => {
                record(
                    &mut diagnostics,
                    original_filename,
                    FallbackField::Services,
                    NO_SERVICES,
                    "no services block found",
                );
                NO_SERVICES.to_string()
            }
        };

        let invoice_type = classify(&services, &invoice_number, amount_due);
        let frequency = detect_frequency(&services, amount_due);

        let fields = InvoiceFields {
            invoice_number,
            client,
            currency,
            invoice_date,
            due_date,
            amount_due,
            customer_contract,
            po_number,
            services,
            invoice_type,
            frequency,
        };

        debug!(
            "Extracted invoice {} ({}, {}) with {} fallbacks",
            fields.invoice_number,
            fields.invoice_type,
            fields.frequency,
            diagnostics.len()
        );

        ExtractionResult {
            fields,
            diagnostics,
            processing_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

impl Default for InvoiceFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn record(
    diagnostics: &mut Vec<FallbackEvent>,
    file: &str,
    field: FallbackField,
    fallback: &str,
    reason: &str,
) {
    warn!(%field, fallback, reason, file, "Field extraction fell back to default");
    diagnostics.push(FallbackEvent {
        field,
        fallback: fallback.to_string(),
        reason: reason.to_string(),
    });
}
