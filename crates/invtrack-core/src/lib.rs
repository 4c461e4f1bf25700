//! Core library for small-business invoice tracking.
//!
//! This crate provides:
//! - PDF text extraction
//! - Rule-based invoice field extraction with structured fallback diagnostics
//! - Invoice type classification and billing frequency detection
//! - Expected-invoice forecast planning and reconciliation rules
//! - Invoice query filters, contract progress, exchange rates and payment rows

pub mod contracts;
pub mod error;
pub mod forecast;
pub mod fx;
pub mod invoice;
pub mod matching;
pub mod models;
pub mod payments;
pub mod pdf;
pub mod query;

pub use contracts::ContractProgress;
pub use error::{InvtrackError, PdfError, RateError, Result};
pub use fx::{ExchangeRates, RateCache, RateProvider};
pub use invoice::{
    ExtractionResult, FallbackEvent, FallbackField, InvoiceFieldExtractor, classify,
    detect_frequency, parse_date,
};
pub use matching::normalize_key;
pub use models::config::AppConfig;
pub use models::contract::Contract;
pub use models::forecast::{DismissedExpectedInvoice, ExpectedInvoice, GroupKey, NewExpectedInvoice};
pub use models::invoice::{
    Currency, Frequency, Invoice, InvoiceFields, InvoicePatch, InvoiceStatus, InvoiceType,
};
pub use payments::{PaymentColumns, PaymentRecord, PaymentRowError};
pub use pdf::{PdfContent, PdfExtractor, PdfProcessor};
pub use query::InvoiceQuery;
