//! Invoice field extraction, classification and frequency detection.

pub mod classifier;
pub mod frequency;
mod parser;
pub mod rules;

pub use classifier::classify;
pub use frequency::detect_frequency;
pub use parser::{
    ExtractionResult, FallbackEvent, FallbackField, InvoiceFieldExtractor, UNKNOWN_INVOICE_NUMBER,
};
pub use rules::{parse_date, DateParser, NO_SERVICES, UNKNOWN_CLIENT};
