//! Rule-based field extractors for invoice text.

pub mod amounts;
pub mod currency;
pub mod dates;
pub mod parties;
pub mod patterns;
pub mod references;
pub mod services;

pub use amounts::{AmountExtractor, parse_amount};
pub use currency::{CurrencyExtractor, detect_currency};
pub use dates::{DateOrder, DateParser, US_DATE_PREFIXES, month_from_name, parse_date};
pub use parties::{ClientExtractor, ClientSource, UNKNOWN_CLIENT, guess_client_from_filename};
pub use references::{ContractExtractor, InvoiceNumberExtractor, PoNumberExtractor};
pub use services::{NO_SERVICES, ServicesExtractor};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A matched value with the text it came from.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Index of the pattern alternative that matched (0 = highest priority).
    pub rule: usize,
    /// Position in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, rule: usize, source: impl Into<String>) -> Self {
        Self {
            value,
            rule,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
