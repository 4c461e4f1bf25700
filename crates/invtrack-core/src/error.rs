//! Error types for the invtrack-core library.

use thiserror::Error;

/// Main error type for the invtrack library.
#[derive(Error, Debug)]
pub enum InvtrackError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Exchange rate lookup or refresh error.
    #[error("exchange rate error: {0}")]
    Rates(#[from] RateError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// No document has been loaded yet.
    #[error("no document loaded")]
    NotLoaded,
}

/// Errors from an exchange rate provider.
#[derive(Error, Debug)]
pub enum RateError {
    /// The provider could not be reached.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider answered with something we could not read.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for the invtrack library.
pub type Result<T> = std::result::Result<T, InvtrackError>;
