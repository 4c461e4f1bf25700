//! Invoice persistence and background services for invtrack.
//!
//! This crate provides:
//! - The [`InvoiceStore`] trait over invoices, contracts and forecasts
//! - An in-memory backend for tests and dry runs
//! - A PostgreSQL backend through sqlx (`postgres` feature, on by default)
//! - Ingestion, forecast sweeps, payment import and the background scheduler

mod backend;
mod error;
pub mod service;

pub use backend::InvoiceStore;
pub use backend::memory::MemoryStore;
pub use error::StoreError;
pub use service::{
    DeleteError, FileOutcome, IngestError, IngestedInvoice, Ingestor, PaymentReport, PdfArchive, Projector,
    Scheduler, SweepReport, apply_payments,
};

#[cfg(feature = "postgres")]
pub use backend::postgres::PgStore;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use invtrack_core::{Currency, Frequency, Invoice, InvoiceFields, InvoiceType};
    use rust_decimal::Decimal;

    pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn invoice(
        number: &str,
        client: &str,
        contract: &str,
        date: NaiveDate,
        frequency: Frequency,
    ) -> Invoice {
        Invoice::from_fields(InvoiceFields {
            invoice_number: number.to_string(),
            client: client.to_string(),
            currency: Currency::Usd,
            invoice_date: date,
            due_date: date,
            amount_due: Decimal::new(100000, 2),
            customer_contract: contract.to_string(),
            po_number: String::new(),
            services: "Managed services".to_string(),
            invoice_type: InvoiceType::Ms,
            frequency,
        })
    }
}
