//! Storage backend implementations.

pub mod memory;

#[cfg(feature = "postgres")]
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use invtrack_core::{
    Contract, DismissedExpectedInvoice, ExpectedInvoice, Invoice, InvoicePatch,
    NewExpectedInvoice,
};
use uuid::Uuid;

use crate::Result;

/// Persistence for invoices, contracts and expected-invoice forecasts.
///
/// Contract and forecast lookups compare client and contract names through
/// the same whitespace and case normalization as
/// [`normalize_key`](invtrack_core::normalize_key).
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Persist a new invoice. Duplicate invoice numbers are allowed.
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()>;

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;

    /// Invoices whose normalized number equals `invoice_number`'s.
    async fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>>;

    /// All invoices, newest invoice date first.
    async fn list_invoices(&self) -> Result<Vec<Invoice>>;

    /// Apply a patch and return the updated invoice.
    async fn update_invoice(&self, id: Uuid, patch: &InvoicePatch) -> Result<Invoice>;

    /// Remove an invoice and return it so the caller can archive its PDF.
    async fn delete_invoice(&self, id: Uuid) -> Result<Invoice>;

    /// Mark every invoice with this number paid. Returns the number updated.
    async fn mark_paid(&self, invoice_number: &str, payment_date: NaiveDate) -> Result<u64>;

    /// Insert a contract or update the value and currency of the one with
    /// the same normalized name.
    async fn upsert_contract(&self, contract: &Contract) -> Result<Contract>;

    async fn list_contracts(&self) -> Result<Vec<Contract>>;

    /// Returns whether a contract with that name existed.
    async fn delete_contract(&self, name: &str) -> Result<bool>;

    /// Pending and acknowledged forecasts, earliest expected date first.
    async fn list_expected(&self) -> Result<Vec<ExpectedInvoice>>;

    /// Insert a forecast unless the group already has one within
    /// `window_days` or a tombstone suppresses it.
    ///
    /// The checks and the insert happen atomically. Returns whether a row
    /// was inserted.
    async fn insert_expected_if_absent(
        &self,
        expected: &NewExpectedInvoice,
        window_days: i64,
    ) -> Result<bool>;

    /// Delete forecasts that `invoice` satisfies. Returns the number deleted.
    async fn delete_satisfied_expected(&self, invoice: &Invoice, tolerance_days: i64) -> Result<u64>;

    /// Replace a forecast with a tombstone so the sweep does not recreate it.
    async fn dismiss_expected(&self, id: Uuid, today: NaiveDate) -> Result<DismissedExpectedInvoice>;

    /// Mark a forecast acknowledged as of `today`.
    async fn acknowledge_expected(&self, id: Uuid, today: NaiveDate) -> Result<ExpectedInvoice>;

    /// Delete forecasts acknowledged before `before`, leaving a tombstone
    /// dated on the acknowledgement for each one.
    async fn cleanup_acknowledged(&self, before: NaiveDate) -> Result<u64>;

    async fn list_dismissed(&self) -> Result<Vec<DismissedExpectedInvoice>>;
}
