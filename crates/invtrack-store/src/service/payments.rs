//! Apply imported payments to stored invoices.

use invtrack_core::PaymentRecord;
use serde::Serialize;
use tracing::{info, warn};

use crate::{InvoiceStore, Result};

/// What happened to each payment in an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PaymentReport {
    /// Invoice rows marked paid.
    pub updated: u64,
    /// Payments that matched at least one invoice.
    pub matched: Vec<PaymentRecord>,
    /// Payments whose invoice number matched nothing.
    pub unmatched: Vec<PaymentRecord>,
}

/// Mark the invoices named by `records` as paid.
///
/// Invoice numbers match after trimming and case folding. A record that
/// matches nothing is reported, not treated as an error.
pub async fn apply_payments(store: &dyn InvoiceStore, records: &[PaymentRecord]) -> Result<PaymentReport> {
    let mut report = PaymentReport::default();

    for record in records {
        let updated = store
            .mark_paid(&record.invoice_number, record.payment_date)
            .await?;
        if updated == 0 {
            warn!(invoice_number = %record.invoice_number, "Payment matches no invoice");
            report.unmatched.push(record.clone());
        } else {
            report.updated += updated;
            report.matched.push(record.clone());
        }
    }

    info!(
        updated = report.updated,
        unmatched = report.unmatched.len(),
        "Payments applied"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::test_support::{invoice, ymd};
    use invtrack_core::{Frequency, InvoiceStatus};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_apply_payments() {
        let store = MemoryStore::new();
        let inv = invoice("INV-100", "Contoso", "", ymd(2025, 1, 1), Frequency::Adhoc);
        store.insert_invoice(&inv).await.unwrap();

        let records = vec![
            PaymentRecord::from_fields("inv-100", "2025-02-03").unwrap(),
            PaymentRecord::from_fields("INV-404", "2025-02-03").unwrap(),
        ];
        let report = apply_payments(&store, &records).await.unwrap();

        assert_eq!(report.updated, 1);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.unmatched[0].invoice_number, "INV-404");

        let paid = store.get_invoice(inv.id).await.unwrap().unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.payment_date, Some(ymd(2025, 2, 3)));
    }
}
