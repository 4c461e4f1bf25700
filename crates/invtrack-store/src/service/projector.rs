//! Expected-invoice lifecycle: sweep, reconcile, dismiss, acknowledge and cleanup.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use invtrack_core::forecast::plan_forecasts;
use invtrack_core::models::config::ForecastConfig;
use invtrack_core::{DismissedExpectedInvoice, ExpectedInvoice, Invoice};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{InvoiceStore, Result};

/// Outcome of one forecast sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Groups whose next invoice is due by the sweep date.
    pub planned: usize,
    /// Forecasts actually created.
    pub inserted: usize,
}

/// Drives forecasts through their states against a store.
pub struct Projector {
    store: Arc<dyn InvoiceStore>,
    config: ForecastConfig,
}

impl Projector {
    pub fn new(store: Arc<dyn InvoiceStore>, config: ForecastConfig) -> Self {
        Self { store, config }
    }

    /// Create forecasts for every recurring group whose next invoice is
    /// due on or before `today` and has not arrived.
    pub async fn sweep(&self, today: NaiveDate) -> Result<SweepReport> {
        let invoices = self.store.list_invoices().await?;
        let planned = plan_forecasts(&invoices, today);

        let mut report = SweepReport {
            planned: planned.len(),
            inserted: 0,
        };
        for candidate in &planned {
            if self
                .store
                .insert_expected_if_absent(candidate, self.config.duplicate_window_days)
                .await?
            {
                debug!(
                    client = %candidate.client,
                    contract = %candidate.customer_contract,
                    expected_date = %candidate.expected_date,
                    "Forecast created"
                );
                report.inserted += 1;
            }
        }

        info!(planned = report.planned, inserted = report.inserted, "Forecast sweep finished");
        Ok(report)
    }

    /// Remove forecasts that a newly received invoice satisfies.
    pub async fn reconcile(&self, invoice: &Invoice) -> Result<u64> {
        let removed = self
            .store
            .delete_satisfied_expected(invoice, self.config.match_tolerance_days)
            .await?;
        if removed > 0 {
            info!(invoice_number = %invoice.invoice_number, removed, "Forecasts satisfied");
        }
        Ok(removed)
    }

    pub async fn dismiss(&self, id: Uuid, today: NaiveDate) -> Result<DismissedExpectedInvoice> {
        let tombstone = self.store.dismiss_expected(id, today).await?;
        info!(client = %tombstone.client, expected_date = %tombstone.expected_date, "Forecast dismissed");
        Ok(tombstone)
    }

    pub async fn acknowledge(&self, id: Uuid, today: NaiveDate) -> Result<ExpectedInvoice> {
        self.store.acknowledge_expected(id, today).await
    }

    /// Delete forecasts acknowledged more than `cleanup_after_days` ago.
    ///
    /// Each removed forecast leaves a tombstone, so the next sweep does not
    /// recreate it from the same invoice.
    pub async fn cleanup(&self, today: NaiveDate) -> Result<u64> {
        let days = u64::try_from(self.config.cleanup_after_days).unwrap_or(0);
        let cutoff = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        let removed = self.store.cleanup_acknowledged(cutoff).await?;
        info!(removed, %cutoff, "Acknowledged forecasts cleaned up");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::test_support::{invoice, ymd};
    use invtrack_core::Frequency;
    use pretty_assertions::assert_eq;

    fn projector() -> (Arc<MemoryStore>, Projector) {
        let store = Arc::new(MemoryStore::new());
        let projector = Projector::new(store.clone(), ForecastConfig::default());
        (store, projector)
    }

    #[tokio::test]
    async fn test_sweep_uses_latest_invoice_per_group() {
        let (store, projector) = projector();
        for inv in [
            invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly),
            invoice("2", "contoso ", "ctr-1", ymd(2025, 2, 10), Frequency::Monthly),
            invoice("3", "Fabrikam", "", ymd(2025, 1, 15), Frequency::Quarterly),
            invoice("4", "Adhoc Co", "", ymd(2024, 1, 1), Frequency::Adhoc),
        ] {
            store.insert_invoice(&inv).await.unwrap();
        }

        let report = projector.sweep(ymd(2025, 3, 20)).await.unwrap();
        assert_eq!(report, SweepReport { planned: 1, inserted: 1 });

        let expected = store.list_expected().await.unwrap();
        assert_eq!(expected[0].expected_date, ymd(2025, 3, 10));
        assert_eq!(expected[0].last_invoice_number, "2");

        let again = projector.sweep(ymd(2025, 3, 21)).await.unwrap();
        assert_eq!(again.inserted, 0);
    }

    #[tokio::test]
    async fn test_dismissed_forecast_is_not_recreated() {
        let (store, projector) = projector();
        store
            .insert_invoice(&invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly))
            .await
            .unwrap();
        projector.sweep(ymd(2025, 2, 10)).await.unwrap();
        let id = store.list_expected().await.unwrap()[0].id;

        projector.dismiss(id, ymd(2025, 2, 11)).await.unwrap();
        let report = projector.sweep(ymd(2025, 2, 12)).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert!(store.list_expected().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_and_cleanup() {
        let (store, projector) = projector();
        store
            .insert_invoice(&invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly))
            .await
            .unwrap();
        projector.sweep(ymd(2025, 2, 10)).await.unwrap();

        let arrived = invoice("2", "Contoso", "CTR-1", ymd(2025, 2, 5), Frequency::Monthly);
        assert_eq!(projector.reconcile(&arrived).await.unwrap(), 1);

        store
            .insert_invoice(&invoice("9", "Fabrikam", "", ymd(2025, 1, 1), Frequency::Monthly))
            .await
            .unwrap();
        projector.sweep(ymd(2025, 2, 1)).await.unwrap();
        let id = store.list_expected().await.unwrap()[0].id;
        projector.acknowledge(id, ymd(2025, 2, 2)).await.unwrap();

        assert_eq!(projector.cleanup(ymd(2025, 3, 1)).await.unwrap(), 0);
        assert_eq!(projector.cleanup(ymd(2025, 3, 5)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cleaned_up_forecast_is_not_recreated() {
        let (store, projector) = projector();
        store
            .insert_invoice(&invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly))
            .await
            .unwrap();
        assert_eq!(projector.sweep(ymd(2025, 2, 15)).await.unwrap().inserted, 1);
        let id = store.list_expected().await.unwrap()[0].id;
        projector.acknowledge(id, ymd(2025, 2, 16)).await.unwrap();

        assert_eq!(projector.cleanup(ymd(2025, 3, 20)).await.unwrap(), 1);

        let report = projector.sweep(ymd(2025, 3, 21)).await.unwrap();
        assert_eq!(report, SweepReport { planned: 1, inserted: 0 });
        assert!(store.list_expected().await.unwrap().is_empty());
    }
}
