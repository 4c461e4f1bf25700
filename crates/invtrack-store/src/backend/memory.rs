//! In-process backend for tests and dry runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use invtrack_core::forecast::{is_duplicate, satisfies};
use invtrack_core::matching::same_key;
use invtrack_core::{
    Contract, DismissedExpectedInvoice, ExpectedInvoice, Invoice, InvoicePatch,
    NewExpectedInvoice,
};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::InvoiceStore;
use crate::{Result, StoreError};

#[derive(Debug, Default)]
struct Tables {
    invoices: HashMap<Uuid, Invoice>,
    contracts: Vec<Contract>,
    expected: Vec<ExpectedInvoice>,
    dismissed: Vec<DismissedExpectedInvoice>,
}

/// Backend keeping every table in memory behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.invoices.contains_key(&invoice.id) {
            return Err(StoreError::Conflict(format!("invoice id {} exists", invoice.id)));
        }
        tables.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn find_by_number(&self, invoice_number: &str) -> Result<Vec<Invoice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .values()
            .filter(|i| same_key(&i.invoice_number, invoice_number))
            .cloned()
            .collect())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let tables = self.tables.read().await;
        let mut invoices: Vec<Invoice> = tables.invoices.values().cloned().collect();
        invoices.sort_by(|a, b| {
            b.invoice_date
                .cmp(&a.invoice_date)
                .then_with(|| b.invoice_number.cmp(&a.invoice_number))
        });
        Ok(invoices)
    }

    async fn update_invoice(&self, id: Uuid, patch: &InvoicePatch) -> Result<Invoice> {
        let mut tables = self.tables.write().await;
        let invoice = tables
            .invoices
            .get_mut(&id)
            .ok_or(StoreError::NotFound { entity: "invoice", id })?;
        patch.apply(invoice);
        Ok(invoice.clone())
    }

    async fn delete_invoice(&self, id: Uuid) -> Result<Invoice> {
        self.tables
            .write()
            .await
            .invoices
            .remove(&id)
            .ok_or(StoreError::NotFound { entity: "invoice", id })
    }

    async fn mark_paid(&self, invoice_number: &str, payment_date: NaiveDate) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut updated = 0;
        for invoice in tables
            .invoices
            .values_mut()
            .filter(|i| same_key(&i.invoice_number, invoice_number))
        {
            invoice.mark_paid(payment_date);
            updated += 1;
        }
        Ok(updated)
    }

    async fn upsert_contract(&self, contract: &Contract) -> Result<Contract> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.contracts.iter_mut().find(|c| c.key() == contract.key()) {
            existing.name = contract.name.clone();
            existing.value = contract.value;
            existing.currency = contract.currency;
            return Ok(existing.clone());
        }
        tables.contracts.push(contract.clone());
        Ok(contract.clone())
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>> {
        let mut contracts = self.tables.read().await.contracts.clone();
        contracts.sort_by_key(|c| c.key());
        Ok(contracts)
    }

    async fn delete_contract(&self, name: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.contracts.len();
        tables.contracts.retain(|c| !same_key(&c.name, name));
        Ok(tables.contracts.len() != before)
    }

    async fn list_expected(&self) -> Result<Vec<ExpectedInvoice>> {
        let mut expected = self.tables.read().await.expected.clone();
        expected.sort_by(|a, b| {
            a.expected_date
                .cmp(&b.expected_date)
                .then_with(|| a.client.cmp(&b.client))
        });
        Ok(expected)
    }

    async fn insert_expected_if_absent(
        &self,
        expected: &NewExpectedInvoice,
        window_days: i64,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let covered = tables
            .expected
            .iter()
            .any(|e| is_duplicate(e, expected, window_days));
        let suppressed = tables.dismissed.iter().any(|d| d.suppresses(expected));
        if covered || suppressed {
            debug!(client = %expected.client, covered, suppressed, "Forecast already present");
            return Ok(false);
        }
        tables.expected.push(expected.clone().into_expected());
        Ok(true)
    }

    async fn delete_satisfied_expected(&self, invoice: &Invoice, tolerance_days: i64) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let before = tables.expected.len();
        tables
            .expected
            .retain(|e| !satisfies(invoice, e, tolerance_days));
        Ok((before - tables.expected.len()) as u64)
    }

    async fn dismiss_expected(&self, id: Uuid, today: NaiveDate) -> Result<DismissedExpectedInvoice> {
        let mut tables = self.tables.write().await;
        let pos = tables
            .expected
            .iter()
            .position(|e| e.id == id)
            .ok_or(StoreError::NotFound { entity: "expected invoice", id })?;
        let expected = tables.expected.remove(pos);
        let tombstone = DismissedExpectedInvoice::from_expected(&expected, today);
        if !tables.dismissed.iter().any(|d| same_tombstone(d, &tombstone)) {
            tables.dismissed.push(tombstone.clone());
        }
        Ok(tombstone)
    }

    async fn acknowledge_expected(&self, id: Uuid, today: NaiveDate) -> Result<ExpectedInvoice> {
        let mut tables = self.tables.write().await;
        let expected = tables
            .expected
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StoreError::NotFound { entity: "expected invoice", id })?;
        expected.acknowledged = true;
        expected.acknowledged_date = Some(today);
        Ok(expected.clone())
    }

    async fn cleanup_acknowledged(&self, before: NaiveDate) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut tables.expected)
            .into_iter()
            .partition(|e| e.acknowledged && e.acknowledged_date.is_some_and(|d| d < before));
        tables.expected = kept;

        for expected in &removed {
            let handled_on = expected.acknowledged_date.unwrap_or(before);
            let tombstone = DismissedExpectedInvoice::from_expected(expected, handled_on);
            if !tables.dismissed.iter().any(|d| same_tombstone(d, &tombstone)) {
                tables.dismissed.push(tombstone);
            }
        }
        Ok(removed.len() as u64)
    }

    async fn list_dismissed(&self) -> Result<Vec<DismissedExpectedInvoice>> {
        Ok(self.tables.read().await.dismissed.clone())
    }
}

/// Tombstones are unique per normalized group, type and expected date.
fn same_tombstone(a: &DismissedExpectedInvoice, b: &DismissedExpectedInvoice) -> bool {
    same_key(&a.client, &b.client)
        && same_key(&a.customer_contract, &b.customer_contract)
        && a.invoice_type == b.invoice_type
        && a.expected_date == b.expected_date
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{invoice, ymd};
    use invtrack_core::forecast::forecast_after;
    use invtrack_core::{Currency, Frequency, InvoiceStatus, InvoiceType};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_invoice_crud_and_payment() {
        let store = MemoryStore::new();
        let inv = invoice("4700001", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly);
        store.insert_invoice(&inv).await.unwrap();
        assert!(store.insert_invoice(&inv).await.is_err());

        let patch = InvoicePatch {
            amount_due: Some(Decimal::new(99, 0)),
            ..Default::default()
        };
        let updated = store.update_invoice(inv.id, &patch).await.unwrap();
        assert_eq!(updated.amount_due, Decimal::new(99, 0));

        assert_eq!(store.mark_paid(" 4700001 ", ymd(2025, 2, 1)).await.unwrap(), 1);
        let paid = store.get_invoice(inv.id).await.unwrap().unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(paid.payment_date, Some(ymd(2025, 2, 1)));
        assert_eq!(store.mark_paid("missing", ymd(2025, 2, 1)).await.unwrap(), 0);

        store.delete_invoice(inv.id).await.unwrap();
        assert!(matches!(
            store.delete_invoice(inv.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_contract_upsert_by_normalized_name() {
        let store = MemoryStore::new();
        store
            .upsert_contract(&Contract::new("SOC 2025", Decimal::new(1000, 0), Currency::Usd))
            .await
            .unwrap();
        let updated = store
            .upsert_contract(&Contract::new(" soc  2025", Decimal::new(2000, 0), Currency::Aud))
            .await
            .unwrap();
        assert_eq!(updated.value, Decimal::new(2000, 0));
        assert_eq!(store.list_contracts().await.unwrap().len(), 1);

        assert!(store.delete_contract("SOC 2025").await.unwrap());
        assert!(!store.delete_contract("SOC 2025").await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_expected_respects_window_and_tombstones() {
        let store = MemoryStore::new();
        let last = invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly);
        let forecast = forecast_after(&last).unwrap();

        assert!(store.insert_expected_if_absent(&forecast, 1).await.unwrap());
        assert!(!store.insert_expected_if_absent(&forecast, 1).await.unwrap());

        let mut shifted = forecast.clone();
        shifted.client = " CONTOSO ".to_string();
        shifted.expected_date = ymd(2025, 2, 11);
        assert!(!store.insert_expected_if_absent(&shifted, 1).await.unwrap());

        let id = store.list_expected().await.unwrap()[0].id;
        store.dismiss_expected(id, ymd(2025, 2, 12)).await.unwrap();
        assert!(store.list_expected().await.unwrap().is_empty());
        assert_eq!(store.list_dismissed().await.unwrap().len(), 1);

        assert!(!store.insert_expected_if_absent(&forecast, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_window() {
        let store = MemoryStore::new();
        let last = invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly);
        store
            .insert_expected_if_absent(&forecast_after(&last).unwrap(), 1)
            .await
            .unwrap();

        let late = invoice("3", "Contoso", "CTR-1", ymd(2025, 4, 1), Frequency::Monthly);
        assert_eq!(store.delete_satisfied_expected(&late, 45).await.unwrap(), 0);

        let mut other_type = invoice("2", "Contoso", "CTR-1", ymd(2025, 2, 5), Frequency::Monthly);
        other_type.invoice_type = InvoiceType::Hosting;
        assert_eq!(store.delete_satisfied_expected(&other_type, 45).await.unwrap(), 0);

        let on_time = invoice("2", "contoso", "ctr-1", ymd(2025, 2, 5), Frequency::Monthly);
        assert_eq!(store.delete_satisfied_expected(&on_time, 45).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_acknowledge_and_cleanup() {
        let store = MemoryStore::new();
        let last = invoice("1", "Contoso", "CTR-1", ymd(2025, 1, 10), Frequency::Monthly);
        store
            .insert_expected_if_absent(&forecast_after(&last).unwrap(), 1)
            .await
            .unwrap();
        let id = store.list_expected().await.unwrap()[0].id;

        let acked = store.acknowledge_expected(id, ymd(2025, 3, 1)).await.unwrap();
        assert!(acked.acknowledged);
        assert_eq!(acked.acknowledged_date, Some(ymd(2025, 3, 1)));

        assert_eq!(store.cleanup_acknowledged(ymd(2025, 3, 1)).await.unwrap(), 0);
        assert_eq!(store.cleanup_acknowledged(ymd(2025, 3, 31)).await.unwrap(), 1);
        assert!(store.acknowledge_expected(id, ymd(2025, 4, 1)).await.is_err());

        let dismissed = store.list_dismissed().await.unwrap();
        assert_eq!(dismissed.len(), 1);
        assert_eq!(dismissed[0].expected_date, ymd(2025, 2, 10));
        assert_eq!(dismissed[0].dismissed_date, ymd(2025, 3, 1));
        assert!(
            !store
                .insert_expected_if_absent(&forecast_after(&last).unwrap(), 1)
                .await
                .unwrap()
        );
    }
}
