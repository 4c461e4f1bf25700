//! Expected-invoice projection.
//!
//! Pure planning logic: which forecasts should exist for a set of invoices,
//! which pending forecasts a new invoice satisfies, and when a candidate
//! duplicates an existing row. Persistence lives in the store crate.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};

use crate::models::forecast::{ExpectedInvoice, GroupKey, NewExpectedInvoice};
use crate::models::invoice::{Frequency, Invoice};

/// A real invoice within this many days of a forecast satisfies it.
pub const MATCH_TOLERANCE_DAYS: i64 = 45;

/// Forecasts for the same group this close together are duplicates.
pub const DUPLICATE_WINDOW_DAYS: i64 = 1;

/// Next billing date after `last` for a recurring frequency.
///
/// Month arithmetic clamps to the end of the month, so a monthly invoice
/// dated January 31 is next expected on the last day of February.
pub fn next_expected_date(last: NaiveDate, frequency: Frequency) -> Option<NaiveDate> {
    let months = frequency.interval_months()?;
    last.checked_add_months(Months::new(months))
}

/// The forecast that follows `invoice`, if its frequency recurs.
pub fn forecast_after(invoice: &Invoice) -> Option<NewExpectedInvoice> {
    let expected_date = next_expected_date(invoice.invoice_date, invoice.frequency)?;
    Some(NewExpectedInvoice {
        client: invoice.client.clone(),
        customer_contract: invoice.customer_contract.clone(),
        invoice_type: invoice.invoice_type,
        expected_amount: invoice.amount_due,
        currency: invoice.currency,
        expected_date,
        frequency: invoice.frequency,
        last_invoice_number: invoice.invoice_number.clone(),
        last_invoice_date: invoice.invoice_date,
    })
}

/// Latest recurring invoice per normalized `(client, contract)` group.
///
/// Ties on the invoice date go to the higher invoice number so the result
/// does not depend on input order.
pub fn latest_recurring(invoices: &[Invoice]) -> BTreeMap<GroupKey, &Invoice> {
    let mut latest: BTreeMap<GroupKey, &Invoice> = BTreeMap::new();
    for invoice in invoices.iter().filter(|i| i.frequency.is_recurring()) {
        let key = GroupKey::new(&invoice.client, &invoice.customer_contract);
        let newer = latest.get(&key).is_none_or(|current| {
            (current.invoice_date, &current.invoice_number)
                < (invoice.invoice_date, &invoice.invoice_number)
        });
        if newer {
            latest.insert(key, invoice);
        }
    }
    latest
}

/// Forecasts that are due on or before `today`, one per group.
///
/// Duplicate and tombstone checks are left to the store, which performs
/// them atomically with the insert.
pub fn plan_forecasts(invoices: &[Invoice], today: NaiveDate) -> Vec<NewExpectedInvoice> {
    latest_recurring(invoices)
        .into_values()
        .filter_map(forecast_after)
        .filter(|f| f.expected_date <= today)
        .collect()
}

/// Does `existing` already cover `candidate` within `window_days`?
pub fn is_duplicate(existing: &ExpectedInvoice, candidate: &NewExpectedInvoice, window_days: i64) -> bool {
    existing.group_key() == candidate.group_key()
        && (existing.expected_date - candidate.expected_date).num_days().abs() <= window_days
}

/// Does a newly received invoice satisfy a pending forecast?
///
/// Matches on normalized client and contract, invoice type and frequency,
/// with the invoice date within `tolerance_days` of the expected date.
pub fn satisfies(invoice: &Invoice, expected: &ExpectedInvoice, tolerance_days: i64) -> bool {
    expected.group_key() == GroupKey::new(&invoice.client, &invoice.customer_contract)
        && expected.invoice_type == invoice.invoice_type
        && expected.frequency == invoice.frequency
        && (expected.expected_date - invoice.invoice_date).num_days().abs() <= tolerance_days
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::invoice::{Currency, InvoiceFields, InvoiceType};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn invoice(number: &str, client: &str, contract: &str, date: NaiveDate, frequency: Frequency) -> Invoice {
        Invoice::from_fields(InvoiceFields {
            invoice_number: number.to_string(),
            client: client.to_string(),
            currency: Currency::Usd,
            invoice_date: date,
            due_date: date,
            amount_due: Decimal::new(100000, 2),
            customer_contract: contract.to_string(),
            po_number: String::new(),
            services: "Managed SOC monthly".to_string(),
            invoice_type: InvoiceType::Ms,
            frequency,
        })
    }

    #[test]
    fn test_next_expected_date_intervals() {
        let last = ymd(2025, 1, 10);
        assert_eq!(next_expected_date(last, Frequency::Monthly), Some(ymd(2025, 2, 10)));
        assert_eq!(next_expected_date(last, Frequency::Quarterly), Some(ymd(2025, 4, 10)));
        assert_eq!(next_expected_date(last, Frequency::TriAnnual), Some(ymd(2025, 5, 10)));
        assert_eq!(next_expected_date(last, Frequency::BiAnnual), Some(ymd(2025, 7, 10)));
        assert_eq!(next_expected_date(last, Frequency::Annual), Some(ymd(2026, 1, 10)));
        assert_eq!(next_expected_date(last, Frequency::Adhoc), None);
    }

    #[test]
    fn test_next_expected_date_clamps_month_end() {
        assert_eq!(
            next_expected_date(ymd(2025, 1, 31), Frequency::Monthly),
            Some(ymd(2025, 2, 28))
        );
    }

    #[test]
    fn test_plan_uses_latest_invoice_per_group() {
        let invoices = vec![
            invoice("4600001", "Contoso", "SOC", ymd(2025, 1, 10), Frequency::Monthly),
            invoice("4600002", " contoso ", "soc", ymd(2025, 2, 10), Frequency::Monthly),
            invoice("4600003", "Fabrikam", "", ymd(2025, 2, 20), Frequency::Adhoc),
        ];
        let planned = plan_forecasts(&invoices, ymd(2025, 3, 15));
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].expected_date, ymd(2025, 3, 10));
        assert_eq!(planned[0].last_invoice_number, "4600002");
    }

    #[test]
    fn test_plan_skips_future_forecasts() {
        let invoices = vec![invoice("1", "Contoso", "", ymd(2025, 3, 1), Frequency::Quarterly)];
        assert!(plan_forecasts(&invoices, ymd(2025, 5, 31)).is_empty());
        assert_eq!(plan_forecasts(&invoices, ymd(2025, 6, 1)).len(), 1);
    }

    #[test]
    fn test_reconciliation_tolerance() {
        let recurring = invoice("4600001", "Contoso", "SOC", ymd(2025, 1, 10), Frequency::Monthly);
        let expected = forecast_after(&recurring).unwrap().into_expected();
        assert_eq!(expected.expected_date, ymd(2025, 2, 10));

        let on_time = invoice("4600002", "Contoso", "SOC", ymd(2025, 2, 5), Frequency::Monthly);
        assert!(satisfies(&on_time, &expected, MATCH_TOLERANCE_DAYS));

        let late = invoice("4600003", "Contoso", "SOC", ymd(2025, 4, 1), Frequency::Monthly);
        assert!(!satisfies(&late, &expected, MATCH_TOLERANCE_DAYS));
    }

    #[test]
    fn test_satisfies_requires_same_type_and_frequency() {
        let recurring = invoice("1", "Contoso", "SOC", ymd(2025, 1, 10), Frequency::Monthly);
        let expected = forecast_after(&recurring).unwrap().into_expected();

        let mut other_type = invoice("2", "Contoso", "SOC", ymd(2025, 2, 10), Frequency::Monthly);
        other_type.invoice_type = InvoiceType::Hosting;
        assert!(!satisfies(&other_type, &expected, MATCH_TOLERANCE_DAYS));

        let other_freq = invoice("3", "Contoso", "SOC", ymd(2025, 2, 10), Frequency::Quarterly);
        assert!(!satisfies(&other_freq, &expected, MATCH_TOLERANCE_DAYS));
    }

    #[test]
    fn test_duplicate_window() {
        let recurring = invoice("1", "Contoso", "SOC", ymd(2025, 1, 10), Frequency::Monthly);
        let existing = forecast_after(&recurring).unwrap().into_expected();

        let mut candidate = forecast_after(&recurring).unwrap();
        candidate.expected_date = ymd(2025, 2, 11);
        assert!(is_duplicate(&existing, &candidate, DUPLICATE_WINDOW_DAYS));

        candidate.expected_date = ymd(2025, 2, 12);
        assert!(!is_duplicate(&existing, &candidate, DUPLICATE_WINDOW_DAYS));
    }
}
