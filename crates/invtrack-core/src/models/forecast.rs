//! Expected (forecast) invoice records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoice::{Currency, Frequency, InvoiceType};
use crate::matching::normalize_key;

/// A forecast row for an invoice that should have arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectedInvoice {
    pub id: Uuid,
    pub client: String,
    pub customer_contract: String,
    pub invoice_type: InvoiceType,
    pub expected_amount: Decimal,
    pub currency: Currency,
    pub expected_date: NaiveDate,
    pub frequency: Frequency,
    pub last_invoice_number: String,
    pub last_invoice_date: NaiveDate,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_date: Option<NaiveDate>,
}

impl ExpectedInvoice {
    /// Normalized `(client, contract)` grouping key.
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.client, &self.customer_contract)
    }
}

/// A forecast the projector wants to insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpectedInvoice {
    pub client: String,
    pub customer_contract: String,
    pub invoice_type: InvoiceType,
    pub expected_amount: Decimal,
    pub currency: Currency,
    pub expected_date: NaiveDate,
    pub frequency: Frequency,
    pub last_invoice_number: String,
    pub last_invoice_date: NaiveDate,
}

impl NewExpectedInvoice {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.client, &self.customer_contract)
    }

    pub fn into_expected(self) -> ExpectedInvoice {
        ExpectedInvoice {
            id: Uuid::new_v4(),
            client: self.client,
            customer_contract: self.customer_contract,
            invoice_type: self.invoice_type,
            expected_amount: self.expected_amount,
            currency: self.currency,
            expected_date: self.expected_date,
            frequency: self.frequency,
            last_invoice_number: self.last_invoice_number,
            last_invoice_date: self.last_invoice_date,
            acknowledged: false,
            acknowledged_date: None,
        }
    }
}

/// Tombstone that stops the projector from regenerating a dismissed forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DismissedExpectedInvoice {
    pub client: String,
    pub customer_contract: String,
    pub invoice_type: InvoiceType,
    pub expected_date: NaiveDate,
    pub dismissed_date: NaiveDate,
}

impl DismissedExpectedInvoice {
    pub fn from_expected(expected: &ExpectedInvoice, dismissed_date: NaiveDate) -> Self {
        Self {
            client: expected.client.clone(),
            customer_contract: expected.customer_contract.clone(),
            invoice_type: expected.invoice_type,
            expected_date: expected.expected_date,
            dismissed_date,
        }
    }

    /// Does this tombstone suppress the given forecast?
    pub fn suppresses(&self, candidate: &NewExpectedInvoice) -> bool {
        GroupKey::new(&self.client, &self.customer_contract) == candidate.group_key()
            && self.invoice_type == candidate.invoice_type
            && self.expected_date == candidate.expected_date
    }
}

/// Normalized `(client, contract)` pair used to group recurring invoices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey {
    pub client: String,
    pub contract: String,
}

impl GroupKey {
    pub fn new(client: &str, contract: &str) -> Self {
        Self {
            client: normalize_key(client),
            contract: normalize_key(contract),
        }
    }
}
