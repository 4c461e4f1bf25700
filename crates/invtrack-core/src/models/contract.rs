//! Contract records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::invoice::Currency;
use crate::matching::normalize_key;

/// A user-entered contract value.
///
/// Invoices point at contracts through the free-text contract name they
/// carry, never through `id`. Name comparison always goes through
/// [`normalize_key`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: Uuid,
    pub name: String,
    pub value: Decimal,
    pub currency: Currency,
}

impl Contract {
    pub fn new(name: impl Into<String>, value: Decimal, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            value,
            currency,
        }
    }

    /// Normalized lookup key for this contract.
    pub fn key(&self) -> String {
        normalize_key(&self.name)
    }

    /// Does an invoice's contract reference point at this contract?
    pub fn is_referenced_by(&self, contract_ref: &str) -> bool {
        !contract_ref.trim().is_empty() && normalize_key(contract_ref) == self.key()
    }
}
