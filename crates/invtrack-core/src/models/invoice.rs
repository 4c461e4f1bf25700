//! Invoice data models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice type code assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InvoiceType {
    /// Professional services.
    #[default]
    #[serde(rename = "PS")]
    Ps,
    /// Maintenance and support.
    #[serde(rename = "Maint")]
    Maint,
    /// Subscription.
    #[serde(rename = "Sub")]
    Sub,
    /// Hosting / cloud infrastructure.
    #[serde(rename = "Hosting")]
    Hosting,
    /// Managed services.
    #[serde(rename = "MS")]
    Ms,
    /// Software purchase.
    #[serde(rename = "SW")]
    Sw,
    /// Hardware purchase.
    #[serde(rename = "HW")]
    Hw,
    /// Third party product.
    #[serde(rename = "3PP")]
    ThirdParty,
    /// Credit memo (negative amount).
    #[serde(rename = "Credit Memo")]
    CreditMemo,
}

impl InvoiceType {
    pub const ALL: [InvoiceType; 9] = [
        InvoiceType::Ps,
        InvoiceType::Maint,
        InvoiceType::Sub,
        InvoiceType::Hosting,
        InvoiceType::Ms,
        InvoiceType::Sw,
        InvoiceType::Hw,
        InvoiceType::ThirdParty,
        InvoiceType::CreditMemo,
    ];

    /// The stored code for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Ps => "PS",
            InvoiceType::Maint => "Maint",
            InvoiceType::Sub => "Sub",
            InvoiceType::Hosting => "Hosting",
            InvoiceType::Ms => "MS",
            InvoiceType::Sw => "SW",
            InvoiceType::Hw => "HW",
            InvoiceType::ThirdParty => "3PP",
            InvoiceType::CreditMemo => "Credit Memo",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        InvoiceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown invoice type: {wanted}"))
    }
}

/// Billing cadence detected from the services text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Frequency {
    #[serde(rename = "monthly")]
    Monthly,
    #[serde(rename = "quarterly")]
    Quarterly,
    #[serde(rename = "tri-annual")]
    TriAnnual,
    #[serde(rename = "bi-annual")]
    BiAnnual,
    #[serde(rename = "annual")]
    Annual,
    #[default]
    #[serde(rename = "adhoc")]
    Adhoc,
}

impl Frequency {
    pub const ALL: [Frequency; 6] = [
        Frequency::Monthly,
        Frequency::Quarterly,
        Frequency::TriAnnual,
        Frequency::BiAnnual,
        Frequency::Annual,
        Frequency::Adhoc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::TriAnnual => "tri-annual",
            Frequency::BiAnnual => "bi-annual",
            Frequency::Annual => "annual",
            Frequency::Adhoc => "adhoc",
        }
    }

    /// Number of months between two invoices at this cadence.
    ///
    /// Returns `None` for ad hoc billing, which is never forecast.
    pub fn interval_months(&self) -> Option<u32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::TriAnnual => Some(4),
            Frequency::BiAnnual => Some(6),
            Frequency::Annual => Some(12),
            Frequency::Adhoc => None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.interval_months().is_some()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Frequency::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown frequency: {wanted}"))
    }
}

/// Currencies recognized on invoices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Aud,
    Eur,
    Gbp,
    Sgd,
}

impl Currency {
    pub const ALL: [Currency; 5] = [
        Currency::Usd,
        Currency::Aud,
        Currency::Eur,
        Currency::Gbp,
        Currency::Sgd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Aud => "AUD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
            Currency::Sgd => "SGD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Currency::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown currency: {wanted}"))
    }
}

/// Payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvoiceStatus {
    #[default]
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "Pending",
            InvoiceStatus::Paid => "Paid",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            other => Err(format!("unknown invoice status: {other}")),
        }
    }
}

/// Fields pulled out of an invoice's text.
///
/// Every field is always populated; missing values are replaced by
/// documented fallbacks during extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFields {
    pub invoice_number: String,
    pub client: String,
    pub currency: Currency,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub amount_due: Decimal,
    pub customer_contract: String,
    pub po_number: String,
    pub services: String,
    pub invoice_type: InvoiceType,
    pub frequency: Frequency,
}

/// A persisted invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub client: String,
    pub invoice_type: InvoiceType,
    pub frequency: Frequency,
    pub amount_due: Decimal,
    pub currency: Currency,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub customer_contract: String,
    #[serde(default)]
    pub oracle_contract: String,
    #[serde(default)]
    pub po_number: String,
    pub status: InvoiceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_original_name: Option<String>,
    pub services: String,
}

impl Invoice {
    /// Build a new pending invoice from extracted fields.
    pub fn from_fields(fields: InvoiceFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            invoice_number: fields.invoice_number,
            client: fields.client,
            invoice_type: fields.invoice_type,
            frequency: fields.frequency,
            amount_due: fields.amount_due,
            currency: fields.currency,
            invoice_date: fields.invoice_date,
            due_date: fields.due_date,
            customer_contract: fields.customer_contract,
            oracle_contract: String::new(),
            po_number: fields.po_number,
            status: InvoiceStatus::Pending,
            payment_date: None,
            pdf_path: None,
            pdf_original_name: None,
            services: fields.services,
        }
    }

    /// Attach the archived PDF location and the uploaded file name.
    pub fn with_pdf(mut self, path: impl Into<String>, original_name: impl Into<String>) -> Self {
        self.pdf_path = Some(path.into());
        self.pdf_original_name = Some(original_name.into());
        self
    }

    /// Unpaid and past its due date.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InvoiceStatus::Pending && self.due_date < today
    }

    /// Record a payment.
    pub fn mark_paid(&mut self, payment_date: NaiveDate) {
        self.status = InvoiceStatus::Paid;
        self.payment_date = Some(payment_date);
    }
}

/// A manual edit to an invoice. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvoicePatch {
    pub invoice_number: Option<String>,
    pub client: Option<String>,
    pub invoice_type: Option<InvoiceType>,
    pub frequency: Option<Frequency>,
    pub amount_due: Option<Decimal>,
    pub currency: Option<Currency>,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub customer_contract: Option<String>,
    pub oracle_contract: Option<String>,
    pub po_number: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub payment_date: Option<NaiveDate>,
}

impl InvoicePatch {
    pub fn is_empty(&self) -> bool {
        self.invoice_number.is_none()
            && self.client.is_none()
            && self.invoice_type.is_none()
            && self.frequency.is_none()
            && self.amount_due.is_none()
            && self.currency.is_none()
            && self.invoice_date.is_none()
            && self.due_date.is_none()
            && self.customer_contract.is_none()
            && self.oracle_contract.is_none()
            && self.po_number.is_none()
            && self.status.is_none()
            && self.payment_date.is_none()
    }

    /// Apply the edit in place.
    pub fn apply(&self, invoice: &mut Invoice) {
        if let Some(v) = &self.invoice_number {
            invoice.invoice_number = v.trim().to_string();
        }
        if let Some(v) = &self.client {
            invoice.client = v.trim().to_string();
        }
        if let Some(v) = self.invoice_type {
            invoice.invoice_type = v;
        }
        if let Some(v) = self.frequency {
            invoice.frequency = v;
        }
        if let Some(v) = self.amount_due {
            invoice.amount_due = v;
        }
        if let Some(v) = self.currency {
            invoice.currency = v;
        }
        if let Some(v) = self.invoice_date {
            invoice.invoice_date = v;
        }
        if let Some(v) = self.due_date {
            invoice.due_date = v;
        }
        if let Some(v) = &self.customer_contract {
            invoice.customer_contract = v.trim().to_string();
        }
        if let Some(v) = &self.oracle_contract {
            invoice.oracle_contract = v.trim().to_string();
        }
        if let Some(v) = &self.po_number {
            invoice.po_number = v.trim().to_string();
        }
        if let Some(v) = self.status {
            invoice.status = v;
            if v == InvoiceStatus::Pending {
                invoice.payment_date = None;
            }
        }
        if let Some(v) = self.payment_date {
            invoice.payment_date = Some(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_type_codes() {
        assert_eq!(InvoiceType::ThirdParty.as_str(), "3PP");
        assert_eq!("credit memo".parse::<InvoiceType>(), Ok(InvoiceType::CreditMemo));
        assert_eq!("maint".parse::<InvoiceType>(), Ok(InvoiceType::Maint));
        assert!("retainer".parse::<InvoiceType>().is_err());
    }

    #[test]
    fn test_serde_uses_stored_codes() {
        let json = serde_json::to_string(&InvoiceType::CreditMemo).unwrap();
        assert_eq!(json, "\"Credit Memo\"");
        let json = serde_json::to_string(&Frequency::BiAnnual).unwrap();
        assert_eq!(json, "\"bi-annual\"");
        let json = serde_json::to_string(&Currency::Sgd).unwrap();
        assert_eq!(json, "\"SGD\"");
    }

    #[test]
    fn test_frequency_intervals() {
        assert_eq!(Frequency::Monthly.interval_months(), Some(1));
        assert_eq!(Frequency::TriAnnual.interval_months(), Some(4));
        assert_eq!(Frequency::Annual.interval_months(), Some(12));
        assert!(!Frequency::Adhoc.is_recurring());
    }

    #[test]
    fn test_patch_back_to_pending_clears_payment() {
        let mut invoice = sample();
        invoice.mark_paid(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap());

        let patch = InvoicePatch {
            status: Some(InvoiceStatus::Pending),
            ..Default::default()
        };
        patch.apply(&mut invoice);

        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert_eq!(invoice.payment_date, None);
    }

    #[test]
    fn test_dates_serialize_as_plain_calendar_days() {
        let invoice = sample();
        let value = serde_json::to_value(&invoice).unwrap();
        assert_eq!(value["invoice_date"], "2025-01-10");
        assert_eq!(value["due_date"], "2025-02-09");
    }

    fn sample() -> Invoice {
        Invoice::from_fields(InvoiceFields {
            invoice_number: "INV-1".to_string(),
            client: "Acme".to_string(),
            currency: Currency::Usd,
            invoice_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 2, 9).unwrap(),
            amount_due: Decimal::new(10000, 2),
            customer_contract: String::new(),
            po_number: String::new(),
            services: "Monthly support".to_string(),
            invoice_type: InvoiceType::Maint,
            frequency: Frequency::Monthly,
        })
    }
}
