//! Contract percentage tracking.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::fx::ExchangeRates;
use crate::models::contract::Contract;
use crate::models::invoice::{Currency, Invoice};

/// How much of a contract has been invoiced so far.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractProgress {
    pub contract: String,
    pub currency: Currency,
    pub value: Decimal,
    /// Sum of referencing invoices in the contract currency; credit memos subtract.
    pub invoiced: Decimal,
    pub remaining: Decimal,
    /// `invoiced / value * 100`, two decimal places; zero for a zero-value contract.
    pub percent_invoiced: Decimal,
    pub invoice_count: usize,
    /// Invoice numbers whose currency has no rate and were left out of the total.
    pub unconverted: Vec<String>,
}

impl ContractProgress {
    /// Total up the invoices that reference `contract`.
    ///
    /// An invoice references a contract through either its customer or its
    /// Oracle contract field.
    pub fn compute(contract: &Contract, invoices: &[Invoice], rates: &ExchangeRates) -> Self {
        let mut invoiced = Decimal::ZERO;
        let mut invoice_count = 0;
        let mut unconverted = Vec::new();

        let referencing = invoices.iter().filter(|i| {
            contract.is_referenced_by(&i.customer_contract)
                || contract.is_referenced_by(&i.oracle_contract)
        });

        for invoice in referencing {
            invoice_count += 1;
            match rates.convert(invoice.amount_due, invoice.currency, contract.currency) {
                Some(amount) => invoiced += amount,
                None => unconverted.push(invoice.invoice_number.clone()),
            }
        }

        let percent_invoiced = if contract.value.is_zero() {
            Decimal::ZERO
        } else {
            (invoiced / contract.value * Decimal::ONE_HUNDRED).round_dp(2)
        };

        Self {
            contract: contract.name.clone(),
            currency: contract.currency,
            value: contract.value,
            invoiced,
            remaining: contract.value - invoiced,
            percent_invoiced,
            invoice_count,
            unconverted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::ExchangeConfig;
    use crate::models::invoice::{Frequency, InvoiceFields, InvoiceType};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn invoice(number: &str, contract: &str, amount: &str, currency: Currency) -> Invoice {
        let date = NaiveDate::from_ymd_opt(2025, 1, 10).unwrap();
        Invoice::from_fields(InvoiceFields {
            invoice_number: number.to_string(),
            client: "Contoso".to_string(),
            currency,
            invoice_date: date,
            due_date: date,
            amount_due: dec(amount),
            customer_contract: contract.to_string(),
            po_number: String::new(),
            services: String::new(),
            invoice_type: InvoiceType::Ms,
            frequency: Frequency::Monthly,
        })
    }

    #[test]
    fn test_progress_with_credit_and_conversion() {
        let contract = Contract::new("SOC-2025", dec("10000"), Currency::Usd);
        let invoices = vec![
            invoice("1", "SOC-2025", "2000.00", Currency::Usd),
            invoice("2", " soc-2025 ", "1520.00", Currency::Aud),
            invoice("3", "SOC-2025", "-500.00", Currency::Usd),
            invoice("4", "OTHER", "9999.00", Currency::Usd),
        ];
        let rates = ExchangeRates::from_config(&ExchangeConfig::default());

        let progress = ContractProgress::compute(&contract, &invoices, &rates);
        assert_eq!(progress.invoice_count, 3);
        assert_eq!(progress.invoiced, dec("2500.00"));
        assert_eq!(progress.remaining, dec("7500.00"));
        assert_eq!(progress.percent_invoiced, dec("25.00"));
        assert!(progress.unconverted.is_empty());
    }

    #[test]
    fn test_oracle_contract_reference() {
        let contract = Contract::new("ORA-77", dec("1000"), Currency::Usd);
        let mut inv = invoice("1", "", "100.00", Currency::Usd);
        inv.oracle_contract = "ORA-77".to_string();
        let rates = ExchangeRates::from_config(&ExchangeConfig::default());
        let progress = ContractProgress::compute(&contract, &[inv], &rates);
        assert_eq!(progress.percent_invoiced, dec("10.00"));
    }

    #[test]
    fn test_unconverted_and_zero_value() {
        let contract = Contract::new("Zero", Decimal::ZERO, Currency::Usd);
        let invoices = vec![invoice("9", "zero", "10.00", Currency::Gbp)];
        let rates = ExchangeRates::new(Currency::Usd, BTreeMap::new());
        let progress = ContractProgress::compute(&contract, &invoices, &rates);
        assert_eq!(progress.unconverted, vec!["9".to_string()]);
        assert_eq!(progress.percent_invoiced, Decimal::ZERO);
        assert_eq!(progress.invoiced, Decimal::ZERO);
    }
}
