//! Exchange rates for cross-currency contract tracking.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::RwLock;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RateError;
use crate::models::config::ExchangeConfig;
use crate::models::invoice::Currency;

/// A rate table quoted against one base currency.
///
/// `rates[c]` is how many units of `c` one unit of `base` buys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub base: Currency,
    pub rates: BTreeMap<Currency, Decimal>,
}

impl ExchangeRates {
    pub fn new(base: Currency, mut rates: BTreeMap<Currency, Decimal>) -> Self {
        rates.insert(base, Decimal::ONE);
        rates.retain(|_, rate| *rate > Decimal::ZERO);
        Self { base, rates }
    }

    /// The configured fallback table.
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config.base, config.fallback_rates.clone())
    }

    /// Units of `currency` per unit of base.
    pub fn rate(&self, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).copied()
    }

    /// Convert `amount` between currencies, rounded to cents.
    ///
    /// Returns `None` when either currency is missing from the table.
    pub fn convert(&self, amount: Decimal, from: Currency, to: Currency) -> Option<Decimal> {
        if from == to {
            return Some(amount);
        }
        let from_rate = self.rate(from)?;
        let to_rate = self.rate(to)?;
        Some((amount / from_rate * to_rate).round_dp(2))
    }

    /// Parse a provider response of the form `{"rates": {"AUD": 1.52, ...}}`.
    ///
    /// Unknown currency codes are ignored.
    pub fn from_provider_json(base: Currency, body: &str) -> Result<Self, RateError> {
        #[derive(Deserialize)]
        struct ProviderResponse {
            rates: HashMap<String, serde_json::Number>,
        }

        let response: ProviderResponse =
            serde_json::from_str(body).map_err(|e| RateError::InvalidResponse(e.to_string()))?;

        let rates: BTreeMap<Currency, Decimal> = response
            .rates
            .iter()
            .filter_map(|(code, value)| {
                let currency = Currency::from_str(code).ok()?;
                let text = value.to_string();
                let rate = Decimal::from_str(&text)
                    .or_else(|_| Decimal::from_scientific(&text))
                    .ok()?;
                Some((currency, rate))
            })
            .collect();

        if rates.is_empty() {
            return Err(RateError::InvalidResponse(
                "no known currencies in rate table".to_string(),
            ));
        }
        Ok(Self::new(base, rates))
    }
}

/// Source of fresh exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Fetch the current table quoted against `base`.
    async fn fetch(&self, base: Currency) -> Result<ExchangeRates, RateError>;
}

/// Last known rates, kept when a refresh fails.
#[derive(Debug)]
pub struct RateCache {
    current: RwLock<ExchangeRates>,
}

impl RateCache {
    pub fn new(initial: ExchangeRates) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// A copy of the current table.
    pub fn snapshot(&self) -> ExchangeRates {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Fetch new rates; on failure the previous table stays in place.
    ///
    /// Returns whether the table was replaced.
    pub async fn refresh(&self, provider: &dyn RateProvider) -> bool {
        let base = self.snapshot().base;
        match provider.fetch(base).await {
            Ok(rates) => {
                info!(base = %base, currencies = rates.rates.len(), "Exchange rates refreshed");
                *self
                    .current
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner()) = rates;
                true
            }
            Err(e) => {
                warn!(error = %e, "Exchange rate refresh failed, keeping last known rates");
                false
            }
        }
    }
}
