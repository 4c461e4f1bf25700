//! Rates command - exchange rates used for contract tracking.

use std::time::Duration;

use async_trait::async_trait;
use clap::{Args, Subcommand};
use console::style;
use tracing::debug;

use invtrack_core::{Currency, ExchangeRates, RateError, RateProvider};

use super::Context;

/// Fetches rate tables over HTTP.
///
/// The URL may contain `{base}`, replaced with the base currency code.
pub struct HttpRateProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpRateProvider {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch(&self, base: Currency) -> Result<ExchangeRates, RateError> {
        let url = self.url.replace("{base}", base.as_str());
        debug!("Fetching exchange rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RateError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RateError::Unavailable(format!("HTTP {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RateError::InvalidResponse(e.to_string()))?;
        ExchangeRates::from_provider_json(base, &body)
    }
}

/// Arguments for the rates command.
#[derive(Args)]
pub struct RatesArgs {
    #[command(subcommand)]
    command: RatesCommand,
}

#[derive(Subcommand)]
enum RatesCommand {
    /// Show the configured fallback rates
    Show,

    /// Fetch current rates from the provider
    Refresh,
}

pub async fn run(args: RatesArgs, ctx: &Context) -> anyhow::Result<()> {
    let rates = match args.command {
        RatesCommand::Show => ExchangeRates::from_config(&ctx.config.exchange),
        RatesCommand::Refresh => {
            let provider = HttpRateProvider::new(&ctx.config.exchange.url)?;
            provider.fetch(ctx.config.exchange.base).await?
        }
    };

    println!("{} Rates per 1 {}", style("ℹ").blue(), rates.base);
    for (currency, rate) in &rates.rates {
        println!("  {} {}", currency, rate);
    }
    Ok(())
}
