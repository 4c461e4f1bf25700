//! Contracts command - manage contract values and track how much is invoiced.

use clap::{Args, Subcommand};
use console::style;
use rust_decimal::Decimal;

use invtrack_core::{Contract, ContractProgress, Currency, ExchangeRates, RateCache};

use super::Context;
use super::invoices::parse_currency;
use super::rates::HttpRateProvider;

/// Arguments for the contracts command.
#[derive(Args)]
pub struct ContractsArgs {
    #[command(subcommand)]
    command: ContractsCommand,
}

#[derive(Subcommand)]
enum ContractsCommand {
    /// Create or update a contract
    Set {
        name: String,

        /// Total contract value
        value: Decimal,

        #[arg(long, value_parser = parse_currency, default_value = "USD")]
        currency: Currency,
    },

    /// List contracts
    List,

    /// Show how much of each contract has been invoiced
    Progress {
        /// Only this contract
        name: Option<String>,

        /// Fetch current exchange rates instead of the configured fallback
        #[arg(long)]
        live_rates: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a contract
    Delete {
        name: String,
    },
}

pub async fn run(args: ContractsArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store().await?;

    match args.command {
        ContractsCommand::Set { name, value, currency } => {
            if name.trim().is_empty() {
                anyhow::bail!("Contract name must not be empty");
            }
            let contract = store
                .upsert_contract(&Contract::new(name, value, currency))
                .await?;
            println!(
                "{} {} = {} {}",
                style("✓").green(),
                contract.name,
                contract.value,
                contract.currency
            );
        }
        ContractsCommand::List => {
            for contract in store.list_contracts().await? {
                println!("{:<30} {:>14} {}", contract.name, contract.value, contract.currency);
            }
        }
        ContractsCommand::Progress { name, live_rates, json } => {
            let contracts: Vec<Contract> = store
                .list_contracts()
                .await?
                .into_iter()
                .filter(|c| name.as_deref().is_none_or(|n| c.is_referenced_by(n)))
                .collect();
            if contracts.is_empty() {
                anyhow::bail!("No matching contracts");
            }

            let rates = load_rates(ctx, live_rates).await?;
            let invoices = store.list_invoices().await?;
            let progress: Vec<ContractProgress> = contracts
                .iter()
                .map(|c| ContractProgress::compute(c, &invoices, &rates))
                .collect();

            if json {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                for p in &progress {
                    println!(
                        "{:<30} {:>6}%  {} of {} {} invoiced, {} remaining ({} invoices)",
                        p.contract,
                        p.percent_invoiced,
                        p.invoiced,
                        p.value,
                        p.currency,
                        p.remaining,
                        p.invoice_count
                    );
                    if !p.unconverted.is_empty() {
                        println!(
                            "  {} no exchange rate for: {}",
                            style("!").yellow(),
                            p.unconverted.join(", ")
                        );
                    }
                }
            }
        }
        ContractsCommand::Delete { name } => {
            if store.delete_contract(&name).await? {
                println!("{} Deleted contract {}", style("✓").green(), name);
            } else {
                anyhow::bail!("No contract named {}", name);
            }
        }
    }

    Ok(())
}

async fn load_rates(ctx: &Context, live: bool) -> anyhow::Result<ExchangeRates> {
    let cache = RateCache::new(ExchangeRates::from_config(&ctx.config.exchange));
    if live {
        let provider = HttpRateProvider::new(&ctx.config.exchange.url)?;
        if !cache.refresh(&provider).await {
            eprintln!(
                "{} Could not fetch exchange rates, using configured fallback",
                style("!").yellow()
            );
        }
    }
    Ok(cache.snapshot())
}
