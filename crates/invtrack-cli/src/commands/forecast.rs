//! Forecast command - expected invoices that have not arrived yet.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use console::style;
use uuid::Uuid;

use invtrack_store::Projector;

use super::{Context, today};

/// Arguments for the forecast command.
#[derive(Args)]
pub struct ForecastArgs {
    #[command(subcommand)]
    command: ForecastCommand,
}

#[derive(Subcommand)]
enum ForecastCommand {
    /// Create forecasts for recurring invoices that are due
    Sweep {
        /// Sweep as of this date instead of today
        #[arg(long)]
        today: Option<NaiveDate>,
    },

    /// List expected invoices
    List {
        /// List dismissed forecasts instead
        #[arg(long)]
        dismissed: bool,

        /// Print JSON
        #[arg(long)]
        json: bool,
    },

    /// Dismiss a forecast so it is not recreated
    Dismiss {
        id: Uuid,
    },

    /// Acknowledge a forecast
    Ack {
        id: Uuid,
    },

    /// Delete forecasts acknowledged long ago
    Cleanup,
}

pub async fn run(args: ForecastArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store().await?;
    let projector = Projector::new(store.clone(), ctx.config.forecast.clone());

    match args.command {
        ForecastCommand::Sweep { today: as_of } => {
            let report = projector.sweep(as_of.unwrap_or_else(today)).await?;
            println!(
                "{} {} groups due, {} new forecasts",
                style("✓").green(),
                report.planned,
                report.inserted
            );
        }
        ForecastCommand::List { dismissed: true, json } => {
            let dismissed = store.list_dismissed().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dismissed)?);
            } else {
                for d in &dismissed {
                    println!(
                        "{}  {:<30} {:<16} {:<11} dismissed {}",
                        d.expected_date, d.client, d.customer_contract, d.invoice_type, d.dismissed_date
                    );
                }
            }
        }
        ForecastCommand::List { dismissed: false, json } => {
            let expected = store.list_expected().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&expected)?);
            } else {
                let now = today();
                for e in &expected {
                    let marker = if e.acknowledged {
                        style("ack").dim()
                    } else if e.expected_date < now {
                        style("late").red()
                    } else {
                        style("due").yellow()
                    };
                    println!(
                        "{}  {}  {:<30} {:<16} {:>12} {} {:<11} {}  {}",
                        e.id,
                        e.expected_date,
                        e.client,
                        e.customer_contract,
                        e.expected_amount,
                        e.currency,
                        e.invoice_type,
                        e.frequency,
                        marker
                    );
                }
            }
        }
        ForecastCommand::Dismiss { id } => {
            let tombstone = projector.dismiss(id, today()).await?;
            println!(
                "{} Dismissed {} expected {}",
                style("✓").green(),
                tombstone.client,
                tombstone.expected_date
            );
        }
        ForecastCommand::Ack { id } => {
            let expected = projector.acknowledge(id, today()).await?;
            println!(
                "{} Acknowledged {} expected {}",
                style("✓").green(),
                expected.client,
                expected.expected_date
            );
        }
        ForecastCommand::Cleanup => {
            let removed = projector.cleanup(today()).await?;
            println!("{} Removed {} acknowledged forecasts", style("✓").green(), removed);
        }
    }

    Ok(())
}
