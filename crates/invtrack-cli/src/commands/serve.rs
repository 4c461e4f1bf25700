//! Serve command - run the background sweeps until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use tracing::{info, warn};

use invtrack_core::{ExchangeRates, RateCache};
use invtrack_store::{Projector, Scheduler};

use super::Context;
use super::rates::HttpRateProvider;

/// Arguments for the serve command.
#[derive(Args)]
pub struct ServeArgs {
    /// Apply database migrations before starting
    #[arg(long)]
    migrate: bool,

    /// Do not poll the exchange rate provider
    #[arg(long)]
    no_rates: bool,
}

pub async fn run(args: ServeArgs, ctx: &Context) -> anyhow::Result<()> {
    let pg = ctx.pg_store().await?;
    if args.migrate {
        pg.migrate().await?;
    }

    let forecast = &ctx.config.forecast;
    let projector = Arc::new(Projector::new(Arc::new(pg), forecast.clone()));
    let mut scheduler = Scheduler::new(
        projector,
        Duration::from_secs(forecast.sweep_interval_secs),
        Duration::from_secs(forecast.cleanup_interval_secs),
    );

    if !args.no_rates {
        let exchange = &ctx.config.exchange;
        let cache = Arc::new(RateCache::new(ExchangeRates::from_config(exchange)));
        let provider = Arc::new(HttpRateProvider::new(&exchange.url)?);
        scheduler = scheduler.with_rate_refresh(
            cache,
            provider,
            Duration::from_secs(exchange.refresh_interval_secs),
        );
    }

    let handles = scheduler.start();
    println!(
        "{} Background jobs running, press Ctrl-C to stop",
        style("ℹ").blue()
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    scheduler.stop();

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "Background job ended abnormally");
        }
    }

    println!("{} Stopped", style("✓").green());
    Ok(())
}
