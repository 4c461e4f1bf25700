//! CLI application for small-business invoice tracking.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{
    Context, config, contracts, extract, forecast, ingest, invoices, migrate, payments, rates,
    serve,
};

/// Invoice tracker - extract, store and follow up on PDF invoices
#[derive(Parser)]
#[command(name = "invtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL, overrides the configured one
    #[arg(long, env = "INVTRACK_DATABASE_URL", global = true)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single invoice without storing it
    Extract(extract::ExtractArgs),

    /// Extract and store invoices
    Ingest(ingest::IngestArgs),

    /// List, show and edit stored invoices
    Invoices(invoices::InvoicesArgs),

    /// Manage contracts and their invoiced percentage
    Contracts(contracts::ContractsArgs),

    /// Manage expected invoices
    Forecast(forecast::ForecastArgs),

    /// Import payments
    Payments(payments::PaymentsArgs),

    /// Show or refresh exchange rates
    Rates(rates::RatesArgs),

    /// Run background sweeps until interrupted
    Serve(serve::ServeArgs),

    /// Apply database migrations
    Migrate,

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Config commands must work even when the config file is broken
    let ctx = || Context::load(cli.config.as_deref(), cli.database_url.clone());

    match cli.command {
        Commands::Extract(args) => extract::run(args, &ctx()?).await,
        Commands::Ingest(args) => ingest::run(args, &ctx()?).await,
        Commands::Invoices(args) => invoices::run(args, &ctx()?).await,
        Commands::Contracts(args) => contracts::run(args, &ctx()?).await,
        Commands::Forecast(args) => forecast::run(args, &ctx()?).await,
        Commands::Payments(args) => payments::run(args, &ctx()?).await,
        Commands::Rates(args) => rates::run(args, &ctx()?).await,
        Commands::Serve(args) => serve::run(args, &ctx()?).await,
        Commands::Migrate => migrate::run(&ctx()?).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
    }
}
