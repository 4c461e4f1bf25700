//! Payments command - mark invoices paid from an exported spreadsheet.

use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use tracing::warn;

use invtrack_core::{PaymentColumns, PaymentRecord};
use invtrack_store::apply_payments;

use super::Context;

/// Arguments for the payments command.
#[derive(Args)]
pub struct PaymentsArgs {
    #[command(subcommand)]
    command: PaymentsCommand,
}

#[derive(Subcommand)]
enum PaymentsCommand {
    /// Import a CSV of invoice numbers and payment dates
    Import {
        input: PathBuf,

        /// The file has no header row; the first two columns are used
        #[arg(long)]
        no_header: bool,
    },
}

pub async fn run(args: PaymentsArgs, ctx: &Context) -> anyhow::Result<()> {
    match args.command {
        PaymentsCommand::Import { input, no_header } => {
            let (records, rejected) = read_payments(&input, no_header)?;
            for (row, reason) in &rejected {
                println!("{} row {}: {}", style("✗").red(), row, reason);
            }

            let store = ctx.store().await?;
            let report = apply_payments(store.as_ref(), &records).await?;

            for record in &report.unmatched {
                println!(
                    "{} no invoice numbered {}",
                    style("!").yellow(),
                    record.invoice_number
                );
            }
            println!(
                "{} {} invoices marked paid from {} payments ({} unmatched, {} rejected rows)",
                style("✓").green(),
                report.updated,
                records.len(),
                report.unmatched.len(),
                rejected.len()
            );
        }
    }
    Ok(())
}

/// Read payment rows, returning the good records and `(row number, reason)`
/// for the rest.
fn read_payments(
    path: &Path,
    no_header: bool,
) -> anyhow::Result<(Vec<PaymentRecord>, Vec<(usize, String)>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = reader.records();

    let columns = if no_header {
        PaymentColumns::default()
    } else {
        let header = rows
            .next()
            .transpose()?
            .ok_or_else(|| anyhow::anyhow!("{} is empty", path.display()))?;
        let cells: Vec<&str> = header.iter().collect();
        PaymentColumns::detect(&cells).ok_or_else(|| {
            anyhow::anyhow!("Could not find invoice number and payment date columns in header")
        })?
    };

    let first_row = if no_header { 1 } else { 2 };
    let mut records = Vec::new();
    let mut rejected = Vec::new();
    for (idx, row) in rows.enumerate() {
        let row_number = idx + first_row;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(row = row_number, error = %e, "Unreadable CSV row");
                rejected.push((row_number, e.to_string()));
                continue;
            }
        };
        let cells: Vec<&str> = row.iter().collect();
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        match columns.record(&cells) {
            Ok(record) => records.push(record),
            Err(e) => rejected.push((row_number, e.to_string())),
        }
    }

    Ok((records, rejected))
}
