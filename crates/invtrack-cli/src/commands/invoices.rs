//! Invoices command - list, show, edit and delete stored invoices.

use chrono::NaiveDate;
use clap::{Args, Subcommand};
use console::style;
use rust_decimal::Decimal;
use uuid::Uuid;

use invtrack_core::{
    Currency, Frequency, Invoice, InvoicePatch, InvoiceQuery, InvoiceStatus, InvoiceType,
};
use invtrack_store::{InvoiceStore, PdfArchive};

use super::output::{OutputFormat, format_invoices};
use super::{Context, today};

/// Arguments for the invoices command.
#[derive(Args)]
pub struct InvoicesArgs {
    #[command(subcommand)]
    command: InvoicesCommand,
}

#[derive(Subcommand)]
enum InvoicesCommand {
    /// List invoices, optionally filtered by a plain-English query
    List {
        /// Filter, e.g. "unpaid managed services for contoso over 5k in 2025"
        #[arg(short, long)]
        query: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one invoice by id or invoice number
    Show {
        invoice: String,
    },

    /// Mark an invoice paid or pending
    SetStatus {
        invoice: String,

        #[arg(value_parser = parse_status)]
        status: InvoiceStatus,

        /// Payment date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Correct extracted fields
    Edit(EditArgs),

    /// Delete an invoice and move its file to the deleted directory
    Delete {
        invoice: String,
    },
}

#[derive(Args)]
struct EditArgs {
    invoice: String,

    #[arg(long)]
    number: Option<String>,

    #[arg(long)]
    client: Option<String>,

    #[arg(long = "type", value_parser = parse_type)]
    invoice_type: Option<InvoiceType>,

    #[arg(long, value_parser = parse_frequency)]
    frequency: Option<Frequency>,

    #[arg(long)]
    amount: Option<Decimal>,

    #[arg(long, value_parser = parse_currency)]
    currency: Option<Currency>,

    #[arg(long)]
    invoice_date: Option<NaiveDate>,

    #[arg(long)]
    due_date: Option<NaiveDate>,

    /// Customer contract reference
    #[arg(long)]
    contract: Option<String>,

    /// Oracle contract reference
    #[arg(long)]
    oracle_contract: Option<String>,

    #[arg(long)]
    po_number: Option<String>,
}

pub(super) fn parse_status(s: &str) -> Result<InvoiceStatus, String> {
    s.parse()
}

pub(super) fn parse_type(s: &str) -> Result<InvoiceType, String> {
    s.parse()
}

pub(super) fn parse_frequency(s: &str) -> Result<Frequency, String> {
    s.parse()
}

pub(super) fn parse_currency(s: &str) -> Result<Currency, String> {
    s.parse()
}

pub async fn run(args: InvoicesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.store().await?;

    match args.command {
        InvoicesCommand::List { query, format } => {
            let invoices = store.list_invoices().await?;
            let query = query.as_deref().map(InvoiceQuery::parse).unwrap_or_default();
            let matched = query.filter(&invoices, today());
            print!("{}", format_invoices(&matched, format)?);
            if matches!(format, OutputFormat::Text) {
                println!("{} {} invoices", style("ℹ").blue(), matched.len());
            }
        }
        InvoicesCommand::Show { invoice } => {
            let invoice = resolve(store.as_ref(), &invoice).await?;
            println!("{}", serde_json::to_string_pretty(&invoice)?);
        }
        InvoicesCommand::SetStatus { invoice, status, date } => {
            let invoice = resolve(store.as_ref(), &invoice).await?;
            let patch = InvoicePatch {
                status: Some(status),
                payment_date: match status {
                    InvoiceStatus::Paid => Some(date.unwrap_or_else(today)),
                    InvoiceStatus::Pending => None,
                },
                ..Default::default()
            };
            let updated = store.update_invoice(invoice.id, &patch).await?;
            println!(
                "{} {} is now {}",
                style("✓").green(),
                updated.invoice_number,
                updated.status
            );
        }
        InvoicesCommand::Edit(edit) => {
            let invoice = resolve(store.as_ref(), &edit.invoice).await?;
            let patch = InvoicePatch {
                invoice_number: edit.number,
                client: edit.client,
                invoice_type: edit.invoice_type,
                frequency: edit.frequency,
                amount_due: edit.amount,
                currency: edit.currency,
                invoice_date: edit.invoice_date,
                due_date: edit.due_date,
                customer_contract: edit.contract,
                oracle_contract: edit.oracle_contract,
                po_number: edit.po_number,
                ..Default::default()
            };
            if patch.is_empty() {
                anyhow::bail!("Nothing to change, pass at least one field option");
            }
            let updated = store.update_invoice(invoice.id, &patch).await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        InvoicesCommand::Delete { invoice } => {
            let invoice = resolve(store.as_ref(), &invoice).await?;
            let archive = PdfArchive::from_config(&ctx.config.storage);
            if let Some(moved) = archive.delete_invoice(store.as_ref(), &invoice).await? {
                println!("{} File moved to {}", style("ℹ").blue(), moved.display());
            }
            println!(
                "{} Deleted invoice {}",
                style("✓").green(),
                invoice.invoice_number
            );
        }
    }

    Ok(())
}

/// Find an invoice by id, or by invoice number when that is unambiguous.
async fn resolve(store: &dyn InvoiceStore, reference: &str) -> anyhow::Result<Invoice> {
    if let Ok(id) = Uuid::parse_str(reference) {
        return store
            .get_invoice(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No invoice with id {}", id));
    }

    let mut found = store.find_by_number(reference).await?;
    match found.len() {
        0 => anyhow::bail!("No invoice numbered {}", reference),
        1 => Ok(found.remove(0)),
        _ => {
            let ids: Vec<String> = found.iter().map(|i| i.id.to_string()).collect();
            anyhow::bail!(
                "Invoice number {} is ambiguous, use one of: {}",
                reference,
                ids.join(", ")
            )
        }
    }
}
