//! Ingest command - extract and store a batch of invoice files.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use invtrack_core::InvoiceFieldExtractor;
use invtrack_store::{FileOutcome, Ingestor, InvoiceStore, MemoryStore};

use super::Context;

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Input files or glob patterns
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Extract without writing to the database or archive
    #[arg(long)]
    dry_run: bool,

    /// Do not copy files into the archive directory
    #[arg(long)]
    no_archive: bool,

    /// Write a summary CSV of every file
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Date used for fallbacks instead of today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<chrono::NaiveDate>,
}

pub async fn run(args: IngestArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();

    let files = expand_inputs(&args.inputs)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    println!(
        "{} Found {} files to ingest",
        style("ℹ").blue(),
        files.len()
    );

    let store: Arc<dyn InvoiceStore> = if args.dry_run {
        Arc::new(MemoryStore::new())
    } else {
        ctx.store().await?
    };

    let mut extractor = InvoiceFieldExtractor::from_config(&ctx.config.extraction);
    if let Some(today) = args.today {
        extractor = extractor.with_today(today);
    }
    let mut ingestor = Ingestor::new(store, &ctx.config).with_extractor(extractor);
    if args.dry_run || args.no_archive {
        ingestor = ingestor.without_archive();
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut outcomes = Vec::with_capacity(files.len());
    for file in &files {
        let mut batch = ingestor.ingest_batch(std::slice::from_ref(file)).await;
        outcomes.append(&mut batch);
        pb.inc(1);
    }
    pb.finish_and_clear();

    for outcome in &outcomes {
        print_outcome(outcome);
    }

    if let Some(summary_path) = &args.summary {
        write_summary(summary_path, &outcomes)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    println!();
    println!(
        "{} Ingested {} of {} files in {:?}{}",
        style("✓").green(),
        outcomes.len() - failed,
        outcomes.len(),
        start.elapsed(),
        if args.dry_run { " (dry run, nothing stored)" } else { "" }
    );

    if failed == outcomes.len() {
        anyhow::bail!("No file could be ingested");
    }
    Ok(())
}

fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        let path = Path::new(input);
        if path.is_file() {
            files.push(path.to_path_buf());
            continue;
        }
        files.extend(glob(input)?.filter_map(|r| r.ok()).filter(|p| is_supported(p)));
    }
    files.sort();
    files.dedup();
    debug!("Expanded inputs to {} files", files.len());
    Ok(files)
}

fn is_supported(path: &Path) -> bool {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    matches!(ext.to_lowercase().as_str(), "pdf" | "txt")
}

fn print_outcome(outcome: &FileOutcome) {
    let name = outcome.file.display();
    match &outcome.result {
        Ok(ingested) => {
            let invoice = &ingested.invoice;
            println!(
                "{} {}: {} {} {} {} [{} {}]",
                style("✓").green(),
                name,
                invoice.invoice_number,
                invoice.client,
                invoice.amount_due,
                invoice.currency,
                invoice.invoice_type,
                invoice.frequency,
            );
            if ingested.duplicate_of.is_some() {
                println!("  {} duplicate invoice number", style("!").yellow());
            }
            for event in &ingested.diagnostics {
                println!(
                    "  {} {} fell back to {:?}",
                    style("ℹ").blue(),
                    event.field,
                    event.fallback
                );
            }
        }
        Err(e) => println!("{} {}: {}", style("✗").red(), name, e),
    }
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "file",
        "status",
        "invoice_number",
        "client",
        "invoice_date",
        "amount_due",
        "currency",
        "invoice_type",
        "frequency",
        "fallbacks",
        "duplicate",
        "error",
    ])?;

    for outcome in outcomes {
        let file = outcome.file.display().to_string();
        match &outcome.result {
            Ok(ingested) => {
                let invoice = &ingested.invoice;
                let fallbacks: Vec<String> =
                    ingested.diagnostics.iter().map(|d| d.field.to_string()).collect();
                wtr.write_record([
                    file,
                    "success".to_string(),
                    invoice.invoice_number.clone(),
                    invoice.client.clone(),
                    invoice.invoice_date.to_string(),
                    invoice.amount_due.to_string(),
                    invoice.currency.to_string(),
                    invoice.invoice_type.to_string(),
                    invoice.frequency.to_string(),
                    fallbacks.join(";"),
                    ingested.duplicate_of.is_some().to_string(),
                    String::new(),
                ])?;
            }
            Err(e) => {
                let mut record = vec![file, "error".to_string()];
                record.extend(std::iter::repeat_n(String::new(), 9));
                record.push(e.to_string());
                wtr.write_record(&record)?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
