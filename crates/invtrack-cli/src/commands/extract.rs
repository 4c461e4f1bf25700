//! Extract command - pull invoice fields from a single file without storing it.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::NaiveDate;
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use invtrack_core::InvoiceFieldExtractor;
use invtrack_core::pdf::extract_text_from_bytes;

use super::Context;
use super::output::{OutputFormat, format_extraction};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input file (PDF, or extracted text as .txt)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Date used for fallbacks instead of today (YYYY-MM-DD)
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Print the extracted text instead of fields
    #[arg(long)]
    raw_text: bool,
}

pub async fn run(args: ExtractArgs, ctx: &Context) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    info!("Extracting from file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message("Reading text...");

    let data = fs::read(&args.input)?;
    let text = match extension.as_str() {
        "txt" => String::from_utf8_lossy(&data).into_owned(),
        "pdf" => {
            let content = tokio::task::spawn_blocking(move || extract_text_from_bytes(&data)).await??;
            debug!("PDF has {} pages", content.page_count);
            if content.is_probably_scanned() {
                eprintln!(
                    "{} Very little text found, the PDF is probably scanned",
                    style("!").yellow()
                );
            }
            content.text
        }
        _ => anyhow::bail!("Unsupported file format: {}", extension),
    };
    pb.finish_and_clear();

    let output = if args.raw_text {
        text
    } else {
        let file_name = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut extractor = InvoiceFieldExtractor::from_config(&ctx.config.extraction);
        if let Some(today) = args.today {
            extractor = extractor.with_today(today);
        }
        let result = extractor.extract(&text, &file_name);
        format_extraction(&result, args.format)?
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
