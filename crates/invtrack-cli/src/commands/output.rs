//! Rendering of invoices and extraction results.

use invtrack_core::{ExtractionResult, Invoice, InvoiceFields};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

const FIELD_HEADER: [&str; 11] = [
    "invoice_number",
    "client",
    "invoice_date",
    "due_date",
    "amount_due",
    "currency",
    "invoice_type",
    "frequency",
    "customer_contract",
    "po_number",
    "services",
];

fn field_record(fields: &InvoiceFields) -> [String; 11] {
    [
        fields.invoice_number.clone(),
        fields.client.clone(),
        fields.invoice_date.to_string(),
        fields.due_date.to_string(),
        fields.amount_due.to_string(),
        fields.currency.to_string(),
        fields.invoice_type.to_string(),
        fields.frequency.to_string(),
        fields.customer_contract.clone(),
        fields.po_number.clone(),
        fields.services.clone(),
    ]
}

pub fn format_extraction(result: &ExtractionResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            wtr.write_record(FIELD_HEADER)?;
            wtr.write_record(field_record(&result.fields))?;
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            let f = &result.fields;
            let mut output = String::new();
            output.push_str(&format!("Invoice:   {}\n", f.invoice_number));
            output.push_str(&format!("Client:    {}\n", f.client));
            output.push_str(&format!("Date:      {}\n", f.invoice_date));
            output.push_str(&format!("Due:       {}\n", f.due_date));
            output.push_str(&format!("Amount:    {} {}\n", f.amount_due, f.currency));
            output.push_str(&format!("Type:      {}\n", f.invoice_type));
            output.push_str(&format!("Frequency: {}\n", f.frequency));
            if !f.customer_contract.is_empty() {
                output.push_str(&format!("Contract:  {}\n", f.customer_contract));
            }
            if !f.po_number.is_empty() {
                output.push_str(&format!("PO:        {}\n", f.po_number));
            }
            output.push_str(&format!("Services:  {}\n", f.services));
            for event in &result.diagnostics {
                output.push_str(&format!(
                    "Fallback:  {} = {:?} ({})\n",
                    event.field, event.fallback, event.reason
                ));
            }
            Ok(output)
        }
    }
}

pub fn format_invoices(invoices: &[&Invoice], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoices)?),
        OutputFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(vec![]);
            let mut header = vec!["id"];
            header.extend(FIELD_HEADER);
            header.extend(["status", "payment_date"]);
            wtr.write_record(&header)?;
            for invoice in invoices {
                let mut record = vec![invoice.id.to_string()];
                record.extend(field_record(&fields_of(invoice)));
                record.push(invoice.status.to_string());
                record.push(invoice.payment_date.map(|d| d.to_string()).unwrap_or_default());
                wtr.write_record(&record)?;
            }
            Ok(String::from_utf8(wtr.into_inner()?)?)
        }
        OutputFormat::Text => {
            let mut output = String::new();
            for invoice in invoices {
                output.push_str(&format!(
                    "{}  {:<12} {:<30} {:>12} {} {:<11} {:<10} {}\n",
                    invoice.invoice_date,
                    truncate(&invoice.invoice_number, 12),
                    truncate(&invoice.client, 30),
                    invoice.amount_due,
                    invoice.currency,
                    invoice.invoice_type,
                    invoice.frequency,
                    invoice.status,
                ));
            }
            Ok(output)
        }
    }
}

fn fields_of(invoice: &Invoice) -> InvoiceFields {
    InvoiceFields {
        invoice_number: invoice.invoice_number.clone(),
        client: invoice.client.clone(),
        currency: invoice.currency,
        invoice_date: invoice.invoice_date,
        due_date: invoice.due_date,
        amount_due: invoice.amount_due,
        customer_contract: invoice.customer_contract.clone(),
        po_number: invoice.po_number.clone(),
        services: invoice.services.clone(),
        invoice_type: invoice.invoice_type,
        frequency: invoice.frequency,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
