//! Invoice ingestion: text extraction, field extraction, archiving,
//! persistence and forecast reconciliation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use invtrack_core::models::config::AppConfig;
use invtrack_core::pdf::extract_text_from_bytes;
use invtrack_core::{FallbackEvent, Invoice, InvoiceFieldExtractor, PdfError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::archive::PdfArchive;
use super::projector::Projector;
use crate::{InvoiceStore, StoreError};

/// Why a single file could not be ingested.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("text extraction timed out after {0}s")]
    Timeout(u64),

    #[error("text extraction task failed: {0}")]
    Task(String),

    #[error("failed to archive file: {0}")]
    Archive(std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A successfully stored invoice.
#[derive(Debug, Clone, Serialize)]
pub struct IngestedInvoice {
    pub invoice: Invoice,
    /// Fallbacks taken while extracting fields.
    pub diagnostics: Vec<FallbackEvent>,
    /// An earlier invoice with the same number, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<Uuid>,
    /// Forecasts removed because this invoice satisfied them.
    pub satisfied_forecasts: u64,
    pub processing_time_ms: u64,
}

/// Per-file result of a batch.
#[derive(Debug)]
pub struct FileOutcome {
    pub file: PathBuf,
    pub result: Result<IngestedInvoice, IngestError>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Turns invoice files into stored invoices.
pub struct Ingestor {
    store: Arc<dyn InvoiceStore>,
    projector: Projector,
    extractor: InvoiceFieldExtractor,
    archive: Option<PdfArchive>,
    pdf_timeout: Duration,
}

impl Ingestor {
    pub fn new(store: Arc<dyn InvoiceStore>, config: &AppConfig) -> Self {
        Self {
            projector: Projector::new(store.clone(), config.forecast.clone()),
            store,
            extractor: InvoiceFieldExtractor::from_config(&config.extraction),
            archive: Some(PdfArchive::from_config(&config.storage)),
            pdf_timeout: Duration::from_secs(config.extraction.pdf_timeout_secs),
        }
    }

    pub fn with_extractor(mut self, extractor: InvoiceFieldExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Skip copying files into the archive directory.
    pub fn without_archive(mut self) -> Self {
        self.archive = None;
        self
    }

    pub fn with_pdf_timeout(mut self, timeout: Duration) -> Self {
        self.pdf_timeout = timeout;
        self
    }

    /// Ingest one file from disk.
    pub async fn ingest_file(&self, path: &Path) -> Result<IngestedInvoice, IngestError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.ingest_bytes(bytes, &name).await
    }

    /// Ingest an uploaded file.
    ///
    /// Files named `*.txt` are taken as already-extracted text; anything
    /// else is read as a PDF.
    pub async fn ingest_bytes(&self, bytes: Vec<u8>, original_name: &str) -> Result<IngestedInvoice, IngestError> {
        let start = Instant::now();
        let text = self.read_text(&bytes, original_name).await?;

        let extraction = self.extractor.extract(&text, original_name);
        let mut invoice = Invoice::from_fields(extraction.fields);

        let duplicate_of = self
            .store
            .find_by_number(&invoice.invoice_number)
            .await?
            .first()
            .map(|existing| existing.id);
        if let Some(existing) = duplicate_of {
            warn!(invoice_number = %invoice.invoice_number, %existing, "Duplicate invoice number");
        }

        let mut archived = None;
        if let Some(archive) = &self.archive {
            let path = archive
                .store(&bytes, original_name)
                .await
                .map_err(IngestError::Archive)?;
            invoice = invoice.with_pdf(path.to_string_lossy(), original_name);
            archived = Some(path);
        }

        if let Err(e) = self.store.insert_invoice(&invoice).await {
            if let Some(path) = archived {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %remove_err, "Failed to remove archived file");
                }
            }
            return Err(e.into());
        }
        let satisfied_forecasts = self.projector.reconcile(&invoice).await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            file = original_name,
            invoice_number = %invoice.invoice_number,
            client = %invoice.client,
            invoice_type = %invoice.invoice_type,
            fallbacks = extraction.diagnostics.len(),
            processing_time_ms,
            "Invoice ingested"
        );

        Ok(IngestedInvoice {
            invoice,
            diagnostics: extraction.diagnostics,
            duplicate_of,
            satisfied_forecasts,
            processing_time_ms,
        })
    }

    /// Ingest files one after another; a failed file does not stop the batch.
    pub async fn ingest_batch(&self, paths: &[PathBuf]) -> Vec<FileOutcome> {
        let mut outcomes = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.ingest_file(path).await;
            if let Err(e) = &result {
                warn!(file = %path.display(), error = %e, "Skipping file");
            }
            outcomes.push(FileOutcome {
                file: path.clone(),
                result,
            });
        }
        outcomes
    }

    async fn read_text(&self, bytes: &[u8], name: &str) -> Result<String, IngestError> {
        let is_text = Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
        if is_text {
            return Ok(String::from_utf8_lossy(bytes).into_owned());
        }

        let data = bytes.to_vec();
        let task = tokio::task::spawn_blocking(move || extract_text_from_bytes(&data));
        let content = tokio::time::timeout(self.pdf_timeout, task)
            .await
            .map_err(|_| IngestError::Timeout(self.pdf_timeout.as_secs()))?
            .map_err(|e| IngestError::Task(e.to_string()))??;

        if content.is_probably_scanned() {
            warn!(file = name, pages = content.page_count, "PDF has little text, probably scanned");
        }
        debug!(file = name, chars = content.text.len(), "PDF text extracted");
        Ok(content.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::test_support::ymd;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use invtrack_core::{
        Contract, DismissedExpectedInvoice, ExpectedInvoice, Frequency, InvoicePatch,
        InvoiceType, NewExpectedInvoice,
    };
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const RECURRING: &str = "Invoice No: 4699001\nInvoice Date: 10-Jan-2025\n\
                             Customer: Contoso\nCustomer Contract: SOC-2025\n\
                             Item  Description   Extended Price\n\
                             Managed Security Monthly Service   AUD 4,000.00\n\
                             Invoice Total AUD 4,000.00\n";

    fn ingestor(store: Arc<MemoryStore>, dir: &TempDir) -> Ingestor {
        let mut config = AppConfig::default();
        config.storage.pdf_dir = dir.path().join("pdfs");
        config.storage.deleted_dir = dir.path().join("deleted");
        Ingestor::new(store, &config)
            .with_extractor(InvoiceFieldExtractor::new().with_today(ymd(2025, 6, 1)))
    }

    #[tokio::test]
    async fn test_ingest_text_file_archives_and_persists() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(store.clone(), &dir);

        let ingested = ingestor
            .ingest_bytes(RECURRING.as_bytes().to_vec(), "contoso.txt")
            .await
            .unwrap();
        assert_eq!(ingested.invoice.invoice_number, "4699001");
        assert_eq!(ingested.invoice.invoice_type, InvoiceType::Ms);
        assert_eq!(ingested.invoice.frequency, Frequency::Monthly);
        assert_eq!(ingested.duplicate_of, None);

        let archived = ingested.invoice.pdf_path.clone().unwrap();
        assert!(Path::new(&archived).exists());
        assert_eq!(ingested.invoice.pdf_original_name.as_deref(), Some("contoso.txt"));
        assert_eq!(store.list_invoices().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_number_is_stored_and_reported() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(store.clone(), &dir).without_archive();

        let first = ingestor
            .ingest_bytes(RECURRING.as_bytes().to_vec(), "a.txt")
            .await
            .unwrap();
        let second = ingestor
            .ingest_bytes(RECURRING.as_bytes().to_vec(), "b.txt")
            .await
            .unwrap();

        assert_eq!(second.duplicate_of, Some(first.invoice.id));
        assert_eq!(second.invoice.pdf_path, None);
        assert_eq!(store.list_invoices().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_ingest_satisfies_forecast() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(store.clone(), &dir).without_archive();

        ingestor
            .ingest_bytes(RECURRING.as_bytes().to_vec(), "jan.txt")
            .await
            .unwrap();
        Projector::new(store.clone(), Default::default())
            .sweep(ymd(2025, 2, 15))
            .await
            .unwrap();
        assert_eq!(store.list_expected().await.unwrap().len(), 1);

        let february = RECURRING
            .replace("4699001", "4699002")
            .replace("10-Jan-2025", "12-Feb-2025");
        let ingested = ingestor
            .ingest_bytes(february.into_bytes(), "feb.txt")
            .await
            .unwrap();
        assert_eq!(ingested.satisfied_forecasts, 1);
        assert!(store.list_expected().await.unwrap().is_empty());
    }

    /// Store whose invoice inserts always fail.
    struct RejectingStore(MemoryStore);

    #[async_trait]
    impl InvoiceStore for RejectingStore {
        async fn insert_invoice(&self, _invoice: &Invoice) -> crate::Result<()> {
            Err(StoreError::Database("connection reset".to_string()))
        }
        async fn get_invoice(&self, id: Uuid) -> crate::Result<Option<Invoice>> {
            self.0.get_invoice(id).await
        }
        async fn find_by_number(&self, number: &str) -> crate::Result<Vec<Invoice>> {
            self.0.find_by_number(number).await
        }
        async fn list_invoices(&self) -> crate::Result<Vec<Invoice>> {
            self.0.list_invoices().await
        }
        async fn update_invoice(&self, id: Uuid, patch: &InvoicePatch) -> crate::Result<Invoice> {
            self.0.update_invoice(id, patch).await
        }
        async fn delete_invoice(&self, id: Uuid) -> crate::Result<Invoice> {
            self.0.delete_invoice(id).await
        }
        async fn mark_paid(&self, number: &str, date: NaiveDate) -> crate::Result<u64> {
            self.0.mark_paid(number, date).await
        }
        async fn upsert_contract(&self, contract: &Contract) -> crate::Result<Contract> {
            self.0.upsert_contract(contract).await
        }
        async fn list_contracts(&self) -> crate::Result<Vec<Contract>> {
            self.0.list_contracts().await
        }
        async fn delete_contract(&self, name: &str) -> crate::Result<bool> {
            self.0.delete_contract(name).await
        }
        async fn list_expected(&self) -> crate::Result<Vec<ExpectedInvoice>> {
            self.0.list_expected().await
        }
        async fn insert_expected_if_absent(
            &self,
            expected: &NewExpectedInvoice,
            window_days: i64,
        ) -> crate::Result<bool> {
            self.0.insert_expected_if_absent(expected, window_days).await
        }
        async fn delete_satisfied_expected(&self, invoice: &Invoice, days: i64) -> crate::Result<u64> {
            self.0.delete_satisfied_expected(invoice, days).await
        }
        async fn dismiss_expected(&self, id: Uuid, today: NaiveDate) -> crate::Result<DismissedExpectedInvoice> {
            self.0.dismiss_expected(id, today).await
        }
        async fn acknowledge_expected(&self, id: Uuid, today: NaiveDate) -> crate::Result<ExpectedInvoice> {
            self.0.acknowledge_expected(id, today).await
        }
        async fn cleanup_acknowledged(&self, before: NaiveDate) -> crate::Result<u64> {
            self.0.cleanup_acknowledged(before).await
        }
        async fn list_dismissed(&self) -> crate::Result<Vec<DismissedExpectedInvoice>> {
            self.0.list_dismissed().await
        }
    }

    #[tokio::test]
    async fn test_failed_insert_removes_archived_file() {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.storage.pdf_dir = dir.path().join("pdfs");
        config.storage.deleted_dir = dir.path().join("deleted");
        let ingestor = Ingestor::new(Arc::new(RejectingStore(MemoryStore::new())), &config);

        let result = ingestor
            .ingest_bytes(RECURRING.as_bytes().to_vec(), "contoso.txt")
            .await;
        assert!(matches!(result, Err(IngestError::Store(StoreError::Database(_)))));

        let pdf_dir = dir.path().join("pdfs");
        let leftover = match std::fs::read_dir(&pdf_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(leftover, 0);
    }

    #[tokio::test]
    async fn test_batch_reports_failures_per_file() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let ingestor = ingestor(store.clone(), &dir).without_archive();

        let good = dir.path().join("good.txt");
        std::fs::write(&good, RECURRING).unwrap();
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").unwrap();
        let missing = dir.path().join("missing.pdf");

        let outcomes = ingestor
            .ingest_batch(&[good.clone(), broken, missing])
            .await;
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1].result, Err(IngestError::Pdf(_))));
        assert!(matches!(outcomes[2].result, Err(IngestError::Io { .. })));
        assert_eq!(store.list_invoices().await.unwrap().len(), 1);
    }
}
