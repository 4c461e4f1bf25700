//! On-disk archive of ingested PDFs.

use std::path::{Path, PathBuf};

use invtrack_core::Invoice;
use invtrack_core::models::config::StorageConfig;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{InvoiceStore, StoreError};

/// Why an invoice and its file could not be removed.
#[derive(Error, Debug)]
pub enum DeleteError {
    #[error("failed to move archived file: {0}")]
    Archive(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stores uploaded files under `pdf_dir` and moves discarded ones to
/// `deleted_dir`.
#[derive(Debug, Clone)]
pub struct PdfArchive {
    pdf_dir: PathBuf,
    deleted_dir: PathBuf,
}

impl PdfArchive {
    pub fn new(pdf_dir: impl Into<PathBuf>, deleted_dir: impl Into<PathBuf>) -> Self {
        Self {
            pdf_dir: pdf_dir.into(),
            deleted_dir: deleted_dir.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.pdf_dir, &config.deleted_dir)
    }

    /// Write `bytes` under a unique name derived from `original_name`.
    pub async fn store(&self, bytes: &[u8], original_name: &str) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.pdf_dir).await?;
        let path = self
            .pdf_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), sanitize(original_name)));
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), "Archived invoice file");
        Ok(path)
    }

    /// Move an archived file into the deleted directory.
    ///
    /// A missing file is not an error; returns the new location when the
    /// file was moved.
    pub async fn discard(&self, path: &Path) -> std::io::Result<Option<PathBuf>> {
        if tokio::fs::metadata(path).await.is_err() {
            warn!(path = %path.display(), "Archived file missing, nothing to move");
            return Ok(None);
        }
        tokio::fs::create_dir_all(&self.deleted_dir).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let target = self.deleted_dir.join(name);
        tokio::fs::rename(path, &target).await?;
        Ok(Some(target))
    }

    /// Soft-delete an invoice: move its file to the deleted directory, then
    /// delete the row.
    ///
    /// If the row cannot be deleted the file is moved back. Returns the
    /// file's new location, if it had one.
    pub async fn delete_invoice(
        &self,
        store: &dyn InvoiceStore,
        invoice: &Invoice,
    ) -> Result<Option<PathBuf>, DeleteError> {
        let original = invoice.pdf_path.as_deref().map(PathBuf::from);
        let moved = match &original {
            Some(path) => self.discard(path).await?,
            None => None,
        };

        if let Err(e) = store.delete_invoice(invoice.id).await {
            if let (Some(from), Some(to)) = (&moved, &original) {
                if let Err(restore_err) = tokio::fs::rename(from, to).await {
                    warn!(path = %from.display(), error = %restore_err, "Failed to restore archived file");
                }
            }
            return Err(e.into());
        }

        info!(invoice_number = %invoice.invoice_number, "Invoice deleted");
        Ok(moved)
    }
}

/// Keep a file name safe for the archive directory.
fn sanitize(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    if cleaned.trim_matches('_').is_empty() {
        "invoice.pdf".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use crate::test_support::{invoice, ymd};
    use invtrack_core::Frequency;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("../etc/Acme Invoice #12.pdf"), "Acme_Invoice__12.pdf");
        assert_eq!(sanitize(""), "invoice.pdf");
    }

    #[tokio::test]
    async fn test_store_and_discard() {
        let dir = TempDir::new().unwrap();
        let archive = PdfArchive::new(dir.path().join("pdfs"), dir.path().join("deleted"));

        let path = archive.store(b"%PDF-1.4", "inv.pdf").await.unwrap();
        assert!(path.starts_with(dir.path().join("pdfs")));
        assert!(path.to_string_lossy().ends_with("_inv.pdf"));

        let moved = archive.discard(&path).await.unwrap().unwrap();
        assert!(moved.starts_with(dir.path().join("deleted")));
        assert!(!path.exists());
        assert!(archive.discard(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_invoice_moves_file_then_row() {
        let dir = TempDir::new().unwrap();
        let archive = PdfArchive::new(dir.path().join("pdfs"), dir.path().join("deleted"));
        let store = MemoryStore::new();

        let path = archive.store(b"%PDF-1.4", "inv.pdf").await.unwrap();
        let inv = invoice("1", "Contoso", "", ymd(2025, 1, 10), Frequency::Monthly)
            .with_pdf(path.to_string_lossy(), "inv.pdf");
        store.insert_invoice(&inv).await.unwrap();

        let moved = archive.delete_invoice(&store, &inv).await.unwrap().unwrap();
        assert!(moved.exists());
        assert!(!path.exists());
        assert!(store.get_invoice(inv.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_row_delete_restores_file() {
        let dir = TempDir::new().unwrap();
        let archive = PdfArchive::new(dir.path().join("pdfs"), dir.path().join("deleted"));
        let store = MemoryStore::new();

        let path = archive.store(b"%PDF-1.4", "inv.pdf").await.unwrap();
        let never_stored = invoice("1", "Contoso", "", ymd(2025, 1, 10), Frequency::Monthly)
            .with_pdf(path.to_string_lossy(), "inv.pdf");

        let result = archive.delete_invoice(&store, &never_stored).await;
        assert!(matches!(result, Err(DeleteError::Store(StoreError::NotFound { .. }))));
        assert!(path.exists());
    }
}
