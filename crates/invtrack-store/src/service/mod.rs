//! Services built on an [`InvoiceStore`](crate::InvoiceStore).

pub mod archive;
pub mod ingest;
pub mod payments;
pub mod projector;
pub mod scheduler;

pub use archive::{DeleteError, PdfArchive};
pub use ingest::{FileOutcome, IngestError, IngestedInvoice, Ingestor};
pub use payments::{PaymentReport, apply_payments};
pub use projector::{Projector, SweepReport};
pub use scheduler::Scheduler;
