//! `bookcheck-recon`: dump record extraction and field reconciliation.
//!
//! Pure engine crate: receives a loaded spreadsheet row and dump text,
//! returns ordered per-field comparison outcomes. No CLI or file IO.

pub mod cipher;
pub mod config;
pub mod dump;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod model;
pub mod normalize;
pub mod rules;
pub mod signer;

pub use cipher::FieldCipher;
pub use config::DumpLayout;
pub use dump::extract_record;
pub use engine::Reconciler;
pub use error::{DecryptionError, ExtractionError, SignError};
pub use model::{CellValue, ComparisonOutcome, DumpRecord, OutcomeStatus, ReconReport, SheetRow};
pub use signer::{NoSigner, UrlSigner};
