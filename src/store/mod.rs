//! collaborators the accrual run talks to
//!
//! each trait is a narrow request/response contract; the crate ships
//! in-memory implementations for tests and file-backed ones for the
//! standalone server

pub mod fs;
pub mod json;
pub mod memory;
pub mod signing;

use async_trait::async_trait;

use crate::errors::Result;
use crate::types::{DocumentEntry, InvestorId, LoanRecord, Receipt, ReceiptKey};

pub use fs::FsObjectStore;
pub use json::{JsonDocumentIndex, JsonLoanStore, JsonReceiptLedger};
pub use memory::{MemoryDocumentIndex, MemoryLoanStore, MemoryObjectStore, MemoryReceiptLedger};
pub use signing::UrlSigner;

/// source of loan rows
#[async_trait]
pub trait LoanStore: Send + Sync {
    /// loans that are candidates for accrual; rows may still carry `active = false`
    async fn list_loans(&self) -> Result<Vec<LoanRecord>>;
}

/// receipts keyed by `(loan, period_start, period_end)`
#[async_trait]
pub trait ReceiptLedger: Send + Sync {
    async fn exists(&self, key: &ReceiptKey) -> Result<bool>;

    async fn get(&self, key: &ReceiptKey) -> Result<Option<Receipt>>;

    /// insert only if the key is free; a taken key is
    /// `PortalError::DuplicateReceipt` and leaves the stored receipt untouched
    async fn insert(&self, receipt: Receipt) -> Result<()>;
}

/// display entries for stored files
#[async_trait]
pub trait DocumentIndex: Send + Sync {
    /// add an entry, replacing any entry with the same storage path
    async fn insert(&self, entry: DocumentEntry) -> Result<()>;

    async fn contains(&self, storage_path: &str) -> Result<bool>;

    /// entries for one investor, newest first, optionally for a single year
    async fn list(&self, investor_id: &InvestorId, year: Option<i32>) -> Result<Vec<DocumentEntry>>;
}

/// blob storage addressed by relative path
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// store bytes at `path`, replacing any previous object
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;

    async fn exists(&self, path: &str) -> Result<bool>;

    /// `PortalError::ObjectNotFound` when absent
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// newest first, then by display name for a stable order
pub(crate) fn sort_entries(entries: &mut [DocumentEntry]) {
    entries.sort_by(|a, b| {
        b.uploaded_at
            .cmp(&a.uploaded_at)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
}

pub(crate) fn select_entries(
    entries: &[DocumentEntry],
    investor_id: &InvestorId,
    year: Option<i32>,
) -> Vec<DocumentEntry> {
    let mut selected: Vec<DocumentEntry> = entries
        .iter()
        .filter(|e| &e.investor_id == investor_id)
        .filter(|e| year.map_or(true, |y| e.year == y))
        .cloned()
        .collect();
    sort_entries(&mut selected);
    selected
}
