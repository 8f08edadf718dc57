use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::{PortalError, Result};
use crate::store::{select_entries, DocumentIndex, LoanStore, ReceiptLedger};
use crate::types::{DocumentEntry, InvestorId, LoanRecord, Receipt, ReceiptKey};

/// read a JSON array file; a missing file is an empty table
async fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// replace the file atomically via a sibling temp file
async fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, serde_json::to_vec_pretty(rows)?).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// loans read from a JSON file on every listing
#[derive(Debug, Clone)]
pub struct JsonLoanStore {
    path: PathBuf,
}

impl JsonLoanStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LoanStore for JsonLoanStore {
    async fn list_loans(&self) -> Result<Vec<LoanRecord>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            PortalError::storage(format!("cannot read loans from {}: {e}", self.path.display()))
        })?;
        let loans: Vec<LoanRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            PortalError::storage(format!("malformed loans file {}: {e}", self.path.display()))
        })?;
        debug!(count = loans.len(), path = %self.path.display(), "loaded loans");
        Ok(loans)
    }
}

/// receipts persisted to a JSON file, indexed in memory
pub struct JsonReceiptLedger {
    path: PathBuf,
    receipts: Mutex<HashMap<ReceiptKey, Receipt>>,
}

impl JsonReceiptLedger {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let rows: Vec<Receipt> = read_rows(&path).await?;
        let receipts = rows.into_iter().map(|r| (r.key(), r)).collect();
        Ok(Self {
            path,
            receipts: Mutex::new(receipts),
        })
    }
}

#[async_trait]
impl ReceiptLedger for JsonReceiptLedger {
    async fn exists(&self, key: &ReceiptKey) -> Result<bool> {
        Ok(self.receipts.lock().await.contains_key(key))
    }

    async fn get(&self, key: &ReceiptKey) -> Result<Option<Receipt>> {
        Ok(self.receipts.lock().await.get(key).cloned())
    }

    async fn insert(&self, receipt: Receipt) -> Result<()> {
        // held across the write so check, insert and persist are one step
        let mut receipts = self.receipts.lock().await;
        let key = receipt.key();
        if receipts.contains_key(&key) {
            return Err(PortalError::DuplicateReceipt {
                loan_id: key.loan_id,
                period_start: key.period_start,
            });
        }
        receipts.insert(key.clone(), receipt);

        let mut rows: Vec<&Receipt> = receipts.values().collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.loan_id.cmp(&b.loan_id)));
        let persisted = write_rows(&self.path, &rows).await;
        if let Err(e) = persisted {
            receipts.remove(&key);
            return Err(e);
        }
        Ok(())
    }
}

/// document entries persisted to a JSON file
pub struct JsonDocumentIndex {
    path: PathBuf,
    entries: Mutex<Vec<DocumentEntry>>,
}

impl JsonDocumentIndex {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = read_rows(&path).await?;
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }
}

#[async_trait]
impl DocumentIndex for JsonDocumentIndex {
    async fn insert(&self, entry: DocumentEntry) -> Result<()> {
        let mut entries = self.entries.lock().await;
        let previous = entries.clone();
        entries.retain(|e| e.storage_path != entry.storage_path);
        entries.push(entry);
        let persisted = write_rows(&self.path, entries.as_slice()).await;
        if let Err(e) = persisted {
            *entries = previous;
            return Err(e);
        }
        Ok(())
    }

    async fn contains(&self, storage_path: &str) -> Result<bool> {
        Ok(self.entries.lock().await.iter().any(|e| e.storage_path == storage_path))
    }

    async fn list(&self, investor_id: &InvestorId, year: Option<i32>) -> Result<Vec<DocumentEntry>> {
        Ok(select_entries(&self.entries.lock().await, investor_id, year))
    }
}
