use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use crate::errors::{PortalError, Result};
use crate::store::{select_entries, DocumentIndex, LoanStore, ObjectStore, ReceiptLedger};
use crate::types::{DocumentEntry, InvestorId, LoanRecord, Receipt, ReceiptKey};

/// loan rows held in memory
#[derive(Debug, Default)]
pub struct MemoryLoanStore {
    loans: RwLock<Vec<LoanRecord>>,
}

impl MemoryLoanStore {
    pub fn new(loans: Vec<LoanRecord>) -> Self {
        Self {
            loans: RwLock::new(loans),
        }
    }

    pub fn replace(&self, loans: Vec<LoanRecord>) {
        *self.loans.write() = loans;
    }
}

#[async_trait]
impl LoanStore for MemoryLoanStore {
    async fn list_loans(&self) -> Result<Vec<LoanRecord>> {
        Ok(self.loans.read().clone())
    }
}

#[derive(Debug, Default)]
pub struct MemoryReceiptLedger {
    receipts: Mutex<HashMap<ReceiptKey, Receipt>>,
}

impl MemoryReceiptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.receipts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all(&self) -> Vec<Receipt> {
        self.receipts.lock().values().cloned().collect()
    }
}

#[async_trait]
impl ReceiptLedger for MemoryReceiptLedger {
    async fn exists(&self, key: &ReceiptKey) -> Result<bool> {
        Ok(self.receipts.lock().contains_key(key))
    }

    async fn get(&self, key: &ReceiptKey) -> Result<Option<Receipt>> {
        Ok(self.receipts.lock().get(key).cloned())
    }

    async fn insert(&self, receipt: Receipt) -> Result<()> {
        let mut receipts = self.receipts.lock();
        let key = receipt.key();
        if receipts.contains_key(&key) {
            return Err(PortalError::DuplicateReceipt {
                loan_id: key.loan_id,
                period_start: key.period_start,
            });
        }
        receipts.insert(key, receipt);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryDocumentIndex {
    entries: Mutex<Vec<DocumentEntry>>,
}

impl MemoryDocumentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<DocumentEntry> {
        self.entries.lock().clone()
    }
}

#[async_trait]
impl DocumentIndex for MemoryDocumentIndex {
    async fn insert(&self, entry: DocumentEntry) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.retain(|e| e.storage_path != entry.storage_path);
        entries.push(entry);
        Ok(())
    }

    async fn contains(&self, storage_path: &str) -> Result<bool> {
        Ok(self.entries.lock().iter().any(|e| e.storage_path == storage_path))
    }

    async fn list(&self, investor_id: &InvestorId, year: Option<i32>) -> Result<Vec<DocumentEntry>> {
        Ok(select_entries(&self.entries.lock(), investor_id, year))
    }
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.lock().get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.objects.lock().insert(
            path.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects.lock().contains_key(path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .get(path)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| PortalError::ObjectNotFound {
                path: path.to_string(),
            })
    }
}
