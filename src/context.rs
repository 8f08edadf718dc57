//! wiring of the collaborators a portal process talks to
//!
//! built once per process and handed to the runner and the HTTP layer;
//! nothing reaches collaborators through global state

use hourglass_rs::{SafeTimeProvider, TimeSource};
use std::sync::Arc;

use crate::config::PortalConfig;
use crate::errors::Result;
use crate::receipt::{PdfRenderer, ReceiptRenderer};
use crate::store::{
    DocumentIndex, FsObjectStore, JsonDocumentIndex, JsonLoanStore, JsonReceiptLedger, LoanStore,
    MemoryDocumentIndex, MemoryLoanStore, MemoryObjectStore, MemoryReceiptLedger, ObjectStore,
    ReceiptLedger, UrlSigner,
};

#[derive(Clone)]
pub struct PortalContext {
    pub config: Arc<PortalConfig>,
    pub loans: Arc<dyn LoanStore>,
    pub receipts: Arc<dyn ReceiptLedger>,
    pub documents: Arc<dyn DocumentIndex>,
    pub objects: Arc<dyn ObjectStore>,
    pub renderer: Arc<dyn ReceiptRenderer>,
    pub signer: Arc<UrlSigner>,
    pub time: SafeTimeProvider,
}

impl PortalContext {
    /// file-backed collaborators under the configured directories
    pub async fn from_config(config: PortalConfig) -> Result<Self> {
        let receipts = JsonReceiptLedger::open(config.receipts_file()).await?;
        let documents = JsonDocumentIndex::open(config.documents_file()).await?;

        Ok(Self {
            loans: Arc::new(JsonLoanStore::new(config.loans_file.clone())),
            receipts: Arc::new(receipts),
            documents: Arc::new(documents),
            objects: Arc::new(FsObjectStore::new(config.storage_dir.clone())),
            renderer: Arc::new(PdfRenderer::new()),
            signer: Arc::new(UrlSigner::new(
                config.signing_secret.clone(),
                config.public_base_url.clone(),
            )),
            time: SafeTimeProvider::new(TimeSource::System),
            config: Arc::new(config),
        })
    }

    /// in-memory collaborators, for tests and local experiments
    pub fn in_memory(config: PortalConfig, loans: Arc<MemoryLoanStore>, time: SafeTimeProvider) -> Self {
        let signer = UrlSigner::new(config.signing_secret.clone(), config.public_base_url.clone());
        Self {
            config: Arc::new(config),
            loans,
            receipts: Arc::new(MemoryReceiptLedger::new()),
            documents: Arc::new(MemoryDocumentIndex::new()),
            objects: Arc::new(MemoryObjectStore::new()),
            renderer: Arc::new(PdfRenderer::new()),
            signer: Arc::new(signer),
            time,
        }
    }

    pub fn with_receipts(mut self, receipts: Arc<dyn ReceiptLedger>) -> Self {
        self.receipts = receipts;
        self
    }

    pub fn with_documents(mut self, documents: Arc<dyn DocumentIndex>) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReceiptRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_loans(mut self, loans: Arc<dyn LoanStore>) -> Self {
        self.loans = loans;
        self
    }
}
