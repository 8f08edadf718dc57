pub mod config;
pub mod context;
pub mod decimal;
pub mod documents;
pub mod errors;
pub mod http;
pub mod interest;
pub mod naming;
pub mod period;
pub mod receipt;
pub mod runner;
pub mod store;
pub mod types;

// re-export key types
pub use config::PortalConfig;
pub use context::PortalContext;
pub use decimal::{Money, Rate};
pub use documents::{publish_document, DocumentUpload};
pub use errors::{PortalError, Result};
pub use interest::{AccrualEngine, ActiveWindow, GrossReporting, InterestBreakdown};
pub use period::{resolve_period, Period};
pub use receipt::{PdfRenderer, ReceiptRenderer};
pub use runner::{LoanOutcome, ReceiptRunner, RunReport, SkipReason};
pub use store::{DocumentIndex, LoanStore, ObjectStore, ReceiptLedger, UrlSigner};
pub use types::{
    DocumentCategory, DocumentEntry, InvestorId, LoanId, LoanRecord, LoanTerms, Receipt, ReceiptKey,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
