use thiserror::Error;

use crate::types::LoanId;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid period: year {year}, month {month}")]
    InvalidPeriod {
        year: i32,
        month: u32,
    },

    #[error("invalid loan {loan_id}: {field} {reason}")]
    InvalidLoanField {
        loan_id: LoanId,
        field: &'static str,
        reason: String,
    },

    #[error("invalid storage path: {path}")]
    InvalidStoragePath {
        path: String,
    },

    #[error("invalid request: {message}")]
    InvalidRequest {
        message: String,
    },

    #[error("receipt already exists for loan {loan_id} starting {period_start}")]
    DuplicateReceipt {
        loan_id: LoanId,
        period_start: chrono::NaiveDate,
    },

    #[error("object not found: {path}")]
    ObjectNotFound {
        path: String,
    },

    #[error("invalid or expired signature for {path}")]
    InvalidSignature {
        path: String,
    },

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("render error: {message}")]
    Render {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    Configuration {
        message: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PortalError {
    pub fn storage(message: impl Into<String>) -> Self {
        PortalError::Storage {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
