use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::errors::PortalError;

impl PortalError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PortalError::Unauthorized => StatusCode::UNAUTHORIZED,
            PortalError::InvalidPeriod { .. }
            | PortalError::InvalidLoanField { .. }
            | PortalError::InvalidStoragePath { .. }
            | PortalError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            PortalError::InvalidSignature { .. } => StatusCode::FORBIDDEN,
            PortalError::ObjectNotFound { .. } => StatusCode::NOT_FOUND,
            PortalError::DuplicateReceipt { .. } => StatusCode::CONFLICT,
            PortalError::Storage { .. }
            | PortalError::Render { .. }
            | PortalError::Configuration { .. }
            | PortalError::Io(_)
            | PortalError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "ok": false, "error": self.to_string() }))).into_response()
    }
}
