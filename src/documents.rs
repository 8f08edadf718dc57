use chrono::Datelike;
use tracing::info;
use uuid::Uuid;

use crate::context::PortalContext;
use crate::errors::{PortalError, Result};
use crate::naming::{document_storage_path, normalize_file_name, with_pdf_extension};
use crate::runner::PDF_CONTENT_TYPE;
use crate::types::{DocumentCategory, DocumentEntry, InvestorId};

/// upload request for a manually published document
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub investor_id: InvestorId,
    pub category: DocumentCategory,
    /// defaults to the current year
    pub year: Option<i32>,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// store an uploaded PDF and make it visible in the investor's document list
///
/// an existing object at the same path is replaced
pub async fn publish_document(ctx: &PortalContext, upload: DocumentUpload) -> Result<DocumentEntry> {
    if upload.investor_id.0.trim().is_empty() {
        return Err(PortalError::InvalidRequest {
            message: "investor_id is required".to_string(),
        });
    }
    if !upload.bytes.starts_with(b"%PDF-") {
        return Err(PortalError::InvalidRequest {
            message: "body is not a PDF document".to_string(),
        });
    }

    let now = ctx.time.now();
    let year = upload.year.unwrap_or_else(|| now.year());
    let file_name = with_pdf_extension(&normalize_file_name(&upload.file_name));
    let storage_path = document_storage_path(&upload.investor_id, upload.category, year, &file_name)?;

    ctx.objects
        .put(&storage_path, upload.bytes, PDF_CONTENT_TYPE)
        .await?;

    let entry = DocumentEntry {
        id: Uuid::new_v4(),
        investor_id: upload.investor_id,
        category: upload.category,
        year,
        storage_path,
        display_name: file_name,
        uploaded_at: now,
    };
    ctx.documents.insert(entry.clone()).await?;

    info!(investor_id = %entry.investor_id, path = %entry.storage_path, "document published");
    Ok(entry)
}
