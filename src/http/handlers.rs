use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::PortalContext;
use crate::documents::{publish_document, DocumentUpload};
use crate::errors::{PortalError, Result};
use crate::http::{ADMIN_SECRET_HEADER, CRON_SECRET_HEADER};
use crate::naming::validate_storage_path;
use crate::runner::{ReceiptRunner, RunReport, SkipReason, PDF_CONTENT_TYPE};
use crate::store::signing::constant_time_eq;
use crate::types::{DocumentCategory, DocumentEntry, InvestorId, LoanId};

// ============ Response Types ============

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PeriodRef {
    pub year: i32,
    pub month: u32,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SkipRef {
    pub loan_id: LoanId,
    pub reason: SkipReason,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorRef {
    pub loan_id: LoanId,
    pub message: String,
}

/// body of a successful cron run
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub ok: bool,
    pub period: PeriodRef,
    pub created: usize,
    pub skipped: usize,
    pub skips: Vec<SkipRef>,
    pub errors: Vec<ErrorRef>,
}

impl From<&RunReport> for RunSummary {
    fn from(report: &RunReport) -> Self {
        Self {
            ok: true,
            period: PeriodRef {
                year: report.period.year,
                month: report.period.month,
            },
            created: report.created(),
            skipped: report.skipped(),
            skips: report
                .skips()
                .into_iter()
                .map(|(loan_id, reason)| SkipRef {
                    loan_id: loan_id.clone(),
                    reason,
                })
                .collect(),
            errors: report
                .errors()
                .into_iter()
                .map(|(loan_id, message)| ErrorRef {
                    loan_id: loan_id.clone(),
                    message: message.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentList {
    pub ok: bool,
    pub documents: Vec<DocumentEntry>,
}

// ============ Request Types ============

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<String>,
    pub month: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignedQuery {
    pub expires: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub investor_id: Option<String>,
    pub category: Option<String>,
    pub year: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub investor_id: Option<String>,
    pub year: Option<String>,
}

// ============ Helpers ============

/// compare a shared-secret header against the configured value
///
/// an unconfigured secret rejects every caller
pub fn authorize(headers: &HeaderMap, name: &str, expected: Option<&str>) -> Result<()> {
    let Some(expected) = expected.filter(|s| !s.is_empty()) else {
        return Err(PortalError::Unauthorized);
    };
    let provided = headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if constant_time_eq(provided.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(PortalError::Unauthorized)
    }
}

fn bad_request(message: impl Into<String>) -> PortalError {
    PortalError::InvalidRequest {
        message: message.into(),
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: Option<&str>) -> Result<Option<T>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| bad_request(format!("{name} must be a number, got {raw:?}"))),
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| bad_request(format!("{name} is required")))
}

// ============ Handlers ============

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// run the monthly accrual for the requested or preceding month
pub async fn generate_receipts(
    State(ctx): State<PortalContext>,
    headers: HeaderMap,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<RunSummary>> {
    if let Err(e) = authorize(&headers, CRON_SECRET_HEADER, ctx.config.cron_secret.as_deref()) {
        warn!("cron call rejected");
        return Err(e);
    }
    let year = parse_number("year", query.year.as_deref())?;
    let month = parse_number("month", query.month.as_deref())?;

    let report = ReceiptRunner::new(ctx).run(year, month).await?;
    Ok(Json(RunSummary::from(&report)))
}

/// redirect to a short-lived signed URL for a stored object
pub async fn download(
    State(ctx): State<PortalContext>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse> {
    let path = validate_storage_path(required("path", query.path.as_deref())?)?;
    if !ctx.objects.exists(path).await? {
        return Err(PortalError::ObjectNotFound {
            path: path.to_string(),
        });
    }

    let url = ctx
        .signer
        .signed_url(path, ctx.time.now(), ctx.config.signed_url_ttl());
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]))
}

/// serve object bytes behind a signed URL
pub async fn serve_file(
    State(ctx): State<PortalContext>,
    Path(path): Path<String>,
    Query(query): Query<SignedQuery>,
) -> Result<impl IntoResponse> {
    let path = path.trim_start_matches('/');
    let invalid = || PortalError::InvalidSignature {
        path: path.to_string(),
    };

    let expires: i64 = query
        .expires
        .as_deref()
        .and_then(|v| v.parse().ok())
        .ok_or_else(invalid)?;
    let signature = query.signature.as_deref().ok_or_else(invalid)?;
    ctx.signer.verify(path, expires, signature, ctx.time.now())?;

    let path = validate_storage_path(path)?;
    let bytes = ctx.objects.get(path).await?;
    Ok((
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    ))
}

/// publish a PDF for an investor
pub async fn upload_document(
    State(ctx): State<PortalContext>,
    headers: HeaderMap,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<DocumentEntry>)> {
    authorize(&headers, ADMIN_SECRET_HEADER, ctx.config.admin_secret.as_deref())?;

    let investor_id = required("investor_id", query.investor_id.as_deref())?;
    let category: DocumentCategory = required("category", query.category.as_deref())?
        .parse()
        .map_err(bad_request)?;
    let file_name = required("name", query.name.as_deref())?;
    let year = parse_number("year", query.year.as_deref())?;

    let entry = publish_document(
        &ctx,
        DocumentUpload {
            investor_id: InvestorId::from(investor_id),
            category,
            year,
            file_name: file_name.to_string(),
            bytes: body.to_vec(),
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// documents for one investor, newest first
pub async fn list_documents(
    State(ctx): State<PortalContext>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Json<DocumentList>> {
    authorize(&headers, ADMIN_SECRET_HEADER, ctx.config.admin_secret.as_deref())?;

    let investor_id = InvestorId::from(required("investor_id", query.investor_id.as_deref())?);
    let year = parse_number("year", query.year.as_deref())?;
    let documents = ctx.documents.list(&investor_id, year).await?;
    info!(investor_id = %investor_id, count = documents.len(), "documents listed");

    Ok(Json(DocumentList {
        ok: true,
        documents,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_authorize() {
        let mut headers = HeaderMap::new();
        headers.insert(CRON_SECRET_HEADER, HeaderValue::from_static("s3cret"));

        assert!(authorize(&headers, CRON_SECRET_HEADER, Some("s3cret")).is_ok());
        assert!(matches!(
            authorize(&headers, CRON_SECRET_HEADER, Some("other")),
            Err(PortalError::Unauthorized)
        ));
        assert!(authorize(&headers, CRON_SECRET_HEADER, None).is_err());
        assert!(authorize(&HeaderMap::new(), CRON_SECRET_HEADER, Some("s3cret")).is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<u32>("month", Some("3")).unwrap(), Some(3));
        assert_eq!(parse_number::<u32>("month", Some("")).unwrap(), None);
        assert_eq!(parse_number::<u32>("month", None).unwrap(), None);
        assert!(matches!(
            parse_number::<u32>("month", Some("march")),
            Err(PortalError::InvalidRequest { .. })
        ));
    }
}
