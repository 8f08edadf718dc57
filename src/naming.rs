//! storage keys and display names for generated and uploaded files

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::errors::{PortalError, Result};
use crate::period::Period;
use crate::types::{DocumentCategory, InvestorId, LoanId};

const FALLBACK_NAME: &str = "file";

fn is_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// normalize a name to `[A-Za-z0-9._-]`
///
/// diacritics are stripped, whitespace runs become a single `_`, anything
/// else is dropped
pub fn normalize_file_name(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_gap = false;

    for c in input.trim().nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if !is_safe(c) {
            continue;
        }
        if pending_gap && !out.is_empty() {
            out.push('_');
        }
        pending_gap = false;
        out.push(c);
    }

    if out.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        out
    }
}

/// ensure the name carries a `.pdf` extension
pub fn with_pdf_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".pdf") {
        name.to_string()
    } else {
        format!("{name}.pdf")
    }
}

/// check a caller-supplied storage path
///
/// relative, `/`-separated, every segment non-empty, safe characters only
/// and never `.` or `..`
pub fn validate_storage_path(path: &str) -> Result<&str> {
    let invalid = || PortalError::InvalidStoragePath {
        path: path.to_string(),
    };

    if path.is_empty() || path.starts_with('/') {
        return Err(invalid());
    }
    for segment in path.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." || !segment.chars().all(is_safe) {
            return Err(invalid());
        }
    }
    Ok(path)
}

/// an identifier used verbatim as one path segment
///
/// ids are never normalised into a segment: two distinct ids must never
/// share a storage key, so an id that is not already safe is rejected
pub fn storage_segment(id: &str) -> Result<&str> {
    if id.is_empty() || id == "." || id == ".." || !id.chars().all(is_safe) {
        return Err(PortalError::InvalidStoragePath { path: id.to_string() });
    }
    Ok(id)
}

/// `{investor}/{category}/{year}/{name}`
pub fn document_storage_path(
    investor_id: &InvestorId,
    category: DocumentCategory,
    year: i32,
    file_name: &str,
) -> Result<String> {
    Ok(format!(
        "{}/{}/{}/{}",
        storage_segment(&investor_id.0)?,
        category.folder(),
        year,
        normalize_file_name(file_name)
    ))
}

/// storage key of the receipt for one loan and period
pub fn receipt_storage_path(investor_id: &InvestorId, loan_id: &LoanId, period: &Period) -> Result<String> {
    let file_name = format!("receipt_{}_{}.pdf", period.label(), storage_segment(&loan_id.0)?);
    document_storage_path(investor_id, DocumentCategory::Receipt, period.year, &file_name)
}

/// name shown to investors for a receipt
pub fn receipt_display_name(display_title: &str, period: &Period) -> String {
    format!("Receipt {} ({}).pdf", period.label(), display_title)
}
