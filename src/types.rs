use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{PortalError, Result};
use crate::naming::storage_segment;

/// opaque loan identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoanId(pub String);

/// opaque investor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvestorId(pub String);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for InvestorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LoanId {
    fn from(s: &str) -> Self {
        LoanId(s.to_string())
    }
}

impl From<&str> for InvestorId {
    fn from(s: &str) -> Self {
        InvestorId(s.to_string())
    }
}

/// numeric column as stored upstream
///
/// a value that does not parse is kept verbatim so the row can still be
/// listed and fail on its own during validation
#[derive(Debug, Clone, PartialEq)]
pub enum NumericField<T> {
    Parsed(T),
    Malformed(String),
}

impl<T> From<T> for NumericField<T> {
    fn from(value: T) -> Self {
        NumericField::Parsed(value)
    }
}

impl<T: Serialize> Serialize for NumericField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            NumericField::Parsed(value) => value.serialize(serializer),
            NumericField::Malformed(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for NumericField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(match serde_json::from_value::<T>(raw.clone()) {
            Ok(value) => NumericField::Parsed(value),
            Err(_) => NumericField::Malformed(match raw {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            }),
        })
    }
}

/// loan row as read from the loan store
///
/// numeric columns are nullable and unchecked upstream, so they stay raw
/// until [`LoanRecord::validate`] turns the row into [`LoanTerms`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRecord {
    pub id: LoanId,
    pub investor_id: InvestorId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub principal: Option<NumericField<Money>>,
    #[serde(default)]
    pub annual_rate: Option<NumericField<Rate>>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// display only
    #[serde(default = "default_payment_day")]
    pub payment_day: u8,
    #[serde(default)]
    pub retention_pct: Option<NumericField<Decimal>>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub investor_name: Option<String>,
    #[serde(default)]
    pub investor_email: Option<String>,
}

fn default_payment_day() -> u8 {
    1
}

impl LoanRecord {
    /// check the numeric fields and produce the terms the engine works on
    ///
    /// retention is not range checked; out-of-range values are a data bug
    /// upstream, not a runtime fault
    pub fn validate(&self) -> Result<LoanTerms> {
        storage_segment(&self.id.0).map_err(|_| self.invalid("id", "is not usable as a storage key"))?;
        storage_segment(&self.investor_id.0)
            .map_err(|_| self.invalid("investor_id", "is not usable as a storage key"))?;

        let principal = self.numeric("principal", &self.principal)?;
        if principal.is_negative() {
            return Err(self.invalid("principal", format!("is negative ({principal})")));
        }

        let annual_rate = self.numeric("annual_rate", &self.annual_rate)?;
        if annual_rate.is_negative() {
            return Err(self.invalid("annual_rate", format!("is negative ({})", annual_rate.as_decimal())));
        }

        let retention_pct = self.numeric("retention_pct", &self.retention_pct)?;

        Ok(LoanTerms {
            loan_id: self.id.clone(),
            investor_id: self.investor_id.clone(),
            principal,
            annual_rate,
            retention_pct,
            start_date: self.start_date,
            end_date: self.end_date,
        })
    }

    /// title shown on receipts, falling back to the loan id
    pub fn display_title(&self) -> String {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => self.id.to_string(),
        }
    }

    fn numeric<T: Copy>(&self, field: &'static str, value: &Option<NumericField<T>>) -> Result<T> {
        match value {
            Some(NumericField::Parsed(v)) => Ok(*v),
            Some(NumericField::Malformed(raw)) => Err(self.invalid(field, format!("is not a number ({raw:?})"))),
            None => Err(self.invalid(field, "is missing")),
        }
    }

    fn invalid(&self, field: &'static str, reason: impl Into<String>) -> PortalError {
        PortalError::InvalidLoanField {
            loan_id: self.id.clone(),
            field,
            reason: reason.into(),
        }
    }
}

/// validated loan terms
#[derive(Debug, Clone, PartialEq)]
pub struct LoanTerms {
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub principal: Money,
    pub annual_rate: Rate,
    pub retention_pct: Decimal,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// idempotency key of a receipt
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptKey {
    pub loan_id: LoanId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// interest receipt, immutable once recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: Uuid,
    pub investor_id: InvestorId,
    pub loan_id: LoanId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub gross_interest: Money,
    pub retention_pct: Decimal,
    pub retention_amount: Money,
    pub net_amount: Money,
    pub currency: String,
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}

impl Receipt {
    pub fn key(&self) -> ReceiptKey {
        ReceiptKey {
            loan_id: self.loan_id.clone(),
            period_start: self.period_start,
            period_end: self.period_end,
        }
    }
}

/// document categories shown to investors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Receipt,
    AnnualSummary,
    Contract,
}

impl DocumentCategory {
    /// storage folder segment
    pub fn folder(&self) -> &'static str {
        match self {
            DocumentCategory::Receipt => "receipts",
            DocumentCategory::AnnualSummary => "annual_summaries",
            DocumentCategory::Contract => "contracts",
        }
    }
}

impl std::str::FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "receipt" | "receipts" => Ok(DocumentCategory::Receipt),
            "annual_summary" | "annual_summaries" => Ok(DocumentCategory::AnnualSummary),
            "contract" | "contracts" => Ok(DocumentCategory::Contract),
            other => Err(format!("unknown document category: {other}")),
        }
    }
}

/// display entry pointing at a stored file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEntry {
    pub id: Uuid,
    pub investor_id: InvestorId,
    pub category: DocumentCategory,
    pub year: i32,
    pub storage_path: String,
    pub display_name: String,
    pub uploaded_at: DateTime<Utc>,
}
