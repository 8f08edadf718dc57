pub mod pdf;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::period::Period;
use crate::types::{InvestorId, LoanId};

pub use pdf::PdfRenderer;

/// one line of receipt text
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptLine {
    pub text: String,
    pub size: u8,
    /// vertical space consumed below the line, in points
    pub advance: f32,
}

impl ReceiptLine {
    pub fn body(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: 12,
            advance: 18.0,
        }
    }

    pub fn emphasis(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: 13,
            advance: 18.0,
        }
    }

    /// same line with extra space after it
    pub fn spaced(mut self) -> Self {
        self.advance = 24.0;
        self
    }
}

/// turns receipt text into document bytes
pub trait ReceiptRenderer: Send + Sync {
    fn render(&self, title: &str, lines: &[ReceiptLine]) -> Result<Vec<u8>>;
}

/// everything needed to materialize and record one receipt
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptRequest {
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub investor_name: Option<String>,
    pub investor_email: Option<String>,
    pub display_title: String,
    pub period: Period,
    pub principal: Money,
    pub annual_rate: Rate,
    pub payment_day: u8,
    /// gross as reported under the configured policy
    pub gross: Money,
    pub retention_pct: Decimal,
    pub retention_amount: Money,
    pub net: Money,
    pub active_days: u32,
    pub days_in_month: u32,
    pub currency: String,
}

impl ReceiptRequest {
    pub fn period_start(&self) -> NaiveDate {
        self.period.period_start
    }

    pub fn period_end(&self) -> NaiveDate {
        self.period.period_end
    }

    /// body text of the receipt document
    pub fn lines(&self) -> Vec<ReceiptLine> {
        let investor = match (&self.investor_name, &self.investor_email) {
            (Some(name), Some(email)) => format!("{name} <{email}>"),
            (Some(name), None) => name.clone(),
            (None, Some(email)) => format!("<{email}>"),
            (None, None) => self.investor_id.to_string(),
        };
        let cur = &self.currency;

        vec![
            ReceiptLine::body(format!("Investor: {investor}")),
            ReceiptLine::body(format!("Loan: {}", self.display_title)),
            ReceiptLine::body(format!(
                "Period: {:02}/{} ({} to {})",
                self.period.month,
                self.period.year,
                self.period.period_start,
                self.period.period_end
            )),
            ReceiptLine::body(format!(
                "Principal: {} {cur} - annual rate: {}",
                self.principal.to_fixed(),
                self.annual_rate
            )),
            ReceiptLine::body(format!(
                "Days in period: {}/{}",
                self.active_days, self.days_in_month
            ))
            .spaced(),
            ReceiptLine::emphasis(format!("Gross interest: {} {cur}", self.gross.to_fixed())),
            ReceiptLine::emphasis(format!(
                "Retention ({:.2} %): -{} {cur}",
                self.retention_pct,
                self.retention_amount.to_fixed()
            )),
            ReceiptLine::emphasis(format!("Net amount payable: {} {cur}", self.net.to_fixed()))
                .spaced(),
            ReceiptLine::body(format!(
                "Expected payment date: day {} of the month",
                self.payment_day
            )),
            ReceiptLine::body("Document generated automatically."),
        ]
    }
}
