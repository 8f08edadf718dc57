use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::PortalContext;
use crate::decimal::Money;
use crate::errors::{PortalError, Result};
use crate::interest::{AccrualEngine, InterestBreakdown};
use crate::naming::{receipt_display_name, receipt_storage_path};
use crate::period::{resolve_period, Period};
use crate::receipt::ReceiptRequest;
use crate::types::{DocumentCategory, DocumentEntry, LoanId, LoanRecord, LoanTerms, Receipt, ReceiptKey};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// why a loan produced no receipt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Inactive,
    OutsideActiveWindow,
    AlreadyExists,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkipReason::Inactive => "inactive",
            SkipReason::OutsideActiveWindow => "outside-active-window",
            SkipReason::AlreadyExists => "already-exists",
        })
    }
}

/// result for one input loan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoanOutcome {
    Created {
        loan_id: LoanId,
        receipt_id: Uuid,
        storage_path: String,
        net_amount: Money,
    },
    Skipped {
        loan_id: LoanId,
        reason: SkipReason,
    },
    Failed {
        loan_id: LoanId,
        message: String,
    },
}

impl LoanOutcome {
    pub fn loan_id(&self) -> &LoanId {
        match self {
            LoanOutcome::Created { loan_id, .. }
            | LoanOutcome::Skipped { loan_id, .. }
            | LoanOutcome::Failed { loan_id, .. } => loan_id,
        }
    }
}

/// outcome of one accrual run, one entry per input loan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub period: Period,
    pub outcomes: Vec<LoanOutcome>,
}

impl RunReport {
    pub fn created(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, LoanOutcome::Created { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.skips().len()
    }

    pub fn skips(&self) -> Vec<(&LoanId, SkipReason)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                LoanOutcome::Skipped { loan_id, reason } => Some((loan_id, *reason)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_by_reason(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in self.skips() {
            *counts.entry(reason).or_insert(0) += 1;
        }
        counts
    }

    pub fn errors(&self) -> Vec<(&LoanId, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                LoanOutcome::Failed { loan_id, message } => Some((loan_id, message.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn outcome_for(&self, loan_id: &LoanId) -> Option<&LoanOutcome> {
        self.outcomes.iter().find(|o| o.loan_id() == loan_id)
    }
}

/// monthly accrual over every loan the loan store returns
///
/// loans are processed one after another; a failure on one loan is recorded
/// against it and the run moves on
pub struct ReceiptRunner {
    ctx: PortalContext,
    engine: AccrualEngine,
}

impl ReceiptRunner {
    pub fn new(ctx: PortalContext) -> Self {
        let engine = AccrualEngine::new(ctx.config.gross_reporting);
        Self { ctx, engine }
    }

    /// resolve the period against the context clock, then run
    pub async fn run(&self, year: Option<i32>, month: Option<u32>) -> Result<RunReport> {
        let period = resolve_period(year, month, self.ctx.time.now())?;
        self.run_monthly_accrual(&period).await
    }

    /// only a failing loan listing aborts the run
    pub async fn run_monthly_accrual(&self, period: &Period) -> Result<RunReport> {
        let loans = self.ctx.loans.list_loans().await.map_err(|e| {
            warn!(period = %period.label(), error = %e, "loan listing failed, aborting run");
            e
        })?;
        info!(period = %period.label(), loans = loans.len(), "starting accrual run");

        let mut outcomes = Vec::with_capacity(loans.len());
        for loan in &loans {
            let outcome = self.process_loan(loan, period).await;
            match &outcome {
                LoanOutcome::Created { storage_path, net_amount, .. } => {
                    info!(loan_id = %loan.id, path = %storage_path, net = %net_amount, "receipt created")
                }
                LoanOutcome::Skipped { reason, .. } => {
                    debug!(loan_id = %loan.id, %reason, "loan skipped")
                }
                LoanOutcome::Failed { message, .. } => {
                    warn!(loan_id = %loan.id, error = %message, "loan failed")
                }
            }
            outcomes.push(outcome);
        }

        let report = RunReport {
            period: *period,
            outcomes,
        };
        info!(
            period = %period.label(),
            created = report.created(),
            skipped = report.skipped(),
            errors = report.errors().len(),
            "accrual run finished"
        );
        Ok(report)
    }

    async fn process_loan(&self, loan: &LoanRecord, period: &Period) -> LoanOutcome {
        let skipped = |reason| LoanOutcome::Skipped {
            loan_id: loan.id.clone(),
            reason,
        };
        let failed = |e: PortalError| LoanOutcome::Failed {
            loan_id: loan.id.clone(),
            message: e.to_string(),
        };

        if !loan.active {
            return skipped(SkipReason::Inactive);
        }
        let terms = match loan.validate() {
            Ok(terms) => terms,
            Err(e) => return failed(e),
        };
        let Some(breakdown) = self.engine.evaluate(&terms, period) else {
            return skipped(SkipReason::OutsideActiveWindow);
        };

        match self.is_duplicate(&terms, period).await {
            Ok(true) => {
                return match self.restore_index_entry(loan, &terms, period).await {
                    Ok(_) => skipped(SkipReason::AlreadyExists),
                    Err(e) => failed(e),
                }
            }
            Ok(false) => {}
            Err(e) => return failed(e),
        }

        let request = self.receipt_request(loan, &terms, period, &breakdown);
        match self.materialize(&request).await {
            Ok(receipt) => LoanOutcome::Created {
                loan_id: loan.id.clone(),
                receipt_id: receipt.id,
                storage_path: receipt.storage_path,
                net_amount: receipt.net_amount,
            },
            // another run got there between the pre-check and the insert
            Err(PortalError::DuplicateReceipt { .. }) => skipped(SkipReason::AlreadyExists),
            Err(e) => failed(e),
        }
    }

    pub async fn is_duplicate(&self, terms: &LoanTerms, period: &Period) -> Result<bool> {
        self.ctx
            .receipts
            .exists(&ReceiptKey {
                loan_id: terms.loan_id.clone(),
                period_start: period.period_start,
                period_end: period.period_end,
            })
            .await
    }

    /// re-create the document entry of an already recorded receipt when an
    /// earlier run recorded it but failed to index it
    ///
    /// returns whether an entry was written
    async fn restore_index_entry(&self, loan: &LoanRecord, terms: &LoanTerms, period: &Period) -> Result<bool> {
        let key = ReceiptKey {
            loan_id: terms.loan_id.clone(),
            period_start: period.period_start,
            period_end: period.period_end,
        };
        let Some(receipt) = self.ctx.receipts.get(&key).await? else {
            return Ok(false);
        };
        if self.ctx.documents.contains(&receipt.storage_path).await? {
            return Ok(false);
        }

        self.ctx
            .documents
            .insert(receipt_entry(&receipt, &loan.display_title(), period))
            .await?;
        info!(loan_id = %loan.id, path = %receipt.storage_path, "restored missing document entry");
        Ok(true)
    }

    fn receipt_request(
        &self,
        loan: &LoanRecord,
        terms: &LoanTerms,
        period: &Period,
        breakdown: &InterestBreakdown,
    ) -> ReceiptRequest {
        ReceiptRequest {
            loan_id: terms.loan_id.clone(),
            investor_id: terms.investor_id.clone(),
            investor_name: loan.investor_name.clone(),
            investor_email: loan.investor_email.clone(),
            display_title: loan.display_title(),
            period: *period,
            principal: terms.principal,
            annual_rate: terms.annual_rate,
            payment_day: loan.payment_day,
            gross: breakdown.reported_gross(self.engine.gross_reporting),
            retention_pct: breakdown.retention_pct,
            retention_amount: breakdown.retention_amount,
            net: breakdown.net,
            active_days: breakdown.active_days,
            days_in_month: breakdown.days_in_month,
            currency: self.ctx.config.currency.clone(),
        }
    }

    /// render, upload, record, index
    async fn materialize(&self, request: &ReceiptRequest) -> Result<Receipt> {
        let storage_path = receipt_storage_path(&request.investor_id, &request.loan_id, &request.period)?;
        let title = format!("{} - Interest receipt", self.ctx.config.issuer_name);

        let bytes = self.ctx.renderer.render(&title, &request.lines())?;
        self.ctx
            .objects
            .put(&storage_path, bytes, PDF_CONTENT_TYPE)
            .await?;

        let now = self.ctx.time.now();
        let receipt = Receipt {
            id: Uuid::new_v4(),
            investor_id: request.investor_id.clone(),
            loan_id: request.loan_id.clone(),
            period_start: request.period_start(),
            period_end: request.period_end(),
            gross_interest: request.gross,
            retention_pct: request.retention_pct,
            retention_amount: request.retention_amount,
            net_amount: request.net,
            currency: request.currency.clone(),
            storage_path,
            created_at: now,
        };
        self.ctx.receipts.insert(receipt.clone()).await?;

        // a failure here leaves the receipt recorded; the next run restores the entry
        self.ctx
            .documents
            .insert(receipt_entry(&receipt, &request.display_title, &request.period))
            .await?;

        Ok(receipt)
    }
}

/// investor-facing entry for a recorded receipt
fn receipt_entry(receipt: &Receipt, display_title: &str, period: &Period) -> DocumentEntry {
    DocumentEntry {
        id: Uuid::new_v4(),
        investor_id: receipt.investor_id.clone(),
        category: DocumentCategory::Receipt,
        year: period.year,
        storage_path: receipt.storage_path.clone(),
        display_name: receipt_display_name(display_title, period),
        uploaded_at: receipt.created_at,
    }
}
