use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{PortalError, Result};

/// calendar month for which interest accrues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub days_in_month: u32,
}

impl Period {
    /// build the period for a calendar month (1-12)
    pub fn new(year: i32, month: u32) -> Result<Self> {
        let period_start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(PortalError::InvalidPeriod { year, month })?;
        let period_end = period_start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or(PortalError::InvalidPeriod { year, month })?;

        Ok(Self {
            year,
            month,
            period_start,
            period_end,
            days_in_month: period_end.day(),
        })
    }

    /// the month immediately before the one containing `now` (UTC)
    pub fn preceding(now: DateTime<Utc>) -> Result<Self> {
        let today = now.date_naive();
        let (year, month) = if today.month() == 1 {
            (today.year() - 1, 12)
        } else {
            (today.year(), today.month() - 1)
        };
        Self::new(year, month)
    }

    /// `YYYY-MM`
    pub fn label(&self) -> String {
        format!("{}-{:02}", self.year, self.month)
    }
}

/// resolve the accrual period of a run
///
/// an explicit month is used only when both year and month are given;
/// otherwise the run covers the month before `now`
pub fn resolve_period(
    requested_year: Option<i32>,
    requested_month: Option<u32>,
    now: DateTime<Utc>,
) -> Result<Period> {
    match (requested_year, requested_month) {
        (Some(year), Some(month)) => {
            if !(1..=12).contains(&month) {
                return Err(PortalError::InvalidPeriod { year, month });
            }
            Period::new(year, month)
        }
        _ => Period::preceding(now),
    }
}
