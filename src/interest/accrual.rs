use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::interest::GrossReporting;
use crate::period::Period;
use crate::types::LoanTerms;

/// portion of a period during which a loan was running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveWindow {
    Active {
        start: NaiveDate,
        end: NaiveDate,
        /// inclusive on both ends
        active_days: u32,
    },
    /// loan had not started, or had already ended, within the period
    Ineligible,
}

impl ActiveWindow {
    pub fn active_days(&self) -> Option<u32> {
        match self {
            ActiveWindow::Active { active_days, .. } => Some(*active_days),
            ActiveWindow::Ineligible => None,
        }
    }
}

/// interest figures for one loan and one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestBreakdown {
    pub monthly_base: Money,
    /// unrounded
    pub gross: Money,
    pub retention_pct: Decimal,
    pub retention_amount: Money,
    pub net: Money,
    pub active_days: u32,
    pub days_in_month: u32,
}

impl InterestBreakdown {
    /// gross as persisted and displayed under the given policy
    pub fn reported_gross(&self, policy: GrossReporting) -> Money {
        match policy {
            GrossReporting::Rounded => self.gross.round_currency(),
            GrossReporting::Full => self.gross,
        }
    }
}

/// engine for monthly simple-interest accrual
#[derive(Debug, Clone, Copy, Default)]
pub struct AccrualEngine {
    pub gross_reporting: GrossReporting,
}

impl AccrualEngine {
    pub fn new(gross_reporting: GrossReporting) -> Self {
        Self { gross_reporting }
    }

    /// intersect the loan's life with the period
    pub fn active_window(&self, terms: &LoanTerms, period: &Period) -> ActiveWindow {
        let start = terms.start_date.max(period.period_start);
        let end = terms
            .end_date
            .unwrap_or(period.period_end)
            .min(period.period_end);

        if start > end {
            return ActiveWindow::Ineligible;
        }

        let active_days = (end - start).num_days() as u32 + 1;
        ActiveWindow::Active {
            start,
            end,
            active_days,
        }
    }

    /// prorated gross interest, retention and net for `active_days` of the period
    ///
    /// only retention and net are rounded; gross stays at internal precision
    pub fn compute_interest(
        &self,
        terms: &LoanTerms,
        period: &Period,
        active_days: u32,
    ) -> InterestBreakdown {
        let monthly_base = terms.principal.as_decimal() * terms.annual_rate.as_decimal()
            / Decimal::from(12);

        let gross = if active_days == period.days_in_month {
            monthly_base
        } else {
            monthly_base * Decimal::from(active_days) / Decimal::from(period.days_in_month)
        };

        let retention_amount = Money::rounded(gross * terms.retention_pct / Decimal::ONE_HUNDRED);
        let net = Money::rounded(gross - retention_amount.as_decimal());

        InterestBreakdown {
            monthly_base: Money::from_decimal(monthly_base),
            gross: Money::from_decimal(gross),
            retention_pct: terms.retention_pct,
            retention_amount,
            net,
            active_days,
            days_in_month: period.days_in_month,
        }
    }

    /// window and figures in one step; `None` when the loan is outside the period
    pub fn evaluate(&self, terms: &LoanTerms, period: &Period) -> Option<InterestBreakdown> {
        self.active_window(terms, period)
            .active_days()
            .map(|days| self.compute_interest(terms, period, days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{InvestorId, LoanId};
    use rust_decimal_macros::dec;

    fn terms(start: NaiveDate, end: Option<NaiveDate>) -> LoanTerms {
        LoanTerms {
            loan_id: LoanId::from("loan-1"),
            investor_id: InvestorId::from("inv-1"),
            principal: Money::from_major(10_000),
            annual_rate: Rate::from_decimal(dec!(0.12)),
            retention_pct: dec!(15),
            start_date: start,
            end_date: end,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_partial_month_proration() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();
        let loan = terms(date(2025, 3, 10), None);

        let window = engine.active_window(&loan, &period);
        assert_eq!(
            window,
            ActiveWindow::Active {
                start: date(2025, 3, 10),
                end: date(2025, 3, 31),
                active_days: 22,
            }
        );

        let b = engine.compute_interest(&loan, &period, 22);
        assert_eq!(b.monthly_base, Money::from_major(100));
        assert_eq!(b.gross.round_currency().as_decimal(), dec!(70.97));
        assert_eq!(b.gross.as_decimal(), dec!(70.96774194));
        assert_eq!(b.retention_amount.as_decimal(), dec!(10.65));
        assert_eq!(b.net.as_decimal(), dec!(60.32));
    }

    #[test]
    fn test_full_period_gross_equals_monthly_base() {
        let engine = AccrualEngine::default();
        for (y, m) in [(2024, 2), (2025, 2), (2025, 4), (2025, 12)] {
            let period = Period::new(y, m).unwrap();
            let mut loan = terms(date(2020, 1, 1), None);
            loan.annual_rate = Rate::from_decimal(dec!(0.07));
            let b = engine.evaluate(&loan, &period).unwrap();
            assert_eq!(b.active_days, period.days_in_month);
            assert_eq!(
                b.gross,
                Money::from_decimal(dec!(10000) * dec!(0.07) / dec!(12))
            );
        }
    }

    #[test]
    fn test_end_date_on_period_start_counts_one_day() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();
        let loan = terms(date(2024, 1, 1), Some(date(2025, 3, 1)));
        assert_eq!(engine.active_window(&loan, &period).active_days(), Some(1));
    }

    #[test]
    fn test_disjoint_windows_are_ineligible() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();

        let not_started = terms(date(2025, 4, 1), None);
        assert_eq!(engine.active_window(&not_started, &period), ActiveWindow::Ineligible);

        let ended = terms(date(2024, 1, 1), Some(date(2025, 2, 28)));
        assert_eq!(engine.active_window(&ended, &period), ActiveWindow::Ineligible);
        assert!(engine.evaluate(&ended, &period).is_none());
    }

    #[test]
    fn test_start_on_last_day() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();
        let loan = terms(date(2025, 3, 31), None);
        assert_eq!(engine.active_window(&loan, &period).active_days(), Some(1));
    }

    #[test]
    fn test_net_and_retention_rounding_relation() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 1).unwrap();
        let mut loan = terms(date(2025, 1, 17), None);
        loan.principal = Money::from_str_exact("12345.67").unwrap();
        loan.annual_rate = Rate::from_decimal(dec!(0.0875));
        loan.retention_pct = dec!(19);

        let b = engine.evaluate(&loan, &period).unwrap();
        assert_eq!(b.active_days, 15);
        let gross = dec!(12345.67) * dec!(0.0875) / dec!(12) * dec!(15) / dec!(31);
        assert_eq!(b.retention_amount, Money::rounded(gross * dec!(19) / dec!(100)));
        assert_eq!(b.net, Money::rounded(gross - b.retention_amount.as_decimal()));
        assert_eq!(
            b.net.as_decimal(),
            b.gross.round_currency().as_decimal() - b.retention_amount.as_decimal()
        );
    }

    #[test]
    fn test_reported_gross_policy() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();
        let b = engine.evaluate(&terms(date(2025, 3, 10), None), &period).unwrap();
        assert_eq!(b.reported_gross(GrossReporting::Rounded).as_decimal(), dec!(70.97));
        assert_eq!(b.reported_gross(GrossReporting::Full), b.gross);
    }

    #[test]
    fn test_zero_rate_yields_zero_interest() {
        let engine = AccrualEngine::default();
        let period = Period::new(2025, 3).unwrap();
        let mut loan = terms(date(2025, 1, 1), None);
        loan.annual_rate = Rate::ZERO;
        let b = engine.evaluate(&loan, &period).unwrap();
        assert!(b.gross.is_zero());
        assert!(b.net.is_zero());
    }
}
