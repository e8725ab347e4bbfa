//! # Late Fees
//!
//! Pure arithmetic, no I/O. Interest accrues daily at `monthly_interest / 30`
//! and a one-off penalty applies to the principal. Each step is rounded to
//! the cent, half up, before it feeds the next one.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use wht_core::money::div_round_half_up;
use wht_core::{LateFeeConfig, Money};

/// Itemized charges on an overdue amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateFeeBreakdown {
    pub principal: Money,
    pub days_late: i64,
    pub interest: Money,
    pub penalty: Money,
    pub total: Money,
}

#[derive(Debug, Clone, Default)]
pub struct LateFeeCalculator {
    config: LateFeeConfig,
}

impl LateFeeCalculator {
    pub fn new(config: LateFeeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LateFeeConfig {
        &self.config
    }

    /// `amount × (monthly% / 100 / 30) × days_late`.
    pub fn daily_interest(&self, amount: Money, days_late: i64) -> Money {
        let numerator = i128::from(amount.cents())
            * i128::from(self.config.monthly_interest.bps())
            * i128::from(days_late);
        Money::from_cents(div_round_half_up(numerator, 10_000 * 30) as i64)
    }

    /// `amount × penalty% / 100`.
    pub fn penalty(&self, amount: Money) -> Money {
        amount.percent_rounded(self.config.penalty)
    }

    /// Principal plus interest plus penalty.
    pub fn total_overdue(&self, amount: Money, days_late: i64) -> Money {
        amount + self.daily_interest(amount, days_late) + self.penalty(amount)
    }

    /// Overdue under the configured grace period.
    pub fn is_overdue(&self, due_date: NaiveDate, today: NaiveDate) -> bool {
        is_overdue(due_date, self.config.grace_days, today)
    }

    /// Due date under the configured payment term.
    pub fn due_date(&self, issue_date: NaiveDate) -> NaiveDate {
        due_date_for(issue_date, self.config.term_days)
    }

    /// Charges on `amount` due at `due_date`, as of `today`. Days late never
    /// go below zero.
    pub fn breakdown(&self, amount: Money, due_date: NaiveDate, today: NaiveDate) -> LateFeeBreakdown {
        let days_late = days_late(due_date, today).max(0);
        let interest = self.daily_interest(amount, days_late);
        let penalty = self.penalty(amount);
        LateFeeBreakdown {
            principal: amount,
            days_late,
            interest,
            penalty,
            total: amount + interest + penalty,
        }
    }
}

/// Calendar days from `due_date` to `today` (negative before the due date).
pub fn days_late(due_date: NaiveDate, today: NaiveDate) -> i64 {
    today.signed_duration_since(due_date).num_days()
}

/// `(today - due_date) > grace_days`.
pub fn is_overdue(due_date: NaiveDate, grace_days: i64, today: NaiveDate) -> bool {
    days_late(due_date, today) > grace_days
}

/// `issue_date + term_days`.
pub fn due_date_for(issue_date: NaiveDate, term_days: i64) -> NaiveDate {
    issue_date + Duration::days(term_days)
}
