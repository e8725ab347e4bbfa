//! # Audit Records, Periods, Filters and Reports

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AuditError, ValidationError};
use crate::identity::{ClientId, PaymentId, SupplierId};
use crate::money::Money;
use crate::payment::{Payment, PaymentStatus, RetentionEntry, TaxType};

// ---------------------------------------------------------------------------
// Classification and audit record
// ---------------------------------------------------------------------------

/// Outcome of comparing computed and recorded retentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classification {
    Correct,
    /// `delta = computed - recorded`. Positive means under-withheld.
    Discrepancy { delta: Money },
}

impl Classification {
    /// Compare two retention sets tax by tax, exact to the cent.
    ///
    /// The sets agree only when every tax type carries the same amount on
    /// both sides. Otherwise the delta is the difference of the totals, which
    /// is zero when the right amount was withheld under the wrong tax.
    pub fn compare(computed: &[RetentionEntry], recorded: &[RetentionEntry]) -> Self {
        if amounts_by_type(computed) == amounts_by_type(recorded) {
            return Self::Correct;
        }
        let computed_total: Money = computed.iter().map(|r| r.amount).sum();
        let recorded_total: Money = recorded.iter().map(|r| r.amount).sum();
        Self::Discrepancy {
            delta: computed_total - recorded_total,
        }
    }

    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Sum retention amounts per tax type. Zero amounts are left out, so a
/// zero entry and a missing one compare equal.
pub fn amounts_by_type(entries: &[RetentionEntry]) -> BTreeMap<TaxType, Money> {
    let mut totals = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.amount != Money::ZERO) {
        *totals.entry(entry.tax.clone()).or_insert(Money::ZERO) += entry.amount;
    }
    totals
}

/// The authoritative result of auditing one payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub payment_id: PaymentId,
    /// Gross amount the retentions were computed on.
    pub original_amount: Money,
    pub computed_retentions: Vec<RetentionEntry>,
    pub computed_by_type: BTreeMap<TaxType, Money>,
    pub computed_net: Money,
    /// Retention total recorded on the payment before this pass.
    pub recorded_total: Money,
    /// Recorded amounts per tax type before this pass.
    #[serde(default)]
    pub recorded_by_type: BTreeMap<TaxType, Money>,
    pub classification: Classification,
    pub audited_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Build the record for `payment` (as it stood before the audit) and the
    /// freshly computed retention set.
    pub fn build(payment: &Payment, computed: Vec<RetentionEntry>, now: DateTime<Utc>) -> Self {
        let computed_total: Money = computed.iter().map(|r| r.amount).sum();

        Self {
            payment_id: payment.id,
            original_amount: payment.gross,
            computed_by_type: amounts_by_type(&computed),
            computed_net: payment.gross - computed_total,
            recorded_total: payment.total_retained(),
            recorded_by_type: amounts_by_type(&payment.retentions),
            classification: Classification::compare(&computed, &payment.retentions),
            computed_retentions: computed,
            audited_at: now,
        }
    }

    /// Total of the computed retention set.
    pub fn computed_total(&self) -> Money {
        self.computed_retentions.iter().map(|r| r.amount).sum()
    }
}

// ---------------------------------------------------------------------------
// Periods and filters
// ---------------------------------------------------------------------------

/// Inclusive date range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct AuditPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct RawPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawPeriod> for AuditPeriod {
    type Error = ValidationError;

    fn try_from(raw: RawPeriod) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl AuditPeriod {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPeriod`] when `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidPeriod {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The calendar month containing `year`/`month`.
    pub fn month(year: i32, month: u32) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidPeriod {
            start: format!("{year}-{month:02}"),
            end: format!("{year}-{month:02}"),
        };
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;
        let end = next.pred_opt().ok_or_else(invalid)?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the period is exactly one calendar month.
    pub fn is_single_month(&self) -> bool {
        self.start.day() == 1
            && self.start.year() == self.end.year()
            && self.start.month() == self.end.month()
            && self.end.succ_opt().map_or(false, |d| d.day() == 1)
    }
}

impl std::fmt::Display for AuditPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Criteria for selecting payments from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFilter {
    pub client_id: Option<ClientId>,
    pub supplier_id: Option<SupplierId>,
    pub status: Option<PaymentStatus>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl PaymentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Payments of `client` due within `period`.
    pub fn for_client_period(client: ClientId, period: &AuditPeriod) -> Self {
        Self {
            client_id: Some(client),
            due_from: Some(period.start),
            due_to: Some(period.end),
            ..Self::default()
        }
    }

    pub fn client(mut self, client: ClientId) -> Self {
        self.client_id = Some(client);
        self
    }

    pub fn supplier(mut self, supplier: SupplierId) -> Self {
        self.supplier_id = Some(supplier);
        self
    }

    pub fn status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn due_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.due_from = Some(from);
        self.due_to = Some(to);
        self
    }

    /// Reject inconsistent filters. Stores call this once before scanning.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(from), Some(to)) = (self.due_from, self.due_to) {
            if from > to {
                return Err(ValidationError::InvalidFilter(format!(
                    "due_from {from} is after due_to {to}"
                )));
            }
        }
        Ok(())
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        self.client_id.map_or(true, |c| payment.client_id == c)
            && self
                .supplier_id
                .as_ref()
                .map_or(true, |s| &payment.supplier_id == s)
            && self.status.map_or(true, |s| payment.status == s)
            && self.due_from.map_or(true, |d| payment.due_date >= d)
            && self.due_to.map_or(true, |d| payment.due_date <= d)
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// A payment whose audit failed, with the error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedAudit {
    pub payment_id: PaymentId,
    pub code: String,
    pub message: String,
}

impl FailedAudit {
    pub fn from_error(payment_id: PaymentId, err: &AuditError) -> Self {
        Self {
            payment_id,
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Aggregate view of a client's payments over a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub client_id: ClientId,
    pub period: AuditPeriod,
    pub payment_count: usize,
    pub total_gross: Money,
    pub total_net: Money,
    pub total_retained: Money,
    /// Audited with classification `correct`.
    pub succeeded: Vec<PaymentId>,
    /// Audited with classification `discrepancy`.
    pub discrepant: Vec<PaymentId>,
    pub failed: Vec<FailedAudit>,
    pub retained_by_type: BTreeMap<TaxType, Money>,
    pub payments_by_status: BTreeMap<PaymentStatus, usize>,
}

impl AuditReport {
    /// Totals and breakdowns over `payments`. Outcome lists start empty.
    pub fn from_payments(client_id: ClientId, period: AuditPeriod, payments: &[Payment]) -> Self {
        let mut retained_by_type = BTreeMap::new();
        let mut payments_by_status = BTreeMap::new();
        let mut total_gross = Money::ZERO;
        let mut total_retained = Money::ZERO;

        for p in payments {
            total_gross += p.gross;
            total_retained += p.total_retained();
            *payments_by_status.entry(p.status).or_insert(0) += 1;
            for r in &p.retentions {
                *retained_by_type.entry(r.tax.clone()).or_insert(Money::ZERO) += r.amount;
            }
        }

        Self {
            client_id,
            period,
            payment_count: payments.len(),
            total_gross,
            total_net: total_gross - total_retained,
            total_retained,
            succeeded: Vec::new(),
            discrepant: Vec::new(),
            failed: Vec::new(),
            retained_by_type,
            payments_by_status,
        }
    }

    /// Number of payments the audit pass attempted.
    pub fn attempted(&self) -> usize {
        self.succeeded.len() + self.discrepant.len() + self.failed.len()
    }
}
