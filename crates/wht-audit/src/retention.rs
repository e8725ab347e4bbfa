//! # Retention Computation
//!
//! Pure function of a base amount and a fiscal profile:
//!
//! | Amount | Entries |
//! |--------|---------|
//! | any | `ISS` at the primary activity rate, when that rate is above zero |
//! | `> secondary_threshold` (1000.00) | one `ISS-<code>` per secondary activity with a positive rate, in profile order |
//! | `> federal_threshold` (5000.00) | the federal panel: IRRF 1.5%, CSLL 1%, COFINS 3%, PIS 0.65% |
//!
//! Both thresholds are strict and apply to the whole payment. Every amount is
//! `base × rate / 100`, truncated to the cent.

use std::collections::HashMap;

use parking_lot::RwLock;
use wht_core::{FiscalProfile, Money, RetentionConfig, RetentionEntry, SupplierId, TaxType};

#[derive(Debug, Clone, Default)]
pub struct RetentionCalculator {
    config: RetentionConfig,
}

impl RetentionCalculator {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// The primary-activity ISS entry alone, if its rate is positive.
    pub fn base_retention(&self, base: Money, profile: &FiscalProfile) -> Option<RetentionEntry> {
        let primary = &profile.primary_activity;
        primary
            .rate
            .is_positive()
            .then(|| RetentionEntry::compute(TaxType::Iss, primary.rate, base))
    }

    /// Every retention that applies to `base` for this supplier.
    pub fn compute_retentions(&self, base: Money, profile: &FiscalProfile) -> Vec<RetentionEntry> {
        let mut entries: Vec<RetentionEntry> = self.base_retention(base, profile).into_iter().collect();

        if base > self.config.secondary_threshold {
            entries.extend(profile.taxable_secondary().map(|activity| {
                RetentionEntry::compute(
                    TaxType::SecondaryIss(activity.code.clone()),
                    activity.rate,
                    base,
                )
            }));
        }

        if base > self.config.federal_threshold {
            entries.extend(
                self.config
                    .federal_panel
                    .iter()
                    .filter(|panel| panel.rate.is_positive())
                    .filter(|panel| self.config.meets_minimum(&panel.tax, base))
                    .map(|panel| RetentionEntry::compute(panel.tax.clone(), panel.rate, base)),
            );
        }

        entries
    }
}

/// [`RetentionCalculator`] with results memoized per `(amount, supplier)`.
///
/// Meant to live for one batch run; [`clear`](Self::clear) drops every entry
/// when a profile may have changed.
#[derive(Debug, Default)]
pub struct MemoizedRetentions {
    calculator: RetentionCalculator,
    memo: RwLock<HashMap<(Money, SupplierId), Vec<RetentionEntry>>>,
}

impl MemoizedRetentions {
    pub fn new(calculator: RetentionCalculator) -> Self {
        Self {
            calculator,
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn compute(&self, base: Money, profile: &FiscalProfile) -> Vec<RetentionEntry> {
        let key = (base, profile.supplier_id.clone());
        if let Some(hit) = self.memo.read().get(&key) {
            return hit.clone();
        }
        let computed = self.calculator.compute_retentions(base, profile);
        self.memo.write().insert(key, computed.clone());
        computed
    }

    pub fn clear(&self) {
        self.memo.write().clear();
    }

    pub fn len(&self) -> usize {
        self.memo.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
