//! # Engine Configuration
//!
//! [`AuditConfig`] groups the tunables of every component. All sections
//! implement `Default` with the production values and accept partial YAML or
//! JSON documents (`#[serde(default)]`), so a config file only names what it
//! overrides.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::payment::TaxType;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub retention: RetentionConfig,
    pub late_fee: LateFeeConfig,
    pub correction: CorrectionConfig,
    pub batch: BatchConfig,
    pub resolver: ResolverConfig,
}

impl AuditConfig {
    /// Check every section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.retention.validate()?;
        self.late_fee.validate()?;
        self.correction.validate()?;
        self.batch.validate()?;
        self.resolver.validate()
    }
}

/// One federal panel rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelRate {
    pub tax: TaxType,
    pub rate: Rate,
}

/// Retention thresholds and rates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Secondary activities are withheld when the amount is strictly above this.
    pub secondary_threshold: Money,
    /// The federal panel is withheld when the amount is strictly above this.
    pub federal_threshold: Money,
    /// Federal panel, in output order.
    pub federal_panel: Vec<PanelRate>,
    /// Drop a panel entry when the amount is below its type minimum.
    pub enforce_type_minimums: bool,
    pub type_minimums: BTreeMap<TaxType, Money>,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            secondary_threshold: Money::from_units(1_000),
            federal_threshold: Money::from_units(5_000),
            federal_panel: vec![
                PanelRate { tax: TaxType::Irrf, rate: Rate::from_bps(150) },
                PanelRate { tax: TaxType::Csll, rate: Rate::from_bps(100) },
                PanelRate { tax: TaxType::Cofins, rate: Rate::from_bps(300) },
                PanelRate { tax: TaxType::Pis, rate: Rate::from_bps(65) },
            ],
            enforce_type_minimums: false,
            type_minimums: BTreeMap::from([
                (TaxType::Irrf, Money::from_units(500)),
                (TaxType::Inss, Money::from_units(1_000)),
            ]),
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.secondary_threshold.is_negative() || self.federal_threshold.is_negative() {
            return Err(ValidationError::InvalidConfig(
                "retention thresholds must be non-negative".into(),
            ));
        }
        if let Some((tax, _)) = self.type_minimums.iter().find(|(_, m)| m.is_negative()) {
            return Err(ValidationError::InvalidConfig(format!(
                "minimum for {tax} must be non-negative"
            )));
        }
        Ok(())
    }

    /// Whether `tax` may be withheld on `base` under the type minimums.
    pub fn meets_minimum(&self, tax: &TaxType, base: Money) -> bool {
        if !self.enforce_type_minimums {
            return true;
        }
        self.type_minimums.get(tax).map_or(true, |min| base >= *min)
    }
}

/// Overdue interest and penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LateFeeConfig {
    /// Interest per month, prorated over 30 days.
    pub monthly_interest: Rate,
    /// One-off penalty on the principal.
    pub penalty: Rate,
    /// Days after the due date before a payment counts as overdue.
    pub grace_days: i64,
    /// Default payment term when deriving a due date.
    pub term_days: i64,
}

impl Default for LateFeeConfig {
    fn default() -> Self {
        Self {
            monthly_interest: Rate::from_bps(33),
            penalty: Rate::from_bps(200),
            grace_days: 5,
            term_days: 30,
        }
    }
}

impl LateFeeConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.grace_days < 0 || self.term_days < 0 {
            return Err(ValidationError::InvalidConfig(
                "grace_days and term_days must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Monetary correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Days per year when converting an annual rate to a daily factor.
    pub day_basis: u32,
    /// Lifetime of the cached current rate.
    pub cache_ttl_hours: i64,
    /// Timeout for a rate-source fetch.
    pub fetch_timeout_secs: u64,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            day_basis: 365,
            cache_ttl_hours: 24,
            fetch_timeout_secs: 10,
        }
    }
}

impl CorrectionConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.day_basis == 0 {
            return Err(ValidationError::InvalidConfig("day_basis must be positive".into()));
        }
        if self.cache_ttl_hours <= 0 {
            return Err(ValidationError::InvalidConfig(
                "cache_ttl_hours must be positive".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ValidationError::InvalidConfig(
                "fetch_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cache_ttl_hours)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

/// Batch audit sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Payments per batch. A batch fully settles before the next starts.
    pub batch_size: usize,
    /// Concurrent audits within one batch.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_concurrency: 5,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 || self.max_concurrency == 0 {
            return Err(ValidationError::InvalidConfig(
                "batch_size and max_concurrency must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Fiscal profile resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Upper bound on one registry lookup.
    pub lookup_timeout_secs: u64,
    /// Registry lookups allowed per UTC day. `None` disables the quota.
    pub daily_lookup_quota: Option<u32>,
    /// ISS rate for activities missing from `activity_rates`.
    pub default_activity_rate: Rate,
    /// ISS rate per activity code (digits only).
    pub activity_rates: BTreeMap<String, Rate>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lookup_timeout_secs: 10,
            daily_lookup_quota: Some(100),
            default_activity_rate: Rate::from_bps(500),
            activity_rates: BTreeMap::new(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lookup_timeout_secs == 0 {
            return Err(ValidationError::InvalidConfig(
                "lookup_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }

    /// The ISS rate for an activity code.
    pub fn rate_for(&self, code: &str) -> Rate {
        self.activity_rates
            .get(code)
            .copied()
            .unwrap_or(self.default_activity_rate)
    }
}
