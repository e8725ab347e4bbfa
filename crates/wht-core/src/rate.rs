//! # Benchmark Rate Samples
//!
//! The benchmark series publishes one annualized percent per business day.
//! Samples are kept with their published precision as `f64`; they only feed
//! the compounding in the correction engine, whose result is rounded back to
//! [`Money`](crate::Money).

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One published value of the benchmark series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSample")]
pub struct BenchmarkRateSample {
    pub date: NaiveDate,
    /// Annual rate in percent (`12.0` is 12% a year).
    pub rate_percent: f64,
}

#[derive(Deserialize)]
struct RawSample {
    date: NaiveDate,
    rate_percent: f64,
}

impl TryFrom<RawSample> for BenchmarkRateSample {
    type Error = ValidationError;

    fn try_from(raw: RawSample) -> Result<Self, Self::Error> {
        Self::new(raw.date, raw.rate_percent)
    }
}

impl BenchmarkRateSample {
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRate`] for negative or non-finite rates.
    pub fn new(date: NaiveDate, rate_percent: f64) -> Result<Self, ValidationError> {
        if !rate_percent.is_finite() || rate_percent < 0.0 {
            return Err(ValidationError::InvalidRate(rate_percent.to_string()));
        }
        Ok(Self { date, rate_percent })
    }

    /// Daily compounding factor `(1 + r/100)^(1/basis) - 1`.
    pub fn daily_factor(&self, day_basis: u32) -> f64 {
        (1.0 + self.rate_percent / 100.0).powf(1.0 / f64::from(day_basis)) - 1.0
    }
}

/// The durable "current rate" slot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CachedRate {
    pub sample: BenchmarkRateSample,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRate {
    pub fn new(sample: BenchmarkRateSample, fetched_at: DateTime<Utc>) -> Self {
        Self { sample, fetched_at }
    }

    /// Whether the slot is younger than `ttl` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialization_applies_rate_checks() {
        let ok: BenchmarkRateSample =
            serde_json::from_str(r#"{"date":"2024-01-02","rate_percent":11.65}"#).unwrap();
        assert_eq!(ok.rate_percent, 11.65);

        let negative: Result<BenchmarkRateSample, _> =
            serde_json::from_str(r#"{"date":"2024-01-02","rate_percent":-0.5}"#);
        assert!(negative.is_err());

        let cached: Result<CachedRate, _> = serde_json::from_str(
            r#"{"sample":{"date":"2024-01-02","rate_percent":-3.0},"fetched_at":"2024-01-02T10:00:00Z"}"#,
        );
        assert!(cached.is_err());
    }

    #[test]
    fn rejects_negative_and_nan() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(BenchmarkRateSample::new(d, -0.1).is_err());
        assert!(BenchmarkRateSample::new(d, f64::NAN).is_err());
        assert!(BenchmarkRateSample::new(d, 0.0).is_ok());
    }

    #[test]
    fn daily_factor_compounds_back_to_annual() {
        let s = BenchmarkRateSample::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 12.0).unwrap();
        let annual = (1.0 + s.daily_factor(365)).powi(365);
        assert!((annual - 1.12).abs() < 1e-9);
    }

    #[test]
    fn freshness_window() {
        let s = BenchmarkRateSample::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), 11.75).unwrap();
        let t0 = Utc::now();
        let cached = CachedRate::new(s, t0);
        assert!(cached.is_fresh(t0 + Duration::hours(23), Duration::hours(24)));
        assert!(!cached.is_fresh(t0 + Duration::hours(24), Duration::hours(24)));
    }
}
