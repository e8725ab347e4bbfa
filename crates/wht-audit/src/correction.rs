//! # Monetary Correction
//!
//! Compounds the benchmark rate series over a date range. Each stored sample
//! is an annual percent `r`; it is turned into a daily factor
//! `(1 + r/100)^(1/basis) - 1` and applied for the days elapsed since the
//! previous sample (or since the start date, for the first one). The result
//! is rounded to the cent once, at the end.
//!
//! Missing data is not an error: a range with no samples, or an end before
//! the start, returns the amount unchanged.
//!
//! The engine also owns the series maintenance: a cached current rate with a
//! TTL, daily appends from the rate source, and historical backfill.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wht_client::{BenchmarkRateSource, ClientError};
use wht_core::{AuditError, BenchmarkRateSample, CachedRate, Clock, CorrectionConfig, Money};
use wht_store::AuditStore;

/// What [`MonetaryCorrectionEngine::update_rate_series`] did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RateSeriesUpdate {
    /// A sample for a date after the latest stored one was added.
    Appended { sample: BenchmarkRateSample },
    /// The latest stored date was republished with a different rate. The
    /// recorded sample is kept.
    Conflict {
        stored: BenchmarkRateSample,
        published: BenchmarkRateSample,
    },
    /// Nothing new.
    Unchanged { latest: BenchmarkRateSample },
}

/// Compound `amount` over the samples dated `from..=to`.
///
/// `samples` need not be sorted or filtered.
pub fn compound(
    amount: Money,
    from: NaiveDate,
    to: NaiveDate,
    samples: &[BenchmarkRateSample],
    day_basis: u32,
) -> Money {
    if to < from || day_basis == 0 {
        return amount;
    }

    let mut in_range: Vec<&BenchmarkRateSample> = samples
        .iter()
        .filter(|s| from <= s.date && s.date <= to)
        .collect();
    if in_range.is_empty() {
        return amount;
    }
    in_range.sort_by_key(|s| s.date);

    let mut value = amount.to_f64();
    let mut previous = from;
    for sample in in_range {
        let days = sample.date.signed_duration_since(previous).num_days();
        if days > 0 {
            let factor = 1.0 + sample.daily_factor(day_basis);
            value *= factor.powi(days as i32);
        }
        previous = sample.date;
    }
    Money::from_f64_rounded(value)
}

pub struct MonetaryCorrectionEngine {
    store: Arc<dyn AuditStore>,
    source: Arc<dyn BenchmarkRateSource>,
    clock: Arc<dyn Clock>,
    config: CorrectionConfig,
}

impl MonetaryCorrectionEngine {
    pub fn new(
        store: Arc<dyn AuditStore>,
        source: Arc<dyn BenchmarkRateSource>,
        clock: Arc<dyn Clock>,
        config: CorrectionConfig,
    ) -> Self {
        Self {
            store,
            source,
            clock,
            config,
        }
    }

    /// The current benchmark rate.
    ///
    /// Served from the durable cached slot while it is younger than the TTL;
    /// otherwise fetched from the rate source and written back to the slot.
    pub async fn current_rate(&self) -> Result<BenchmarkRateSample, AuditError> {
        let now = self.clock.now();
        if let Some(cached) = self.store.get_cached_rate().await? {
            if cached.is_fresh(now, self.config.cache_ttl()) {
                tracing::debug!(date = %cached.sample.date, "benchmark rate cache hit");
                return Ok(cached.sample);
            }
            tracing::debug!(fetched_at = %cached.fetched_at, "benchmark rate cache expired");
        }

        let sample = self.fetch(self.source.latest()).await?;
        self.store.put_cached_rate(CachedRate::new(sample, now)).await?;
        Ok(sample)
    }

    /// Correct `amount` from `from` to `to` (today when `None`).
    pub async fn correct_amount(
        &self,
        amount: Money,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Money, AuditError> {
        let to = to.unwrap_or_else(|| self.clock.today());
        if to < from {
            return Ok(amount);
        }
        let samples = self.store.rate_samples(from, to).await?;
        let corrected = compound(amount, from, to, &samples, self.config.day_basis);
        tracing::debug!(
            %amount,
            %corrected,
            %from,
            %to,
            samples = samples.len(),
            "monetary correction applied"
        );
        Ok(corrected)
    }

    /// Pull the latest published sample into the stored series.
    ///
    /// A date after the latest stored sample is appended. Recorded samples are
    /// immutable: the same date republished with a different rate is reported
    /// as a conflict and the stored value stays. There is never more than one
    /// sample per date.
    pub async fn update_rate_series(&self) -> Result<RateSeriesUpdate, AuditError> {
        let fetched = self.fetch(self.source.latest()).await?;
        self.store
            .put_cached_rate(CachedRate::new(fetched, self.clock.now()))
            .await?;

        let outcome = match self.store.latest_rate_sample().await? {
            None => RateSeriesUpdate::Appended { sample: fetched },
            Some(latest) if fetched.date > latest.date => {
                RateSeriesUpdate::Appended { sample: fetched }
            }
            Some(latest)
                if fetched.date == latest.date && fetched.rate_percent != latest.rate_percent =>
            {
                RateSeriesUpdate::Conflict {
                    stored: latest,
                    published: fetched,
                }
            }
            Some(latest) => RateSeriesUpdate::Unchanged { latest },
        };

        match &outcome {
            RateSeriesUpdate::Appended { sample } => {
                if !self.store.insert_rate_sample(*sample).await? {
                    // Another writer recorded the date first.
                    let stored = self.store.latest_rate_sample().await?.unwrap_or(*sample);
                    return Ok(RateSeriesUpdate::Unchanged { latest: stored });
                }
                tracing::info!(
                    date = %sample.date,
                    rate = sample.rate_percent,
                    "benchmark rate series updated"
                );
            }
            RateSeriesUpdate::Conflict { stored, published } => {
                tracing::warn!(
                    date = %stored.date,
                    stored = stored.rate_percent,
                    published = published.rate_percent,
                    "benchmark rate republished with a different value, keeping the recorded sample"
                );
            }
            RateSeriesUpdate::Unchanged { latest } => {
                tracing::info!(date = %latest.date, "benchmark rate series already current");
            }
        }
        Ok(outcome)
    }

    /// Import historical samples for `from..=to`. Dates already stored are
    /// kept as they are. Returns how many samples were added.
    pub async fn backfill(&self, from: NaiveDate, to: NaiveDate) -> Result<usize, AuditError> {
        if to < from {
            return Ok(0);
        }
        let fetched = self.fetch(self.source.history(from, to)).await?;

        let mut added = 0;
        for sample in fetched
            .into_iter()
            .filter(|s| from <= s.date && s.date <= to)
        {
            if self.store.insert_rate_sample(sample).await? {
                added += 1;
            }
        }
        tracing::info!(%from, %to, added, "benchmark rate series backfilled");
        Ok(added)
    }

    /// Drop the cached current rate.
    pub async fn invalidate_rate_cache(&self) -> Result<(), AuditError> {
        self.store.clear_cached_rate().await?;
        Ok(())
    }

    async fn fetch<T>(
        &self,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, AuditError> {
        let timeout = self.config.fetch_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::warn!(source = self.source.source_name(), error = %e, "rate fetch failed");
                Err(e.into())
            }
            Err(_) => Err(AuditError::resolution(
                self.source.source_name(),
                format!("timed out after {}ms", timeout.as_millis()),
            )),
        }
    }
}
