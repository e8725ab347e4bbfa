//! In-process collaborators for tests and offline runs.
//!
//! [`MockRegistry`] serves records from a map, counts calls, and can be told
//! to stall or fail. [`MockRateSource`] serves a fixed series.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use wht_core::{BenchmarkRateSample, SupplierId};

use crate::benchmark::BenchmarkRateSource;
use crate::error::ClientError;
use crate::registry::{FiscalRegistry, RegistryActivity, RegistryCompany};

/// Build a minimal registry record.
///
/// `secondary` pairs are `(code, rate percent)`.
pub fn company_record(
    cnpj: &SupplierId,
    legal_name: &str,
    primary: (&str, &str),
    secondary: &[(&str, &str)],
) -> RegistryCompany {
    let activity = |(code, rate): (&str, &str)| RegistryActivity {
        codigo: code.to_string(),
        descricao: format!("activity {code}"),
        aliquota: Some(rate.to_string()),
    };
    RegistryCompany {
        cnpj: cnpj.as_str().to_string(),
        razao_social: legal_name.to_string(),
        nome_fantasia: None,
        atividade_principal: activity(primary),
        atividades_secundarias: secondary.iter().copied().map(activity).collect(),
        situacao_cadastral: Some("ATIVA".into()),
        capital_social: None,
        porte: None,
        municipio: None,
        uf: None,
    }
}

/// Registry backed by a map.
#[derive(Debug, Default)]
pub struct MockRegistry {
    companies: RwLock<HashMap<String, RegistryCompany>>,
    calls: AtomicUsize,
    delay: RwLock<Option<Duration>>,
    failure: RwLock<Option<String>>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(self, company: RegistryCompany) -> Self {
        self.insert(company);
        self
    }

    pub fn insert(&self, company: RegistryCompany) {
        self.companies.write().insert(company.cnpj.clone(), company);
    }

    /// Make every lookup sleep first.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write() = delay;
    }

    /// Make every lookup fail with a 503 carrying `reason`.
    pub fn set_failure(&self, reason: Option<&str>) {
        *self.failure.write() = reason.map(str::to_string);
    }

    /// Lookups served so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FiscalRegistry for MockRegistry {
    async fn lookup(&self, id: &SupplierId) -> Result<RegistryCompany, ClientError> {
        let endpoint = "mock-registry lookup";
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failure.read().clone();
        if let Some(reason) = failure {
            return Err(ClientError::ApiError {
                endpoint: endpoint.into(),
                status: 503,
                body: reason,
            });
        }

        self.companies
            .read()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ClientError::NotFound {
                endpoint: endpoint.into(),
                key: id.to_string(),
            })
    }

    fn registry_name(&self) -> &str {
        "MockRegistry"
    }
}

/// Rate source backed by a fixed series.
#[derive(Debug, Default)]
pub struct MockRateSource {
    samples: RwLock<Vec<BenchmarkRateSample>>,
    calls: AtomicUsize,
    failing: RwLock<bool>,
}

impl MockRateSource {
    pub fn new(samples: Vec<BenchmarkRateSample>) -> Self {
        let source = Self::default();
        source.set_samples(samples);
        source
    }

    /// A flat series: one sample per day from `from` to `to`.
    pub fn flat(from: NaiveDate, to: NaiveDate, rate_percent: f64) -> Self {
        let samples = from
            .iter_days()
            .take_while(|d| *d <= to)
            .filter_map(|d| BenchmarkRateSample::new(d, rate_percent).ok())
            .collect();
        Self::new(samples)
    }

    pub fn set_samples(&self, mut samples: Vec<BenchmarkRateSample>) {
        samples.sort_by_key(|s| s.date);
        *self.samples.write() = samples;
    }

    pub fn push(&self, sample: BenchmarkRateSample) {
        let mut samples = self.samples.write();
        samples.retain(|s| s.date != sample.date);
        samples.push(sample);
        samples.sort_by_key(|s| s.date);
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.write() = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn check(&self, endpoint: &str) -> Result<(), ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.read() {
            return Err(ClientError::ApiError {
                endpoint: endpoint.into(),
                status: 503,
                body: "rate source unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BenchmarkRateSource for MockRateSource {
    async fn latest(&self) -> Result<BenchmarkRateSample, ClientError> {
        let endpoint = "mock-rates latest";
        self.check(endpoint)?;
        self.samples
            .read()
            .last()
            .copied()
            .ok_or_else(|| ClientError::Malformed {
                endpoint: endpoint.into(),
                reason: "series is empty".into(),
            })
    }

    async fn history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BenchmarkRateSample>, ClientError> {
        self.check("mock-rates history")?;
        Ok(self
            .samples
            .read()
            .iter()
            .filter(|s| from <= s.date && s.date <= to)
            .copied()
            .collect())
    }

    fn source_name(&self) -> &str {
        "MockRateSource"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn supplier() -> SupplierId {
        SupplierId::new("11222333000181").unwrap()
    }

    #[tokio::test]
    async fn mock_registry_serves_and_counts() {
        let registry: Arc<dyn FiscalRegistry> = Arc::new(
            MockRegistry::new().with_company(company_record(&supplier(), "ACME", ("1", "5"), &[])),
        );
        let found = registry.lookup(&supplier()).await.unwrap();
        assert_eq!(found.razao_social, "ACME");
        assert_eq!(registry.registry_name(), "MockRegistry");
    }

    #[tokio::test]
    async fn mock_registry_failure_and_missing() {
        let registry = MockRegistry::new();
        assert!(matches!(
            registry.lookup(&supplier()).await,
            Err(ClientError::NotFound { .. })
        ));
        registry.set_failure(Some("down"));
        assert!(matches!(
            registry.lookup(&supplier()).await,
            Err(ClientError::ApiError { status: 503, .. })
        ));
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn flat_source_covers_range() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let source = MockRateSource::flat(from, to, 12.0);
        assert_eq!(source.history(from, to).await.unwrap().len(), 30);
        assert_eq!(source.latest().await.unwrap().date, to);
        source.set_failing(true);
        assert!(source.latest().await.is_err());
    }
}
