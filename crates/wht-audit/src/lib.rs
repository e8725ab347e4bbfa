//! # wht-audit — Withholding Audit Engine
//!
//! Recomputes the taxes a client should have withheld on each supplier
//! payment, compares them to what was recorded, and persists the corrected
//! retention set with an audit record.
//!
//! ## Architecture
//!
//! - **Resolution** (`resolver.rs`, `cache.rs`): supplier fiscal profiles
//!   from cache, store or registry, with single-flight and a daily quota.
//!
//! - **Retentions** (`retention.rs`): the pure threshold rules, plus a
//!   batch-scoped memo.
//!
//! - **Audit** (`auditor.rs`): one payment, committed atomically.
//!
//! - **Batches** (`orchestrator.rs`): fixed-size batches, bounded
//!   concurrency inside each, strictly sequential across them.
//!
//! - **Money over time** (`late_fee.rs`, `correction.rs`, `overdue.rs`):
//!   late fees, benchmark-rate correction and the overdue view built on both.
//!
//! [`AuditEngine`] wires all of it from one [`AuditConfig`].
//!
//! ## Crate Policy
//!
//! - Collaborators arrive as `Arc<dyn ..>` trait objects; nothing here
//!   opens a connection or reads the environment.
//! - No lock is held across an `.await`.

pub mod auditor;
pub mod cache;
pub mod correction;
pub mod late_fee;
pub mod orchestrator;
pub mod overdue;
pub mod resolver;
pub mod retention;

pub use auditor::PaymentAuditor;
pub use cache::ProfileCache;
pub use correction::{compound, MonetaryCorrectionEngine, RateSeriesUpdate};
pub use late_fee::{LateFeeBreakdown, LateFeeCalculator};
pub use orchestrator::{BatchAuditOrchestrator, BatchObserver, NoopObserver};
pub use overdue::{OverdueAssessment, OverdueAssessor};
pub use resolver::FiscalProfileResolver;
pub use retention::{MemoizedRetentions, RetentionCalculator};

use std::sync::Arc;

use chrono::NaiveDate;
use wht_client::{BenchmarkRateSource, FiscalRegistry};
use wht_core::{
    AuditConfig, AuditError, AuditPeriod, AuditRecord, AuditReport, BenchmarkRateSample,
    ClientId, Clock, FiscalProfile, Money, Payment, PaymentId, RetentionEntry, SupplierId,
};
use wht_store::AuditStore;

/// Every engine component, built over shared collaborators.
pub struct AuditEngine {
    resolver: Arc<FiscalProfileResolver>,
    auditor: Arc<PaymentAuditor>,
    orchestrator: BatchAuditOrchestrator,
    correction: Arc<MonetaryCorrectionEngine>,
    overdue: OverdueAssessor,
    late_fees: LateFeeCalculator,
}

impl AuditEngine {
    /// Build the engine.
    ///
    /// # Errors
    ///
    /// [`AuditError::Validation`] if `config` does not validate.
    pub fn new(
        store: Arc<dyn AuditStore>,
        registry: Arc<dyn FiscalRegistry>,
        rates: Arc<dyn BenchmarkRateSource>,
        clock: Arc<dyn Clock>,
        config: AuditConfig,
    ) -> Result<Self, AuditError> {
        config.validate()?;

        let resolver = Arc::new(FiscalProfileResolver::new(
            Arc::clone(&store),
            registry,
            Arc::clone(&clock),
            config.resolver.clone(),
        ));
        let auditor = Arc::new(PaymentAuditor::new(
            Arc::clone(&store),
            Arc::clone(&resolver),
            RetentionCalculator::new(config.retention.clone()),
            Arc::clone(&clock),
        ));
        let orchestrator =
            BatchAuditOrchestrator::new(Arc::clone(&store), Arc::clone(&auditor), config.batch.clone());
        let correction = Arc::new(MonetaryCorrectionEngine::new(
            Arc::clone(&store),
            rates,
            clock,
            config.correction.clone(),
        ));
        let late_fees = LateFeeCalculator::new(config.late_fee.clone());
        let overdue = OverdueAssessor::new(store, late_fees.clone(), Arc::clone(&correction));

        Ok(Self {
            resolver,
            auditor,
            orchestrator,
            correction,
            overdue,
            late_fees,
        })
    }

    /// Attach a batch observer.
    pub fn with_observer(mut self, observer: Arc<dyn BatchObserver>) -> Self {
        self.orchestrator = self.orchestrator.with_observer(observer);
        self
    }

    pub fn resolver(&self) -> &FiscalProfileResolver {
        &self.resolver
    }

    pub fn calculator(&self) -> &RetentionCalculator {
        self.auditor.calculator()
    }

    pub fn late_fees(&self) -> &LateFeeCalculator {
        &self.late_fees
    }

    pub fn correction(&self) -> &MonetaryCorrectionEngine {
        &self.correction
    }

    pub async fn resolve_fiscal_profile(&self, id: &SupplierId) -> Result<FiscalProfile, AuditError> {
        self.resolver.resolve(id).await
    }

    pub fn compute_retentions(&self, amount: Money, profile: &FiscalProfile) -> Vec<RetentionEntry> {
        self.calculator().compute_retentions(amount, profile)
    }

    pub async fn audit_payment(&self, id: PaymentId) -> Result<AuditRecord, AuditError> {
        self.auditor.audit_payment(id).await
    }

    pub async fn process_payment(&self, id: PaymentId) -> Result<Payment, AuditError> {
        self.auditor.process_payment(id).await
    }

    pub async fn audit_client_period(
        &self,
        client_id: ClientId,
        period: AuditPeriod,
    ) -> Result<AuditReport, AuditError> {
        self.orchestrator.audit_client_period(client_id, period).await
    }

    pub async fn report_client_period(
        &self,
        client_id: ClientId,
        period: AuditPeriod,
    ) -> Result<AuditReport, AuditError> {
        self.orchestrator.report_client_period(client_id, period).await
    }

    pub async fn correct_amount(
        &self,
        amount: Money,
        from: NaiveDate,
        to: Option<NaiveDate>,
    ) -> Result<Money, AuditError> {
        self.correction.correct_amount(amount, from, to).await
    }

    pub async fn current_rate(&self) -> Result<BenchmarkRateSample, AuditError> {
        self.correction.current_rate().await
    }

    pub async fn update_rate_series(&self) -> Result<RateSeriesUpdate, AuditError> {
        self.correction.update_rate_series().await
    }

    pub async fn backfill_rates(&self, from: NaiveDate, to: NaiveDate) -> Result<usize, AuditError> {
        self.correction.backfill(from, to).await
    }

    pub async fn assess_overdue(
        &self,
        client_id: ClientId,
        as_of: NaiveDate,
    ) -> Result<Vec<OverdueAssessment>, AuditError> {
        self.overdue.assess_overdue(client_id, as_of).await
    }
}
