//! # wht-store — Persistence Boundary
//!
//! The audit engine owns no storage engine. It talks to whatever key-value
//! backend the deployment provides through the [`AuditStore`] trait, which
//! names only the access patterns the engine needs:
//!
//! - payments by id, plus filtered and client/period range queries
//! - fiscal profiles by supplier
//! - audit records by payment, written together with the payment in
//!   [`AuditStore::commit_audit`]
//! - the benchmark rate series (one sample per date) and the cached
//!   current-rate slot
//! - a per-day counter of registry lookups
//!
//! [`MemoryStore`] is the reference implementation, used by tests and by the
//! CLI through JSON snapshots.
//!
//! ## Concurrency
//!
//! Implementations must be `Send + Sync`; the engine shares one store behind
//! an `Arc<dyn AuditStore>` across concurrent audits.

pub mod error;
pub mod memory;

use async_trait::async_trait;
use chrono::NaiveDate;
use wht_core::{
    AuditPeriod, AuditRecord, BenchmarkRateSample, CachedRate, ClientId, FiscalProfile, Payment,
    PaymentFilter, PaymentId, SupplierId,
};

pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, Snapshot};

/// Logical access to the external store.
#[async_trait]
pub trait AuditStore: Send + Sync {
    // -- payments --------------------------------------------------------

    async fn get_payment(&self, id: PaymentId) -> StoreResult<Option<Payment>>;

    /// Insert or replace a payment.
    async fn upsert_payment(&self, payment: &Payment) -> StoreResult<()>;

    /// Remove a payment and its audit record. Returns whether it existed.
    async fn delete_payment(&self, id: PaymentId) -> StoreResult<bool>;

    /// All payments matching `filter`, ordered by due date then id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] if the filter is inconsistent.
    async fn find_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<Payment>>;

    /// Range query: a client's payments due within `period`.
    async fn payments_for_client(
        &self,
        client: ClientId,
        period: &AuditPeriod,
    ) -> StoreResult<Vec<Payment>> {
        self.find_payments(&PaymentFilter::for_client_period(client, period))
            .await
    }

    // -- fiscal profiles -------------------------------------------------

    async fn get_profile(&self, id: &SupplierId) -> StoreResult<Option<FiscalProfile>>;

    async fn upsert_profile(&self, profile: &FiscalProfile) -> StoreResult<()>;

    async fn delete_profile(&self, id: &SupplierId) -> StoreResult<bool>;

    // -- audit records ---------------------------------------------------

    async fn get_audit_record(&self, id: PaymentId) -> StoreResult<Option<AuditRecord>>;

    /// Write the audited payment and its record as one unit. Either both
    /// become visible or neither does.
    async fn commit_audit(&self, payment: &Payment, record: &AuditRecord) -> StoreResult<()>;

    // -- benchmark rate series -------------------------------------------

    /// Samples with `from <= date <= to`, in date order.
    async fn rate_samples(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BenchmarkRateSample>>;

    async fn latest_rate_sample(&self) -> StoreResult<Option<BenchmarkRateSample>>;

    /// Record a sample unless its date already has one. Recorded samples are
    /// never overwritten. Returns whether the sample was added.
    async fn insert_rate_sample(&self, sample: BenchmarkRateSample) -> StoreResult<bool>;

    async fn get_cached_rate(&self) -> StoreResult<Option<CachedRate>>;

    async fn put_cached_rate(&self, rate: CachedRate) -> StoreResult<()>;

    async fn clear_cached_rate(&self) -> StoreResult<()>;

    // -- registry lookup quota -------------------------------------------

    /// Count one registry lookup on `day`; returns the new count.
    async fn increment_lookup_count(&self, day: NaiveDate) -> StoreResult<u32>;

    async fn lookup_count(&self, day: NaiveDate) -> StoreResult<u32>;
}
