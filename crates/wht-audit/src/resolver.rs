//! # Fiscal Profile Resolution
//!
//! Lookup order: in-process [`ProfileCache`], then the store, then the
//! external [`FiscalRegistry`]. A registry answer is validated, persisted and
//! cached before any caller sees it.
//!
//! ## Single-flight
//!
//! Concurrent resolutions of the same supplier share one `tokio` `OnceCell`
//! held in an in-flight map. The first caller runs the load; everyone else
//! awaits the same cell and receives a clone of the same result. The entry is
//! dropped once the flight lands, so a failure is never remembered and the
//! next call starts a fresh flight.
//!
//! ## Quota
//!
//! Each outbound registry call counts against a per-day quota kept in the
//! store. Once it is spent, resolution fails before any request is made.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use wht_client::FiscalRegistry;
use wht_core::{AuditError, Clock, FiscalProfile, ResolverConfig, SupplierId};
use wht_store::AuditStore;

use crate::cache::ProfileCache;

type Flight = Arc<OnceCell<Result<FiscalProfile, AuditError>>>;

pub struct FiscalProfileResolver {
    store: Arc<dyn AuditStore>,
    registry: Arc<dyn FiscalRegistry>,
    clock: Arc<dyn Clock>,
    config: ResolverConfig,
    cache: ProfileCache,
    in_flight: Mutex<HashMap<SupplierId, Flight>>,
}

impl FiscalProfileResolver {
    pub fn new(
        store: Arc<dyn AuditStore>,
        registry: Arc<dyn FiscalRegistry>,
        clock: Arc<dyn Clock>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            registry,
            clock,
            config,
            cache: ProfileCache::new(),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a supplier's fiscal profile.
    ///
    /// # Errors
    ///
    /// - [`AuditError::Resolution`] when the registry is unreachable, times
    ///   out, or the daily quota is spent
    /// - [`AuditError::Validation`] when the registry answer is malformed
    /// - [`AuditError::NotFound`] when the registry has no such company
    /// - [`AuditError::Persistence`] when the store fails
    pub async fn resolve(&self, id: &SupplierId) -> Result<FiscalProfile, AuditError> {
        if let Some(profile) = self.cache.get(id) {
            tracing::debug!(supplier_id = %id, "profile cache hit");
            return Ok(profile);
        }
        tracing::debug!(supplier_id = %id, "profile cache miss");

        let flight = {
            let mut in_flight = self.in_flight.lock();
            Arc::clone(
                in_flight
                    .entry(id.clone())
                    .or_insert_with(|| Arc::new(OnceCell::new())),
            )
        };

        let result = flight.get_or_init(|| self.load(id)).await.clone();

        {
            let mut in_flight = self.in_flight.lock();
            if in_flight
                .get(id)
                .map_or(false, |current| Arc::ptr_eq(current, &flight))
            {
                in_flight.remove(id);
            }
        }

        result
    }

    /// Evict a supplier from the in-process cache. The stored profile is
    /// kept; the next resolution reloads it from the store.
    pub fn invalidate(&self, id: &SupplierId) {
        if self.cache.invalidate(id) {
            tracing::debug!(supplier_id = %id, "profile cache entry invalidated");
        }
    }

    /// Force a registry lookup and overwrite the stored and cached profile.
    pub async fn refresh(&self, id: &SupplierId) -> Result<FiscalProfile, AuditError> {
        self.cache.invalidate(id);
        self.fetch_from_registry(id).await
    }

    async fn load(&self, id: &SupplierId) -> Result<FiscalProfile, AuditError> {
        if let Some(profile) = self.store.get_profile(id).await? {
            tracing::debug!(supplier_id = %id, "profile loaded from store");
            self.cache.insert(profile.clone());
            return Ok(profile);
        }
        self.fetch_from_registry(id).await
    }

    async fn fetch_from_registry(&self, id: &SupplierId) -> Result<FiscalProfile, AuditError> {
        let registry = self.registry.registry_name().to_string();

        if let Some(quota) = self.config.daily_lookup_quota {
            let used = self
                .store
                .increment_lookup_count(self.clock.today())
                .await?;
            if used > quota {
                tracing::warn!(supplier_id = %id, quota, "daily registry lookup quota exhausted");
                return Err(AuditError::resolution(
                    registry,
                    format!("daily lookup quota of {quota} exhausted"),
                ));
            }
        }

        let timeout = self.config.lookup_timeout();
        let company = match tokio::time::timeout(timeout, self.registry.lookup(id)).await {
            Ok(Ok(company)) => company,
            Ok(Err(e)) => {
                tracing::warn!(supplier_id = %id, error = %e, "registry lookup failed");
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(supplier_id = %id, ?timeout, "registry lookup timed out");
                return Err(AuditError::resolution(
                    registry,
                    format!("timed out after {}ms", timeout.as_millis()),
                ));
            }
        };

        let profile = company.to_profile(id, &self.config, self.clock.now())?;
        self.store.upsert_profile(&profile).await?;
        self.cache.insert(profile.clone());
        tracing::info!(
            supplier_id = %id,
            secondary = profile.secondary_activities.len(),
            "fiscal profile resolved from registry"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wht_client::mock::{company_record, MockRegistry};
    use wht_core::{FixedClock, Rate};
    use wht_store::MemoryStore;

    fn supplier() -> SupplierId {
        SupplierId::new("11222333000181").unwrap()
    }

    fn setup(config: ResolverConfig) -> (FiscalProfileResolver, Arc<MockRegistry>, MemoryStore) {
        let store = MemoryStore::new();
        let registry = Arc::new(MockRegistry::new().with_company(company_record(
            &supplier(),
            "ACME",
            ("6201501", "5.00"),
            &[("6202300", "2.00")],
        )));
        let clock = FixedClock::at_date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        let resolver = FiscalProfileResolver::new(
            Arc::new(store.clone()),
            registry.clone(),
            Arc::new(clock),
            config,
        );
        (resolver, registry, store)
    }

    #[tokio::test]
    async fn resolves_from_registry_then_cache() {
        let (resolver, registry, store) = setup(ResolverConfig::default());
        let first = resolver.resolve(&supplier()).await.unwrap();
        assert_eq!(first.primary_activity.rate, Rate::from_bps(500));
        let second = resolver.resolve(&supplier()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.calls(), 1);
        assert!(store.get_profile(&supplier()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn invalidated_entry_reloads_from_store() {
        let (resolver, registry, _store) = setup(ResolverConfig::default());
        resolver.resolve(&supplier()).await.unwrap();
        resolver.invalidate(&supplier());
        resolver.resolve(&supplier()).await.unwrap();
        assert_eq!(registry.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_forces_registry_lookup() {
        let (resolver, registry, _store) = setup(ResolverConfig::default());
        resolver.resolve(&supplier()).await.unwrap();
        resolver.refresh(&supplier()).await.unwrap();
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let (resolver, registry, _store) = setup(ResolverConfig::default());
        registry.set_failure(Some("maintenance"));
        let err = resolver.resolve(&supplier()).await.unwrap_err();
        assert!(err.is_resolution());
        registry.set_failure(None);
        assert!(resolver.resolve(&supplier()).await.is_ok());
        assert_eq!(registry.calls(), 2);
    }
}
