//! # In-Memory Store
//!
//! All tables live behind one `parking_lot::RwLock`, so
//! [`AuditStore::commit_audit`] writes the payment and its record under a
//! single write guard. The lock is never held across an `.await`.
//!
//! A [`Snapshot`] is the serializable image of every table; the CLI keeps its
//! state between runs by loading and saving one as JSON.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use wht_core::{
    AuditRecord, BenchmarkRateSample, CachedRate, FiscalProfile, Payment, PaymentFilter,
    PaymentId, SupplierId,
};

use crate::error::StoreResult;
use crate::AuditStore;

#[derive(Debug, Default)]
struct Tables {
    payments: HashMap<PaymentId, Payment>,
    profiles: HashMap<SupplierId, FiscalProfile>,
    audits: HashMap<PaymentId, AuditRecord>,
    rates: BTreeMap<NaiveDate, BenchmarkRateSample>,
    cached_rate: Option<CachedRate>,
    lookups: BTreeMap<NaiveDate, u32>,
}

/// Serializable image of a [`MemoryStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub payments: Vec<Payment>,
    pub profiles: Vec<FiscalProfile>,
    pub audit_records: Vec<AuditRecord>,
    pub rate_samples: Vec<BenchmarkRateSample>,
    pub cached_rate: Option<CachedRate>,
    pub lookup_counts: BTreeMap<NaiveDate, u32>,
}

/// Thread-safe, cloneable in-memory [`AuditStore`]. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot. Later entries win on duplicate keys.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let tables = Tables {
            payments: snapshot.payments.into_iter().map(|p| (p.id, p)).collect(),
            profiles: snapshot
                .profiles
                .into_iter()
                .map(|p| (p.supplier_id.clone(), p))
                .collect(),
            audits: snapshot
                .audit_records
                .into_iter()
                .map(|r| (r.payment_id, r))
                .collect(),
            rates: snapshot
                .rate_samples
                .into_iter()
                .map(|s| (s.date, s))
                .collect(),
            cached_rate: snapshot.cached_rate,
            lookups: snapshot.lookup_counts,
        };
        Self {
            tables: Arc::new(RwLock::new(tables)),
        }
    }

    /// Copy every table into a snapshot. Lists are in key order.
    pub fn snapshot(&self) -> Snapshot {
        let t = self.tables.read();
        let mut payments: Vec<Payment> = t.payments.values().cloned().collect();
        payments.sort_by(|a, b| (a.due_date, a.id).cmp(&(b.due_date, b.id)));
        let mut profiles: Vec<FiscalProfile> = t.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.supplier_id.cmp(&b.supplier_id));
        let mut audit_records: Vec<AuditRecord> = t.audits.values().cloned().collect();
        audit_records.sort_by_key(|r| r.payment_id);

        Snapshot {
            payments,
            profiles,
            audit_records,
            rate_samples: t.rates.values().copied().collect(),
            cached_rate: t.cached_rate,
            lookup_counts: t.lookups.clone(),
        }
    }

    /// Load a JSON snapshot file.
    pub fn load(path: &Path) -> StoreResult<Self> {
        let bytes = std::fs::read(path)?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;
        tracing::debug!(
            path = %path.display(),
            payments = snapshot.payments.len(),
            "loaded store snapshot"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load `path` if it exists, otherwise start empty.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    /// Write the snapshot as pretty JSON. The file is replaced via a sibling
    /// temporary file and a rename.
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(&self.snapshot())?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!(path = %path.display(), "saved store snapshot");
        Ok(())
    }

    pub fn payment_count(&self) -> usize {
        self.tables.read().payments.len()
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn get_payment(&self, id: PaymentId) -> StoreResult<Option<Payment>> {
        Ok(self.tables.read().payments.get(&id).cloned())
    }

    async fn upsert_payment(&self, payment: &Payment) -> StoreResult<()> {
        self.tables
            .write()
            .payments
            .insert(payment.id, payment.clone());
        Ok(())
    }

    async fn delete_payment(&self, id: PaymentId) -> StoreResult<bool> {
        let mut t = self.tables.write();
        t.audits.remove(&id);
        Ok(t.payments.remove(&id).is_some())
    }

    async fn find_payments(&self, filter: &PaymentFilter) -> StoreResult<Vec<Payment>> {
        filter.validate()?;
        let mut found: Vec<Payment> = self
            .tables
            .read()
            .payments
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.due_date, a.id).cmp(&(b.due_date, b.id)));
        Ok(found)
    }

    async fn get_profile(&self, id: &SupplierId) -> StoreResult<Option<FiscalProfile>> {
        Ok(self.tables.read().profiles.get(id).cloned())
    }

    async fn upsert_profile(&self, profile: &FiscalProfile) -> StoreResult<()> {
        self.tables
            .write()
            .profiles
            .insert(profile.supplier_id.clone(), profile.clone());
        Ok(())
    }

    async fn delete_profile(&self, id: &SupplierId) -> StoreResult<bool> {
        Ok(self.tables.write().profiles.remove(id).is_some())
    }

    async fn get_audit_record(&self, id: PaymentId) -> StoreResult<Option<AuditRecord>> {
        Ok(self.tables.read().audits.get(&id).cloned())
    }

    async fn commit_audit(&self, payment: &Payment, record: &AuditRecord) -> StoreResult<()> {
        let mut t = self.tables.write();
        t.payments.insert(payment.id, payment.clone());
        t.audits.insert(record.payment_id, record.clone());
        Ok(())
    }

    async fn rate_samples(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<BenchmarkRateSample>> {
        if from > to {
            return Ok(Vec::new());
        }
        Ok(self
            .tables
            .read()
            .rates
            .range(from..=to)
            .map(|(_, s)| *s)
            .collect())
    }

    async fn latest_rate_sample(&self) -> StoreResult<Option<BenchmarkRateSample>> {
        Ok(self.tables.read().rates.values().next_back().copied())
    }

    async fn insert_rate_sample(&self, sample: BenchmarkRateSample) -> StoreResult<bool> {
        let mut tables = self.tables.write();
        if tables.rates.contains_key(&sample.date) {
            return Ok(false);
        }
        tables.rates.insert(sample.date, sample);
        Ok(true)
    }

    async fn get_cached_rate(&self) -> StoreResult<Option<CachedRate>> {
        Ok(self.tables.read().cached_rate)
    }

    async fn put_cached_rate(&self, rate: CachedRate) -> StoreResult<()> {
        self.tables.write().cached_rate = Some(rate);
        Ok(())
    }

    async fn clear_cached_rate(&self) -> StoreResult<()> {
        self.tables.write().cached_rate = None;
        Ok(())
    }

    async fn increment_lookup_count(&self, day: NaiveDate) -> StoreResult<u32> {
        let mut t = self.tables.write();
        let count = t.lookups.entry(day).or_insert(0);
        *count = count.saturating_add(1);
        Ok(*count)
    }

    async fn lookup_count(&self, day: NaiveDate) -> StoreResult<u32> {
        Ok(self.tables.read().lookups.get(&day).copied().unwrap_or(0))
    }
}
