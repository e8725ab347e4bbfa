//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use wht_audit::AuditEngine;
use wht_client::mock::{company_record, MockRateSource, MockRegistry};
use wht_core::{AuditConfig, ClientId, Clock, FixedClock, Money, Payment, PaymentId, SupplierId};
use wht_store::{AuditStore, MemoryStore};

pub const SUPPLIER: &str = "11222333000181";
pub const SUPPLIER_B: &str = "12345678000195";
pub const SUPPLIER_C: &str = "98765432000198";
/// Valid CNPJ the mock registry never knows about.
pub const UNKNOWN_SUPPLIER: &str = "00000000000191";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn money(s: &str) -> Money {
    Money::parse(s).expect("valid amount")
}

pub fn supplier(cnpj: &str) -> SupplierId {
    SupplierId::new(cnpj).expect("valid CNPJ")
}

pub struct Harness {
    pub store: MemoryStore,
    pub registry: Arc<MockRegistry>,
    pub rates: Arc<MockRateSource>,
    pub clock: FixedClock,
    pub client: ClientId,
}

impl Harness {
    /// Empty store, clock pinned to 2024-02-01, supplier [`SUPPLIER`]
    /// registered with ISS 5% and no secondary activities.
    pub fn new() -> Self {
        let harness = Self {
            store: MemoryStore::new(),
            registry: Arc::new(MockRegistry::new()),
            rates: Arc::new(MockRateSource::default()),
            clock: FixedClock::at_date(date(2024, 2, 1)),
            client: ClientId::new(),
        };
        harness.register(SUPPLIER, "5.00", &[]);
        harness
    }

    pub fn register(&self, cnpj: &str, primary_rate: &str, secondary: &[(&str, &str)]) {
        self.registry.insert(company_record(
            &supplier(cnpj),
            "Fornecedor Ltda",
            ("6201501", primary_rate),
            secondary,
        ));
    }

    pub fn engine(&self) -> AuditEngine {
        self.engine_with(AuditConfig::default())
    }

    pub fn engine_with(&self, config: AuditConfig) -> AuditEngine {
        self.engine_over(Arc::new(self.store.clone()), config)
    }

    pub fn engine_over(&self, store: Arc<dyn AuditStore>, config: AuditConfig) -> AuditEngine {
        AuditEngine::new(
            store,
            self.registry.clone(),
            self.rates.clone(),
            Arc::new(self.clock.clone()),
            config,
        )
        .expect("default config validates")
    }

    pub async fn add_payment(&self, cnpj: &str, gross: &str, due: NaiveDate) -> PaymentId {
        let payment = Payment::new(
            supplier(cnpj),
            self.client,
            money(gross),
            due,
            "services",
            self.clock.now(),
        )
        .expect("valid payment");
        let id = payment.id;
        self.store.upsert_payment(&payment).await.expect("upsert");
        id
    }

    pub async fn payment(&self, id: PaymentId) -> Payment {
        self.store
            .get_payment(id)
            .await
            .expect("store read")
            .expect("payment exists")
    }
}
