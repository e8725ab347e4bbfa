//! # wht-core — Foundational Types for the Withholding Audit Engine
//!
//! This crate defines the domain vocabulary shared by every other crate in
//! the workspace: money, rates, identifiers, supplier fiscal profiles,
//! payments and their retention entries, audit records, benchmark rate
//! samples, configuration, and the error taxonomy. It depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Fixed-point arithmetic.** Amounts are integer cents ([`Money`]) and
//!    percentage rates are hundredths of a percent ([`Rate`]). Both serialize
//!    as decimal strings. No float ever reaches a retention or a fee.
//!
//! 2. **Validated newtypes.** [`SupplierId`] is a check-digit-verified CNPJ;
//!    [`ClientId`] and [`PaymentId`] are UUID-backed and always valid.
//!
//! 3. **Derived net amount.** [`Payment::net`] is computed from the gross
//!    amount and the retention list on every call, so `net = gross − Σ
//!    retention` cannot drift.
//!
//! 4. **Injected time.** Everything that reads "now" goes through a
//!    [`Clock`], so cache expiry and overdue checks are testable.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `wht-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod audit;
pub mod clock;
pub mod config;
pub mod error;
pub mod fiscal;
pub mod identity;
pub mod money;
pub mod payment;
pub mod rate;

// Re-export primary types for ergonomic imports.
pub use audit::{
    amounts_by_type, AuditPeriod, AuditRecord, AuditReport, Classification, FailedAudit,
    PaymentFilter,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    AuditConfig, BatchConfig, CorrectionConfig, LateFeeConfig, PanelRate, ResolverConfig,
    RetentionConfig,
};
pub use error::{AuditError, ValidationError};
pub use fiscal::{EconomicActivity, FiscalProfile, RegistrationStatus, SizeClass};
pub use identity::{ClientId, PaymentId, SupplierId};
pub use money::{Money, Rate};
pub use payment::{Payment, PaymentStatus, RetentionEntry, TaxType};
pub use rate::{BenchmarkRateSample, CachedRate};
