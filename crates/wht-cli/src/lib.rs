//! # wht-cli — Command Line Interface for the Withholding Audit Engine
//!
//! Provides the `wht` binary. State lives in a JSON snapshot of the
//! in-memory store (`--store`, default `wht-store.json`), loaded at the start
//! of each command and written back at the end. Engine tunables come from an
//! optional YAML file (`--config`); registry and rate-source endpoints come
//! from the environment (`WHT_REGISTRY_URL`, `WHT_REGISTRY_TOKEN`,
//! `WHT_RATES_URL`, `WHT_RATES_SERIES`, `WHT_TIMEOUT_SECS`).
//!
//! ## Subcommands
//!
//! - `wht payment` — record, show and list payments.
//! - `wht audit` — single-payment audit, process step, batch audit, report.
//! - `wht retentions` — retentions owed on an amount for a supplier.
//! - `wht late-fee` — late-fee breakdown (offline).
//! - `wht correct` — benchmark-rate correction of an amount.
//! - `wht overdue` — overdue assessment of a client's unpaid payments.
//! - `wht rates` — rate series update, backfill, current rate.
//! - `wht profile` — supplier fiscal profile lookup.
//!
//! ```bash
//! wht payment add --supplier 11.222.333/0001-81 --client <uuid> --gross 6000 --due 2024-01-15
//! wht audit period --client <uuid> --month 2024-01 --json
//! wht late-fee --amount 1000 --due 2024-01-01 --today 2024-01-11
//! ```

pub mod audit;
pub mod calc;
pub mod payment;
pub mod rates;
pub mod session;
