//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error taxonomy used throughout the audit engine. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - [`ValidationError`] describes malformed input, whether it came from a
//!   caller, a configuration file, or an external registry response.
//! - [`AuditError`] is the only error type returned by the engine's public
//!   operations. It is `Clone` so that a single failed registry lookup can be
//!   handed to every caller that was waiting on it.
//! - A discrepancy between computed and recorded retentions is a
//!   classification outcome, never an error.

use thiserror::Error;

/// Malformed or missing input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// CNPJ does not have 14 digits or fails its check digits.
    #[error("invalid CNPJ: \"{0}\" (expected 14 digits with valid check digits)")]
    InvalidCnpj(String),

    /// Identifier is not a valid UUID.
    #[error("invalid identifier: \"{0}\"")]
    InvalidId(String),

    /// Amount string is not a decimal with at most two fractional digits.
    #[error("invalid amount: \"{0}\" (expected decimal with at most 2 fractional digits)")]
    InvalidAmount(String),

    /// Rate string is not a non-negative decimal percent.
    #[error("invalid rate: \"{0}\" (expected non-negative percent with at most 2 fractional digits)")]
    InvalidRate(String),

    /// A monetary amount that must be non-negative was negative.
    #[error("negative amount for {field}: {value}")]
    NegativeAmount {
        /// Name of the offending field.
        field: String,
        /// The rejected value, formatted.
        value: String,
    },

    /// Tax tag is not one of the supported withholding types.
    #[error("unknown tax type: \"{0}\"")]
    UnknownTaxType(String),

    /// Economic activity record is malformed.
    #[error("invalid economic activity \"{code}\": {reason}")]
    InvalidActivity {
        /// Activity code as received.
        code: String,
        /// Description of the problem.
        reason: String,
    },

    /// Period start falls after its end.
    #[error("invalid period: start {start} is after end {end}")]
    InvalidPeriod {
        /// Requested start date.
        start: String,
        /// Requested end date.
        end: String,
    },

    /// Payment filter is inconsistent.
    #[error("invalid payment filter: {0}")]
    InvalidFilter(String),

    /// Configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// External collaborator returned a payload that cannot be mapped.
    #[error("malformed response from {collaborator}: {reason}")]
    MalformedResponse {
        /// Which collaborator produced the payload.
        collaborator: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Requested payment status change is not allowed.
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },
}

/// Top-level error type for engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// Malformed or missing input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown identifier.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of record that was looked up.
        kind: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// External registry or rate source was unreachable, timed out, or
    /// refused the request.
    #[error("resolution via {collaborator} failed: {reason}")]
    Resolution {
        /// Name of the collaborator (registry, rate source).
        collaborator: String,
        /// Human-readable failure reason.
        reason: String,
    },

    /// A store operation failed.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl AuditError {
    /// Build a [`AuditError::NotFound`].
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build a [`AuditError::Resolution`].
    pub fn resolution(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Resolution { .. } => "RESOLUTION_ERROR",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// Whether the failure came from an external collaborator.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}
