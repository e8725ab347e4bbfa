//! # Identity Newtypes
//!
//! Each identifier is a distinct type: a [`ClientId`] cannot be passed where a
//! [`PaymentId`] is expected.
//!
//! ## Validation
//!
//! [`SupplierId`] wraps a Brazilian CNPJ (Cadastro Nacional da Pessoa
//! Jurídica) and verifies both check digits at construction. UUID-based
//! identifiers are always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// UUID-based identifiers
// ---------------------------------------------------------------------------

/// Identifier of the client whose payments are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a client identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a client identifier from its string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(s.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ClientId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Identifier of a single supplier payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Create a new random payment identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a payment identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Parse a payment identifier from its string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidId(s.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PaymentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Supplier identifier (validated CNPJ)
// ---------------------------------------------------------------------------

const CNPJ_WEIGHTS: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

/// A supplier's national tax identifier (CNPJ).
///
/// The canonical form is 14 digits without punctuation. The constructor
/// accepts both `"11222333000181"` and `"11.222.333/0001-81"`.
///
/// # Validation
///
/// - Exactly 14 digits after stripping `.`, `/` and `-`
/// - Not all digits equal (`00000000000000` passes the checksum but is not issued)
/// - Both modulo-11 check digits match
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SupplierId(String);

impl SupplierId {
    /// Create a supplier identifier, validating the CNPJ.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCnpj`] if the format or the check
    /// digits are wrong.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = value.into();
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, '.' | '/' | '-' | ' '))
            .collect();

        if digits.len() != 14 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCnpj(raw));
        }

        let nums: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
        if nums.iter().all(|d| *d == nums[0]) {
            return Err(ValidationError::InvalidCnpj(raw));
        }

        let first = cnpj_check_digit(&nums[..12], &CNPJ_WEIGHTS[1..]);
        let second = cnpj_check_digit(&nums[..13], &CNPJ_WEIGHTS);
        if nums[12] != first || nums[13] != second {
            return Err(ValidationError::InvalidCnpj(raw));
        }

        Ok(Self(digits))
    }

    /// Access the canonical 14-digit string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the punctuated display form `XX.XXX.XXX/XXXX-XX`.
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}.{}.{}/{}-{}",
            &d[0..2],
            &d[2..5],
            &d[5..8],
            &d[8..12],
            &d[12..14]
        )
    }
}

fn cnpj_check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

impl TryFrom<String> for SupplierId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SupplierId> for String {
    fn from(id: SupplierId) -> Self {
        id.0
    }
}

impl std::fmt::Display for SupplierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SupplierId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
