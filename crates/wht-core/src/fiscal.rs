//! # Supplier Fiscal Profiles
//!
//! A [`FiscalProfile`] is everything the retention rules need to know about a
//! supplier: its primary and secondary economic activities (each carrying the
//! ISS rate that applies to it), its registration status, and its size class.
//! Profiles are built from registry responses and persisted so later audits
//! do not need another lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::SupplierId;
use crate::money::{Money, Rate};

/// One economic activity (CNAE code) with its service-tax rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicActivity {
    /// Activity code, digits only.
    pub code: String,
    /// Human-readable description.
    pub description: String,
    /// ISS rate applicable to services under this activity.
    pub rate: Rate,
}

impl EconomicActivity {
    /// Create an activity, normalizing the code.
    ///
    /// Punctuation (`.`, `-`, `/`) is stripped from the code. The remaining
    /// code must be non-empty and all digits.
    pub fn new(
        code: &str,
        description: impl Into<String>,
        rate: Rate,
    ) -> Result<Self, ValidationError> {
        let normalized: String = code
            .trim()
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | '/'))
            .collect();

        if normalized.is_empty() {
            return Err(ValidationError::InvalidActivity {
                code: code.to_string(),
                reason: "empty activity code".into(),
            });
        }
        if !normalized.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidActivity {
                code: code.to_string(),
                reason: "activity code must be numeric".into(),
            });
        }

        Ok(Self {
            code: normalized,
            description: description.into(),
            rate,
        })
    }

    /// The retention this activity's rate yields on `base`.
    pub fn retention_on(&self, base: Money) -> Money {
        base.percent(self.rate)
    }
}

/// Registration status reported by the federal registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Active,
    Suspended,
    Unfit,
    Cancelled,
    Null,
    Unknown,
}

impl RegistrationStatus {
    /// Map the registry's Portuguese status label.
    pub fn from_registry(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "ATIVA" | "ACTIVE" => Self::Active,
            "SUSPENSA" | "SUSPENDED" => Self::Suspended,
            "INAPTA" | "UNFIT" => Self::Unfit,
            "BAIXADA" | "CANCELLED" => Self::Cancelled,
            "NULA" | "NULL" => Self::Null,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Unfit => "unfit",
            Self::Cancelled => "cancelled",
            Self::Null => "null",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Company size class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeClass {
    /// Microempresa (ME).
    Micro,
    /// Empresa de pequeno porte (EPP).
    Small,
    Other,
    Unknown,
}

impl SizeClass {
    /// Map the registry's size label ("ME", "Micro Empresa", "EPP", ...).
    pub fn from_registry(label: &str) -> Self {
        let upper = label.trim().to_ascii_uppercase();
        if upper.is_empty() {
            Self::Unknown
        } else if upper == "ME" || upper.contains("MICRO") {
            Self::Micro
        } else if upper == "EPP" || upper.contains("PEQUENO") {
            Self::Small
        } else {
            Self::Other
        }
    }
}

/// A supplier's fiscal profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalProfile {
    pub supplier_id: SupplierId,
    pub legal_name: String,
    pub primary_activity: EconomicActivity,
    /// Secondary activities in registry order.
    #[serde(default)]
    pub secondary_activities: Vec<EconomicActivity>,
    pub registration_status: RegistrationStatus,
    pub capital: Money,
    pub size_class: SizeClass,
    pub resolved_at: DateTime<Utc>,
}

impl FiscalProfile {
    /// Whether the registry reports the company as active.
    pub fn is_active(&self) -> bool {
        self.registration_status == RegistrationStatus::Active
    }

    /// Secondary activities whose rate is above zero, in profile order.
    pub fn taxable_secondary(&self) -> impl Iterator<Item = &EconomicActivity> {
        self.secondary_activities
            .iter()
            .filter(|a| a.rate.is_positive())
    }
}
