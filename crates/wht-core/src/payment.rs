//! # Payments and Retention Entries
//!
//! A [`Payment`] is one supplier invoice paid by a client. Its `retentions`
//! list is replaced wholesale on every audit pass; the net amount is never
//! stored and is always `gross - Σ retention.amount`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;
use crate::identity::{ClientId, PaymentId, SupplierId};
use crate::money::{Money, Rate};

// ---------------------------------------------------------------------------
// Tax types
// ---------------------------------------------------------------------------

/// Withholding tax tag.
///
/// Serialized as its tag string (`"ISS"`, `"IRRF"`, `"ISS-6201501"`) so it
/// can key JSON maps.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaxType {
    /// Municipal service tax on the primary activity.
    Iss,
    /// Municipal service tax on a secondary activity, by activity code.
    SecondaryIss(String),
    /// Federal income tax withheld at source.
    Irrf,
    Csll,
    Cofins,
    Pis,
    /// Social security withholding.
    Inss,
}

impl TaxType {
    /// Parse a tag. `"IR"` is accepted as an alias of `"IRRF"`.
    pub fn parse(tag: &str) -> Result<Self, ValidationError> {
        let t = tag.trim();
        match t.to_ascii_uppercase().as_str() {
            "ISS" => Ok(Self::Iss),
            "IRRF" | "IR" => Ok(Self::Irrf),
            "CSLL" => Ok(Self::Csll),
            "COFINS" => Ok(Self::Cofins),
            "PIS" => Ok(Self::Pis),
            "INSS" => Ok(Self::Inss),
            upper => match upper.strip_prefix("ISS-") {
                Some(code) if !code.is_empty() => Ok(Self::SecondaryIss(t[4..].to_string())),
                _ => Err(ValidationError::UnknownTaxType(tag.to_string())),
            },
        }
    }

    /// The tag string.
    pub fn tag(&self) -> String {
        match self {
            Self::Iss => "ISS".into(),
            Self::SecondaryIss(code) => format!("ISS-{code}"),
            Self::Irrf => "IRRF".into(),
            Self::Csll => "CSLL".into(),
            Self::Cofins => "COFINS".into(),
            Self::Pis => "PIS".into(),
            Self::Inss => "INSS".into(),
        }
    }
}

impl std::fmt::Display for TaxType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag())
    }
}

impl std::str::FromStr for TaxType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TaxType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for TaxType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TaxType::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Retention entries
// ---------------------------------------------------------------------------

/// One withholding applied to a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionEntry {
    pub tax: TaxType,
    pub rate: Rate,
    pub amount: Money,
}

impl RetentionEntry {
    /// Compute `base × rate / 100`, truncated to the cent.
    pub fn compute(tax: TaxType, rate: Rate, base: Money) -> Self {
        Self {
            tax,
            rate,
            amount: base.percent(rate),
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Lifecycle state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processed,
    Audited,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Audited => "audited",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processed" => Ok(Self::Processed),
            "audited" => Ok(Self::Audited),
            other => Err(ValidationError::InvalidFilter(format!(
                "unknown payment status \"{other}\""
            ))),
        }
    }
}

/// A supplier payment made by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub supplier_id: SupplierId,
    pub client_id: ClientId,
    pub gross: Money,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub retentions: Vec<RetentionEntry>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment with no retentions.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NegativeAmount`] if `gross` is negative.
    pub fn new(
        supplier_id: SupplierId,
        client_id: ClientId,
        gross: Money,
        due_date: NaiveDate,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if gross.is_negative() {
            return Err(ValidationError::NegativeAmount {
                field: "gross".into(),
                value: gross.to_string(),
            });
        }
        Ok(Self {
            id: PaymentId::new(),
            supplier_id,
            client_id,
            gross,
            due_date,
            paid_date: None,
            description: description.into(),
            retentions: Vec::new(),
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace the recorded retentions, keeping status untouched.
    pub fn with_retentions(mut self, retentions: Vec<RetentionEntry>) -> Self {
        self.retentions = retentions;
        self
    }

    /// Sum of all recorded retention amounts.
    pub fn total_retained(&self) -> Money {
        self.retentions.iter().map(|r| r.amount).sum()
    }

    /// `gross - Σ retention.amount`.
    pub fn net(&self) -> Money {
        self.gross - self.total_retained()
    }

    /// Whether the payment has been settled.
    pub fn is_paid(&self) -> bool {
        self.paid_date.is_some()
    }

    /// The audited version of this payment: retentions swapped for
    /// `computed`, status `audited`.
    pub fn with_audit(&self, computed: Vec<RetentionEntry>, now: DateTime<Utc>) -> Self {
        Self {
            retentions: computed,
            status: PaymentStatus::Audited,
            updated_at: now,
            ..self.clone()
        }
    }

    /// The processed version of this payment.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTransition`] for audited payments.
    pub fn with_processed(
        &self,
        retentions: Vec<RetentionEntry>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if self.status == PaymentStatus::Audited {
            return Err(ValidationError::InvalidTransition {
                from: self.status.to_string(),
                to: PaymentStatus::Processed.to_string(),
            });
        }
        Ok(Self {
            retentions,
            status: PaymentStatus::Processed,
            updated_at: now,
            ..self.clone()
        })
    }
}
