//! Typed client for the CNPJ fiscal registry.
//!
//! ## Live API Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/cnpj/{cnpj}` | Company record by 14-digit CNPJ |
//!
//! The registry publishes activity codes but no service-tax rates. Rates are
//! attached from the configured activity table when the record is mapped to
//! a [`FiscalProfile`]; a record that does carry an `aliquota` per activity
//! uses it instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use wht_core::{
    EconomicActivity, FiscalProfile, Money, Rate, RegistrationStatus, ResolverConfig, SizeClass,
    SupplierId, ValidationError,
};

use crate::error::ClientError;
use crate::retry::{send_with_retry, RetryPolicy};

const COLLABORATOR: &str = "cnpj-registry";

// -- Types matching the registry schema ---------------------------------------

/// One activity as published by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryActivity {
    pub codigo: String,
    #[serde(default)]
    pub descricao: String,
    /// Service-tax rate in percent, when the registry tier provides one.
    #[serde(default)]
    pub aliquota: Option<String>,
}

/// Company record as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryCompany {
    pub cnpj: String,
    pub razao_social: String,
    #[serde(default)]
    pub nome_fantasia: Option<String>,
    pub atividade_principal: RegistryActivity,
    #[serde(default)]
    pub atividades_secundarias: Vec<RegistryActivity>,
    #[serde(default)]
    pub situacao_cadastral: Option<String>,
    #[serde(default)]
    pub capital_social: Option<String>,
    #[serde(default)]
    pub porte: Option<String>,
    #[serde(default)]
    pub municipio: Option<String>,
    #[serde(default)]
    pub uf: Option<String>,
}

impl RegistryCompany {
    /// Map the record to a profile for `expected`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MalformedResponse`] when the record belongs to a
    /// different CNPJ, carries a negative or unparseable rate or capital, and
    /// [`ValidationError::InvalidActivity`] for empty or non-numeric codes.
    pub fn to_profile(
        &self,
        expected: &SupplierId,
        rates: &ResolverConfig,
        resolved_at: DateTime<Utc>,
    ) -> Result<FiscalProfile, ValidationError> {
        let malformed = |reason: String| ValidationError::MalformedResponse {
            collaborator: COLLABORATOR.to_string(),
            reason,
        };

        let returned = SupplierId::new(self.cnpj.as_str())
            .map_err(|_| malformed(format!("invalid CNPJ \"{}\" in response", self.cnpj)))?;
        if &returned != expected {
            return Err(malformed(format!(
                "requested {expected}, registry answered for {returned}"
            )));
        }

        let activity = |a: &RegistryActivity| -> Result<EconomicActivity, ValidationError> {
            let mut mapped = EconomicActivity::new(&a.codigo, a.descricao.clone(), Rate::ZERO)?;
            mapped.rate = match &a.aliquota {
                Some(raw) => Rate::parse(raw).map_err(|_| {
                    malformed(format!("invalid rate \"{raw}\" for activity {}", a.codigo))
                })?,
                None => rates.rate_for(&mapped.code),
            };
            Ok(mapped)
        };

        let primary_activity = activity(&self.atividade_principal)?;
        let secondary_activities = self
            .atividades_secundarias
            .iter()
            .map(activity)
            .collect::<Result<Vec<_>, _>>()?;

        let capital = match self.capital_social.as_deref().map(str::trim) {
            None | Some("") => Money::ZERO,
            Some(raw) => {
                let value = Money::parse(raw)
                    .map_err(|_| malformed(format!("invalid capital \"{raw}\"")))?;
                if value.is_negative() {
                    return Err(malformed(format!("negative capital {value}")));
                }
                value
            }
        };

        Ok(FiscalProfile {
            supplier_id: returned,
            legal_name: self.razao_social.trim().to_string(),
            primary_activity,
            secondary_activities,
            registration_status: self
                .situacao_cadastral
                .as_deref()
                .map_or(RegistrationStatus::Unknown, RegistrationStatus::from_registry),
            capital,
            size_class: self
                .porte
                .as_deref()
                .map_or(SizeClass::Unknown, SizeClass::from_registry),
            resolved_at,
        })
    }
}

// -- Trait --------------------------------------------------------------------

/// Source of company records.
///
/// Implementations must be `Send + Sync` so they can be shared across
/// async tasks behind an `Arc`. The trait is object-safe to support
/// runtime selection (mock vs. live).
#[async_trait]
pub trait FiscalRegistry: Send + Sync {
    async fn lookup(&self, id: &SupplierId) -> Result<RegistryCompany, ClientError>;

    /// Human-readable name of the implementation.
    fn registry_name(&self) -> &str;
}

// -- Client -------------------------------------------------------------------

/// HTTP client for the CNPJ registry.
#[derive(Debug, Clone)]
pub struct CnpjRegistryClient {
    http: reqwest::Client,
    base_url: url::Url,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl CnpjRegistryClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: url::Url,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            timeout_secs,
            retry,
        }
    }

    /// Fetch a company record.
    ///
    /// Calls `GET {base_url}/cnpj/{cnpj}`.
    pub async fn get_company(&self, id: &SupplierId) -> Result<RegistryCompany, ClientError> {
        let endpoint = "cnpj-registry GET /cnpj";
        let url = format!(
            "{}/cnpj/{}",
            self.base_url.as_str().trim_end_matches('/'),
            id.as_str()
        );

        let resp = send_with_retry(&self.retry, endpoint, self.timeout_secs, || {
            self.http
                .get(&url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
        })
        .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ClientError::NotFound {
                endpoint: endpoint.into(),
                key: id.to_string(),
            });
        }

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read response body: {e}>"));
            return Err(ClientError::ApiError {
                endpoint: endpoint.into(),
                status,
                body,
            });
        }

        resp.json()
            .await
            .map_err(|e| ClientError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }
}

#[async_trait]
impl FiscalRegistry for CnpjRegistryClient {
    async fn lookup(&self, id: &SupplierId) -> Result<RegistryCompany, ClientError> {
        self.get_company(id).await
    }

    fn registry_name(&self) -> &str {
        COLLABORATOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> RegistryCompany {
        serde_json::from_value(serde_json::json!({
            "cnpj": "11222333000181",
            "razao_social": "ACME SERVICOS LTDA ",
            "atividade_principal": { "codigo": "62.01-5-01", "descricao": "Software sob encomenda" },
            "atividades_secundarias": [
                { "codigo": "6202300", "descricao": "Consultoria", "aliquota": "2.00" },
                { "codigo": "7490104", "descricao": "Intermediacao" }
            ],
            "situacao_cadastral": "Ativa",
            "capital_social": "50000.00",
            "porte": "Micro Empresa"
        }))
        .unwrap()
    }

    fn supplier() -> SupplierId {
        SupplierId::new("11222333000181").unwrap()
    }

    #[test]
    fn maps_record_to_profile() {
        let mut cfg = ResolverConfig::default();
        cfg.activity_rates.insert("6201501".into(), Rate::from_bps(300));

        let profile = record().to_profile(&supplier(), &cfg, Utc::now()).unwrap();
        assert_eq!(profile.legal_name, "ACME SERVICOS LTDA");
        assert_eq!(profile.primary_activity.code, "6201501");
        assert_eq!(profile.primary_activity.rate, Rate::from_bps(300));
        assert_eq!(profile.secondary_activities[0].rate, Rate::from_bps(200));
        // falls back to the default activity rate
        assert_eq!(profile.secondary_activities[1].rate, Rate::from_bps(500));
        assert_eq!(profile.registration_status, RegistrationStatus::Active);
        assert_eq!(profile.size_class, SizeClass::Micro);
        assert_eq!(profile.capital, Money::from_units(50_000));
    }

    #[test]
    fn rejects_cnpj_mismatch() {
        let other = SupplierId::new("00000000000191").unwrap();
        let err = record()
            .to_profile(&other, &ResolverConfig::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedResponse { .. }));
    }

    #[test]
    fn rejects_non_numeric_activity_code() {
        let mut r = record();
        r.atividade_principal.codigo = "abc".into();
        let err = r
            .to_profile(&supplier(), &ResolverConfig::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidActivity { .. }));
    }

    #[test]
    fn rejects_empty_activity_code() {
        let mut r = record();
        r.atividades_secundarias[1].codigo = "".into();
        assert!(r
            .to_profile(&supplier(), &ResolverConfig::default(), Utc::now())
            .is_err());
    }

    #[test]
    fn rejects_negative_rate() {
        let mut r = record();
        r.atividades_secundarias[0].aliquota = Some("-2.00".into());
        let err = r
            .to_profile(&supplier(), &ResolverConfig::default(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedResponse { .. }));
    }
}
