//! Typed client for the central-bank SGS time-series API.
//!
//! ## Live API Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/dados/serie/bcdata.sgs.{series}/dados/ultimos/1?formato=json` | Latest value |
//! | GET    | `/dados/serie/bcdata.sgs.{series}/dados?formato=json&dataInicial=..&dataFinal=..` | Values in a date range |
//!
//! Responses are arrays of `{"data": "dd/mm/yyyy", "valor": "11.75"}`. The
//! `valor` field is a string on the live API; some mirrors send a number.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use wht_core::BenchmarkRateSample;

use crate::error::ClientError;
use crate::retry::{send_with_retry, RetryPolicy};

const COLLABORATOR: &str = "sgs";
const SGS_DATE_FORMAT: &str = "%d/%m/%Y";

// -- Types matching the SGS schema --------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SgsValue {
    Text(String),
    Number(f64),
}

/// One row of an SGS series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SgsPoint {
    pub data: String,
    pub valor: SgsValue,
}

impl SgsPoint {
    /// Convert to a rate sample.
    pub fn to_sample(&self, endpoint: &str) -> Result<BenchmarkRateSample, ClientError> {
        let malformed = |reason: String| ClientError::Malformed {
            endpoint: endpoint.to_string(),
            reason,
        };
        let date = NaiveDate::parse_from_str(self.data.trim(), SGS_DATE_FORMAT)
            .map_err(|_| malformed(format!("invalid date \"{}\"", self.data)))?;
        let rate = match &self.valor {
            SgsValue::Number(n) => *n,
            SgsValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| malformed(format!("invalid value \"{s}\" on {}", self.data)))?,
        };
        BenchmarkRateSample::new(date, rate).map_err(|e| malformed(e.to_string()))
    }
}

/// Format a date the way SGS query parameters expect.
pub fn sgs_date(date: NaiveDate) -> String {
    date.format(SGS_DATE_FORMAT).to_string()
}

// -- Trait --------------------------------------------------------------------

/// Publisher of the benchmark interest-rate series.
#[async_trait]
pub trait BenchmarkRateSource: Send + Sync {
    /// The most recent published sample.
    async fn latest(&self) -> Result<BenchmarkRateSample, ClientError>;

    /// All samples with `from <= date <= to`, in date order.
    async fn history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BenchmarkRateSample>, ClientError>;

    fn source_name(&self) -> &str;
}

// -- Client -------------------------------------------------------------------

/// HTTP client for one SGS series.
#[derive(Debug, Clone)]
pub struct SgsRateClient {
    http: reqwest::Client,
    base_url: url::Url,
    series: u32,
    timeout_secs: u64,
    retry: RetryPolicy,
}

impl SgsRateClient {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: url::Url,
        series: u32,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            http,
            base_url,
            series,
            timeout_secs,
            retry,
        }
    }

    pub fn series(&self) -> u32 {
        self.series
    }

    fn series_url(&self) -> String {
        format!(
            "{}/dados/serie/bcdata.sgs.{}/dados",
            self.base_url.as_str().trim_end_matches('/'),
            self.series
        )
    }

    async fn fetch_points(
        &self,
        endpoint: &str,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Vec<SgsPoint>>, ClientError> {
        let resp = send_with_retry(&self.retry, endpoint, self.timeout_secs, || {
            self.http.get(url).query(query).send()
        })
        .await?;

        // SGS answers 404 when a range holds no values.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
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
            .map(Some)
            .map_err(|e| ClientError::Deserialization {
                endpoint: endpoint.into(),
                source: e,
            })
    }

    /// Latest published value.
    ///
    /// Calls `GET {base_url}/dados/serie/bcdata.sgs.{series}/dados/ultimos/1`.
    pub async fn get_latest(&self) -> Result<BenchmarkRateSample, ClientError> {
        let endpoint = "sgs GET /dados/ultimos/1";
        let url = format!("{}/ultimos/1", self.series_url());
        let points = self
            .fetch_points(endpoint, &url, &[("formato", "json".to_string())])
            .await?
            .unwrap_or_default();

        let last = points.last().ok_or_else(|| ClientError::Malformed {
            endpoint: endpoint.into(),
            reason: format!("series {} returned no values", self.series),
        })?;
        last.to_sample(endpoint)
    }

    /// Values between two dates, inclusive.
    ///
    /// Calls `GET {base_url}/dados/serie/bcdata.sgs.{series}/dados?dataInicial=..&dataFinal=..`.
    pub async fn get_history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BenchmarkRateSample>, ClientError> {
        let endpoint = "sgs GET /dados";
        if from > to {
            return Ok(Vec::new());
        }
        let query = [
            ("formato", "json".to_string()),
            ("dataInicial", sgs_date(from)),
            ("dataFinal", sgs_date(to)),
        ];
        let points = self
            .fetch_points(endpoint, &self.series_url(), &query)
            .await?
            .unwrap_or_default();

        let mut samples = points
            .iter()
            .map(|p| p.to_sample(endpoint))
            .collect::<Result<Vec<_>, _>>()?;
        samples.sort_by_key(|s| s.date);
        samples.dedup_by_key(|s| s.date);
        Ok(samples)
    }
}

#[async_trait]
impl BenchmarkRateSource for SgsRateClient {
    async fn latest(&self) -> Result<BenchmarkRateSample, ClientError> {
        self.get_latest().await
    }

    async fn history(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BenchmarkRateSample>, ClientError> {
        self.get_history(from, to).await
    }

    fn source_name(&self) -> &str {
        COLLABORATOR
    }
}
