//! IslamicAPI zakat-nisab client
//!
//! Fetches live nisab thresholds for a currency and calculation standard. Any
//! failure is reported as an [`UpstreamError`]; the caller decides how to degrade.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use super::{CacheKey, NisabEntry};

/// Base URL for the IslamicAPI nisab endpoint
pub const ISLAMIC_API_BASE_URL: &str = "https://islamicapi.com/api/v1/zakat-nisab/";

/// Weight unit requested from the upstream
const WEIGHT_UNIT: &str = "g";

/// Errors that can occur when fetching nisab data
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request did not complete within the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Upstream answered with a non-200 status
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),

    /// Body is not valid JSON or does not match the nisab schema
    #[error("failed to parse response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Body carried a `code` other than 200, or none at all
    #[error("unsuccessful response code: {0:?}")]
    Unsuccessful(Option<i64>),
}

/// Client for the IslamicAPI nisab endpoint
#[derive(Debug, Clone)]
pub struct IslamicApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl IslamicApiClient {
    /// Creates a client with a per-request timeout.
    ///
    /// # Arguments
    /// * `base_url` - Endpoint URL, query parameters are appended
    /// * `api_key` - Credential sent as the `api_key` parameter
    /// * `timeout` - Upper bound for the whole request, including reading the body
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches nisab thresholds for `key`
    ///
    /// # Returns
    /// * `Ok(NisabEntry)` - a complete entry, header fields filled from `key` if absent
    /// * `Err(UpstreamError)` - on timeout, transport error, non-200 status,
    ///   or a body without `code: 200` and a valid `data.nisab_thresholds`
    pub async fn fetch(&self, key: &CacheKey) -> Result<NisabEntry, UpstreamError> {
        let currency = key.currency.code().to_lowercase();
        debug!(url = %self.base_url, currency = %currency, standard = %key.standard, "calling IslamicAPI");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("standard", key.standard.as_str()),
                ("currency", currency.as_str()),
                ("unit", WEIGHT_UNIT),
                ("api_key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpstreamError::Status(status));
        }

        let text = response.text().await.map_err(|e| self.classify(e))?;
        parse_body(&text, key)
    }

    fn classify(&self, error: reqwest::Error) -> UpstreamError {
        if error.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            UpstreamError::RequestFailed(error)
        }
    }
}

/// Validates an upstream body and converts it into a complete entry
fn parse_body(text: &str, key: &CacheKey) -> Result<NisabEntry, UpstreamError> {
    let value: Value = serde_json::from_str(text)?;
    let code = value.get("code").and_then(Value::as_i64);
    if code != Some(200) {
        return Err(UpstreamError::Unsuccessful(code));
    }

    let mut entry: NisabEntry = serde_json::from_value(value)?;
    entry.complete_with(key, &Utc::now().to_rfc3339());
    Ok(entry)
}
