//! HTTP client for the compliance screening API.
//!
//! One POST per address to `<base-url>/screening/addresses` with the API key
//! sent verbatim in the `Authorization` header. The service answers with a
//! JSON array; only its first element is used.

use crate::config::ServiceConfig;
use crate::error::ScreenError;
use crate::protocols::{RawResponse, ScreeningTransport};
use crate::types::{AddressKey, AddressScreening, ScreeningRequest, SCREENING_PATH};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use std::fmt;
use std::time::Duration;

/// Build the full endpoint URL from a service base URL.
///
/// Trailing slashes on the base are ignored, so `https://api.example/public/v2`
/// and `https://api.example/public/v2/` give the same endpoint.
pub fn screening_endpoint(base_url: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), SCREENING_PATH)
}

/// Screening API client.
///
/// Wraps a single `reqwest::Client`, so every request shares one
/// connection pool. Cloning is cheap.
#[derive(Clone)]
pub struct ScreeningClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout: Option<Duration>,
}

impl ScreeningClient {
    /// Create a client with no request timeout.
    pub fn new(service: &ServiceConfig) -> Result<Self, ScreenError> {
        Self::with_config(service, None)
    }

    /// Create a client with an optional per-request timeout.
    pub fn with_config(
        service: &ServiceConfig,
        timeout: Option<Duration>,
    ) -> Result<Self, ScreenError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let http_client = builder.build().map_err(|e| {
            ScreenError::config(format!("Failed to create screening HTTP client: {}", e))
        })?;

        Ok(Self {
            http_client,
            endpoint: screening_endpoint(&service.base_url),
            api_key: service.api_key.clone(),
            timeout,
        })
    }

    /// The full URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for ScreeningClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreeningClient")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl ScreeningTransport for ScreeningClient {
    async fn post_screening(
        &self,
        address: &AddressKey,
        chain: &str,
    ) -> Result<RawResponse, ScreenError> {
        let payload = [ScreeningRequest {
            address: address.to_string(),
            chain: chain.to_string(),
        }];

        tracing::debug!(address = %address, endpoint = %self.endpoint, "sending screening request");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(AUTHORIZATION, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.transport_error(address, e))?;

        let status = response.status().as_u16();
        tracing::debug!(address = %address, status, "screening response received");

        let body = response.text().await.map_err(|e| {
            ScreenError::response(
                address.as_str(),
                format!("Failed to read response body: {}", e),
                Some(status),
                None,
            )
        })?;

        Ok(RawResponse { status, body })
    }
}

impl ScreeningClient {
    fn transport_error(&self, address: &AddressKey, err: reqwest::Error) -> ScreenError {
        match self.timeout {
            Some(duration) if err.is_timeout() => {
                ScreenError::timeout(format!("screening request for {}", address), duration)
            }
            _ => ScreenError::request(address.as_str(), err.to_string()),
        }
    }
}

/// Turn a raw response into the screening record for `address`.
///
/// # Errors
///
/// Returns `ScreenError::Response`, carrying the status and the raw body, when:
/// - the status is not 2xx
/// - the body is not a JSON array of screening records
/// - the array is empty
/// - the first record lacks `addressRiskIndicators` or a numeric
///   `categoryRiskScoreLevel`
pub fn parse_screening_response(
    address: &AddressKey,
    raw: RawResponse,
) -> Result<AddressScreening, ScreenError> {
    if !raw.is_success() {
        return Err(ScreenError::response(
            address.as_str(),
            "Screening service returned an error status",
            Some(raw.status),
            Some(raw.body),
        ));
    }

    let records: Vec<AddressScreening> = match serde_json::from_str(&raw.body) {
        Ok(records) => records,
        Err(e) => {
            return Err(ScreenError::response(
                address.as_str(),
                format!("Failed to parse JSON: {}", e),
                Some(raw.status),
                Some(raw.body),
            ))
        }
    };

    match records.into_iter().next() {
        Some(record) => Ok(record),
        None => Err(ScreenError::response(
            address.as_str(),
            "Empty response array",
            Some(raw.status),
            Some(raw.body),
        )),
    }
}
