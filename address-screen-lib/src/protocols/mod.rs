//! Protocol implementations for talking to the screening service.
//!
//! The runner only sees the [`ScreeningTransport`] trait, so tests can swap
//! the HTTP client for an in-process fake.

/// HTTP client for the `/screening/addresses` endpoint
pub mod screening;

use crate::error::ScreenError;
use crate::types::AddressKey;
use async_trait::async_trait;

pub use screening::{parse_screening_response, screening_endpoint, ScreeningClient};

/// Status line and body of a screening response, before any parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new<B: Into<String>>(status: u16, body: B) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one screening request and hands back the raw response.
///
/// Implementations report transport failures (connect, timeout, body read)
/// as errors; anything the service actually answered, whatever the status,
/// comes back as a `RawResponse`.
#[async_trait]
pub trait ScreeningTransport: Send + Sync {
    async fn post_screening(
        &self,
        address: &AddressKey,
        chain: &str,
    ) -> Result<RawResponse, ScreenError>;
}
