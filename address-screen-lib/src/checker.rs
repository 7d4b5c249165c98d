//! Main screening orchestration.
//!
//! `AddressScreener` ties together the transport, the classification rule
//! and the bounded fan-out, and folds results into a [`RunSummary`].

use crate::concurrent::ConcurrentProcessor;
use crate::config::ServiceConfig;
use crate::error::ScreenError;
use crate::protocols::{parse_screening_response, ScreeningClient, ScreeningTransport};
use crate::summary::{Progress, RunSummary, ScreeningEvent, ScreeningFailure};
use crate::types::{AddressKey, ScreenConfig, ScreeningOutcome};
use futures::future::{self, Future};
use futures::stream::{BoxStream, StreamExt};

/// Screens addresses against a compliance service.
///
/// # Example
///
/// ```rust,no_run
/// use address_screen_lib::{AddressScreener, ScreenConfig, ServiceConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = ServiceConfig::from_env()?;
///     let screener = AddressScreener::from_service(&service, ScreenConfig::default())?;
///
///     let extraction =
///         address_screen_lib::extract_addresses(["0x52908400098527886E0F7030069857D2E4169EE7"]);
///     let summary = screener.screen_addresses(extraction.addresses).await;
///     println!("{} not blocked, {} blocked", summary.not_blocked_count, summary.blocked_count);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AddressScreener<T = ScreeningClient> {
    config: ScreenConfig,
    transport: T,
}

impl AddressScreener<ScreeningClient> {
    /// Create a screener backed by the HTTP client.
    pub fn from_service(
        service: &ServiceConfig,
        config: ScreenConfig,
    ) -> Result<Self, ScreenError> {
        let transport = ScreeningClient::with_config(service, config.timeout)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: ScreeningTransport> AddressScreener<T> {
    /// Create a screener over any transport.
    pub fn with_transport(transport: T, config: ScreenConfig) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Screen a single address.
    ///
    /// # Errors
    ///
    /// Returns `ScreenError` if the request fails or the response cannot be
    /// classified.
    pub async fn screen_address(
        &self,
        address: &AddressKey,
    ) -> Result<ScreeningOutcome, ScreenError> {
        let raw = self
            .transport
            .post_screening(address, &self.config.chain)
            .await?;
        let record = parse_screening_response(address, raw)?;

        Ok(ScreeningOutcome::classify(
            address.clone(),
            record.address_risk_indicators,
            self.config.severity_threshold,
        ))
    }

    /// Screen one address, turning any failure into a logged event.
    async fn screen_event(&self, address: AddressKey) -> ScreeningEvent {
        match self.screen_address(&address).await {
            Ok(outcome) => ScreeningEvent::Screened(outcome),
            Err(error) => {
                tracing::error!(
                    address = %address,
                    status = ?error.status_code(),
                    body = error.body().unwrap_or("<none>"),
                    "Error with address {}: {}",
                    address,
                    error
                );
                ScreeningEvent::Failed(ScreeningFailure { address, error })
            }
        }
    }

    /// Screen addresses concurrently, yielding events in completion order.
    ///
    /// At most `config.concurrency` requests are outstanding at any time.
    /// When `shutdown` resolves, no new addresses are admitted; requests
    /// already in flight still complete and are yielded.
    pub fn screen_stream<'a, S>(
        &'a self,
        addresses: Vec<AddressKey>,
        shutdown: S,
    ) -> BoxStream<'a, ScreeningEvent>
    where
        S: Future<Output = ()> + Send + 'a,
    {
        ConcurrentProcessor::new(self.config.concurrency).process(
            addresses,
            shutdown,
            move |address| self.screen_event(address),
        )
    }

    /// Screen addresses and aggregate the results.
    ///
    /// `on_event` is called once per completed address, after it has been
    /// folded into the summary.
    pub async fn screen_all<'a, S, F>(
        &'a self,
        addresses: Vec<AddressKey>,
        shutdown: S,
        mut on_event: F,
    ) -> RunSummary
    where
        S: Future<Output = ()> + Send + 'a,
        F: FnMut(&ScreeningEvent, Progress),
    {
        let mut summary = RunSummary::new(addresses.len());
        let mut events = self.screen_stream(addresses, shutdown);

        while let Some(event) = events.next().await {
            summary.record(&event);
            on_event(&event, summary.progress());
        }

        if summary.not_screened() > 0 {
            tracing::warn!(
                "Run stopped early: {} address(es) were not screened",
                summary.not_screened()
            );
        }

        summary
    }

    /// Screen addresses to completion with no progress callback.
    pub async fn screen_addresses(&self, addresses: Vec<AddressKey>) -> RunSummary {
        self.screen_all(addresses, future::pending(), |_, _| {}).await
    }
}
