//! # Address Screen Library
//!
//! Batch screening of Ethereum addresses against a compliance risk API.
//!
//! Addresses are pulled out of free-form lines of text, sent to the
//! screening service with a fixed ceiling on in-flight requests, and
//! classified as blocked when any risk indicator reaches the severity
//! threshold. Results are aggregated in completion order.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use address_screen_lib::{extract_addresses, AddressScreener, ScreenConfig, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ServiceConfig::from_env()?;
//!     let config = ScreenConfig::default().with_concurrency(20);
//!     let screener = AddressScreener::from_service(&service, config)?;
//!
//!     let input = std::fs::read_to_string("addresses.txt")?;
//!     let extraction = extract_addresses(input.lines());
//!     let summary = screener.screen_addresses(extraction.addresses).await;
//!
//!     println!("{}", summary.not_blocked_report());
//!     Ok(())
//! }
//! ```

// Re-export main public API types and functions
pub use checker::AddressScreener;
pub use concurrent::ConcurrentProcessor;
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, validate_concurrency,
    ConfigManager, DefaultsConfig, EnvConfig, FileConfig, ServiceConfig, API_KEY_VAR,
    BASE_URL_VAR,
};
pub use error::ScreenError;
pub use protocols::{
    parse_screening_response, screening_endpoint, RawResponse, ScreeningClient,
    ScreeningTransport,
};
pub use summary::{Progress, RunSummary, ScreeningEvent, ScreeningFailure};
pub use types::{
    is_blocked, severity, AddressKey, AddressScreening, RiskIndicator, ScreenConfig,
    ScreeningOutcome, ScreeningRequest, DEFAULT_CHAIN, DEFAULT_CONCURRENCY, SCREENING_PATH,
};
pub use utils::{extract_address, extract_addresses, Extraction};

// Internal modules - these are not part of the public API
mod checker;
mod concurrent;
mod config;
mod error;
mod protocols;
mod summary;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ScreenError>;
