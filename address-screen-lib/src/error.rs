//! Error handling for address screening operations.
//!
//! This module defines the error type shared by every layer of the library,
//! from configuration loading to per-address request failures.

use std::time::Duration;
use thiserror::Error;

/// Main error type for screening operations.
///
/// Per-address variants (`Request`, `Response`, `Timeout`) are
/// recoverable at the batch level: the runner records them as failures and
/// keeps going. `Config` and `File` are fatal at startup.
#[derive(Debug, Clone, Error)]
pub enum ScreenError {
    /// A line did not contain anything that looks like an address
    #[error("No address found in line '{line}'")]
    ExtractionMiss { line: String },

    /// Network-level failure talking to the screening service
    #[error("Request failed for '{address}': {message}")]
    Request { address: String, message: String },

    /// The service answered, but not with something we can classify
    #[error("{}", format_response_error(.address, .message, .status_code))]
    Response {
        address: String,
        message: String,
        status_code: Option<u16>,
        body: Option<String>,
    },

    /// Missing or invalid configuration (environment, config file, CLI)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// File I/O errors when reading address lists or config files
    #[error("File error at '{path}': {message}")]
    File { path: String, message: String },

    /// A request exceeded the configured per-request timeout
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },
}

fn format_response_error(address: &str, message: &str, status_code: &Option<u16>) -> String {
    match status_code {
        Some(code) => format!(
            "Unexpected response for '{}' (HTTP {}): {}",
            address, code, message
        ),
        None => format!("Unexpected response for '{}': {}", address, message),
    }
}

impl ScreenError {
    /// Create a new extraction miss for the given input line.
    pub fn extraction_miss<L: Into<String>>(line: L) -> Self {
        Self::ExtractionMiss { line: line.into() }
    }

    /// Create a new network-level request error.
    pub fn request<A: Into<String>, M: Into<String>>(address: A, message: M) -> Self {
        Self::Request {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a new response error carrying the HTTP status and raw body.
    pub fn response<A: Into<String>, M: Into<String>>(
        address: A,
        message: M,
        status_code: Option<u16>,
        body: Option<String>,
    ) -> Self {
        Self::Response {
            address: address.into(),
            message: message.into(),
            status_code,
            body,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// HTTP status of the failed response, if the service answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Raw response body, if one was read before the failure.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Response { body, .. } => body.as_deref(),
            _ => None,
        }
    }

    /// Whether this error aborts a run rather than a single address.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::File { .. })
    }
}

impl From<toml::de::Error> for ScreenError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}
