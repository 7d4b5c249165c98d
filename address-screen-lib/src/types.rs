//! Core data types for address screening.
//!
//! This module defines the request/response records exchanged with the
//! screening service, the per-address outcome, and the run configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Risk score levels reported by the screening service.
pub mod severity {
    pub const LOW: u32 = 1;
    pub const MEDIUM: u32 = 5;
    pub const HIGH: u32 = 10;
    pub const SEVERE: u32 = 15;
}

/// Default number of screening requests allowed in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Chain identifier sent with every address.
pub const DEFAULT_CHAIN: &str = "ethereum";

/// Path of the screening endpoint, relative to the service base URL.
pub const SCREENING_PATH: &str = "screening/addresses";

/// An Ethereum address extracted from free text.
///
/// Always `0x` followed by exactly 40 hex characters. The casing of the
/// matched text is preserved so checksummed addresses round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressKey(String);

impl AddressKey {
    /// Wrap a string that is already known to match the address pattern.
    pub(crate) fn new_unchecked(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AddressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AddressKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One entry of the body POSTed to the screening endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningRequest {
    pub address: String,
    pub chain: String,
}

/// A single risk indicator attached to a screened address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskIndicator {
    /// Numeric severity (LOW=1, MEDIUM=5, HIGH=10, SEVERE=15).
    /// Any JSON number is accepted, including `15.0` or negative values.
    pub category_risk_score_level: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_risk_score_level_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_type: Option<String>,
}

/// The first element of the service's response array.
///
/// Only `addressRiskIndicators` is required; everything else the service
/// sends is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddressScreening {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    pub address_risk_indicators: Vec<RiskIndicator>,
}

/// Classification of one address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningOutcome {
    pub address: AddressKey,
    pub risk_indicators: Vec<RiskIndicator>,
    pub blocked: bool,
}

impl ScreeningOutcome {
    /// Classify an address from its risk indicators.
    ///
    /// `blocked` is true iff at least one indicator reaches `threshold`.
    pub fn classify(
        address: AddressKey,
        risk_indicators: Vec<RiskIndicator>,
        threshold: u32,
    ) -> Self {
        let blocked = is_blocked(&risk_indicators, threshold);
        Self {
            address,
            risk_indicators,
            blocked,
        }
    }
}

/// Whether any indicator meets or exceeds the severity threshold.
pub fn is_blocked(risk_indicators: &[RiskIndicator], threshold: u32) -> bool {
    risk_indicators
        .iter()
        .any(|indicator| indicator.category_risk_score_level >= f64::from(threshold))
}

/// Configuration options for a screening run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenConfig {
    /// Maximum number of screening requests in flight
    /// Default: 10, any value of at least 1
    pub concurrency: usize,

    /// Optional per-request timeout. `None` waits as long as the service does.
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// Chain identifier sent alongside each address
    /// Default: "ethereum"
    pub chain: String,

    /// Risk level at or above which an address is blocked
    /// Default: 15 (SEVERE)
    pub severity_threshold: u32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            timeout: None,
            chain: DEFAULT_CHAIN.to_string(),
            severity_threshold: severity::SEVERE,
        }
    }
}

impl ScreenConfig {
    /// Set the concurrency limit. A limit of 0 is raised to 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the chain identifier.
    pub fn with_chain<C: Into<String>>(mut self, chain: C) -> Self {
        self.chain = chain.into();
        self
    }

    /// Set the severity threshold. A threshold of 0 is raised to 1.
    pub fn with_severity_threshold(mut self, threshold: u32) -> Self {
        self.severity_threshold = threshold.max(severity::LOW);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indicator(level: impl Into<f64>) -> RiskIndicator {
        RiskIndicator {
            category_risk_score_level: level.into(),
            category: None,
            category_risk_score_level_label: None,
            risk_type: None,
        }
    }

    fn address() -> AddressKey {
        AddressKey::new_unchecked("0x52908400098527886E0F7030069857D2E4169EE7")
    }

    #[test]
    fn test_empty_indicators_never_block() {
        let outcome = ScreeningOutcome::classify(address(), vec![], severity::SEVERE);
        assert!(!outcome.blocked);

        // Even the lowest possible threshold cannot block without indicators
        let outcome = ScreeningOutcome::classify(address(), vec![], severity::LOW);
        assert!(!outcome.blocked);
    }

    #[test]
    fn test_blocked_iff_any_indicator_reaches_threshold() {
        let below = vec![
            indicator(severity::LOW),
            indicator(severity::MEDIUM),
            indicator(severity::HIGH),
        ];
        assert!(!is_blocked(&below, severity::SEVERE));

        let mut at = below.clone();
        at.push(indicator(severity::SEVERE));
        assert!(is_blocked(&at, severity::SEVERE));

        assert!(is_blocked(&[indicator(20)], severity::SEVERE));
        assert!(is_blocked(&below, severity::HIGH));
    }

    #[test]
    fn test_non_integer_and_negative_levels() {
        assert!(is_blocked(&[indicator(15.0)], severity::SEVERE));
        assert!(is_blocked(&[indicator(15.5)], severity::SEVERE));
        assert!(!is_blocked(&[indicator(14.9)], severity::SEVERE));
        assert!(!is_blocked(&[indicator(-1)], severity::SEVERE));
        assert!(!is_blocked(&[indicator(-1)], severity::LOW));
    }

    #[test]
    fn test_level_accepts_any_json_number() {
        let json = r#"{"addressRiskIndicators": [
            {"categoryRiskScoreLevel": 15.0},
            {"categoryRiskScoreLevel": -1}
        ]}"#;
        let screening: AddressScreening = serde_json::from_str(json).unwrap();
        let levels: Vec<f64> = screening
            .address_risk_indicators
            .iter()
            .map(|i| i.category_risk_score_level)
            .collect();
        assert_eq!(levels, vec![15.0, -1.0]);

        let outcome = ScreeningOutcome::classify(
            address(),
            screening.address_risk_indicators,
            severity::SEVERE,
        );
        assert!(outcome.blocked);
    }

    #[test]
    fn test_response_element_deserializes_camel_case() {
        let json = r#"{
            "address": "0x52908400098527886e0f7030069857d2e4169ee7",
            "chain": "ethereum",
            "addressRiskIndicators": [
                {
                    "category": "Sanctions",
                    "categoryId": "69",
                    "categoryRiskScoreLevel": 15,
                    "categoryRiskScoreLevelLabel": "Severe",
                    "riskType": "OWNERSHIP",
                    "totalVolumeUsd": "1200.5"
                }
            ],
            "entities": []
        }"#;

        let screening: AddressScreening = serde_json::from_str(json).unwrap();
        assert_eq!(screening.address_risk_indicators.len(), 1);
        let ind = &screening.address_risk_indicators[0];
        assert_eq!(ind.category_risk_score_level, 15.0);
        assert_eq!(ind.category.as_deref(), Some("Sanctions"));
        assert_eq!(ind.risk_type.as_deref(), Some("OWNERSHIP"));
    }

    #[test]
    fn test_response_element_requires_indicators() {
        let json = r#"{"address": "0x52908400098527886e0f7030069857d2e4169ee7"}"#;
        assert!(serde_json::from_str::<AddressScreening>(json).is_err());
    }

    #[test]
    fn test_config_builders() {
        let config = ScreenConfig::default()
            .with_concurrency(0)
            .with_severity_threshold(0);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.severity_threshold, severity::LOW);

        // No upper cap on the limit
        let config = ScreenConfig::default().with_concurrency(5000);
        assert_eq!(config.concurrency, 5000);

        let config = ScreenConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.chain, "ethereum");
        assert_eq!(config.severity_threshold, 15);
        assert!(config.timeout.is_none());
    }
}
