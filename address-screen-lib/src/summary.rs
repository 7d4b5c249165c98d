//! Run aggregation.
//!
//! A [`RunSummary`] is built by the single loop that consumes screening
//! events, so it needs no synchronization.

use crate::error::ScreenError;
use crate::types::{AddressKey, ScreeningOutcome};
use serde::Serialize;

/// An address that could not be classified.
#[derive(Debug, Clone)]
pub struct ScreeningFailure {
    pub address: AddressKey,
    pub error: ScreenError,
}

/// What came back for one admitted address.
#[derive(Debug, Clone)]
pub enum ScreeningEvent {
    Screened(ScreeningOutcome),
    Failed(ScreeningFailure),
}

impl ScreeningEvent {
    pub fn address(&self) -> &AddressKey {
        match self {
            ScreeningEvent::Screened(outcome) => &outcome.address,
            ScreeningEvent::Failed(failure) => &failure.address,
        }
    }
}

/// Completed / total counter passed to progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

/// Aggregate result of a screening run.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunSummary {
    /// Addresses handed to the run
    pub total: usize,
    pub blocked_count: usize,
    pub not_blocked_count: usize,
    pub failed_count: usize,
    /// Not-blocked addresses, in completion order
    pub not_blocked: Vec<AddressKey>,
    /// Addresses whose request failed, in completion order
    pub failed: Vec<AddressKey>,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Fold one event into the counts.
    pub fn record(&mut self, event: &ScreeningEvent) {
        match event {
            ScreeningEvent::Screened(outcome) if outcome.blocked => {
                self.blocked_count += 1;
            }
            ScreeningEvent::Screened(outcome) => {
                self.not_blocked_count += 1;
                self.not_blocked.push(outcome.address.clone());
            }
            ScreeningEvent::Failed(failure) => {
                self.failed_count += 1;
                self.failed.push(failure.address.clone());
            }
        }
    }

    /// Addresses that produced any event.
    pub fn completed(&self) -> usize {
        self.blocked_count + self.not_blocked_count + self.failed_count
    }

    /// Addresses never admitted because the run was stopped early.
    pub fn not_screened(&self) -> usize {
        self.total.saturating_sub(self.completed())
    }

    /// True when some address ended up neither blocked nor not-blocked.
    pub fn has_failures(&self) -> bool {
        self.failed_count > 0 || self.not_screened() > 0
    }

    /// Newline-joined not-blocked addresses, one per line.
    pub fn not_blocked_report(&self) -> String {
        self.not_blocked
            .iter()
            .map(AddressKey::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.completed(),
            total: self.total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{severity, RiskIndicator};
    use crate::utils::extract_address;

    fn key(c: char) -> AddressKey {
        extract_address(&format!("0x{}", c.to_string().repeat(40))).unwrap()
    }

    fn screened(c: char, blocked: bool) -> ScreeningEvent {
        let indicators = if blocked {
            vec![RiskIndicator {
                category_risk_score_level: f64::from(severity::SEVERE),
                category: Some("Sanctions".to_string()),
                category_risk_score_level_label: None,
                risk_type: None,
            }]
        } else {
            vec![]
        };
        ScreeningEvent::Screened(ScreeningOutcome::classify(
            key(c),
            indicators,
            severity::SEVERE,
        ))
    }

    fn failed(c: char) -> ScreeningEvent {
        ScreeningEvent::Failed(ScreeningFailure {
            address: key(c),
            error: ScreenError::request(key(c).as_str(), "connection reset"),
        })
    }

    #[test]
    fn test_record_counts_each_event_once() {
        let mut summary = RunSummary::new(4);
        for event in [
            screened('a', false),
            screened('b', true),
            failed('c'),
            screened('d', false),
        ] {
            summary.record(&event);
        }

        assert_eq!(summary.not_blocked_count, 2);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(summary.failed_count, 1);
        assert_eq!(summary.completed(), 4);
        assert_eq!(summary.not_screened(), 0);
        assert_eq!(summary.not_blocked, vec![key('a'), key('d')]);
        assert_eq!(summary.failed, vec![key('c')]);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_not_blocked_report_is_newline_joined() {
        let mut summary = RunSummary::new(2);
        summary.record(&screened('a', false));
        summary.record(&screened('b', false));

        assert_eq!(
            summary.not_blocked_report(),
            format!("0x{}\n0x{}", "a".repeat(40), "b".repeat(40))
        );
        assert!(!summary.has_failures());
    }

    #[test]
    fn test_not_screened_counts_unadmitted() {
        let mut summary = RunSummary::new(5);
        summary.record(&screened('a', true));
        assert_eq!(summary.not_screened(), 4);
        assert!(summary.has_failures());
        assert_eq!(summary.progress(), Progress { completed: 1, total: 5 });
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunSummary::new(0);
        assert_eq!(summary.not_blocked_report(), "");
        assert!(!summary.has_failures());
    }
}
