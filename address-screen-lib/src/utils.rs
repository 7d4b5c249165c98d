//! Utility functions for pulling addresses out of free-form input.

use crate::error::ScreenError;
use crate::types::AddressKey;
use regex::Regex;

lazy_static::lazy_static! {
    static ref ADDRESS_PATTERN: Regex =
        Regex::new(r"0x[0-9a-fA-F]{40}").expect("address pattern is a valid regex");
}

/// Extract the first address found in a line of text.
///
/// The match is not anchored: `0x` followed by forty hex digits anywhere in
/// the line counts, including inside longer tokens.
///
/// # Errors
///
/// Returns `ScreenError::ExtractionMiss` naming the line when nothing matches.
pub fn extract_address(line: &str) -> Result<AddressKey, ScreenError> {
    ADDRESS_PATTERN
        .find(line)
        .map(|m| AddressKey::new_unchecked(m.as_str()))
        .ok_or_else(|| ScreenError::extraction_miss(line))
}

/// Result of scanning a whole input for addresses.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Addresses in input order, one per matching line
    pub addresses: Vec<AddressKey>,
    /// Lines that produced no address (trimmed)
    pub skipped: Vec<String>,
}

/// Extract one address per line, keeping input order.
///
/// Lines are trimmed first. Blank lines are logged at `debug` and dropped;
/// any other line without an address is reported in `skipped` and logged at
/// `warn`.
pub fn extract_addresses<I, S>(lines: I) -> Extraction
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut extraction = Extraction::default();

    for (index, line) in lines.into_iter().enumerate() {
        let trimmed = line.as_ref().trim();
        if trimmed.is_empty() {
            tracing::debug!("No address found in blank line {}", index + 1);
            continue;
        }

        match extract_address(trimmed) {
            Ok(address) => extraction.addresses.push(address),
            Err(e) => {
                tracing::warn!("{}", e);
                extraction.skipped.push(trimmed.to_string());
            }
        }
    }

    extraction
}
