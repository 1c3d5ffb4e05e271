//! Value helpers for exchange amounts.
//!
//! Amounts travel as `Decimal`; raw user input and wire payloads travel as
//! strings. These helpers are the only place the two meet.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Domain errors for value parsing and validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Amount string could not be parsed
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Currency code is empty or unknown
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Offer request url does not carry an id
    #[error("Invalid offer request: {0}")]
    InvalidOfferRequest(String),
}

/// Parse a decimal amount.
///
/// A trailing decimal point ("12.") is accepted as the integer part, which is
/// how partially typed input looks while the user is still editing.
///
/// # Errors
/// Returns `DomainError::InvalidAmount` for empty or non-numeric input.
pub fn parse_amount(raw: &str) -> Result<Decimal, DomainError> {
    let trimmed = raw.trim();
    let candidate = trimmed.strip_suffix('.').unwrap_or(trimmed);
    if candidate.is_empty() {
        return Err(DomainError::InvalidAmount(raw.to_string()));
    }
    Decimal::from_str(candidate).map_err(|_| DomainError::InvalidAmount(raw.to_string()))
}

/// Render an amount the way it is written back into the input field:
/// rounded to `decimals` fraction digits with trailing zeros removed.
pub fn normalize_amount(amount: Decimal, decimals: u32) -> String {
    amount.round_dp(decimals).normalize().to_string()
}
