//! Keypad editing rules for raw amount strings.
//!
//! The raw string is what the user sees. It may end in a decimal point
//! ("12.") while typing, so it is kept as text and parsed on demand.

use serde::{Deserialize, Serialize};

/// Maximum number of integer digits accepted in an amount.
pub const MAX_INPUT_DIGITS: usize = 6;

/// A single keypad edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmountChange {
    /// Append a digit (0-9)
    Digit(u8),
    /// Append the decimal point
    Decimal,
    /// Remove the last character
    Delete,
    /// Reset to empty
    Clear,
}

/// Result of applying an [`AmountChange`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountEdit {
    /// Raw string after the edit (unchanged when rejected)
    pub value: String,
    /// The edit was not applied and should be signalled to the user
    pub rejected: bool,
}

/// Apply `change` to `raw` for a currency with `decimals` fraction digits.
///
/// An edit is rejected when it would leave a string of two or more
/// characters untouched: a seventh integer digit, a fraction digit past `decimals`, a second
/// decimal point, or a decimal point for a currency without fractions.
pub fn apply_amount_change(raw: &str, change: AmountChange, decimals: u32) -> AmountEdit {
    let has_decimal = raw.contains('.');
    let value = match change {
        AmountChange::Digit(digit) if digit > 9 => raw.to_string(),
        AmountChange::Digit(digit) => {
            let integer_digits = raw.split('.').next().map(str::len).unwrap_or(0);
            let fraction_digits = raw.split_once('.').map(|(_, f)| f.len()).unwrap_or(0);
            let digit = char::from(b'0' + digit);

            if has_decimal {
                if fraction_digits >= decimals as usize {
                    raw.to_string()
                } else {
                    format!("{raw}{digit}")
                }
            } else if raw == "0" {
                digit.to_string()
            } else if integer_digits >= MAX_INPUT_DIGITS {
                raw.to_string()
            } else {
                format!("{raw}{digit}")
            }
        }
        AmountChange::Decimal => {
            if has_decimal || decimals == 0 {
                raw.to_string()
            } else if raw.is_empty() {
                "0.".to_string()
            } else {
                format!("{raw}.")
            }
        }
        AmountChange::Delete => {
            let mut next = raw.to_string();
            next.pop();
            next
        }
        AmountChange::Clear => String::new(),
    };

    let rejected = value.len() > 1 && value == raw;
    AmountEdit { value, rejected }
}
