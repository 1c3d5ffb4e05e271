//! Timings for the effect runtime.

use std::time::Duration;

use crate::error::{ExecError, ExecResult};

/// Runtime timings and retry budgets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Quiet period before an offer request is sent
    pub offer_debounce: Duration,
    /// Delay between offer request polls
    pub offer_poll_interval: Duration,
    /// Polls before an offer request is forced complete
    pub offer_poll_limit: u32,
    /// Attempts per background address action
    pub address_retry_attempts: u32,
    /// Delay after a failed address attempt
    pub address_retry_delay: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            offer_debounce: Duration::from_millis(750),
            offer_poll_interval: Duration::from_millis(1500),
            offer_poll_limit: 8,
            address_retry_attempts: 3,
            address_retry_delay: Duration::from_millis(500),
        }
    }
}

impl RuntimeConfig {
    /// Short timings for tests.
    pub fn test() -> Self {
        Self {
            offer_debounce: Duration::from_millis(10),
            offer_poll_interval: Duration::from_millis(20),
            offer_poll_limit: 3,
            address_retry_attempts: 3,
            address_retry_delay: Duration::from_millis(5),
        }
    }

    /// Reject budgets that would disable a protocol step.
    pub fn validate(&self) -> ExecResult<()> {
        if self.address_retry_attempts == 0 {
            return Err(ExecError::Config(
                "address_retry_attempts must be at least 1".to_string(),
            ));
        }
        if self.offer_poll_interval.is_zero() && self.offer_poll_limit > 0 {
            return Err(ExecError::Config(
                "offer_poll_interval must be positive when polling".to_string(),
            ));
        }
        Ok(())
    }
}
