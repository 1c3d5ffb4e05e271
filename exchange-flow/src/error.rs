//! Flow-level error types.

use exchange_exec::ExecError;
use exchange_store::StoreError;
use thiserror::Error;

/// Errors surfaced to the host of an exchange flow.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Execution error
    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The flow was disposed and accepts no more events
    #[error("Flow disposed")]
    Disposed,
}

/// Result type for flow operations.
pub type FlowResult<T> = Result<T, FlowError>;
