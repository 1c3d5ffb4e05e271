//! Execution layer error types.
//!
//! Collaborator failures (`ApiError`, `OrderFailure`) are not errors here:
//! they become events. `ExecError` covers what stops a handler from
//! producing any event at all.

use thiserror::Error;

/// Errors that can occur while running an effect.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Preferences or cache storage failed
    #[error("Store error: {0}")]
    Store(#[from] exchange_store::StoreError),

    /// Malformed value from a collaborator
    #[error("Domain error: {0}")]
    Domain(#[from] exchange_domain::DomainError),

    /// The event loop stopped listening
    #[error("Event channel closed")]
    ChannelClosed,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for execution operations.
pub type ExecResult<T> = Result<T, ExecError>;
