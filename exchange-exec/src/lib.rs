//! Cosmos Exchange Execution Layer
//!
//! Runs the effects the engine asks for and turns their results into
//! events.
//!
//! # Architecture
//!
//! ```text
//! Engine Effect → EffectRuntime → Ports (API, wallet) / Store → Event
//! ```
//!
//! # Components
//!
//! - **Ports**: Traits for the exchange service and the wallet
//! - **EffectRuntime**: One handler per effect, each on its own task
//! - **Offer session**: Debounced, polling, latest-wins offer gathering
//! - **Stub**: Scripted collaborators for tests and the demo binary
//!
//! # Example
//!
//! ```rust,ignore
//! use exchange_exec::{EffectRuntime, RuntimeConfig, RuntimeDeps, StubExchangeApi, StubWallet};
//! use exchange_store::MemoryStore;
//! use std::sync::Arc;
//!
//! let deps = RuntimeDeps::new(
//!     Arc::new(StubExchangeApi::new("https://api.example.com")),
//!     Arc::new(StubWallet::new()),
//!     Arc::new(MemoryStore::new()),
//! );
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let runtime = EffectRuntime::new(deps, RuntimeConfig::default(), tx);
//!
//! runtime.dispatch(Effect::LoadCountries);
//! let event = rx.recv().await;
//! ```

#![warn(clippy::all)]

mod actions;
pub mod config;
pub mod error;
mod offer_session;
pub mod ports;
pub mod runtime;
pub mod stub;

// Re-exports for convenience
pub use config::RuntimeConfig;
pub use error::{ExecError, ExecResult};
pub use offer_session::estimate_target;
pub use ports::{ExchangeApiPort, WalletPort};
pub use runtime::{EffectRuntime, RuntimeDeps};
pub use stub::{StubExchangeApi, StubWallet};
