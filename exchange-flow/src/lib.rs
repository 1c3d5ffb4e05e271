//! Cosmos Exchange Flow
//!
//! Runs one buy, sell or trade flow: a serialized event loop around the
//! pure engine, with the effect runtime performing I/O behind it.
//!
//! # Architecture
//!
//! ```text
//! Host UI ── Event ──► ExchangeLoop ── update ──► Model (watch)
//!    ▲                    │
//!    │ native Effect      │ Effect
//!    └────────────────────┴──► EffectRuntime → Ports / Store → Event
//! ```
//!
//! # Components
//!
//! - **ExchangeLoop**: Owns the model, applies events one at a time
//! - **Config**: Environment-based configuration
//! - **Demo**: Scripted catalog for the demo binary and end-to-end tests
//!
//! # Example
//!
//! ```rust,ignore
//! use exchange_engine::{Effect, Mode};
//! use exchange_exec::RuntimeDeps;
//! use exchange_flow::{Config, ExchangeLoop};
//!
//! let config = Config::from_env()?;
//! let store = config.open_store().await?;
//! let deps = RuntimeDeps::new(api, wallet, store);
//!
//! let (flow, mut native) = ExchangeLoop::start(config.model(Mode::Buy), deps, config.runtime);
//! while let Some(effect) = native.recv().await {
//!     if effect == Effect::ExitFlow {
//!         break;
//!     }
//! }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod demo;
pub mod error;
pub mod event_loop;

// Re-exports for convenience
pub use config::{Config, Environment, DEFAULT_API_HOST};
pub use error::{FlowError, FlowResult};
pub use event_loop::{ExchangeLoop, NativeEffects};
