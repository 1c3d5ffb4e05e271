//! Cosmos Exchange Storage Layer
//!
//! Persistence for user preferences and cached exchange reference data.
//!
//! # Architecture
//!
//! - **`KeyValueStore`**: the storage port, plain string entries
//! - **`MemoryStore`**: in-memory implementation for tests and demos
//! - **`JsonFileStore`**: single JSON file, atomically replaced on write
//! - **`UserPreferences`**: typed accessors for the flow's preferences
//! - **`ExchangeDataCache`**: read-through cache for countries and currencies
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use exchange_store::{MemoryStore, UserPreferences};
//!
//! #[tokio::main]
//! async fn main() {
//!     let prefs = UserPreferences::new(Arc::new(MemoryStore::new()), "https://api.example.com");
//!     prefs.set_region("US", Some("NY")).await.unwrap();
//!
//!     let loaded = prefs.load().await.unwrap();
//!     assert_eq!(loaded.country_code.as_deref(), Some("us"));
//! }
//! ```

#![warn(clippy::all)]

mod cache;
mod error;
mod file;
mod memory;
mod preferences;
mod repository;

pub use cache::ExchangeDataCache;
pub use error::{StoreError, StoreResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use preferences::{StoredPreferences, UserPreferences, DEFAULT_FIAT_CURRENCY};
pub use repository::KeyValueStore;
