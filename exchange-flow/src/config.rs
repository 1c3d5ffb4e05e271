//! Flow configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use exchange_engine::{Mode, Model};
use exchange_exec::RuntimeConfig;
use exchange_store::{JsonFileStore, KeyValueStore, MemoryStore};

use crate::error::{FlowError, FlowResult};

/// Production exchange service.
pub const DEFAULT_API_HOST: &str = "https://api.breadwallet.com";

// =============================================================================
// Configuration
// =============================================================================

/// Flow configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,

    /// Exchange service host, unless the user stored an override
    pub api_host: String,

    /// Request offers from the providers' test networks
    pub test_offers: bool,

    /// Effect runtime timings
    pub runtime: RuntimeConfig,

    /// JSON file backing preferences and the data cache; in-memory when unset
    pub preferences_path: Option<PathBuf>,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// Test environment (uses stubs)
    Test,
    /// Development environment
    Development,
    /// Production environment
    Production,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> FlowResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let environment = Self::load_environment()?;
        let api_host =
            env::var("EXCHANGE_API_HOST").unwrap_or_else(|_| DEFAULT_API_HOST.to_string());
        let test_offers = Self::load_bool_env("EXCHANGE_TEST_OFFERS", false)?;
        let runtime = Self::load_runtime_config()?;
        let preferences_path = env::var("EXCHANGE_PREFERENCES_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            api_host,
            test_offers,
            runtime,
            preferences_path,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            api_host: "https://api.example.com".to_string(),
            test_offers: true,
            runtime: RuntimeConfig::test(),
            preferences_path: None,
        }
    }

    /// Fresh model for a flow in `mode`.
    pub fn model(&self, mode: Mode) -> Model {
        Model::create(mode, self.test_offers)
    }

    /// Key-value store for preferences and the data cache.
    pub async fn open_store(&self) -> FlowResult<Arc<dyn KeyValueStore>> {
        match &self.preferences_path {
            Some(path) => Ok(Arc::new(JsonFileStore::open(path.clone()).await?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }

    fn load_environment() -> FlowResult<Environment> {
        let env_str = env::var("EXCHANGE_ENV").unwrap_or_else(|_| "development".to_string());
        env_str.parse()
    }

    fn load_runtime_config() -> FlowResult<RuntimeConfig> {
        let defaults = RuntimeConfig::default();
        let runtime = RuntimeConfig {
            offer_debounce: Self::load_millis_env(
                "EXCHANGE_OFFER_DEBOUNCE_MS",
                defaults.offer_debounce,
            )?,
            offer_poll_interval: Self::load_millis_env(
                "EXCHANGE_OFFER_POLL_MS",
                defaults.offer_poll_interval,
            )?,
            offer_poll_limit: Self::load_parsed_env(
                "EXCHANGE_OFFER_POLL_LIMIT",
                defaults.offer_poll_limit,
            )?,
            address_retry_attempts: Self::load_parsed_env(
                "EXCHANGE_ADDRESS_RETRY_ATTEMPTS",
                defaults.address_retry_attempts,
            )?,
            address_retry_delay: Self::load_millis_env(
                "EXCHANGE_ADDRESS_RETRY_DELAY_MS",
                defaults.address_retry_delay,
            )?,
        };
        runtime
            .validate()
            .map_err(|e| FlowError::Config(e.to_string()))?;
        Ok(runtime)
    }

    fn load_parsed_env<T: FromStr>(key: &str, default: T) -> FlowResult<T> {
        match env::var(key) {
            Ok(val) => val
                .trim()
                .parse::<T>()
                .map_err(|_| FlowError::Config(format!("Invalid {} value: {}", key, val))),
            Err(_) => Ok(default),
        }
    }

    fn load_millis_env(key: &str, default: Duration) -> FlowResult<Duration> {
        match env::var(key) {
            Ok(_) => Self::load_parsed_env::<u64>(key, 0).map(Duration::from_millis),
            Err(_) => Ok(default),
        }
    }

    fn load_bool_env(key: &str, default: bool) -> FlowResult<bool> {
        match env::var(key) {
            Ok(val) => match val.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" | "" => Ok(false),
                _ => Err(FlowError::Config(format!("Invalid {} value: {}", key, val))),
            },
            Err(_) => Ok(default),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            api_host: DEFAULT_API_HOST.to_string(),
            test_offers: false,
            runtime: RuntimeConfig::default(),
            preferences_path: None,
        }
    }
}

impl FromStr for Environment {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(FlowError::Config(format!(
                "Invalid EXCHANGE_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
