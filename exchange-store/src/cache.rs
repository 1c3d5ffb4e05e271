//! Read-through cache for exchange reference data.
//!
//! Countries (with the detected location) and currencies are kept in memory
//! and mirrored to the key-value store so a later flow can skip the network.
//! Entries live under fixed keys, so concurrent writers simply replace each
//! other and the last write wins.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use exchange_domain::{CountriesResponse, ExchangeCountry, ExchangeCurrency};
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::repository::KeyValueStore;

const KEY_COUNTRIES: &str = "exchange-countries";
const KEY_CURRENCIES: &str = "exchange-currencies";
const KEY_DETECTED_COUNTRY: &str = "exchange-detected-country";

#[derive(Default)]
struct Cached {
    countries: Option<CountriesResponse>,
    currencies: Option<BTreeMap<String, ExchangeCurrency>>,
}

/// Cached countries and currencies
pub struct ExchangeDataCache {
    store: Arc<dyn KeyValueStore>,
    cached: RwLock<Cached>,
}

impl ExchangeDataCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(Cached::default()),
        }
    }

    /// Cached countries, restoring from the store on first use.
    ///
    /// An unreadable or empty entry counts as a miss.
    pub async fn countries(&self) -> StoreResult<Option<CountriesResponse>> {
        if let Some(countries) = self.read(|cached| cached.countries.clone()) {
            return Ok(Some(countries));
        }

        let Some(json) = self.store.get(KEY_COUNTRIES).await? else {
            debug!("No cached countries");
            return Ok(None);
        };
        let countries: Vec<ExchangeCountry> = match serde_json::from_str(&json) {
            Ok(countries) => countries,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize cached countries");
                return Ok(None);
            },
        };
        if countries.is_empty() {
            return Ok(None);
        }

        let (detected_country_code, detected_region_code) = self
            .store
            .get(KEY_DETECTED_COUNTRY)
            .await?
            .map(|value| parse_detected(&value))
            .unwrap_or_default();
        let response = CountriesResponse {
            countries,
            detected_country_code,
            detected_region_code,
        };
        debug!(count = response.countries.len(), "Restored cached countries");

        self.write(|cached| cached.countries = Some(response.clone()));
        Ok(Some(response))
    }

    /// Remember freshly fetched countries
    pub async fn put_countries(&self, response: &CountriesResponse) -> StoreResult<()> {
        self.write(|cached| cached.countries = Some(response.clone()));

        let json = serde_json::to_string(&response.countries)?;
        self.store.put(KEY_COUNTRIES, json).await?;
        let detected = format!(
            "{}:{}",
            response.detected_country_code.as_deref().unwrap_or_default(),
            response.detected_region_code.as_deref().unwrap_or_default(),
        );
        self.store.put(KEY_DETECTED_COUNTRY, detected).await
    }

    /// Cached currencies keyed by code
    pub async fn currencies(&self) -> StoreResult<Option<BTreeMap<String, ExchangeCurrency>>> {
        if let Some(currencies) = self.read(|cached| cached.currencies.clone()) {
            return Ok(Some(currencies));
        }

        let Some(json) = self.store.get(KEY_CURRENCIES).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<BTreeMap<String, ExchangeCurrency>>(&json) {
            Ok(currencies) => {
                self.write(|cached| cached.currencies = Some(currencies.clone()));
                Ok(Some(currencies))
            },
            Err(e) => {
                warn!(error = %e, "Failed to deserialize cached currencies");
                Ok(None)
            },
        }
    }

    pub async fn put_currencies(
        &self,
        currencies: &BTreeMap<String, ExchangeCurrency>,
    ) -> StoreResult<()> {
        self.write(|cached| cached.currencies = Some(currencies.clone()));
        let json = serde_json::to_string(currencies)?;
        self.store.put(KEY_CURRENCIES, json).await
    }

    /// Drop every cached entry, in memory and in the store
    pub async fn clear(&self) -> StoreResult<()> {
        debug!("Clearing cached exchange data");
        self.write(|cached| *cached = Cached::default());
        self.store.remove(KEY_COUNTRIES).await?;
        self.store.remove(KEY_CURRENCIES).await?;
        self.store.remove(KEY_DETECTED_COUNTRY).await
    }

    fn read<T>(&self, f: impl FnOnce(&Cached) -> Option<T>) -> Option<T> {
        f(&self.cached.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write(&self, f: impl FnOnce(&mut Cached)) {
        f(&mut self.cached.write().unwrap_or_else(PoisonError::into_inner));
    }
}

/// `"country:region"` with empty parts meaning unknown
fn parse_detected(value: &str) -> (Option<String>, Option<String>) {
    let mut parts = value.splitn(2, ':');
    let part = |p: Option<&str>| p.filter(|s| !s.is_empty()).map(str::to_string);
    let country = part(parts.next());
    let region = part(parts.next());
    (country, region)
}
