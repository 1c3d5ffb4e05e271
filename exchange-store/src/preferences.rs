//! Typed user preferences over a [`KeyValueStore`].

use std::sync::Arc;

use crate::error::StoreResult;
use crate::repository::KeyValueStore;

const KEY_COUNTRY_CODE: &str = "exchange_country_code";
const KEY_REGION_CODE: &str = "exchange_region_code";
const KEY_FIAT_CURRENCY: &str = "exchange_user_fiat";
const KEY_LAST_PURCHASE_CURRENCY: &str = "exchange_last_purchase_currency";
const KEY_LAST_SELL_CURRENCY: &str = "exchange_last_sell_currency";
const KEY_LAST_TRADE_SOURCE_CURRENCY: &str = "exchange_last_trade_source_currency";
const KEY_LAST_TRADE_QUOTE_CURRENCY: &str = "exchange_last_trade_quote_currency";
const KEY_LAST_ORDER_AMOUNT: &str = "exchange_last_order_amount";
const KEY_API_HOST: &str = "exchange_debug_api_host";
const KEY_PROMOTION_SHOWN_PREFIX: &str = "exchange_promotion_shown_";

/// Fiat used when the user never picked one.
pub const DEFAULT_FIAT_CURRENCY: &str = "usd";

/// Every preference the exchange flow reads at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPreferences {
    pub country_code: Option<String>,
    pub region_code: Option<String>,
    pub fiat_currency_code: String,
    pub last_purchase_currency_code: Option<String>,
    pub last_sell_currency_code: Option<String>,
    pub last_trade_source_currency_code: Option<String>,
    pub last_trade_quote_currency_code: Option<String>,
    pub last_order_amount: Option<String>,
    pub api_host: String,
}

/// Preference accessors used by the effect runtime.
///
/// Currency, country and region codes are stored lower-case.
#[derive(Clone)]
pub struct UserPreferences {
    store: Arc<dyn KeyValueStore>,
    default_api_host: String,
}

impl UserPreferences {
    /// Preferences over `store`; `default_api_host` applies until overridden
    pub fn new(store: Arc<dyn KeyValueStore>, default_api_host: impl Into<String>) -> Self {
        Self {
            store,
            default_api_host: default_api_host.into(),
        }
    }

    /// Read everything the flow needs in one go
    pub async fn load(&self) -> StoreResult<StoredPreferences> {
        Ok(StoredPreferences {
            country_code: self.country_code().await?,
            region_code: self.region_code().await?,
            fiat_currency_code: self.fiat_currency_code().await?,
            last_purchase_currency_code: self.get(KEY_LAST_PURCHASE_CURRENCY).await?,
            last_sell_currency_code: self.get(KEY_LAST_SELL_CURRENCY).await?,
            last_trade_source_currency_code: self.get(KEY_LAST_TRADE_SOURCE_CURRENCY).await?,
            last_trade_quote_currency_code: self.get(KEY_LAST_TRADE_QUOTE_CURRENCY).await?,
            last_order_amount: self.last_order_amount().await?,
            api_host: self.api_host().await?,
        })
    }

    pub async fn country_code(&self) -> StoreResult<Option<String>> {
        self.get(KEY_COUNTRY_CODE).await
    }

    pub async fn region_code(&self) -> StoreResult<Option<String>> {
        self.get(KEY_REGION_CODE).await
    }

    /// Store the selected location; `None` region clears a previous one
    pub async fn set_region(&self, country_code: &str, region_code: Option<&str>) -> StoreResult<()> {
        self.set(KEY_COUNTRY_CODE, Some(country_code)).await?;
        self.set(KEY_REGION_CODE, region_code).await
    }

    pub async fn fiat_currency_code(&self) -> StoreResult<String> {
        Ok(self
            .get(KEY_FIAT_CURRENCY)
            .await?
            .unwrap_or_else(|| DEFAULT_FIAT_CURRENCY.to_string()))
    }

    pub async fn set_fiat_currency_code(&self, code: &str) -> StoreResult<()> {
        self.set(KEY_FIAT_CURRENCY, Some(code)).await
    }

    pub async fn last_purchase_currency(&self) -> StoreResult<Option<String>> {
        self.get(KEY_LAST_PURCHASE_CURRENCY).await
    }

    pub async fn set_last_purchase_currency(&self, code: &str) -> StoreResult<()> {
        self.set(KEY_LAST_PURCHASE_CURRENCY, Some(code)).await
    }

    pub async fn last_sell_currency(&self) -> StoreResult<Option<String>> {
        self.get(KEY_LAST_SELL_CURRENCY).await
    }

    pub async fn set_last_sell_currency(&self, code: &str) -> StoreResult<()> {
        self.set(KEY_LAST_SELL_CURRENCY, Some(code)).await
    }

    /// Last traded pair as (source, quote)
    pub async fn last_trade_pair(&self) -> StoreResult<(Option<String>, Option<String>)> {
        Ok((
            self.get(KEY_LAST_TRADE_SOURCE_CURRENCY).await?,
            self.get(KEY_LAST_TRADE_QUOTE_CURRENCY).await?,
        ))
    }

    pub async fn set_last_trade_pair(
        &self,
        source_code: Option<&str>,
        quote_code: Option<&str>,
    ) -> StoreResult<()> {
        self.set(KEY_LAST_TRADE_SOURCE_CURRENCY, source_code).await?;
        self.set(KEY_LAST_TRADE_QUOTE_CURRENCY, quote_code).await
    }

    pub async fn last_order_amount(&self) -> StoreResult<Option<String>> {
        self.store.get(KEY_LAST_ORDER_AMOUNT).await
    }

    /// Amounts are stored verbatim, not lower-cased
    pub async fn set_last_order_amount(&self, amount: &str) -> StoreResult<()> {
        self.store
            .put(KEY_LAST_ORDER_AMOUNT, amount.to_string())
            .await
    }

    /// Service host, the stored override or the configured default
    pub async fn api_host(&self) -> StoreResult<String> {
        Ok(self
            .store
            .get(KEY_API_HOST)
            .await?
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| self.default_api_host.clone()))
    }

    pub async fn set_api_host(&self, host: Option<&str>) -> StoreResult<()> {
        self.store
            .put_or_remove(KEY_API_HOST, host.map(str::to_string))
            .await
    }

    /// Whether the promotion for `mode` was already dismissed
    pub async fn promotion_shown(&self, mode: &str) -> StoreResult<bool> {
        let key = format!("{KEY_PROMOTION_SHOWN_PREFIX}{mode}");
        Ok(self.store.get(&key).await?.as_deref() == Some("true"))
    }

    pub async fn set_promotion_shown(&self, mode: &str) -> StoreResult<()> {
        let key = format!("{KEY_PROMOTION_SHOWN_PREFIX}{mode}");
        self.store.put(&key, "true".to_string()).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.store.get(key).await?.filter(|value| !value.is_empty()))
    }

    async fn set(&self, key: &str, value: Option<&str>) -> StoreResult<()> {
        self.store
            .put_or_remove(key, value.map(str::to_lowercase))
            .await
    }
}
