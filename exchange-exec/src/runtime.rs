//! Effect runtime: performs effects and feeds their results back as events.
//!
//! # Flow
//!
//! ```text
//! Effect → dispatch → spawned handler → port / store → Event → output channel
//! ```
//!
//! Every handler runs on its own tokio task, so effects run concurrently
//! with each other and with the event loop. All tasks share one
//! cancellation token; `dispose` stops them, including a sleeping offer
//! session.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use exchange_domain::CountriesResponse;
use exchange_engine::{Effect, Event, Mode, UserPreferencesLoaded};
use exchange_store::{
    ExchangeDataCache, KeyValueStore, StoreResult, UserPreferences, DEFAULT_FIAT_CURRENCY,
};

use crate::actions;
use crate::config::RuntimeConfig;
use crate::error::{ExecError, ExecResult};
use crate::offer_session::{self, OfferSession};
use crate::ports::{ExchangeApiPort, WalletPort};

// =============================================================================
// Dependencies
// =============================================================================

/// Collaborators shared by every handler.
#[derive(Clone)]
pub struct RuntimeDeps {
    pub api: Arc<dyn ExchangeApiPort>,
    pub wallet: Arc<dyn WalletPort>,
    pub preferences: UserPreferences,
    pub cache: Arc<ExchangeDataCache>,
}

impl RuntimeDeps {
    /// Build preferences and a data cache over `store`.
    ///
    /// The cache should outlive a single flow; share one `RuntimeDeps` (or
    /// its `cache`) between flows to avoid refetching countries.
    pub fn new(
        api: Arc<dyn ExchangeApiPort>,
        wallet: Arc<dyn WalletPort>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let preferences = UserPreferences::new(Arc::clone(&store), api.host());
        let cache = Arc::new(ExchangeDataCache::new(store));
        Self {
            api,
            wallet,
            preferences,
            cache,
        }
    }
}

// =============================================================================
// Runtime
// =============================================================================

pub(crate) struct RuntimeInner {
    pub(crate) deps: RuntimeDeps,
    pub(crate) config: RuntimeConfig,
    pub(crate) offers: OfferSession,
    output: UnboundedSender<Event>,
    cancel: CancellationToken,
}

/// Executes the non-native effects of one exchange flow.
#[derive(Clone)]
pub struct EffectRuntime {
    inner: Arc<RuntimeInner>,
}

impl EffectRuntime {
    /// Create a runtime that reports results on `output`.
    pub fn new(deps: RuntimeDeps, config: RuntimeConfig, output: UnboundedSender<Event>) -> Self {
        Self {
            inner: Arc::new(RuntimeInner {
                deps,
                config,
                offers: OfferSession::new(),
                output,
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Start handling `effect` and return immediately.
    ///
    /// Native effects are the host's job and are ignored here.
    pub fn dispatch(&self, effect: Effect) {
        if effect.is_native() {
            trace!(effect = effect.name(), "Native effect skipped by runtime");
            return;
        }
        if self.is_disposed() {
            debug!(effect = effect.name(), "Runtime disposed, effect dropped");
            return;
        }

        let name = effect.name();
        let inner = Arc::clone(&self.inner);
        match effect {
            Effect::RequestOffers {
                body,
                mode,
                amount_decimals,
            } => {
                // Claimed before spawning so dispatch order decides the winner.
                let generation = inner.offers.begin();
                self.spawn(name, async move {
                    offer_session::run(&inner, body, mode, amount_decimals, generation).await
                });
            },
            effect => self.spawn(name, async move { inner.handle(effect).await }),
        }
    }

    /// Cancel every running handler and pending timer.
    pub fn dispose(&self) {
        if self.inner.cancel.is_cancelled() {
            return;
        }
        info!("Disposing effect runtime");
        self.inner.offers.begin();
        self.inner.cancel.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ExecResult<()>> + Send + 'static,
    {
        let cancel = self.inner.cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(effect = name, "Effect cancelled");
                }
                result = task => match result {
                    Ok(()) => {}
                    Err(ExecError::ChannelClosed) => {
                        debug!(effect = name, "Event loop gone, result dropped");
                    }
                    Err(e) => {
                        error!(effect = name, error = %e, "Effect failed");
                    }
                },
            }
        });
    }
}

impl RuntimeInner {
    pub(crate) fn emit(&self, event: Event) -> ExecResult<()> {
        trace!(event = event.name(), "Emitting event");
        self.output.send(event).map_err(|_| ExecError::ChannelClosed)
    }

    async fn handle(&self, effect: Effect) -> ExecResult<()> {
        match effect {
            Effect::LoadFeaturePromotions { mode } => self.load_feature_promotions(mode).await,
            Effect::UpdateFeaturePromotionShown { mode } => {
                let result = self.deps.preferences.set_promotion_shown(mode.as_str()).await;
                stored("promotion shown", result);
                Ok(())
            },
            Effect::LoadUserPreferences => self.load_user_preferences().await,
            Effect::LoadCountries => self.load_countries().await,
            Effect::LoadPairs {
                country_code,
                region_code,
                selected_fiat_currency_code,
                test,
            } => {
                debug!(
                    country = %country_code,
                    region = ?region_code,
                    fiat = ?selected_fiat_currency_code,
                    test,
                    "Loading pairs"
                );
                self.load_pairs(&country_code, region_code.as_deref()).await
            },
            Effect::LoadWalletBalances { fiat_currency_code } => {
                let balances = self.deps.wallet.load_wallet_balances().await;
                debug!(count = balances.len(), fiat = %fiat_currency_code, "Wallet balances loaded");
                self.emit(Event::OnWalletBalancesLoaded { balances })
            },
            Effect::LoadNativeNetworkInfo { currency_id } => {
                match self.deps.wallet.native_network_info(&currency_id).await {
                    Some(info) => self.emit(Event::OnNativeNetworkInfoLoaded(info)),
                    None => {
                        warn!(%currency_id, "No native network info");
                        Ok(())
                    },
                }
            },
            Effect::CreateOrder { offer } => actions::create_order(self, offer).await,
            Effect::ProcessBackgroundActions { order } => {
                actions::process_background_actions(self, order).await
            },
            Effect::SubmitCryptoTransferHash {
                order,
                action,
                transaction_hash,
            } => actions::submit_crypto_transfer_hash(self, order, action, transaction_hash).await,
            Effect::UpdateRegionPreferences {
                country_code,
                region_code,
            } => {
                let result = self
                    .deps
                    .preferences
                    .set_region(&country_code, region_code.as_deref())
                    .await;
                stored("region", result);
                Ok(())
            },
            Effect::UpdateCurrencyPreference { currency_code } => {
                let result = self.deps.preferences.set_fiat_currency_code(&currency_code).await;
                stored("fiat currency", result);
                Ok(())
            },
            Effect::UpdateLastOrderCurrency { currency_code } => {
                let result = self.deps.preferences.set_last_purchase_currency(&currency_code).await;
                stored("last purchase currency", result);
                Ok(())
            },
            Effect::UpdateLastSellCurrency { currency_code } => {
                let result = self.deps.preferences.set_last_sell_currency(&currency_code).await;
                stored("last sell currency", result);
                Ok(())
            },
            Effect::UpdateLastTradeCurrencyPair {
                source_code,
                quote_code,
            } => {
                let result = self
                    .deps
                    .preferences
                    .set_last_trade_pair(source_code.as_deref(), quote_code.as_deref())
                    .await;
                stored("last trade pair", result);
                Ok(())
            },
            Effect::UpdateLastOrderAmount { amount } => {
                let result = self.deps.preferences.set_last_order_amount(&amount).await;
                stored("last order amount", result);
                Ok(())
            },
            Effect::ClearDataCache => {
                self.deps.cache.clear().await?;
                Ok(())
            },
            // Offer requests are routed in `dispatch`, native effects never get here.
            Effect::RequestOffers { .. }
            | Effect::TrackEvent { .. }
            | Effect::ProcessUserAction(_)
            | Effect::ExitFlow
            | Effect::ErrorSignal => Ok(()),
        }
    }

    async fn load_feature_promotions(&self, mode: Mode) -> ExecResult<()> {
        let show = match self.deps.preferences.promotion_shown(mode.as_str()).await {
            Ok(shown) => !shown,
            Err(e) => {
                warn!(error = %e, "Failed to read promotion flag");
                false
            },
        };
        self.emit(Event::OnFeaturePromotionsLoaded { show })
    }

    async fn load_user_preferences(&self) -> ExecResult<()> {
        let loaded = match self.deps.preferences.load().await {
            Ok(prefs) => UserPreferencesLoaded {
                selected_country_code: prefs.country_code,
                selected_region_code: prefs.region_code,
                fiat_currency_code: prefs.fiat_currency_code,
                last_purchase_currency_code: prefs.last_purchase_currency_code,
                last_sell_currency_code: prefs.last_sell_currency_code,
                last_trade_source_currency_code: prefs.last_trade_source_currency_code,
                last_trade_quote_currency_code: prefs.last_trade_quote_currency_code,
                last_order_amount: prefs.last_order_amount,
                api_host: prefs.api_host,
            },
            Err(e) => {
                warn!(error = %e, "Failed to read preferences, starting as new user");
                UserPreferencesLoaded {
                    fiat_currency_code: DEFAULT_FIAT_CURRENCY.to_string(),
                    api_host: self.deps.api.host(),
                    ..UserPreferencesLoaded::default()
                }
            },
        };
        self.emit(Event::OnUserPreferencesLoaded(loaded))
    }

    async fn load_countries(&self) -> ExecResult<()> {
        match self.deps.cache.countries().await {
            Ok(Some(cached)) => {
                debug!(count = cached.countries.len(), "Serving cached countries");
                return self.emit(countries_loaded(cached));
            },
            Ok(None) => {},
            Err(e) => warn!(error = %e, "Country cache unreadable"),
        }

        match self.deps.api.get_exchange_countries().await {
            Ok(response) => {
                info!(
                    count = response.countries.len(),
                    detected = ?response.detected_country_code,
                    "Countries loaded"
                );
                stored("countries", self.deps.cache.put_countries(&response).await);
                self.emit(countries_loaded(response))
            },
            Err(error) => {
                error!(%error, "Failed to load countries");
                self.emit(Event::OnCountriesError(error))
            },
        }
    }

    async fn load_pairs(&self, country_code: &str, region_code: Option<&str>) -> ExecResult<()> {
        let pairs = self
            .deps
            .api
            .get_exchange_pairs(country_code, region_code, None, None)
            .await;
        let response = match pairs {
            Ok(response) => response,
            Err(error) => {
                error!(%error, country = country_code, "Failed to load pairs");
                return self.emit(Event::OnPairsError(error));
            },
        };

        let mut currencies = match self.deps.cache.currencies().await {
            Ok(cached) => cached.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Currency cache unreadable");
                BTreeMap::new()
            },
        };
        currencies.extend(
            response
                .currencies
                .into_iter()
                .map(|currency| (currency.code.clone(), currency)),
        );
        stored("currencies", self.deps.cache.put_currencies(&currencies).await);

        info!(
            pairs = response.pairs.len(),
            currencies = currencies.len(),
            "Pairs loaded"
        );
        self.emit(Event::OnPairsLoaded {
            pairs: response.pairs,
            currencies,
        })
    }
}

fn countries_loaded(response: CountriesResponse) -> Event {
    Event::OnCountriesLoaded {
        countries: response.countries,
        default_country_code: response.detected_country_code,
        default_region_code: response.detected_region_code,
    }
}

/// Preference and cache writes never fail the flow; a failed write is only logged.
fn stored(what: &str, result: StoreResult<()>) {
    match result {
        Ok(()) => trace!(what, "Stored"),
        Err(e) => warn!(what, error = %e, "Failed to store"),
    }
}
