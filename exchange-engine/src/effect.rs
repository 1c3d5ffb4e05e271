//! Outward requests issued by the reducer.

use std::collections::BTreeMap;

use exchange_domain::{ExchangeOffer, ExchangeOrder, OfferBody, OrderAction};

use crate::model::Mode;

/// A step the user must complete outside the flow (browser, crypto send).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAction {
    /// Order the action belongs to
    pub order: ExchangeOrder,
    /// Service host the action urls are relative to
    pub base_url: String,
    /// The action
    pub action: OrderAction,
}

/// Everything the exchange flow can ask the outside world to do.
///
/// Variants for which [`Effect::is_native`] is true are handed to the host
/// application; every other variant has exactly one runtime handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    // Runtime-handled ---------------------------------------------------------
    LoadFeaturePromotions {
        mode: Mode,
    },
    UpdateFeaturePromotionShown {
        mode: Mode,
    },
    LoadUserPreferences,
    LoadCountries,
    LoadPairs {
        country_code: String,
        region_code: Option<String>,
        selected_fiat_currency_code: Option<String>,
        test: bool,
    },
    LoadWalletBalances {
        fiat_currency_code: String,
    },
    LoadNativeNetworkInfo {
        currency_id: String,
    },
    RequestOffers {
        body: Option<OfferBody>,
        mode: Mode,
        /// Decimals of the source currency; a wallet clamp truncates to them.
        amount_decimals: u32,
    },
    CreateOrder {
        offer: ExchangeOffer,
    },
    ProcessBackgroundActions {
        order: ExchangeOrder,
    },
    SubmitCryptoTransferHash {
        order: ExchangeOrder,
        action: OrderAction,
        transaction_hash: String,
    },
    UpdateRegionPreferences {
        country_code: String,
        region_code: Option<String>,
    },
    UpdateCurrencyPreference {
        currency_code: String,
    },
    UpdateLastOrderCurrency {
        currency_code: String,
    },
    UpdateLastSellCurrency {
        currency_code: String,
    },
    UpdateLastTradeCurrencyPair {
        source_code: Option<String>,
        quote_code: Option<String>,
    },
    UpdateLastOrderAmount {
        amount: String,
    },
    ClearDataCache,

    // Native ------------------------------------------------------------------
    TrackEvent {
        name: String,
        props: BTreeMap<String, String>,
    },
    ProcessUserAction(UserAction),
    ExitFlow,
    ErrorSignal,
}

impl Effect {
    /// Whether the host, not the runtime, handles this effect.
    pub fn is_native(&self) -> bool {
        matches!(
            self,
            Effect::TrackEvent { .. }
                | Effect::ProcessUserAction(_)
                | Effect::ExitFlow
                | Effect::ErrorSignal
        )
    }

    /// Analytics event without properties.
    pub fn track(name: impl Into<String>) -> Self {
        Effect::TrackEvent {
            name: name.into(),
            props: BTreeMap::new(),
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Effect::LoadFeaturePromotions { .. } => "LoadFeaturePromotions",
            Effect::UpdateFeaturePromotionShown { .. } => "UpdateFeaturePromotionShown",
            Effect::LoadUserPreferences => "LoadUserPreferences",
            Effect::LoadCountries => "LoadCountries",
            Effect::LoadPairs { .. } => "LoadPairs",
            Effect::LoadWalletBalances { .. } => "LoadWalletBalances",
            Effect::LoadNativeNetworkInfo { .. } => "LoadNativeNetworkInfo",
            Effect::RequestOffers { .. } => "RequestOffers",
            Effect::CreateOrder { .. } => "CreateOrder",
            Effect::ProcessBackgroundActions { .. } => "ProcessBackgroundActions",
            Effect::SubmitCryptoTransferHash { .. } => "SubmitCryptoTransferHash",
            Effect::UpdateRegionPreferences { .. } => "UpdateRegionPreferences",
            Effect::UpdateCurrencyPreference { .. } => "UpdateCurrencyPreference",
            Effect::UpdateLastOrderCurrency { .. } => "UpdateLastOrderCurrency",
            Effect::UpdateLastSellCurrency { .. } => "UpdateLastSellCurrency",
            Effect::UpdateLastTradeCurrencyPair { .. } => "UpdateLastTradeCurrencyPair",
            Effect::UpdateLastOrderAmount { .. } => "UpdateLastOrderAmount",
            Effect::ClearDataCache => "ClearDataCache",
            Effect::TrackEvent { .. } => "TrackEvent",
            Effect::ProcessUserAction(_) => "ProcessUserAction",
            Effect::ExitFlow => "ExitFlow",
            Effect::ErrorSignal => "ErrorSignal",
        }
    }
}
