//! Inputs to the exchange flow: user intents and results of effects.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exchange_domain::{
    ApiError, ExchangeCountry, ExchangeCurrency, ExchangeOrder, ExchangePair, ExchangeRegion,
    NativeNetworkInfo, OfferBody, OfferRequest, OrderAction, OrderFailure,
};

use crate::amount::AmountChange;
use crate::model::{Mode, OfferDetails};

/// Why the host failed to send crypto for a `CryptoSend` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendFailedReason {
    /// The wallet could not build the transfer
    CreateTransferFailed,
    /// The wallet could not estimate the fee; retrying may work
    FeeEstimateFailed,
    /// The wallet lacks native asset for the fee
    InsufficientNativeWalletBalance {
        /// Native fee currency
        currency_code: String,
        /// Amount needed
        required_amount: Decimal,
    },
}

/// Stored user preferences, as read by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPreferencesLoaded {
    pub selected_country_code: Option<String>,
    pub selected_region_code: Option<String>,
    pub fiat_currency_code: String,
    pub last_purchase_currency_code: Option<String>,
    pub last_sell_currency_code: Option<String>,
    pub last_trade_source_currency_code: Option<String>,
    pub last_trade_quote_currency_code: Option<String>,
    pub last_order_amount: Option<String>,
    pub api_host: String,
}

/// Everything the exchange flow reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    // Startup ---------------------------------------------------------------
    OnFeaturePromotionsLoaded {
        show: bool,
    },
    OnCountriesLoaded {
        countries: Vec<ExchangeCountry>,
        default_country_code: Option<String>,
        default_region_code: Option<String>,
    },
    OnCountriesError(ApiError),
    OnUserPreferencesLoaded(UserPreferencesLoaded),
    OnPairsLoaded {
        pairs: Vec<ExchangePair>,
        currencies: BTreeMap<String, ExchangeCurrency>,
    },
    OnPairsError(ApiError),
    OnWalletBalancesLoaded {
        balances: BTreeMap<String, Decimal>,
    },
    OnNativeNetworkInfoLoaded(NativeNetworkInfo),
    OnModeSelected(Mode),
    OnLocalDataCleared,

    // Offers ----------------------------------------------------------------
    OnOfferAmountOverridden {
        original_body: OfferBody,
        new_amount: Decimal,
    },
    OnOfferRequestUpdated {
        offer_body: OfferBody,
        offer_request: OfferRequest,
        offer_details: Vec<OfferDetails>,
    },
    OnOfferRequestError {
        offer_body: OfferBody,
        error: ApiError,
    },
    OnOfferClicked {
        offer_details: OfferDetails,
        adjust_to_limit: bool,
    },
    OnSelectOfferClicked {
        cancel: bool,
    },

    // Amount entry ------------------------------------------------------------
    OnAmountChange(AmountChange),
    OnQuoteAmountChange(AmountChange),
    OnMaxAmountClicked,
    OnMinAmountClicked,
    OnSwapCurrenciesClicked,
    OnSelectPairClicked {
        select_source: bool,
    },
    OnSelectPairCancelClicked,
    OnCurrencyClicked(ExchangeCurrency),

    // Settings ----------------------------------------------------------------
    OnConfigureSettingsClicked,
    OnConfigureCountryClicked,
    OnConfigureRegionClicked,
    OnConfigureCurrencyClicked,
    OnCountryClicked(ExchangeCountry),
    OnRegionClicked(ExchangeRegion),
    OnCloseSettingsClicked,

    // Navigation / dialogs ----------------------------------------------------
    OnContinueClicked,
    OnBackClicked,
    OnCloseClicked {
        confirmed: bool,
    },
    OnDialogConfirmClicked,
    OnDialogCancelClicked,

    // Orders ------------------------------------------------------------------
    OnOrderUpdated(ExchangeOrder),
    OnOrderFailed(OrderFailure),
    OnBrowserActionCompleted {
        action: OrderAction,
        cancelled: bool,
    },
    OnCryptoSendActionCompleted {
        action: OrderAction,
        transaction_hash: Option<String>,
        cancelled: bool,
    },
    OnCryptoSendActionFailed(SendFailedReason),
    OnCryptoSendHashUpdateSuccess,
    OnCryptoSendHashUpdateFailed,
}

impl Event {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::OnFeaturePromotionsLoaded { .. } => "OnFeaturePromotionsLoaded",
            Event::OnCountriesLoaded { .. } => "OnCountriesLoaded",
            Event::OnCountriesError(_) => "OnCountriesError",
            Event::OnUserPreferencesLoaded(_) => "OnUserPreferencesLoaded",
            Event::OnPairsLoaded { .. } => "OnPairsLoaded",
            Event::OnPairsError(_) => "OnPairsError",
            Event::OnWalletBalancesLoaded { .. } => "OnWalletBalancesLoaded",
            Event::OnNativeNetworkInfoLoaded(_) => "OnNativeNetworkInfoLoaded",
            Event::OnModeSelected(_) => "OnModeSelected",
            Event::OnLocalDataCleared => "OnLocalDataCleared",
            Event::OnOfferAmountOverridden { .. } => "OnOfferAmountOverridden",
            Event::OnOfferRequestUpdated { .. } => "OnOfferRequestUpdated",
            Event::OnOfferRequestError { .. } => "OnOfferRequestError",
            Event::OnOfferClicked { .. } => "OnOfferClicked",
            Event::OnSelectOfferClicked { .. } => "OnSelectOfferClicked",
            Event::OnAmountChange(_) => "OnAmountChange",
            Event::OnQuoteAmountChange(_) => "OnQuoteAmountChange",
            Event::OnMaxAmountClicked => "OnMaxAmountClicked",
            Event::OnMinAmountClicked => "OnMinAmountClicked",
            Event::OnSwapCurrenciesClicked => "OnSwapCurrenciesClicked",
            Event::OnSelectPairClicked { .. } => "OnSelectPairClicked",
            Event::OnSelectPairCancelClicked => "OnSelectPairCancelClicked",
            Event::OnCurrencyClicked(_) => "OnCurrencyClicked",
            Event::OnConfigureSettingsClicked => "OnConfigureSettingsClicked",
            Event::OnConfigureCountryClicked => "OnConfigureCountryClicked",
            Event::OnConfigureRegionClicked => "OnConfigureRegionClicked",
            Event::OnConfigureCurrencyClicked => "OnConfigureCurrencyClicked",
            Event::OnCountryClicked(_) => "OnCountryClicked",
            Event::OnRegionClicked(_) => "OnRegionClicked",
            Event::OnCloseSettingsClicked => "OnCloseSettingsClicked",
            Event::OnContinueClicked => "OnContinueClicked",
            Event::OnBackClicked => "OnBackClicked",
            Event::OnCloseClicked { .. } => "OnCloseClicked",
            Event::OnDialogConfirmClicked => "OnDialogConfirmClicked",
            Event::OnDialogCancelClicked => "OnDialogCancelClicked",
            Event::OnOrderUpdated(_) => "OnOrderUpdated",
            Event::OnOrderFailed(_) => "OnOrderFailed",
            Event::OnBrowserActionCompleted { .. } => "OnBrowserActionCompleted",
            Event::OnCryptoSendActionCompleted { .. } => "OnCryptoSendActionCompleted",
            Event::OnCryptoSendActionFailed(_) => "OnCryptoSendActionFailed",
            Event::OnCryptoSendHashUpdateSuccess => "OnCryptoSendHashUpdateSuccess",
            Event::OnCryptoSendHashUpdateFailed => "OnCryptoSendHashUpdateFailed",
        }
    }
}
