//! The exchange flow Model and the values derived from it.
//!
//! `Model` is a plain value. Derived values (`source_pairs`, `selected_pair`,
//! `quote_amount`, `offer_state`, ...) are computed on every call from the
//! stored fields, never cached, so reading them twice always agrees.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use exchange_domain::{
    normalize_amount, parse_amount, ExchangeCountry, ExchangeCurrency, ExchangeOffer,
    ExchangeOrder, ExchangePair, ExchangeRegion, NativeNetworkInfo, OfferBody, OfferRequest,
};

use crate::effect::UserAction;
use crate::event::SendFailedReason;

/// Currency selected for the first purchase when no preference exists.
pub const DEFAULT_PURCHASE_CURRENCY: &str = "btc";

// =============================================================================
// Mode
// =============================================================================

/// Which side of a pair is fiat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fiat source, crypto quote
    Buy,
    /// Crypto source, fiat quote
    Sell,
    /// Crypto source, crypto quote
    Trade,
}

impl Mode {
    /// Lower-case name used in analytics and preference keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Buy => "buy",
            Mode::Sell => "sell",
            Mode::Trade => "trade",
        }
    }

    /// Whether `currency` may be spent in this mode.
    pub fn is_compatible_source(&self, currency: &ExchangeCurrency) -> bool {
        match self {
            Mode::Trade | Mode::Sell => currency.is_crypto(),
            Mode::Buy => currency.is_fiat(),
        }
    }

    /// Whether `currency` may be received in this mode.
    pub fn is_compatible_quote(&self, currency: &ExchangeCurrency) -> bool {
        match self {
            Mode::Trade | Mode::Buy => currency.is_crypto(),
            Mode::Sell => currency.is_fiat(),
        }
    }

    /// The mode a swap switches to.
    pub fn swapped(&self) -> Mode {
        match self {
            Mode::Buy => Mode::Sell,
            Mode::Sell => Mode::Buy,
            Mode::Trade => Mode::Trade,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// State
// =============================================================================

/// Step of the settings wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigTarget {
    /// Overview of the current configuration
    Menu,
    /// Country picker
    Country,
    /// Region picker
    Region,
    /// Fiat currency picker
    Currency,
}

/// Step of the exchange flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// One-time promotion for the mode
    FeaturePromotion,
    /// Loading countries and preferences
    Initializing,
    /// Country / region / fiat wizard
    ConfigureSettings {
        /// Current wizard step
        target: ConfigTarget,
        /// No stored country yet
        is_new_user: bool,
        /// Fiat currencies offered by the wizard
        fiat_currencies: Vec<ExchangeCurrency>,
    },
    /// Nothing to sell or trade
    EmptyWallets {
        /// No pair sells into fiat
        selling_unavailable: bool,
        /// Funded assets have no usable pair
        invalid_sell_pairs: bool,
    },
    /// Asset picker
    SelectAsset {
        /// Assets to choose from
        assets: Vec<ExchangeCurrency>,
        /// Picking the source side
        source: bool,
    },
    /// Amount entry and offer browsing
    OrderSetup {
        /// Offer list is open
        selecting_offer: bool,
    },
    /// Order being created (or previewed)
    CreatingOrder {
        /// Waiting for the user to confirm the preview
        previewing: bool,
    },
    /// Order created, actions in progress
    ProcessingOrder {
        /// Latest order snapshot
        order: ExchangeOrder,
        /// Offer the order was created from
        offer_details: ValidOffer,
        /// User action handed to the host, if any
        user_action: Option<UserAction>,
    },
    /// Order finalized
    OrderComplete {
        /// Final order snapshot
        order: ExchangeOrder,
        /// Offer the order was created from
        offer_details: ValidOffer,
    },
}

impl State {
    /// Plain `OrderSetup` with the offer list closed.
    pub fn order_setup() -> Self {
        State::OrderSetup {
            selecting_offer: false,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            State::FeaturePromotion => "FeaturePromotion",
            State::Initializing => "Initializing",
            State::ConfigureSettings { .. } => "ConfigureSettings",
            State::EmptyWallets { .. } => "EmptyWallets",
            State::SelectAsset { .. } => "SelectAsset",
            State::OrderSetup { .. } => "OrderSetup",
            State::CreatingOrder { .. } => "CreatingOrder",
            State::ProcessingOrder { .. } => "ProcessingOrder",
            State::OrderComplete { .. } => "OrderComplete",
        }
    }
}

// =============================================================================
// Offer details
// =============================================================================

/// An offer with an invoice estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOffer {
    /// The offer
    pub offer: ExchangeOffer,
    /// Source units paid per quote unit
    pub source_rate: Option<Decimal>,
    /// Network fee in source units
    pub network_fee: Option<Decimal>,
    /// Platform fee in source units
    pub platform_fee: Option<Decimal>,
    /// Provider fee in source units
    pub provider_fee: Option<Decimal>,
    /// Source amount before fees
    pub source_subtotal: Decimal,
    /// Source fees
    pub source_fees: Decimal,
    /// Source amount after fees
    pub source_total: Decimal,
    /// Quote amount before fees
    pub quote_subtotal: Decimal,
    /// Quote fees
    pub quote_fees: Decimal,
    /// Quote amount after fees
    pub quote_total: Decimal,
}

/// An offer the current amount does not qualify for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidOffer {
    /// The offer
    pub offer: ExchangeOffer,
    /// Provider minimum in source units
    pub min_source_amount: Option<Decimal>,
    /// Provider maximum in source units
    pub max_source_amount: Option<Decimal>,
    /// Raw amount that would make the offer valid
    pub raw_replacement_amount: Option<String>,
}

/// An offer as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfferDetails {
    /// Usable offer
    Valid(ValidOffer),
    /// Offer outside provider limits
    Invalid(InvalidOffer),
}

impl OfferDetails {
    /// The underlying offer.
    pub fn offer(&self) -> &ExchangeOffer {
        match self {
            OfferDetails::Valid(valid) => &valid.offer,
            OfferDetails::Invalid(invalid) => &invalid.offer,
        }
    }

    /// The valid offer, if this is one.
    pub fn as_valid(&self) -> Option<&ValidOffer> {
        match self {
            OfferDetails::Valid(valid) => Some(valid),
            OfferDetails::Invalid(_) => None,
        }
    }
}

/// Progress of offer gathering as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferState {
    /// Nothing to request (no amount, or the amount is invalid)
    Idle,
    /// Waiting for offers
    Gathering,
    /// Gathering finished without offers
    NoOffers,
    /// Offers available
    Completed,
}

// =============================================================================
// Errors
// =============================================================================

/// Business-rule violation of the typed amount. Blocks `Continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Amount exceeds the wallet balance
    BalanceLow {
        /// Available balance
        balance: Decimal,
    },
    /// Not enough native asset to pay the network fee
    InsufficientNativeCurrencyBalance {
        /// Native fee currency
        currency_code: String,
        /// Required fee
        fee: Decimal,
    },
}

/// Classification of a fault shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /// Startup failed
    InitializationError,
    /// A service call failed
    NetworkError,
    /// Order creation or processing failed
    OrderError,
    /// Anything else
    UnknownError,
    /// An on-chain action failed
    TransactionError(Option<SendFailedReason>),
    /// No BUY pairs for the configured location
    UnsupportedRegionError,
    /// The wallet lacks native asset for fees
    InsufficientNativeBalanceError {
        /// Native fee currency
        currency_code: String,
        /// Required amount
        amount: Decimal,
    },
}

/// A fault awaiting user acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorState {
    /// Optional title override
    pub title: Option<String>,
    /// Optional message override
    pub message: Option<String>,
    /// Diagnostic detail
    pub debug_message: String,
    /// Classification
    pub error_type: ErrorType,
    /// Confirming can retry or redirect instead of exiting
    pub is_recoverable: bool,
}

impl ErrorState {
    /// A fault the user can retry or be redirected from.
    pub fn recoverable(error_type: ErrorType, debug_message: impl Into<String>) -> Self {
        Self {
            title: None,
            message: None,
            debug_message: debug_message.into(),
            error_type,
            is_recoverable: true,
        }
    }

    /// A fault that ends the current attempt.
    pub fn fatal(error_type: ErrorType, debug_message: impl Into<String>) -> Self {
        Self {
            is_recoverable: false,
            ..Self::recoverable(error_type, debug_message)
        }
    }
}

// =============================================================================
// Model
// =============================================================================

/// Snapshot of the whole exchange flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub state: State,
    pub mode: Mode,
    pub test: bool,
    pub settings_only: bool,

    pub source_amount_input: String,
    pub quote_amount_input: Option<String>,
    pub source_currency_code: Option<String>,
    pub quote_currency_code: Option<String>,

    pub selected_country: Option<ExchangeCountry>,
    pub selected_region: Option<ExchangeRegion>,
    pub selected_fiat_currency: Option<ExchangeCurrency>,
    pub countries: Vec<ExchangeCountry>,
    pub currencies: BTreeMap<String, ExchangeCurrency>,
    pub pairs: Vec<ExchangePair>,

    pub offer_request: Option<OfferRequest>,
    pub offer_details: Vec<OfferDetails>,
    pub selected_offer: Option<OfferDetails>,
    pub last_offer_selection: Option<InvalidOffer>,

    pub crypto_balances: BTreeMap<String, Decimal>,
    pub did_load_crypto_balances: bool,
    pub native_network_info: Option<NativeNetworkInfo>,

    pub input_error: Option<InputError>,
    pub error_state: Option<ErrorState>,
    pub confirming_close: bool,

    pub last_purchase_currency_code: String,
    pub last_sell_currency_code: Option<String>,
    pub last_trade_source_currency_code: Option<String>,
    pub last_trade_quote_currency_code: Option<String>,
    pub api_host: String,
}

impl Model {
    /// Fresh model for a flow in `mode`.
    pub fn create(mode: Mode, test: bool) -> Self {
        Self {
            state: State::Initializing,
            mode,
            test,
            settings_only: false,
            source_amount_input: String::new(),
            quote_amount_input: None,
            source_currency_code: None,
            quote_currency_code: None,
            selected_country: None,
            selected_region: None,
            selected_fiat_currency: None,
            countries: Vec::new(),
            currencies: BTreeMap::new(),
            pairs: Vec::new(),
            offer_request: None,
            offer_details: Vec::new(),
            selected_offer: None,
            last_offer_selection: None,
            crypto_balances: BTreeMap::new(),
            did_load_crypto_balances: false,
            native_network_info: None,
            input_error: None,
            error_state: None,
            confirming_close: false,
            last_purchase_currency_code: DEFAULT_PURCHASE_CURRENCY.to_string(),
            last_sell_currency_code: None,
            last_trade_source_currency_code: None,
            last_trade_quote_currency_code: None,
            api_host: String::new(),
        }
    }

    /// Fresh model that only runs the settings wizard.
    pub fn create_for_settings() -> Self {
        Self {
            settings_only: true,
            ..Self::create(Mode::Buy, false)
        }
    }

    // -------------------------------------------------------------------------
    // Derived values
    // -------------------------------------------------------------------------

    /// Parsed source amount; zero for empty or partial input.
    pub fn source_amount(&self) -> Decimal {
        parse_amount(&self.source_amount_input).unwrap_or(Decimal::ZERO)
    }

    /// Currency being spent.
    pub fn source_currency(&self) -> Option<&ExchangeCurrency> {
        self.source_currency_code
            .as_ref()
            .and_then(|code| self.currencies.get(code))
    }

    /// Currency being received.
    pub fn quote_currency(&self) -> Option<&ExchangeCurrency> {
        self.quote_currency_code
            .as_ref()
            .and_then(|code| self.currencies.get(code))
    }

    /// Pairs leaving the selected source currency.
    pub fn source_pairs(&self) -> Vec<&ExchangePair> {
        match &self.source_currency_code {
            Some(source) => self
                .pairs
                .iter()
                .filter(|pair| &pair.from_code == source)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Pair connecting the selected source and quote currencies.
    pub fn selected_pair(&self) -> Option<&ExchangePair> {
        let quote = self.quote_currency_code.as_ref()?;
        self.source_pairs()
            .into_iter()
            .find(|pair| &pair.to_code == quote)
    }

    /// Quote amount implied by the source amount.
    pub fn quote_amount(&self) -> Option<Decimal> {
        let pair = self.selected_pair()?;
        let amount = self.source_amount();
        Some(match self.mode {
            Mode::Sell => pair.input_from_output(amount),
            Mode::Buy | Mode::Trade => pair.estimated_output(amount),
        })
    }

    /// Source amount implied by a quote amount; the inverse of `quote_amount`.
    pub fn source_for_quote(&self, quote: Decimal) -> Option<Decimal> {
        let pair = self.selected_pair()?;
        Some(match self.mode {
            Mode::Sell => pair.estimated_output(quote),
            Mode::Buy | Mode::Trade => pair.input_from_output(quote),
        })
    }

    /// Offer gathering progress.
    pub fn offer_state(&self) -> OfferState {
        if self.source_amount().is_zero() || self.input_error.is_some() {
            return OfferState::Idle;
        }
        match &self.offer_request {
            None => OfferState::Gathering,
            Some(request) if !request.is_complete() => OfferState::Gathering,
            Some(request) if request.offers.is_empty() => OfferState::NoOffers,
            Some(_) => OfferState::Completed,
        }
    }

    /// Some pair sells into a fiat currency.
    pub fn has_sell_pairs(&self) -> bool {
        self.pairs.iter().any(|pair| {
            self.currencies
                .get(&pair.to_code)
                .map(ExchangeCurrency::is_fiat)
                .unwrap_or(false)
        })
    }

    /// Some enabled wallet holds a positive balance.
    pub fn has_wallet_balances(&self) -> bool {
        self.crypto_balances.values().any(|balance| *balance > Decimal::ZERO)
    }

    /// Wallet balance of `code`, zero when unknown.
    pub fn balance_of(&self, code: &str) -> Decimal {
        self.crypto_balances.get(code).copied().unwrap_or(Decimal::ZERO)
    }

    /// Offer body for the current inputs, when every input is present.
    pub fn offer_body(&self) -> Option<OfferBody> {
        let country = self.selected_country.as_ref()?;
        if country.requires_region() && self.selected_region.is_none() {
            return None;
        }
        let source = self.source_currency()?;
        let quote_code = self.quote_currency_code.as_ref()?;
        let amount = self.source_amount();
        if amount.is_zero() {
            return None;
        }
        Some(OfferBody {
            country_code: country.code.clone(),
            region_code: self.selected_region.as_ref().map(|region| region.code.clone()),
            source_currency_code: source.code.clone(),
            quote_currency_code: quote_code.clone(),
            source_currency_amount: amount,
            currency_id: source.currency_id.clone(),
            test: self.test,
        })
    }

    /// Whether an offer result for `body` still describes the current inputs.
    pub fn matches_offer_body(&self, body: &OfferBody) -> bool {
        self.offer_body()
            .map(|current| current.same_request(body))
            .unwrap_or(false)
    }

    /// Country, region and a known fiat currency are all selected.
    pub fn is_region_configured(&self) -> bool {
        let Some(country) = &self.selected_country else {
            return false;
        };
        if country.requires_region() && self.selected_region.is_none() {
            return false;
        }
        let Some(fiat) = &self.selected_fiat_currency else {
            return false;
        };
        let mut known_fiat = self.currencies.values().filter(|c| c.is_fiat()).peekable();
        if known_fiat.peek().is_some() {
            known_fiat.any(|currency| currency.code == fiat.code)
        } else {
            self.countries.iter().any(|c| c.currency.code == fiat.code)
        }
    }

    /// Distinct local currencies of the known countries.
    pub fn fiat_currencies(&self) -> Vec<ExchangeCurrency> {
        let mut fiat: Vec<ExchangeCurrency> = Vec::new();
        for country in &self.countries {
            if !fiat.iter().any(|c| c.code == country.currency.code) {
                fiat.push(country.currency.clone());
            }
        }
        fiat
    }

    /// Analytics event name for `action` in the current mode.
    pub fn event_name(&self, action: &str) -> String {
        format!("{}.{}", self.mode, action)
    }

    /// Quote amount rendered for the input field.
    pub fn quote_amount_text(&self) -> Option<String> {
        let amount = self.quote_amount()?;
        let decimals = self.quote_currency().map(|c| c.decimals).unwrap_or(8);
        Some(normalize_amount(amount, decimals))
    }

    /// Default (source, quote) codes for the mode.
    pub fn default_currency_codes(&self) -> (Option<String>, Option<String>) {
        let fiat = self.selected_fiat_currency.as_ref().map(|c| c.code.clone());
        let purchase = Some(self.last_purchase_currency_code.clone());
        match self.mode {
            Mode::Buy => (fiat, purchase),
            Mode::Sell => (self.last_sell_currency_code.clone().or(purchase), fiat),
            Mode::Trade => {
                let source = self
                    .last_trade_source_currency_code
                    .clone()
                    .or_else(|| self.largest_balance_except(None));
                let quote = self
                    .last_trade_quote_currency_code
                    .clone()
                    .or_else(|| self.largest_balance_except(source.as_deref()));
                (source, quote)
            }
        }
    }

    fn largest_balance_except(&self, excluded: Option<&str>) -> Option<String> {
        self.crypto_balances
            .iter()
            .filter(|(code, _)| Some(code.as_str()) != excluded)
            .fold(None, |best: Option<(&String, &Decimal)>, (code, balance)| match best {
                Some((_, top)) if top >= balance => best,
                _ => Some((code, balance)),
            })
            .map(|(code, _)| code.clone())
    }

    /// The fields that define an offer request.
    pub(crate) fn offer_tuple(&self) -> OfferTuple<'_> {
        OfferTuple {
            source: self.source_currency_code.as_deref(),
            quote: self.quote_currency_code.as_deref(),
            amount: self.source_amount(),
            country: self.selected_country.as_ref().map(|c| c.code.as_str()),
            region: self.selected_region.as_ref().map(|r| r.code.as_str()),
        }
    }

    /// Copy with every offer-related field reset.
    pub(crate) fn without_offers(mut self) -> Self {
        self.offer_request = None;
        self.offer_details = Vec::new();
        self.selected_offer = None;
        self
    }
}

/// Offer-defining inputs, borrowed from a model.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct OfferTuple<'a> {
    source: Option<&'a str>,
    quote: Option<&'a str>,
    amount: Decimal,
    country: Option<&'a str>,
    region: Option<&'a str>,
}
