//! Execution layer port definitions.
//!
//! Ports define the collaborators the runtime talks to: the exchange service
//! and the user's wallet. Adapters implement them for a real HTTP client or
//! wallet, and `stub` implements them for tests and demos.
//!
//! Service failures are returned as values (`ApiError`, `OrderFailure`)
//! because the flow reacts to them; they are not `ExecError`s.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use exchange_domain::{
    ApiError, CountriesResponse, ExchangeOrder, NativeNetworkInfo, OfferBody, OfferRequest,
    OrderAction, OrderFailure, PairsResponse,
};

// =============================================================================
// Exchange API Port
// =============================================================================

/// Port for the exchange service.
///
/// Implementations:
/// - `StubExchangeApi` - scripted responses for tests and the demo binary
#[async_trait]
pub trait ExchangeApiPort: Send + Sync {
    /// Base url of the service, reported to the flow with the preferences.
    fn host(&self) -> String;

    /// Supported countries and the caller's detected location.
    async fn get_exchange_countries(&self) -> Result<CountriesResponse, ApiError>;

    /// Tradable pairs for a location.
    ///
    /// `source_code` / `quote_code` narrow the result to pairs with that
    /// side; the flow always loads the whole location.
    async fn get_exchange_pairs(
        &self,
        country_code: &str,
        region_code: Option<&str>,
        source_code: Option<&str>,
        quote_code: Option<&str>,
    ) -> Result<PairsResponse, ApiError>;

    /// Start gathering offers for `body`.
    async fn create_offer_request(&self, body: &OfferBody) -> Result<OfferRequest, ApiError>;

    /// Current state of a gathering offer request.
    async fn get_offer_request(&self, id: &str) -> Result<OfferRequest, ApiError>;

    /// Place an order for an offer.
    async fn create_order(&self, offer_id: &str) -> Result<ExchangeOrder, OrderFailure>;

    /// Latest state of an order, `None` when it cannot be fetched.
    async fn get_order(&self, order_id: &str) -> Option<ExchangeOrder>;

    /// Answer an address action. Returns whether the service accepted it.
    async fn submit_crypto_address(&self, action: &OrderAction, address: &str) -> bool;

    /// Report the transaction that paid a crypto-send action.
    async fn submit_crypto_send_transaction_id(
        &self,
        action: &OrderAction,
        transaction_id: &str,
    ) -> bool;
}

// =============================================================================
// Wallet Port
// =============================================================================

/// Port for the user's wallet.
#[async_trait]
pub trait WalletPort: Send + Sync {
    /// Spendable balance per lower-case currency code.
    async fn load_wallet_balances(&self) -> BTreeMap<String, Decimal>;

    /// A receive address for `currency_id`, `None` when the wallet has none.
    async fn receive_address_for(&self, currency_id: &str) -> Option<String>;

    /// Largest amount of `currency_id` that can be sent to `target_address`
    /// after fees, `None` when the wallet cannot estimate.
    async fn estimate_limit_maximum(
        &self,
        currency_id: &str,
        target_address: &str,
    ) -> Option<Decimal>;

    /// Fee information for sending `currency_id`.
    async fn native_network_info(&self, currency_id: &str) -> Option<NativeNetworkInfo>;
}
