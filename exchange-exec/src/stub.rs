//! Stub implementations for testing.
//!
//! These implementations script the exchange service and the wallet
//! without network access or keys, and record what the runtime asked for.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use exchange_domain::{
    ActionType, ApiError, CountriesResponse, ExchangeOffer, ExchangeOrder, NativeNetworkInfo,
    OfferBody, OfferRequest, OfferRequestStatus, OrderAction, OrderFailure, PairsResponse,
};

use crate::ports::{ExchangeApiPort, WalletPort};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Stub Exchange API
// =============================================================================

struct ApiState {
    countries: Result<CountriesResponse, ApiError>,
    pairs: Result<PairsResponse, ApiError>,
    offers: Vec<ExchangeOffer>,
    offer_status: OfferRequestStatus,
    offer_request_error: Option<ApiError>,
    polls: VecDeque<Result<OfferRequest, ApiError>>,
    last_request: Option<OfferRequest>,
    order: Result<ExchangeOrder, OrderFailure>,
    refreshed_order: Option<ExchangeOrder>,
    address_rejections: u32,
    hash_accepted: bool,

    countries_calls: usize,
    pairs_calls: usize,
    offer_bodies: Vec<OfferBody>,
    poll_count: usize,
    order_calls: Vec<String>,
    submitted_addresses: Vec<(ActionType, String)>,
    submitted_hashes: Vec<String>,
}

/// Stub exchange service.
///
/// Offer requests are built from the configured offers; polls replay
/// queued results, then keep answering with the last request unchanged.
pub struct StubExchangeApi {
    host: String,
    state: Mutex<ApiState>,
}

impl StubExchangeApi {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            state: Mutex::new(ApiState {
                countries: Ok(CountriesResponse {
                    countries: vec![],
                    detected_country_code: None,
                    detected_region_code: None,
                }),
                pairs: Ok(PairsResponse {
                    pairs: vec![],
                    currencies: vec![],
                }),
                offers: vec![],
                offer_status: OfferRequestStatus::Complete,
                offer_request_error: None,
                polls: VecDeque::new(),
                last_request: None,
                order: Err(OrderFailure::unknown("No order configured")),
                refreshed_order: None,
                address_rejections: 0,
                hash_accepted: true,
                countries_calls: 0,
                pairs_calls: 0,
                offer_bodies: vec![],
                poll_count: 0,
                order_calls: vec![],
                submitted_addresses: vec![],
                submitted_hashes: vec![],
            }),
        }
    }

    pub fn set_countries(&self, countries: Result<CountriesResponse, ApiError>) {
        lock(&self.state).countries = countries;
    }

    pub fn set_pairs(&self, pairs: Result<PairsResponse, ApiError>) {
        lock(&self.state).pairs = pairs;
    }

    /// Offers and status returned by the next created offer requests.
    pub fn set_offers(&self, offers: Vec<ExchangeOffer>, status: OfferRequestStatus) {
        let mut state = lock(&self.state);
        state.offers = offers;
        state.offer_status = status;
    }

    /// Make offer request creation fail until cleared.
    pub fn set_offer_request_error(&self, error: Option<ApiError>) {
        lock(&self.state).offer_request_error = error;
    }

    /// Queue the result of the next poll.
    pub fn push_poll(&self, result: Result<OfferRequest, ApiError>) {
        lock(&self.state).polls.push_back(result);
    }

    pub fn set_order(&self, order: Result<ExchangeOrder, OrderFailure>) {
        lock(&self.state).order = order;
    }

    /// What `get_order` returns after addresses are submitted.
    pub fn set_refreshed_order(&self, order: Option<ExchangeOrder>) {
        lock(&self.state).refreshed_order = order;
    }

    /// Reject the next `count` address submissions.
    pub fn reject_addresses(&self, count: u32) {
        lock(&self.state).address_rejections = count;
    }

    pub fn set_hash_accepted(&self, accepted: bool) {
        lock(&self.state).hash_accepted = accepted;
    }

    pub fn countries_calls(&self) -> usize {
        lock(&self.state).countries_calls
    }

    pub fn pairs_calls(&self) -> usize {
        lock(&self.state).pairs_calls
    }

    /// Bodies of every created offer request, in order.
    pub fn offer_bodies(&self) -> Vec<OfferBody> {
        lock(&self.state).offer_bodies.clone()
    }

    pub fn poll_count(&self) -> usize {
        lock(&self.state).poll_count
    }

    /// Offer ids orders were created for.
    pub fn order_calls(&self) -> Vec<String> {
        lock(&self.state).order_calls.clone()
    }

    pub fn submitted_addresses(&self) -> Vec<(ActionType, String)> {
        lock(&self.state).submitted_addresses.clone()
    }

    pub fn submitted_hashes(&self) -> Vec<String> {
        lock(&self.state).submitted_hashes.clone()
    }
}

#[async_trait]
impl ExchangeApiPort for StubExchangeApi {
    fn host(&self) -> String {
        self.host.clone()
    }

    async fn get_exchange_countries(&self) -> Result<CountriesResponse, ApiError> {
        let mut state = lock(&self.state);
        state.countries_calls += 1;
        state.countries.clone()
    }

    async fn get_exchange_pairs(
        &self,
        _country_code: &str,
        _region_code: Option<&str>,
        source_code: Option<&str>,
        quote_code: Option<&str>,
    ) -> Result<PairsResponse, ApiError> {
        let mut state = lock(&self.state);
        state.pairs_calls += 1;
        let mut response = state.pairs.clone()?;
        response.pairs.retain(|pair| {
            source_code.map_or(true, |code| pair.from_code == code)
                && quote_code.map_or(true, |code| pair.to_code == code)
        });
        Ok(response)
    }

    async fn create_offer_request(&self, body: &OfferBody) -> Result<OfferRequest, ApiError> {
        let mut state = lock(&self.state);
        state.offer_bodies.push(body.clone());
        if let Some(error) = &state.offer_request_error {
            return Err(error.clone());
        }

        let request = OfferRequest {
            url: format!(
                "{}/exchange/offer-requests/req_{}",
                self.host,
                state.offer_bodies.len()
            ),
            created_at: Utc::now(),
            status: state.offer_status,
            country_code: body.country_code.clone(),
            region_code: body.region_code.clone(),
            source_currency_code: body.source_currency_code.clone(),
            quote_currency_code: body.quote_currency_code.clone(),
            offers: state.offers.clone(),
        };
        state.last_request = Some(request.clone());
        Ok(request)
    }

    async fn get_offer_request(&self, id: &str) -> Result<OfferRequest, ApiError> {
        let mut state = lock(&self.state);
        state.poll_count += 1;
        match state.polls.pop_front() {
            Some(Ok(request)) => {
                state.last_request = Some(request.clone());
                Ok(request)
            },
            Some(Err(error)) => Err(error),
            None => state
                .last_request
                .clone()
                .ok_or_else(|| ApiError::new(404, format!("Unknown offer request {id}"))),
        }
    }

    async fn create_order(&self, offer_id: &str) -> Result<ExchangeOrder, OrderFailure> {
        let mut state = lock(&self.state);
        state.order_calls.push(offer_id.to_string());
        state.order.clone()
    }

    async fn get_order(&self, _order_id: &str) -> Option<ExchangeOrder> {
        let state = lock(&self.state);
        state
            .refreshed_order
            .clone()
            .or_else(|| state.order.clone().ok())
    }

    async fn submit_crypto_address(&self, action: &OrderAction, address: &str) -> bool {
        let mut state = lock(&self.state);
        if state.address_rejections > 0 {
            state.address_rejections -= 1;
            return false;
        }
        state
            .submitted_addresses
            .push((action.action_type, address.to_string()));
        true
    }

    async fn submit_crypto_send_transaction_id(
        &self,
        _action: &OrderAction,
        transaction_id: &str,
    ) -> bool {
        let mut state = lock(&self.state);
        state.submitted_hashes.push(transaction_id.to_string());
        state.hash_accepted
    }
}

// =============================================================================
// Stub Wallet
// =============================================================================

#[derive(Default)]
struct WalletState {
    balances: BTreeMap<String, Decimal>,
    addresses: BTreeMap<String, Option<String>>,
    maximums: BTreeMap<String, Decimal>,
    network_info: BTreeMap<String, NativeNetworkInfo>,
    estimate_targets: Vec<(String, String)>,
}

/// Stub wallet.
///
/// Every currency has a generated receive address unless one is set.
/// Max estimates fail for currencies without a configured maximum.
#[derive(Default)]
pub struct StubWallet {
    state: Mutex<WalletState>,
}

impl StubWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&self, currency_code: &str, amount: Decimal) {
        lock(&self.state)
            .balances
            .insert(currency_code.to_string(), amount);
    }

    /// Override the receive address; `None` makes the wallet return none.
    pub fn set_address(&self, currency_id: &str, address: Option<&str>) {
        lock(&self.state)
            .addresses
            .insert(currency_id.to_string(), address.map(str::to_string));
    }

    pub fn set_maximum(&self, currency_id: &str, maximum: Decimal) {
        lock(&self.state)
            .maximums
            .insert(currency_id.to_string(), maximum);
    }

    pub fn set_network_info(&self, info: NativeNetworkInfo) {
        lock(&self.state)
            .network_info
            .insert(info.currency_id.clone(), info);
    }

    /// `(currency_id, target_address)` of every max estimate.
    pub fn estimate_targets(&self) -> Vec<(String, String)> {
        lock(&self.state).estimate_targets.clone()
    }
}

#[async_trait]
impl WalletPort for StubWallet {
    async fn load_wallet_balances(&self) -> BTreeMap<String, Decimal> {
        lock(&self.state).balances.clone()
    }

    async fn receive_address_for(&self, currency_id: &str) -> Option<String> {
        match lock(&self.state).addresses.get(currency_id) {
            Some(address) => address.clone(),
            None => Some(format!("stub-address-{currency_id}")),
        }
    }

    async fn estimate_limit_maximum(
        &self,
        currency_id: &str,
        target_address: &str,
    ) -> Option<Decimal> {
        let mut state = lock(&self.state);
        state
            .estimate_targets
            .push((currency_id.to_string(), target_address.to_string()));
        state.maximums.get(currency_id).copied()
    }

    async fn native_network_info(&self, currency_id: &str) -> Option<NativeNetworkInfo> {
        lock(&self.state).network_info.get(currency_id).cloned()
    }
}
