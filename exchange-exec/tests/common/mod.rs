//! Harness and fixtures shared by the runtime integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use exchange_domain::{
    CurrencyMethod, Estimate, ExchangeOffer, ExchangeOrder, InvoiceEstimate, MethodStatus,
    OfferBody, Provider,
};
use exchange_engine::Event;
use exchange_exec::{EffectRuntime, RuntimeConfig, RuntimeDeps, StubExchangeApi, StubWallet};
use exchange_store::MemoryStore;

pub const HOST: &str = "https://api.example.com";
pub const BTC_ID: &str = "bitcoin-mainnet:__native__";

pub struct Harness {
    pub api: Arc<StubExchangeApi>,
    pub wallet: Arc<StubWallet>,
    pub store: Arc<MemoryStore>,
    pub deps: RuntimeDeps,
    pub runtime: EffectRuntime,
    pub events: UnboundedReceiver<Event>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        let api = Arc::new(StubExchangeApi::new(HOST));
        let wallet = Arc::new(StubWallet::new());
        let store = Arc::new(MemoryStore::new());
        let deps = RuntimeDeps::new(api.clone(), wallet.clone(), store.clone());
        let (tx, events) = mpsc::unbounded_channel();
        let runtime = EffectRuntime::new(deps.clone(), config, tx);
        Self {
            api,
            wallet,
            store,
            deps,
            runtime,
            events,
        }
    }

    /// Next event, or `None` when nothing arrives within a minute of
    /// (possibly paused) time.
    pub async fn next_event(&mut self) -> Option<Event> {
        tokio::time::timeout(Duration::from_secs(60), self.events.recv())
            .await
            .ok()
            .flatten()
    }

    /// Let a minute of time pass and collect whatever was emitted.
    pub async fn drain(&mut self) -> Vec<Event> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Give spawned handlers a chance to finish writes that emit nothing.
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}

pub fn body(amount: Decimal) -> OfferBody {
    OfferBody {
        country_code: "DE".to_string(),
        region_code: None,
        source_currency_code: "btc".to_string(),
        quote_currency_code: "eur".to_string(),
        source_currency_amount: amount,
        currency_id: BTC_ID.to_string(),
        test: false,
    }
}

pub fn offer(slug: &str) -> ExchangeOffer {
    let created_at = Utc.with_ymd_and_hms(2021, 3, 2, 10, 0, 0).unwrap();
    ExchangeOffer {
        offer_id: format!("offer-{slug}"),
        created_at,
        expires_at: created_at + chrono::Duration::minutes(5),
        quote_currency_method: CurrencyMethod::Sepa {
            status: MethodStatus::Ready,
        },
        source_currency_method: CurrencyMethod::Crypto {
            status: MethodStatus::Ready,
        },
        provider: Provider {
            name: slug.to_uppercase(),
            logo_url: None,
            slug: slug.to_string(),
            url: None,
        },
        delivery_estimate: None,
        limits: vec![],
        invoice_estimate: Some(InvoiceEstimate {
            fees: vec![],
            source_currency: Estimate {
                subtotal: dec!(0.99),
                fees: dec!(0.01),
                total: dec!(1),
            },
            quote_currency: Estimate {
                subtotal: dec!(45000),
                fees: Decimal::ZERO,
                total: dec!(45000),
            },
        }),
    }
}

/// A btc -> eth trade waiting for a receive and a refund address.
pub fn order_waiting_for_addresses() -> ExchangeOrder {
    serde_json::from_str(
        r#"{
            "url": "https://api.example.com/exchange/orders/ord_7",
            "order_id": "ord_7",
            "status": "initializing",
            "country_code": "DE",
            "provider": { "name": "Changelly", "slug": "changelly" },
            "created_at": "2021-03-02T10:00:00Z",
            "inputs": [{
                "type": "crypto_transfer",
                "crypto_transfer_status": "waiting_for_address",
                "media": "crypto",
                "amount": "0.5",
                "currency": { "code": "btc", "name": "Bitcoin", "currency_id": "bitcoin-mainnet:__native__", "type": "crypto", "decimals": 8 },
                "actions": [{ "type": "crypto_refund_address", "url": "https://api.example.com/exchange/orders/ord_7/refund" }]
            }],
            "outputs": [{
                "type": "crypto_transfer",
                "crypto_transfer_status": "waiting_for_address",
                "media": "crypto",
                "amount": "7.5",
                "currency": { "code": "eth", "name": "Ethereum", "currency_id": "ethereum-mainnet:__native__", "type": "crypto", "decimals": 18 },
                "actions": [{ "type": "crypto_receive_address", "url": "https://api.example.com/exchange/orders/ord_7/receive" }]
            }]
        }"#,
    )
    .unwrap()
}

/// Same order once the service has both addresses.
pub fn order_ready() -> ExchangeOrder {
    let mut order = order_waiting_for_addresses();
    order.status = exchange_domain::OrderStatus::Initialized;
    for input in &mut order.inputs {
        input.actions.clear();
        input.transfer = exchange_domain::InputTransfer::CryptoTransfer {
            status: exchange_domain::CryptoInputStatus::WaitingForPayment,
            send_to_address: Some("bc1qservice".to_string()),
            send_to_destination_tag: None,
            refund_address: Some("stub-address-bitcoin-mainnet:__native__".to_string()),
            transaction_id: None,
        };
    }
    for output in &mut order.outputs {
        output.actions.clear();
    }
    order
}
