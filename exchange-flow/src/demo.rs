//! Scripted catalog for the demo binary and end-to-end tests.
//!
//! Germany buys bitcoin with euros through a single card provider. The
//! order asks the app for a receive address, then sends the user to the
//! provider's checkout page.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use exchange_domain::{
    ActionType, CountriesResponse, CryptoOutputStatus, CurrencyMethod, Estimate, ExchangeCountry,
    ExchangeCurrency, ExchangeInput, ExchangeOffer, ExchangeOrder, ExchangeOutput, ExchangePair,
    ExchangeRegion, InputTransfer, InvoiceEstimate, Media, MethodStatus, OfferRequestStatus,
    OrderAction, OrderStatus, OutputTransfer, PairsResponse, Provider,
};
use exchange_exec::{RuntimeDeps, StubExchangeApi, StubWallet};
use exchange_store::{KeyValueStore, StoreResult, UserPreferences};

pub const BTC_ID: &str = "bitcoin-mainnet:__native__";
pub const ETH_ID: &str = "ethereum-mainnet:__native__";

/// Fixed so the scripted offer never looks expired in logs.
fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 2, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

pub fn eur() -> ExchangeCurrency {
    ExchangeCurrency::fiat("eur", "Euro", 2)
}

pub fn usd() -> ExchangeCurrency {
    ExchangeCurrency::fiat("usd", "US Dollar", 2)
}

pub fn btc() -> ExchangeCurrency {
    ExchangeCurrency::crypto("btc", "Bitcoin", BTC_ID, 8)
}

pub fn eth() -> ExchangeCurrency {
    ExchangeCurrency::crypto("eth", "Ethereum", ETH_ID, 18)
}

pub fn countries() -> CountriesResponse {
    CountriesResponse {
        countries: vec![
            ExchangeCountry {
                code: "DE".to_string(),
                name: "Germany".to_string(),
                currency: eur(),
                regions: vec![],
            },
            ExchangeCountry {
                code: "US".to_string(),
                name: "United States".to_string(),
                currency: usd(),
                regions: vec![
                    ExchangeRegion {
                        code: "NY".to_string(),
                        name: "New York".to_string(),
                    },
                    ExchangeRegion {
                        code: "TX".to_string(),
                        name: "Texas".to_string(),
                    },
                ],
            },
        ],
        detected_country_code: Some("DE".to_string()),
        detected_region_code: None,
    }
}

pub fn pairs() -> PairsResponse {
    PairsResponse {
        pairs: vec![
            ExchangePair::new("eur", "btc", Decimal::new(45_000, 0)),
            ExchangePair::new("eur", "eth", Decimal::new(3_000, 0)),
            ExchangePair::new("btc", "eur", Decimal::new(45_000, 0)),
            ExchangePair::new("btc", "eth", Decimal::new(15, 0)),
        ],
        currencies: vec![eur(), btc(), eth()],
    }
}

/// Card offer for `amount` euros at 45000 EUR/BTC with a 1% fee.
pub fn card_offer(amount: Decimal) -> ExchangeOffer {
    let created_at = created_at();
    let fees = amount / Decimal::new(100, 0);
    let subtotal = amount - fees;
    let btc = (subtotal / Decimal::new(45_000, 0)).round_dp(8);
    ExchangeOffer {
        offer_id: "offer-moonpay".to_string(),
        created_at,
        expires_at: created_at + Duration::minutes(5),
        source_currency_method: CurrencyMethod::Card {
            status: MethodStatus::Ready,
            description: Some("Visa 4242".to_string()),
        },
        quote_currency_method: CurrencyMethod::Crypto {
            status: MethodStatus::Ready,
        },
        provider: Provider {
            name: "MoonPay".to_string(),
            logo_url: None,
            slug: "moonpay".to_string(),
            url: Some("https://www.moonpay.com".to_string()),
        },
        delivery_estimate: None,
        limits: vec![],
        invoice_estimate: Some(InvoiceEstimate {
            fees: vec![],
            source_currency: Estimate {
                subtotal,
                fees,
                total: amount,
            },
            quote_currency: Estimate {
                subtotal: btc,
                fees: Decimal::ZERO,
                total: btc,
            },
        }),
    }
}

pub fn checkout_action(host: &str) -> OrderAction {
    OrderAction {
        action_type: ActionType::Browser,
        url: format!("{host}/exchange/orders/ord_demo/checkout"),
        title: "Pay with card".to_string(),
        message: String::new(),
    }
}

/// Order as created: the receive address is still missing.
pub fn created_order(host: &str, amount: Decimal) -> ExchangeOrder {
    let offer = card_offer(amount);
    let quote_total = offer
        .invoice_estimate
        .as_ref()
        .map(|invoice| invoice.quote_currency.total)
        .unwrap_or_default();
    ExchangeOrder {
        url: format!("{host}/exchange/orders/ord_demo"),
        order_id: "ord_demo".to_string(),
        inputs: vec![ExchangeInput {
            media: Media::Card,
            amount,
            currency: eur(),
            actions: vec![checkout_action(host)],
            expires_at: None,
            transfer: InputTransfer::CardPayment,
        }],
        outputs: vec![ExchangeOutput {
            media: Media::Crypto,
            amount: quote_total,
            currency: btc(),
            actions: vec![OrderAction {
                action_type: ActionType::CryptoReceiveAddress,
                url: format!("{host}/exchange/orders/ord_demo/receive"),
                title: String::new(),
                message: String::new(),
            }],
            expires_at: None,
            transfer: OutputTransfer::CryptoTransfer {
                status: CryptoOutputStatus::WaitingForAddress,
                send_to_address: None,
                transaction_id: None,
            },
        }],
        status: OrderStatus::Initializing,
        country_code: "DE".to_string(),
        region_code: None,
        provider: offer.provider,
        test: false,
        created_at: created_at(),
        expires_at: None,
    }
}

/// The same order once the service has the receive address.
pub fn addressed_order(host: &str, amount: Decimal, address: &str) -> ExchangeOrder {
    let mut order = created_order(host, amount);
    order.status = OrderStatus::Initialized;
    for output in &mut order.outputs {
        output.actions.clear();
        output.transfer = OutputTransfer::CryptoTransfer {
            status: CryptoOutputStatus::Ready,
            send_to_address: Some(address.to_string()),
            transaction_id: None,
        };
    }
    order
}

/// Scripted collaborators serving the catalog for an order of `amount`.
pub struct DemoServices {
    pub api: Arc<StubExchangeApi>,
    pub wallet: Arc<StubWallet>,
    pub deps: RuntimeDeps,
}

impl DemoServices {
    pub fn new(host: &str, store: Arc<dyn KeyValueStore>, amount: Decimal) -> Self {
        let api = Arc::new(StubExchangeApi::new(host));
        api.set_countries(Ok(countries()));
        api.set_pairs(Ok(pairs()));
        api.set_offers(vec![card_offer(amount)], OfferRequestStatus::Complete);
        api.set_order(Ok(created_order(host, amount)));
        api.set_refreshed_order(Some(addressed_order(
            host,
            amount,
            &format!("stub-address-{BTC_ID}"),
        )));

        let wallet = Arc::new(StubWallet::new());
        wallet.set_balance("btc", Decimal::new(25, 2));

        let deps = RuntimeDeps::new(api.clone(), wallet.clone(), store);
        Self { api, wallet, deps }
    }
}

/// Store a German returning user who has already seen the BUY promotion.
pub async fn seed_returning_user(preferences: &UserPreferences) -> StoreResult<()> {
    preferences.set_region("DE", None).await?;
    preferences.set_fiat_currency_code("eur").await?;
    preferences.set_promotion_shown("buy").await
}
