//! Fixtures shared by the engine integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use exchange_domain::{
    CurrencyMethod, Estimate, ExchangeCountry, ExchangeCurrency, ExchangeOffer, ExchangePair,
    InvoiceEstimate, Limit, LimitType, MethodStatus, OfferBody, OfferRequest, OfferRequestStatus,
    Provider,
};
use exchange_engine::{Effect, Mode, Model, State};

pub fn created_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 3, 2, 10, 0, 0).unwrap()
}

pub fn usd() -> ExchangeCurrency {
    ExchangeCurrency::fiat("usd", "US Dollar", 2)
}

pub fn btc() -> ExchangeCurrency {
    ExchangeCurrency::crypto("btc", "Bitcoin", "bitcoin-mainnet:__native__", 8)
}

pub fn germany() -> ExchangeCountry {
    ExchangeCountry {
        code: "DE".to_string(),
        name: "Germany".to_string(),
        currency: usd(),
        regions: Vec::new(),
    }
}

/// Model in `OrderSetup` with usd <-> btc pairs at 50000.
pub fn order_setup(mode: Mode) -> Model {
    let mut model = Model::create(mode, false);
    model.currencies.insert("usd".to_string(), usd());
    model.currencies.insert("btc".to_string(), btc());
    model.pairs = vec![
        ExchangePair::new("usd", "btc", dec!(50000)),
        ExchangePair::new("btc", "usd", dec!(50000)),
    ];
    model.countries = vec![germany()];
    model.selected_country = Some(germany());
    model.selected_fiat_currency = Some(usd());
    let (source, quote) = match mode {
        Mode::Buy => ("usd", "btc"),
        Mode::Sell | Mode::Trade => ("btc", "usd"),
    };
    model.source_currency_code = Some(source.to_string());
    model.quote_currency_code = Some(quote.to_string());
    model.state = State::order_setup();
    model.api_host = "https://api.example.com".to_string();
    model
}

/// An offer from `slug`; `invoice` makes it valid for the requested amount.
pub fn offer(slug: &str, invoice: bool) -> ExchangeOffer {
    ExchangeOffer {
        offer_id: format!("offer-{slug}"),
        created_at: created_at(),
        expires_at: created_at() + chrono::Duration::minutes(5),
        quote_currency_method: CurrencyMethod::Crypto {
            status: MethodStatus::Ready,
        },
        source_currency_method: CurrencyMethod::Card {
            status: MethodStatus::Ready,
            description: None,
        },
        provider: Provider {
            name: slug.to_uppercase(),
            logo_url: None,
            slug: slug.to_string(),
            url: None,
        },
        delivery_estimate: None,
        limits: vec![
            Limit {
                name: "min".to_string(),
                limit_type: LimitType::SourceCurrencyMin,
                amount: dec!(50),
                consumed: None,
            },
            Limit {
                name: "max".to_string(),
                limit_type: LimitType::SourceCurrencyMax,
                amount: dec!(5000),
                consumed: None,
            },
        ],
        invoice_estimate: invoice.then(|| InvoiceEstimate {
            fees: Vec::new(),
            source_currency: Estimate {
                subtotal: dec!(95),
                fees: dec!(5),
                total: dec!(100),
            },
            quote_currency: Estimate {
                subtotal: dec!(0.0019),
                fees: Decimal::ZERO,
                total: dec!(0.0019),
            },
        }),
    }
}

pub fn offer_request(body: &OfferBody, offers: Vec<ExchangeOffer>, complete: bool) -> OfferRequest {
    OfferRequest {
        url: "https://api.example.com/exchange/offer-requests/req_1".to_string(),
        created_at: created_at(),
        status: if complete {
            OfferRequestStatus::Complete
        } else {
            OfferRequestStatus::Gathering
        },
        country_code: body.country_code.clone(),
        region_code: body.region_code.clone(),
        source_currency_code: body.source_currency_code.clone(),
        quote_currency_code: body.quote_currency_code.clone(),
        offers,
    }
}

/// Body of the last `RequestOffers` in `effects`.
pub fn requested_body(effects: &[Effect]) -> Option<OfferBody> {
    effects.iter().rev().find_map(|effect| match effect {
        Effect::RequestOffers { body, .. } => body.clone(),
        _ => None,
    })
}
