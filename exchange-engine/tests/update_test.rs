//! Reducer scenarios: startup, the BUY happy path, offer adjustment,
//! SELL balance checks and the order lifecycle.

mod common;

use std::collections::BTreeMap;

use rust_decimal_macros::dec;

use common::*;
use exchange_domain::{
    ActionType, ExchangeOrder, OrderAction, OrderStatus,
};
use exchange_engine::{
    init, offer_details, update, AmountChange, Effect, Event, InputError, Mode, Model,
    OfferDetails, State, UserPreferencesLoaded,
};

fn apply(model: &Model, event: Event) -> (Model, Vec<Effect>) {
    let next = update(model, event);
    (next.model.unwrap_or_else(|| model.clone()), next.effects)
}

fn type_digits(model: Model, digits: &[u8]) -> (Model, Vec<Effect>) {
    digits
        .iter()
        .fold((model, Vec::new()), |(model, _), digit| {
            apply(&model, Event::OnAmountChange(AmountChange::Digit(*digit)))
        })
}

fn order_json(status: &str, actions: &str) -> ExchangeOrder {
    let json = format!(
        r#"{{
            "url": "https://api.example.com/exchange/orders/ord_1",
            "order_id": "ord_1",
            "status": "{status}",
            "country_code": "DE",
            "provider": {{ "name": "Wyre", "slug": "wyre" }},
            "created_at": "2021-03-02T10:00:00Z",
            "inputs": [{{
                "media": "card",
                "amount": "100",
                "currency": {{ "code": "usd", "name": "US Dollar", "currency_id": "usd", "type": "fiat", "decimals": 2 }},
                "actions": {actions},
                "type": "card_payment"
            }}],
            "outputs": []
        }}"#
    );
    serde_json::from_str(&json).unwrap()
}

// =============================================================================
// Startup
// =============================================================================

#[test]
fn test_returning_user_startup_reaches_order_setup() {
    let model = Model::create(Mode::Buy, false);
    assert_eq!(
        init(&model).effects,
        vec![Effect::LoadFeaturePromotions { mode: Mode::Buy }]
    );

    let (model, effects) = apply(&model, Event::OnFeaturePromotionsLoaded { show: false });
    assert_eq!(effects, vec![Effect::LoadCountries]);

    let (model, effects) = apply(
        &model,
        Event::OnCountriesLoaded {
            countries: vec![germany()],
            default_country_code: Some("DE".to_string()),
            default_region_code: None,
        },
    );
    assert_eq!(effects, vec![Effect::LoadUserPreferences]);

    let (model, effects) = apply(
        &model,
        Event::OnUserPreferencesLoaded(UserPreferencesLoaded {
            selected_country_code: Some("DE".to_string()),
            fiat_currency_code: "usd".to_string(),
            last_order_amount: Some("100".to_string()),
            api_host: "https://api.example.com".to_string(),
            ..Default::default()
        }),
    );
    assert!(matches!(effects[0], Effect::LoadPairs { .. }));

    let currencies = BTreeMap::from([("usd".to_string(), usd()), ("btc".to_string(), btc())]);
    let (model, effects) = apply(
        &model,
        Event::OnPairsLoaded {
            pairs: vec![exchange_domain::ExchangePair::new("usd", "btc", dec!(50000))],
            currencies,
        },
    );

    assert_eq!(model.state, State::order_setup());
    assert_eq!(model.source_currency_code.as_deref(), Some("usd"));
    assert_eq!(model.quote_currency_code.as_deref(), Some("btc"));
    let body = requested_body(&effects).expect("offer body for stored amount");
    assert_eq!(body.source_currency_amount, dec!(100));
    assert!(effects.contains(&Effect::LoadWalletBalances {
        fiat_currency_code: "usd".to_string()
    }));
}

#[test]
fn test_feature_promotion_shown_once() {
    let model = Model::create(Mode::Trade, false);

    let (model, effects) = apply(&model, Event::OnFeaturePromotionsLoaded { show: true });
    assert_eq!(model.state, State::FeaturePromotion);
    assert!(effects.is_empty());

    let (model, effects) = apply(&model, Event::OnContinueClicked);
    assert_eq!(model.state, State::Initializing);
    assert_eq!(effects, vec![Effect::LoadCountries]);
}

// =============================================================================
// BUY happy path
// =============================================================================

#[test]
fn test_buy_happy_path() {
    let model = order_setup(Mode::Buy);

    let (model, effects) = type_digits(model, &[1, 0, 0]);
    assert_eq!(model.source_amount_input, "100");
    let body = requested_body(&effects).unwrap();
    assert_eq!(body.source_currency_amount, dec!(100));

    let offers = vec![offer("wyre", true)];
    let (model, effects) = apply(
        &model,
        Event::OnOfferRequestUpdated {
            offer_body: body.clone(),
            offer_request: offer_request(&body, offers.clone(), true),
            offer_details: offer_details(&offers, dec!(100)),
        },
    );
    assert!(effects.is_empty());
    let selected = model.selected_offer.clone().expect("default offer selected");
    assert_eq!(selected.offer().offer_id, "offer-wyre");

    let (model, effects) = apply(&model, Event::OnContinueClicked);
    assert_eq!(model.state, State::CreatingOrder { previewing: false });
    assert_eq!(
        effects,
        vec![Effect::CreateOrder {
            offer: offers[0].clone()
        }]
    );
}

#[test]
fn test_trade_requires_preview() {
    let mut model = order_setup(Mode::Trade);
    model.crypto_balances.insert("btc".to_string(), dec!(1));
    model.source_amount_input = "0.1".to_string();
    let offers = vec![offer("changelly", true)];
    model.selected_offer = offer_details(&offers, dec!(0.1)).into_iter().next();

    let (model, effects) = apply(&model, Event::OnContinueClicked);
    assert_eq!(model.state, State::CreatingOrder { previewing: true });
    assert_eq!(
        effects,
        vec![Effect::UpdateLastTradeCurrencyPair {
            source_code: Some("btc".to_string()),
            quote_code: Some("usd".to_string()),
        }]
    );

    let (model, effects) = apply(&model, Event::OnContinueClicked);
    assert_eq!(model.state, State::CreatingOrder { previewing: false });
    assert!(matches!(effects[0], Effect::CreateOrder { .. }));
}

// =============================================================================
// Invalid offer adjustment
// =============================================================================

#[test]
fn test_invalid_offer_adjustment_snaps_amount() {
    let mut model = order_setup(Mode::Buy);
    model.source_amount_input = "10".to_string();
    let offers = vec![offer("wyre", false)];
    let details = offer_details(&offers, dec!(10));
    let body = model.offer_body().unwrap();
    model.offer_request = Some(offer_request(&body, offers, true));
    model.selected_offer = details.first().cloned();
    model.offer_details = details;

    let (next, effects) = apply(&model, Event::OnContinueClicked);

    assert_eq!(next.state, State::order_setup());
    assert_eq!(next.source_amount_input, "50");
    assert!(next.selected_offer.is_none());
    assert!(next.offer_request.is_none());
    assert!(next.offer_details.is_empty());
    assert!(matches!(
        next.last_offer_selection.as_ref(),
        Some(invalid) if invalid.offer.provider.slug == "wyre"
    ));
    assert_eq!(
        requested_body(&effects).unwrap().source_currency_amount,
        dec!(50)
    );
}

#[test]
fn test_adjusted_selection_reselects_same_provider() {
    let mut model = order_setup(Mode::Buy);
    model.source_amount_input = "10".to_string();
    let invalid = offer_details(&[offer("wyre", false)], dec!(10));
    model.selected_offer = invalid.first().cloned();
    let (model, _) = apply(&model, Event::OnContinueClicked);

    let body = model.offer_body().unwrap();
    let offers = vec![offer("moonpay", true), offer("wyre", true)];
    let (model, _) = apply(
        &model,
        Event::OnOfferRequestUpdated {
            offer_body: body.clone(),
            offer_request: offer_request(&body, offers.clone(), true),
            offer_details: offer_details(&offers, dec!(50)),
        },
    );

    let selected = model.selected_offer.unwrap();
    assert_eq!(selected.offer().provider.slug, "wyre");
    assert_eq!(model.offer_details[0].offer().provider.slug, "wyre");
    assert!(model.last_offer_selection.is_none());
}

// =============================================================================
// SELL balance
// =============================================================================

#[test]
fn test_sell_insufficient_balance_blocks_continue() {
    let mut model = order_setup(Mode::Sell);
    model.crypto_balances.insert("btc".to_string(), dec!(0.01));
    model.source_amount_input = "0.0".to_string();

    let (model, effects) = type_digits(model, &[2]);
    assert_eq!(model.source_amount_input, "0.02");
    assert_eq!(
        model.input_error,
        Some(InputError::BalanceLow {
            balance: dec!(0.01)
        })
    );
    assert_eq!(
        effects,
        vec![Effect::RequestOffers {
            body: None,
            mode: Mode::Sell,
            amount_decimals: 8,
        }]
    );

    let mut model = model;
    model.selected_offer = offer_details(&[offer("wyre", true)], dec!(0.02))
        .into_iter()
        .next();
    let next = update(&model, Event::OnContinueClicked);
    assert!(next.model.is_none());
    assert!(next.effects.is_empty());
}

#[test]
fn test_deleting_back_under_balance_clears_error() {
    let mut model = order_setup(Mode::Sell);
    model.crypto_balances.insert("btc".to_string(), dec!(0.01));
    model.source_amount_input = "0.02".to_string();

    let (model, effects) = apply(&model, Event::OnAmountChange(AmountChange::Delete));

    assert_eq!(model.source_amount_input, "0.0");
    assert!(model.input_error.is_none());
    assert_eq!(
        effects,
        vec![Effect::RequestOffers {
            body: None,
            mode: Mode::Sell,
            amount_decimals: 8,
        }]
    );
}

#[test]
fn test_wallet_override_keeps_session_and_model_in_step() {
    let mut model = order_setup(Mode::Sell);
    model.crypto_balances.insert("btc".to_string(), dec!(1));
    model.source_amount_input = "0.5".to_string();
    let original_body = model.offer_body().unwrap();

    let (model, effects) = apply(
        &model,
        Event::OnOfferAmountOverridden {
            original_body: original_body.clone(),
            new_amount: dec!(0.123456789),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(model.source_amount_input, "0.12345678");

    let clamped = original_body.with_amount(dec!(0.12345678));
    let offers = vec![offer("wyre", true)];
    let next = update(
        &model,
        Event::OnOfferRequestUpdated {
            offer_body: clamped.clone(),
            offer_request: offer_request(&clamped, offers.clone(), true),
            offer_details: offer_details(&offers, clamped.source_currency_amount),
        },
    );

    let model = next.model.expect("clamped offers apply");
    assert!(model.offer_request.is_some());
    assert_eq!(model.offer_details.len(), 1);
}

#[test]
fn test_balances_arriving_before_pairs_leave_initializing_alone() {
    let model = Model::create(Mode::Sell, false);
    assert_eq!(model.state, State::Initializing);

    let (model, _) = apply(
        &model,
        Event::OnWalletBalancesLoaded {
            balances: BTreeMap::from([("btc".to_string(), dec!(1))]),
        },
    );

    assert_eq!(model.state, State::Initializing);
    assert!(model.did_load_crypto_balances);
}

// =============================================================================
// Order lifecycle
// =============================================================================

fn creating_order() -> Model {
    let mut model = order_setup(Mode::Buy);
    model.source_amount_input = "100".to_string();
    model.selected_offer = offer_details(&[offer("wyre", true)], dec!(100))
        .into_iter()
        .next();
    model.state = State::CreatingOrder { previewing: false };
    model
}

#[test]
fn test_order_lifecycle() {
    let order = order_json("initializing", "[]");
    let (model, effects) = apply(&creating_order(), Event::OnOrderUpdated(order.clone()));

    assert!(matches!(model.state, State::ProcessingOrder { .. }));
    assert!(model.selected_offer.is_none());
    assert_eq!(effects[0], Effect::ProcessBackgroundActions { order });
    match &effects[1] {
        Effect::TrackEvent { name, props } => {
            assert_eq!(name, "checkout");
            assert_eq!(props["partner"], "Wyre");
            assert_eq!(props["method"], "CARD");
            assert_eq!(props["base_currency"], "usd");
        }
        other => panic!("expected checkout event, got {other:?}"),
    }

    let browser = r#"[{ "type": "browser", "url": "https://pay.example.com/ord_1" }]"#;
    let order = order_json("initialized", browser);
    let (model, effects) = apply(&model, Event::OnOrderUpdated(order));
    let action = match &effects[..] {
        [Effect::ProcessUserAction(user_action)] => {
            assert_eq!(user_action.base_url, "https://api.example.com");
            user_action.action.clone()
        }
        other => panic!("expected user action, got {other:?}"),
    };
    assert_eq!(action.action_type, ActionType::Browser);

    // The same snapshot again does not re-request the action.
    let (model, effects) = apply(&model, Event::OnOrderUpdated(order_json("initialized", browser)));
    assert!(effects.is_empty());

    let (model, effects) = apply(&model, Event::OnOrderUpdated(order_json("finalized", "[]")));
    assert!(matches!(model.state, State::OrderComplete { .. }));
    assert!(matches!(&effects[0], Effect::TrackEvent { name, .. } if name == "complete"));

    let (model, effects) = apply(&model, Event::OnContinueClicked);
    assert_eq!(model.state, State::order_setup());
    assert!(matches!(effects[0], Effect::LoadPairs { .. }));
}

#[test]
fn test_browser_completion_records_amount() {
    let (model, _) = apply(
        &creating_order(),
        Event::OnOrderUpdated(order_json("initializing", "[]")),
    );
    let browser = r#"[{ "type": "browser", "url": "https://pay.example.com/ord_1" }]"#;
    let (model, _) = apply(&model, Event::OnOrderUpdated(order_json("initialized", browser)));

    let (model, effects) = apply(
        &model,
        Event::OnBrowserActionCompleted {
            action: OrderAction::new(ActionType::Browser, "https://pay.example.com/ord_1"),
            cancelled: false,
        },
    );

    assert_eq!(model.state, State::order_setup());
    assert_eq!(
        effects[0],
        Effect::UpdateLastOrderAmount {
            amount: "100".to_string()
        }
    );
    assert!(matches!(effects[1], Effect::RequestOffers { .. }));
}

#[test]
fn test_order_failure_while_creating_returns_to_preview() {
    let failure = exchange_domain::OrderFailure::unknown("rejected");

    let (model, effects) = apply(&creating_order(), Event::OnOrderFailed(failure));

    assert_eq!(model.state, State::CreatingOrder { previewing: true });
    let error = model.error_state.unwrap();
    assert!(!error.is_recoverable);
    assert!(matches!(&effects[0], Effect::TrackEvent { name, props }
        if name == "buy.fail" && props["error"] == "UNKNOWN_ERROR"));
}

// =============================================================================
// Exit confirmation
// =============================================================================

#[test]
fn test_exit_confirmation_during_processing() {
    let mut model = creating_order();
    model.selected_offer = None;
    let valid = offer_details(&[offer("wyre", true)], dec!(100))
        .into_iter()
        .find_map(|d| match d {
            OfferDetails::Valid(valid) => Some(valid),
            OfferDetails::Invalid(_) => None,
        })
        .unwrap();
    model.state = State::ProcessingOrder {
        order: order_json("initialized", "[]"),
        offer_details: valid,
        user_action: None,
    };

    let (confirming, effects) = apply(&model, Event::OnBackClicked);
    assert!(confirming.confirming_close);
    assert_eq!(confirming.state, model.state);
    assert!(effects.is_empty());

    let (closed, effects) = apply(&confirming, Event::OnCloseClicked { confirmed: true });
    assert_eq!(closed.state, State::order_setup());
    assert!(!closed.confirming_close);
    assert_eq!(
        requested_body(&effects).unwrap().source_currency_amount,
        dec!(100)
    );
}

#[test]
fn test_order_status_is_read_from_snapshot() {
    assert_eq!(order_json("finalized", "[]").status, OrderStatus::Finalized);
}
