//! Offer session: debounce, polling, supersession and wallet clamping.

mod common;

use std::time::Duration;

use rust_decimal_macros::dec;

use common::*;
use exchange_domain::{ApiError, OfferRequest, OfferRequestStatus};
use exchange_engine::{Effect, Event, Mode};
use exchange_exec::RuntimeConfig;

fn request_offers(harness: &Harness, body: Option<exchange_domain::OfferBody>, mode: Mode) {
    harness.runtime.dispatch(Effect::RequestOffers {
        body,
        mode,
        amount_decimals: 8,
    });
}

fn polled(status: OfferRequestStatus, slugs: &[&str]) -> OfferRequest {
    let body = body(dec!(1));
    OfferRequest {
        url: format!("{HOST}/exchange/offer-requests/req_1"),
        created_at: chrono::Utc::now(),
        status,
        country_code: body.country_code,
        region_code: body.region_code,
        source_currency_code: body.source_currency_code,
        quote_currency_code: body.quote_currency_code,
        offers: slugs.iter().map(|slug| offer(slug)).collect(),
    }
}

// =============================================================================
// Debounce
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_requests_within_debounce_window_collapse_to_latest() {
    let mut harness = Harness::new();
    harness
        .api
        .set_offers(vec![offer("moonpay")], OfferRequestStatus::Complete);

    for amount in [dec!(1), dec!(1.5), dec!(2)] {
        request_offers(&harness, Some(body(amount)), Mode::Buy);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let Some(Event::OnOfferRequestUpdated {
        offer_body,
        offer_request,
        offer_details,
    }) = harness.next_event().await
    else {
        panic!("expected offers");
    };
    assert_eq!(offer_body, body(dec!(2)));
    assert!(offer_request.is_complete());
    assert_eq!(offer_details.len(), 1);
    assert_eq!(harness.api.offer_bodies(), vec![body(dec!(2))]);
    assert!(harness.drain().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_session_waits_for_debounce() {
    let mut harness = Harness::new();

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(harness.api.offer_bodies().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.api.offer_bodies().len(), 1);
    assert!(harness.next_event().await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_empty_body_cancels_pending_session() {
    let mut harness = Harness::new();

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    request_offers(&harness, None, Mode::Buy);

    assert!(harness.drain().await.is_empty());
    assert!(harness.api.offer_bodies().is_empty());
}

// =============================================================================
// Polling
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_unchanged_polls_are_silent_and_budget_forces_complete() {
    let mut harness = Harness::new();
    harness
        .api
        .set_offers(vec![offer("moonpay")], OfferRequestStatus::Gathering);

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    let events = harness.drain().await;

    assert_eq!(events.len(), 2);
    let statuses: Vec<_> = events
        .iter()
        .map(|event| match event {
            Event::OnOfferRequestUpdated { offer_request, .. } => offer_request.status,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        statuses,
        vec![OfferRequestStatus::Gathering, OfferRequestStatus::Complete]
    );
    assert_eq!(harness.api.poll_count(), 8);
}

#[tokio::test(start_paused = true)]
async fn test_changed_poll_is_emitted_and_completion_stops_polling() {
    let mut harness = Harness::new();
    harness
        .api
        .set_offers(vec![offer("moonpay")], OfferRequestStatus::Gathering);
    harness
        .api
        .push_poll(Ok(polled(OfferRequestStatus::Complete, &["moonpay", "banxa"])));

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    let events = harness.drain().await;

    assert_eq!(events.len(), 2);
    let Event::OnOfferRequestUpdated {
        offer_request,
        offer_details,
        ..
    } = &events[1]
    else {
        panic!("expected update");
    };
    assert!(offer_request.is_complete());
    assert_eq!(offer_details.len(), 2);
    assert_eq!(harness.api.poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_error_ends_session() {
    let mut harness = Harness::new();
    harness
        .api
        .set_offers(vec![], OfferRequestStatus::Gathering);
    harness.api.push_poll(Err(ApiError::new(502, "bad gateway")));

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    let events = harness.drain().await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        Event::OnOfferRequestError {
            offer_body: body(dec!(1)),
            error: ApiError::new(502, "bad gateway"),
        }
    );
    assert_eq!(harness.api.poll_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_create_failure_is_reported_with_body() {
    let mut harness = Harness::new();
    harness
        .api
        .set_offer_request_error(Some(ApiError::new(400, "unsupported")));

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);

    assert_eq!(
        harness.next_event().await,
        Some(Event::OnOfferRequestError {
            offer_body: body(dec!(1)),
            error: ApiError::new(400, "unsupported"),
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_newer_request_silences_polling_session() {
    let mut harness = Harness::with_config(RuntimeConfig::default());
    harness
        .api
        .set_offers(vec![offer("moonpay")], OfferRequestStatus::Gathering);

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    let first = harness.next_event().await;
    assert!(matches!(first, Some(Event::OnOfferRequestUpdated { .. })));

    harness
        .api
        .set_offers(vec![offer("banxa")], OfferRequestStatus::Complete);
    request_offers(&harness, Some(body(dec!(3))), Mode::Buy);

    let events = harness.drain().await;
    assert_eq!(events.len(), 1);
    let Event::OnOfferRequestUpdated { offer_body, .. } = &events[0] else {
        panic!("expected update");
    };
    assert_eq!(offer_body, &body(dec!(3)));
}

// =============================================================================
// Wallet maximum
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_sell_amount_above_wallet_maximum_is_clamped() {
    let mut harness = Harness::new();
    harness.wallet.set_maximum(BTC_ID, dec!(1.5));
    harness
        .api
        .set_offers(vec![offer("moonpay")], OfferRequestStatus::Complete);

    request_offers(&harness, Some(body(dec!(2))), Mode::Sell);

    assert_eq!(
        harness.next_event().await,
        Some(Event::OnOfferAmountOverridden {
            original_body: body(dec!(2)),
            new_amount: dec!(1.5),
        })
    );
    let Some(Event::OnOfferRequestUpdated { offer_body, .. }) = harness.next_event().await else {
        panic!("expected offers");
    };
    assert_eq!(offer_body, body(dec!(1.5)));
    assert_eq!(harness.api.offer_bodies(), vec![body(dec!(1.5))]);
    assert_eq!(
        harness.wallet.estimate_targets(),
        vec![(
            BTC_ID.to_string(),
            "1AmuhVShZTywwsB9H7bKmeXBHjyMbdLQBS".to_string()
        )]
    );
}

#[tokio::test(start_paused = true)]
async fn test_wallet_maximum_is_truncated_to_currency_decimals() {
    let mut harness = Harness::new();
    harness.wallet.set_maximum(BTC_ID, dec!(0.123456789));

    request_offers(&harness, Some(body(dec!(0.5))), Mode::Sell);

    assert_eq!(
        harness.next_event().await,
        Some(Event::OnOfferAmountOverridden {
            original_body: body(dec!(0.5)),
            new_amount: dec!(0.12345678),
        })
    );
    let Some(Event::OnOfferRequestUpdated { offer_body, .. }) = harness.next_event().await else {
        panic!("expected offers");
    };
    assert_eq!(offer_body.source_currency_amount, dec!(0.12345678));
    assert_eq!(harness.api.offer_bodies(), vec![body(dec!(0.12345678))]);
}

#[tokio::test(start_paused = true)]
async fn test_trade_amount_within_maximum_is_sent_unchanged() {
    let mut harness = Harness::new();
    harness.wallet.set_maximum(BTC_ID, dec!(5));

    request_offers(&harness, Some(body(dec!(2))), Mode::Trade);

    let Some(Event::OnOfferRequestUpdated { offer_body, .. }) = harness.next_event().await else {
        panic!("expected offers");
    };
    assert_eq!(offer_body, body(dec!(2)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_estimate_stops_before_request() {
    let mut harness = Harness::new();

    request_offers(&harness, Some(body(dec!(2))), Mode::Sell);

    assert_eq!(
        harness.next_event().await,
        Some(Event::OnOfferRequestError {
            offer_body: body(dec!(2)),
            error: ApiError::local("max estimate failed"),
        })
    );
    assert!(harness.api.offer_bodies().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_unknown_network_estimates_against_own_address() {
    let mut harness = Harness::new();
    let doge = "dogecoin-mainnet:__native__";
    harness.wallet.set_maximum(doge, dec!(100));
    let mut doge_body = body(dec!(10));
    doge_body.currency_id = doge.to_string();

    request_offers(&harness, Some(doge_body), Mode::Sell);
    harness.next_event().await;

    assert_eq!(
        harness.wallet.estimate_targets(),
        vec![(doge.to_string(), format!("stub-address-{doge}"))]
    );
}

#[tokio::test(start_paused = true)]
async fn test_buy_skips_wallet_estimate() {
    let mut harness = Harness::new();

    request_offers(&harness, Some(body(dec!(2))), Mode::Buy);
    harness.next_event().await;

    assert!(harness.wallet.estimate_targets().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_debouncing_session() {
    let mut harness = Harness::new();

    request_offers(&harness, Some(body(dec!(1))), Mode::Buy);
    harness.runtime.dispose();

    assert!(harness.drain().await.is_empty());
    assert!(harness.api.offer_bodies().is_empty());
}
