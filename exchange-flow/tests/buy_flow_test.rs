//! End-to-end flows through the event loop, runtime and stores.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;

use exchange_domain::ActionType;
use exchange_engine::{AmountChange, ConfigTarget, Effect, Event, Mode, Model, State};
use exchange_exec::RuntimeConfig;
use exchange_flow::demo::{self, DemoServices, BTC_ID};
use exchange_flow::{ExchangeLoop, FlowError, NativeEffects};
use exchange_store::MemoryStore;

const HOST: &str = "https://api.example.com";

fn in_order_setup(model: &Model) -> bool {
    matches!(model.state, State::OrderSetup { .. })
}

/// Native effects until one matches `stop`, within a minute of paused time.
async fn native_until(
    native: &mut NativeEffects,
    mut stop: impl FnMut(&Effect) -> bool,
) -> anyhow::Result<Vec<Effect>> {
    let mut seen = Vec::new();
    loop {
        let effect = tokio::time::timeout(Duration::from_secs(60), native.recv())
            .await?
            .ok_or_else(|| anyhow::anyhow!("native channel closed"))?;
        let done = stop(&effect);
        seen.push(effect);
        if done {
            return Ok(seen);
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_buy_flow_reaches_checkout_and_records_amount() -> anyhow::Result<()> {
    let services = DemoServices::new(HOST, Arc::new(MemoryStore::new()), dec!(100));
    demo::seed_returning_user(&services.deps.preferences).await?;
    let (flow, mut native) = ExchangeLoop::start(
        Model::create(Mode::Buy, false),
        services.deps.clone(),
        RuntimeConfig::test(),
    );

    let model = flow.wait_for(in_order_setup).await?;
    assert_eq!(model.source_currency_code.as_deref(), Some("eur"));
    assert_eq!(model.quote_currency_code.as_deref(), Some("btc"));
    assert_eq!(model.api_host, HOST);

    for digit in [1, 0, 0] {
        flow.dispatch(Event::OnAmountChange(AmountChange::Digit(digit)))?;
    }
    let model = flow.wait_for(|model| model.selected_offer.is_some()).await?;
    assert_eq!(model.source_amount(), dec!(100));
    let requested = services.api.offer_bodies();
    assert_eq!(requested.last().map(|body| body.source_currency_amount), Some(dec!(100)));

    flow.dispatch(Event::OnContinueClicked)?;
    let effects = native_until(&mut native, |effect| {
        matches!(effect, Effect::ProcessUserAction(_))
    })
    .await?;

    assert!(effects
        .iter()
        .any(|effect| matches!(effect, Effect::TrackEvent { name, .. } if name == "checkout")));
    let Some(Effect::ProcessUserAction(user_action)) = effects.last().cloned() else {
        panic!("expected a user action, got {effects:?}");
    };
    assert_eq!(user_action.action, demo::checkout_action(HOST));
    assert_eq!(user_action.base_url, HOST);
    assert_eq!(services.api.order_calls(), vec!["offer-moonpay".to_string()]);
    assert_eq!(
        services.api.submitted_addresses(),
        vec![(ActionType::CryptoReceiveAddress, format!("stub-address-{BTC_ID}"))]
    );

    flow.dispatch(Event::OnBrowserActionCompleted {
        action: user_action.action,
        cancelled: false,
    })?;
    flow.wait_for(in_order_setup).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(
        services.deps.preferences.last_order_amount().await?.as_deref(),
        Some("100")
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_new_user_configures_location_before_setup() -> anyhow::Result<()> {
    let services = DemoServices::new(HOST, Arc::new(MemoryStore::new()), dec!(100));
    services.deps.preferences.set_promotion_shown("buy").await?;
    let (flow, _native) = ExchangeLoop::start(
        Model::create(Mode::Buy, false),
        services.deps.clone(),
        RuntimeConfig::test(),
    );

    let model = flow
        .wait_for(|model| matches!(model.state, State::ConfigureSettings { .. }))
        .await?;
    let State::ConfigureSettings {
        target,
        is_new_user,
        ..
    } = &model.state
    else {
        unreachable!();
    };
    assert_eq!(*target, ConfigTarget::Menu);
    assert!(*is_new_user);
    assert_eq!(
        model.selected_country.as_ref().map(|c| c.code.as_str()),
        Some("DE")
    );

    flow.dispatch(Event::OnContinueClicked)?;
    flow.wait_for(in_order_setup).await?;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let country = services.deps.preferences.country_code().await?;
    assert!(country.is_some_and(|code| code.eq_ignore_ascii_case("de")));
    assert!(services
        .deps
        .preferences
        .fiat_currency_code()
        .await?
        .eq_ignore_ascii_case("eur"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_subscriber_sees_startup_transitions() -> anyhow::Result<()> {
    let services = DemoServices::new(HOST, Arc::new(MemoryStore::new()), dec!(100));
    demo::seed_returning_user(&services.deps.preferences).await?;
    let (flow, _native) = ExchangeLoop::start(
        Model::create(Mode::Buy, false),
        services.deps.clone(),
        RuntimeConfig::test(),
    );
    let mut models = flow.subscribe();

    assert_eq!(models.borrow_and_update().state, State::Initializing);
    flow.wait_for(in_order_setup).await?;

    assert!(in_order_setup(&flow.model()));
    assert!(in_order_setup(&models.borrow_and_update()));
    assert_eq!(services.api.countries_calls(), 1);
    assert_eq!(services.api.pairs_calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dispose_cancels_pending_offer_request() -> anyhow::Result<()> {
    let services = DemoServices::new(HOST, Arc::new(MemoryStore::new()), dec!(100));
    demo::seed_returning_user(&services.deps.preferences).await?;
    let (flow, _native) = ExchangeLoop::start(
        Model::create(Mode::Buy, false),
        services.deps.clone(),
        RuntimeConfig::default(),
    );
    flow.wait_for(in_order_setup).await?;

    flow.dispatch(Event::OnAmountChange(AmountChange::Digit(5)))?;
    flow.wait_for(|model| model.source_amount_input == "5").await?;
    flow.dispose();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(services.api.offer_bodies().is_empty());
    assert!(matches!(
        flow.dispatch(Event::OnContinueClicked),
        Err(FlowError::Disposed)
    ));
    assert!(matches!(
        flow.wait_for(|_| false).await,
        Err(FlowError::Disposed)
    ));
    Ok(())
}
