//! Cosmos Exchange Flow demo
//!
//! Runs a scripted BUY flow against stub collaborators: a returning German
//! user types 100 EUR, takes the best offer and completes the provider's
//! checkout page.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run -p exchange-flow
//!
//! # Keep preferences between runs, with verbose runtime logs
//! EXCHANGE_PREFERENCES_PATH=/tmp/exchange.json RUST_LOG=exchange_exec=debug cargo run -p exchange-flow
//! ```
//!
//! # Environment Variables
//!
//! - `EXCHANGE_ENV`: Environment (test, development, production)
//! - `EXCHANGE_API_HOST`: Exchange service host (default: https://api.breadwallet.com)
//! - `EXCHANGE_TEST_OFFERS`: Request test-network offers (default: false)
//! - `EXCHANGE_OFFER_DEBOUNCE_MS`: Offer request debounce (default: 750)
//! - `EXCHANGE_OFFER_POLL_MS`: Offer poll interval (default: 1500)
//! - `EXCHANGE_OFFER_POLL_LIMIT`: Polls before an offer request is forced complete (default: 8)
//! - `EXCHANGE_ADDRESS_RETRY_ATTEMPTS`: Address submission attempts (default: 3)
//! - `EXCHANGE_ADDRESS_RETRY_DELAY_MS`: Delay between address attempts (default: 500)
//! - `EXCHANGE_PREFERENCES_PATH`: JSON file for preferences and cache (default: in memory)

use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use exchange_engine::{AmountChange, Effect, Event, Mode, State};
use exchange_flow::demo::{self, DemoServices};
use exchange_flow::{Config, ExchangeLoop};

const HOST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("exchange_flow=info".parse()?)
                .add_directive("exchange_exec=info".parse()?),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        api_host = %config.api_host,
        test_offers = config.test_offers,
        "Cosmos Exchange Flow demo"
    );

    let amount = Decimal::new(100, 0);
    let store = config.open_store().await?;
    let services = DemoServices::new(&config.api_host, store, amount);
    demo::seed_returning_user(&services.deps.preferences).await?;

    let (flow, mut native) = ExchangeLoop::start(
        config.model(Mode::Buy),
        services.deps.clone(),
        config.runtime.clone(),
    );

    flow.wait_for(|model| matches!(model.state, State::OrderSetup { .. }))
        .await?;
    for digit in [1, 0, 0] {
        flow.dispatch(Event::OnAmountChange(AmountChange::Digit(digit)))?;
    }

    let model = flow.wait_for(|model| model.selected_offer.is_some()).await?;
    info!(
        amount = %model.source_amount(),
        quote = ?model.quote_amount_text(),
        offers = model.offer_details.len(),
        "Offers ready"
    );
    flow.dispatch(Event::OnContinueClicked)?;

    // Play the host: log analytics, complete the checkout page.
    loop {
        let effect = tokio::time::timeout(HOST_TIMEOUT, native.recv())
            .await
            .context("Timed out waiting for the flow")?;
        match effect {
            Some(Effect::TrackEvent { name, props }) => {
                info!(%name, ?props, "Analytics event");
            },
            Some(Effect::ProcessUserAction(user_action)) => {
                info!(
                    order_id = %user_action.order.order_id,
                    url = %user_action.action.url,
                    "Opening checkout"
                );
                flow.dispatch(Event::OnBrowserActionCompleted {
                    action: user_action.action,
                    cancelled: false,
                })?;
                break;
            },
            Some(Effect::ErrorSignal) => warn!("Flow signalled an error"),
            Some(other) => {
                warn!(effect = other.name(), "Flow ended before checkout");
                flow.dispose();
                return Ok(());
            },
            None => anyhow::bail!("Flow stopped unexpectedly"),
        }
    }

    flow.wait_for(|model| matches!(model.state, State::OrderSetup { .. }))
        .await?;
    // The amount is written by a runtime task; give it a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;

    info!(
        last_order_amount = ?services.deps.preferences.last_order_amount().await?,
        addresses = services.api.submitted_addresses().len(),
        "Checkout finished"
    );

    flow.dispose();
    Ok(())
}
