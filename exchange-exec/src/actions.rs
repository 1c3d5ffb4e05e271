//! Order creation and the order actions the runtime completes by itself.

use tracing::{debug, error, info, warn};

use exchange_domain::{ActionType, ExchangeOffer, ExchangeOrder, OrderAction, OrderFailure};
use exchange_engine::Event;

use crate::error::ExecResult;
use crate::runtime::RuntimeInner;

pub(crate) async fn create_order(inner: &RuntimeInner, offer: ExchangeOffer) -> ExecResult<()> {
    info!(offer_id = %offer.offer_id, provider = %offer.provider.slug, "Creating order");
    match inner.deps.api.create_order(&offer.offer_id).await {
        Ok(order) => {
            info!(order_id = %order.order_id, status = ?order.status, "Order created");
            inner.emit(Event::OnOrderUpdated(order))
        },
        Err(failure) => {
            error!(
                offer_id = %offer.offer_id,
                error_type = ?failure.error_type,
                message = ?failure.message,
                "Order creation failed"
            );
            inner.emit(Event::OnOrderFailed(failure))
        },
    }
}

/// Answer every address action the order is waiting on, then re-fetch it.
///
/// Actions are handled one at a time, outputs first. The order is reported
/// failed as soon as one action exhausts its attempts.
pub(crate) async fn process_background_actions(
    inner: &RuntimeInner,
    order: ExchangeOrder,
) -> ExecResult<()> {
    let pending = order.pending_address_actions();
    if pending.is_empty() {
        debug!(order_id = %order.order_id, "No background actions");
        return inner.emit(Event::OnOrderUpdated(order));
    }

    for action in &pending {
        if !submit_address(inner, &order, action).await {
            error!(
                order_id = %order.order_id,
                action_type = ?action.action_type,
                "Failed to submit addresses"
            );
            return inner.emit(Event::OnOrderFailed(OrderFailure::unknown(
                "Failed to submit addresses",
            )));
        }
    }

    match inner.deps.api.get_order(&order.order_id).await {
        Some(updated) => {
            debug!(order_id = %updated.order_id, status = ?updated.status, "Order refreshed");
            inner.emit(Event::OnOrderUpdated(updated))
        },
        None => {
            error!(order_id = %order.order_id, "Order missing after address submission");
            inner.emit(Event::OnOrderFailed(OrderFailure::unknown(
                "Failed to refresh order",
            )))
        },
    }
}

async fn submit_address(inner: &RuntimeInner, order: &ExchangeOrder, action: &OrderAction) -> bool {
    let currency = match action.action_type {
        ActionType::CryptoReceiveAddress => order.receive_currency(),
        ActionType::CryptoRefundAddress => order.refund_currency(),
        ActionType::CryptoSend | ActionType::Browser => None,
    };
    let Some(currency) = currency else {
        warn!(order_id = %order.order_id, action_type = ?action.action_type, "No currency for address action");
        return false;
    };

    let attempts = inner.config.address_retry_attempts;
    for attempt in 1..=attempts {
        let address = inner
            .deps
            .wallet
            .receive_address_for(&currency.currency_id)
            .await
            .filter(|address| !address.trim().is_empty());

        if let Some(address) = address {
            if inner.deps.api.submit_crypto_address(action, &address).await {
                debug!(order_id = %order.order_id, attempt, action_type = ?action.action_type, "Address submitted");
                return true;
            }
        }

        warn!(order_id = %order.order_id, attempt, attempts, "Address submission failed");
        if attempt < attempts {
            tokio::time::sleep(inner.config.address_retry_delay).await;
        }
    }
    false
}

/// Report a broadcast transaction; no retry here.
pub(crate) async fn submit_crypto_transfer_hash(
    inner: &RuntimeInner,
    order: ExchangeOrder,
    action: OrderAction,
    transaction_hash: String,
) -> ExecResult<()> {
    let accepted = inner
        .deps
        .api
        .submit_crypto_send_transaction_id(&action, &transaction_hash)
        .await;

    if accepted {
        info!(order_id = %order.order_id, %transaction_hash, "Transfer hash submitted");
        inner.emit(Event::OnCryptoSendHashUpdateSuccess)
    } else {
        warn!(order_id = %order.order_id, %transaction_hash, "Transfer hash rejected");
        inner.emit(Event::OnCryptoSendHashUpdateFailed)
    }
}
