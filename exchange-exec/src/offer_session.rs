//! Debounced, polling offer session.
//!
//! Every `RequestOffers` effect starts a new generation. A session only
//! talks to the service after staying the latest generation for the whole
//! debounce window, and it re-checks the generation before every emission
//! and every poll, so a newer request (a `None` body included) silences it.

use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::RoundingStrategy;
use tracing::{debug, info, trace, warn};

use exchange_domain::{currency::network_of, ApiError, OfferBody, OfferRequest};
use exchange_engine::{offer_details, Event, Mode};

use crate::error::ExecResult;
use crate::runtime::RuntimeInner;

/// Addresses used only to estimate the largest sendable amount per network.
const ESTIMATE_TARGETS: &[(&str, &str)] = &[
    ("bitcoin-mainnet", "1AmuhVShZTywwsB9H7bKmeXBHjyMbdLQBS"),
    ("bitcoin-testnet", "mwEEZ2qsuxQFWWxiKVeKSgTfC3xttHQHmX"),
    ("bitcoincash-mainnet", "qph3tx0wg4xrtljkycvqw207sjfes7akr5k8zp2q4d"),
    ("bitcoincash-testnet", "qph3tx0wg4xrtljkycvqw207sjfes7akr5k8zp2q4d"),
    ("ethereum-mainnet", "0x2e2Ece19E57226DbEe69bcBC32059758901E3F1e"),
    ("ethereum-ropsten", "0x2e2Ece19E57226DbEe69bcBC32059758901E3F1e"),
    ("tezos-mainnet", "tz1S6qLbynndxDKkwUhYuficdTr2VwA2LUsV"),
    ("hedera-mainnet", "0.0.293290"),
    ("ripple-mainnet", "rDYKg1yYeghq8v1a9Xoy9WQzAU5cTUqdH4"),
];

/// Estimate address for a wallet currency id, by network.
pub fn estimate_target(currency_id: &str) -> Option<&'static str> {
    let network = network_of(currency_id);
    ESTIMATE_TARGETS
        .iter()
        .find(|(id, _)| *id == network)
        .map(|(_, address)| *address)
}

/// Latest-wins generation counter.
#[derive(Debug, Default)]
pub(crate) struct OfferSession {
    generation: AtomicU64,
}

impl OfferSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, superseding every earlier one.
    pub(crate) fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

impl RuntimeInner {
    /// Emit only while `generation` is still the latest session.
    fn emit_current(&self, generation: u64, event: Event) -> ExecResult<bool> {
        if !self.offers.is_current(generation) {
            trace!(generation, event = event.name(), "Superseded session, event dropped");
            return Ok(false);
        }
        self.emit(event)?;
        Ok(true)
    }
}

/// Run one offer session to completion.
pub(crate) async fn run(
    inner: &RuntimeInner,
    body: Option<OfferBody>,
    mode: Mode,
    amount_decimals: u32,
    generation: u64,
) -> ExecResult<()> {
    tokio::time::sleep(inner.config.offer_debounce).await;
    if !inner.offers.is_current(generation) {
        trace!(generation, "Offer request debounced away");
        return Ok(());
    }
    let Some(body) = body else {
        debug!(generation, "Offer session cleared");
        return Ok(());
    };

    let Some(body) = clamp_to_wallet_maximum(inner, body, mode, amount_decimals, generation).await? else {
        return Ok(());
    };

    debug!(
        generation,
        source = %body.source_currency_code,
        quote = %body.quote_currency_code,
        amount = %body.source_currency_amount,
        "Requesting offers"
    );
    let mut request = match inner.deps.api.create_offer_request(&body).await {
        Ok(request) => request,
        Err(error) => {
            warn!(generation, %error, "Offer request failed");
            inner.emit_current(
                generation,
                Event::OnOfferRequestError {
                    offer_body: body,
                    error,
                },
            )?;
            return Ok(());
        },
    };
    if !inner.emit_current(generation, updated(&body, &request))? {
        return Ok(());
    }

    let id = match request.id() {
        Ok(id) => id.to_string(),
        Err(e) => {
            warn!(generation, error = %e, "Offer request has no id");
            inner.emit_current(
                generation,
                Event::OnOfferRequestError {
                    offer_body: body,
                    error: ApiError::local(e.to_string()),
                },
            )?;
            return Ok(());
        },
    };

    for poll in 1..=inner.config.offer_poll_limit {
        if request.is_complete() {
            info!(generation, offers = request.offers.len(), "Offer request complete");
            return Ok(());
        }
        tokio::time::sleep(inner.config.offer_poll_interval).await;
        if !inner.offers.is_current(generation) {
            trace!(generation, poll, "Offer session superseded");
            return Ok(());
        }

        match inner.deps.api.get_offer_request(&id).await {
            Ok(polled) if polled == request => {
                trace!(generation, poll, "Offer request unchanged");
            },
            Ok(polled) => {
                request = polled;
                debug!(generation, poll, offers = request.offers.len(), "Offer request updated");
                if !inner.emit_current(generation, updated(&body, &request))? {
                    return Ok(());
                }
            },
            Err(error) => {
                warn!(generation, poll, %error, "Offer poll failed");
                inner.emit_current(
                    generation,
                    Event::OnOfferRequestError {
                        offer_body: body,
                        error,
                    },
                )?;
                return Ok(());
            },
        }
    }

    if !request.is_complete() {
        debug!(generation, "Poll budget exhausted, marking complete");
        inner.emit_current(generation, updated(&body, &request.completed()))?;
    }
    Ok(())
}

/// SELL and TRADE never ask for more than the wallet can send.
///
/// The maximum is truncated to `amount_decimals` so the amount the model
/// shows and the amount polled with are the same number.
///
/// Returns `None` when the session must stop (estimate failed or superseded).
async fn clamp_to_wallet_maximum(
    inner: &RuntimeInner,
    body: OfferBody,
    mode: Mode,
    amount_decimals: u32,
    generation: u64,
) -> ExecResult<Option<OfferBody>> {
    if mode == Mode::Buy {
        return Ok(Some(body));
    }

    let wallet = &inner.deps.wallet;
    let target = match estimate_target(&body.currency_id) {
        Some(address) => Some(address.to_string()),
        None => wallet.receive_address_for(&body.currency_id).await,
    };
    let maximum = match target {
        Some(target) => wallet.estimate_limit_maximum(&body.currency_id, &target).await,
        None => None,
    };

    let Some(maximum) = maximum else {
        warn!(generation, currency_id = %body.currency_id, "Max estimate failed");
        inner.emit_current(
            generation,
            Event::OnOfferRequestError {
                offer_body: body,
                error: ApiError::local("max estimate failed"),
            },
        )?;
        return Ok(None);
    };
    let maximum = maximum
        .round_dp_with_strategy(amount_decimals, RoundingStrategy::ToZero)
        .normalize();

    if body.source_currency_amount <= maximum {
        return Ok(Some(body));
    }

    info!(
        generation,
        requested = %body.source_currency_amount,
        %maximum,
        "Clamping offer amount to wallet maximum"
    );
    let clamped = body.with_amount(maximum);
    let emitted = inner.emit_current(
        generation,
        Event::OnOfferAmountOverridden {
            original_body: body,
            new_amount: maximum,
        },
    )?;
    Ok(emitted.then_some(clamped))
}

fn updated(body: &OfferBody, request: &OfferRequest) -> Event {
    Event::OnOfferRequestUpdated {
        offer_body: body.clone(),
        offer_request: request.clone(),
        offer_details: offer_details(&request.offers, body.source_currency_amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generations_are_latest_wins() {
        let session = OfferSession::new();
        let first = session.begin();
        assert!(session.is_current(first));

        let second = session.begin();
        assert!(!session.is_current(first));
        assert!(session.is_current(second));
    }

    #[test]
    fn test_estimate_target_by_network() {
        assert_eq!(
            estimate_target("bitcoin-mainnet:__native__"),
            Some("1AmuhVShZTywwsB9H7bKmeXBHjyMbdLQBS")
        );
        assert_eq!(
            estimate_target("ethereum-mainnet:0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            Some("0x2e2Ece19E57226DbEe69bcBC32059758901E3F1e")
        );
        assert_eq!(estimate_target("dogecoin-mainnet:__native__"), None);
    }
}
