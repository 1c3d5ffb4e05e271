//! Navigation, dialogs and the order lifecycle after an offer is accepted.

use std::collections::BTreeMap;

use exchange_domain::{ExchangeOrder, Media, OrderAction, OrderFailure, OrderStatus};

use crate::effect::{Effect, UserAction};
use crate::event::SendFailedReason;
use crate::model::{ConfigTarget, ErrorState, ErrorType, Mode, Model, OfferDetails, State};
use crate::order_setup::{on_order_setup_continue, request_offers};
use crate::settings::{load_pairs, on_settings_back, on_settings_continue};
use crate::update::Next;

// =============================================================================
// Helpers
// =============================================================================

fn with_state(model: &Model, state: State) -> Model {
    let mut next = model.clone();
    next.state = state;
    next
}

/// Back to amount entry with a fresh offer request.
fn back_to_order_setup(model: &Model) -> Next {
    let mut next = with_state(model, State::order_setup());
    next.confirming_close = false;
    next.error_state = None;
    let effects = vec![request_offers(&next)];
    Next::next_with(next, effects)
}

/// Leave the promotion, optionally remembering it was seen.
fn leave_promotion(model: &Model, remember: bool) -> Next {
    let mut effects = Vec::new();
    if remember {
        effects.push(Effect::UpdateFeaturePromotionShown { mode: model.mode });
    }
    effects.push(Effect::LoadCountries);
    Next::next_with(with_state(model, State::Initializing), effects)
}

/// Analytics properties describing the order in progress.
fn order_event_props(
    model: &Model,
    order: Option<&ExchangeOrder>,
    error: Option<&str>,
) -> BTreeMap<String, String> {
    let partner = order
        .map(|o| o.provider.name.clone())
        .or_else(|| model.selected_offer.as_ref().map(|d| d.offer().provider.name.clone()))
        .unwrap_or_default();
    let method = match model.mode {
        Mode::Trade => Some(Media::Crypto),
        Mode::Buy => order.and_then(|o| o.inputs.first()).map(|input| input.media),
        Mode::Sell => order.and_then(|o| o.outputs.first()).map(|output| output.media),
    };

    let mut props = BTreeMap::new();
    props.insert("partner".to_string(), partner);
    props.insert(
        "base_currency".to_string(),
        model.source_currency_code.clone().unwrap_or_default(),
    );
    props.insert(
        "quote_currency".to_string(),
        model.quote_currency_code.clone().unwrap_or_default(),
    );
    props.insert(
        "method".to_string(),
        method.map(|m| m.as_str().to_string()).unwrap_or_default(),
    );
    if let Some(error) = error {
        props.insert("error".to_string(), error.to_string());
    }
    props
}

// =============================================================================
// Continue / Back / Close
// =============================================================================

pub(crate) fn on_continue_clicked(model: &Model) -> Next {
    match &model.state {
        State::FeaturePromotion => leave_promotion(model, false),
        State::ConfigureSettings { .. } => on_settings_continue(model),
        State::EmptyWallets { .. } => {
            let fresh = Model {
                api_host: model.api_host.clone(),
                ..Model::create(Mode::Buy, model.test)
            };
            let effects = vec![
                Effect::LoadCountries,
                Effect::track(fresh.event_name("appeared")),
            ];
            Next::next_with(fresh, effects)
        }
        State::OrderSetup { .. } => on_order_setup_continue(model),
        State::CreatingOrder { previewing: true } => match &model.selected_offer {
            Some(details) => Next::next_with(
                with_state(model, State::CreatingOrder { previewing: false }),
                vec![Effect::CreateOrder {
                    offer: details.offer().clone(),
                }],
            ),
            None => Next::no_change(),
        },
        State::OrderComplete { .. } => {
            if model.mode == Mode::Trade {
                Next::dispatch(vec![Effect::ExitFlow])
            } else {
                let effects = load_pairs(model).into_iter().collect();
                Next::next_with(with_state(model, State::order_setup()), effects)
            }
        }
        State::Initializing
        | State::SelectAsset { .. }
        | State::CreatingOrder { previewing: false }
        | State::ProcessingOrder { .. } => Next::no_change(),
    }
}

pub(crate) fn on_back_clicked(model: &Model) -> Next {
    if model.confirming_close {
        let mut next = model.clone();
        next.confirming_close = false;
        return Next::next(next);
    }

    match &model.state {
        State::FeaturePromotion => leave_promotion(model, true),
        State::SelectAsset { .. } => Next::next(with_state(model, State::order_setup())),
        State::CreatingOrder { previewing: true } => {
            Next::next(with_state(model, State::order_setup()))
        }
        State::CreatingOrder { previewing: false } | State::ProcessingOrder { .. } => {
            let mut next = model.clone();
            next.confirming_close = true;
            Next::next(next)
        }
        State::Initializing | State::EmptyWallets { .. } | State::OrderComplete { .. } => {
            Next::dispatch(vec![Effect::ExitFlow])
        }
        State::OrderSetup {
            selecting_offer: true,
        } => Next::next(with_state(model, State::order_setup())),
        State::OrderSetup {
            selecting_offer: false,
        } => Next::dispatch(vec![Effect::ExitFlow]),
        State::ConfigureSettings { .. } => on_settings_back(model),
    }
}

pub(crate) fn on_close_clicked(model: &Model, confirmed: bool) -> Next {
    if model.confirming_close {
        return if confirmed {
            back_to_order_setup(model)
        } else {
            let mut next = model.clone();
            next.confirming_close = false;
            Next::next(next)
        };
    }

    match &model.state {
        State::FeaturePromotion => leave_promotion(model, true),
        State::CreatingOrder { previewing: true } => Next::dispatch(vec![Effect::ExitFlow]),
        State::CreatingOrder { previewing: false } | State::ProcessingOrder { .. } => {
            let mut next = model.clone();
            next.confirming_close = true;
            Next::next(next)
        }
        State::ConfigureSettings {
            target: ConfigTarget::Menu,
            is_new_user,
            ..
        } => {
            if *is_new_user || model.settings_only {
                Next::dispatch(vec![Effect::ExitFlow])
            } else {
                Next::next(with_state(model, State::order_setup()))
            }
        }
        State::ConfigureSettings { .. } => on_settings_back(model),
        State::SelectAsset { .. } => Next::next(with_state(model, State::order_setup())),
        State::OrderSetup {
            selecting_offer: true,
        } => Next::next(with_state(model, State::order_setup())),
        State::OrderSetup {
            selecting_offer: false,
        }
        | State::OrderComplete { .. }
        | State::Initializing
        | State::EmptyWallets { .. } => Next::dispatch(vec![Effect::ExitFlow]),
    }
}

// =============================================================================
// Order lifecycle
// =============================================================================

pub(crate) fn on_order_updated(model: &Model, order: ExchangeOrder) -> Next {
    match &model.state {
        State::CreatingOrder { .. } => {
            let Some(OfferDetails::Valid(offer_details)) = &model.selected_offer else {
                return Next::no_change();
            };
            let props = order_event_props(model, Some(&order), None);
            let mut next = with_state(
                model,
                State::ProcessingOrder {
                    order: order.clone(),
                    offer_details: offer_details.clone(),
                    user_action: None,
                },
            )
            .without_offers();
            next.last_offer_selection = None;
            Next::next_with(
                next,
                vec![
                    Effect::ProcessBackgroundActions { order },
                    Effect::TrackEvent {
                        name: "checkout".to_string(),
                        props,
                    },
                ],
            )
        }
        State::ProcessingOrder {
            offer_details,
            user_action,
            ..
        } => match order.status {
            OrderStatus::Initializing | OrderStatus::Initialized => {
                let next_action = order.next_user_action().cloned().map(|action| UserAction {
                    order: order.clone(),
                    base_url: model.api_host.clone(),
                    action,
                });
                let already_requested = match (&next_action, user_action) {
                    (Some(next), Some(current)) => next.action == current.action,
                    _ => false,
                };
                let effects = match &next_action {
                    Some(action) if !already_requested => {
                        vec![Effect::ProcessUserAction(action.clone())]
                    }
                    _ => Vec::new(),
                };
                let next = with_state(
                    model,
                    State::ProcessingOrder {
                        order,
                        offer_details: offer_details.clone(),
                        user_action: next_action,
                    },
                );
                Next::next_with(next, effects)
            }
            OrderStatus::Finalized => {
                let props = order_event_props(model, Some(&order), None);
                let next = with_state(
                    model,
                    State::OrderComplete {
                        order,
                        offer_details: offer_details.clone(),
                    },
                );
                Next::next_with(
                    next,
                    vec![Effect::TrackEvent {
                        name: "complete".to_string(),
                        props,
                    }],
                )
            }
        },
        _ => Next::no_change(),
    }
}

pub(crate) fn on_order_failed(model: &Model, failure: OrderFailure) -> Next {
    let error_name = failure.error_type.map(|t| t.as_str());
    let debug_message = format!(
        "{}: {}",
        error_name.unwrap_or("UNKNOWN_ERROR"),
        failure.message.as_deref().unwrap_or("order failed")
    );
    let error_state = ErrorState::fatal(ErrorType::OrderError, debug_message);

    let (state, order) = match &model.state {
        State::CreatingOrder { .. } => (State::CreatingOrder { previewing: true }, None),
        State::ProcessingOrder { order, .. } => (State::order_setup(), Some(order)),
        _ => return Next::no_change(),
    };
    let track = Effect::TrackEvent {
        name: model.event_name("fail"),
        props: order_event_props(model, order, error_name),
    };
    let mut next = with_state(model, state);
    next.error_state = Some(error_state);
    Next::next_with(next, vec![track])
}

pub(crate) fn on_browser_action_completed(
    model: &Model,
    action: OrderAction,
    cancelled: bool,
) -> Next {
    let State::ProcessingOrder { user_action, .. } = &model.state else {
        return Next::no_change();
    };
    let next = with_state(model, State::order_setup());
    let mut effects = Vec::new();
    let completed_current = user_action
        .as_ref()
        .map(|current| current.action == action)
        .unwrap_or(false);
    if completed_current && !cancelled && !model.source_amount_input.is_empty() {
        effects.push(Effect::UpdateLastOrderAmount {
            amount: model.source_amount_input.clone(),
        });
    }
    effects.push(request_offers(&next));
    Next::next_with(next, effects)
}

pub(crate) fn on_crypto_send_action_completed(
    model: &Model,
    action: OrderAction,
    transaction_hash: Option<String>,
    cancelled: bool,
) -> Next {
    let State::ProcessingOrder {
        order,
        offer_details,
        user_action: Some(_),
    } = &model.state
    else {
        return Next::no_change();
    };

    if cancelled {
        return back_to_order_setup(model);
    }

    let without_action = State::ProcessingOrder {
        order: order.clone(),
        offer_details: offer_details.clone(),
        user_action: None,
    };
    match transaction_hash.filter(|hash| !hash.trim().is_empty()) {
        None => {
            let mut next = with_state(model, without_action);
            next.error_state = Some(ErrorState::fatal(
                ErrorType::TransactionError(None),
                "Missing transaction hash",
            ));
            Next::next(next)
        }
        Some(transaction_hash) => Next::next_with(
            with_state(model, without_action),
            vec![Effect::SubmitCryptoTransferHash {
                order: order.clone(),
                action,
                transaction_hash,
            }],
        ),
    }
}

pub(crate) fn on_crypto_send_action_failed(model: &Model, reason: SendFailedReason) -> Next {
    if !matches!(model.state, State::ProcessingOrder { .. }) {
        return Next::no_change();
    }
    let error_state = match &reason {
        SendFailedReason::CreateTransferFailed => ErrorState::fatal(
            ErrorType::TransactionError(Some(reason.clone())),
            "Failed to create transfer",
        ),
        SendFailedReason::FeeEstimateFailed => ErrorState::recoverable(
            ErrorType::TransactionError(Some(reason.clone())),
            "Failed to estimate fee",
        ),
        SendFailedReason::InsufficientNativeWalletBalance {
            currency_code,
            required_amount,
        } => ErrorState::recoverable(
            ErrorType::InsufficientNativeBalanceError {
                currency_code: currency_code.clone(),
                amount: *required_amount,
            },
            format!("Insufficient native wallet balance: {required_amount}"),
        ),
    };
    let mut next = model.clone();
    next.error_state = Some(error_state);
    Next::next(next)
}

pub(crate) fn on_crypto_send_hash_update_success(model: &Model) -> Next {
    let State::ProcessingOrder {
        order,
        offer_details,
        ..
    } = &model.state
    else {
        return Next::no_change();
    };
    Next::next(with_state(
        model,
        State::OrderComplete {
            order: order.clone(),
            offer_details: offer_details.clone(),
        },
    ))
}

pub(crate) fn on_crypto_send_hash_update_failed(model: &Model) -> Next {
    if !matches!(model.state, State::ProcessingOrder { .. }) {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.error_state = Some(ErrorState::fatal(
        ErrorType::OrderError,
        "Failed to post crypto transaction hash",
    ));
    Next::next(next)
}

// =============================================================================
// Dialogs
// =============================================================================

pub(crate) fn on_dialog_confirm_clicked(model: &Model) -> Next {
    if let Some(error) = &model.error_state {
        match &error.error_type {
            ErrorType::UnsupportedRegionError => {
                let mut next = with_state(
                    model,
                    State::ConfigureSettings {
                        target: ConfigTarget::Menu,
                        is_new_user: true,
                        fiat_currencies: model.fiat_currencies(),
                    },
                );
                next.error_state = None;
                return Next::next(next);
            }
            ErrorType::InsufficientNativeBalanceError {
                currency_code,
                amount,
            } => {
                let mut next = with_state(model, State::order_setup()).without_offers();
                next.mode = Mode::Buy;
                next.error_state = None;
                next.confirming_close = false;
                next.input_error = None;
                next.last_offer_selection = None;
                next.source_amount_input = amount.normalize().to_string();
                next.quote_amount_input = None;
                next.source_currency_code =
                    model.selected_fiat_currency.as_ref().map(|c| c.code.clone());
                next.quote_currency_code = Some(currency_code.clone());
                let effects = vec![request_offers(&next)];
                return Next::next_with(next, effects);
            }
            ErrorType::TransactionError(Some(SendFailedReason::FeeEstimateFailed)) => {
                let mut next = model.clone();
                next.error_state = None;
                let effects = match &model.state {
                    State::ProcessingOrder {
                        user_action: Some(action),
                        ..
                    } => vec![Effect::ProcessUserAction(action.clone())],
                    _ => Vec::new(),
                };
                return Next::next_with(next, effects);
            }
            _ => {}
        }
    }

    let recoverable = model
        .error_state
        .as_ref()
        .map(|e| e.is_recoverable)
        .unwrap_or(false);

    match &model.state {
        State::Initializing => {
            if !recoverable {
                return Next::dispatch(vec![Effect::ExitFlow]);
            }
            let mut next = model.clone();
            next.error_state = None;
            if model.countries.is_empty() {
                Next::next_with(next, vec![Effect::LoadCountries])
            } else if model.pairs.is_empty() && model.is_region_configured() {
                let effects = load_pairs(model).into_iter().collect();
                Next::next_with(next, effects)
            } else {
                Next::no_change()
            }
        }
        State::OrderSetup { .. } => {
            if !recoverable {
                Next::dispatch(vec![Effect::ExitFlow])
            } else if model.offer_request.is_none() {
                let mut next = model.clone();
                next.error_state = None;
                let effects = vec![request_offers(&next)];
                Next::next_with(next, effects)
            } else {
                Next::no_change()
            }
        }
        State::CreatingOrder { .. } => back_to_order_setup(model),
        State::ProcessingOrder { .. } if model.confirming_close => back_to_order_setup(model),
        _ if model.confirming_close => Next::dispatch(vec![Effect::ExitFlow]),
        _ => Next::no_change(),
    }
}

pub(crate) fn on_dialog_cancel_clicked(model: &Model) -> Next {
    if model.confirming_close {
        let mut next = model.clone();
        next.confirming_close = false;
        return Next::next(next);
    }
    match &model.error_state {
        Some(error) if error.is_recoverable => Next::dispatch(vec![Effect::ExitFlow]),
        _ => Next::no_change(),
    }
}
