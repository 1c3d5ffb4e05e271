//! Amount entry, asset selection and offer browsing in `OrderSetup`.

use std::collections::BTreeMap;

use rust_decimal::{Decimal, RoundingStrategy};

use exchange_domain::{
    normalize_amount, parse_amount, ApiError, ExchangeCurrency, LimitType, NativeNetworkInfo,
    OfferBody, OfferRequest, OfferRequestStatus,
};

use crate::amount::{apply_amount_change, AmountChange};
use crate::effect::Effect;
use crate::model::{
    ErrorState, ErrorType, InputError, Mode, Model, OfferDetails, OfferState, State,
};
use crate::offers::{default_offer, matching_offer};
use crate::settings::fill_default_codes;
use crate::update::Next;

// =============================================================================
// Helpers
// =============================================================================

fn in_order_setup(model: &Model) -> bool {
    matches!(model.state, State::OrderSetup { .. })
}

/// `RequestOffers` for the model's current inputs. An invalid amount asks
/// the runtime to cancel instead.
pub(crate) fn request_offers(model: &Model) -> Effect {
    let body = if model.input_error.is_some() {
        None
    } else {
        model.offer_body()
    };
    Effect::RequestOffers {
        body,
        mode: model.mode,
        amount_decimals: source_decimals(model),
    }
}

/// Balance and network fee checks for spending `amount` of the source asset.
///
/// Only SELL and TRADE spend from the wallet.
pub(crate) fn validate_amount(model: &Model, amount: Decimal) -> Option<InputError> {
    if model.mode == Mode::Buy || amount.is_zero() {
        return None;
    }
    let source = model.source_currency_code.as_deref()?;
    let balance = model.balance_of(source);
    if amount > balance {
        return Some(InputError::BalanceLow { balance });
    }

    let info = model
        .native_network_info
        .as_ref()
        .filter(|info| info.currency_code == source)?;
    let insufficient = if info.is_native() {
        amount + info.fee_amount > balance
    } else {
        model.balance_of(&info.network_currency_code) < info.fee_amount
    };
    insufficient.then(|| InputError::InsufficientNativeCurrencyBalance {
        currency_code: info.network_currency_code.clone(),
        fee: info.fee_amount,
    })
}

/// Copy of `model` with a new driving amount; offers and the remembered
/// selection are dropped and the amount is re-validated.
fn with_amount(model: &Model, source_input: String, quote_input: Option<String>) -> Model {
    let mut next = model.clone().without_offers();
    next.source_amount_input = source_input;
    next.quote_amount_input = quote_input;
    next.last_offer_selection = None;
    next.input_error = validate_amount(&next, next.source_amount());
    next
}

pub(crate) fn source_decimals(model: &Model) -> u32 {
    model.source_currency().map(|c| c.decimals).unwrap_or(8)
}

/// Raw input for `amount`; zero renders as empty input.
fn raw_input(amount: Decimal, decimals: u32) -> String {
    if amount.is_zero() {
        String::new()
    } else {
        normalize_amount(amount, decimals)
    }
}

// =============================================================================
// Amount entry
// =============================================================================

pub(crate) fn on_amount_changed(model: &Model, change: AmountChange, quote_input: bool) -> Next {
    if !in_order_setup(model) {
        return Next::no_change();
    }
    let Some(source) = model.source_currency() else {
        return Next::no_change();
    };

    let (raw, decimals) = if quote_input {
        let Some(quote) = model.quote_currency() else {
            return Next::no_change();
        };
        let raw = model
            .quote_amount_input
            .clone()
            .or_else(|| model.quote_amount_text())
            .unwrap_or_default();
        (raw, quote.decimals)
    } else {
        (model.source_amount_input.clone(), source.decimals)
    };

    let edit = apply_amount_change(&raw, change, decimals);
    if edit.rejected {
        return Next::dispatch(vec![Effect::ErrorSignal]);
    }

    let next = if quote_input {
        let source_input = parse_amount(&edit.value)
            .ok()
            .and_then(|quote| model.source_for_quote(quote))
            .map(|amount| raw_input(amount, source.decimals))
            .unwrap_or_default();
        with_amount(model, source_input, Some(edit.value))
    } else {
        with_amount(model, edit.value, None)
    };
    let effects = vec![request_offers(&next)];
    Next::next_with(next, effects)
}

pub(crate) fn on_max_amount_clicked(model: &Model) -> Next {
    if !in_order_setup(model) || model.mode == Mode::Buy {
        return Next::no_change();
    }
    let balance = model
        .source_currency_code
        .as_deref()
        .map(|code| model.balance_of(code))
        .unwrap_or(Decimal::ZERO);
    let next = with_amount(model, raw_input(balance, source_decimals(model)), None);
    let effects = vec![
        Effect::track(model.event_name("set_max")),
        request_offers(&next),
    ];
    Next::next_with(next, effects)
}

pub(crate) fn on_min_amount_clicked(model: &Model) -> Next {
    if !in_order_setup(model) || model.mode == Mode::Buy {
        return Next::no_change();
    }
    let track = Effect::track(model.event_name("set_min"));
    let minimum = model
        .offer_details
        .iter()
        .filter_map(|details| details.offer().limit(LimitType::SourceCurrencyMin))
        .min();
    match minimum {
        Some(minimum) => {
            let next = with_amount(model, raw_input(minimum, source_decimals(model)), None);
            let effects = vec![track, request_offers(&next)];
            Next::next_with(next, effects)
        }
        None => Next::dispatch(vec![track]),
    }
}

// =============================================================================
// Assets
// =============================================================================

pub(crate) fn on_swap_currencies_clicked(model: &Model) -> Next {
    if !in_order_setup(model) {
        return Next::no_change();
    }
    let (Some(source), Some(quote)) = (&model.source_currency_code, &model.quote_currency_code)
    else {
        return Next::no_change();
    };
    if !model.pairs.iter().any(|pair| pair.connects(quote, source)) {
        return Next::no_change();
    }

    let quote_text = model
        .quote_amount_input
        .clone()
        .or_else(|| model.quote_amount_text())
        .filter(|text| parse_amount(text).map(|a| !a.is_zero()).unwrap_or(false))
        .unwrap_or_default();

    let mut swapped = model.clone();
    swapped.source_currency_code = Some(quote.clone());
    swapped.quote_currency_code = Some(source.clone());
    swapped.mode = model.mode.swapped();
    let next = with_amount(&swapped, quote_text, None);
    let effects = vec![request_offers(&next)];
    Next::next_with(next, effects)
}

pub(crate) fn on_select_pair_clicked(model: &Model, select_source: bool) -> Next {
    if !matches!(model.state, State::OrderSetup { .. } | State::SelectAsset { .. }) {
        return Next::no_change();
    }

    let codes: Vec<&String> = if select_source {
        let mut codes: Vec<&String> = Vec::new();
        for pair in &model.pairs {
            if !codes.contains(&&pair.from_code) {
                codes.push(&pair.from_code);
            }
        }
        if model.mode == Mode::Trade {
            codes.retain(|code| model.balance_of(code) > Decimal::ZERO);
        }
        codes
    } else {
        model.source_pairs().into_iter().map(|pair| &pair.to_code).collect()
    };

    let assets = codes
        .into_iter()
        .filter_map(|code| model.currencies.get(code))
        .filter(|currency| {
            if select_source {
                model.mode.is_compatible_source(currency)
            } else {
                model.mode.is_compatible_quote(currency)
            }
        })
        .cloned()
        .collect();

    let mut next = model.clone();
    next.state = State::SelectAsset {
        assets,
        source: select_source,
    };
    Next::next(next)
}

pub(crate) fn on_select_pair_cancel_clicked(model: &Model) -> Next {
    if !matches!(model.state, State::SelectAsset { .. }) {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.state = State::order_setup();
    if next.quote_currency_code.is_none() {
        next.quote_currency_code = model
            .source_pairs()
            .first()
            .map(|pair| pair.to_code.clone());
    }
    let effects = if next.offer_tuple() != model.offer_tuple() {
        vec![request_offers(&next)]
    } else {
        Vec::new()
    };
    Next::next_with(next, effects)
}

/// Asset picked in `SelectAsset`.
pub(crate) fn on_asset_clicked(model: &Model, currency: ExchangeCurrency) -> Next {
    let State::SelectAsset { source, .. } = &model.state else {
        return Next::no_change();
    };
    let mut effects = Vec::new();
    let mut next = model.clone().without_offers();
    next.last_offer_selection = None;

    if *source {
        let reachable: Vec<ExchangeCurrency> = model
            .pairs
            .iter()
            .filter(|pair| pair.from_code == currency.code)
            .filter(|pair| {
                let from = model.currencies.get(&pair.from_code);
                let to = model.currencies.get(&pair.to_code);
                match (from, to) {
                    (Some(from), Some(to)) => {
                        model.mode.is_compatible_source(from) && model.mode.is_compatible_quote(to)
                    }
                    _ => false,
                }
            })
            .filter_map(|pair| model.currencies.get(&pair.to_code).cloned())
            .collect();
        let keeps_quote = model
            .quote_currency_code
            .as_ref()
            .map(|quote| reachable.iter().any(|c| &c.code == quote))
            .unwrap_or(false);

        next.source_currency_code = Some(currency.code.clone());
        if keeps_quote {
            next.state = State::order_setup();
        } else {
            next.quote_currency_code = None;
            next.state = State::SelectAsset {
                assets: reachable,
                source: false,
            };
        }
        if model.mode == Mode::Sell {
            next.last_sell_currency_code = Some(currency.code.clone());
            effects.push(Effect::UpdateLastSellCurrency {
                currency_code: currency.code.clone(),
            });
        }
    } else {
        next.quote_currency_code = Some(currency.code.clone());
        next.state = State::order_setup();
        if model.mode == Mode::Buy {
            next.last_purchase_currency_code = currency.code.clone();
            effects.push(Effect::UpdateLastOrderCurrency {
                currency_code: currency.code.clone(),
            });
        }
    }

    next.input_error = validate_amount(&next, next.source_amount());
    effects.insert(0, request_offers(&next));
    effects.insert(1, Effect::track(model.event_name("change_currency")));
    Next::next_with(next, effects)
}

// =============================================================================
// Wallet
// =============================================================================

pub(crate) fn on_wallet_balances_loaded(model: &Model, balances: BTreeMap<String, Decimal>) -> Next {
    let mut next = model.clone();
    next.crypto_balances = balances;
    next.did_load_crypto_balances = true;

    // Pairs are unknown until setup, so balances can only be judged there.
    if model.mode != Mode::Buy && in_order_setup(model) {
        let has_balance = next.has_wallet_balances();
        let selling_unavailable = model.mode == Mode::Sell && !next.has_sell_pairs();
        let invalid_sell_pairs = model.mode == Mode::Sell
            && has_balance
            && !selling_unavailable
            && !next
                .crypto_balances
                .iter()
                .filter(|(_, balance)| **balance > Decimal::ZERO)
                .any(|(code, _)| {
                    next.pairs.iter().any(|pair| {
                        &pair.from_code == code
                            && next
                                .currencies
                                .get(&pair.to_code)
                                .map(ExchangeCurrency::is_fiat)
                                .unwrap_or(false)
                    })
                });
        if !has_balance || selling_unavailable || invalid_sell_pairs {
            next.state = State::EmptyWallets {
                selling_unavailable,
                invalid_sell_pairs,
            };
        }
    }

    if next.selected_pair().is_none() && !next.pairs.is_empty() {
        fill_default_codes(&mut next);
    }
    next.input_error = validate_amount(&next, next.source_amount());
    let effects = refreshed_offers(model, &next);
    Next::next_with(next, effects)
}

pub(crate) fn on_native_network_info_loaded(model: &Model, info: NativeNetworkInfo) -> Next {
    let matches_source = model
        .source_currency()
        .map(|source| source.currency_id == info.currency_id || source.code == info.currency_code)
        .unwrap_or(false);
    if !matches_source {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.native_network_info = Some(info);
    next.input_error = validate_amount(&next, next.source_amount());
    let effects = refreshed_offers(model, &next);
    Next::next_with(next, effects)
}

/// Re-request offers when a background update changed what should be asked.
fn refreshed_offers(before: &Model, after: &Model) -> Vec<Effect> {
    let changed =
        after.offer_tuple() != before.offer_tuple() || after.input_error != before.input_error;
    if in_order_setup(after) && changed {
        vec![request_offers(after)]
    } else {
        Vec::new()
    }
}

// =============================================================================
// Offers
// =============================================================================

pub(crate) fn on_offer_amount_overridden(
    model: &Model,
    original_body: &OfferBody,
    new_amount: Decimal,
) -> Next {
    if !in_order_setup(model)
        || model.offer_state() != OfferState::Gathering
        || !model.matches_offer_body(original_body)
    {
        return Next::no_change();
    }
    let decimals = source_decimals(model);
    let new_amount = new_amount.round_dp_with_strategy(decimals, RoundingStrategy::ToZero);
    Next::next(with_amount(model, raw_input(new_amount, decimals), None))
}

pub(crate) fn on_offer_request_updated(
    model: &Model,
    offer_body: &OfferBody,
    offer_request: OfferRequest,
    offer_details: Vec<OfferDetails>,
) -> Next {
    if !in_order_setup(model) || !model.matches_offer_body(offer_body) {
        return Next::no_change();
    }

    let selected = match &model.last_offer_selection {
        Some(last) => matching_offer(&offer_details, &last.offer),
        None => model
            .selected_offer
            .as_ref()
            .map(|current| {
                offer_details
                    .iter()
                    .find(|d| d.offer().offer_id == current.offer().offer_id)
                    .cloned()
                    .unwrap_or_else(|| current.clone())
            })
            .or_else(|| default_offer(&offer_details, model.mode)),
    };

    let ordered = match &selected {
        Some(selected) => {
            let id = &selected.offer().offer_id;
            std::iter::once(selected.clone())
                .chain(
                    offer_details
                        .into_iter()
                        .filter(|d| &d.offer().offer_id != id),
                )
                .collect()
        }
        None => offer_details,
    };

    let gathering = offer_request.status == OfferRequestStatus::Gathering;
    let mut next = model.clone();
    next.last_offer_selection = if selected.is_none() && gathering {
        model.last_offer_selection.clone()
    } else {
        None
    };
    next.selected_offer = selected;
    next.offer_details = ordered;
    next.offer_request = Some(offer_request);
    Next::next(next)
}

pub(crate) fn on_offer_request_error(model: &Model, offer_body: &OfferBody, error: ApiError) -> Next {
    if !in_order_setup(model) || !model.matches_offer_body(offer_body) {
        return Next::no_change();
    }
    let mut next = model.clone().without_offers();
    next.last_offer_selection = None;
    next.error_state = Some(ErrorState::recoverable(
        ErrorType::NetworkError,
        error.debug_message(),
    ));
    Next::next(next)
}

pub(crate) fn on_offer_clicked(model: &Model, details: OfferDetails, adjust_to_limit: bool) -> Next {
    if model.state
        != (State::OrderSetup {
            selecting_offer: true,
        })
    {
        return Next::no_change();
    }

    let adjustment = match &details {
        OfferDetails::Invalid(invalid) if adjust_to_limit => invalid
            .raw_replacement_amount
            .clone()
            .map(|amount| (amount, invalid.clone())),
        _ => None,
    };

    match adjustment {
        Some((amount, invalid)) => {
            let mut next = with_amount(model, amount, None);
            next.state = State::order_setup();
            next.last_offer_selection = Some(invalid);
            let effects = vec![request_offers(&next)];
            Next::next_with(next, effects)
        }
        None => {
            let mut next = model.clone();
            next.state = State::order_setup();
            next.selected_offer = Some(details);
            next.last_offer_selection = None;
            Next::next(next)
        }
    }
}

pub(crate) fn on_select_offer_clicked(model: &Model, cancel: bool) -> Next {
    if !in_order_setup(model)
        || model.offer_details.len() <= 1
        || model.offer_state() != OfferState::Completed
    {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.state = State::OrderSetup {
        selecting_offer: !cancel,
    };
    Next::next(next)
}

/// `Continue` in `OrderSetup`.
pub(crate) fn on_order_setup_continue(model: &Model) -> Next {
    if model.input_error.is_some() {
        return Next::no_change();
    }
    match &model.selected_offer {
        None => Next::no_change(),
        Some(OfferDetails::Invalid(invalid)) => match &invalid.raw_replacement_amount {
            None => Next::dispatch(vec![Effect::ErrorSignal]),
            Some(amount) => {
                let mut next = with_amount(model, amount.clone(), None);
                next.last_offer_selection = Some(invalid.clone());
                let effects = vec![request_offers(&next)];
                Next::next_with(next, effects)
            }
        },
        Some(OfferDetails::Valid(valid)) => {
            let mut next = model.clone();
            if model.mode == Mode::Trade {
                next.state = State::CreatingOrder { previewing: true };
                Next::next_with(
                    next,
                    vec![Effect::UpdateLastTradeCurrencyPair {
                        source_code: model.source_currency_code.clone(),
                        quote_code: model.quote_currency_code.clone(),
                    }],
                )
            } else {
                next.state = State::CreatingOrder { previewing: false };
                Next::next_with(
                    next,
                    vec![Effect::CreateOrder {
                        offer: valid.offer.clone(),
                    }],
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offers::fixtures::offer;
    use crate::offers::offer_details;
    use crate::update::update;
    use crate::Event;
    use exchange_domain::{ExchangeCountry, ExchangePair, MethodStatus};
    use rust_decimal_macros::dec;

    fn sell_model() -> Model {
        let mut model = Model::create(Mode::Sell, false);
        let usd = ExchangeCurrency::fiat("usd", "US Dollar", 2);
        let btc = ExchangeCurrency::crypto("btc", "Bitcoin", "bitcoin-mainnet:__native__", 8);
        model.currencies.insert("usd".to_string(), usd.clone());
        model.currencies.insert("btc".to_string(), btc);
        model.pairs = vec![
            ExchangePair::new("usd", "btc", dec!(50000)),
            ExchangePair::new("btc", "usd", dec!(50000)),
        ];
        model.selected_country = Some(ExchangeCountry {
            code: "DE".to_string(),
            name: "Germany".to_string(),
            currency: usd.clone(),
            regions: Vec::new(),
        });
        model.selected_fiat_currency = Some(usd);
        model.source_currency_code = Some("btc".to_string());
        model.quote_currency_code = Some("usd".to_string());
        model.crypto_balances.insert("btc".to_string(), dec!(0.01));
        model.state = State::order_setup();
        model
    }

    fn type_amount(mut model: Model, digits: &str) -> (Model, Vec<Effect>) {
        let mut effects = Vec::new();
        for c in digits.chars() {
            let change = match c {
                '.' => AmountChange::Decimal,
                d => AmountChange::Digit(d.to_digit(10).unwrap() as u8),
            };
            let next = update(&model, Event::OnAmountChange(change));
            effects = next.effects;
            model = next.model.unwrap_or(model);
        }
        (model, effects)
    }

    #[test]
    fn test_sell_amount_over_balance_sets_input_error() {
        let (model, effects) = type_amount(sell_model(), "0.02");

        assert_eq!(model.source_amount_input, "0.02");
        assert_eq!(
            model.input_error,
            Some(InputError::BalanceLow { balance: dec!(0.01) })
        );
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
    fn test_native_fee_counts_against_balance() {
        let mut model = sell_model();
        model.native_network_info = Some(NativeNetworkInfo {
            currency_code: "btc".to_string(),
            currency_id: "bitcoin-mainnet:__native__".to_string(),
            network_currency_code: "btc".to_string(),
            fee_amount: dec!(0.0001),
        });

        let (model, _) = type_amount(model, "0.01");

        assert_eq!(
            model.input_error,
            Some(InputError::InsufficientNativeCurrencyBalance {
                currency_code: "btc".to_string(),
                fee: dec!(0.0001),
            })
        );
    }

    #[test]
    fn test_rejected_edit_signals_error() {
        let mut model = sell_model();
        model.source_amount_input = "0.12345678".to_string();

        let next = update(&model, Event::OnAmountChange(AmountChange::Digit(1)));

        assert!(next.model.is_none());
        assert_eq!(next.effects, vec![Effect::ErrorSignal]);
    }

    #[test]
    fn test_repeated_zero_is_not_an_error() {
        let mut model = sell_model();
        model.source_amount_input = "0".to_string();

        let next = update(&model, Event::OnAmountChange(AmountChange::Digit(0)));

        assert!(!next.effects.contains(&Effect::ErrorSignal));
    }

    #[test]
    fn test_quote_edit_derives_source_amount() {
        let mut model = sell_model();
        model.crypto_balances.insert("btc".to_string(), dec!(1));

        let next = update(&model, Event::OnQuoteAmountChange(AmountChange::Digit(5)));
        let next_model = next.model.unwrap();

        assert_eq!(next_model.quote_amount_input.as_deref(), Some("5"));
        assert_eq!(next_model.source_amount_input, "0.0001");
        assert_eq!(next_model.quote_amount(), Some(dec!(5)));
    }

    #[test]
    fn test_max_uses_wallet_balance() {
        let next = update(&sell_model(), Event::OnMaxAmountClicked);
        let next_model = next.model.unwrap();

        assert_eq!(next_model.source_amount_input, "0.01");
        assert!(next_model.input_error.is_none());
        assert_eq!(next.effects[0], Effect::track("sell.set_max"));
        assert!(matches!(
            &next.effects[1],
            Effect::RequestOffers { body: Some(body), .. } if body.source_currency_amount == dec!(0.01)
        ));
    }

    #[test]
    fn test_min_without_offers_only_tracks() {
        let next = update(&sell_model(), Event::OnMinAmountClicked);

        assert!(next.model.is_none());
        assert_eq!(next.effects, vec![Effect::track("sell.set_min")]);
    }

    #[test]
    fn test_empty_wallet_in_sell_mode() {
        let model = sell_model();

        let next = update(
            &model,
            Event::OnWalletBalancesLoaded {
                balances: BTreeMap::from([("btc".to_string(), Decimal::ZERO)]),
            },
        );

        assert_eq!(
            next.model.unwrap().state,
            State::EmptyWallets {
                selling_unavailable: false,
                invalid_sell_pairs: false,
            }
        );
    }

    #[test]
    fn test_swap_flips_mode_and_moves_quote_amount() {
        let mut model = sell_model();
        model.mode = Mode::Buy;
        model.source_currency_code = Some("usd".to_string());
        model.quote_currency_code = Some("btc".to_string());
        model.source_amount_input = "100".to_string();

        let next = update(&model, Event::OnSwapCurrenciesClicked);
        let next_model = next.model.unwrap();

        assert_eq!(next_model.mode, Mode::Sell);
        assert_eq!(next_model.source_currency_code.as_deref(), Some("btc"));
        assert_eq!(next_model.source_amount_input, "0.002");
        assert!(matches!(next.effects[0], Effect::RequestOffers { mode: Mode::Sell, .. }));
    }

    #[test]
    fn test_select_offer_needs_completed_request_with_choices() {
        let mut model = sell_model();
        model.source_amount_input = "0.005".to_string();
        assert_eq!(
            update(&model, Event::OnSelectOfferClicked { cancel: false }),
            Next::no_change()
        );

        let offers = vec![
            offer("wyre", MethodStatus::Ready, true),
            offer("moonpay", MethodStatus::Ready, true),
        ];
        model.offer_details = offer_details(&offers, dec!(0.005));
        model.offer_request = Some(OfferRequest {
            url: "https://api.example.com/offers/req_1".to_string(),
            created_at: offers[0].created_at,
            status: OfferRequestStatus::Complete,
            country_code: "DE".to_string(),
            region_code: None,
            source_currency_code: "btc".to_string(),
            quote_currency_code: "usd".to_string(),
            offers,
        });

        let next = update(&model, Event::OnSelectOfferClicked { cancel: false });
        assert_eq!(
            next.model.unwrap().state,
            State::OrderSetup {
                selecting_offer: true
            }
        );
    }
}
