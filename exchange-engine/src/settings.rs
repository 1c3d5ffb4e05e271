//! Startup and the country / region / fiat settings wizard.

use std::collections::BTreeMap;

use exchange_domain::{
    ApiError, ExchangeCountry, ExchangeCurrency, ExchangePair, ExchangeRegion,
};
use tracing::debug;

use crate::effect::Effect;
use crate::event::UserPreferencesLoaded;
use crate::model::{ConfigTarget, ErrorState, ErrorType, Mode, Model, State};
use crate::order_setup::source_decimals;
use crate::update::Next;

// =============================================================================
// Shared helpers
// =============================================================================

/// `LoadPairs` for the given location.
pub(crate) fn load_pairs_for(
    model: &Model,
    country: &ExchangeCountry,
    region_code: Option<String>,
    fiat_currency_code: Option<String>,
) -> Effect {
    Effect::LoadPairs {
        country_code: country.code.clone(),
        region_code,
        selected_fiat_currency_code: fiat_currency_code,
        test: model.test,
    }
}

/// `LoadPairs` for the model's current location, when a country is selected.
pub(crate) fn load_pairs(model: &Model) -> Option<Effect> {
    let country = model.selected_country.as_ref()?;
    Some(load_pairs_for(
        model,
        country,
        model.selected_region.as_ref().map(|r| r.code.clone()),
        model.selected_fiat_currency.as_ref().map(|c| c.code.clone()),
    ))
}

fn region_preferences(model: &Model) -> Option<Effect> {
    let country = model.selected_country.as_ref()?;
    Some(Effect::UpdateRegionPreferences {
        country_code: country.code.clone(),
        region_code: model.selected_region.as_ref().map(|r| r.code.clone()),
    })
}

fn with_target(model: &Model, target: ConfigTarget) -> Model {
    let mut next = model.clone();
    if let State::ConfigureSettings { target: current, .. } = &mut next.state {
        *current = target;
    }
    next
}

fn settings_menu(model: &Model, is_new_user: bool) -> State {
    State::ConfigureSettings {
        target: ConfigTarget::Menu,
        is_new_user,
        fiat_currencies: model.fiat_currencies(),
    }
}

/// Target after a location pick: the fiat picker unless the fiat already
/// follows the country.
fn target_after_location(model: &Model) -> ConfigTarget {
    let country_currency = model.selected_country.as_ref().map(|c| &c.currency.code);
    let fiat = model.selected_fiat_currency.as_ref().map(|c| &c.code);
    if country_currency == fiat {
        ConfigTarget::Menu
    } else {
        ConfigTarget::Currency
    }
}

// =============================================================================
// Startup
// =============================================================================

pub(crate) fn on_feature_promotions_loaded(model: &Model, show: bool) -> Next {
    if model.state != State::Initializing {
        return Next::no_change();
    }
    if show {
        let mut next = model.clone();
        next.state = State::FeaturePromotion;
        Next::next(next)
    } else {
        Next::dispatch(vec![Effect::LoadCountries])
    }
}

pub(crate) fn on_countries_loaded(
    model: &Model,
    countries: Vec<ExchangeCountry>,
    default_country_code: Option<String>,
    default_region_code: Option<String>,
) -> Next {
    if model.state != State::Initializing {
        return Next::no_change();
    }

    let selected_country = default_country_code
        .as_deref()
        .and_then(|code| countries.iter().find(|c| c.code == code))
        .cloned();
    let selected_region = selected_country.as_ref().and_then(|country| {
        default_region_code
            .as_deref()
            .and_then(|code| country.region(code))
            .cloned()
    });

    // Detected country first, detected region first within it.
    let mut sorted: Vec<ExchangeCountry> = Vec::with_capacity(countries.len());
    if let Some(country) = &selected_country {
        let mut country = country.clone();
        if let Some(region) = &selected_region {
            country.regions.retain(|r| r != region);
            country.regions.insert(0, region.clone());
        }
        sorted.push(country);
    }
    for country in countries {
        if !sorted.iter().any(|c| c.code == country.code) {
            sorted.push(country);
        }
    }

    let mut next = model.clone();
    next.selected_country = sorted.first().filter(|_| selected_country.is_some()).cloned();
    next.selected_region = selected_region;
    if next.selected_fiat_currency.is_none() {
        next.selected_fiat_currency = selected_country.map(|c| c.currency);
    }
    next.countries = sorted;
    Next::next_with(next, vec![Effect::LoadUserPreferences])
}

pub(crate) fn on_countries_error(model: &Model, error: ApiError) -> Next {
    if model.state != State::Initializing {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.error_state = Some(ErrorState::recoverable(
        ErrorType::NetworkError,
        error.debug_message(),
    ));
    Next::next(next)
}

pub(crate) fn on_user_preferences_loaded(model: &Model, prefs: UserPreferencesLoaded) -> Next {
    let country = prefs.selected_country_code.as_deref().and_then(|code| {
        model
            .countries
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .cloned()
    });
    let region = country.as_ref().and_then(|country| {
        prefs
            .selected_region_code
            .as_deref()
            .and_then(|code| country.regions.iter().find(|r| r.code.eq_ignore_ascii_case(code)))
            .cloned()
    });
    let fiat = model
        .countries
        .iter()
        .map(|c| &c.currency)
        .find(|c| c.code.eq_ignore_ascii_case(&prefs.fiat_currency_code))
        .cloned();
    // A stored country the service no longer lists counts as no country.
    let is_new_user = country.is_none();

    if model.settings_only {
        let mut next = model.clone();
        next.api_host = prefs.api_host;
        next.state = settings_menu(model, is_new_user);
        if !is_new_user {
            next.selected_country = country;
            next.selected_region = region;
        }
        next.selected_fiat_currency = fiat.or(next.selected_fiat_currency);
        return Next::next(next);
    }

    if model.state != State::Initializing {
        return Next::no_change();
    }

    let mut next = model.clone();
    next.api_host = prefs.api_host;
    if is_new_user {
        next.state = settings_menu(model, true);
        let effects = load_pairs(&next).into_iter().collect();
        return Next::next_with(next, effects);
    }

    next.selected_country = country;
    next.selected_region = region;
    next.selected_fiat_currency = fiat.or(next.selected_fiat_currency);
    next.source_amount_input = match model.mode {
        Mode::Trade => String::new(),
        Mode::Buy | Mode::Sell => prefs.last_order_amount.unwrap_or_default(),
    };
    if let Some(code) = prefs.last_purchase_currency_code {
        next.last_purchase_currency_code = code;
    }
    next.last_sell_currency_code = prefs.last_sell_currency_code.or(next.last_sell_currency_code);
    next.last_trade_source_currency_code = prefs
        .last_trade_source_currency_code
        .or(next.last_trade_source_currency_code);
    next.last_trade_quote_currency_code = prefs
        .last_trade_quote_currency_code
        .or(next.last_trade_quote_currency_code);

    let effects = load_pairs(&next).into_iter().collect();
    Next::next_with(next, effects)
}

pub(crate) fn on_pairs_loaded(
    model: &Model,
    pairs: Vec<ExchangePair>,
    currencies: BTreeMap<String, ExchangeCurrency>,
) -> Next {
    if !matches!(
        model.state,
        State::Initializing | State::ConfigureSettings { .. } | State::OrderSetup { .. }
    ) {
        return Next::no_change();
    }

    let fiat_code = model.selected_fiat_currency.as_ref().map(|c| c.code.clone());
    if model.mode == Mode::Buy && !model.settings_only {
        let buyable = fiat_code
            .as_deref()
            .map(|fiat| pairs.iter().any(|pair| pair.from_code == fiat))
            .unwrap_or(false);
        if !buyable {
            let location = match (&model.selected_country, &model.selected_region) {
                (Some(country), Some(region)) => format!("{} {}", country.code, region.code),
                (Some(country), None) => country.code.clone(),
                _ => "unknown location".to_string(),
            };
            let mut next = model.clone();
            next.pairs = pairs;
            next.error_state = Some(ErrorState::recoverable(
                ErrorType::UnsupportedRegionError,
                format!("No pairs for {location}"),
            ));
            return Next::next(next);
        }
    }

    let currencies = if model.test {
        currencies
            .into_iter()
            .map(|(code, currency)| (code, currency.for_test_network()))
            .collect()
    } else {
        currencies
    };

    let mut next = model.clone();
    next.pairs = pairs;
    next.currencies = currencies;
    if next.state == State::Initializing {
        next.state = State::order_setup();
    }
    if next.selected_pair().is_none() {
        fill_default_codes(&mut next);
    }
    debug!(
        pairs = next.pairs.len(),
        source = ?next.source_currency_code,
        quote = ?next.quote_currency_code,
        "Pairs loaded"
    );

    let mut effects = vec![Effect::RequestOffers {
        body: next.offer_body(),
        mode: next.mode,
        amount_decimals: source_decimals(&next),
    }];
    if let Some(fiat_currency_code) = fiat_code {
        effects.push(Effect::LoadWalletBalances { fiat_currency_code });
    }
    Next::next_with(next, effects)
}

/// Select the mode's default codes, falling back to the first reachable
/// quote so the pair stays connected.
pub(crate) fn fill_default_codes(model: &mut Model) {
    let (source, quote) = model.default_currency_codes();
    model.source_currency_code = source.or_else(|| model.source_currency_code.clone());
    model.quote_currency_code = quote;
    if model.selected_pair().is_none() {
        model.quote_currency_code = model
            .source_pairs()
            .into_iter()
            .find(|pair| {
                model
                    .currencies
                    .get(&pair.to_code)
                    .map(|c| model.mode.is_compatible_quote(c))
                    .unwrap_or(false)
            })
            .map(|pair| pair.to_code.clone());
    }
}

pub(crate) fn on_pairs_error(model: &Model, error: ApiError) -> Next {
    if !matches!(
        model.state,
        State::Initializing | State::ConfigureSettings { .. } | State::OrderSetup { .. }
    ) {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.error_state = Some(ErrorState::recoverable(
        ErrorType::NetworkError,
        format!("{}: {}", error.status, error.body),
    ));
    Next::next(next)
}

// =============================================================================
// Settings wizard
// =============================================================================

pub(crate) fn on_configure_settings_clicked(model: &Model) -> Next {
    if !matches!(model.state, State::OrderSetup { .. }) {
        return Next::no_change();
    }
    let mut next = model.clone();
    next.state = settings_menu(model, false);
    Next::next(next)
}

pub(crate) fn on_configure_option_clicked(model: &Model, target: ConfigTarget) -> Next {
    match &model.state {
        State::ConfigureSettings { target: current, .. } if *current != target => {
            Next::next(with_target(model, target))
        }
        _ => Next::no_change(),
    }
}

pub(crate) fn on_country_clicked(model: &Model, country: ExchangeCountry) -> Next {
    if !matches!(model.state, State::ConfigureSettings { .. }) {
        return Next::no_change();
    }
    let target = if country.requires_region() {
        ConfigTarget::Region
    } else {
        target_after_location(model)
    };
    let region = country.regions.first().cloned();
    let fiat = model
        .selected_fiat_currency
        .clone()
        .unwrap_or_else(|| country.currency.clone());

    let mut effects = vec![Effect::UpdateRegionPreferences {
        country_code: country.code.clone(),
        region_code: region.as_ref().map(|r| r.code.clone()),
    }];
    if !model.settings_only && !country.requires_region() {
        effects.push(load_pairs_for(model, &country, None, Some(fiat.code.clone())));
    }

    let mut next = with_target(model, target);
    next.selected_country = Some(country);
    next.selected_region = region;
    next.selected_fiat_currency = Some(fiat);
    Next::next_with(next, effects)
}

pub(crate) fn on_region_clicked(model: &Model, region: ExchangeRegion) -> Next {
    if !matches!(model.state, State::ConfigureSettings { .. }) {
        return Next::no_change();
    }
    let mut effects = Vec::new();
    if let Some(country) = &model.selected_country {
        effects.push(Effect::UpdateRegionPreferences {
            country_code: country.code.clone(),
            region_code: Some(region.code.clone()),
        });
        if !model.settings_only {
            effects.push(load_pairs_for(
                model,
                country,
                Some(region.code.clone()),
                model.selected_fiat_currency.as_ref().map(|c| c.code.clone()),
            ));
        }
    }

    let mut next = with_target(model, target_after_location(model));
    next.selected_region = Some(region);
    Next::next_with(next, effects)
}

pub(crate) fn on_currency_clicked(model: &Model, currency: ExchangeCurrency) -> Next {
    if !matches!(model.state, State::ConfigureSettings { .. }) {
        return Next::no_change();
    }
    let mut effects = vec![Effect::track(model.event_name("change_currency"))];
    if model.settings_only {
        effects.push(Effect::UpdateCurrencyPreference {
            currency_code: currency.code.clone(),
        });
    } else {
        effects.push(Effect::LoadWalletBalances {
            fiat_currency_code: currency.code.clone(),
        });
        if model.mode != Mode::Trade {
            if let Some(country) = &model.selected_country {
                effects.push(load_pairs_for(
                    model,
                    country,
                    model.selected_region.as_ref().map(|r| r.code.clone()),
                    Some(currency.code.clone()),
                ));
            }
        }
    }

    let mut next = with_target(model, ConfigTarget::Menu);
    match model.mode {
        Mode::Buy => next.source_currency_code = Some(currency.code.clone()),
        Mode::Sell => next.quote_currency_code = Some(currency.code.clone()),
        Mode::Trade => {}
    }
    next.selected_fiat_currency = Some(currency);
    Next::next_with(next, effects)
}

pub(crate) fn on_close_settings_clicked(model: &Model) -> Next {
    match &model.state {
        State::ConfigureSettings {
            target: ConfigTarget::Menu,
            ..
        } => {
            if model.is_region_configured() && !model.settings_only {
                let mut next = model.clone();
                next.state = State::order_setup();
                Next::next(next)
            } else {
                Next::dispatch(vec![Effect::ExitFlow])
            }
        }
        State::ConfigureSettings { .. } => Next::next(with_target(model, ConfigTarget::Menu)),
        _ => Next::no_change(),
    }
}

/// `Continue` inside the wizard.
pub(crate) fn on_settings_continue(model: &Model) -> Next {
    let State::ConfigureSettings {
        target,
        is_new_user,
        ..
    } = &model.state
    else {
        return Next::no_change();
    };

    match target {
        ConfigTarget::Menu => {
            if model.settings_only {
                return Next::dispatch(vec![Effect::ExitFlow]);
            }
            if !model.is_region_configured() {
                return Next::no_change();
            }
            let mut effects = Vec::new();
            if let Some(fiat) = &model.selected_fiat_currency {
                effects.push(Effect::UpdateCurrencyPreference {
                    currency_code: fiat.code.clone(),
                });
            }
            effects.extend(region_preferences(model));
            effects.extend(load_pairs(model));
            let mut next = model.clone();
            next.state = State::order_setup();
            Next::next_with(next, effects)
        }
        ConfigTarget::Country => {
            let Some(country) = &model.selected_country else {
                return Next::no_change();
            };
            let target = if country.requires_region() {
                ConfigTarget::Region
            } else {
                ConfigTarget::Currency
            };
            let effects = load_pairs(model)
                .into_iter()
                .chain(region_preferences(model))
                .collect();
            Next::next_with(with_target(model, target), effects)
        }
        ConfigTarget::Region => {
            if model.selected_region.is_none() {
                return Next::no_change();
            }
            let effects = load_pairs(model)
                .into_iter()
                .chain(region_preferences(model))
                .collect();
            Next::next_with(with_target(model, ConfigTarget::Currency), effects)
        }
        ConfigTarget::Currency => {
            let Some(fiat) = model.selected_fiat_currency.as_ref().filter(|c| !c.code.is_empty())
            else {
                return Next::no_change();
            };
            let mut next = if *is_new_user && !model.settings_only {
                let mut next = model.clone();
                next.state = State::order_setup();
                next
            } else {
                with_target(model, ConfigTarget::Menu)
            };
            if next.quote_currency_code.is_none() {
                next.quote_currency_code = model.default_currency_codes().1;
            }
            Next::next_with(
                next,
                vec![Effect::UpdateCurrencyPreference {
                    currency_code: fiat.code.clone(),
                }],
            )
        }
    }
}

/// `Back` inside the wizard.
pub(crate) fn on_settings_back(model: &Model) -> Next {
    let State::ConfigureSettings {
        target,
        is_new_user,
        ..
    } = &model.state
    else {
        return Next::no_change();
    };
    match target {
        ConfigTarget::Menu if *is_new_user || model.settings_only => {
            Next::dispatch(vec![Effect::ExitFlow])
        }
        ConfigTarget::Menu => {
            let mut next = model.clone();
            next.state = State::order_setup();
            Next::next(next)
        }
        _ => Next::next(with_target(model, ConfigTarget::Menu)),
    }
}
