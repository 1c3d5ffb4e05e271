//! The reducer: `(Model, Event) -> Next`.
//!
//! Transition rules live in three modules grouped by the part of the flow
//! they drive (`settings`, `order_setup`, `order_flow`). This module only
//! routes events and applies the rules shared by every transition.

use tracing::trace;

use crate::effect::Effect;
use crate::event::Event;
use crate::model::{Mode, Model};
use crate::{order_flow, order_setup, settings};

// =============================================================================
// Next
// =============================================================================

/// Result of one reducer step.
#[derive(Debug, Clone, PartialEq)]
pub struct Next {
    /// New model, or `None` when the model is unchanged
    pub model: Option<Model>,
    /// Effects to execute, in order
    pub effects: Vec<Effect>,
}

impl Next {
    /// Nothing changes, nothing to do.
    pub fn no_change() -> Self {
        Self {
            model: None,
            effects: Vec::new(),
        }
    }

    /// New model, no effects.
    pub fn next(model: Model) -> Self {
        Self::next_with(model, Vec::new())
    }

    /// New model and effects.
    pub fn next_with(model: Model, effects: Vec<Effect>) -> Self {
        Self {
            model: Some(model),
            effects,
        }
    }

    /// Effects only.
    pub fn dispatch(effects: Vec<Effect>) -> Self {
        Self {
            model: None,
            effects,
        }
    }

    /// Whether the step produced a new model.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Model after this step, given the model it was computed from.
    pub fn model_or<'a>(&'a self, current: &'a Model) -> &'a Model {
        self.model.as_ref().unwrap_or(current)
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// First effects of a flow.
pub fn init(model: &Model) -> Next {
    if model.settings_only {
        Next::dispatch(vec![Effect::LoadCountries])
    } else {
        Next::dispatch(vec![Effect::LoadFeaturePromotions { mode: model.mode }])
    }
}

/// Apply `event` to `model`.
pub fn update(model: &Model, event: Event) -> Next {
    let event_name = event.name();
    let next = route(model, event);
    if !next.has_model() && next.effects.is_empty() {
        trace!(event = event_name, state = model.state.name(), "Event ignored");
    }
    reconcile(model, next)
}

fn route(model: &Model, event: Event) -> Next {
    match event {
        Event::OnFeaturePromotionsLoaded { show } => {
            settings::on_feature_promotions_loaded(model, show)
        }
        Event::OnCountriesLoaded {
            countries,
            default_country_code,
            default_region_code,
        } => settings::on_countries_loaded(
            model,
            countries,
            default_country_code,
            default_region_code,
        ),
        Event::OnCountriesError(error) => settings::on_countries_error(model, error),
        Event::OnUserPreferencesLoaded(prefs) => settings::on_user_preferences_loaded(model, prefs),
        Event::OnPairsLoaded { pairs, currencies } => {
            settings::on_pairs_loaded(model, pairs, currencies)
        }
        Event::OnPairsError(error) => settings::on_pairs_error(model, error),
        Event::OnModeSelected(mode) => on_mode_selected(model, mode),
        Event::OnLocalDataCleared => on_local_data_cleared(model),

        Event::OnConfigureSettingsClicked => settings::on_configure_settings_clicked(model),
        Event::OnConfigureCountryClicked => {
            settings::on_configure_option_clicked(model, crate::ConfigTarget::Country)
        }
        Event::OnConfigureRegionClicked => {
            settings::on_configure_option_clicked(model, crate::ConfigTarget::Region)
        }
        Event::OnConfigureCurrencyClicked => {
            settings::on_configure_option_clicked(model, crate::ConfigTarget::Currency)
        }
        Event::OnCountryClicked(country) => settings::on_country_clicked(model, country),
        Event::OnRegionClicked(region) => settings::on_region_clicked(model, region),
        Event::OnCloseSettingsClicked => settings::on_close_settings_clicked(model),

        Event::OnWalletBalancesLoaded { balances } => {
            order_setup::on_wallet_balances_loaded(model, balances)
        }
        Event::OnNativeNetworkInfoLoaded(info) => {
            order_setup::on_native_network_info_loaded(model, info)
        }
        Event::OnAmountChange(change) => order_setup::on_amount_changed(model, change, false),
        Event::OnQuoteAmountChange(change) => order_setup::on_amount_changed(model, change, true),
        Event::OnMaxAmountClicked => order_setup::on_max_amount_clicked(model),
        Event::OnMinAmountClicked => order_setup::on_min_amount_clicked(model),
        Event::OnSwapCurrenciesClicked => order_setup::on_swap_currencies_clicked(model),
        Event::OnSelectPairClicked { select_source } => {
            order_setup::on_select_pair_clicked(model, select_source)
        }
        Event::OnSelectPairCancelClicked => order_setup::on_select_pair_cancel_clicked(model),
        Event::OnCurrencyClicked(currency) => match model.state {
            crate::State::ConfigureSettings { .. } => settings::on_currency_clicked(model, currency),
            _ => order_setup::on_asset_clicked(model, currency),
        },
        Event::OnOfferAmountOverridden {
            original_body,
            new_amount,
        } => order_setup::on_offer_amount_overridden(model, &original_body, new_amount),
        Event::OnOfferRequestUpdated {
            offer_body,
            offer_request,
            offer_details,
        } => order_setup::on_offer_request_updated(model, &offer_body, offer_request, offer_details),
        Event::OnOfferRequestError { offer_body, error } => {
            order_setup::on_offer_request_error(model, &offer_body, error)
        }
        Event::OnOfferClicked {
            offer_details,
            adjust_to_limit,
        } => order_setup::on_offer_clicked(model, offer_details, adjust_to_limit),
        Event::OnSelectOfferClicked { cancel } => order_setup::on_select_offer_clicked(model, cancel),

        Event::OnContinueClicked => order_flow::on_continue_clicked(model),
        Event::OnBackClicked => order_flow::on_back_clicked(model),
        Event::OnCloseClicked { confirmed } => order_flow::on_close_clicked(model, confirmed),
        Event::OnDialogConfirmClicked => order_flow::on_dialog_confirm_clicked(model),
        Event::OnDialogCancelClicked => order_flow::on_dialog_cancel_clicked(model),
        Event::OnOrderUpdated(order) => order_flow::on_order_updated(model, order),
        Event::OnOrderFailed(failure) => order_flow::on_order_failed(model, failure),
        Event::OnBrowserActionCompleted { action, cancelled } => {
            order_flow::on_browser_action_completed(model, action, cancelled)
        }
        Event::OnCryptoSendActionCompleted {
            action,
            transaction_hash,
            cancelled,
        } => order_flow::on_crypto_send_action_completed(model, action, transaction_hash, cancelled),
        Event::OnCryptoSendActionFailed(reason) => {
            order_flow::on_crypto_send_action_failed(model, reason)
        }
        Event::OnCryptoSendHashUpdateSuccess => order_flow::on_crypto_send_hash_update_success(model),
        Event::OnCryptoSendHashUpdateFailed => order_flow::on_crypto_send_hash_update_failed(model),
    }
}

/// Rules every transition obeys.
///
/// - Offer results never outlive the inputs they were requested for: when
///   the offer-defining inputs change, the offer request, details and
///   selection are dropped together.
/// - Outside BUY, a newly resolved source asset triggers a network fee lookup.
fn reconcile(before: &Model, mut next: Next) -> Next {
    let Some(mut after) = next.model.take() else {
        return next;
    };

    if after.offer_tuple() != before.offer_tuple() {
        after = after.without_offers();
    }

    let source_id = |model: &Model| model.source_currency().map(|c| c.currency_id.clone());
    let after_id = source_id(&after);
    if after.mode != Mode::Buy && after_id.is_some() && after_id != source_id(before) {
        after.native_network_info = None;
        if let Some(currency_id) = after_id {
            next.effects.push(Effect::LoadNativeNetworkInfo { currency_id });
        }
    }

    next.model = Some(after);
    next
}

fn on_mode_selected(model: &Model, mode: Mode) -> Next {
    if model.mode == mode || model.settings_only {
        return Next::no_change();
    }
    let fresh = Model {
        api_host: model.api_host.clone(),
        ..Model::create(mode, model.test)
    };
    let effects = init(&fresh).effects;
    Next::next_with(fresh, effects)
}

fn on_local_data_cleared(model: &Model) -> Next {
    let fresh = if model.settings_only {
        Model::create_for_settings()
    } else {
        Model::create(model.mode, model.test)
    };
    let mut effects = vec![Effect::ClearDataCache];
    effects.extend(init(&fresh).effects);
    Next::next_with(fresh, effects)
}
