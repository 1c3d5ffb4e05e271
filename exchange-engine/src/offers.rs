//! Offer details derivation and default selection.

use rust_decimal::Decimal;

use exchange_domain::{ExchangeOffer, FeeType, LimitType};

use crate::model::{InvalidOffer, Mode, OfferDetails, ValidOffer};

/// Classify `offers` for a request of `source_amount`.
///
/// Offers without an invoice estimate are outside the provider's limits.
/// Their replacement amount is the limit the amount violates: the minimum
/// when below it, the maximum when above it.
pub fn offer_details(offers: &[ExchangeOffer], source_amount: Decimal) -> Vec<OfferDetails> {
    offers
        .iter()
        .map(|offer| match &offer.invoice_estimate {
            Some(invoice) => {
                let source = &invoice.source_currency;
                let quote = &invoice.quote_currency;
                let source_rate = if quote.subtotal.is_zero() {
                    None
                } else {
                    Some(source.subtotal / quote.subtotal)
                };
                OfferDetails::Valid(ValidOffer {
                    offer: offer.clone(),
                    source_rate,
                    network_fee: invoice.fee_amount(FeeType::Network),
                    platform_fee: invoice.fee_amount(FeeType::Platform),
                    provider_fee: invoice.fee_amount(FeeType::Provider),
                    source_subtotal: source.subtotal,
                    source_fees: source.fees,
                    source_total: source.total,
                    quote_subtotal: quote.subtotal,
                    quote_fees: quote.fees,
                    quote_total: quote.total,
                })
            }
            None => {
                let min = offer.limit(LimitType::SourceCurrencyMin);
                let max = offer.limit(LimitType::SourceCurrencyMax);
                let replacement = match (min, max) {
                    (Some(min), _) if source_amount < min => Some(min),
                    (_, Some(max)) if source_amount > max => Some(max),
                    _ => min.or(max),
                };
                OfferDetails::Invalid(InvalidOffer {
                    offer: offer.clone(),
                    min_source_amount: min,
                    max_source_amount: max,
                    raw_replacement_amount: replacement.map(|amount| amount.normalize().to_string()),
                })
            }
        })
        .collect()
}

/// First valid offer whose settlement method is ready, else the first offer.
///
/// The settlement side is the source method for BUY/TRADE and the quote
/// method for SELL.
pub fn default_offer(details: &[OfferDetails], mode: Mode) -> Option<OfferDetails> {
    details
        .iter()
        .find(|details| {
            let offer = details.offer();
            let method = match mode {
                Mode::Buy | Mode::Trade => &offer.source_currency_method,
                Mode::Sell => &offer.quote_currency_method,
            };
            details.as_valid().is_some() && method.is_ready()
        })
        .or_else(|| details.first())
        .cloned()
}

/// Offer from the same provider and payment-method kind as `previous`.
pub(crate) fn matching_offer(
    details: &[OfferDetails],
    previous: &ExchangeOffer,
) -> Option<OfferDetails> {
    details
        .iter()
        .find(|details| {
            let offer = details.offer();
            offer.provider.slug == previous.provider.slug
                && offer
                    .source_currency_method
                    .same_kind(&previous.source_currency_method)
        })
        .cloned()
}
