//! Offers, offer requests and the body used to ask for them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_objects::DomainError;

// =============================================================================
// Offer body
// =============================================================================

/// The offer-defining inputs sent to the exchange service.
///
/// Two bodies describe the same request when country, region, both currency
/// codes and the amount agree; [`OfferBody::same_request`] is the single
/// definition of that rule and is what offer responses are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferBody {
    /// ISO country code
    pub country_code: String,
    /// Region code, when the country requires one
    pub region_code: Option<String>,
    /// Currency being spent
    pub source_currency_code: String,
    /// Currency being received
    pub quote_currency_code: String,
    /// Amount of the source currency
    pub source_currency_amount: Decimal,
    /// Wallet currency id of the source currency
    pub currency_id: String,
    /// Ask for test offers
    #[serde(default)]
    pub test: bool,
}

impl OfferBody {
    /// Whether `other` asks for the same offers as `self`.
    ///
    /// Amounts compare numerically, so "100" and "100.00" match.
    pub fn same_request(&self, other: &OfferBody) -> bool {
        self.country_code == other.country_code
            && self.region_code == other.region_code
            && self.source_currency_code == other.source_currency_code
            && self.quote_currency_code == other.quote_currency_code
            && self.source_currency_amount == other.source_currency_amount
    }

    /// Copy of this body with a different amount.
    pub fn with_amount(&self, amount: Decimal) -> Self {
        Self {
            source_currency_amount: amount,
            ..self.clone()
        }
    }
}

// =============================================================================
// Offer
// =============================================================================

/// Provider of an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Display name
    #[serde(default = "Provider::unknown_name")]
    pub name: String,
    /// Logo url
    #[serde(default)]
    pub logo_url: Option<String>,
    /// Stable provider identifier
    pub slug: String,
    /// Provider website
    #[serde(default)]
    pub url: Option<String>,
}

impl Provider {
    fn unknown_name() -> String {
        "<Unknown>".to_string()
    }
}

/// Kind of an offer limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitType {
    /// Minimum source amount
    SourceCurrencyMin,
    /// Maximum source amount
    SourceCurrencyMax,
    /// Minimum quote amount
    QuoteCurrencyMin,
    /// Maximum quote amount
    QuoteCurrencyMax,
}

/// An amount limit attached to an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    /// Limit name as reported by the provider
    pub name: String,
    /// What the limit constrains
    #[serde(rename = "type")]
    pub limit_type: LimitType,
    /// Limit amount
    pub amount: Decimal,
    /// Amount already consumed inside the limit window
    #[serde(default)]
    pub consumed: Option<Decimal>,
}

/// Availability of a settlement method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodStatus {
    /// Needs further user setup
    Pending,
    /// Usable now
    Ready,
}

/// How one side of an offer is settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurrencyMethod {
    /// SEPA bank transfer
    Sepa {
        /// Availability
        status: MethodStatus,
    },
    /// Card payment
    Card {
        /// Availability
        status: MethodStatus,
        /// Card network / last digits shown to the user
        #[serde(default)]
        description: Option<String>,
    },
    /// ACH bank transfer
    Ach {
        /// Availability
        status: MethodStatus,
        /// Linked bank account description
        #[serde(default)]
        description: Option<String>,
    },
    /// On-chain transfer
    Crypto {
        /// Availability
        status: MethodStatus,
    },
}

impl CurrencyMethod {
    /// Availability of this method.
    pub fn status(&self) -> MethodStatus {
        match self {
            CurrencyMethod::Sepa { status }
            | CurrencyMethod::Card { status, .. }
            | CurrencyMethod::Ach { status, .. }
            | CurrencyMethod::Crypto { status } => *status,
        }
    }

    /// Whether this method can be used right away.
    pub fn is_ready(&self) -> bool {
        self.status() == MethodStatus::Ready
    }

    /// Whether both methods are the same kind (card vs card, ...).
    pub fn same_kind(&self, other: &CurrencyMethod) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Short name used in analytics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CurrencyMethod::Sepa { .. } => "sepa",
            CurrencyMethod::Card { .. } => "card",
            CurrencyMethod::Ach { .. } => "ach",
            CurrencyMethod::Crypto { .. } => "crypto",
        }
    }
}

/// Fee category of an invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeType {
    /// Charged by the provider
    #[serde(rename = "provider_fee")]
    Provider,
    /// Charged by the platform
    #[serde(rename = "platform_fee")]
    Platform,
    /// Network (mining/gas) fee
    #[serde(rename = "network_fee")]
    Network,
}

/// A single fee line of an invoice estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    /// Fee percentage of the order, when proportional
    #[serde(default)]
    pub percentage: Option<Decimal>,
    /// Fee in source currency before discounts
    #[serde(default)]
    pub source_currency_amount: Option<Decimal>,
    /// Fee in quote currency before discounts
    #[serde(default)]
    pub quote_currency_amount: Option<Decimal>,
    /// Fee category
    #[serde(rename = "fee_type")]
    pub fee_type: FeeType,
}

/// Subtotal / fees / total for one side of an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    /// Amount before fees
    pub subtotal: Decimal,
    /// Sum of fees
    pub fees: Decimal,
    /// Amount after fees
    pub total: Decimal,
}

/// Estimated invoice for an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceEstimate {
    /// Fee lines
    pub fees: Vec<Fee>,
    /// Source side totals
    pub source_currency: Estimate,
    /// Quote side totals
    pub quote_currency: Estimate,
}

impl InvoiceEstimate {
    /// Source amount of the first fee of `fee_type`.
    pub fn fee_amount(&self, fee_type: FeeType) -> Option<Decimal> {
        self.fees
            .iter()
            .find(|fee| fee.fee_type == fee_type)
            .and_then(|fee| fee.source_currency_amount)
    }
}

/// A provider's quote for an offer body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOffer {
    /// Offer identifier, used to create an order
    pub offer_id: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    pub expires_at: DateTime<Utc>,
    /// How the quote currency is delivered
    pub quote_currency_method: CurrencyMethod,
    /// How the source currency is paid
    pub source_currency_method: CurrencyMethod,
    /// Offer provider
    pub provider: Provider,
    /// Free-form delivery estimate
    #[serde(default, rename = "provider_delivery_estimate")]
    pub delivery_estimate: Option<String>,
    /// Amount limits
    #[serde(default)]
    pub limits: Vec<Limit>,
    /// Invoice estimate; absent when the body is outside the limits
    #[serde(default)]
    pub invoice_estimate: Option<InvoiceEstimate>,
}

impl ExchangeOffer {
    /// Amount of the first limit of `limit_type`.
    pub fn limit(&self, limit_type: LimitType) -> Option<Decimal> {
        self.limits
            .iter()
            .find(|limit| limit.limit_type == limit_type)
            .map(|limit| limit.amount)
    }
}

// =============================================================================
// Offer request
// =============================================================================

/// Gathering state of an offer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferRequestStatus {
    /// Providers are still answering
    Gathering,
    /// All known offers are included
    Complete,
}

/// Server-side collection of offers for one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferRequest {
    /// Resource url; the id is its last path segment
    pub url: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Gathering state
    pub status: OfferRequestStatus,
    /// Requested country
    pub country_code: String,
    /// Requested region
    #[serde(default)]
    pub region_code: Option<String>,
    /// Requested source currency
    pub source_currency_code: String,
    /// Requested quote currency
    pub quote_currency_code: String,
    /// Offers gathered so far
    #[serde(default)]
    pub offers: Vec<ExchangeOffer>,
}

impl OfferRequest {
    /// Identifier used to poll this request.
    ///
    /// # Errors
    /// Returns `DomainError::InvalidOfferRequest` when the url has no id segment.
    pub fn id(&self) -> Result<&str, DomainError> {
        match self.url.trim_end_matches('/').rsplit('/').next() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(DomainError::InvalidOfferRequest(self.url.clone())),
        }
    }

    /// Whether gathering has finished.
    pub fn is_complete(&self) -> bool {
        self.status == OfferRequestStatus::Complete
    }

    /// Copy of this request marked complete.
    pub fn completed(&self) -> Self {
        Self {
            status: OfferRequestStatus::Complete,
            ..self.clone()
        }
    }
}
