//! Results returned by the exchange service.
//!
//! Failures from the service are values that travel inside events, so they
//! are plain data here rather than `Error` types.

use serde::{Deserialize, Serialize};

use crate::currency::{ExchangeCountry, ExchangeCurrency, ExchangePair};

/// A failed call to the exchange service.
///
/// `status` is the HTTP status, or `-1` for failures that never reached the
/// service (wallet estimate errors, transport errors).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status or -1
    pub status: i32,
    /// Response body or failure description
    pub body: String,
}

impl ApiError {
    /// Create an error.
    pub fn new(status: i32, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A failure that happened before reaching the service.
    pub fn local(body: impl Into<String>) -> Self {
        Self::new(-1, body)
    }

    /// `"status : body"`, the form shown in error debug messages.
    pub fn debug_message(&self) -> String {
        format!("{} : {}", self.status, self.body)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.debug_message())
    }
}

/// Reason an order could not be created or progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderErrorType {
    /// The offer expired before the order was created
    OfferExpired,
    /// The provider rejected the order
    ProviderRejected,
    /// The amount is outside the provider's limits
    LimitExceeded,
    /// Anything else
    #[serde(other)]
    UnknownError,
}

impl OrderErrorType {
    /// Upper-case name used in analytics.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderErrorType::OfferExpired => "OFFER_EXPIRED",
            OrderErrorType::ProviderRejected => "PROVIDER_REJECTED",
            OrderErrorType::LimitExceeded => "LIMIT_EXCEEDED",
            OrderErrorType::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// A failed order operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFailure {
    /// Classified reason, when the service reported one
    #[serde(default, rename = "type")]
    pub error_type: Option<OrderErrorType>,
    /// Message from the service
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderFailure {
    /// Create a failure.
    pub fn new(error_type: Option<OrderErrorType>, message: Option<String>) -> Self {
        Self {
            error_type,
            message,
        }
    }

    /// An unclassified failure with a message.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(Some(OrderErrorType::UnknownError), Some(message.into()))
    }
}

/// Countries supported by the service plus the caller's detected location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountriesResponse {
    /// Supported countries
    pub countries: Vec<ExchangeCountry>,
    /// Country detected from the caller's IP
    #[serde(default)]
    pub detected_country_code: Option<String>,
    /// Region detected from the caller's IP
    #[serde(default)]
    pub detected_region_code: Option<String>,
}

/// Tradable pairs for a location plus every currency they reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairsResponse {
    /// Pairs
    pub pairs: Vec<ExchangePair>,
    /// Currencies referenced by the pairs
    pub currencies: Vec<ExchangeCurrency>,
}
