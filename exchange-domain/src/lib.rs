//! Cosmos Exchange Domain Layer
//!
//! Immutable value types shared by the exchange flow: currencies, countries,
//! trading pairs, offers, offer requests and orders.
//! No I/O, no async. Everything here is serde-serializable so the API
//! adapters, the preferences cache and the tests can speak the same shapes.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Public modules
pub mod api;
pub mod currency;
pub mod offer;
pub mod order;
pub mod value_objects;

// Re-export commonly used types
pub use api::{ApiError, CountriesResponse, OrderErrorType, OrderFailure, PairsResponse};
pub use currency::{
    CurrencyType, ExchangeCountry, ExchangeCurrency, ExchangePair, ExchangeRegion,
    NativeNetworkInfo,
};
pub use offer::{
    CurrencyMethod, Estimate, ExchangeOffer, Fee, FeeType, InvoiceEstimate, Limit, LimitType,
    MethodStatus, OfferBody, OfferRequest, OfferRequestStatus, Provider,
};
pub use order::{
    ActionType, CryptoInputStatus, CryptoOutputStatus, ExchangeInput, ExchangeOrder,
    ExchangeOutput, FiatStatus, InputTransfer, Media, OrderAction, OrderStatus, OutputTransfer,
};
pub use value_objects::{normalize_amount, parse_amount, DomainError};
