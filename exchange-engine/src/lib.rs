//! Cosmos Exchange Engine Layer
//!
//! Pure decision logic for the exchange flow, deterministic, no I/O.
//! Takes the current `Model` and an `Event` and returns the next `Model`
//! plus the `Effect`s to execute.
//!
//! # Architecture
//!
//! ```text
//! UI / Effect runtime
//!        │ Event
//!        ▼
//!  ┌───────────┐   Next { model, effects }
//!  │  update   │ ─────────────────────────────► event loop
//!  └───────────┘
//!        ▲
//!        │ &Model (immutable snapshot)
//! ```
//!
//! Every transition builds a new `Model`; nothing here suspends or touches
//! the network, so every rule is testable with plain values.

#![warn(clippy::all)]

pub mod amount;
pub mod effect;
pub mod event;
pub mod model;
pub mod offers;
mod order_flow;
mod order_setup;
mod settings;
pub mod update;

pub use amount::{apply_amount_change, AmountChange, AmountEdit, MAX_INPUT_DIGITS};
pub use effect::{Effect, UserAction};
pub use event::{Event, SendFailedReason, UserPreferencesLoaded};
pub use model::{
    ConfigTarget, ErrorState, ErrorType, InputError, InvalidOffer, Mode, Model, OfferDetails,
    OfferState, State, ValidOffer,
};
pub use offers::{default_offer, offer_details};
pub use update::{init, update, Next};
