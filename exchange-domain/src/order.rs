//! Orders and the actions the user or the app must complete on them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::currency::ExchangeCurrency;
use crate::offer::Provider;

// =============================================================================
// Actions
// =============================================================================

/// What an order action asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// The app must submit an address to receive crypto
    CryptoReceiveAddress,
    /// The app must submit an address for refunds
    CryptoRefundAddress,
    /// The user must send crypto
    CryptoSend,
    /// The user must complete a step in a browser
    Browser,
}

impl ActionType {
    /// Address actions are completed by the app without user involvement.
    pub fn is_address_action(&self) -> bool {
        matches!(
            self,
            ActionType::CryptoReceiveAddress | ActionType::CryptoRefundAddress
        )
    }
}

/// A step required to progress an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderAction {
    /// Kind of step
    #[serde(rename = "type")]
    pub action_type: ActionType,
    /// Url to open or to submit to
    pub url: String,
    /// Title shown to the user
    #[serde(default)]
    pub title: String,
    /// Message shown to the user
    #[serde(default)]
    pub message: String,
}

impl OrderAction {
    /// Create an action.
    pub fn new(action_type: ActionType, url: impl Into<String>) -> Self {
        Self {
            action_type,
            url: url.into(),
            title: String::new(),
            message: String::new(),
        }
    }
}

// =============================================================================
// Inputs / Outputs
// =============================================================================

/// Payment medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Media {
    /// On-chain transfer
    Crypto,
    /// ACH bank transfer
    Ach,
    /// Card payment
    Card,
    /// SEPA bank transfer
    Sepa,
}

impl Media {
    /// Upper-case name used in analytics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Media::Crypto => "CRYPTO",
            Media::Ach => "ACH",
            Media::Card => "CARD",
            Media::Sepa => "SEPA",
        }
    }
}

/// Status of a crypto transfer into the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoInputStatus {
    /// Waiting for the user's payment
    WaitingForPayment,
    /// Payment seen, waiting for confirmations
    WaitingForConfirmation,
    /// Waiting for the app to submit an address
    WaitingForAddress,
    /// Refunded
    Refunded,
    /// Failed
    Failed,
    /// Complete
    Complete,
}

/// Status of a crypto transfer out of the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CryptoOutputStatus {
    /// Waiting for the app to submit an address
    WaitingForAddress,
    /// Ready to be sent
    Ready,
    /// Failed
    Failed,
    /// Being sent
    Processing,
    /// Complete
    Complete,
}

/// Status of a fiat transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiatStatus {
    /// Waiting for payment
    WaitingForPayment,
    /// Waiting for the bank to authorize
    WaitingForAuthorization,
    /// Waiting for a payment medium
    WaitingForMedia,
    /// Ready
    Ready,
    /// Pending
    Pending,
    /// Failed
    Failed,
    /// Complete
    Complete,
}

/// Medium-specific part of an order input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputTransfer {
    /// Crypto sent by the user
    CryptoTransfer {
        /// Transfer status
        #[serde(rename = "crypto_transfer_status")]
        status: CryptoInputStatus,
        /// Address the user sends to
        #[serde(default)]
        send_to_address: Option<String>,
        /// Destination tag for networks that need one
        #[serde(default)]
        send_to_destination_tag: Option<String>,
        /// Refund address
        #[serde(default)]
        refund_address: Option<String>,
        /// Hash of the user's transaction
        #[serde(default)]
        transaction_id: Option<String>,
    },
    /// Card payment
    CardPayment,
    /// ACH payment
    Ach {
        /// Transfer status
        #[serde(rename = "ach_transfer_status")]
        status: FiatStatus,
    },
    /// SEPA payment
    Sepa,
}

/// What the user pays into an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeInput {
    /// Payment medium
    pub media: Media,
    /// Amount paid
    pub amount: Decimal,
    /// Currency paid
    pub currency: ExchangeCurrency,
    /// Pending steps
    #[serde(default)]
    pub actions: Vec<OrderAction>,
    /// Expiry of this input
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Medium-specific details
    #[serde(flatten)]
    pub transfer: InputTransfer,
}

impl ExchangeInput {
    /// Whether this is a crypto transfer waiting for the app to submit an address.
    pub fn is_waiting_for_address(&self) -> bool {
        matches!(
            self.transfer,
            InputTransfer::CryptoTransfer {
                status: CryptoInputStatus::WaitingForAddress,
                ..
            }
        )
    }
}

/// Medium-specific part of an order output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputTransfer {
    /// Crypto delivered to the user's wallet
    CryptoTransfer {
        /// Transfer status
        #[serde(rename = "crypto_transfer_status")]
        status: CryptoOutputStatus,
        /// Destination address
        #[serde(default)]
        send_to_address: Option<String>,
        /// Delivery transaction hash
        #[serde(default)]
        transaction_id: Option<String>,
    },
    /// Fiat delivered to a bank account
    Ach {
        /// Transfer status
        #[serde(rename = "ach_transfer_status")]
        status: FiatStatus,
    },
}

/// What the user receives from an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOutput {
    /// Delivery medium
    pub media: Media,
    /// Amount delivered
    pub amount: Decimal,
    /// Currency delivered
    pub currency: ExchangeCurrency,
    /// Pending steps
    #[serde(default)]
    pub actions: Vec<OrderAction>,
    /// Expiry of this output
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Medium-specific details
    #[serde(flatten)]
    pub transfer: OutputTransfer,
}

impl ExchangeOutput {
    /// Whether this is a crypto transfer waiting for the app to submit an address.
    pub fn is_waiting_for_address(&self) -> bool {
        matches!(
            self.transfer,
            OutputTransfer::CryptoTransfer {
                status: CryptoOutputStatus::WaitingForAddress,
                ..
            }
        )
    }
}

// =============================================================================
// Order
// =============================================================================

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Created, steps still pending
    Initializing,
    /// All setup steps done
    Initialized,
    /// Terminal
    Finalized,
}

/// An order created from an accepted offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeOrder {
    /// Resource url
    pub url: String,
    /// Order identifier
    pub order_id: String,
    /// What the user pays
    pub inputs: Vec<ExchangeInput>,
    /// What the user receives
    pub outputs: Vec<ExchangeOutput>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Country of the order
    pub country_code: String,
    /// Region of the order
    #[serde(default)]
    pub region_code: Option<String>,
    /// Fulfilling provider
    pub provider: Provider,
    /// Test order
    #[serde(default)]
    pub test: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Expiry time
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ExchangeOrder {
    /// Whether the order reached its terminal status.
    pub fn is_finalized(&self) -> bool {
        self.status == OrderStatus::Finalized
    }

    /// Address actions the app must complete, outputs first.
    ///
    /// Only inputs/outputs that are crypto transfers waiting for an address
    /// contribute actions.
    pub fn pending_address_actions(&self) -> Vec<OrderAction> {
        let outputs = self
            .outputs
            .iter()
            .filter(|output| output.is_waiting_for_address())
            .flat_map(|output| output.actions.iter());
        let inputs = self
            .inputs
            .iter()
            .filter(|input| input.is_waiting_for_address())
            .flat_map(|input| input.actions.iter());

        outputs
            .chain(inputs)
            .filter(|action| action.action_type.is_address_action())
            .cloned()
            .collect()
    }

    /// First step the user must complete: browser steps on outputs, then
    /// browser or crypto-send steps on inputs.
    pub fn next_user_action(&self) -> Option<&OrderAction> {
        let output_action = self
            .outputs
            .iter()
            .flat_map(|output| output.actions.iter())
            .find(|action| action.action_type == ActionType::Browser);

        output_action.or_else(|| {
            self.inputs
                .iter()
                .flat_map(|input| input.actions.iter())
                .find(|action| {
                    matches!(
                        action.action_type,
                        ActionType::Browser | ActionType::CryptoSend
                    )
                })
        })
    }

    /// Currency the app receives into, taken from the first output.
    pub fn receive_currency(&self) -> Option<&ExchangeCurrency> {
        self.outputs.first().map(|output| &output.currency)
    }

    /// Currency refunds are returned in, taken from the first input.
    pub fn refund_currency(&self) -> Option<&ExchangeCurrency> {
        self.inputs.first().map(|input| &input.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r#"{
        "url": "https://api.example.com/exchange/orders/ord_1",
        "order_id": "ord_1",
        "status": "initializing",
        "country_code": "US",
        "region_code": "NY",
        "provider": { "name": "Wyre", "slug": "wyre" },
        "created_at": "2021-03-02T10:00:00Z",
        "inputs": [{
            "type": "card_payment",
            "media": "card",
            "amount": "100",
            "currency": { "code": "usd", "name": "US Dollar", "currency_id": "usd", "type": "fiat", "decimals": 2 },
            "actions": [{ "type": "browser", "url": "https://pay.example.com", "title": "Pay", "message": "" }]
        }],
        "outputs": [{
            "type": "crypto_transfer",
            "media": "crypto",
            "amount": "0.002",
            "currency": { "code": "btc", "name": "Bitcoin", "currency_id": "bitcoin-mainnet:__native__", "type": "crypto", "decimals": 8 },
            "crypto_transfer_status": "waiting_for_address",
            "actions": [{ "type": "crypto_receive_address", "url": "https://api.example.com/exchange/orders/ord_1/address" }]
        }]
    }"#;

    #[test]
    fn test_order_decodes_tagged_inputs_and_outputs() {
        let order: ExchangeOrder = serde_json::from_str(ORDER_JSON).unwrap();

        assert_eq!(order.order_id, "ord_1");
        assert_eq!(order.inputs[0].transfer, InputTransfer::CardPayment);
        assert!(order.outputs[0].is_waiting_for_address());
        assert_eq!(order.receive_currency().unwrap().code, "btc");
    }

    #[test]
    fn test_pending_address_actions_only_from_waiting_transfers() {
        let order: ExchangeOrder = serde_json::from_str(ORDER_JSON).unwrap();
        let actions = order.pending_address_actions();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].action_type, ActionType::CryptoReceiveAddress);
    }

    #[test]
    fn test_next_user_action_falls_back_to_inputs() {
        let order: ExchangeOrder = serde_json::from_str(ORDER_JSON).unwrap();
        let action = order.next_user_action().unwrap();

        assert_eq!(action.action_type, ActionType::Browser);
        assert_eq!(action.url, "https://pay.example.com");
    }
}
