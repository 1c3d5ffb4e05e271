//! Currencies, countries, regions and trading pairs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Currency
// =============================================================================

/// Whether a currency is a national currency or a crypto asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyType {
    /// National currency (usd, eur, ...)
    Fiat,
    /// Crypto asset (btc, eth, ...)
    Crypto,
}

/// A currency the exchange service can quote.
///
/// Codes are lower-case (`"usd"`, `"btc"`). `currency_id` is the wallet
/// identifier (`"bitcoin-mainnet:__native__"`) and is only meaningful for
/// crypto assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeCurrency {
    /// Lower-case currency code
    pub code: String,
    /// Display name
    pub name: String,
    /// Wallet currency identifier
    pub currency_id: String,
    /// Fiat or crypto
    #[serde(rename = "type")]
    pub currency_type: CurrencyType,
    /// Maximum fraction digits accepted for amounts in this currency
    pub decimals: u32,
}

impl ExchangeCurrency {
    /// Create a fiat currency.
    pub fn fiat(code: impl Into<String>, name: impl Into<String>, decimals: u32) -> Self {
        let code = code.into();
        Self {
            currency_id: code.clone(),
            code,
            name: name.into(),
            currency_type: CurrencyType::Fiat,
            decimals,
        }
    }

    /// Create a crypto currency.
    pub fn crypto(
        code: impl Into<String>,
        name: impl Into<String>,
        currency_id: impl Into<String>,
        decimals: u32,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            currency_id: currency_id.into(),
            currency_type: CurrencyType::Crypto,
            decimals,
        }
    }

    /// Is this a national currency.
    pub fn is_fiat(&self) -> bool {
        self.currency_type == CurrencyType::Fiat
    }

    /// Is this a crypto asset.
    pub fn is_crypto(&self) -> bool {
        self.currency_type == CurrencyType::Crypto
    }

    /// Network part of the currency id (`"bitcoin-mainnet"` for
    /// `"bitcoin-mainnet:__native__"`).
    pub fn network_id(&self) -> &str {
        network_of(&self.currency_id)
    }

    /// Copy of this currency with its id pointed at the matching test network.
    pub fn for_test_network(&self) -> Self {
        let currency_id = self
            .currency_id
            .replace("ethereum-mainnet", "ethereum-ropsten")
            .replace("mainnet", "testnet");
        Self {
            currency_id,
            ..self.clone()
        }
    }
}

/// Network part of a wallet currency id.
pub fn network_of(currency_id: &str) -> &str {
    currency_id.split(':').next().unwrap_or(currency_id)
}

// =============================================================================
// Country / Region
// =============================================================================

/// A sub-national region (US state, Canadian province).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeRegion {
    /// Region code ("NY")
    pub code: String,
    /// Display name
    pub name: String,
}

/// A country supported by the exchange service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCountry {
    /// ISO country code ("US")
    pub code: String,
    /// Display name
    pub name: String,
    /// Local fiat currency
    pub currency: ExchangeCurrency,
    /// Regions, empty when the country is not subdivided
    #[serde(default)]
    pub regions: Vec<ExchangeRegion>,
}

impl ExchangeCountry {
    /// Whether a region must be chosen before offers can be requested.
    pub fn requires_region(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Find one of this country's regions by code.
    pub fn region(&self, code: &str) -> Option<&ExchangeRegion> {
        self.regions.iter().find(|region| region.code == code)
    }
}

// =============================================================================
// Pair
// =============================================================================

/// A tradable direction between two currencies.
///
/// `rate` is always the fiat price of the crypto side for fiat pairs and the
/// price of one `to_code` unit in `from_code` units for crypto/crypto pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangePair {
    /// Source currency code
    pub from_code: String,
    /// Quote currency code
    pub to_code: String,
    /// Conversion rate
    pub rate: Decimal,
}

impl ExchangePair {
    /// Create a pair.
    pub fn new(from_code: impl Into<String>, to_code: impl Into<String>, rate: Decimal) -> Self {
        Self {
            from_code: from_code.into(),
            to_code: to_code.into(),
            rate,
        }
    }

    /// Amount received for `input` (input / rate). Zero when the rate is zero.
    pub fn estimated_output(&self, input: Decimal) -> Decimal {
        if self.rate.is_zero() {
            return Decimal::ZERO;
        }
        input / self.rate
    }

    /// Input needed to receive `output` (output * rate).
    pub fn input_from_output(&self, output: Decimal) -> Decimal {
        output * self.rate
    }

    /// Whether this pair goes `from` -> `to`.
    pub fn connects(&self, from: &str, to: &str) -> bool {
        self.from_code == from && self.to_code == to
    }
}

// =============================================================================
// Native network info
// =============================================================================

/// Network fee information for a crypto asset's native fee currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeNetworkInfo {
    /// Code of the asset being sent
    pub currency_code: String,
    /// Wallet id of the asset being sent
    pub currency_id: String,
    /// Code of the asset fees are paid in ("eth" for ERC-20 tokens)
    pub network_currency_code: String,
    /// Estimated fee in the network currency
    pub fee_amount: Decimal,
}

impl NativeNetworkInfo {
    /// Whether the sent asset pays its own fees.
    pub fn is_native(&self) -> bool {
        self.currency_code == self.network_currency_code
    }
}
