// 7.0 config.rs: all settings in one place. orderbook width ranges, escrow policy,
// payout curve, position lifetime, price freshness.
// 7.1 Environment presets at the bottom.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::escrow::EscrowPolicy;
use crate::orderbook::OrderBookParams;
use crate::payout::PayoutCurveKind;
use crate::price_feed::PriceBoard;
use crate::types::AssetType;

// Complete configuration for a bound market deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    // Orderbooks to open at startup
    pub assets: Vec<AssetType>,
    // Width range applied to every orderbook
    pub orderbook: OrderBookParams,
    // Engine behaviour (escrow, payout curve, lifetimes)
    pub engine: EngineConfig,
    // How long a published price may be used for settlement
    pub price_ttl_ms: i64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            assets: AssetType::ALL.to_vec(),
            orderbook: OrderBookParams::default(),
            engine: EngineConfig::default(),
            price_ttl_ms: 60_000, // 1 minute
        }
    }
}

impl MarketSettings {
    // Create a configuration preset for testnet: wide bands, fast expiry
    pub fn testnet() -> Self {
        let mut settings = Self::default();
        settings.orderbook.min_width_pct = dec!(0.1);
        settings.orderbook.max_width_pct = dec!(25);
        settings.engine.position_duration_ms = 60 * 60 * 1000; // 1 hour
        settings.engine.verbose = true;
        settings
    }

    // Create a configuration preset for mainnet with conservative settings
    pub fn mainnet_conservative() -> Self {
        let mut settings = Self::default();
        settings.assets = vec![AssetType::Btc, AssetType::Eth];
        settings.orderbook.min_width_pct = dec!(1);
        settings.orderbook.max_width_pct = dec!(10);
        settings.engine.payout_curve = PayoutCurveKind::TimeWeighted;
        settings.price_ttl_ms = 15_000;
        settings
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets.is_empty() {
            return Err(ConfigError::InvalidMarket {
                reason: "At least one asset is required".to_string(),
            });
        }

        if !self.orderbook.is_valid() {
            return Err(ConfigError::InvalidWidthRange {
                min: self.orderbook.min_width_pct,
                max: self.orderbook.max_width_pct,
            });
        }

        if self.price_ttl_ms <= 0 {
            return Err(ConfigError::InvalidPriceFeed {
                reason: "Price TTL must be positive".to_string(),
            });
        }

        self.engine.validate()
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let settings: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    // Price board honouring the configured freshness window
    pub fn price_board(&self) -> PriceBoard {
        PriceBoard::new().with_max_ttl(self.price_ttl_ms)
    }

    // Funder stake for the configured policy, as a ratio of the taker stake when fixed
    pub fn escrow_ratio(&self) -> Option<Decimal> {
        match self.engine.escrow_policy {
            EscrowPolicy::Symmetric => Some(Decimal::ONE),
            EscrowPolicy::Ratio(r) => Some(r),
            EscrowPolicy::FullOrder => None,
        }
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid width range [{min}, {max}]")]
    InvalidWidthRange { min: Decimal, max: Decimal },

    #[error("Invalid market: {reason}")]
    InvalidMarket { reason: String },

    #[error("Invalid engine settings: {reason}")]
    InvalidEngine { reason: String },

    #[error("Invalid price feed: {reason}")]
    InvalidPriceFeed { reason: String },

    #[error("Could not parse settings: {0}")]
    Parse(String),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn settings(&self) -> MarketSettings {
        match self {
            Environment::Development => MarketSettings::default(),
            Environment::Testnet => MarketSettings::testnet(),
            Environment::Mainnet => MarketSettings::mainnet_conservative(),
        }
    }
}
