// 8.0.2: result types and errors for engine operations.

use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::order::{OrderId, OrderKind, OrderStatus};
use crate::position::{PositionId, PositionStatus};
use crate::price_feed::PriceFeedError;
use crate::types::{AssetType, PayoutPct, Price, Quote, TraderId};
use crate::vault::VaultError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct PlaceOrderResult {
    pub order_id: OrderId,
    pub locked: Quote,
    pub base_price: Price,
}

#[derive(Debug, Clone)]
pub struct MatchResult {
    pub position_id: PositionId,
    pub source_order_id: OrderId,
    pub funder: TraderId,
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub taker_stake: Quote,
    pub funder_stake: Quote,
    pub funder_refund: Quote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    StillActive,
    Settled {
        payout_percentage: PayoutPct,
        settlement_price: Price,
    },
}

#[derive(Debug, Clone)]
pub struct ClaimResult {
    pub position_id: PositionId,
    pub payout: Quote,
    pub funder_remainder: Quote,
}

#[derive(Debug, Clone, Default)]
pub struct SweepResult {
    pub cancelled_orders: Vec<OrderId>,
    pub settled_positions: Vec<PositionId>,
    pub skipped: usize,
    pub refunded: Quote,
}

/// Flat caller-facing code, one per rejection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidAssetType,
    InvalidWidthPercentage,
    TraderNotRegistered,
    InsufficientFunds,
    NoMatchingOrders,
    NotAuthorized,
    OrderNotFound,
    OrderNotActive,
    InvalidOracleFeed,
    InvalidOrderType,
    TraderAlreadyRegistered,
    MathOverflow,
    InvalidConfig,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid asset type {0}")]
    InvalidAssetType(u8),

    #[error("Orderbook for {0} is already registered")]
    OrderBookExists(AssetType),

    #[error("No orderbook registered for {0}")]
    OrderBookNotFound(AssetType),

    #[error("Width {width}% outside allowed range [{min}%, {max}%]")]
    InvalidWidthPercentage {
        width: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Trader {0} not registered")]
    TraderNotRegistered(TraderId),

    #[error("Trader {0} is already registered")]
    TraderAlreadyRegistered(TraderId),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Quote, available: Quote },

    #[error("No matching {kind} liquidity for amount {amount}")]
    NoMatchingOrders { kind: OrderKind, amount: Quote },

    #[error("{caller} is not authorized for this operation")]
    NotAuthorized { caller: TraderId },

    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error("Position {0} not found")]
    PositionNotFound(PositionId),

    #[error("Order {id} is not active (status {status:?})")]
    OrderNotActive { id: OrderId, status: OrderStatus },

    #[error("Position {id} is not in the required state (status {status:?})")]
    PositionNotActive { id: PositionId, status: PositionStatus },

    #[error("Invalid oracle feed: {0}")]
    InvalidOracleFeed(String),

    #[error("Liquidity order is {found}, expected {expected}")]
    InvalidOrderType { expected: OrderKind, found: OrderKind },

    #[error("Arithmetic overflow")]
    MathOverflow,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::InvalidAssetType(_)
            | EngineError::OrderBookExists(_)
            | EngineError::OrderBookNotFound(_) => ErrorCode::InvalidAssetType,
            EngineError::InvalidWidthPercentage { .. } => ErrorCode::InvalidWidthPercentage,
            EngineError::TraderNotRegistered(_) => ErrorCode::TraderNotRegistered,
            EngineError::TraderAlreadyRegistered(_) => ErrorCode::TraderAlreadyRegistered,
            EngineError::InsufficientFunds { .. } => ErrorCode::InsufficientFunds,
            EngineError::NoMatchingOrders { .. } => ErrorCode::NoMatchingOrders,
            EngineError::NotAuthorized { .. } => ErrorCode::NotAuthorized,
            EngineError::OrderNotFound(_) | EngineError::PositionNotFound(_) => {
                ErrorCode::OrderNotFound
            }
            EngineError::OrderNotActive { .. } | EngineError::PositionNotActive { .. } => {
                ErrorCode::OrderNotActive
            }
            EngineError::InvalidOracleFeed(_) => ErrorCode::InvalidOracleFeed,
            EngineError::InvalidOrderType { .. } => ErrorCode::InvalidOrderType,
            EngineError::MathOverflow => ErrorCode::MathOverflow,
            EngineError::InvalidConfig(_) => ErrorCode::InvalidConfig,
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { requested, available } => {
                EngineError::InsufficientFunds { requested, available }
            }
            LedgerError::InsufficientLocked { requested, locked } => EngineError::InsufficientFunds {
                requested,
                available: locked,
            },
            LedgerError::NegativeAmount(amount) => EngineError::InsufficientFunds {
                requested: amount,
                available: Quote::zero(),
            },
            LedgerError::Overflow => EngineError::MathOverflow,
        }
    }
}

impl From<VaultError> for EngineError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::InsufficientCustody { requested, available, .. } => {
                EngineError::InsufficientFunds { requested, available }
            }
            VaultError::InvalidAmount(amount) => EngineError::InsufficientFunds {
                requested: amount,
                available: Quote::zero(),
            },
            VaultError::Overflow => EngineError::MathOverflow,
        }
    }
}

impl From<PriceFeedError> for EngineError {
    fn from(err: PriceFeedError) -> Self {
        EngineError::InvalidOracleFeed(err.to_string())
    }
}
