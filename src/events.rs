// 11.0: every state change produces an event for the audit trail.
// the EventPayload enum lists all event types.

use crate::order::{OrderId, OrderKind};
use crate::position::PositionId;
use crate::types::{AssetType, PayoutPct, Price, Quote, Timestamp, TraderId, WidthPct};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Registry events
    OrderBookRegistered(OrderBookRegisteredEvent),
    BasePriceUpdated(BasePriceUpdatedEvent),

    // Ledger events
    TraderRegistered(TraderRegisteredEvent),
    Deposit(DepositEvent),
    Withdrawal(WithdrawalEvent),
    WithdrawalRejected(WithdrawalRejectedEvent),

    // Order events
    OrderPlaced(OrderPlacedEvent),
    OrderCancelled(OrderCancelledEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionSettled(PositionSettledEvent),
    PositionClaimed(PositionClaimedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookRegisteredEvent {
    pub asset: AssetType,
    pub authority: TraderId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasePriceUpdatedEvent {
    pub asset: AssetType,
    pub old_price: Option<Price>,
    pub new_price: Price,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderRegisteredEvent {
    pub trader: TraderId,
    pub initial_funds: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositEvent {
    pub trader: TraderId,
    pub amount: Quote,
    pub new_free_funds: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalEvent {
    pub trader: TraderId,
    pub amount: Quote,
    pub new_free_funds: Quote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRejectedEvent {
    pub trader: TraderId,
    pub amount: Quote,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub asset: AssetType,
    pub order_id: OrderId,
    pub trader: TraderId,
    pub kind: OrderKind,
    pub width: WidthPct,
    pub amount: Quote,
    pub base_price: Price,
    pub expiration: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub asset: AssetType,
    pub order_id: OrderId,
    pub trader: TraderId,
    pub refunded: Quote,
    pub reason: CancelReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    UserRequested,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub position_id: PositionId,
    pub trader: TraderId,
    pub funder: TraderId,
    pub kind: OrderKind,
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub amount: Quote,
    pub funder_stake: Quote,
    /// Part of the liquidity order returned to the funder at match time.
    pub funder_refund: Quote,
    pub expiration: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSettledEvent {
    pub position_id: PositionId,
    pub trader: TraderId,
    pub settlement_price: Price,
    pub payout_percentage: PayoutPct,
    pub reason: SettleReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettleReason {
    PriceCheck,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionClaimedEvent {
    pub position_id: PositionId,
    pub trader: TraderId,
    pub funder: TraderId,
    pub payout: Quote,
    pub funder_remainder: Quote,
}
