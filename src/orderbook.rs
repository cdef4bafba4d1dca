//! OrderBook registry record.
//!
//! One record per asset. Holds the authority-configured reference price that new
//! orders snapshot, the allowed width range, and the sequence counter that makes
//! every [`OrderId`](crate::order::OrderId) unique.

use crate::types::{AssetType, Price, Timestamp, TraderId, WidthPct};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Width range an orderbook accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBookParams {
    pub min_width_pct: Decimal,
    pub max_width_pct: Decimal,
}

impl Default for OrderBookParams {
    fn default() -> Self {
        Self {
            min_width_pct: dec!(0.5),
            max_width_pct: dec!(10),
        }
    }
}

impl OrderBookParams {
    pub fn is_valid(&self) -> bool {
        self.min_width_pct > Decimal::ZERO
            && self.min_width_pct <= self.max_width_pct
            && self.max_width_pct < dec!(100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBook {
    pub asset_type: AssetType,
    /// Unset until the authority publishes a first price.
    pub base_price: Option<Price>,
    pub next_sequence_number: u64,
    pub min_width_pct: Decimal,
    pub max_width_pct: Decimal,
    pub authority: TraderId,
    /// Most recent settlement-grade observation, used by the sweeper.
    pub last_price: Option<(Price, Timestamp)>,
}

impl OrderBook {
    pub fn new(asset_type: AssetType, authority: TraderId, params: OrderBookParams) -> Self {
        Self {
            asset_type,
            base_price: None,
            next_sequence_number: 1,
            min_width_pct: params.min_width_pct,
            max_width_pct: params.max_width_pct,
            authority,
            last_price: None,
        }
    }

    pub fn is_authority(&self, caller: TraderId) -> bool {
        self.authority == caller
    }

    pub fn width_allowed(&self, width: WidthPct) -> bool {
        width.value() >= self.min_width_pct && width.value() <= self.max_width_pct
    }

    /// Peek the sequence number the next created order will consume.
    pub fn peek_sequence(&self) -> u64 {
        self.next_sequence_number
    }

    /// Return the current sequence number and advance the counter. `None` once
    /// the counter is exhausted; numbers are never reused.
    pub fn next_sequence(&mut self) -> Option<u64> {
        let seq = self.next_sequence_number;
        self.next_sequence_number = seq.checked_add(1)?;
        Some(seq)
    }

    pub fn update_base_price(&mut self, price: Price) {
        self.base_price = Some(price);
    }

    /// Keep the newest observation only; older reports never roll it back.
    pub fn observe_price(&mut self, price: Price, at: Timestamp) {
        match self.last_price {
            Some((_, seen)) if seen > at => {}
            _ => self.last_price = Some((price, at)),
        }
    }
}
