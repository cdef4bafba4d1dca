// 4.0: positions. a taker's bet created by matching a liquidity order.
// band is fixed at match time from the order's snapshot; escrow = taker stake + funder stake.
// 4.1 has the settle/claim transitions and the payout split at the bottom.

use crate::order::{OrderId, OrderKind};
use crate::types::{AssetType, PayoutPct, Price, Quote, Timestamp, TraderId, WidthPct};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positions are keyed by the sequence of the liquidity order that funded them.
/// An order is consumed at most once, so the key can never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId {
    pub asset: AssetType,
    pub sequence: u64,
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "position#{}-{}", self.asset, self.sequence)
    }
}

/// Closed price interval `[lower, upper]` with `lower < upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBand {
    pub lower: Price,
    pub upper: Price,
}

impl PriceBand {
    /// `base·(1-w)` to `base·(1+w)`. `None` on overflow.
    pub fn around(base: Price, width: WidthPct) -> Option<Self> {
        let offset = base.value().checked_mul(width.as_fraction())?;
        let lower = Price::new(base.value().checked_sub(offset)?)?;
        let upper = Price::new(base.value().checked_add(offset)?)?;
        (lower < upper).then_some(Self { lower, upper })
    }

    pub fn contains(&self, price: Price) -> bool {
        price >= self.lower && price <= self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Active,
    Settled,
    Claimed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub payout_percentage: PayoutPct,
    pub settlement_price: Price,
    pub settled_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub trader: TraderId,
    pub kind: OrderKind,
    pub lower_bound: Price,
    pub upper_bound: Price,
    pub source_order_id: OrderId,
    /// Counterparty that funded the position. Not an owner.
    pub funder: TraderId,
    /// Taker stake.
    pub amount: Quote,
    pub funder_stake: Quote,
    pub opened_at: Timestamp,
    pub expiration: Timestamp,
    pub status: PositionStatus,
    pub settlement: Option<Settlement>,
}

impl Position {
    pub fn band(&self) -> PriceBand {
        PriceBand {
            lower: self.lower_bound,
            upper: self.upper_bound,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == PositionStatus::Active
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expiration
    }

    pub fn escrow(&self) -> Option<Quote> {
        self.amount.checked_add(self.funder_stake)
    }

    // 4.1: Active -> Settled. false if already settled or claimed.
    pub fn settle(&mut self, payout_percentage: PayoutPct, price: Price, at: Timestamp) -> bool {
        if self.status != PositionStatus::Active {
            return false;
        }
        self.status = PositionStatus::Settled;
        self.settlement = Some(Settlement {
            payout_percentage,
            settlement_price: price,
            settled_at: at,
        });
        true
    }

    // Settled -> Claimed. terminal.
    pub fn claim(&mut self) -> bool {
        if self.status != PositionStatus::Settled {
            return false;
        }
        self.status = PositionStatus::Claimed;
        true
    }

    /// How a settled escrow splits: (holder payout, funder remainder).
    pub fn payout_split(&self) -> Option<PayoutSplit> {
        let settlement = self.settlement?;
        split_escrow(self.escrow()?, settlement.payout_percentage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
    pub to_trader: Quote,
    pub to_funder: Quote,
}

// 4.2: escrow·pct/100 to the holder, the exact remainder to the funder.
pub fn split_escrow(escrow: Quote, pct: PayoutPct) -> Option<PayoutSplit> {
    let to_trader = Quote::new(
        escrow
            .value()
            .checked_mul(Decimal::from(pct.value()))?
            .checked_div(Decimal::ONE_HUNDRED)?,
    );
    let to_funder = escrow.checked_sub(to_trader)?;
    Some(PayoutSplit { to_trader, to_funder })
}
