//! Liquidity orders and the order store.
//!
//! A liquidity order is a maker's standing offer to take one side of a price-band
//! bet. Orders are keyed by a composite [`OrderId`] that sorts by width, then
//! creation time, then sequence number, so each kind's active set is always in
//! matching priority.

use crate::escrow::EscrowPolicy;
use crate::types::{AssetType, Price, Quote, Timestamp, TraderId, WidthPct};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which side of a price band a bet is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    /// Wins if price stays inside the band until expiration.
    StayIn,
    /// Wins if price leaves the band before expiration.
    Breakout,
}

impl OrderKind {
    /// The kind of liquidity order a taker of this kind must match against.
    pub fn complement(&self) -> Self {
        match self {
            OrderKind::StayIn => OrderKind::Breakout,
            OrderKind::Breakout => OrderKind::StayIn,
        }
    }

    /// Whether a taker of this kind asking for `requested` accepts a band of
    /// width `offered`. StayIn takers want at least their width, breakout takers
    /// at most theirs.
    pub fn accepts_width(&self, requested: WidthPct, offered: WidthPct) -> bool {
        match self {
            OrderKind::StayIn => offered >= requested,
            OrderKind::Breakout => offered <= requested,
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::StayIn => f.write_str("stay-in"),
            OrderKind::Breakout => f.write_str("breakout"),
        }
    }
}

/// Order lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Pending and Active orders still hold locked funds.
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Active)
    }

    pub fn can_move_to(&self, next: OrderStatus) -> bool {
        matches!(
            (*self, next),
            (OrderStatus::Pending, OrderStatus::Active)
                | (
                    OrderStatus::Pending | OrderStatus::Active,
                    OrderStatus::Completed | OrderStatus::Cancelled
                )
        )
    }
}

/// Composite order key. Unique per orderbook because the sequence number is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId {
    pub width_percentage_scaled: i64,
    pub timestamp: Timestamp,
    pub sequence_number: u64,
}

impl OrderId {
    pub fn new(width: WidthPct, timestamp: Timestamp, sequence_number: u64) -> Self {
        Self {
            width_percentage_scaled: width.scaled(),
            timestamp,
            sequence_number,
        }
    }
}

impl Ord for OrderId {
    fn cmp(&self, other: &Self) -> Ordering {
        // width first, FIFO within equal width, sequence breaks timestamp ties
        self.width_percentage_scaled
            .cmp(&other.width_percentage_scaled)
            .then(self.timestamp.cmp(&other.timestamp))
            .then(self.sequence_number.cmp(&other.sequence_number))
    }
}

impl PartialOrd for OrderId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "order#{}(w={},t={})",
            self.sequence_number, self.width_percentage_scaled, self.timestamp.0
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub kind: OrderKind,
    pub asset_type: AssetType,
    pub width_percentage: WidthPct,
    pub amount: Quote,
    pub trader: TraderId,
    pub base_price_snapshot: Price,
    pub timestamp: Timestamp,
    pub status: OrderStatus,
    pub expiration: Option<Timestamp>,
}

impl Order {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expiration.map_or(false, |exp| now >= exp)
    }

    /// Move to `next`. Returns false and leaves the order untouched when the
    /// move would go backwards or leave a terminal state.
    pub fn transition(&mut self, next: OrderStatus) -> bool {
        let allowed = self.status.can_move_to(next);
        if allowed {
            self.status = next;
        }
        allowed
    }
}

/// All orders of one orderbook. Closed orders stay in `records` for history;
/// only open ones appear in the per-kind priority sets.
#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    records: BTreeMap<OrderId, Order>,
    stay_in: BTreeSet<OrderId>,
    breakout: BTreeSet<OrderId>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn active_set(&self, kind: OrderKind) -> &BTreeSet<OrderId> {
        match kind {
            OrderKind::StayIn => &self.stay_in,
            OrderKind::Breakout => &self.breakout,
        }
    }

    fn active_set_mut(&mut self, kind: OrderKind) -> &mut BTreeSet<OrderId> {
        match kind {
            OrderKind::StayIn => &mut self.stay_in,
            OrderKind::Breakout => &mut self.breakout,
        }
    }

    /// Insert a freshly created order. Returns false without writing if the id
    /// is already taken.
    pub fn insert(&mut self, order: Order) -> bool {
        if self.records.contains_key(&order.id) {
            return false;
        }
        if order.is_open() {
            self.active_set_mut(order.kind).insert(order.id);
        }
        self.records.insert(order.id, order);
        true
    }

    pub fn get(&self, id: &OrderId) -> Option<&Order> {
        self.records.get(id)
    }

    /// Replace a stored order with an updated copy, keeping the active sets in sync.
    pub fn update(&mut self, order: Order) {
        let id = order.id;
        let kind = order.kind;
        if order.is_open() {
            self.active_set_mut(kind).insert(id);
        } else {
            self.active_set_mut(kind).remove(&id);
        }
        self.records.insert(id, order);
    }

    /// Open orders of one kind in priority order.
    pub fn active(&self, kind: OrderKind) -> impl Iterator<Item = &Order> {
        self.active_set(kind)
            .iter()
            .filter_map(move |id| self.records.get(id))
    }

    pub fn active_count(&self, kind: OrderKind) -> usize {
        self.active_set(kind).len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.records.values()
    }

    /// Best open liquidity order for `taker` of `taker_kind` asking for
    /// `width` and `amount`. StayIn takers get the widest acceptable band,
    /// breakout takers the narrowest; ties go to the oldest order. The taker's
    /// own orders are never candidates, nor are orders too small to cover the
    /// funder stake `policy` asks for.
    pub fn best_for(
        &self,
        taker: TraderId,
        taker_kind: OrderKind,
        width: WidthPct,
        amount: Quote,
        policy: &EscrowPolicy,
    ) -> Option<&Order> {
        let candidates = self
            .active(taker_kind.complement())
            .filter(|o| o.trader != taker)
            .filter(|o| taker_kind.accepts_width(width, o.width_percentage))
            .filter(|o| o.amount >= amount)
            .filter(|o| policy.funder_stake(amount, o.amount).is_some());

        match taker_kind {
            OrderKind::StayIn => candidates.min_by(|a, b| {
                b.id.width_percentage_scaled
                    .cmp(&a.id.width_percentage_scaled)
                    .then(a.id.timestamp.cmp(&b.id.timestamp))
                    .then(a.id.sequence_number.cmp(&b.id.sequence_number))
            }),
            OrderKind::Breakout => candidates.min_by(|a, b| a.id.cmp(&b.id)),
        }
    }
}
