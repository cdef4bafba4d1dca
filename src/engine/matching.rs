//! Matching a taker against a liquidity order.

use super::core::Engine;
use super::results::{EngineError, MatchResult};
use crate::events::{EventPayload, PositionOpenedEvent};
use crate::ledger::RecordId;
use crate::order::{OrderId, OrderKind, OrderStatus};
use crate::position::{Position, PositionId, PositionStatus, PriceBand};
use crate::types::{AssetType, Quote, TraderId};
use rust_decimal::Decimal;

impl Engine {
    /// Open a position for `taker` against one specific liquidity order.
    ///
    /// The order must be Active and of the complementary kind, its band must
    /// satisfy the taker's width, and it must cover `amount`. The order is
    /// consumed whole: the funder's stake stays locked behind the position and
    /// whatever the escrow policy does not stake is unlocked back to the funder.
    pub fn match_position(
        &mut self,
        taker: TraderId,
        asset: AssetType,
        kind: OrderKind,
        width: Decimal,
        amount: Quote,
        liquidity_order_id: OrderId,
    ) -> Result<MatchResult, EngineError> {
        let book = self.book(asset)?;
        let requested_width = Self::validate_width(book, width)?;

        let mut taker_ledger = self.staged_ledger(taker)?;

        let order = self
            .order(asset, &liquidity_order_id)
            .ok_or(EngineError::OrderNotFound(liquidity_order_id))?;
        if order.status != OrderStatus::Active {
            return Err(EngineError::OrderNotActive {
                id: order.id,
                status: order.status,
            });
        }
        if order.kind != kind.complement() {
            return Err(EngineError::InvalidOrderType {
                expected: kind.complement(),
                found: order.kind,
            });
        }
        if order.trader == taker {
            return Err(EngineError::NotAuthorized { caller: taker });
        }

        let no_match = || EngineError::NoMatchingOrders { kind, amount };
        if !kind.accepts_width(requested_width, order.width_percentage) {
            return Err(no_match());
        }
        if !amount.is_positive() || amount > order.amount {
            return Err(no_match());
        }

        let funder_stake = self
            .config
            .escrow_policy
            .funder_stake(amount, order.amount)
            .ok_or_else(no_match)?;
        let funder_refund = order
            .amount
            .checked_sub(funder_stake)
            .ok_or(EngineError::MathOverflow)?;

        let band = PriceBand::around(order.base_price_snapshot, order.width_percentage)
            .ok_or(EngineError::MathOverflow)?;
        let expiration = self
            .current_time
            .checked_add_millis(self.config.position_duration_ms)
            .ok_or(EngineError::MathOverflow)?;

        let position_id = PositionId {
            asset,
            sequence: order.id.sequence_number,
        };
        if let Some(existing) = self.positions.get(&position_id) {
            return Err(EngineError::PositionNotActive {
                id: position_id,
                status: existing.status,
            });
        }

        // stage every record before writing any of them
        taker_ledger.lock(amount)?;
        taker_ledger.add_record(RecordId::Position(position_id));

        let funder = order.trader;
        let mut funder_ledger = self.staged_ledger(funder)?;
        funder_ledger.unlock(funder_refund)?;
        funder_ledger.remove_record(&RecordId::Order(asset, order.id));

        let mut consumed = order.clone();
        if !consumed.transition(OrderStatus::Completed) {
            return Err(EngineError::OrderNotActive {
                id: order.id,
                status: order.status,
            });
        }

        let position = Position {
            id: position_id,
            trader: taker,
            kind,
            lower_bound: band.lower,
            upper_bound: band.upper,
            source_order_id: consumed.id,
            funder,
            amount,
            funder_stake,
            opened_at: self.current_time,
            expiration,
            status: PositionStatus::Active,
            settlement: None,
        };

        // commit
        if let Some(store) = self.orders.get_mut(&asset) {
            store.update(consumed);
        }
        self.ledgers.insert(taker, taker_ledger);
        self.ledgers.insert(funder, funder_ledger);
        self.positions.insert(position_id, position);

        self.emit_event(EventPayload::PositionOpened(PositionOpenedEvent {
            position_id,
            trader: taker,
            funder,
            kind,
            lower_bound: band.lower,
            upper_bound: band.upper,
            amount,
            funder_stake,
            funder_refund,
            expiration,
        }));

        Ok(MatchResult {
            position_id,
            source_order_id: liquidity_order_id,
            funder,
            lower_bound: band.lower,
            upper_bound: band.upper,
            taker_stake: amount,
            funder_stake,
            funder_refund,
        })
    }

    /// Match against the best compatible liquidity order in the book.
    pub fn match_best(
        &mut self,
        taker: TraderId,
        asset: AssetType,
        kind: OrderKind,
        width: Decimal,
        amount: Quote,
    ) -> Result<MatchResult, EngineError> {
        let book = self.book(asset)?;
        let requested_width = Self::validate_width(book, width)?;
        if !self.ledgers.contains_key(&taker) {
            return Err(EngineError::TraderNotRegistered(taker));
        }

        let order_id = self
            .orders
            .get(&asset)
            .and_then(|store| store.best_for(taker, kind, requested_width, amount, &self.config.escrow_policy))
            .map(|order| order.id)
            .ok_or(EngineError::NoMatchingOrders { kind, amount })?;

        self.match_position(taker, asset, kind, width, amount, order_id)
    }
}
