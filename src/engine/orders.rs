//! Liquidity order placement and cancellation.

use super::core::Engine;
use super::results::{EngineError, PlaceOrderResult};
use crate::events::{CancelReason, EventPayload, OrderCancelledEvent, OrderPlacedEvent};
use crate::ledger::{RecordId, TraderLedger};
use crate::order::{Order, OrderId, OrderKind, OrderStatus};
use crate::orderbook::OrderBook;
use crate::types::{AssetType, Quote, Timestamp, TraderId, WidthPct};
use rust_decimal::Decimal;

impl Engine {
    /// Validate a requested width against the orderbook's range.
    pub(super) fn validate_width(book: &OrderBook, width: Decimal) -> Result<WidthPct, EngineError> {
        WidthPct::new(width)
            .filter(|w| book.width_allowed(*w))
            .ok_or(EngineError::InvalidWidthPercentage {
                width,
                min: book.min_width_pct,
                max: book.max_width_pct,
            })
    }

    /// Place a liquidity order. Locks `amount` from the trader's free funds.
    pub fn place_order(
        &mut self,
        trader: TraderId,
        asset: AssetType,
        kind: OrderKind,
        width: Decimal,
        amount: Quote,
        expiration: Option<Timestamp>,
    ) -> Result<PlaceOrderResult, EngineError> {
        let book = self.book(asset)?;
        let width_percentage = Self::validate_width(book, width)?;

        let mut ledger = self.staged_ledger(trader)?;
        if !amount.is_positive() {
            return Err(EngineError::InsufficientFunds {
                requested: amount,
                available: ledger.free_funds,
            });
        }
        ledger.lock(amount)?;

        let base_price = book
            .base_price
            .ok_or_else(|| EngineError::InvalidOracleFeed(format!("no base price set for {asset}")))?;

        let mut staged_book = book.clone();
        let sequence_number = staged_book.next_sequence().ok_or(EngineError::MathOverflow)?;
        let order_id = OrderId::new(width_percentage, self.current_time, sequence_number);

        if let Some(existing) = self.order(asset, &order_id) {
            return Err(EngineError::OrderNotActive {
                id: order_id,
                status: existing.status,
            });
        }

        let mut order = Order {
            id: order_id,
            kind,
            asset_type: asset,
            width_percentage,
            amount,
            trader,
            base_price_snapshot: base_price,
            timestamp: self.current_time,
            status: OrderStatus::Pending,
            expiration,
        };
        order.transition(OrderStatus::Active);
        ledger.add_record(RecordId::Order(asset, order_id));

        // commit
        self.orderbooks.insert(asset, staged_book);
        self.orders.entry(asset).or_default().insert(order);
        self.ledgers.insert(trader, ledger);

        self.emit_event(EventPayload::OrderPlaced(OrderPlacedEvent {
            asset,
            order_id,
            trader,
            kind,
            width: width_percentage,
            amount,
            base_price,
            expiration,
        }));

        Ok(PlaceOrderResult {
            order_id,
            locked: amount,
            base_price,
        })
    }

    /// Cancel an open order and return its locked funds to the owner.
    pub fn cancel_order(
        &mut self,
        trader: TraderId,
        asset: AssetType,
        order_id: OrderId,
    ) -> Result<Quote, EngineError> {
        self.book(asset)?;
        let order = self
            .order(asset, &order_id)
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if order.trader != trader {
            return Err(EngineError::NotAuthorized { caller: trader });
        }

        let (order, ledger, refunded) = self.stage_cancel(order)?;
        self.ledgers.insert(trader, ledger);
        self.record_cancel(asset, order, refunded, CancelReason::UserRequested);
        Ok(refunded)
    }

    /// Closed copy of `order` plus its owner's refunded ledger. Nothing is written.
    pub(super) fn stage_cancel(&self, order: &Order) -> Result<(Order, TraderLedger, Quote), EngineError> {
        let ledger = self.staged_ledger(order.trader)?;
        Self::stage_cancel_onto(order, ledger)
    }

    pub(super) fn stage_cancel_onto(
        order: &Order,
        mut ledger: TraderLedger,
    ) -> Result<(Order, TraderLedger, Quote), EngineError> {
        let mut closed = order.clone();
        if !closed.transition(OrderStatus::Cancelled) {
            return Err(EngineError::OrderNotActive {
                id: order.id,
                status: order.status,
            });
        }

        let refunded = ledger.unlock(order.amount)?;
        ledger.remove_record(&RecordId::Order(order.asset_type, order.id));
        Ok((closed, ledger, refunded))
    }

    /// Write a closed order back to its store and log it. The owner's ledger
    /// must already be committed.
    pub(super) fn record_cancel(&mut self, asset: AssetType, order: Order, refunded: Quote, reason: CancelReason) {
        let order_id = order.id;
        let trader = order.trader;
        if let Some(store) = self.orders.get_mut(&asset) {
            store.update(order);
        }

        self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent {
            asset,
            order_id,
            trader,
            refunded,
            reason,
        }));
    }
}
