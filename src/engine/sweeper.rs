//! Expiration sweep.
//!
//! The engine never schedules itself; an external keeper calls
//! [`Engine::sweep_expired`] with candidate ids. The whole batch is planned
//! against current state first and only written once every step has passed,
//! so re-running a sweep is harmless: anything already closed is skipped.

use super::core::Engine;
use super::results::{EngineError, SweepResult};
use crate::events::{CancelReason, SettleReason};
use crate::ledger::{RecordId, TraderLedger};
use crate::order::Order;
use crate::position::PositionId;
use crate::types::{AssetType, PayoutPct, Price, Quote, Timestamp, TraderId};
use std::collections::{HashMap, HashSet};
use tracing::info;

#[derive(Debug, Default)]
struct SweepPlan {
    ledgers: HashMap<TraderId, TraderLedger>,
    cancels: Vec<(Order, Quote)>,
    settlements: Vec<(PositionId, PayoutPct, Price)>,
    skipped: usize,
}

impl Engine {
    /// Cancel expired open orders and force-settle expired active positions of
    /// one orderbook. Authority only. Positions settle at the orderbook's last
    /// observed price; if one is due and no price was ever observed, the whole
    /// sweep fails.
    pub fn sweep_expired(
        &mut self,
        authority: TraderId,
        asset: AssetType,
        ids: &[RecordId],
        now: Timestamp,
    ) -> Result<SweepResult, EngineError> {
        let book = self.book(asset)?;
        if !book.is_authority(authority) {
            return Err(EngineError::NotAuthorized { caller: authority });
        }
        let last_price = book.last_price.map(|(price, _)| price);

        let mut plan = SweepPlan::default();
        let mut seen = HashSet::new();

        for id in ids {
            if !seen.insert(*id) {
                plan.skipped += 1;
                continue;
            }
            match id {
                RecordId::Order(order_asset, order_id) => {
                    let due = (*order_asset == asset)
                        .then(|| self.order(asset, order_id))
                        .flatten()
                        .filter(|o| o.is_open() && o.is_expired(now));
                    let Some(order) = due else {
                        plan.skipped += 1;
                        continue;
                    };

                    let ledger = match plan.ledgers.remove(&order.trader) {
                        Some(ledger) => ledger,
                        None => self.staged_ledger(order.trader)?,
                    };
                    let (closed, ledger, refunded) = Self::stage_cancel_onto(order, ledger)?;
                    plan.ledgers.insert(order.trader, ledger);
                    plan.cancels.push((closed, refunded));
                }
                RecordId::Position(position_id) => {
                    let due = self
                        .positions
                        .get(position_id)
                        .filter(|p| p.id.asset == asset && p.is_active() && p.is_expired(now));
                    let Some(position) = due else {
                        plan.skipped += 1;
                        continue;
                    };

                    let price = last_price.ok_or_else(|| {
                        EngineError::InvalidOracleFeed(format!("no observed price for {asset}"))
                    })?;
                    match self.evaluate_position(position, price, now) {
                        Some(pct) => plan.settlements.push((*position_id, pct, price)),
                        None => plan.skipped += 1,
                    }
                }
            }
        }

        self.apply_sweep(asset, plan, now)
    }

    fn apply_sweep(&mut self, asset: AssetType, plan: SweepPlan, now: Timestamp) -> Result<SweepResult, EngineError> {
        let mut result = SweepResult {
            skipped: plan.skipped,
            ..SweepResult::default()
        };
        result.refunded = plan
            .cancels
            .iter()
            .try_fold(Quote::zero(), |acc, (_, refunded)| acc.checked_add(*refunded))
            .ok_or(EngineError::MathOverflow)?;

        self.ledgers.extend(plan.ledgers);

        for (order, refunded) in plan.cancels {
            result.cancelled_orders.push(order.id);
            self.record_cancel(asset, order, refunded, CancelReason::Expired);
        }

        for (position_id, pct, price) in plan.settlements {
            self.apply_settlement(position_id, pct, price, now, SettleReason::Expired);
            result.settled_positions.push(position_id);
        }

        info!(
            %asset,
            cancelled = result.cancelled_orders.len(),
            settled = result.settled_positions.len(),
            skipped = result.skipped,
            "expiration sweep"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, ErrorCode};
    use crate::order::{OrderKind, OrderStatus};
    use crate::position::PositionStatus;
    use rust_decimal_macros::dec;

    const ADMIN: TraderId = TraderId(100);
    const ALICE: TraderId = TraderId(1);
    const BOB: TraderId = TraderId(2);
    const DAY: i64 = 86_400_000;

    fn setup() -> Engine {
        let mut engine = Engine::new(EngineConfig::default());
        engine.register_orderbook(ADMIN, 0).unwrap();
        engine
            .update_price(ADMIN, AssetType::Btc, Price::new_unchecked(dec!(50000)))
            .unwrap();
        engine.register_trader(ALICE, Quote::new(dec!(1000))).unwrap();
        engine.register_trader(BOB, Quote::new(dec!(1000))).unwrap();
        engine
    }

    fn expiring_order(engine: &mut Engine, amount: rust_decimal::Decimal, expires: i64) -> RecordId {
        let id = engine
            .place_order(
                ALICE,
                AssetType::Btc,
                OrderKind::StayIn,
                dec!(5),
                Quote::new(amount),
                Some(Timestamp::from_millis(expires)),
            )
            .unwrap()
            .order_id;
        RecordId::Order(AssetType::Btc, id)
    }

    #[test]
    fn expired_orders_are_cancelled_and_refunded() {
        let mut engine = setup();
        let a = expiring_order(&mut engine, dec!(100), 1_000);
        let b = expiring_order(&mut engine, dec!(50), 1_000);
        let later = expiring_order(&mut engine, dec!(25), 5_000);

        let result = engine
            .sweep_expired(ADMIN, AssetType::Btc, &[a, b, later, a], Timestamp::from_millis(2_000))
            .unwrap();
        assert_eq!(result.cancelled_orders.len(), 2);
        assert_eq!(result.skipped, 2);
        assert_eq!(result.refunded.value(), dec!(150));

        let alice = engine.ledger(ALICE).unwrap();
        assert_eq!(alice.locked_funds.value(), dec!(25));
        assert_eq!(alice.free_funds.value(), dec!(975));

        let RecordId::Order(_, a_id) = a else { unreachable!() };
        assert_eq!(engine.order(AssetType::Btc, &a_id).unwrap().status, OrderStatus::Cancelled);

        // second run finds nothing to do
        let again = engine
            .sweep_expired(ADMIN, AssetType::Btc, &[a, b], Timestamp::from_millis(3_000))
            .unwrap();
        assert!(again.cancelled_orders.is_empty());
        assert_eq!(again.skipped, 2);
    }

    #[test]
    fn sweep_is_authority_only() {
        let mut engine = setup();
        let a = expiring_order(&mut engine, dec!(100), 0);
        let err = engine
            .sweep_expired(BOB, AssetType::Btc, &[a], Timestamp::from_millis(1))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAuthorized);
        assert_eq!(engine.ledger(ALICE).unwrap().locked_funds.value(), dec!(100));
    }

    #[test]
    fn expired_position_settles_at_last_price() {
        let mut engine = setup();
        let order_id = engine
            .place_order(ALICE, AssetType::Btc, OrderKind::Breakout, dec!(5), Quote::new(dec!(100)), None)
            .unwrap()
            .order_id;
        let opened = engine
            .match_position(BOB, AssetType::Btc, OrderKind::StayIn, dec!(5), Quote::new(dec!(100)), order_id)
            .unwrap();
        let ids = [RecordId::Position(opened.position_id)];

        // nothing observed yet: the whole sweep is void
        let err = engine
            .sweep_expired(ADMIN, AssetType::Btc, &ids, Timestamp::from_millis(DAY))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOracleFeed);

        engine
            .check_position(opened.position_id, Price::new_unchecked(dec!(50100)), Timestamp::from_millis(10))
            .unwrap();
        let early = engine
            .sweep_expired(ADMIN, AssetType::Btc, &ids, Timestamp::from_millis(DAY - 1))
            .unwrap();
        assert_eq!(early.skipped, 1);

        let result = engine
            .sweep_expired(ADMIN, AssetType::Btc, &ids, Timestamp::from_millis(DAY))
            .unwrap();
        assert_eq!(result.settled_positions, vec![opened.position_id]);

        let position = engine.position(&opened.position_id).unwrap();
        assert_eq!(position.status, PositionStatus::Settled);
        assert_eq!(position.settlement.unwrap().payout_percentage, PayoutPct::WIN);
    }
}
