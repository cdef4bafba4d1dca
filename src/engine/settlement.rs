//! Settlement checks and claims.

use super::core::Engine;
use super::results::{CheckOutcome, ClaimResult, EngineError};
use crate::events::{EventPayload, PositionClaimedEvent, PositionSettledEvent, SettleReason};
use crate::ledger::RecordId;
use crate::payout::SettlementInput;
use crate::position::{Position, PositionId, PositionStatus};
use crate::price_feed::PriceOracle;
use crate::types::{PayoutPct, Price, Timestamp, TraderId};

impl Engine {
    /// Run the installed payout curve over one observation. `None` keeps the
    /// position active.
    pub(super) fn evaluate_position(&self, position: &Position, price: Price, now: Timestamp) -> Option<PayoutPct> {
        let input = SettlementInput {
            kind: position.kind,
            band: position.band(),
            price,
            opened_at: position.opened_at,
            expiration: position.expiration,
            now,
        };
        self.payout_curve.evaluate(&input)
    }

    /// Evaluate an active position against `price` observed at `now`.
    pub fn check_position(
        &mut self,
        position_id: PositionId,
        price: Price,
        now: Timestamp,
    ) -> Result<CheckOutcome, EngineError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if !position.is_active() {
            return Err(EngineError::PositionNotActive {
                id: position_id,
                status: position.status,
            });
        }

        let outcome = self.evaluate_position(position, price, now);
        let reason = if position.is_expired(now) {
            SettleReason::Expired
        } else {
            SettleReason::PriceCheck
        };

        if let Some(book) = self.orderbooks.get_mut(&position_id.asset) {
            book.observe_price(price, now);
        }

        match outcome {
            None => Ok(CheckOutcome::StillActive),
            Some(payout_percentage) => {
                self.apply_settlement(position_id, payout_percentage, price, now, reason);
                Ok(CheckOutcome::Settled {
                    payout_percentage,
                    settlement_price: price,
                })
            }
        }
    }

    /// Same as [`Engine::check_position`] with the price pulled from `oracle`
    /// at the engine's current time.
    pub fn check_position_with_oracle(
        &mut self,
        position_id: PositionId,
        oracle: &dyn PriceOracle,
    ) -> Result<CheckOutcome, EngineError> {
        let now = self.current_time;
        let price = oracle.current_price(position_id.asset, now)?;
        self.check_position(position_id, price, now)
    }

    pub(super) fn apply_settlement(
        &mut self,
        position_id: PositionId,
        payout_percentage: PayoutPct,
        price: Price,
        now: Timestamp,
        reason: SettleReason,
    ) {
        let Some(position) = self.positions.get_mut(&position_id) else {
            return;
        };
        if !position.settle(payout_percentage, price, now) {
            return;
        }
        let trader = position.trader;

        self.emit_event(EventPayload::PositionSettled(PositionSettledEvent {
            position_id,
            trader,
            settlement_price: price,
            payout_percentage,
            reason,
        }));
    }

    /// Pay out a settled position. Only the position holder may claim, once.
    pub fn claim_position(&mut self, trader: TraderId, position_id: PositionId) -> Result<ClaimResult, EngineError> {
        let position = self
            .positions
            .get(&position_id)
            .ok_or(EngineError::PositionNotFound(position_id))?;
        if position.trader != trader {
            return Err(EngineError::NotAuthorized { caller: trader });
        }
        if position.status != PositionStatus::Settled {
            return Err(EngineError::PositionNotActive {
                id: position_id,
                status: position.status,
            });
        }

        let split = position.payout_split().ok_or(EngineError::MathOverflow)?;
        let funder = position.funder;

        let mut taker_ledger = self.staged_ledger(trader)?;
        taker_ledger.release_locked(position.amount)?;
        taker_ledger.credit_free(split.to_trader)?;
        taker_ledger.remove_record(&RecordId::Position(position_id));

        let mut funder_ledger = self.staged_ledger(funder)?;
        funder_ledger.release_locked(position.funder_stake)?;
        funder_ledger.credit_free(split.to_funder)?;

        let mut claimed = position.clone();
        if !claimed.claim() {
            return Err(EngineError::PositionNotActive {
                id: position_id,
                status: position.status,
            });
        }

        // custody follows the net change; the vault is the last fallible step
        if split.to_trader >= position.amount {
            let gain = split
                .to_trader
                .checked_sub(position.amount)
                .ok_or(EngineError::MathOverflow)?;
            self.vault.transfer(funder, trader, gain)?;
        } else {
            let loss = position
                .amount
                .checked_sub(split.to_trader)
                .ok_or(EngineError::MathOverflow)?;
            self.vault.transfer(trader, funder, loss)?;
        }

        self.ledgers.insert(trader, taker_ledger);
        self.ledgers.insert(funder, funder_ledger);
        self.positions.insert(position_id, claimed);

        self.emit_event(EventPayload::PositionClaimed(PositionClaimedEvent {
            position_id,
            trader,
            funder,
            payout: split.to_trader,
            funder_remainder: split.to_funder,
        }));

        Ok(ClaimResult {
            position_id,
            payout: split.to_trader,
            funder_remainder: split.to_funder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineConfig, ErrorCode};
    use crate::order::OrderKind;
    use crate::payout::TimeWeightedPayout;
    use crate::price_feed::{PriceBoard, PriceUpdate};
    use crate::types::{AssetType, Quote};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ADMIN: TraderId = TraderId(100);
    const ALICE: TraderId = TraderId(1);
    const BOB: TraderId = TraderId(2);
    const DAY: i64 = 86_400_000;

    fn price(p: Decimal) -> Price {
        Price::new_unchecked(p)
    }

    /// Alice funds a 5% stay-in order of 100; Bob takes it with `kind`.
    fn open(kind: OrderKind) -> (Engine, PositionId) {
        let mut engine = Engine::new(EngineConfig::default());
        engine.register_orderbook(ADMIN, 0).unwrap();
        engine.update_price(ADMIN, AssetType::Btc, price(dec!(50000))).unwrap();
        engine.register_trader(ALICE, Quote::new(dec!(1000))).unwrap();
        engine.register_trader(BOB, Quote::new(dec!(1000))).unwrap();

        let order_id = engine
            .place_order(ALICE, AssetType::Btc, kind.complement(), dec!(5), Quote::new(dec!(100)), None)
            .unwrap()
            .order_id;
        let result = engine
            .match_position(BOB, AssetType::Btc, kind, dec!(5), Quote::new(dec!(100)), order_id)
            .unwrap();
        (engine, result.position_id)
    }

    #[test]
    fn breakout_wins_on_breach() {
        let (mut engine, id) = open(OrderKind::Breakout);
        let outcome = engine
            .check_position(id, price(dec!(60000)), Timestamp::from_millis(1_000))
            .unwrap();
        assert_eq!(
            outcome,
            CheckOutcome::Settled {
                payout_percentage: PayoutPct::WIN,
                settlement_price: price(dec!(60000)),
            }
        );
        assert_eq!(engine.position(&id).unwrap().status, PositionStatus::Settled);

        let err = engine
            .check_position(id, price(dec!(50000)), Timestamp::from_millis(2_000))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderNotActive);
    }

    #[test]
    fn stay_in_survives_inside_band_until_expiry() {
        let (mut engine, id) = open(OrderKind::StayIn);
        let outcome = engine
            .check_position(id, price(dec!(51000)), Timestamp::from_millis(DAY / 2))
            .unwrap();
        assert_eq!(outcome, CheckOutcome::StillActive);
        assert_eq!(
            engine.orderbook(AssetType::Btc).unwrap().last_price,
            Some((price(dec!(51000)), Timestamp::from_millis(DAY / 2)))
        );

        let outcome = engine
            .check_position(id, price(dec!(52500)), Timestamp::from_millis(DAY))
            .unwrap();
        assert!(matches!(
            outcome,
            CheckOutcome::Settled { payout_percentage: PayoutPct::WIN, .. }
        ));
    }

    #[test]
    fn claim_pays_winner_and_moves_custody() {
        let (mut engine, id) = open(OrderKind::Breakout);
        engine.check_position(id, price(dec!(60000)), Timestamp::from_millis(1)).unwrap();

        let err = engine.claim_position(ALICE, id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAuthorized);

        let claim = engine.claim_position(BOB, id).unwrap();
        assert_eq!(claim.payout.value(), dec!(200));
        assert!(claim.funder_remainder.is_zero());

        let bob = engine.ledger(BOB).unwrap();
        assert_eq!(bob.free_funds.value(), dec!(1100));
        assert_eq!(bob.locked_funds.value(), dec!(0));
        let alice = engine.ledger(ALICE).unwrap();
        assert_eq!(alice.free_funds.value(), dec!(900));
        assert_eq!(alice.locked_funds.value(), dec!(0));

        assert_eq!(engine.vault_balance(BOB).value(), dec!(1100));
        assert_eq!(engine.vault_balance(ALICE).value(), dec!(900));
        assert!(engine.custody_consistent(ALICE));
        assert!(engine.custody_consistent(BOB));

        let again = engine.claim_position(BOB, id).unwrap_err();
        assert_eq!(again.code(), ErrorCode::OrderNotActive);
    }

    #[test]
    fn claim_before_settlement_fails() {
        let (mut engine, id) = open(OrderKind::StayIn);
        let err = engine.claim_position(BOB, id).unwrap_err();
        assert_eq!(err.code(), ErrorCode::OrderNotActive);
        assert_eq!(engine.ledger(BOB).unwrap().locked_funds.value(), dec!(100));
    }

    #[test]
    fn time_weighted_curve_splits_escrow() {
        let (mut engine, id) = open(OrderKind::StayIn);
        engine.set_payout_curve(Box::new(TimeWeightedPayout));

        // breached halfway through: 25% of the 200 escrow to the holder
        engine
            .check_position(id, price(dec!(40000)), Timestamp::from_millis(DAY / 2))
            .unwrap();
        let claim = engine.claim_position(BOB, id).unwrap();
        assert_eq!(claim.payout.value(), dec!(50));
        assert_eq!(claim.funder_remainder.value(), dec!(150));
        assert_eq!(engine.ledger(BOB).unwrap().free_funds.value(), dec!(950));
        assert_eq!(engine.ledger(ALICE).unwrap().free_funds.value(), dec!(1050));
        assert_eq!(engine.total_custody().unwrap().value(), dec!(2000));
    }

    #[test]
    fn oracle_check_uses_engine_time() {
        let (mut engine, id) = open(OrderKind::Breakout);
        let mut board = PriceBoard::new();

        engine.set_time(Timestamp::from_millis(10_000));
        let err = engine.check_position_with_oracle(id, &board).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidOracleFeed);

        board
            .submit(PriceUpdate::new(AssetType::Btc, dec!(45000), Timestamp::from_millis(9_000)))
            .unwrap();
        let outcome = engine.check_position_with_oracle(id, &board).unwrap();
        assert!(matches!(
            outcome,
            CheckOutcome::Settled { payout_percentage: PayoutPct::WIN, .. }
        ));
    }
}
