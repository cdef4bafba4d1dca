//! End to end lifecycle scenarios.
//!
//! One maker, one taker, one band: registration, placement, match, settlement,
//! claim and the keeper sweep, checked at every step.

use bound_market_core::*;
use rust_decimal_macros::dec;

const ADMIN: TraderId = TraderId(99);
const A: TraderId = TraderId(1);
const B: TraderId = TraderId(2);

fn engine_with_book() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine.register_orderbook(ADMIN, 0).unwrap();
    engine
        .update_price(ADMIN, AssetType::Btc, Price::new_unchecked(dec!(50000)))
        .unwrap();
    engine
}

#[test]
fn full_breakout_lifecycle() {
    let mut engine = engine_with_book();

    // register A with 1000
    engine.register_trader(A, Quote::new(dec!(1000))).unwrap();
    let a = engine.ledger(A).unwrap();
    assert_eq!(a.free_funds.value(), dec!(1000));
    assert_eq!(a.locked_funds.value(), dec!(0));

    // A places StayIn 5% for 100
    let placed = engine
        .place_order(A, AssetType::Btc, OrderKind::StayIn, dec!(5), Quote::new(dec!(100)), None)
        .unwrap();
    let a = engine.ledger(A).unwrap();
    assert_eq!(a.locked_funds.value(), dec!(100));
    assert_eq!(a.free_funds.value(), dec!(900));
    assert_eq!(
        engine.order(AssetType::Btc, &placed.order_id).unwrap().status,
        OrderStatus::Active
    );

    // B takes the breakout side
    engine.register_trader(B, Quote::new(dec!(1000))).unwrap();
    let matched = engine
        .match_position(B, AssetType::Btc, OrderKind::Breakout, dec!(5), Quote::new(dec!(100)), placed.order_id)
        .unwrap();
    assert_eq!(
        engine.order(AssetType::Btc, &placed.order_id).unwrap().status,
        OrderStatus::Completed
    );
    let position = engine.position(&matched.position_id).unwrap();
    assert_eq!(position.trader, B);
    assert_eq!(position.lower_bound.value(), dec!(47500));
    assert_eq!(position.upper_bound.value(), dec!(52500));
    assert_eq!(position.status, PositionStatus::Active);
    let b = engine.ledger(B).unwrap();
    assert_eq!(b.locked_funds.value(), dec!(100));
    assert_eq!(b.free_funds.value(), dec!(900));

    // price breaks out
    let outcome = engine
        .check_position(matched.position_id, Price::new_unchecked(dec!(60000)), Timestamp::from_millis(1_000))
        .unwrap();
    assert!(matches!(
        outcome,
        CheckOutcome::Settled { payout_percentage, .. } if payout_percentage.value() == 100
    ));
    assert_eq!(
        engine.position(&matched.position_id).unwrap().status,
        PositionStatus::Settled
    );

    // B claims, A's remainder returns to A
    let claim = engine.claim_position(B, matched.position_id).unwrap();
    assert_eq!(claim.payout.value(), dec!(200));
    assert!(claim.funder_remainder.is_zero());
    assert_eq!(engine.ledger(B).unwrap().free_funds.value(), dec!(1100));
    assert_eq!(engine.ledger(A).unwrap().free_funds.value(), dec!(900));
    assert_eq!(engine.ledger(A).unwrap().locked_funds.value(), dec!(0));
    assert_eq!(
        engine.position(&matched.position_id).unwrap().status,
        PositionStatus::Claimed
    );

    let repeat = engine.claim_position(B, matched.position_id).unwrap_err();
    assert_eq!(repeat.code(), ErrorCode::OrderNotActive);
}

#[test]
fn stay_in_holder_loses_on_breach() {
    let mut engine = engine_with_book();
    engine.register_trader(A, Quote::new(dec!(1000))).unwrap();
    engine.register_trader(B, Quote::new(dec!(1000))).unwrap();

    let placed = engine
        .place_order(A, AssetType::Btc, OrderKind::Breakout, dec!(2), Quote::new(dec!(300)), None)
        .unwrap();
    let matched = engine
        .match_position(B, AssetType::Btc, OrderKind::StayIn, dec!(2), Quote::new(dec!(300)), placed.order_id)
        .unwrap();

    engine
        .check_position(matched.position_id, Price::new_unchecked(dec!(48999)), Timestamp::from_millis(5))
        .unwrap();
    let claim = engine.claim_position(B, matched.position_id).unwrap();
    assert!(claim.payout.is_zero());
    assert_eq!(claim.funder_remainder.value(), dec!(600));

    assert_eq!(engine.ledger(A).unwrap().free_funds.value(), dec!(1300));
    assert_eq!(engine.ledger(B).unwrap().free_funds.value(), dec!(700));
    assert_eq!(engine.vault_balance(A).value(), dec!(1300));
    assert_eq!(engine.vault_balance(B).value(), dec!(700));
}

#[test]
fn sweep_cancels_expired_unmatched_order() {
    let mut engine = engine_with_book();
    engine.register_trader(A, Quote::new(dec!(1000))).unwrap();

    let placed = engine
        .place_order(
            A,
            AssetType::Btc,
            OrderKind::StayIn,
            dec!(5),
            Quote::new(dec!(100)),
            Some(Timestamp::from_millis(10_000)),
        )
        .unwrap();

    let result = engine
        .sweep_expired(
            ADMIN,
            AssetType::Btc,
            &[RecordId::Order(AssetType::Btc, placed.order_id)],
            Timestamp::from_millis(10_001),
        )
        .unwrap();
    assert_eq!(result.cancelled_orders, vec![placed.order_id]);

    let order = engine.order(AssetType::Btc, &placed.order_id).unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    let a = engine.ledger(A).unwrap();
    assert_eq!(a.locked_funds.value(), dec!(0));
    assert_eq!(a.free_funds.value(), dec!(1000));

    let cancelled = engine
        .events()
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::OrderCancelled(c) => Some(c.reason),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(cancelled, vec![CancelReason::Expired]);
}

#[test]
fn cancel_rules() {
    let mut engine = engine_with_book();
    engine.register_trader(A, Quote::new(dec!(1000))).unwrap();
    engine.register_trader(B, Quote::new(dec!(1000))).unwrap();

    let placed = engine
        .place_order(A, AssetType::Btc, OrderKind::StayIn, dec!(5), Quote::new(dec!(100)), None)
        .unwrap();

    let err = engine.cancel_order(B, AssetType::Btc, placed.order_id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotAuthorized);

    engine
        .match_position(B, AssetType::Btc, OrderKind::Breakout, dec!(5), Quote::new(dec!(100)), placed.order_id)
        .unwrap();
    let err = engine.cancel_order(A, AssetType::Btc, placed.order_id).unwrap_err();
    assert_eq!(err.code(), ErrorCode::OrderNotActive);
}

#[test]
fn settings_driven_engine() {
    let settings = MarketSettings::from_json(
        r#"{
            "assets": ["Eth"],
            "orderbook": {"min_width_pct": "1", "max_width_pct": "4"},
            "engine": {"escrow_policy": {"policy": "full_order"}, "position_duration_ms": 60000}
        }"#,
    )
    .unwrap();
    let mut engine = Engine::from_settings(&settings, ADMIN).unwrap();
    assert!(engine.orderbook(AssetType::Btc).is_none());

    engine
        .update_price(ADMIN, AssetType::Eth, Price::new_unchecked(dec!(2000)))
        .unwrap();
    engine.register_trader(A, Quote::new(dec!(500))).unwrap();
    engine.register_trader(B, Quote::new(dec!(500))).unwrap();

    let err = engine
        .place_order(A, AssetType::Eth, OrderKind::StayIn, dec!(5), Quote::new(dec!(100)), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::InvalidWidthPercentage);

    let placed = engine
        .place_order(A, AssetType::Eth, OrderKind::StayIn, dec!(4), Quote::new(dec!(400)), None)
        .unwrap();
    let matched = engine
        .match_position(B, AssetType::Eth, OrderKind::Breakout, dec!(4), Quote::new(dec!(100)), placed.order_id)
        .unwrap();
    assert_eq!(matched.funder_stake.value(), dec!(400));

    let position = engine.position(&matched.position_id).unwrap();
    assert_eq!(position.expiration.as_millis(), 60_000);
    assert_eq!(position.escrow().unwrap().value(), dec!(500));
}
