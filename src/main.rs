//! Bound Market Core Simulation.
//!
//! Walks the engine through the full lifecycle: liquidity placement, matching,
//! settlement by price check, oracle and sweeper, claims, and a stress run.

use bound_market_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

const ADMIN: TraderId = TraderId(0);
const DAY: i64 = 86_400_000;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    println!("Bound Market Core Engine Simulation");
    println!("Stay-in / Breakout bands, escrowed stakes, pluggable payout\n");

    scenario_1_basic_lifecycle();
    scenario_2_best_match();
    scenario_3_expiry_sweep();
    scenario_4_time_weighted_mainnet();
    scenario_5_oracle_checks();
    scenario_6_stress_test();

    println!("\nAll simulations completed successfully.");
}

fn btc_engine(config: EngineConfig) -> Engine {
    let mut engine = Engine::new(config);
    engine.register_orderbook(ADMIN, AssetType::Btc.as_u8()).unwrap();
    engine
        .update_price(ADMIN, AssetType::Btc, Price::new_unchecked(dec!(50000)))
        .unwrap();
    engine
}

fn print_ledger(engine: &Engine, name: &str, trader: TraderId) {
    let ledger = engine.ledger(trader).unwrap();
    println!(
        "    {}: free ${}, locked ${}, vault ${}",
        name,
        ledger.free_funds,
        ledger.locked_funds,
        engine.vault_balance(trader)
    );
}

/// Stay-in liquidity taken by a breakout bettor, price breaks out.
fn scenario_1_basic_lifecycle() {
    println!("Scenario 1: Basic Lifecycle\n");

    let mut engine = btc_engine(EngineConfig::default());
    let alice = TraderId(1);
    let bob = TraderId(2);
    engine.register_trader(alice, Quote::new(dec!(1000))).unwrap();
    engine.register_trader(bob, Quote::new(dec!(1000))).unwrap();
    println!("  Alice and Bob each register with $1,000, BTC base price $50,000");

    let placed = engine
        .place_order(alice, AssetType::Btc, OrderKind::StayIn, dec!(5), Quote::new(dec!(100)), None)
        .unwrap();
    println!("  Alice posts stay-in liquidity, 5% band, $100: {}", placed.order_id);

    let matched = engine
        .match_position(bob, AssetType::Btc, OrderKind::Breakout, dec!(5), Quote::new(dec!(100)), placed.order_id)
        .unwrap();
    println!(
        "  Bob takes the breakout side: band [{}, {}]",
        matched.lower_bound, matched.upper_bound
    );
    print_ledger(&engine, "Alice", alice);
    print_ledger(&engine, "Bob", bob);

    engine.advance_time(60_000);
    let outcome = engine
        .check_position(matched.position_id, Price::new_unchecked(dec!(60000)), engine.time())
        .unwrap();
    println!("  Price prints $60,000: {:?}", outcome);

    let claim = engine.claim_position(bob, matched.position_id).unwrap();
    println!("  Bob claims ${}, Alice keeps ${}", claim.payout, claim.funder_remainder);
    print_ledger(&engine, "Alice", alice);
    print_ledger(&engine, "Bob", bob);

    let again = engine.claim_position(bob, matched.position_id).unwrap_err();
    println!("  Second claim rejected: {:?}\n", again.code());
}

/// Several makers at different widths, takers routed to the best one.
fn scenario_2_best_match() {
    println!("Scenario 2: Best Match Routing\n");

    let mut engine = btc_engine(EngineConfig::default());
    let makers = [TraderId(1), TraderId(2), TraderId(3)];
    let taker = TraderId(4);
    for id in makers.iter().chain([taker].iter()) {
        engine.register_trader(*id, Quote::new(dec!(10000))).unwrap();
    }

    for (maker, width) in makers.iter().zip([dec!(2), dec!(4), dec!(7)]) {
        engine
            .place_order(*maker, AssetType::Btc, OrderKind::Breakout, width, Quote::new(dec!(500)), None)
            .unwrap();
        engine
            .place_order(*maker, AssetType::Btc, OrderKind::StayIn, width, Quote::new(dec!(500)), None)
            .unwrap();
    }
    println!("  Makers post both sides at 2%, 4% and 7%");

    let stay_in = engine
        .match_best(taker, AssetType::Btc, OrderKind::StayIn, dec!(3), Quote::new(dec!(200)))
        .unwrap();
    println!(
        "  Stay-in taker asking 3% gets the widest band: [{}, {}]",
        stay_in.lower_bound, stay_in.upper_bound
    );

    let breakout = engine
        .match_best(taker, AssetType::Btc, OrderKind::Breakout, dec!(5), Quote::new(dec!(200)))
        .unwrap();
    println!(
        "  Breakout taker asking 5% gets the narrowest band: [{}, {}]",
        breakout.lower_bound, breakout.upper_bound
    );

    let none = engine
        .match_best(taker, AssetType::Btc, OrderKind::Breakout, dec!(1), Quote::new(dec!(200)))
        .unwrap_err();
    println!("  Breakout at 1% finds nothing: {:?}", none.code());
    println!(
        "  Remaining liquidity: {} stay-in, {} breakout\n",
        engine.active_orders(AssetType::Btc, OrderKind::StayIn).len(),
        engine.active_orders(AssetType::Btc, OrderKind::Breakout).len()
    );
}

/// Unfilled orders and unbreached positions closed by the keeper.
fn scenario_3_expiry_sweep() {
    println!("Scenario 3: Expiration Sweep\n");

    let mut engine = btc_engine(EngineConfig::default());
    let maker = TraderId(1);
    let taker = TraderId(2);
    engine.register_trader(maker, Quote::new(dec!(1000))).unwrap();
    engine.register_trader(taker, Quote::new(dec!(1000))).unwrap();

    let idle = engine
        .place_order(maker, AssetType::Btc, OrderKind::StayIn, dec!(3), Quote::new(dec!(250)), Some(Timestamp::from_millis(DAY / 2)))
        .unwrap();
    let taken = engine
        .place_order(maker, AssetType::Btc, OrderKind::Breakout, dec!(3), Quote::new(dec!(100)), None)
        .unwrap();
    let position = engine
        .match_position(taker, AssetType::Btc, OrderKind::StayIn, dec!(3), Quote::new(dec!(100)), taken.order_id)
        .unwrap();

    engine.advance_time(DAY / 4);
    engine
        .check_position(position.position_id, Price::new_unchecked(dec!(50400)), engine.time())
        .unwrap();
    println!("  Price stays at $50,400 through the day");

    engine.set_time(Timestamp::from_millis(DAY));
    let ids = [
        RecordId::Order(AssetType::Btc, idle.order_id),
        RecordId::Position(position.position_id),
    ];
    let swept = engine
        .sweep_expired(ADMIN, AssetType::Btc, &ids, engine.time())
        .unwrap();
    println!(
        "  Sweep: {} orders cancelled (${} refunded), {} positions settled",
        swept.cancelled_orders.len(),
        swept.refunded,
        swept.settled_positions.len()
    );

    let claim = engine.claim_position(taker, position.position_id).unwrap();
    println!("  Stay-in holder claims ${}", claim.payout);

    let rerun = engine
        .sweep_expired(ADMIN, AssetType::Btc, &ids, engine.time())
        .unwrap();
    println!("  Re-running the sweep skips {} closed records\n", rerun.skipped);
}

/// Mainnet preset: time weighted curve, ratio escrow.
fn scenario_4_time_weighted_mainnet() {
    println!("Scenario 4: Time Weighted Payout\n");

    let mut settings = Environment::Mainnet.settings();
    settings.engine.escrow_policy = EscrowPolicy::Ratio(dec!(2));
    let mut engine = Engine::from_settings(&settings, ADMIN).unwrap();
    engine
        .update_price(ADMIN, AssetType::Eth, Price::new_unchecked(dec!(3000)))
        .unwrap();
    println!("  Curve: {}, escrow: funder stakes 2x", engine.payout_curve().name());

    let maker = TraderId(1);
    let taker = TraderId(2);
    engine.register_trader(maker, Quote::new(dec!(5000))).unwrap();
    engine.register_trader(taker, Quote::new(dec!(5000))).unwrap();

    let order = engine
        .place_order(maker, AssetType::Eth, OrderKind::Breakout, dec!(2), Quote::new(dec!(1000)), None)
        .unwrap();
    let position = engine
        .match_position(taker, AssetType::Eth, OrderKind::StayIn, dec!(2), Quote::new(dec!(300)), order.order_id)
        .unwrap();
    println!(
        "  Taker stakes $300, maker stakes ${} and gets ${} back",
        position.funder_stake, position.funder_refund
    );

    engine.advance_time(DAY * 3 / 4);
    let outcome = engine
        .check_position(position.position_id, Price::new_unchecked(dec!(2900)), engine.time())
        .unwrap();
    println!("  Band breached 18h in: {:?}", outcome);

    let claim = engine.claim_position(taker, position.position_id).unwrap();
    println!("  Taker recovers ${}, maker collects ${}\n", claim.payout, claim.funder_remainder);
}

/// Settlement prices pulled from an oracle instead of pushed by the caller.
fn scenario_5_oracle_checks() {
    println!("Scenario 5: Oracle Driven Checks\n");

    let mut engine = btc_engine(EngineConfig::default());
    let mut board = MarketSettings::default()
        .price_board()
        .with_max_confidence_ratio(dec!(0.01));
    let maker = TraderId(1);
    let taker = TraderId(2);
    engine.set_time(Timestamp::now());
    engine.register_trader(maker, Quote::new(dec!(1000))).unwrap();
    engine.register_trader(taker, Quote::new(dec!(1000))).unwrap();

    let order = engine
        .place_order(maker, AssetType::Btc, OrderKind::StayIn, dec!(1), Quote::new(dec!(100)), None)
        .unwrap();
    let position = engine
        .match_position(taker, AssetType::Btc, OrderKind::Breakout, dec!(1), Quote::new(dec!(100)), order.order_id)
        .unwrap();

    engine.advance_time(120_000);
    match engine.check_position_with_oracle(position.position_id, &board) {
        Ok(outcome) => println!("  Unexpected outcome {:?}", outcome),
        Err(e) => println!("  Empty board rejected: {}", e),
    }

    board
        .submit(PriceUpdate::new(AssetType::Btc, dec!(50200), engine.time()).with_confidence(dec!(5)))
        .unwrap();
    let outcome = engine.check_position_with_oracle(position.position_id, &board).unwrap();
    println!("  $50,200 inside the 1% band: {:?}", outcome);

    engine.advance_time(30_000);
    board
        .submit(PriceUpdate::new(AssetType::Btc, dec!(50600), engine.time()).with_confidence(dec!(5)))
        .unwrap();
    let outcome = engine.check_position_with_oracle(position.position_id, &board).unwrap();
    println!("  $50,600 breaks out: {:?}\n", outcome);
}

/// Many traders, random-ish prices, conservation check at the end.
fn scenario_6_stress_test() {
    println!("Scenario 6: Stress Test\n");

    let mut engine = btc_engine(EngineConfig::default());
    let num_traders = 20u64;
    let traders: Vec<TraderId> = (1..=num_traders).map(TraderId).collect();

    for (i, trader) in traders.iter().enumerate() {
        let capital = dec!(1000) + Decimal::from(i) * dec!(250);
        engine.register_trader(*trader, Quote::new(capital)).unwrap();
    }
    let custody_before = engine.total_custody().unwrap();
    println!("  Created {} traders, total custody ${}", num_traders, custody_before);

    let mut orders = Vec::new();
    for (i, trader) in traders.iter().enumerate().filter(|(i, _)| i % 2 == 0) {
        let kind = if i % 4 == 0 { OrderKind::StayIn } else { OrderKind::Breakout };
        let width = dec!(1) + Decimal::from(i % 5);
        let placed = engine
            .place_order(*trader, AssetType::Btc, kind, width, Quote::new(dec!(200)), None)
            .unwrap();
        orders.push((placed.order_id, kind, width));
    }

    let mut positions = Vec::new();
    for ((order_id, kind, width), taker) in orders.iter().zip(traders.iter().skip(1).step_by(2)) {
        if let Ok(m) = engine.match_position(*taker, AssetType::Btc, kind.complement(), *width, Quote::new(dec!(150)), *order_id) {
            positions.push((m.position_id, *taker));
        }
    }
    println!("  Opened {} positions", positions.len());

    let prices = [dec!(50500), dec!(51500), dec!(49000), dec!(47000), dec!(53500), dec!(50000)];
    let mut settled = 0;
    for price in prices {
        engine.advance_time(DAY / 8);
        for (id, _) in &positions {
            if let Ok(CheckOutcome::Settled { .. }) = engine.check_position(*id, Price::new_unchecked(price), engine.time()) {
                settled += 1;
            }
        }
    }

    engine.set_time(Timestamp::from_millis(DAY));
    let ids: Vec<RecordId> = positions.iter().map(|(id, _)| RecordId::Position(*id)).collect();
    let swept = engine.sweep_expired(ADMIN, AssetType::Btc, &ids, engine.time()).unwrap();
    println!("  Settled {} by price, {} by sweep", settled, swept.settled_positions.len());

    let mut paid = Quote::zero();
    for (id, taker) in &positions {
        if let Ok(claim) = engine.claim_position(*taker, *id) {
            paid = paid.checked_add(claim.payout).unwrap();
        }
    }

    let consistent = traders.iter().all(|t| engine.custody_consistent(*t));
    println!("  Paid out ${} to takers", paid);
    println!(
        "  Custody before ${}, after ${}, ledgers consistent: {}",
        custody_before,
        engine.total_custody().unwrap(),
        consistent
    );
    println!("  Events generated: {}\n", engine.events().len());
}
