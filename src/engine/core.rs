// 8.0 engine/core.rs: main engine. holds orderbooks, order stores, positions,
// trader ledgers and the vault. every public operation either commits all of its
// writes or returns an error having written nothing.

use super::config::EngineConfig;
use super::results::EngineError;
use crate::config::MarketSettings;
use crate::events::{
    BasePriceUpdatedEvent, DepositEvent, Event, EventId, EventPayload, OrderBookRegisteredEvent,
    TraderRegisteredEvent, WithdrawalEvent, WithdrawalRejectedEvent,
};
use crate::ledger::TraderLedger;
use crate::order::{Order, OrderId, OrderKind, OrderStore};
use crate::orderbook::{OrderBook, OrderBookParams};
use crate::payout::PayoutCurve;
use crate::position::{Position, PositionId};
use crate::types::{AssetType, Price, Quote, Timestamp, TraderId};
use crate::vault::Vault;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) payout_curve: Box<dyn PayoutCurve>,
    pub(super) orderbooks: HashMap<AssetType, OrderBook>,
    pub(super) orders: HashMap<AssetType, OrderStore>,
    pub(super) positions: BTreeMap<PositionId, Position>,
    pub(super) ledgers: HashMap<TraderId, TraderLedger>,
    pub(super) vault: Vault,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let payout_curve = config.payout_curve.build();
        Self {
            config,
            payout_curve,
            orderbooks: HashMap::new(),
            orders: HashMap::new(),
            positions: BTreeMap::new(),
            ledgers: HashMap::new(),
            vault: Vault::new(),
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
        }
    }

    /// Validate settings and open one orderbook per configured asset under `authority`.
    pub fn from_settings(settings: &MarketSettings, authority: TraderId) -> Result<Self, EngineError> {
        settings.validate()?;
        let mut engine = Self::new(settings.engine.clone());
        for asset in &settings.assets {
            engine.register_orderbook_with(authority, asset.as_u8(), settings.orderbook)?;
        }
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Swap the settlement curve. Existing positions are evaluated with the new
    /// curve from their next check on.
    pub fn set_payout_curve(&mut self, curve: Box<dyn PayoutCurve>) {
        info!(curve = curve.name(), "payout curve installed");
        self.payout_curve = curve;
    }

    pub fn payout_curve(&self) -> &dyn PayoutCurve {
        self.payout_curve.as_ref()
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, millis: i64) {
        self.current_time = Timestamp::from_millis(self.current_time.as_millis().saturating_add(millis));
    }

    // orderbook registry

    pub fn register_orderbook(&mut self, authority: TraderId, asset_type: u8) -> Result<AssetType, EngineError> {
        self.register_orderbook_with(authority, asset_type, OrderBookParams::default())
    }

    pub fn register_orderbook_with(
        &mut self,
        authority: TraderId,
        asset_type: u8,
        params: OrderBookParams,
    ) -> Result<AssetType, EngineError> {
        let asset = AssetType::try_from(asset_type).map_err(EngineError::InvalidAssetType)?;
        if self.orderbooks.contains_key(&asset) {
            return Err(EngineError::OrderBookExists(asset));
        }
        if !params.is_valid() {
            return Err(EngineError::InvalidConfig(crate::config::ConfigError::InvalidWidthRange {
                min: params.min_width_pct,
                max: params.max_width_pct,
            }));
        }

        self.orderbooks.insert(asset, OrderBook::new(asset, authority, params));
        self.orders.insert(asset, OrderStore::new());
        info!(%asset, %authority, "orderbook registered");

        self.emit_event(EventPayload::OrderBookRegistered(OrderBookRegisteredEvent {
            asset,
            authority,
        }));
        Ok(asset)
    }

    /// Set the reference price new orders snapshot. Authority only.
    pub fn update_price(&mut self, caller: TraderId, asset: AssetType, new_price: Price) -> Result<(), EngineError> {
        let book = self
            .orderbooks
            .get_mut(&asset)
            .ok_or(EngineError::OrderBookNotFound(asset))?;
        if !book.is_authority(caller) {
            return Err(EngineError::NotAuthorized { caller });
        }

        let old_price = book.base_price;
        book.update_base_price(new_price);

        self.emit_event(EventPayload::BasePriceUpdated(BasePriceUpdatedEvent {
            asset,
            old_price,
            new_price,
        }));
        Ok(())
    }

    pub fn orderbook(&self, asset: AssetType) -> Option<&OrderBook> {
        self.orderbooks.get(&asset)
    }

    pub(super) fn book(&self, asset: AssetType) -> Result<&OrderBook, EngineError> {
        self.orderbooks
            .get(&asset)
            .ok_or(EngineError::OrderBookNotFound(asset))
    }

    // trader ledger + vault

    pub fn register_trader(&mut self, trader: TraderId, initial_funds: Quote) -> Result<(), EngineError> {
        if self.ledgers.contains_key(&trader) {
            return Err(EngineError::TraderAlreadyRegistered(trader));
        }
        if initial_funds.is_negative() {
            return Err(EngineError::InsufficientFunds {
                requested: initial_funds,
                available: Quote::zero(),
            });
        }

        // vault first: it is the only step that can still fail
        self.vault.deposit(trader, initial_funds)?;
        self.ledgers.insert(trader, TraderLedger::new(trader, initial_funds));
        info!(%trader, %initial_funds, "trader registered");

        self.emit_event(EventPayload::TraderRegistered(TraderRegisteredEvent {
            trader,
            initial_funds,
        }));
        Ok(())
    }

    pub fn deposit(&mut self, trader: TraderId, amount: Quote) -> Result<(), EngineError> {
        let mut ledger = self.staged_ledger(trader)?;
        ledger.credit_free(amount)?;

        self.vault.deposit(trader, amount)?;
        let new_free_funds = ledger.free_funds;
        self.ledgers.insert(trader, ledger);

        self.emit_event(EventPayload::Deposit(DepositEvent {
            trader,
            amount,
            new_free_funds,
        }));
        Ok(())
    }

    // only free funds can leave; locked funds back orders and positions
    pub fn withdraw(&mut self, trader: TraderId, amount: Quote) -> Result<(), EngineError> {
        let mut ledger = self.staged_ledger(trader)?;

        let staged = ledger
            .debit_free(amount)
            .map_err(EngineError::from)
            .and_then(|_| self.vault.withdraw(trader, amount).map_err(EngineError::from));

        if let Err(e) = staged {
            warn!(%trader, %amount, error = %e, "withdrawal rejected");
            self.emit_event(EventPayload::WithdrawalRejected(WithdrawalRejectedEvent {
                trader,
                amount,
                reason: e.to_string(),
            }));
            return Err(e);
        }

        let new_free_funds = ledger.free_funds;
        self.ledgers.insert(trader, ledger);

        self.emit_event(EventPayload::Withdrawal(WithdrawalEvent {
            trader,
            amount,
            new_free_funds,
        }));
        Ok(())
    }

    pub fn ledger(&self, trader: TraderId) -> Option<&TraderLedger> {
        self.ledgers.get(&trader)
    }

    pub fn ledgers_iter(&self) -> impl Iterator<Item = (&TraderId, &TraderLedger)> {
        self.ledgers.iter()
    }

    pub fn vault_balance(&self, trader: TraderId) -> Quote {
        self.vault.balance(trader)
    }

    /// `None` if the sum of all balances overflows.
    pub fn total_custody(&self) -> Option<Quote> {
        self.vault.total()
    }

    /// Vault balance equals ledger total for `trader`.
    pub fn custody_consistent(&self, trader: TraderId) -> bool {
        match self.ledgers.get(&trader).and_then(|l| l.total()) {
            Some(total) => total == self.vault.balance(trader),
            None => false,
        }
    }

    /// Working copy of a ledger. Mutate it, then write it back only once every
    /// other fallible step of the operation has passed.
    pub(super) fn staged_ledger(&self, trader: TraderId) -> Result<TraderLedger, EngineError> {
        self.ledgers
            .get(&trader)
            .cloned()
            .ok_or(EngineError::TraderNotRegistered(trader))
    }

    // queries

    pub fn order(&self, asset: AssetType, id: &OrderId) -> Option<&Order> {
        self.orders.get(&asset).and_then(|s| s.get(id))
    }

    pub fn active_orders(&self, asset: AssetType, kind: OrderKind) -> Vec<&Order> {
        self.orders
            .get(&asset)
            .map(|s| s.active(kind).collect())
            .unwrap_or_default()
    }

    pub fn position(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions_iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    // events

    pub fn recent_events(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            debug!(event_id = event.id.0, payload = ?event.payload, "engine event");
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ErrorCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const ADMIN: TraderId = TraderId(100);

    #[test]
    fn register_orderbook_once_per_asset() {
        let mut engine = Engine::new(EngineConfig::default());
        assert_eq!(engine.register_orderbook(ADMIN, 0).unwrap(), AssetType::Btc);

        let dup = engine.register_orderbook(ADMIN, 0).unwrap_err();
        assert_eq!(dup.code(), ErrorCode::InvalidAssetType);

        let bad = engine.register_orderbook(ADMIN, 9).unwrap_err();
        assert_eq!(bad.code(), ErrorCode::InvalidAssetType);
    }

    #[test]
    fn update_price_is_authority_only() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.register_orderbook(ADMIN, 1).unwrap();

        let price = Price::new_unchecked(dec!(3000));
        let err = engine.update_price(TraderId(1), AssetType::Eth, price).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotAuthorized);
        assert!(engine.orderbook(AssetType::Eth).unwrap().base_price.is_none());

        engine.update_price(ADMIN, AssetType::Eth, price).unwrap();
        assert_eq!(engine.orderbook(AssetType::Eth).unwrap().base_price, Some(price));
    }

    #[test]
    fn register_trader_funds_ledger_and_vault() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.register_trader(TraderId(1), Quote::new(dec!(1000))).unwrap();

        let ledger = engine.ledger(TraderId(1)).unwrap();
        assert_eq!(ledger.free_funds.value(), dec!(1000));
        assert_eq!(ledger.locked_funds.value(), dec!(0));
        assert_eq!(engine.vault_balance(TraderId(1)).value(), dec!(1000));
        assert!(engine.custody_consistent(TraderId(1)));

        let err = engine.register_trader(TraderId(1), Quote::new(dec!(5))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TraderAlreadyRegistered);
        assert_eq!(engine.vault_balance(TraderId(1)).value(), dec!(1000));
    }

    #[test]
    fn deposit_and_withdraw_move_vault_in_lockstep() {
        let mut engine = Engine::new(EngineConfig::default());
        engine.register_trader(TraderId(1), Quote::new(dec!(100))).unwrap();

        engine.deposit(TraderId(1), Quote::new(dec!(50))).unwrap();
        engine.withdraw(TraderId(1), Quote::new(dec!(30))).unwrap();
        assert_eq!(engine.ledger(TraderId(1)).unwrap().free_funds.value(), dec!(120));
        assert_eq!(engine.vault_balance(TraderId(1)).value(), dec!(120));

        let err = engine.withdraw(TraderId(1), Quote::new(dec!(500))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InsufficientFunds);
        assert!(engine.custody_consistent(TraderId(1)));
        assert!(matches!(
            engine.events().last().unwrap().payload,
            EventPayload::WithdrawalRejected(_)
        ));
    }

    #[test]
    fn unknown_trader_cannot_deposit() {
        let mut engine = Engine::new(EngineConfig::default());
        let err = engine.deposit(TraderId(9), Quote::new(dec!(1))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TraderNotRegistered);
        assert!(engine.total_custody().unwrap().is_zero());
    }

    #[test]
    fn total_custody_overflow_is_none() {
        let mut engine = Engine::new(EngineConfig::default());
        let half = Quote::new(Decimal::MAX / Decimal::TWO + Decimal::ONE);
        engine.register_trader(TraderId(1), half).unwrap();
        engine.register_trader(TraderId(2), half).unwrap();
        assert!(engine.total_custody().is_none());
        assert!(engine.custody_consistent(TraderId(1)));
    }

    #[test]
    fn event_log_is_bounded() {
        let config = EngineConfig {
            max_events: 3,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(config);
        for i in 0..5 {
            engine.register_trader(TraderId(i), Quote::new(dec!(1))).unwrap();
        }
        assert_eq!(engine.events().len(), 3);
        assert_eq!(engine.events()[0].id, EventId(3));
        assert_eq!(engine.recent_events(1)[0].id, EventId(5));
    }

    #[test]
    fn from_settings_opens_all_books() {
        let engine = Engine::from_settings(&MarketSettings::default(), ADMIN).unwrap();
        for asset in AssetType::ALL {
            assert_eq!(engine.orderbook(asset).unwrap().authority, ADMIN);
        }
    }
}
