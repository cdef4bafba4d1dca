// bound-market-core: price-band bet engine.
// makers post liquidity orders around an authority-set base price, takers bet the
// price stays in (or breaks out of) the band, a payout curve settles the escrow.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: TraderId, AssetType, Price, Quote, WidthPct
//   2.x  order.rs: liquidity orders, composite ids, the sorted order store
//   2.1  orderbook.rs: per-asset registry record, base price, sequence counter
//   3.x  ledger.rs: trader free/locked funds
//   3.1  vault.rs: custody balances
//   4.x  position.rs: position struct, price band, settle/claim, escrow split
//   5.x  escrow.rs: funder stake policy
//   6.x  payout.rs: payout curves (binary, time weighted)
//   7.x  config.rs: settings, env presets
//   8.x  engine/: core engine: orders, matching, settlement, sweeper
//   9.x  price_feed.rs: oracle trait and in-memory price board
//   11.x events.rs: state transition events for audit

// core modules
pub mod engine;
pub mod events;
pub mod ledger;
pub mod order;
pub mod orderbook;
pub mod position;
pub mod types;
pub mod vault;

// settlement policy modules
pub mod escrow;
pub mod payout;

// integration modules
pub mod config;
pub mod price_feed;

// re exports for convenience
pub use engine::*;
pub use escrow::*;
pub use events::*;
pub use ledger::*;
pub use order::*;
pub use orderbook::*;
pub use payout::*;
pub use position::*;
pub use types::*;
pub use vault::*;
pub use config::{ConfigError, Environment, MarketSettings};
pub use price_feed::{PriceBoard, PriceFeedError, PriceOracle, PriceUpdate};
