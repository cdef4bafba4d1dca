// 8.0: core engine. coordinates orderbook registration, order placement,
// matching, settlement, claims and the expiration sweep.
// deterministic with no external I/O; the caller supplies time and prices.

mod config;
mod core;
mod matching;
mod orders;
mod results;
mod settlement;
mod sweeper;

pub use config::{EngineConfig, DEFAULT_POSITION_DURATION_MS};
pub use core::Engine;
pub use results::{
    CheckOutcome, ClaimResult, EngineError, ErrorCode, MatchResult, PlaceOrderResult, SweepResult,
};
