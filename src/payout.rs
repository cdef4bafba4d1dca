//! Payout curves.
//!
//! A curve looks at one price observation against a position and decides whether
//! the position settles now and, if so, what share of the escrow the holder gets.
//! Settlement and claim only ever see the resulting [`PayoutPct`].

use crate::order::OrderKind;
use crate::position::PriceBand;
use crate::types::{PayoutPct, Price, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Everything a curve may look at.
#[derive(Debug, Clone, Copy)]
pub struct SettlementInput {
    pub kind: OrderKind,
    pub band: PriceBand,
    pub price: Price,
    pub opened_at: Timestamp,
    pub expiration: Timestamp,
    pub now: Timestamp,
}

impl SettlementInput {
    pub fn in_band(&self) -> bool {
        self.band.contains(self.price)
    }

    pub fn is_expired(&self) -> bool {
        self.now >= self.expiration
    }
}

pub trait PayoutCurve: fmt::Debug + Send + Sync {
    /// `None` keeps the position active.
    fn evaluate(&self, input: &SettlementInput) -> Option<PayoutPct>;

    fn name(&self) -> &'static str;
}

/// All or nothing. StayIn wins at expiry if never breached; breakout wins on
/// the first breach.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryPayout;

impl PayoutCurve for BinaryPayout {
    fn evaluate(&self, input: &SettlementInput) -> Option<PayoutPct> {
        let in_band = input.in_band();
        let expired = input.is_expired();
        match input.kind {
            OrderKind::StayIn => match (in_band, expired) {
                (false, _) => Some(PayoutPct::LOSS),
                (true, true) => Some(PayoutPct::WIN),
                (true, false) => None,
            },
            OrderKind::Breakout => match (in_band, expired) {
                (false, _) => Some(PayoutPct::WIN),
                (true, true) => Some(PayoutPct::LOSS),
                (true, false) => None,
            },
        }
    }

    fn name(&self) -> &'static str {
        "binary"
    }
}

/// Payout scales with how long the position survived.
///
/// - stay-in, in band at expiry: 100
/// - stay-in, breached: 50 × elapsed / lifetime
/// - breakout, breached: 100 × remaining / lifetime
/// - breakout, in band at expiry: 0
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeWeightedPayout;

impl TimeWeightedPayout {
    fn elapsed_and_lifetime(input: &SettlementInput) -> (u128, u128) {
        let lifetime = input.opened_at.millis_until(&input.expiration).max(1) as u128;
        let elapsed = (input.opened_at.millis_until(&input.now) as u128).min(lifetime);
        (elapsed, lifetime)
    }
}

impl PayoutCurve for TimeWeightedPayout {
    fn evaluate(&self, input: &SettlementInput) -> Option<PayoutPct> {
        let in_band = input.in_band();
        let expired = input.is_expired();
        let (elapsed, lifetime) = Self::elapsed_and_lifetime(input);
        match input.kind {
            OrderKind::StayIn => match (in_band, expired) {
                (true, true) => Some(PayoutPct::WIN),
                (true, false) => None,
                (false, _) => Some(PayoutPct::clamped(elapsed * 50 / lifetime)),
            },
            OrderKind::Breakout => match (in_band, expired) {
                (false, _) => Some(PayoutPct::clamped((lifetime - elapsed) * 100 / lifetime)),
                (true, true) => Some(PayoutPct::LOSS),
                (true, false) => None,
            },
        }
    }

    fn name(&self) -> &'static str {
        "time_weighted"
    }
}

/// Serializable curve selector for configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutCurveKind {
    #[default]
    Binary,
    TimeWeighted,
}

impl PayoutCurveKind {
    pub fn build(&self) -> Box<dyn PayoutCurve> {
        match self {
            PayoutCurveKind::Binary => Box::new(BinaryPayout),
            PayoutCurveKind::TimeWeighted => Box::new(TimeWeightedPayout),
        }
    }
}
