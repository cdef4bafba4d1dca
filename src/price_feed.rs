// Price Feed Integration
//
// The engine never fetches prices itself. Settlement asks a PriceOracle for the
// price of an asset at a timestamp; anything that can answer that (Pyth, an
// aggregator, a test fixture) implements the trait. PriceBoard is the in-memory
// implementation used by the simulator and the tests.

use crate::types::{AssetType, Price, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A single price report for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub asset: AssetType,
    pub price: Decimal,
    pub timestamp: Timestamp,
    /// Confidence interval (if provided by source like Pyth)
    pub confidence: Option<Decimal>,
    /// How long after `timestamp` the report may still be used
    pub ttl_ms: i64,
}

impl PriceUpdate {
    pub fn new(asset: AssetType, price: Decimal, timestamp: Timestamp) -> Self {
        Self {
            asset,
            price,
            timestamp,
            confidence: None,
            ttl_ms: 60_000, // default 1 minute TTL
        }
    }

    pub fn with_confidence(mut self, confidence: Decimal) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_ttl(mut self, ttl_ms: i64) -> Self {
        self.ttl_ms = ttl_ms;
        self
    }

    pub fn is_stale(&self, at: Timestamp) -> bool {
        at.as_millis() > self.timestamp.as_millis().saturating_add(self.ttl_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceFeedError {
    #[error("No price available for {0}")]
    NoPriceAvailable(AssetType),

    #[error("Latest {asset} price from {published:?} is stale at {requested:?}")]
    Stale {
        asset: AssetType,
        published: Timestamp,
        requested: Timestamp,
    },

    #[error("Non-positive price {0}")]
    InvalidPrice(Decimal),

    #[error("Confidence interval {confidence} too wide for price {price}")]
    LowConfidence { price: Decimal, confidence: Decimal },
}

/// Source of settlement prices.
pub trait PriceOracle {
    fn current_price(&self, asset: AssetType, at: Timestamp) -> Result<Price, PriceFeedError>;
}

/// In-memory oracle keeping a short history per asset.
#[derive(Debug, Clone)]
pub struct PriceBoard {
    history: HashMap<AssetType, VecDeque<PriceUpdate>>,
    max_history: usize,
    /// Reject reports whose confidence exceeds this fraction of price.
    max_confidence_ratio: Option<Decimal>,
    /// Upper bound on any report's TTL.
    max_ttl_ms: Option<i64>,
}

impl Default for PriceBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceBoard {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
            max_history: 100,
            max_confidence_ratio: None,
            max_ttl_ms: None,
        }
    }

    pub fn with_max_confidence_ratio(mut self, ratio: Decimal) -> Self {
        self.max_confidence_ratio = Some(ratio);
        self
    }

    pub fn with_max_ttl(mut self, ttl_ms: i64) -> Self {
        self.max_ttl_ms = Some(ttl_ms);
        self
    }

    pub fn submit(&mut self, mut update: PriceUpdate) -> Result<(), PriceFeedError> {
        if update.price <= Decimal::ZERO {
            return Err(PriceFeedError::InvalidPrice(update.price));
        }
        if let Some(max) = self.max_ttl_ms {
            update.ttl_ms = update.ttl_ms.min(max);
        }
        let history = self.history.entry(update.asset).or_default();
        // keep the history time-ordered even if reports arrive late
        let pos = history
            .iter()
            .rposition(|u| u.timestamp <= update.timestamp)
            .map_or(0, |i| i + 1);
        history.insert(pos, update);
        while history.len() > self.max_history {
            history.pop_front();
        }
        Ok(())
    }

    pub fn latest(&self, asset: AssetType) -> Option<&PriceUpdate> {
        self.history.get(&asset).and_then(|h| h.back())
    }
}

impl PriceOracle for PriceBoard {
    /// Newest report published at or before `at` that is not yet stale.
    fn current_price(&self, asset: AssetType, at: Timestamp) -> Result<Price, PriceFeedError> {
        let update = self
            .history
            .get(&asset)
            .and_then(|h| h.iter().rev().find(|u| u.timestamp <= at))
            .ok_or(PriceFeedError::NoPriceAvailable(asset))?;

        if update.is_stale(at) {
            return Err(PriceFeedError::Stale {
                asset,
                published: update.timestamp,
                requested: at,
            });
        }

        if let (Some(limit), Some(confidence)) = (self.max_confidence_ratio, update.confidence) {
            if confidence > update.price * limit {
                return Err(PriceFeedError::LowConfidence {
                    price: update.price,
                    confidence,
                });
            }
        }

        Price::new(update.price).ok_or(PriceFeedError::InvalidPrice(update.price))
    }
}
