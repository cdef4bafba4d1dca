//! Engine configuration options.

use crate::config::ConfigError;
use crate::escrow::EscrowPolicy;
use crate::payout::PayoutCurveKind;
use serde::{Deserialize, Serialize};

/// 24 hours.
pub const DEFAULT_POSITION_DURATION_MS: i64 = 24 * 60 * 60 * 1000;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Log every emitted event at debug level.
    pub verbose: bool,
    /// Lifetime of a position from the moment it is matched.
    pub position_duration_ms: i64,
    /// How much of a liquidity order is staked against a taker.
    pub escrow_policy: EscrowPolicy,
    /// Curve used unless a custom one is installed on the engine.
    pub payout_curve: PayoutCurveKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            verbose: false,
            position_duration_ms: DEFAULT_POSITION_DURATION_MS,
            escrow_policy: EscrowPolicy::default(),
            payout_curve: PayoutCurveKind::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reason = if self.max_events == 0 {
            "max_events must be positive"
        } else if self.position_duration_ms <= 0 {
            "position_duration_ms must be positive"
        } else if !self.escrow_policy.is_valid() {
            "escrow ratio must not be negative"
        } else {
            return Ok(());
        };
        Err(ConfigError::InvalidEngine {
            reason: reason.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"verbose": true, "payout_curve": "time_weighted"}"#).unwrap();
        assert!(cfg.verbose);
        assert_eq!(cfg.payout_curve, PayoutCurveKind::TimeWeighted);
        assert_eq!(cfg.position_duration_ms, DEFAULT_POSITION_DURATION_MS);
    }

    #[test]
    fn rejects_non_positive_duration() {
        let cfg = EngineConfig {
            position_duration_ms: 0,
            ..EngineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
