//! Escrow allocation at match time.
//!
//! When a taker matches a liquidity order, the taker's stake is locked alongside
//! some share of the funder's already-locked order. The size of that share is
//! set by [`EscrowPolicy`].

use crate::types::Quote;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "ratio")]
pub enum EscrowPolicy {
    /// Funder stakes exactly the taker's amount. Escrow = 2 × amount.
    #[default]
    Symmetric,
    /// Funder stakes the whole liquidity order regardless of taker amount.
    FullOrder,
    /// Funder stakes `amount × ratio`.
    Ratio(Decimal),
}

impl EscrowPolicy {
    /// The funder's share of the escrow, or `None` if the order cannot cover it.
    pub fn funder_stake(&self, taker_amount: Quote, order_amount: Quote) -> Option<Quote> {
        let stake = match self {
            EscrowPolicy::Symmetric => taker_amount,
            EscrowPolicy::FullOrder => order_amount,
            EscrowPolicy::Ratio(ratio) => {
                if *ratio < Decimal::ZERO {
                    return None;
                }
                taker_amount.checked_mul(*ratio)?
            }
        };
        (stake <= order_amount).then_some(stake)
    }

    pub fn is_valid(&self) -> bool {
        match self {
            EscrowPolicy::Ratio(ratio) => *ratio >= Decimal::ZERO,
            _ => true,
        }
    }
}
