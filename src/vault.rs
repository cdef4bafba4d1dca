// 3.1 vault.rs: custody balances. one balance per trader that must always equal
// that trader's ledger total (locked + free). the engine only touches it in the
// same step as the matching ledger change.

use crate::types::{Quote, TraderId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vault {
    balances: HashMap<TraderId, Quote>,
}

impl Vault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, trader: TraderId) -> Quote {
        self.balances.get(&trader).copied().unwrap_or_default()
    }

    /// Sum of all balances. `None` on overflow.
    pub fn total(&self) -> Option<Quote> {
        self.balances
            .values()
            .try_fold(Quote::zero(), |acc, b| acc.checked_add(*b))
    }

    pub fn deposit(&mut self, trader: TraderId, amount: Quote) -> Result<Quote, VaultError> {
        if amount.is_negative() {
            return Err(VaultError::InvalidAmount(amount));
        }
        let next = self
            .balance(trader)
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.balances.insert(trader, next);
        Ok(next)
    }

    pub fn withdraw(&mut self, trader: TraderId, amount: Quote) -> Result<Quote, VaultError> {
        if amount.is_negative() {
            return Err(VaultError::InvalidAmount(amount));
        }
        let available = self.balance(trader);
        if available < amount {
            return Err(VaultError::InsufficientCustody {
                trader,
                requested: amount,
                available,
            });
        }
        let next = available.saturating_sub(amount);
        self.balances.insert(trader, next);
        Ok(next)
    }

    /// Move custody between two traders. Checks both sides before writing.
    pub fn transfer(&mut self, from: TraderId, to: TraderId, amount: Quote) -> Result<(), VaultError> {
        if amount.is_zero() || from == to {
            return Ok(());
        }
        if amount.is_negative() {
            return Err(VaultError::InvalidAmount(amount));
        }
        let available = self.balance(from);
        if available < amount {
            return Err(VaultError::InsufficientCustody {
                trader: from,
                requested: amount,
                available,
            });
        }
        let credited = self.balance(to).checked_add(amount).ok_or(VaultError::Overflow)?;
        self.balances.insert(from, available.saturating_sub(amount));
        self.balances.insert(to, credited);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VaultError {
    #[error("Insufficient custody for {trader}: requested {requested}, available {available}")]
    InsufficientCustody {
        trader: TraderId,
        requested: Quote,
        available: Quote,
    },

    #[error("Invalid amount {0}")]
    InvalidAmount(Quote),

    #[error("Custody overflow")]
    Overflow,
}
