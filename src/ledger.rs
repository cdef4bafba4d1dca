//! Trader ledger and fund locking.
//!
//! Each trader has a free balance it can commit and a locked balance backing its
//! open orders and positions. Ledger changes never touch custody on their own;
//! the engine pairs every balance change with the matching [`Vault`](crate::vault::Vault)
//! update before committing either.

use crate::order::OrderId;
use crate::position::PositionId;
use crate::types::{AssetType, Quote, TraderId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A record a trader owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecordId {
    Order(AssetType, OrderId),
    Position(PositionId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraderLedger {
    pub trader: TraderId,
    pub locked_funds: Quote,
    pub free_funds: Quote,
    pub owned_ids: BTreeSet<RecordId>,
}

impl TraderLedger {
    pub fn new(trader: TraderId, initial_funds: Quote) -> Self {
        Self {
            trader,
            locked_funds: Quote::zero(),
            free_funds: initial_funds,
            owned_ids: BTreeSet::new(),
        }
    }

    pub fn total(&self) -> Option<Quote> {
        self.locked_funds.checked_add(self.free_funds)
    }

    /// Move `amount` from free to locked.
    pub fn lock(&mut self, amount: Quote) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        if self.free_funds < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.free_funds,
            });
        }
        let locked = self.locked_funds.checked_add(amount).ok_or(LedgerError::Overflow)?;
        self.free_funds = self.free_funds.saturating_sub(amount);
        self.locked_funds = locked;
        Ok(())
    }

    /// Move up to `amount` from locked back to free. Clamped at the locked
    /// balance; returns what was actually moved.
    pub fn unlock(&mut self, amount: Quote) -> Result<Quote, LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        let moved = amount.min(self.locked_funds);
        let free = self.free_funds.checked_add(moved).ok_or(LedgerError::Overflow)?;
        self.locked_funds = self.locked_funds.saturating_sub(moved);
        self.free_funds = free;
        Ok(moved)
    }

    /// Drop `amount` from the locked balance without returning it to free.
    /// Used when a settled stake leaves this trader.
    pub fn release_locked(&mut self, amount: Quote) -> Result<(), LedgerError> {
        if amount > self.locked_funds {
            return Err(LedgerError::InsufficientLocked {
                requested: amount,
                locked: self.locked_funds,
            });
        }
        self.locked_funds = self.locked_funds.saturating_sub(amount);
        Ok(())
    }

    pub fn credit_free(&mut self, amount: Quote) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        self.free_funds = self.free_funds.checked_add(amount).ok_or(LedgerError::Overflow)?;
        Ok(())
    }

    pub fn debit_free(&mut self, amount: Quote) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeAmount(amount));
        }
        if self.free_funds < amount {
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available: self.free_funds,
            });
        }
        self.free_funds = self.free_funds.saturating_sub(amount);
        Ok(())
    }

    pub fn add_record(&mut self, id: RecordId) {
        self.owned_ids.insert(id);
    }

    pub fn remove_record(&mut self, id: &RecordId) {
        self.owned_ids.remove(id);
    }

    pub fn owns(&self, id: &RecordId) -> bool {
        self.owned_ids.contains(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: Quote, available: Quote },

    #[error("Insufficient locked funds: requested {requested}, locked {locked}")]
    InsufficientLocked { requested: Quote, locked: Quote },

    #[error("Negative amount {0}")]
    NegativeAmount(Quote),

    #[error("Balance overflow")]
    Overflow,
}
