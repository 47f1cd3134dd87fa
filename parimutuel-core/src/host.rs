//! # Host Interfaces
//!
//! The ledger never authenticates callers, keeps time or moves funds itself.
//! Those concerns belong to the surrounding execution environment and are
//! reached through the traits in this module.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Opaque, pre-authenticated account identifier.
///
/// The ledger only compares identifiers for equality (e.g. creator match).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Monotonic height counter used as the deadline clock.
pub trait Clock {
    /// Current height. Never decreases between calls.
    fn current_height(&self) -> u64;
}

/// Failure reported by a [`ValueTransfer`] implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    /// Source account cannot cover the amount
    #[error("account {account} holds {available}, needs {needed}")]
    InsufficientFunds {
        account: AccountId,
        needed: u64,
        available: u64,
    },

    /// Zero-value transfers are refused
    #[error("transfer amount must be positive")]
    ZeroAmount,

    /// Destination balance would overflow
    #[error("account {0} balance would overflow")]
    Overflow(AccountId),
}

/// Atomic, all-or-nothing movement of value between accounts.
///
/// An `Err` must leave every balance untouched.
pub trait ValueTransfer {
    fn transfer(
        &mut self,
        amount: u64,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), TransferError>;
}

/// Height clock advanced by hand. Used by the CLI host and tests.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ManualClock {
    height: u64,
}

impl ManualClock {
    pub fn at(height: u64) -> Self {
        Self { height }
    }

    /// Move forward by `blocks`, saturating at `u64::MAX`
    pub fn advance(&mut self, blocks: u64) {
        self.height = self.height.saturating_add(blocks);
    }

    /// Jump to `height`; ignored if it would move the clock backwards
    pub fn set(&mut self, height: u64) {
        self.height = self.height.max(height);
    }
}

impl Clock for ManualClock {
    fn current_height(&self) -> u64 {
        self.height
    }
}

/// Balance map implementing [`ValueTransfer`] in memory.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct InMemoryBank {
    balances: BTreeMap<AccountId, u64>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint `amount` into `account`, saturating at `u64::MAX`
    pub fn deposit(&mut self, account: &AccountId, amount: u64) {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn balance(&self, account: &AccountId) -> u64 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn balances(&self) -> impl Iterator<Item = (&AccountId, u64)> {
        self.balances.iter().map(|(account, amount)| (account, *amount))
    }

    /// Sum of all balances
    pub fn total_supply(&self) -> u128 {
        self.balances.values().map(|v| *v as u128).sum()
    }
}

impl ValueTransfer for InMemoryBank {
    fn transfer(
        &mut self,
        amount: u64,
        from: &AccountId,
        to: &AccountId,
    ) -> Result<(), TransferError> {
        if amount == 0 {
            return Err(TransferError::ZeroAmount);
        }

        let available = self.balance(from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                needed: amount,
                available,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance(to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Overflow(to.clone()))?;

        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}
