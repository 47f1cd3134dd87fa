//! Common test utilities for parimutuel-core tests.
//!
//! Ledgers here run on a [`ManualClock`] starting at height 0 and an
//! [`InMemoryBank`] with the requested opening balances.

use crate::host::{AccountId, InMemoryBank, ManualClock};
use crate::market::{Market, MarketId};
use crate::{Ledger, LedgerConfig};

pub type TestLedger = Ledger<ManualClock, InMemoryBank>;

pub fn creator() -> AccountId {
    AccountId::from("creator")
}

pub fn custody() -> AccountId {
    AccountId::from("ledger-custody")
}

pub fn alice() -> AccountId {
    AccountId::from("alice")
}

pub fn bob() -> AccountId {
    AccountId::from("bob")
}

pub fn carol() -> AccountId {
    AccountId::from("carol")
}

/// Ledger with default config and the given opening balances
pub fn funded_ledger(balances: &[(&str, u64)]) -> TestLedger {
    let mut bank = InMemoryBank::new();
    for (account, amount) in balances {
        bank.deposit(&AccountId::from(*account), *amount);
    }
    Ledger::new(LedgerConfig::default(), custody(), ManualClock::at(0), bank).unwrap()
}

/// Create a "Yes"/"No" market owned by [`creator`]
pub fn yes_no_market(ledger: &mut TestLedger, deadline: u64) -> MarketId {
    ledger
        .create_market(
            &creator(),
            "Will it rain tomorrow?".to_string(),
            vec!["Yes".to_string(), "No".to_string()],
            deadline,
        )
        .unwrap()
}

/// Unsettled "Yes"/"No" market record with no stakes
pub fn sample_market(id: MarketId) -> Market {
    Market {
        id,
        creator: creator(),
        description: "Will it rain tomorrow?".to_string(),
        options: vec!["Yes".to_string(), "No".to_string()],
        deadline: 100,
        total_staked: 0,
        settled: false,
        winning_option: None,
    }
}
