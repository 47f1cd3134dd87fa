//! # Parimutuel Core
//!
//! Accounting and settlement core for pari-mutuel prediction markets.
//!
//! Accounts stake value on one of several named options of a market. Once the
//! market's creator declares the winning option, the whole pool is shared
//! among backers of that option in proportion to their stake:
//! - Markets move `Open` -> `Closed` -> `Settled`, driven by a height clock
//! - Stakes accumulate per (market, backer, option)
//! - Winners withdraw incrementally; each claim is rounded down and no stake
//!   unit can be claimed twice
//!
//! Identity, time and value transfer are supplied by the host through the
//! [`host`] traits.
//!
//! ## Examples
//!
//! ```rust
//! use parimutuel_core::{AccountId, InMemoryBank, Ledger, LedgerConfig, ManualClock};
//!
//! let creator = AccountId::from("creator");
//! let alice = AccountId::from("alice");
//!
//! let mut bank = InMemoryBank::new();
//! bank.deposit(&alice, 1_000);
//!
//! let mut ledger = Ledger::new(
//!     LedgerConfig::default(),
//!     AccountId::from("custody"),
//!     ManualClock::at(0),
//!     bank,
//! )?;
//!
//! let market_id = ledger.create_market(
//!     &creator,
//!     "Will it rain tomorrow?".to_string(),
//!     vec!["Yes".to_string(), "No".to_string()],
//!     100,
//! )?;
//! ledger.stake(market_id, 0, 500, &alice)?;
//!
//! ledger.clock_mut().advance(100);
//! ledger.settle(market_id, 0, &creator)?;
//! assert_eq!(ledger.claim_all(market_id, 0, &alice)?, 500);
//! Ok::<(), parimutuel_core::LedgerError>(())
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod ledger;
pub mod market;
pub mod settlement;
pub mod store;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, Result};
pub use events::LedgerEvent;
pub use host::{AccountId, Clock, InMemoryBank, ManualClock, TransferError, ValueTransfer};
pub use ledger::{Ledger, LedgerParts};
pub use market::{Market, MarketId, MarketState};
pub use store::{Bet, BetKey, LedgerStore, OptionTotal};

/// Maximum number of options a market may offer
pub const MAX_OPTIONS: usize = 10;
