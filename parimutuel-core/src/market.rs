//! # Market Lifecycle
//!
//! The [`Market`] record and the state machine that governs it:
//!
//! ```text
//! Open --(height reaches deadline)--> Closed --(creator settles)--> Settled
//! ```
//!
//! Staking is only accepted while `Open`. Settlement is only accepted while
//! `Closed`, and only from the market's creator.

use crate::{
    error::Result,
    events::LedgerEvent,
    host::{AccountId, Clock, ValueTransfer},
    store::BetKey,
    Ledger, LedgerError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Sequential market identifier, starting at 0
pub type MarketId = u64;

/// A pari-mutuel market over a fixed list of named options
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Market {
    /// Sequential market identifier
    pub id: MarketId,

    /// Account allowed to settle the market
    pub creator: AccountId,

    /// Market question/description
    pub description: String,

    /// Ordered outcome labels; bets refer to them by index
    pub options: Vec<String>,

    /// Height at which staking stops and settlement becomes possible
    pub deadline: u64,

    /// Sum of every stake ever placed on this market
    pub total_staked: u64,

    /// Whether the market has been settled
    pub settled: bool,

    /// Index of the winning option (if settled)
    pub winning_option: Option<usize>,
}

/// Lifecycle state of a market at a given height
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketState {
    /// Before the deadline, accepting stakes
    Open,
    /// At or past the deadline, awaiting settlement
    Closed,
    /// Winning option declared
    Settled,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open - Accepting stakes"),
            Self::Closed => write!(f, "Closed - Awaiting settlement"),
            Self::Settled => write!(f, "Settled - Claims open"),
        }
    }
}

impl Market {
    /// State of the market when the clock reads `height`
    pub fn state_at(&self, height: u64) -> MarketState {
        if self.settled {
            MarketState::Settled
        } else if height >= self.deadline {
            MarketState::Closed
        } else {
            MarketState::Open
        }
    }

    /// Index of the option labelled `label`
    pub fn option_index(&self, label: &str) -> Option<usize> {
        self.options.iter().position(|option| option == label)
    }

    pub fn option_label(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    /// Label of the winning option (if settled)
    pub fn winning_label(&self) -> Option<&str> {
        self.winning_option.and_then(|index| self.option_label(index))
    }

    fn check_option(&self, option: usize) -> Result<()> {
        if option >= self.options.len() {
            return Err(LedgerError::InvalidInput(format!(
                "Option index {option} out of range for market {} ({} options)",
                self.id,
                self.options.len()
            )));
        }
        Ok(())
    }
}

impl<C: Clock, T: ValueTransfer> Ledger<C, T> {
    /// Create a new market owned by `creator`.
    ///
    /// # Arguments
    /// * `creator` - Account that will be allowed to settle the market
    /// * `description` - Non-empty question text, within the configured bound
    /// * `options` - Between 1 and `max_options` distinct labels
    /// * `deadline` - Height strictly greater than the current height
    ///
    /// # Returns
    /// The id assigned to the new market
    pub fn create_market(
        &mut self,
        creator: &AccountId,
        description: String,
        options: Vec<String>,
        deadline: u64,
    ) -> Result<MarketId> {
        self.config.check_description(&description)?;
        self.config.check_options(&options)?;

        let height = self.clock.current_height();
        if deadline <= height {
            return Err(LedgerError::InvalidInput(format!(
                "Deadline {deadline} must be after current height {height}"
            )));
        }

        let id = self.store.allocate_market_id()?;
        self.store.put_market(Market {
            id,
            creator: creator.clone(),
            description,
            options: options.clone(),
            deadline,
            total_staked: 0,
            settled: false,
            winning_option: None,
        });

        info!(market_id = id, creator = %creator, deadline, "market created");
        self.events.push(LedgerEvent::MarketCreated {
            market_id: id,
            creator: creator.clone(),
            options,
            deadline,
        });
        Ok(id)
    }

    /// Stake `amount` from `caller` on `option` of an open market.
    ///
    /// Funds move into custody first; the bet, option total and market total
    /// are only written once the transfer has succeeded.
    pub fn stake(
        &mut self,
        market_id: MarketId,
        option: usize,
        amount: u64,
        caller: &AccountId,
    ) -> Result<()> {
        let height = self.clock.current_height();
        let mut market = self.require_market(market_id)?.clone();

        // A self-transfer into custody moves nothing but would still count
        if *caller == self.custody {
            return Err(LedgerError::Unauthorized(
                "The custody account cannot stake".to_string(),
            ));
        }
        if market.settled {
            return Err(LedgerError::AlreadySettled(format!(
                "Market {market_id} no longer accepts stakes"
            )));
        }
        if height >= market.deadline {
            return Err(LedgerError::MarketNotActive(format!(
                "Market {market_id} closed at height {}, current height is {height}",
                market.deadline
            )));
        }
        market.check_option(option)?;
        if amount == 0 {
            return Err(LedgerError::InvalidInput(
                "Stake amount must be positive".to_string(),
            ));
        }

        let key = BetKey::new(market_id, caller, option);
        let mut bet = self.store.bet(&key).copied().unwrap_or_default();
        let mut option_total = self
            .store
            .option_total(market_id, option)
            .copied()
            .unwrap_or_default();

        market.total_staked = checked_add(market.total_staked, amount, "market total")?;
        option_total.total_amount = checked_add(option_total.total_amount, amount, "option total")?;
        bet.amount = checked_add(bet.amount, amount, "bet amount")?;

        if let Err(e) = self.bank.transfer(amount, caller, &self.custody) {
            warn!(market_id, backer = %caller, amount, error = %e, "stake transfer rejected");
            return Err(LedgerError::Transfer(e.to_string()));
        }

        self.store.put_bet(key, bet);
        self.store.put_option_total(market_id, option, option_total);
        self.store.put_market(market);

        debug!(market_id, backer = %caller, option, amount, "stake recorded");
        self.events.push(LedgerEvent::Staked {
            market_id,
            backer: caller.clone(),
            option,
            amount,
        });
        Ok(())
    }

    /// Declare `winning_option` for a closed market. Creator only, once.
    pub fn settle(
        &mut self,
        market_id: MarketId,
        winning_option: usize,
        caller: &AccountId,
    ) -> Result<()> {
        let height = self.clock.current_height();
        let mut market = self.require_market(market_id)?.clone();

        if market.creator != *caller {
            return Err(LedgerError::Unauthorized(format!(
                "Only the creator of market {market_id} can settle it"
            )));
        }
        if height < market.deadline {
            return Err(LedgerError::MarketNotActive(format!(
                "Market {market_id} cannot be settled before height {}",
                market.deadline
            )));
        }
        if market.settled {
            return Err(LedgerError::AlreadySettled(format!(
                "Market {market_id} was already settled"
            )));
        }
        market.check_option(winning_option)?;

        market.settled = true;
        market.winning_option = Some(winning_option);
        self.store.put_market(market);

        info!(market_id, winning_option, "market settled");
        self.events.push(LedgerEvent::Settled {
            market_id,
            winning_option,
        });
        Ok(())
    }
}

fn checked_add(current: u64, amount: u64, what: &str) -> Result<u64> {
    current
        .checked_add(amount)
        .ok_or_else(|| LedgerError::Overflow(format!("{what} would exceed u64::MAX")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::ErrorKind;

    #[test]
    fn test_create_market_assigns_sequential_ids() {
        let mut ledger = funded_ledger(&[]);
        let first = yes_no_market(&mut ledger, 100);
        let second = yes_no_market(&mut ledger, 100);
        assert_eq!(first, 0);
        assert_eq!(second, 1);

        let market = ledger.get_market(first).unwrap();
        assert_eq!(market.creator, creator());
        assert_eq!(market.total_staked, 0);
        assert!(!market.settled);
        assert_eq!(market.winning_option, None);
        assert_eq!(market.state_at(0), MarketState::Open);
    }

    #[test]
    fn test_create_market_validation() {
        let mut ledger = funded_ledger(&[]);
        ledger.clock_mut().set(10);

        let cases = [
            ("", vec!["Yes", "No"], 20),
            ("Question?", vec![], 20),
            ("Question?", vec!["Yes", "No"], 10),
            ("Question?", vec!["Yes", "No"], 5),
            ("Question?", vec!["Yes", "Yes"], 20),
        ];
        for (description, options, deadline) in cases {
            let err = ledger
                .create_market(
                    &creator(),
                    description.to_string(),
                    options.into_iter().map(String::from).collect(),
                    deadline,
                )
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }

        // Failed creations do not consume ids
        assert_eq!(yes_no_market(&mut ledger, 20), 0);
    }

    #[test]
    fn test_stake_accumulates_bet_and_totals() {
        let mut ledger = funded_ledger(&[("alice", 1_000)]);
        let id = yes_no_market(&mut ledger, 100);

        ledger.stake(id, 1, 300, &alice()).unwrap();
        ledger.stake(id, 1, 200, &alice()).unwrap();
        ledger.stake(id, 0, 100, &alice()).unwrap();

        let bet = ledger.get_bet(id, &alice(), 1).unwrap();
        assert_eq!(bet.amount, 500);
        assert_eq!(bet.claimed_amount, 0);
        assert_eq!(ledger.get_option_total(id, 1).unwrap().total_amount, 500);
        assert_eq!(ledger.get_option_total(id, 0).unwrap().total_amount, 100);
        assert_eq!(ledger.get_market(id).unwrap().total_staked, 600);
        assert_eq!(ledger.bank().balance(&alice()), 400);
        assert_eq!(ledger.bank().balance(&custody()), 600);
    }

    #[test]
    fn test_stake_rejections_leave_ledger_unchanged() {
        let mut ledger = funded_ledger(&[("alice", 1_000)]);
        let id = yes_no_market(&mut ledger, 100);
        ledger.stake(id, 0, 100, &alice()).unwrap();
        let before = ledger.store().clone();

        let err = ledger.stake(99, 0, 10, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = ledger.stake(id, 2, 10, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = ledger.stake(id, 0, 0, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        // Transfer failure aborts without writes
        let err = ledger.stake(id, 0, 5_000, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transfer);

        ledger.clock_mut().set(100);
        let err = ledger.stake(id, 0, 10, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarketNotActive);

        ledger.settle(id, 0, &creator()).unwrap();
        let err = ledger.stake(id, 0, 10, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadySettled);

        assert_eq!(ledger.get_market(id).unwrap().total_staked, 100);
        let key = BetKey::new(id, &alice(), 0);
        assert_eq!(ledger.store().bet(&key), before.bet(&key));
        assert_eq!(ledger.bank().balance(&alice()), 900);
    }

    #[test]
    fn test_stake_overflow_is_rejected_before_transfer() {
        let mut ledger = funded_ledger(&[("alice", u64::MAX), ("bob", 10)]);
        let id = yes_no_market(&mut ledger, 100);
        ledger.stake(id, 0, u64::MAX, &alice()).unwrap();

        let err = ledger.stake(id, 1, 10, &bob()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(ledger.bank().balance(&bob()), 10);
        assert!(ledger.get_option_total(id, 1).is_none());
    }

    #[test]
    fn test_custody_account_cannot_stake() {
        let mut ledger = funded_ledger(&[("alice", 100), ("ledger-custody", 100)]);
        let id = yes_no_market(&mut ledger, 100);
        ledger.stake(id, 0, 100, &alice()).unwrap();

        let err = ledger.stake(id, 0, 100, &custody()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(ledger.get_market(id).unwrap().total_staked, 100);
        assert_eq!(ledger.get_option_total(id, 0).unwrap().total_amount, 100);
        assert!(ledger.get_bet(id, &custody(), 0).is_none());

        // Alice alone backed the winner, so she takes back exactly the pool
        ledger.clock_mut().set(100);
        ledger.settle(id, 0, &creator()).unwrap();
        assert_eq!(ledger.claim_all(id, 0, &alice()).unwrap(), 100);
        assert_eq!(ledger.bank().balance(&alice()), 100);
        assert_eq!(ledger.bank().balance(&custody()), 100);
    }

    #[test]
    fn test_settle_gates() {
        let mut ledger = funded_ledger(&[]);
        let id = yes_no_market(&mut ledger, 100);

        let err = ledger.settle(id, 0, &alice()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        let err = ledger.settle(id, 0, &creator()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MarketNotActive);

        ledger.clock_mut().set(100);
        assert_eq!(ledger.market_state(id), Some(MarketState::Closed));

        let err = ledger.settle(id, 2, &creator()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = ledger.settle(7, 0, &creator()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        ledger.settle(id, 1, &creator()).unwrap();
        let market = ledger.get_market(id).unwrap();
        assert!(market.settled);
        assert_eq!(market.winning_option, Some(1));
        assert_eq!(market.winning_label(), Some("No"));
        assert_eq!(ledger.market_state(id), Some(MarketState::Settled));
    }

    #[test]
    fn test_second_settlement_keeps_first_outcome() {
        let mut ledger = funded_ledger(&[]);
        let id = yes_no_market(&mut ledger, 100);
        ledger.clock_mut().set(150);
        ledger.settle(id, 0, &creator()).unwrap();

        let err = ledger.settle(id, 1, &creator()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadySettled);
        assert_eq!(ledger.get_market(id).unwrap().winning_option, Some(0));
    }

    #[test]
    fn test_state_display_and_lookup() {
        let market = sample_market(3);
        assert_eq!(market.option_index("No"), Some(1));
        assert_eq!(market.option_index("Maybe"), None);
        assert_eq!(market.state_at(market.deadline - 1), MarketState::Open);
        assert_eq!(market.state_at(market.deadline), MarketState::Closed);
        assert_eq!(
            MarketState::Closed.to_string(),
            "Closed - Awaiting settlement"
        );
    }
}
