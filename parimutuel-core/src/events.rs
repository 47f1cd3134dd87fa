//! Events recorded by the ledger after each successful mutation.

use crate::{host::AccountId, market::MarketId};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    MarketCreated {
        market_id: MarketId,
        creator: AccountId,
        options: Vec<String>,
        deadline: u64,
    },
    Staked {
        market_id: MarketId,
        backer: AccountId,
        option: usize,
        amount: u64,
    },
    Settled {
        market_id: MarketId,
        winning_option: usize,
    },
    Claimed {
        market_id: MarketId,
        backer: AccountId,
        option: usize,
        /// Stake units withdrawn
        amount_claimed: u64,
        /// Value transferred out of custody
        winnings: u64,
    },
}

impl LedgerEvent {
    pub fn market_id(&self) -> MarketId {
        match self {
            Self::MarketCreated { market_id, .. }
            | Self::Staked { market_id, .. }
            | Self::Settled { market_id, .. }
            | Self::Claimed { market_id, .. } => *market_id,
        }
    }
}
