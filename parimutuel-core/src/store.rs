//! # Ledger Store
//!
//! Durable mapping from identifiers to [`Market`], [`Bet`] and [`OptionTotal`]
//! records, plus the market id counter. No business rules live here: the
//! lifecycle and settlement code validate before they write.

use crate::error::Result;
use crate::host::AccountId;
use crate::market::{Market, MarketId};
use crate::LedgerError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A backer's cumulative position on one option of one market
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Bet {
    /// Cumulative amount staked
    pub amount: u64,

    /// Cumulative amount already withdrawn, in stake units
    pub claimed_amount: u64,
}

impl Bet {
    /// Stake not yet claimed
    pub fn unclaimed(&self) -> u64 {
        self.amount.saturating_sub(self.claimed_amount)
    }
}

/// Identifies a [`Bet`]
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BetKey {
    pub market_id: MarketId,
    pub backer: AccountId,
    pub option: usize,
}

impl BetKey {
    pub fn new(market_id: MarketId, backer: &AccountId, option: usize) -> Self {
        Self {
            market_id,
            backer: backer.clone(),
            option,
        }
    }
}

/// Gross historical stake on one option. Never decremented.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OptionTotal {
    pub total_amount: u64,
}

/// In-memory record store for the ledger
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(into = "StoreSnapshot", try_from = "StoreSnapshot")]
pub struct LedgerStore {
    markets: BTreeMap<MarketId, Market>,
    bets: BTreeMap<BetKey, Bet>,
    option_totals: BTreeMap<(MarketId, usize), OptionTotal>,
    next_market_id: MarketId,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next market id. The counter only moves forward.
    pub fn allocate_market_id(&mut self) -> Result<MarketId> {
        let id = self.next_market_id;
        self.next_market_id = id
            .checked_add(1)
            .ok_or_else(|| LedgerError::Overflow("market id counter exhausted".to_string()))?;
        Ok(id)
    }

    /// The id the next created market will receive
    pub fn next_market_id(&self) -> MarketId {
        self.next_market_id
    }

    pub fn market(&self, id: MarketId) -> Option<&Market> {
        self.markets.get(&id)
    }

    pub fn put_market(&mut self, market: Market) {
        self.markets.insert(market.id, market);
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    pub fn bet(&self, key: &BetKey) -> Option<&Bet> {
        self.bets.get(key)
    }

    pub fn put_bet(&mut self, key: BetKey, bet: Bet) {
        self.bets.insert(key, bet);
    }

    pub fn remove_bet(&mut self, key: &BetKey) -> Option<Bet> {
        self.bets.remove(key)
    }

    /// All stored bets for one market
    pub fn bets_for_market(&self, market_id: MarketId) -> impl Iterator<Item = (&BetKey, &Bet)> {
        self.bets
            .iter()
            .filter(move |(key, _)| key.market_id == market_id)
    }

    pub fn option_total(&self, market_id: MarketId, option: usize) -> Option<&OptionTotal> {
        self.option_totals.get(&(market_id, option))
    }

    pub fn put_option_total(&mut self, market_id: MarketId, option: usize, total: OptionTotal) {
        self.option_totals.insert((market_id, option), total);
    }

    /// Check the data-model invariants across all records:
    /// - no stored market id at or above the counter
    /// - `winning_option` is set iff the market is settled, and is in range
    /// - option totals of a market sum to its `total_staked`
    /// - every bet belongs to a known option and has `claimed_amount <= amount <= option total`
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = self.markets.keys().next_back() {
            if *id >= self.next_market_id {
                return Err(corrupt(format!(
                    "market {id} is not below the id counter {}",
                    self.next_market_id
                )));
            }
        }

        let mut sums: BTreeMap<MarketId, u128> = BTreeMap::new();
        for (&(market_id, option), total) in &self.option_totals {
            self.check_option_ref(market_id, option)?;
            *sums.entry(market_id).or_insert(0) += total.total_amount as u128;
        }

        for market in self.markets.values() {
            if market.settled != market.winning_option.is_some() {
                return Err(corrupt(format!(
                    "market {} has settled={} but winning option {:?}",
                    market.id, market.settled, market.winning_option
                )));
            }
            if let Some(winner) = market.winning_option {
                if winner >= market.options.len() {
                    return Err(corrupt(format!(
                        "market {} winning option {winner} is out of range",
                        market.id
                    )));
                }
            }
            let sum = sums.get(&market.id).copied().unwrap_or(0);
            if sum != market.total_staked as u128 {
                return Err(corrupt(format!(
                    "market {} records {} staked but its options sum to {sum}",
                    market.id, market.total_staked
                )));
            }
        }

        for (key, bet) in &self.bets {
            self.check_option_ref(key.market_id, key.option)?;
            if bet.claimed_amount > bet.amount {
                return Err(corrupt(format!(
                    "bet by {} on market {} claims {} of {}",
                    key.backer, key.market_id, bet.claimed_amount, bet.amount
                )));
            }
            let option_total = self
                .option_total(key.market_id, key.option)
                .map_or(0, |total| total.total_amount);
            if bet.amount > option_total {
                return Err(corrupt(format!(
                    "bet by {} on market {} exceeds its option total {option_total}",
                    key.backer, key.market_id
                )));
            }
        }
        Ok(())
    }

    fn check_option_ref(&self, market_id: MarketId, option: usize) -> Result<()> {
        let market = self
            .market(market_id)
            .ok_or_else(|| corrupt(format!("record refers to unknown market {market_id}")))?;
        if option >= market.options.len() {
            return Err(corrupt(format!(
                "record refers to option {option} of market {market_id}, which has {}",
                market.options.len()
            )));
        }
        Ok(())
    }
}

fn corrupt(message: String) -> LedgerError {
    LedgerError::CorruptStore(message)
}

/// Flat, JSON-friendly form of [`LedgerStore`].
///
/// JSON maps need string keys, so composite keys are stored inline.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct StoreSnapshot {
    pub next_market_id: MarketId,
    pub markets: Vec<Market>,
    pub bets: Vec<BetRecord>,
    pub option_totals: Vec<OptionTotalRecord>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BetRecord {
    #[serde(flatten)]
    pub key: BetKey,
    #[serde(flatten)]
    pub bet: Bet,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OptionTotalRecord {
    pub market_id: MarketId,
    pub option: usize,
    pub total_amount: u64,
}

impl From<LedgerStore> for StoreSnapshot {
    fn from(store: LedgerStore) -> Self {
        Self {
            next_market_id: store.next_market_id,
            markets: store.markets.into_values().collect(),
            bets: store
                .bets
                .into_iter()
                .map(|(key, bet)| BetRecord { key, bet })
                .collect(),
            option_totals: store
                .option_totals
                .into_iter()
                .map(|((market_id, option), total)| OptionTotalRecord {
                    market_id,
                    option,
                    total_amount: total.total_amount,
                })
                .collect(),
        }
    }
}

impl TryFrom<StoreSnapshot> for LedgerStore {
    type Error = LedgerError;

    fn try_from(snapshot: StoreSnapshot) -> Result<Self> {
        let markets: BTreeMap<_, _> = snapshot
            .markets
            .into_iter()
            .map(|market| (market.id, market))
            .collect();

        // A hand-edited snapshot must not let the counter hand out a used id
        let floor = match markets.keys().next_back() {
            Some(id) => id
                .checked_add(1)
                .ok_or_else(|| corrupt(format!("market id {id} leaves no room for the counter")))?,
            None => 0,
        };

        let store = Self {
            next_market_id: snapshot.next_market_id.max(floor),
            markets,
            bets: snapshot
                .bets
                .into_iter()
                .map(|record| (record.key, record.bet))
                .collect(),
            option_totals: snapshot
                .option_totals
                .into_iter()
                .map(|record| {
                    (
                        (record.market_id, record.option),
                        OptionTotal {
                            total_amount: record.total_amount,
                        },
                    )
                })
                .collect(),
        };
        store.validate()?;
        Ok(store)
    }
}
