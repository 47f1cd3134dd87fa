//! # Ledger
//!
//! [`Ledger`] ties the record store to the host's clock and value-transfer
//! primitive. Every mutating operation takes `&mut self`, so operations on one
//! ledger are serialized; hosts sharing a ledger across threads wrap it in a
//! lock held for the whole operation.
//!
//! Lifecycle operations live in [`crate::market`], payouts in
//! [`crate::settlement`].

use crate::{
    config::LedgerConfig,
    error::Result,
    events::LedgerEvent,
    host::{AccountId, Clock, ValueTransfer},
    market::{Market, MarketId, MarketState},
    store::{Bet, BetKey, LedgerStore, OptionTotal},
    LedgerError,
};

/// Pari-mutuel ledger over a clock `C` and a transfer primitive `T`
#[derive(Debug)]
pub struct Ledger<C, T> {
    pub(crate) config: LedgerConfig,
    pub(crate) store: LedgerStore,
    /// Account holding staked value until it is paid out
    pub(crate) custody: AccountId,
    pub(crate) clock: C,
    pub(crate) bank: T,
    pub(crate) events: Vec<LedgerEvent>,
}

/// Owned pieces of a [`Ledger`], for hosts that persist them separately
#[derive(Debug)]
pub struct LedgerParts<C, T> {
    pub config: LedgerConfig,
    pub store: LedgerStore,
    pub custody: AccountId,
    pub clock: C,
    pub bank: T,
}

impl<C: Clock, T: ValueTransfer> Ledger<C, T> {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig, custody: AccountId, clock: C, bank: T) -> Result<Self> {
        Self::with_store(config, LedgerStore::new(), custody, clock, bank)
    }

    /// Resume a ledger from previously stored records.
    ///
    /// Fails with `CorruptStore` when the records break a ledger invariant.
    pub fn with_store(
        config: LedgerConfig,
        store: LedgerStore,
        custody: AccountId,
        clock: C,
        bank: T,
    ) -> Result<Self> {
        config.validate()?;
        store.validate()?;
        Ok(Self {
            config,
            store,
            custody,
            clock,
            bank,
            events: Vec::new(),
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    #[cfg(test)]
    pub(crate) fn store_mut(&mut self) -> &mut LedgerStore {
        &mut self.store
    }

    pub fn custody(&self) -> &AccountId {
        &self.custody
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn bank(&self) -> &T {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut T {
        &mut self.bank
    }

    /// Current height as reported by the clock
    pub fn height(&self) -> u64 {
        self.clock.current_height()
    }

    /// Events recorded since the last call to [`Ledger::take_events`]
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Drain the event journal
    pub fn take_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn into_parts(self) -> LedgerParts<C, T> {
        LedgerParts {
            config: self.config,
            store: self.store,
            custody: self.custody,
            clock: self.clock,
            bank: self.bank,
        }
    }

    pub fn get_market(&self, market_id: MarketId) -> Option<&Market> {
        self.store.market(market_id)
    }

    pub fn get_bet(&self, market_id: MarketId, backer: &AccountId, option: usize) -> Option<Bet> {
        self.store
            .bet(&BetKey::new(market_id, backer, option))
            .copied()
    }

    pub fn get_option_total(&self, market_id: MarketId, option: usize) -> Option<OptionTotal> {
        self.store.option_total(market_id, option).copied()
    }

    /// Stake the backer has not yet claimed, or `None` without a bet record
    pub fn get_unclaimed_amount(
        &self,
        market_id: MarketId,
        backer: &AccountId,
        option: usize,
    ) -> Option<u64> {
        self.get_bet(market_id, backer, option)
            .map(|bet| bet.unclaimed())
    }

    /// Lifecycle state of a market at the current height
    pub fn market_state(&self, market_id: MarketId) -> Option<MarketState> {
        let height = self.height();
        self.get_market(market_id)
            .map(|market| market.state_at(height))
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.store.markets()
    }

    /// Gross stake per option, in option order (0 where nothing was staked)
    pub fn option_totals(&self, market_id: MarketId) -> Result<Vec<u64>> {
        let market = self.require_market(market_id)?;
        Ok((0..market.options.len())
            .map(|option| {
                self.store
                    .option_total(market_id, option)
                    .map_or(0, |total| total.total_amount)
            })
            .collect())
    }

    pub(crate) fn require_market(&self, market_id: MarketId) -> Result<&Market> {
        self.store
            .market(market_id)
            .ok_or_else(|| LedgerError::NotFound(format!("Market {market_id} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{InMemoryBank, ManualClock};
    use crate::test_utils::*;
    use crate::ErrorKind;

    #[test]
    fn test_rejects_invalid_config() {
        let config = LedgerConfig {
            max_options: 0,
            ..LedgerConfig::default()
        };
        let err = Ledger::new(config, custody(), ManualClock::default(), InMemoryBank::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_accessors_report_absence() {
        let ledger = funded_ledger(&[]);
        assert!(ledger.get_market(0).is_none());
        assert!(ledger.get_bet(0, &alice(), 0).is_none());
        assert!(ledger.get_option_total(0, 0).is_none());
        assert!(ledger.get_unclaimed_amount(0, &alice(), 0).is_none());
        assert!(ledger.market_state(0).is_none());
        assert_eq!(ledger.option_totals(0).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_option_totals_in_option_order() {
        let mut ledger = funded_ledger(&[("alice", 100), ("bob", 100)]);
        let id = ledger
            .create_market(
                &creator(),
                "Which color?".to_string(),
                vec!["Red".into(), "Green".into(), "Blue".into()],
                10,
            )
            .unwrap();
        ledger.stake(id, 2, 30, &alice()).unwrap();
        ledger.stake(id, 0, 20, &bob()).unwrap();
        ledger.stake(id, 2, 5, &bob()).unwrap();

        assert_eq!(ledger.option_totals(id).unwrap(), vec![20, 0, 35]);
        assert_eq!(ledger.markets().count(), 1);
    }

    #[test]
    fn test_events_journal_and_drain() {
        let mut ledger = funded_ledger(&[("alice", 100)]);
        let id = yes_no_market(&mut ledger, 10);
        ledger.stake(id, 0, 40, &alice()).unwrap();
        let _ = ledger.stake(id, 5, 40, &alice());

        let events = ledger.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], LedgerEvent::MarketCreated { market_id: 0, .. }));
        assert!(matches!(events[1], LedgerEvent::Staked { amount: 40, .. }));
        assert!(ledger.events().is_empty());
    }

    #[test]
    fn test_resume_from_parts() {
        let mut ledger = funded_ledger(&[("alice", 100)]);
        let id = yes_no_market(&mut ledger, 10);
        ledger.stake(id, 1, 60, &alice()).unwrap();

        let parts = ledger.into_parts();
        let mut resumed =
            Ledger::with_store(parts.config, parts.store, parts.custody, parts.clock, parts.bank)
                .unwrap();
        assert_eq!(resumed.get_market(id).unwrap().total_staked, 60);
        assert_eq!(yes_no_market(&mut resumed, 10), 1);
    }

    #[test]
    fn test_resume_rejects_inconsistent_store() {
        let mut store = LedgerStore::new();
        let id = store.allocate_market_id().unwrap();
        let mut market = sample_market(id);
        market.total_staked = 50;
        store.put_market(market);

        let err = Ledger::with_store(
            LedgerConfig::default(),
            store,
            custody(),
            ManualClock::at(0),
            InMemoryBank::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptStore);
    }
}
