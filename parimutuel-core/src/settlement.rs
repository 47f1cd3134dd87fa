//! # Settlement Engine
//!
//! Pari-mutuel payouts: winners split the entire pool (losing stakes
//! included) in proportion to their share of the winning option's stake.
//!
//! Claims are incremental. A backer may withdraw any part of their remaining
//! stake at a time; each claim pays `floor(pool * claimed / option_total)`.
//! Rounding is per claim, so many small claims can pay marginally less than
//! a single full claim. The loss is at most one unit per claim and the sum of
//! all payouts never exceeds the pool.

use crate::{
    error::Result,
    events::LedgerEvent,
    host::{AccountId, Clock, ValueTransfer},
    market::MarketId,
    store::BetKey,
    Ledger, LedgerError,
};
use tracing::{debug, info, warn};

/// Proportional share of `pool` for `claim_amount` out of `option_total`.
///
/// Rounds down. Returns 0 when `option_total` is 0.
pub fn pro_rata_share(pool: u64, claim_amount: u64, option_total: u64) -> u128 {
    if option_total == 0 {
        return 0;
    }
    (pool as u128 * claim_amount as u128) / option_total as u128
}

impl<C: Clock, T: ValueTransfer> Ledger<C, T> {
    /// Winnings paid for claiming `claim_amount` of stake on `option`.
    ///
    /// Computes `floor(total_staked * claim_amount / option_total)`. Pure: no
    /// state is read beyond the market and the option total.
    pub fn compute_winnings(
        &self,
        market_id: MarketId,
        option: usize,
        claim_amount: u64,
    ) -> Result<u64> {
        let market = self.require_market(market_id)?;
        let option_total = self.store.option_total(market_id, option).ok_or_else(|| {
            LedgerError::NotFound(format!(
                "No stake recorded on option {option} of market {market_id}"
            ))
        })?;

        let winnings = pro_rata_share(
            market.total_staked,
            claim_amount,
            option_total.total_amount,
        );
        u64::try_from(winnings).map_err(|_| {
            LedgerError::Overflow(format!(
                "Winnings for {claim_amount} on market {market_id} exceed u64::MAX"
            ))
        })
    }

    /// Withdraw winnings for `amount_to_claim` units of the caller's stake on
    /// the winning option.
    ///
    /// # Returns
    /// The winnings transferred to the caller
    pub fn claim(
        &mut self,
        market_id: MarketId,
        option: usize,
        amount_to_claim: u64,
        caller: &AccountId,
    ) -> Result<u64> {
        let market = self.require_market(market_id)?;
        if *caller == self.custody {
            return Err(LedgerError::Unauthorized(
                "The custody account cannot claim".to_string(),
            ));
        }
        if !market.settled {
            return Err(LedgerError::MarketNotActive(format!(
                "Market {market_id} has not been settled"
            )));
        }
        let winning_option = market.winning_option;

        let key = BetKey::new(market_id, caller, option);
        let mut bet = self.store.bet(&key).copied().ok_or_else(|| {
            LedgerError::NotFound(format!(
                "No bet by {caller} on option {option} of market {market_id}"
            ))
        })?;

        if winning_option != Some(option) {
            return Err(LedgerError::Unauthorized(format!(
                "Option {option} did not win market {market_id}"
            )));
        }
        if amount_to_claim == 0 {
            return Err(LedgerError::InvalidInput(
                "Claim amount must be positive".to_string(),
            ));
        }
        let remaining = bet.unclaimed();
        if amount_to_claim > remaining {
            return Err(LedgerError::InsufficientBalance(format!(
                "Requested {amount_to_claim}, only {remaining} unclaimed"
            )));
        }

        let winnings = self.compute_winnings(market_id, option, amount_to_claim)?;
        debug!(market_id, backer = %caller, amount_to_claim, winnings, "winnings computed");

        if winnings > 0 {
            if let Err(e) = self.bank.transfer(winnings, &self.custody, caller) {
                warn!(market_id, backer = %caller, winnings, error = %e, "payout transfer rejected");
                return Err(LedgerError::Transfer(e.to_string()));
            }
        }

        bet.claimed_amount += amount_to_claim;
        if bet.claimed_amount == bet.amount {
            self.store.remove_bet(&key);
        } else {
            self.store.put_bet(key, bet);
        }

        info!(market_id, backer = %caller, option, amount_to_claim, winnings, "claim paid");
        self.events.push(LedgerEvent::Claimed {
            market_id,
            backer: caller.clone(),
            option,
            amount_claimed: amount_to_claim,
            winnings,
        });
        Ok(winnings)
    }

    /// Withdraw everything the caller has left to claim on `option`.
    pub fn claim_all(
        &mut self,
        market_id: MarketId,
        option: usize,
        caller: &AccountId,
    ) -> Result<u64> {
        self.require_market(market_id)?;
        let key = BetKey::new(market_id, caller, option);
        let unclaimed = self.store.bet(&key).map(|bet| bet.unclaimed()).ok_or_else(|| {
            LedgerError::NotFound(format!(
                "No bet by {caller} on option {option} of market {market_id}"
            ))
        })?;

        if unclaimed == 0 {
            return Err(LedgerError::AlreadyClaimed(format!(
                "Nothing left to claim on option {option} of market {market_id}"
            )));
        }

        self.claim(market_id, option, unclaimed, caller)
    }
}
