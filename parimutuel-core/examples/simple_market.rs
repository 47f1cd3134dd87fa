//! Simple prediction market example
//!
//! This example demonstrates creating a market, placing stakes, settling it
//! and withdrawing winnings in several partial claims.

use anyhow::Result;
use parimutuel_core::{
    utils::format_amount, AccountId, InMemoryBank, Ledger, LedgerConfig, ManualClock,
};

fn main() -> Result<()> {
    println!("🎯 Simple Pari-mutuel Market Example");
    println!("═══════════════════════════════════\n");

    let creator = AccountId::from("oracle-desk");
    let alice = AccountId::from("alice");
    let bob = AccountId::from("bob");
    let carol = AccountId::from("carol");

    let mut bank = InMemoryBank::new();
    for account in [&alice, &bob, &carol] {
        bank.deposit(account, 1_000_000);
    }

    let mut ledger = Ledger::new(
        LedgerConfig::default(),
        AccountId::from("custody"),
        ManualClock::at(0),
        bank,
    )?;

    // 1. Create a new market
    println!("1. Creating a new market...");
    let market_id = ledger.create_market(
        &creator,
        "Will it rain tomorrow in San Francisco?".to_string(),
        vec!["Yes".to_string(), "No".to_string()],
        144,
    )?;
    let market = ledger
        .get_market(market_id)
        .ok_or_else(|| anyhow::anyhow!("market {market_id} missing"))?;
    println!("   Market ID: {}", market.id);
    println!("   Question: {}", market.description);
    println!("   Options: {}", market.options.join(" / "));
    println!("   Deadline: height {}", market.deadline);
    println!();

    // 2. Stakes
    println!("2. Placing stakes...");
    ledger.stake(market_id, 0, 100_000, &alice)?;
    ledger.stake(market_id, 1, 200_000, &bob)?;
    ledger.stake(market_id, 0, 50_000, &carol)?;
    let totals = ledger.option_totals(market_id)?;
    println!("   Yes: {} | No: {}", format_amount(totals[0]), format_amount(totals[1]));
    println!();

    // 3. Settlement
    println!("3. Advancing past the deadline and settling on 'Yes'...");
    ledger.clock_mut().advance(144);
    ledger.settle(market_id, 0, &creator)?;
    if let Some(state) = ledger.market_state(market_id) {
        println!("   Status: {state}");
    }
    println!();

    // 4. Claims
    println!("4. Claiming winnings...");
    let first = ledger.claim(market_id, 0, 40_000, &alice)?;
    let rest = ledger.claim_all(market_id, 0, &alice)?;
    println!("   Alice: {} + {}", format_amount(first), format_amount(rest));
    let carol_paid = ledger.claim_all(market_id, 0, &carol)?;
    println!("   Carol: {}", format_amount(carol_paid));
    println!(
        "   Left in custody: {}",
        format_amount(ledger.bank().balance(ledger.custody()))
    );

    Ok(())
}
