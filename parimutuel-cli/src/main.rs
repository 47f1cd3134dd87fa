//! # Parimutuel CLI
//!
//! Command-line host for the pari-mutuel prediction market ledger. Keeps the
//! ledger, a simulated bank and a manual height clock in a JSON state file.

mod state;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use parimutuel_core::{
    utils::{format_amount, parse_options},
    AccountId, LedgerConfig, LedgerEvent, MarketId,
};
use tracing::{debug, Level};

use crate::state::{HostLedger, HostState};

#[derive(Parser)]
#[command(name = "parimutuel")]
#[command(about = "Pari-mutuel prediction market ledger")]
#[command(version)]
struct Cli {
    /// State file holding the ledger, balances and clock
    #[arg(long, global = true, default_value = "parimutuel-state.json")]
    state: PathBuf,

    /// JSON ledger configuration (defaults apply when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Authenticated account issuing the command
    #[arg(long, global = true)]
    caller: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty state file
    Init {
        /// Starting height of the clock
        #[arg(long, default_value = "0")]
        height: u64,
        /// Overwrite an existing state file
        #[arg(long)]
        force: bool,
    },
    /// Credit an account in the simulated bank
    Deposit {
        account: String,
        amount: u64,
    },
    /// Show an account balance (defaults to the caller)
    Balance {
        account: Option<String>,
    },
    /// Advance the height clock
    Advance {
        blocks: u64,
    },
    /// Show the current height
    Height,
    /// Create a new market owned by the caller
    Create {
        /// Market question
        #[arg(short, long)]
        description: String,
        /// Comma-separated option labels, e.g. "Yes,No"
        #[arg(short, long)]
        options: String,
        /// Height at which staking closes
        #[arg(long)]
        deadline: u64,
    },
    /// Stake on an option (label or index)
    Stake {
        market_id: MarketId,
        option: String,
        amount: u64,
    },
    /// Declare the winning option (creator only)
    Settle {
        market_id: MarketId,
        option: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Withdraw winnings for part of a winning stake
    Claim {
        market_id: MarketId,
        option: String,
        amount: u64,
    },
    /// Withdraw winnings for the whole remaining stake
    ClaimAll {
        market_id: MarketId,
        option: String,
    },
    /// Show a market
    Market {
        market_id: MarketId,
    },
    /// Show a bet
    Bet {
        market_id: MarketId,
        backer: String,
        option: String,
    },
    /// List all markets
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Init { height, force } = cli.command {
        if cli.state.exists() && !force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                cli.state.display()
            );
        }
        HostState::fresh(height).save(&cli.state)?;
        println!(
            "{}: {} at height {}",
            "Initialized".green().bold(),
            cli.state.display().to_string().cyan(),
            height
        );
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => LedgerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => LedgerConfig::default(),
    };
    let mut ledger = HostState::load(&cli.state)?.into_ledger(config)?;
    debug!(height = ledger.height(), "state loaded");

    let dirty = run(&cli, &mut ledger)?;

    for event in ledger.take_events() {
        print_event(&event);
    }
    if dirty {
        HostState::from_ledger(ledger).save(&cli.state)?;
    }
    Ok(())
}

/// Execute one command. Returns whether the state changed.
fn run(cli: &Cli, ledger: &mut HostLedger) -> Result<bool> {
    match &cli.command {
        Commands::Init { .. } => unreachable!("handled before the state file is loaded"),

        Commands::Deposit { account, amount } => {
            let account = AccountId::from(account.as_str());
            ledger.bank_mut().deposit(&account, *amount);
            println!(
                "{}: {} now holds {}",
                "Deposit".green().bold(),
                account.to_string().cyan(),
                format_amount(ledger.bank().balance(&account)).yellow()
            );
            Ok(true)
        }

        Commands::Balance { account } => {
            let account = match account {
                Some(account) => AccountId::from(account.as_str()),
                None => caller(cli)?,
            };
            println!(
                "{}: {}",
                account.to_string().cyan(),
                format_amount(ledger.bank().balance(&account)).yellow()
            );
            println!(
                "{}: {}",
                "In custody".bright_black(),
                format_amount(ledger.bank().balance(ledger.custody())).bright_black()
            );
            Ok(false)
        }

        Commands::Advance { blocks } => {
            ledger.clock_mut().advance(*blocks);
            println!("{}: {}", "Height".green().bold(), ledger.height());
            Ok(true)
        }

        Commands::Height => {
            println!("{}: {}", "Height".green().bold(), ledger.height());
            Ok(false)
        }

        Commands::Create {
            description,
            options,
            deadline,
        } => {
            let creator = caller(cli)?;
            let options = parse_options(options)?;
            let market_id =
                ledger.create_market(&creator, description.clone(), options, *deadline)?;
            println!("{}", "Market Created Successfully!".green().bold());
            print_market(ledger, market_id)?;
            Ok(true)
        }

        Commands::Stake {
            market_id,
            option,
            amount,
        } => {
            let backer = caller(cli)?;
            let option = resolve_option(ledger, *market_id, option)?;
            ledger.stake(*market_id, option, *amount, &backer)?;
            Ok(true)
        }

        Commands::Settle {
            market_id,
            option,
            yes,
        } => {
            let creator = caller(cli)?;
            let index = resolve_option(ledger, *market_id, option)?;
            if !*yes {
                let question = format!(
                    "Settle market {market_id} on option {index}? This cannot be undone"
                );
                let confirmed = inquire::Confirm::new(&question)
                    .with_default(false)
                    .prompt()?;
                if !confirmed {
                    println!("{}", "Settlement cancelled".yellow());
                    return Ok(false);
                }
            }
            ledger.settle(*market_id, index, &creator)?;
            Ok(true)
        }

        Commands::Claim {
            market_id,
            option,
            amount,
        } => {
            let backer = caller(cli)?;
            let option = resolve_option(ledger, *market_id, option)?;
            ledger.claim(*market_id, option, *amount, &backer)?;
            Ok(true)
        }

        Commands::ClaimAll { market_id, option } => {
            let backer = caller(cli)?;
            let option = resolve_option(ledger, *market_id, option)?;
            ledger.claim_all(*market_id, option, &backer)?;
            Ok(true)
        }

        Commands::Market { market_id } => {
            print_market(ledger, *market_id)?;
            Ok(false)
        }

        Commands::Bet {
            market_id,
            backer,
            option,
        } => {
            let backer = AccountId::from(backer.as_str());
            let option = resolve_option(ledger, *market_id, option)?;
            match ledger.get_bet(*market_id, &backer, option) {
                Some(bet) => {
                    println!("{}: {}", "Staked".yellow().bold(), format_amount(bet.amount));
                    println!(
                        "{}: {}",
                        "Claimed".yellow().bold(),
                        format_amount(bet.claimed_amount)
                    );
                    println!(
                        "{}: {}",
                        "Unclaimed".yellow().bold(),
                        format_amount(bet.unclaimed())
                    );
                }
                None => println!("{}", "No open bet".bright_black()),
            }
            Ok(false)
        }

        Commands::List => {
            let height = ledger.height();
            let mut any = false;
            for market in ledger.markets() {
                any = true;
                println!(
                    "{} {} [{}] {}",
                    format!("#{}", market.id).cyan().bold(),
                    market.description,
                    market.options.join(" / "),
                    market.state_at(height).to_string().bright_black()
                );
            }
            if !any {
                println!("{}", "No markets yet".bright_black());
            }
            Ok(false)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn caller(cli: &Cli) -> Result<AccountId> {
    cli.caller
        .as_deref()
        .map(AccountId::from)
        .ok_or_else(|| anyhow!("This command needs --caller <ACCOUNT>"))
}

/// Accept either an option label or its index
fn resolve_option(ledger: &HostLedger, market_id: MarketId, option: &str) -> Result<usize> {
    let market = ledger
        .get_market(market_id)
        .ok_or_else(|| anyhow!("Market {market_id} does not exist"))?;
    if let Some(index) = market.option_index(option) {
        return Ok(index);
    }
    option.parse::<usize>().with_context(|| {
        format!(
            "'{option}' is not an option of market {market_id} ({})",
            market.options.join(", ")
        )
    })
}

fn print_market(ledger: &HostLedger, market_id: MarketId) -> Result<()> {
    let market = ledger
        .get_market(market_id)
        .ok_or_else(|| anyhow!("Market {market_id} does not exist"))?;
    let totals = ledger.option_totals(market_id)?;

    println!("{}", "═".repeat(50).bright_black());
    println!("{}: {}", "Market ID".yellow().bold(), market.id);
    println!("{}: {}", "Description".yellow().bold(), market.description);
    println!("{}: {}", "Creator".yellow().bold(), market.creator);
    println!("{}: {}", "Deadline".yellow().bold(), market.deadline);
    println!(
        "{}: {}",
        "Total Staked".yellow().bold(),
        format_amount(market.total_staked)
    );
    for (index, (label, total)) in market.options.iter().zip(&totals).enumerate() {
        let marker = if market.winning_option == Some(index) {
            "★".green().bold()
        } else {
            " ".normal()
        };
        println!("  {marker} [{index}] {label}: {}", format_amount(*total));
    }
    println!(
        "{}: {}",
        "Status".yellow().bold(),
        market.state_at(ledger.height())
    );
    println!("{}", "═".repeat(50).bright_black());
    Ok(())
}

fn print_event(event: &LedgerEvent) {
    match event {
        LedgerEvent::MarketCreated { .. } => {}
        LedgerEvent::Staked {
            market_id,
            backer,
            option,
            amount,
        } => println!(
            "{}: {} staked {} on option {} of market {}",
            "Stake".green().bold(),
            backer.to_string().cyan(),
            format_amount(*amount).yellow(),
            option,
            market_id
        ),
        LedgerEvent::Settled {
            market_id,
            winning_option,
        } => println!(
            "{}: market {} settled on option {}",
            "Settled".green().bold(),
            market_id,
            winning_option.to_string().yellow()
        ),
        LedgerEvent::Claimed {
            market_id,
            backer,
            amount_claimed,
            winnings,
            ..
        } => println!(
            "{}: {} claimed {} of stake on market {} and received {}",
            "Claim".green().bold(),
            backer.to_string().cyan(),
            format_amount(*amount_claimed),
            market_id,
            format_amount(*winnings).yellow()
        ),
    }
}
