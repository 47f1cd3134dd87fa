//! Error types for parimutuel-core

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error types for ledger operations.
///
/// Every variant is a side-effect-free rejection: validation runs before any
/// transfer or store write, so an `Err` means the ledger is unchanged.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Market, bet or option-total record is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller lacks the required privilege, or claims a losing option
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate resolution attempt, or staking on a resolved market
    #[error("Market already settled: {0}")]
    AlreadySettled(String),

    /// Operation attempted outside the required lifecycle state
    #[error("Market not active: {0}")]
    MarketNotActive(String),

    /// Malformed description, options, deadline, option index or amount
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Claim would exceed the remaining entitlement
    #[error("Insufficient balance: {0}")]
    InsufficientBalance(String),

    /// Nothing left to withdraw
    #[error("Already claimed: {0}")]
    AlreadyClaimed(String),

    /// The value-transfer primitive rejected the movement of funds
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// A running total would not fit in a u64
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Stored records violate a ledger invariant
    #[error("Corrupt ledger store: {0}")]
    CorruptStore(String),

    /// Ledger configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fieldless tag for [`LedgerError`], convenient for matching the taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    AlreadySettled,
    MarketNotActive,
    InvalidInput,
    InsufficientBalance,
    AlreadyClaimed,
    Transfer,
    Overflow,
    CorruptStore,
    Config,
    Json,
}

impl LedgerError {
    /// The kind of this error, without its message
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::AlreadySettled(_) => ErrorKind::AlreadySettled,
            Self::MarketNotActive(_) => ErrorKind::MarketNotActive,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::InsufficientBalance(_) => ErrorKind::InsufficientBalance,
            Self::AlreadyClaimed(_) => ErrorKind::AlreadyClaimed,
            Self::Transfer(_) => ErrorKind::Transfer,
            Self::Overflow(_) => ErrorKind::Overflow,
            Self::CorruptStore(_) => ErrorKind::CorruptStore,
            Self::Config(_) => ErrorKind::Config,
            Self::Json(_) => ErrorKind::Json,
        }
    }
}
