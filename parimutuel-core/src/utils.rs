//! # Utility Functions
//!
//! Hashing, parsing and formatting helpers shared by hosts.

use crate::{error::Result, store::LedgerStore, LedgerError};
use sha2::{Digest, Sha256};

/// Hash a message using SHA256
pub fn sha256_hash(message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(message.as_bytes());
    let hash = hasher.finalize();
    hex::encode(hash)
}

/// SHA256 digest of the canonical JSON form of a store.
///
/// Hosts persist it next to the snapshot to detect tampered or truncated files.
pub fn snapshot_digest(store: &LedgerStore) -> Result<String> {
    let json = serde_json::to_string(store)?;
    Ok(sha256_hash(&json))
}

/// Split a comma-separated list into trimmed option labels
pub fn parse_options(list: &str) -> Result<Vec<String>> {
    let options: Vec<String> = list
        .split(',')
        .map(|label| label.trim().to_string())
        .collect();

    if options.iter().any(String::is_empty) {
        return Err(LedgerError::InvalidInput(format!(
            "Empty option label in '{list}'"
        )));
    }
    Ok(options)
}

/// Format an amount with thousands separators
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
