//! JSON state file holding everything the CLI host owns between runs:
//! the ledger records, the simulated bank and the height clock.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use parimutuel_core::{
    utils::snapshot_digest, AccountId, InMemoryBank, Ledger, LedgerConfig, LedgerStore,
    ManualClock,
};
use serde::{Deserialize, Serialize};

pub type HostLedger = Ledger<ManualClock, InMemoryBank>;

/// Account the host uses as the ledger's custody
pub const CUSTODY_ACCOUNT: &str = "ledger-custody";

#[derive(Serialize, Deserialize, Debug)]
pub struct HostState {
    pub custody: AccountId,
    pub clock: ManualClock,
    pub bank: InMemoryBank,
    pub store: LedgerStore,
    /// RFC 3339 time of the last save
    pub saved_at: String,
    /// SHA256 of the serialized store
    pub digest: String,
}

impl HostState {
    pub fn fresh(height: u64) -> Self {
        Self {
            custody: AccountId::from(CUSTODY_ACCOUNT),
            clock: ManualClock::at(height),
            bank: InMemoryBank::new(),
            store: LedgerStore::new(),
            saved_at: String::new(),
            digest: String::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "State file {} not found, run `parimutuel init` first",
                path.display()
            );
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file {}", path.display()))?;
        let state: Self = serde_json::from_str(&json)
            .with_context(|| format!("State file {} could not be restored", path.display()))?;

        let digest = snapshot_digest(&state.store)?;
        if digest != state.digest {
            bail!(
                "State file {} failed its integrity check (expected {}, computed {})",
                path.display(),
                state.digest,
                digest
            );
        }
        Ok(state)
    }

    /// Write through a temporary file so a crash never leaves half a state file
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.digest = snapshot_digest(&self.store)?;
        self.saved_at = chrono::Utc::now().to_rfc3339();

        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    pub fn into_ledger(self, config: LedgerConfig) -> Result<HostLedger> {
        Ok(Ledger::with_store(
            config,
            self.store,
            self.custody,
            self.clock,
            self.bank,
        )?)
    }

    pub fn from_ledger(ledger: HostLedger) -> Self {
        let parts = ledger.into_parts();
        Self {
            custody: parts.custody,
            clock: parts.clock,
            bank: parts.bank,
            store: parts.store,
            saved_at: String::new(),
            digest: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(name: &str) -> AccountId {
        AccountId::from(name)
    }

    fn busy_ledger() -> HostLedger {
        let mut ledger = HostState::fresh(5)
            .into_ledger(LedgerConfig::default())
            .unwrap();
        ledger.bank_mut().deposit(&account("alice"), 500);
        let id = ledger
            .create_market(
                &account("creator"),
                "Will it rain tomorrow?".to_string(),
                vec!["Yes".to_string(), "No".to_string()],
                50,
            )
            .unwrap();
        ledger.stake(id, 1, 200, &account("alice")).unwrap();
        ledger
    }

    #[test]
    fn test_save_then_load_restores_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        let ledger = busy_ledger();
        let store = ledger.store().clone();
        let mut state = HostState::from_ledger(ledger);
        state.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = HostState::load(&path).unwrap();
        assert_eq!(loaded.store, store);
        assert_eq!(loaded.digest, state.digest);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.saved_at).is_ok());

        let ledger = loaded.into_ledger(LedgerConfig::default()).unwrap();
        assert_eq!(ledger.height(), 5);
        assert_eq!(ledger.bank().balance(&account("alice")), 300);
        assert_eq!(ledger.bank().balance(ledger.custody()), 200);
    }

    #[test]
    fn test_tampered_store_fails_integrity_check() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        HostState::from_ledger(busy_ledger()).save(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["store"]["markets"][0]["description"] = "Will it snow tomorrow?".into();
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let err = HostState::load(&path).unwrap_err();
        assert!(err.to_string().contains("integrity check"), "{err}");
    }

    #[test]
    fn test_inconsistent_store_is_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        HostState::from_ledger(busy_ledger()).save(&path).unwrap();

        let json = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["store"]["bets"][0]["claimed_amount"] = 900.into();
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        let err = HostState::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Corrupt ledger store"), "{err:#}");
    }

    #[test]
    fn test_missing_state_file() {
        let dir = TempDir::new().unwrap();
        let err = HostState::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(err.to_string().contains("not found"), "{err}");
    }
}
