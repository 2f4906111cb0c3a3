//! Manager configuration and the per-wallet request record.
//!
//! [`ManagerConfig`] carries process-wide defaults. A [`WalletRequest`] names
//! one wallet the way callers describe it over the JSON boundary and is
//! turned into a [`WalletConfig`] against those defaults.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use dcr_core::params::Network;
use dcr_sync::SyncConfig;
use dcr_wallet::config::DEFAULT_FEE_ORACLE_TIMEOUT;
use dcr_wallet::{Recovery, WalletConfig};
use serde::{Deserialize, Serialize};

use crate::error::ManagerError;

/// Process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Root under which wallets without an explicit directory live.
    pub data_dir: PathBuf,
    /// Log level filter string (e.g. "info", "debug", "dcr_sync=trace").
    pub log_level: String,
    /// "json" for structured output; anything else is text.
    pub log_format: String,
    /// Pause between SPV session restarts.
    pub sync_retry_interval: Duration,
    pub fee_oracle_timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("dcrlibwallet");

        Self {
            data_dir,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
            sync_retry_interval: SyncConfig::default().retry_interval,
            fee_oracle_timeout: DEFAULT_FEE_ORACLE_TIMEOUT,
        }
    }
}

impl ManagerConfig {
    /// Default directory of wallet `name` on `network`.
    pub fn wallet_dir(&self, network: Network, name: &str) -> PathBuf {
        self.data_dir.join(network.to_string()).join(name)
    }
}

/// One wallet as a caller describes it.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletRequest {
    pub name: String,
    /// Allow getting unused addresses when not synced.
    #[serde(rename = "unsyncedaddrs", default)]
    pub allow_unsynced_addrs: bool,
    pub net: String,
    /// Empty means [`ManagerConfig::wallet_dir`].
    #[serde(rename = "datadir", default)]
    pub data_dir: String,
    /// Only needed during creation.
    #[serde(default)]
    pub pass: String,
    /// Hex seed to restore from.
    #[serde(default)]
    pub seed: String,
    /// Unix seconds; only read with `seed`.
    #[serde(default)]
    pub birthday: i64,
    /// Restore from the seed (or extended public key) already stored in the
    /// directory after its database was deleted.
    #[serde(rename = "uselocalseed", default)]
    pub use_local_seed: bool,
    /// Only needed during watching only creation.
    #[serde(rename = "pubkey", default)]
    pub pub_key: String,
    #[serde(default)]
    pub peers: Vec<String>,
}

impl fmt::Debug for WalletRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletRequest")
            .field("name", &self.name)
            .field("net", &self.net)
            .field("data_dir", &self.data_dir)
            .field("allow_unsynced_addrs", &self.allow_unsynced_addrs)
            .field("use_local_seed", &self.use_local_seed)
            .field("pub_key", &self.pub_key)
            .finish_non_exhaustive()
    }
}

impl WalletRequest {
    pub fn new(name: impl Into<String>, net: impl Into<String>) -> Self {
        Self { name: name.into(), net: net.into(), ..Default::default() }
    }

    pub fn network(&self) -> Result<Network, ManagerError> {
        self.net.parse().map_err(|e| ManagerError::InvalidRequest(format!("{e}")))
    }

    /// Wallet configuration under the manager defaults.
    pub fn wallet_config(&self, defaults: &ManagerConfig) -> Result<WalletConfig, ManagerError> {
        if self.name.is_empty() {
            return Err(ManagerError::InvalidRequest("wallet name is required".into()));
        }
        let network = self.network()?;
        let data_dir = if self.data_dir.is_empty() {
            defaults.wallet_dir(network, &self.name)
        } else {
            PathBuf::from(&self.data_dir)
        };
        let mut config = WalletConfig::new(&self.name, data_dir, network)
            .with_unsynced_addrs(self.allow_unsynced_addrs)
            .with_sync_config(SyncConfig::with_retry_interval(defaults.sync_retry_interval));
        config.persistent_peers = self.peers.clone();
        config.fee_oracle_timeout = defaults.fee_oracle_timeout;
        Ok(config)
    }

    /// How a spending wallet gets its seed. `None` generates a new one.
    pub fn recovery(&self) -> Result<Option<Recovery>, ManagerError> {
        if self.use_local_seed {
            return Ok(Some(Recovery::local()));
        }
        if self.seed.is_empty() {
            return Ok(None);
        }
        let seed = hex::decode(&self.seed)
            .map_err(|e| ManagerError::InvalidRequest(format!("unable to decode wallet seed: {e}")))?;
        Ok(Some(Recovery::from_seed(seed, self.birthday)))
    }

    /// Extended public key for a watch-only wallet. `None` reads the one
    /// stored in the directory.
    pub fn watch_only_key(&self) -> Option<&str> {
        if self.use_local_seed { None } else { Some(&self.pub_key) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcr_wallet::RecoverySeed;

    #[test]
    fn defaults() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.log_format, "text");
        assert_eq!(cfg.sync_retry_interval, Duration::from_secs(10));
        assert_eq!(cfg.fee_oracle_timeout, Duration::from_secs(4));
        assert!(cfg.data_dir.ends_with("dcrlibwallet"));
    }

    #[test]
    fn request_uses_boundary_names() {
        let json = r#"{"name":"main","unsyncedaddrs":true,"net":"testnet3","datadir":"/tmp/w",
            "pass":"secret","uselocalseed":false,"pubkey":""}"#;
        let req: WalletRequest = serde_json::from_str(json).unwrap();
        assert!(req.allow_unsynced_addrs);
        assert_eq!(req.network().unwrap(), Network::Testnet);

        let cfg = req.wallet_config(&ManagerConfig::default()).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/w"));
        assert!(cfg.allow_unsynced_addrs);
        assert_eq!(cfg.sync.retry_interval, Duration::from_secs(10));
    }

    #[test]
    fn empty_dir_falls_back_to_root() {
        let defaults = ManagerConfig { data_dir: PathBuf::from("/data"), ..Default::default() };
        let cfg = WalletRequest::new("main", "simnet").wallet_config(&defaults).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/data/simnet/main"));
    }

    #[test]
    fn rejects_bad_fields() {
        let defaults = ManagerConfig::default();
        assert!(matches!(
            WalletRequest::new("main", "regtest").wallet_config(&defaults),
            Err(ManagerError::InvalidRequest(_))
        ));
        assert!(matches!(
            WalletRequest::new("", "mainnet").wallet_config(&defaults),
            Err(ManagerError::InvalidRequest(_))
        ));
        let req = WalletRequest { seed: "xyz".into(), ..WalletRequest::new("main", "mainnet") };
        assert!(matches!(req.recovery(), Err(ManagerError::InvalidRequest(_))));
    }

    #[test]
    fn recovery_sources() {
        let mut req = WalletRequest::new("main", "mainnet");
        assert!(req.recovery().unwrap().is_none());

        req.seed = "07".repeat(18);
        req.birthday = 1_600_000_000;
        match req.recovery().unwrap().map(|r| r.seed) {
            Some(RecoverySeed::Provided { seed, birthday }) => {
                assert_eq!(seed.as_slice(), &[7u8; 18]);
                assert_eq!(birthday, 1_600_000_000);
            }
            _ => panic!("expected a provided seed"),
        }

        req.use_local_seed = true;
        assert!(matches!(req.recovery().unwrap().map(|r| r.seed), Some(RecoverySeed::Local)));
        assert_eq!(req.watch_only_key(), None);
    }

    #[test]
    fn debug_hides_secrets() {
        let req = WalletRequest { pass: "hunter2".into(), seed: "abcd".into(), ..WalletRequest::new("w", "mainnet") };
        let shown = format!("{req:?}");
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("abcd"));
    }
}
