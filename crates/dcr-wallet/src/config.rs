//! Per-wallet configuration.

use std::path::PathBuf;
use std::time::Duration;

use dcr_core::params::Network;
use dcr_sync::SyncConfig;
use serde::{Deserialize, Serialize};

/// Address gap limit handed to the backend when none is configured.
pub const DEFAULT_GAP_LIMIT: u32 = 20;

/// Deadline for one fee oracle request.
pub const DEFAULT_FEE_ORACLE_TIMEOUT: Duration = Duration::from_secs(4);

/// Configuration of one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletConfig {
    pub name: String,
    /// Directory holding the database and `walletdata.json`.
    pub data_dir: PathBuf,
    pub network: Network,
    /// Hand out receive addresses before the initial sync completes.
    #[serde(default)]
    pub allow_unsynced_addrs: bool,
    /// Peers to sync from exclusively when `start_sync` gets none.
    #[serde(default)]
    pub persistent_peers: Vec<String>,
    #[serde(default = "default_gap_limit")]
    pub gap_limit: u32,
    #[serde(skip, default = "SyncConfig::default")]
    pub sync: SyncConfig,
    #[serde(skip, default = "default_fee_oracle_timeout")]
    pub fee_oracle_timeout: Duration,
}

fn default_gap_limit() -> u32 {
    DEFAULT_GAP_LIMIT
}

fn default_fee_oracle_timeout() -> Duration {
    DEFAULT_FEE_ORACLE_TIMEOUT
}

impl WalletConfig {
    pub fn new(name: impl Into<String>, data_dir: impl Into<PathBuf>, network: Network) -> Self {
        Self {
            name: name.into(),
            data_dir: data_dir.into(),
            network,
            allow_unsynced_addrs: false,
            persistent_peers: Vec::new(),
            gap_limit: DEFAULT_GAP_LIMIT,
            sync: SyncConfig::default(),
            fee_oracle_timeout: DEFAULT_FEE_ORACLE_TIMEOUT,
        }
    }

    pub fn with_unsynced_addrs(mut self, allow: bool) -> Self {
        self.allow_unsynced_addrs = allow;
        self
    }

    pub fn with_sync_config(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }
}
