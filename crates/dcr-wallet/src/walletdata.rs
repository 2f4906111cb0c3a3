//! The `walletdata.json` metadata record.
//!
//! Holds the encrypted seed (hex), the default account's extended public key
//! and the birthday as Unix seconds. Empty fields are omitted. A missing file
//! reads as an empty record.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// File name of the metadata record inside a wallet directory.
pub const WALLET_DATA_FILE_NAME: &str = "walletdata.json";

/// Persisted wallet metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletData {
    #[serde(rename = "encryptedseedhex", default, skip_serializing_if = "String::is_empty")]
    pub encrypted_seed_hex: String,
    #[serde(rename = "defaultaccountxpub", default, skip_serializing_if = "String::is_empty")]
    pub default_account_xpub: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub birthday: i64,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

pub fn wallet_data_path(dir: &Path) -> PathBuf {
    dir.join(WALLET_DATA_FILE_NAME)
}

impl WalletData {
    pub fn new(encrypted_seed: Option<&[u8]>, default_account_xpub: String, birthday: i64) -> Self {
        Self {
            encrypted_seed_hex: encrypted_seed.map(hex::encode).unwrap_or_default(),
            default_account_xpub,
            birthday,
        }
    }

    /// Decoded ciphertext, `None` when no seed is stored.
    pub fn encrypted_seed(&self) -> Result<Option<Vec<u8>>, WalletError> {
        if self.encrypted_seed_hex.is_empty() {
            return Ok(None);
        }
        hex::decode(&self.encrypted_seed_hex)
            .map(Some)
            .map_err(|e| WalletError::Metadata(format!("unable to decode encrypted hex seed: {e}")))
    }

    /// Read the record in `dir`. A missing file yields the empty record.
    pub fn load(dir: &Path) -> Result<Self, WalletError> {
        let bytes = match fs::read(wallet_data_path(dir)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(WalletError::Metadata(format!("unable to read wallet data file: {e}"))),
        };
        serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::Metadata(format!("unable to unmarshal wallet data file: {e}")))
    }

    /// Write the record into `dir`, replacing any previous one.
    pub fn save(&self, dir: &Path) -> Result<(), WalletError> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| WalletError::Metadata(format!("unable to marshal wallet data: {e}")))?;
        fs::write(wallet_data_path(dir), json)
            .map_err(|e| WalletError::Metadata(format!("unable to write wallet data to file: {e}")))
    }
}
