//! Seed vault: the cached, lock-guarded copy of the wallet metadata record.
//!
//! The encrypted seed is mutated only by passphrase changes and by
//! discarding a verified seed. Every mutation is written to disk before the
//! in-memory copy changes. The vault lock is independent of sync state.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use crate::encryption;
use crate::error::WalletError;
use crate::walletdata::WalletData;

/// Length of a freshly generated wallet seed (144 bits).
pub const SEED_LEN: usize = 18;

/// How a wallet came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    /// New random seed.
    New,
    /// Existing seed; the backend must rediscover accounts.
    Restored,
    /// Extended public key only.
    WatchOnly,
}

/// Check seed and passphrase against the wallet kind.
pub fn validate_creation(kind: WalletKind, seed: &[u8], passphrase: &[u8]) -> Result<(), WalletError> {
    let watch_only = kind == WalletKind::WatchOnly;
    if watch_only {
        if !seed.is_empty() || !passphrase.is_empty() {
            return Err(WalletError::InvalidArguments("invalid arguments for watch only wallet".into()));
        }
        return Ok(());
    }
    if seed.is_empty() || passphrase.is_empty() {
        return Err(WalletError::InvalidArguments("seed AND private passphrase are required".into()));
    }
    if seed.len() != SEED_LEN {
        return Err(WalletError::InvalidArguments(format!(
            "seed should be {SEED_LEN} bytes long but got {}",
            seed.len()
        )));
    }
    Ok(())
}

#[derive(Debug)]
struct VaultState {
    encrypted_seed: Option<Vec<u8>>,
    default_account_xpub: String,
    birthday: i64,
}

impl VaultState {
    fn record(&self, encrypted_seed: Option<&[u8]>) -> WalletData {
        WalletData::new(encrypted_seed, self.default_account_xpub.clone(), self.birthday)
    }
}

/// Encrypted seed and account metadata of one wallet.
#[derive(Debug)]
pub struct SeedVault {
    dir: PathBuf,
    state: Mutex<VaultState>,
}

impl SeedVault {
    /// Encrypt `seed` (if any), persist the record and return the vault.
    pub fn create(
        dir: &Path,
        kind: WalletKind,
        seed: &[u8],
        passphrase: &[u8],
        default_account_xpub: String,
        birthday: i64,
    ) -> Result<Self, WalletError> {
        validate_creation(kind, seed, passphrase)?;
        let encrypted_seed = match kind {
            WalletKind::WatchOnly => None,
            WalletKind::New | WalletKind::Restored => Some(encryption::encrypt(seed, passphrase)?),
        };
        let state = VaultState { encrypted_seed, default_account_xpub, birthday };
        state.record(state.encrypted_seed.as_deref()).save(dir)?;
        Ok(Self { dir: dir.to_path_buf(), state: Mutex::new(state) })
    }

    /// Load the record stored in `dir`.
    pub fn open(dir: &Path) -> Result<Self, WalletError> {
        let record = WalletData::load(dir)?;
        let state = VaultState {
            encrypted_seed: record.encrypted_seed()?,
            default_account_xpub: record.default_account_xpub,
            birthday: record.birthday,
        };
        Ok(Self { dir: dir.to_path_buf(), state: Mutex::new(state) })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn has_seed(&self) -> bool {
        self.state.lock().encrypted_seed.is_some()
    }

    pub fn default_account_xpub(&self) -> String {
        self.state.lock().default_account_xpub.clone()
    }

    /// Unix seconds.
    pub fn birthday(&self) -> i64 {
        self.state.lock().birthday
    }

    /// Decrypt and return the seed.
    pub fn decrypt_seed(&self, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        let state = self.state.lock();
        let sealed = state.encrypted_seed.as_deref().ok_or(WalletError::SeedAlreadyVerified)?;
        encryption::decrypt(sealed, passphrase)
    }

    /// Re-seal the seed under `new`. A no-op once the seed is discarded.
    pub fn re_encrypt_seed(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        let Some(sealed) = state.encrypted_seed.as_deref() else {
            return Ok(());
        };
        let resealed = encryption::re_encrypt(sealed, old, new)?;
        state.record(Some(&resealed)).save(&self.dir)?;
        state.encrypted_seed = Some(resealed);
        Ok(())
    }

    /// Prove `passphrase` opens the seed, then drop the seed permanently.
    pub fn discard_seed(&self, passphrase: &[u8]) -> Result<(), WalletError> {
        let mut state = self.state.lock();
        let sealed = state.encrypted_seed.as_deref().ok_or(WalletError::SeedAlreadyVerified)?;
        encryption::decrypt(sealed, passphrase)?;
        state.record(None).save(&self.dir)?;
        state.encrypted_seed = None;
        debug!(dir = %self.dir.display(), "wallet seed discarded");
        Ok(())
    }
}
