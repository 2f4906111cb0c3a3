//! Wallet lifecycle: creation, loading, open/close of the backend handle,
//! and the operations composed over it.
//!
//! A [`Wallet`] owns its [`SeedVault`] for its whole life. The backend
//! handle, its database and the [`SyncController`] exist only while the
//! wallet is open, and [`Wallet::close_wallet`] waits for every sync task to
//! exit before the database is closed.
//!
//! Signing operations unlock the backend, sign and lock again. Concurrent
//! signing calls on one wallet must be serialized by the caller.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use dcr_core::address::{Address, AddressKind};
use dcr_core::blake256::blake256;
use dcr_core::cancel::CancelToken;
use dcr_core::hdkeychain::ExtendedKey;
use dcr_core::message;
use dcr_core::params::Network;
use dcr_core::traits::{
    BackendLoader, ChainBackend, CreateParams, OpenParams, WalletDb, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_NAME,
};
use dcr_core::types::{BirthState, BlockStamp, Hash256, UnspentCoin};
use dcr_core::wire::MsgTx;
use dcr_sync::{SyncController, SyncError, SyncStatusReport};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::addresses::{default_account_key, derive_address_range, AddressRange};
use crate::builder::{build_transaction, BuildRequest, BuiltTransaction};
use crate::config::WalletConfig;
use crate::decode::{decode_tx, DecodedTx};
use crate::error::WalletError;
use crate::fee_oracle::{FeeEstimate, FeeOracle};
use crate::vault::{SeedVault, WalletKind, SEED_LEN};
use crate::walletdata::WalletData;

/// Appended big-endian to the seed before it reaches the backend.
const SEED_TWEAK: u32 = 42;

/// The backend birth state starts this long before the wallet birthday.
const BIRTH_STATE_MARGIN_SECS: i64 = 24 * 60 * 60;

/// Seed handed to the backend for `seed`.
pub fn tweak_seed(seed: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut buf = Zeroizing::new(Vec::with_capacity(seed.len() + 4));
    buf.extend_from_slice(seed);
    buf.extend_from_slice(&SEED_TWEAK.to_be_bytes());
    Zeroizing::new(blake256(&buf).to_vec())
}

/// Where a restored wallet's seed comes from.
#[derive(Clone)]
pub enum RecoverySeed {
    /// A seed from the user, with its birthday in Unix seconds.
    Provided { seed: Zeroizing<Vec<u8>>, birthday: i64 },
    /// The seed and birthday already stored in the directory's metadata
    /// record, opened with the creation passphrase.
    Local,
}

/// Restore parameters.
#[derive(Clone)]
pub struct Recovery {
    pub seed: RecoverySeed,
    /// External addresses to mark used right away.
    pub external_addresses: u32,
    /// Internal addresses to mark used right away.
    pub internal_addresses: u32,
}

impl Recovery {
    pub fn from_seed(seed: impl Into<Vec<u8>>, birthday: i64) -> Self {
        Self {
            seed: RecoverySeed::Provided { seed: Zeroizing::new(seed.into()), birthday },
            external_addresses: 0,
            internal_addresses: 0,
        }
    }

    pub fn local() -> Self {
        Self { seed: RecoverySeed::Local, external_addresses: 0, internal_addresses: 0 }
    }
}

/// Spendable and pending funds of all accounts, in atoms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub confirmed: i64,
    pub unconfirmed: i64,
}

/// An unspent output with its branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    #[serde(flatten)]
    pub coin: UnspentCoin,
    #[serde(rename = "ischange")]
    pub is_change: bool,
}

/// A wallet transaction record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub amount: f64,
    pub category: String,
    pub confirmations: i64,
    /// Zero when unmined.
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    pub time: i64,
    pub txid: String,
    pub vout: u32,
}

/// Birth state in the boundary's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthdayState {
    pub hash: String,
    pub height: u32,
    pub time: i64,
    #[serde(rename = "setfromheight")]
    pub set_from_height: bool,
    #[serde(rename = "setfromtime")]
    pub set_from_time: bool,
}

impl From<BirthState> for BirthdayState {
    fn from(state: BirthState) -> Self {
        Self {
            hash: state.hash.to_string(),
            height: state.height,
            time: state.time,
            set_from_height: state.set_from_height,
            set_from_time: state.set_from_time,
        }
    }
}

/// Resources that exist while the wallet is open.
struct Opened {
    db: Arc<dyn WalletDb>,
    backend: Arc<dyn ChainBackend>,
    sync: SyncController,
}

/// A Decred SPV wallet.
pub struct Wallet {
    config: WalletConfig,
    loader: Arc<dyn BackendLoader>,
    vault: SeedVault,
    cancel: CancelToken,
    fee_oracle: FeeOracle,
    opened: RwLock<Option<Arc<Opened>>>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("name", &self.config.name)
            .field("dir", &self.config.data_dir)
            .field("network", &self.config.network)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Create `dir` if needed. Returns whether it was created here.
fn ensure_dir(dir: &Path) -> Result<bool, WalletError> {
    if dir.is_dir() {
        return Ok(false);
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| WalletError::Io(format!("check new wallet data directory error: {e}")))?;
    Ok(true)
}

/// Undo a failed creation. Only a directory created by this attempt is
/// removed with its contents.
fn remove_remnants(dir: &Path, created: bool) {
    let removed = if created { std::fs::remove_dir_all(dir) } else { std::fs::remove_dir(dir) };
    if let Err(e) = removed {
        debug!(dir = %dir.display(), "wallet directory left in place: {e}");
    }
}

fn close_after_failure(db: &Arc<dyn WalletDb>) {
    if let Err(e) = db.close() {
        error!("failed to close wallet database after error: {e}");
    }
}

impl Wallet {
    fn new(
        config: WalletConfig,
        loader: Arc<dyn BackendLoader>,
        vault: SeedVault,
        cancel: CancelToken,
    ) -> Result<Self, WalletError> {
        let fee_oracle = FeeOracle::new(config.network, config.fee_oracle_timeout)?;
        Ok(Self { config, loader, vault, cancel, fee_oracle, opened: RwLock::new(None) })
    }

    /// Create and open a spending wallet.
    ///
    /// Without `recovery` a fresh seed is generated and the birthday is now.
    /// Any failure removes what this call created.
    pub async fn create(
        config: WalletConfig,
        loader: Arc<dyn BackendLoader>,
        cancel: CancelToken,
        passphrase: &[u8],
        recovery: Option<Recovery>,
    ) -> Result<Self, WalletError> {
        let dir = config.data_dir.clone();
        if loader.wallet_exists(&dir)? {
            return Err(WalletError::WalletExists(dir));
        }
        let created = ensure_dir(&dir)?;

        let result = Self::create_spending(config, loader, cancel, passphrase, recovery).await;
        if let Err(e) = &result {
            warn!(dir = %dir.display(), "wallet creation failed: {e}");
            remove_remnants(&dir, created);
        }
        result
    }

    async fn create_spending(
        config: WalletConfig,
        loader: Arc<dyn BackendLoader>,
        cancel: CancelToken,
        passphrase: &[u8],
        recovery: Option<Recovery>,
    ) -> Result<Self, WalletError> {
        let dir = config.data_dir.clone();
        let network = config.network;

        let (seed, birthday, kind) = match recovery.as_ref().map(|r| &r.seed) {
            None => {
                let mut seed = Zeroizing::new(vec![0u8; SEED_LEN]);
                rand::thread_rng().fill_bytes(&mut seed);
                (seed, Utc::now().timestamp(), WalletKind::New)
            }
            Some(RecoverySeed::Provided { seed, birthday }) => (seed.clone(), *birthday, WalletKind::Restored),
            Some(RecoverySeed::Local) => {
                let record = WalletData::load(&dir)?;
                let sealed = record
                    .encrypted_seed()?
                    .ok_or_else(|| WalletError::Metadata("no encrypted seed in wallet data".into()))?;
                let seed = crate::encryption::decrypt(&sealed, passphrase)?;
                (seed, record.birthday, WalletKind::Restored)
            }
        };

        crate::vault::validate_creation(kind, &seed, passphrase)?;
        let tweaked = tweak_seed(&seed);
        let xpub = default_account_key(&tweaked, network)?.neuter()?;
        let vault = SeedVault::create(&dir, kind, &seed, passphrase, xpub.encode(), birthday)?;

        let db = loader.create_db(&dir).await?;
        let params = CreateParams {
            network,
            seed: tweaked,
            private_passphrase: Zeroizing::new(passphrase.to_vec()),
            gap_limit: config.gap_limit,
        };
        let opened = async {
            loader.create_wallet(&db, params).await?;
            let open = OpenParams {
                network,
                gap_limit: config.gap_limit,
                account_discovery: kind == WalletKind::Restored,
            };
            let backend = loader.open_wallet(&db, &open).await?;

            let birth = BirthState {
                hash: Hash256::ZERO,
                height: 0,
                time: birthday - BIRTH_STATE_MARGIN_SECS,
                set_from_height: false,
                set_from_time: true,
            };
            backend.set_birth_state(birth).await?;

            match &recovery {
                None => backend.upgrade_to_slip0044_coin_type().await?,
                Some(r) if r.external_addresses > 0 || r.internal_addresses > 0 => {
                    backend.extend_addresses(r.external_addresses, r.internal_addresses).await?
                }
                Some(_) => {}
            }
            Ok::<_, WalletError>(backend)
        }
        .await;

        let backend = match opened {
            Ok(backend) => backend,
            Err(e) => {
                close_after_failure(&db);
                return Err(e);
            }
        };

        info!(wallet = %config.name, restored = kind == WalletKind::Restored, "wallet created");
        let wallet = Self::new(config, loader, vault, cancel)?;
        wallet.attach(db, backend);
        Ok(wallet)
    }

    /// Create and open a watch-only wallet over an account extended public
    /// key. `None` uses the key stored in the directory's metadata record.
    pub async fn create_watch_only(
        config: WalletConfig,
        loader: Arc<dyn BackendLoader>,
        cancel: CancelToken,
        xpub: Option<&str>,
    ) -> Result<Self, WalletError> {
        let dir = config.data_dir.clone();
        if loader.wallet_exists(&dir)? {
            return Err(WalletError::WalletExists(dir));
        }
        let created = ensure_dir(&dir)?;

        let result = Self::create_watching(config, loader, cancel, xpub).await;
        if let Err(e) = &result {
            warn!(dir = %dir.display(), "watch-only wallet creation failed: {e}");
            remove_remnants(&dir, created);
        }
        result
    }

    async fn create_watching(
        config: WalletConfig,
        loader: Arc<dyn BackendLoader>,
        cancel: CancelToken,
        xpub: Option<&str>,
    ) -> Result<Self, WalletError> {
        let dir = config.data_dir.clone();
        let encoded = match xpub {
            Some(s) => s.to_string(),
            None => WalletData::load(&dir)?.default_account_xpub,
        };
        if encoded.is_empty() {
            return Err(WalletError::InvalidArguments("no extended public key".into()));
        }
        let key = ExtendedKey::from_str_for(&encoded, config.network)?;
        if key.is_private() {
            return Err(WalletError::InvalidArguments("extended key must be public".into()));
        }

        let vault = SeedVault::create(&dir, WalletKind::WatchOnly, &[], &[], key.encode(), 0)?;
        let db = loader.create_db(&dir).await?;
        let opened = async {
            loader.create_watch_only(&db, &key, config.network).await?;
            let open = OpenParams { network: config.network, gap_limit: config.gap_limit, account_discovery: false };
            Ok::<_, WalletError>(loader.open_wallet(&db, &open).await?)
        }
        .await;

        let backend = match opened {
            Ok(backend) => backend,
            Err(e) => {
                close_after_failure(&db);
                return Err(e);
            }
        };

        info!(wallet = %config.name, "watch-only wallet created");
        let wallet = Self::new(config, loader, vault, cancel)?;
        wallet.attach(db, backend);
        Ok(wallet)
    }

    /// Load an existing wallet's metadata. The backend stays closed until
    /// [`Wallet::open_wallet`].
    pub fn load(config: WalletConfig, loader: Arc<dyn BackendLoader>, cancel: CancelToken) -> Result<Self, WalletError> {
        if !loader.wallet_exists(&config.data_dir)? {
            return Err(WalletError::WalletNotFound(config.data_dir.clone()));
        }
        let vault = SeedVault::open(&config.data_dir)?;
        Self::new(config, loader, vault, cancel)
    }

    /// Open the database and the backend.
    pub async fn open_wallet(&self) -> Result<(), WalletError> {
        if self.is_open() {
            return Err(WalletError::WalletAlreadyOpen);
        }
        info!(wallet = %self.config.name, "Opening wallet...");
        let db = self.loader.open_db(&self.config.data_dir).await?;
        let params = OpenParams {
            network: self.config.network,
            gap_limit: self.config.gap_limit,
            account_discovery: false,
        };
        let backend = match self.loader.open_wallet(&db, &params).await {
            Ok(backend) => backend,
            Err(e) => {
                // A leaked handle would keep the database locked.
                close_after_failure(&db);
                return Err(e.into());
            }
        };
        let mut opened = self.opened.write();
        if opened.is_some() {
            close_after_failure(&db);
            return Err(WalletError::WalletAlreadyOpen);
        }
        *opened = Some(self.opened_state(db, backend));
        Ok(())
    }

    fn opened_state(&self, db: Arc<dyn WalletDb>, backend: Arc<dyn ChainBackend>) -> Arc<Opened> {
        let sync = SyncController::new(backend.clone(), self.config.sync.clone(), self.cancel.clone());
        Arc::new(Opened { db, backend, sync })
    }

    fn attach(&self, db: Arc<dyn WalletDb>, backend: Arc<dyn ChainBackend>) {
        *self.opened.write() = Some(self.opened_state(db, backend));
    }

    /// Stop syncing, wait for every sync task to exit, then close the
    /// database.
    pub async fn close_wallet(&self) -> Result<(), WalletError> {
        let opened = self.opened.write().take().ok_or(WalletError::WalletNotOpen)?;
        info!(wallet = %self.config.name, "Closing wallet");
        opened.sync.stop();
        opened.sync.wait_for_stop().await;
        opened.sync.wait_for_tasks().await;
        opened.db.close()?;
        info!(wallet = %self.config.name, "Wallet closed");
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.opened.read().is_some()
    }

    fn opened(&self) -> Result<Arc<Opened>, WalletError> {
        self.opened.read().clone().ok_or(WalletError::WalletNotOpen)
    }

    fn backend(&self) -> Result<Arc<dyn ChainBackend>, WalletError> {
        Ok(self.opened()?.backend.clone())
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn network(&self) -> Network {
        self.config.network
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Governing token of this wallet.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn vault(&self) -> &SeedVault {
        &self.vault
    }

    /// Unix seconds.
    pub fn birthday(&self) -> i64 {
        self.vault.birthday()
    }

    pub fn decrypt_seed(&self, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
        self.vault.decrypt_seed(passphrase)
    }

    /// Drop the stored seed after the user has backed it up.
    pub fn discard_seed(&self, passphrase: &[u8]) -> Result<(), WalletError> {
        self.vault.discard_seed(passphrase)
    }

    /// Change the backend's private passphrase, then re-seal the seed.
    ///
    /// The stored seed must open under `old` before the backend is touched.
    pub async fn change_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), WalletError> {
        if self.vault.has_seed() {
            self.vault.decrypt_seed(old)?;
        }
        self.backend()?.change_private_passphrase(old, new).await?;
        self.vault.re_encrypt_seed(old, new).map_err(|err| {
            error!(wallet = %self.config.name, %err, "backend passphrase changed but the stored seed kept the old one");
            err
        })
    }

    async fn require_addresses_allowed(&self, sync: &SyncController, op: &'static str) -> Result<(), WalletError> {
        if self.config.allow_unsynced_addrs || sync.is_synced().await {
            return Ok(());
        }
        Err(SyncError::NotSynced(op).into())
    }

    pub async fn current_receive_address(&self) -> Result<String, WalletError> {
        let opened = self.opened()?;
        self.require_addresses_allowed(&opened.sync, "currentReceiveAddress").await?;
        Ok(opened.backend.current_address(DEFAULT_ACCOUNT).await?.encode())
    }

    /// Advance the external branch and return the new current address.
    pub async fn new_external_address(&self) -> Result<String, WalletError> {
        let opened = self.opened()?;
        self.require_addresses_allowed(&opened.sync, "newExternalAddress").await?;
        // The returned address is the one before the bump.
        opened.backend.new_external_address(DEFAULT_ACCOUNT).await?;
        Ok(opened.backend.current_address(DEFAULT_ACCOUNT).await?.encode())
    }

    /// Used and unused receive addresses around the next unused index.
    ///
    /// Unused addresses are withheld until the wallet is synced unless
    /// unsynced addresses are allowed.
    pub async fn addresses(&self, n_used: u32, n_unused: u32) -> Result<AddressRange, WalletError> {
        let opened = self.opened()?;
        let xpub = ExtendedKey::from_str_for(&self.vault.default_account_xpub(), self.config.network)?;
        let (next, _) = opened.backend.branch_next_indexes(DEFAULT_ACCOUNT).await?;
        let mut range = derive_address_range(&xpub, next, n_used, n_unused)?;
        if !self.config.allow_unsynced_addrs && !opened.sync.is_synced().await {
            range.unused.clear();
        }
        Ok(range)
    }

    /// Default account extended public key, as the backend reports it.
    pub async fn default_pubkey(&self) -> Result<String, WalletError> {
        Ok(self.backend()?.account_xpub(DEFAULT_ACCOUNT).await?.encode())
    }

    pub async fn balance(&self) -> Result<WalletBalance, WalletError> {
        let balances = self.backend()?.account_balances(1).await?;
        Ok(balances.iter().fold(WalletBalance::default(), |mut acc, b| {
            acc.confirmed += b.spendable;
            acc.unconfirmed += b.total - b.spendable;
            acc
        }))
    }

    /// Confirmed unspent outputs of the default account.
    pub async fn list_unspents(&self) -> Result<Vec<UnspentOutput>, WalletError> {
        let backend = self.backend()?;
        let coins = backend.list_unspent(1, i32::MAX, &[], DEFAULT_ACCOUNT_NAME).await?;
        let mut out = Vec::with_capacity(coins.len());
        for coin in coins {
            let is_change = backend.is_change_address(&coin.address).await?;
            out.push(UnspentOutput { coin, is_change });
        }
        Ok(out)
    }

    pub async fn list_transactions(&self, from: usize, count: usize) -> Result<Vec<TransactionRecord>, WalletError> {
        let backend = self.backend()?;
        let tip = backend.main_chain_tip().await?;
        let records = backend.list_transactions(from, count).await?;
        Ok(records
            .into_iter()
            .map(|tx| {
                let height = if tx.confirmations > 0 { i64::from(tip.height) - tx.confirmations + 1 } else { 0 };
                let time = if tx.block_time != 0 && tx.block_time < tx.time_received {
                    tx.block_time
                } else {
                    tx.time_received
                };
                TransactionRecord {
                    address: tx.address,
                    amount: tx.amount,
                    category: tx.category,
                    confirmations: tx.confirmations,
                    height,
                    fee: tx.fee,
                    time,
                    txid: tx.txid.to_string(),
                    vout: tx.vout,
                }
            })
            .collect())
    }

    /// Full hex of every requested wallet transaction.
    pub async fn get_transactions(&self, hashes: &[String]) -> Result<Vec<String>, WalletError> {
        let hashes = hashes.iter().map(|h| h.parse::<Hash256>()).collect::<Result<Vec<_>, _>>()?;
        let txs = self.backend()?.transactions_by_hashes(&hashes).await?;
        if txs.len() != hashes.len() {
            return Err(WalletError::TxNotFound { found: txs.len(), requested: hashes.len() });
        }
        Ok(txs.iter().map(MsgTx::to_hex).collect())
    }

    pub async fn best_block(&self) -> Result<BlockStamp, WalletError> {
        Ok(self.backend()?.main_chain_tip().await?)
    }

    pub async fn birth_state(&self) -> Result<BirthdayState, WalletError> {
        let state = self.backend()?.birth_state().await?.ok_or(WalletError::NoBirthState)?;
        Ok(state.into())
    }

    /// Base64 compact signature of `message` by a P2PKH address of this
    /// wallet.
    pub async fn sign_message(&self, message: &str, address: &str, passphrase: &[u8]) -> Result<String, WalletError> {
        let addr = Address::decode(address, self.config.network)?;
        if addr.kind() != AddressKind::PubKeyHash {
            return Err(WalletError::UnsupportedAddressType(format!("{address}: must be P2PKH")));
        }
        let backend = self.backend()?;
        backend.unlock(passphrase).await?;
        let signed = backend.sign_message(message, &addr).await;
        backend.lock();
        Ok(message::encode_signature(&signed?))
    }

    pub fn verify_message(&self, message: &str, address: &str, signature: &str) -> Result<bool, WalletError> {
        Ok(message::verify_message(message, address, signature, self.config.network)?)
    }

    /// Build a transaction. A signing request unlocks with `passphrase` and
    /// locks again afterwards, whatever the outcome.
    pub async fn create_transaction(
        &self,
        request: &BuildRequest,
        passphrase: &[u8],
    ) -> Result<BuiltTransaction, WalletError> {
        let backend = self.backend()?;
        if request.sign {
            backend.unlock(passphrase).await?;
        }
        let mut rng = StdRng::from_entropy();
        let built = build_transaction(backend.as_ref(), request, &mut rng).await;
        if request.sign {
            backend.lock();
        }
        built
    }

    /// Publish a hex transaction through the active sync session.
    pub async fn send_raw_transaction(&self, tx_hex: &str) -> Result<Hash256, WalletError> {
        let tx = MsgTx::from_hex(tx_hex)?;
        let opened = self.opened()?;
        let session = opened.sync.session().ok_or(SyncError::NoActiveSyncSession)?;
        let hash = opened.backend.publish_transaction(&tx, session.as_ref()).await?;
        info!(wallet = %self.config.name, txid = %hash, "transaction published");
        Ok(hash)
    }

    pub async fn estimate_fee(&self, n_blocks: u64) -> Result<FeeEstimate, WalletError> {
        self.fee_oracle.estimate_fee(n_blocks).await
    }

    pub fn decode_transaction(&self, tx_hex: &str) -> Result<DecodedTx, WalletError> {
        decode_tx(tx_hex, self.config.network)
    }

    /// Start syncing in the background. No peers means the configured
    /// persistent peers, or discovery when there are none.
    pub fn start_sync(&self, peers: Vec<String>) -> Result<(), WalletError> {
        let peers = if peers.is_empty() { self.config.persistent_peers.clone() } else { peers };
        self.opened()?.sync.start(peers)?;
        Ok(())
    }

    pub fn stop_sync(&self) -> Result<(), WalletError> {
        self.opened()?.sync.stop();
        Ok(())
    }

    pub async fn wait_for_sync_to_stop(&self) -> Result<(), WalletError> {
        self.opened()?.sync.wait_for_stop().await;
        Ok(())
    }

    pub async fn sync_status(&self) -> Result<SyncStatusReport, WalletError> {
        Ok(self.opened()?.sync.status().await)
    }

    pub async fn rescan_from_height(&self, height: i32) -> Result<(), WalletError> {
        self.opened()?.sync.rescan_from_height(height).await?;
        Ok(())
    }

    pub async fn is_synced(&self) -> Result<bool, WalletError> {
        Ok(self.opened()?.sync.is_synced().await)
    }

    pub async fn is_syncing(&self) -> Result<bool, WalletError> {
        Ok(self.opened()?.sync.is_syncing().await)
    }
}
