//! Trait interfaces between the wallet layer and a chain backend.
//!
//! - [`ChainBackend`]: an opened wallet database plus its chain view
//! - [`SyncSession`]: one SPV synchronization attempt
//! - [`BackendLoader`]: creates and opens backends on disk
//! - [`WalletDb`]: an open database handle
//!
//! Implementations own all consensus, peer and storage logic. The wallet
//! layer only composes these calls.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::cancel::CancelToken;
use crate::error::BackendError;
use crate::hdkeychain::ExtendedKey;
use crate::params::Network;
use crate::txauthor::{AuthoredTx, ChangeSource, InputSource};
use crate::types::{
    Balance, BirthState, BlockStamp, Hash256, RescanProgress, SigHashType, SignatureError, SyncEvent,
    UnspentCoin,
};
use crate::wire::{MsgTx, TxOut};

/// Account number of the default account.
pub const DEFAULT_ACCOUNT: u32 = 0;

/// Name of the default account.
pub const DEFAULT_ACCOUNT_NAME: &str = "default";

/// How a backend picks inputs when no input source is supplied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputSelectionAlgorithm {
    /// Select just enough value for the target.
    #[default]
    Default,
    /// Spend every eligible output.
    All,
}

/// Parameters for authoring an unsigned transaction.
pub struct AuthorRequest {
    pub outputs: Vec<TxOut>,
    /// Atoms per kilobyte.
    pub fee_rate: i64,
    pub account: u32,
    pub min_conf: i32,
    pub algorithm: OutputSelectionAlgorithm,
    /// `None` uses the backend's internal-branch change address.
    pub change_source: Option<Box<dyn ChangeSource>>,
    /// `None` uses the backend's own selection.
    pub input_source: Option<Box<dyn InputSource>>,
}

impl std::fmt::Debug for AuthorRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorRequest")
            .field("outputs", &self.outputs)
            .field("fee_rate", &self.fee_rate)
            .field("account", &self.account)
            .field("min_conf", &self.min_conf)
            .field("algorithm", &self.algorithm)
            .field("change_source", &self.change_source.is_some())
            .field("input_source", &self.input_source.is_some())
            .finish()
    }
}

/// Parameters for starting a sync session.
#[derive(Clone, Debug)]
pub struct SessionParams {
    /// Peers to connect to exclusively. Empty means discover peers.
    pub persistent_peers: Vec<String>,
    pub events: mpsc::UnboundedSender<SyncEvent>,
}

/// A transaction record as listed by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionSummary {
    pub txid: Hash256,
    pub vout: u32,
    pub address: Option<String>,
    /// Coins, signed by direction.
    pub amount: f64,
    /// `send`, `receive`, `immature`, `generate` or similar.
    pub category: String,
    pub confirmations: i64,
    pub fee: Option<f64>,
    pub time_received: i64,
    /// Zero when unmined.
    pub block_time: i64,
}

/// An opened wallet backend.
///
/// Signing calls require the caller to unlock first. Concurrent unlock and
/// sign sequences must be serialized by the caller.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    fn network(&self) -> Network;

    /// Unspent outputs with confirmations in `min_conf..=max_conf`, optionally
    /// restricted to `addresses`.
    async fn list_unspent(
        &self,
        min_conf: i32,
        max_conf: i32,
        addresses: &[String],
        account: &str,
    ) -> Result<Vec<UnspentCoin>, BackendError>;

    /// Whether `address` belongs to the internal (change) branch.
    async fn is_change_address(&self, address: &str) -> Result<bool, BackendError>;

    async fn author_transaction(&self, request: AuthorRequest) -> Result<AuthoredTx, BackendError>;

    /// Sign every input in place. Returns per-input failures.
    async fn sign_transaction(
        &self,
        tx: &mut MsgTx,
        hash_type: SigHashType,
    ) -> Result<Vec<SignatureError>, BackendError>;

    /// Publish through `session`, returning the transaction hash.
    async fn publish_transaction(&self, tx: &MsgTx, session: &dyn SyncSession) -> Result<Hash256, BackendError>;

    /// Next unused `(external, internal)` child indexes of an account.
    async fn branch_next_indexes(&self, account: u32) -> Result<(u32, u32), BackendError>;

    /// Build a fresh sync session. Sessions are never reused across runs.
    fn new_sync_session(&self, params: SessionParams) -> Result<Arc<dyn SyncSession>, BackendError>;

    /// Associate (or clear) the network backend used for publishing.
    fn set_network_backend(&self, session: Option<Arc<dyn SyncSession>>);

    /// Rescan from `height`, sending progress until done, failed or cancelled.
    /// The channel closes when this returns.
    async fn rescan_progress_from_height(
        &self,
        cancel: CancelToken,
        height: i32,
        progress: mpsc::Sender<RescanProgress>,
    );

    /// Balances of every account at `min_conf`.
    async fn account_balances(&self, min_conf: i32) -> Result<Vec<Balance>, BackendError>;

    async fn main_chain_tip(&self) -> Result<BlockStamp, BackendError>;

    async fn birth_state(&self) -> Result<Option<BirthState>, BackendError>;

    async fn set_birth_state(&self, state: BirthState) -> Result<(), BackendError>;

    async fn account_xpub(&self, account: u32) -> Result<ExtendedKey, BackendError>;

    async fn current_address(&self, account: u32) -> Result<Address, BackendError>;

    async fn new_external_address(&self, account: u32) -> Result<Address, BackendError>;

    async fn list_transactions(&self, from: usize, count: usize) -> Result<Vec<TransactionSummary>, BackendError>;

    /// Transactions known to the wallet, in request order. Unknown hashes are
    /// omitted.
    async fn transactions_by_hashes(&self, hashes: &[Hash256]) -> Result<Vec<MsgTx>, BackendError>;

    /// 65-byte compact recoverable signature of `message` by `address`'s key.
    async fn sign_message(&self, message: &str, address: &Address) -> Result<Vec<u8>, BackendError>;

    async fn change_private_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), BackendError>;

    async fn unlock(&self, passphrase: &[u8]) -> Result<(), BackendError>;

    fn lock(&self);

    /// Switch a freshly created wallet to the SLIP-0044 coin type.
    async fn upgrade_to_slip0044_coin_type(&self) -> Result<(), BackendError>;

    /// Mark the first `external`/`internal` addresses of the default account
    /// as used.
    async fn extend_addresses(&self, external: u32, internal: u32) -> Result<(), BackendError>;
}

/// One synchronization attempt against the network.
#[async_trait]
pub trait SyncSession: Send + Sync {
    /// Run until cancelled or failed. A cancelled run returns `Ok`.
    async fn run(&self, cancel: CancelToken) -> Result<(), BackendError>;

    /// Whether the initial sync finished, and the target height.
    async fn synced(&self) -> (bool, i32);

    async fn publish(&self, tx: &MsgTx) -> Result<(), BackendError>;
}

/// An open wallet database handle.
pub trait WalletDb: Send + Sync {
    /// Directory holding the database.
    fn path(&self) -> &Path;

    fn close(&self) -> Result<(), BackendError>;
}

/// Parameters for initializing a new database with a seed.
pub struct CreateParams {
    pub network: Network,
    /// Tweaked seed handed to the backend.
    pub seed: Zeroizing<Vec<u8>>,
    pub private_passphrase: Zeroizing<Vec<u8>>,
    pub gap_limit: u32,
}

/// Parameters for opening an existing database.
#[derive(Clone, Debug)]
pub struct OpenParams {
    pub network: Network,
    pub gap_limit: u32,
    pub account_discovery: bool,
}

/// Creates and opens backends on disk.
#[async_trait]
pub trait BackendLoader: Send + Sync {
    /// Whether a wallet database exists in `dir`.
    fn wallet_exists(&self, dir: &Path) -> Result<bool, BackendError>;

    async fn create_db(&self, dir: &Path) -> Result<Arc<dyn WalletDb>, BackendError>;

    async fn open_db(&self, dir: &Path) -> Result<Arc<dyn WalletDb>, BackendError>;

    async fn create_wallet(&self, db: &Arc<dyn WalletDb>, params: CreateParams) -> Result<(), BackendError>;

    async fn create_watch_only(
        &self,
        db: &Arc<dyn WalletDb>,
        xpub: &ExtendedKey,
        network: Network,
    ) -> Result<(), BackendError>;

    async fn open_wallet(
        &self,
        db: &Arc<dyn WalletDb>,
        params: &OpenParams,
    ) -> Result<Arc<dyn ChainBackend>, BackendError>;
}
