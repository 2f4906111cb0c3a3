//! In-memory backend doubles for tests.
//!
//! [`MockLoader`] persists nothing but a `wallet.db` marker file so that
//! directory handling can be observed on disk. Everything else lives in
//! memory and is reachable through the loader for assertions.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::blake256::blake256;
use crate::cancel::CancelToken;
use crate::error::{AuthorError, BackendError};
use crate::hdkeychain::ExtendedKey;
use crate::message::sign_compact;
use crate::params::{Network, BIP44_PURPOSE, HARDENED_KEY_START};
use crate::script::{opcodes, p2pkh_script};
use crate::traits::{
    AuthorRequest, BackendLoader, ChainBackend, CreateParams, OpenParams, OutputSelectionAlgorithm,
    SessionParams, SyncSession, TransactionSummary, WalletDb, DEFAULT_ACCOUNT,
};
use crate::txauthor::{
    new_unsigned_transaction, AuthoredTx, ChangeSource, InputDetail, InputSource, ScriptChangeSource,
    DEFAULT_RELAY_FEE_PER_KB,
};
use crate::types::{
    Balance, BirthState, BlockStamp, Hash256, RescanProgress, SigHashType, SignatureError, SyncEvent,
    UnspentCoin, TX_TREE_REGULAR,
};
use crate::wire::MsgTx;

/// Name of the marker file a mock database leaves in its directory.
pub const MOCK_DB_FILE: &str = "wallet.db";

/// Passphrase used by wallets the mock creates without one.
pub const MOCK_PASSPHRASE: &[u8] = b"mock";

/// Look-ahead used when searching for an owned address.
const ADDRESS_SEARCH_WINDOW: u32 = 20;

/// A P2PKH coin paying a throwaway hash.
pub fn coin(txid_byte: u8, vout: u32, amount: i64, confirmations: i64) -> UnspentCoin {
    let hash = [txid_byte; 20];
    let address = Address::p2pkh(hash, Network::Testnet);
    UnspentCoin {
        txid: Hash256([txid_byte; 32]),
        vout,
        tree: TX_TREE_REGULAR,
        amount,
        script_pub_key: p2pkh_script(&hash),
        address: address.encode(),
        account: "default".into(),
        confirmations,
        spendable: true,
    }
}

/// Account key `m/44'/coin'/0'` derived from `seed`.
pub fn account_key_from_seed(seed: &[u8], network: Network) -> Result<ExtendedKey, BackendError> {
    let coin_type = network.params().slip0044_coin_type;
    let key = ExtendedKey::new_master(seed, network)?
        .child(BIP44_PURPOSE + HARDENED_KEY_START)?
        .child(coin_type + HARDENED_KEY_START)?
        .child(DEFAULT_ACCOUNT + HARDENED_KEY_START)?;
    Ok(key)
}

/// What a [`MockSession`] does when run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionBehavior {
    /// Emit a full initial sync to `target_height`, then idle until cancelled.
    SyncAndWait { target_height: i32 },
    /// Connect a peer, then fail after `delay`.
    FailAfter { delay: Duration },
    /// Connect a peer and never finish syncing.
    NeverSync,
}

impl Default for SessionBehavior {
    fn default() -> Self {
        SessionBehavior::SyncAndWait { target_height: 100 }
    }
}

/// Scripted [`SyncSession`].
pub struct MockSession {
    behavior: SessionBehavior,
    events: mpsc::UnboundedSender<SyncEvent>,
    peers: Vec<String>,
    synced: AtomicBool,
    published: Mutex<Vec<Hash256>>,
    fail_publish: AtomicBool,
}

impl MockSession {
    pub fn new(behavior: SessionBehavior, params: SessionParams) -> Self {
        Self {
            behavior,
            events: params.events,
            peers: params.persistent_peers,
            synced: AtomicBool::new(false),
            published: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
        }
    }

    pub fn published(&self) -> Vec<Hash256> {
        self.published.lock().clone()
    }

    pub fn persistent_peers(&self) -> &[String] {
        &self.peers
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    fn emit(&self, event: SyncEvent) {
        // The receiver going away only means nobody is listening anymore.
        let _ = self.events.send(event);
    }

    fn peer_addr(&self) -> String {
        self.peers.first().cloned().unwrap_or_else(|| "127.0.0.1:19108".to_string())
    }
}

#[async_trait]
impl SyncSession for MockSession {
    async fn run(&self, cancel: CancelToken) -> Result<(), BackendError> {
        self.emit(SyncEvent::PeerConnected { peer_count: 1, addr: self.peer_addr() });
        match self.behavior.clone() {
            SessionBehavior::SyncAndWait { target_height } => {
                self.emit(SyncEvent::FetchMissingCFiltersStarted);
                self.emit(SyncEvent::FetchMissingCFiltersProgress { start_height: 0, end_height: target_height });
                self.emit(SyncEvent::FetchMissingCFiltersFinished);
                self.emit(SyncEvent::FetchHeadersStarted);
                self.emit(SyncEvent::FetchHeadersProgress { last_height: target_height, last_time: 0 });
                self.emit(SyncEvent::FetchHeadersFinished);
                self.emit(SyncEvent::DiscoverAddressesStarted);
                self.emit(SyncEvent::DiscoverAddressesFinished);
                self.emit(SyncEvent::RescanStarted);
                self.emit(SyncEvent::RescanProgress { rescanned_through: target_height });
                self.emit(SyncEvent::RescanFinished);
                self.synced.store(true, Ordering::SeqCst);
                self.emit(SyncEvent::Synced(true));
                cancel.cancelled().await;
                Ok(())
            }
            SessionBehavior::FailAfter { delay } => {
                tokio::select! {
                    _ = cancel.cancelled() => Ok(()),
                    _ = tokio::time::sleep(delay) => {
                        self.emit(SyncEvent::PeerDisconnected { peer_count: 0, addr: self.peer_addr() });
                        Err(BackendError::Network("peer connection lost".into()))
                    }
                }
            }
            SessionBehavior::NeverSync => {
                cancel.cancelled().await;
                Ok(())
            }
        }
    }

    async fn synced(&self) -> (bool, i32) {
        let target = match self.behavior {
            SessionBehavior::SyncAndWait { target_height } => target_height,
            _ => 0,
        };
        (self.synced.load(Ordering::SeqCst), target)
    }

    async fn publish(&self, tx: &MsgTx) -> Result<(), BackendError> {
        if self.fail_publish.load(Ordering::SeqCst) {
            return Err(BackendError::Network("no peers accepted the transaction".into()));
        }
        self.published.lock().push(tx.tx_hash());
        Ok(())
    }
}

/// How a mock rescan proceeds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RescanPlan {
    /// Blocks per progress report.
    pub step: i32,
    /// Pause between reports.
    pub delay: Duration,
    /// Report this error once the scan reaches the height.
    pub fail_at: Option<i32>,
}

impl Default for RescanPlan {
    fn default() -> Self {
        Self { step: 10, delay: Duration::from_millis(5), fail_at: None }
    }
}

struct BackendState {
    unspent: Vec<UnspentCoin>,
    next_external: u32,
    next_internal: u32,
    locked: bool,
    passphrase: Vec<u8>,
    birth_state: Option<BirthState>,
    tip: BlockStamp,
    transactions: Vec<TransactionSummary>,
    known: HashMap<Hash256, MsgTx>,
    published: Vec<MsgTx>,
    sign_failures: Vec<u32>,
    network_backend: Option<Arc<dyn SyncSession>>,
    session_plan: VecDeque<SessionBehavior>,
    last_session: Option<Arc<MockSession>>,
    rescan: RescanPlan,
    slip0044_upgraded: bool,
    extended: Option<(u32, u32)>,
    list_unspent_calls: usize,
}

/// In-memory [`ChainBackend`] over one HD account.
pub struct MockBackend {
    network: Network,
    account: ExtendedKey,
    sessions_created: AtomicUsize,
    state: Mutex<BackendState>,
}

impl MockBackend {
    /// A spending wallet over `account`, locked with `passphrase`.
    pub fn new(network: Network, account: ExtendedKey, passphrase: &[u8]) -> Self {
        Self {
            network,
            account,
            sessions_created: AtomicUsize::new(0),
            state: Mutex::new(BackendState {
                unspent: Vec::new(),
                next_external: 0,
                next_internal: 0,
                locked: true,
                passphrase: passphrase.to_vec(),
                birth_state: None,
                tip: BlockStamp { hash: Hash256([0xaa; 32]), height: 100 },
                transactions: Vec::new(),
                known: HashMap::new(),
                published: Vec::new(),
                sign_failures: Vec::new(),
                network_backend: None,
                session_plan: VecDeque::new(),
                last_session: None,
                rescan: RescanPlan::default(),
                slip0044_upgraded: false,
                extended: None,
                list_unspent_calls: 0,
            }),
        }
    }

    /// A testnet wallet over a fixed seed.
    pub fn testnet() -> Result<Self, BackendError> {
        let account = account_key_from_seed(&[0x42; 32], Network::Testnet)?;
        Ok(Self::new(Network::Testnet, account, MOCK_PASSPHRASE))
    }

    pub fn add_unspent(&self, coin: UnspentCoin) {
        self.state.lock().unspent.push(coin);
    }

    pub fn add_transaction(&self, tx: MsgTx, summary: TransactionSummary) {
        let mut state = self.state.lock();
        state.known.insert(tx.tx_hash(), tx);
        state.transactions.push(summary);
    }

    pub fn set_next_indexes(&self, external: u32, internal: u32) {
        let mut state = self.state.lock();
        state.next_external = external;
        state.next_internal = internal;
    }

    pub fn set_tip(&self, height: i32) {
        self.state.lock().tip.height = height;
    }

    /// Fail signing of the listed input indexes.
    pub fn set_sign_failures(&self, inputs: Vec<u32>) {
        self.state.lock().sign_failures = inputs;
    }

    pub fn set_rescan_plan(&self, plan: RescanPlan) {
        self.state.lock().rescan = plan;
    }

    /// Behavior of the next session created. Unscripted sessions sync.
    pub fn push_session(&self, behavior: SessionBehavior) {
        self.state.lock().session_plan.push_back(behavior);
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn last_session(&self) -> Option<Arc<MockSession>> {
        self.state.lock().last_session.clone()
    }

    pub fn published(&self) -> Vec<MsgTx> {
        self.state.lock().published.clone()
    }

    pub fn list_unspent_calls(&self) -> usize {
        self.state.lock().list_unspent_calls
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }

    pub fn has_network_backend(&self) -> bool {
        self.state.lock().network_backend.is_some()
    }

    pub fn slip0044_upgraded(&self) -> bool {
        self.state.lock().slip0044_upgraded
    }

    pub fn extended(&self) -> Option<(u32, u32)> {
        self.state.lock().extended
    }

    pub fn account_key(&self) -> &ExtendedKey {
        &self.account
    }

    fn derive(&self, branch: u32, index: u32) -> Result<ExtendedKey, BackendError> {
        Ok(self.account.child(branch)?.child(index)?)
    }

    fn address_at(&self, branch: u32, index: u32) -> Result<Address, BackendError> {
        Ok(self.derive(branch, index)?.address()?)
    }

    /// Branch and index of an owned address within the search window.
    fn find_address(&self, address: &str) -> Result<Option<(u32, u32)>, BackendError> {
        let (external, internal) = {
            let state = self.state.lock();
            (state.next_external, state.next_internal)
        };
        for (branch, next) in [(0, external), (1, internal)] {
            for index in 0..next + ADDRESS_SEARCH_WINDOW {
                if self.address_at(branch, index)?.encode() == address {
                    return Ok(Some((branch, index)));
                }
            }
        }
        Ok(None)
    }

    fn check_account(account: u32) -> Result<(), BackendError> {
        if account != DEFAULT_ACCOUNT {
            return Err(BackendError::NotFound(format!("account {account}")));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainBackend for MockBackend {
    fn network(&self) -> Network {
        self.network
    }

    async fn list_unspent(
        &self,
        min_conf: i32,
        max_conf: i32,
        addresses: &[String],
        _account: &str,
    ) -> Result<Vec<UnspentCoin>, BackendError> {
        let mut state = self.state.lock();
        state.list_unspent_calls += 1;
        Ok(state
            .unspent
            .iter()
            .filter(|c| c.confirmations >= min_conf as i64 && c.confirmations <= max_conf as i64)
            .filter(|c| addresses.is_empty() || addresses.contains(&c.address))
            .cloned()
            .collect())
    }

    async fn is_change_address(&self, address: &str) -> Result<bool, BackendError> {
        Ok(matches!(self.find_address(address)?, Some((1, _))))
    }

    async fn author_transaction(&self, request: AuthorRequest) -> Result<AuthoredTx, BackendError> {
        Self::check_account(request.account)?;
        let fee_rate = if request.fee_rate == 0 { DEFAULT_RELAY_FEE_PER_KB } else { request.fee_rate };
        let internal = self.state.lock().next_internal;

        let change: Box<dyn ChangeSource> = match request.change_source {
            Some(change) => change,
            None => Box::new(ScriptChangeSource {
                script: self.address_at(1, internal)?.payment_script(),
                version: 0,
            }),
        };
        let mut inputs: Box<dyn InputSource> = match request.input_source {
            Some(inputs) => inputs,
            None => {
                let eligible: Vec<UnspentCoin> = self
                    .state
                    .lock()
                    .unspent
                    .iter()
                    .filter(|c| c.spendable && c.confirmations >= request.min_conf as i64)
                    .cloned()
                    .collect();
                let all = request.algorithm == OutputSelectionAlgorithm::All;
                Box::new(move |target: i64| -> Result<InputDetail, AuthorError> {
                    let mut detail = InputDetail::default();
                    for coin in &eligible {
                        if !all && detail.amount >= target {
                            break;
                        }
                        detail.push_coin(coin);
                    }
                    Ok(detail)
                })
            }
        };

        let authored = new_unsigned_transaction(request.outputs, fee_rate, inputs.as_mut(), change.as_ref())?;
        if authored.change_index.is_some() {
            self.state.lock().next_internal += 1;
        }
        Ok(authored)
    }

    async fn sign_transaction(
        &self,
        tx: &mut MsgTx,
        _hash_type: SigHashType,
    ) -> Result<Vec<SignatureError>, BackendError> {
        let state = self.state.lock();
        if state.locked {
            return Err(BackendError::Locked);
        }
        let mut errors = Vec::new();
        for (i, input) in tx.tx_in.iter_mut().enumerate() {
            let index = i as u32;
            if state.sign_failures.contains(&index) {
                errors.push(SignatureError { input_index: index, error: "no key for script".into() });
                continue;
            }
            let mut script = vec![opcodes::OP_DATA_32];
            script.extend_from_slice(&blake256(input.previous_outpoint.hash.as_bytes()));
            input.signature_script = script;
        }
        Ok(errors)
    }

    async fn publish_transaction(&self, tx: &MsgTx, session: &dyn SyncSession) -> Result<Hash256, BackendError> {
        session.publish(tx).await?;
        self.state.lock().published.push(tx.clone());
        Ok(tx.tx_hash())
    }

    async fn branch_next_indexes(&self, account: u32) -> Result<(u32, u32), BackendError> {
        Self::check_account(account)?;
        let state = self.state.lock();
        Ok((state.next_external, state.next_internal))
    }

    fn new_sync_session(&self, params: SessionParams) -> Result<Arc<dyn SyncSession>, BackendError> {
        self.sessions_created.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        let behavior = state.session_plan.pop_front().unwrap_or_default();
        let session = Arc::new(MockSession::new(behavior, params));
        state.last_session = Some(session.clone());
        Ok(session)
    }

    fn set_network_backend(&self, session: Option<Arc<dyn SyncSession>>) {
        self.state.lock().network_backend = session;
    }

    async fn rescan_progress_from_height(
        &self,
        cancel: CancelToken,
        height: i32,
        progress: mpsc::Sender<RescanProgress>,
    ) {
        let (plan, tip) = {
            let state = self.state.lock();
            (state.rescan.clone(), state.tip.height)
        };
        let step = plan.step.max(1);
        let mut through = height;
        loop {
            if cancel.is_cancelled() {
                return;
            }
            through = (through + step).min(tip);
            if let Some(fail_at) = plan.fail_at {
                if through >= fail_at {
                    let report = RescanProgress { scanned_through: fail_at, error: Some("rescan failed".into()) };
                    let _ = progress.send(report).await;
                    return;
                }
            }
            if progress.send(RescanProgress { scanned_through: through, error: None }).await.is_err() {
                return;
            }
            if through >= tip {
                return;
            }
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = tokio::time::sleep(plan.delay) => {}
            }
        }
    }

    async fn account_balances(&self, min_conf: i32) -> Result<Vec<Balance>, BackendError> {
        let state = self.state.lock();
        let mut balance = Balance::default();
        for coin in &state.unspent {
            balance.total += coin.amount;
            if coin.confirmations < min_conf as i64 {
                balance.unconfirmed += coin.amount;
            } else if coin.spendable {
                balance.spendable += coin.amount;
            } else {
                balance.locked += coin.amount;
            }
        }
        Ok(vec![balance])
    }

    async fn main_chain_tip(&self) -> Result<BlockStamp, BackendError> {
        Ok(self.state.lock().tip)
    }

    async fn birth_state(&self) -> Result<Option<BirthState>, BackendError> {
        Ok(self.state.lock().birth_state.clone())
    }

    async fn set_birth_state(&self, state: BirthState) -> Result<(), BackendError> {
        self.state.lock().birth_state = Some(state);
        Ok(())
    }

    async fn account_xpub(&self, account: u32) -> Result<ExtendedKey, BackendError> {
        Self::check_account(account)?;
        Ok(self.account.neuter()?)
    }

    async fn current_address(&self, account: u32) -> Result<Address, BackendError> {
        Self::check_account(account)?;
        let index = self.state.lock().next_external;
        self.address_at(0, index)
    }

    async fn new_external_address(&self, account: u32) -> Result<Address, BackendError> {
        Self::check_account(account)?;
        let index = {
            let mut state = self.state.lock();
            let index = state.next_external;
            state.next_external += 1;
            index
        };
        self.address_at(0, index)
    }

    async fn list_transactions(&self, from: usize, count: usize) -> Result<Vec<TransactionSummary>, BackendError> {
        let state = self.state.lock();
        Ok(state.transactions.iter().skip(from).take(count).cloned().collect())
    }

    async fn transactions_by_hashes(&self, hashes: &[Hash256]) -> Result<Vec<MsgTx>, BackendError> {
        let state = self.state.lock();
        Ok(hashes.iter().filter_map(|h| state.known.get(h).cloned()).collect())
    }

    async fn sign_message(&self, message: &str, address: &Address) -> Result<Vec<u8>, BackendError> {
        if self.state.lock().locked {
            return Err(BackendError::Locked);
        }
        let (branch, index) = self
            .find_address(&address.encode())?
            .ok_or_else(|| BackendError::NotFound(format!("address {}", address.encode())))?;
        let key = self.derive(branch, index)?.private_key()?;
        Ok(sign_compact(&key, message).to_vec())
    }

    async fn change_private_passphrase(&self, old: &[u8], new: &[u8]) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        if state.passphrase != old {
            return Err(BackendError::InvalidPassphrase);
        }
        state.passphrase = new.to_vec();
        Ok(())
    }

    async fn unlock(&self, passphrase: &[u8]) -> Result<(), BackendError> {
        if !self.account.is_private() {
            return Err(BackendError::Other("watching-only wallet has no private keys".into()));
        }
        let mut state = self.state.lock();
        if state.passphrase != passphrase {
            return Err(BackendError::InvalidPassphrase);
        }
        state.locked = false;
        Ok(())
    }

    fn lock(&self) {
        self.state.lock().locked = true;
    }

    async fn upgrade_to_slip0044_coin_type(&self) -> Result<(), BackendError> {
        self.state.lock().slip0044_upgraded = true;
        Ok(())
    }

    async fn extend_addresses(&self, external: u32, internal: u32) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.next_external = state.next_external.max(external);
        state.next_internal = state.next_internal.max(internal);
        state.extended = Some((external, internal));
        Ok(())
    }
}

/// Database handle that records whether it was closed.
pub struct MockDb {
    dir: PathBuf,
    closed: AtomicBool,
}

impl MockDb {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl WalletDb for MockDb {
    fn path(&self) -> &Path {
        &self.dir
    }

    fn close(&self) -> Result<(), BackendError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Err(BackendError::Closed);
        }
        Ok(())
    }
}

enum StoredWallet {
    Seed { seed: Zeroizing<Vec<u8>>, passphrase: Zeroizing<Vec<u8>> },
    WatchOnly(ExtendedKey),
}

#[derive(Default)]
struct LoaderState {
    wallets: HashMap<PathBuf, StoredWallet>,
    backends: HashMap<PathBuf, Arc<MockBackend>>,
    dbs: Vec<Arc<MockDb>>,
}

/// [`BackendLoader`] over [`MockBackend`]s.
#[derive(Default)]
pub struct MockLoader {
    state: Mutex<LoaderState>,
    fail_create: AtomicBool,
    fail_open: AtomicBool,
}

impl MockLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next wallet initialization fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make opening a wallet fail.
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// The backend opened for `dir`, if any.
    pub fn backend(&self, dir: &Path) -> Option<Arc<MockBackend>> {
        self.state.lock().backends.get(dir).cloned()
    }

    /// Every database handle handed out, oldest first.
    pub fn dbs(&self) -> Vec<Arc<MockDb>> {
        self.state.lock().dbs.clone()
    }

    fn new_db(&self, dir: &Path) -> Arc<MockDb> {
        let db = Arc::new(MockDb { dir: dir.to_path_buf(), closed: AtomicBool::new(false) });
        self.state.lock().dbs.push(db.clone());
        db
    }
}

#[async_trait]
impl BackendLoader for MockLoader {
    fn wallet_exists(&self, dir: &Path) -> Result<bool, BackendError> {
        Ok(dir.join(MOCK_DB_FILE).exists())
    }

    async fn create_db(&self, dir: &Path) -> Result<Arc<dyn WalletDb>, BackendError> {
        let file = dir.join(MOCK_DB_FILE);
        if file.exists() {
            return Err(BackendError::Database(format!("{} already exists", file.display())));
        }
        std::fs::write(&file, b"").map_err(|e| BackendError::Database(e.to_string()))?;
        Ok(self.new_db(dir))
    }

    async fn open_db(&self, dir: &Path) -> Result<Arc<dyn WalletDb>, BackendError> {
        if !self.wallet_exists(dir)? {
            return Err(BackendError::NotFound(dir.join(MOCK_DB_FILE).display().to_string()));
        }
        Ok(self.new_db(dir))
    }

    async fn create_wallet(&self, db: &Arc<dyn WalletDb>, params: CreateParams) -> Result<(), BackendError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::Database("injected create failure".into()));
        }
        let stored = StoredWallet::Seed { seed: params.seed, passphrase: params.private_passphrase };
        self.state.lock().wallets.insert(db.path().to_path_buf(), stored);
        Ok(())
    }

    async fn create_watch_only(
        &self,
        db: &Arc<dyn WalletDb>,
        xpub: &ExtendedKey,
        network: Network,
    ) -> Result<(), BackendError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::Database("injected create failure".into()));
        }
        if xpub.network() != network {
            return Err(BackendError::Other(format!("extended key is not for {network}")));
        }
        self.state.lock().wallets.insert(db.path().to_path_buf(), StoredWallet::WatchOnly(xpub.clone()));
        Ok(())
    }

    async fn open_wallet(
        &self,
        db: &Arc<dyn WalletDb>,
        params: &OpenParams,
    ) -> Result<Arc<dyn ChainBackend>, BackendError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(BackendError::Database("injected open failure".into()));
        }
        let dir = db.path().to_path_buf();
        let mut state = self.state.lock();
        if let Some(backend) = state.backends.get(&dir) {
            return Ok(backend.clone());
        }
        let backend = match state.wallets.get(&dir) {
            Some(StoredWallet::Seed { seed, passphrase }) => {
                let account = account_key_from_seed(seed, params.network)?;
                MockBackend::new(params.network, account, passphrase)
            }
            Some(StoredWallet::WatchOnly(xpub)) => MockBackend::new(params.network, xpub.clone(), &[]),
            None => return Err(BackendError::NotFound(format!("no wallet in {}", dir.display()))),
        };
        let backend = Arc::new(backend);
        state.backends.insert(dir, backend.clone());
        Ok(backend)
    }
}
