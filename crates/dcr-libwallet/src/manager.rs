//! Registry of named wallets.
//!
//! The manager owns a root [`CancelToken`] created by
//! [`WalletManager::initialize`]. Every wallet it creates or loads runs under
//! a child of that token, so [`WalletManager::shutdown`] reaches all of them.
//! Registry changes are serialized by one async mutex that is held across
//! wallet creation, mirroring a single global wallets lock.

use std::collections::HashMap;
use std::sync::Arc;

use dcr_core::cancel::CancelToken;
use dcr_core::traits::BackendLoader;
use dcr_wallet::Wallet;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::{ManagerConfig, WalletRequest};
use crate::error::ManagerError;
use crate::logging::init_logging;

struct Entry {
    wallet: Arc<Wallet>,
    cancel: CancelToken,
}

#[derive(Default)]
struct Registry {
    /// `None` until initialized and after shutdown.
    root: Option<CancelToken>,
    wallets: HashMap<String, Entry>,
}

impl Registry {
    /// Child token for a new wallet named `name`.
    fn admit(&self, name: &str) -> Result<CancelToken, ManagerError> {
        let root = self.root.as_ref().ok_or(ManagerError::NotInitialized)?;
        if self.wallets.contains_key(name) {
            return Err(ManagerError::DuplicateWalletName(name.to_string()));
        }
        Ok(root.child())
    }
}

pub struct WalletManager {
    config: ManagerConfig,
    loader: Arc<dyn BackendLoader>,
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletManager").field("config", &self.config).finish_non_exhaustive()
    }
}

impl WalletManager {
    pub fn new(config: ManagerConfig, loader: Arc<dyn BackendLoader>) -> Self {
        Self { config, loader, registry: Mutex::new(Registry::default()) }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Install logging and create the root token.
    pub async fn initialize(&self) -> Result<(), ManagerError> {
        let mut registry = self.registry.lock().await;
        if registry.root.is_some() {
            return Err(ManagerError::AlreadyInitialized);
        }
        init_logging(&self.config.log_level, &self.config.log_format)?;
        registry.root = Some(CancelToken::new());
        info!(data_dir = %self.config.data_dir.display(), "libwallet initialized");
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.registry.lock().await.root.is_some()
    }

    /// Close every wallet, then cancel the root token.
    ///
    /// Close failures are logged; shutdown continues with the next wallet.
    pub async fn shutdown(&self) -> Result<(), ManagerError> {
        let mut registry = self.registry.lock().await;
        let root = registry.root.take().ok_or(ManagerError::NotInitialized)?;
        debug!("libwallet shutting down");
        for (name, entry) in registry.wallets.drain() {
            if let Err(e) = close_entry(&name, entry).await {
                error!(wallet = %name, "close wallet error: {e}");
            }
        }
        root.cancel();
        info!("libwallet shutdown");
        Ok(())
    }

    /// Create a spending wallet: new, restored from `seed`, or rebuilt from
    /// the locally stored seed.
    pub async fn create_wallet(&self, request: &WalletRequest) -> Result<Arc<Wallet>, ManagerError> {
        let mut registry = self.registry.lock().await;
        let cancel = registry.admit(&request.name)?;
        let config = request.wallet_config(&self.config)?;
        let recovery = request.recovery()?;

        let created =
            Wallet::create(config, self.loader.clone(), cancel.clone(), request.pass.as_bytes(), recovery).await;
        self.register(&mut registry, &request.name, created, cancel)
    }

    pub async fn create_watch_only_wallet(&self, request: &WalletRequest) -> Result<Arc<Wallet>, ManagerError> {
        let mut registry = self.registry.lock().await;
        let cancel = registry.admit(&request.name)?;
        let config = request.wallet_config(&self.config)?;

        let created =
            Wallet::create_watch_only(config, self.loader.clone(), cancel.clone(), request.watch_only_key()).await;
        self.register(&mut registry, &request.name, created, cancel)
    }

    /// Load and open an existing wallet. A wallet already registered under
    /// the same name is returned as is.
    pub async fn load_wallet(&self, request: &WalletRequest) -> Result<Arc<Wallet>, ManagerError> {
        let mut registry = self.registry.lock().await;
        if registry.root.is_none() {
            return Err(ManagerError::NotInitialized);
        }
        if let Some(entry) = registry.wallets.get(&request.name) {
            debug!(wallet = %request.name, "wallet already loaded");
            return Ok(entry.wallet.clone());
        }
        let cancel = registry.admit(&request.name)?;
        let config = request.wallet_config(&self.config)?;

        let loaded = async {
            let wallet = Wallet::load(config, self.loader.clone(), cancel.clone())?;
            wallet.open_wallet().await?;
            Ok::<_, dcr_wallet::WalletError>(wallet)
        }
        .await;
        let wallet = self.register(&mut registry, &request.name, loaded, cancel)?;
        info!(wallet = %request.name, "wallet loaded");
        Ok(wallet)
    }

    fn register(
        &self,
        registry: &mut Registry,
        name: &str,
        wallet: Result<Wallet, dcr_wallet::WalletError>,
        cancel: CancelToken,
    ) -> Result<Arc<Wallet>, ManagerError> {
        let wallet = match wallet {
            Ok(wallet) => Arc::new(wallet),
            Err(e) => {
                cancel.cancel();
                return Err(e.into());
            }
        };
        registry.wallets.insert(name.to_string(), Entry { wallet: wallet.clone(), cancel });
        Ok(wallet)
    }

    /// Cancel the wallet's token, wait for its tasks, close it and drop it
    /// from the registry.
    pub async fn close_wallet(&self, name: &str) -> Result<(), ManagerError> {
        let mut registry = self.registry.lock().await;
        let entry = registry.wallets.remove(name).ok_or_else(|| ManagerError::WalletNotLoaded(name.to_string()))?;
        close_entry(name, entry).await?;
        info!(wallet = %name, "wallet shutdown");
        Ok(())
    }

    pub async fn wallet(&self, name: &str) -> Result<Arc<Wallet>, ManagerError> {
        let registry = self.registry.lock().await;
        registry
            .wallets
            .get(name)
            .map(|entry| entry.wallet.clone())
            .ok_or_else(|| ManagerError::WalletNotLoaded(name.to_string()))
    }

    /// Whether a wallet named `name` is registered.
    pub async fn wallet_exists(&self, name: &str) -> bool {
        self.registry.lock().await.wallets.contains_key(name)
    }

    /// Registered wallet names, sorted.
    pub async fn wallet_names(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        let mut names: Vec<String> = registry.wallets.keys().cloned().collect();
        names.sort();
        names
    }
}

async fn close_entry(name: &str, entry: Entry) -> Result<(), ManagerError> {
    debug!(wallet = %name, "closing wallet");
    entry.cancel.cancel();
    entry.wallet.close_wallet().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use dcr_core::testing::{MockLoader, MOCK_DB_FILE};
    use dcr_wallet::WalletError;

    const SEED_HEX: &str = "070707070707070707070707070707070707";

    struct Fixture {
        _tmp: tempfile::TempDir,
        loader: Arc<MockLoader>,
        manager: WalletManager,
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let config = ManagerConfig {
            data_dir: tmp.path().to_path_buf(),
            sync_retry_interval: Duration::from_millis(20),
            ..Default::default()
        };
        let loader = Arc::new(MockLoader::new());
        let manager = WalletManager::new(config, loader.clone());
        manager.initialize().await.unwrap();
        Fixture { _tmp: tmp, loader, manager }
    }

    fn request(name: &str) -> WalletRequest {
        WalletRequest { pass: "pass".into(), ..WalletRequest::new(name, "testnet") }
    }

    #[tokio::test]
    async fn requires_initialization() {
        let manager = WalletManager::new(ManagerConfig::default(), Arc::new(MockLoader::new()));
        assert!(!manager.is_initialized().await);
        assert_eq!(manager.create_wallet(&request("w")).await.unwrap_err(), ManagerError::NotInitialized);
        assert_eq!(manager.load_wallet(&request("w")).await.unwrap_err(), ManagerError::NotInitialized);
        assert_eq!(manager.shutdown().await.unwrap_err(), ManagerError::NotInitialized);
    }

    #[tokio::test]
    async fn initializes_once() {
        let fx = fixture().await;
        assert!(fx.manager.is_initialized().await);
        assert_eq!(fx.manager.initialize().await.unwrap_err(), ManagerError::AlreadyInitialized);
    }

    #[tokio::test]
    async fn names_are_unique() {
        let fx = fixture().await;
        fx.manager.create_wallet(&request("main")).await.unwrap();
        let err = fx.manager.create_wallet(&request("main")).await.unwrap_err();
        assert_eq!(err, ManagerError::DuplicateWalletName("main".into()));
        assert!(fx.manager.wallet_exists("main").await);
        assert_eq!(fx.manager.wallet_names().await, vec!["main".to_string()]);
    }

    #[tokio::test]
    async fn wallets_live_under_the_root_dir() {
        let fx = fixture().await;
        let wallet = fx.manager.create_wallet(&request("main")).await.unwrap();
        let expect = fx.manager.config().wallet_dir(dcr_core::Network::Testnet, "main");
        assert_eq!(wallet.data_dir(), expect.as_path());
        assert!(expect.join(MOCK_DB_FILE).exists());
    }

    #[tokio::test]
    async fn failed_creation_is_not_registered() {
        let fx = fixture().await;
        let bad = WalletRequest { seed: "0102".into(), ..request("bad") };
        let err = fx.manager.create_wallet(&bad).await.unwrap_err();
        assert!(matches!(err, ManagerError::Wallet(WalletError::InvalidArguments(_))));
        assert!(!fx.manager.wallet_exists("bad").await);

        // The name is free for a valid attempt.
        let good = WalletRequest { seed: SEED_HEX.into(), birthday: 1_650_000_000, ..request("bad") };
        let wallet = fx.manager.create_wallet(&good).await.unwrap();
        assert_eq!(wallet.birthday(), 1_650_000_000);
    }

    #[tokio::test]
    async fn load_reuses_registered_wallet() {
        let fx = fixture().await;
        let created = fx.manager.create_wallet(&request("main")).await.unwrap();
        let loaded = fx.manager.load_wallet(&request("main")).await.unwrap();
        assert!(Arc::ptr_eq(&created, &loaded));
    }

    #[tokio::test]
    async fn close_then_load_reopens() {
        let fx = fixture().await;
        let created = fx.manager.create_wallet(&request("main")).await.unwrap();
        let xpub = created.vault().default_account_xpub();
        fx.manager.close_wallet("main").await.unwrap();
        assert!(!created.is_open());
        assert!(created.cancel_token().is_cancelled());
        assert!(!fx.manager.wallet_exists("main").await);
        assert_eq!(
            fx.manager.close_wallet("main").await.unwrap_err(),
            ManagerError::WalletNotLoaded("main".into())
        );

        let loaded = fx.manager.load_wallet(&request("main")).await.unwrap();
        assert!(loaded.is_open());
        assert_eq!(loaded.vault().default_account_xpub(), xpub);
        assert!(!loaded.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn load_missing_wallet_fails() {
        let fx = fixture().await;
        let err = fx.manager.load_wallet(&request("ghost")).await.unwrap_err();
        assert!(matches!(err, ManagerError::Wallet(WalletError::WalletNotFound(_))));
        assert!(matches!(fx.manager.wallet("ghost").await, Err(ManagerError::WalletNotLoaded(_))));
    }

    #[tokio::test]
    async fn watch_only_through_request() {
        let fx = fixture().await;
        let spending = fx.manager.create_wallet(&request("spend")).await.unwrap();
        let xpub = spending.vault().default_account_xpub();

        let watch = WalletRequest { pub_key: xpub.clone(), ..WalletRequest::new("watch", "testnet") };
        let wallet = fx.manager.create_watch_only_wallet(&watch).await.unwrap();
        assert!(!wallet.vault().has_seed());
        assert_eq!(wallet.default_pubkey().await.unwrap(), xpub);
    }

    #[tokio::test]
    async fn shutdown_closes_everything() {
        let fx = fixture().await;
        let a = fx.manager.create_wallet(&request("a")).await.unwrap();
        let b = fx.manager.create_wallet(&request("b")).await.unwrap();
        a.start_sync(vec![]).unwrap();

        fx.manager.shutdown().await.unwrap();
        assert!(!a.is_open());
        assert!(!b.is_open());
        assert!(a.cancel_token().is_cancelled());
        assert!(fx.loader.dbs().iter().all(|db| db.is_closed()));
        assert!(!fx.manager.is_initialized().await);
        assert!(fx.manager.wallet_names().await.is_empty());
    }
}
