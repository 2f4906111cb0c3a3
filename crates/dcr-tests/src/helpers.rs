//! Shared helpers for the integration tests.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dcr_core::address::Address;
use dcr_core::params::Network;
use dcr_core::testing::{MockBackend, MockLoader};
use dcr_libwallet::{ManagerConfig, WalletManager, WalletRequest};
use dcr_wallet::Wallet;

/// Passphrase of every spending wallet created here.
pub const PASS: &str = "integration-pass";

/// An 18-byte seed, hex encoded.
pub const SEED_HEX: &str = "00112233445566778899aabbccddeeff0011";

/// Manager rooted at `dir` with a short sync retry interval.
pub fn manager_config(dir: &Path) -> ManagerConfig {
    ManagerConfig {
        data_dir: dir.to_path_buf(),
        sync_retry_interval: Duration::from_millis(20),
        ..ManagerConfig::default()
    }
}

/// An initialized manager over a fresh in-memory loader.
pub async fn started_manager(dir: &Path) -> (WalletManager, Arc<MockLoader>) {
    let loader = Arc::new(MockLoader::new());
    let manager = WalletManager::new(manager_config(dir), loader.clone());
    manager.initialize().await.unwrap();
    (manager, loader)
}

/// Testnet spending wallet request named `name`.
pub fn request(name: &str) -> WalletRequest {
    WalletRequest { pass: PASS.to_string(), ..WalletRequest::new(name, "testnet") }
}

/// The in-memory backend behind `wallet`.
pub fn backend_of(loader: &MockLoader, wallet: &Wallet) -> Arc<MockBackend> {
    loader.backend(wallet.data_dir()).unwrap()
}

/// A testnet P2PKH address that belongs to no wallet.
pub fn foreign_address(byte: u8) -> String {
    Address::p2pkh([byte; 20], Network::Testnet).encode()
}

/// Poll `check` until it holds, panicking after about two seconds.
pub async fn wait_for<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..400 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// Start syncing and wait for the initial sync to complete.
pub async fn sync(wallet: &Wallet) {
    wallet.start_sync(vec![]).unwrap();
    wait_for("initial sync", move || async move { wallet.is_synced().await.unwrap() }).await;
}
