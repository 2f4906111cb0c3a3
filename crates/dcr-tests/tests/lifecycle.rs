//! Wallet lifecycle through the manager: create, use, close, reload and
//! restore after the backend database is lost.

use dcr_core::testing::{coin, MockLoader, MOCK_DB_FILE};
use dcr_core::MsgTx;
use dcr_libwallet::{Envelope, ManagerError, WalletManager, WalletRequest};
use dcr_tests::helpers::*;
use dcr_wallet::{BuildRequest, TxOutput, WalletError};
use std::sync::Arc;

#[tokio::test]
async fn create_sync_spend_close_reload() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;

    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    let xpub = wallet.vault().default_account_xpub();
    let backend = backend_of(&loader, &wallet);
    backend.add_unspent(coin(1, 0, 300_000_000, 10));
    backend.add_unspent(coin(2, 1, 200_000_000, 4));

    sync(&wallet).await;
    let receive = wallet.current_receive_address().await.unwrap();
    assert!(receive.starts_with("Ts"));

    let balance = Envelope::from_result(wallet.balance().await.map_err(ManagerError::from));
    assert_eq!(balance.payload, r#"{"confirmed":500000000,"unconfirmed":0}"#);

    let build = BuildRequest {
        outputs: vec![TxOutput::new(foreign_address(0x33), 120_000_000)],
        sign: true,
        ..Default::default()
    };
    let built = wallet.create_transaction(&build, PASS.as_bytes()).await.unwrap();
    assert!(built.fee > 0);
    assert!(backend.is_locked());

    let tx = MsgTx::from_bytes(&built.raw).unwrap();
    let decoded = wallet.decode_transaction(&tx.to_hex()).unwrap();
    assert_eq!(decoded.txid, built.txid.to_string());
    assert!(decoded.vout.iter().any(|out| out.value == 1.2));

    let txid = wallet.send_raw_transaction(&tx.to_hex()).await.unwrap();
    assert_eq!(txid, built.txid);
    assert_eq!(backend.published().len(), 1);

    manager.close_wallet("main").await.unwrap();
    assert!(!wallet.is_open());
    assert!(!backend.has_network_backend());

    let reloaded = manager.load_wallet(&request("main")).await.unwrap();
    assert!(reloaded.is_open());
    assert_eq!(reloaded.vault().default_account_xpub(), xpub);
    assert_eq!(reloaded.decrypt_seed(PASS.as_bytes()).unwrap().len(), dcr_wallet::SEED_LEN);

    manager.shutdown().await.unwrap();
    assert!(loader.dbs().iter().all(|db| db.is_closed()));
}

#[tokio::test]
async fn restore_from_local_seed_after_database_loss() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = started_manager(dir.path()).await;
    let original = WalletRequest { seed: SEED_HEX.into(), birthday: 1_600_000_000, ..request("main") };
    let wallet = manager.create_wallet(&original).await.unwrap();
    let xpub = wallet.vault().default_account_xpub();
    manager.shutdown().await.unwrap();

    std::fs::remove_file(wallet.data_dir().join(MOCK_DB_FILE)).unwrap();

    // A fresh process: new manager, new backend loader.
    let (manager, _) = started_manager(dir.path()).await;
    let err = manager.load_wallet(&request("main")).await.unwrap_err();
    assert!(matches!(err, ManagerError::Wallet(WalletError::WalletNotFound(_))));

    let local = WalletRequest { use_local_seed: true, ..request("main") };
    let restored = manager.create_wallet(&local).await.unwrap();
    assert_eq!(restored.vault().default_account_xpub(), xpub);
    assert_eq!(restored.birthday(), 1_600_000_000);
    assert_eq!(restored.default_pubkey().await.unwrap(), xpub);
    let birth = restored.birth_state().await.unwrap();
    assert_eq!(birth.time, 1_600_000_000 - 24 * 60 * 60);
}

#[tokio::test]
async fn watch_only_from_stored_key_after_database_loss() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = started_manager(dir.path()).await;
    let spending = manager.create_wallet(&request("spend")).await.unwrap();
    let xpub = spending.vault().default_account_xpub();

    let watch = WalletRequest { pub_key: xpub.clone(), ..WalletRequest::new("watch", "testnet") };
    let watching = manager.create_watch_only_wallet(&watch).await.unwrap();
    let watch_dir = watching.data_dir().to_path_buf();
    manager.shutdown().await.unwrap();
    std::fs::remove_file(watch_dir.join(MOCK_DB_FILE)).unwrap();

    let (manager, _) = started_manager(dir.path()).await;
    let local = WalletRequest { use_local_seed: true, ..WalletRequest::new("watch", "testnet") };
    let rebuilt = manager.create_watch_only_wallet(&local).await.unwrap();
    assert!(!rebuilt.vault().has_seed());
    assert_eq!(rebuilt.default_pubkey().await.unwrap(), xpub);

    let err = rebuilt.sign_message("hi", &foreign_address(1), b"").await.unwrap_err();
    assert!(matches!(err, WalletError::Backend(_)));
}

#[tokio::test]
async fn discarded_seed_stays_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();

    assert_eq!(wallet.discard_seed(b"wrong").unwrap_err(), WalletError::InvalidPassphrase);
    assert!(wallet.vault().has_seed());
    wallet.discard_seed(PASS.as_bytes()).unwrap();
    assert_eq!(wallet.decrypt_seed(PASS.as_bytes()).unwrap_err(), WalletError::SeedAlreadyVerified);

    // Passphrase changes still reach the backend.
    wallet.change_passphrase(PASS.as_bytes(), b"next").await.unwrap();

    manager.close_wallet("main").await.unwrap();
    let reloaded = manager.load_wallet(&request("main")).await.unwrap();
    assert!(!reloaded.vault().has_seed());
}

#[tokio::test]
async fn duplicate_and_unsynced_errors_reach_the_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();

    let dup = Envelope::from_result(manager.create_wallet(&request("main")).await.map(|_| "wallet created"));
    assert_eq!(dup.to_json(), r#"{"error":"wallet already exists with name: \"main\""}"#);

    let unsynced = Envelope::from_result(wallet.current_receive_address().await.map_err(ManagerError::from));
    assert_eq!(unsynced.errorcode, 1);
    assert!(unsynced.payload.is_empty());
}

#[tokio::test]
async fn wallets_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let loader = Arc::new(MockLoader::new());
    let manager = WalletManager::new(manager_config(dir.path()), loader.clone());
    manager.initialize().await.unwrap();

    let a = manager.create_wallet(&request("a")).await.unwrap();
    let b = manager.create_wallet(&request("b")).await.unwrap();
    assert_ne!(a.vault().default_account_xpub(), b.vault().default_account_xpub());

    sync(&a).await;
    assert!(!b.is_synced().await.unwrap());

    manager.close_wallet("a").await.unwrap();
    assert!(a.cancel_token().is_cancelled());
    assert!(!b.cancel_token().is_cancelled());
    assert_eq!(manager.wallet_names().await, vec!["b".to_string()]);
}
