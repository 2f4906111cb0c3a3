//! Sync supervision seen through a managed wallet: restarts, stop and
//! restart, status reports and user rescans.

use std::time::Duration;

use dcr_core::testing::{RescanPlan, SessionBehavior};
use dcr_sync::{SyncError, SyncStatusCode};
use dcr_tests::helpers::*;
use dcr_wallet::WalletError;

#[tokio::test]
async fn failed_sessions_are_restarted() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    let backend = backend_of(&loader, &wallet);
    backend.push_session(SessionBehavior::FailAfter { delay: Duration::from_millis(10) });
    backend.push_session(SessionBehavior::FailAfter { delay: Duration::from_millis(10) });

    sync(&wallet).await;
    assert_eq!(backend.sessions_created(), 3);
    assert!(backend.has_network_backend());
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn stop_then_start_again() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    let backend = backend_of(&loader, &wallet);

    sync(&wallet).await;
    wallet.stop_sync().unwrap();
    // A second stop is a logged no-op.
    wallet.stop_sync().unwrap();
    wallet.wait_for_sync_to_stop().await.unwrap();
    assert!(!backend.has_network_backend());
    assert!(!wallet.is_synced().await.unwrap());
    assert!(matches!(
        wallet.send_raw_transaction(&dcr_core::MsgTx::new().to_hex()).await,
        Err(WalletError::Sync(SyncError::NoActiveSyncSession))
    ));

    sync(&wallet).await;
    assert_eq!(backend.sessions_created(), 2);
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn status_before_and_after_sync() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, _) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();

    let idle = wallet.sync_status().await.unwrap();
    assert_eq!(idle.syncstatuscode, SyncStatusCode::NotStarted.as_i32());
    assert_eq!(serde_json::to_value(&idle).unwrap()["syncstatus"], "not started");
    assert!(!wallet.is_syncing().await.unwrap());

    sync(&wallet).await;
    let w = wallet.as_ref();
    wait_for("peer event", move || async move { w.sync_status().await.unwrap().numpeers == 1 }).await;
    let done = wallet.sync_status().await.unwrap();
    assert_eq!(done.syncstatuscode, SyncStatusCode::Complete.as_i32());
    assert_eq!(done.targetheight, 100);
    assert_eq!(done.numpeers, 1);
    let json = serde_json::to_value(&done).unwrap();
    for field in ["cfiltersheight", "headersheight", "rescanheight"] {
        assert!(json.get(field).is_none(), "{field} present when complete");
    }
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn never_synced_session_reports_syncing() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    backend_of(&loader, &wallet).push_session(SessionBehavior::NeverSync);

    wallet.start_sync(vec![]).unwrap();
    let w = wallet.as_ref();
    wait_for("session attached", move || async move { w.is_syncing().await.unwrap() }).await;
    assert!(!wallet.is_synced().await.unwrap());
    let err = wallet.rescan_from_height(0).await.unwrap_err();
    assert_eq!(err.code(), Some(1));
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn rescan_runs_once_at_a_time() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    backend_of(&loader, &wallet).set_rescan_plan(RescanPlan {
        step: 10,
        delay: Duration::from_millis(20),
        fail_at: None,
    });

    sync(&wallet).await;
    wallet.rescan_from_height(0).await.unwrap();
    let during = wallet.sync_status().await.unwrap();
    assert_eq!(during.syncstatuscode, SyncStatusCode::Rescanning.as_i32());
    assert!(during.rescanheight.is_some());

    let again = wallet.rescan_from_height(50).await.unwrap_err();
    assert_eq!(again, WalletError::Sync(SyncError::AlreadyRescanning));

    let w = wallet.as_ref();
    wait_for("rescan to finish", move || async move {
        w.sync_status().await.unwrap().syncstatuscode == SyncStatusCode::Complete.as_i32()
    })
    .await;
    wallet.rescan_from_height(90).await.unwrap();
    manager.shutdown().await.unwrap();
}

#[tokio::test]
async fn failing_rescan_returns_to_complete() {
    let dir = tempfile::tempdir().unwrap();
    let (manager, loader) = started_manager(dir.path()).await;
    let wallet = manager.create_wallet(&request("main")).await.unwrap();
    backend_of(&loader, &wallet).set_rescan_plan(RescanPlan {
        step: 10,
        delay: Duration::from_millis(1),
        fail_at: Some(40),
    });

    sync(&wallet).await;
    wallet.rescan_from_height(0).await.unwrap();
    let w = wallet.as_ref();
    wait_for("failed rescan to settle", move || async move {
        w.sync_status().await.unwrap().syncstatuscode == SyncStatusCode::Complete.as_i32()
    })
    .await;
    assert!(wallet.is_synced().await.unwrap());
    manager.shutdown().await.unwrap();
}
