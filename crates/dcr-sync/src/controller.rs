//! Background SPV sync supervision.
//!
//! [`SyncController::start`] spawns a supervisor that builds a fresh session
//! per attempt and runs it until cancellation. A session that ends for any
//! other reason is retried after a fixed, cancelable backoff, without limit.
//! Cancellation of the sync token is the only clean exit, and it is the
//! only place the "sync ended" signal fires.
//!
//! Two locks guard independent state: the lifecycle mutex covers session
//! creation and teardown, and the status lock covers [`SyncStatus`]. Status
//! reads never wait on a slow session restart.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use dcr_core::cancel::CancelToken;
use dcr_core::traits::{ChainBackend, SessionParams, SyncSession};
use dcr_core::types::SyncEvent;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::status::{SyncStatus, SyncStatusReport};

#[derive(Default)]
struct Lifecycle {
    /// Token of the running sync, `None` when idle.
    cancel: Option<CancelToken>,
    /// Resolves to `true` once the running sync has fully stopped.
    ended: Option<watch::Receiver<bool>>,
    cancel_requested: bool,
}

struct Shared {
    backend: Arc<dyn ChainBackend>,
    config: SyncConfig,
    /// Governing token of the wallet. Sync and rescans derive from it.
    wallet_cancel: CancelToken,
    lifecycle: Mutex<Lifecycle>,
    status: RwLock<SyncStatus>,
    session: RwLock<Option<Arc<dyn SyncSession>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Owns the sync lifecycle and status of one wallet.
#[derive(Clone)]
pub struct SyncController {
    shared: Arc<Shared>,
}

impl SyncController {
    pub fn new(backend: Arc<dyn ChainBackend>, config: SyncConfig, wallet_cancel: CancelToken) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                wallet_cancel,
                lifecycle: Mutex::new(Lifecycle::default()),
                status: RwLock::new(SyncStatus::default()),
                session: RwLock::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start syncing in the background and return immediately.
    ///
    /// Fails with [`SyncError::AlreadySyncing`] while a sync is active,
    /// leaving that sync untouched.
    pub fn start(&self, persistent_peers: Vec<String>) -> Result<(), SyncError> {
        let (cancel, ended_tx) = {
            let mut lifecycle = self.shared.lifecycle.lock();
            if lifecycle.cancel.is_some() {
                return Err(SyncError::AlreadySyncing);
            }
            let cancel = self.shared.wallet_cancel.child();
            let (ended_tx, ended_rx) = watch::channel(false);
            lifecycle.cancel = Some(cancel.clone());
            lifecycle.ended = Some(ended_rx);
            lifecycle.cancel_requested = false;
            (cancel, ended_tx)
        };

        info!(peers = persistent_peers.len(), "Starting sync...");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(consume_events(self.shared.clone(), events_rx, cancel.clone()));
        let supervisor = tokio::spawn(supervise(self.shared.clone(), cancel, persistent_peers, events_tx, ended_tx));

        let mut tasks = self.shared.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(consumer);
        tasks.push(supervisor);
        Ok(())
    }

    /// Request the running sync to stop. A no-op when already stopping or
    /// not running.
    pub fn stop(&self) {
        let mut lifecycle = self.shared.lifecycle.lock();
        if lifecycle.cancel_requested || lifecycle.cancel.is_none() {
            info!("sync is already canceling or not running");
            return;
        }
        info!("canceling sync... this may take a moment");
        lifecycle.cancel_requested = true;
        if let Some(cancel) = &lifecycle.cancel {
            cancel.cancel();
        }
    }

    /// Wait until the running sync, if any, has fully stopped.
    pub async fn wait_for_stop(&self) {
        let ended = self.shared.lifecycle.lock().ended.clone();
        if let Some(mut ended) = ended {
            // A dropped sender also means the supervisor is gone.
            let _ = ended.wait_for(|done| *done).await;
        }
    }

    /// Whether a stop was requested and the sync has not ended yet.
    pub fn is_stopping(&self) -> bool {
        self.shared.lifecycle.lock().cancel_requested
    }

    /// Whether a sync was started and has not ended.
    pub fn is_syncing_or_synced(&self) -> bool {
        self.shared.lifecycle.lock().cancel.is_some()
    }

    /// The current session, if one is attached.
    pub fn session(&self) -> Option<Arc<dyn SyncSession>> {
        self.shared.session.read().clone()
    }

    /// Whether the current session finished its initial sync, and the
    /// session's target height.
    pub async fn synced(&self) -> (bool, i32) {
        match self.session() {
            Some(session) => session.synced().await,
            None => (false, 0),
        }
    }

    pub async fn is_synced(&self) -> bool {
        self.synced().await.0
    }

    /// A session exists and has not reached the synced condition.
    pub async fn is_syncing(&self) -> bool {
        if self.is_synced().await {
            return false;
        }
        self.is_syncing_or_synced()
    }

    /// Snapshot of the status record.
    pub fn status_snapshot(&self) -> SyncStatus {
        self.shared.status.read().clone()
    }

    /// Caller-facing status. Forces Complete when the session reports synced
    /// and no rescan is running, in case the synced event was missed.
    pub async fn status(&self) -> SyncStatusReport {
        let (synced, target_height) = self.synced().await;
        let mut status = self.shared.status.write();
        if status.reconcile(synced) {
            debug!("sync status forced to complete");
        }
        status.report(target_height)
    }

    /// Rescan the chain from `height` in the background.
    pub async fn rescan_from_height(&self, height: i32) -> Result<(), SyncError> {
        if !self.is_synced().await {
            return Err(SyncError::NotSynced("rescanFromHeight"));
        }
        self.shared.status.write().begin_rescan(height)?;

        info!(height, "rescan started");
        let relay = tokio::spawn(relay_rescan(self.shared.clone(), height));
        let mut tasks = self.shared.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(relay);
        Ok(())
    }

    /// Wait for every background task this controller spawned to exit.
    pub async fn wait_for_tasks(&self) {
        loop {
            let tasks = std::mem::take(&mut *self.shared.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            for task in tasks {
                if let Err(e) = task.await {
                    error!("sync task failed: {e}");
                }
            }
        }
    }
}

/// Apply session events to the status record until cancelled.
async fn consume_events(shared: Arc<Shared>, mut events: mpsc::UnboundedReceiver<SyncEvent>, cancel: CancelToken) {
    loop {
        let event = tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
            _ = cancel.cancelled() => return,
        };
        let applied = shared.status.write().apply(&event);
        if !applied {
            debug!(?event, "ignored sync event during rescan");
            continue;
        }
        match &event {
            SyncEvent::Synced(true) => info!("Sync completed."),
            SyncEvent::PeerConnected { peer_count, addr } => info!(%addr, peer_count, "connected to peer"),
            SyncEvent::PeerDisconnected { peer_count, addr } => info!(%addr, peer_count, "disconnected from peer"),
            _ => debug!(?event, "sync progress"),
        }
    }
}

/// Run fresh sessions until the sync token is cancelled.
async fn supervise(
    shared: Arc<Shared>,
    cancel: CancelToken,
    persistent_peers: Vec<String>,
    events: mpsc::UnboundedSender<SyncEvent>,
    ended: watch::Sender<bool>,
) {
    let retry = shared.config.retry_interval;
    loop {
        let params = SessionParams { persistent_peers: persistent_peers.clone(), events: events.clone() };
        let result = match shared.backend.new_sync_session(params) {
            Ok(session) => {
                *shared.session.write() = Some(session.clone());
                shared.backend.set_network_backend(Some(session.clone()));
                session.run(cancel.clone()).await
            }
            Err(e) => Err(e),
        };
        if cancel.is_cancelled() {
            break;
        }

        match result {
            Ok(()) => warn!("SPV synchronization ended. Trying again in {} seconds", retry.as_secs()),
            Err(e) => error!("SPV synchronization ended. Trying again in {} seconds: {e}", retry.as_secs()),
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(retry) => {}
        }
    }

    *shared.session.write() = None;
    shared.backend.set_network_backend(None);
    sync_ended(&shared);
    // Receivers may all be gone.
    let _ = ended.send(true);
}

fn sync_ended(shared: &Shared) {
    let mut lifecycle = shared.lifecycle.lock();
    if lifecycle.cancel.is_none() {
        return;
    }
    lifecycle.cancel = None;
    lifecycle.ended = None;
    lifecycle.cancel_requested = false;
    info!("sync canceled");
}

/// Relay rescan progress into the status record until the stream closes,
/// reports an error, or the wallet is cancelled.
async fn relay_rescan(shared: Arc<Shared>, height: i32) {
    let cancel = shared.wallet_cancel.clone();
    let (progress_tx, mut progress) = mpsc::channel(shared.config.rescan_channel_capacity.max(1));
    let backend = shared.backend.clone();
    let scan_cancel = cancel.clone();
    let scanner = tokio::spawn(async move {
        backend.rescan_progress_from_height(scan_cancel, height, progress_tx).await;
    });

    loop {
        tokio::select! {
            p = progress.recv() => match p {
                None => break,
                Some(p) => {
                    if let Some(err) = p.error {
                        error!(height = p.scanned_through, "rescan error: {err}");
                        break;
                    }
                    shared.status.write().rescan_progress(p.scanned_through);
                }
            },
            _ = cancel.cancelled() => break,
        }
    }

    // Dropping the receiver unblocks a scanner waiting to send.
    drop(progress);
    if let Err(e) = scanner.await {
        error!("rescan task failed: {e}");
    }
    shared.status.write().finish_rescan();
    info!("rescan finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use dcr_core::testing::{MockBackend, RescanPlan, SessionBehavior};

    use crate::status::SyncStatusCode;

    fn controller(backend: Arc<MockBackend>, retry_ms: u64) -> (SyncController, CancelToken) {
        let cancel = CancelToken::new();
        let config = SyncConfig::with_retry_interval(Duration::from_millis(retry_ms));
        (SyncController::new(backend, config, cancel.clone()), cancel)
    }

    async fn wait_until<F: Fn() -> bool>(f: F) {
        for _ in 0..200 {
            if f() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    async fn wait_synced(ctl: &SyncController) {
        for _ in 0..200 {
            if ctl.is_synced().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("never synced");
    }

    #[tokio::test]
    async fn start_sync_and_stop() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, _cancel) = controller(backend.clone(), 10);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;
        assert!(backend.has_network_backend());
        assert!(!ctl.is_syncing().await);

        ctl.stop();
        ctl.wait_for_stop().await;
        assert!(!ctl.is_syncing_or_synced());
        assert!(ctl.session().is_none());
        assert!(!backend.has_network_backend());
    }

    #[tokio::test]
    async fn second_start_fails_without_disturbing_first() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, _cancel) = controller(backend.clone(), 10);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;
        assert_eq!(ctl.start(vec![]).unwrap_err(), SyncError::AlreadySyncing);
        assert_eq!(backend.sessions_created(), 1);
        assert!(ctl.is_synced().await);
        ctl.stop();
        ctl.wait_for_stop().await;
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, _cancel) = controller(backend, 10);
        ctl.stop();
        ctl.start(vec![]).unwrap();
        ctl.stop();
        ctl.stop();
        ctl.wait_for_stop().await;
        ctl.stop();
        ctl.wait_for_stop().await;
    }

    #[tokio::test]
    async fn failed_sessions_are_replaced() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        backend.push_session(SessionBehavior::FailAfter { delay: Duration::from_millis(1) });
        backend.push_session(SessionBehavior::FailAfter { delay: Duration::from_millis(1) });
        let (ctl, _cancel) = controller(backend.clone(), 5);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;
        assert_eq!(backend.sessions_created(), 3);
        ctl.stop();
        ctl.wait_for_stop().await;
    }

    #[tokio::test]
    async fn cancel_during_backoff_ends_sync() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        backend.push_session(SessionBehavior::FailAfter { delay: Duration::from_millis(1) });
        let (ctl, _cancel) = controller(backend.clone(), 60_000);
        ctl.start(vec![]).unwrap();
        let b = backend.clone();
        wait_until(move || b.last_session().is_some()).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        ctl.stop();
        tokio::time::timeout(Duration::from_secs(2), ctl.wait_for_stop()).await.unwrap();
        assert_eq!(backend.sessions_created(), 1);
        assert!(!ctl.is_syncing_or_synced());
    }

    #[tokio::test]
    async fn wallet_cancel_stops_sync() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, cancel) = controller(backend, 10);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;
        cancel.cancel();
        ctl.wait_for_stop().await;
        ctl.wait_for_tasks().await;
        assert!(ctl.session().is_none());
    }

    #[tokio::test]
    async fn status_reaches_complete() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, _cancel) = controller(backend, 10);
        assert_eq!(ctl.status().await.syncstatuscode, 0);
        ctl.start(vec!["10.0.0.1:19108".into()]).unwrap();
        wait_synced(&ctl).await;
        let report = ctl.status().await;
        assert_eq!(report.syncstatuscode, SyncStatusCode::Complete.as_i32());
        assert_eq!(report.targetheight, 100);
        ctl.stop();
        ctl.wait_for_stop().await;
    }

    #[tokio::test]
    async fn rescan_requires_sync() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        let (ctl, _cancel) = controller(backend, 10);
        let err = ctl.rescan_from_height(5).await.unwrap_err();
        assert_eq!(err.code(), Some(1));
    }

    #[tokio::test]
    async fn rescan_runs_to_completion() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        backend.set_tip(60);
        backend.set_rescan_plan(RescanPlan { step: 10, delay: Duration::from_millis(20), fail_at: None });
        let (ctl, _cancel) = controller(backend, 10);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;

        ctl.rescan_from_height(0).await.unwrap();
        assert_eq!(ctl.rescan_from_height(0).await.unwrap_err(), SyncError::AlreadyRescanning);
        let report = ctl.status().await;
        assert_eq!(report.syncstatuscode, SyncStatusCode::Rescanning.as_i32());
        assert!(report.rescanheight.is_some());

        let c = ctl.clone();
        wait_until(move || !c.status_snapshot().rescanning).await;
        let status = ctl.status_snapshot();
        assert_eq!(status.code, SyncStatusCode::Complete);
        assert_eq!(status.rescan_height, 60);

        ctl.stop();
        ctl.wait_for_stop().await;
    }

    #[tokio::test]
    async fn rescan_error_ends_rescan() {
        let backend = Arc::new(MockBackend::testnet().unwrap());
        backend.set_rescan_plan(RescanPlan { step: 10, delay: Duration::from_millis(1), fail_at: Some(30) });
        let (ctl, _cancel) = controller(backend, 10);
        ctl.start(vec![]).unwrap();
        wait_synced(&ctl).await;

        ctl.rescan_from_height(0).await.unwrap();
        let c = ctl.clone();
        wait_until(move || !c.status_snapshot().rescanning).await;
        let status = ctl.status_snapshot();
        assert_eq!(status.code, SyncStatusCode::Complete);
        assert!(status.rescan_height < 30);

        ctl.stop();
        ctl.wait_for_stop().await;
    }
}
