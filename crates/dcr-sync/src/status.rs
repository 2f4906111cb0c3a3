//! Sync status record and event application.
//!
//! A single [`SyncStatus`] per wallet is owned by the controller and updated
//! from the typed event stream of the running session. While a user rescan
//! is active, phase transitions from the ordinary sync pipeline are ignored
//! so they cannot overwrite the rescan's state.

use std::fmt;

use dcr_core::types::SyncEvent;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Phase of wallet synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SyncStatusCode {
    #[default]
    NotStarted = 0,
    FetchingCFilters = 1,
    FetchingHeaders = 2,
    DiscoveringAddresses = 3,
    Rescanning = 4,
    Complete = 5,
}

impl SyncStatusCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for SyncStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SyncStatusCode::NotStarted => "not started",
            SyncStatusCode::FetchingCFilters => "fetching cfilters",
            SyncStatusCode::FetchingHeaders => "fetching headers",
            SyncStatusCode::DiscoveringAddresses => "discovering addresses",
            SyncStatusCode::Rescanning => "rescanning",
            SyncStatusCode::Complete => "sync complete",
        };
        f.write_str(s)
    }
}

/// Current sync phase plus progress counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStatus {
    pub code: SyncStatusCode,
    pub target_height: i32,
    pub cfilters_height: i32,
    pub headers_height: i32,
    pub rescan_height: i32,
    pub num_peers: i32,
    /// A user rescan is running.
    pub rescanning: bool,
}

impl SyncStatus {
    /// Apply one session event. Returns `false` when the event was ignored
    /// because a rescan is in progress.
    pub fn apply(&mut self, event: &SyncEvent) -> bool {
        match event {
            SyncEvent::Synced(synced) => {
                if !*synced || self.rescanning {
                    return false;
                }
                self.code = SyncStatusCode::Complete;
            }
            SyncEvent::PeerConnected { peer_count, .. } | SyncEvent::PeerDisconnected { peer_count, .. } => {
                self.num_peers = *peer_count;
            }
            SyncEvent::FetchMissingCFiltersStarted => return self.enter(SyncStatusCode::FetchingCFilters),
            SyncEvent::FetchMissingCFiltersProgress { end_height, .. } => {
                self.cfilters_height = *end_height;
                self.target_height = self.target_height.max(*end_height);
            }
            SyncEvent::FetchMissingCFiltersFinished => self.cfilters_height = self.target_height,
            SyncEvent::FetchHeadersStarted => return self.enter(SyncStatusCode::FetchingHeaders),
            SyncEvent::FetchHeadersProgress { last_height, .. } => {
                self.headers_height = *last_height;
                self.target_height = self.target_height.max(*last_height);
            }
            SyncEvent::FetchHeadersFinished => self.headers_height = self.target_height,
            SyncEvent::DiscoverAddressesStarted => return self.enter(SyncStatusCode::DiscoveringAddresses),
            SyncEvent::DiscoverAddressesFinished => {}
            SyncEvent::RescanStarted => return self.enter(SyncStatusCode::Rescanning),
            SyncEvent::RescanProgress { rescanned_through } => {
                if self.rescanning {
                    return false;
                }
                self.rescan_height = *rescanned_through;
            }
            SyncEvent::RescanFinished => {
                if self.rescanning {
                    return false;
                }
                self.rescan_height = self.target_height;
            }
        }
        true
    }

    fn enter(&mut self, code: SyncStatusCode) -> bool {
        if self.rescanning {
            return false;
        }
        self.code = code;
        true
    }

    /// Mark a user rescan from `height` as started.
    pub fn begin_rescan(&mut self, height: i32) -> Result<(), SyncError> {
        if self.rescanning {
            return Err(SyncError::AlreadyRescanning);
        }
        self.code = SyncStatusCode::Rescanning;
        self.rescanning = true;
        self.rescan_height = height;
        Ok(())
    }

    /// Record rescan progress. Ignored when no rescan is running.
    pub fn rescan_progress(&mut self, scanned_through: i32) {
        if self.rescanning {
            self.rescan_height = scanned_through;
        }
    }

    /// End the user rescan and return to Complete.
    pub fn finish_rescan(&mut self) {
        self.code = SyncStatusCode::Complete;
        self.rescanning = false;
    }

    /// Force Complete when the session reports synced and no rescan runs.
    /// Returns whether the code changed.
    pub fn reconcile(&mut self, synced: bool) -> bool {
        if self.code != SyncStatusCode::Complete && synced && !self.rescanning {
            self.code = SyncStatusCode::Complete;
            return true;
        }
        false
    }

    /// Caller-facing snapshot. `target_height` overrides the tracked target
    /// when positive.
    pub fn report(&self, target_height: i32) -> SyncStatusReport {
        let target = if target_height > 0 { target_height } else { self.target_height };
        SyncStatusReport {
            syncstatuscode: self.code.as_i32(),
            syncstatus: self.code.to_string(),
            targetheight: target,
            numpeers: self.num_peers,
            cfiltersheight: (self.code == SyncStatusCode::FetchingCFilters).then_some(self.cfilters_height),
            headersheight: (self.code == SyncStatusCode::FetchingHeaders).then_some(self.headers_height),
            rescanheight: (self.code == SyncStatusCode::Rescanning).then_some(self.rescan_height),
        }
    }
}

/// Serializable sync status returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusReport {
    pub syncstatuscode: i32,
    pub syncstatus: String,
    pub targetheight: i32,
    pub numpeers: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cfiltersheight: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headersheight: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rescanheight: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_strings() {
        assert_eq!(SyncStatusCode::NotStarted.to_string(), "not started");
        assert_eq!(SyncStatusCode::DiscoveringAddresses.to_string(), "discovering addresses");
        assert_eq!(SyncStatusCode::Complete.to_string(), "sync complete");
        assert_eq!(SyncStatusCode::Complete.as_i32(), 5);
    }

    #[test]
    fn pipeline_events_advance_phases() {
        let mut s = SyncStatus::default();
        s.apply(&SyncEvent::PeerConnected { peer_count: 2, addr: "a".into() });
        s.apply(&SyncEvent::FetchMissingCFiltersStarted);
        assert_eq!(s.code, SyncStatusCode::FetchingCFilters);
        s.apply(&SyncEvent::FetchMissingCFiltersProgress { start_height: 0, end_height: 50 });
        s.apply(&SyncEvent::FetchHeadersStarted);
        s.apply(&SyncEvent::FetchHeadersProgress { last_height: 80, last_time: 0 });
        assert_eq!(s.code, SyncStatusCode::FetchingHeaders);
        assert_eq!(s.headers_height, 80);
        assert_eq!(s.target_height, 80);
        s.apply(&SyncEvent::Synced(true));
        assert_eq!(s.code, SyncStatusCode::Complete);
        assert_eq!(s.num_peers, 2);
    }

    #[test]
    fn finished_events_jump_to_target() {
        let mut s = SyncStatus { target_height: 120, ..Default::default() };
        s.apply(&SyncEvent::FetchMissingCFiltersFinished);
        s.apply(&SyncEvent::FetchHeadersFinished);
        assert_eq!(s.cfilters_height, 120);
        assert_eq!(s.headers_height, 120);
    }

    #[test]
    fn rescan_gates_pipeline_transitions() {
        let mut s = SyncStatus::default();
        s.begin_rescan(10).unwrap();
        assert!(!s.apply(&SyncEvent::FetchHeadersStarted));
        assert!(!s.apply(&SyncEvent::DiscoverAddressesStarted));
        assert!(!s.apply(&SyncEvent::RescanProgress { rescanned_through: 99 }));
        assert!(!s.apply(&SyncEvent::Synced(true)));
        assert_eq!(s.code, SyncStatusCode::Rescanning);
        assert_eq!(s.rescan_height, 10);

        // Peer counts still track.
        assert!(s.apply(&SyncEvent::PeerDisconnected { peer_count: 0, addr: "a".into() }));
        assert_eq!(s.num_peers, 0);
    }

    #[test]
    fn second_rescan_is_rejected() {
        let mut s = SyncStatus::default();
        s.begin_rescan(1).unwrap();
        assert_eq!(s.begin_rescan(2).unwrap_err(), SyncError::AlreadyRescanning);
        s.rescan_progress(40);
        assert_eq!(s.rescan_height, 40);
        s.finish_rescan();
        assert_eq!(s.code, SyncStatusCode::Complete);
        assert!(!s.rescanning);
        s.begin_rescan(2).unwrap();
    }

    #[test]
    fn reconcile_forces_complete_unless_rescanning() {
        let mut s = SyncStatus { code: SyncStatusCode::FetchingHeaders, ..Default::default() };
        assert!(!s.reconcile(false));
        assert!(s.reconcile(true));
        assert_eq!(s.code, SyncStatusCode::Complete);

        let mut r = SyncStatus::default();
        r.begin_rescan(5).unwrap();
        assert!(!r.reconcile(true));
        assert_eq!(r.code, SyncStatusCode::Rescanning);
    }

    #[test]
    fn report_includes_height_for_current_phase_only() {
        let s = SyncStatus {
            code: SyncStatusCode::FetchingHeaders,
            headers_height: 70,
            cfilters_height: 60,
            num_peers: 3,
            ..Default::default()
        };
        let json = serde_json::to_value(s.report(100)).unwrap();
        assert_eq!(json["syncstatuscode"], 2);
        assert_eq!(json["syncstatus"], "fetching headers");
        assert_eq!(json["targetheight"], 100);
        assert_eq!(json["numpeers"], 3);
        assert_eq!(json["headersheight"], 70);
        assert!(json.get("cfiltersheight").is_none());
        assert!(json.get("rescanheight").is_none());
    }

    #[test]
    fn report_falls_back_to_tracked_target() {
        let s = SyncStatus { target_height: 42, ..Default::default() };
        assert_eq!(s.report(0).targetheight, 42);
    }
}
