//! Sync controller error types.

use dcr_core::error::BackendError;
use thiserror::Error;

/// Envelope error code for operations that require a synced wallet.
pub const ERR_CODE_NOT_SYNCED: i32 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("already syncing")]
    AlreadySyncing,
    /// The named operation requires a completed initial sync.
    #[error("{0} requested on an unsynced wallet")]
    NotSynced(&'static str),
    #[error("wallet already rescanning")]
    AlreadyRescanning,
    #[error("no active sync session")]
    NoActiveSyncSession,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl SyncError {
    /// Numeric code carried to the caller, if this condition has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            SyncError::NotSynced(_) => Some(ERR_CODE_NOT_SYNCED),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_not_synced_has_a_code() {
        assert_eq!(SyncError::NotSynced("rescanFromHeight").code(), Some(1));
        assert_eq!(SyncError::AlreadySyncing.code(), None);
        assert_eq!(SyncError::Backend(BackendError::Closed).code(), None);
    }

    #[test]
    fn not_synced_names_the_operation() {
        let e = SyncError::NotSynced("currentReceiveAddress");
        assert_eq!(e.to_string(), "currentReceiveAddress requested on an unsynced wallet");
    }
}
