//! # dcr-sync
//! Supervises background SPV synchronization for one wallet: session
//! restarts, status tracking from typed events, and user rescans.

pub mod config;
pub mod controller;
pub mod error;
pub mod status;

pub use config::SyncConfig;
pub use controller::SyncController;
pub use dcr_core::cancel::CancelToken;
pub use dcr_core::types::SyncEvent;
pub use error::{SyncError, ERR_CODE_NOT_SYNCED};
pub use status::{SyncStatus, SyncStatusCode, SyncStatusReport};
