//! # dcr-libwallet
//! Entry layer over [`dcr_wallet`]: a registry of named wallets sharing one
//! root cancellation token, JSON response envelopes, configuration and
//! logging initialisation.
//!
//! # Modules
//!
//! - [`config`]: `ManagerConfig` and per-wallet requests
//! - [`envelope`]: `{payload, error, errorcode}` responses
//! - [`error`]: `ManagerError` enum
//! - [`logging`]: tracing subscriber setup
//! - [`manager`]: the `WalletManager` registry

pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod manager;

pub use config::{ManagerConfig, WalletRequest};
pub use envelope::Envelope;
pub use error::ManagerError;
pub use logging::init_logging;
pub use manager::WalletManager;
