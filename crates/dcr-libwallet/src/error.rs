//! Error types for the wallet registry.

use dcr_wallet::WalletError;
use thiserror::Error;

/// Errors from the registry layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ManagerError {
    #[error("libwallet is not initialized")]
    NotInitialized,

    #[error("duplicate initialization")]
    AlreadyInitialized,

    #[error("wallet already exists with name: {0:?}")]
    DuplicateWalletName(String),

    #[error("wallet with name {0:?} not loaded")]
    WalletNotLoaded(String),

    /// A request field could not be interpreted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("error initializing logger: {0}")]
    Logging(String),

    #[error(transparent)]
    Wallet(#[from] WalletError),
}

impl ManagerError {
    /// Numeric code for conditions callers handle specially.
    pub fn code(&self) -> Option<i32> {
        match self {
            ManagerError::Wallet(e) => e.code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcr_sync::SyncError;

    #[test]
    fn only_not_synced_carries_a_code() {
        let e = ManagerError::from(WalletError::from(SyncError::NotSynced("currentReceiveAddress")));
        assert_eq!(e.code(), Some(1));
        assert_eq!(e.to_string(), "currentReceiveAddress requested on an unsynced wallet");
        assert_eq!(ManagerError::NotInitialized.code(), None);
        assert_eq!(ManagerError::from(WalletError::NoOutputs).code(), None);
    }

    #[test]
    fn names_are_quoted() {
        assert_eq!(
            ManagerError::DuplicateWalletName("main".into()).to_string(),
            "wallet already exists with name: \"main\""
        );
    }
}
