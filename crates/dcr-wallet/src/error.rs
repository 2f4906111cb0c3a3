//! Wallet error types.

use std::path::PathBuf;

use dcr_core::error::{AddressError, AuthorError, BackendError, KeyError, MessageError, WireError};
use dcr_sync::SyncError;
use thiserror::Error;

/// Errors that can occur in wallet operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Wrong passphrase or corrupt ciphertext. The two are not distinguished.
    #[error("invalid_passphrase")]
    InvalidPassphrase,

    /// The seed was verified and discarded; nothing is left to decrypt.
    #[error("seed has been verified")]
    SeedAlreadyVerified,

    /// Send-all was requested with more than one output.
    #[error("send all can only be used with one recipient")]
    AmbiguousSendAllTarget,

    /// No outputs were given.
    #[error("no outputs")]
    NoOutputs,

    /// An explicitly requested input is also in the ignore set.
    #[error("input {0} is both requested and ignored")]
    ConflictingInputSpecification(String),

    /// Requested inputs absent from the spendable set.
    #[error("some utxo were not found: {}", .0.join(", "))]
    InputNotFound(Vec<String>),

    /// A requested input exists but cannot be spent.
    #[error("utxo {0} is not spendable")]
    InputNotSpendable(String),

    /// The account has no unspent outputs at all.
    #[error("insufficient funds. 0 DCR available to spend in account {0:?}")]
    NoSpendableCoins(String),

    /// Selected inputs do not cover outputs plus fee.
    #[error("insufficient funds: available {available}, needed {needed}")]
    InsufficientFunds {
        /// Atoms selected.
        available: i64,
        /// Atoms required including fee.
        needed: i64,
    },

    /// An output address failed to decode.
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: AddressError },

    /// One or more inputs could not be signed.
    #[error("{} signature errors", .indices.len())]
    SignatureErrors { indices: Vec<u32> },

    /// The signature script count does not match the input count.
    #[error("number of inputs and signatures differ: {inputs} inputs, {sigs} signatures")]
    SignatureCountMismatch { inputs: usize, sigs: usize },

    /// Some requested transactions are unknown to the wallet.
    #[error("could not get all txn: found {found} of {requested}")]
    TxNotFound { found: usize, requested: usize },

    /// The fee oracle has no estimate for the requested block count.
    #[error("no fee rate for requested number of blocks: {0}")]
    OracleRateUnavailable(u64),

    /// Fee oracle transport or decoding failure.
    #[error("fee oracle: {0}")]
    FeeOracle(String),

    /// Only P2PKH addresses can sign messages.
    #[error("unsupported address type: {0}")]
    UnsupportedAddressType(String),

    /// Creation arguments are inconsistent.
    #[error("{0}")]
    InvalidArguments(String),

    /// A wallet database already exists in the directory.
    #[error("wallet at {} already exists", .0.display())]
    WalletExists(PathBuf),

    /// No wallet database exists in the directory.
    #[error("wallet at {} doesn't exist", .0.display())]
    WalletNotFound(PathBuf),

    /// The backend is already open.
    #[error("wallet is already open")]
    WalletAlreadyOpen,

    /// The backend has not been opened.
    #[error("wallet is not open")]
    WalletNotOpen,

    /// The backend has no birth state recorded.
    #[error("birth state is not set")]
    NoBirthState,

    /// Metadata file read/write failure.
    #[error("wallet data: {0}")]
    Metadata(String),

    /// Seed encryption failure.
    #[error("encryption: {0}")]
    Encryption(String),

    /// Filesystem failure outside the metadata file.
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    Backend(BackendError),
}

impl WalletError {
    /// Numeric code carried to the caller, if this condition has one.
    pub fn code(&self) -> Option<i32> {
        match self {
            WalletError::Sync(e) => e.code(),
            _ => None,
        }
    }
}

impl From<BackendError> for WalletError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::InvalidPassphrase => WalletError::InvalidPassphrase,
            BackendError::Author(e) => e.into(),
            other => WalletError::Backend(other),
        }
    }
}

impl From<AuthorError> for WalletError {
    fn from(e: AuthorError) -> Self {
        match e {
            AuthorError::InsufficientFunds { available, needed } => {
                WalletError::InsufficientFunds { available, needed }
            }
            other => WalletError::Backend(BackendError::Author(other)),
        }
    }
}

impl From<std::io::Error> for WalletError {
    fn from(e: std::io::Error) -> Self {
        WalletError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_passphrase_error_collapses() {
        assert_eq!(WalletError::from(BackendError::InvalidPassphrase), WalletError::InvalidPassphrase);
    }

    #[test]
    fn author_shortfall_becomes_insufficient_funds() {
        let e: WalletError = BackendError::Author(AuthorError::InsufficientFunds { available: 1, needed: 2 }).into();
        assert_eq!(e, WalletError::InsufficientFunds { available: 1, needed: 2 });
    }

    #[test]
    fn not_synced_keeps_its_code() {
        let e: WalletError = SyncError::NotSynced("newExternalAddress").into();
        assert_eq!(e.code(), Some(1));
        assert_eq!(e.to_string(), "newExternalAddress requested on an unsynced wallet");
        assert_eq!(WalletError::NoOutputs.code(), None);
    }

    #[test]
    fn display_signature_errors() {
        let e = WalletError::SignatureErrors { indices: vec![0, 2] };
        assert_eq!(e.to_string(), "2 signature errors");
    }

    #[test]
    fn display_missing_inputs() {
        let e = WalletError::InputNotFound(vec!["aa:0".into(), "bb:1".into()]);
        assert_eq!(e.to_string(), "some utxo were not found: aa:0, bb:1");
    }
}
