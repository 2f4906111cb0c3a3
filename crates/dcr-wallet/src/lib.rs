//! # dcr-wallet
//! Decred SPV wallet composed over a chain backend: encrypted seed storage,
//! address derivation, transaction building and the wallet lifecycle.
//!
//! # Modules
//!
//! - [`error`]: `WalletError` enum
//! - [`config`]: per-wallet settings
//! - [`encryption`]: passphrase sealing of the seed
//! - [`walletdata`]: the JSON metadata record next to the database
//! - [`vault`]: seed vault over the metadata record
//! - [`addresses`]: receive address ranges from the account xpub
//! - [`coin_selection`]: explicit and shuffled input sources
//! - [`builder`]: transaction building and signing
//! - [`decode`]: JSON decoding of raw transactions
//! - [`fee_oracle`]: fee rate estimates over HTTP
//! - [`wallet`]: the wallet lifecycle and its operations

pub mod addresses;
pub mod builder;
pub mod coin_selection;
pub mod config;
pub mod decode;
pub mod encryption;
pub mod error;
pub mod fee_oracle;
pub mod vault;
pub mod wallet;
pub mod walletdata;

// Re-exports for convenient access
pub use addresses::AddressRange;
pub use builder::{BuildRequest, BuiltTransaction, TxOutput};
pub use coin_selection::InputRef;
pub use config::WalletConfig;
pub use decode::DecodedTx;
pub use error::WalletError;
pub use fee_oracle::FeeEstimate;
pub use vault::{SeedVault, WalletKind, SEED_LEN};
pub use wallet::{
    tweak_seed, BirthdayState, Recovery, RecoverySeed, TransactionRecord, UnspentOutput, Wallet, WalletBalance,
};
