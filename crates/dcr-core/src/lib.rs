//! # dcr-core
//! Decred chain primitives and the trait seams between the wallet layer and
//! a chain backend.
//!
//! # Modules
//!
//! - [`blake256`]: BLAKE-256 hashing
//! - [`crypto`]: HASH160, checksums and base58check
//! - [`params`]: per-network constants
//! - [`address`]: P2PKH and P2SH addresses
//! - [`hdkeychain`]: BIP-0032 extended keys with Decred encodings
//! - [`script`]: script classification, tokenizing and disassembly
//! - [`wire`]: transaction wire format
//! - [`stake`]: stake and treasury transaction typing
//! - [`txauthor`]: size estimation and unsigned transaction authoring
//! - [`message`]: signed message hashing and verification
//! - [`cancel`]: hierarchical cancellation tokens
//! - [`traits`]: backend, sync session and loader interfaces
//! - [`types`]: shared chain types and sync events
//! - [`error`]: error types

pub mod address;
pub mod blake256;
pub mod cancel;
pub mod crypto;
pub mod error;
pub mod hdkeychain;
pub mod message;
pub mod params;
pub mod script;
pub mod stake;
pub mod traits;
pub mod txauthor;
pub mod types;
pub mod wire;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use address::Address;
pub use cancel::CancelToken;
pub use error::BackendError;
pub use hdkeychain::ExtendedKey;
pub use params::Network;
pub use types::{Hash256, SyncEvent};
pub use wire::MsgTx;
