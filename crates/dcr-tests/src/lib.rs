//! Integration tests for the Decred SPV wallet library.
//!
//! The tests in `tests/` drive wallets through [`dcr_libwallet::WalletManager`]
//! over the in-memory backend from `dcr_core::testing`, covering the flows
//! that cross crate boundaries: creation and restore, sync supervision,
//! transaction building and publication.

pub mod helpers;
