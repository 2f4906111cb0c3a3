//! Error types for Decred chain primitives.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid base58 encoding")] InvalidBase58,
    #[error("checksum mismatch")] ChecksumMismatch,
    #[error("invalid address length: {0}")] InvalidLength(usize),
    #[error("address {address} is not for network {network}")] WrongNetwork { address: String, network: String },
    #[error("unknown address type {0}")] UnsupportedAddressType(String),
    #[error("unknown network: {0}")] UnknownNetwork(String),
    #[error(transparent)] Key(#[from] KeyError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("invalid base58 encoding")] InvalidBase58,
    #[error("checksum mismatch")] ChecksumMismatch,
    #[error("the provided serialized extended key length is invalid: {0}")] InvalidLength(usize),
    #[error("the key is not from a known network")] UnknownNetwork,
    #[error("key is too short")] KeyTooShort,
    #[error("the provided extended key is for the wrong network")] WrongNetwork,
    #[error("the extended key at this index is invalid")] InvalidChild,
    #[error("cannot derive a hardened key from a public key")] DeriveHardFromPublic,
    #[error("cannot derive private keys from a public extended key")] NotPrivate,
    #[error("cannot derive a key with more than 255 indices in its path")] DepthExceeded,
    #[error("invalid key data: {0}")] InvalidKeyData(String),
    #[error("invalid derivation path segment {0:?}")] InvalidPath(String),
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("expected chain code with length of 32 but got {0}")] ChainCodeLength(usize),
    #[error("expected private key with length of 32 but got {0}")] PrivateKeyLength(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("unexpected end of data: need {need} bytes, have {have}")] UnexpectedEof { need: usize, have: usize },
    #[error("non-canonical varint encoding")] NonCanonicalVarInt,
    #[error("too many {what}: {count} > {max}")] TooMany { what: &'static str, count: u64, max: u64 },
    #[error("unsupported serialization type {0}")] UnsupportedSerType(u16),
    #[error("{0} trailing bytes after transaction")] TrailingBytes(usize),
    #[error("mismatched witness count: {witness} witnesses for {inputs} inputs")] WitnessMismatch { witness: u64, inputs: u64 },
    #[error("invalid hex: {0}")] InvalidHex(String),
    #[error("invalid hash string: {0}")] InvalidHash(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script is not a ticket commitment")] NotCommitment,
    #[error("malformed push in script at offset {0}")] MalformedPush(usize),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("unable to decode signature: {0}")] InvalidBase64(String),
    #[error("invalid compact signature")] InvalidSignature,
    #[error("invalid address type: must be P2PKH")] UnsupportedAddress,
    #[error(transparent)] Address(#[from] AddressError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorError {
    #[error("insufficient funds: available {available}, needed {needed}")] InsufficientFunds { available: i64, needed: i64 },
    #[error("change script size {0} exceeds maximum")] ChangeScriptTooLarge(usize),
    #[error("transaction output value {0} is invalid")] InvalidOutputValue(i64),
    #[error("input source: {0}")] InputSource(String),
    #[error("change source: {0}")] ChangeSource(String),
}

/// Failures reported by a chain backend implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("database: {0}")] Database(String),
    #[error("not found: {0}")] NotFound(String),
    #[error("invalid passphrase")] InvalidPassphrase,
    #[error("wallet is locked")] Locked,
    #[error("network: {0}")] Network(String),
    #[error("backend is closed")] Closed,
    #[error("{0}")] Other(String),
    #[error(transparent)] Author(#[from] AuthorError),
    #[error(transparent)] Wire(#[from] WireError),
    #[error(transparent)] Key(#[from] KeyError),
}
