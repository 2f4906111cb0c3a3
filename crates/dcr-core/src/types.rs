//! Core chain types shared by the wallet, the sync controller and backends.
//!
//! All monetary values are in atoms (1 DCR = 10^8 atoms) and signed, as on
//! the wire.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::WireError;

/// Number of atoms in one coin.
pub const ATOMS_PER_COIN: i64 = 100_000_000;

/// Maximum number of atoms that can ever exist (21 million coins).
pub const MAX_AMOUNT: i64 = 21_000_000 * ATOMS_PER_COIN;

/// Convert atoms to a floating point coin value.
pub fn atoms_to_coin(atoms: i64) -> f64 {
    atoms as f64 / ATOMS_PER_COIN as f64
}

/// Convert a floating point coin value to atoms, rounding to nearest.
pub fn coin_to_atoms(coin: f64) -> i64 {
    (coin * ATOMS_PER_COIN as f64).round() as i64
}

/// A 32-byte BLAKE-256 hash.
///
/// Stored in internal byte order; displayed and parsed byte-reversed, which
/// is how transaction and block hashes appear everywhere outside the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// The zero hash, used by null previous outpoints.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0.iter().rev() {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({self})")
    }
}

impl FromStr for Hash256 {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(WireError::InvalidHash(s.to_string()));
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| WireError::InvalidHash(s.to_string()))?;
        bytes.reverse();
        Ok(Self(bytes))
    }
}

impl From<[u8; 32]> for Hash256 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Tree of a previous output: regular transactions or the stake tree.
pub const TX_TREE_REGULAR: i8 = 0;
/// Stake transaction tree.
pub const TX_TREE_STAKE: i8 = 1;

/// Reference to a specific output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash256,
    pub index: u32,
    pub tree: i8,
}

impl OutPoint {
    pub fn new(hash: Hash256, index: u32, tree: i8) -> Self {
        Self { hash, index, tree }
    }

    /// The null outpoint spent by coinbase, treasurybase and stakebase inputs.
    pub fn null() -> Self {
        Self {
            hash: Hash256::ZERO,
            index: u32::MAX,
            tree: TX_TREE_REGULAR,
        }
    }

    pub fn is_null(&self) -> bool {
        self.hash.is_zero() && self.index == u32::MAX
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hash, self.index)
    }
}

/// A spendable (or locked) output reported by the chain backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentCoin {
    pub txid: Hash256,
    pub vout: u32,
    pub tree: i8,
    /// Value in atoms.
    pub amount: i64,
    /// The output script, which is also the redeem script for P2PKH coins.
    #[serde(with = "hex::serde")]
    pub script_pub_key: Vec<u8>,
    pub address: String,
    pub account: String,
    pub confirmations: i64,
    pub spendable: bool,
}

impl UnspentCoin {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout, self.tree)
    }
}

/// Signature hash type used when signing transaction inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SigHashType {
    All = 0x01,
    None = 0x02,
    Single = 0x03,
}

/// A failure to sign one input of a transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureError {
    pub input_index: u32,
    pub error: String,
}

/// One step of a rescan reported by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RescanProgress {
    pub scanned_through: i32,
    pub error: Option<String>,
}

/// Balance breakdown of one account, in atoms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub total: i64,
    pub spendable: i64,
    pub immature: i64,
    pub locked: i64,
    pub unconfirmed: i64,
}

/// A block identified by hash and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStamp {
    pub hash: Hash256,
    pub height: i32,
}

/// Where a wallet begins scanning the chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthState {
    pub hash: Hash256,
    pub height: u32,
    /// Unix seconds.
    pub time: i64,
    pub set_from_height: bool,
    pub set_from_time: bool,
}

/// Typed progress notifications emitted by a running sync session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SyncEvent {
    Synced(bool),
    PeerConnected { peer_count: i32, addr: String },
    PeerDisconnected { peer_count: i32, addr: String },
    FetchMissingCFiltersStarted,
    FetchMissingCFiltersProgress { start_height: i32, end_height: i32 },
    FetchMissingCFiltersFinished,
    FetchHeadersStarted,
    FetchHeadersProgress { last_height: i32, last_time: i64 },
    FetchHeadersFinished,
    DiscoverAddressesStarted,
    DiscoverAddressesFinished,
    RescanStarted,
    RescanProgress { rescanned_through: i32 },
    RescanFinished,
}
