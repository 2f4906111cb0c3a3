//! Base58check payment addresses.
//!
//! A Decred address is `base58(net_id[2] || hash160[20] || checksum[4])`
//! where the checksum is the first four bytes of a double BLAKE-256. Only
//! version-0 secp256k1 pay-to-pubkey-hash and pay-to-script-hash addresses
//! are produced and accepted here.

use std::fmt;

use crate::crypto::{self, Base58CheckError, HASH160_LEN};
use crate::error::AddressError;
use crate::params::Network;
use crate::script;

/// Kind of hash an address commits to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressKind {
    PubKeyHash,
    ScriptHash,
}

/// A decoded payment address.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Address {
    network: Network,
    kind: AddressKind,
    hash: [u8; HASH160_LEN],
}

impl Address {
    /// Pay-to-pubkey-hash address for an already hashed public key.
    pub fn p2pkh(hash: [u8; HASH160_LEN], network: Network) -> Self {
        Self { network, kind: AddressKind::PubKeyHash, hash }
    }

    /// Pay-to-pubkey-hash address for a serialized (compressed) public key.
    pub fn p2pkh_from_pubkey(pubkey: &[u8], network: Network) -> Self {
        Self::p2pkh(crypto::hash160(pubkey), network)
    }

    /// Pay-to-script-hash address for an already hashed script.
    pub fn p2sh(hash: [u8; HASH160_LEN], network: Network) -> Self {
        Self { network, kind: AddressKind::ScriptHash, hash }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn hash(&self) -> &[u8; HASH160_LEN] {
        &self.hash
    }

    /// Decode an address string, requiring it to belong to `network`.
    pub fn decode(s: &str, network: Network) -> Result<Self, AddressError> {
        let payload = crypto::base58check_decode(s).map_err(|e| match e {
            Base58CheckError::Encoding => AddressError::InvalidBase58,
            Base58CheckError::TooShort(n) => AddressError::InvalidLength(n),
            Base58CheckError::Checksum => AddressError::ChecksumMismatch,
        })?;
        if payload.len() != 2 + HASH160_LEN {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let params = network.params();
        let id = [payload[0], payload[1]];
        let kind = if id == params.pubkey_hash_addr_id {
            AddressKind::PubKeyHash
        } else if id == params.script_hash_addr_id {
            AddressKind::ScriptHash
        } else {
            return Err(AddressError::WrongNetwork {
                address: s.to_string(),
                network: network.to_string(),
            });
        };

        let mut hash = [0u8; HASH160_LEN];
        hash.copy_from_slice(&payload[2..]);
        Ok(Self { network, kind, hash })
    }

    /// Version-0 output script paying to this address.
    pub fn payment_script(&self) -> Vec<u8> {
        match self.kind {
            AddressKind::PubKeyHash => script::p2pkh_script(&self.hash),
            AddressKind::ScriptHash => script::p2sh_script(&self.hash),
        }
    }

    /// Encode as a base58check string.
    pub fn encode(&self) -> String {
        let params = self.network.params();
        let id = match self.kind {
            AddressKind::PubKeyHash => params.pubkey_hash_addr_id,
            AddressKind::ScriptHash => params.script_hash_addr_id,
        };
        let mut payload = Vec::with_capacity(2 + HASH160_LEN);
        payload.extend_from_slice(&id);
        payload.extend_from_slice(&self.hash);
        crypto::base58check_encode(&payload)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Decode an address string directly into its version-0 payment script.
pub fn decode_payment_script(s: &str, network: Network) -> Result<Vec<u8>, AddressError> {
    Ok(Address::decode(s, network)?.payment_script())
}
