//! Hierarchical deterministic extended keys (BIP-0032 with Decred versions).
//!
//! Serialized form:
//! ```text
//! version (4) || depth (1) || parent fingerprint (4) ||
//! child number (4) || chain code (32) || key data (33) || checksum (4)
//! ```
//! Private key data is `0x00 || key`; public key data is the compressed point.
//!
//! Two child derivations exist. [`ExtendedKey::child`] keeps the historic
//! Decred behaviour where a derived private key is stored without its
//! leading zero bytes, which changes hardened grandchildren of such keys.
//! [`ExtendedKey::child_bip32_std`] always keeps 32-byte private keys.

use hmac::{Hmac, Mac};
use secp256k1::{PublicKey, Scalar, SecretKey};
use sha2::Sha512;
use zeroize::Zeroize;

use crate::address::Address;
use crate::crypto::{self, Base58CheckError};
use crate::error::KeyError;
use crate::params::{HARDENED_KEY_START, Network};

type HmacSha512 = Hmac<Sha512>;

/// Length of the serialized payload before the checksum.
pub const SERIALIZED_KEY_LEN: usize = 4 + 1 + 4 + 4 + 32 + 33;

/// Seed used by BIP-0032 to derive the master node.
const MASTER_KEY_SALT: &[u8] = b"Bitcoin seed";

/// Recommended seed length in bytes.
pub const RECOMMENDED_SEED_LEN: usize = 32;

/// A BIP-0032 extended key bound to a network.
#[derive(Clone)]
pub struct ExtendedKey {
    network: Network,
    /// Private key bytes (possibly shorter than 32) or a compressed pubkey.
    key: Vec<u8>,
    chain_code: [u8; 32],
    parent_fp: [u8; 4],
    depth: u8,
    child_num: u32,
    is_private: bool,
}

impl std::fmt::Debug for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedKey")
            .field("network", &self.network)
            .field("depth", &self.depth)
            .field("child_num", &self.child_num)
            .field("is_private", &self.is_private)
            .finish_non_exhaustive()
    }
}

impl Drop for ExtendedKey {
    fn drop(&mut self) {
        self.key.zeroize();
        self.chain_code.zeroize();
    }
}

impl ExtendedKey {
    /// Derive the master node from a seed.
    pub fn new_master(seed: &[u8], network: Network) -> Result<Self, KeyError> {
        if !(16..=64).contains(&seed.len()) {
            return Err(KeyError::InvalidKeyData(format!(
                "seed length {} outside 16..=64",
                seed.len()
            )));
        }
        let mut mac = HmacSha512::new_from_slice(MASTER_KEY_SALT)
            .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
        mac.update(seed);
        let mut i = mac.finalize().into_bytes();
        let (il, ir) = i.split_at(32);

        let secret = SecretKey::from_slice(il).map_err(|_| KeyError::InvalidChild)?;
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);
        let key = secret.secret_bytes().to_vec();
        i.as_mut_slice().zeroize();

        Ok(Self {
            network,
            key,
            chain_code,
            parent_fp: [0; 4],
            depth: 0,
            child_num: 0,
            is_private: true,
        })
    }

    /// Assemble an extended key from raw parts.
    ///
    /// `key` is a 32-byte private key when `is_private`, otherwise a
    /// serialized public key (compressed or uncompressed).
    pub fn from_parts(
        network: Network,
        key: &[u8],
        chain_code: [u8; 32],
        parent_fp: [u8; 4],
        depth: u8,
        child_num: u32,
        is_private: bool,
    ) -> Result<Self, KeyError> {
        let key = if is_private {
            if key.len() != 32 {
                return Err(KeyError::PrivateKeyLength(key.len()));
            }
            key.to_vec()
        } else {
            let pk = PublicKey::from_slice(key)
                .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
            pk.serialize().to_vec()
        };
        Ok(Self { network, key, chain_code, parent_fp, depth, child_num, is_private })
    }

    /// Parse a base58 extended key, checking that it belongs to `network`.
    pub fn from_str_for(s: &str, network: Network) -> Result<Self, KeyError> {
        let key = Self::parse(s)?;
        if key.network != network {
            return Err(KeyError::WrongNetwork);
        }
        Ok(key)
    }

    /// Parse a base58 extended key for whichever network its version names.
    pub fn parse(s: &str) -> Result<Self, KeyError> {
        let payload = crypto::base58check_decode(s).map_err(|e| match e {
            Base58CheckError::Encoding => KeyError::InvalidBase58,
            Base58CheckError::TooShort(n) => KeyError::InvalidLength(n),
            Base58CheckError::Checksum => KeyError::ChecksumMismatch,
        })?;
        if payload.len() != SERIALIZED_KEY_LEN {
            return Err(KeyError::InvalidLength(payload.len()));
        }

        let version = [payload[0], payload[1], payload[2], payload[3]];
        let (network, is_private) =
            Network::from_hd_version(version).ok_or(KeyError::UnknownNetwork)?;
        let depth = payload[4];
        let parent_fp = [payload[5], payload[6], payload[7], payload[8]];
        let child_num = u32::from_be_bytes([payload[9], payload[10], payload[11], payload[12]]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&payload[13..45]);
        let key_data = &payload[45..78];

        let key = if is_private {
            if key_data[0] != 0x00 {
                return Err(KeyError::InvalidKeyData("private key data must start with 0x00".into()));
            }
            SecretKey::from_slice(&key_data[1..])
                .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
            key_data[1..].to_vec()
        } else {
            PublicKey::from_slice(key_data)
                .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
            key_data.to_vec()
        };

        Ok(Self { network, key, chain_code, parent_fp, depth, child_num, is_private })
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_num(&self) -> u32 {
        self.child_num
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fp
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    fn secret_key(&self) -> Result<SecretKey, KeyError> {
        let mut padded = [0u8; 32];
        padded[32 - self.key.len()..].copy_from_slice(&self.key);
        let sk = SecretKey::from_slice(&padded).map_err(|e| KeyError::InvalidKeyData(e.to_string()));
        padded.zeroize();
        sk
    }

    /// The private key of this node.
    pub fn private_key(&self) -> Result<SecretKey, KeyError> {
        if !self.is_private {
            return Err(KeyError::NotPrivate);
        }
        self.secret_key()
    }

    fn public_key(&self) -> Result<PublicKey, KeyError> {
        if self.is_private {
            Ok(PublicKey::from_secret_key(crypto::secp(), &self.secret_key()?))
        } else {
            PublicKey::from_slice(&self.key).map_err(|e| KeyError::InvalidKeyData(e.to_string()))
        }
    }

    /// Compressed public key of this node.
    pub fn serialized_pubkey(&self) -> Result<[u8; 33], KeyError> {
        Ok(self.public_key()?.serialize())
    }

    /// Derive child `i` with the historic Decred private key handling.
    pub fn child(&self, i: u32) -> Result<Self, KeyError> {
        self.derive(i, false)
    }

    /// Derive child `i` with strict BIP-0032 private key padding.
    pub fn child_bip32_std(&self, i: u32) -> Result<Self, KeyError> {
        self.derive(i, true)
    }

    fn derive(&self, i: u32, strict: bool) -> Result<Self, KeyError> {
        if self.depth == u8::MAX {
            return Err(KeyError::DepthExceeded);
        }
        let hardened = i >= HARDENED_KEY_START;
        if hardened && !self.is_private {
            return Err(KeyError::DeriveHardFromPublic);
        }

        let parent_pub = self.serialized_pubkey()?;
        let mut data = Vec::with_capacity(1 + 32 + 4);
        if hardened {
            data.push(0x00);
            if strict {
                data.extend(std::iter::repeat_n(0u8, 32 - self.key.len()));
            }
            data.extend_from_slice(&self.key);
        } else {
            data.extend_from_slice(&parent_pub);
        }
        data.extend_from_slice(&i.to_be_bytes());

        let mut mac = HmacSha512::new_from_slice(&self.chain_code)
            .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
        mac.update(&data);
        data.zeroize();
        let mut out = mac.finalize().into_bytes();
        let mut il = [0u8; 32];
        il.copy_from_slice(&out[..32]);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&out[32..]);
        out.as_mut_slice().zeroize();

        let tweak = Scalar::from_be_bytes(il).map_err(|_| KeyError::InvalidChild)?;
        let il_is_zero = il.iter().all(|b| *b == 0);
        il.zeroize();
        if il_is_zero {
            return Err(KeyError::InvalidChild);
        }

        let key = if self.is_private {
            let child = self.secret_key()?.add_tweak(&tweak).map_err(|_| KeyError::InvalidChild)?;
            let bytes = child.secret_bytes();
            if strict {
                bytes.to_vec()
            } else {
                let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
                bytes[first..].to_vec()
            }
        } else {
            let parent = self.public_key()?;
            let child = parent
                .add_exp_tweak(crypto::secp(), &tweak)
                .map_err(|_| KeyError::InvalidChild)?;
            child.serialize().to_vec()
        };

        let fp = crypto::hash160(&parent_pub);
        Ok(Self {
            network: self.network,
            key,
            chain_code,
            parent_fp: [fp[0], fp[1], fp[2], fp[3]],
            depth: self.depth + 1,
            child_num: i,
            is_private: self.is_private,
        })
    }

    /// The public extended key for this node.
    pub fn neuter(&self) -> Result<Self, KeyError> {
        if !self.is_private {
            return Ok(self.clone());
        }
        Ok(Self {
            network: self.network,
            key: self.serialized_pubkey()?.to_vec(),
            chain_code: self.chain_code,
            parent_fp: self.parent_fp,
            depth: self.depth,
            child_num: self.child_num,
            is_private: false,
        })
    }

    /// Pay-to-pubkey-hash address of this node.
    pub fn address(&self) -> Result<Address, KeyError> {
        Ok(Address::p2pkh_from_pubkey(&self.serialized_pubkey()?, self.network))
    }

    /// Base58check serialization.
    pub fn encode(&self) -> String {
        let params = self.network.params();
        let mut payload = Vec::with_capacity(SERIALIZED_KEY_LEN);
        if self.is_private {
            payload.extend_from_slice(&params.hd_private_key_id);
        } else {
            payload.extend_from_slice(&params.hd_public_key_id);
        }
        payload.push(self.depth);
        payload.extend_from_slice(&self.parent_fp);
        payload.extend_from_slice(&self.child_num.to_be_bytes());
        payload.extend_from_slice(&self.chain_code);
        if self.is_private {
            // Left pad to 33 bytes: 0x00 marker plus any stripped zeros.
            payload.extend(std::iter::repeat_n(0u8, 33 - self.key.len()));
        }
        payload.extend_from_slice(&self.key);
        let encoded = crypto::base58check_encode(&payload);
        payload.zeroize();
        encoded
    }
}

impl std::fmt::Display for ExtendedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Parse a slash-delimited path like `0'/1/0` into child indices.
///
/// A trailing apostrophe marks a hardened index. Empty segments are ignored.
pub fn parse_path(path: &str) -> Result<Vec<u32>, KeyError> {
    let mut indices = Vec::new();
    for segment in path.split('/') {
        if segment.is_empty() {
            continue;
        }
        let (digits, hardened) = match segment.strip_suffix('\'') {
            Some(d) => (d, true),
            None => (segment, false),
        };
        let n: u32 = digits
            .parse()
            .map_err(|_| KeyError::InvalidPath(segment.to_string()))?;
        let index = if hardened {
            n.checked_add(HARDENED_KEY_START)
                .ok_or_else(|| KeyError::InvalidPath(segment.to_string()))?
        } else {
            n
        };
        indices.push(index);
    }
    Ok(indices)
}

/// Derive the address at `path` below an extended key string.
///
/// The network is detected from the key's prefix. `addr_type` must be
/// `p2pkh` (case-insensitive). When `use_bip32_std` is set, children are
/// derived with strict BIP-0032 padding.
pub fn address_from_extended_key(
    key: &str,
    path: &str,
    addr_type: &str,
    use_bip32_std: bool,
) -> Result<String, crate::error::AddressError> {
    use crate::error::AddressError;

    let prefix = key
        .get(..4)
        .ok_or_else(|| AddressError::UnknownNetwork(KeyError::KeyTooShort.to_string()))?;
    let network = Network::from_extended_key_prefix(prefix)
        .ok_or_else(|| AddressError::UnknownNetwork(KeyError::UnknownNetwork.to_string()))?;

    let mut ext = ExtendedKey::from_str_for(key, network)?;
    for index in parse_path(path)? {
        ext = if use_bip32_std {
            ext.child_bip32_std(index)?
        } else {
            ext.child(index)?
        };
    }

    if !addr_type.eq_ignore_ascii_case("p2pkh") {
        return Err(AddressError::UnsupportedAddressType(addr_type.to_string()));
    }
    Ok(ext.address()?.encode())
}

/// Build an extended key string from hex-encoded parts.
///
/// `parent_key_hex` must be a public key and is only read when `depth > 0`;
/// at depth zero the parent fingerprint is all zeros.
pub fn create_extended_key(
    key_hex: &str,
    parent_key_hex: &str,
    chain_code_hex: &str,
    network: Network,
    depth: u8,
    child_n: u32,
    is_private: bool,
) -> Result<String, KeyError> {
    let chain_code_bytes =
        hex::decode(chain_code_hex).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    if chain_code_bytes.len() != 32 {
        return Err(KeyError::ChainCodeLength(chain_code_bytes.len()));
    }
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&chain_code_bytes);

    let mut parent_fp = [0u8; 4];
    if depth > 0 {
        let parent = hex::decode(parent_key_hex).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
        let parent = PublicKey::from_slice(&parent)
            .map_err(|e| KeyError::InvalidKeyData(e.to_string()))?;
        let fp = crypto::hash160(&parent.serialize());
        parent_fp.copy_from_slice(&fp[..4]);
    }

    let mut key = hex::decode(key_hex).map_err(|e| KeyError::InvalidHex(e.to_string()))?;
    let ext = ExtendedKey::from_parts(network, &key, chain_code, parent_fp, depth, child_n, is_private);
    key.zeroize();
    Ok(ext?.encode())
}
