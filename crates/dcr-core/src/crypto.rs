//! Hash helpers and secp256k1 context shared by address and key code.

use ripemd::{Digest, Ripemd160};
use secp256k1::{All, Secp256k1};
use std::sync::OnceLock;

use crate::blake256::{blake256, double_blake256};

/// Length of a `hash160` digest.
pub const HASH160_LEN: usize = 20;

/// Length of a base58check checksum.
pub const CHECKSUM_LEN: usize = 4;

static SECP: OnceLock<Secp256k1<All>> = OnceLock::new();

/// Shared secp256k1 context.
pub fn secp() -> &'static Secp256k1<All> {
    SECP.get_or_init(Secp256k1::new)
}

/// `RIPEMD160(BLAKE256(data))`, the Decred public key hash.
pub fn hash160(data: &[u8]) -> [u8; HASH160_LEN] {
    let mut hasher = Ripemd160::new();
    hasher.update(blake256(data));
    hasher.finalize().into()
}

/// First four bytes of `BLAKE256(BLAKE256(data))`.
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let h = double_blake256(data);
    [h[0], h[1], h[2], h[3]]
}

/// Append a checksum and base58-encode.
pub fn base58check_encode(payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum(payload));
    bs58::encode(buf).into_string()
}

/// Outcome of decoding a base58check string.
#[derive(Debug, PartialEq, Eq)]
pub enum Base58CheckError {
    Encoding,
    TooShort(usize),
    Checksum,
}

/// Decode a base58check string, verifying and stripping the checksum.
pub fn base58check_decode(s: &str) -> Result<Vec<u8>, Base58CheckError> {
    let mut decoded = bs58::decode(s)
        .into_vec()
        .map_err(|_| Base58CheckError::Encoding)?;
    if decoded.len() < CHECKSUM_LEN {
        return Err(Base58CheckError::TooShort(decoded.len()));
    }
    let split = decoded.len() - CHECKSUM_LEN;
    if checksum(&decoded[..split]) != decoded[split..] {
        return Err(Base58CheckError::Checksum);
    }
    decoded.truncate(split);
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash160_is_20_bytes_and_deterministic() {
        let a = hash160(b"pubkey");
        assert_eq!(a.len(), HASH160_LEN);
        assert_eq!(a, hash160(b"pubkey"));
        assert_ne!(a, hash160(b"pubkey2"));
    }

    #[test]
    fn base58check_roundtrip_detects_corruption() {
        let payload = [0x07, 0x3f, 1, 2, 3, 4];
        let encoded = base58check_encode(&payload);
        assert_eq!(base58check_decode(&encoded).unwrap(), payload);

        let mut raw = bs58::decode(&encoded).into_vec().unwrap();
        raw[2] ^= 0x01;
        let corrupted = bs58::encode(raw).into_string();
        assert_eq!(base58check_decode(&corrupted), Err(Base58CheckError::Checksum));
    }

    #[test]
    fn base58check_rejects_invalid_characters() {
        assert_eq!(base58check_decode("0OIl"), Err(Base58CheckError::Encoding));
    }

    #[test]
    fn known_extended_key_checksum_verifies() {
        let key = "dpubZBcpPfFZ9PGZdqW64aazy29PVfYHXSSK4VzsR6XUu4XUsXcukg1HMiSyvCbLYhxFTGa9ai9awzJhQiZCNnLwEqkkSLmLDLEiomgsRZUt4ei";
        let payload = base58check_decode(key).unwrap();
        assert_eq!(payload.len(), 78);
        assert_eq!(&payload[..4], &[0x02, 0xfd, 0xa9, 0x26]);
    }
}
