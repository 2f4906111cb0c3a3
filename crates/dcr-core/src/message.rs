//! Signed messages: compact recoverable secp256k1 signatures over a
//! BLAKE-256 digest of the prefixed message.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, SecretKey};

use crate::address::{Address, AddressKind};
use crate::blake256::blake256;
use crate::crypto;
use crate::error::MessageError;
use crate::params::Network;
use crate::wire::write_var_int;

const MESSAGE_MAGIC: &str = "Decred Signed Message:\n";

/// Length of a compact signature: header byte plus `r || s`.
pub const COMPACT_SIG_LEN: usize = 65;

/// Header offset for a signature over a compressed public key.
const COMPACT_HEADER_COMPRESSED: u8 = 27 + 4;

fn write_var_string(buf: &mut Vec<u8>, s: &str) {
    write_var_int(buf, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Digest that is signed for `message`.
pub fn message_hash(message: &str) -> [u8; 32] {
    let mut buf = Vec::with_capacity(MESSAGE_MAGIC.len() + message.len() + 10);
    write_var_string(&mut buf, MESSAGE_MAGIC);
    write_var_string(&mut buf, message);
    blake256(&buf)
}

/// Sign `message` with `key`, producing a 65-byte compact signature.
pub fn sign_compact(key: &SecretKey, message: &str) -> [u8; COMPACT_SIG_LEN] {
    let digest = Message::from_digest(message_hash(message));
    let sig = crypto::secp().sign_ecdsa_recoverable(&digest, key);
    let (recid, rs) = sig.serialize_compact();
    let mut out = [0u8; COMPACT_SIG_LEN];
    out[0] = COMPACT_HEADER_COMPRESSED + recid.to_i32() as u8;
    out[1..].copy_from_slice(&rs);
    out
}

/// Verify a base64 compact signature of `message` against a P2PKH address.
///
/// Returns `Ok(false)` when the signature is well formed but was made by a
/// different key.
pub fn verify_message(
    message: &str,
    address: &str,
    signature_b64: &str,
    network: Network,
) -> Result<bool, MessageError> {
    let addr = Address::decode(address, network)?;
    if addr.kind() != AddressKind::PubKeyHash {
        return Err(MessageError::UnsupportedAddress);
    }
    let sig = BASE64
        .decode(signature_b64)
        .map_err(|e| MessageError::InvalidBase64(e.to_string()))?;
    if sig.len() != COMPACT_SIG_LEN || !(27..=34).contains(&sig[0]) {
        return Err(MessageError::InvalidSignature);
    }

    let compressed = sig[0] >= COMPACT_HEADER_COMPRESSED;
    let recid_raw = i32::from(sig[0] - if compressed { COMPACT_HEADER_COMPRESSED } else { 27 });
    let recid = RecoveryId::from_i32(recid_raw).map_err(|_| MessageError::InvalidSignature)?;
    let rsig = RecoverableSignature::from_compact(&sig[1..], recid)
        .map_err(|_| MessageError::InvalidSignature)?;
    let digest = Message::from_digest(message_hash(message));
    let Ok(pubkey) = crypto::secp().recover_ecdsa(&digest, &rsig) else {
        return Ok(false);
    };

    let recovered = if compressed {
        Address::p2pkh_from_pubkey(&pubkey.serialize(), network)
    } else {
        Address::p2pkh_from_pubkey(&pubkey.serialize_uncompressed(), network)
    };
    Ok(recovered == addr)
}

/// Base64 encoding used for signatures at the boundary.
pub fn encode_signature(sig: &[u8]) -> String {
    BASE64.encode(sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::PublicKey;

    fn key(byte: u8) -> (SecretKey, String) {
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        let pk = PublicKey::from_secret_key(crypto::secp(), &sk);
        let addr = Address::p2pkh_from_pubkey(&pk.serialize(), Network::Mainnet).encode();
        (sk, addr)
    }

    #[test]
    fn sign_then_verify() {
        let (sk, addr) = key(7);
        let sig = encode_signature(&sign_compact(&sk, "hello decred"));
        assert!(verify_message("hello decred", &addr, &sig, Network::Mainnet).unwrap());
        assert!(!verify_message("hello", &addr, &sig, Network::Mainnet).unwrap());
    }

    #[test]
    fn other_key_does_not_verify() {
        let (sk, _) = key(7);
        let (_, other_addr) = key(8);
        let sig = encode_signature(&sign_compact(&sk, "m"));
        assert!(!verify_message("m", &other_addr, &sig, Network::Mainnet).unwrap());
    }

    #[test]
    fn malformed_signatures() {
        let (_, addr) = key(7);
        assert!(matches!(
            verify_message("m", &addr, "%%%", Network::Mainnet),
            Err(MessageError::InvalidBase64(_))
        ));
        let short = encode_signature(&[31u8; 10]);
        assert_eq!(
            verify_message("m", &addr, &short, Network::Mainnet),
            Err(MessageError::InvalidSignature)
        );
    }

    #[test]
    fn script_hash_address_rejected() {
        let addr = Address::p2sh([3; 20], Network::Mainnet).encode();
        let sig = encode_signature(&[31u8; 65]);
        assert_eq!(
            verify_message("m", &addr, &sig, Network::Mainnet),
            Err(MessageError::UnsupportedAddress)
        );
    }

    #[test]
    fn message_hash_is_prefixed() {
        assert_ne!(message_hash("a"), blake256(b"a"));
        assert_eq!(message_hash("a"), message_hash("a"));
    }
}
