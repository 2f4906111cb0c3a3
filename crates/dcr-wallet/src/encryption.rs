//! Seed encryption: scrypt key derivation plus an XSalsa20-Poly1305
//! secret box.
//!
//! The key is derived with scrypt (N = 2^15, r = 8, p = 1) and an empty
//! salt, so the same passphrase always yields the same key. Existing
//! ciphertexts depend on this and must stay decryptable.
//!
//! # Wire format
//! ```text
//! nonce (24 bytes) || poly1305 tag (16 bytes) || ciphertext
//! ```

use crypto_secretbox::aead::{Aead, KeyInit};
use crypto_secretbox::{Nonce, XSalsa20Poly1305};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::WalletError;

/// scrypt cost parameter, as log2(N).
const SCRYPT_LOG_N: u8 = 15;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

/// Derived key length in bytes.
const KEY_LEN: usize = 32;

/// Secret box nonce length in bytes.
pub const NONCE_LEN: usize = 24;

/// Poly1305 authenticator length in bytes.
pub const TAG_LEN: usize = 16;

/// Derive the secret box key for `passphrase`.
pub fn derive_key(passphrase: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, WalletError> {
    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    scrypt::scrypt(passphrase, &[], &params, key.as_mut())
        .map_err(|e| WalletError::Encryption(e.to_string()))?;
    Ok(key)
}

fn cipher(passphrase: &[u8]) -> Result<XSalsa20Poly1305, WalletError> {
    let key = derive_key(passphrase)?;
    XSalsa20Poly1305::new_from_slice(key.as_ref()).map_err(|e| WalletError::Encryption(e.to_string()))
}

/// Seal `plaintext` under `passphrase` with a random nonce.
pub fn encrypt(plaintext: &[u8], passphrase: &[u8]) -> Result<Vec<u8>, WalletError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let sealed = cipher(passphrase)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| WalletError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open data sealed by [`encrypt`].
///
/// Every failure, including truncated input, is reported as
/// [`WalletError::InvalidPassphrase`].
pub fn decrypt(sealed: &[u8], passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>, WalletError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(WalletError::InvalidPassphrase);
    }
    let (nonce, body) = sealed.split_at(NONCE_LEN);
    cipher(passphrase)?
        .decrypt(Nonce::from_slice(nonce), body)
        .map(Zeroizing::new)
        .map_err(|_| WalletError::InvalidPassphrase)
}

/// Re-seal data under a new passphrase.
pub fn re_encrypt(sealed: &[u8], old: &[u8], new: &[u8]) -> Result<Vec<u8>, WalletError> {
    let plaintext = decrypt(sealed, old)?;
    encrypt(&plaintext, new)
}
