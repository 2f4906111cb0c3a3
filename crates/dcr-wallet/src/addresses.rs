//! Address derivation over the default account's extended public key.
//!
//! Only public derivation happens here, so watch-only wallets get the same
//! address lists as spending wallets.

use dcr_core::error::KeyError;
use dcr_core::hdkeychain::ExtendedKey;
use dcr_core::params::{Network, BIP44_PURPOSE, HARDENED_KEY_START};
use dcr_core::traits::DEFAULT_ACCOUNT;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Branch index of receiving addresses.
pub const EXTERNAL_BRANCH: u32 = 0;

/// Branch index of change addresses.
pub const INTERNAL_BRANCH: u32 = 1;

/// Used and unused receive addresses around the next unused index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    /// Most recent first.
    pub used: Vec<String>,
    /// Starting at `index`.
    pub unused: Vec<String>,
    /// First unused child index of the external branch.
    pub index: u32,
    /// Indexes whose child key was invalid and left out.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub skipped: u32,
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// How many used and unused addresses a range request yields when the
/// next unused index is `next`.
///
/// `n_used == 0` asks for every used address. Unused addresses are only
/// returned when the whole run stays below the hardened boundary.
pub fn range_counts(next: u32, n_used: u32, n_unused: u32) -> (u32, u32) {
    let used = if n_used != 0 && next >= n_used { n_used } else { next };
    let unused = match next.checked_add(n_unused) {
        Some(end) if n_unused != 0 && end < HARDENED_KEY_START => n_unused,
        _ => 0,
    };
    (used, unused)
}

/// Derive used addresses backward from `next - 1` and unused addresses
/// forward from `next` on the external branch of `account`.
pub fn derive_address_range(
    account: &ExtendedKey,
    next: u32,
    n_used: u32,
    n_unused: u32,
) -> Result<AddressRange, WalletError> {
    let branch = account.child(EXTERNAL_BRANCH)?;
    let (total_used, total_unused) = range_counts(next, n_used, n_unused);
    let mut range = AddressRange { index: next, ..Default::default() };

    let mut derive = |index: u32, into: &mut Vec<String>| -> Result<(), WalletError> {
        match branch.child(index) {
            Ok(child) => {
                into.push(child.address()?.encode());
                Ok(())
            }
            Err(KeyError::InvalidChild) => {
                range.skipped += 1;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    };

    let mut used = Vec::with_capacity(total_used as usize);
    for i in 0..total_used {
        derive(next - 1 - i, &mut used)?;
    }
    let mut unused = Vec::with_capacity(total_unused as usize);
    for i in 0..total_unused {
        derive(next + i, &mut unused)?;
    }
    range.used = used;
    range.unused = unused;
    Ok(range)
}

/// The default account key `m/44'/coin'/0'` of a seed.
pub fn default_account_key(seed: &[u8], network: Network) -> Result<ExtendedKey, WalletError> {
    let coin_type = network.params().slip0044_coin_type;
    let key = ExtendedKey::new_master(seed, network)?
        .child(BIP44_PURPOSE + HARDENED_KEY_START)?
        .child(coin_type + HARDENED_KEY_START)?
        .child(DEFAULT_ACCOUNT + HARDENED_KEY_START)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ACCOUNT_DPUB: &str = "dpubZBcpPfFZ9PGZdqW64aazy29PVfYHXSSK4VzsR6XUu4XUsXcukg1HMiSyvCbLYhxFTGa9ai9awzJhQiZCNnLwEqkkSLmLDLEiomgsRZUt4ei";

    fn account() -> ExtendedKey {
        ExtendedKey::from_str_for(ACCOUNT_DPUB, Network::Mainnet).unwrap()
    }

    #[test]
    fn counts_follow_the_rules() {
        assert_eq!(range_counts(10, 3, 5), (3, 5));
        assert_eq!(range_counts(2, 3, 5), (2, 5));
        assert_eq!(range_counts(7, 0, 0), (7, 0));
        assert_eq!(range_counts(0, 4, 1), (0, 1));
        assert_eq!(range_counts(HARDENED_KEY_START - 2, 1, 2), (1, 0));
        assert_eq!(range_counts(HARDENED_KEY_START - 3, 1, 2), (1, 2));
        assert_eq!(range_counts(u32::MAX, 1, 2), (1, 0));
    }

    #[test]
    fn known_address_lands_in_the_right_list() {
        // External child 10 of the account.
        let known = "DshMmJ3bfvMDdk1mkXRD3x5xDuPwSxoYGfi";

        let range = derive_address_range(&account(), 11, 1, 0).unwrap();
        assert_eq!(range.used, vec![known.to_string()]);
        assert!(range.unused.is_empty());
        assert_eq!(range.index, 11);

        let range = derive_address_range(&account(), 10, 0, 2).unwrap();
        assert_eq!(range.used.len(), 10);
        assert_eq!(range.unused[0], known);
        assert_eq!(range.skipped, 0);
    }

    #[test]
    fn used_addresses_run_backward() {
        let range = derive_address_range(&account(), 3, 0, 0).unwrap();
        let branch = account().child(EXTERNAL_BRANCH).unwrap();
        let expect: Vec<String> =
            [2, 1, 0].iter().map(|i| branch.child(*i).unwrap().address().unwrap().encode()).collect();
        assert_eq!(range.used, expect);
    }

    #[test]
    fn private_and_public_accounts_agree() {
        let seed = [0x11u8; 32];
        let private = default_account_key(&seed, Network::Testnet).unwrap();
        let public = private.neuter().unwrap();
        assert_eq!(
            derive_address_range(&private, 4, 2, 2).unwrap(),
            derive_address_range(&public, 4, 2, 2).unwrap()
        );
    }

    #[test]
    fn serializes_without_zero_skips() {
        let range = AddressRange { used: vec!["a".into()], unused: vec![], index: 1, skipped: 0 };
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json, serde_json::json!({ "used": ["a"], "unused": [], "index": 1 }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn count_law(next in 0u32..24, n_used in 0u32..30, n_unused in 0u32..30) {
            let range = derive_address_range(&account(), next, n_used, n_unused).unwrap();
            let want_used = if n_used > 0 { n_used.min(next) } else { next };
            let derived = range.used.len() as u32 + range.unused.len() as u32 + range.skipped;
            prop_assert_eq!(derived, want_used + n_unused);
            prop_assert!(range.used.len() as u32 <= want_used);
            prop_assert_eq!(range.index, next);
        }
    }
}
