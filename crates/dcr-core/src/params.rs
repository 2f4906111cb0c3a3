//! Network parameters: key versions, address prefixes and coin types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// Offset of the first hardened child index.
pub const HARDENED_KEY_START: u32 = 0x8000_0000;

/// BIP-0044 purpose index.
pub const BIP44_PURPOSE: u32 = 44;

/// Decred networks supported by the wallet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Simnet,
}

/// Constant parameters of one network.
#[derive(Debug)]
pub struct NetParams {
    pub name: &'static str,
    pub hd_private_key_id: [u8; 4],
    pub hd_public_key_id: [u8; 4],
    pub pubkey_hash_addr_id: [u8; 2],
    pub script_hash_addr_id: [u8; 2],
    /// SLIP-0044 registered coin type.
    pub slip0044_coin_type: u32,
}

const MAINNET: NetParams = NetParams {
    name: "mainnet",
    hd_private_key_id: [0x02, 0xfd, 0xa4, 0xe8], // dprv
    hd_public_key_id: [0x02, 0xfd, 0xa9, 0x26],  // dpub
    pubkey_hash_addr_id: [0x07, 0x3f],           // Ds
    script_hash_addr_id: [0x07, 0x1a],           // Dc
    slip0044_coin_type: 42,
};

const TESTNET: NetParams = NetParams {
    name: "testnet3",
    hd_private_key_id: [0x04, 0x35, 0x83, 0x97], // tprv
    hd_public_key_id: [0x04, 0x35, 0x87, 0xd1],  // tpub
    pubkey_hash_addr_id: [0x0f, 0x21],           // Ts
    script_hash_addr_id: [0x0e, 0xfc],           // Tc
    slip0044_coin_type: 1,
};

const SIMNET: NetParams = NetParams {
    name: "simnet",
    hd_private_key_id: [0x04, 0x20, 0xb9, 0x03], // sprv
    hd_public_key_id: [0x04, 0x20, 0xbd, 0x3d],  // spub
    pubkey_hash_addr_id: [0x0e, 0x91],           // Ss
    script_hash_addr_id: [0x0e, 0x6c],           // Sc
    slip0044_coin_type: 1,
};

impl Network {
    pub const ALL: [Network; 3] = [Network::Mainnet, Network::Testnet, Network::Simnet];

    pub fn params(&self) -> &'static NetParams {
        match self {
            Network::Mainnet => &MAINNET,
            Network::Testnet => &TESTNET,
            Network::Simnet => &SIMNET,
        }
    }

    /// Detect the network from the four-character prefix of an extended key
    /// (`dprv`, `dpub`, `tprv`, `tpub`, `sprv`, `spub`), case-insensitively.
    pub fn from_extended_key_prefix(prefix: &str) -> Option<Network> {
        match prefix.to_ascii_lowercase().as_str() {
            "dprv" | "dpub" => Some(Network::Mainnet),
            "tprv" | "tpub" => Some(Network::Testnet),
            "sprv" | "spub" => Some(Network::Simnet),
            _ => None,
        }
    }

    /// Network owning an HD key version, and whether it is private.
    pub fn from_hd_version(version: [u8; 4]) -> Option<(Network, bool)> {
        Self::ALL.into_iter().find_map(|net| {
            let p = net.params();
            if p.hd_private_key_id == version {
                Some((net, true))
            } else if p.hd_public_key_id == version {
                Some((net, false))
            } else {
                None
            }
        })
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.params().name)
    }
}

impl FromStr for Network {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" | "testnet3" => Ok(Network::Testnet),
            "simnet" => Ok(Network::Simnet),
            _ => Err(AddressError::UnknownNetwork(s.to_string())),
        }
    }
}
