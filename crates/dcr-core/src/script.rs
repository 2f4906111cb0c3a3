//! Version-0 transaction scripts: construction, classification, address
//! extraction and disassembly.
//!
//! Only the script forms a wallet actually meets are recognised. Anything
//! else classifies as [`ScriptType::NonStandard`].

use std::fmt;

use crate::address::{Address, AddressKind};
use crate::crypto::HASH160_LEN;
use crate::error::ScriptError;
use crate::params::Network;

/// Opcode values used by the wallet.
pub mod opcodes {
    pub const OP_0: u8 = 0x00;
    pub const OP_DATA_20: u8 = 0x14;
    pub const OP_DATA_32: u8 = 0x20;
    pub const OP_DATA_33: u8 = 0x21;
    pub const OP_DATA_64: u8 = 0x40;
    pub const OP_DATA_65: u8 = 0x41;
    pub const OP_PUSHDATA1: u8 = 0x4c;
    pub const OP_PUSHDATA2: u8 = 0x4d;
    pub const OP_PUSHDATA4: u8 = 0x4e;
    pub const OP_1NEGATE: u8 = 0x4f;
    pub const OP_1: u8 = 0x51;
    pub const OP_16: u8 = 0x60;
    pub const OP_RETURN: u8 = 0x6a;
    pub const OP_DUP: u8 = 0x76;
    pub const OP_EQUAL: u8 = 0x87;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_SSTX: u8 = 0xba;
    pub const OP_SSGEN: u8 = 0xbb;
    pub const OP_SSRTX: u8 = 0xbc;
    pub const OP_SSTXCHANGE: u8 = 0xbd;
    pub const OP_TADD: u8 = 0xc1;
    pub const OP_TSPEND: u8 = 0xc2;
    pub const OP_TGEN: u8 = 0xc3;
}

use opcodes::*;

/// Length of a pay-to-pubkey-hash output script.
pub const P2PKH_SCRIPT_LEN: usize = 25;

/// Length of a pay-to-script-hash output script.
pub const P2SH_SCRIPT_LEN: usize = 23;

/// Length of a ticket commitment output script.
pub const COMMITMENT_SCRIPT_LEN: usize = 32;

/// Largest payload a standard null-data output may carry.
pub const MAX_DATA_CARRIER_SIZE: usize = 256;

/// Flag in the encoded commitment amount marking a script-hash commitment.
const COMMITMENT_P2SH_FLAG: u64 = 1 << 63;

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
pub fn p2pkh_script(hash: &[u8; HASH160_LEN]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2PKH_SCRIPT_LEN);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

/// `OP_HASH160 <hash> OP_EQUAL`.
pub fn p2sh_script(hash: &[u8; HASH160_LEN]) -> Vec<u8> {
    let mut script = Vec::with_capacity(P2SH_SCRIPT_LEN);
    script.extend_from_slice(&[OP_HASH160, OP_DATA_20]);
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

fn extract_p2pkh(script: &[u8]) -> Option<[u8; HASH160_LEN]> {
    if script.len() == P2PKH_SCRIPT_LEN
        && script[..3] == [OP_DUP, OP_HASH160, OP_DATA_20]
        && script[23..] == [OP_EQUALVERIFY, OP_CHECKSIG]
    {
        let mut hash = [0u8; HASH160_LEN];
        hash.copy_from_slice(&script[3..23]);
        Some(hash)
    } else {
        None
    }
}

fn extract_p2sh(script: &[u8]) -> Option<[u8; HASH160_LEN]> {
    if script.len() == P2SH_SCRIPT_LEN
        && script[..2] == [OP_HASH160, OP_DATA_20]
        && script[22] == OP_EQUAL
    {
        let mut hash = [0u8; HASH160_LEN];
        hash.copy_from_slice(&script[2..22]);
        Some(hash)
    } else {
        None
    }
}

fn extract_hash(script: &[u8]) -> Option<(AddressKind, [u8; HASH160_LEN])> {
    extract_p2pkh(script)
        .map(|h| (AddressKind::PubKeyHash, h))
        .or_else(|| extract_p2sh(script).map(|h| (AddressKind::ScriptHash, h)))
}

/// Standard script forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptType {
    NonStandard,
    PubKey,
    PubKeyHash,
    ScriptHash,
    NullData,
    StakeSubmission(AddressKind),
    StakeGen(AddressKind),
    StakeRevoke(AddressKind),
    StakeChange(AddressKind),
    TreasuryAdd,
    TreasuryGen(AddressKind),
}

fn kind_suffix(kind: AddressKind) -> &'static str {
    match kind {
        AddressKind::PubKeyHash => "pubkeyhash",
        AddressKind::ScriptHash => "scripthash",
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptType::NonStandard => f.write_str("nonstandard"),
            ScriptType::PubKey => f.write_str("pubkey"),
            ScriptType::PubKeyHash => f.write_str("pubkeyhash"),
            ScriptType::ScriptHash => f.write_str("scripthash"),
            ScriptType::NullData => f.write_str("nulldata"),
            ScriptType::StakeSubmission(k) => write!(f, "stakesubmission-{}", kind_suffix(*k)),
            ScriptType::StakeGen(k) => write!(f, "stakegen-{}", kind_suffix(*k)),
            ScriptType::StakeRevoke(k) => write!(f, "stakerevoke-{}", kind_suffix(*k)),
            ScriptType::StakeChange(k) => write!(f, "stakechange-{}", kind_suffix(*k)),
            ScriptType::TreasuryAdd => f.write_str("treasuryadd"),
            ScriptType::TreasuryGen(k) => write!(f, "treasurygen-{}", kind_suffix(*k)),
        }
    }
}

fn is_pubkey_script(script: &[u8]) -> bool {
    match script.len() {
        35 => {
            script[0] == OP_DATA_33 && matches!(script[1], 0x02 | 0x03) && script[34] == OP_CHECKSIG
        }
        67 => script[0] == OP_DATA_65 && script[1] == 0x04 && script[66] == OP_CHECKSIG,
        _ => false,
    }
}

fn is_null_data(script: &[u8]) -> bool {
    if script.first() != Some(&OP_RETURN) {
        return false;
    }
    if script.len() == 1 {
        return true;
    }
    let mut tokens = Tokenizer::new(&script[1..]);
    match (tokens.next(), tokens.next()) {
        (Some(Ok(op)), None) => match op.data {
            Some(data) => data.len() <= MAX_DATA_CARRIER_SIZE,
            None => op.opcode == OP_0 || (OP_1..=OP_16).contains(&op.opcode),
        },
        _ => false,
    }
}

/// Classify a script. Non-zero script versions are always non-standard.
pub fn classify(version: u16, script: &[u8]) -> ScriptType {
    if version != 0 {
        return ScriptType::NonStandard;
    }
    if extract_p2pkh(script).is_some() {
        return ScriptType::PubKeyHash;
    }
    if extract_p2sh(script).is_some() {
        return ScriptType::ScriptHash;
    }
    if is_pubkey_script(script) {
        return ScriptType::PubKey;
    }
    if is_null_data(script) {
        return ScriptType::NullData;
    }
    if script == [OP_TADD] {
        return ScriptType::TreasuryAdd;
    }
    if let Some((&tag, rest)) = script.split_first() {
        if let Some((kind, _)) = extract_hash(rest) {
            match tag {
                OP_SSTX => return ScriptType::StakeSubmission(kind),
                OP_SSGEN => return ScriptType::StakeGen(kind),
                OP_SSRTX => return ScriptType::StakeRevoke(kind),
                OP_SSTXCHANGE => return ScriptType::StakeChange(kind),
                OP_TGEN => return ScriptType::TreasuryGen(kind),
                _ => {}
            }
        }
    }
    ScriptType::NonStandard
}

/// Classify a script and extract the addresses it pays to.
///
/// Bare public key scripts classify but yield no address.
pub fn extract_addresses(version: u16, script: &[u8], network: Network) -> (ScriptType, Vec<Address>) {
    let ty = classify(version, script);
    let hashed = match ty {
        ScriptType::PubKeyHash | ScriptType::ScriptHash => Some(script),
        ScriptType::StakeSubmission(_)
        | ScriptType::StakeGen(_)
        | ScriptType::StakeRevoke(_)
        | ScriptType::StakeChange(_)
        | ScriptType::TreasuryGen(_) => Some(&script[1..]),
        _ => None,
    };
    let addrs = hashed
        .and_then(extract_hash)
        .map(|(kind, hash)| match kind {
            AddressKind::PubKeyHash => Address::p2pkh(hash, network),
            AddressKind::ScriptHash => Address::p2sh(hash, network),
        })
        .into_iter()
        .collect();
    (ty, addrs)
}

/// Number of signatures needed to redeem a standard script.
pub fn required_sigs(version: u16, script: &[u8]) -> u16 {
    match classify(version, script) {
        ScriptType::NonStandard | ScriptType::NullData | ScriptType::TreasuryAdd => 0,
        _ => 1,
    }
}

/// Whether the script is a ticket commitment (`OP_RETURN OP_DATA_30 ...`).
pub fn is_commitment_script(script: &[u8]) -> bool {
    script.len() == COMMITMENT_SCRIPT_LEN && script[0] == OP_RETURN && script[1] == 0x1e
}

/// Address committed to by a ticket commitment output.
pub fn commitment_address(script: &[u8], network: Network) -> Result<Address, ScriptError> {
    if !is_commitment_script(script) {
        return Err(ScriptError::NotCommitment);
    }
    let mut hash = [0u8; HASH160_LEN];
    hash.copy_from_slice(&script[2..22]);
    if script[29] & 0x80 != 0 {
        Ok(Address::p2sh(hash, network))
    } else {
        Ok(Address::p2pkh(hash, network))
    }
}

/// Amount (in atoms) committed to by a ticket commitment output.
pub fn commitment_amount(script: &[u8]) -> Result<i64, ScriptError> {
    if !is_commitment_script(script) {
        return Err(ScriptError::NotCommitment);
    }
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&script[22..30]);
    Ok((u64::from_le_bytes(raw) & !COMMITMENT_P2SH_FLAG) as i64)
}

/// A parsed opcode and its pushed data, if any.
#[derive(Debug, Clone, Copy)]
pub struct Op<'a> {
    pub opcode: u8,
    pub data: Option<&'a [u8]>,
}

/// Iterator over the opcodes of a script.
///
/// Yields an error once for a truncated push and then stops.
pub struct Tokenizer<'a> {
    script: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self { script, offset: 0, failed: false }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ScriptError> {
        let end = self.offset.checked_add(n).filter(|e| *e <= self.script.len());
        match end {
            Some(end) => {
                let out = &self.script[self.offset..end];
                self.offset = end;
                Ok(out)
            }
            None => Err(ScriptError::MalformedPush(self.offset)),
        }
    }

    fn push_len(&mut self, opcode: u8) -> Result<Option<usize>, ScriptError> {
        Ok(match opcode {
            0x01..=0x4b => Some(opcode as usize),
            OP_PUSHDATA1 => Some(self.take(1)?[0] as usize),
            OP_PUSHDATA2 => {
                let b = self.take(2)?;
                Some(u16::from_le_bytes([b[0], b[1]]) as usize)
            }
            OP_PUSHDATA4 => {
                let b = self.take(4)?;
                Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            }
            _ => None,
        })
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Op<'a>, ScriptError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.script.len() {
            return None;
        }
        let start = self.offset;
        let opcode = self.script[start];
        self.offset += 1;
        let result = self.push_len(opcode).and_then(|len| match len {
            Some(n) => self.take(n).map(|data| Op { opcode, data: Some(data) }),
            None => Ok(Op { opcode, data: None }),
        });
        if result.is_err() {
            self.failed = true;
            return Some(Err(ScriptError::MalformedPush(start)));
        }
        Some(result)
    }
}

/// Name of a non-push opcode as printed by disassembly.
pub fn opcode_name(op: u8) -> String {
    let name = match op {
        0x00 => "0",
        0x4f => "-1",
        0x50 => "OP_RESERVED",
        0x51..=0x60 => return (op - 0x50).to_string(),
        0x61 => "OP_NOP",
        0x62 => "OP_VER",
        0x63 => "OP_IF",
        0x64 => "OP_NOTIF",
        0x65 => "OP_VERIF",
        0x66 => "OP_VERNOTIF",
        0x67 => "OP_ELSE",
        0x68 => "OP_ENDIF",
        0x69 => "OP_VERIFY",
        0x6a => "OP_RETURN",
        0x6b => "OP_TOALTSTACK",
        0x6c => "OP_FROMALTSTACK",
        0x6d => "OP_2DROP",
        0x6e => "OP_2DUP",
        0x6f => "OP_3DUP",
        0x70 => "OP_2OVER",
        0x71 => "OP_2ROT",
        0x72 => "OP_2SWAP",
        0x73 => "OP_IFDUP",
        0x74 => "OP_DEPTH",
        0x75 => "OP_DROP",
        0x76 => "OP_DUP",
        0x77 => "OP_NIP",
        0x78 => "OP_OVER",
        0x79 => "OP_PICK",
        0x7a => "OP_ROLL",
        0x7b => "OP_ROT",
        0x7c => "OP_SWAP",
        0x7d => "OP_TUCK",
        0x7e => "OP_CAT",
        0x7f => "OP_SUBSTR",
        0x80 => "OP_LEFT",
        0x81 => "OP_RIGHT",
        0x82 => "OP_SIZE",
        0x83 => "OP_INVERT",
        0x84 => "OP_AND",
        0x85 => "OP_OR",
        0x86 => "OP_XOR",
        0x87 => "OP_EQUAL",
        0x88 => "OP_EQUALVERIFY",
        0x89 => "OP_ROTATE",
        0x8a => "OP_ROTATEVERIFY",
        0x8b => "OP_1ADD",
        0x8c => "OP_1SUB",
        0x8d => "OP_2MUL",
        0x8e => "OP_2DIV",
        0x8f => "OP_NEGATE",
        0x90 => "OP_ABS",
        0x91 => "OP_NOT",
        0x92 => "OP_0NOTEQUAL",
        0x93 => "OP_ADD",
        0x94 => "OP_SUB",
        0x95 => "OP_MUL",
        0x96 => "OP_DIV",
        0x97 => "OP_MOD",
        0x98 => "OP_LSHIFT",
        0x99 => "OP_RSHIFT",
        0x9a => "OP_BOOLAND",
        0x9b => "OP_BOOLOR",
        0x9c => "OP_NUMEQUAL",
        0x9d => "OP_NUMEQUALVERIFY",
        0x9e => "OP_NUMNOTEQUAL",
        0x9f => "OP_LESSTHAN",
        0xa0 => "OP_GREATERTHAN",
        0xa1 => "OP_LESSTHANOREQUAL",
        0xa2 => "OP_GREATERTHANOREQUAL",
        0xa3 => "OP_MIN",
        0xa4 => "OP_MAX",
        0xa5 => "OP_WITHIN",
        0xa6 => "OP_RIPEMD160",
        0xa7 => "OP_SHA1",
        0xa8 => "OP_BLAKE256",
        0xa9 => "OP_HASH160",
        0xaa => "OP_HASH256",
        0xab => "OP_CODESEPARATOR",
        0xac => "OP_CHECKSIG",
        0xad => "OP_CHECKSIGVERIFY",
        0xae => "OP_CHECKMULTISIG",
        0xaf => "OP_CHECKMULTISIGVERIFY",
        0xb0 => "OP_NOP1",
        0xb1 => "OP_CHECKLOCKTIMEVERIFY",
        0xb2 => "OP_CHECKSEQUENCEVERIFY",
        0xb3..=0xb9 => return format!("OP_NOP{}", op - 0xb3 + 4),
        0xba => "OP_SSTX",
        0xbb => "OP_SSGEN",
        0xbc => "OP_SSRTX",
        0xbd => "OP_SSTXCHANGE",
        0xbe => "OP_CHECKSIGALT",
        0xbf => "OP_CHECKSIGALTVERIFY",
        0xc0 => "OP_SHA256",
        0xc1 => "OP_TADD",
        0xc2 => "OP_TSPEND",
        0xc3 => "OP_TGEN",
        _ => return format!("OP_UNKNOWN{op}"),
    };
    name.to_string()
}

/// One-line disassembly: pushes as hex, small integers as numbers, other
/// opcodes by name. A truncated push appends `[error]`.
pub fn disassemble(script: &[u8]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for token in Tokenizer::new(script) {
        match token {
            Ok(Op { data: Some(data), .. }) => parts.push(hex::encode(data)),
            Ok(Op { opcode, data: None }) => parts.push(opcode_name(opcode)),
            Err(_) => {
                parts.push("[error]".to_string());
                break;
            }
        }
    }
    parts.join(" ")
}
