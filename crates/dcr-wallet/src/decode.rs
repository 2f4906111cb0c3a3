//! Verbose structural decoding of raw transactions.
//!
//! Presentation only: nothing here checks validity. Field names follow the
//! `decoderawtransaction` JSON layout so existing callers can parse it.

use dcr_core::params::Network;
use dcr_core::script::{self, commitment_address, commitment_amount, disassemble, extract_addresses};
use dcr_core::stake::{self, TxType};
use dcr_core::types::atoms_to_coin;
use dcr_core::wire::{MsgTx, TxIn};
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Script type reported for ticket commitment outputs.
pub const SSTX_COMMITMENT_TYPE: &str = "sstxcommitment";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptSig {
    pub asm: String,
    pub hex: String,
}

/// One decoded input. Exactly one of the special-kind fields or the
/// previous outpoint fields is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coinbase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakebase: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub treasurybase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treasuryspend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub txid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vout: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<i8>,
    pub sequence: u32,
    pub amountin: f64,
    pub blockheight: u32,
    pub blockindex: u32,
    #[serde(rename = "scriptSig", default, skip_serializing_if = "Option::is_none")]
    pub script_sig: Option<ScriptSig>,
}

impl Vin {
    fn from_input(input: &TxIn) -> Self {
        Self {
            sequence: input.sequence,
            amountin: atoms_to_coin(input.value_in),
            blockheight: input.block_height,
            blockindex: input.block_index,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScriptPubKey {
    pub asm: String,
    pub hex: String,
    #[serde(rename = "reqSigs", default, skip_serializing_if = "is_zero")]
    pub req_sigs: i32,
    #[serde(rename = "type")]
    pub script_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitamt: Option<f64>,
    pub version: u16,
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vout {
    pub value: f64,
    pub n: u32,
    pub version: u16,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// A decoded transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTx {
    pub txid: String,
    pub version: i32,
    pub locktime: u32,
    pub expiry: u32,
    pub vin: Vec<Vin>,
    pub vout: Vec<Vout>,
}

/// Inputs of `tx`, with the null inputs of coinbases, treasury bases,
/// treasury spends and votes reported by kind.
pub fn vin_list(tx: &MsgTx) -> Vec<Vin> {
    // A treasurybase also looks like a coinbase, so it is checked first.
    if let Some(first) = tx.tx_in.first() {
        if stake::is_treasury_base(tx) {
            return vec![Vin { treasurybase: true, ..Vin::from_input(first) }];
        }
        if stake::is_coinbase(tx) {
            let script = hex::encode(&first.signature_script);
            return vec![Vin { coinbase: Some(script), ..Vin::from_input(first) }];
        }
        if stake::is_tspend(tx) {
            let script = hex::encode(&first.signature_script);
            return vec![Vin { treasuryspend: Some(script), ..Vin::from_input(first) }];
        }
    }

    let is_vote = stake::is_ssgen(tx);
    tx.tx_in
        .iter()
        .enumerate()
        .map(|(i, input)| {
            if is_vote && i == 0 {
                let script = hex::encode(&input.signature_script);
                return Vin { stakebase: Some(script), ..Vin::from_input(input) };
            }
            let prev = &input.previous_outpoint;
            Vin {
                txid: Some(prev.hash.to_string()),
                vout: Some(prev.index),
                tree: Some(prev.tree),
                script_sig: Some(ScriptSig {
                    asm: disassemble(&input.signature_script),
                    hex: hex::encode(&input.signature_script),
                }),
                ..Vin::from_input(input)
            }
        })
        .collect()
}

/// Outputs of `tx`. Odd outputs of a ticket are commitments and report the
/// committed address and amount.
pub fn vout_list(tx: &MsgTx, network: Network) -> Result<Vec<Vout>, WalletError> {
    let is_ticket = stake::determine_tx_type(tx) == TxType::Ticket;
    tx.tx_out
        .iter()
        .enumerate()
        .map(|(i, out)| {
            let mut spk = ScriptPubKey {
                asm: disassemble(&out.pk_script),
                hex: hex::encode(&out.pk_script),
                version: out.version,
                ..Default::default()
            };
            if is_ticket && i % 2 != 0 {
                let commitment_err = |what: &str| {
                    WalletError::InvalidArguments(format!(
                        "failed to decode ticket commitment {what} output for tx hash {}, output idx {i}",
                        tx.tx_hash()
                    ))
                };
                let address = commitment_address(&out.pk_script, network).map_err(|_| commitment_err("addr"))?;
                let amount = commitment_amount(&out.pk_script).map_err(|_| commitment_err("amt"))?;
                spk.script_type = SSTX_COMMITMENT_TYPE.to_string();
                spk.addresses = vec![address.encode()];
                spk.commitamt = Some(atoms_to_coin(amount));
            } else {
                let (ty, addresses) = extract_addresses(out.version, &out.pk_script, network);
                spk.script_type = ty.to_string();
                spk.addresses = addresses.iter().map(ToString::to_string).collect();
                spk.req_sigs = i32::from(script::required_sigs(out.version, &out.pk_script));
            }
            Ok(Vout { value: atoms_to_coin(out.value), n: i as u32, version: out.version, script_pub_key: spk })
        })
        .collect()
}

/// Decode a hex transaction. Odd-length input is left padded with a zero.
pub fn decode_tx(tx_hex: &str, network: Network) -> Result<DecodedTx, WalletError> {
    let tx = MsgTx::from_hex(tx_hex)?;
    let vout = vout_list(&tx, network)?;
    Ok(DecodedTx {
        txid: tx.tx_hash().to_string(),
        version: i32::from(tx.version),
        locktime: tx.lock_time,
        expiry: tx.expiry,
        vin: vin_list(&tx),
        vout,
    })
}

/// Replace input signature scripts and return the full serialization.
///
/// `sig_scripts` needs one hex entry per input. Empty entries leave that
/// input untouched.
pub fn add_sigs(tx_hex: &str, sig_scripts: &[String]) -> Result<String, WalletError> {
    let mut tx = MsgTx::from_hex(tx_hex)?;
    if tx.tx_in.len() != sig_scripts.len() {
        return Err(WalletError::SignatureCountMismatch { inputs: tx.tx_in.len(), sigs: sig_scripts.len() });
    }
    for (input, sig) in tx.tx_in.iter_mut().zip(sig_scripts) {
        if sig.is_empty() {
            continue;
        }
        input.signature_script =
            hex::decode(sig).map_err(|e| WalletError::InvalidArguments(format!("invalid signature script: {e}")))?;
    }
    tx.ser_type = dcr_core::wire::SerType::Full;
    Ok(tx.to_hex())
}
