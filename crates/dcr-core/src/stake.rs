//! Structural classification of special transactions.
//!
//! These checks look at shape only (input/output counts, script tags,
//! versions). They are used for presentation, never for validity.

use crate::script::{self, opcodes::*, ScriptType};
use crate::types::TX_TREE_STAKE;
use crate::wire::{MsgTx, TX_VERSION_TREASURY};

/// Length of a treasury spend signature script:
/// `OP_DATA_64 <sig> OP_DATA_33 <pubkey> OP_TSPEND`.
const TSPEND_SIG_SCRIPT_LEN: usize = 1 + 64 + 1 + 33 + 1;

/// Length of a vote's block reference output: `OP_RETURN OP_DATA_36 <hash> <height>`.
const VOTE_BLOCK_REF_LEN: usize = 38;

/// Length of the treasurybase height/nonce output: `OP_RETURN OP_DATA_12 <12 bytes>`.
const TREASURYBASE_DATA_LEN: usize = 14;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxType {
    Regular,
    Ticket,
    Vote,
    Revocation,
    TreasuryAdd,
    TreasurySpend,
    TreasuryBase,
}

fn single_null_input(tx: &MsgTx) -> bool {
    tx.tx_in.len() == 1 && tx.tx_in[0].previous_outpoint.is_null()
}

pub fn is_treasury_base(tx: &MsgTx) -> bool {
    tx.version == TX_VERSION_TREASURY
        && single_null_input(tx)
        && tx.tx_in[0].signature_script.is_empty()
        && tx.tx_out.len() == 2
        && tx.tx_out[0].version == 0
        && tx.tx_out[0].pk_script == [OP_TADD]
        && tx.tx_out[1].pk_script.len() == TREASURYBASE_DATA_LEN
        && tx.tx_out[1].pk_script[..2] == [OP_RETURN, 0x0c]
}

pub fn is_tspend(tx: &MsgTx) -> bool {
    if tx.version != TX_VERSION_TREASURY || tx.tx_in.len() != 1 || tx.tx_out.len() < 2 {
        return false;
    }
    let sig = &tx.tx_in[0].signature_script;
    if sig.len() != TSPEND_SIG_SCRIPT_LEN
        || sig[0] != OP_DATA_64
        || sig[65] != OP_DATA_33
        || sig[99] != OP_TSPEND
    {
        return false;
    }
    let first = &tx.tx_out[0].pk_script;
    if first.len() != 34 || first[..2] != [OP_RETURN, OP_DATA_32] {
        return false;
    }
    tx.tx_out[1..]
        .iter()
        .all(|o| matches!(script::classify(o.version, &o.pk_script), ScriptType::TreasuryGen(_)))
}

/// A coinbase spends a single null outpoint and is neither a treasurybase
/// nor a treasury spend.
pub fn is_coinbase(tx: &MsgTx) -> bool {
    single_null_input(tx) && !is_treasury_base(tx) && !is_tspend(tx)
}

pub fn is_treasury_add(tx: &MsgTx) -> bool {
    tx.version == TX_VERSION_TREASURY
        && !tx.tx_in.is_empty()
        && !tx.tx_out.is_empty()
        && tx.tx_out.len() <= 2
        && tx.tx_out[0].pk_script == [OP_TADD]
        && tx.tx_out[1..]
            .iter()
            .all(|o| matches!(script::classify(o.version, &o.pk_script), ScriptType::StakeChange(_)))
}

/// Ticket purchase: an `OP_SSTX` submission, then commitment/change pairs.
pub fn is_sstx(tx: &MsgTx) -> bool {
    let n_out = tx.tx_out.len();
    if tx.tx_in.is_empty() || n_out < 3 || n_out % 2 == 0 || tx.tx_in.len() != (n_out - 1) / 2 {
        return false;
    }
    if !matches!(
        script::classify(tx.tx_out[0].version, &tx.tx_out[0].pk_script),
        ScriptType::StakeSubmission(_)
    ) {
        return false;
    }
    tx.tx_out.iter().enumerate().skip(1).all(|(i, o)| {
        if i % 2 == 1 {
            script::is_commitment_script(&o.pk_script)
        } else {
            o.pk_script.first() == Some(&OP_SSTXCHANGE)
        }
    })
}

/// Vote: a stakebase input, a ticket input, a block reference, vote bits,
/// then `OP_SSGEN` payouts (plus an optional trailing treasury vote).
pub fn is_ssgen(tx: &MsgTx) -> bool {
    if tx.tx_in.len() != 2 || tx.tx_out.len() < 3 {
        return false;
    }
    if !tx.tx_in[0].previous_outpoint.is_null() || tx.tx_in[1].previous_outpoint.tree != TX_TREE_STAKE {
        return false;
    }
    let block_ref = &tx.tx_out[0].pk_script;
    if block_ref.len() != VOTE_BLOCK_REF_LEN || block_ref[..2] != [OP_RETURN, 0x24] {
        return false;
    }
    if tx.tx_out[1].pk_script.first() != Some(&OP_RETURN) {
        return false;
    }
    let mut payouts = &tx.tx_out[2..];
    if tx.version == TX_VERSION_TREASURY
        && payouts.last().is_some_and(|o| o.pk_script.first() == Some(&OP_RETURN))
    {
        payouts = &payouts[..payouts.len() - 1];
    }
    !payouts.is_empty()
        && payouts
            .iter()
            .all(|o| matches!(script::classify(o.version, &o.pk_script), ScriptType::StakeGen(_)))
}

/// Revocation: one ticket input and only `OP_SSRTX` outputs.
pub fn is_ssrtx(tx: &MsgTx) -> bool {
    tx.tx_in.len() == 1
        && tx.tx_in[0].previous_outpoint.tree == TX_TREE_STAKE
        && !tx.tx_out.is_empty()
        && tx.tx_out
            .iter()
            .all(|o| matches!(script::classify(o.version, &o.pk_script), ScriptType::StakeRevoke(_)))
}

pub fn determine_tx_type(tx: &MsgTx) -> TxType {
    if is_sstx(tx) {
        TxType::Ticket
    } else if is_ssgen(tx) {
        TxType::Vote
    } else if is_ssrtx(tx) {
        TxType::Revocation
    } else if is_treasury_base(tx) {
        TxType::TreasuryBase
    } else if is_tspend(tx) {
        TxType::TreasurySpend
    } else if is_treasury_add(tx) {
        TxType::TreasuryAdd
    } else {
        TxType::Regular
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::tests::{REVOCATION_HEX, TREASURYBASE_HEX};

    const CHAINBASE_HEX: &str = "03000000010000000000000000000000000000000000000000000000000000000000000000ffffffff00ffffffff02000000000000000000000e6a0ce55d0f0033613ca1a89ea2194ef75e000000000000001976a914e84caeb864252bace69af9a129a800c0e96ac8f688ac000000000000000001ce055e000000000000000000ffffffff0800002f646372642f";

    #[test]
    fn revocation_classifies() {
        let tx = MsgTx::from_hex(REVOCATION_HEX).unwrap();
        assert!(is_ssrtx(&tx));
        assert_eq!(determine_tx_type(&tx), TxType::Revocation);
        assert!(!is_coinbase(&tx));
    }

    #[test]
    fn treasurybase_is_not_coinbase() {
        let tx = MsgTx::from_hex(TREASURYBASE_HEX).unwrap();
        assert!(is_treasury_base(&tx));
        assert!(!is_coinbase(&tx));
        assert_eq!(determine_tx_type(&tx), TxType::TreasuryBase);
    }

    #[test]
    fn chainbase_is_coinbase() {
        let tx = MsgTx::from_hex(CHAINBASE_HEX).unwrap();
        assert!(is_coinbase(&tx));
        assert!(!is_treasury_base(&tx));
        assert_eq!(determine_tx_type(&tx), TxType::Regular);
    }

    #[test]
    fn empty_tx_is_regular() {
        assert_eq!(determine_tx_type(&MsgTx::new()), TxType::Regular);
    }
}
