//! Unsigned transaction authoring.
//!
//! [`new_unsigned_transaction`] repeatedly asks an [`InputSource`] for enough
//! value to cover the outputs plus the fee of the worst-case signed size,
//! growing the fee target until the selected inputs pay for themselves.
//! Change is appended last unless it would be dust.

use crate::error::AuthorError;
use crate::script::P2PKH_SCRIPT_LEN;
use crate::types::{UnspentCoin, MAX_AMOUNT};
use crate::wire::{var_int_size, MsgTx, SerType, TxIn, TxOut, TX_VERSION};

/// Worst-case size of a P2PKH signature script:
/// `OP_DATA_73 <sig+hashtype> OP_DATA_33 <compressed pubkey>`.
pub const REDEEM_P2PKH_SIG_SCRIPT_SIZE: usize = 1 + 73 + 1 + 33;

/// Size of a P2PKH output script.
pub const P2PKH_PK_SCRIPT_SIZE: usize = P2PKH_SCRIPT_LEN;

/// Default relay fee, in atoms per kilobyte.
pub const DEFAULT_RELAY_FEE_PER_KB: i64 = 10_000;

/// Largest change script accepted.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 2048;

/// Worst-case serialized size of an input redeemed by a script of `script_size`.
pub fn estimate_input_size(script_size: usize) -> usize {
    32 + 4 + 1 + 8 + 4 + 4 + var_int_size(script_size as u64) + script_size + 4
}

/// Serialized size of an output carrying a script of `script_size`.
pub fn estimate_output_size(script_size: usize) -> usize {
    8 + 2 + var_int_size(script_size as u64) + script_size
}

/// Worst-case serialized size of a signed transaction.
///
/// A `change_script_size` of zero means no change output.
pub fn estimate_serialize_size(script_sizes: &[usize], outputs: &[TxOut], change_script_size: usize) -> usize {
    let change_size = if change_script_size > 0 {
        estimate_output_size(change_script_size)
    } else {
        0
    };
    let n_outputs = outputs.len() + usize::from(change_script_size > 0);

    12 + 2 * var_int_size(script_sizes.len() as u64)
        + var_int_size(n_outputs as u64)
        + script_sizes.iter().map(|s| estimate_input_size(*s)).sum::<usize>()
        + outputs.iter().map(TxOut::serialize_size).sum::<usize>()
        + change_size
}

/// Fee for a transaction of `size` bytes. Never below `relay_fee_per_kb` when
/// the rate is positive, never above the maximum amount.
pub fn fee_for_serialize_size(relay_fee_per_kb: i64, size: usize) -> i64 {
    let mut fee = relay_fee_per_kb.saturating_mul(size as i64) / 1000;
    if fee == 0 && relay_fee_per_kb > 0 {
        fee = relay_fee_per_kb;
    }
    fee.clamp(0, MAX_AMOUNT)
}

/// Whether an output of `amount` with a script of `script_size` costs more to
/// spend than it is worth at `relay_fee_per_kb`.
pub fn is_dust_amount(amount: i64, script_size: usize, relay_fee_per_kb: i64) -> bool {
    // Output size plus a worst-case input spending it.
    let total_size = 8 + 2 + var_int_size(script_size as u64) + script_size + 165;
    amount.saturating_mul(1000) / (3 * total_size as i64) < relay_fee_per_kb
}

pub fn sum_output_values(outputs: &[TxOut]) -> i64 {
    outputs.iter().map(|o| o.value).sum()
}

/// Inputs chosen by an [`InputSource`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputDetail {
    pub amount: i64,
    pub inputs: Vec<TxIn>,
    /// Previous output scripts, one per input.
    pub scripts: Vec<Vec<u8>>,
    /// Worst-case redeem script size, one per input.
    pub redeem_script_sizes: Vec<usize>,
}

impl InputDetail {
    /// Append a P2PKH coin.
    pub fn push_coin(&mut self, coin: &UnspentCoin) {
        self.amount += coin.amount;
        self.inputs.push(TxIn::new(coin.outpoint(), coin.amount));
        self.scripts.push(coin.script_pub_key.clone());
        self.redeem_script_sizes.push(REDEEM_P2PKH_SIG_SCRIPT_SIZE);
    }
}

/// Supplies inputs covering at least `target` atoms, or everything available.
pub trait InputSource: Send {
    fn select(&mut self, target: i64) -> Result<InputDetail, AuthorError>;
}

impl<F> InputSource for F
where
    F: FnMut(i64) -> Result<InputDetail, AuthorError> + Send,
{
    fn select(&mut self, target: i64) -> Result<InputDetail, AuthorError> {
        self(target)
    }
}

/// Supplies the script change is paid to.
pub trait ChangeSource: Send + Sync {
    fn script(&self) -> Result<(Vec<u8>, u16), AuthorError>;
    fn script_size(&self) -> usize;
}

/// Change paid to a fixed script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChangeSource {
    pub script: Vec<u8>,
    pub version: u16,
}

impl ChangeSource for ScriptChangeSource {
    fn script(&self) -> Result<(Vec<u8>, u16), AuthorError> {
        Ok((self.script.clone(), self.version))
    }

    fn script_size(&self) -> usize {
        self.script.len()
    }
}

/// An authored, unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthoredTx {
    pub tx: MsgTx,
    pub prev_scripts: Vec<Vec<u8>>,
    pub total_input: i64,
    /// Index of the change output, if one was added.
    pub change_index: Option<usize>,
    pub estimated_signed_size: usize,
}

impl AuthoredTx {
    /// Fee paid: total input minus total output value.
    pub fn fee(&self) -> i64 {
        self.total_input - sum_output_values(&self.tx.tx_out)
    }
}

/// Author an unsigned transaction paying `outputs` at `relay_fee_per_kb`.
pub fn new_unsigned_transaction(
    outputs: Vec<TxOut>,
    relay_fee_per_kb: i64,
    inputs: &mut dyn InputSource,
    change: &dyn ChangeSource,
) -> Result<AuthoredTx, AuthorError> {
    for output in &outputs {
        if !(0..=MAX_AMOUNT).contains(&output.value) {
            return Err(AuthorError::InvalidOutputValue(output.value));
        }
    }
    let target_amount = sum_output_values(&outputs);
    let change_script_size = change.script_size();

    let mut script_sizes = vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE];
    let mut max_signed_size = estimate_serialize_size(&script_sizes, &outputs, change_script_size);
    let mut target_fee = fee_for_serialize_size(relay_fee_per_kb, max_signed_size);

    loop {
        let needed = target_amount + target_fee;
        let detail = inputs.select(needed)?;
        if detail.amount < needed {
            return Err(AuthorError::InsufficientFunds { available: detail.amount, needed });
        }

        script_sizes = detail.redeem_script_sizes.clone();
        max_signed_size = estimate_serialize_size(&script_sizes, &outputs, change_script_size);
        let max_required_fee = fee_for_serialize_size(relay_fee_per_kb, max_signed_size);
        let remaining = detail.amount - target_amount;
        if remaining < max_required_fee {
            target_fee = max_required_fee;
            continue;
        }

        let mut tx = MsgTx {
            ser_type: SerType::Full,
            version: TX_VERSION,
            tx_in: detail.inputs,
            tx_out: outputs,
            lock_time: 0,
            expiry: 0,
        };

        let mut change_index = None;
        let change_amount = remaining - max_required_fee;
        if change_amount != 0 && !is_dust_amount(change_amount, change_script_size, relay_fee_per_kb) {
            let (script, version) = change.script()?;
            if script.len() > MAX_SCRIPT_ELEMENT_SIZE {
                return Err(AuthorError::ChangeScriptTooLarge(script.len()));
            }
            change_index = Some(tx.tx_out.len());
            tx.tx_out.push(TxOut { value: change_amount, version, pk_script: script });
        } else {
            max_signed_size = estimate_serialize_size(&script_sizes, &tx.tx_out, 0);
        }

        return Ok(AuthoredTx {
            tx,
            prev_scripts: detail.scripts,
            total_input: detail.amount,
            change_index,
            estimated_signed_size: max_signed_size,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::p2pkh_script;
    use crate::types::{Hash256, OutPoint};

    fn change() -> ScriptChangeSource {
        ScriptChangeSource { script: p2pkh_script(&[9; 20]), version: 0 }
    }

    fn single_coin(amount: i64) -> impl FnMut(i64) -> Result<InputDetail, AuthorError> + Send {
        move |_target| {
            Ok(InputDetail {
                amount,
                inputs: vec![TxIn::new(OutPoint::new(Hash256([1; 32]), 0, 0), amount)],
                scripts: vec![p2pkh_script(&[1; 20])],
                redeem_script_sizes: vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE],
            })
        }
    }

    #[test]
    fn size_estimates() {
        assert_eq!(estimate_input_size(REDEEM_P2PKH_SIG_SCRIPT_SIZE), 166);
        assert_eq!(estimate_output_size(P2PKH_PK_SCRIPT_SIZE), 36);
        let outputs = vec![TxOut::new(1, p2pkh_script(&[0; 20]))];
        assert_eq!(
            estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE], &outputs, P2PKH_PK_SCRIPT_SIZE),
            253
        );
        assert_eq!(estimate_serialize_size(&[REDEEM_P2PKH_SIG_SCRIPT_SIZE], &outputs, 0), 217);
    }

    #[test]
    fn fee_rules() {
        assert_eq!(fee_for_serialize_size(10_000, 253), 2530);
        assert_eq!(fee_for_serialize_size(1, 10), 1);
        assert_eq!(fee_for_serialize_size(0, 10_000), 0);
    }

    #[test]
    fn dust_threshold() {
        assert!(is_dust_amount(6029, 25, 10_000));
        assert!(!is_dust_amount(6030, 25, 10_000));
        assert!(!is_dust_amount(1, 25, 0));
    }

    #[test]
    fn adds_change() {
        let outputs = vec![TxOut::new(50_000_000, p2pkh_script(&[0; 20]))];
        let mut src = single_coin(100_000_000);
        let authored = new_unsigned_transaction(outputs, 10_000, &mut src, &change()).unwrap();
        assert_eq!(authored.change_index, Some(1));
        assert_eq!(authored.tx.tx_out[1].value, 49_997_470);
        assert_eq!(authored.fee(), 2530);
        assert_eq!(authored.estimated_signed_size, 253);
        assert_eq!(authored.tx.version, TX_VERSION);
    }

    #[test]
    fn dust_change_goes_to_fee() {
        let outputs = vec![TxOut::new(50_000_000, p2pkh_script(&[0; 20]))];
        let mut src = single_coin(50_000_000 + 2530 + 6000);
        let authored = new_unsigned_transaction(outputs, 10_000, &mut src, &change()).unwrap();
        assert_eq!(authored.change_index, None);
        assert_eq!(authored.tx.tx_out.len(), 1);
        assert_eq!(authored.fee(), 8530);
        assert_eq!(authored.estimated_signed_size, 217);
    }

    #[test]
    fn insufficient_funds() {
        let outputs = vec![TxOut::new(50_000_000, p2pkh_script(&[0; 20]))];
        let mut src = single_coin(10);
        let err = new_unsigned_transaction(outputs, 10_000, &mut src, &change()).unwrap_err();
        assert_eq!(err, AuthorError::InsufficientFunds { available: 10, needed: 50_002_530 });
    }

    #[test]
    fn fee_grows_with_inputs() {
        // Each call hands out one more coin than the last.
        let mut calls = 0usize;
        let mut src = move |_target: i64| {
            calls += 1;
            Ok(InputDetail {
                amount: 50_002_600,
                inputs: (0..calls).map(|i| TxIn::new(OutPoint::new(Hash256([2; 32]), i as u32, 0), 0)).collect(),
                scripts: vec![Vec::new(); calls],
                redeem_script_sizes: vec![REDEEM_P2PKH_SIG_SCRIPT_SIZE; calls * 2],
            })
        };
        let outputs = vec![TxOut::new(50_000_000, p2pkh_script(&[0; 20]))];
        let err = new_unsigned_transaction(outputs, 10_000, &mut src, &change()).unwrap_err();
        assert!(matches!(err, AuthorError::InsufficientFunds { .. }));
    }

    #[test]
    fn rejects_negative_output() {
        let outputs = vec![TxOut::new(-1, p2pkh_script(&[0; 20]))];
        let mut src = single_coin(100);
        assert_eq!(
            new_unsigned_transaction(outputs, 10_000, &mut src, &change()).unwrap_err(),
            AuthorError::InvalidOutputValue(-1)
        );
    }
}
