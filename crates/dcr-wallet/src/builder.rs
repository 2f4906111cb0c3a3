//! Transaction building: input selection mode, send-all change routing,
//! fee accounting and optional signing.
//!
//! The flow is:
//! 1. Validate outputs and the explicit/ignored input sets
//! 2. Pick an input source (explicit, shuffled or the backend's own)
//! 3. Author through the backend
//! 4. Sign a copy when requested
//!
//! Signing assumes the backend is already unlocked. Concurrent unlock and
//! sign sequences on one wallet are the caller's to serialize.

use std::collections::HashSet;

use dcr_core::address::Address;
use dcr_core::traits::{AuthorRequest, ChainBackend, OutputSelectionAlgorithm, DEFAULT_ACCOUNT, DEFAULT_ACCOUNT_NAME};
use dcr_core::txauthor::{ChangeSource, InputSource, ScriptChangeSource};
use dcr_core::types::{Hash256, SigHashType, UnspentCoin};
use dcr_core::wire::{MsgTx, TxOut};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::coin_selection::{ExplicitInputs, InputRef, ShuffledInputs};
use crate::error::WalletError;

/// Confirmations required of coins the backend selects itself.
pub const MIN_CONFIRMATIONS: i32 = 1;

/// A payment: destination address and amount in atoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: String,
    pub amount: i64,
}

impl TxOutput {
    pub fn new(address: impl Into<String>, amount: i64) -> Self {
        Self { address: address.into(), amount }
    }
}

/// Everything needed to build one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildRequest {
    pub outputs: Vec<TxOutput>,
    /// Spend exactly these coins. Empty means select automatically.
    pub inputs: Vec<InputRef>,
    /// Never spend these coins.
    pub ignore_inputs: Vec<InputRef>,
    /// Atoms per kilobyte. Zero lets the backend use its relay fee.
    pub fee_rate: i64,
    /// Send every selected coin to the single output. Its amount is ignored.
    pub send_all: bool,
    pub sign: bool,
}

/// A built transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltTransaction {
    /// Full serialization, signed when requested.
    #[serde(rename = "signedhex", with = "hex::serde")]
    pub raw: Vec<u8>,
    pub txid: Hash256,
    /// Total input minus total output, in atoms.
    pub fee: i64,
}

/// Decode each output address into a version-0 payment.
fn payment_outputs(outputs: &[TxOutput], backend: &dyn ChainBackend) -> Result<Vec<TxOut>, WalletError> {
    let network = backend.network();
    outputs
        .iter()
        .map(|out| {
            let address = Address::decode(&out.address, network)
                .map_err(|reason| WalletError::InvalidAddress { address: out.address.clone(), reason })?;
            Ok(TxOut::new(out.amount, address.payment_script()))
        })
        .collect()
}

async fn spendable_coins(backend: &dyn ChainBackend) -> Result<Vec<UnspentCoin>, WalletError> {
    let unspents = backend.list_unspent(0, i32::MAX, &[], DEFAULT_ACCOUNT_NAME).await?;
    if unspents.is_empty() {
        return Err(WalletError::NoSpendableCoins(DEFAULT_ACCOUNT_NAME.to_string()));
    }
    Ok(unspents)
}

/// Build, and optionally sign, a transaction paying `request.outputs`.
pub async fn build_transaction<R>(
    backend: &dyn ChainBackend,
    request: &BuildRequest,
    rng: &mut R,
) -> Result<BuiltTransaction, WalletError>
where
    R: Rng + Send + ?Sized,
{
    if request.send_all && request.outputs.len() > 1 {
        return Err(WalletError::AmbiguousSendAllTarget);
    }
    if request.outputs.is_empty() {
        return Err(WalletError::NoOutputs);
    }
    let ignored: HashSet<InputRef> = request.ignore_inputs.iter().copied().collect();
    if let Some(conflict) = request.inputs.iter().find(|i| ignored.contains(i)) {
        return Err(WalletError::ConflictingInputSpecification(conflict.to_string()));
    }
    let mut outputs = payment_outputs(&request.outputs, backend)?;

    let input_source: Option<Box<dyn InputSource>> = if !request.inputs.is_empty() {
        let unspents = spendable_coins(backend).await?;
        Some(Box::new(ExplicitInputs::resolve(&unspents, &request.inputs)?))
    } else if !ignored.is_empty() {
        let unspents = spendable_coins(backend).await?;
        Some(Box::new(ShuffledInputs::new(unspents, ignored, request.send_all, rng)))
    } else {
        None
    };

    let (change_source, algorithm) = if request.send_all {
        // Everything flows into the change output, which pays the sole
        // recipient.
        let target = outputs.remove(0);
        let change: Box<dyn ChangeSource> =
            Box::new(ScriptChangeSource { script: target.pk_script, version: target.version });
        (Some(change), OutputSelectionAlgorithm::All)
    } else {
        (None, OutputSelectionAlgorithm::Default)
    };

    let authored = backend
        .author_transaction(AuthorRequest {
            outputs,
            fee_rate: request.fee_rate,
            account: DEFAULT_ACCOUNT,
            min_conf: MIN_CONFIRMATIONS,
            algorithm,
            change_source,
            input_source,
        })
        .await?;
    let fee = authored.fee();
    debug!(
        inputs = authored.tx.tx_in.len(),
        outputs = authored.tx.tx_out.len(),
        fee,
        "authored transaction"
    );

    let tx = if request.sign {
        sign_copy(backend, &authored.tx).await?
    } else {
        authored.tx
    };
    Ok(BuiltTransaction { raw: tx.to_bytes(), txid: tx.tx_hash(), fee })
}

/// Sign every input of a copy of `unsigned`. Any failed input fails the
/// whole transaction.
pub async fn sign_copy(backend: &dyn ChainBackend, unsigned: &MsgTx) -> Result<MsgTx, WalletError> {
    let mut tx = unsigned.clone();
    let failures = backend.sign_transaction(&mut tx, SigHashType::All).await?;
    if !failures.is_empty() {
        for failure in &failures {
            error!("signature error for index {}: {}", failure.input_index, failure.error);
        }
        let indices = failures.iter().map(|f| f.input_index).collect();
        return Err(WalletError::SignatureErrors { indices });
    }
    Ok(tx)
}
