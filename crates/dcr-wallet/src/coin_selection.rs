//! Input sources handed to the backend's transaction author.
//!
//! Two selection modes live here:
//!
//! - [`ExplicitInputs`]: exactly the coins the caller named, every time,
//!   regardless of the authoring target
//! - [`ShuffledInputs`]: every spendable coin in uniformly shuffled order,
//!   minus an ignore set, taken until the target is met
//!
//! When neither is used the backend runs its own selection.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use dcr_core::error::AuthorError;
use dcr_core::txauthor::{InputDetail, InputSource};
use dcr_core::types::{Hash256, UnspentCoin};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Reference to one coin: transaction id and output index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputRef {
    pub txid: Hash256,
    pub vout: u32,
}

impl InputRef {
    pub fn new(txid: Hash256, vout: u32) -> Self {
        Self { txid, vout }
    }

    pub fn of(coin: &UnspentCoin) -> Self {
        Self::new(coin.txid, coin.vout)
    }
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl FromStr for InputRef {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (txid, vout) = s
            .split_once(':')
            .ok_or_else(|| WalletError::InvalidArguments(format!("invalid coin id {s:?}")))?;
        let vout = vout
            .parse()
            .map_err(|_| WalletError::InvalidArguments(format!("invalid output index in {s:?}")))?;
        Ok(Self::new(txid.parse()?, vout))
    }
}

fn push_coin(detail: &mut InputDetail, coin: &UnspentCoin) -> Result<(), String> {
    if coin.script_pub_key.is_empty() {
        return Err(format!("redeem script for input {} not found", InputRef::of(coin)));
    }
    detail.push_coin(coin);
    Ok(())
}

/// The caller's coins, resolved against the backend's unspent set.
#[derive(Debug, Clone)]
pub struct ExplicitInputs {
    detail: InputDetail,
}

impl ExplicitInputs {
    /// Resolve `requested` against `unspents`, in backend order.
    ///
    /// Fails when a requested coin is unspendable or missing. Whether the
    /// coins cover the outputs is left to the authoring step.
    pub fn resolve(unspents: &[UnspentCoin], requested: &[InputRef]) -> Result<Self, WalletError> {
        let mut wanted: HashSet<InputRef> = requested.iter().copied().collect();
        let mut detail = InputDetail::default();
        for coin in unspents {
            let id = InputRef::of(coin);
            if !wanted.contains(&id) {
                continue;
            }
            if !coin.spendable {
                return Err(WalletError::InputNotSpendable(id.to_string()));
            }
            push_coin(&mut detail, coin).map_err(WalletError::InvalidArguments)?;
            wanted.remove(&id);
        }
        if !wanted.is_empty() {
            // Report in request order.
            let missing = requested
                .iter()
                .filter(|r| wanted.remove(*r))
                .map(ToString::to_string)
                .collect();
            return Err(WalletError::InputNotFound(missing));
        }
        Ok(Self { detail })
    }

    pub fn detail(&self) -> &InputDetail {
        &self.detail
    }
}

impl InputSource for ExplicitInputs {
    fn select(&mut self, _target: i64) -> Result<InputDetail, AuthorError> {
        Ok(self.detail.clone())
    }
}

/// Shuffled spendable coins with an ignore set.
///
/// Selection resumes where the previous call stopped, so a growing fee
/// target only ever adds coins.
#[derive(Debug, Clone)]
pub struct ShuffledInputs {
    coins: Vec<UnspentCoin>,
    ignored: HashSet<InputRef>,
    send_all: bool,
    cursor: usize,
    detail: InputDetail,
}

impl ShuffledInputs {
    pub fn new<R: Rng + ?Sized>(
        mut coins: Vec<UnspentCoin>,
        ignored: HashSet<InputRef>,
        send_all: bool,
        rng: &mut R,
    ) -> Self {
        coins.shuffle(rng);
        Self { coins, ignored, send_all, cursor: 0, detail: InputDetail::default() }
    }

    /// Coins in the order they will be considered.
    pub fn order(&self) -> impl Iterator<Item = InputRef> + '_ {
        self.coins.iter().map(InputRef::of)
    }
}

impl InputSource for ShuffledInputs {
    fn select(&mut self, target: i64) -> Result<InputDetail, AuthorError> {
        while let Some(coin) = self.coins.get(self.cursor) {
            if self.detail.amount >= target && !self.send_all {
                break;
            }
            self.cursor += 1;
            if !coin.spendable || self.ignored.contains(&InputRef::of(coin)) {
                continue;
            }
            push_coin(&mut self.detail, coin).map_err(AuthorError::InputSource)?;
        }
        Ok(self.detail.clone())
    }
}
