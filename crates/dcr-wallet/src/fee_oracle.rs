//! Fee rate estimates from the public dcrdata insight API.

use std::collections::HashMap;
use std::time::Duration;

use dcr_core::params::Network;
use dcr_core::types::coin_to_atoms;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::WalletError;

pub const MAINNET_API: &str = "https://explorer.dcrdata.org/insight/api";
pub const TESTNET_API: &str = "https://testnet.dcrdata.org/insight/api";

/// Largest response body accepted.
pub const MAX_BODY_LEN: usize = 16 * 1024;

/// A fee rate per kilobyte of serialized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeEstimate {
    #[serde(rename = "feerate")]
    pub dcr_per_kb: f64,
    #[serde(rename = "atomsperkb")]
    pub atoms_per_kb: i64,
}

impl FeeEstimate {
    fn from_coin(dcr_per_kb: f64) -> Self {
        Self { dcr_per_kb, atoms_per_kb: coin_to_atoms(dcr_per_kb) }
    }
}

/// Insight API base for `network`. Simnet has no explorer and shares mainnet's.
pub fn api_base(network: Network) -> &'static str {
    match network {
        Network::Testnet => TESTNET_API,
        Network::Mainnet | Network::Simnet => MAINNET_API,
    }
}

pub fn estimate_url(base: &str, n_blocks: u64) -> String {
    format!("{base}/utils/estimatefee?nbBlocks={n_blocks}")
}

/// Pick the rate for `n_blocks` out of a response body.
///
/// The body maps block counts (as strings) to DCR/kB.
pub fn parse_estimate(body: &[u8], n_blocks: u64) -> Result<FeeEstimate, WalletError> {
    if body.len() > MAX_BODY_LEN {
        return Err(WalletError::FeeOracle(format!("response exceeds {MAX_BODY_LEN} bytes")));
    }
    let rates: HashMap<String, f64> =
        serde_json::from_slice(body).map_err(|e| WalletError::FeeOracle(format!("invalid response: {e}")))?;
    rates
        .get(&n_blocks.to_string())
        .copied()
        .map(FeeEstimate::from_coin)
        .ok_or(WalletError::OracleRateUnavailable(n_blocks))
}

/// HTTP client bound to one network's fee endpoint.
#[derive(Debug, Clone)]
pub struct FeeOracle {
    client: reqwest::Client,
    base: String,
}

impl FeeOracle {
    pub fn new(network: Network, timeout: Duration) -> Result<Self, WalletError> {
        Self::with_base(api_base(network), timeout)
    }

    pub fn with_base(base: impl Into<String>, timeout: Duration) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::FeeOracle(e.to_string()))?;
        Ok(Self { client, base: base.into() })
    }

    /// Fee rate expected to confirm within `n_blocks` blocks.
    pub async fn estimate_fee(&self, n_blocks: u64) -> Result<FeeEstimate, WalletError> {
        let url = estimate_url(&self.base, n_blocks);
        let fail = |e: reqwest::Error| WalletError::FeeOracle(format!("unable to get fee from {url}: {e}"));

        let mut response = self.client.get(&url).send().await.map_err(fail)?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(WalletError::FeeOracle(format!(
                "unable to get fee from {url}: returned status {}",
                response.status()
            )));
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(fail)? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_BODY_LEN {
                break;
            }
        }
        let estimate = parse_estimate(&body, n_blocks)?;
        debug!(n_blocks, rate = estimate.dcr_per_kb, "fee estimate");
        Ok(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one connection: read the request, then answer with `reply` or
    /// hold the socket open without answering when `reply` is `None`.
    async fn serve_once(reply: Option<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            match reply {
                Some(reply) => {
                    let _ = socket.write_all(reply.as_bytes()).await;
                }
                None => tokio::time::sleep(Duration::from_secs(30)).await,
            }
        });
        format!("http://{addr}")
    }

    #[test]
    fn endpoint_per_network() {
        assert_eq!(api_base(Network::Testnet), TESTNET_API);
        assert_eq!(api_base(Network::Mainnet), MAINNET_API);
        assert_eq!(api_base(Network::Simnet), MAINNET_API);
        assert_eq!(
            estimate_url(MAINNET_API, 6),
            "https://explorer.dcrdata.org/insight/api/utils/estimatefee?nbBlocks=6"
        );
    }

    #[test]
    fn picks_requested_window() {
        let body = br#"{"2": 0.0002, "6": 0.0001}"#;
        let est = parse_estimate(body, 6).unwrap();
        assert_eq!(est.dcr_per_kb, 0.0001);
        assert_eq!(est.atoms_per_kb, 10_000);
        assert_eq!(parse_estimate(body, 2).unwrap().atoms_per_kb, 20_000);
    }

    #[test]
    fn missing_window_is_not_zero() {
        let err = parse_estimate(br#"{"2": 0.0002}"#, 12).unwrap_err();
        assert_eq!(err, WalletError::OracleRateUnavailable(12));
        assert_eq!(err.to_string(), "no fee rate for requested number of blocks: 12");
    }

    #[test]
    fn rejects_bad_bodies() {
        assert!(matches!(parse_estimate(b"not json", 1), Err(WalletError::FeeOracle(_))));
        let big = vec![b' '; MAX_BODY_LEN + 1];
        assert!(matches!(parse_estimate(&big, 1), Err(WalletError::FeeOracle(_))));
    }

    #[tokio::test]
    async fn unreachable_oracle_errors() {
        let oracle = FeeOracle::with_base("http://127.0.0.1:1", Duration::from_millis(200)).unwrap();
        let err = oracle.estimate_fee(6).await.unwrap_err();
        assert!(matches!(err, WalletError::FeeOracle(msg) if msg.contains("nbBlocks=6")));
    }

    #[tokio::test]
    async fn reads_rate_from_server() {
        let body = r#"{"6": 0.0001}"#;
        let reply = format!("HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}", body.len());
        let oracle = FeeOracle::with_base(serve_once(Some(reply)).await, Duration::from_secs(5)).unwrap();
        assert_eq!(oracle.estimate_fee(6).await.unwrap().atoms_per_kb, 10_000);
    }

    #[tokio::test]
    async fn non_ok_status_errors() {
        let reply = "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n".to_string();
        let oracle = FeeOracle::with_base(serve_once(Some(reply)).await, Duration::from_secs(5)).unwrap();
        let err = oracle.estimate_fee(6).await.unwrap_err();
        assert!(matches!(err, WalletError::FeeOracle(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn stalled_server_times_out() {
        let oracle = FeeOracle::with_base(serve_once(None).await, Duration::from_millis(100)).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), oracle.estimate_fee(6)).await;
        let err = result.expect("client timeout should fire first").unwrap_err();
        assert!(matches!(err, WalletError::FeeOracle(msg) if msg.contains("nbBlocks=6")));
    }
}
