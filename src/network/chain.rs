//! House Contract Reader
//!
//! Read-only JSON-RPC client for the on-chain house contract. Only the
//! four view functions backing the stats endpoint are supported.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

/// Public Saigon testnet endpoint.
pub const DEFAULT_RPC_URL: &str = "https://saigon-testnet.roninchain.com/rpc";

/// `getHouseStats()`
pub const GET_HOUSE_STATS: &str = "0x496621d7";
/// `houseEdge()`
pub const HOUSE_EDGE: &str = "0xd667dcd7";
/// `maxWager()`
pub const MAX_WAGER: &str = "0xa52ef3fa";
/// `minWager()`
pub const MIN_WAGER: &str = "0xbb9c3f2b";

const WEI_PER_RON: f64 = 1e18;
const WORD_BYTES: usize = 32;

/// Chain client errors.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// Transport failure or non-JSON response.
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// Node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Node's message.
        message: String,
    },

    /// Return data was not what the ABI promises.
    #[error("unexpected return data: {0}")]
    UnexpectedResponse(String),
}

#[derive(Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// House statistics in display units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseStats {
    /// Contract balance (RON).
    pub balance: f64,
    /// Games played.
    pub total_games: u64,
    /// Total wagered (RON).
    pub total_wagered: f64,
    /// Total paid out (RON).
    pub total_paid_out: f64,
    /// House profit (RON).
    pub house_profit: f64,
    /// House edge (percent).
    pub house_edge: f64,
    /// Maximum wager (RON).
    pub max_wager: f64,
    /// Minimum wager (RON).
    pub min_wager: f64,
    /// Return to player (percent).
    pub rtp: f64,
}

impl HouseStats {
    /// Convert raw contract values. `stats` is the five-word tuple from
    /// `getHouseStats()`; `edge_bps` is in basis points.
    pub fn from_raw(stats: [u128; 5], edge_bps: u128, max_wager: u128, min_wager: u128) -> Self {
        let ron = |wei: u128| wei as f64 / WEI_PER_RON;
        Self {
            balance: ron(stats[0]),
            total_games: u64::try_from(stats[1]).unwrap_or(u64::MAX),
            total_wagered: ron(stats[2]),
            total_paid_out: ron(stats[3]),
            house_profit: ron(stats[4]),
            house_edge: edge_bps as f64 / 100.0,
            max_wager: ron(max_wager),
            min_wager: ron(min_wager),
            rtp: (10_000.0 - edge_bps as f64) / 100.0,
        }
    }
}

/// Reads the house contract over JSON-RPC.
pub struct HouseClient {
    http: reqwest::Client,
    rpc_url: String,
    address: String,
    next_id: AtomicU64,
}

impl HouseClient {
    /// Create a client for the contract at `address`.
    pub fn new(rpc_url: impl Into<String>, address: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            rpc_url: rpc_url.into(),
            address: address.into(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Contract address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Fetch all house statistics concurrently.
    pub async fn stats(&self) -> Result<HouseStats, ChainError> {
        let (stats, edge, max, min) = tokio::try_join!(
            self.call(GET_HOUSE_STATS),
            self.call(HOUSE_EDGE),
            self.call(MAX_WAGER),
            self.call(MIN_WAGER),
        )?;

        let stats = decode_words(&stats)?;
        let tuple: [u128; 5] = stats
            .get(..5)
            .and_then(|w| w.try_into().ok())
            .ok_or_else(|| ChainError::UnexpectedResponse(format!("expected 5 words, got {}", stats.len())))?;

        Ok(HouseStats::from_raw(tuple, single_word(&edge)?, single_word(&max)?, single_word(&min)?))
    }

    /// `eth_call` a zero-argument view function; returns the hex return data.
    async fn call(&self, selector: &str) -> Result<String, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [{ "to": self.address, "data": selector }, "latest"],
        });

        let response: RpcResponse = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ChainError::Rpc { code: err.code, message: err.message });
        }
        debug!("eth_call {} on {} answered", selector, self.address);
        response
            .result
            .ok_or_else(|| ChainError::UnexpectedResponse("missing result".into()))
    }
}

/// Split ABI return data into 32-byte words, each read as an unsigned
/// integer. Values above `u128::MAX` are rejected.
pub fn decode_words(data: &str) -> Result<Vec<u128>, ChainError> {
    let raw = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(raw).map_err(|e| ChainError::UnexpectedResponse(e.to_string()))?;
    if bytes.is_empty() || bytes.len() % WORD_BYTES != 0 {
        return Err(ChainError::UnexpectedResponse(format!("{} bytes is not a whole number of words", bytes.len())));
    }

    bytes
        .chunks(WORD_BYTES)
        .map(|word| {
            let (high, low) = word.split_at(WORD_BYTES / 2);
            if high.iter().any(|b| *b != 0) {
                return Err(ChainError::UnexpectedResponse("value exceeds 128 bits".into()));
            }
            let mut buf = [0u8; 16];
            buf.copy_from_slice(low);
            Ok(u128::from_be_bytes(buf))
        })
        .collect()
}

fn single_word(data: &str) -> Result<u128, ChainError> {
    decode_words(data)?
        .first()
        .copied()
        .ok_or_else(|| ChainError::UnexpectedResponse("empty return data".into()))
}
