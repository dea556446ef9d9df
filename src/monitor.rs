//! Chain-A deposit confirmation.
//!
//! The worker trusts this interface's judgment of finality: given a tx hash
//! it returns the confirmed receipt or a sentinel. The JSON-RPC
//! implementation is the default; tests inject their own.

use alloy::primitives::U256;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// A confirmed chain-A deposit transaction as the monitor saw it. The
/// on-chain value is authoritative; any client-declared amount is
/// informational only.
#[derive(Debug, Clone)]
pub struct ConfirmedDeposit {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub value: U256,
    pub block_number: u64,
    pub block_hash: String,
    /// Unix seconds of the containing block
    pub timestamp: u64,
    pub success: bool,
}

#[async_trait]
pub trait ChainAMonitor: Send + Sync {
    /// Fetch the confirmed receipt for a deposit tx. `NotFound` if the
    /// transaction is unknown or not yet mined.
    async fn confirmed_deposit(&self, tx_hash: &str) -> Result<ConfirmedDeposit>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Transaction {
    from: String,
    to: Option<String>,
    value: String,
}

#[derive(Debug, Deserialize)]
struct TransactionReceipt {
    #[serde(rename = "blockNumber")]
    block_number: Option<String>,
    #[serde(rename = "blockHash")]
    block_hash: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Block {
    timestamp: String,
}

/// JSON-RPC monitor against a chain-A execution node.
pub struct JsonRpcMonitor {
    rpc_url: String,
    client: reqwest::Client,
}

impl JsonRpcMonitor {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::permanent("monitor", e.to_string()))?;
        Ok(Self { rpc_url, client })
    }

    async fn rpc_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<Option<T>> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BridgeError::transient("monitor", e.to_string()))?
            .json::<RpcResponse<T>>()
            .await
            .map_err(|e| BridgeError::transient("monitor", e.to_string()))?;

        if let Some(error) = response.error {
            return Err(BridgeError::transient(
                "monitor",
                format!("RPC error {}: {}", error.code, error.message),
            ));
        }
        Ok(response.result)
    }
}

fn parse_quantity(hex_str: &str) -> Result<u64> {
    u64::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .map_err(|e| BridgeError::transient("monitor", format!("bad quantity {}: {}", hex_str, e)))
}

fn parse_wei(hex_str: &str) -> Result<U256> {
    U256::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .map_err(|e| BridgeError::transient("monitor", format!("bad value {}: {}", hex_str, e)))
}

#[async_trait]
impl ChainAMonitor for JsonRpcMonitor {
    async fn confirmed_deposit(&self, tx_hash: &str) -> Result<ConfirmedDeposit> {
        let tx: Transaction = self
            .rpc_call("eth_getTransactionByHash", serde_json::json!([tx_hash]))
            .await?
            .ok_or(BridgeError::not_found("transaction"))?;

        let receipt: TransactionReceipt = self
            .rpc_call("eth_getTransactionReceipt", serde_json::json!([tx_hash]))
            .await?
            .ok_or(BridgeError::not_found("transaction receipt"))?;

        let block_number_hex = receipt
            .block_number
            .ok_or(BridgeError::not_found("transaction receipt"))?;
        let block_number = parse_quantity(&block_number_hex)?;

        let block: Block = self
            .rpc_call(
                "eth_getBlockByNumber",
                serde_json::json!([block_number_hex, false]),
            )
            .await?
            .ok_or(BridgeError::not_found("block"))?;

        Ok(ConfirmedDeposit {
            tx_hash: tx_hash.to_lowercase(),
            from: tx.from.to_lowercase(),
            to: tx.to.map(|t| t.to_lowercase()).unwrap_or_default(),
            value: parse_wei(&tx.value)?,
            block_number,
            block_hash: receipt.block_hash.unwrap_or_default().to_lowercase(),
            timestamp: parse_quantity(&block.timestamp)?,
            success: receipt.status.as_deref() == Some("0x1"),
        })
    }
}
