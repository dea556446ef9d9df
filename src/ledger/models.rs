use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CheckpointStatus, TokenKind, VoucherId, VoucherStatus};

// Amounts are BigDecimal end to end; they serialize as decimal strings on the
// wire. Hashes and addresses are lowercase 0x-prefixed hex strings.

/// Anchor of chain-A vault state at a block, published to the DA layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Server-assigned, strictly monotonic per (chain_id, asset)
    pub update_id: u64,
    pub chain_id: String,
    pub asset: String,
    pub vault_address: String,
    pub block_number: u64,
    pub block_hash: String,
    pub total_shares: BigDecimal,
    /// Assets per share; 1 at genesis, RAY-scaled on the wire
    pub index: BigDecimal,
    pub balances_root: String,
    pub proof_type: String,
    pub proof_blob: Vec<u8>,
    /// Content id on the DA layer; present from `verified` onward
    pub da_blob_id: Option<String>,
    pub status: CheckpointStatus,
    pub timestamp: DateTime<Utc>,
}

/// The byte body anchored on the DA layer: every checkpoint field except the
/// blob id and status. Field order is fixed so re-publishing an identical
/// checkpoint yields an identical blob (content-addressed dedup).
#[derive(Debug, Serialize)]
struct CheckpointBlob<'a> {
    update_id: u64,
    chain_id: &'a str,
    asset: &'a str,
    vault_address: &'a str,
    block_number: u64,
    block_hash: &'a str,
    total_shares: String,
    index: String,
    balances_root: &'a str,
    proof_type: &'a str,
    proof_blob: String,
    timestamp: i64,
}

impl Checkpoint {
    /// Serialize the DA blob body for this checkpoint.
    pub fn blob_bytes(&self) -> Vec<u8> {
        let body = CheckpointBlob {
            update_id: self.update_id,
            chain_id: &self.chain_id,
            asset: &self.asset,
            vault_address: &self.vault_address,
            block_number: self.block_number,
            block_hash: &self.block_hash,
            total_shares: self.total_shares.normalized().to_string(),
            index: self.index.normalized().to_string(),
            balances_root: &self.balances_root,
            proof_type: &self.proof_type,
            proof_blob: format!("0x{}", hex::encode(&self.proof_blob)),
            timestamp: self.timestamp.timestamp(),
        };
        serde_json::to_vec(&body).unwrap_or_default()
    }
}

/// Per (sui_owner, chain_id, asset) share balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossChainBalance {
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub shares: BigDecimal,
    /// Index of the most recent verified checkpoint at the last mutation
    pub index: BigDecimal,
    /// Derived: shares * index
    pub value: BigDecimal,
    pub collateral_usd: BigDecimal,
    pub last_checkpoint_id: u64,
    pub updated_at: DateTime<Utc>,
}

/// Transferable signed intent to burn shares on Sui and be paid on chain-A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalVoucher {
    pub voucher_id: VoucherId,
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub shares: BigDecimal,
    /// Strictly monotonic per owner, starting at 1
    pub nonce: u64,
    /// Unix seconds
    pub expiry: u64,
    /// Checkpoint the voucher is anchored to
    pub update_id: u64,
    pub status: VoucherStatus,
    /// Payout tx on chain-A, set on settlement
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable audit row per processed deposit tx. `tx_hash` is the
/// idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositReceipt {
    pub receipt_id: u64,
    pub tx_hash: String,
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub minted: BigDecimal,
    pub sui_tx_digests: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable audit row per processed redeem. `sui_tx_digest` is the
/// idempotency key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub receipt_id: u64,
    pub sui_tx_digest: String,
    pub sui_owner: String,
    pub eth_recipient: String,
    pub chain_id: String,
    pub asset: String,
    pub token: TokenKind,
    pub burned: BigDecimal,
    pub payout_eth: BigDecimal,
    pub walrus_update_id: u64,
    pub walrus_blob_id: String,
    pub payout_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Static vault description served to readers; seeded from config at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultInfo {
    pub chain_id: String,
    pub asset: String,
    pub vault_address: String,
    pub token_decimals: u8,
    /// RAY as a decimal string
    pub index_scale: String,
}

/// Per-market collateral parameters; seeded from config at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralParams {
    pub chain_id: String,
    pub asset: String,
    pub dust_floor_wei: String,
    pub share_split_f_bps: u32,
    pub default_voucher_ttl_secs: u64,
    pub min_voucher_validity_secs: u64,
}
