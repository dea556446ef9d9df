use alloy::primitives::{keccak256, U256};
use bigdecimal::num_bigint::{BigInt, Sign};
use bigdecimal::{BigDecimal, RoundingMode, Zero};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimals of the chain-A native asset (wei).
pub const ETH_DECIMALS: i64 = 18;

/// Number of decimals of the chain-B bridged token.
pub const SUI_TOKEN_DECIMALS: i64 = 9;

/// Basis-point denominator for the share split policy.
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Deterministic identifier of a withdrawal voucher (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoucherId(pub [u8; 32]);

impl VoucherId {
    /// Compute the voucher id: keccak256 over the canonical encoding of the
    /// immutable voucher fields. Two processes constructing the same tuple
    /// produce the same id; this is the cross-chain deduplication key.
    pub fn compute(
        chain_id: &str,
        asset: &str,
        sui_owner: &str,
        shares: &BigDecimal,
        nonce: u64,
        expiry: u64,
        update_id: u64,
    ) -> Self {
        let mut input = Vec::new();
        input.extend_from_slice(chain_id.as_bytes());
        input.push(b':');
        input.extend_from_slice(asset.as_bytes());
        input.push(b':');
        input.extend_from_slice(sui_owner.as_bytes());
        input.push(b':');
        input.extend_from_slice(shares.normalized().to_string().as_bytes());
        input.extend(nonce.to_be_bytes());
        input.extend(expiry.to_be_bytes());
        input.extend(update_id.to_be_bytes());
        let hash = keccak256(&input);
        VoucherId(hash.0)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)?;
        if bytes.len() != 32 {
            return Err(eyre!("VoucherId must be 32 bytes"));
        }
        let mut result = [0u8; 32];
        result.copy_from_slice(&bytes);
        Ok(VoucherId(result))
    }

    /// Convert to lowercase hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for VoucherId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Checkpoint lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStatus {
    Pending,
    Verified,
    Finalized,
    Voided,
}

impl CheckpointStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointStatus::Pending => "pending",
            CheckpointStatus::Verified => "verified",
            CheckpointStatus::Finalized => "finalized",
            CheckpointStatus::Voided => "voided",
        }
    }

    /// A DA blob id must be present from `verified` onward.
    pub fn requires_blob(&self) -> bool {
        matches!(self, CheckpointStatus::Verified | CheckpointStatus::Finalized)
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Withdrawal voucher lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Pending,
    Spent,
    Settled,
    Voided,
}

impl VoucherStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherStatus::Pending => "pending",
            VoucherStatus::Spent => "spent",
            VoucherStatus::Settled => "settled",
            VoucherStatus::Voided => "voided",
        }
    }
}

impl fmt::Display for VoucherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The two token tranches minted against a deposit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    F,
    X,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::F => "f",
            TokenKind::X => "x",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TokenKind {
    type Err = eyre::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "f" | "F" => Ok(TokenKind::F),
            "x" | "X" => Ok(TokenKind::X),
            other => Err(eyre!("unknown token kind: {}", other)),
        }
    }
}

/// Convert a wei amount (18 decimals) into a decimal native-asset amount.
pub fn wei_to_eth(wei: U256) -> BigDecimal {
    let bytes = wei.to_be_bytes::<32>();
    BigDecimal::new(BigInt::from_bytes_be(Sign::Plus, &bytes), ETH_DECIMALS)
}

/// Convert a decimal native-asset amount into wei, rounding down to 1 wei.
pub fn eth_to_wei_floor(amount: &BigDecimal) -> U256 {
    let scaled = amount.with_scale_round(ETH_DECIMALS, RoundingMode::Down);
    let (int, _) = scaled.as_bigint_and_exponent();
    let (sign, bytes) = int.to_bytes_be();
    if sign == Sign::Minus {
        return U256::ZERO;
    }
    U256::from_be_slice(&bytes)
}

/// Convert a decimal share amount into chain-B token units (9 decimals),
/// dropping sub-unit dust.
pub fn eth_to_sui_units(amount: &BigDecimal) -> u64 {
    let scaled = amount.with_scale_round(SUI_TOKEN_DECIMALS, RoundingMode::Down);
    let (int, _) = scaled.as_bigint_and_exponent();
    let (sign, bytes) = int.to_bytes_be();
    if sign == Sign::Minus || bytes.len() > 8 {
        return 0;
    }
    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(&bytes);
    u64::from_be_bytes(buf)
}

/// Split a deposited amount into the f-share and x-share issuances.
///
/// `f_bps` is the f-tranche fraction in basis points (5000 = 50/50). The sum
/// of the two halves always equals the input exactly: the f-share is rounded
/// down to 18 decimals and the x-share is the remainder.
pub fn split_shares(total: &BigDecimal, f_bps: u32) -> (BigDecimal, BigDecimal) {
    if total <= &BigDecimal::zero() {
        return (BigDecimal::zero(), BigDecimal::zero());
    }
    let fraction = BigDecimal::from(f_bps) / BigDecimal::from(BPS_DENOMINATOR);
    let f_shares = (total * fraction).with_scale_round(ETH_DECIMALS, RoundingMode::Down);
    let x_shares = total - &f_shares;
    (f_shares, x_shares)
}
