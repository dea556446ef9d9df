//! Withdrawal voucher issuance.
//!
//! The engine owns construction rules only; lifecycle transitions and
//! at-most-once spend are enforced inside the Ledger. A voucher id is a pure
//! function of the immutable fields, so two processes constructing the same
//! tuple agree on the id across chains.

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::ledger::models::WithdrawalVoucher;
use crate::ledger::Ledger;
use crate::types::{VoucherId, VoucherStatus};

pub struct VoucherEngine {
    ledger: Arc<Ledger>,
    default_ttl: Duration,
    min_validity: Duration,
}

impl VoucherEngine {
    pub fn new(ledger: Arc<Ledger>, default_ttl: Duration, min_validity: Duration) -> Self {
        Self {
            ledger,
            default_ttl,
            min_validity,
        }
    }

    /// Issue a voucher with the default TTL, anchored to `update_id`.
    pub fn create_voucher(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        shares: &BigDecimal,
        update_id: u64,
    ) -> Result<WithdrawalVoucher> {
        let now = Utc::now();
        let expiry = now.timestamp() as u64 + self.default_ttl.as_secs();
        self.create_voucher_with_expiry(sui_owner, chain_id, asset, shares, update_id, expiry)
    }

    /// Issue a voucher with an explicit expiry (operator surface).
    pub fn create_voucher_with_expiry(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        shares: &BigDecimal,
        update_id: u64,
        expiry: u64,
    ) -> Result<WithdrawalVoucher> {
        if shares <= &BigDecimal::zero() {
            return Err(BridgeError::invariant("voucher shares must be positive"));
        }
        let now = Utc::now();
        let min_expiry = now.timestamp() as u64 + self.min_validity.as_secs();
        if expiry < min_expiry {
            return Err(BridgeError::invariant(format!(
                "voucher expiry {} is below the minimum validity window ({})",
                expiry, min_expiry
            )));
        }

        let nonce = self.ledger.reserve_nonce(sui_owner);
        let voucher_id =
            VoucherId::compute(chain_id, asset, sui_owner, shares, nonce, expiry, update_id);
        let voucher = WithdrawalVoucher {
            voucher_id,
            sui_owner: sui_owner.to_string(),
            chain_id: chain_id.to_string(),
            asset: asset.to_string(),
            shares: shares.clone(),
            nonce,
            expiry,
            update_id,
            status: VoucherStatus::Pending,
            tx_hash: None,
            created_at: now,
        };
        self.ledger.insert_voucher(voucher)
    }

    /// Void every expired pending voucher; returns what was voided.
    pub fn sweep_expired(&self) -> Vec<VoucherId> {
        self.ledger.sweep_expired_vouchers(Utc::now().timestamp() as u64)
    }
}
