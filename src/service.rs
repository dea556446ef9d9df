//! Thin read/write facade over the Ledger.
//!
//! The HTTP layer and the bridge worker both go through this surface; every
//! write funnels into the Ledger's invariant checks. Handed out by value,
//! cheap to clone.

use bigdecimal::BigDecimal;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::ledger::models::{
    Checkpoint, CollateralParams, CrossChainBalance, VaultInfo, WithdrawalVoucher,
};
use crate::ledger::{Ledger, LedgerCounts};
use crate::types::VoucherId;
use crate::vouchers::VoucherEngine;

#[derive(Clone)]
pub struct CrossChainService {
    ledger: Arc<Ledger>,
    vouchers: Arc<VoucherEngine>,
}

impl CrossChainService {
    pub fn new(ledger: Arc<Ledger>, default_voucher_ttl: Duration, min_validity: Duration) -> Self {
        let vouchers = Arc::new(VoucherEngine::new(
            Arc::clone(&ledger),
            default_voucher_ttl,
            min_validity,
        ));
        Self { ledger, vouchers }
    }

    // ---- reads ----

    pub fn latest_checkpoint(&self, chain_id: &str, asset: &str) -> Result<Checkpoint> {
        self.ledger.latest_checkpoint(chain_id, asset)
    }

    pub fn checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        self.ledger.get_checkpoint(chain_id, asset, update_id)
    }

    pub fn balance(&self, sui_owner: &str, chain_id: &str, asset: &str) -> Result<CrossChainBalance> {
        self.ledger.get_balance(sui_owner, chain_id, asset)
    }

    pub fn voucher(&self, id: &VoucherId) -> Result<WithdrawalVoucher> {
        self.ledger.get_voucher(id)
    }

    pub fn list_vouchers(&self, sui_owner: &str) -> Vec<WithdrawalVoucher> {
        self.ledger.list_vouchers(sui_owner)
    }

    pub fn vault_info(&self, chain_id: &str, asset: &str) -> Result<VaultInfo> {
        self.ledger.get_vault_info(chain_id, asset)
    }

    pub fn collateral_params(&self, chain_id: &str, asset: &str) -> Result<CollateralParams> {
        self.ledger.get_collateral_params(chain_id, asset)
    }

    pub fn counts(&self) -> LedgerCounts {
        self.ledger.counts()
    }

    // ---- narrow writes ----

    /// Operator-submitted checkpoint; the Ledger enforces monotonicity and
    /// blob/status consistency.
    pub fn submit_checkpoint(&self, cp: Checkpoint) -> Result<Checkpoint> {
        self.ledger.append_checkpoint(cp)
    }

    /// Operator transition: `pending -> verified` with the DA blob id.
    pub fn verify_checkpoint(
        &self,
        chain_id: &str,
        asset: &str,
        update_id: u64,
        da_blob_id: String,
    ) -> Result<Checkpoint> {
        self.ledger
            .mark_checkpoint_verified(chain_id, asset, update_id, da_blob_id)
    }

    /// Operator transition: `verified -> finalized`.
    pub fn finalize_checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        self.ledger.finalize_checkpoint(chain_id, asset, update_id)
    }

    /// Operator transition: `verified -> voided` (slashing path).
    pub fn void_checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        self.ledger.void_checkpoint(chain_id, asset, update_id)
    }

    /// User-initiated voucher creation, anchored to the latest checkpoint.
    pub fn create_voucher(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        shares: &BigDecimal,
    ) -> Result<WithdrawalVoucher> {
        let latest = self.ledger.latest_checkpoint(chain_id, asset)?;
        self.vouchers
            .create_voucher(sui_owner, chain_id, asset, shares, latest.update_id)
    }

    /// Operator void of a specific voucher.
    pub fn void_voucher(&self, id: &VoucherId) -> Result<WithdrawalVoucher> {
        self.ledger.void_voucher(id)
    }

    /// Pricing-job write: attach an externally computed USD valuation.
    pub fn set_collateral_usd(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        collateral_usd: BigDecimal,
    ) -> Result<CrossChainBalance> {
        self.ledger
            .set_collateral_usd(sui_owner, chain_id, asset, collateral_usd)
    }

    /// Test-fixture credit: seed a balance without a deposit pipeline run.
    pub fn credit_deposit(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        shares: &BigDecimal,
    ) -> Result<CrossChainBalance> {
        let ref_update_id = match self.ledger.latest_checkpoint(chain_id, asset) {
            Ok(cp) => cp.update_id,
            Err(BridgeError::NotFound { .. }) => 0,
            Err(err) => return Err(err),
        };
        self.ledger
            .credit_shares(sui_owner, chain_id, asset, shares, ref_update_id)
    }
}
