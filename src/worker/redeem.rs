//! Redeem pipeline: Sui burn -> EIP-712 voucher payout on chain-A.

use bigdecimal::{BigDecimal, Zero};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{BridgeError, Result};
use crate::handlers::PayoutRequest;
use crate::ledger::models::{Checkpoint, RedeemReceipt, WithdrawalVoucher};
use crate::ledger::NewRedeemReceipt;
use crate::metrics;
use crate::types::{eth_to_wei_floor, wei_to_eth, CheckpointStatus, TokenKind};

use super::BridgeWorker;

/// Externally-submitted redeem. The Sui burn digest is the idempotency key.
#[derive(Debug, Clone)]
pub struct RedeemRequest {
    pub sui_tx_digest: String,
    pub sui_owner: String,
    pub eth_recipient: String,
    pub chain_id: String,
    pub asset: String,
    pub token: TokenKind,
    pub amount: BigDecimal,
}

impl BridgeWorker {
    /// Process a redeem end to end. At-most-once per burn digest.
    pub async fn submit_redeem(&self, request: RedeemRequest) -> Result<RedeemReceipt> {
        let started = Instant::now();
        let digest = request.sui_tx_digest.to_lowercase();

        if let Some(existing) = self.ledger.get_redeem_receipt(&digest) {
            tracing::info!(sui_tx_digest = %digest, "Redeem replay, returning original receipt");
            return Ok(existing);
        }

        let _guard = self.inflight_redeems.try_acquire(&digest).ok_or_else(|| {
            BridgeError::transient("worker", format!("redeem {} is already in flight", digest))
        })?;
        if let Some(existing) = self.ledger.get_redeem_receipt(&digest) {
            return Ok(existing);
        }

        if request.amount <= BigDecimal::zero() {
            return Err(BridgeError::invariant("redeem amount must be positive"));
        }
        let vault = self.ledger.get_vault_info(&request.chain_id, &request.asset)?;
        let prev = self.ledger.latest_checkpoint(&request.chain_id, &request.asset)?;

        // Reserve the shares up front; every failure past this point must
        // compensate with a refund.
        self.ledger.debit_shares(
            &request.sui_owner,
            &request.chain_id,
            &request.asset,
            &request.amount,
            prev.update_id,
        )?;

        match self.redeem_reserved(&request, &digest, &vault.vault_address).await {
            Ok((receipt, voucher, payout_wei)) => {
                tracing::info!(
                    sui_tx_digest = %digest,
                    sui_owner = %request.sui_owner,
                    voucher_id = %voucher.voucher_id,
                    update_id = receipt.walrus_update_id,
                    payout_eth = %receipt.payout_eth,
                    "Redeem committed"
                );
                metrics::record_redeem_processed(&request.chain_id, true);
                metrics::record_latency("redeem", started.elapsed().as_secs_f64());
                let receipt = self.handoff_payout(receipt, voucher, payout_wei).await;
                Ok(receipt)
            }
            Err(err) => {
                metrics::record_redeem_processed(&request.chain_id, false);
                if let Err(refund_err) = self.ledger.credit_shares(
                    &request.sui_owner,
                    &request.chain_id,
                    &request.asset,
                    &request.amount,
                    prev.update_id,
                ) {
                    tracing::error!(
                        sui_tx_digest = %digest,
                        error = %refund_err,
                        "Failed to refund debited shares after aborted redeem"
                    );
                }
                Err(err)
            }
        }
    }

    /// The fallible middle of the pipeline, run after the share debit. On
    /// error the caller refunds; any voucher created here is voided first.
    /// A lost checkpoint commit race re-drafts (with a fresh voucher, since
    /// the voucher is anchored to the drafted update id).
    async fn redeem_reserved(
        &self,
        request: &RedeemRequest,
        digest: &str,
        vault_address: &str,
    ) -> Result<(RedeemReceipt, WithdrawalVoucher, alloy::primitives::U256)> {
        let mut attempts = 0u32;
        loop {
            let prev = self
                .ledger
                .latest_checkpoint(&request.chain_id, &request.asset)?;
            let next_id = prev.update_id + 1;
            let payout_wei = eth_to_wei_floor(&(&request.amount * &prev.index));
            let payout_eth = wei_to_eth(payout_wei);

            let voucher = self.vouchers.create_voucher(
                &request.sui_owner,
                &request.chain_id,
                &request.asset,
                &request.amount,
                next_id,
            )?;
            metrics::record_voucher_issued(&request.chain_id);

            let mut cp = Checkpoint {
                update_id: next_id,
                chain_id: request.chain_id.clone(),
                asset: request.asset.clone(),
                vault_address: vault_address.to_string(),
                block_number: prev.block_number,
                block_hash: prev.block_hash.clone(),
                total_shares: &prev.total_shares - &request.amount,
                index: prev.index.clone(),
                balances_root: self
                    .ledger
                    .balances_root_with(&request.chain_id, &request.asset, None),
                proof_type: "none".to_string(),
                proof_blob: Vec::new(),
                da_blob_id: None,
                status: CheckpointStatus::Pending,
                timestamp: Utc::now(),
            };

            let blob_id = match self.publisher.publish(&cp.blob_bytes()).await {
                Ok(id) => id,
                Err(err) => {
                    let _ = self.ledger.void_voucher(&voucher.voucher_id);
                    return Err(err);
                }
            };
            cp.da_blob_id = Some(blob_id.clone());
            cp.status = CheckpointStatus::Verified;
            metrics::record_checkpoint_published(&request.chain_id);

            let commit = self.ledger.commit_redeem(
                cp,
                &voucher.voucher_id,
                NewRedeemReceipt {
                    sui_tx_digest: digest.to_string(),
                    sui_owner: request.sui_owner.clone(),
                    eth_recipient: request.eth_recipient.clone(),
                    chain_id: request.chain_id.clone(),
                    asset: request.asset.clone(),
                    token: request.token,
                    burned: request.amount.clone(),
                    payout_eth,
                    walrus_update_id: next_id,
                    walrus_blob_id: blob_id,
                },
            );
            match commit {
                Ok((_, receipt)) => return Ok((receipt, voucher, payout_wei)),
                Err(err) => {
                    let _ = self.ledger.void_voucher(&voucher.voucher_id);
                    attempts += 1;
                    if attempts < super::COMMIT_RETRY_LIMIT
                        && self.lost_checkpoint_race(&request.chain_id, &request.asset, next_id)
                    {
                        tracing::debug!(
                            sui_tx_digest = %digest,
                            drafted_id = next_id,
                            attempt = attempts,
                            "Lost checkpoint commit race, re-drafting redeem"
                        );
                        continue;
                    }
                    return Err(err);
                }
            }
        }
    }

    async fn handoff_payout(
        &self,
        receipt: RedeemReceipt,
        voucher: WithdrawalVoucher,
        amount_wei: alloy::primitives::U256,
    ) -> RedeemReceipt {
        let handler = match self.payout.as_configured() {
            None => return receipt,
            Some(handler) => Arc::clone(handler),
        };
        let ledger = Arc::clone(&self.ledger);
        let timeout = self.options.handler_timeout;
        let digest = receipt.sui_tx_digest.clone();
        let voucher_id = voucher.voucher_id;
        let correlation_id = format!("redeem:{}:{}", digest, receipt.walrus_update_id);
        let request = PayoutRequest {
            eth_recipient: receipt.eth_recipient.clone(),
            amount_wei,
            voucher,
        };

        let join = tokio::spawn(async move {
            match tokio::time::timeout(timeout, handler.redeem_voucher(request)).await {
                Ok(Ok(tx_hash)) => {
                    tracing::info!(sui_tx_digest = %digest, payout_tx = %tx_hash, "Payout settled");
                    ledger.settle_redeem(&digest, &voucher_id, tx_hash).ok()
                }
                Ok(Err(err)) => {
                    let partial = BridgeError::PartialCommit {
                        component: "payout-handler",
                        correlation_id,
                        reason: err.to_string(),
                    };
                    tracing::warn!(error = %partial, "Payout failed after commit; voucher stays spent, re-drive by voucher id");
                    metrics::record_handler_failure("payout");
                    None
                }
                Err(_) => {
                    let partial = BridgeError::PartialCommit {
                        component: "payout-handler",
                        correlation_id,
                        reason: "payout handler timed out".to_string(),
                    };
                    tracing::warn!(error = %partial, "Payout timed out after commit");
                    metrics::record_handler_failure("payout");
                    None
                }
            }
        });
        // The spawned task outlives caller cancellation; settlement is
        // recorded even if nobody is waiting for this response.
        match join.await {
            Ok(Some(settled)) => settled,
            _ => receipt,
        }
    }
}
