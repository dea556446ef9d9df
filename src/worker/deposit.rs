//! Deposit pipeline: EVM tx -> minted shares on Sui.

use bigdecimal::BigDecimal;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{BridgeError, Result};
use crate::handlers::MintRequest;
use crate::ledger::models::{Checkpoint, DepositReceipt};
use crate::ledger::NewDepositReceipt;
use crate::metrics;
use crate::types::{eth_to_sui_units, split_shares, wei_to_eth, CheckpointStatus};

use super::BridgeWorker;

/// Externally-submitted deposit. The tx hash is the idempotency key; the
/// declared amount is informational only.
#[derive(Debug, Clone)]
pub struct DepositRequest {
    pub deposit_tx_hash: String,
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub declared_amount: Option<BigDecimal>,
}

impl BridgeWorker {
    /// Process a deposit end to end. At-most-once per tx hash: a replay
    /// returns the original receipt unchanged.
    pub async fn submit_deposit(&self, request: DepositRequest) -> Result<DepositReceipt> {
        let started = Instant::now();
        let tx_hash = request.deposit_tx_hash.to_lowercase();

        if let Some(existing) = self.ledger.get_deposit_receipt(&tx_hash) {
            tracing::info!(tx_hash = %tx_hash, "Deposit replay, returning original receipt");
            return Ok(existing);
        }

        let _guard = self
            .inflight_deposits
            .try_acquire(&tx_hash)
            .ok_or_else(|| {
                BridgeError::transient(
                    "worker",
                    format!("deposit {} is already in flight", tx_hash),
                )
            })?;
        // The idempotency gate must be atomic with the commit: re-check now
        // that we hold the key.
        if let Some(existing) = self.ledger.get_deposit_receipt(&tx_hash) {
            return Ok(existing);
        }

        let vault = self.ledger.get_vault_info(&request.chain_id, &request.asset)?;

        // Chain-A confirmation; no ledger lock is held across this call.
        let confirmed = tokio::time::timeout(
            self.options.monitor_timeout,
            self.monitor.confirmed_deposit(&tx_hash),
        )
        .await
        .map_err(|_| BridgeError::transient("monitor", "confirmation timed out"))??;

        if !confirmed.success {
            return Err(BridgeError::permanent(
                "monitor",
                format!("deposit tx {} reverted on chain", tx_hash),
            ));
        }
        if !confirmed.to.eq_ignore_ascii_case(&vault.vault_address) {
            return Err(BridgeError::permanent(
                "monitor",
                format!(
                    "deposit tx {} recipient {} is not the vault {}",
                    tx_hash, confirmed.to, vault.vault_address
                ),
            ));
        }
        if confirmed.value < self.options.dust_floor_wei {
            return Err(BridgeError::invariant(format!(
                "deposit value {} wei is below the dust floor {}",
                confirmed.value, self.options.dust_floor_wei
            )));
        }

        let minted = wei_to_eth(confirmed.value);
        if let Some(declared) = &request.declared_amount {
            if declared != &minted {
                tracing::debug!(
                    tx_hash = %tx_hash,
                    declared = %declared,
                    confirmed = %minted,
                    "Declared deposit amount differs from on-chain value, using on-chain"
                );
            }
        }
        let (f_shares, x_shares) = split_shares(&minted, self.options.share_split_f_bps);

        // Draft, publish, commit. A concurrent deposit for this market may
        // claim the drafted update id first; losing that race re-drafts
        // from the new state rather than failing the caller.
        let mut attempts = 0u32;
        let (cp, receipt) = loop {
            let (next_id, prev_total, index) =
                match self.ledger.latest_checkpoint(&request.chain_id, &request.asset) {
                    Ok(prev) => (prev.update_id + 1, prev.total_shares, prev.index),
                    Err(BridgeError::NotFound { .. }) => {
                        (1, BigDecimal::from(0), BigDecimal::from(1))
                    }
                    Err(err) => return Err(err),
                };
            let balances_root = self.ledger.balances_root_with(
                &request.chain_id,
                &request.asset,
                Some((&request.sui_owner, &minted)),
            );
            let mut cp = Checkpoint {
                update_id: next_id,
                chain_id: request.chain_id.clone(),
                asset: request.asset.clone(),
                vault_address: vault.vault_address.clone(),
                block_number: confirmed.block_number,
                block_hash: confirmed.block_hash.clone(),
                total_shares: prev_total + &minted,
                index,
                balances_root,
                proof_type: "none".to_string(),
                proof_blob: Vec::new(),
                da_blob_id: None,
                status: CheckpointStatus::Pending,
                timestamp: Utc::now(),
            };

            // Anchor to the DA layer before touching ledger state. A publish
            // failure aborts with nothing credited.
            let blob_id = self.publisher.publish(&cp.blob_bytes()).await?;
            cp.da_blob_id = Some(blob_id);
            cp.status = CheckpointStatus::Verified;
            metrics::record_checkpoint_published(&request.chain_id);

            match self.ledger.commit_deposit(
                cp,
                &request.sui_owner,
                &minted,
                NewDepositReceipt {
                    tx_hash: tx_hash.clone(),
                    sui_owner: request.sui_owner.clone(),
                    chain_id: request.chain_id.clone(),
                    asset: request.asset.clone(),
                    minted: minted.clone(),
                },
            ) {
                Ok(committed) => break committed,
                Err(err) => {
                    attempts += 1;
                    if attempts < super::COMMIT_RETRY_LIMIT
                        && self.lost_checkpoint_race(&request.chain_id, &request.asset, next_id)
                    {
                        tracing::debug!(
                            tx_hash = %tx_hash,
                            drafted_id = next_id,
                            attempt = attempts,
                            "Lost checkpoint commit race, re-drafting"
                        );
                        continue;
                    }
                    return Err(err);
                }
            }
        };

        tracing::info!(
            tx_hash = %tx_hash,
            sui_owner = %request.sui_owner,
            update_id = cp.update_id,
            minted = %minted,
            "Deposit committed"
        );
        metrics::record_deposit_processed(&request.chain_id, true);
        metrics::record_latency("deposit", started.elapsed().as_secs_f64());

        // From here the request has succeeded; caller cancellation is
        // ignored and the mint runs to completion on its own task.
        let receipt = self.handoff_mint(&cp, receipt, &f_shares, &x_shares).await;
        Ok(receipt)
    }

    async fn handoff_mint(
        &self,
        cp: &Checkpoint,
        receipt: DepositReceipt,
        f_shares: &BigDecimal,
        x_shares: &BigDecimal,
    ) -> DepositReceipt {
        let handler = match self.mint.as_configured() {
            None => return receipt,
            Some(handler) => Arc::clone(handler),
        };
        let ledger = Arc::clone(&self.ledger);
        let timeout = self.options.handler_timeout;
        let tx_hash = receipt.tx_hash.clone();
        let request = MintRequest {
            sui_owner: receipt.sui_owner.clone(),
            chain_id: receipt.chain_id.clone(),
            asset: receipt.asset.clone(),
            f_units: eth_to_sui_units(f_shares),
            x_units: eth_to_sui_units(x_shares),
            update_id: cp.update_id,
            da_blob_id: cp.da_blob_id.clone().unwrap_or_default(),
        };
        let correlation_id = format!("deposit:{}:{}", tx_hash, cp.update_id);

        let join = tokio::spawn(async move {
            match tokio::time::timeout(timeout, handler.bridge_mint(request)).await {
                Ok(Ok(digests)) => {
                    tracing::info!(tx_hash = %tx_hash, digests = digests.len(), "Sui mint confirmed");
                    ledger.append_deposit_digests(&tx_hash, digests).ok()
                }
                Ok(Err(err)) => {
                    let partial = BridgeError::PartialCommit {
                        component: "mint-handler",
                        correlation_id,
                        reason: err.to_string(),
                    };
                    tracing::warn!(error = %partial, "Mint failed after commit; checkpoint is canonical, re-drive by checkpoint id");
                    metrics::record_handler_failure("mint");
                    None
                }
                Err(_) => {
                    let partial = BridgeError::PartialCommit {
                        component: "mint-handler",
                        correlation_id,
                        reason: "mint handler timed out".to_string(),
                    };
                    tracing::warn!(error = %partial, "Mint timed out after commit");
                    metrics::record_handler_failure("mint");
                    None
                }
            }
        });
        // Awaiting a spawned task: if this future is dropped, the mint
        // still runs to completion.
        match join.await {
            Ok(Some(enriched)) => enriched,
            _ => receipt,
        }
    }
}
