//! Bridge worker: orchestrates the deposit and redeem pipelines.
//!
//! The worker owns the injected collaborators and enforces the guarantees
//! the ledger alone cannot: single-flight per idempotency key, publish
//! before commit, and post-commit handoffs that survive caller
//! cancellation. Network I/O never happens while the ledger lock is held.

use alloy::primitives::U256;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::handlers::{HandlerSlot, MintHandler, PayoutHandler};
use crate::ledger::Ledger;
use crate::metrics;
use crate::monitor::ChainAMonitor;
use crate::publisher::CheckpointPublisher;
use crate::vouchers::VoucherEngine;

pub mod deposit;
pub mod inflight;
pub mod redeem;

pub use deposit::DepositRequest;
pub use inflight::InflightSet;
pub use redeem::RedeemRequest;

/// How many times a pipeline re-drafts after losing a checkpoint commit race.
pub(crate) const COMMIT_RETRY_LIMIT: u32 = 5;

/// Pause before respawning a background task that panicked.
const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// Worker tuning; assembled from `Config` at startup.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Deposits below this on-chain value are rejected
    pub dust_floor_wei: U256,
    /// f-tranche fraction of each deposit, in basis points
    pub share_split_f_bps: u32,
    pub monitor_timeout: Duration,
    pub handler_timeout: Duration,
    pub voucher_ttl: Duration,
    pub min_voucher_validity: Duration,
    pub sweep_interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            dust_floor_wei: U256::from(10u64).pow(U256::from(12u64)),
            share_split_f_bps: 5_000,
            monitor_timeout: Duration::from_secs(30),
            handler_timeout: Duration::from_secs(60),
            voucher_ttl: Duration::from_secs(86_400),
            min_voucher_validity: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

pub struct BridgeWorker {
    pub(crate) ledger: Arc<Ledger>,
    pub(crate) vouchers: VoucherEngine,
    pub(crate) publisher: Arc<dyn CheckpointPublisher>,
    pub(crate) monitor: Arc<dyn ChainAMonitor>,
    pub(crate) mint: HandlerSlot<Arc<dyn MintHandler>>,
    pub(crate) payout: HandlerSlot<Arc<dyn PayoutHandler>>,
    pub(crate) inflight_deposits: Arc<InflightSet>,
    pub(crate) inflight_redeems: Arc<InflightSet>,
    pub(crate) options: WorkerOptions,
}

impl BridgeWorker {
    pub fn new(
        ledger: Arc<Ledger>,
        publisher: Arc<dyn CheckpointPublisher>,
        monitor: Arc<dyn ChainAMonitor>,
        mint: HandlerSlot<Arc<dyn MintHandler>>,
        payout: HandlerSlot<Arc<dyn PayoutHandler>>,
        options: WorkerOptions,
    ) -> Self {
        let vouchers = VoucherEngine::new(
            Arc::clone(&ledger),
            options.voucher_ttl,
            options.min_voucher_validity,
        );
        Self {
            ledger,
            vouchers,
            publisher,
            monitor,
            mint,
            payout,
            inflight_deposits: InflightSet::new(),
            inflight_redeems: InflightSet::new(),
            options,
        }
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    /// Whether a commit rejection was caused by a concurrent commit that
    /// claimed the drafted update id first. Such races are resolved by
    /// re-drafting from the new state, not surfaced to the caller.
    pub(crate) fn lost_checkpoint_race(&self, chain_id: &str, asset: &str, drafted_id: u64) -> bool {
        match self.ledger.latest_checkpoint(chain_id, asset) {
            Ok(latest) => latest.update_id >= drafted_id,
            Err(_) => false,
        }
    }

    /// Spawn the background voucher-expiry sweeper under the supervisor.
    /// The returned handle's `stop` signals shutdown and awaits a clean
    /// exit.
    pub fn start(self: &Arc<Self>) -> WorkerHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let worker = Arc::clone(self);
        tracing::info!(
            interval_secs = worker.options.sweep_interval.as_secs(),
            "Voucher expiry sweeper started"
        );
        let join = tokio::spawn(supervise("voucher-sweeper", shutdown_rx, move || {
            sweeper_loop(Arc::clone(&worker))
        }));
        WorkerHandle { shutdown_tx, join }
    }
}

/// One sweeper run: ticks forever; the supervisor owns its lifecycle.
async fn sweeper_loop(worker: Arc<BridgeWorker>) {
    let mut ticker = tokio::time::interval(worker.options.sweep_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let swept = worker.vouchers.sweep_expired();
        if !swept.is_empty() {
            tracing::info!(count = swept.len(), "Voided expired vouchers");
            metrics::record_vouchers_swept(swept.len());
        }
        metrics::set_ledger_counts(&worker.ledger.counts());
    }
}

/// Run a background task until shutdown, recovering panics: a panicked run
/// is logged and respawned after a short backoff.
async fn supervise<F, Fut>(task: &'static str, mut shutdown_rx: mpsc::Receiver<()>, factory: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    loop {
        let mut handle = tokio::spawn(factory());
        tokio::select! {
            _ = shutdown_rx.recv() => {
                handle.abort();
                let _ = (&mut handle).await;
                tracing::info!(task, "Shutdown signal received, stopping background task");
                return;
            }
            result = &mut handle => {
                match result {
                    Err(err) if err.is_panic() => {
                        tracing::error!(task, error = %err, "Background task panicked, recovered; restarting");
                    }
                    _ => {
                        tracing::warn!(task, "Background task exited unexpectedly, restarting");
                    }
                }
                tokio::time::sleep(RESTART_BACKOFF).await;
            }
        }
    }
}

/// Handle over the worker's background tasks.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal shutdown and await clean exit of all children.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(err) = self.join.await {
            tracing::error!(error = %err, "Worker supervisor exited abnormally");
        }
    }
}
