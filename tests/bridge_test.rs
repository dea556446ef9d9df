//! End-to-end pipeline tests against mock chain collaborators.
//!
//! Run with: cargo test --test bridge_test

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, Zero};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use walrus_bridge::contracts::{voucher_domain, voucher_signing_hash, Voucher};
use walrus_bridge::error::{BridgeError, Result};
use walrus_bridge::handlers::{HandlerSlot, MintHandler, MintRequest, PayoutHandler, PayoutRequest};
use walrus_bridge::ledger::models::{CollateralParams, VaultInfo};
use walrus_bridge::ledger::{CheckpointReader, Ledger};
use walrus_bridge::monitor::{ChainAMonitor, ConfirmedDeposit};
use walrus_bridge::publisher::{CheckpointPublisher, LocalPublisher};
use walrus_bridge::types::{TokenKind, VoucherStatus};
use walrus_bridge::worker::{BridgeWorker, DepositRequest, RedeemRequest, WorkerOptions};

const VAULT: &str = "0x00000000000000000000000000000000000000aa";

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

// ============================================================================
// Mock collaborators
// ============================================================================

/// Chain-A monitor over a fixed set of confirmed transactions.
#[derive(Default)]
struct MockMonitor {
    deposits: Mutex<HashMap<String, ConfirmedDeposit>>,
}

impl MockMonitor {
    fn confirm(&self, tx_hash: &str, value_wei: u64, to: &str) {
        let mut deposits = self.deposits.lock().unwrap();
        let block_number = 100 + deposits.len() as u64;
        deposits.insert(
            tx_hash.to_string(),
            ConfirmedDeposit {
                tx_hash: tx_hash.to_string(),
                from: "0x00000000000000000000000000000000000000ff".to_string(),
                to: to.to_string(),
                value: U256::from(value_wei),
                block_number,
                block_hash: format!("0xb{:04x}", block_number),
                timestamp: 1_700_000_000,
                success: true,
            },
        );
    }

    fn confirm_failed(&self, tx_hash: &str, value_wei: u64) {
        self.confirm(tx_hash, value_wei, VAULT);
        self.deposits
            .lock()
            .unwrap()
            .get_mut(tx_hash)
            .unwrap()
            .success = false;
    }
}

#[async_trait]
impl ChainAMonitor for MockMonitor {
    async fn confirmed_deposit(&self, tx_hash: &str) -> Result<ConfirmedDeposit> {
        self.deposits
            .lock()
            .unwrap()
            .get(tx_hash)
            .cloned()
            .ok_or(BridgeError::not_found("transaction"))
    }
}

/// Content-addressed publisher that counts calls and can be switched into a
/// transient-failure mode.
#[derive(Default)]
struct CountingPublisher {
    calls: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl CheckpointPublisher for CountingPublisher {
    async fn publish(&self, blob: &[u8]) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::transient("publisher", "connection reset"));
        }
        Ok(LocalPublisher::blob_id_for(blob))
    }
}

/// Records mint requests; reads checkpoints through the narrow facade the
/// worker is not part of.
struct MockMintHandler {
    calls: Mutex<Vec<MintRequest>>,
    checkpoints: Arc<dyn CheckpointReader>,
}

#[async_trait]
impl MintHandler for MockMintHandler {
    async fn bridge_mint(&self, request: MintRequest) -> Result<Vec<String>> {
        // The referenced checkpoint must already be committed and visible.
        let latest = self
            .checkpoints
            .latest_checkpoint(&request.chain_id, &request.asset)
            .ok_or(BridgeError::not_found("checkpoint"))?;
        assert!(latest.update_id >= request.update_id);
        let digest = format!("0xsui{:04}", request.update_id);
        self.calls.lock().unwrap().push(request);
        Ok(vec![digest])
    }
}

/// Records payout requests and returns a deterministic tx hash.
#[derive(Default)]
struct MockPayoutHandler {
    calls: Mutex<Vec<PayoutRequest>>,
    failing: AtomicBool,
}

#[async_trait]
impl PayoutHandler for MockPayoutHandler {
    async fn redeem_voucher(&self, request: PayoutRequest) -> Result<String> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(BridgeError::permanent("payout", "execution reverted"));
        }
        let tx = format!("0xeth{}", request.voucher.nonce);
        self.calls.lock().unwrap().push(request);
        Ok(tx)
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    ledger: Arc<Ledger>,
    worker: Arc<BridgeWorker>,
    monitor: Arc<MockMonitor>,
    publisher: Arc<CountingPublisher>,
    mint: Arc<MockMintHandler>,
    payout: Arc<MockPayoutHandler>,
}

fn harness() -> Harness {
    harness_with_options(WorkerOptions::default())
}

fn harness_with_options(options: WorkerOptions) -> Harness {
    let ledger = Arc::new(Ledger::new());
    ledger.seed_market(
        VaultInfo {
            chain_id: "ethereum".to_string(),
            asset: "ETH".to_string(),
            vault_address: VAULT.to_string(),
            token_decimals: 9,
            index_scale: "1000000000000000000000000000".to_string(),
        },
        CollateralParams {
            chain_id: "ethereum".to_string(),
            asset: "ETH".to_string(),
            dust_floor_wei: "1000000000000".to_string(),
            share_split_f_bps: 5_000,
            default_voucher_ttl_secs: 86_400,
            min_voucher_validity_secs: 60,
        },
    );

    let monitor = Arc::new(MockMonitor::default());
    let publisher = Arc::new(CountingPublisher::default());
    let mint = Arc::new(MockMintHandler {
        calls: Mutex::new(Vec::new()),
        checkpoints: ledger.clone() as Arc<dyn CheckpointReader>,
    });
    let payout = Arc::new(MockPayoutHandler::default());

    let worker = Arc::new(BridgeWorker::new(
        ledger.clone(),
        publisher.clone() as Arc<dyn CheckpointPublisher>,
        monitor.clone() as Arc<dyn ChainAMonitor>,
        HandlerSlot::Configured(mint.clone() as Arc<dyn MintHandler>),
        HandlerSlot::Configured(payout.clone() as Arc<dyn PayoutHandler>),
        options,
    ));

    Harness {
        ledger,
        worker,
        monitor,
        publisher,
        mint,
        payout,
    }
}

fn deposit_request(tx_hash: &str) -> DepositRequest {
    DepositRequest {
        deposit_tx_hash: tx_hash.to_string(),
        sui_owner: "0xSUI1".to_string(),
        chain_id: "ethereum".to_string(),
        asset: "ETH".to_string(),
        declared_amount: Some(dec("0.001")),
    }
}

fn redeem_request(digest: &str, amount: &str) -> RedeemRequest {
    RedeemRequest {
        sui_tx_digest: digest.to_string(),
        sui_owner: "0xSUI1".to_string(),
        eth_recipient: "0x00000000000000000000000000000000000000e1".to_string(),
        chain_id: "ethereum".to_string(),
        asset: "ETH".to_string(),
        token: TokenKind::F,
        amount: dec(amount),
    }
}

// ============================================================================
// Deposit pipeline
// ============================================================================

#[tokio::test]
async fn test_deposit_happy_path() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);

    let receipt = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();

    assert_eq!(receipt.tx_hash, "0xaaaa");
    assert_eq!(receipt.minted, dec("0.001"));
    assert_eq!(receipt.sui_tx_digests, vec!["0xsui0001"]);

    let cp = h.ledger.latest_checkpoint("ethereum", "ETH").unwrap();
    assert_eq!(cp.update_id, 1);
    assert_eq!(cp.total_shares, dec("0.001"));
    assert_eq!(cp.index, dec("1"));
    assert!(cp.da_blob_id.is_some());

    let balance = h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap();
    assert_eq!(balance.shares, dec("0.001"));
    assert_eq!(balance.last_checkpoint_id, 1);

    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 1);
    let mints = h.mint.calls.lock().unwrap();
    assert_eq!(mints.len(), 1);
    assert_eq!(mints[0].f_units, 500_000);
    assert_eq!(mints[0].x_units, 500_000);
    assert_eq!(mints[0].update_id, 1);
}

#[tokio::test]
async fn test_deposit_replay_returns_original_receipt() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);

    let first = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();
    let second = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();

    assert_eq!(first, second);
    // No new checkpoint, publish, mint, or balance change
    assert_eq!(h.ledger.latest_checkpoint("ethereum", "ETH").unwrap().update_id, 1);
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.mint.calls.lock().unwrap().len(), 1);
    assert_eq!(
        h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap().shares,
        dec("0.001")
    );
}

#[tokio::test]
async fn test_deposit_rejects_wrong_recipient() {
    let h = harness();
    h.monitor.confirm(
        "0xaaaa",
        1_000_000_000_000_000,
        "0x00000000000000000000000000000000000000bb",
    );

    let err = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap_err();
    assert!(matches!(err, BridgeError::ExternalPermanent { .. }));
    assert!(h.ledger.latest_checkpoint("ethereum", "ETH").is_err());
}

#[tokio::test]
async fn test_deposit_rejects_reverted_tx() {
    let h = harness();
    h.monitor.confirm_failed("0xaaaa", 1_000_000_000_000_000);

    let err = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap_err();
    assert!(matches!(err, BridgeError::ExternalPermanent { .. }));
}

#[tokio::test]
async fn test_deposit_rejects_dust() {
    let h = harness();
    // One wei below the 10^12 dust floor
    h.monitor.confirm("0xaaaa", 999_999_999_999, VAULT);

    let err = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap_err();
    assert!(matches!(err, BridgeError::InvariantViolation { .. }));
}

#[tokio::test]
async fn test_deposit_unknown_tx_is_not_found() {
    let h = harness();
    let err = h.worker.submit_deposit(deposit_request("0xdead")).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound { .. }));
}

#[tokio::test]
async fn test_deposit_unknown_market_rejected() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    let mut request = deposit_request("0xaaaa");
    request.asset = "BTC".to_string();
    let err = h.worker.submit_deposit(request).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound { .. }));
}

#[tokio::test]
async fn test_publisher_transient_failure_leaves_no_state() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    h.publisher.failing.store(true, Ordering::SeqCst);

    let err = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap_err();
    assert!(matches!(err, BridgeError::ExternalTransient { .. }));

    // No checkpoint, no balance, no receipt
    assert!(h.ledger.latest_checkpoint("ethereum", "ETH").is_err());
    assert!(h.ledger.get_balance("0xSUI1", "ethereum", "ETH").is_err());
    assert!(h.ledger.get_deposit_receipt("0xaaaa").is_none());
    assert!(h.mint.calls.lock().unwrap().is_empty());

    // The same idempotency key succeeds once the publisher recovers
    h.publisher.failing.store(false, Ordering::SeqCst);
    let receipt = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();
    assert_eq!(receipt.minted, dec("0.001"));
}

#[tokio::test]
async fn test_concurrent_deposits_distinct_txs() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    h.monitor.confirm("0xcccc", 2_000_000_000_000_000, VAULT);

    let mut second = deposit_request("0xcccc");
    second.sui_owner = "0xSUI2".to_string();
    second.declared_amount = Some(dec("0.002"));

    let (a, b) = tokio::join!(
        h.worker.submit_deposit(deposit_request("0xaaaa")),
        h.worker.submit_deposit(second)
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_ne!(a.receipt_id, b.receipt_id);

    // Checkpoints 1 and 2 exist in some order; no lost updates
    let latest = h.ledger.latest_checkpoint("ethereum", "ETH").unwrap();
    assert_eq!(latest.update_id, 2);
    assert_eq!(latest.total_shares, dec("0.003"));
    assert_eq!(h.ledger.sum_shares("ethereum", "ETH"), dec("0.003"));
    assert_eq!(
        h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap().shares,
        dec("0.001")
    );
    assert_eq!(
        h.ledger.get_balance("0xSUI2", "ethereum", "ETH").unwrap().shares,
        dec("0.002")
    );
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_replay_storm_is_idempotent() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    let original = h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();

    let replays = futures::future::join_all(
        (0..5).map(|_| h.worker.submit_deposit(deposit_request("0xaaaa"))),
    )
    .await;
    for replay in replays {
        assert_eq!(replay.unwrap(), original);
    }
    assert_eq!(h.publisher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.ledger.counts().deposit_receipts, 1);
}

// ============================================================================
// Redeem pipeline
// ============================================================================

async fn seeded_harness() -> Harness {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();
    h
}

#[tokio::test]
async fn test_redeem_happy_path() {
    let h = seeded_harness().await;

    let receipt = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();

    assert_eq!(receipt.burned, dec("0.0005"));
    assert_eq!(receipt.payout_eth, dec("0.0005"));
    assert_eq!(receipt.walrus_update_id, 2);
    assert!(!receipt.walrus_blob_id.is_empty());
    assert_eq!(receipt.payout_tx_hash.as_deref(), Some("0xeth1"));

    let balance = h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap();
    assert_eq!(balance.shares, dec("0.0005"));

    let cp = h.ledger.latest_checkpoint("ethereum", "ETH").unwrap();
    assert_eq!(cp.update_id, 2);
    assert_eq!(cp.total_shares, dec("0.0005"));

    let vouchers = h.ledger.list_vouchers("0xSUI1");
    assert_eq!(vouchers.len(), 1);
    let voucher = &vouchers[0];
    assert_eq!(voucher.nonce, 1);
    assert_eq!(voucher.update_id, 2);
    assert_eq!(voucher.shares, dec("0.0005"));
    assert_eq!(voucher.status, VoucherStatus::Settled);
    assert_eq!(voucher.tx_hash.as_deref(), Some("0xeth1"));

    // The voucher yields a stable EIP-712 digest for the vault call
    let redeemer = Address::from_str("0x00000000000000000000000000000000000000e1").unwrap();
    let domain = voucher_domain(1, Address::from_str(VAULT).unwrap());
    let digest_a = voucher_signing_hash(&Voucher::from_model(voucher, redeemer), &domain);
    let digest_b = voucher_signing_hash(&Voucher::from_model(voucher, redeemer), &domain);
    assert_eq!(digest_a, digest_b);

    // Payout handler saw 5 * 10^14 wei
    let payouts = h.payout.calls.lock().unwrap();
    assert_eq!(payouts.len(), 1);
    assert_eq!(payouts[0].amount_wei, U256::from(500_000_000_000_000u64));
    assert_eq!(
        payouts[0].eth_recipient,
        "0x00000000000000000000000000000000000000e1"
    );
}

#[tokio::test]
async fn test_redeem_replay_returns_original_receipt() {
    let h = seeded_harness().await;
    let first = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    let second = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(h.payout.calls.lock().unwrap().len(), 1);
    assert_eq!(h.ledger.latest_checkpoint("ethereum", "ETH").unwrap().update_id, 2);
}

#[tokio::test]
async fn test_redeem_insufficient_balance() {
    let h = seeded_harness().await;

    let err = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "1.0"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvariantViolation { .. }));

    // No state change
    assert_eq!(
        h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap().shares,
        dec("0.001")
    );
    assert_eq!(h.ledger.latest_checkpoint("ethereum", "ETH").unwrap().update_id, 1);
    assert!(h.ledger.get_redeem_receipt("0xbbbb").is_none());
    assert!(h.ledger.list_vouchers("0xSUI1").is_empty());
}

#[tokio::test]
async fn test_redeem_publisher_failure_refunds_debit() {
    let h = seeded_harness().await;
    h.publisher.failing.store(true, Ordering::SeqCst);

    let err = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::ExternalTransient { .. }));

    // Debit was compensated and the voucher voided
    assert_eq!(
        h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap().shares,
        dec("0.001")
    );
    assert!(h.ledger.get_redeem_receipt("0xbbbb").is_none());
    let vouchers = h.ledger.list_vouchers("0xSUI1");
    assert_eq!(vouchers.len(), 1);
    assert_eq!(vouchers[0].status, VoucherStatus::Voided);

    // Resubmission with the same digest succeeds and issues a fresh nonce
    h.publisher.failing.store(false, Ordering::SeqCst);
    let receipt = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    assert_eq!(receipt.payout_eth, dec("0.0005"));
    let settled: Vec<_> = h
        .ledger
        .list_vouchers("0xSUI1")
        .into_iter()
        .filter(|v| v.status == VoucherStatus::Settled)
        .collect();
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].nonce, 2);
}

#[tokio::test]
async fn test_redeem_payout_failure_leaves_voucher_spent() {
    let h = seeded_harness().await;
    h.payout.failing.store(true, Ordering::SeqCst);

    // Commit succeeds; only settlement is missing
    let receipt = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    assert!(receipt.payout_tx_hash.is_none());
    assert_eq!(receipt.walrus_update_id, 2);

    let vouchers = h.ledger.list_vouchers("0xSUI1");
    assert_eq!(vouchers[0].status, VoucherStatus::Spent);
    // Balance and checkpoint reflect the committed redeem
    assert_eq!(
        h.ledger.get_balance("0xSUI1", "ethereum", "ETH").unwrap().shares,
        dec("0.0005")
    );
    assert_eq!(
        h.ledger.latest_checkpoint("ethereum", "ETH").unwrap().total_shares,
        dec("0.0005")
    );
}

#[tokio::test]
async fn test_rebase_raises_redeem_payout() {
    let h = seeded_harness().await;

    // Yield oracle rebase lands as an operator-submitted checkpoint with a
    // higher index; subsequent redeems pay out at the new rate.
    let prev = h.ledger.latest_checkpoint("ethereum", "ETH").unwrap();
    let rebase = walrus_bridge::ledger::models::Checkpoint {
        update_id: 0,
        index: dec("1.1"),
        da_blob_id: Some("blob-rebase".to_string()),
        block_number: prev.block_number + 1,
        ..prev
    };
    h.ledger.append_checkpoint(rebase).unwrap();

    let receipt = h
        .worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    assert_eq!(receipt.payout_eth, dec("0.00055"));
    assert_eq!(receipt.walrus_update_id, 3);
    let payouts = h.payout.calls.lock().unwrap();
    assert_eq!(payouts[0].amount_wei, U256::from(550_000_000_000_000u64));
}

#[tokio::test]
async fn test_redeem_unknown_owner_is_not_found() {
    let h = seeded_harness().await;
    let mut request = redeem_request("0xbbbb", "0.0005");
    request.sui_owner = "0xNOBODY".to_string();
    let err = h.worker.submit_redeem(request).await.unwrap_err();
    assert!(matches!(err, BridgeError::NotFound { .. }));
}

// ============================================================================
// Sweeper
// ============================================================================

#[tokio::test]
async fn test_expiry_sweeper_voids_expired_vouchers() {
    let options = WorkerOptions {
        sweep_interval: Duration::from_millis(50),
        ..Default::default()
    };
    let h = harness_with_options(options);

    // An already-expired pending voucher, as left behind by a crashed payout
    let expired = walrus_bridge::ledger::models::WithdrawalVoucher {
        voucher_id: walrus_bridge::types::VoucherId::compute(
            "ethereum",
            "ETH",
            "0xSUI1",
            &dec("0.5"),
            1,
            1,
            1,
        ),
        sui_owner: "0xSUI1".to_string(),
        chain_id: "ethereum".to_string(),
        asset: "ETH".to_string(),
        shares: dec("0.5"),
        nonce: 1,
        expiry: 1,
        update_id: 1,
        status: VoucherStatus::Pending,
        tx_hash: None,
        created_at: chrono::Utc::now(),
    };
    let id = expired.voucher_id;
    h.ledger.insert_voucher(expired).unwrap();

    let handle = h.worker.start();
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.stop().await;

    assert_eq!(h.ledger.get_voucher(&id).unwrap().status, VoucherStatus::Voided);
}

// ============================================================================
// Universal invariants over a mixed run
// ============================================================================

#[tokio::test]
async fn test_invariants_after_mixed_traffic() {
    let h = harness();
    h.monitor.confirm("0xaaaa", 1_000_000_000_000_000, VAULT);
    h.monitor.confirm("0xcccc", 3_000_000_000_000_000, VAULT);

    h.worker.submit_deposit(deposit_request("0xaaaa")).await.unwrap();
    let mut second = deposit_request("0xcccc");
    second.sui_owner = "0xSUI2".to_string();
    second.declared_amount = None;
    h.worker.submit_deposit(second).await.unwrap();
    h.worker
        .submit_redeem(redeem_request("0xbbbb", "0.0005"))
        .await
        .unwrap();
    let mut other_redeem = redeem_request("0xdddd", "0.001");
    other_redeem.sui_owner = "0xSUI2".to_string();
    other_redeem.token = TokenKind::X;
    h.worker.submit_redeem(other_redeem).await.unwrap();

    // 1: update ids form 1..=4 with no gaps
    for id in 1..=4u64 {
        assert_eq!(h.ledger.get_checkpoint("ethereum", "ETH", id).unwrap().update_id, id);
    }
    assert_eq!(h.ledger.latest_checkpoint("ethereum", "ETH").unwrap().update_id, 4);

    // 2: shares never negative
    for owner in ["0xSUI1", "0xSUI2"] {
        assert!(h.ledger.get_balance(owner, "ethereum", "ETH").unwrap().shares >= BigDecimal::zero());
    }

    // 3 + 4: per-owner nonces strictly increasing, voucher ids unique
    let mut seen_ids = std::collections::HashSet::new();
    for owner in ["0xSUI1", "0xSUI2"] {
        let vouchers = h.ledger.list_vouchers(owner);
        let mut nonces: Vec<u64> = vouchers.iter().map(|v| v.nonce).collect();
        let mut sorted = nonces.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(nonces.len(), sorted.len());
        nonces.sort();
        assert_eq!(nonces, sorted);
        for v in &vouchers {
            assert!(seen_ids.insert(v.voucher_id));
        }
    }

    // 5: at most one receipt per deposit tx
    assert_eq!(h.ledger.counts().deposit_receipts, 2);

    // 6: latest total_shares equals the sum of balances
    let latest = h.ledger.latest_checkpoint("ethereum", "ETH").unwrap();
    assert_eq!(latest.total_shares, h.ledger.sum_shares("ethereum", "ETH"));
    assert_eq!(latest.total_shares, dec("0.0025"));

    // 8: index monotone across the chain
    let mut prev_index = BigDecimal::zero();
    for id in 1..=4u64 {
        let cp = h.ledger.get_checkpoint("ethereum", "ETH", id).unwrap();
        assert!(cp.index >= prev_index);
        prev_index = cp.index;
    }
}
