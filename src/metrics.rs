//! Prometheus metrics for the Walrus bridge operator
//!
//! Exposed on the /metrics endpoint for Prometheus scraping.

use lazy_static::lazy_static;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram_vec, Counter, CounterVec, Gauge, GaugeVec, HistogramVec,
};

use crate::ledger::LedgerCounts;

lazy_static! {
    // Pipeline metrics
    pub static ref DEPOSITS_PROCESSED: CounterVec = register_counter_vec!(
        "bridge_deposits_processed_total",
        "Total number of deposit submissions processed",
        &["chain", "status"]
    ).unwrap();

    pub static ref REDEEMS_PROCESSED: CounterVec = register_counter_vec!(
        "bridge_redeems_processed_total",
        "Total number of redeem submissions processed",
        &["chain", "status"]
    ).unwrap();

    pub static ref CHECKPOINTS_PUBLISHED: CounterVec = register_counter_vec!(
        "bridge_checkpoints_published_total",
        "Total number of checkpoints anchored to the DA layer",
        &["chain"]
    ).unwrap();

    // Voucher metrics
    pub static ref VOUCHERS_ISSUED: CounterVec = register_counter_vec!(
        "bridge_vouchers_issued_total",
        "Total number of withdrawal vouchers issued",
        &["chain"]
    ).unwrap();

    pub static ref VOUCHERS_SWEPT: Counter = register_counter!(
        "bridge_vouchers_swept_total",
        "Total number of expired vouchers voided by the sweeper"
    ).unwrap();

    // Handler metrics
    pub static ref HANDLER_FAILURES: CounterVec = register_counter_vec!(
        "bridge_handler_failures_total",
        "Post-commit handler failures requiring manual reconciliation",
        &["handler"]
    ).unwrap();

    // Processing latency
    pub static ref PIPELINE_LATENCY: HistogramVec = register_histogram_vec!(
        "bridge_pipeline_latency_seconds",
        "Time from submission to commit",
        &["pipeline"],
        vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]
    ).unwrap();

    // Ledger state
    pub static ref LEDGER_ENTITIES: GaugeVec = register_gauge_vec!(
        "bridge_ledger_entities",
        "Number of entities held by the ledger",
        &["kind"]
    ).unwrap();

    // Health metrics
    pub static ref UP: Gauge = register_gauge!(
        "bridge_up",
        "Whether the bridge operator is up and running"
    ).unwrap();
}

/// Record a processed deposit
pub fn record_deposit_processed(chain: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    DEPOSITS_PROCESSED.with_label_values(&[chain, status]).inc();
}

/// Record a processed redeem
pub fn record_redeem_processed(chain: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    REDEEMS_PROCESSED.with_label_values(&[chain, status]).inc();
}

/// Record a checkpoint anchored to the DA layer
pub fn record_checkpoint_published(chain: &str) {
    CHECKPOINTS_PUBLISHED.with_label_values(&[chain]).inc();
}

/// Record a voucher issued
pub fn record_voucher_issued(chain: &str) {
    VOUCHERS_ISSUED.with_label_values(&[chain]).inc();
}

/// Record expired vouchers voided by the sweeper
pub fn record_vouchers_swept(count: usize) {
    VOUCHERS_SWEPT.inc_by(count as f64);
}

/// Record a post-commit handler failure
pub fn record_handler_failure(handler: &str) {
    HANDLER_FAILURES.with_label_values(&[handler]).inc();
}

/// Record pipeline latency
pub fn record_latency(pipeline: &str, seconds: f64) {
    PIPELINE_LATENCY
        .with_label_values(&[pipeline])
        .observe(seconds);
}

/// Publish ledger entity counts
pub fn set_ledger_counts(counts: &LedgerCounts) {
    LEDGER_ENTITIES
        .with_label_values(&["checkpoints"])
        .set(counts.checkpoints as f64);
    LEDGER_ENTITIES
        .with_label_values(&["balances"])
        .set(counts.balances as f64);
    LEDGER_ENTITIES
        .with_label_values(&["vouchers_pending"])
        .set(counts.vouchers_pending as f64);
    LEDGER_ENTITIES
        .with_label_values(&["vouchers_spent"])
        .set(counts.vouchers_spent as f64);
    LEDGER_ENTITIES
        .with_label_values(&["vouchers_settled"])
        .set(counts.vouchers_settled as f64);
    LEDGER_ENTITIES
        .with_label_values(&["vouchers_voided"])
        .set(counts.vouchers_voided as f64);
    LEDGER_ENTITIES
        .with_label_values(&["deposit_receipts"])
        .set(counts.deposit_receipts as f64);
    LEDGER_ENTITIES
        .with_label_values(&["redeem_receipts"])
        .set(counts.redeem_receipts as f64);
}
