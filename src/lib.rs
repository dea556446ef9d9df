//! Walrus ETH bridge operator - library interface
//!
//! Re-exports internal modules for the binary and integration tests.

pub mod api;
pub mod config;
pub mod contracts;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod metrics;
pub mod monitor;
pub mod publisher;
pub mod service;
pub mod types;
pub mod vouchers;
pub mod worker;
