//! Injected chain handlers.
//!
//! The core never custodies keys: minting on Sui and paying out on chain-A
//! are delegated to these interfaces. An absent handler is a disabled
//! feature, modelled as an explicit slot variant rather than a null check at
//! every call site.

use alloy::primitives::U256;
use async_trait::async_trait;

use crate::error::Result;
use crate::ledger::models::WithdrawalVoucher;

/// Chain-B mint request handed over after a deposit commit. Amounts are in
/// 9-decimal chain-B token units.
#[derive(Debug, Clone)]
pub struct MintRequest {
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub f_units: u64,
    pub x_units: u64,
    /// Checkpoint the mint is anchored to
    pub update_id: u64,
    pub da_blob_id: String,
}

/// Submits a bridge-mint on chain-B; returns the resulting tx digests.
#[async_trait]
pub trait MintHandler: Send + Sync {
    async fn bridge_mint(&self, request: MintRequest) -> Result<Vec<String>>;
}

/// Chain-A payout request handed over after a redeem commit.
#[derive(Debug, Clone)]
pub struct PayoutRequest {
    pub eth_recipient: String,
    pub amount_wei: U256,
    pub voucher: WithdrawalVoucher,
}

/// Signs and submits a vault `redeemVoucher` call; returns the payout tx
/// hash. Idempotent under the voucher id: re-driving the same voucher must
/// not double-pay.
#[async_trait]
pub trait PayoutHandler: Send + Sync {
    async fn redeem_voucher(&self, request: PayoutRequest) -> Result<String>;
}

/// Handler presence as a sum type: the worker skips `Disabled` branches
/// explicitly.
pub enum HandlerSlot<T> {
    Disabled,
    Configured(T),
}

impl<T> HandlerSlot<T> {
    pub fn as_configured(&self) -> Option<&T> {
        match self {
            HandlerSlot::Disabled => None,
            HandlerSlot::Configured(handler) => Some(handler),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, HandlerSlot::Configured(_))
    }
}

impl<T> From<Option<T>> for HandlerSlot<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(handler) => HandlerSlot::Configured(handler),
            None => HandlerSlot::Disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_configured() {
        let slot: HandlerSlot<u32> = HandlerSlot::Configured(7);
        assert!(slot.is_configured());
        assert_eq!(slot.as_configured(), Some(&7));
    }

    #[test]
    fn test_slot_disabled() {
        let slot: HandlerSlot<u32> = HandlerSlot::Disabled;
        assert!(!slot.is_configured());
        assert_eq!(slot.as_configured(), None);
    }

    #[test]
    fn test_slot_from_option() {
        assert!(HandlerSlot::from(Some(1u8)).is_configured());
        assert!(!HandlerSlot::<u8>::from(None).is_configured());
    }
}
