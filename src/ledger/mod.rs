//! Authoritative in-memory store for all mutable bridge state.
//!
//! Every operation is atomic with respect to the single reader-writer lock.
//! The Ledger performs no I/O, never logs, and returns structured sentinels
//! only; callers receive copies of stored entities (value semantics).

use alloy::primitives::keccak256;
use bigdecimal::{BigDecimal, One, Zero};
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{BridgeError, Result};
use crate::types::{CheckpointStatus, TokenKind, VoucherId, VoucherStatus};

pub mod models;

pub use models::{
    Checkpoint, CollateralParams, CrossChainBalance, DepositReceipt, RedeemReceipt, VaultInfo,
    WithdrawalVoucher,
};

/// (chain_id, asset)
pub type MarketKey = (String, String);

/// Narrow read-only facade handed to injected handlers; they must not share
/// the mutable worker.
pub trait CheckpointReader: Send + Sync {
    fn latest_checkpoint(&self, chain_id: &str, asset: &str) -> Option<Checkpoint>;
}

/// Deposit receipt fields supplied by the worker at commit time.
#[derive(Debug, Clone)]
pub struct NewDepositReceipt {
    pub tx_hash: String,
    pub sui_owner: String,
    pub chain_id: String,
    pub asset: String,
    pub minted: BigDecimal,
}

/// Redeem receipt fields supplied by the worker at commit time.
#[derive(Debug, Clone)]
pub struct NewRedeemReceipt {
    pub sui_tx_digest: String,
    pub sui_owner: String,
    pub eth_recipient: String,
    pub chain_id: String,
    pub asset: String,
    pub token: TokenKind,
    pub burned: BigDecimal,
    pub payout_eth: BigDecimal,
    pub walrus_update_id: u64,
    pub walrus_blob_id: String,
}

/// Entity counts for the status endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerCounts {
    pub checkpoints: usize,
    pub balances: usize,
    pub vouchers_pending: usize,
    pub vouchers_spent: usize,
    pub vouchers_settled: usize,
    pub vouchers_voided: usize,
    pub deposit_receipts: usize,
    pub redeem_receipts: usize,
}

#[derive(Default)]
struct LedgerState {
    /// Append-only checkpoint chains per market, ordered by update_id
    checkpoints: HashMap<MarketKey, Vec<Checkpoint>>,
    /// Keyed (chain_id, asset, sui_owner); BTreeMap for deterministic
    /// iteration when hashing the balances root
    balances: BTreeMap<(String, String, String), CrossChainBalance>,
    vouchers: HashMap<VoucherId, WithdrawalVoucher>,
    owner_vouchers: HashMap<String, Vec<VoucherId>>,
    deposit_receipts: HashMap<String, DepositReceipt>,
    redeem_receipts: HashMap<String, RedeemReceipt>,
    /// Last reserved voucher nonce per owner
    nonces: HashMap<String, u64>,
    vaults: HashMap<MarketKey, VaultInfo>,
    params: HashMap<MarketKey, CollateralParams>,
    next_receipt_id: u64,
}

pub struct Ledger {
    inner: RwLock<LedgerState>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            inner: RwLock::new(LedgerState {
                next_receipt_id: 1,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, LedgerState> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, LedgerState> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Market configuration (init-only)
    // ------------------------------------------------------------------

    /// Seed a market's static configuration. Called once at startup per
    /// (chain_id, asset); the core reads but never mutates these.
    pub fn seed_market(&self, vault: VaultInfo, params: CollateralParams) {
        let mut state = self.write();
        let key = (vault.chain_id.clone(), vault.asset.clone());
        state.vaults.insert(key.clone(), vault);
        state.params.insert(key, params);
    }

    pub fn get_vault_info(&self, chain_id: &str, asset: &str) -> Result<VaultInfo> {
        self.read()
            .vaults
            .get(&(chain_id.to_string(), asset.to_string()))
            .cloned()
            .ok_or(BridgeError::not_found("vault"))
    }

    pub fn get_collateral_params(&self, chain_id: &str, asset: &str) -> Result<CollateralParams> {
        self.read()
            .params
            .get(&(chain_id.to_string(), asset.to_string()))
            .cloned()
            .ok_or(BridgeError::not_found("collateral params"))
    }

    // ------------------------------------------------------------------
    // Checkpoints
    // ------------------------------------------------------------------

    pub fn latest_checkpoint(&self, chain_id: &str, asset: &str) -> Result<Checkpoint> {
        self.read()
            .checkpoints
            .get(&(chain_id.to_string(), asset.to_string()))
            .and_then(|chain| chain.last())
            .cloned()
            .ok_or(BridgeError::not_found("checkpoint"))
    }

    pub fn get_checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        self.read()
            .checkpoints
            .get(&(chain_id.to_string(), asset.to_string()))
            .and_then(|chain| chain.iter().find(|c| c.update_id == update_id))
            .cloned()
            .ok_or(BridgeError::not_found("checkpoint"))
    }

    /// Append a checkpoint. A zero `update_id` is assigned `prev + 1` (or 1);
    /// a non-zero id must equal exactly that. The index may never decrease
    /// relative to the last non-voided checkpoint.
    pub fn append_checkpoint(&self, cp: Checkpoint) -> Result<Checkpoint> {
        let mut state = self.write();
        let cp = Self::append_checkpoint_locked(&mut state, cp)?;
        Ok(cp)
    }

    fn append_checkpoint_locked(state: &mut LedgerState, mut cp: Checkpoint) -> Result<Checkpoint> {
        Self::validate_next_checkpoint(state, &mut cp)?;
        let key = (cp.chain_id.clone(), cp.asset.clone());
        state.checkpoints.entry(key).or_default().push(cp.clone());
        Ok(cp)
    }

    fn validate_next_checkpoint(state: &LedgerState, cp: &mut Checkpoint) -> Result<()> {
        let key = (cp.chain_id.clone(), cp.asset.clone());
        let chain = state.checkpoints.get(&key);
        let prev_id = chain
            .and_then(|c| c.last())
            .map(|c| c.update_id)
            .unwrap_or(0);
        if cp.update_id == 0 {
            cp.update_id = prev_id + 1;
        } else if cp.update_id != prev_id + 1 {
            return Err(BridgeError::invariant(format!(
                "checkpoint update_id {} conflicts with next id {}",
                cp.update_id,
                prev_id + 1
            )));
        }
        // Slashing must void the bad checkpoint and append a replacement;
        // a voluntary index decrease is rejected outright.
        if let Some(prev_index) = chain
            .and_then(|c| c.iter().rev().find(|c| c.status != CheckpointStatus::Voided))
            .map(|c| &c.index)
        {
            if &cp.index < prev_index {
                return Err(BridgeError::invariant(format!(
                    "checkpoint index {} decreases below {}",
                    cp.index, prev_index
                )));
            }
        }
        if cp.status.requires_blob() && cp.da_blob_id.is_none() {
            return Err(BridgeError::invariant(format!(
                "{} checkpoint requires a DA blob id",
                cp.status
            )));
        }
        if cp.status == CheckpointStatus::Pending && cp.da_blob_id.is_some() {
            return Err(BridgeError::invariant(
                "pending checkpoint must not carry a DA blob id",
            ));
        }
        Ok(())
    }

    /// `pending → verified`, attaching the DA blob id.
    pub fn mark_checkpoint_verified(
        &self,
        chain_id: &str,
        asset: &str,
        update_id: u64,
        da_blob_id: String,
    ) -> Result<Checkpoint> {
        let mut state = self.write();
        let cp = Self::checkpoint_mut(&mut state, chain_id, asset, update_id)?;
        if cp.status != CheckpointStatus::Pending {
            return Err(BridgeError::invariant(format!(
                "cannot verify a {} checkpoint",
                cp.status
            )));
        }
        cp.status = CheckpointStatus::Verified;
        cp.da_blob_id = Some(da_blob_id);
        Ok(cp.clone())
    }

    /// `verified → finalized`.
    pub fn finalize_checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        let mut state = self.write();
        let cp = Self::checkpoint_mut(&mut state, chain_id, asset, update_id)?;
        if cp.status != CheckpointStatus::Verified {
            return Err(BridgeError::invariant(format!(
                "cannot finalize a {} checkpoint",
                cp.status
            )));
        }
        cp.status = CheckpointStatus::Finalized;
        Ok(cp.clone())
    }

    /// `verified → voided` (operator action, e.g. on slashing).
    pub fn void_checkpoint(&self, chain_id: &str, asset: &str, update_id: u64) -> Result<Checkpoint> {
        let mut state = self.write();
        let cp = Self::checkpoint_mut(&mut state, chain_id, asset, update_id)?;
        if cp.status != CheckpointStatus::Verified {
            return Err(BridgeError::invariant(format!(
                "cannot void a {} checkpoint",
                cp.status
            )));
        }
        cp.status = CheckpointStatus::Voided;
        Ok(cp.clone())
    }

    fn checkpoint_mut<'a>(
        state: &'a mut LedgerState,
        chain_id: &str,
        asset: &str,
        update_id: u64,
    ) -> Result<&'a mut Checkpoint> {
        state
            .checkpoints
            .get_mut(&(chain_id.to_string(), asset.to_string()))
            .and_then(|chain| chain.iter_mut().find(|c| c.update_id == update_id))
            .ok_or(BridgeError::not_found("checkpoint"))
    }

    fn latest_verified_index(state: &LedgerState, chain_id: &str, asset: &str) -> BigDecimal {
        state
            .checkpoints
            .get(&(chain_id.to_string(), asset.to_string()))
            .and_then(|chain| {
                chain
                    .iter()
                    .rev()
                    .find(|c| c.status.requires_blob())
                    .map(|c| c.index.clone())
            })
            .unwrap_or_else(BigDecimal::one)
    }

    // ------------------------------------------------------------------
    // Balances
    // ------------------------------------------------------------------

    pub fn get_balance(&self, sui_owner: &str, chain_id: &str, asset: &str) -> Result<CrossChainBalance> {
        self.read()
            .balances
            .get(&(
                chain_id.to_string(),
                asset.to_string(),
                sui_owner.to_string(),
            ))
            .cloned()
            .ok_or(BridgeError::not_found("balance"))
    }

    pub fn credit_shares(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        delta: &BigDecimal,
        ref_update_id: u64,
    ) -> Result<CrossChainBalance> {
        let mut state = self.write();
        Self::credit_locked(&mut state, sui_owner, chain_id, asset, delta, ref_update_id)
    }

    fn credit_locked(
        state: &mut LedgerState,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        delta: &BigDecimal,
        ref_update_id: u64,
    ) -> Result<CrossChainBalance> {
        if delta <= &BigDecimal::zero() {
            return Err(BridgeError::invariant("credit delta must be positive"));
        }
        let index = Self::latest_verified_index(state, chain_id, asset);
        let key = (
            chain_id.to_string(),
            asset.to_string(),
            sui_owner.to_string(),
        );
        let balance = state.balances.entry(key).or_insert_with(|| CrossChainBalance {
            sui_owner: sui_owner.to_string(),
            chain_id: chain_id.to_string(),
            asset: asset.to_string(),
            shares: BigDecimal::zero(),
            index: BigDecimal::one(),
            value: BigDecimal::zero(),
            collateral_usd: BigDecimal::zero(),
            last_checkpoint_id: 0,
            updated_at: Utc::now(),
        });
        balance.shares = &balance.shares + delta;
        balance.index = index;
        balance.value = &balance.shares * &balance.index;
        balance.last_checkpoint_id = ref_update_id;
        balance.updated_at = Utc::now();
        Ok(balance.clone())
    }

    pub fn debit_shares(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        delta: &BigDecimal,
        ref_update_id: u64,
    ) -> Result<CrossChainBalance> {
        if delta <= &BigDecimal::zero() {
            return Err(BridgeError::invariant("debit delta must be positive"));
        }
        let mut state = self.write();
        let index = Self::latest_verified_index(&state, chain_id, asset);
        let key = (
            chain_id.to_string(),
            asset.to_string(),
            sui_owner.to_string(),
        );
        let balance = state
            .balances
            .get_mut(&key)
            .ok_or(BridgeError::not_found("balance"))?;
        if &balance.shares < delta {
            return Err(BridgeError::invariant(format!(
                "insufficient shares: have {}, debit {}",
                balance.shares, delta
            )));
        }
        balance.shares = &balance.shares - delta;
        balance.index = index;
        balance.value = &balance.shares * &balance.index;
        balance.last_checkpoint_id = ref_update_id;
        balance.updated_at = Utc::now();
        Ok(balance.clone())
    }

    /// Collateral valuation is supplied by an external pricing job; the core
    /// stores it verbatim.
    pub fn set_collateral_usd(
        &self,
        sui_owner: &str,
        chain_id: &str,
        asset: &str,
        collateral_usd: BigDecimal,
    ) -> Result<CrossChainBalance> {
        let mut state = self.write();
        let balance = state
            .balances
            .get_mut(&(
                chain_id.to_string(),
                asset.to_string(),
                sui_owner.to_string(),
            ))
            .ok_or(BridgeError::not_found("balance"))?;
        balance.collateral_usd = collateral_usd;
        balance.updated_at = Utc::now();
        Ok(balance.clone())
    }

    /// Sum of all share balances for a market. The latest checkpoint's
    /// `total_shares` must equal this at rest.
    pub fn sum_shares(&self, chain_id: &str, asset: &str) -> BigDecimal {
        let state = self.read();
        state
            .balances
            .values()
            .filter(|b| b.chain_id == chain_id && b.asset == asset)
            .fold(BigDecimal::zero(), |acc, b| acc + &b.shares)
    }

    /// Hash of the market's balances with an optional credit applied, as it
    /// will look after the commit this root is drafted for. Debits are
    /// applied to the balance map before drafting, so redeems pass `None`.
    pub fn balances_root_with(
        &self,
        chain_id: &str,
        asset: &str,
        credit: Option<(&str, &BigDecimal)>,
    ) -> String {
        let state = self.read();
        let mut entries: BTreeMap<String, BigDecimal> = state
            .balances
            .values()
            .filter(|b| b.chain_id == chain_id && b.asset == asset)
            .map(|b| (b.sui_owner.clone(), b.shares.clone()))
            .collect();
        if let Some((owner, delta)) = credit {
            let slot = entries.entry(owner.to_string()).or_insert_with(BigDecimal::zero);
            *slot = &*slot + delta;
        }
        let mut input = Vec::new();
        for (owner, shares) in &entries {
            input.extend_from_slice(owner.as_bytes());
            input.push(b'=');
            input.extend_from_slice(shares.normalized().to_string().as_bytes());
            input.push(b';');
        }
        format!("0x{}", hex::encode(keccak256(&input)))
    }

    // ------------------------------------------------------------------
    // Nonces
    // ------------------------------------------------------------------

    /// Return the next voucher nonce for an owner and reserve it. Strictly
    /// monotonic, starting at 1; serialised through the write lock.
    pub fn reserve_nonce(&self, sui_owner: &str) -> u64 {
        let mut state = self.write();
        let slot = state.nonces.entry(sui_owner.to_string()).or_insert(0);
        *slot += 1;
        *slot
    }

    // ------------------------------------------------------------------
    // Vouchers
    // ------------------------------------------------------------------

    pub fn insert_voucher(&self, voucher: WithdrawalVoucher) -> Result<WithdrawalVoucher> {
        let mut state = self.write();
        Self::insert_voucher_locked(&mut state, voucher)
    }

    fn insert_voucher_locked(
        state: &mut LedgerState,
        voucher: WithdrawalVoucher,
    ) -> Result<WithdrawalVoucher> {
        if state.vouchers.contains_key(&voucher.voucher_id) {
            return Err(BridgeError::duplicate(voucher.voucher_id.to_hex()));
        }
        state
            .owner_vouchers
            .entry(voucher.sui_owner.clone())
            .or_default()
            .push(voucher.voucher_id);
        state.vouchers.insert(voucher.voucher_id, voucher.clone());
        Ok(voucher)
    }

    pub fn get_voucher(&self, id: &VoucherId) -> Result<WithdrawalVoucher> {
        self.read()
            .vouchers
            .get(id)
            .cloned()
            .ok_or(BridgeError::not_found("voucher"))
    }

    pub fn list_vouchers(&self, sui_owner: &str) -> Vec<WithdrawalVoucher> {
        let state = self.read();
        state
            .owner_vouchers
            .get(sui_owner)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| state.vouchers.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// `pending → spent`.
    pub fn mark_voucher_spent(&self, id: &VoucherId) -> Result<WithdrawalVoucher> {
        let mut state = self.write();
        Self::transition_voucher_locked(&mut state, id, VoucherStatus::Spent, None)
    }

    /// `spent → settled`, recording the payout tx hash.
    pub fn mark_voucher_settled(&self, id: &VoucherId, tx_hash: String) -> Result<WithdrawalVoucher> {
        let mut state = self.write();
        Self::transition_voucher_locked(&mut state, id, VoucherStatus::Settled, Some(tx_hash))
    }

    /// `pending | spent → voided` (expiry sweep or operator action).
    pub fn void_voucher(&self, id: &VoucherId) -> Result<WithdrawalVoucher> {
        let mut state = self.write();
        Self::transition_voucher_locked(&mut state, id, VoucherStatus::Voided, None)
    }

    fn transition_voucher_locked(
        state: &mut LedgerState,
        id: &VoucherId,
        to: VoucherStatus,
        tx_hash: Option<String>,
    ) -> Result<WithdrawalVoucher> {
        let voucher = state
            .vouchers
            .get_mut(id)
            .ok_or(BridgeError::not_found("voucher"))?;
        let legal = matches!(
            (voucher.status, to),
            (VoucherStatus::Pending, VoucherStatus::Spent)
                | (VoucherStatus::Spent, VoucherStatus::Settled)
                | (VoucherStatus::Pending, VoucherStatus::Voided)
                | (VoucherStatus::Spent, VoucherStatus::Voided)
        );
        if !legal {
            return Err(BridgeError::invariant(format!(
                "illegal voucher transition {} -> {}",
                voucher.status, to
            )));
        }
        voucher.status = to;
        if let Some(tx) = tx_hash {
            voucher.tx_hash = Some(tx);
        }
        Ok(voucher.clone())
    }

    /// Void every pending voucher whose expiry is at or before `now_unix`.
    pub fn sweep_expired_vouchers(&self, now_unix: u64) -> Vec<VoucherId> {
        let mut state = self.write();
        let expired: Vec<VoucherId> = state
            .vouchers
            .values()
            .filter(|v| v.status == VoucherStatus::Pending && v.expiry <= now_unix)
            .map(|v| v.voucher_id)
            .collect();
        for id in &expired {
            if let Some(v) = state.vouchers.get_mut(id) {
                v.status = VoucherStatus::Voided;
            }
        }
        expired
    }

    // ------------------------------------------------------------------
    // Receipts
    // ------------------------------------------------------------------

    pub fn get_deposit_receipt(&self, tx_hash: &str) -> Option<DepositReceipt> {
        self.read().deposit_receipts.get(tx_hash).cloned()
    }

    pub fn get_redeem_receipt(&self, sui_tx_digest: &str) -> Option<RedeemReceipt> {
        self.read().redeem_receipts.get(sui_tx_digest).cloned()
    }

    pub fn record_deposit_receipt(&self, new: NewDepositReceipt) -> Result<DepositReceipt> {
        let mut state = self.write();
        Self::record_deposit_locked(&mut state, new)
    }

    fn record_deposit_locked(
        state: &mut LedgerState,
        new: NewDepositReceipt,
    ) -> Result<DepositReceipt> {
        if state.deposit_receipts.contains_key(&new.tx_hash) {
            return Err(BridgeError::duplicate(new.tx_hash));
        }
        let receipt = DepositReceipt {
            receipt_id: state.next_receipt_id,
            tx_hash: new.tx_hash.clone(),
            sui_owner: new.sui_owner,
            chain_id: new.chain_id,
            asset: new.asset,
            minted: new.minted,
            sui_tx_digests: Vec::new(),
            created_at: Utc::now(),
        };
        state.next_receipt_id += 1;
        state.deposit_receipts.insert(new.tx_hash, receipt.clone());
        Ok(receipt)
    }

    pub fn record_redeem_receipt(&self, new: NewRedeemReceipt) -> Result<RedeemReceipt> {
        let mut state = self.write();
        Self::record_redeem_locked(&mut state, new)
    }

    fn record_redeem_locked(
        state: &mut LedgerState,
        new: NewRedeemReceipt,
    ) -> Result<RedeemReceipt> {
        if state.redeem_receipts.contains_key(&new.sui_tx_digest) {
            return Err(BridgeError::duplicate(new.sui_tx_digest));
        }
        let receipt = RedeemReceipt {
            receipt_id: state.next_receipt_id,
            sui_tx_digest: new.sui_tx_digest.clone(),
            sui_owner: new.sui_owner,
            eth_recipient: new.eth_recipient,
            chain_id: new.chain_id,
            asset: new.asset,
            token: new.token,
            burned: new.burned,
            payout_eth: new.payout_eth,
            walrus_update_id: new.walrus_update_id,
            walrus_blob_id: new.walrus_blob_id,
            payout_tx_hash: None,
            created_at: Utc::now(),
        };
        state.next_receipt_id += 1;
        state
            .redeem_receipts
            .insert(new.sui_tx_digest, receipt.clone());
        Ok(receipt)
    }

    /// Best-effort enrichment after a successful chain-B mint.
    pub fn append_deposit_digests(
        &self,
        tx_hash: &str,
        digests: Vec<String>,
    ) -> Result<DepositReceipt> {
        let mut state = self.write();
        let receipt = state
            .deposit_receipts
            .get_mut(tx_hash)
            .ok_or(BridgeError::not_found("deposit receipt"))?;
        receipt.sui_tx_digests.extend(digests);
        Ok(receipt.clone())
    }

    /// Settlement: mark the voucher settled and store the payout tx hash on
    /// the receipt, atomically.
    pub fn settle_redeem(
        &self,
        sui_tx_digest: &str,
        voucher_id: &VoucherId,
        payout_tx_hash: String,
    ) -> Result<RedeemReceipt> {
        let mut state = self.write();
        Self::transition_voucher_locked(
            &mut state,
            voucher_id,
            VoucherStatus::Settled,
            Some(payout_tx_hash.clone()),
        )?;
        let receipt = state
            .redeem_receipts
            .get_mut(sui_tx_digest)
            .ok_or(BridgeError::not_found("redeem receipt"))?;
        receipt.payout_tx_hash = Some(payout_tx_hash);
        Ok(receipt.clone())
    }

    // ------------------------------------------------------------------
    // Commit blocks (one atomic unit each, spec'd pipeline step 6)
    // ------------------------------------------------------------------

    /// Deposit commit: append checkpoint, credit shares, record receipt.
    /// Validates everything before mutating anything.
    pub fn commit_deposit(
        &self,
        cp: Checkpoint,
        sui_owner: &str,
        minted: &BigDecimal,
        new_receipt: NewDepositReceipt,
    ) -> Result<(Checkpoint, DepositReceipt)> {
        let mut state = self.write();
        if state.deposit_receipts.contains_key(&new_receipt.tx_hash) {
            return Err(BridgeError::duplicate(new_receipt.tx_hash));
        }
        if minted <= &BigDecimal::zero() {
            return Err(BridgeError::invariant("minted amount must be positive"));
        }
        let chain_id = cp.chain_id.clone();
        let asset = cp.asset.clone();
        let cp = Self::append_checkpoint_locked(&mut state, cp)?;
        Self::credit_locked(
            &mut state,
            sui_owner,
            &chain_id,
            &asset,
            minted,
            cp.update_id,
        )?;
        let receipt = Self::record_deposit_locked(&mut state, new_receipt)?;
        Ok((cp, receipt))
    }

    /// Redeem commit: append checkpoint, mark the voucher spent, record the
    /// receipt. The share debit happened earlier, under its own lock hold.
    pub fn commit_redeem(
        &self,
        cp: Checkpoint,
        voucher_id: &VoucherId,
        new_receipt: NewRedeemReceipt,
    ) -> Result<(Checkpoint, RedeemReceipt)> {
        let mut state = self.write();
        if state.redeem_receipts.contains_key(&new_receipt.sui_tx_digest) {
            return Err(BridgeError::duplicate(new_receipt.sui_tx_digest));
        }
        // Validate the voucher transition before touching the chain.
        match state.vouchers.get(voucher_id) {
            None => return Err(BridgeError::not_found("voucher")),
            Some(v) if v.status != VoucherStatus::Pending => {
                return Err(BridgeError::invariant(format!(
                    "cannot spend a {} voucher",
                    v.status
                )));
            }
            Some(_) => {}
        }
        let cp = Self::append_checkpoint_locked(&mut state, cp)?;
        Self::transition_voucher_locked(&mut state, voucher_id, VoucherStatus::Spent, None)?;
        let receipt = Self::record_redeem_locked(&mut state, new_receipt)?;
        Ok((cp, receipt))
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    pub fn counts(&self) -> LedgerCounts {
        let state = self.read();
        let mut counts = LedgerCounts {
            checkpoints: state.checkpoints.values().map(|c| c.len()).sum(),
            balances: state.balances.len(),
            deposit_receipts: state.deposit_receipts.len(),
            redeem_receipts: state.redeem_receipts.len(),
            ..Default::default()
        };
        for v in state.vouchers.values() {
            match v.status {
                VoucherStatus::Pending => counts.vouchers_pending += 1,
                VoucherStatus::Spent => counts.vouchers_spent += 1,
                VoucherStatus::Settled => counts.vouchers_settled += 1,
                VoucherStatus::Voided => counts.vouchers_voided += 1,
            }
        }
        counts
    }
}

impl CheckpointReader for Ledger {
    fn latest_checkpoint(&self, chain_id: &str, asset: &str) -> Option<Checkpoint> {
        Ledger::latest_checkpoint(self, chain_id, asset).ok()
    }
}
