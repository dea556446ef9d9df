//! Walrus ETH vault contract ABI definitions
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the vault
//! contract, plus the EIP-712 domain and digest helpers for withdrawal
//! vouchers. The encoding here is bit-exact with the deployed contract;
//! the voucher type hash string is part of the cross-chain protocol.

#![allow(clippy::too_many_arguments)]

use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, Eip712Domain, SolStruct};

use crate::ledger::models::WithdrawalVoucher;
use crate::types::eth_to_wei_floor;

sol! {
    /// Signed intent authorising the vault to pay `redeemer` in exchange
    /// for a matching share burn on the Sui side.
    #[derive(Debug)]
    struct Voucher {
        bytes32 voucherId;
        address redeemer;
        string suiOwner;
        uint256 shares;
        uint64 nonce;
        uint64 expiry;
        uint64 updateId;
    }

    /// Vault contract interface
    #[sol(rpc)]
    contract WalrusEthVault {
        /// Deposit native asset, crediting shares to a Sui owner
        function deposit(address recipient, string suiOwner, uint256 minShares) external payable returns (uint256 shares);

        /// Pay out a signed withdrawal voucher
        function redeemVoucher(Voucher voucher, bytes signature, address payable recipient) external returns (uint256 assets);

        /// Monitor-driven index update
        function recordRebase(uint256 newIndex) external;

        /// Shares minted for a given asset amount at the current index
        function previewDeposit(uint256 assets) external view returns (uint256 shares);

        /// Assets paid for a given share amount at the current index
        function previewRedeem(uint256 shares) external view returns (uint256 assets);

        /// Current RAY-scaled assets-per-share index
        function currentIndex() external view returns (uint256);

        event Deposit(address indexed sender, address indexed recipient, uint256 assets, uint256 shares, string suiOwner);

        event VoucherRedeemed(bytes32 indexed voucherId, address indexed recipient, uint256 assets);
    }
}

/// Index scale: 10^27 (RAY)
pub fn ray() -> U256 {
    U256::from(10u64).pow(U256::from(27u64))
}

/// `previewDeposit(a) = a * 1e27 / index`
pub fn preview_deposit(assets: U256, index: U256) -> U256 {
    if index.is_zero() {
        return U256::ZERO;
    }
    assets * ray() / index
}

/// `previewRedeem(s) = s * index / 1e27`
pub fn preview_redeem(shares: U256, index: U256) -> U256 {
    shares * index / ray()
}

/// EIP-712 domain of the vault: name "WalrusEthVault", version "1".
pub fn voucher_domain(chain_id: u64, vault: Address) -> Eip712Domain {
    eip712_domain! {
        name: "WalrusEthVault",
        version: "1",
        chain_id: chain_id,
        verifying_contract: vault,
    }
}

/// EIP-712 signing hash of a voucher under the given domain.
pub fn voucher_signing_hash(voucher: &Voucher, domain: &Eip712Domain) -> B256 {
    voucher.eip712_signing_hash(domain)
}

impl Voucher {
    /// Build the on-chain voucher struct from the ledger model.
    ///
    /// The ledger stores shares as a decimal amount; the contract takes the
    /// 18-decimal integer representation.
    pub fn from_model(v: &WithdrawalVoucher, redeemer: Address) -> Self {
        Voucher {
            voucherId: B256::from(v.voucher_id.0),
            redeemer,
            suiOwner: v.sui_owner.clone(),
            shares: eth_to_wei_floor(&v.shares),
            nonce: v.nonce,
            expiry: v.expiry,
            updateId: v.update_id,
        }
    }
}
