pub mod eth_vault;

pub use eth_vault::{
    preview_deposit, preview_redeem, ray, voucher_domain, voucher_signing_hash, Voucher,
    WalrusEthVault,
};
