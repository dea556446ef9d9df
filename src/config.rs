use alloy::primitives::U256;
use eyre::{eyre, Result, WrapErr};
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::ledger::models::{CollateralParams, VaultInfo};
use crate::publisher::parse_endpoint_list;
use crate::types::{BPS_DENOMINATOR, SUI_TOKEN_DECIMALS};
use crate::worker::WorkerOptions;

/// Walrus testnet publisher endpoints used when DA_PUBLISHER_URLS is unset.
pub const DEFAULT_TESTNET_PUBLISHERS: &[&str] = &[
    "https://publisher.walrus-testnet.walrus.space",
    "https://wal-publisher-testnet.staketab.org",
];

/// Main configuration for the bridge operator
#[derive(Debug, Clone)]
pub struct Config {
    /// One entry per (chain_id, asset) market the operator serves
    pub markets: Vec<MarketConfig>,
    pub monitor: MonitorConfig,
    pub publisher: PublisherConfig,
    pub bridge: BridgeConfig,
    pub api_port: u16,
}

/// A served market: the vault holding deposits for (chain_id, asset)
#[derive(Debug, Clone)]
pub struct MarketConfig {
    pub chain_id: String,
    pub asset: String,
    pub vault_address: String,
}

/// Chain-A monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub eth_rpc_url: String,
    pub timeout_secs: u64,
}

/// DA-layer publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    pub endpoints: Vec<String>,
    pub timeout_secs: u64,
    pub store_epochs: u64,
}

/// Bridge pipeline configuration
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub default_voucher_ttl_secs: u64,
    pub min_voucher_validity_secs: u64,
    pub voucher_sweep_interval_secs: u64,
    pub dust_floor_wei: U256,
    pub share_split_f_bps: u32,
    pub handler_timeout_secs: u64,
}

/// Default functions
fn default_monitor_timeout() -> u64 {
    30
}

fn default_publisher_timeout() -> u64 {
    30
}

fn default_handler_timeout() -> u64 {
    60
}

fn default_voucher_ttl() -> u64 {
    86_400
}

fn default_min_voucher_validity() -> u64 {
    60
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_store_epochs() -> u64 {
    5
}

fn default_share_split_f_bps() -> u32 {
    5_000
}

fn default_dust_floor_wei() -> U256 {
    U256::from(10u64).pow(U256::from(12u64))
}

fn default_api_port() -> u16 {
    9090
}

impl Config {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    fn load_from_env() -> Result<Self> {
        let markets_raw = env::var("VAULT_MARKETS")
            .map_err(|_| eyre!("VAULT_MARKETS environment variable is required"))?;
        let markets = parse_markets(&markets_raw)?;

        let monitor = MonitorConfig {
            eth_rpc_url: env::var("ETH_RPC_URL")
                .map_err(|_| eyre!("ETH_RPC_URL environment variable is required"))?,
            timeout_secs: env::var("MONITOR_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_monitor_timeout()),
        };

        let endpoints = match env::var("DA_PUBLISHER_URLS") {
            Ok(raw) if !raw.trim().is_empty() => parse_endpoint_list(&raw),
            _ => DEFAULT_TESTNET_PUBLISHERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };
        let publisher = PublisherConfig {
            endpoints,
            timeout_secs: env::var("PUBLISHER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_publisher_timeout()),
            store_epochs: env::var("DA_STORE_EPOCHS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_store_epochs()),
        };

        let bridge = BridgeConfig {
            default_voucher_ttl_secs: env::var("VOUCHER_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_voucher_ttl()),
            min_voucher_validity_secs: env::var("MIN_VOUCHER_VALIDITY_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_min_voucher_validity()),
            voucher_sweep_interval_secs: env::var("VOUCHER_SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_sweep_interval()),
            dust_floor_wei: env::var("DUST_FLOOR_WEI")
                .ok()
                .and_then(|v| U256::from_str_radix(&v, 10).ok())
                .unwrap_or_else(default_dust_floor_wei),
            share_split_f_bps: env::var("SHARE_SPLIT_F_BPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_share_split_f_bps()),
            handler_timeout_secs: env::var("HANDLER_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_handler_timeout()),
        };

        let config = Config {
            markets,
            monitor,
            publisher,
            bridge,
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_api_port()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.markets.is_empty() {
            return Err(eyre!("at least one VAULT_MARKETS entry is required"));
        }
        for market in &self.markets {
            if market.chain_id.is_empty() || market.asset.is_empty() {
                return Err(eyre!("market chain_id and asset cannot be empty"));
            }
            if market.vault_address.len() != 42 || !market.vault_address.starts_with("0x") {
                return Err(eyre!(
                    "vault address for {}:{} must be a valid hex address (42 chars with 0x prefix)",
                    market.chain_id,
                    market.asset
                ));
            }
        }
        let mut keys: Vec<(&str, &str)> = self
            .markets
            .iter()
            .map(|m| (m.chain_id.as_str(), m.asset.as_str()))
            .collect();
        keys.sort();
        keys.dedup();
        if keys.len() != self.markets.len() {
            return Err(eyre!("duplicate (chain_id, asset) market in VAULT_MARKETS"));
        }

        if self.monitor.eth_rpc_url.is_empty() {
            return Err(eyre!("monitor.eth_rpc_url cannot be empty"));
        }
        if self.publisher.endpoints.is_empty() {
            return Err(eyre!("publisher.endpoints cannot be empty"));
        }
        if self.publisher.store_epochs == 0 {
            return Err(eyre!("publisher.store_epochs must be at least 1"));
        }

        if self.bridge.default_voucher_ttl_secs < self.bridge.min_voucher_validity_secs {
            return Err(eyre!(
                "bridge.default_voucher_ttl_secs cannot be below the minimum validity window"
            ));
        }
        if self.bridge.min_voucher_validity_secs < 60 {
            return Err(eyre!("bridge.min_voucher_validity_secs cannot be below 60"));
        }
        if self.bridge.voucher_sweep_interval_secs == 0 {
            return Err(eyre!("bridge.voucher_sweep_interval_secs must be positive"));
        }
        if self.bridge.share_split_f_bps > BPS_DENOMINATOR {
            return Err(eyre!(
                "bridge.share_split_f_bps cannot exceed {}",
                BPS_DENOMINATOR
            ));
        }

        Ok(())
    }

    /// Worker tuning derived from this configuration.
    pub fn worker_options(&self) -> WorkerOptions {
        WorkerOptions {
            dust_floor_wei: self.bridge.dust_floor_wei,
            share_split_f_bps: self.bridge.share_split_f_bps,
            monitor_timeout: Duration::from_secs(self.monitor.timeout_secs),
            handler_timeout: Duration::from_secs(self.bridge.handler_timeout_secs),
            voucher_ttl: Duration::from_secs(self.bridge.default_voucher_ttl_secs),
            min_voucher_validity: Duration::from_secs(self.bridge.min_voucher_validity_secs),
            sweep_interval: Duration::from_secs(self.bridge.voucher_sweep_interval_secs),
        }
    }
}

impl MarketConfig {
    /// The vault read-model the ledger serves for this market.
    pub fn vault_info(&self) -> VaultInfo {
        VaultInfo {
            chain_id: self.chain_id.clone(),
            asset: self.asset.clone(),
            vault_address: self.vault_address.clone(),
            token_decimals: SUI_TOKEN_DECIMALS as u8,
            index_scale: "1000000000000000000000000000".to_string(),
        }
    }
}

impl Config {
    /// The collateral-parameter read-model the ledger serves for a market.
    pub fn collateral_params(&self, market: &MarketConfig) -> CollateralParams {
        CollateralParams {
            chain_id: market.chain_id.clone(),
            asset: market.asset.clone(),
            dust_floor_wei: self.bridge.dust_floor_wei.to_string(),
            share_split_f_bps: self.bridge.share_split_f_bps,
            default_voucher_ttl_secs: self.bridge.default_voucher_ttl_secs,
            min_voucher_validity_secs: self.bridge.min_voucher_validity_secs,
        }
    }
}

/// Parse `chain:asset:0xvault` triplets separated by commas.
pub fn parse_markets(raw: &str) -> Result<Vec<MarketConfig>> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let parts: Vec<&str> = entry.split(':').collect();
            if parts.len() != 3 {
                return Err(eyre!(
                    "market entry '{}' must be chain:asset:vault_address",
                    entry
                ));
            }
            Ok(MarketConfig {
                chain_id: parts[0].to_string(),
                asset: parts[1].to_string(),
                vault_address: parts[2].to_string(),
            })
        })
        .collect()
}
