use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use web3::types::Address;

use crate::error::SaleError;
use crate::utils::ethereum::ReceiptPolling;

/// Defaults matching the Ropsten deployment the sale page was built for.
pub mod defaults {
    pub const RPC_URL: &str = "http://127.0.0.1:8545";
    pub const EXPLORER_URL: &str = "https://ropsten.etherscan.io";
    pub const EXPECTED_CHAIN_ID: u64 = 3;
    pub const CONFIRMATION_POLL_MS: u64 = 2_000;
    pub const CONFIRMATION_TIMEOUT_SECS: u64 = 600;
}

#[derive(Debug, Clone, PartialEq)]
pub enum WalletMode {
    /// Accounts unlocked on the node
    Node,
    /// Locally held private key
    LocalKey(String),
    None,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub crowdsale_address: Address,
    pub explorer_url: String,
    pub expected_chain_id: u64,
    pub wallet: WalletMode,
    pub abi_dir: Option<PathBuf>,
    pub receipt_polling: ReceiptPolling,
}

impl Config {
    pub fn from_env() -> Result<Self, SaleError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SaleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let crowdsale = lookup("CROWDSALE_ADDRESS")
            .ok_or_else(|| SaleError::Config("CROWDSALE_ADDRESS must be set in .env file".to_string()))?;

        let wallet = match lookup("WALLET_MODE").as_deref().unwrap_or("node") {
            "node" => WalletMode::Node,
            "none" => WalletMode::None,
            "key" => WalletMode::LocalKey(lookup("WALLET_PRIVATE_KEY").ok_or_else(|| {
                SaleError::Config("WALLET_PRIVATE_KEY must be set when WALLET_MODE=key".to_string())
            })?),
            other => return Err(SaleError::Config(format!("unknown WALLET_MODE: {}", other))),
        };

        let poll_ms = parse_number(&lookup, "CONFIRMATION_POLL_MS", defaults::CONFIRMATION_POLL_MS)?;
        let timeout_secs = parse_number(&lookup, "CONFIRMATION_TIMEOUT_SECS", defaults::CONFIRMATION_TIMEOUT_SECS)?;

        Ok(Self {
            rpc_url: lookup("HTTP_RPC_URL").unwrap_or_else(|| defaults::RPC_URL.to_string()),
            crowdsale_address: parse_address(&crowdsale)?,
            explorer_url: lookup("EXPLORER_URL").unwrap_or_else(|| defaults::EXPLORER_URL.to_string()),
            expected_chain_id: parse_number(&lookup, "EXPECTED_CHAIN_ID", defaults::EXPECTED_CHAIN_ID)?,
            wallet,
            abi_dir: lookup("ABI_DIR").map(PathBuf::from),
            receipt_polling: ReceiptPolling {
                interval: Duration::from_millis(poll_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse_number<F>(lookup: &F, name: &str, default: u64) -> Result<u64, SaleError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SaleError::Config(format!("{} must be a number, got {:?}", name, raw))),
        None => Ok(default),
    }
}

pub fn parse_address(raw: &str) -> Result<Address, SaleError> {
    Address::from_str(raw.trim()).map_err(|_| SaleError::InvalidAddress(raw.to_string()))
}

/// Block explorer page for an address.
pub fn explorer_address_url(explorer_url: &str, address: Address) -> String {
    format!("{}/address/{:?}", explorer_url.trim_end_matches('/'), address)
}
