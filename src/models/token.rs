use serde::Serialize;
use web3::types::{Address, U256};

use crate::utils::config::explorer_address_url;
use crate::utils::units::{format_ether, serialize_decimal};

/// ERC20 metadata as read from the chain at fetch time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    #[serde(serialize_with = "serialize_decimal")]
    pub total_supply: U256,
}

// API view of a token
#[derive(Debug, Serialize)]
pub struct TokenInfoView<'a> {
    #[serde(flatten)]
    pub info: &'a TokenInfo,
    pub total_supply_formatted: String,
    pub explorer_url: String,
}

impl<'a> TokenInfoView<'a> {
    pub fn new(info: &'a TokenInfo, explorer_url: &str) -> Self {
        Self {
            info,
            // Rendered in ether units whatever `decimals` says, like the sale page always did
            total_supply_formatted: format_ether(info.total_supply),
            explorer_url: explorer_address_url(explorer_url, info.address),
        }
    }
}
