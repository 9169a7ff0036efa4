use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use web3::types::{Address, H256, U256};

use crate::error::SaleError;
use crate::utils::config::explorer_address_url;
use crate::utils::units::{format_ether, reciprocal, serialize_decimal, unit_price_wei};

/// Largest quantity a single order may ask for.
pub const MAX_ORDER_QUANTITY: u32 = 1000;

/// Sale parameters read in one round. `generation` orders snapshots by the
/// time their fetch was issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrowdsaleSnapshot {
    pub generation: u64,
    pub crowdsale: Address,
    pub token_address: Address,
    #[serde(serialize_with = "serialize_decimal")]
    pub remaining_tokens: U256,
    #[serde(serialize_with = "serialize_decimal")]
    pub rate: U256,
    #[serde(serialize_with = "serialize_decimal")]
    pub closing_time: U256,
    pub fetched_at: DateTime<Utc>,
}

impl CrowdsaleSnapshot {
    /// Closing time as a UTC date, `None` while the contract reports zero.
    pub fn closing_time_utc(&self) -> Option<DateTime<Utc>> {
        if self.closing_time.is_zero() || self.closing_time > U256::from(i64::MAX as u64) {
            return None;
        }
        DateTime::<Utc>::from_timestamp(self.closing_time.low_u64() as i64, 0)
    }
}

#[derive(Debug, Serialize)]
pub struct CrowdsaleView<'a> {
    #[serde(flatten)]
    pub snapshot: &'a CrowdsaleSnapshot,
    pub available_for_sale: String,
    pub price_wei: String,
    pub closing_time_utc: Option<String>,
    pub token_explorer_url: String,
}

impl<'a> CrowdsaleView<'a> {
    pub fn new(snapshot: &'a CrowdsaleSnapshot, explorer_url: &str) -> Self {
        Self {
            snapshot,
            available_for_sale: format_ether(snapshot.remaining_tokens),
            price_wei: snapshot.rate.to_string(),
            closing_time_utc: snapshot.closing_time_utc().map(|t| t.to_rfc3339()),
            token_explorer_url: explorer_address_url(explorer_url, snapshot.token_address),
        }
    }
}

/// Cost of buying `quantity` tokens at a given rate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub quantity: u32,
    /// `(1 / rate) * quantity`, for display
    pub total_cost_eth: f64,
    #[serde(serialize_with = "serialize_decimal")]
    pub unit_price_wei: U256,
    /// What actually gets sent
    #[serde(serialize_with = "serialize_decimal")]
    pub value_wei: U256,
}

impl Quote {
    pub fn new(rate: U256, quantity: u32) -> Result<Self, SaleError> {
        if quantity > MAX_ORDER_QUANTITY {
            return Err(SaleError::QuantityOutOfRange(quantity, MAX_ORDER_QUANTITY));
        }

        let unit_price_wei = unit_price_wei(rate)?;
        let total_cost_eth = reciprocal(rate)? * f64::from(quantity);

        Ok(Self {
            quantity,
            total_cost_eth,
            unit_price_wei,
            value_wei: unit_price_wei * U256::from(quantity),
        })
    }
}

/// How a confirmation wait ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Confirmation {
    /// Mined successfully. Carries the refreshed snapshot when the refetch worked.
    Confirmed(Option<CrowdsaleSnapshot>),
    Failed(String),
}

#[derive(Debug)]
pub enum PurchaseOutcome {
    /// No account was connected; the wallet was asked for one and nothing was sent.
    ConnectionRequested { accounts: Vec<Address> },
    Submitted {
        tx_hash: H256,
        quote: Quote,
        confirmation: JoinHandle<Confirmation>,
    },
}
