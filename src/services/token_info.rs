use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ethabi::Contract;
use log::{error, warn};
use serde::Serialize;
use tokio::sync::RwLock;
use web3::types::U256;

use crate::error::SaleError;
use crate::models::token::TokenInfo;
use crate::utils::abi::{call_view, expect_string, expect_uint};
use crate::utils::config::parse_address;
use crate::utils::ethereum::ChainReader;

/// Where a keyed query stands.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum QueryState<T> {
    /// Nothing has been asked for this key
    Idle,
    /// Empty key, fetching is switched off
    Disabled,
    Loading,
    Loaded(T),
    Failed(String),
}

struct Entry {
    key: String,
    generation: u64,
    state: QueryState<TokenInfo>,
}

/// Token metadata query keyed by token address. Only the most recently
/// requested key is kept; results for any other key are thrown away.
pub struct TokenInfoQuery {
    reader: Arc<dyn ChainReader>,
    abi: Arc<Contract>,
    generation: AtomicU64,
    current: RwLock<Entry>,
}

impl TokenInfoQuery {
    pub fn new(reader: Arc<dyn ChainReader>, abi: Arc<Contract>) -> Self {
        Self {
            reader,
            abi,
            generation: AtomicU64::new(0),
            current: RwLock::new(Entry {
                key: String::new(),
                generation: 0,
                state: QueryState::Disabled,
            }),
        }
    }

    /// Makes `address` the current key and fetches its metadata.
    pub async fn load(&self, address: &str) -> QueryState<TokenInfo> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let pending = if address.is_empty() {
            QueryState::Disabled
        } else {
            QueryState::Loading
        };

        {
            let mut current = self.current.write().await;
            *current = Entry {
                key: address.to_string(),
                generation,
                state: pending.clone(),
            };
        }
        if address.is_empty() {
            return pending;
        }

        let state = match self.fetch(address).await {
            Ok(info) => QueryState::Loaded(info),
            Err(e) => {
                error!("Failed to fetch token info for {}: {}", address, e);
                QueryState::Failed("failed to load".to_string())
            }
        };

        let mut current = self.current.write().await;
        if current.generation == generation {
            current.state = state.clone();
        } else {
            warn!("Discarding token info for {}, a newer query is current", address);
        }
        state
    }

    /// State for `address` as far as the current key is concerned.
    pub async fn state(&self, address: &str) -> QueryState<TokenInfo> {
        let current = self.current.read().await;
        if current.key == address {
            current.state.clone()
        } else {
            QueryState::Idle
        }
    }

    // Four reads, one after another
    async fn fetch(&self, address: &str) -> Result<TokenInfo, SaleError> {
        warn!("Fetching token info for {}", address);
        let at = parse_address(address)?;
        let reader = &*self.reader;

        let name = expect_string(call_view(reader, &self.abi, at, "name").await?, "name")?;
        let symbol = expect_string(call_view(reader, &self.abi, at, "symbol").await?, "symbol")?;
        let decimals = expect_uint(call_view(reader, &self.abi, at, "decimals").await?, "decimals")?;
        let total_supply = expect_uint(call_view(reader, &self.abi, at, "totalSupply").await?, "totalSupply")?;

        if decimals > U256::from(u8::MAX) {
            return Err(SaleError::Read(format!("decimals() out of range: {}", decimals)));
        }
        let decimals = decimals.low_u32() as u8;

        warn!("token info name={} symbol={} decimals={}", name, symbol, decimals);
        Ok(TokenInfo {
            address: at,
            name,
            symbol,
            decimals,
            total_supply,
        })
    }
}
