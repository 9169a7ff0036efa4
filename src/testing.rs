//! In-memory node and wallet doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use ethabi::{Contract, Token};
use web3::types::{Address, H256, U256};

use crate::error::SaleError;
use crate::utils::abi::Abis;
use crate::utils::ethereum::{ChainReader, Wallet};

type Selector = [u8; 4];

#[derive(Default)]
pub struct MockChain {
    responses: HashMap<(Address, Selector), Option<Vec<u8>>>,
    delays: HashMap<Address, Duration>,
    calls: Mutex<Vec<(Address, Selector)>>,
    chain_id: u64,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            ..Default::default()
        }
    }

    pub fn returns(mut self, at: Address, abi: &Contract, function: &str, tokens: &[Token]) -> Self {
        let selector = abi.function(function).unwrap().short_signature();
        self.responses.insert((at, selector), Some(ethabi::encode(tokens)));
        self
    }

    pub fn fails(mut self, at: Address, abi: &Contract, function: &str) -> Self {
        let selector = abi.function(function).unwrap().short_signature();
        self.responses.insert((at, selector), None);
        self
    }

    pub fn delayed(mut self, at: Address, delay: Duration) -> Self {
        self.delays.insert(at, delay);
        self
    }

    pub fn calls_to(&self, at: Address) -> usize {
        self.calls.lock().unwrap().iter().filter(|(to, _)| *to == at).count()
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, SaleError> {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[..4]);
        self.calls.lock().unwrap().push((to, selector));

        if let Some(delay) = self.delays.get(&to) {
            tokio::time::sleep(*delay).await;
        }

        match self.responses.get(&(to, selector)) {
            Some(Some(output)) => Ok(output.clone()),
            Some(None) => Err(SaleError::Read("execution reverted".to_string())),
            None => Err(SaleError::Read(format!("no mock for {:?}", to))),
        }
    }

    async fn chain_id(&self) -> Result<u64, SaleError> {
        Ok(self.chain_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReceiptOutcome {
    Mined,
    Reverted,
    Dropped,
}

pub struct MockWallet {
    accounts: Vec<Address>,
    outcome: ReceiptOutcome,
    reject_sends: bool,
    requests: AtomicUsize,
    nonce: AtomicU64,
    sent: Mutex<Vec<(Address, Address, U256)>>,
}

impl MockWallet {
    pub fn new(accounts: Vec<Address>, outcome: ReceiptOutcome) -> Self {
        Self {
            accounts,
            outcome,
            reject_sends: false,
            requests: AtomicUsize::new(0),
            nonce: AtomicU64::new(0),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(mut self) -> Self {
        self.reject_sends = true;
        self
    }

    pub fn account_requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(Address, Address, U256)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Wallet for MockWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SaleError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        Ok(self.accounts.clone())
    }

    async fn send_value(&self, from: Address, to: Address, value: U256) -> Result<H256, SaleError> {
        if self.reject_sends {
            return Err(SaleError::Transaction("user rejected transaction".to_string()));
        }
        self.sent.lock().unwrap().push((from, to, value));
        Ok(H256::from_low_u64_be(self.nonce.fetch_add(1, Ordering::SeqCst) + 1))
    }

    async fn wait_for_receipt(&self, _tx_hash: H256) -> Result<bool, SaleError> {
        match self.outcome {
            ReceiptOutcome::Mined => Ok(true),
            ReceiptOutcome::Reverted => Ok(false),
            ReceiptOutcome::Dropped => Err(SaleError::Transaction("transaction dropped".to_string())),
        }
    }
}

pub fn crowdsale_address() -> Address {
    Address::repeat_byte(0xc5)
}

pub fn token_address() -> Address {
    Address::repeat_byte(0x70)
}

pub fn buyer() -> Address {
    Address::repeat_byte(0xb1)
}

/// A node serving one ERC20 token and its crowdsale, rate 1000 and closing
/// at 2030-01-01.
pub fn sale_chain(abis: &Abis) -> MockChain {
    let token = token_address();
    let crowdsale = crowdsale_address();

    MockChain::new(3)
        .returns(token, &abis.erc20, "name", &[Token::String("ITMan Token".into())])
        .returns(token, &abis.erc20, "symbol", &[Token::String("ITM".into())])
        .returns(token, &abis.erc20, "decimals", &[Token::Uint(U256::from(18))])
        .returns(token, &abis.erc20, "totalSupply", &[Token::Uint(U256::exp10(24))])
        .returns(crowdsale, &abis.crowdsale, "token", &[Token::Address(token)])
        .returns(crowdsale, &abis.crowdsale, "remainingTokens", &[Token::Uint(U256::exp10(21) * 5)])
        .returns(crowdsale, &abis.crowdsale, "rate", &[Token::Uint(U256::from(1000))])
        .returns(crowdsale, &abis.crowdsale, "closingTime", &[Token::Uint(U256::from(1_893_456_000u64))])
}
