use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::time::Instant;
use secp256k1::SecretKey;
use web3::signing::{Key, SecretKeyRef};
use web3::transports::Http;
use web3::types::{Address, Bytes, CallRequest, TransactionParameters, TransactionRequest, H256, U256, U64};
use web3::{Transport, Web3};

use crate::error::SaleError;

/// Read side of a node: contract calls and network identity.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, SaleError>;

    async fn chain_id(&self) -> Result<u64, SaleError>;
}

/// Something that can hand out accounts and sign value transfers for them.
#[async_trait]
pub trait Wallet: Send + Sync {
    /// Asks the wallet to expose its accounts (`eth_requestAccounts`).
    async fn request_accounts(&self) -> Result<Vec<Address>, SaleError>;

    /// Sends `value` wei from `from` to `to` with empty calldata.
    async fn send_value(&self, from: Address, to: Address, value: U256) -> Result<H256, SaleError>;

    /// Waits until the transaction is mined. `Ok(false)` means it reverted.
    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<bool, SaleError>;
}

/// How long to keep polling for a receipt.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptPolling {
    pub interval: Duration,
    pub timeout: Duration,
}

pub struct Web3Chain {
    web3: Web3<Http>,
}

impl Web3Chain {
    pub fn new(web3: Web3<Http>) -> Self {
        Self { web3 }
    }

    pub fn connect(rpc_url: &str) -> Result<Self, SaleError> {
        let transport = Http::new(rpc_url).map_err(|e| SaleError::Config(e.to_string()))?;
        Ok(Self::new(Web3::new(transport)))
    }

    pub fn web3(&self) -> Web3<Http> {
        self.web3.clone()
    }
}

#[async_trait]
impl ChainReader for Web3Chain {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, SaleError> {
        let request = CallRequest {
            to: Some(to),
            data: Some(Bytes(data)),
            ..Default::default()
        };
        let output = self
            .web3
            .eth()
            .call(request, None)
            .await
            .map_err(|e| SaleError::Read(e.to_string()))?;
        Ok(output.0)
    }

    async fn chain_id(&self) -> Result<u64, SaleError> {
        let id = self
            .web3
            .eth()
            .chain_id()
            .await
            .map_err(|e| SaleError::Read(e.to_string()))?;
        Ok(id.low_u64())
    }
}

async fn poll_receipt(web3: &Web3<Http>, tx_hash: H256, polling: ReceiptPolling) -> Result<bool, SaleError> {
    let started = Instant::now();
    loop {
        match web3.eth().transaction_receipt(tx_hash).await {
            // Receipts without a status field predate Byzantium and only exist for mined txs
            Ok(Some(receipt)) => return Ok(receipt.status.map_or(true, |status| status == U64::from(1))),
            Ok(None) => debug!("No receipt yet for {:?}", tx_hash),
            Err(e) => return Err(SaleError::Transaction(e.to_string())),
        }

        if started.elapsed() >= polling.timeout {
            return Err(SaleError::Transaction(format!(
                "no receipt for {:?} after {}s",
                tx_hash,
                polling.timeout.as_secs()
            )));
        }
        tokio::time::sleep(polling.interval).await;
    }
}

/// Wallet backed by accounts the node manages itself, the server-side
/// counterpart of a browser-injected provider.
pub struct NodeWallet {
    web3: Web3<Http>,
    polling: ReceiptPolling,
}

impl NodeWallet {
    pub fn new(web3: Web3<Http>, polling: ReceiptPolling) -> Self {
        Self { web3, polling }
    }
}

#[async_trait]
impl Wallet for NodeWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SaleError> {
        let value = self
            .web3
            .transport()
            .execute("eth_requestAccounts", vec![])
            .await
            .map_err(|e| SaleError::Transaction(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| SaleError::Transaction(e.to_string()))
    }

    async fn send_value(&self, from: Address, to: Address, value: U256) -> Result<H256, SaleError> {
        let request = TransactionRequest {
            from,
            to: Some(to),
            value: Some(value),
            ..Default::default()
        };
        self.web3
            .eth()
            .send_transaction(request)
            .await
            .map_err(|e| SaleError::Transaction(e.to_string()))
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<bool, SaleError> {
        poll_receipt(&self.web3, tx_hash, self.polling).await
    }
}

/// Wallet holding a single private key; transactions are signed locally and
/// relayed with `eth_sendRawTransaction`.
pub struct LocalKeyWallet {
    web3: Web3<Http>,
    key: SecretKey,
    address: Address,
    polling: ReceiptPolling,
}

impl LocalKeyWallet {
    pub fn new(web3: Web3<Http>, private_key: &str, polling: ReceiptPolling) -> Result<Self, SaleError> {
        let raw = hex::decode(private_key.trim().trim_start_matches("0x"))
            .map_err(|e| SaleError::Config(format!("private key is not hex: {}", e)))?;
        let key = SecretKey::from_slice(&raw)
            .map_err(|e| SaleError::Config(format!("invalid private key: {}", e)))?;
        let address = SecretKeyRef::new(&key).address();

        Ok(Self {
            web3,
            key,
            address,
            polling,
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }
}

#[async_trait]
impl Wallet for LocalKeyWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SaleError> {
        Ok(vec![self.address])
    }

    async fn send_value(&self, from: Address, to: Address, value: U256) -> Result<H256, SaleError> {
        if from != self.address {
            return Err(SaleError::Transaction(format!(
                "account {:?} is not managed by this wallet",
                from
            )));
        }

        let estimate = CallRequest {
            from: Some(from),
            to: Some(to),
            value: Some(value),
            ..Default::default()
        };
        let gas = self
            .web3
            .eth()
            .estimate_gas(estimate, None)
            .await
            .map_err(|e| SaleError::Transaction(e.to_string()))?;

        let params = TransactionParameters {
            to: Some(to),
            value,
            gas,
            ..Default::default()
        };
        let signed = self
            .web3
            .accounts()
            .sign_transaction(params, &self.key)
            .await
            .map_err(|e| SaleError::Transaction(e.to_string()))?;

        warn!("Relaying signed transaction {:?}", signed.transaction_hash);
        self.web3
            .eth()
            .send_raw_transaction(signed.raw_transaction)
            .await
            .map_err(|e| SaleError::Transaction(e.to_string()))
    }

    async fn wait_for_receipt(&self, tx_hash: H256) -> Result<bool, SaleError> {
        poll_receipt(&self.web3, tx_hash, self.polling).await
    }
}

/// Stand-in used when no wallet is configured; every wallet operation fails
/// with [`SaleError::WalletUnavailable`].
pub struct NoWallet;

#[async_trait]
impl Wallet for NoWallet {
    async fn request_accounts(&self) -> Result<Vec<Address>, SaleError> {
        Err(SaleError::WalletUnavailable)
    }

    async fn send_value(&self, _from: Address, _to: Address, _value: U256) -> Result<H256, SaleError> {
        Err(SaleError::WalletUnavailable)
    }

    async fn wait_for_receipt(&self, _tx_hash: H256) -> Result<bool, SaleError> {
        Err(SaleError::WalletUnavailable)
    }
}
