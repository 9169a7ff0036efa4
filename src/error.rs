use thiserror::Error;

/// Everything that can go wrong between this service, the node and the wallet.
///
/// Failures are not split into transient and permanent ones: nothing here is
/// retried automatically.
#[derive(Debug, Error)]
pub enum SaleError {
    #[error("Contract read failed: {0}")]
    Read(String),

    #[error("ABI error: {0}")]
    Abi(#[from] ethabi::Error),

    #[error("Missing wallet. Install MetaMask (https://metamask.io/) or configure WALLET_PRIVATE_KEY")]
    WalletUnavailable,

    #[error("Transaction failed: {0}")]
    Transaction(String),

    #[error("Crowdsale parameters have not been fetched yet")]
    NoSnapshot,

    #[error("Invalid sale rate: {0}")]
    InvalidRate(String),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("Quantity {0} is outside the allowed range 0..={1}")]
    QuantityOutOfRange(u32, u32),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
