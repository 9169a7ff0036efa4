use rocket::http::Status;
use rocket::serde::json::serde_json::json;
use rocket::serde::json::{Json, Value};

use crate::error::SaleError;

pub mod crowdsale;
pub mod session;
pub mod token;

pub type ApiResponse = (Status, Json<Value>);

// Maps a failure onto an HTTP status and a JSON error body
pub fn error_response(error: &SaleError) -> ApiResponse {
    let status = match error {
        SaleError::InvalidQuantity(_) | SaleError::QuantityOutOfRange(..) | SaleError::InvalidAddress(_) => {
            Status::BadRequest
        }
        SaleError::NoSnapshot | SaleError::WalletUnavailable => Status::ServiceUnavailable,
        SaleError::Read(_) | SaleError::Transaction(_) | SaleError::InvalidRate(_) => Status::BadGateway,
        SaleError::Abi(_) | SaleError::Config(_) => Status::InternalServerError,
    };

    (
        status,
        Json(json!({
            "error": status.reason().unwrap_or("Error"),
            "details": error.to_string(),
        })),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rocket::local::asynchronous::Client;
    use web3::types::Address;

    use crate::models::AppState;
    use crate::testing::{buyer, sale_chain, MockChain, MockWallet, ReceiptOutcome};
    use crate::utils::abi::Abis;
    use crate::utils::config::Config;
    use crate::utils::ethereum::{NoWallet, Wallet};

    pub struct ClientOptions {
        pub without_wallet: bool,
        pub outcome: ReceiptOutcome,
    }

    impl Default for ClientOptions {
        fn default() -> Self {
            Self {
                without_wallet: false,
                outcome: ReceiptOutcome::Mined,
            }
        }
    }

    /// Rocket client over the in-memory chain, plus the wallet double it uses.
    pub async fn client(options: ClientOptions) -> (Client, Arc<MockWallet>) {
        let (client, wallet, _) = client_with_chain(options).await;
        (client, wallet)
    }

    pub async fn client_with_chain(options: ClientOptions) -> (Client, Arc<MockWallet>, Arc<MockChain>) {
        let abis = Abis::embedded().unwrap();
        let config = Config::from_lookup(|name| match name {
            "CROWDSALE_ADDRESS" => Some("0xc5c5c5c5c5c5c5c5c5c5c5c5c5c5c5c5c5c5c5c5".to_string()),
            _ => None,
        })
        .unwrap();

        let mock_wallet = Arc::new(MockWallet::new(vec![buyer()], options.outcome));
        let wallet: Arc<dyn Wallet> = if options.without_wallet {
            Arc::new(NoWallet)
        } else {
            mock_wallet.clone()
        };

        let chain = Arc::new(sale_chain(&abis));
        let state = AppState::new(config, chain.clone(), wallet, abis);
        let client = Client::tracked(crate::build_rocket(state)).await.unwrap();
        (client, mock_wallet, chain)
    }

    /// Polls until `at` has seen `expected` calls, for reads issued by spawned tasks.
    pub async fn wait_for_calls(chain: &MockChain, at: Address, expected: usize) -> usize {
        for _ in 0..50 {
            if chain.calls_to(at) >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        chain.calls_to(at)
    }
}
