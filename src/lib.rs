use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use clap::Parser;
use eyre::Result;
use log::{error, info, warn};
use rocket::response::content::RawHtml;
use rocket::{get, routes, Build, Rocket};
use tokio::task;

pub mod api;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod testing;

use models::AppState;
use utils::abi::Abis;
use utils::config::{Config, WalletMode};
use utils::ethereum::{ChainReader, LocalKeyWallet, NoWallet, NodeWallet, Wallet, Web3Chain};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Crowdsale Desk - token sale front-end API")]
pub struct AppArgs {
    /// Crowdsale contract address (overrides CROWDSALE_ADDRESS)
    #[clap(short, long)]
    pub crowdsale: Option<String>,

    /// JSON-RPC endpoint (overrides HTTP_RPC_URL)
    #[clap(short, long)]
    pub rpc_url: Option<String>,

    /// Don't fetch the sale parameters at startup
    #[clap(long)]
    pub no_initial_fetch: bool,
}

/// Reads the environment, letting command line values win.
pub fn load_config(crowdsale: Option<String>, rpc_url: Option<String>) -> Result<Config> {
    let mut overrides = HashMap::new();
    if let Some(crowdsale) = crowdsale {
        overrides.insert("CROWDSALE_ADDRESS", crowdsale);
    }
    if let Some(rpc_url) = rpc_url {
        overrides.insert("HTTP_RPC_URL", rpc_url);
    }

    let config = Config::from_lookup(|name| overrides.get(name).cloned().or_else(|| env::var(name).ok()))?;
    Ok(config)
}

pub fn connect_wallet(config: &Config, chain: &Web3Chain) -> Result<Arc<dyn Wallet>> {
    let wallet: Arc<dyn Wallet> = match &config.wallet {
        WalletMode::Node => Arc::new(NodeWallet::new(chain.web3(), config.receipt_polling)),
        WalletMode::LocalKey(key) => {
            let wallet = LocalKeyWallet::new(chain.web3(), key, config.receipt_polling)?;
            info!("Using local key wallet {:?}", wallet.address());
            Arc::new(wallet)
        }
        WalletMode::None => {
            warn!("No wallet configured, purchases are disabled");
            Arc::new(NoWallet)
        }
    };
    Ok(wallet)
}

/// Connects to the node and wires the services together.
pub async fn build_state(config: Config) -> Result<AppState> {
    let chain = Web3Chain::connect(&config.rpc_url)?;
    let wallet = connect_wallet(&config, &chain)?;
    let abis = Abis::load(config.abi_dir.as_deref())?;
    info!("Using node {} for crowdsale {:?}", config.rpc_url, config.crowdsale_address);

    let reader: Arc<dyn ChainReader> = Arc::new(chain);
    let expected_chain_id = config.expected_chain_id;
    let state = AppState::new(config, reader.clone(), wallet, abis);

    match reader.chain_id().await {
        Ok(chain_id) => {
            if chain_id != expected_chain_id {
                warn!(
                    "Node is on chain {}, please connect to chain {} for testing",
                    chain_id, expected_chain_id
                );
            }
            state.session.write().await.chain_id = Some(chain_id);
        }
        Err(e) => error!("Could not read chain id: {}", e),
    }

    Ok(state)
}

pub fn build_rocket(state: AppState) -> Rocket<Build> {
    #[get("/")]
    fn index() -> RawHtml<&'static str> {
        RawHtml(include_str!("../static/index.html"))
    }

    rocket::build()
        .mount("/", routes![
            index,
            api::session::get_session,
            api::session::connect,
            api::token::get_token,
            api::token::get_sale_token,
            api::crowdsale::get_crowdsale,
            api::crowdsale::refresh,
            api::crowdsale::quote,
            api::crowdsale::buy,
            api::crowdsale::notifications,
        ])
        .manage(state)
        .configure(rocket::Config::figment().merge(("json.pretty", true)))
}

/// Initializes the application with the given arguments
pub async fn start_app(args: AppArgs) -> Result<Rocket<Build>> {
    info!("Starting application...");

    let config = load_config(args.crowdsale, args.rpc_url)?;
    let state = build_state(config).await?;

    // Initial fetch runs in the background, failures are logged by refresh()
    if !args.no_initial_fetch {
        let sale = state.sale.clone();
        task::spawn(async move {
            if let Ok(snapshot) = sale.refresh().await {
                info!("Loaded crowdsale parameters (rate {})", snapshot.rate);
            }
        });
    }

    Ok(build_rocket(state))
}
