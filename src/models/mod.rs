use std::sync::Arc;

use tokio::sync::RwLock;

use crate::services::crowdsale::CrowdsaleService;
use crate::services::notify::NotificationFeed;
use crate::services::token_info::TokenInfoQuery;
use crate::utils::abi::Abis;
use crate::utils::config::Config;
use crate::utils::ethereum::{ChainReader, Wallet};

pub mod crowdsale;
pub mod session;
pub mod token;

use session::Session;

/// Shared by every route.
pub struct AppState {
    pub config: Config,
    pub session: RwLock<Session>,
    pub tokens: TokenInfoQuery,
    pub sale: CrowdsaleService,
    pub wallet: Arc<dyn Wallet>,
    pub notifications: Arc<NotificationFeed>,
}

impl AppState {
    pub fn new(config: Config, reader: Arc<dyn ChainReader>, wallet: Arc<dyn Wallet>, abis: Abis) -> Self {
        let notifications = Arc::new(NotificationFeed::default());
        let sale = CrowdsaleService::new(
            config.crowdsale_address,
            reader.clone(),
            wallet.clone(),
            notifications.clone(),
            abis.crowdsale.clone(),
        );

        Self {
            config,
            session: RwLock::new(Session::default()),
            tokens: TokenInfoQuery::new(reader, abis.erc20),
            sale,
            wallet,
            notifications,
        }
    }
}
