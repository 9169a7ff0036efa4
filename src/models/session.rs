use serde::Serialize;
use web3::types::Address;

use crate::error::SaleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Error,
    Connecting,
}

/// Wallet session handed to the purchase flow. Owned by whoever serves the
/// user, never global.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub last_error: Option<String>,
}

impl Session {
    pub fn status(&self) -> ConnectionStatus {
        if self.account.is_some() {
            ConnectionStatus::Active
        } else if self.last_error.is_some() {
            ConnectionStatus::Error
        } else {
            ConnectionStatus::Connecting
        }
    }

    /// Adopts the first account the wallet handed out.
    pub fn connect(&mut self, accounts: &[Address]) {
        match accounts.first() {
            Some(account) => {
                self.account = Some(*account);
                self.last_error = None;
            }
            None => self.last_error = Some("wallet returned no accounts".to_string()),
        }
    }

    pub fn fail(&mut self, error: &SaleError) {
        self.account = None;
        self.last_error = Some(error.to_string());
    }

    /// True unless the session is known to be on `expected`.
    pub fn wrong_network(&self, expected: u64) -> bool {
        self.chain_id != Some(expected)
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub account: Option<Address>,
    pub chain_id: Option<u64>,
    pub status: ConnectionStatus,
    pub wrong_network: bool,
    pub error: Option<String>,
}

impl SessionView {
    pub fn new(session: &Session, expected_chain_id: u64) -> Self {
        Self {
            account: session.account,
            chain_id: session.chain_id,
            status: session.status(),
            wrong_network: session.wrong_network(expected_chain_id),
            error: session.last_error.clone(),
        }
    }
}
