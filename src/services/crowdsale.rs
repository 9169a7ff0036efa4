use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use ethabi::Contract;
use futures::try_join;
use log::{error, warn};
use tokio::sync::RwLock;
use web3::types::{Address, H256};

use crate::error::SaleError;
use crate::models::crowdsale::{Confirmation, CrowdsaleSnapshot, PurchaseOutcome, Quote};
use crate::models::session::Session;
use crate::services::notify::{Notification, Notifier};
use crate::utils::abi::{call_view, expect_address, expect_uint};
use crate::utils::ethereum::{ChainReader, Wallet};

/// Reads the sale parameters of one crowdsale contract and buys from it.
///
/// Cloning is cheap and every clone shares the same snapshot, so a clone can
/// be moved into the task that waits for a purchase to be mined.
#[derive(Clone)]
pub struct CrowdsaleService {
    crowdsale: Address,
    reader: Arc<dyn ChainReader>,
    wallet: Arc<dyn Wallet>,
    notifier: Arc<dyn Notifier>,
    abi: Arc<Contract>,
    generation: Arc<AtomicU64>,
    latest: Arc<RwLock<Option<CrowdsaleSnapshot>>>,
}

impl CrowdsaleService {
    pub fn new(
        crowdsale: Address,
        reader: Arc<dyn ChainReader>,
        wallet: Arc<dyn Wallet>,
        notifier: Arc<dyn Notifier>,
        abi: Arc<Contract>,
    ) -> Self {
        Self {
            crowdsale,
            reader,
            wallet,
            notifier,
            abi,
            generation: Arc::new(AtomicU64::new(0)),
            latest: Arc::new(RwLock::new(None)),
        }
    }

    pub fn crowdsale_address(&self) -> Address {
        self.crowdsale
    }

    /// Latest snapshot, if one was ever fetched.
    pub async fn snapshot(&self) -> Option<CrowdsaleSnapshot> {
        self.latest.read().await.clone()
    }

    /// Fetches `token`, `remainingTokens`, `rate` and `closingTime` together
    /// and returns the newest snapshot known afterwards.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<CrowdsaleSnapshot, SaleError> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        warn!("Fetching crowdsale info for {:?} (generation {})", self.crowdsale, generation);

        let reader = &*self.reader;
        let fetched = try_join!(
            call_view(reader, &self.abi, self.crowdsale, "token"),
            call_view(reader, &self.abi, self.crowdsale, "remainingTokens"),
            call_view(reader, &self.abi, self.crowdsale, "rate"),
            call_view(reader, &self.abi, self.crowdsale, "closingTime"),
        );

        let snapshot = fetched.and_then(|(token, remaining, rate, closing)| {
            Ok(CrowdsaleSnapshot {
                generation,
                crowdsale: self.crowdsale,
                token_address: expect_address(token, "token")?,
                remaining_tokens: expect_uint(remaining, "remainingTokens")?,
                rate: expect_uint(rate, "rate")?,
                closing_time: expect_uint(closing, "closingTime")?,
                fetched_at: Utc::now(),
            })
        });

        match snapshot {
            Ok(snapshot) => Ok(self.accept(snapshot).await),
            Err(e) => {
                error!("Failed to fetch crowdsale info (generation {}): {}", generation, e);
                Err(e)
            }
        }
    }

    // Stores `snapshot` unless a later-issued fetch already landed
    async fn accept(&self, snapshot: CrowdsaleSnapshot) -> CrowdsaleSnapshot {
        let mut latest = self.latest.write().await;
        match latest.as_ref() {
            Some(current) if current.generation > snapshot.generation => {
                warn!(
                    "Discarding crowdsale snapshot generation {}, generation {} is newer",
                    snapshot.generation, current.generation
                );
                current.clone()
            }
            _ => {
                *latest = Some(snapshot.clone());
                snapshot
            }
        }
    }

    /// Prices `quantity` tokens against the latest snapshot's rate.
    pub async fn quote(&self, quantity: u32) -> Result<Quote, SaleError> {
        let snapshot = self.snapshot().await.ok_or(SaleError::NoSnapshot)?;
        Quote::new(snapshot.rate, quantity)
    }

    /// Buys `quantity` tokens by sending ether to the crowdsale contract.
    ///
    /// Without a connected account this only asks the wallet for accounts
    /// and returns; the caller has to connect the session and buy again.
    /// Every call that gets past that check sends its own transaction.
    pub async fn buy(&self, session: &Session, quantity: u32) -> Result<PurchaseOutcome, SaleError> {
        let account = match session.account {
            Some(account) => account,
            None => {
                let accounts = self.wallet.request_accounts().await.map_err(|e| {
                    error!("Wallet connection request failed: {}", e);
                    e
                })?;
                return Ok(PurchaseOutcome::ConnectionRequested { accounts });
            }
        };

        let quote = self.quote(quantity).await?;
        warn!(
            "txParams from={:?} to={:?} value={} (quantity {})",
            account, self.crowdsale, quote.value_wei, quantity
        );

        let tx_hash = match self.wallet.send_value(account, self.crowdsale, quote.value_wei).await {
            Ok(tx_hash) => tx_hash,
            Err(e) => {
                error!("Failed to submit purchase: {}", e);
                self.notifier.notify(Notification::failure(None));
                return Err(e);
            }
        };

        self.notifier.notify(Notification::pending(tx_hash));
        let service = self.clone();
        let confirmation = tokio::spawn(async move { service.confirm(tx_hash).await });

        Ok(PurchaseOutcome::Submitted {
            tx_hash,
            quote,
            confirmation,
        })
    }

    async fn confirm(&self, tx_hash: H256) -> Confirmation {
        match self.wallet.wait_for_receipt(tx_hash).await {
            Ok(true) => {
                self.notifier.notify(Notification::success(tx_hash));
                // refresh() already logs its own failure
                Confirmation::Confirmed(self.refresh().await.ok())
            }
            Ok(false) => {
                error!("Purchase {:?} reverted", tx_hash);
                self.notifier.notify(Notification::failure(Some(tx_hash)));
                Confirmation::Failed("transaction reverted".to_string())
            }
            Err(e) => {
                error!("Purchase {:?} failed: {}", tx_hash, e);
                self.notifier.notify(Notification::failure(Some(tx_hash)));
                Confirmation::Failed(e.to_string())
            }
        }
    }
}
