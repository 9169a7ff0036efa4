use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;
use web3::types::H256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Pending,
    Success,
    Failure,
}

/// One step of a transaction's lifecycle, shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub tx_hash: Option<H256>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn pending(tx_hash: H256) -> Self {
        Self::new(
            NotificationKind::Pending,
            Some(tx_hash),
            "Transaction submitted. Wait for confirmation...",
        )
    }

    pub fn success(tx_hash: H256) -> Self {
        Self::new(NotificationKind::Success, Some(tx_hash), "Transaction confirmed!")
    }

    pub fn failure(tx_hash: Option<H256>) -> Self {
        Self::new(NotificationKind::Failure, tx_hash, "Transaction failed!")
    }

    fn new(kind: NotificationKind, tx_hash: Option<H256>, message: &str) -> Self {
        Self {
            kind,
            tx_hash,
            message: message.to_string(),
            at: Utc::now(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Keeps the most recent notifications and mirrors each one to the log.
pub struct NotificationFeed {
    capacity: usize,
    entries: Mutex<VecDeque<Notification>>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Newest first.
    pub fn recent(&self) -> Vec<Notification> {
        self.lock_entries().iter().rev().cloned().collect()
    }

    // A panic while holding the lock leaves whole entries behind, so the
    // queue stays usable after poisoning
    fn lock_entries(&self) -> MutexGuard<'_, VecDeque<Notification>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            error!("Notification feed lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Notifier for NotificationFeed {
    fn notify(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Failure => error!("{} ({:?})", notification.message, notification.tx_hash),
            _ => info!("{} ({:?})", notification.message, notification.tx_hash),
        }

        let mut entries = self.lock_entries();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(notification);
    }
}
