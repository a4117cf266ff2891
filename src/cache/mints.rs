//! Mint state cache
//!
//! Holds the latest decoded state of every tracked wrapped mint. Filled by a
//! batch fetch after each scan, then kept current by account subscriptions
//! and re-read in full after a subscription reconnects. Each rescan starts a
//! fresh cache; there is no TTL.

use crate::bridge::MintInfo;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::rpc::{AccountEvent, AccountSource, AccountUpdate};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

struct CacheEntry {
    value: MintInfo,
    /// Slot of the notification that produced this value, when known
    slot: Option<u64>,
}

impl CacheEntry {
    fn new(value: MintInfo, slot: Option<u64>) -> Self {
        Self { value, slot }
    }

    fn is_newer(&self, slot: Option<u64>) -> bool {
        match (self.slot, slot) {
            (Some(current), Some(incoming)) => incoming >= current,
            _ => true,
        }
    }
}

/// Cache metrics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMetrics {
    pub inserts: u64,
    pub updates: u64,
    /// Accounts whose bytes did not decode as a mint
    pub decode_failures: u64,
    /// Notifications older than the cached state
    pub stale_updates: u64,
}

#[derive(Default)]
pub struct MintCache {
    entries: HashMap<Pubkey, CacheEntry>,
    metrics: CacheMetrics,
}

impl MintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch and decode `addresses`; absent or undecodable accounts are left out
    pub async fn fetch_batch(
        &mut self,
        source: &dyn AccountSource,
        addresses: &[Pubkey],
    ) -> Result<HashMap<Pubkey, MintInfo>, BridgeError> {
        let accounts = source.get_multiple_accounts(addresses).await?;
        let mut fetched = HashMap::with_capacity(addresses.len());

        for (address, account) in addresses.iter().zip(accounts) {
            let Some(account) = account else {
                logger::debug(LogTag::Cache, &format!("Mint {} does not exist yet", address));
                continue;
            };

            match MintInfo::decode(&account.data) {
                Ok(mint) => {
                    self.entries.insert(*address, CacheEntry::new(mint.clone(), None));
                    self.metrics.inserts += 1;
                    fetched.insert(*address, mint);
                }
                Err(e) => {
                    self.metrics.decode_failures += 1;
                    logger::warning(LogTag::Cache, &format!("Mint {} not decodable: {}", address, e));
                }
            }
        }

        logger::debug(
            LogTag::Cache,
            &format!("Fetched {}/{} mint accounts", fetched.len(), addresses.len()),
        );
        Ok(fetched)
    }

    /// Decode a pushed account change and replace the cached value
    ///
    /// Returns `Ok(None)` when the notification is older than what is cached.
    pub fn apply_update(&mut self, update: &AccountUpdate) -> Result<Option<MintInfo>, BridgeError> {
        let mint = MintInfo::decode(&update.account.data).map_err(|e| {
            self.metrics.decode_failures += 1;
            e
        })?;

        if let Some(entry) = self.entries.get(&update.pubkey) {
            if !entry.is_newer(update.slot) {
                self.metrics.stale_updates += 1;
                return Ok(None);
            }
        }

        self.entries
            .insert(update.pubkey, CacheEntry::new(mint.clone(), update.slot));
        self.metrics.updates += 1;
        Ok(Some(mint))
    }

    pub fn get(&self, address: &Pubkey) -> Option<&MintInfo> {
        self.entries.get(address).map(|entry| &entry.value)
    }

    /// Start pushing changes of `addresses` into `updates`
    pub async fn subscribe(
        source: &dyn AccountSource,
        addresses: Vec<Pubkey>,
        updates: mpsc::UnboundedSender<AccountEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, BridgeError> {
        logger::debug(
            LogTag::Cache,
            &format!("Subscribing to {} mint accounts", addresses.len()),
        );
        source.subscribe_accounts(addresses, updates, shutdown).await
    }

    pub fn metrics(&self) -> CacheMetrics {
        self.metrics.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
