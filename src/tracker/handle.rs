//! Scoped owner of a running tracker
//!
//! `TrackerHandle::spawn` starts the reducer task. Dropping the handle signals
//! shutdown and aborts the reducer. The reducer's own task slots abort the
//! subscription and price tasks on every exit path.

use super::reducer::{Reducer, TrackerChannels, TrackerCommand};
use super::settings::TrackerSettings;
use super::snapshot::TrackerSnapshot;
use crate::bridge::{AccountAggregator, BridgeAddresses};
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::pricing::{PriceCorrelator, PriceSource};
use crate::rpc::AccountSource;
use crate::tokens::TokenRegistry;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub struct TrackerHandle {
    commands: mpsc::UnboundedSender<TrackerCommand>,
    snapshots: watch::Receiver<TrackerSnapshot>,
    shutdown: watch::Sender<bool>,
    addresses: BridgeAddresses,
    task: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    /// Start tracking; the first scan begins immediately
    pub fn spawn(
        source: Arc<dyn AccountSource>,
        registry: Arc<TokenRegistry>,
        prices: Arc<dyn PriceSource>,
        settings: TrackerSettings,
    ) -> Result<Self, BridgeError> {
        let addresses = BridgeAddresses::new(settings.program_id)?;
        logger::debug(
            LogTag::Tracker,
            &format!(
                "Bridge program {} config {}",
                addresses.program_id(),
                addresses.config_address()
            ),
        );

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(TrackerSnapshot::loading());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let reducer = Reducer::new(
            source.clone(),
            AccountAggregator::new(source, addresses),
            PriceCorrelator::new(registry, prices),
            settings,
            TrackerChannels {
                commands: commands_rx,
                snapshots: snapshots_tx,
                shutdown: shutdown_rx,
            },
        );

        Ok(Self {
            commands: commands_tx,
            snapshots: snapshots_rx,
            shutdown: shutdown_tx,
            addresses,
            task: Some(tokio::spawn(reducer.run())),
        })
    }

    pub fn addresses(&self) -> &BridgeAddresses {
        &self.addresses
    }

    /// Latest published state
    pub fn snapshot(&self) -> TrackerSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published change
    pub fn subscribe(&self) -> watch::Receiver<TrackerSnapshot> {
        self.snapshots.clone()
    }

    /// Replace the tracked set with a fresh scan
    pub fn rescan(&self) -> Result<(), BridgeError> {
        self.send(TrackerCommand::Rescan)
    }

    /// Run a price refresh now instead of waiting for the next tick
    pub fn refresh_prices(&self) -> Result<(), BridgeError> {
        self.send(TrackerCommand::RefreshPrices)
    }

    fn send(&self, command: TrackerCommand) -> Result<(), BridgeError> {
        self.commands
            .send(command)
            .map_err(|_| BridgeError::data("tracker", "tracker task has stopped"))
    }

    /// Wait for the first snapshot matching `predicate`
    pub async fn wait_for<F>(&self, mut predicate: F) -> Result<TrackerSnapshot, BridgeError>
    where
        F: FnMut(&TrackerSnapshot) -> bool,
    {
        let mut receiver = self.snapshots.clone();
        let snapshot = receiver
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| BridgeError::data("tracker", "tracker task has stopped"))?;
        Ok(snapshot.clone())
    }

    /// Stop the tracker and wait for every task it owns to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    logger::error(LogTag::Tracker, &format!("Tracker task failed: {}", e));
                }
            }
        }
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{mint_account, proposal_account, registry_with, test_addresses, MockAccountSource, MockPriceSource};
    use crate::bridge::AssetMeta;
    use solana_sdk::pubkey::Pubkey;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    fn eth_address(last: u8) -> [u8; 20] {
        let mut address = [0u8; 20];
        address[19] = last;
        address
    }

    fn key(last: u8) -> String {
        hex::encode(eth_address(last))
    }

    fn mint_for(last: u8, decimals: u8) -> Pubkey {
        let meta = AssetMeta::new(2, eth_address(last).to_vec(), decimals).unwrap();
        test_addresses().wrapped_mint(&meta).unwrap()
    }

    fn settings() -> TrackerSettings {
        let mut settings = TrackerSettings::new(*test_addresses().program_id());
        settings.price_interval = Duration::from_millis(50);
        settings.update_debounce = Duration::from_millis(10);
        settings
    }

    /// Two wrapped assets (0x..0a supply 100, 0x..0b supply 200) and one host-chain proposal
    fn populated_source() -> Arc<MockAccountSource> {
        let source = Arc::new(MockAccountSource::new());
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0a), 8));
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0b), 8));
        source.add_program_account(Pubkey::new_unique(), proposal_account(1, &eth_address(0x0c), 6));
        source.set_account(mint_for(0x0a, 8), mint_account(100, 8));
        source.set_account(mint_for(0x0b, 8), mint_account(200, 8));
        source
    }

    async fn eventually<F: FnMut() -> bool>(mut condition: F) {
        tokio::time::timeout(WAIT, async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_initial_scan_publishes_assets() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();

        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading && s.priced))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(snapshot.external_assets.len(), 2);
        assert_eq!(snapshot.asset(&key(0x0a)).unwrap().amount, 100);
        assert_eq!(snapshot.asset(&key(0x0b)).unwrap().amount, 200);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(source.subscribed_keys().len(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_prices_value_assets_and_total() {
        let source = populated_source();
        let prices = Arc::new(MockPriceSource::new());
        prices.set_price("weth", Some(3.0));

        let registry = registry_with(&[(key(0x0a).as_str(), "WETH", "weth"), (key(0x0b).as_str(), "DAI", "dai")]);
        let handle = TrackerHandle::spawn(source, registry, prices.clone(), settings()).unwrap();

        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| s.priced && s.total_in_usd > 0.0))
            .await
            .unwrap()
            .unwrap();

        // "dai" has no quote, so its multiplier falls back to 1
        assert_eq!(snapshot.asset(&key(0x0a)).unwrap().amount_in_usd, 300.0);
        assert_eq!(snapshot.asset(&key(0x0b)).unwrap().amount_in_usd, 200.0);
        assert_eq!(snapshot.total_in_usd, 500.0);
        assert_eq!(snapshot.asset(&key(0x0a)).unwrap().symbol.as_deref(), Some("WETH"));
        assert_eq!(prices.requests()[0], vec!["dai".to_string(), "weth".to_string()]);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_account_update_changes_single_record() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();

        // Untracked first: updates are applied in order, so once the tracked
        // one shows up the untracked one has been handled
        assert!(source.push_update(Pubkey::new_unique(), mint_account(1, 8), None));
        assert!(source.push_update(mint_for(0x0a, 8), mint_account(5_000, 8), Some(10)));

        let snapshot = tokio::time::timeout(
            WAIT,
            handle.wait_for(|s| s.asset(&key(0x0a)).map(|a| a.amount) == Some(5_000)),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(snapshot.external_assets.len(), 2);
        assert_eq!(snapshot.asset(&key(0x0b)).unwrap().amount, 200);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_steady_updates_do_not_stall_valuation() {
        let source = populated_source();
        let prices = Arc::new(MockPriceSource::new());
        prices.set_price("weth", Some(2.0));
        prices.set_delay(Duration::from_millis(100));

        let registry = registry_with(&[(key(0x0a).as_str(), "WETH", "weth")]);
        let handle = TrackerHandle::spawn(source.clone(), registry, prices.clone(), settings()).unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();

        // Supply changes arrive faster than one price round trip
        let pusher = {
            let source = source.clone();
            tokio::spawn(async move {
                for supply in 101u64.. {
                    source.push_update(mint_for(0x0a, 8), mint_account(supply, 8), None);
                    tokio::time::sleep(Duration::from_millis(40)).await;
                }
            })
        };

        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| s.priced && s.total_in_usd > 0.0))
            .await
            .unwrap()
            .unwrap();
        pusher.abort();

        assert!(snapshot.asset(&key(0x0a)).unwrap().amount_in_usd >= 200.0);
        assert!(prices.request_count() >= 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_resubscribe_rereads_missed_supply() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();

        // Supply moved while the stream was down; no notification for it
        source.set_account(mint_for(0x0a, 8), mint_account(777, 8));
        assert!(source.push_resubscribed());

        let snapshot = tokio::time::timeout(
            WAIT,
            handle.wait_for(|s| s.asset(&key(0x0a)).map(|a| a.amount) == Some(777)),
        )
        .await
        .unwrap()
        .unwrap();

        assert_eq!(snapshot.asset(&key(0x0b)).unwrap().amount, 200);
        assert_eq!(snapshot.generation, 1);
        assert_eq!(source.scan_calls(), 1);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_price_failure_keeps_schedule() {
        let source = populated_source();
        let prices = Arc::new(MockPriceSource::new());
        prices.set_price("weth", Some(2.0));
        prices.fail_next(1);

        let registry = registry_with(&[(key(0x0a).as_str(), "WETH", "weth")]);
        let handle = TrackerHandle::spawn(source, registry, prices.clone(), settings()).unwrap();

        let snapshot = tokio::time::timeout(
            WAIT,
            handle.wait_for(|s| s.asset(&key(0x0a)).map(|a| a.amount_in_usd) == Some(200.0)),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(prices.request_count() >= 2);
        assert_eq!(snapshot.total_in_usd, 200.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_scan_failure_surfaces_not_loading() {
        let source = populated_source();
        source.fail_next_scans(1);

        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();

        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| s.generation == 1 && !s.loading))
            .await
            .unwrap()
            .unwrap();
        assert!(snapshot.external_assets.is_empty());

        handle.rescan().unwrap();
        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| s.generation == 2 && !s.loading))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.external_assets.len(), 2);
        assert_eq!(source.scan_calls(), 2);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_rescan_replaces_assets_and_subscriptions() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();

        source.clear_program_accounts();
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0d), 18));
        handle.rescan().unwrap();

        let snapshot = tokio::time::timeout(WAIT, handle.wait_for(|s| s.generation == 2 && !s.loading))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(snapshot.external_assets.len(), 1);
        assert_eq!(snapshot.external_assets[0].address, key(0x0d));
        assert_eq!(snapshot.external_assets[0].mint_address, Some(mint_for(0x0d, 9)));
        // Mint account does not exist yet
        assert_eq!(snapshot.external_assets[0].amount, 0);
        assert_eq!(source.subscribed_keys(), vec![mint_for(0x0d, 9)]);
        eventually(|| source.live_subscriptions() == 1).await;

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_releases_subscriptions() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(source.live_subscriptions(), 1);

        let receiver = handle.subscribe();
        handle.shutdown().await;

        eventually(|| source.live_subscriptions() == 0).await;
        assert!(receiver.has_changed().is_err());
    }

    #[tokio::test]
    async fn test_drop_releases_subscriptions() {
        let source = populated_source();
        let handle = TrackerHandle::spawn(
            source.clone(),
            registry_with(&[]),
            Arc::new(MockPriceSource::new()),
            settings(),
        )
        .unwrap();
        tokio::time::timeout(WAIT, handle.wait_for(|s| !s.loading))
            .await
            .unwrap()
            .unwrap();

        drop(handle);
        eventually(|| source.live_subscriptions() == 0).await;
        eventually(|| !source.push_update(mint_for(0x0a, 8), mint_account(1, 8), None)).await;
    }
}
