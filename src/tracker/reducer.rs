//! Tracker reducer
//!
//! A single task owns the record map and the mint cache. Everything that
//! changes them arrives as a message:
//! - commands from the `TrackerHandle` (rescan, refresh prices)
//! - account events from the subscription task
//! - price results from the one in-flight price task
//!
//! Two optional deadlines drive the timers (next price refresh, next rescan).
//! Replacing a deadline is how a scheduled refresh gets cancelled. A running
//! price task is only aborted by a rescan; supply changes that arrive while it
//! runs mark the valuation dirty and the follow-up is scheduled when it reports.

use super::settings::TrackerSettings;
use super::snapshot::TrackerSnapshot;
use super::tasks::TaskSlot;
use crate::apis::SimplePriceResponse;
use crate::bridge::{AccountAggregator, MintInfo, ScanResult, WrappedAssetRecord};
use crate::cache::MintCache;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::pricing::{PriceCorrelator, PriceRequest};
use crate::rpc::{AccountEvent, AccountSource, AccountUpdate};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerCommand {
    Rescan,
    RefreshPrices,
}

/// Result of one price task, tagged with the scan generation it priced
pub struct PricesFetched {
    generation: u64,
    request: PriceRequest,
    result: Result<SimplePriceResponse, BridgeError>,
}

// ============================================================================
// STATE
// ============================================================================

/// Authoritative tracker state; only the reducer task touches it
#[derive(Default)]
pub struct TrackerState {
    records: HashMap<String, WrappedAssetRecord>,
    by_mint: HashMap<Pubkey, String>,
    cache: MintCache,
    total_in_usd: f64,
    generation: u64,
    loading: bool,
    priced: bool,
}

impl TrackerState {
    pub fn snapshot(&self) -> TrackerSnapshot {
        TrackerSnapshot::from_records(
            &self.records,
            self.total_in_usd,
            self.generation,
            self.loading,
            self.priced,
        )
    }

    /// Replace the record set wholesale with a fresh scan and its mint states
    ///
    /// A mint index entry without its record fails with `MissingDerivedKey`
    /// and leaves the current record set untouched.
    pub fn replace(
        &mut self,
        mut scan: ScanResult,
        mints: &HashMap<Pubkey, MintInfo>,
    ) -> Result<(), BridgeError> {
        for mint in scan.mint_addresses() {
            let record = scan.record_for_mint_mut(&mint)?;
            if let Some(info) = mints.get(&mint) {
                record.apply_mint_state(info);
            }
        }

        self.records = scan.assets;
        self.by_mint = scan.by_mint;
        self.total_in_usd = PriceCorrelator::total_in_usd(&self.records);
        Ok(())
    }

    /// Overwrite tracked records with re-read mint states
    ///
    /// Returns how many supplies changed.
    pub fn apply_mint_states(&mut self, mints: &HashMap<Pubkey, MintInfo>) -> usize {
        let mut changed = 0;
        for (mint, info) in mints {
            let Some(record) = self
                .by_mint
                .get(mint)
                .and_then(|key| self.records.get_mut(key))
            else {
                continue;
            };
            if record.amount != info.supply {
                changed += 1;
            }
            record.apply_mint_state(info);
        }
        changed
    }

    /// Apply a mint change to the record it targets; untracked mints are ignored
    ///
    /// Returns true when a record changed.
    pub fn apply_account_update(&mut self, update: &AccountUpdate) -> bool {
        let Some(key) = self.by_mint.get(&update.pubkey) else {
            logger::debug(
                LogTag::Tracker,
                &format!("Update for untracked mint {} ignored", update.pubkey),
            );
            return false;
        };

        let mint = match self.cache.apply_update(update) {
            Ok(Some(mint)) => mint,
            Ok(None) => return false,
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Dropping update for {}: {}", update.pubkey, e),
                );
                return false;
            }
        };

        match self.records.get_mut(key) {
            Some(record) => {
                record.apply_mint_state(&mint);
                logger::debug(
                    LogTag::Tracker,
                    &format!("Supply of {} is now {}", key, mint.supply),
                );
                true
            }
            None => false,
        }
    }

    pub fn records(&self) -> &HashMap<String, WrappedAssetRecord> {
        &self.records
    }
}

// ============================================================================
// REDUCER
// ============================================================================

pub struct TrackerChannels {
    pub commands: mpsc::UnboundedReceiver<TrackerCommand>,
    pub snapshots: watch::Sender<TrackerSnapshot>,
    pub shutdown: watch::Receiver<bool>,
}

pub struct Reducer {
    source: Arc<dyn AccountSource>,
    aggregator: AccountAggregator,
    correlator: PriceCorrelator,
    settings: TrackerSettings,
    state: TrackerState,

    commands: mpsc::UnboundedReceiver<TrackerCommand>,
    snapshots: watch::Sender<TrackerSnapshot>,
    shutdown: watch::Receiver<bool>,
    updates_tx: mpsc::UnboundedSender<AccountEvent>,
    updates_rx: mpsc::UnboundedReceiver<AccountEvent>,
    prices_tx: mpsc::UnboundedSender<PricesFetched>,
    prices_rx: mpsc::UnboundedReceiver<PricesFetched>,

    subscription: TaskSlot,
    price_task: TaskSlot,
    price_in_flight: bool,
    /// Supplies changed while the price task was running
    prices_dirty: bool,
    price_deadline: Option<Instant>,
    rescan_deadline: Option<Instant>,
}

/// Sleep until the deadline, or forever when there is none
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

impl Reducer {
    pub fn new(
        source: Arc<dyn AccountSource>,
        aggregator: AccountAggregator,
        correlator: PriceCorrelator,
        settings: TrackerSettings,
        channels: TrackerChannels,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let (prices_tx, prices_rx) = mpsc::unbounded_channel();

        Self {
            source,
            aggregator,
            correlator,
            settings,
            state: TrackerState::default(),
            commands: channels.commands,
            snapshots: channels.snapshots,
            shutdown: channels.shutdown,
            updates_tx,
            updates_rx,
            prices_tx,
            prices_rx,
            subscription: TaskSlot::default(),
            price_task: TaskSlot::default(),
            price_in_flight: false,
            prices_dirty: false,
            price_deadline: None,
            rescan_deadline: None,
        }
    }

    pub async fn run(mut self) {
        logger::info(LogTag::Tracker, "Tracker started");

        if self.rescan_until_shutdown().await {
            loop {
                if *self.shutdown.borrow() {
                    break;
                }

                let price_deadline = self.price_deadline;
                let rescan_deadline = self.rescan_deadline;

                tokio::select! {
                    _ = self.shutdown.changed() => break,
                    Some(command) = self.commands.recv() => {
                        match command {
                            TrackerCommand::Rescan => {
                                if !self.rescan_until_shutdown().await {
                                    break;
                                }
                            }
                            TrackerCommand::RefreshPrices => self.start_price_refresh(),
                        }
                    }
                    Some(event) = self.updates_rx.recv() => {
                        match event {
                            AccountEvent::Changed(update) => self.handle_update(update),
                            AccountEvent::Resubscribed => {
                                if !self.resync_until_shutdown().await {
                                    break;
                                }
                            }
                        }
                    }
                    Some(fetched) = self.prices_rx.recv() => self.handle_prices(fetched),
                    _ = sleep_until(price_deadline) => self.start_price_refresh(),
                    _ = sleep_until(rescan_deadline) => {
                        if !self.rescan_until_shutdown().await {
                            break;
                        }
                    }
                }
            }
        }

        self.subscription.abort();
        self.price_task.abort();
        logger::info(LogTag::Tracker, "Tracker stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.snapshot());
    }

    /// Returns false when shutdown interrupted the scan
    async fn rescan_until_shutdown(&mut self) -> bool {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow_and_update() {
            return false;
        }

        tokio::select! {
            _ = self.rescan() => true,
            _ = shutdown.changed() => false,
        }
    }

    async fn rescan(&mut self) {
        self.price_task.abort();
        self.price_in_flight = false;
        self.prices_dirty = false;
        self.price_deadline = None;
        self.rescan_deadline = None;

        self.state.generation += 1;
        self.state.loading = true;
        self.state.priced = false;
        self.publish();

        match self.load_scan().await {
            Ok(()) => {
                logger::info(
                    LogTag::Tracker,
                    &format!(
                        "Tracking {} wrapped assets (generation {})",
                        self.state.records.len(),
                        self.state.generation
                    ),
                );
            }
            Err(e) if e.is_fatal() => {
                logger::error(LogTag::Scanner, &format!("Scan aborted: {}", e));
            }
            Err(e) => {
                logger::warning(LogTag::Scanner, &format!("Scan failed, keeping previous assets: {}", e));
            }
        }

        self.state.loading = false;
        self.price_deadline = Some(Instant::now());
        self.rescan_deadline = self
            .settings
            .rescan_interval
            .map(|interval| Instant::now() + interval);
        self.publish();
    }

    /// Scan, fetch mint states and resubscribe
    ///
    /// On error the previous record set and its subscription stay in place.
    async fn load_scan(&mut self) -> Result<(), BridgeError> {
        let scan = self.aggregator.scan(self.settings.chain_filter).await?;
        let mints = scan.mint_addresses();

        let mut cache = MintCache::new();
        let fetched = match cache.fetch_batch(self.source.as_ref(), &mints).await {
            Ok(fetched) => fetched,
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Mint fetch failed, supplies stay at 0 until updates arrive: {}", e),
                );
                HashMap::new()
            }
        };

        self.state.replace(scan, &fetched)?;
        self.state.cache = cache;
        self.log_cache_metrics();

        // Queued updates belong to the record set just replaced
        self.subscription.abort();
        while self.updates_rx.try_recv().is_ok() {}

        match MintCache::subscribe(
            self.source.as_ref(),
            mints,
            self.updates_tx.clone(),
            self.shutdown.clone(),
        )
        .await
        {
            Ok(handle) => self.subscription.set(handle),
            Err(e) => logger::warning(
                LogTag::Tracker,
                &format!("Account subscription failed: {}", e),
            ),
        }
        Ok(())
    }

    /// Returns false when shutdown interrupted the resync
    async fn resync_until_shutdown(&mut self) -> bool {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            _ = self.resync_mints() => true,
            _ = shutdown.changed() => false,
        }
    }

    /// Re-read every tracked mint after the subscription stream came back
    async fn resync_mints(&mut self) {
        let mints: Vec<Pubkey> = self.state.by_mint.keys().copied().collect();
        if mints.is_empty() {
            return;
        }

        let fetched = match self.state.cache.fetch_batch(self.source.as_ref(), &mints).await {
            Ok(fetched) => fetched,
            Err(e) => {
                logger::warning(
                    LogTag::Cache,
                    &format!("Mint resync failed, supplies may lag until the next change: {}", e),
                );
                return;
            }
        };

        let changed = self.state.apply_mint_states(&fetched);
        logger::info(
            LogTag::Cache,
            &format!(
                "Resynced {} mints after reconnect, {} supplies changed",
                fetched.len(),
                changed
            ),
        );
        self.log_cache_metrics();

        if changed > 0 {
            self.publish();
            self.request_price_refresh();
        }
    }

    fn log_cache_metrics(&self) {
        let metrics = self.state.cache.metrics();
        logger::debug(
            LogTag::Cache,
            &format!(
                "Mint cache: {} entries, {} inserts, {} updates, {} stale, {} undecodable",
                self.state.cache.len(),
                metrics.inserts,
                metrics.updates,
                metrics.stale_updates,
                metrics.decode_failures
            ),
        );
    }

    fn handle_update(&mut self, update: AccountUpdate) {
        if !self.state.apply_account_update(&update) {
            return;
        }
        self.publish();
        self.request_price_refresh();
    }

    /// Pull the next valuation forward unless one is already due sooner
    ///
    /// While a price task runs the deadline is left alone; the task's result
    /// schedules the follow-up instead.
    fn request_price_refresh(&mut self) {
        if self.price_in_flight {
            self.prices_dirty = true;
            return;
        }

        let due = Instant::now() + self.settings.update_debounce;
        self.price_deadline = Some(match self.price_deadline {
            Some(current) if current <= due => current,
            _ => due,
        });
    }

    fn schedule_next_price_refresh(&mut self) {
        let next = Instant::now() + self.settings.price_interval;
        self.price_deadline = Some(match self.price_deadline {
            Some(current) if current <= next => current,
            _ => next,
        });
    }

    fn start_price_refresh(&mut self) {
        self.price_deadline = None;
        if self.price_in_flight {
            self.prices_dirty = true;
            return;
        }

        let request = self.correlator.resolve(&mut self.state.records);
        if request.is_empty() {
            self.state.total_in_usd = PriceCorrelator::total_in_usd(&self.state.records);
            self.state.priced = true;
            self.publish();
            self.schedule_next_price_refresh();
            return;
        }

        let source = self.correlator.source();
        let results = self.prices_tx.clone();
        let generation = self.state.generation;

        self.price_in_flight = true;
        self.prices_dirty = false;
        self.price_task.set(tokio::spawn(async move {
            let result = source.fetch_usd_prices(&request.ids()).await;
            let _ = results.send(PricesFetched {
                generation,
                request,
                result,
            });
        }));
    }

    fn handle_prices(&mut self, fetched: PricesFetched) {
        if fetched.generation != self.state.generation {
            logger::debug(
                LogTag::Pricing,
                &format!("Discarding prices of generation {}", fetched.generation),
            );
            return;
        }
        self.price_in_flight = false;

        match fetched.result {
            Ok(prices) => {
                self.state.total_in_usd =
                    PriceCorrelator::apply_prices(&fetched.request, &prices, &mut self.state.records);
                logger::info(
                    LogTag::Pricing,
                    &format!("Total bridged value: ${:.2}", self.state.total_in_usd),
                );
            }
            Err(e) => {
                logger::warning(
                    LogTag::Pricing,
                    &format!("Price refresh failed, keeping previous valuation: {}", e),
                );
            }
        }

        self.state.priced = true;
        self.publish();

        if std::mem::take(&mut self.prices_dirty) {
            self.request_price_refresh();
        } else {
            self.schedule_next_price_refresh();
        }
    }
}
