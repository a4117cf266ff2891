//! In-memory sources and fixtures for unit tests

use crate::apis::{CoinGeckoCoin, SimplePrice, SimplePriceResponse};
use crate::bridge::{BridgeAddresses, TransferOutProposal};
use crate::constants::DEFAULT_BRIDGE_PROGRAM_ID;
use crate::errors::{BridgeError, TransportError};
use crate::pricing::PriceSource;
use crate::rpc::{AccountEvent, AccountSource, AccountUpdate, RpcFilterType};
use crate::tokens::{TokenInfo, TokenRegistry};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_program::program_option::COption;
use solana_program::program_pack::Pack;
use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_token::state::Mint;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub fn test_addresses() -> BridgeAddresses {
    let program_id = Pubkey::from_str(DEFAULT_BRIDGE_PROGRAM_ID).unwrap();
    BridgeAddresses::new(program_id).unwrap()
}

pub fn proposal_account(chain: u8, address: &[u8], decimals: u8) -> Account {
    let proposal = TransferOutProposal::new(chain, address, decimals);
    Account {
        lamports: 1_000_000,
        data: proposal.encode().unwrap(),
        owner: *test_addresses().program_id(),
        executable: false,
        rent_epoch: 0,
    }
}

pub fn mint_account(supply: u64, decimals: u8) -> Account {
    let mint = Mint {
        mint_authority: COption::Some(Pubkey::new_unique()),
        supply,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; Mint::LEN];
    Mint::pack(mint, &mut data).unwrap();

    Account {
        lamports: 1_461_600,
        data,
        owner: spl_token::id(),
        executable: false,
        rent_epoch: 0,
    }
}

/// Registry whose foreign list and coin list contain `(hex address, symbol, coin id)`
pub fn registry_with(entries: &[(&str, &str, &str)]) -> Arc<TokenRegistry> {
    let tokens = entries
        .iter()
        .map(|(address, symbol, _)| TokenInfo {
            address: format!("0x{}", address),
            symbol: symbol.to_string(),
            name: symbol.to_string(),
            logo_uri: Some(format!("https://example.org/{}.png", symbol.to_lowercase())),
            decimals: 18,
            chain_id: Some(1),
        })
        .collect();
    let coins = entries
        .iter()
        .map(|(_, symbol, id)| CoinGeckoCoin {
            id: id.to_string(),
            symbol: symbol.to_lowercase(),
            name: symbol.to_string(),
            platforms: None,
        })
        .collect();

    Arc::new(
        TokenRegistry::new()
            .with_foreign_tokens(tokens)
            .with_coins(coins),
    )
}

// ============================================================================
// ACCOUNT SOURCE
// ============================================================================

/// Decrements the live-subscription counter when the task is dropped or aborted
struct LiveGuard(Arc<AtomicUsize>);

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockAccountSource {
    program_accounts: Mutex<Vec<(Pubkey, Account)>>,
    accounts: Mutex<HashMap<Pubkey, Account>>,
    last_filters: Mutex<Vec<RpcFilterType>>,
    subscriptions: Mutex<Vec<(Vec<Pubkey>, mpsc::UnboundedSender<AccountEvent>)>>,
    live_subscriptions: Arc<AtomicUsize>,
    scan_calls: AtomicUsize,
    failing_scans: AtomicUsize,
}

impl MockAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_program_account(&self, pubkey: Pubkey, account: Account) {
        self.program_accounts.lock().push((pubkey, account));
    }

    pub fn clear_program_accounts(&self) {
        self.program_accounts.lock().clear();
    }

    pub fn set_account(&self, pubkey: Pubkey, account: Account) {
        self.accounts.lock().insert(pubkey, account);
    }

    /// Make the next `count` scans fail with a transport error
    pub fn fail_next_scans(&self, count: usize) {
        self.failing_scans.store(count, Ordering::SeqCst);
    }

    pub fn last_filters(&self) -> Vec<RpcFilterType> {
        self.last_filters.lock().clone()
    }

    pub fn scan_calls(&self) -> usize {
        self.scan_calls.load(Ordering::SeqCst)
    }

    pub fn live_subscriptions(&self) -> usize {
        self.live_subscriptions.load(Ordering::SeqCst)
    }

    /// Keys of the most recent subscription
    pub fn subscribed_keys(&self) -> Vec<Pubkey> {
        self.subscriptions
            .lock()
            .last()
            .map(|(keys, _)| keys.clone())
            .unwrap_or_default()
    }

    /// Deliver an update through the most recent subscription
    pub fn push_update(&self, pubkey: Pubkey, account: Account, slot: Option<u64>) -> bool {
        self.push_event(AccountEvent::Changed(AccountUpdate {
            pubkey,
            account,
            slot,
        }))
    }

    /// Report that the most recent subscription reconnected
    pub fn push_resubscribed(&self) -> bool {
        self.push_event(AccountEvent::Resubscribed)
    }

    fn push_event(&self, event: AccountEvent) -> bool {
        let subscriptions = self.subscriptions.lock();
        match subscriptions.last() {
            Some((_, sender)) => sender.send(event).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl AccountSource for MockAccountSource {
    async fn get_program_accounts(
        &self,
        _program_id: &Pubkey,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<(Pubkey, Account)>, BridgeError> {
        self.scan_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_filters.lock() = filters;

        let failing = self.failing_scans.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_scans.store(failing - 1, Ordering::SeqCst);
            return Err(TransportError::Rpc {
                method: "getProgramAccounts".to_string(),
                message: "connection refused".to_string(),
            }
            .into());
        }

        Ok(self.program_accounts.lock().clone())
    }

    async fn get_multiple_accounts(
        &self,
        pubkeys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, BridgeError> {
        let accounts = self.accounts.lock();
        Ok(pubkeys.iter().map(|k| accounts.get(k).cloned()).collect())
    }

    async fn subscribe_accounts(
        &self,
        pubkeys: Vec<Pubkey>,
        updates: mpsc::UnboundedSender<AccountEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, BridgeError> {
        self.subscriptions.lock().push((pubkeys, updates));

        self.live_subscriptions.fetch_add(1, Ordering::SeqCst);
        let guard = LiveGuard(self.live_subscriptions.clone());

        Ok(tokio::spawn(async move {
            let _guard = guard;
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        }))
    }
}

// ============================================================================
// PRICE SOURCE
// ============================================================================

#[derive(Default)]
pub struct MockPriceSource {
    prices: Mutex<SimplePriceResponse>,
    requests: Mutex<Vec<Vec<String>>>,
    failing: AtomicUsize,
    delay: Mutex<Duration>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` makes the feed return the id without a quote
    pub fn set_price(&self, id: &str, usd: Option<f64>) {
        self.prices.lock().insert(id.to_string(), SimplePrice { usd });
    }

    /// Hold every response back for `delay`
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = delay;
    }

    pub fn fail_next(&self, count: usize) {
        self.failing.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<SimplePriceResponse, BridgeError> {
        self.requests.lock().push(ids.to_vec());

        let delay = *self.delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing.store(failing - 1, Ordering::SeqCst);
            return Err(BridgeError::price_feed("mock", "HTTP 429"));
        }

        let prices = self.prices.lock();
        Ok(ids
            .iter()
            .filter_map(|id| prices.get(id).map(|p| (id.clone(), *p)))
            .collect())
    }
}
