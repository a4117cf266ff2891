//! JSON-RPC client over HTTP
//!
//! Only the three calls the tracker needs are implemented; every call goes
//! through `execute_raw`, which owns error mapping and stats.

use super::source::AccountSource;
use super::subscriptions::AccountSubscriber;
use super::types::{commitment_to_string, parse_commitment, AccountEvent, RpcFilterType, RpcStats};
use super::utils::{derive_ws_url, parse_account_from_json, parse_pubkey_string};
use crate::config::RpcConfig;
use crate::constants::MAX_MULTIPLE_ACCOUNTS;
use crate::errors::{BridgeError, TransportError};
use crate::logger::{self, LogTag};
use async_trait::async_trait;
use parking_lot::Mutex;
use solana_sdk::{account::Account, commitment_config::CommitmentLevel, pubkey::Pubkey};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    ws_url: String,
    commitment: CommitmentLevel,
    request_id: AtomicU64,
    stats: Mutex<RpcStats>,
}

impl RpcClient {
    pub fn new(
        url: &str,
        ws_url: Option<&str>,
        commitment: CommitmentLevel,
        timeout: Duration,
    ) -> Result<Self, BridgeError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::configuration("rpc", e.to_string()))?;

        let ws_url = match ws_url.filter(|u| !u.is_empty()) {
            Some(ws) => ws.to_string(),
            None => derive_ws_url(url)?,
        };

        Ok(Self {
            http,
            url: url.to_string(),
            ws_url,
            commitment,
            request_id: AtomicU64::new(1),
            stats: Mutex::new(RpcStats::default()),
        })
    }

    pub fn from_config(config: &RpcConfig) -> Result<Self, BridgeError> {
        Self::new(
            &config.url,
            Some(config.ws_url.as_str()),
            parse_commitment(&config.commitment)?,
            Duration::from_secs(config.timeout_secs.max(1)),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn commitment(&self) -> CommitmentLevel {
        self.commitment
    }

    pub fn stats(&self) -> RpcStats {
        self.stats.lock().clone()
    }

    /// Send one JSON-RPC request and return its `result` member
    pub async fn execute_raw(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        logger::debug(LogTag::Rpc, &format!("{} #{} -> {}", method, id, self.url));

        let started = Instant::now();
        let result = self.send(method, &body).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let mut stats = self.stats.lock();
        match &result {
            Ok(_) => stats.record_success(elapsed_ms),
            Err(_) => stats.record_error(),
        }
        drop(stats);

        if let Err(e) = &result {
            logger::debug(LogTag::Rpc, &format!("{} #{} failed after {}ms: {}", method, id, elapsed_ms, e));
        }
        result
    }

    async fn send(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, BridgeError> {
        let response = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(|e| BridgeError::rpc(method, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            return Err(TransportError::HttpStatus {
                endpoint: self.url.clone(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let mut payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BridgeError::rpc(method, format!("invalid JSON response: {}", e)))?;

        if let Some(error) = payload.get("error") {
            return Err(TransportError::RpcResponse {
                method: method.to_string(),
                code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            }
            .into());
        }

        payload
            .get_mut("result")
            .map(serde_json::Value::take)
            .ok_or_else(|| BridgeError::rpc(method, "response has no result"))
    }
}

#[async_trait]
impl AccountSource for RpcClient {
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<(Pubkey, Account)>, BridgeError> {
        let mut config = serde_json::Map::new();
        config.insert("encoding".to_string(), "base64".into());
        config.insert(
            "commitment".to_string(),
            commitment_to_string(self.commitment).into(),
        );
        if !filters.is_empty() {
            config.insert(
                "filters".to_string(),
                serde_json::Value::Array(filters.iter().map(RpcFilterType::to_json).collect()),
            );
        }

        let params = serde_json::json!([program_id.to_string(), serde_json::Value::Object(config)]);
        let result = self.execute_raw("getProgramAccounts", params).await?;

        let accounts_array = result
            .as_array()
            .ok_or_else(|| BridgeError::rpc("getProgramAccounts", "expected array result"))?;

        let mut accounts = Vec::with_capacity(accounts_array.len());
        for item in accounts_array {
            let pubkey_str = item
                .get("pubkey")
                .and_then(|v| v.as_str())
                .ok_or_else(|| BridgeError::rpc("getProgramAccounts", "missing pubkey field"))?;
            let pubkey = parse_pubkey_string(pubkey_str)?;

            let account_data = item
                .get("account")
                .ok_or_else(|| BridgeError::rpc("getProgramAccounts", "missing account field"))?;

            if let Some(account) = parse_account_from_json(account_data)? {
                accounts.push((pubkey, account));
            }
        }

        logger::debug(
            LogTag::Rpc,
            &format!("getProgramAccounts {} returned {} accounts", program_id, accounts.len()),
        );
        Ok(accounts)
    }

    async fn get_multiple_accounts(
        &self,
        pubkeys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, BridgeError> {
        if pubkeys.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_accounts = Vec::with_capacity(pubkeys.len());

        for chunk in pubkeys.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let keys: Vec<String> = chunk.iter().map(|p| p.to_string()).collect();
            let params = serde_json::json!([
                keys,
                {
                    "encoding": "base64",
                    "commitment": commitment_to_string(self.commitment)
                }
            ]);

            let result = self.execute_raw("getMultipleAccounts", params).await?;

            let values = result
                .get("value")
                .and_then(|v| v.as_array())
                .ok_or_else(|| BridgeError::rpc("getMultipleAccounts", "missing value array"))?;

            if values.len() != chunk.len() {
                return Err(BridgeError::rpc(
                    "getMultipleAccounts",
                    format!("asked for {} accounts, got {}", chunk.len(), values.len()),
                ));
            }

            for value in values {
                all_accounts.push(parse_account_from_json(value)?);
            }
        }

        Ok(all_accounts)
    }

    async fn subscribe_accounts(
        &self,
        pubkeys: Vec<Pubkey>,
        updates: mpsc::UnboundedSender<AccountEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, BridgeError> {
        let subscriber = AccountSubscriber::new(self.ws_url.clone(), self.commitment);
        Ok(subscriber.spawn(pubkeys, updates, shutdown))
    }
}
