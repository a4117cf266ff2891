//! Websocket account subscriptions
//!
//! One connection carries an `accountSubscribe` per key. Notifications are
//! decoded and forwarded as `AccountEvent::Changed`. A dropped connection is
//! retried every `WS_RECONNECT_DELAY_SECS` until shutdown, and every session
//! after the first announces itself with `AccountEvent::Resubscribed`.

use super::types::{commitment_to_string, AccountEvent, AccountUpdate};
use super::utils::parse_account_from_json;
use crate::constants::WS_RECONNECT_DELAY_SECS;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use solana_sdk::{commitment_config::CommitmentLevel, pubkey::Pubkey};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// JSON-RPC subscribe request
#[derive(Serialize)]
struct AccountSubscribe {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: Vec<serde_json::Value>,
}

/// How a session ended
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Shutdown requested or nobody listens anymore
    Stop,
    /// Server closed the stream; reconnect
    Closed,
}

/// Tracks request ids → keys until the server confirms, then subscription ids → keys
#[derive(Debug, Default)]
struct SubscriptionMap {
    pending: HashMap<u64, Pubkey>,
    active: HashMap<u64, Pubkey>,
}

impl SubscriptionMap {
    fn confirm(&mut self, request_id: u64, subscription_id: u64) -> Option<Pubkey> {
        let pubkey = self.pending.remove(&request_id)?;
        self.active.insert(subscription_id, pubkey);
        Some(pubkey)
    }

    fn lookup(&self, subscription_id: u64) -> Option<Pubkey> {
        self.active.get(&subscription_id).copied()
    }
}

pub struct AccountSubscriber {
    ws_url: String,
    commitment: CommitmentLevel,
    reconnect_delay: Duration,
}

impl AccountSubscriber {
    pub fn new(ws_url: String, commitment: CommitmentLevel) -> Self {
        Self {
            ws_url,
            commitment,
            reconnect_delay: Duration::from_secs(WS_RECONNECT_DELAY_SECS),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn spawn(
        self,
        pubkeys: Vec<Pubkey>,
        updates: mpsc::UnboundedSender<AccountEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if pubkeys.is_empty() {
                return;
            }

            let mut resubscribing = false;
            loop {
                if *shutdown.borrow() {
                    break;
                }

                let session = self
                    .run_session(&pubkeys, &updates, &mut shutdown, resubscribing)
                    .await;
                resubscribing = true;

                match session {
                    Ok(SessionEnd::Stop) => break,
                    Ok(SessionEnd::Closed) => {
                        logger::warning(LogTag::Websocket, "Subscription stream closed by server");
                    }
                    Err(e) => {
                        logger::warning(LogTag::Websocket, &format!("Subscription error: {}", e));
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.reconnect_delay) => {
                        logger::info(LogTag::Websocket, "Reconnecting account subscriptions");
                    }
                    _ = shutdown.changed() => break,
                }
            }

            logger::debug(LogTag::Websocket, "Account subscriptions stopped");
        })
    }

    async fn run_session(
        &self,
        pubkeys: &[Pubkey],
        updates: &mpsc::UnboundedSender<AccountEvent>,
        shutdown: &mut watch::Receiver<bool>,
        resubscribing: bool,
    ) -> Result<SessionEnd, BridgeError> {
        let (ws_stream, _) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| BridgeError::websocket(&self.ws_url, format!("connect failed: {}", e)))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let mut subscriptions = SubscriptionMap::default();
        for (index, pubkey) in pubkeys.iter().enumerate() {
            let id = index as u64 + 1;
            let request = AccountSubscribe {
                jsonrpc: "2.0",
                id,
                method: "accountSubscribe",
                params: vec![
                    serde_json::Value::String(pubkey.to_string()),
                    serde_json::json!({
                        "encoding": "base64",
                        "commitment": commitment_to_string(self.commitment)
                    }),
                ],
            };
            let text = serde_json::to_string(&request)?;
            ws_sender
                .send(Message::Text(text))
                .await
                .map_err(|e| BridgeError::websocket(&self.ws_url, format!("subscribe failed: {}", e)))?;
            subscriptions.pending.insert(id, *pubkey);
        }

        logger::info(
            LogTag::Websocket,
            &format!("Subscribed to {} mint accounts", pubkeys.len()),
        );

        if resubscribing && updates.send(AccountEvent::Resubscribed).is_err() {
            return Ok(SessionEnd::Stop);
        }

        loop {
            tokio::select! {
                message = ws_receiver.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(update) = handle_message(&text, &mut subscriptions) {
                                if updates.send(AccountEvent::Changed(update)).is_err() {
                                    return Ok(SessionEnd::Stop);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => return Ok(SessionEnd::Closed),
                        // Ping/pong frames are answered by the protocol layer
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(BridgeError::websocket(&self.ws_url, e.to_string()));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    let _ = ws_sender.send(Message::Close(None)).await;
                    return Ok(SessionEnd::Stop);
                }
            }
        }
    }
}

/// Decode one text frame; returns an update for account notifications
fn handle_message(text: &str, subscriptions: &mut SubscriptionMap) -> Option<AccountUpdate> {
    let message: serde_json::Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            logger::debug(LogTag::Websocket, &format!("Ignoring non-JSON frame: {}", e));
            return None;
        }
    };

    // Subscription confirmation: {"id": n, "result": subscription_id}
    if let (Some(id), Some(subscription_id)) = (
        message.get("id").and_then(|v| v.as_u64()),
        message.get("result").and_then(|v| v.as_u64()),
    ) {
        if let Some(pubkey) = subscriptions.confirm(id, subscription_id) {
            logger::debug(
                LogTag::Websocket,
                &format!("Subscription {} confirmed for {}", subscription_id, pubkey),
            );
        }
        return None;
    }

    if let Some(error) = message.get("error") {
        logger::warning(LogTag::Websocket, &format!("Subscription request failed: {}", error));
        return None;
    }

    if message.get("method").and_then(|v| v.as_str()) != Some("accountNotification") {
        return None;
    }

    let params = message.get("params")?;
    let subscription_id = params.get("subscription").and_then(|v| v.as_u64())?;
    let pubkey = match subscriptions.lookup(subscription_id) {
        Some(pubkey) => pubkey,
        None => {
            logger::debug(
                LogTag::Websocket,
                &format!("Notification for unknown subscription {}", subscription_id),
            );
            return None;
        }
    };

    let result = params.get("result")?;
    let slot = result
        .get("context")
        .and_then(|c| c.get("slot"))
        .and_then(|s| s.as_u64());

    match parse_account_from_json(result.get("value")?) {
        Ok(Some(account)) => Some(AccountUpdate {
            pubkey,
            account,
            slot,
        }),
        Ok(None) => None,
        Err(e) => {
            logger::warning(
                LogTag::Websocket,
                &format!("Undecodable notification for {}: {}", pubkey, e),
            );
            None
        }
    }
}
