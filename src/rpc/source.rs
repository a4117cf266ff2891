/// Read/subscribe seam over the chain's JSON-RPC interface
///
/// The scanner, mint cache and tracker only see this trait, so tests swap in
/// an in-memory source.
use super::types::{AccountEvent, RpcFilterType};
use crate::errors::BridgeError;
use async_trait::async_trait;
use solana_sdk::{account::Account, pubkey::Pubkey};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Every account owned by `program_id` that passes all `filters`
    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: Vec<RpcFilterType>,
    ) -> Result<Vec<(Pubkey, Account)>, BridgeError>;

    /// Index-aligned with `pubkeys`; `None` for accounts that do not exist
    async fn get_multiple_accounts(
        &self,
        pubkeys: &[Pubkey],
    ) -> Result<Vec<Option<Account>>, BridgeError>;

    /// Push every change of `pubkeys` into `updates` until `shutdown` flips
    /// to true or the returned task is aborted
    ///
    /// After a dropped stream comes back, `AccountEvent::Resubscribed` is sent
    /// so the listener can re-read what it missed.
    async fn subscribe_accounts(
        &self,
        pubkeys: Vec<Pubkey>,
        updates: mpsc::UnboundedSender<AccountEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<JoinHandle<()>, BridgeError>;
}
