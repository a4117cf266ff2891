/// Chain access: JSON-RPC reads and websocket account subscriptions
pub mod client;
pub mod source;
pub mod subscriptions;
pub mod types;
pub mod utils;

pub use client::RpcClient;
pub use source::AccountSource;
pub use subscriptions::AccountSubscriber;
pub use types::{commitment_to_string, parse_commitment, AccountEvent, AccountUpdate, RpcFilterType, RpcStats};
