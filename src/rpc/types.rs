use crate::errors::BridgeError;
use solana_sdk::{account::Account, commitment_config::CommitmentLevel, pubkey::Pubkey};

/// Filter type for getProgramAccounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcFilterType {
    /// Filter by data size
    DataSize(u64),
    /// Filter by memcmp - offset and base58 encoded bytes
    Memcmp { offset: usize, bytes: String },
}

impl RpcFilterType {
    pub fn memcmp(offset: usize, bytes: &[u8]) -> Self {
        RpcFilterType::Memcmp {
            offset,
            bytes: bs58::encode(bytes).into_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            RpcFilterType::DataSize(size) => serde_json::json!({ "dataSize": size }),
            RpcFilterType::Memcmp { offset, bytes } => serde_json::json!({
                "memcmp": {
                    "offset": offset,
                    "bytes": bytes
                }
            }),
        }
    }
}

/// Account change pushed by a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub pubkey: Pubkey,
    pub account: Account,
    pub slot: Option<u64>,
}

/// What a subscription task pushes to its listener
#[derive(Debug, Clone, PartialEq)]
pub enum AccountEvent {
    Changed(AccountUpdate),
    /// The stream was re-established; changes made while it was down were never delivered
    Resubscribed,
}

#[derive(Debug, Clone, Default)]
pub struct RpcStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: u64,
}

impl RpcStats {
    pub fn record_success(&mut self, response_time_ms: u64) {
        self.total_requests += 1;
        self.successful_requests += 1;
        // Running mean over successful calls
        let n = self.successful_requests;
        self.average_response_time_ms =
            (self.average_response_time_ms * (n - 1) + response_time_ms) / n;
    }

    pub fn record_error(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            1.0
        } else {
            (self.successful_requests as f64) / (self.total_requests as f64)
        }
    }
}

pub fn parse_commitment(value: &str) -> Result<CommitmentLevel, BridgeError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "processed" => Ok(CommitmentLevel::Processed),
        // Older clients still send the pre-1.9 name
        "confirmed" | "singlegossip" => Ok(CommitmentLevel::Confirmed),
        "finalized" => Ok(CommitmentLevel::Finalized),
        other => Err(BridgeError::configuration(
            "rpc.commitment",
            format!("unknown commitment '{}'", other),
        )),
    }
}

pub fn commitment_to_string(commitment: CommitmentLevel) -> &'static str {
    match commitment {
        CommitmentLevel::Finalized => "finalized",
        CommitmentLevel::Confirmed => "confirmed",
        CommitmentLevel::Processed => "processed",
    }
}
