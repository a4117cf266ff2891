/// Structured error handling for bridgescope
///
/// Every fallible operation in the library returns `BridgeError`. The variants
/// follow the recovery rules of the tracker:
/// - `MalformedRecord`: skip that single account and continue
/// - `MissingDerivedKey` / `DerivationFailed`: logic or configuration defect, abort loudly
/// - `Transport`: recoverable, the scan cycle or price tick is retried later

// =============================================================================
// MAIN ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Byte length mismatch while decoding a fixed-span record
    MalformedRecord {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Grouping index points at an asset that is not tracked
    MissingDerivedKey { key: String },

    /// No bump produced a valid program address for static seeds
    DerivationFailed { seed: String },

    /// RPC, websocket or price feed failure
    Transport(TransportError),

    Configuration { field: String, reason: String },

    /// Well-sized data that still failed to parse
    Data { context: String, message: String },
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeError::MalformedRecord {
                record,
                expected,
                actual,
            } => write!(
                f,
                "Malformed {} record: expected {} bytes, got {}",
                record, expected, actual
            ),
            BridgeError::MissingDerivedKey { key } => {
                write!(f, "Missing derived key '{}' while grouping assets", key)
            }
            BridgeError::DerivationFailed { seed } => {
                write!(f, "No valid program address for seed '{}'", seed)
            }
            BridgeError::Transport(e) => write!(f, "Transport Error: {}", e),
            BridgeError::Configuration { field, reason } => {
                write!(f, "Invalid config field '{}': {}", field, reason)
            }
            BridgeError::Data { context, message } => {
                write!(f, "Failed to parse {}: {}", context, message)
            }
        }
    }
}

impl std::error::Error for BridgeError {}

// =============================================================================
// TRANSPORT ERROR TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    Rpc {
        method: String,
        message: String,
    },
    RpcResponse {
        method: String,
        code: i64,
        message: String,
    },
    HttpStatus {
        endpoint: String,
        status: u16,
        body: Option<String>,
    },
    PriceFeed {
        endpoint: String,
        message: String,
    },
    Websocket {
        endpoint: String,
        message: String,
    },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Rpc { method, message } => {
                write!(f, "RPC {} failed: {}", method, message)
            }
            TransportError::RpcResponse {
                method,
                code,
                message,
            } => write!(f, "RPC {} returned error {}: {}", method, code, message),
            TransportError::HttpStatus {
                endpoint,
                status,
                body,
            } => write!(
                f,
                "HTTP {} from {}: {}",
                status,
                endpoint,
                body.as_deref().unwrap_or("No body")
            ),
            TransportError::PriceFeed { endpoint, message } => {
                write!(f, "Price feed {} failed: {}", endpoint, message)
            }
            TransportError::Websocket { endpoint, message } => {
                write!(f, "Websocket {} failed: {}", endpoint, message)
            }
        }
    }
}

// =============================================================================
// CONVERSIONS FROM LIBRARY ERRORS
// =============================================================================

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        BridgeError::Transport(err)
    }
}

impl From<reqwest::Error> for BridgeError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        match err.status() {
            Some(status) => BridgeError::Transport(TransportError::HttpStatus {
                endpoint,
                status: status.as_u16(),
                body: None,
            }),
            None => BridgeError::Transport(TransportError::PriceFeed {
                endpoint,
                message: format!("HTTP request failed: {}", err),
            }),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Data {
            context: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// STRUCTURED ERROR BUILDERS
// =============================================================================

impl BridgeError {
    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Transport(TransportError::Rpc {
            method: method.into(),
            message: message.into(),
        })
    }

    pub fn price_feed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Transport(TransportError::PriceFeed {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    pub fn websocket(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Transport(TransportError::Websocket {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn data(context: impl Into<String>, message: impl Into<String>) -> Self {
        BridgeError::Data {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Recoverable network-side failure
    pub fn is_transport(&self) -> bool {
        matches!(self, BridgeError::Transport(_))
    }

    /// Defects that must abort the current scan instead of being skipped
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::MissingDerivedKey { .. } | BridgeError::DerivationFailed { .. }
        )
    }
}
