/// RPC payload helpers
use crate::errors::BridgeError;
use base64::Engine;
use solana_sdk::{account::Account, pubkey::Pubkey};
use std::str::FromStr;
use url::Url;

pub fn parse_pubkey_string(s: &str) -> Result<Pubkey, BridgeError> {
    Pubkey::from_str(s.trim())
        .map_err(|e| BridgeError::data(format!("pubkey '{}'", s), e.to_string()))
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, BridgeError> {
    base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| BridgeError::data("account data", format!("Failed to decode base64: {}", e)))
}

/// Parse an account object (`encoding: base64`) from a JSON-RPC result
pub fn parse_account_from_json(value: &serde_json::Value) -> Result<Option<Account>, BridgeError> {
    if value.is_null() {
        return Ok(None);
    }

    let data = value
        .get("data")
        .ok_or_else(|| BridgeError::data("account", "Missing data field"))?;

    let data_bytes = if let Some(arr) = data.as_array() {
        // [data_base64, encoding]
        let encoded = arr
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| BridgeError::data("account", "Invalid data"))?;
        let encoding = arr.get(1).and_then(|v| v.as_str()).unwrap_or("base64");

        if encoding != "base64" {
            return Err(BridgeError::data(
                "account",
                format!("Unsupported encoding: {}", encoding),
            ));
        }
        decode_base64(encoded)?
    } else if let Some(s) = data.as_str() {
        decode_base64(s)?
    } else {
        return Err(BridgeError::data("account", "Invalid data format"));
    };

    let lamports = value
        .get("lamports")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| BridgeError::data("account", "Missing lamports"))?;

    let owner_str = value
        .get("owner")
        .and_then(|v| v.as_str())
        .ok_or_else(|| BridgeError::data("account", "Missing owner"))?;
    let owner = parse_pubkey_string(owner_str)?;

    let executable = value
        .get("executable")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    let rent_epoch = value
        .get("rentEpoch")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    Ok(Some(Account {
        lamports,
        data: data_bytes,
        owner,
        executable,
        rent_epoch,
    }))
}

/// Websocket endpoint matching an HTTP RPC endpoint (http → ws, https → wss)
///
/// Validators serve websockets on the RPC port + 1, so an explicit port is
/// bumped; URLs on the scheme's default port are left as they are.
pub fn derive_ws_url(http_url: &str) -> Result<String, BridgeError> {
    let mut url = Url::parse(http_url)
        .map_err(|e| BridgeError::configuration("rpc.url", e.to_string()))?;

    let scheme = match url.scheme() {
        "https" => "wss",
        "http" => "ws",
        "wss" | "ws" => return Ok(url.to_string()),
        other => {
            return Err(BridgeError::configuration(
                "rpc.url",
                format!("unsupported scheme '{}'", other),
            ))
        }
    };

    url.set_scheme(scheme)
        .map_err(|_| BridgeError::configuration("rpc.url", "cannot switch to websocket scheme"))?;

    if let Some(port) = url.port() {
        let ws_port = port
            .checked_add(1)
            .ok_or_else(|| BridgeError::configuration("rpc.url", format!("no websocket port after {}", port)))?;
        url.set_port(Some(ws_port))
            .map_err(|_| BridgeError::configuration("rpc.url", "cannot set websocket port"))?;
    }
    Ok(url.to_string())
}
