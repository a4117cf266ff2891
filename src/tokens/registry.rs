//! Token directories loaded at startup
//!
//! - Foreign list: `0x`-prefixed lowercase address → symbol/logo
//! - Host list: mint address → symbol/logo (display fallback only)
//! - Coin list: lowercase symbol → price-feed id
//!
//! Every lookup is case-insensitive on the address or symbol.

use crate::apis::{CoinGeckoClient, CoinGeckoCoin};
use crate::config::TokensConfig;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Token-list entry (`tokens[]` of the common token-list JSON)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: Option<String>,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Accept both `{"tokens": [...]}` and a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenListFile {
    Wrapped { tokens: Vec<TokenInfo> },
    Bare(Vec<TokenInfo>),
}

impl TokenListFile {
    fn into_tokens(self) -> Vec<TokenInfo> {
        match self {
            TokenListFile::Wrapped { tokens } | TokenListFile::Bare(tokens) => tokens,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    host: HashMap<String, TokenInfo>,
    foreign: HashMap<String, TokenInfo>,
    coin_ids: HashMap<String, String>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host_tokens(mut self, tokens: Vec<TokenInfo>) -> Self {
        for token in tokens {
            self.host.entry(token.address.clone()).or_insert(token);
        }
        self
    }

    pub fn with_foreign_tokens(mut self, tokens: Vec<TokenInfo>) -> Self {
        for token in tokens {
            self.foreign
                .entry(token.address.to_ascii_lowercase())
                .or_insert(token);
        }
        self
    }

    /// Several coins can share a symbol; the first id listed is kept
    pub fn with_coins(mut self, coins: Vec<CoinGeckoCoin>) -> Self {
        for coin in coins {
            self.coin_ids
                .entry(coin.symbol.to_ascii_lowercase())
                .or_insert(coin.id);
        }
        self
    }

    /// Build from the configured files; the coin list is fetched when no file is set
    pub async fn from_config(
        config: &TokensConfig,
        coingecko: &CoinGeckoClient,
    ) -> Result<Self, BridgeError> {
        let host = load_optional_token_list(&config.host_token_list)?;
        let foreign = load_optional_token_list(&config.foreign_token_list)?;

        let coins = if config.coin_list.trim().is_empty() {
            coingecko.fetch_coins_list().await?
        } else {
            load_coin_list(&config.coin_list)?
        };

        let registry = Self::new()
            .with_host_tokens(host)
            .with_foreign_tokens(foreign)
            .with_coins(coins);

        logger::info(
            LogTag::Config,
            &format!(
                "Token registry: {} host tokens, {} foreign tokens, {} coin symbols",
                registry.host.len(),
                registry.foreign.len(),
                registry.coin_ids.len()
            ),
        );
        Ok(registry)
    }

    /// Look up by `0x`-prefixed foreign address
    pub fn foreign_token(&self, address: &str) -> Option<&TokenInfo> {
        self.foreign.get(&address.to_ascii_lowercase())
    }

    pub fn host_token(&self, mint: &Pubkey) -> Option<&TokenInfo> {
        self.host.get(&mint.to_string())
    }

    pub fn price_feed_id(&self, symbol: &str) -> Option<&str> {
        self.coin_ids
            .get(&symbol.to_ascii_lowercase())
            .map(String::as_str)
    }
}

fn read_file(path: &str) -> Result<String, BridgeError> {
    fs::read_to_string(path)
        .map_err(|e| BridgeError::configuration(path, format!("cannot read file: {}", e)))
}

pub fn load_token_list(path: &str) -> Result<Vec<TokenInfo>, BridgeError> {
    let content = read_file(path)?;
    let file: TokenListFile = serde_json::from_str(&content)
        .map_err(|e| BridgeError::data(format!("token list {}", path), e.to_string()))?;
    Ok(file.into_tokens())
}

/// Missing files are tolerated: lookups against an empty list just miss
fn load_optional_token_list(path: &str) -> Result<Vec<TokenInfo>, BridgeError> {
    if path.trim().is_empty() {
        return Ok(Vec::new());
    }
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Token list {} not found, continuing without it", path),
        );
        return Ok(Vec::new());
    }
    load_token_list(path)
}

pub fn load_coin_list(path: &str) -> Result<Vec<CoinGeckoCoin>, BridgeError> {
    let content = read_file(path)?;
    serde_json::from_str(&content)
        .map_err(|e| BridgeError::data(format!("coin list {}", path), e.to_string()))
}
