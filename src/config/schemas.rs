/// Configuration schemas - all config structures defined once with defaults
///
/// Each struct is declared through `config_struct!`, so a TOML file only needs
/// the keys it wants to override.
use crate::config_struct;
use crate::constants::{
    COINGECKO_BASE_URL, DEFAULT_BRIDGE_PROGRAM_ID, DEFAULT_PRICE_POLL_INTERVAL_SECS,
};

// ============================================================================
// RPC CONFIGURATION
// ============================================================================

config_struct! {
    /// RPC endpoint configuration
    pub struct RpcConfig {
        /// HTTP JSON-RPC endpoint
        url: String = "https://api.mainnet-beta.solana.com".to_string(),
        /// Websocket endpoint; derived from `url` when empty
        ws_url: String = String::new(),
        /// processed | confirmed | finalized
        commitment: String = "confirmed".to_string(),
        timeout_secs: u64 = 30,
    }
}

// ============================================================================
// BRIDGE CONFIGURATION
// ============================================================================

config_struct! {
    /// Bridge program being tracked
    pub struct BridgeConfig {
        program_id: String = DEFAULT_BRIDGE_PROGRAM_ID.to_string(),
        /// Only scan proposals of this asset chain (memcmp filter)
        chain_filter: Option<u8> = None,
    }
}

// ============================================================================
// PRICING CONFIGURATION
// ============================================================================

config_struct! {
    /// External price feed (CoinGecko-compatible)
    pub struct PricingConfig {
        base_url: String = COINGECKO_BASE_URL.to_string(),
        /// Demo-tier key; sent only when non-empty
        api_key: String = String::new(),
        poll_interval_secs: u64 = DEFAULT_PRICE_POLL_INTERVAL_SECS,
        timeout_secs: u64 = 20,
        max_requests_per_minute: usize = 30,
        /// Delay between a supply change and the valuation refresh it triggers
        update_debounce_ms: u64 = 2_000,
    }
}

// ============================================================================
// TOKEN DIRECTORIES
// ============================================================================

config_struct! {
    /// Token metadata directories (JSON files)
    pub struct TokensConfig {
        /// Host-chain token list (token-list format)
        host_token_list: String = "data/solana.tokenlist.json".to_string(),
        /// Foreign-chain token list (token-list format)
        foreign_token_list: String = "data/ethereum.tokenlist.json".to_string(),
        /// CoinGecko coins/list dump; fetched from the API when empty
        coin_list: String = String::new(),
    }
}

// ============================================================================
// TRACKER CONFIGURATION
// ============================================================================

config_struct! {
    pub struct TrackerConfig {
        /// Periodic full re-scan; 0 disables it
        rescan_interval_secs: u64 = 0,
    }
}

config_struct! {
    pub struct LoggingConfig {
        /// Append log lines here as well; empty disables the file sink
        file_path: String = String::new(),
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration loaded from `data/config.toml`
    pub struct Config {
        rpc: RpcConfig = RpcConfig::default(),
        bridge: BridgeConfig = BridgeConfig::default(),
        pricing: PricingConfig = PricingConfig::default(),
        tokens: TokensConfig = TokensConfig::default(),
        tracker: TrackerConfig = TrackerConfig::default(),
        logger: LoggingConfig = LoggingConfig::default(),
    }
}
