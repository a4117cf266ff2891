/// Global constants used across bridgescope
///
/// This module contains protocol constants that are not configurable
/// and are used across multiple modules.

// ============================================================================
// BRIDGE PROGRAM CONSTANTS
// ============================================================================

/// Bridge program on Solana mainnet (overridable through `bridge.program_id`)
pub const DEFAULT_BRIDGE_PROGRAM_ID: &str = "WormT3McKhFJ2RkiGpdw9GKvNCrB2aB54gb2uV9MfQC";

/// Seed of the bridge config PDA
pub const BRIDGE_CONFIG_SEED: &[u8] = b"bridge";

/// Seed prefix of wrapped mint PDAs
pub const WRAPPED_MINT_SEED: &[u8] = b"wrapped";

/// Seed prefix of wrapped meta PDAs
pub const WRAPPED_META_SEED: &[u8] = b"meta";

/// Chain id of the host chain (Solana) in the bridge's numbering
pub const HOST_CHAIN_ID: u8 = 1;

/// Wrapped mints never carry more than 9 decimals; the bridge clamps before deriving
pub const MAX_WRAPPED_DECIMALS: u8 = 9;

/// Width of the address slot inside bridge records
pub const ASSET_ADDRESS_LEN: usize = 32;

/// Width of a foreign (EVM) address; it occupies the low-order bytes of the slot
pub const FOREIGN_ADDRESS_LEN: usize = 20;

// ============================================================================
// RPC CONSTANTS
// ============================================================================

/// Maximum keys per getMultipleAccounts request (Solana limit)
pub const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// Delay before the account subscription reconnects
pub const WS_RECONNECT_DELAY_SECS: u64 = 5;

// ============================================================================
// PRICE FEED CONSTANTS
// ============================================================================

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Header carrying the CoinGecko demo-tier key
pub const COINGECKO_API_KEY_HEADER: &str = "x-cg-demo-api-key";

/// Quote currency requested from the price feed
pub const PRICE_QUOTE_CURRENCY: &str = "usd";

pub const DEFAULT_PRICE_POLL_INTERVAL_SECS: u64 = 30;
