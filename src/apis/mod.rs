/// External HTTP APIs
pub mod client;
pub mod coingecko;

pub use client::{HttpClient, RateLimiter};
pub use coingecko::types::{CoinGeckoCoin, SimplePrice, SimplePriceResponse};
pub use coingecko::CoinGeckoClient;
