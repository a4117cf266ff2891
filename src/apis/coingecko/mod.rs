/// CoinGecko API client
///
/// API Documentation: https://docs.coingecko.com/reference/introduction
///
/// Endpoints implemented:
/// 1. /simple/price?ids=..&vs_currencies=usd - USD quotes for coin ids
/// 2. /coins/list - every coin id with its symbol (symbol → id directory)
pub mod types;

use self::types::{CoinGeckoCoin, SimplePriceResponse};
use crate::apis::client::HttpClient;
use crate::config::PricingConfig;
use crate::constants::{COINGECKO_API_KEY_HEADER, PRICE_QUOTE_CURRENCY};
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::pricing::PriceSource;
use async_trait::async_trait;
use url::Url;

pub struct CoinGeckoClient {
    http_client: HttpClient,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(config: &PricingConfig) -> Result<Self, BridgeError> {
        let http_client = HttpClient::new(config.timeout_secs, config.max_requests_per_minute)?;
        let api_key = Some(config.api_key.trim().to_string()).filter(|k| !k.is_empty());

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn headers(&self) -> Vec<(&str, &str)> {
        match &self.api_key {
            Some(key) => vec![(COINGECKO_API_KEY_HEADER, key.as_str())],
            None => Vec::new(),
        }
    }

    pub fn simple_price_url(&self, ids: &[String]) -> Result<String, BridgeError> {
        let url = Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            &[
                ("ids", ids.join(",")),
                ("vs_currencies", PRICE_QUOTE_CURRENCY.to_string()),
            ],
        )
        .map_err(|e| BridgeError::configuration("pricing.base_url", e.to_string()))?;
        Ok(url.to_string())
    }

    /// USD quotes for `ids`; ids the feed does not know are absent from the map
    pub async fn fetch_simple_prices(&self, ids: &[String]) -> Result<SimplePriceResponse, BridgeError> {
        if ids.is_empty() {
            return Ok(SimplePriceResponse::new());
        }

        let url = self.simple_price_url(ids)?;
        logger::debug(LogTag::Pricing, &format!("GET {}", url));

        let prices: SimplePriceResponse = self.http_client.get_json(&url, &self.headers()).await?;
        logger::debug(
            LogTag::Pricing,
            &format!("Received {} quotes for {} ids", prices.len(), ids.len()),
        );
        Ok(prices)
    }

    /// Fetch all coins (id, symbol, name)
    pub async fn fetch_coins_list(&self) -> Result<Vec<CoinGeckoCoin>, BridgeError> {
        let url = format!("{}/coins/list", self.base_url);
        let coins: Vec<CoinGeckoCoin> = self.http_client.get_json(&url, &self.headers()).await?;
        logger::info(LogTag::Pricing, &format!("Loaded {} coins from CoinGecko", coins.len()));
        Ok(coins)
    }
}

#[async_trait]
impl PriceSource for CoinGeckoClient {
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<SimplePriceResponse, BridgeError> {
        self.fetch_simple_prices(ids).await
    }
}
