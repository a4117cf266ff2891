use crate::apis::SimplePriceResponse;
use crate::errors::BridgeError;
use async_trait::async_trait;

/// USD quotes by price-feed id
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Ids the feed does not know are simply absent from the result
    async fn fetch_usd_prices(&self, ids: &[String]) -> Result<SimplePriceResponse, BridgeError>;
}
