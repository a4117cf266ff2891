//! Price correlation
//!
//! Resolves each tracked asset to display metadata and a price-feed id,
//! then values it as `amount × usd`. The total always covers every record,
//! including ones that could not be priced this round.

use super::source::PriceSource;
use crate::apis::SimplePriceResponse;
use crate::bridge::WrappedAssetRecord;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::tokens::TokenRegistry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Multiplier used when the feed returns no quote for a resolved id
pub const MISSING_PRICE_MULTIPLIER: f64 = 1.0;

/// Price-feed ids to query and the assets each one values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceRequest {
    assets_by_id: BTreeMap<String, Vec<String>>,
}

impl PriceRequest {
    pub fn insert(&mut self, id: &str, asset_key: &str) {
        self.assets_by_id
            .entry(id.to_string())
            .or_default()
            .push(asset_key.to_string());
    }

    /// Ids in stable order
    pub fn ids(&self) -> Vec<String> {
        self.assets_by_id.keys().cloned().collect()
    }

    pub fn assets_for(&self, id: &str) -> &[String] {
        self.assets_by_id.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.assets_by_id.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets_by_id.len()
    }
}

pub struct PriceCorrelator {
    registry: Arc<TokenRegistry>,
    source: Arc<dyn PriceSource>,
}

impl PriceCorrelator {
    pub fn new(registry: Arc<TokenRegistry>, source: Arc<dyn PriceSource>) -> Self {
        Self { registry, source }
    }

    pub fn source(&self) -> Arc<dyn PriceSource> {
        self.source.clone()
    }

    /// Fill logo/symbol on every record and collect the price-feed ids to query
    pub fn resolve(&self, records: &mut HashMap<String, WrappedAssetRecord>) -> PriceRequest {
        let mut request = PriceRequest::default();

        for (key, record) in records.iter_mut() {
            if let Some(token) = self.registry.foreign_token(&record.foreign_token_key()) {
                record.logo_url = token.logo_uri.clone();
                record.symbol = Some(token.symbol.clone());

                match self.registry.price_feed_id(&token.symbol) {
                    Some(id) => request.insert(id, key),
                    None => logger::debug(
                        LogTag::Pricing,
                        &format!("No price feed id for symbol {}", token.symbol),
                    ),
                }
                continue;
            }

            // Display only: the host list has no price-feed mapping
            let host_token = record
                .mint_address
                .as_ref()
                .and_then(|mint| self.registry.host_token(mint));
            if let Some(token) = host_token {
                if record.symbol.is_none() {
                    record.symbol = Some(token.symbol.clone());
                }
                if record.logo_url.is_none() {
                    record.logo_url = token.logo_uri.clone();
                }
            }
        }

        for keys in request.assets_by_id.values_mut() {
            keys.sort();
        }
        request
    }

    /// Value the requested assets and return the total over all records
    pub fn apply_prices(
        request: &PriceRequest,
        prices: &SimplePriceResponse,
        records: &mut HashMap<String, WrappedAssetRecord>,
    ) -> f64 {
        for (id, keys) in &request.assets_by_id {
            let price = match prices.get(id).and_then(|p| p.usd) {
                Some(usd) => usd,
                None => {
                    logger::debug(
                        LogTag::Pricing,
                        &format!("No quote for {}, using multiplier {}", id, MISSING_PRICE_MULTIPLIER),
                    );
                    MISSING_PRICE_MULTIPLIER
                }
            };

            for key in keys {
                if let Some(record) = records.get_mut(key) {
                    record.amount_in_usd = record.amount as f64 * price;
                }
            }
        }

        Self::total_in_usd(records)
    }

    pub fn total_in_usd(records: &HashMap<String, WrappedAssetRecord>) -> f64 {
        records.values().map(|r| r.amount_in_usd).sum()
    }

    /// Resolve, fetch and apply in one step
    ///
    /// With nothing to price the feed is not called; the total is still computed.
    pub async fn refresh_prices(
        &self,
        records: &mut HashMap<String, WrappedAssetRecord>,
    ) -> Result<f64, BridgeError> {
        let request = self.resolve(records);
        if request.is_empty() {
            return Ok(Self::total_in_usd(records));
        }

        let prices = self.source.fetch_usd_prices(&request.ids()).await?;
        let total = Self::apply_prices(&request, &prices, records);
        logger::debug(
            LogTag::Pricing,
            &format!("Valued {} price ids, total ${:.2}", request.len(), total),
        );
        Ok(total)
    }
}
