use crate::bridge::WrappedAssetRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Published view of the tracker: `{loading, externalAssets, totalInUSD}` plus bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerSnapshot {
    pub loading: bool,
    /// Sorted by asset key
    pub external_assets: Vec<WrappedAssetRecord>,
    #[serde(rename = "totalInUSD")]
    pub total_in_usd: f64,
    /// Incremented by every scan; price results of older generations are dropped
    pub generation: u64,
    /// A price round (successful or not) completed for this generation
    pub priced: bool,
    pub updated_at: DateTime<Utc>,
}

impl TrackerSnapshot {
    pub fn loading() -> Self {
        Self {
            loading: true,
            external_assets: Vec::new(),
            total_in_usd: 0.0,
            generation: 0,
            priced: false,
            updated_at: Utc::now(),
        }
    }

    pub fn from_records(
        records: &HashMap<String, WrappedAssetRecord>,
        total_in_usd: f64,
        generation: u64,
        loading: bool,
        priced: bool,
    ) -> Self {
        let mut external_assets: Vec<WrappedAssetRecord> = records.values().cloned().collect();
        external_assets.sort_by(|a, b| a.address.cmp(&b.address));

        Self {
            loading,
            external_assets,
            total_in_usd,
            generation,
            priced,
            updated_at: Utc::now(),
        }
    }

    pub fn asset(&self, address: &str) -> Option<&WrappedAssetRecord> {
        self.external_assets.iter().find(|a| a.address == address)
    }
}
