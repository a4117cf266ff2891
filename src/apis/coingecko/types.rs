use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Entry of `/coins/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinGeckoCoin {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub platforms: Option<HashMap<String, Option<String>>>,
}

/// One id of a `/simple/price` response; a missing quote stays `None`
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimplePrice {
    pub usd: Option<f64>,
}

/// `/simple/price` response keyed by coin id
pub type SimplePriceResponse = HashMap<String, SimplePrice>;
