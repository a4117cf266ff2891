/// Live account cache for wrapped mints
pub mod mints;

pub use mints::{CacheMetrics, MintCache};
