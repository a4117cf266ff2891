/// Token metadata directories (host list, foreign list, price-feed coin ids)
pub mod registry;

pub use registry::{TokenInfo, TokenRegistry};
