/// Valuation: token metadata correlation and USD price application
pub mod correlator;
pub mod source;

pub use correlator::{PriceCorrelator, PriceRequest, MISSING_PRICE_MULTIPLIER};
pub use source::PriceSource;
