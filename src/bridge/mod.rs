/// Bridge domain: asset identity, program-derived addresses, on-chain record
/// layouts and the proposal scanner
pub mod aggregator;
pub mod layout;
pub mod pda;
pub mod types;

pub use aggregator::{AccountAggregator, ScanResult};
pub use layout::{MintInfo, TransferOutProposal};
pub use pda::{
    derive_config_address, derive_wrapped_meta_address, derive_wrapped_mint_address,
    BridgeAddresses,
};
pub use types::{AssetMeta, AssetOrigin, WrappedAssetRecord};
