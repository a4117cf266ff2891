/// Bridge asset types shared by the scanner, cache and pricing layers
use super::layout::MintInfo;
use crate::constants::{ASSET_ADDRESS_LEN, HOST_CHAIN_ID, MAX_WRAPPED_DECIMALS};
use crate::errors::BridgeError;
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use solana_sdk::pubkey::Pubkey;

/// Left-pad an address into the 32-byte slot used by bridge seeds and records
///
/// Longer inputs keep their low-order 32 bytes.
pub fn left_pad_address(address: &[u8]) -> [u8; ASSET_ADDRESS_LEN] {
    let mut padded = [0u8; ASSET_ADDRESS_LEN];
    let len = address.len().min(ASSET_ADDRESS_LEN);
    padded[ASSET_ADDRESS_LEN - len..].copy_from_slice(&address[address.len() - len..]);
    padded
}

// ============================================================================
// ASSET IDENTITY
// ============================================================================

/// Identifies an asset on its origin chain. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetMeta {
    chain_id: u8,
    address: Vec<u8>,
    decimals: u8,
}

impl AssetMeta {
    pub fn new(chain_id: u8, address: impl Into<Vec<u8>>, decimals: u8) -> Result<Self, BridgeError> {
        let address = address.into();
        if address.len() > ASSET_ADDRESS_LEN {
            return Err(BridgeError::data(
                "asset address",
                format!(
                    "{} bytes exceeds the {}-byte address slot",
                    address.len(),
                    ASSET_ADDRESS_LEN
                ),
            ));
        }

        Ok(Self {
            chain_id,
            address,
            decimals,
        })
    }

    pub fn chain_id(&self) -> u8 {
        self.chain_id
    }

    pub fn address(&self) -> &[u8] {
        &self.address
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Decimals the bridge uses for the wrapped mint (capped at 9)
    pub fn wrapped_decimals(&self) -> u8 {
        self.decimals.min(MAX_WRAPPED_DECIMALS)
    }

    pub fn padded_address(&self) -> [u8; ASSET_ADDRESS_LEN] {
        left_pad_address(&self.address)
    }

    pub fn origin(&self) -> AssetOrigin {
        if self.chain_id == HOST_CHAIN_ID {
            AssetOrigin::Native {
                address: Pubkey::new_from_array(self.padded_address()),
            }
        } else {
            AssetOrigin::Foreign {
                chain_id: self.chain_id,
                address: self.padded_address(),
                decimals: self.wrapped_decimals(),
            }
        }
    }
}

/// Where an asset lives: already on the host chain, or wrapped from elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// Host-native asset; its address is already a host address
    Native { address: Pubkey },
    /// Foreign asset; the wrapped mint must be derived (decimals already capped)
    Foreign {
        chain_id: u8,
        address: [u8; ASSET_ADDRESS_LEN],
        decimals: u8,
    },
}

// ============================================================================
// TRACKED RECORD
// ============================================================================

/// One tracked foreign asset, keyed by the hex of its significant address bytes
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedAssetRecord {
    pub chain: u8,
    pub decimals: u8,
    /// Lowercase hex without `0x`; unique per foreign asset
    pub address: String,
    /// Derived wrapped mint; `None` until derivation ran
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub mint_address: Option<Pubkey>,
    /// Last mint state seen by the cache (the cache owns the authoritative copy)
    pub mint_state: Option<MintInfo>,
    /// Raw mint supply
    pub amount: u64,
    #[serde(rename = "amountInUSD")]
    pub amount_in_usd: f64,
    pub logo_url: Option<String>,
    pub symbol: Option<String>,
}

impl WrappedAssetRecord {
    pub fn new(chain: u8, decimals: u8, address: String) -> Self {
        Self {
            chain,
            decimals,
            address,
            mint_address: None,
            mint_state: None,
            amount: 0,
            amount_in_usd: 0.0,
            logo_url: None,
            symbol: None,
        }
    }

    pub fn asset_meta(&self) -> Result<AssetMeta, BridgeError> {
        let bytes = hex::decode(&self.address)
            .map_err(|e| BridgeError::data(format!("asset key '{}'", self.address), e.to_string()))?;
        AssetMeta::new(self.chain, bytes, self.decimals)
    }

    /// Key into the foreign-chain token directory (`0x` + hex)
    pub fn foreign_token_key(&self) -> String {
        format!("0x{}", self.address)
    }

    /// Refresh supply from a mint state; valuation is left to the next price refresh
    pub fn apply_mint_state(&mut self, mint: &MintInfo) {
        self.amount = mint.supply;
        self.mint_state = Some(mint.clone());
    }
}
