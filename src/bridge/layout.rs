//! Fixed-layout binary records read from the chain
//!
//! - `TransferOutProposal`: 1184-byte account owned by the bridge program
//! - `MintInfo`: SPL token mint state (82 bytes)
//!
//! Both decoders check the exact span before touching any field.

use super::types::{left_pad_address, AssetMeta};
use crate::constants::{ASSET_ADDRESS_LEN, FOREIGN_ADDRESS_LEN};
use crate::errors::BridgeError;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::Serialize;
use serde_with::{serde_as, DisplayFromStr};
use solana_program::program_option::COption;
use solana_program::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use spl_token::state::Mint;

// ============================================================================
// TRANSFER-OUT PROPOSAL
// ============================================================================

pub const PROPOSAL_VAA_LEN: usize = 1001;

/// Field offsets, little-endian throughout
///
/// The account is a C-layout struct: every `u32` sits on a 4-byte boundary
/// and the total span is padded to a multiple of 4.
pub mod offsets {
    pub const AMOUNT: usize = 0;
    pub const TO_CHAIN: usize = 32;
    pub const SOURCE_ADDRESS: usize = 33;
    pub const FOREIGN_ADDRESS: usize = 65;
    pub const ASSET_ADDRESS: usize = 97;
    pub const ASSET_CHAIN: usize = 129;
    pub const ASSET_DECIMALS: usize = 130;
    pub const NONCE: usize = 132;
    pub const VAA: usize = 136;
    pub const VAA_TIME: usize = 1140;
    pub const LOCKUP_TIME: usize = 1144;
    pub const POKE_COUNTER: usize = 1148;
    pub const SIGNATURE_ACCOUNT: usize = 1149;
    pub const INITIALIZED: usize = 1181;
}

/// Outbound transfer proposal as stored by the bridge program
///
/// The asset address slot is 32 bytes; foreign (EVM) addresses sit in the
/// low-order 20 bytes behind 12 zero bytes.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TransferOutProposal {
    /// u256, little-endian
    pub amount: [u8; 32],
    pub to_chain: u8,
    pub source_address: [u8; 32],
    pub foreign_address: [u8; 32],
    pub asset_address: [u8; ASSET_ADDRESS_LEN],
    pub asset_chain: u8,
    pub asset_decimals: u8,
    nonce_padding: [u8; 1],
    pub nonce: u32,
    pub vaa: [u8; PROPOSAL_VAA_LEN],
    vaa_padding: [u8; 3],
    pub vaa_time: u32,
    pub lockup_time: u32,
    pub poke_counter: u8,
    pub signature_account: [u8; 32],
    pub initialized: bool,
    trailing_padding: [u8; 2],
}

impl TransferOutProposal {
    pub const LEN: usize = 1184;

    /// Empty proposal for one asset; the address is left-padded into its slot
    pub fn new(asset_chain: u8, asset_address: &[u8], asset_decimals: u8) -> Self {
        Self {
            amount: [0; 32],
            to_chain: 0,
            source_address: [0; 32],
            foreign_address: [0; 32],
            asset_address: left_pad_address(asset_address),
            asset_chain,
            asset_decimals,
            nonce_padding: [0; 1],
            nonce: 0,
            vaa: [0; PROPOSAL_VAA_LEN],
            vaa_padding: [0; 3],
            vaa_time: 0,
            lockup_time: 0,
            poke_counter: 0,
            signature_account: [0; 32],
            initialized: true,
            trailing_padding: [0; 2],
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self, BridgeError> {
        if data.len() != Self::LEN {
            return Err(BridgeError::MalformedRecord {
                record: "TransferOutProposal",
                expected: Self::LEN,
                actual: data.len(),
            });
        }

        borsh::from_slice(data).map_err(|e| BridgeError::data("TransferOutProposal", e.to_string()))
    }

    pub fn encode(&self) -> Result<Vec<u8>, BridgeError> {
        let mut buffer = Vec::with_capacity(Self::LEN);
        self.serialize(&mut buffer)
            .map_err(|e| BridgeError::data("TransferOutProposal", e.to_string()))?;
        Ok(buffer)
    }

    /// Low-order 20 bytes of the asset slot (the foreign token address)
    pub fn significant_asset_address(&self) -> &[u8] {
        &self.asset_address[ASSET_ADDRESS_LEN - FOREIGN_ADDRESS_LEN..]
    }

    /// Grouping key: lowercase hex of the significant address bytes
    pub fn asset_key(&self) -> String {
        hex::encode(self.significant_asset_address())
    }

    pub fn asset_meta(&self) -> Result<AssetMeta, BridgeError> {
        AssetMeta::new(
            self.asset_chain,
            self.significant_asset_address().to_vec(),
            self.asset_decimals,
        )
    }
}

// ============================================================================
// MINT STATE
// ============================================================================

/// Decoded SPL mint state
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfo {
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub mint_authority: Option<Pubkey>,
    pub supply: u64,
    pub decimals: u8,
    pub is_initialized: bool,
    #[serde_as(as = "Option<DisplayFromStr>")]
    pub freeze_authority: Option<Pubkey>,
}

fn coption_to_option(value: COption<Pubkey>) -> Option<Pubkey> {
    match value {
        COption::Some(key) => Some(key),
        COption::None => None,
    }
}

impl MintInfo {
    pub const LEN: usize = Mint::LEN;

    pub fn decode(data: &[u8]) -> Result<Self, BridgeError> {
        if data.len() != Self::LEN {
            return Err(BridgeError::MalformedRecord {
                record: "Mint",
                expected: Self::LEN,
                actual: data.len(),
            });
        }

        let mint = Mint::unpack(data).map_err(|e| BridgeError::data("Mint", e.to_string()))?;
        Ok(Self::from(mint))
    }
}

impl From<Mint> for MintInfo {
    fn from(mint: Mint) -> Self {
        Self {
            mint_authority: coption_to_option(mint.mint_authority),
            supply: mint.supply,
            decimals: mint.decimals,
            is_initialized: mint.is_initialized,
            freeze_authority: coption_to_option(mint.freeze_authority),
        }
    }
}
