//! Program-derived addresses of the bridge
//!
//! All derivations use the host chain's `find_program_address` scheme (seed list +
//! program id, bump searched from 255 down), so results match on-chain bit-for-bit.

use super::types::{AssetMeta, AssetOrigin};
use crate::constants::{BRIDGE_CONFIG_SEED, WRAPPED_META_SEED, WRAPPED_MINT_SEED};
use crate::errors::BridgeError;
use solana_sdk::pubkey::Pubkey;

fn find_address(seeds: &[&[u8]], program_id: &Pubkey, label: &str) -> Result<Pubkey, BridgeError> {
    Pubkey::try_find_program_address(seeds, program_id)
        .map(|(address, _bump)| address)
        .ok_or_else(|| BridgeError::DerivationFailed {
            seed: label.to_string(),
        })
}

/// Config PDA, seed `"bridge"`
pub fn derive_config_address(program_id: &Pubkey) -> Result<Pubkey, BridgeError> {
    find_address(&[BRIDGE_CONFIG_SEED], program_id, "bridge")
}

/// Wrapped mint of an asset
///
/// Host-native assets are returned as-is. Foreign assets derive from
/// `["wrapped", config, chain, min(decimals, 9), padded address]`.
pub fn derive_wrapped_mint_address(
    program_id: &Pubkey,
    config_address: &Pubkey,
    asset: &AssetMeta,
) -> Result<Pubkey, BridgeError> {
    match asset.origin() {
        AssetOrigin::Native { address } => Ok(address),
        AssetOrigin::Foreign {
            chain_id,
            address,
            decimals,
        } => find_address(
            &[
                WRAPPED_MINT_SEED,
                config_address.as_ref(),
                &[chain_id],
                &[decimals],
                &address,
            ],
            program_id,
            "wrapped",
        ),
    }
}

/// Wrapped meta PDA, seeds `["meta", config, mint]`
pub fn derive_wrapped_meta_address(
    program_id: &Pubkey,
    config_address: &Pubkey,
    mint_address: &Pubkey,
) -> Result<Pubkey, BridgeError> {
    find_address(
        &[WRAPPED_META_SEED, config_address.as_ref(), mint_address.as_ref()],
        program_id,
        "meta",
    )
}

/// Bridge program id with its config address computed once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeAddresses {
    program_id: Pubkey,
    config_address: Pubkey,
}

impl BridgeAddresses {
    pub fn new(program_id: Pubkey) -> Result<Self, BridgeError> {
        let config_address = derive_config_address(&program_id)?;
        Ok(Self {
            program_id,
            config_address,
        })
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn config_address(&self) -> &Pubkey {
        &self.config_address
    }

    pub fn wrapped_mint(&self, asset: &AssetMeta) -> Result<Pubkey, BridgeError> {
        derive_wrapped_mint_address(&self.program_id, &self.config_address, asset)
    }

    pub fn wrapped_meta(&self, mint_address: &Pubkey) -> Result<Pubkey, BridgeError> {
        derive_wrapped_meta_address(&self.program_id, &self.config_address, mint_address)
    }
}
