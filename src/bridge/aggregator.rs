//! Scan bridge proposals into one record per foreign asset
//!
//! 1. Fetch every `TransferOutProposal` owned by the bridge program
//! 2. Decode, drop host-chain assets, group by significant address (first wins)
//! 3. Derive each group's wrapped mint and build the mint → asset index

use super::layout::{offsets, TransferOutProposal};
use super::pda::BridgeAddresses;
use super::types::WrappedAssetRecord;
use crate::constants::HOST_CHAIN_ID;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use crate::rpc::{AccountSource, RpcFilterType};
use rayon::prelude::*;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of one full scan
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Keyed by the asset's hex address
    pub assets: HashMap<String, WrappedAssetRecord>,
    /// Wrapped mint → asset key
    pub by_mint: HashMap<Pubkey, String>,
    /// Proposal accounts ignored because their bytes did not decode
    pub skipped: usize,
}

impl ScanResult {
    /// Mint addresses in a stable order
    pub fn mint_addresses(&self) -> Vec<Pubkey> {
        let mut mints: Vec<Pubkey> = self.by_mint.keys().copied().collect();
        mints.sort();
        mints
    }

    pub fn record_for_mint_mut(
        &mut self,
        mint: &Pubkey,
    ) -> Result<&mut WrappedAssetRecord, BridgeError> {
        let key = self
            .by_mint
            .get(mint)
            .ok_or_else(|| BridgeError::MissingDerivedKey {
                key: mint.to_string(),
            })?;
        self.assets
            .get_mut(key)
            .ok_or_else(|| BridgeError::MissingDerivedKey { key: key.clone() })
    }
}

/// Group decoded proposals by asset; returns the groups and the skip count
pub fn group_proposals<'a, I>(accounts: I) -> (HashMap<String, WrappedAssetRecord>, usize)
where
    I: IntoIterator<Item = (&'a Pubkey, &'a [u8])>,
{
    let mut assets = HashMap::new();
    let mut skipped = 0usize;

    for (pubkey, data) in accounts {
        let proposal = match TransferOutProposal::decode(data) {
            Ok(p) => p,
            Err(e) => {
                logger::debug(LogTag::Scanner, &format!("Skipping {}: {}", pubkey, e));
                skipped += 1;
                continue;
            }
        };

        if proposal.asset_chain == HOST_CHAIN_ID {
            continue;
        }

        assets.entry(proposal.asset_key()).or_insert_with_key(|key| {
            WrappedAssetRecord::new(proposal.asset_chain, proposal.asset_decimals, key.clone())
        });
    }

    (assets, skipped)
}

/// Derive every record's wrapped mint and index records by mint
pub fn derive_mint_index(
    addresses: &BridgeAddresses,
    assets: &mut HashMap<String, WrappedAssetRecord>,
) -> Result<HashMap<Pubkey, String>, BridgeError> {
    let metas = assets
        .iter()
        .map(|(key, record)| Ok((key.clone(), record.asset_meta()?)))
        .collect::<Result<Vec<_>, BridgeError>>()?;

    // find_program_address walks bumps with a sha256 per try; spread it out
    let derived = metas
        .par_iter()
        .map(|(key, meta)| addresses.wrapped_mint(meta).map(|mint| (key.clone(), mint)))
        .collect::<Result<Vec<_>, BridgeError>>()?;

    let mut by_mint = HashMap::with_capacity(derived.len());
    for (key, mint) in derived {
        let record = assets
            .get_mut(&key)
            .ok_or_else(|| BridgeError::MissingDerivedKey { key: key.clone() })?;
        record.mint_address = Some(mint);
        by_mint.insert(mint, key);
    }

    Ok(by_mint)
}

pub struct AccountAggregator {
    source: Arc<dyn AccountSource>,
    addresses: BridgeAddresses,
}

impl AccountAggregator {
    pub fn new(source: Arc<dyn AccountSource>, addresses: BridgeAddresses) -> Self {
        Self { source, addresses }
    }

    pub fn addresses(&self) -> &BridgeAddresses {
        &self.addresses
    }

    pub fn build_filters(chain_filter: Option<u8>) -> Vec<RpcFilterType> {
        let mut filters = vec![RpcFilterType::DataSize(TransferOutProposal::LEN as u64)];
        if let Some(chain) = chain_filter {
            filters.push(RpcFilterType::memcmp(offsets::ASSET_CHAIN, &[chain]));
        }
        filters
    }

    pub async fn scan(&self, chain_filter: Option<u8>) -> Result<ScanResult, BridgeError> {
        let accounts = self
            .source
            .get_program_accounts(self.addresses.program_id(), Self::build_filters(chain_filter))
            .await?;

        let (mut assets, skipped) = group_proposals(
            accounts
                .iter()
                .map(|(pubkey, account)| (pubkey, account.data.as_slice())),
        );

        let addresses = self.addresses;
        let (assets, by_mint) = tokio::task::spawn_blocking(move || {
            let by_mint = derive_mint_index(&addresses, &mut assets)?;
            Ok::<_, BridgeError>((assets, by_mint))
        })
        .await
        .map_err(|e| BridgeError::data("mint derivation task", e.to_string()))??;

        logger::info(
            LogTag::Scanner,
            &format!(
                "Scanned {} proposals: {} wrapped assets, {} skipped",
                accounts.len(),
                assets.len(),
                skipped
            ),
        );

        Ok(ScanResult {
            assets,
            by_mint,
            skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{proposal_account, test_addresses, MockAccountSource};

    fn eth_address(last: u8) -> [u8; 20] {
        let mut address = [0u8; 20];
        address[19] = last;
        address
    }

    #[tokio::test]
    async fn test_scan_groups_and_drops_host_chain() {
        let source = Arc::new(MockAccountSource::new());
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0a), 8));
        source.add_program_account(Pubkey::new_unique(), proposal_account(1, &eth_address(0x0b), 6));

        let aggregator = AccountAggregator::new(source, test_addresses());
        let result = aggregator.scan(None).await.unwrap();

        assert_eq!(result.assets.len(), 1);
        let record = result.assets.get(&hex::encode(eth_address(0x0a))).unwrap();
        assert_eq!(record.chain, 2);
        assert_eq!(record.decimals, 8);
        assert!(record.mint_address.is_some());
        assert_eq!(result.by_mint.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_keeps_first_proposal_per_asset() {
        let source = Arc::new(MockAccountSource::new());
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0c), 8));
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0c), 6));

        let aggregator = AccountAggregator::new(source, test_addresses());
        let result = aggregator.scan(None).await.unwrap();

        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.assets.values().next().unwrap().decimals, 8);
    }

    #[tokio::test]
    async fn test_scan_skips_malformed_accounts() {
        let source = Arc::new(MockAccountSource::new());
        source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(0x0d), 8));
        let mut short = proposal_account(2, &eth_address(0x0e), 8);
        short.data.truncate(1000);
        source.add_program_account(Pubkey::new_unique(), short);

        let aggregator = AccountAggregator::new(source, test_addresses());
        let result = aggregator.scan(None).await.unwrap();

        assert_eq!(result.assets.len(), 1);
        assert_eq!(result.skipped, 1);
    }

    #[tokio::test]
    async fn test_scan_index_matches_deriver() {
        let source = Arc::new(MockAccountSource::new());
        for last in 1..=20u8 {
            source.add_program_account(Pubkey::new_unique(), proposal_account(2, &eth_address(last), 18));
        }

        let addresses = test_addresses();
        let aggregator = AccountAggregator::new(source, addresses);
        let mut result = aggregator.scan(None).await.unwrap();

        assert_eq!(result.by_mint.len(), 20);
        for mint in result.mint_addresses() {
            let record = result.record_for_mint_mut(&mint).unwrap();
            let expected = addresses.wrapped_mint(&record.asset_meta().unwrap()).unwrap();
            assert_eq!(record.mint_address, Some(expected));
            assert_eq!(expected, mint);
        }
    }

    #[tokio::test]
    async fn test_scan_sends_chain_filter() {
        let source = Arc::new(MockAccountSource::new());
        let aggregator = AccountAggregator::new(source.clone(), test_addresses());
        aggregator.scan(Some(2)).await.unwrap();

        let filters = source.last_filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0], RpcFilterType::DataSize(1184));
        assert_eq!(
            filters[1],
            RpcFilterType::Memcmp {
                offset: 129,
                bytes: bs58::encode([2u8]).into_string()
            }
        );
    }

    #[test]
    fn test_record_for_unknown_mint_is_missing_key() {
        let mut result = ScanResult::default();
        let mint = Pubkey::new_unique();
        result.by_mint.insert(mint, "deadbeef".to_string());

        assert!(matches!(
            result.record_for_mint_mut(&mint),
            Err(BridgeError::MissingDerivedKey { .. })
        ));
        assert!(matches!(
            result.record_for_mint_mut(&Pubkey::new_unique()),
            Err(BridgeError::MissingDerivedKey { .. })
        ));
    }
}
