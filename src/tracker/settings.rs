use crate::config::Config;
use crate::constants::DEFAULT_PRICE_POLL_INTERVAL_SECS;
use crate::errors::BridgeError;
use crate::rpc::parse_commitment;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;

/// Runtime parameters of one tracker instance
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub program_id: Pubkey,
    /// Only scan proposals whose asset chain equals this id
    pub chain_filter: Option<u8>,
    pub price_interval: Duration,
    /// Delay between a supply change and the price refresh it pulls forward
    pub update_debounce: Duration,
    pub rescan_interval: Option<Duration>,
}

impl TrackerSettings {
    pub fn new(program_id: Pubkey) -> Self {
        Self {
            program_id,
            chain_filter: None,
            price_interval: Duration::from_secs(DEFAULT_PRICE_POLL_INTERVAL_SECS),
            update_debounce: Duration::from_secs(2),
            rescan_interval: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, BridgeError> {
        let program_id = Pubkey::from_str(config.bridge.program_id.trim()).map_err(|e| {
            BridgeError::configuration("bridge.program_id", e.to_string())
        })?;

        // Checked here so a bad value fails at startup, not on first subscribe
        parse_commitment(&config.rpc.commitment)?;

        if config.pricing.poll_interval_secs == 0 {
            return Err(BridgeError::configuration(
                "pricing.poll_interval_secs",
                "must be greater than 0",
            ));
        }

        let rescan_interval = Some(config.tracker.rescan_interval_secs)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self {
            program_id,
            chain_filter: config.bridge.chain_filter,
            price_interval: Duration::from_secs(config.pricing.poll_interval_secs),
            update_debounce: Duration::from_millis(config.pricing.update_debounce_ms),
            rescan_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_BRIDGE_PROGRAM_ID;

    #[test]
    fn test_from_default_config() {
        let settings = TrackerSettings::from_config(&Config::default()).unwrap();
        assert_eq!(settings.program_id.to_string(), DEFAULT_BRIDGE_PROGRAM_ID);
        assert_eq!(settings.price_interval, Duration::from_secs(30));
        assert_eq!(settings.update_debounce, Duration::from_millis(2_000));
        assert_eq!(settings.rescan_interval, None);
        assert_eq!(settings.chain_filter, None);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut config = Config::default();
        config.bridge.program_id = "not-a-key".to_string();
        assert!(matches!(
            TrackerSettings::from_config(&config),
            Err(BridgeError::Configuration { .. })
        ));

        let mut config = Config::default();
        config.pricing.poll_interval_secs = 0;
        assert!(TrackerSettings::from_config(&config).is_err());

        let mut config = Config::default();
        config.rpc.commitment = "recent".to_string();
        assert!(TrackerSettings::from_config(&config).is_err());
    }

    #[test]
    fn test_rescan_interval_enabled() {
        let mut config = Config::default();
        config.tracker.rescan_interval_secs = 600;
        config.bridge.chain_filter = Some(2);
        let settings = TrackerSettings::from_config(&config).unwrap();
        assert_eq!(settings.rescan_interval, Some(Duration::from_secs(600)));
        assert_eq!(settings.chain_filter, Some(2));
    }
}
