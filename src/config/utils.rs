//! Configuration utilities - loading and access helpers

use super::schemas::Config;
use crate::errors::BridgeError;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::path::Path;

/// Global configuration instance, set once by `load_config_from_path`
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Parse a configuration file without touching the global instance
///
/// A missing file yields the defaults.
pub fn read_config_file(path: &str) -> Result<Config, BridgeError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| BridgeError::configuration(path, format!("failed to read: {}", e)))?;

    toml::from_str::<Config>(&contents)
        .map_err(|e| BridgeError::configuration(path, format!("failed to parse: {}", e)))
}

/// Load configuration from disk and initialize the global CONFIG
pub fn load_config_from_path(path: &str) -> Result<(), BridgeError> {
    let config = read_config_file(path)?;

    CONFIG
        .set(RwLock::new(config))
        .map_err(|_| BridgeError::configuration("config", "already initialized"))?;

    logger::debug(LogTag::Config, &format!("Configuration loaded from {}", path));
    Ok(())
}

/// Execute a function with read access to the configuration
///
/// Falls back to the defaults when nothing was loaded yet.
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => f(&lock.read()),
        None => f(&Config::default()),
    }
}

/// Clone of the entire configuration, for use across await points
pub fn get_config_clone() -> Config {
    with_config(|cfg| cfg.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = read_config_file("/nonexistent/bridgescope.toml").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rpc.commitment, "confirmed");
        assert_eq!(config.bridge.chain_filter, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[pricing]\npoll_interval_secs = 5\n\n[bridge]\nchain_filter = 2\n"
        )
        .unwrap();

        let config = read_config_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.pricing.poll_interval_secs, 5);
        assert_eq!(config.bridge.chain_filter, Some(2));
        assert_eq!(config.pricing.base_url, crate::constants::COINGECKO_BASE_URL);
        assert_eq!(config.rpc, crate::config::RpcConfig::default());
    }

    #[test]
    fn test_invalid_file_is_configuration_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pricing]\npoll_interval_secs = \"soon\"").unwrap();

        let err = read_config_file(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, BridgeError::Configuration { .. }));
    }
}
