/// Runtime logger configuration
use super::levels::LogLevel;
use super::tags::LogTag;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,
    /// Tags with debug output enabled
    pub debug_tags: HashSet<LogTag>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Debug,
            debug_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

pub(super) fn init(debug_tags: &[String], verbose: bool) {
    let mut config = LoggerConfig::default();

    for key in debug_tags {
        if key.eq_ignore_ascii_case("all") {
            config.debug_tags.extend(LogTag::ALL);
        } else if let Some(tag) = LogTag::from_debug_key(key) {
            config.debug_tags.insert(tag);
        } else {
            eprintln!("Unknown debug tag '{}' ignored", key);
        }
    }

    if verbose {
        config.min_level = LogLevel::Verbose;
    }

    set_logger_config(config);
}

pub(super) fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(tag)
}
