/// Core logging implementation with automatic filtering
use super::config::{get_logger_config, is_debug_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Filtering rules:
/// 1. Errors are always shown
/// 2. Levels above the configured threshold are dropped
/// 3. Debug requires the tag to be enabled (or --verbose)
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    if level == LogLevel::Error {
        return true;
    }

    let config = get_logger_config();
    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug {
        return config.min_level == LogLevel::Verbose || is_debug_enabled_for_tag(tag);
    }

    true
}

pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level, message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::config::{set_logger_config, LoggerConfig};

    #[test]
    fn test_filtering_rules() {
        let mut config = LoggerConfig::default();
        config.debug_tags.insert(LogTag::Rpc);
        set_logger_config(config);

        assert!(should_log(&LogTag::Cache, LogLevel::Error));
        assert!(should_log(&LogTag::Cache, LogLevel::Info));
        assert!(should_log(&LogTag::Rpc, LogLevel::Debug));
        assert!(!should_log(&LogTag::Cache, LogLevel::Debug));
        assert!(!should_log(&LogTag::Rpc, LogLevel::Verbose));

        set_logger_config(LoggerConfig::default());
    }
}
