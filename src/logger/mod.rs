//! Structured logging for bridgescope
//!
//! - Standard log levels (Error/Warning/Info/Debug/Verbose)
//! - Per-tag debug control (`--debug rpc,cache`)
//! - Dual output: colored console + optional plain-text file
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bridgescope::logger::{self, LogTag};
//!
//! logger::info(LogTag::Scanner, "Scan finished: 12 assets");
//! logger::debug(LogTag::Rpc, "getProgramAccounts params: ..."); // Only with --debug rpc
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{get_logger_config, set_logger_config, LoggerConfig};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger system
///
/// Call once at startup, before services start. `debug_tags` enables debug
/// output for the named tags ("all" enables every tag).
pub fn init(debug_tags: &[String], verbose: bool, file_path: Option<&str>) {
    config::init(debug_tags, verbose);

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        if let Err(e) = file::init_file_logging(path) {
            eprintln!("Failed to open log file '{}': {}", path, e);
        }
    }
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only when debug is enabled for the tag)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only with --verbose)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Flush pending file writes; call during shutdown
pub fn flush() {
    file::flush_file_logging();
}
