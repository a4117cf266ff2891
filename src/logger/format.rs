//! Log formatting and output with ANSI colors
//!
//! Console lines are colored per tag and level; file lines carry the full
//! timestamp and no escape codes. Broken pipes (e.g. `| head`) are ignored.

use super::file::write_to_file;
use super::levels::LogLevel;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Log format widths for alignment
const TAG_WIDTH: usize = 9;
const LEVEL_WIDTH: usize = 7;

pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let now = Local::now();
    let time = now.format("%H:%M:%S").to_string();

    let console_line = format!(
        "{} [{}] [{}] {}",
        time.dimmed(),
        format_tag(&tag),
        format_level(level),
        format_message(level, message)
    );
    print_stdout_safe(&console_line);

    let file_line = format!(
        "{} [{}] [{}] {}",
        now.format("%Y-%m-%d %H:%M:%S"),
        tag.to_plain_string(),
        level.as_str(),
        message
    );
    write_to_file(&file_line);
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let label = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => label.bright_yellow().bold(),
        LogTag::Config => label.bright_white().bold(),
        LogTag::Rpc => label.bright_green().bold(),
        LogTag::Websocket => label.bright_blue().bold(),
        LogTag::Scanner => label.bright_cyan().bold(),
        LogTag::Cache => label.bright_magenta().bold(),
        LogTag::Pricing => label.cyan().bold(),
        LogTag::Tracker => label.green().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let label = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => label.red().bold(),
        LogLevel::Warning => label.yellow().bold(),
        LogLevel::Info => label.normal(),
        LogLevel::Debug => label.purple(),
        LogLevel::Verbose => label.dimmed(),
    }
}

fn format_message(level: LogLevel, message: &str) -> ColoredString {
    match level {
        LogLevel::Error => message.red(),
        LogLevel::Warning => message.yellow(),
        LogLevel::Debug | LogLevel::Verbose => message.dimmed(),
        LogLevel::Info => message.normal(),
    }
}

fn print_stdout_safe(line: &str) {
    let mut out = stdout().lock();
    if let Err(e) = writeln!(out, "{}", line) {
        if e.kind() != ErrorKind::BrokenPipe {
            eprintln!("{}", line);
        }
    }
}
