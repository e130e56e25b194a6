//! Logging setup on top of `tracing-subscriber`.
//!
//! With file logging enabled, output goes to
//! `~/.config/spotter/logs/spotter.log`. A log file already larger than
//! the configured max size is rotated to `spotter.log.1` (one backup
//! kept) when logging starts. Otherwise output goes to stderr.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "spotter.log";
const BACKUP_FILE_NAME: &str = "spotter.log.1";
const CRATE_TARGETS: [&str; 3] = ["spotter", "spotter_core", "spotter_windows"];

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether file logging is enabled. Defaults to `false`.
    pub enabled: bool,
    /// Minimum log level: "trace", "debug", "info", "warn", or "error".
    pub level: String,
    /// Maximum log file size in megabytes before rotation.
    pub max_file_mb: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            level: "info".into(),
            max_file_mb: 10,
        }
    }
}

/// Installs the global subscriber. Call once at startup.
///
/// `verbose` raises Spotter's own targets to `debug`. `RUST_LOG`, when
/// set, overrides both. Returns the log file path when logging to a file.
pub fn init(config: &LogConfig, verbose: bool) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose)));

    let file = if config.enabled {
        crate::config::config_dir().and_then(|dir| {
            let log_dir = dir.join("logs");
            open_log_file(&log_dir, config.max_file_mb * 1024 * 1024)
                .map(|file| (file, log_dir.join(LOG_FILE_NAME)))
                .inspect_err(|e| eprintln!("Warning: could not open log file: {e}"))
                .ok()
        })
    } else {
        None
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match file {
        Some((file, path)) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            Some(path)
        }
        None => {
            let _ = builder.with_writer(io::stderr).try_init();
            None
        }
    }
}

/// Filter directive for the configured level, e.g. `"info"` or
/// `"warn,spotter=debug,..."` in verbose mode.
pub fn filter_directive(config: &LogConfig, verbose: bool) -> String {
    let level = normalize_level(&config.level);
    if !verbose {
        return level.to_string();
    }
    let mut directive = level.to_string();
    for target in CRATE_TARGETS {
        directive.push_str(&format!(",{target}=debug"));
    }
    directive
}

fn normalize_level(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Opens `spotter.log` in `dir` for appending, rotating it first if it
/// has reached `max_bytes`. A `max_bytes` of 0 disables rotation.
pub fn open_log_file(dir: &Path, max_bytes: u64) -> io::Result<File> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE_NAME);
    let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    if max_bytes > 0 && size >= max_bytes {
        fs::rename(&path, dir.join(BACKUP_FILE_NAME))?;
    }
    OpenOptions::new().create(true).append(true).open(&path)
}
