//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Where collections are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    File,
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `STORAGE_BACKEND`: `memory` or `file` (default: `file`)
/// - `DATA_DIR`: directory of the JSON files (default: `"data"`)
/// - `INVENTORY_FILE_NAME`, `INVENTORY_LOCKS_FILE_NAME`, `ORDERS_FILE_NAME`
/// - `ORDER_COMPLETION_TIMEOUT_MS`: wait limit for `?wait=true` placements (default: `7000`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage_backend: StorageBackend,
    pub data_dir: PathBuf,
    pub inventory_file_name: String,
    pub inventory_locks_file_name: String,
    pub orders_file_name: String,
    pub order_completion_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(f) if f.eq_ignore_ascii_case("pretty") => LogFormat::Pretty,
            _ => defaults.log_format,
        };
        let storage_backend = match lookup("STORAGE_BACKEND").as_deref().map(str::trim) {
            Some(b) if b.eq_ignore_ascii_case("memory") => StorageBackend::Memory,
            Some(b) if b.eq_ignore_ascii_case("file") => StorageBackend::File,
            _ => defaults.storage_backend,
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format,
            storage_backend,
            data_dir: lookup("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            inventory_file_name: lookup("INVENTORY_FILE_NAME")
                .unwrap_or(defaults.inventory_file_name),
            inventory_locks_file_name: lookup("INVENTORY_LOCKS_FILE_NAME")
                .unwrap_or(defaults.inventory_locks_file_name),
            orders_file_name: lookup("ORDERS_FILE_NAME").unwrap_or(defaults.orders_file_name),
            order_completion_timeout: lookup("ORDER_COMPLETION_TIMEOUT_MS")
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.order_completion_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::File,
            data_dir: PathBuf::from("data"),
            inventory_file_name: "inventory.json".to_string(),
            inventory_locks_file_name: "inventory_locks.json".to_string(),
            orders_file_name: "orders.json".to_string(),
            order_completion_timeout: Duration::from_millis(7000),
        }
    }
}
