//! Configuration management for convo-tracker.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::{AppState, ServerConfig};
use crate::cli::Args;
use crate::session::DEFAULT_LIMIT;
use crate::store::{DocumentStore, MemoryStore, SqliteStore, StorageError};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Document store configuration.
    pub storage: StorageSection,
    /// Event paging configuration.
    pub pagination: PaginationSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local; contents are lost on exit.
    #[default]
    Memory,
    /// SQLite database file.
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            _ => Err(ConfigError::InvalidBackend(s.to_string())),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => f.write_str("memory"),
            StorageBackend::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Document store configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Backend to use.
    pub backend: StorageBackend,
    /// Database file for the SQLite backend.
    pub path: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("convo-tracker.db"),
        }
    }
}

impl StorageSection {
    /// Open the configured store.
    pub fn open(&self) -> Result<Arc<dyn DocumentStore>, ConfigError> {
        match self.backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
            StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&self.path)?)),
        }
    }
}

/// Event paging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSection {
    /// Page size used when a request omits `limit`.
    pub default_limit: u64,
    /// Largest `limit` a client may request.
    pub max_limit: u64,
}

impl Default for PaginationSection {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: crate::api::DEFAULT_MAX_LIMIT,
        }
    }
}

impl PaginationSection {
    /// Check that `0 < default_limit <= max_limit`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::InvalidPagination {
                default_limit: self.default_limit,
                max_limit: self.max_limit,
            });
        }
        Ok(())
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply overrides from an arbitrary variable source.
    ///
    /// Unparseable values are ignored, matching how an unset variable behaves.
    pub fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("CONVO_TRACKER_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("CONVO_TRACKER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(backend) = var("CONVO_TRACKER_STORE").and_then(|b| b.parse().ok()) {
            self.storage.backend = backend;
        }

        if let Some(path) = var("CONVO_TRACKER_DB") {
            self.storage.path = PathBuf::from(path);
        }

        if let Some(level) = var("CONVO_TRACKER_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    ///
    /// Only options given on the command line replace lower layers.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.no_graceful_shutdown {
            self.server.graceful_shutdown = false;
        }

        if let Some(backend) = args.store {
            self.storage.backend = backend;
        }

        if let Some(ref path) = args.db_path {
            self.storage.path = path.clone();
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        Self::load_with_vars(args, |name| std::env::var(name).ok())
    }

    /// [`Config::load`] with the environment supplied by `var`.
    pub fn load_with_vars<F>(args: &Args, var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_vars(var);
        config.apply_args(args);
        config.pagination.validate()?;

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// Open the store and build the shared API state.
    pub fn to_app_state(&self) -> Result<AppState, ConfigError> {
        self.pagination.validate()?;
        let store = self.storage.open()?;
        Ok(AppState::with_store(store)
            .with_page_limits(self.pagination.default_limit, self.pagination.max_limit))
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON parsing error.
    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// Invalid host address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),
    /// Paging limits that cannot serve a default page.
    #[error("invalid pagination: default_limit {default_limit} must be between 1 and max_limit {max_limit}")]
    InvalidPagination {
        /// Configured default page size.
        default_limit: u64,
        /// Configured maximum page size.
        max_limit: u64,
    },
    /// Unknown storage backend name.
    #[error("invalid storage backend: {0} (expected memory or sqlite)")]
    InvalidBackend(String),
    /// The configured store could not be opened.
    #[error("failed to open store: {0}")]
    Storage(#[from] StorageError),
}
