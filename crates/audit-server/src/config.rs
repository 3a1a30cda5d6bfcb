//! Server configuration
//!
//! Values come from an optional TOML file, then command line flags override
//! them. Every field has a default, so an empty file is a valid config.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use audit_logging::LogConfig;
use audit_storage::{BlobStoreConfig, DEFAULT_MAX_EVENT_SIZE};
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Parser, Debug, Default)]
#[command(name = "event-audit-server", about = "Stores raw JSON events and serves them back by storage id")]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Address to listen on (overrides the config file)
    #[arg(long)]
    pub listen: Option<SocketAddr>,
    /// Directory for event payloads and the index (overrides the config file)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub storage: StorageSection,
    pub logging: LogConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            storage: StorageSection::default(),
            logging: LogConfig::default(),
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Payload files go to `<data_dir>/events`, the index to `<data_dir>/events.redb`
    pub data_dir: PathBuf,
    pub shard_depth: u8,
    /// Largest accepted event, in bytes
    pub max_event_size: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            shard_depth: 2,
            max_event_size: DEFAULT_MAX_EVENT_SIZE,
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or use defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply command line overrides
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(listen) = cli.listen {
            self.listen_addr = listen;
        }
        if let Some(data_dir) = &cli.data_dir {
            self.storage.data_dir = data_dir.clone();
        }
        if let Some(level) = &cli.log_level {
            self.logging.level = level.clone();
        }
    }

    pub fn blob_store_config(&self) -> BlobStoreConfig {
        BlobStoreConfig {
            shard_depth: self.storage.shard_depth,
            max_blob_size: self.storage.max_event_size as u64,
            ..BlobStoreConfig::in_dir(&self.storage.data_dir)
        }
    }
}
