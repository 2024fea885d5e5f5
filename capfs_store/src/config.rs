//! Store configuration
//!
//! A store is described by the path of its backing file and the size of its
//! root capability. The cell count, and therefore the exact file length, is
//! derived from `size_bits`, so a store must always be reopened with the
//! same `size_bits` it was created with.
//!
//! Configuration can be built in code or loaded from a JSON document:
//!
//! ```json
//! { "path": "/var/lib/capfs/store.bin", "size_bits": 24, "create": true }
//! ```

use capfs_hal::{CELL_DATA_SIZE, CELL_SIZE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Smallest store: a single slot
pub const MIN_SIZE_BITS: u8 = 3;

/// Largest store the token format can describe
pub const MAX_SIZE_BITS: u8 = capfs_types::MAX_SIZE_BITS;

pub const DEFAULT_SIZE_BITS: u8 = 24;

/// Errors related to loading or validating configuration
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backing file
    pub path: PathBuf,
    /// Root capability covers `2^size_bits` bytes
    #[serde(default = "default_size_bits")]
    pub size_bits: u8,
    /// Create and size the backing file if it does not exist
    #[serde(default = "default_create")]
    pub create: bool,
}

fn default_size_bits() -> u8 {
    DEFAULT_SIZE_BITS
}

fn default_create() -> bool {
    true
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            size_bits: DEFAULT_SIZE_BITS,
            create: true,
        }
    }

    pub fn with_size_bits(mut self, size_bits: u8) -> Self {
        self.size_bits = size_bits;
        self
    }

    pub fn with_create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Loads and validates a JSON config file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data =
            fs::read_to_string(path.as_ref()).map_err(|err| ConfigError::Io(err.to_string()))?;
        let config: StoreConfig =
            serde_json::from_str(&data).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("path cannot be empty".to_string()));
        }
        if !(MIN_SIZE_BITS..=MAX_SIZE_BITS).contains(&self.size_bits) {
            return Err(ConfigError::Invalid(format!(
                "size_bits {} outside {}..={}",
                self.size_bits, MIN_SIZE_BITS, MAX_SIZE_BITS
            )));
        }
        Ok(())
    }

    /// Root capability size in bytes
    pub fn root_size(&self) -> u64 {
        1 << self.size_bits
    }

    /// Cells needed to hold `root_size()` data bytes
    pub fn cell_count(&self) -> u64 {
        cells_for(self.root_size())
    }

    /// Addressable data bytes; at least `root_size()`
    pub fn capacity(&self) -> u64 {
        self.cell_count() * CELL_DATA_SIZE as u64
    }

    /// Exact length of the backing file
    pub fn file_len(&self) -> u64 {
        self.cell_count() * CELL_SIZE as u64
    }
}

/// Cells needed for `bytes` data bytes, rounded up.
pub fn cells_for(bytes: u64) -> u64 {
    bytes.div_ceil(CELL_DATA_SIZE as u64)
}
