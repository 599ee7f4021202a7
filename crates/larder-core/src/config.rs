// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Runtime configuration of the cache, read from a `Larder.toml` file.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use thiserror::Error;

/// An error raised while reading or validating a [`CacheConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration '{path}': {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML for a [`CacheConfig`].
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of its accepted range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables of the cache and of the directory package loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of slots the table starts with.
    pub initial_capacity: u32,
    /// Occupancy (in percent of capacity) at which the table doubles.
    pub load_factor_percent: u32,
    /// Written-slot share (in percent of capacity) at which the table is
    /// rehashed in place to clear tombstones.
    pub tombstone_rehash_percent: u32,
    /// Directory packages are read from.
    pub bundle_root: PathBuf,
}

impl Default for CacheConfig {
    /// 1024 slots, doubling at 70% occupancy, packages under `assets/bundles`.
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            load_factor_percent: 70,
            tombstone_rehash_percent: 90,
            bundle_root: PathBuf::from("assets/bundles"),
        }
    }
}

impl CacheConfig {
    /// Parses and validates a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration at `path`, or the defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::info!(
                "No '{}' found. Using default cache configuration.",
                path.display()
            );
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loaded cache configuration from '{}'.", path.display());
        Self::from_toml_str(&text)
    }

    /// Rejects values the table cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capacity < 2 {
            return Err(ConfigError::Invalid(format!(
                "initial_capacity must be at least 2, got {}",
                self.initial_capacity
            )));
        }
        if !(1..=99).contains(&self.load_factor_percent) {
            return Err(ConfigError::Invalid(format!(
                "load_factor_percent must be within 1..=99, got {}",
                self.load_factor_percent
            )));
        }
        if self.tombstone_rehash_percent <= self.load_factor_percent
            || self.tombstone_rehash_percent > 100
        {
            return Err(ConfigError::Invalid(format!(
                "tombstone_rehash_percent must be within {}..=100, got {}",
                self.load_factor_percent + 1,
                self.tombstone_rehash_percent
            )));
        }
        Ok(())
    }
}
