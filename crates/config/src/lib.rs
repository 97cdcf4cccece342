#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for apkforge
//!
//! Settings are layered from:
//! - Default values (hard-coded)
//! - A builder configuration file (TOML)
//! - Environment variables
//! - CLI flags (applied by the caller)

pub mod constants;

use apkforge_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

pub use constants::*;

/// Builder configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuilderConfig {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub packaging: PackagingSettings,
}

/// Where packages are staged, written and logged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Root output directory; artifacts land in `{out_dir}/{arch}`
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    /// Directory containing `melange-out/{package}` staging trees
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: PathBuf,
    /// Root of the guest filesystem used for user/group name lookups
    #[serde(default = "default_guest_dir")]
    pub guest_dir: PathBuf,
    #[serde(default = "default_build_log_dir")]
    pub build_log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackagingSettings {
    /// Fixed timestamp (seconds since the Unix epoch) used for every
    /// archive entry and for `builddate`
    #[serde(default)]
    pub source_date_epoch: u64,
    #[serde(default)]
    pub strip_origin_name: bool,
    #[serde(default)]
    pub create_build_log: bool,
    /// Prefix of the per-arch dependency log; disabled when unset
    #[serde(default)]
    pub dependency_log: Option<PathBuf>,
    #[serde(default)]
    pub signing: SigningSettings,
    #[serde(default)]
    pub compression: CompressionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SigningSettings {
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub passphrase: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionSettings {
    /// Number of compressor workers, 0 = auto-detect
    #[serde(default)]
    pub threads: usize,
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

/// Compressor parallelism resolved once per process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipConcurrency {
    pub threads: usize,
    pub block_size: usize,
}

impl GzipConcurrency {
    /// Single-threaded settings, mostly useful in tests
    #[must_use]
    pub fn serial() -> Self {
        Self {
            threads: 1,
            block_size: DEFAULT_COMPRESSION_BLOCK_SIZE,
        }
    }
}

impl Default for GzipConcurrency {
    fn default() -> Self {
        CompressionSettings::default().resolve()
    }
}

impl CompressionSettings {
    /// Resolve the configured values against host parallelism
    #[must_use]
    pub fn resolve(&self) -> GzipConcurrency {
        let threads = if self.threads == 0 {
            num_cpus::get().min(MAX_COMPRESSION_THREADS)
        } else {
            self.threads
        };
        GzipConcurrency {
            threads: threads.max(1),
            block_size: self.block_size.max(MIN_COMPRESSION_BLOCK_SIZE),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            workspace_dir: default_workspace_dir(),
            guest_dir: default_guest_dir(),
            build_log_dir: default_build_log_dir(),
        }
    }
}

impl Default for PackagingSettings {
    fn default() -> Self {
        Self {
            source_date_epoch: 0,
            strip_origin_name: false,
            create_build_log: false,
            dependency_log: None,
            signing: SigningSettings::default(),
            compression: CompressionSettings::default(),
        }
    }
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            threads: 0,
            block_size: default_block_size(),
        }
    }
}

// Default value functions for serde
fn default_out_dir() -> PathBuf {
    PathBuf::from("packages")
}

fn default_workspace_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_guest_dir() -> PathBuf {
    PathBuf::from("/")
}

fn default_build_log_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_block_size() -> usize {
    DEFAULT_COMPRESSION_BLOCK_SIZE
}

impl BuilderConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, fails to parse, or
    /// holds values outside their allowed range.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the given file, or fall back to defaults when no path is given
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(path) => Self::load_from_file(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for a block size below the minimum.
    pub fn validate(&self) -> Result<(), Error> {
        let block_size = self.packaging.compression.block_size;
        if block_size < MIN_COMPRESSION_BLOCK_SIZE {
            return Err(ConfigError::InvalidValue {
                field: "packaging.compression.block_size".to_string(),
                value: block_size.to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Merge environment variables over file values
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // SOURCE_DATE_EPOCH
        if let Ok(epoch) = std::env::var("SOURCE_DATE_EPOCH") {
            if !epoch.trim().is_empty() {
                self.packaging.source_date_epoch =
                    epoch.trim().parse().map_err(|_| ConfigError::InvalidValue {
                        field: "SOURCE_DATE_EPOCH".to_string(),
                        value: epoch.clone(),
                    })?;
            }
        }

        // APKFORGE_OUT_DIR
        if let Ok(dir) = std::env::var("APKFORGE_OUT_DIR") {
            if dir.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "APKFORGE_OUT_DIR".to_string(),
                    value: dir,
                }
                .into());
            }
            self.paths.out_dir = PathBuf::from(dir);
        }

        // APKFORGE_SIGNING_KEY
        if let Ok(key) = std::env::var("APKFORGE_SIGNING_KEY") {
            self.packaging.signing.key = (!key.is_empty()).then(|| PathBuf::from(key));
        }

        // APKFORGE_SIGNING_PASSPHRASE
        if let Ok(passphrase) = std::env::var("APKFORGE_SIGNING_PASSPHRASE") {
            self.packaging.signing.passphrase = Some(passphrase);
        }

        Ok(())
    }

    /// Output directory for one architecture
    #[must_use]
    pub fn arch_out_dir(&self, arch: &str) -> PathBuf {
        self.paths.out_dir.join(arch)
    }
}
