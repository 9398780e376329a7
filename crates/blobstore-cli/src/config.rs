//! Config file discovery and merging for the blobstore CLI.
//!
//! Values are resolved in order (later wins):
//! 1. `.blobstore.toml` in the current directory, else in the home directory
//! 2. Environment variables (`BLOBSTORE_DIRNAME`, `BLOBSTORE_HASHFUNC`)
//! 3. Command line flags
//!
//! ```toml
//! dirname = "/var/lib/blobs"
//! hashfunc = "sha256"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use blobstore::BlobstoreConfig;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = ".blobstore.toml";

/// Settings that may come from a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CliConfig {
    pub dirname: Option<PathBuf>,
    pub hashfunc: Option<String>,
}

impl CliConfig {
    /// Load the config file, if any.
    ///
    /// An explicit path must exist. Without one, the current directory is
    /// searched first, then the home directory. No file at all is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => discover_config_file(),
        };

        match path {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::debug!("no config file found");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Overlay values given on the command line or in the environment.
    pub fn merge(self, dirname: Option<PathBuf>, hashfunc: Option<String>) -> Self {
        Self {
            dirname: dirname.or(self.dirname),
            hashfunc: hashfunc.or(self.hashfunc),
        }
    }

    /// Build the store configuration. Both settings are required.
    pub fn into_store_config(self) -> Result<BlobstoreConfig> {
        let Some(dirname) = self.dirname.filter(|d| !d.as_os_str().is_empty()) else {
            bail!(r#""dirname" is required but none was given"#);
        };
        let Some(hashfunc) = self.hashfunc.filter(|h| !h.is_empty()) else {
            bail!(r#""hashfunc" is required but none was given"#);
        };
        Ok(BlobstoreConfig::for_dir(dirname, hashfunc))
    }
}

fn discover_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.exists())
}
