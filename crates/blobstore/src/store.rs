//! The storage contract and backend selection.
//!
//! `ContentStore` is what every backend provides. `Blobstore` is the closed
//! set of backends, picked from the locator scheme of a validated
//! configuration.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use tracing::warn;

use crate::config::{Backend, BlobstoreConfig, ValidatedConfig};
use crate::error::Result;
use crate::filesystem::FileStore;
use crate::hash::HashAlgorithm;

/// Trait for content storage backends.
pub trait ContentStore: Send + Sync {
    /// Readable handle returned by `fetch`.
    type Reader: Read;

    /// Store every byte of `reader`, returning the object's name.
    ///
    /// Storing identical content again returns the same name and leaves a
    /// single stored copy.
    fn store<R: Read>(&self, reader: R) -> Result<String>;

    /// Open the named object for reading.
    ///
    /// Returns `Ok(None)` if no object has that name.
    fn fetch(&self, name: &str) -> Result<Option<Self::Reader>>;
}

/// A configured blob store.
#[derive(Debug, Clone)]
pub enum Blobstore {
    Filesystem(FileStore),
}

impl Blobstore {
    /// Validate `config` and open the backend it names.
    pub fn new(config: &BlobstoreConfig) -> Result<Self> {
        Self::from_validated(config.validate()?)
    }

    pub fn from_validated(config: ValidatedConfig) -> Result<Self> {
        if config.algorithm.is_weak() {
            warn!(
                algorithm = %config.algorithm,
                "configured hash algorithm is not collision resistant"
            );
        }

        match config.backend {
            Backend::Filesystem(locator) => {
                Ok(Blobstore::Filesystem(FileStore::open(&locator, config.algorithm)?))
            }
        }
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Blobstore::Filesystem(store) => store.algorithm(),
        }
    }

    /// Local directory holding the objects, for filesystem backends.
    pub fn base_dir(&self) -> Option<&Path> {
        match self {
            Blobstore::Filesystem(store) => Some(store.base_dir()),
        }
    }

    pub fn exists(&self, name: &str) -> bool {
        match self {
            Blobstore::Filesystem(store) => store.exists(name),
        }
    }

    pub fn list(&self) -> Result<Vec<String>> {
        match self {
            Blobstore::Filesystem(store) => store.list(),
        }
    }
}

/// Reader over a fetched object.
#[derive(Debug)]
pub enum BlobReader {
    File(File),
}

impl Read for BlobReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            BlobReader::File(file) => file.read(buf),
        }
    }
}

impl ContentStore for Blobstore {
    type Reader = BlobReader;

    fn store<R: Read>(&self, reader: R) -> Result<String> {
        match self {
            Blobstore::Filesystem(store) => store.store(reader),
        }
    }

    fn fetch(&self, name: &str) -> Result<Option<BlobReader>> {
        match self {
            Blobstore::Filesystem(store) => Ok(store.fetch(name)?.map(BlobReader::File)),
        }
    }
}
