//! Content addressable blob storage.
//!
//! Callers hand over a byte stream and get back a name derived from its
//! content (the lowercase hex digest). The same name later fetches the
//! original bytes.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use blobstore::{Blobstore, BlobstoreConfig, ContentStore};
//! use std::io::Read;
//!
//! let config = BlobstoreConfig::new("file:///var/lib/blobs", "sha256");
//! let store = Blobstore::new(&config).unwrap();
//!
//! // Store content
//! let name = store.store(&b"Hello, World!"[..]).unwrap();
//! println!("Stored as: {}", name);
//!
//! // Retrieve content
//! if let Some(mut reader) = store.fetch(&name).unwrap() {
//!     let mut data = Vec::new();
//!     reader.read_to_end(&mut data).unwrap();
//!     println!("Got {} bytes", data.len());
//! }
//! ```
//!
//! # Configuration
//!
//! Embedding programs can build a [`BlobstoreConfig`] directly, or load one
//! with [`BlobstoreConfig::from_env`] or [`BlobstoreConfig::from_file`]. The
//! `blobstore` binary does not use these loaders; it has its own
//! `.blobstore.toml` format with `dirname` and `hashfunc` keys.
//!
//! Environment variables read by `from_env`:
//! - `BLOBSTORE_URL`: Backend locator, e.g. `file:///var/lib/blobs`
//! - `BLOBSTORE_HASH`: One of `md5`, `sha1`, `sha256`, `sha512` (default `sha256`)
//!
//! `from_file` reads a `[blobstore]` table from a TOML file and falls back to
//! the environment when the table is absent:
//!
//! ```toml
//! [blobstore]
//! url = "file:///var/lib/blobs"
//! hash = "sha256"
//! ```
//!
//! ```rust,no_run
//! use blobstore::{Blobstore, BlobstoreConfig};
//! use std::path::Path;
//!
//! let config = BlobstoreConfig::from_file(Path::new("/etc/myapp/blobstore.toml"))
//!     .unwrap_or_else(|_| BlobstoreConfig::from_env());
//! let store = Blobstore::new(&config).unwrap();
//! ```
//!
//! Locators are percent-decoded, so `file:///srv/my%20blobs` names the
//! directory `/srv/my blobs`.
//!
//! # Shared Storage
//!
//! Several processes may store into the same directory at once:
//! - Objects are write-once (content-addressed = no conflicts)
//! - Publishing is a single hard link, so readers never see partial objects
//! - No locking required

pub mod config;
pub mod error;
pub mod filesystem;
pub mod hash;
pub mod store;

// Re-exports for convenience
pub use config::{Backend, BlobstoreConfig, Locator, ValidatedConfig};
pub use error::{BlobError, ConfigError};
pub use filesystem::FileStore;
pub use hash::{is_object_name, HashAlgorithm};
pub use store::{BlobReader, Blobstore, ContentStore};
