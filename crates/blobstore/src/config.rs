//! Blobstore configuration with environment variable and file-based loading.
//!
//! Environment variables:
//! - `BLOBSTORE_URL`: Backend locator, e.g. `file:///var/lib/blobs`
//! - `BLOBSTORE_HASH`: Hash algorithm identifier (default: `sha256`)

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::hash::HashAlgorithm;

/// Scheme of the filesystem backend.
pub const FILE_SCHEME: &str = "file";

const DEFAULT_HASH: &str = "sha256";

/// Unvalidated configuration, as read from a file or the environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobstoreConfig {
    /// Backend locator in `scheme://host/path` form.
    pub url: String,

    /// One of `md5`, `sha1`, `sha256`, `sha512`.
    #[serde(default = "default_hash")]
    pub hash: String,
}

fn default_hash() -> String {
    DEFAULT_HASH.to_string()
}

impl BlobstoreConfig {
    pub fn new(url: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            hash: hash.into(),
        }
    }

    /// Configuration for a filesystem store rooted at `dir`.
    pub fn for_dir(dir: impl AsRef<Path>, hash: impl Into<String>) -> Self {
        Self::new(
            format!("{}://{}", FILE_SCHEME, dir.as_ref().display()),
            hash,
        )
    }

    /// Load configuration from environment variables.
    ///
    /// A missing `BLOBSTORE_URL` leaves the url empty, which fails validation.
    pub fn from_env() -> Self {
        Self {
            url: env::var("BLOBSTORE_URL").unwrap_or_default(),
            hash: env::var("BLOBSTORE_HASH").unwrap_or_else(|_| default_hash()),
        }
    }

    /// Load configuration from a TOML file, falling back to environment.
    ///
    /// The file should contain a `[blobstore]` section:
    /// ```toml
    /// [blobstore]
    /// url = "file:///var/lib/blobs"
    /// hash = "sha256"
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let table: toml::Table = contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        match table.get("blobstore") {
            Some(section) => section.clone().try_into().map_err(|e: toml::de::Error| {
                ConfigError::Parse {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            }),
            None => Ok(Self::from_env()),
        }
    }

    /// Resolve the hash algorithm and backend kind.
    ///
    /// The hash identifier is checked first, then the locator scheme. Nothing
    /// touches the filesystem here.
    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let algorithm: HashAlgorithm = self.hash.parse()?;
        let backend = Backend::from_url(&self.url)?;
        Ok(ValidatedConfig { backend, algorithm })
    }
}

/// Configuration whose algorithm and backend have been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub backend: Backend,
    pub algorithm: HashAlgorithm,
}

/// Backend kinds, selected by locator scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Filesystem(Locator),
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self, ConfigError> {
        let locator = Locator::parse(url)?;
        match locator.scheme.as_str() {
            FILE_SCHEME => Ok(Backend::Filesystem(locator)),
            _ => Err(ConfigError::UnsupportedBackendScheme(url.to_string())),
        }
    }
}

/// A parsed `scheme://host/path` locator.
///
/// Host and path are percent-decoded; `path` keeps its leading slash. Query
/// and fragment parts are dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    url: String,
    scheme: String,
    host: String,
    path: String,
}

impl Locator {
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let (scheme, rest) = url
            .split_once(':')
            .filter(|(scheme, _)| !scheme.is_empty())
            .ok_or_else(|| ConfigError::UnsupportedBackendScheme(url.to_string()))?;

        let rest = rest.split(['?', '#']).next().unwrap_or_default();

        let (host, path) = match rest.strip_prefix("//") {
            Some(authority_and_path) => match authority_and_path.find('/') {
                Some(idx) => authority_and_path.split_at(idx),
                None => (authority_and_path, ""),
            },
            None => ("", rest),
        };

        Ok(Self {
            url: url.to_string(),
            scheme: scheme.to_string(),
            host: decode_component(host, url)?,
            path: decode_component(path, url)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// The directory a filesystem backend stores objects in.
    ///
    /// Host and path are joined when both are present, otherwise whichever
    /// one is present is used alone.
    pub fn base_dir(&self) -> Result<PathBuf, ConfigError> {
        let relative_path = self.path.trim_start_matches('/');
        match (self.host.is_empty(), self.path.is_empty()) {
            (false, _) if !relative_path.is_empty() => Ok(Path::new(&self.host).join(relative_path)),
            (false, _) => Ok(PathBuf::from(&self.host)),
            (true, false) => Ok(PathBuf::from(&self.path)),
            (true, true) => Err(ConfigError::MissingPath(self.url.clone())),
        }
    }
}

/// Decode `%XX` escapes. A `%` without two hex digits after it, or escapes
/// that decode to invalid UTF-8, make the whole locator invalid.
fn decode_component(raw: &str, url: &str) -> Result<String, ConfigError> {
    let malformed = raw.split('%').skip(1).any(|rest| {
        rest.len() < 2 || !rest.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit)
    });
    if malformed {
        return Err(ConfigError::InvalidLocator(url.to_string()));
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| ConfigError::InvalidLocator(url.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_dir(url: &str) -> Result<PathBuf, ConfigError> {
        Locator::parse(url)?.base_dir()
    }

    #[test]
    fn test_locator_resolution() {
        for (url, expected) in [
            ("file:///tmp", "/tmp"),
            ("file://data", "data"),
            ("file://./data", "./data"),
            ("file://data/storage", "data/storage"),
            ("file://data/", "data"),
            ("file:/srv/blobs", "/srv/blobs"),
            ("file:///srv/blobs?mode=fast", "/srv/blobs"),
            ("file:///tmp/my%20blobs", "/tmp/my blobs"),
            ("file://my%20data/sub%2Fdir", "my data/sub/dir"),
            ("file:///tmp/caf%C3%A9", "/tmp/café"),
        ] {
            assert_eq!(
                base_dir(url).unwrap(),
                PathBuf::from(expected),
                "wrong base dir for {url}"
            );
        }
    }

    #[test]
    fn test_locator_missing_path() {
        let err = base_dir("file://").unwrap_err();
        assert!(matches!(err, ConfigError::MissingPath(ref url) if url == "file://"));
        assert_eq!(err.to_string(), r#"invalid file url "file://" is missing path"#);
    }

    #[test]
    fn test_locator_malformed_escape() {
        for url in ["file:///tmp/100%", "file:///tmp/%zz", "file://%4/data", "file:///tmp/%FF"] {
            let err = Locator::parse(url).unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidLocator(ref u) if u == url),
                "expected invalid locator for {url:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_locator_parts() {
        let locator = Locator::parse("file://host/some/path").unwrap();
        assert_eq!(locator.scheme(), "file");
        assert_eq!(locator.host(), "host");
        assert_eq!(locator.path(), "/some/path");
        assert_eq!(locator.url(), "file://host/some/path");
    }

    #[test]
    fn test_validate() {
        let validated = BlobstoreConfig::new("file:///tmp/blobs", "sha1").validate().unwrap();
        assert_eq!(validated.algorithm, HashAlgorithm::Sha1);
        assert!(matches!(validated.backend, Backend::Filesystem(_)));
    }

    #[test]
    fn test_validate_unsupported_hash() {
        let err = BlobstoreConfig::new("file:///tmp", "crc32").validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedHashAlgorithm(_)));
    }

    #[test]
    fn test_validate_checks_hash_before_scheme() {
        let err = BlobstoreConfig::new("s3://bucket", "crc32").validate().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedHashAlgorithm(_)));
    }

    #[test]
    fn test_validate_unsupported_scheme() {
        for url in ["s3://bucket/prefix", "gcs://bucket", "/no/scheme", "", "files:///tmp"] {
            let err = BlobstoreConfig::new(url, "sha256").validate().unwrap_err();
            assert!(
                matches!(err, ConfigError::UnsupportedBackendScheme(_)),
                "expected scheme error for {url:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_for_dir() {
        let config = BlobstoreConfig::for_dir("/var/lib/blobs", "md5");
        assert_eq!(config.url, "file:///var/lib/blobs");
        assert_eq!(config.hash, "md5");

        let config = BlobstoreConfig::for_dir("data", "md5");
        assert_eq!(config.url, "file://data");
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = BlobstoreConfig::new("file:///custom/blobs", "sha512");
        let json = serde_json::to_string(&config).unwrap();
        let restored: BlobstoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_serde_default_hash() {
        let config: BlobstoreConfig = serde_json::from_str(r#"{"url": "file:///x"}"#).unwrap();
        assert_eq!(config.hash, "sha256");
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("blobstore.toml");
        std::fs::write(
            &path,
            "[blobstore]\nurl = \"file:///srv/blobs\"\nhash = \"sha1\"\n",
        )
        .unwrap();

        let config = BlobstoreConfig::from_file(&path).unwrap();
        assert_eq!(config, BlobstoreConfig::new("file:///srv/blobs", "sha1"));
    }

    #[test]
    fn test_from_file_parse_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[blobstore\nurl = ").unwrap();

        let err = BlobstoreConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_from_file_missing() {
        let err = BlobstoreConfig::from_file(Path::new("/nonexistent/blobstore.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileRead { .. }));
    }
}
