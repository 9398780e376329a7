//! FileStore: content addressable storage in a flat local directory.
//!
//! Layout:
//! ```text
//! {base_dir}/               # mode 0700
//! ├── 2c26b46b68ffc68f...   # one file per object, named by lowercase hex digest
//! ├── fcde2b2edba56bf4...
//! └── .blob-Xy12ab          # in-flight temporary file (default scratch location)
//! ```
//!
//! A store streams its input once, into a temporary file and a running hash
//! at the same time. The finished file is then hard linked to its digest
//! name if no object by that name exists yet. Two writers of the same
//! content race only on that link, and the loser sees `AlreadyExists`, which
//! is the outcome it wanted anyway. The temporary name is always removed.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use digest::DynDigest;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::Locator;
use crate::error::{BlobError, IoResultExt, Result};
use crate::hash::{is_object_name, HashAlgorithm};
use crate::store::ContentStore;

/// Prefix for temporary files. Never valid hex, so never mistaken for an object.
const TEMP_PREFIX: &str = ".blob-";

const COPY_BUF_SIZE: usize = 64 * 1024;

/// What staged bytes are written through on their way into the temporary file.
type Sink = for<'f> fn(&'f mut File) -> Box<dyn Write + 'f>;

fn file_sink(file: &mut File) -> Box<dyn Write + '_> {
    Box::new(file)
}

/// Filesystem-based content store.
#[derive(Debug, Clone)]
pub struct FileStore {
    base_dir: PathBuf,
    scratch_dir: Option<PathBuf>,
    algorithm: HashAlgorithm,
}

/// How an object ended up under its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Publish {
    /// This call created the directory entry.
    Created,
    /// An object with the same name was already present.
    Existing,
}

impl FileStore {
    /// Open a store at the directory named by a `file://` locator.
    ///
    /// Creates the base directory and any missing ancestors with owner-only
    /// permissions. An existing directory is reused as-is.
    pub fn open(locator: &Locator, algorithm: HashAlgorithm) -> Result<Self> {
        let base_dir = locator.base_dir()?;
        Self::at_path(base_dir, algorithm)
    }

    /// Open a store at a specific directory.
    pub fn at_path(path: impl Into<PathBuf>, algorithm: HashAlgorithm) -> Result<Self> {
        let base_dir = path.into();
        create_private_dir(&base_dir).context("failed to create base directory")?;

        info!(base_dir = %base_dir.display(), %algorithm, "opened filesystem blobstore");

        Ok(Self {
            base_dir,
            scratch_dir: None,
            algorithm,
        })
    }

    /// Write temporary files somewhere other than the base directory.
    ///
    /// If the scratch directory is on another filesystem, publishing falls
    /// back to copying into the base directory first.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn scratch_dir(&self) -> &Path {
        self.scratch_dir.as_deref().unwrap_or(&self.base_dir)
    }

    fn object_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    /// Check if an object exists without opening it.
    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_some()
    }

    /// Get the filesystem path for an object, if it is stored.
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        if !is_object_name(name) {
            return None;
        }
        let path = self.object_path(name);
        path.is_file().then_some(path)
    }

    /// Names of all stored objects, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.base_dir).context("failed to list base directory")? {
            let entry = entry.context("failed to list base directory")?;
            if let Some(name) = entry.file_name().to_str() {
                if is_object_name(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Stream `reader` into a fresh temporary file, hashing the bytes as they
    /// are written. Returns the synced temporary file, the object name, and
    /// the number of bytes copied.
    fn stage<R: Read>(&self, reader: R) -> Result<(NamedTempFile, String, u64)> {
        self.stage_with(reader, file_sink)
    }

    fn stage_with<R: Read>(
        &self,
        mut reader: R,
        sink: Sink,
    ) -> Result<(NamedTempFile, String, u64)> {
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(self.scratch_dir())
            .context("failed to create temporary file")?;

        let mut hasher = self.algorithm.hasher();
        let copied = {
            let mut writer = sink(temp.as_file_mut());
            copy_and_hash(&mut reader, &mut writer, hasher.as_mut())
        };
        let size = match copied {
            Ok(size) => size,
            Err(e) => {
                discard(temp);
                return Err(e);
            }
        };
        drop(reader);

        if let Err(e) = temp.as_file().sync_all().context("failed to close temporary file") {
            discard(temp);
            return Err(e);
        }

        Ok((temp, hex::encode(hasher.finalize()), size))
    }

    /// Make `staged` visible as `name` unless an object by that name exists.
    fn publish(&self, staged: &Path, name: &str) -> Result<Publish> {
        let target = self.object_path(name);

        if target
            .try_exists()
            .context("failed to check for existing object")?
        {
            return Ok(Publish::Existing);
        }

        match link_if_absent(staged, &target) {
            Ok(outcome) => Ok(outcome),
            Err(e) if is_cross_device(&e) => {
                debug!(scratch = %staged.display(), "scratch dir on another filesystem, copying");
                self.publish_copy(staged, &target)
            }
            Err(e) => Err(BlobError::Io {
                context: "failed to publish object",
                source: e,
            }),
        }
    }

    /// Copy `staged` into the base directory, then link that copy into place.
    fn publish_copy(&self, staged: &Path, target: &Path) -> Result<Publish> {
        let mut local = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.base_dir)
            .context("failed to create temporary file")?;

        let outcome = copy_file(staged, local.as_file_mut())
            .context("failed to copy object into base directory")
            .and_then(|()| {
                link_if_absent(local.path(), target).context("failed to publish object")
            });

        discard(local);
        outcome
    }
}

impl ContentStore for FileStore {
    type Reader = File;

    fn store<R: Read>(&self, reader: R) -> Result<String> {
        let (temp, name, size) = self.stage(reader)?;

        let outcome = self.publish(temp.path(), &name);
        discard(temp);

        match outcome? {
            Publish::Created => debug!(%name, size, "stored new object"),
            Publish::Existing => debug!(%name, size, "object already stored"),
        }

        Ok(name)
    }

    fn fetch(&self, name: &str) -> Result<Option<File>> {
        if !is_object_name(name) {
            debug!(%name, "not a valid object name");
            return Ok(None);
        }

        match File::open(self.object_path(name)) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(%name, "object not found");
                Ok(None)
            }
            Err(e) => Err(BlobError::Io {
                context: "failed to open object",
                source: e,
            }),
        }
    }
}

/// Copy all of `reader` into `writer`, feeding the hasher only with bytes
/// that were written successfully.
fn copy_and_hash<R, W>(reader: &mut R, writer: &mut W, hasher: &mut dyn DynDigest) -> Result<u64>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUF_SIZE];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(BlobError::Io {
                    context: "failed to read input",
                    source: e,
                })
            }
        };

        writer
            .write_all(&buf[..n])
            .context("failed to write temporary file")?;
        hasher.update(&buf[..n]);
        total += n as u64;
    }
}

fn link_if_absent(src: &Path, target: &Path) -> io::Result<Publish> {
    match fs::hard_link(src, target) {
        Ok(()) => Ok(Publish::Created),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(Publish::Existing),
        Err(e) => Err(e),
    }
}

fn copy_file(src: &Path, dest: &mut File) -> io::Result<()> {
    let mut source = File::open(src)?;
    io::copy(&mut source, dest)?;
    dest.sync_all()
}

/// Remove a temporary file. Failure is logged, never returned.
fn discard(temp: NamedTempFile) {
    let path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        warn!(path = %path.display(), error = %e, "failed to remove temporary file");
    }
}

#[cfg(unix)]
fn is_cross_device(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EXDEV)
}

#[cfg(not(unix))]
fn is_cross_device(_e: &io::Error) -> bool {
    false
}

#[cfg(unix)]
fn create_private_dir(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(path)
}

#[cfg(not(unix))]
fn create_private_dir(path: &Path) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(path)
}
