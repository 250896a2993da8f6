//! Atomic TOML file operations.
//!
//! Every write goes to a uniquely named temporary file in the target
//! directory, is fsynced, and is then renamed over the target. Conditional
//! updates additionally hold an exclusive `fs2` lock on a sidecar `.lock` file
//! so that read-check-write sequences from several processes never interleave.

use fs2::FileExt;
use serde::{Serialize, de::DeserializeOwned};
use std::fs::{self, File, OpenOptions};
use std::io::Write as IoWrite;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vanity_core::VanityError;

/// Errors that can occur during atomic TOML operations.
#[derive(Debug, Error)]
pub enum AtomicTomlError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Lock error on {path}: {message}")]
    Lock { path: PathBuf, message: String },
}

impl From<AtomicTomlError> for VanityError {
    fn from(err: AtomicTomlError) -> Self {
        match err {
            AtomicTomlError::Parse { path, source } => VanityError::Serialization {
                format: "TOML".to_string(),
                message: format!("{}: {}", path.display(), source),
            },
            AtomicTomlError::Serialize(e) => e.into(),
            other => VanityError::store(other.to_string()),
        }
    }
}

/// A handle to one TOML document on disk.
pub struct AtomicTomlFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicTomlFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads and deserializes the file.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(T))`: Successfully loaded and deserialized
    /// - `Ok(None)`: File doesn't exist or is empty
    /// - `Err`: Failed to read or parse the file
    pub fn load(&self) -> Result<Option<T>, AtomicTomlError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| AtomicTomlError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Replaces the file contents atomically.
    pub fn save(&self, data: &T) -> Result<(), AtomicTomlError> {
        let parent = self.parent()?;
        fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;

        let toml_string = toml::to_string_pretty(data)?;

        // Unique per call so concurrent saves of one key never share a temp file.
        let tmp_path = parent.join(format!(
            ".{}.{}.tmp",
            self.file_name(),
            uuid::Uuid::new_v4().simple()
        ));
        let written = (|| {
            let mut tmp_file = File::create(&tmp_path)?;
            tmp_file.write_all(toml_string.as_bytes())?;
            tmp_file.sync_all()?;
            drop(tmp_file);
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(self.io_error(e));
        }
        Ok(())
    }

    /// Writes `data` only if `should_replace` accepts the current contents.
    ///
    /// The check and the write happen under an exclusive file lock.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The predicate accepted and the file was replaced
    /// - `Ok(false)`: The predicate rejected; the file is unchanged
    /// - `Err`: Failed to lock, read or write
    pub fn replace_if<F>(&self, data: &T, should_replace: F) -> Result<bool, AtomicTomlError>
    where
        F: FnOnce(Option<&T>) -> bool,
    {
        let _lock = FileLock::acquire(&self.path)?;
        let current = self.load()?;
        if !should_replace(current.as_ref()) {
            return Ok(false);
        }
        self.save(data)?;
        Ok(true)
    }

    fn parent(&self) -> Result<&Path, AtomicTomlError> {
        self.path.parent().ok_or_else(|| AtomicTomlError::Io {
            path: self.path.clone(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            ),
        })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn io_error(&self, source: std::io::Error) -> AtomicTomlError {
        AtomicTomlError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// An exclusive lock released when dropped.
///
/// The lock file itself stays on disk; removing it would let a second process
/// lock a fresh inode while the first still holds the old one.
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self, AtomicTomlError> {
        let lock_path = path.with_extension("lock");
        let lock_err = |message: String| AtomicTomlError::Lock {
            path: lock_path.clone(),
            message,
        };

        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| lock_err(e.to_string()))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| lock_err(e.to_string()))?;

        file.lock_exclusive()
            .map_err(|e| lock_err(format!("Failed to acquire lock: {}", e)))?;

        Ok(FileLock { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        count: u32,
    }

    fn counter(count: u32) -> Counter {
        Counter {
            name: "test".to_string(),
            count,
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("nested/test.toml"));

        file.save(&counter(42)).unwrap();

        assert_eq!(file.load().unwrap(), Some(counter(42)));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("missing.toml"));

        assert!(file.load().unwrap().is_none());
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "name = ").unwrap();

        let err = AtomicTomlFile::<Counter>::new(path).load().unwrap_err();
        assert!(matches!(err, AtomicTomlError::Parse { .. }));
        assert!(matches!(
            VanityError::from(err),
            VanityError::Serialization { .. }
        ));
    }

    #[test]
    fn test_replace_if() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("test.toml"));
        file.save(&counter(1)).unwrap();

        let replaced = file
            .replace_if(&counter(2), |current| current.map(|c| c.count) == Some(1))
            .unwrap();
        assert!(replaced);

        let replaced = file
            .replace_if(&counter(3), |current| current.map(|c| c.count) == Some(1))
            .unwrap();
        assert!(!replaced);
        assert_eq!(file.load().unwrap(), Some(counter(2)));
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = TempDir::new().unwrap();
        let file = AtomicTomlFile::<Counter>::new(temp_dir.path().join("test.toml"));
        file.save(&counter(1)).unwrap();
        file.save(&counter(2)).unwrap();

        let leftovers = fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }
}
