//! Scratch directory lifecycle for downloaded log files.
//!
//! The scratch directory is wiped and recreated at the start of every run and
//! is exclusively owned by that run. Deletions here are idempotent by
//! contract: a missing target counts as success, never as an error.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors raised by scratch directory operations.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ScratchError {
    /// Raised when the scratch directory cannot be created.
    #[error("failed to create scratch directory {path}: {message}")]
    Create {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a pre-existing file or directory cannot be removed.
    #[error("failed to remove {path}: {message}")]
    Remove {
        /// Path that could not be removed.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when appending a downloaded chunk fails.
    #[error("failed to append to {path}: {message}")]
    Append {
        /// File that could not be written.
        path: Utf8PathBuf,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a remote log file name yields no usable base name.
    #[error("remote log file name '{name}' has no base name")]
    InvalidName {
        /// Remote name that failed derivation.
        name: String,
    },
}

/// A run-scoped working directory holding downloaded log files.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScratchDir {
    root: Utf8PathBuf,
}

impl ScratchDir {
    /// Removes any pre-existing directory at `root` and recreates it empty.
    ///
    /// Calling this twice in a row leaves an empty, existing directory both
    /// times.
    ///
    /// # Errors
    ///
    /// Returns [`ScratchError::Remove`] when an existing tree cannot be
    /// deleted and [`ScratchError::Create`] when recreation fails.
    pub fn prepare(root: impl Into<Utf8PathBuf>) -> Result<Self, ScratchError> {
        let root = root.into();
        match fs::remove_dir_all(&root) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(ScratchError::Remove {
                    path: root,
                    message: err.to_string(),
                });
            }
        }
        fs::create_dir_all(&root).map_err(|err| ScratchError::Create {
            path: root.clone(),
            message: err.to_string(),
        })?;
        Ok(Self { root })
    }

    /// Returns the scratch directory path.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Derives the local output path for a remote log file name.
    ///
    /// Only the base name is kept, so `error/postgresql.log.2024-01-02-09`
    /// lands directly inside the scratch directory.
    ///
    /// # Errors
    ///
    /// Returns [`ScratchError::InvalidName`] when the remote name has no base
    /// name component.
    pub fn local_path(&self, remote_name: &str) -> Result<Utf8PathBuf, ScratchError> {
        let base = Utf8Path::new(remote_name)
            .file_name()
            .ok_or_else(|| ScratchError::InvalidName {
                name: remote_name.to_owned(),
            })?;
        Ok(self.root.join(base))
    }
}

/// Deletes `path` if it exists; a missing file is a success, not an error.
///
/// # Errors
///
/// Returns [`ScratchError::Remove`] for any failure other than the file being
/// absent.
pub fn remove_file_if_exists(path: &Utf8Path) -> Result<(), ScratchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(ScratchError::Remove {
            path: path.to_path_buf(),
            message: err.to_string(),
        }),
    }
}

/// Appends `data` verbatim to `path`, creating the file on first write.
///
/// # Errors
///
/// Returns [`ScratchError::Append`] when the file cannot be opened or
/// written.
pub fn append_chunk(path: &Utf8Path, data: &str) -> Result<(), ScratchError> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| ScratchError::Append {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
    file.write_all(data.as_bytes())
        .map_err(|err| ScratchError::Append {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
}
