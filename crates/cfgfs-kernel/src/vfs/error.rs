//! VFS error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::address::AddressError;

/// VFS error type.
#[derive(Debug, Error)]
pub enum VfsError {
    /// Mounted, but the section or option is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Entry already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Mount is read-only.
    #[error("read-only: {0}")]
    ReadOnly(String),

    /// Expected a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// Expected a file.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Malformed or under-specified key request.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid path for the requested operation.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// No mount point for path.
    #[error("no mount point for path: {0}")]
    NoMountPoint(String),

    /// Backing source could not be read.
    #[error("source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backing source could not be parsed.
    #[error("malformed source {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// Mutation could not be written back to the backing source.
    #[error("persist failed: {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Mount configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// I/O outside a specific source (e.g. a blocking task that died).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists(path.into())
    }

    /// Create a ReadOnly error.
    pub fn read_only(path: impl Into<String>) -> Self {
        Self::ReadOnly(path.into())
    }

    /// Create a NotADirectory error.
    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory(path.into())
    }

    /// Create an IsADirectory error.
    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::IsADirectory(path.into())
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Create a NoMountPoint error.
    pub fn no_mount_point(path: impl Into<String>) -> Self {
        Self::NoMountPoint(path.into())
    }

    pub fn source_unavailable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn persist_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::PersistFailed {
            path: path.into(),
            source,
        }
    }

    /// Attach the virtual path to an address-level failure.
    pub fn from_address(err: AddressError, path: impl Into<String>) -> Self {
        let path = path.into();
        match err {
            AddressError::Invalid(why) => Self::InvalidAddress(format!("{path}: {why}")),
            AddressError::NotFound(_) => Self::NotFound(path),
            AddressError::AlreadyExists(_) => Self::AlreadyExists(path),
        }
    }
}

/// Convert VfsError to std::io::Error so a filesystem binding can map errno.
impl From<VfsError> for io::Error {
    fn from(e: VfsError) -> Self {
        match e {
            VfsError::NotFound(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::AlreadyExists(msg) => io::Error::new(io::ErrorKind::AlreadyExists, msg),
            VfsError::ReadOnly(msg) => io::Error::new(io::ErrorKind::ReadOnlyFilesystem, msg),
            VfsError::NotADirectory(msg) => io::Error::new(io::ErrorKind::NotADirectory, msg),
            VfsError::IsADirectory(msg) => io::Error::new(io::ErrorKind::IsADirectory, msg),
            VfsError::InvalidAddress(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::InvalidPath(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::NoMountPoint(msg) => io::Error::new(io::ErrorKind::NotFound, msg),
            VfsError::SourceUnavailable { source, .. } => source,
            VfsError::PersistFailed { source, .. } => source,
            e @ VfsError::Malformed { .. } => io::Error::new(io::ErrorKind::InvalidData, e.to_string()),
            VfsError::Config(msg) => io::Error::new(io::ErrorKind::InvalidInput, msg),
            VfsError::Io(e) => e,
        }
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;
