//! Core VFS types.
//!
//! Plain metadata records. A filesystem binding translates these into
//! whatever its own stat structure looks like.

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Reported size of every synthetic directory.
pub const DIR_SIZE: u64 = 4096;

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileType {
    /// Regular file (a leaf value).
    File,
    /// Directory (a collection, instance, source or section).
    Directory,
}

impl FileType {
    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Timestamps copied from a backing source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Times {
    pub mtime: SystemTime,
    pub atime: SystemTime,
    pub ctime: SystemTime,
}

impl Times {
    /// All three timestamps set to `t`.
    pub fn at(t: SystemTime) -> Self {
        Self {
            mtime: t,
            atime: t,
            ctime: t,
        }
    }

    /// Take timestamps from real file metadata.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            mtime,
            atime: meta.accessed().unwrap_or(mtime),
            ctime: ctime_of(meta).unwrap_or(mtime),
        }
    }
}

#[cfg(unix)]
fn ctime_of(meta: &std::fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    let secs = u64::try_from(meta.ctime()).ok()?;
    let nanos = u32::try_from(meta.ctime_nsec()).ok()?;
    SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
}

#[cfg(not(unix))]
fn ctime_of(meta: &std::fs::Metadata) -> Option<SystemTime> {
    meta.created().ok()
}

/// Synthesized file attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAttr {
    /// Size in bytes.
    pub size: u64,
    /// File type.
    pub kind: FileType,
    /// Unix permissions (e.g., 0o644).
    pub perm: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last access time.
    pub atime: SystemTime,
    /// Status change time.
    pub ctime: SystemTime,
    /// Number of hard links.
    pub nlink: u32,
    /// Owner of the backing source, when there is one.
    pub uid: Option<u32>,
    /// Group of the backing source, when there is one.
    pub gid: Option<u32>,
}

impl FileAttr {
    /// Attributes for a leaf holding `size` bytes.
    pub fn file(size: u64, perm: u32, times: Times) -> Self {
        Self {
            size,
            kind: FileType::File,
            perm,
            mtime: times.mtime,
            atime: times.atime,
            ctime: times.ctime,
            nlink: 1,
            uid: None,
            gid: None,
        }
    }

    /// Attributes for a synthetic directory.
    pub fn directory(perm: u32, times: Times) -> Self {
        Self {
            size: DIR_SIZE,
            kind: FileType::Directory,
            perm,
            mtime: times.mtime,
            atime: times.atime,
            ctime: times.ctime,
            nlink: 2, // . and ..
            uid: None,
            gid: None,
        }
    }

    /// Set the owner.
    pub fn with_owner(mut self, uid: Option<u32>, gid: Option<u32>) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    /// Full mode bits (type plus permissions), as `st_mode` would carry them.
    pub fn mode(&self) -> u32 {
        let type_bits = match self.kind {
            FileType::File => 0o100000,
            FileType::Directory => 0o040000,
        };
        type_bits | (self.perm & 0o7777)
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

/// Directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    /// Entry name (not full path).
    pub name: String,
    /// Entry type.
    pub kind: FileType,
}

impl DirEntry {
    /// Create a new directory entry.
    pub fn new(name: impl Into<String>, kind: FileType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, FileType::File)
    }

    /// Create a directory entry.
    pub fn directory(name: impl Into<String>) -> Self {
        Self::new(name, FileType::Directory)
    }

    /// The `.` and `..` pseudo-entries every listing starts with.
    pub fn dots() -> [DirEntry; 2] {
        [Self::directory("."), Self::directory("..")]
    }
}
