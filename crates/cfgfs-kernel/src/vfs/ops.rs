//! VFS operations trait.
//!
//! The call surface a userspace-filesystem binding drives. Path-based, no
//! inodes, whole-value reads and writes.

use async_trait::async_trait;
use std::path::Path;

use super::VfsResult;
use super::types::{DirEntry, FileAttr};

/// Core VFS operations trait.
///
/// Paths are absolute virtual paths. Implementations normalize them before
/// use, so `..` can never climb out of the tree.
#[async_trait]
pub trait VfsOps: Send + Sync {
    // ========================================================================
    // Reading
    // ========================================================================

    /// Get file attributes.
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Read directory entries, `.` and `..` first.
    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>>;

    /// Read a leaf value, newline-terminated.
    async fn read(&self, path: &Path) -> VfsResult<Vec<u8>>;

    // ========================================================================
    // Writing
    // ========================================================================

    /// Store the first line of `data` as the leaf value.
    ///
    /// Returns the number of bytes accepted.
    async fn write(&self, path: &Path, data: &[u8]) -> VfsResult<u32>;

    /// Create an empty leaf (or, where the tier is a section, an empty
    /// section).
    async fn create(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Create a section directory.
    async fn mkdir(&self, path: &Path) -> VfsResult<FileAttr>;

    /// Remove a leaf.
    async fn unlink(&self, path: &Path) -> VfsResult<()>;

    /// Remove a section and everything in it.
    async fn rmdir(&self, path: &Path) -> VfsResult<()>;

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Returns true if nothing under this filesystem can be written.
    fn read_only(&self) -> bool;

    // ========================================================================
    // Convenience methods (default implementations)
    // ========================================================================

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool {
        self.getattr(path).await.is_ok()
    }

    /// Read a leaf value as a string, without the trailing newline.
    async fn read_string(&self, path: &Path) -> VfsResult<String> {
        let bytes = self.read(path).await?;
        let mut s = String::from_utf8_lossy(&bytes).into_owned();
        if s.ends_with('\n') {
            s.pop();
        }
        Ok(s)
    }

    /// Remove whatever `path` names: a section goes through `rmdir`,
    /// anything else through `unlink`.
    async fn remove(&self, path: &Path) -> VfsResult<()> {
        if self.getattr(path).await?.is_dir() {
            self.rmdir(path).await
        } else {
            self.unlink(path).await
        }
    }
}
