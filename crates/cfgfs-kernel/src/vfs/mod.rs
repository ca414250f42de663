//! Virtual Filesystem over config sources.
//!
//! Key components:
//!
//! - [`VfsOps`] - Core trait for filesystem operations
//! - [`MountTable`] - Binds `/category/instance/artifact` prefixes to sources
//! - [`ConfigFs`] - Dispatches operations onto mounted snapshots
//! - [`PathParts`] - Decomposes a virtual path into its five slots
//!
//! ## Design Decisions
//!
//! - **Path-based, no inodes**: Operations use paths, not inode numbers.
//!   A userspace-filesystem binding handles inode ↔ path mapping.
//! - **Whole-value I/O**: A leaf is read and written as one line, no
//!   offsets or handles.
//! - **Stat before every use**: Cached snapshots are checked against their
//!   source's fingerprint on each access, so out-of-band edits show up.

mod error;
mod fs;
mod mount;
mod ops;
pub mod path;
pub mod status;
mod types;

pub use error::{VfsError, VfsResult};
pub use fs::ConfigFs;
pub use mount::{Fingerprint, MountEntry, MountInfo, MountTable, SourceView};
pub use ops::VfsOps;
pub use path::{Depth, PathParts};
pub use status::{StaticStatus, StatusSource};
pub use types::{DIR_SIZE, DirEntry, FileAttr, FileType, Times};
