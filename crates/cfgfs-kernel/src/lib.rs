//! # cfgfs-kernel
//!
//! Presents a fleet of application config files as one virtual directory
//! tree. Every section, option, and list entry becomes its own directory
//! or file, so shell tools can inspect and edit configuration without
//! knowing each format.
//!
//! A source is mounted at `/category/instance/artifact` with one of four
//! [`Style`]s. Reads go through a per-mount snapshot cache that is checked
//! against the source's on-disk fingerprint on every access; writes are
//! persisted atomically before the cache is updated.

pub mod address;
pub mod config;
pub mod style;
pub mod vfs;

pub use address::{Address, AddressError};
pub use config::{MountConfig, MountSpec};
pub use style::{Snapshot, Style, StyleOptions};
pub use vfs::{
    ConfigFs, Depth, DirEntry, FileAttr, FileType, Fingerprint, MountInfo, MountTable, PathParts,
    StaticStatus, StatusSource, VfsError, VfsOps, VfsResult,
};
