//! Mount table and snapshot cache.
//!
//! Each mount binds a `/category/instance/artifact` prefix to a style and a
//! backing source, and caches the parsed [`Snapshot`] together with the
//! [`Fingerprint`] of the file it was parsed from. Every lookup re-stats
//! the source and reloads on mismatch, so callers never see a stale
//! snapshot. Each entry has its own lock; there is no table-wide lock held
//! across I/O.

use std::collections::BTreeMap;
use std::fs::Metadata;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};

use super::error::{VfsError, VfsResult};
use super::path::{Depth, PathParts};
use super::types::Times;
use crate::address::AddressError;
use crate::config::MountSpec;
use crate::style::{Snapshot, Style, StyleOptions};

/// Cheap summary of a backing source's on-disk state.
///
/// Modification time, size, device and inode. No content hash: a rewrite
/// that keeps all four (same length, mtime restored, same inode) goes
/// unnoticed. Replacing the file (new inode) or changing mtime or size is
/// always noticed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub mtime: Option<SystemTime>,
    pub size: u64,
    pub dev: u64,
    pub ino: u64,
}

impl Fingerprint {
    #[cfg(unix)]
    pub fn of(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            mtime: meta.modified().ok(),
            size: meta.len(),
            dev: meta.dev(),
            ino: meta.ino(),
        }
    }

    #[cfg(not(unix))]
    pub fn of(meta: &Metadata) -> Self {
        Self {
            mtime: meta.modified().ok(),
            size: meta.len(),
            dev: 0,
            ino: 0,
        }
    }

    /// Stat `path` and fingerprint it.
    pub fn stat(path: &Path) -> VfsResult<(Self, Metadata)> {
        let meta = std::fs::metadata(path).map_err(|e| VfsError::source_unavailable(path, e))?;
        Ok((Self::of(&meta), meta))
    }
}

#[cfg(unix)]
fn owner_of(meta: &Metadata) -> (Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (Some(meta.uid()), Some(meta.gid()))
}

#[cfg(not(unix))]
fn owner_of(_meta: &Metadata) -> (Option<u32>, Option<u32>) {
    (None, None)
}

/// A snapshot plus the real attributes of the source it came from.
#[derive(Debug, Clone)]
pub struct SourceView {
    pub snapshot: Arc<Snapshot>,
    pub times: Times,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
}

#[derive(Debug)]
struct Cached {
    fingerprint: Fingerprint,
    view: SourceView,
}

impl Cached {
    fn new(fingerprint: Fingerprint, meta: &Metadata, snapshot: Snapshot) -> Self {
        let (uid, gid) = owner_of(meta);
        Self {
            fingerprint,
            view: SourceView {
                snapshot: Arc::new(snapshot),
                times: Times::from_metadata(meta),
                uid,
                gid,
            },
        }
    }
}

/// One mounted backing source.
#[derive(Debug)]
pub struct MountEntry {
    prefix: String,
    style: Style,
    source: PathBuf,
    options: StyleOptions,
    read_only: bool,
    state: Mutex<Cached>,
}

impl MountEntry {
    fn open(prefix: String, spec: &MountSpec) -> VfsResult<Self> {
        let options = StyleOptions {
            partition: spec.partition.clone(),
        };
        // Rewrites rename over the path; a symlink must be followed first.
        let source = dunce::canonicalize(&spec.source)
            .map_err(|e| VfsError::source_unavailable(&spec.source, e))?;
        let (fingerprint, meta) = Fingerprint::stat(&source)?;
        let snapshot = spec.style.load(&source, &options)?;
        Ok(Self {
            prefix,
            style: spec.style,
            source,
            options,
            read_only: spec.read_only || !spec.style.is_writable(),
            state: Mutex::new(Cached::new(fingerprint, &meta, snapshot)),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn style(&self) -> Style {
        self.style
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Reload `cached` if the source no longer matches its fingerprint.
    fn refresh(&self, cached: &mut Cached) -> VfsResult<()> {
        let (fingerprint, meta) = Fingerprint::stat(&self.source)?;
        if fingerprint == cached.fingerprint {
            tracing::trace!(prefix = %self.prefix, "snapshot fresh");
            return Ok(());
        }
        tracing::debug!(prefix = %self.prefix, source = %self.source.display(), "source changed, reloading");
        let snapshot = self.style.load(&self.source, &self.options)?;
        *cached = Cached::new(fingerprint, &meta, snapshot);
        Ok(())
    }

    /// The snapshot as of now, reloaded first if the source changed.
    pub fn view(&self) -> VfsResult<SourceView> {
        let mut cached = self.state.lock();
        self.refresh(&mut cached)?;
        Ok(cached.view.clone())
    }

    /// Apply `mutate` to a copy of the current snapshot, rewrite the backing
    /// source with the result, then swap the copy in.
    ///
    /// The entry lock is held for the whole sequence. If `mutate` or the
    /// rewrite fails, the cached snapshot is left as it was.
    pub fn update<T>(
        &self,
        mutate: impl FnOnce(&mut Snapshot) -> Result<T, AddressError>,
    ) -> VfsResult<Result<T, AddressError>> {
        if self.read_only {
            return Err(VfsError::read_only(self.prefix.clone()));
        }

        let mut cached = self.state.lock();
        self.refresh(&mut cached)?;

        let mut draft = Snapshot::clone(&cached.view.snapshot);
        let out = match mutate(&mut draft) {
            Ok(out) => out,
            Err(e) => return Ok(Err(e)),
        };
        let text = draft
            .render()
            .ok_or_else(|| VfsError::read_only(self.prefix.clone()))?;

        // The rewritten text is authoritative: cache what a fresh load sees.
        let persisted = self.style.parse(&text, &self.source, &self.options)?;
        if persisted != draft {
            tracing::warn!(prefix = %self.prefix, "rewrite does not read back as written");
        }

        write_atomic(&self.source, text.as_bytes())
            .map_err(|e| VfsError::persist_failed(&self.source, e))?;

        let (fingerprint, meta) = Fingerprint::stat(&self.source)?;
        *cached = Cached::new(fingerprint, &meta, persisted);
        tracing::info!(prefix = %self.prefix, bytes = text.len(), "persisted");
        Ok(Ok(out))
    }
}

/// Replace `path` with `data` by writing a sibling temp file and renaming
/// it over the original. Keeps the original's permissions.
fn write_atomic(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Information about a mount point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountInfo {
    /// The mount prefix (e.g., "/servers/alpha/server.config").
    pub path: String,
    pub style: Style,
    pub source: PathBuf,
    pub read_only: bool,
}

/// Routes virtual paths to mounted backing sources.
pub struct MountTable {
    /// Mount entries, keyed by normalized prefix.
    mounts: RwLock<BTreeMap<String, Arc<MountEntry>>>,
    /// Timestamp for directories above any mount.
    created: SystemTime,
}

impl std::fmt::Debug for MountTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountTable")
            .field("mounts", &self.mounts.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MountTable {
    /// Create a new empty mount table.
    pub fn new() -> Self {
        Self {
            mounts: RwLock::new(BTreeMap::new()),
            created: SystemTime::now(),
        }
    }

    /// Normalize and validate a mount prefix: exactly three components.
    pub fn normalize_prefix(path: &str) -> VfsResult<String> {
        let parts = PathParts::parse(path);
        if parts.overflow || parts.depth() != Depth::Artifact {
            return Err(VfsError::invalid_path(format!(
                "{path}: mount prefix must be /category/instance/artifact"
            )));
        }
        parts
            .mount_prefix()
            .ok_or_else(|| VfsError::invalid_path(path.to_string()))
    }

    /// Mount a backing source, performing the initial load.
    ///
    /// A source that cannot be read fails with `SourceUnavailable`; one that
    /// parses to nothing mounts fine. An existing mount at the same prefix
    /// is replaced.
    pub fn mount(&self, spec: &MountSpec) -> VfsResult<()> {
        let prefix = Self::normalize_prefix(&spec.path)?;
        let entry = MountEntry::open(prefix.clone(), spec)?;
        tracing::info!(
            prefix = %prefix,
            style = %spec.style,
            source = %spec.source.display(),
            "mounted"
        );
        if self.mounts.write().insert(prefix.clone(), Arc::new(entry)).is_some() {
            tracing::debug!(prefix = %prefix, "replaced existing mount");
        }
        Ok(())
    }

    /// Shorthand for [`mount`](Self::mount) with default options.
    pub fn mount_source(
        &self,
        path: impl Into<String>,
        style: Style,
        source: impl Into<PathBuf>,
    ) -> VfsResult<()> {
        self.mount(&MountSpec::new(path, style, source))
    }

    /// Unmount the source at `path`.
    ///
    /// Returns `true` if a mount was removed, `false` if nothing was mounted there.
    pub fn unmount(&self, path: &str) -> bool {
        let Ok(prefix) = Self::normalize_prefix(path) else {
            return false;
        };
        self.mounts.write().remove(&prefix).is_some()
    }

    /// List all current mounts.
    pub fn list_mounts(&self) -> Vec<MountInfo> {
        self.mounts
            .read()
            .values()
            .map(|entry| MountInfo {
                path: entry.prefix.clone(),
                style: entry.style,
                source: entry.source.clone(),
                read_only: entry.read_only,
            })
            .collect()
    }

    /// The entry mounted at `prefix`.
    pub fn entry(&self, prefix: &str) -> VfsResult<Arc<MountEntry>> {
        self.mounts
            .read()
            .get(prefix)
            .cloned()
            .ok_or_else(|| VfsError::no_mount_point(prefix.to_string()))
    }

    /// The snapshot mounted at `path`, coherent with its source as of now.
    pub fn get_snapshot(&self, path: &str) -> VfsResult<Arc<Snapshot>> {
        let prefix = Self::normalize_prefix(path)
            .map_err(|_| VfsError::no_mount_point(path.to_string()))?;
        Ok(self.entry(&prefix)?.view()?.snapshot)
    }

    fn entries_matching(&self, parts: &PathParts) -> Vec<Arc<MountEntry>> {
        let want = [&parts.category, &parts.instance, &parts.artifact];
        self.mounts
            .read()
            .iter()
            .filter(|(prefix, _)| {
                let have = PathParts::parse(prefix);
                let have = [&have.category, &have.instance, &have.artifact];
                want.iter()
                    .zip(have)
                    .all(|(w, h)| w.is_none() || *w == h)
            })
            .map(|(_, entry)| Arc::clone(entry))
            .collect()
    }

    /// Distinct names at the slot below `parts` (which must be at root,
    /// category or instance depth), sorted.
    pub fn names_below(&self, parts: &PathParts) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries_matching(parts)
            .iter()
            .filter_map(|entry| {
                let p = PathParts::parse(&entry.prefix);
                match parts.depth() {
                    Depth::Root => p.category,
                    Depth::Category => p.instance,
                    _ => p.artifact,
                }
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Whether any mount lives at or below `parts`.
    pub fn covers(&self, parts: &PathParts) -> bool {
        !self.entries_matching(parts).is_empty()
    }

    /// Timestamps for a directory above the mounts: the newest cached
    /// source time among the mounts below it.
    pub fn times_below(&self, parts: &PathParts) -> Times {
        self.entries_matching(parts)
            .iter()
            .map(|entry| entry.state.lock().view.times)
            .max_by_key(|t| t.mtime)
            .unwrap_or_else(|| Times::at(self.created))
    }
}
