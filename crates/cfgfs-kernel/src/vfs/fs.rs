//! The config filesystem: dispatch of [`VfsOps`] calls onto mounts.
//!
//! Tiers, by decomposed depth:
//!
//! | depth    | entity                         | kind                     |
//! |----------|--------------------------------|--------------------------|
//! | root     | `/`                            | directory                |
//! | category | `/servers`                     | directory                |
//! | instance | `/servers/alpha`               | directory                |
//! | artifact | `/servers/alpha/server.config` | directory (the source)   |
//! | key      | `.../server.config/java`       | section dir, or leaf     |
//! | subkey   | `.../java/java_xmx`            | leaf                     |
//!
//! Everything above the artifact tier is synthesized from the mount table;
//! everything at or below it comes from the mount's live snapshot.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use super::error::{VfsError, VfsResult};
use super::mount::{MountEntry, MountTable, SourceView};
use super::ops::VfsOps;
use super::path::{Depth, PathParts};
use super::status::{PORT_FILE, StatusSource, UP_FILE, is_status_file};
use super::types::{DirEntry, FileAttr, FileType};
use crate::address::{self, Address, AddressError};
use crate::config::MountConfig;
use crate::style::Style;

const DIR_PERM: u32 = 0o755;
const DIR_PERM_RO: u32 = 0o555;
const FILE_PERM: u32 = 0o644;
const FILE_PERM_RO: u32 = 0o444;

/// What a virtual path turned out to name.
enum Located {
    /// Root, category or instance directory.
    Virtual,
    /// An `up` or `port` leaf in an instance directory.
    Status { value: String },
    /// The mounted source itself.
    Source {
        entry: Arc<MountEntry>,
        view: SourceView,
    },
    /// A section (or nested mapping) inside a source.
    Section {
        entry: Arc<MountEntry>,
        view: SourceView,
        name: String,
    },
    /// A value.
    Leaf {
        entry: Arc<MountEntry>,
        view: SourceView,
        value: String,
    },
}

/// Names that cannot be addressed as a single path component.
fn addressable(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/')
}

/// Keep only the first line of written content.
fn first_line(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    text.lines().next().unwrap_or("").to_string()
}

fn perms(entry: &MountEntry) -> (u32, u32) {
    if entry.read_only() {
        (DIR_PERM_RO, FILE_PERM_RO)
    } else {
        (DIR_PERM, FILE_PERM)
    }
}

/// Virtual filesystem over mounted config sources.
///
/// Cheap to clone: clones share the mount table and status source.
#[derive(Clone)]
pub struct ConfigFs {
    mounts: Arc<MountTable>,
    status: Option<Arc<dyn StatusSource>>,
}

impl std::fmt::Debug for ConfigFs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFs")
            .field("mounts", &self.mounts)
            .field("status", &self.status.is_some())
            .finish()
    }
}

impl Default for ConfigFs {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFs {
    /// A filesystem with nothing mounted.
    pub fn new() -> Self {
        Self::with_mounts(Arc::new(MountTable::new()))
    }

    /// A filesystem over an existing mount table.
    pub fn with_mounts(mounts: Arc<MountTable>) -> Self {
        Self {
            mounts,
            status: None,
        }
    }

    /// Mount everything `config` lists. Stops at the first failure.
    pub fn from_config(config: &MountConfig) -> VfsResult<Self> {
        let fs = Self::new();
        for spec in &config.mounts {
            fs.mounts.mount(spec)?;
        }
        Ok(fs)
    }

    /// Expose `up` and `port` leaves in every instance directory.
    pub fn with_status(mut self, status: Arc<dyn StatusSource>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn mounts(&self) -> &MountTable {
        &self.mounts
    }

    fn entry_for(&self, parts: &PathParts) -> VfsResult<Arc<MountEntry>> {
        let prefix = parts
            .mount_prefix()
            .ok_or_else(|| VfsError::no_mount_point(parts.to_string()))?;
        self.mounts.entry(&prefix)
    }

    fn status_value(&self, parts: &PathParts) -> Option<VfsResult<String>> {
        let status = self.status.as_ref()?;
        let (category, instance, name) = match (&parts.category, &parts.instance, &parts.artifact) {
            (Some(c), Some(i), Some(a)) if is_status_file(a) => (c, i, a.as_str()),
            _ => return None,
        };
        if parts.depth() != Depth::Artifact || !self.mounts.covers(&parts.parent()) {
            return None;
        }
        if name == UP_FILE {
            return Some(Ok(status.is_up(category, instance).to_string()));
        }
        Some(
            status
                .port(category, instance)
                .map(|p| p.to_string())
                .ok_or_else(|| VfsError::not_found(parts.to_string())),
        )
    }

    /// Resolve a path against the mount table and live snapshots.
    fn locate(&self, parts: &PathParts) -> VfsResult<Located> {
        let path = parts.to_string();
        if parts.overflow {
            return Err(VfsError::not_found(path));
        }

        match parts.depth() {
            Depth::Root => return Ok(Located::Virtual),
            Depth::Category | Depth::Instance => {
                return if self.mounts.covers(parts) {
                    Ok(Located::Virtual)
                } else {
                    Err(VfsError::no_mount_point(path))
                };
            }
            _ => {}
        }

        if let Some(value) = self.status_value(parts) {
            return Ok(Located::Status { value: value? });
        }

        let entry = self.entry_for(parts)?;
        let view = entry.view()?;

        let Some(key) = parts.key.as_deref() else {
            return Ok(Located::Source { entry, view });
        };

        let kind = view
            .snapshot
            .top_level_kind(key)
            .ok_or_else(|| VfsError::not_found(path.clone()))?;

        match (kind, parts.subkey.as_deref()) {
            (FileType::Directory, None) => Ok(Located::Section {
                name: key.to_string(),
                entry,
                view,
            }),
            (FileType::File, None) => {
                let value = view
                    .snapshot
                    .read_leaf(&Address::option(key))
                    .map_err(|e| VfsError::from_address(e, path))?;
                Ok(Located::Leaf { entry, view, value })
            }
            (FileType::File, Some(_)) => Err(VfsError::not_a_directory(path)),
            (FileType::Directory, Some(subkey)) => {
                let value = view
                    .snapshot
                    .read_leaf(&Address::entry(key, subkey))
                    .map_err(|e| VfsError::from_address(e, path))?;
                Ok(Located::Leaf { entry, view, value })
            }
        }
    }

    fn attr_of(&self, parts: &PathParts, located: &Located) -> FileAttr {
        match located {
            Located::Virtual => FileAttr::directory(DIR_PERM, self.mounts.times_below(parts)),
            Located::Status { value } => FileAttr::file(
                value.len() as u64 + 1,
                FILE_PERM_RO,
                self.mounts.times_below(&parts.parent()),
            ),
            Located::Source { entry, view } | Located::Section { entry, view, .. } => {
                FileAttr::directory(perms(entry).0, view.times).with_owner(view.uid, view.gid)
            }
            Located::Leaf { entry, view, value } => {
                FileAttr::file(value.len() as u64 + 1, perms(entry).1, view.times)
                    .with_owner(view.uid, view.gid)
            }
        }
    }

    /// The address a mutation at `parts` targets inside `entry`'s source.
    fn leaf_address(&self, parts: &PathParts, entry: &MountEntry) -> VfsResult<Address> {
        let path = parts.to_string();
        match (parts.depth(), parts.key.as_deref(), parts.subkey.as_deref()) {
            (Depth::Key, Some(_), _) if entry.style() == Style::Sectioned => {
                Err(VfsError::is_a_directory(path))
            }
            (Depth::Key, Some(key), _) => Ok(Address::option(key)),
            (Depth::Subkey, Some(_), Some(_)) if !entry.style().has_children() => {
                Err(VfsError::not_a_directory(path))
            }
            (Depth::Subkey, Some(key), Some(subkey)) => Ok(Address::entry(key, subkey)),
            _ => Err(VfsError::is_a_directory(path)),
        }
    }

    /// Common preamble for mutations: reject overflow and status leaves,
    /// find the owning mount.
    fn mutation_target(&self, parts: &PathParts) -> VfsResult<Arc<MountEntry>> {
        let path = parts.to_string();
        if parts.overflow {
            return Err(VfsError::not_found(path));
        }
        if self.status_value(parts).is_some() {
            return Err(VfsError::read_only(path));
        }
        if parts.depth() < Depth::Artifact {
            return Err(VfsError::invalid_path(format!("{path}: not inside a mounted source")));
        }
        self.entry_for(parts)
    }

    /// Run `mutate` against the entry's snapshot and persist the result.
    fn apply<T>(
        entry: &MountEntry,
        path: &str,
        mutate: impl FnOnce(&mut crate::style::Snapshot) -> Result<T, AddressError>,
    ) -> VfsResult<T> {
        entry
            .update(mutate)?
            .map_err(|e| VfsError::from_address(e, path))
    }

    fn add_section(&self, entry: &MountEntry, parts: &PathParts) -> VfsResult<()> {
        let path = parts.to_string();
        let section = parts
            .key
            .as_deref()
            .ok_or_else(|| VfsError::invalid_path(path.clone()))?;
        if !addressable(section) {
            return Err(VfsError::invalid_path(path));
        }
        Self::apply(entry, &path, |snap| address::add_section(snap, section))
    }

    /// Run a locked stat/load/persist sequence on the blocking pool.
    async fn blocking<T, F>(&self, op: F) -> VfsResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&ConfigFs) -> VfsResult<T> + Send + 'static,
    {
        let fs = self.clone();
        tokio::task::spawn_blocking(move || op(&fs))
            .await
            .map_err(|e| VfsError::Io(std::io::Error::other(e)))?
    }

    fn getattr_at(&self, parts: &PathParts) -> VfsResult<FileAttr> {
        let located = self.locate(parts)?;
        Ok(self.attr_of(parts, &located))
    }

    fn readdir_at(&self, parts: &PathParts) -> VfsResult<Vec<DirEntry>> {
        let mut entries: Vec<DirEntry> = DirEntry::dots().into();
        match self.locate(parts)? {
            Located::Virtual => {
                // Sources are directories too, so every name here is one.
                entries.extend(
                    self.mounts
                        .names_below(parts)
                        .into_iter()
                        .map(DirEntry::directory),
                );
                if parts.depth() == Depth::Instance && self.status.is_some() {
                    entries.push(DirEntry::file(UP_FILE));
                    entries.push(DirEntry::file(PORT_FILE));
                }
            }
            Located::Source { view, .. } => {
                for name in view.snapshot.list_top_level() {
                    if !addressable(&name) {
                        tracing::warn!(path = %parts, name = %name, "skipping unaddressable entry");
                        continue;
                    }
                    let kind = view
                        .snapshot
                        .top_level_kind(&name)
                        .unwrap_or(FileType::File);
                    entries.push(DirEntry::new(name, kind));
                }
            }
            Located::Section { view, name, .. } => {
                let children = view
                    .snapshot
                    .list_children(&name)
                    .map_err(|e| VfsError::from_address(e, parts.to_string()))?;
                entries.extend(
                    children
                        .into_iter()
                        .filter(|n| addressable(n))
                        .map(DirEntry::file),
                );
            }
            Located::Status { .. } | Located::Leaf { .. } => {
                return Err(VfsError::not_a_directory(parts.to_string()));
            }
        }
        Ok(entries)
    }

    fn read_at(&self, parts: &PathParts) -> VfsResult<Vec<u8>> {
        match self.locate(parts)? {
            Located::Leaf { value, .. } | Located::Status { value } => {
                let mut bytes = value.into_bytes();
                bytes.push(b'\n');
                Ok(bytes)
            }
            _ => Err(VfsError::is_a_directory(parts.to_string())),
        }
    }

    fn write_at(&self, parts: &PathParts, value: &str) -> VfsResult<()> {
        let entry = self.mutation_target(parts)?;
        let addr = self.leaf_address(parts, &entry)?;
        Self::apply(&entry, &parts.to_string(), |snap| snap.write_leaf(&addr, value))
    }

    fn create_at(&self, parts: &PathParts) -> VfsResult<FileAttr> {
        let entry = self.mutation_target(parts)?;
        let path_str = parts.to_string();

        match parts.depth() {
            Depth::Key if entry.style() == Style::Sectioned => {
                self.add_section(&entry, parts)?;
            }
            Depth::Key | Depth::Subkey => {
                let addr = self.leaf_address(parts, &entry)?;
                let name = addr.option.clone().unwrap_or_default();
                if !addressable(&name) {
                    return Err(VfsError::invalid_path(path_str));
                }
                Self::apply(&entry, &path_str, |snap| {
                    let exists = match addr.section.as_deref() {
                        Some(section) => snap.list_children(section)?.contains(&name),
                        None => snap.top_level_kind(&name).is_some(),
                    };
                    if exists {
                        return Err(AddressError::AlreadyExists(name.clone()));
                    }
                    snap.write_leaf(&addr, "")
                })?;
            }
            _ => {
                return Err(VfsError::already_exists(path_str));
            }
        }

        self.getattr_at(parts)
    }

    fn mkdir_at(&self, parts: &PathParts) -> VfsResult<FileAttr> {
        let entry = self.mutation_target(parts)?;

        if parts.depth() != Depth::Key || entry.style() != Style::Sectioned {
            if entry.read_only() {
                return Err(VfsError::read_only(parts.to_string()));
            }
            return Err(VfsError::invalid_path(format!(
                "{parts}: directories can only be made one level below a sectioned source"
            )));
        }
        self.add_section(&entry, parts)?;
        self.getattr_at(parts)
    }

    fn unlink_at(&self, parts: &PathParts) -> VfsResult<()> {
        let entry = self.mutation_target(parts)?;
        let addr = self.leaf_address(parts, &entry)?;
        Self::apply(&entry, &parts.to_string(), |snap| snap.delete_leaf(&addr))
    }

    fn rmdir_at(&self, parts: &PathParts) -> VfsResult<()> {
        let entry = self.mutation_target(parts)?;
        let path_str = parts.to_string();

        match (parts.depth(), parts.key.as_deref()) {
            (Depth::Key, Some(section)) if entry.style().has_children() => {
                Self::apply(&entry, &path_str, |snap| address::remove_section(snap, section))
            }
            (Depth::Artifact, _) => Err(VfsError::invalid_path(format!(
                "{path_str}: mounted sources cannot be removed"
            ))),
            _ => Err(VfsError::not_a_directory(path_str)),
        }
    }
}

/// Byte count reported back to a writer.
fn accepted_len(parts: &PathParts, len: usize) -> VfsResult<u32> {
    u32::try_from(len).map_err(|_| {
        VfsError::InvalidAddress(format!("{parts}: {len} bytes is more than one write accepts"))
    })
}

#[async_trait]
impl VfsOps for ConfigFs {
    async fn getattr(&self, path: &Path) -> VfsResult<FileAttr> {
        let parts = PathParts::parse(&path.to_string_lossy());
        self.blocking(move |fs| fs.getattr_at(&parts)).await
    }

    async fn readdir(&self, path: &Path) -> VfsResult<Vec<DirEntry>> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "readdir");
        self.blocking(move |fs| fs.readdir_at(&parts)).await
    }

    async fn read(&self, path: &Path) -> VfsResult<Vec<u8>> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "read");
        self.blocking(move |fs| fs.read_at(&parts)).await
    }

    async fn write(&self, path: &Path, data: &[u8]) -> VfsResult<u32> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, bytes = data.len(), "write");
        let accepted = accepted_len(&parts, data.len())?;
        let value = first_line(data);
        self.blocking(move |fs| fs.write_at(&parts, &value)).await?;
        Ok(accepted)
    }

    async fn create(&self, path: &Path) -> VfsResult<FileAttr> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "create");
        self.blocking(move |fs| fs.create_at(&parts)).await
    }

    async fn mkdir(&self, path: &Path) -> VfsResult<FileAttr> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "mkdir");
        self.blocking(move |fs| fs.mkdir_at(&parts)).await
    }

    async fn unlink(&self, path: &Path) -> VfsResult<()> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "unlink");
        self.blocking(move |fs| fs.unlink_at(&parts)).await
    }

    async fn rmdir(&self, path: &Path) -> VfsResult<()> {
        let parts = PathParts::parse(&path.to_string_lossy());
        tracing::debug!(path = %parts, "rmdir");
        self.blocking(move |fs| fs.rmdir_at(&parts)).await
    }

    fn read_only(&self) -> bool {
        // The table itself isn't read-only; individual mounts might be.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MountSpec;
    use crate::vfs::status::StaticStatus;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        fs: ConfigFs,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let files = [
                ("server.config", "[java]\njava_xmx = 256\n\n[onreboot]\nstart = false\n"),
                ("server.properties", "#props\nserver-port=25565\nmotd=hi\n"),
                ("banned-players.txt", "# bans\nplayerA|banned for griefing\nplayerB|spam\n"),
                ("config.yml", "settings:\n  pvp: true\nmotd: hello\n"),
            ];
            for (name, text) in files {
                std::fs::write(dir.path().join(name), text).unwrap();
            }

            let fs = ConfigFs::new();
            let m = fs.mounts();
            let src = |n: &str| dir.path().join(n);
            m.mount_source("/servers/alpha/server.config", Style::Sectioned, src("server.config"))
                .unwrap();
            m.mount_source(
                "/servers/alpha/server.properties",
                Style::Sectionless,
                src("server.properties"),
            )
            .unwrap();
            m.mount(
                &MountSpec::new(
                    "/servers/alpha/banned-players.txt",
                    Style::Flat,
                    src("banned-players.txt"),
                )
                .with_partition("|"),
            )
            .unwrap();
            m.mount_source("/servers/alpha/config.yml", Style::Nested, src("config.yml"))
                .unwrap();

            Self { dir, fs }
        }

        fn disk(&self, name: &str) -> String {
            std::fs::read_to_string(self.dir.path().join(name)).unwrap()
        }
    }

    fn p(s: &str) -> &Path {
        Path::new(s)
    }

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_virtual_tiers() {
        let fx = Fixture::new();
        assert!(fx.fs.getattr(p("/")).await.unwrap().is_dir());
        assert!(fx.fs.getattr(p("/servers")).await.unwrap().is_dir());
        assert!(fx.fs.getattr(p("/servers/alpha")).await.unwrap().is_dir());

        let root = fx.fs.readdir(p("/")).await.unwrap();
        assert_eq!(names(&root), vec![".", "..", "servers"]);

        let alpha = fx.fs.readdir(p("/servers/alpha")).await.unwrap();
        assert_eq!(
            names(&alpha),
            vec![".", "..", "banned-players.txt", "config.yml", "server.config", "server.properties"]
        );
        assert!(alpha.iter().all(|e| e.kind.is_dir()));
    }

    #[tokio::test]
    async fn test_unmounted_paths() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.getattr(p("/profiles")).await,
            Err(VfsError::NoMountPoint(_))
        ));
        assert!(matches!(
            fx.fs.getattr(p("/servers/alpha/eula.txt")).await,
            Err(VfsError::NoMountPoint(_))
        ));
        assert!(matches!(
            fx.fs.getattr(p("/servers/alpha/server.config/nope")).await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sectioned_attributes_and_read() {
        let fx = Fixture::new();
        let section = fx.fs.getattr(p("/servers/alpha/server.config/java")).await.unwrap();
        assert!(section.is_dir());
        assert_eq!(section.nlink, 2);

        let leaf = fx
            .fs
            .getattr(p("/servers/alpha/server.config/java/java_xmx"))
            .await
            .unwrap();
        assert!(leaf.is_file());
        assert_eq!(leaf.nlink, 1);
        assert_eq!(leaf.size, "256".len() as u64 + 1);
        assert_eq!(leaf.perm, FILE_PERM);

        let data = fx.fs.read(p("/servers/alpha/server.config/java/java_xmx")).await.unwrap();
        assert_eq!(data, b"256\n");

        let src_mtime = std::fs::metadata(fx.dir.path().join("server.config"))
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(leaf.mtime, src_mtime);
    }

    #[tokio::test]
    async fn test_listing_kinds() {
        let fx = Fixture::new();
        let top = fx.fs.readdir(p("/servers/alpha/server.config")).await.unwrap();
        assert_eq!(names(&top), vec![".", "..", "java", "onreboot"]);
        assert!(top[2].kind.is_dir());

        let java = fx.fs.readdir(p("/servers/alpha/server.config/java")).await.unwrap();
        assert_eq!(names(&java), vec![".", "..", "java_xmx"]);
        assert!(java[2].kind.is_file());

        let props = fx.fs.readdir(p("/servers/alpha/server.properties")).await.unwrap();
        assert_eq!(names(&props), vec![".", "..", "server-port", "motd"]);

        let nested = fx.fs.readdir(p("/servers/alpha/config.yml")).await.unwrap();
        assert_eq!(names(&nested), vec![".", "..", "settings", "motd"]);
        assert!(nested[2].kind.is_dir());
        assert!(nested[3].kind.is_file());
    }

    #[tokio::test]
    async fn test_readdir_on_leaf() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.readdir(p("/servers/alpha/server.properties/motd")).await,
            Err(VfsError::NotADirectory(_))
        ));
        assert!(matches!(
            fx.fs.getattr(p("/servers/alpha/server.properties/motd/x")).await,
            Err(VfsError::NotADirectory(_))
        ));
        assert!(matches!(
            fx.fs.read(p("/servers/alpha/server.config/java")).await,
            Err(VfsError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_write_keeps_first_line() {
        let fx = Fixture::new();
        let n = fx
            .fs
            .write(p("/servers/alpha/server.config/java/java_xmx"), b"512\nignored\n")
            .await
            .unwrap();
        assert_eq!(n, 12);
        assert_eq!(
            fx.fs.read(p("/servers/alpha/server.config/java/java_xmx")).await.unwrap(),
            b"512\n"
        );
        assert!(fx.disk("server.config").contains("java_xmx = 512"));
        assert!(!fx.disk("server.config").contains("ignored"));
    }

    #[tokio::test]
    async fn test_write_to_section_is_a_directory_error() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.write(p("/servers/alpha/server.config/java"), b"x").await,
            Err(VfsError::IsADirectory(_))
        ));
        assert!(matches!(
            fx.fs.write(p("/servers/alpha/server.config/nosection/k"), b"x").await,
            Err(VfsError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_section_then_remove() {
        let fx = Fixture::new();
        let attr = fx.fs.create(p("/servers/alpha/server.config/newsection")).await.unwrap();
        assert!(attr.is_dir());

        let listed = fx.fs.readdir(p("/servers/alpha/server.config")).await.unwrap();
        assert!(names(&listed).contains(&"newsection"));

        fx.fs.remove(p("/servers/alpha/server.config/newsection")).await.unwrap();
        let listed = fx.fs.readdir(p("/servers/alpha/server.config")).await.unwrap();
        assert_eq!(names(&listed), vec![".", "..", "java", "onreboot"]);
        assert!(fx.disk("server.config").contains("java_xmx = 256"));
    }

    #[tokio::test]
    async fn test_create_leaf_needs_parent_section() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.create(p("/servers/alpha/server.config/missing/opt")).await,
            Err(VfsError::NotFound(_))
        ));

        let attr = fx.fs.create(p("/servers/alpha/server.config/java/java_xms")).await.unwrap();
        assert!(attr.is_file());
        assert_eq!(attr.size, 1);
        assert!(matches!(
            fx.fs.create(p("/servers/alpha/server.config/java/java_xms")).await,
            Err(VfsError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_mkdir_rules() {
        let fx = Fixture::new();
        assert!(fx.fs.mkdir(p("/servers/alpha/server.config/extra")).await.unwrap().is_dir());
        assert!(matches!(
            fx.fs.mkdir(p("/servers/alpha/server.config/extra")).await,
            Err(VfsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fx.fs.mkdir(p("/servers/alpha/server.properties/dir")).await,
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(
            fx.fs.mkdir(p("/servers/alpha/server.config/java/deeper")).await,
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_rmdir_removes_all_options() {
        let fx = Fixture::new();
        fx.fs.rmdir(p("/servers/alpha/server.config/java")).await.unwrap();
        let disk = fx.disk("server.config");
        assert!(!disk.contains("[java]"));
        assert!(!disk.contains("java_xmx"));
        assert!(disk.contains("[onreboot]"));
        assert!(matches!(
            fx.fs.rmdir(p("/servers/alpha/server.config/java")).await,
            Err(VfsError::NotFound(_))
        ));
        assert!(matches!(
            fx.fs.rmdir(p("/servers/alpha/server.config")).await,
            Err(VfsError::InvalidPath(_))
        ));
    }

    #[tokio::test]
    async fn test_unlink_semantics() {
        let fx = Fixture::new();
        let motd = p("/servers/alpha/server.properties/motd");
        fx.fs.unlink(motd).await.unwrap();
        fx.fs.unlink(motd).await.unwrap();
        assert!(!fx.disk("server.properties").contains("motd"));

        let xmx = p("/servers/alpha/server.config/java/java_xmx");
        fx.fs.unlink(xmx).await.unwrap();
        assert!(matches!(fx.fs.unlink(xmx).await, Err(VfsError::NotFound(_))));

        assert!(matches!(
            fx.fs.unlink(p("/servers/alpha/server.config/java")).await,
            Err(VfsError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_flat_partition_delete() {
        let fx = Fixture::new();
        let data = fx.fs.read(p("/servers/alpha/banned-players.txt/playerA")).await.unwrap();
        assert_eq!(data, b"playerA|banned for griefing\n");

        fx.fs.unlink(p("/servers/alpha/banned-players.txt/playerA")).await.unwrap();
        let listed = fx.fs.readdir(p("/servers/alpha/banned-players.txt")).await.unwrap();
        assert_eq!(names(&listed), vec![".", "..", "playerB"]);
        assert!(fx.disk("banned-players.txt").starts_with("# bans\n"));
    }

    #[tokio::test]
    async fn test_flat_create_appends() {
        let fx = Fixture::new();
        fx.fs.create(p("/servers/alpha/banned-players.txt/playerC")).await.unwrap();
        assert!(fx.disk("banned-players.txt").ends_with("playerB|spam\nplayerC\n"));
    }

    #[tokio::test]
    async fn test_nested_is_read_only() {
        let fx = Fixture::new();
        let data = fx.fs.read(p("/servers/alpha/config.yml/settings/pvp")).await.unwrap();
        assert_eq!(data, b"true\n");

        let attr = fx.fs.getattr(p("/servers/alpha/config.yml/motd")).await.unwrap();
        assert_eq!(attr.perm, FILE_PERM_RO);
        let dir = fx.fs.getattr(p("/servers/alpha/config.yml")).await.unwrap();
        assert_eq!(dir.perm, DIR_PERM_RO);

        assert!(matches!(
            fx.fs.write(p("/servers/alpha/config.yml/motd"), b"x").await,
            Err(VfsError::ReadOnly(_))
        ));
        assert!(matches!(
            fx.fs.unlink(p("/servers/alpha/config.yml/motd")).await,
            Err(VfsError::ReadOnly(_))
        ));
        assert!(matches!(
            fx.fs.mkdir(p("/servers/alpha/config.yml/new")).await,
            Err(VfsError::ReadOnly(_))
        ));
    }

    #[tokio::test]
    async fn test_overflow_and_traversal() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.getattr(p("/servers/alpha/server.config/java/java_xmx/extra")).await,
            Err(VfsError::NotFound(_))
        ));
        let data = fx
            .fs
            .read(p("/servers/alpha/../alpha/./server.config/java/java_xmx"))
            .await
            .unwrap();
        assert_eq!(data, b"256\n");
        assert!(fx.fs.getattr(p("/../../..")).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_status_files() {
        let fx = Fixture::new();
        let status = Arc::new(StaticStatus::new());
        let fs = ConfigFs::with_mounts(Arc::clone(&fx.fs.mounts)).with_status(status.clone());

        let listed = fs.readdir(p("/servers/alpha")).await.unwrap();
        assert!(names(&listed).contains(&"up"));
        assert!(names(&listed).contains(&"port"));

        assert_eq!(fs.read(p("/servers/alpha/up")).await.unwrap(), b"false\n");
        assert!(matches!(fs.read(p("/servers/alpha/port")).await, Err(VfsError::NotFound(_))));

        status.set_up("servers", "alpha", Some(25565));
        assert_eq!(fs.read(p("/servers/alpha/up")).await.unwrap(), b"true\n");
        assert_eq!(fs.read(p("/servers/alpha/port")).await.unwrap(), b"25565\n");
        assert_eq!(fs.getattr(p("/servers/alpha/port")).await.unwrap().size, 6);

        assert!(matches!(
            fs.write(p("/servers/alpha/up"), b"true").await,
            Err(VfsError::ReadOnly(_))
        ));
        assert!(matches!(
            fs.getattr(p("/servers/ghost/up")).await,
            Err(VfsError::NoMountPoint(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_band_edit_is_seen() {
        let fx = Fixture::new();
        std::fs::write(
            fx.dir.path().join("server.properties"),
            "server-port=25570\nmotd=changed outside\nwhite-list=true\n",
        )
        .unwrap();
        assert_eq!(
            fx.fs
                .read_string(p("/servers/alpha/server.properties/motd"))
                .await
                .unwrap(),
            "changed outside"
        );
    }

    #[tokio::test]
    async fn test_read_only_mount() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("ops.txt");
        std::fs::write(&src, "alice\n").unwrap();
        let fs = ConfigFs::new();
        fs.mounts()
            .mount(&MountSpec::new("/servers/a/ops.txt", Style::Flat, &src).with_read_only(true))
            .unwrap();

        assert!(matches!(
            fs.create(p("/servers/a/ops.txt/bob")).await,
            Err(VfsError::ReadOnly(_))
        ));
        assert_eq!(std::fs::read_to_string(&src).unwrap(), "alice\n");
    }

    #[tokio::test]
    async fn test_source_replaced_by_directory() {
        let fx = Fixture::new();
        // Fingerprint changes, reload can't read it.
        let src = fx.dir.path().join("server.properties");
        std::fs::remove_file(&src).unwrap();
        std::fs::create_dir(&src).unwrap();

        let err = fx
            .fs
            .write(p("/servers/alpha/server.properties/motd"), b"new")
            .await
            .unwrap_err();
        assert!(matches!(err, VfsError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_mutations_above_sources_rejected() {
        let fx = Fixture::new();
        assert!(matches!(
            fx.fs.create(p("/servers/alpha/server.config")).await,
            Err(VfsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fx.fs.mkdir(p("/servers/beta")).await,
            Err(VfsError::InvalidPath(_))
        ));
        assert!(matches!(
            fx.fs.write(p("/servers/alpha/server.config"), b"x").await,
            Err(VfsError::IsADirectory(_))
        ));
    }

    #[tokio::test]
    async fn test_written_value_matches_fresh_load() {
        let fx = Fixture::new();
        let leaf = p("/servers/alpha/server.config/java/java_xmx");
        fx.fs.write(leaf, b"  512  \n").await.unwrap();
        assert_eq!(fx.fs.read(leaf).await.unwrap(), b"512\n");

        let fresh = Style::Sectioned
            .load(&fx.dir.path().join("server.config"), &Default::default())
            .unwrap();
        assert_eq!(
            fresh.read_leaf(&Address::entry("java", "java_xmx")).unwrap(),
            "512"
        );
    }

    #[tokio::test]
    async fn test_names_that_would_not_read_back_rejected() {
        let fx = Fixture::new();
        let props = fx.disk("server.properties");
        let config = fx.disk("server.config");

        assert!(matches!(
            fx.fs.write(p("/servers/alpha/server.properties/a=b"), b"1").await,
            Err(VfsError::InvalidAddress(_))
        ));
        assert!(matches!(
            fx.fs.create(p("/servers/alpha/server.config/java/;note")).await,
            Err(VfsError::InvalidAddress(_))
        ));
        assert!(matches!(
            fx.fs.mkdir(p("/servers/alpha/server.config/a]b")).await,
            Err(VfsError::InvalidAddress(_))
        ));
        assert_eq!(fx.disk("server.properties"), props);
        assert_eq!(fx.disk("server.config"), config);
    }

    #[tokio::test]
    async fn test_flat_create_of_comment_rejected() {
        let fx = Fixture::new();
        let before = fx.disk("banned-players.txt");
        for key in ["#evil", "   "] {
            let path = format!("/servers/alpha/banned-players.txt/{key}");
            assert!(matches!(
                fx.fs.create(p(&path)).await,
                Err(VfsError::InvalidAddress(_))
            ));
        }
        assert_eq!(fx.disk("banned-players.txt"), before);
    }

    #[tokio::test]
    async fn test_flat_write_by_name_appends() {
        let fx = Fixture::new();
        fx.fs
            .write(p("/servers/alpha/banned-players.txt/playerB"), b"playerC|afk")
            .await
            .unwrap();
        assert_eq!(
            fx.disk("banned-players.txt"),
            "# bans\nplayerA|banned for griefing\nplayerB|spam\nplayerC|afk\n"
        );

        fx.fs
            .write(p("/servers/alpha/banned-players.txt/0"), b"playerA|pardoned")
            .await
            .unwrap();
        assert_eq!(
            fx.disk("banned-players.txt"),
            "# bans\nplayerA|pardoned\nplayerB|spam\nplayerC|afk\n"
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_oversized_write_count_rejected() {
        let parts = PathParts::parse("/servers/alpha/server.properties/motd");
        assert_eq!(accepted_len(&parts, 3).unwrap(), 3);
        assert!(matches!(
            accepted_len(&parts, u32::MAX as usize + 1),
            Err(VfsError::InvalidAddress(_))
        ));
    }
}
