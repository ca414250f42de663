//! Mount configuration.
//!
//! A TOML file listing the sources to mount:
//!
//! ```toml
//! [[mount]]
//! path = "/servers/alpha/server.config"
//! style = "sectioned"
//! source = "~/minecraft/servers/alpha/server.config"
//!
//! [[mount]]
//! path = "/servers/alpha/banned-players.txt"
//! style = "flat"
//! source = "banned-players.txt"   # relative to this file
//! partition = "|"
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::style::Style;
use crate::vfs::{VfsError, VfsResult};

/// One `[[mount]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MountSpec {
    /// Virtual prefix, `/category/instance/artifact`.
    pub path: String,
    pub style: Style,
    /// Backing source on disk.
    pub source: PathBuf,
    /// Flat style only: separator ending a line's name.
    #[serde(default)]
    pub partition: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

impl MountSpec {
    pub fn new(path: impl Into<String>, style: Style, source: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            style,
            source: source.into(),
            partition: None,
            read_only: false,
        }
    }

    pub fn with_partition(mut self, sep: impl Into<String>) -> Self {
        self.partition = Some(sep.into());
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

/// The full list of mounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MountConfig {
    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountSpec>,
}

impl FromStr for MountConfig {
    type Err = VfsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s).map_err(|e| VfsError::Config(e.to_string()))
    }
}

impl MountConfig {
    /// Read a configuration file. `~` in sources is expanded and relative
    /// sources are resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| VfsError::Config(format!("{}: {e}", path.display())))?;
        let mut config: Self = text.parse()?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        config.resolve_sources(base);
        Ok(config)
    }

    /// Expand `~` and anchor relative sources at `base`.
    pub fn resolve_sources(&mut self, base: &Path) {
        for spec in &mut self.mounts {
            let raw = spec.source.to_string_lossy();
            let expanded = PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref());
            let anchored = if expanded.is_relative() {
                base.join(expanded)
            } else {
                expanded
            };
            spec.source = dunce::canonicalize(&anchored).unwrap_or(anchored);
        }
    }
}
