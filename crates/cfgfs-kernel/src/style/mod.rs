//! Storage style adapters.
//!
//! Four on-disk shapes behind one contract. [`Style`] is the tag a mount
//! carries; [`Snapshot`] is the parsed, in-memory form of one backing
//! source. Every value crosses this boundary as a string.

mod flat;
mod nested;
mod sectioned;
mod sectionless;

use std::path::Path;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

pub use flat::FlatList;
pub use nested::{NestedFormat, NestedTree, Node};
pub use sectioned::SectionedConfig;
pub use sectionless::SectionlessConfig;

use crate::address::{self, Address, AddressError};
use crate::vfs::{FileType, VfsError, VfsResult};

/// How a backing source is laid out.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Style {
    /// `[section]` headers with `key = value` options.
    Sectioned,
    /// `key=value` options with no sections.
    Sectionless,
    /// One entry per line.
    Flat,
    /// YAML, JSON or TOML mappings. Read-only.
    Nested,
}

/// Per-mount parsing options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleOptions {
    /// Flat style: separator ending the part of a line used as its name.
    pub partition: Option<String>,
}

impl Style {
    /// Whether sources of this style can be written back.
    pub fn is_writable(self) -> bool {
        !matches!(self, Style::Nested)
    }

    /// Whether sources of this style have a second level under the top.
    pub fn has_children(self) -> bool {
        matches!(self, Style::Sectioned | Style::Nested)
    }

    /// Read and parse the whole backing source.
    pub fn load(self, source: &Path, opts: &StyleOptions) -> VfsResult<Snapshot> {
        let text = std::fs::read_to_string(source)
            .map_err(|e| VfsError::source_unavailable(source, e))?;
        self.parse(&text, source, opts)
    }

    /// Parse already-read text. `source` picks the nested syntax and names
    /// the file in errors.
    pub fn parse(self, text: &str, source: &Path, opts: &StyleOptions) -> VfsResult<Snapshot> {
        Ok(match self {
            Style::Sectioned => Snapshot::Sectioned(SectionedConfig::parse(text)),
            Style::Sectionless => Snapshot::Sectionless(SectionlessConfig::parse(text)),
            Style::Flat => Snapshot::Flat(FlatList::parse(text, opts.partition.as_deref())),
            Style::Nested => Snapshot::Nested(
                NestedTree::parse(text, NestedFormat::detect(source))
                    .map_err(|reason| VfsError::malformed(source, reason))?,
            ),
        })
    }
}

/// Parsed contents of one backing source at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Sectioned(SectionedConfig),
    Sectionless(SectionlessConfig),
    Flat(FlatList),
    Nested(NestedTree),
}

impl Snapshot {
    pub fn style(&self) -> Style {
        match self {
            Snapshot::Sectioned(_) => Style::Sectioned,
            Snapshot::Sectionless(_) => Style::Sectionless,
            Snapshot::Flat(_) => Style::Flat,
            Snapshot::Nested(_) => Style::Nested,
        }
    }

    /// Section names, option names, or line names, in source order.
    pub fn list_top_level(&self) -> Vec<String> {
        match self {
            Snapshot::Sectioned(cfg) => cfg.section_names(),
            Snapshot::Sectionless(cfg) => cfg.option_names(),
            Snapshot::Flat(list) => list.names(),
            Snapshot::Nested(tree) => tree.top_names(),
        }
    }

    /// Names under a top-level entry. Only sectioned and nested sources
    /// have a second level.
    pub fn list_children(&self, parent: &str) -> Result<Vec<String>, AddressError> {
        match self {
            Snapshot::Sectioned(cfg) => cfg.option_names(parent),
            Snapshot::Nested(tree) => tree.child_names(parent),
            Snapshot::Sectionless(_) | Snapshot::Flat(_) => Err(AddressError::Invalid(format!(
                "{} sources have no second level",
                self.style()
            ))),
        }
    }

    /// Kind of the top-level entry `name`, if it exists.
    pub fn top_level_kind(&self, name: &str) -> Option<FileType> {
        match self {
            Snapshot::Sectioned(cfg) => cfg.has_section(name).then_some(FileType::Directory),
            Snapshot::Sectionless(cfg) => cfg.get(name).map(|_| FileType::File),
            Snapshot::Flat(list) => list.get(name).map(|_| FileType::File),
            Snapshot::Nested(tree) => tree.top(name).map(|node| {
                if node.is_map() {
                    FileType::Directory
                } else {
                    FileType::File
                }
            }),
        }
    }

    pub fn read_leaf(&self, addr: &Address) -> Result<String, AddressError> {
        address::resolve(self, addr)
    }

    pub fn write_leaf(&mut self, addr: &Address, value: &str) -> Result<(), AddressError> {
        address::assign(self, addr, value)
    }

    pub fn delete_leaf(&mut self, addr: &Address) -> Result<(), AddressError> {
        address::remove(self, addr)
    }

    /// Serialize the whole snapshot for a rewrite of its backing source.
    /// Nested snapshots are never written back.
    pub fn render(&self) -> Option<String> {
        match self {
            Snapshot::Sectioned(cfg) => Some(cfg.render()),
            Snapshot::Sectionless(cfg) => Some(cfg.render()),
            Snapshot::Flat(list) => Some(list.render()),
            Snapshot::Nested(_) => None,
        }
    }
}
