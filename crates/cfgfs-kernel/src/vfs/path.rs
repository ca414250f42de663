//! Virtual path decomposition.
//!
//! A virtual path is anchored at `/`, normalized lexically (`.` dropped,
//! `..` pops, never above the root) and cut into five named slots:
//!
//! ```text
//! /servers/alpha/server.config/java/java_xmx
//!  └─────┘ └───┘ └───────────┘ └──┘ └──────┘
//!  category instance artifact   key  subkey
//! ```
//!
//! Decomposition never fails and never touches the disk. An empty slot
//! means the path names something coarser.

use std::fmt;

/// Number of named slots.
pub const SLOTS: usize = 5;

/// The tier a path addresses, by how many slots are filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Depth {
    Root,
    Category,
    Instance,
    Artifact,
    Key,
    Subkey,
}

/// A decomposed virtual path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParts {
    pub category: Option<String>,
    pub instance: Option<String>,
    pub artifact: Option<String>,
    pub key: Option<String>,
    pub subkey: Option<String>,
    /// Components beyond the fifth slot. Such paths resolve to nothing.
    pub overflow: bool,
}

impl PathParts {
    /// Split `path` into slots. Relative paths are anchored at `/`.
    pub fn parse(path: &str) -> Self {
        let components = normalize(path);
        let overflow = components.len() > SLOTS;
        let mut slots = components.into_iter();
        Self {
            category: slots.next(),
            instance: slots.next(),
            artifact: slots.next(),
            key: slots.next(),
            subkey: slots.next(),
            overflow,
        }
    }

    /// How deep the path reaches.
    pub fn depth(&self) -> Depth {
        match (
            &self.category,
            &self.instance,
            &self.artifact,
            &self.key,
            &self.subkey,
        ) {
            (None, ..) => Depth::Root,
            (Some(_), None, ..) => Depth::Category,
            (Some(_), Some(_), None, ..) => Depth::Instance,
            (Some(_), Some(_), Some(_), None, _) => Depth::Artifact,
            (Some(_), Some(_), Some(_), Some(_), None) => Depth::Key,
            (Some(_), Some(_), Some(_), Some(_), Some(_)) => Depth::Subkey,
        }
    }

    /// The `/category/instance/artifact` prefix a mount is keyed by, if the
    /// path reaches that far.
    pub fn mount_prefix(&self) -> Option<String> {
        match (&self.category, &self.instance, &self.artifact) {
            (Some(c), Some(i), Some(a)) => Some(format!("/{c}/{i}/{a}")),
            _ => None,
        }
    }

    /// The parent path.
    pub fn parent(&self) -> Self {
        let mut parts = self.clone();
        parts.overflow = false;
        if parts.subkey.take().is_none()
            && parts.key.take().is_none()
            && parts.artifact.take().is_none()
            && parts.instance.take().is_none()
        {
            parts.category = None;
        }
        parts
    }
}

impl fmt::Display for PathParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filled: Vec<&str> = [
            &self.category,
            &self.instance,
            &self.artifact,
            &self.key,
            &self.subkey,
        ]
        .into_iter()
        .map_while(|s| s.as_deref())
        .collect();
        write!(f, "/{}", filled.join("/"))?;
        if self.overflow {
            write!(f, "/...")?;
        }
        Ok(())
    }
}

/// Lexically normalize `path` into its components.
pub fn normalize(path: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            name => out.push(name.to_string()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path() {
        let p = PathParts::parse("/servers/alpha/server.config/java/java_xmx");
        assert_eq!(p.category.as_deref(), Some("servers"));
        assert_eq!(p.instance.as_deref(), Some("alpha"));
        assert_eq!(p.artifact.as_deref(), Some("server.config"));
        assert_eq!(p.key.as_deref(), Some("java"));
        assert_eq!(p.subkey.as_deref(), Some("java_xmx"));
        assert_eq!(p.depth(), Depth::Subkey);
        assert!(!p.overflow);
    }

    #[test]
    fn test_depths() {
        assert_eq!(PathParts::parse("/").depth(), Depth::Root);
        assert_eq!(PathParts::parse("").depth(), Depth::Root);
        assert_eq!(PathParts::parse("/servers").depth(), Depth::Category);
        assert_eq!(PathParts::parse("/servers/alpha/").depth(), Depth::Instance);
        assert_eq!(PathParts::parse("servers/alpha/x").depth(), Depth::Artifact);
        assert_eq!(PathParts::parse("/servers/alpha/x/k").depth(), Depth::Key);
    }

    #[test]
    fn test_dot_normalization() {
        let p = PathParts::parse("/servers/./alpha//server.config/../server.properties");
        assert_eq!(p.to_string(), "/servers/alpha/server.properties");
        assert_eq!(p.depth(), Depth::Artifact);
    }

    #[test]
    fn test_traversal_clamped_at_root() {
        let p = PathParts::parse("/../../../etc/passwd");
        assert_eq!(p.category.as_deref(), Some("etc"));
        assert_eq!(p.instance.as_deref(), Some("passwd"));
        assert!(normalize("/a/../..").is_empty());
        assert!(!PathParts::parse("/a/b/c/../../../../x").to_string().contains(".."));
    }

    #[test]
    fn test_overflow() {
        let p = PathParts::parse("/a/b/c/d/e/f");
        assert!(p.overflow);
        assert_eq!(p.depth(), Depth::Subkey);
        assert_eq!(p.to_string(), "/a/b/c/d/e/...");
    }

    #[test]
    fn test_mount_prefix_and_parent() {
        let p = PathParts::parse("/servers/alpha/server.config/java");
        assert_eq!(p.mount_prefix().as_deref(), Some("/servers/alpha/server.config"));
        assert_eq!(p.parent().to_string(), "/servers/alpha/server.config");
        assert_eq!(PathParts::parse("/servers").parent().depth(), Depth::Root);
        assert_eq!(PathParts::parse("/servers/alpha").mount_prefix(), None);
    }
}
