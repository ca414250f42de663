//! Nested mapping data (YAML, JSON or TOML). Read-only.

use std::path::Path;

use indexmap::IndexMap;

use crate::address::AddressError;

/// One node of a nested source.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(String),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
}

impl Node {
    pub fn is_map(&self) -> bool {
        matches!(self, Node::Map(_))
    }

    /// Leaf rendering: scalars as-is, containers as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Node::Scalar(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Node::Scalar(s) => serde_json::Value::String(s.clone()),
            Node::List(items) => serde_json::Value::Array(items.iter().map(Node::to_json).collect()),
            Node::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Source syntax, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedFormat {
    Yaml,
    Json,
    Toml,
}

impl NestedFormat {
    pub fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => NestedFormat::Json,
            Some("toml") => NestedFormat::Toml,
            _ => NestedFormat::Yaml,
        }
    }
}

fn from_yaml(v: serde_yaml::Value) -> Node {
    match v {
        serde_yaml::Value::Null => Node::Scalar(String::new()),
        serde_yaml::Value::Bool(b) => Node::Scalar(b.to_string()),
        serde_yaml::Value::Number(n) => Node::Scalar(n.to_string()),
        serde_yaml::Value::String(s) => Node::Scalar(s),
        serde_yaml::Value::Sequence(items) => Node::List(items.into_iter().map(from_yaml).collect()),
        serde_yaml::Value::Mapping(map) => {
            let mut out = IndexMap::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    serde_yaml::Value::Null => "null".to_string(),
                    other => format!("{other:?}"),
                };
                out.insert(key, from_yaml(v));
            }
            Node::Map(out)
        }
        serde_yaml::Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn from_json(v: serde_json::Value) -> Node {
    match v {
        serde_json::Value::Null => Node::Scalar(String::new()),
        serde_json::Value::Bool(b) => Node::Scalar(b.to_string()),
        serde_json::Value::Number(n) => Node::Scalar(n.to_string()),
        serde_json::Value::String(s) => Node::Scalar(s),
        serde_json::Value::Array(items) => Node::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            Node::Map(map.into_iter().map(|(k, v)| (k, from_json(v))).collect())
        }
    }
}

fn from_toml(v: toml::Value) -> Node {
    match v {
        toml::Value::String(s) => Node::Scalar(s),
        toml::Value::Integer(i) => Node::Scalar(i.to_string()),
        toml::Value::Float(f) => Node::Scalar(f.to_string()),
        toml::Value::Boolean(b) => Node::Scalar(b.to_string()),
        toml::Value::Datetime(d) => Node::Scalar(d.to_string()),
        toml::Value::Array(items) => Node::List(items.into_iter().map(from_toml).collect()),
        toml::Value::Table(table) => {
            Node::Map(table.into_iter().map(|(k, v)| (k, from_toml(v))).collect())
        }
    }
}

/// Snapshot of a nested source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedTree {
    root: IndexMap<String, Node>,
}

impl NestedTree {
    /// Parse `text`. The top level must be a mapping; an empty document is
    /// an empty tree.
    pub fn parse(text: &str, format: NestedFormat) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let node = match format {
            NestedFormat::Yaml => serde_yaml::from_str::<serde_yaml::Value>(text)
                .map(from_yaml)
                .map_err(|e| format!("YAML parse error: {e}"))?,
            NestedFormat::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(from_json)
                .map_err(|e| format!("JSON parse error: {e}"))?,
            NestedFormat::Toml => toml::from_str::<toml::Value>(text)
                .map(from_toml)
                .map_err(|e| format!("TOML parse error: {e}"))?,
        };
        match node {
            Node::Map(root) => Ok(Self { root }),
            Node::Scalar(s) if s.is_empty() => Ok(Self::default()),
            _ => Err("top level is not a mapping".to_string()),
        }
    }

    pub fn top_names(&self) -> Vec<String> {
        self.root.keys().cloned().collect()
    }

    pub fn top(&self, name: &str) -> Option<&Node> {
        self.root.get(name)
    }

    pub fn child_names(&self, parent: &str) -> Result<Vec<String>, AddressError> {
        match self.root.get(parent) {
            Some(Node::Map(map)) => Ok(map.keys().cloned().collect()),
            Some(_) => Err(AddressError::Invalid(format!("{parent} is not a mapping"))),
            None => Err(AddressError::NotFound(parent.to_string())),
        }
    }

    pub(crate) fn get(&self, section: Option<&str>, option: &str) -> Result<Option<&Node>, AddressError> {
        match section {
            None => Ok(self.root.get(option)),
            Some(section) => match self.root.get(section) {
                Some(Node::Map(map)) => Ok(map.get(option)),
                Some(_) => Err(AddressError::Invalid(format!("{section} is not a mapping"))),
                None => Err(AddressError::NotFound(section.to_string())),
            },
        }
    }
}
