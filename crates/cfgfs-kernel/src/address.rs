//! Format-independent naming of configuration values.
//!
//! An [`Address`] is a `(section, option, default)` triple. The arity rules
//! depend on the snapshot style:
//!
//! | style       | resolve                 | assign / remove          |
//! |-------------|-------------------------|--------------------------|
//! | sectioned   | section + option        | section + option         |
//! | sectionless | option (section ignored)| option (section ignored) |
//! | flat        | option (section ignored)| option (section ignored) |
//! | nested      | option, optional section| read-only                |
//!
//! `default` is only ever returned from [`resolve`] when the option is
//! missing; it is never written.

use thiserror::Error;

use crate::style::Snapshot;

/// Address-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Malformed or under-specified request.
    #[error("invalid address: {0}")]
    Invalid(String),

    /// Section or option absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// Section already present.
    #[error("already exists: {0}")]
    AlreadyExists(String),
}

/// Names one configuration value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub section: Option<String>,
    pub option: Option<String>,
    pub default: Option<String>,
}

impl Address {
    /// A top-level option.
    pub fn option(option: impl Into<String>) -> Self {
        Self {
            option: Some(option.into()),
            ..Default::default()
        }
    }

    /// A whole section.
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            ..Default::default()
        }
    }

    /// An option inside a section.
    pub fn entry(section: impl Into<String>, option: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            option: Some(option.into()),
            default: None,
        }
    }

    /// Value returned by [`resolve`] when the option is missing.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn check_not_empty(&self) -> Result<(), AddressError> {
        if self.section.is_none() && self.option.is_none() {
            return Err(AddressError::Invalid(
                "address names neither a section nor an option".to_string(),
            ));
        }
        Ok(())
    }

    fn require_option(&self, style: &str) -> Result<&str, AddressError> {
        self.option
            .as_deref()
            .ok_or_else(|| AddressError::Invalid(format!("{style} address needs an option")))
    }

    fn require_both(&self) -> Result<(&str, &str), AddressError> {
        match (self.section.as_deref(), self.option.as_deref()) {
            (Some(s), Some(o)) => Ok((s, o)),
            _ => Err(AddressError::Invalid(
                "sectioned address needs both a section and an option".to_string(),
            )),
        }
    }

    fn missing(&self, key: &str) -> Result<String, AddressError> {
        self.default
            .clone()
            .ok_or_else(|| AddressError::NotFound(key.to_string()))
    }
}

/// Look up the value `addr` names.
pub fn resolve(snapshot: &Snapshot, addr: &Address) -> Result<String, AddressError> {
    addr.check_not_empty()?;
    match snapshot {
        Snapshot::Sectioned(cfg) => {
            let (section, option) = addr.require_both()?;
            match cfg.get(section, option)? {
                Some(v) => Ok(v.to_string()),
                None => addr.missing(option),
            }
        }
        Snapshot::Sectionless(cfg) => {
            let option = addr.require_option("sectionless")?;
            match cfg.get(option) {
                Some(v) => Ok(v.to_string()),
                None => addr.missing(option),
            }
        }
        Snapshot::Flat(list) => {
            let key = addr.require_option("flat")?;
            match list.get(key) {
                Some(v) => Ok(v.to_string()),
                None => addr.missing(key),
            }
        }
        Snapshot::Nested(tree) => {
            let option = addr.require_option("nested")?;
            match tree.get(addr.section.as_deref(), option)? {
                Some(node) => Ok(node.render()),
                None => addr.missing(option),
            }
        }
    }
}

/// Set the value `addr` names. A sectioned section must already exist.
pub fn assign(snapshot: &mut Snapshot, addr: &Address, value: &str) -> Result<(), AddressError> {
    addr.check_not_empty()?;
    match snapshot {
        Snapshot::Sectioned(cfg) => {
            let (section, option) = addr.require_both()?;
            cfg.set(section, option, value)
        }
        Snapshot::Sectionless(cfg) => cfg.set(addr.require_option("sectionless")?, value),
        Snapshot::Flat(list) => list.set(addr.require_option("flat")?, value),
        Snapshot::Nested(_) => Err(AddressError::Invalid("nested sources are read-only".to_string())),
    }
}

/// Remove the value `addr` names.
///
/// Sectionless removal of an absent option succeeds; sectioned and flat
/// removal of an absent entry is `NotFound`.
pub fn remove(snapshot: &mut Snapshot, addr: &Address) -> Result<(), AddressError> {
    addr.check_not_empty()?;
    match snapshot {
        Snapshot::Sectioned(cfg) => {
            let (section, option) = addr.require_both()?;
            cfg.unset(section, option)
        }
        Snapshot::Sectionless(cfg) => {
            cfg.unset(addr.require_option("sectionless")?);
            Ok(())
        }
        Snapshot::Flat(list) => list.unset(addr.require_option("flat")?),
        Snapshot::Nested(_) => Err(AddressError::Invalid("nested sources are read-only".to_string())),
    }
}

/// Add an empty section to a sectioned snapshot.
pub fn add_section(snapshot: &mut Snapshot, section: &str) -> Result<(), AddressError> {
    match snapshot {
        Snapshot::Sectioned(cfg) => cfg.add_section(section),
        other => Err(AddressError::Invalid(format!(
            "{} sources have no sections",
            other.style()
        ))),
    }
}

/// Remove a section and every option in it.
pub fn remove_section(snapshot: &mut Snapshot, section: &str) -> Result<(), AddressError> {
    match snapshot {
        Snapshot::Sectioned(cfg) => cfg.remove_section(section),
        other => Err(AddressError::Invalid(format!(
            "{} sources have no sections",
            other.style()
        ))),
    }
}
