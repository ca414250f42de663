//! Sectionless key-value text (`key=value`, e.g. `server.properties`).

use super::sectioned::{IMPLICIT_SECTION, Options, check_option_name, parse_ini, stored_value};
use crate::address::AddressError;

/// Snapshot of a sectionless source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionlessConfig {
    header: Vec<String>,
    options: Options,
}

impl SectionlessConfig {
    /// Parse through the sectioned parser. Any stray `[section]` blocks are
    /// folded into the single implicit section.
    pub fn parse(text: &str) -> Self {
        let parsed = parse_ini(text);
        let mut options = Options::new();
        for (name, opts) in parsed.sections {
            if name != IMPLICIT_SECTION {
                tracing::warn!(section = %name, "section header in sectionless source, folding");
            }
            options.extend(opts);
        }
        Self {
            header: parsed.header,
            options,
        }
    }

    pub fn option_names(&self) -> Vec<String> {
        self.options.keys().cloned().collect()
    }

    pub(crate) fn get(&self, option: &str) -> Option<&str> {
        self.options.get(option).map(String::as_str)
    }

    pub(crate) fn set(&mut self, option: &str, value: &str) -> Result<(), AddressError> {
        check_option_name(option)?;
        let value = stored_value(value)?;
        self.options.insert(option.to_string(), value.to_string());
        Ok(())
    }

    /// Removing an absent option is not an error.
    pub(crate) fn unset(&mut self, option: &str) {
        self.options.shift_remove(option);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        for (k, v) in &self.options {
            out.push_str(&format!("{k}={v}\n"));
        }
        out
    }
}
