//! Sectioned key-value text (`[section]` headers, `key = value` lines).
//!
//! The line parser here is shared with the sectionless style: a source with
//! no header at all lands in [`IMPLICIT_SECTION`], so one parser covers both.

use indexmap::IndexMap;

use crate::address::AddressError;

/// Name given to options that appear before any `[section]` header.
pub(crate) const IMPLICIT_SECTION: &str = "";

pub(crate) type Options = IndexMap<String, String>;

/// Result of the shared line parser.
#[derive(Debug, Default)]
pub(crate) struct ParsedIni {
    /// Comment block at the top of the file, kept verbatim.
    pub header: Vec<String>,
    /// Sections in file order. Options before any header are under
    /// [`IMPLICIT_SECTION`].
    pub sections: IndexMap<String, Options>,
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';')
}

fn invalid(what: &str, name: &str) -> AddressError {
    AddressError::Invalid(format!("{name:?} cannot be stored as {what}"))
}

/// Reject option names the line parser would read back differently.
pub(crate) fn check_option_name(name: &str) -> Result<(), AddressError> {
    let readable = !name.is_empty()
        && name.trim() == name
        && !name.contains(['=', '\n', '\r'])
        && !is_comment(name)
        && !name.starts_with('[');
    if readable { Ok(()) } else { Err(invalid("an option name", name)) }
}

/// Values are stored trimmed, as the parser would read them back.
pub(crate) fn stored_value(value: &str) -> Result<&str, AddressError> {
    if value.contains(['\n', '\r']) {
        return Err(invalid("a value", value));
    }
    Ok(value.trim())
}

fn check_section_name(name: &str) -> Result<(), AddressError> {
    let readable = !name.is_empty()
        && name.trim() == name
        && !name.contains(['[', ']', '\n', '\r']);
    if readable { Ok(()) } else { Err(invalid("a section name", name)) }
}

/// Parse `text` into sections. Never fails: unrecognized lines become
/// options with an empty value.
pub(crate) fn parse_ini(text: &str) -> ParsedIni {
    let mut parsed = ParsedIni::default();
    let mut current = IMPLICIT_SECTION.to_string();
    let mut in_header = true;

    for raw in text.lines() {
        let line = raw.trim();

        if line.is_empty() {
            continue;
        }
        if is_comment(line) {
            if in_header {
                parsed.header.push(raw.trim_end().to_string());
            }
            continue;
        }
        in_header = false;

        if line.starts_with('[') && line.ends_with(']') {
            let name = line.trim_matches(|c| c == '[' || c == ']').trim();
            current = name.to_string();
            parsed.sections.entry(current.clone()).or_default();
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (line, ""),
        };
        parsed
            .sections
            .entry(current.clone())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    parsed
}

/// Snapshot of a sectioned source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionedConfig {
    header: Vec<String>,
    /// Options that precede the first header. Written back, never listed.
    preamble: Options,
    sections: IndexMap<String, Options>,
}

impl SectionedConfig {
    pub fn parse(text: &str) -> Self {
        let ParsedIni {
            header,
            mut sections,
        } = parse_ini(text);
        let preamble = sections.shift_remove(IMPLICIT_SECTION).unwrap_or_default();
        Self {
            header,
            preamble,
            sections,
        }
    }

    pub fn section_names(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    pub fn option_names(&self, section: &str) -> Result<Vec<String>, AddressError> {
        self.sections
            .get(section)
            .map(|opts| opts.keys().cloned().collect())
            .ok_or_else(|| AddressError::NotFound(section.to_string()))
    }

    pub(crate) fn get(&self, section: &str, option: &str) -> Result<Option<&str>, AddressError> {
        let opts = self
            .sections
            .get(section)
            .ok_or_else(|| AddressError::NotFound(section.to_string()))?;
        Ok(opts.get(option).map(String::as_str))
    }

    pub(crate) fn set(&mut self, section: &str, option: &str, value: &str) -> Result<(), AddressError> {
        check_option_name(option)?;
        let value = stored_value(value)?;
        let opts = self
            .sections
            .get_mut(section)
            .ok_or_else(|| AddressError::NotFound(section.to_string()))?;
        opts.insert(option.to_string(), value.to_string());
        Ok(())
    }

    pub(crate) fn unset(&mut self, section: &str, option: &str) -> Result<(), AddressError> {
        let opts = self
            .sections
            .get_mut(section)
            .ok_or_else(|| AddressError::NotFound(section.to_string()))?;
        opts.shift_remove(option)
            .map(|_| ())
            .ok_or_else(|| AddressError::NotFound(format!("{section}/{option}")))
    }

    pub(crate) fn add_section(&mut self, section: &str) -> Result<(), AddressError> {
        check_section_name(section)?;
        if self.sections.contains_key(section) {
            return Err(AddressError::AlreadyExists(section.to_string()));
        }
        self.sections.insert(section.to_string(), Options::new());
        Ok(())
    }

    pub(crate) fn remove_section(&mut self, section: &str) -> Result<(), AddressError> {
        self.sections
            .shift_remove(section)
            .map(|_| ())
            .ok_or_else(|| AddressError::NotFound(section.to_string()))
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        for (k, v) in &self.preamble {
            out.push_str(&format!("{k} = {v}\n"));
        }
        for (name, opts) in &self.sections {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&format!("[{name}]\n"));
            for (k, v) in opts {
                out.push_str(&format!("{k} = {v}\n"));
            }
        }
        out
    }
}
