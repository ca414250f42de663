//! Flat line lists (ban lists, whitelists, ops files).
//!
//! Entries are addressed by content, by the part of the line before a
//! partition separator (`playerA|banned for griefing` answers to
//! `playerA`), or by position among the non-comment lines. Writes replace
//! by position only; anything else appends.

use crate::address::AddressError;

/// Snapshot of a flat source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatList {
    /// Every physical line, comments included.
    lines: Vec<String>,
    partition: Option<String>,
}

fn is_entry(line: &str) -> bool {
    let t = line.trim();
    !t.is_empty() && !t.starts_with('#')
}

impl FlatList {
    pub fn parse(text: &str, partition: Option<&str>) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
            partition: partition.filter(|p| !p.is_empty()).map(str::to_string),
        }
    }

    /// Physical indices and text of every non-comment line.
    fn entries(&self) -> impl Iterator<Item = (usize, &str)> {
        self.lines
            .iter()
            .enumerate()
            .filter(|(_, l)| is_entry(l))
            .map(|(i, l)| (i, l.as_str()))
    }

    /// The name a line is listed and matched under.
    fn name_of<'a>(&self, line: &'a str) -> &'a str {
        match &self.partition {
            Some(sep) => line.split_once(sep.as_str()).map_or(line, |(k, _)| k),
            None => line,
        }
    }

    /// Physical index of the entry `key` refers to: content match first,
    /// then position among entries.
    fn locate(&self, key: &str) -> Option<usize> {
        if let Some((i, _)) = self
            .entries()
            .find(|(_, line)| *line == key || self.name_of(line) == key)
        {
            return Some(i);
        }
        let pos: usize = key.parse().ok()?;
        self.entries().nth(pos).map(|(i, _)| i)
    }

    /// Listed names, in file order.
    pub fn names(&self) -> Vec<String> {
        self.entries()
            .map(|(_, line)| self.name_of(line).to_string())
            .collect()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.locate(key).map(|i| self.lines[i].as_str())
    }

    /// Replace the entry at position `key` when it is an index, otherwise
    /// append a new line. An empty value stores the key itself.
    ///
    /// The stored line must read back as an entry: comment, blank and
    /// multi-line values are rejected.
    pub(crate) fn set(&mut self, key: &str, value: &str) -> Result<(), AddressError> {
        let line = if value.is_empty() { key } else { value };
        if !is_entry(line) || line.contains(['\n', '\r']) {
            return Err(AddressError::Invalid(format!(
                "{line:?} cannot be stored as a list entry"
            )));
        }
        let slot = key
            .parse::<usize>()
            .ok()
            .and_then(|pos| self.entries().nth(pos).map(|(i, _)| i));
        match slot {
            Some(i) => self.lines[i] = line.to_string(),
            None => self.lines.push(line.to_string()),
        }
        Ok(())
    }

    /// Remove the first entry `key` refers to.
    pub(crate) fn unset(&mut self, key: &str) -> Result<(), AddressError> {
        let i = self
            .locate(key)
            .ok_or_else(|| AddressError::NotFound(key.to_string()))?;
        self.lines.remove(i);
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BANNED: &str = "\
# Updated 1/4/25 by Minecraft 1.2
# victim name | ban date | banned by | banned until | reason

playerA|banned for griefing
playerB|spam
";

    #[test]
    fn test_names_skip_comments() {
        let list = FlatList::parse(BANNED, Some("|"));
        assert_eq!(list.names(), vec!["playerA", "playerB"]);

        let plain = FlatList::parse(BANNED, None);
        assert_eq!(plain.names(), vec!["playerA|banned for griefing", "playerB|spam"]);
    }

    #[test]
    fn test_get_by_partition_content_and_index() {
        let list = FlatList::parse(BANNED, Some("|"));
        assert_eq!(list.get("playerA"), Some("playerA|banned for griefing"));
        assert_eq!(list.get("playerB|spam"), Some("playerB|spam"));
        assert_eq!(list.get("1"), Some("playerB|spam"));
        assert_eq!(list.get("2"), None);
        assert_eq!(list.get("playerC"), None);
    }

    #[test]
    fn test_unset_by_partition_removes_whole_line() {
        let mut list = FlatList::parse(BANNED, Some("|"));
        list.unset("playerA").unwrap();
        assert_eq!(list.names(), vec!["playerB"]);
        assert!(list.render().starts_with("# Updated"));
        assert!(!list.render().contains("griefing"));
        assert!(matches!(list.unset("playerA"), Err(AddressError::NotFound(_))));
    }

    #[test]
    fn test_set_replaces_only_by_index() {
        let mut list = FlatList::parse("alice\nbob\n", None);
        list.set("carol", "").unwrap();
        assert_eq!(list.names(), vec!["alice", "bob", "carol"]);

        list.set("0", "alex").unwrap();
        assert_eq!(list.names(), vec!["alex", "bob", "carol"]);

        // A content key is not a position: the value is appended.
        list.set("bob", "dave").unwrap();
        assert_eq!(list.render(), "alex\nbob\ncarol\ndave\n");

        // Out of range counts as "not an index".
        list.set("9", "erin").unwrap();
        assert_eq!(list.names().last().map(String::as_str), Some("erin"));
    }

    #[test]
    fn test_set_rejects_lines_that_are_not_entries() {
        let mut list = FlatList::parse("# ops\nalice\n", None);
        for (key, value) in [("#evil", ""), ("   ", ""), ("x", "# note"), ("x", "a\nb")] {
            assert!(
                matches!(list.set(key, value), Err(AddressError::Invalid(_))),
                "{key:?} {value:?}"
            );
        }
        assert_eq!(list.render(), "# ops\nalice\n");
    }

    #[test]
    fn test_empty_source() {
        let list = FlatList::parse("", None);
        assert!(list.names().is_empty());
        assert_eq!(list.render(), "");
    }
}
