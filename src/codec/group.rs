//! Scanner for the bracketed `(key value...)` group syntax.
//!
//! Groups are located independently of their order. Text outside of groups is
//! skipped, an unterminated trailing group is dropped, and when a group body
//! contains a stray `(` the scanner resynchronizes on the innermost one.

use std::collections::HashMap;

/// One `(key values...)` group borrowed from a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Group<'a> {
    /// Group key (first token inside the parentheses).
    pub key: &'a str,
    /// Everything after the key, trimmed.
    pub values: &'a str,
}

impl<'a> Group<'a> {
    /// Whitespace-separated value tokens.
    pub fn tokens(&self) -> std::str::SplitWhitespace<'a> {
        self.values.split_whitespace()
    }
}

/// Iterator over the groups of a message, in wire order.
#[derive(Debug, Clone)]
pub struct Groups<'a> {
    rest: &'a str,
}

/// Iterate over the groups in `text`.
pub fn groups(text: &str) -> Groups<'_> {
    Groups { rest: text }
}

impl<'a> Iterator for Groups<'a> {
    type Item = Group<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let open = self.rest.find('(')?;
            let after = &self.rest[open + 1..];
            let Some(close) = after.find(')') else {
                self.rest = "";
                return None;
            };
            let mut body = &after[..close];
            self.rest = &after[close + 1..];

            if let Some(inner) = body.rfind('(') {
                body = &body[inner + 1..];
            }
            let body = body.trim();
            let (key, values) = match body.split_once(char::is_whitespace) {
                Some((key, values)) => (key, values.trim()),
                None => (body, ""),
            };
            if key.is_empty() {
                continue;
            }
            return Some(Group { key, values });
        }
    }
}

/// Key lookup over a message. The first occurrence of a key wins.
#[derive(Debug, Clone, Default)]
pub struct GroupIndex<'a> {
    entries: HashMap<&'a str, &'a str>,
}

impl<'a> GroupIndex<'a> {
    /// Index every group in `text`.
    pub fn new(text: &'a str) -> Self {
        let mut entries = HashMap::new();
        for group in groups(text) {
            entries.entry(group.key).or_insert(group.values);
        }
        Self { entries }
    }

    /// Values of `key`, if the group is present.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries.get(key).copied()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the message held no groups at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
