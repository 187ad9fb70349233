//! Matchers derived from a [`Configuration`](crate::Configuration).
//!
//! These are built lazily by the configuration and rebuilt only after the
//! fields they depend on change.

use regex::Regex;
use std::collections::HashMap;

/// Whether `b` can be part of a bare identifier word.
#[inline]
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Whether `name` is a non-empty run of identifier bytes.
pub fn is_word(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(is_word_byte)
}

/// Case-insensitive whole-word matcher over the configured table names.
///
/// Used as a prefilter: when no table name appears anywhere in a statement
/// the scanner does not need to run at all.
#[derive(Debug, Clone)]
pub struct TableMatcher {
    regex: Regex,
}

impl TableMatcher {
    /// Compile a matcher for `tables`. Returns `None` for an empty list.
    pub fn new(tables: &[String]) -> Option<Result<Self, regex::Error>> {
        if tables.is_empty() {
            return None;
        }
        let alternation = tables
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        // ASCII word boundaries, identical to what the scanner treats as a word.
        // Case folding stays inside the alternation so the boundary classes
        // never pick up Unicode folds of ASCII letters.
        let pattern = format!("(?:^|[^A-Za-z0-9_])(?i:{alternation})(?:[^A-Za-z0-9_]|$)");
        Some(Regex::new(&pattern).map(|regex| Self { regex }))
    }

    pub fn is_match(&self, sql: &str) -> bool {
        self.regex.is_match(sql)
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

/// Precomputed lower-cased table name to replacement lookup.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    map: HashMap<String, String>,
    min_len: usize,
    max_len: usize,
}

impl SubstitutionMap {
    /// Render `template` for every table. `placeholder` is substituted by the
    /// table name as configured.
    pub fn new(tables: &[String], template: &str, placeholder: &str) -> Self {
        let mut map = HashMap::with_capacity(tables.len());
        let mut min_len = usize::MAX;
        let mut max_len = 0;
        for table in tables {
            min_len = min_len.min(table.len());
            max_len = max_len.max(table.len());
            map.insert(
                table.to_ascii_lowercase(),
                template.replace(placeholder, table),
            );
        }
        if map.is_empty() {
            min_len = 0;
        }
        Self {
            map,
            min_len,
            max_len,
        }
    }

    /// Look up a word case-insensitively. `scratch` is reused between calls so
    /// a whole statement is rewritten with at most one extra allocation.
    pub fn lookup<'m>(&'m self, word: &str, scratch: &mut String) -> Option<&'m str> {
        if self.map.is_empty() || word.len() < self.min_len || word.len() > self.max_len {
            return None;
        }
        scratch.clear();
        scratch.extend(word.chars().map(|c| c.to_ascii_lowercase()));
        self.map.get(scratch.as_str()).map(String::as_str)
    }

    pub fn get(&self, table: &str) -> Option<&str> {
        self.map
            .get(&table.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Matches the leading keyword of a statement against a keyword list.
///
/// Only the first word is inspected, so the cost does not depend on the
/// length of the statement.
#[derive(Debug, Clone, Default)]
pub struct KeywordMatcher {
    keywords: Vec<String>,
    max_len: usize,
}

impl KeywordMatcher {
    pub fn new(keywords: &[String]) -> Self {
        let keywords: Vec<String> = keywords.iter().map(|k| k.to_ascii_uppercase()).collect();
        let max_len = keywords.iter().map(String::len).max().unwrap_or(0);
        Self { keywords, max_len }
    }

    pub fn matches(&self, sql: &str) -> bool {
        match leading_keyword(sql, self.max_len) {
            Some(word) => self.keywords.iter().any(|k| k.eq_ignore_ascii_case(word)),
            None => false,
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Return the first word of `sql` after leading whitespace, provided it is
/// no longer than `max_len` bytes.
pub fn leading_keyword(sql: &str, max_len: usize) -> Option<&str> {
    let trimmed = sql.trim_start();
    let end = trimmed
        .bytes()
        .take(max_len + 1)
        .position(|b| !is_word_byte(b))
        .unwrap_or_else(|| trimmed.len().min(max_len + 1));
    if end == 0 || end > max_len {
        return None;
    }
    Some(&trimmed[..end])
}
