//! Session variables attached to fortified statements.
//!
//! Views that filter rows per tenant read MySQL user variables such as
//! `@tenant_id`. The variables live here as an ordered mapping and are
//! rendered into a single `SET @a := 1, @b := 'x'` init command.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A scalar value assigned to a session variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl SessionValue {
    /// Render the value as a MySQL literal.
    pub fn to_sql_literal(&self) -> String {
        match self {
            SessionValue::Bool(true) => "TRUE".to_string(),
            SessionValue::Bool(false) => "FALSE".to_string(),
            SessionValue::Int(i) => i.to_string(),
            SessionValue::Float(f) if f.is_finite() => f.to_string(),
            SessionValue::Float(_) => "NULL".to_string(),
            SessionValue::Str(s) => quote_string(s),
        }
    }
}

impl fmt::Display for SessionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql_literal())
    }
}

impl From<bool> for SessionValue {
    fn from(value: bool) -> Self {
        SessionValue::Bool(value)
    }
}

impl From<i64> for SessionValue {
    fn from(value: i64) -> Self {
        SessionValue::Int(value)
    }
}

impl From<i32> for SessionValue {
    fn from(value: i32) -> Self {
        SessionValue::Int(i64::from(value))
    }
}

impl From<u32> for SessionValue {
    fn from(value: u32) -> Self {
        SessionValue::Int(i64::from(value))
    }
}

impl From<f64> for SessionValue {
    fn from(value: f64) -> Self {
        SessionValue::Float(value)
    }
}

impl From<&str> for SessionValue {
    fn from(value: &str) -> Self {
        SessionValue::Str(value.to_string())
    }
}

impl From<String> for SessionValue {
    fn from(value: String) -> Self {
        SessionValue::Str(value)
    }
}

/// Single-quote a string using MySQL backslash escaping.
fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Whether `name` can be used as a MySQL user variable without quoting.
pub fn is_valid_variable_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'.')
}

/// Ordered mapping of session variable names to values.
///
/// Insertion order is kept: the init command lists variables in the order
/// they were configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionVariables {
    entries: Vec<(String, SessionValue)>,
}

impl SessionVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a variable. A replaced variable keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SessionValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SessionValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SessionValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SessionValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render `SET @a := 1, @b := 'x'`, or an empty string when there are
    /// no variables.
    pub fn init_command(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let assignments: Vec<String> = self
            .entries
            .iter()
            .map(|(name, value)| format!("@{} := {}", name, value.to_sql_literal()))
            .collect();
        format!("SET {}", assignments.join(", "))
    }
}

impl<K, V> FromIterator<(K, V)> for SessionVariables
where
    K: Into<String>,
    V: Into<SessionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = SessionVariables::new();
        for (name, value) in iter {
            vars.insert(name, value);
        }
        vars
    }
}

impl Serialize for SessionVariables {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

struct SessionVariablesVisitor;

impl<'de> Visitor<'de> for SessionVariablesVisitor {
    type Value = SessionVariables;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping of session variable names to scalar values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut vars = SessionVariables::new();
        while let Some((name, value)) = access.next_entry::<String, SessionValue>()? {
            vars.insert(name, value);
        }
        Ok(vars)
    }
}

impl<'de> Deserialize<'de> for SessionVariables {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(SessionVariablesVisitor)
    }
}
