//! Stamped SQL text.
//!
//! [`Sql`] is the string-like value passed between the host and the
//! fortifier. Text that went through [`fortify`](crate::fortify) carries a
//! [`Stamp`], so submitting it again is a no-op, and a rewritten statement
//! keeps the text it was produced from for a fallback retry.
//!
//! The stamp is not part of the text: `Sql` derefs to `str` and prints as
//! the plain statement.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

/// Proof that a [`Sql`] value was produced by the fortifier. Only this crate
/// can create one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stamp {
    _private: (),
}

impl Stamp {
    pub(crate) fn new() -> Self {
        Self { _private: () }
    }
}

/// SQL text with an optional fortification stamp and back-reference.
///
/// Equality and hashing only look at the text, so a `Sql` can be found in a
/// set or map by `&str`.
#[derive(Debug, Clone)]
pub struct Sql {
    text: String,
    stamp: Option<Stamp>,
    original: Option<String>,
}

impl Sql {
    /// Plain, unstamped SQL.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            stamp: None,
            original: None,
        }
    }

    /// Mark text as already evaluated without changing it.
    pub(crate) fn stamp(self) -> Self {
        Self {
            text: self.text,
            stamp: Some(Stamp::new()),
            original: None,
        }
    }

    /// A rewritten statement remembering the text it replaced.
    pub(crate) fn rewritten(text: String, original: String) -> Self {
        Self {
            text,
            stamp: Some(Stamp::new()),
            original: Some(original),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn is_stamped(&self) -> bool {
        self.stamp.is_some()
    }

    /// The pre-rewrite text, present only when the fortifier changed it.
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }

    /// Whether the fortifier changed the text.
    pub fn is_changed(&self) -> bool {
        self.original.is_some()
    }
}

/// Whether `sql` already passed through the fortifier.
pub fn is_stamped(sql: &Sql) -> bool {
    sql.is_stamped()
}

/// The statement to retry with when a rewritten statement failed, if any.
pub fn recover_original(sql: &Sql) -> Option<&str> {
    sql.original()
}

impl Deref for Sql {
    type Target = str;

    fn deref(&self) -> &str {
        &self.text
    }
}

impl AsRef<str> for Sql {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Borrow<str> for Sql {
    fn borrow(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for Sql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<String> for Sql {
    fn from(text: String) -> Self {
        Sql::new(text)
    }
}

impl From<&str> for Sql {
    fn from(text: &str) -> Self {
        Sql::new(text)
    }
}

impl From<&String> for Sql {
    fn from(text: &String) -> Self {
        Sql::new(text.as_str())
    }
}

impl From<Sql> for String {
    fn from(sql: Sql) -> Self {
        sql.text
    }
}

impl PartialEq for Sql {
    fn eq(&self, other: &Sql) -> bool {
        self.text == other.text
    }
}

impl Eq for Sql {}

impl Hash for Sql {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialEq<str> for Sql {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Sql {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

impl PartialEq<String> for Sql {
    fn eq(&self, other: &String) -> bool {
        &self.text == other
    }
}
