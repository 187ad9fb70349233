//! Table identifier substitution driven by the scanner.
//!
//! Only `Word` spans are candidates. Quoted literals and punctuation are
//! copied verbatim, so a table name inside a string literal is never
//! touched while every bare use (`FROM posts`, `posts.id`, `` `posts` ``)
//! is rewritten.

use rowguard_core::SubstitutionMap;
use std::borrow::Cow;

use crate::scanner::{SpanKind, scan};

/// Rewrites configured table names to their replacements.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierRewriter<'m> {
    substitutions: &'m SubstitutionMap,
}

/// Output of [`IdentifierRewriter::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite<'a> {
    pub text: Cow<'a, str>,
    /// Number of identifiers replaced.
    pub replaced: usize,
}

impl<'a> Rewrite<'a> {
    pub fn is_changed(&self) -> bool {
        matches!(self.text, Cow::Owned(_))
    }
}

impl<'m> IdentifierRewriter<'m> {
    pub fn new(substitutions: &'m SubstitutionMap) -> Self {
        Self { substitutions }
    }

    /// Rewrite `sql`. Borrows the input when nothing was replaced.
    pub fn rewrite<'a>(&self, sql: &'a str) -> Rewrite<'a> {
        if self.substitutions.is_empty() {
            return Rewrite {
                text: Cow::Borrowed(sql),
                replaced: 0,
            };
        }

        let mut out: Option<String> = None;
        let mut copied = 0;
        let mut replaced = 0;
        let mut scratch = String::new();

        for span in scan(sql) {
            if span.kind != SpanKind::Word {
                continue;
            }
            let Some(replacement) = self.substitutions.lookup(span.text, &mut scratch) else {
                continue;
            };
            if replacement == span.text {
                continue;
            }
            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 32));
            buf.push_str(&sql[copied..span.offset]);
            buf.push_str(replacement);
            copied = span.end();
            replaced += 1;
        }

        match out {
            Some(mut buf) => {
                buf.push_str(&sql[copied..]);
                Rewrite {
                    text: Cow::Owned(buf),
                    replaced,
                }
            }
            None => Rewrite {
                text: Cow::Borrowed(sql),
                replaced: 0,
            },
        }
    }
}
