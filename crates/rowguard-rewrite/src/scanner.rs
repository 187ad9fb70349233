//! Single-pass SQL scanner.
//!
//! Splits SQL text into contiguous spans that cover the whole input:
//!
//! | Kind     | Content |
//! |----------|---------|
//! | `Quoted` | a `'...'` or `"..."` literal, delimiters included |
//! | `Word`   | a maximal run of `[A-Za-z0-9_]` |
//! | `Other`  | a maximal run of anything else (whitespace, punctuation, non-ASCII) |
//!
//! Quoted literals follow MySQL escaping: a backslash escapes the next
//! character, and a doubled delimiter (`''` or `""`) is a literal quote.
//! The scanner never fails. An unterminated literal runs to the end of the
//! input.
//!
//! All span boundaries fall on ASCII bytes, so every span is a valid `&str`
//! slice of the input and no allocation takes place.

use rowguard_core::is_word_byte;
use std::fmt;

const BACKSLASH: u8 = b'\\';

/// Classification of a [`Span`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Quoted,
    Word,
    Other,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpanKind::Quoted => write!(f, "QUOTED"),
            SpanKind::Word => write!(f, "WORD"),
            SpanKind::Other => write!(f, "OTHER"),
        }
    }
}

/// A classified slice of the scanned SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub kind: SpanKind,
    pub text: &'a str,
    /// Byte offset of `text` in the scanned input.
    pub offset: usize,
}

impl<'a> Span<'a> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }

    pub fn is_word(&self) -> bool {
        self.kind == SpanKind::Word
    }

    pub fn is_quoted(&self) -> bool {
        self.kind == SpanKind::Quoted
    }
}

#[inline]
fn is_quote(b: u8) -> bool {
    b == b'\'' || b == b'"'
}

/// Iterator over the spans of a SQL string.
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    sql: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(sql: &'a str) -> Self {
        Self { sql, pos: 0 }
    }

    /// End offset of the quoted literal opened at `start`.
    fn quoted_end(&self, start: usize) -> usize {
        let bytes = self.sql.as_bytes();
        let delimiter = bytes[start];
        let mut escaped = false;
        let mut i = start + 1;
        while i < bytes.len() {
            let b = bytes[i];
            i += 1;
            if escaped {
                escaped = false;
            } else if b == BACKSLASH {
                escaped = true;
            } else if b == delimiter {
                if bytes.get(i) == Some(&delimiter) {
                    // Doubled delimiter: a literal quote inside the string.
                    i += 1;
                } else {
                    return i;
                }
            }
        }
        bytes.len()
    }

    /// End offset of the run starting at `start` whose bytes satisfy `class`.
    fn run_end(&self, start: usize, class: impl Fn(u8) -> bool) -> usize {
        let bytes = self.sql.as_bytes();
        bytes[start..]
            .iter()
            .position(|&b| !class(b))
            .map_or(bytes.len(), |n| start + n)
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Span<'a>;

    fn next(&mut self) -> Option<Span<'a>> {
        let start = self.pos;
        let first = *self.sql.as_bytes().get(start)?;

        let (kind, end) = if is_quote(first) {
            (SpanKind::Quoted, self.quoted_end(start))
        } else if is_word_byte(first) {
            (SpanKind::Word, self.run_end(start, is_word_byte))
        } else {
            (
                SpanKind::Other,
                self.run_end(start, |b| !is_word_byte(b) && !is_quote(b)),
            )
        };

        self.pos = end;
        Some(Span {
            kind,
            text: &self.sql[start..end],
            offset: start,
        })
    }
}

/// Scan `sql` into spans.
pub fn scan(sql: &str) -> Scanner<'_> {
    Scanner::new(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn spans(sql: &str) -> Vec<(SpanKind, &str)> {
        scan(sql).map(|s| (s.kind, s.text)).collect()
    }

    fn quoted(sql: &str) -> Vec<&str> {
        scan(sql).filter(Span::is_quoted).map(|s| s.text).collect()
    }

    #[test]
    fn test_classifies_words_and_punctuation() {
        assert_eq!(
            spans("SELECT posts.id FROM posts"),
            vec![
                (SpanKind::Word, "SELECT"),
                (SpanKind::Other, " "),
                (SpanKind::Word, "posts"),
                (SpanKind::Other, "."),
                (SpanKind::Word, "id"),
                (SpanKind::Other, " "),
                (SpanKind::Word, "FROM"),
                (SpanKind::Other, " "),
                (SpanKind::Word, "posts"),
            ]
        );
    }

    #[test]
    fn test_quote_flushes_adjacent_spans() {
        assert_eq!(
            spans("a='x'b"),
            vec![
                (SpanKind::Word, "a"),
                (SpanKind::Other, "="),
                (SpanKind::Quoted, "'x'"),
                (SpanKind::Word, "b"),
            ]
        );
    }

    #[test]
    fn test_spans_cover_input() {
        let sql = "SELECT * FROM t WHERE a = 'it''s' AND b = \"x\\\"y\" -- é";
        let joined: String = scan(sql).map(|s| s.text).collect();
        assert_eq!(joined, sql);

        let mut expected_offset = 0;
        for span in scan(sql) {
            assert_eq!(span.offset, expected_offset);
            expected_offset = span.end();
        }
        assert_eq!(expected_offset, sql.len());
    }

    #[test]
    fn test_backslash_escaped_quote() {
        assert_eq!(quoted(r#"x = "posts na \" me" AND"#), vec![r#""posts na \" me""#]);
        assert_eq!(quoted(r"x = 'posts na \' me' AND"), vec![r"'posts na \' me'"]);
    }

    #[test]
    fn test_doubled_quote() {
        assert_eq!(quoted(r#"x = "posts na "" me" AND"#), vec![r#""posts na "" me""#]);
        assert_eq!(quoted("x = 'posts na '' me' AND"), vec!["'posts na '' me'"]);
    }

    #[test]
    fn test_mixed_escapes() {
        assert_eq!(
            quoted(r#"x = "posts na \" "" me" AND"#),
            vec![r#""posts na \" "" me""#]
        );
    }

    #[test]
    fn test_escaped_quote_at_edges() {
        assert_eq!(quoted(r#"x = "\"posts" AND"#), vec![r#""\"posts""#]);
        assert_eq!(quoted(r#"x = """posts" AND"#), vec![r#""""posts""#]);
        assert_eq!(quoted(r#"x = "posts\"" AND"#), vec![r#""posts\"""#]);
        assert_eq!(quoted(r#"x = "posts""" AND"#), vec![r#""posts""""#]);
        assert_eq!(quoted("x = '''posts' AND"), vec!["'''posts'"]);
        assert_eq!(quoted("x = 'posts''' AND"), vec!["'posts'''"]);
    }

    #[test]
    fn test_other_delimiter_inside_literal() {
        assert_eq!(quoted(r#"x = "posts' comments" y"#), vec![r#""posts' comments""#]);
        assert_eq!(quoted(r#"x = 'posts" comments' y"#), vec![r#"'posts" comments'"#]);
    }

    #[test]
    fn test_escaped_backslash_closes() {
        assert_eq!(quoted(r"x = 'a\\' posts"), vec![r"'a\\'"]);
        let words: Vec<&str> = scan(r"x = 'a\\' posts")
            .filter(Span::is_word)
            .map(|s| s.text)
            .collect();
        assert_eq!(words, vec!["x", "posts"]);
    }

    #[test]
    fn test_empty_literals() {
        assert_eq!(quoted("a = '' OR b = \"\""), vec!["''", "\"\""]);
    }

    #[test]
    fn test_unterminated_literal_runs_to_end() {
        assert_eq!(
            spans("SELECT 'posts FROM x"),
            vec![
                (SpanKind::Word, "SELECT"),
                (SpanKind::Other, " "),
                (SpanKind::Quoted, "'posts FROM x"),
            ]
        );
    }

    #[test]
    fn test_trailing_backslash_is_literal() {
        assert_eq!(quoted("SELECT 'abc\\"), vec!["'abc\\"]);
        assert_eq!(spans("a\\"), vec![(SpanKind::Word, "a"), (SpanKind::Other, "\\")]);
    }

    #[test]
    fn test_non_ascii_is_other() {
        assert_eq!(
            spans("éposts"),
            vec![(SpanKind::Other, "é"), (SpanKind::Word, "posts")]
        );
    }

    #[test]
    fn test_empty_input() {
        assert!(scan("").next().is_none());
    }
}
