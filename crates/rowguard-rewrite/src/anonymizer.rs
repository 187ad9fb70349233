//! Literal anonymization for logging.
//!
//! Replaces quoted literals and bare integers with `?` so statements can be
//! logged without their values.

use crate::scanner::{SpanKind, scan};

/// Return `sql` with every quoted literal and every bare integer replaced
/// by `?`.
pub fn anonymize(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    for span in scan(sql) {
        match span.kind {
            SpanKind::Quoted => out.push('?'),
            SpanKind::Word if is_integer(span.text) => out.push('?'),
            _ => out.push_str(span.text),
        }
    }
    out
}

/// Canonical decimal integer: digits only, no leading zero except `0`.
fn is_integer(word: &str) -> bool {
    let bytes = word.as_bytes();
    match bytes {
        [] => false,
        [b'0'] => true,
        [first, rest @ ..] => {
            (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quoted_literals() {
        assert_eq!(
            anonymize(r#"SELECT * FROM t WHERE a = 'x' AND b = "it""s""#),
            "SELECT * FROM t WHERE a = ? AND b = ?"
        );
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            anonymize("SELECT * FROM t WHERE id = 123 LIMIT 0"),
            "SELECT * FROM t WHERE id = ? LIMIT ?"
        );
    }

    #[test]
    fn test_identifiers_with_digits_kept() {
        assert_eq!(anonymize("SELECT t1.c2 FROM t1"), "SELECT t1.c2 FROM t1");
        assert_eq!(anonymize("SELECT 0123, 12a"), "SELECT 0123, 12a");
    }

    #[test]
    fn test_decimal_parts_each_replaced() {
        assert_eq!(anonymize("x = 1.5"), "x = ?.?");
    }

    #[test]
    fn test_escaped_literal_is_one_placeholder() {
        assert_eq!(anonymize(r"a = 'it\'s' AND b = 1"), "a = ? AND b = ?");
    }
}
