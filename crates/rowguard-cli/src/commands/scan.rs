//! `rowguard scan` command implementation.

use anyhow::Result;
use rowguard_rewrite::scan;

use super::read_sql;

/// One `KIND<TAB>text` line per span. Line breaks and tabs in the text are
/// escaped so every span stays on one line.
pub fn render_spans(sql: &str) -> String {
    scan(sql)
        .map(|span| format!("{}\t{}", span.kind, one_line(span.text)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn one_line(text: &str) -> String {
    text.replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

pub fn run(sql: Option<String>) -> Result<()> {
    let sql = read_sql(sql)?;
    println!("{}", render_spans(&sql));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_spans() {
        assert_eq!(
            render_spans("SELECT 'a\nb' FROM t"),
            "WORD\tSELECT\nOTHER\t \nQUOTED\t'a\\nb'\nOTHER\t \nWORD\tFROM\nOTHER\t \nWORD\tt"
        );
    }
}
