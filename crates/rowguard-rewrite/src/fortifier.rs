//! Statement fortification.
//!
//! [`fortify`] ties the pipeline together:
//!
//! 1. Stamped input is returned as is.
//! 2. Statements rejected by the [`RewritePolicy`] are returned unstamped so
//!    they are evaluated again next time.
//! 3. Statements that mention no configured table are stamped unchanged.
//! 4. Otherwise the caller's hook runs with the init command, the statement
//!    is rewritten, and the init command is prepended as a comment. The
//!    result remembers the original text for a fallback retry.

use rowguard_core::{Configuration, RowGuardConfig};
use std::borrow::Cow;
use std::path::Path;
use tracing::Level;

use crate::anonymizer::anonymize;
use crate::error::Result;
use crate::policy::{RewritePolicy, Verdict};
use crate::rewriter::IdentifierRewriter;
use crate::stamp::Sql;

/// Fortify `sql` against `config`.
///
/// `on_about_to_rewrite` is called with the init command only when a
/// configured table appears in the statement, before the rewrite runs.
pub fn fortify<F>(sql: impl Into<Sql>, config: &Configuration, on_about_to_rewrite: F) -> Sql
where
    F: FnOnce(&str),
{
    let sql = sql.into();

    if sql.is_stamped() {
        tracing::trace!("Statement already fortified");
        return sql;
    }

    if let Verdict::Skip(reason) = RewritePolicy::new(config).evaluate(&sql) {
        if tracing::enabled!(Level::DEBUG) {
            tracing::debug!(reason = %reason, sql = %anonymize(&sql), "Statement not eligible for rewrite");
        }
        return sql;
    }

    let substitutions = config.substitutions();
    if substitutions.is_empty() {
        return sql.stamp();
    }
    if let Some(matcher) = config.table_matcher() {
        if !matcher.is_match(&sql) {
            return sql.stamp();
        }
    }

    let init_command = config.init_command();
    on_about_to_rewrite(init_command);

    let rewritten = {
        let rewrite = IdentifierRewriter::new(substitutions).rewrite(&sql);
        let replaced = rewrite.replaced;
        match rewrite.text {
            Cow::Owned(text) if text != *sql => Some((text, replaced)),
            _ => None,
        }
    };
    let Some((rewritten, replaced)) = rewritten else {
        return sql.stamp();
    };

    if tracing::enabled!(Level::DEBUG) {
        tracing::debug!(replaced, sql = %anonymize(&rewritten), "Statement rewritten");
    }

    let text = format!("/* {} */ {}", comment_safe(init_command), rewritten);
    Sql::rewritten(text, sql.into_string())
}

/// Keep a value from closing the comment early.
fn comment_safe(init_command: &str) -> Cow<'_, str> {
    if init_command.contains("*/") {
        init_command.replace("*/", "* /").into()
    } else {
        init_command.into()
    }
}

/// A [`Configuration`] bound to the fortify entry point.
#[derive(Debug, Clone, Copy)]
pub struct Fortifier<'c> {
    config: &'c Configuration,
}

impl<'c> Fortifier<'c> {
    pub fn new(config: &'c Configuration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &'c Configuration {
        self.config
    }

    /// Fortify without a rewrite hook.
    pub fn fortify(&self, sql: impl Into<Sql>) -> Sql {
        fortify(sql, self.config, |_| {})
    }

    pub fn fortify_with<F>(&self, sql: impl Into<Sql>, on_about_to_rewrite: F) -> Sql
    where
        F: FnOnce(&str),
    {
        fortify(sql, self.config, on_about_to_rewrite)
    }
}

/// Load and validate a configuration file for use with [`fortify`].
pub fn load_configuration(path: impl AsRef<Path>) -> Result<Configuration> {
    Ok(RowGuardConfig::load(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rowguard_core::SessionVariables;
    use std::cell::Cell;

    fn config() -> Configuration {
        let mut config = Configuration::new();
        config.set_tables(["posts", "comments"]).unwrap();
        config.set_replacement("v_{table}").unwrap();
        config
            .set_session_variables(SessionVariables::new().with("tenant", 7))
            .unwrap();
        config
    }

    #[test]
    fn test_rewrites_and_prepends_init_command() {
        let result = Fortifier::new(&config()).fortify("SELECT * FROM posts");
        assert_eq!(result, "/* SET @tenant := 7 */ SELECT * FROM v_posts");
        assert!(result.is_stamped());
        assert_eq!(result.original(), Some("SELECT * FROM posts"));
    }

    #[test]
    fn test_hook_receives_init_command() {
        let seen = Cell::new(None);
        fortify("SELECT * FROM comments", &config(), |init| {
            seen.set(Some(init.to_string()))
        });
        assert_eq!(seen.take(), Some("SET @tenant := 7".to_string()));
    }

    #[test]
    fn test_no_table_is_stamped_without_hook() {
        let called = Cell::new(false);
        let result = fortify("SELECT * FROM books", &config(), |_| called.set(true));
        assert!(!called.get());
        assert!(result.is_stamped());
        assert!(!result.is_changed());
        assert_eq!(result, "SELECT * FROM books");
    }

    #[test]
    fn test_table_only_in_literal() {
        let sql = "SELECT * FROM books WHERE kind = 'posts'";
        let result = Fortifier::new(&config()).fortify(sql);
        assert_eq!(result, sql);
        assert!(result.is_stamped());
        assert_eq!(result.original(), None);
    }

    #[test]
    fn test_policy_rejection_is_unstamped() {
        let result = Fortifier::new(&config()).fortify("SHOW COLUMNS FROM posts");
        assert_eq!(result, "SHOW COLUMNS FROM posts");
        assert!(!result.is_stamped());
    }

    #[test]
    fn test_identity_template_is_stamped_unchanged() {
        let mut config = config();
        config.set_replacement("").unwrap();
        let called = Cell::new(false);
        let result = fortify("SELECT * FROM posts", &config, |_| called.set(true));
        assert_eq!(result, "SELECT * FROM posts");
        assert!(result.is_stamped());
        assert!(!called.get());
    }

    #[test]
    fn test_comment_terminator_in_value_is_neutralized() {
        let mut config = config();
        config
            .set_session_variables(SessionVariables::new().with("note", "a*/b"))
            .unwrap();
        let result = Fortifier::new(&config).fortify("SELECT * FROM posts");
        assert_eq!(result, "/* SET @note := 'a* /b' */ SELECT * FROM v_posts");
    }

    #[test]
    fn test_load_configuration_reports_errors() {
        let err = load_configuration("/nonexistent/rowguard.yaml").unwrap_err();
        assert!(err.to_string().starts_with("configuration error"));
    }
}
