//! Runtime configuration consumed by the fortifier.
//!
//! A [`Configuration`] is owned by the caller, typically one per logical
//! session or tenant. Setters validate synchronously and reset only the
//! derived caches that depend on the changed field; the caches are rebuilt
//! lazily on first use.

use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::{Arc, LazyLock, OnceLock};

use crate::config::ConfigError;
use crate::config::variables::{SessionVariables, is_valid_variable_name};
use crate::matcher::{KeywordMatcher, SubstitutionMap, TableMatcher, is_word};

/// Marker substituted by the matched table name in a replacement template.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// Statement types rewritten by default.
pub const DEFAULT_QUERY_TYPES: &[&str] = &["SELECT"];

/// Commands never rewritten: they enumerate physical table metadata that a
/// view does not carry.
pub const DEFAULT_EXCLUDED_COMMANDS: &[&str] = &["SHOW"];

/// Index hints cannot be honoured by a substituted view.
pub const DEFAULT_SKIP_PATTERN: &str = r"\b(?:USE|FORCE|IGNORE)\s+(?:INDEX|KEY)\b";

/// Callback invoked with the execution error before a fallback retry.
/// Returning an error aborts the retry.
pub type ErrorHook = Arc<dyn Fn(&anyhow::Error) -> anyhow::Result<()> + Send + Sync>;

/// Table redirection and session variable configuration.
#[derive(Clone)]
pub struct Configuration {
    tables: Vec<String>,
    replacement: String,
    session_variables: SessionVariables,
    query_types: Vec<String>,
    excluded_commands: Vec<String>,
    skip_pattern: Regex,
    error_hook: Option<ErrorHook>,

    // Derived, filled on first access.
    table_matcher: OnceLock<Option<TableMatcher>>,
    substitutions: OnceLock<SubstitutionMap>,
    init_command: OnceLock<String>,
    query_type_matcher: OnceLock<KeywordMatcher>,
    excluded_matcher: OnceLock<KeywordMatcher>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self {
            tables: Vec::new(),
            replacement: TABLE_PLACEHOLDER.to_string(),
            session_variables: SessionVariables::new(),
            query_types: to_strings(DEFAULT_QUERY_TYPES),
            excluded_commands: to_strings(DEFAULT_EXCLUDED_COMMANDS),
            skip_pattern: default_skip_pattern(),
            error_hook: None,
            table_matcher: OnceLock::new(),
            substitutions: OnceLock::new(),
            init_command: OnceLock::new(),
            query_type_matcher: OnceLock::new(),
            excluded_matcher: OnceLock::new(),
        }
    }

    // ------------------------------------------------------------------
    // Setters
    // ------------------------------------------------------------------

    /// Replace the table list.
    ///
    /// Names are de-duplicated case-insensitively (first occurrence wins).
    pub fn set_tables<I, S>(&mut self, tables: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = Vec::new();
        for table in tables {
            let table = table.into();
            if !is_word(&table) {
                return Err(ConfigError::InvalidTableName(table));
            }
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&table)) {
                names.push(table);
            }
        }
        if names == self.tables {
            return Ok(());
        }
        tracing::debug!(tables = names.len(), "Table list changed, resetting matchers");
        self.tables = names;
        self.table_matcher = OnceLock::new();
        self.substitutions = OnceLock::new();
        Ok(())
    }

    /// Set the replacement template, e.g. `my_{table}_view`.
    ///
    /// An empty template resets to the identity template, which disables
    /// rewriting.
    pub fn set_replacement(&mut self, template: impl Into<String>) -> Result<(), ConfigError> {
        let mut template = template.into();
        if template.is_empty() {
            template = TABLE_PLACEHOLDER.to_string();
        }
        if template.matches(TABLE_PLACEHOLDER).count() != 1 {
            return Err(ConfigError::InvalidTemplate(template));
        }
        if template == self.replacement {
            return Ok(());
        }
        tracing::debug!(template = %template, "Replacement template changed");
        self.replacement = template;
        self.substitutions = OnceLock::new();
        Ok(())
    }

    /// Replace the session variables rendered into the init command.
    pub fn set_session_variables(&mut self, variables: SessionVariables) -> Result<(), ConfigError> {
        if let Some(name) = variables.names().find(|n| !is_valid_variable_name(n)) {
            return Err(ConfigError::InvalidVariableName(name.to_string()));
        }
        if variables == self.session_variables {
            return Ok(());
        }
        tracing::debug!(variables = variables.len(), "Session variables changed");
        self.session_variables = variables;
        self.init_command = OnceLock::new();
        Ok(())
    }

    /// Set the leading keywords of statements eligible for rewriting.
    pub fn set_query_types<I, S>(&mut self, types: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let types = validate_keywords(types)?;
        if types == self.query_types {
            return Ok(());
        }
        self.query_types = types;
        self.query_type_matcher = OnceLock::new();
        Ok(())
    }

    /// Set the leading keywords of statements that are never rewritten.
    pub fn set_excluded_commands<I, S>(&mut self, commands: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let commands = validate_keywords(commands)?;
        if commands == self.excluded_commands {
            return Ok(());
        }
        self.excluded_commands = commands;
        self.excluded_matcher = OnceLock::new();
        Ok(())
    }

    /// Set the pattern that disqualifies a statement wherever it matches.
    /// Matching is case-insensitive.
    pub fn set_skip_pattern(&mut self, pattern: &str) -> Result<(), ConfigError> {
        if pattern == self.skip_pattern.as_str() {
            return Ok(());
        }
        self.skip_pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(ConfigError::InvalidSkipPattern)?;
        Ok(())
    }

    /// Install the callback invoked before a fallback retry.
    pub fn set_error_hook<F>(&mut self, hook: F)
    where
        F: Fn(&anyhow::Error) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.error_hook = Some(Arc::new(hook));
    }

    pub fn clear_error_hook(&mut self) {
        self.error_hook = None;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn session_variables(&self) -> &SessionVariables {
        &self.session_variables
    }

    pub fn query_types(&self) -> &[String] {
        &self.query_types
    }

    pub fn excluded_commands(&self) -> &[String] {
        &self.excluded_commands
    }

    pub fn skip_pattern(&self) -> &Regex {
        &self.skip_pattern
    }

    pub fn error_hook(&self) -> Option<&ErrorHook> {
        self.error_hook.as_ref()
    }

    /// Whether the template is the identity template (no rewriting).
    pub fn is_identity_replacement(&self) -> bool {
        self.replacement == TABLE_PLACEHOLDER
    }

    // ------------------------------------------------------------------
    // Derived
    // ------------------------------------------------------------------

    /// The compiled table prefilter, or `None` when there are no tables or
    /// the matcher could not be compiled.
    pub fn table_matcher(&self) -> Option<&TableMatcher> {
        self.table_matcher
            .get_or_init(|| match TableMatcher::new(&self.tables)? {
                Ok(matcher) => {
                    tracing::debug!(pattern = matcher.as_str(), "Compiled table matcher");
                    Some(matcher)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to compile table matcher, scanning every statement");
                    None
                }
            })
            .as_ref()
    }

    /// Lower-cased table name to rendered replacement. Empty for the
    /// identity template.
    pub fn substitutions(&self) -> &SubstitutionMap {
        self.substitutions.get_or_init(|| {
            if self.is_identity_replacement() {
                SubstitutionMap::default()
            } else {
                SubstitutionMap::new(&self.tables, &self.replacement, TABLE_PLACEHOLDER)
            }
        })
    }

    /// `SET @a := 1, ...`, or empty when no session variables are set.
    pub fn init_command(&self) -> &str {
        self.init_command
            .get_or_init(|| self.session_variables.init_command())
    }

    pub fn query_type_matcher(&self) -> &KeywordMatcher {
        self.query_type_matcher
            .get_or_init(|| KeywordMatcher::new(&self.query_types))
    }

    pub fn excluded_matcher(&self) -> &KeywordMatcher {
        self.excluded_matcher
            .get_or_init(|| KeywordMatcher::new(&self.excluded_commands))
    }

    /// Whether the derived caches are currently populated. Exposed for
    /// tests and diagnostics.
    pub fn cache_state(&self) -> CacheState {
        CacheState {
            table_matcher: self.table_matcher.get().is_some(),
            substitutions: self.substitutions.get().is_some(),
            init_command: self.init_command.get().is_some(),
            query_type_matcher: self.query_type_matcher.get().is_some(),
            excluded_matcher: self.excluded_matcher.get().is_some(),
        }
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("tables", &self.tables)
            .field("replacement", &self.replacement)
            .field("session_variables", &self.session_variables)
            .field("query_types", &self.query_types)
            .field("excluded_commands", &self.excluded_commands)
            .field("skip_pattern", &self.skip_pattern.as_str())
            .field("error_hook", &self.error_hook.is_some())
            .finish()
    }
}

/// Which derived caches are populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheState {
    pub table_matcher: bool,
    pub substitutions: bool,
    pub init_command: bool,
    pub query_type_matcher: bool,
    pub excluded_matcher: bool,
}

fn to_strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

static DEFAULT_SKIP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(DEFAULT_SKIP_PATTERN)
        .case_insensitive(true)
        .build()
        .expect("default skip pattern must compile")
});

fn default_skip_pattern() -> Regex {
    DEFAULT_SKIP_REGEX.clone()
}

fn validate_keywords<I, S>(keywords: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keywords
        .into_iter()
        .map(|k| {
            let k = k.into();
            if !k.is_empty() && k.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_') {
                Ok(k)
            } else {
                Err(ConfigError::InvalidQueryType(k))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn configured() -> Configuration {
        let mut config = Configuration::new();
        config.set_tables(["foo"]).unwrap();
        config.set_replacement("user_{table}_view").unwrap();
        config
            .set_session_variables(SessionVariables::new().with("test", 1))
            .unwrap();
        config
    }

    #[test]
    fn test_init_command_empty_without_variables() {
        assert_eq!(Configuration::new().init_command(), "");
    }

    #[test]
    fn test_init_command_renders_variables() {
        let mut config = Configuration::new();
        config
            .set_session_variables(SessionVariables::new().with("foo", 1).with("bar", 2))
            .unwrap();
        assert_eq!(config.init_command(), "SET @foo := 1, @bar := 2");
    }

    #[test]
    fn test_caches_are_lazy() {
        let config = configured();
        assert_eq!(config.cache_state(), CacheState::default());
        config.init_command();
        assert!(config.cache_state().init_command);
        assert!(!config.cache_state().substitutions);
    }

    #[test]
    fn test_changing_variables_resets_init_command() {
        let mut config = configured();
        config.init_command();
        config
            .set_session_variables(SessionVariables::new().with("test", 2))
            .unwrap();
        assert!(!config.cache_state().init_command);
        assert_eq!(config.init_command(), "SET @test := 2");
    }

    #[test]
    fn test_same_variables_keep_cache() {
        let mut config = configured();
        config.init_command();
        config
            .set_session_variables(SessionVariables::new().with("test", 1))
            .unwrap();
        assert!(config.cache_state().init_command);
    }

    #[test]
    fn test_changing_tables_resets_only_table_caches() {
        let mut config = configured();
        config.init_command();
        config.substitutions();
        config.table_matcher();
        config.set_tables(["other"]).unwrap();
        let state = config.cache_state();
        assert!(!state.substitutions);
        assert!(!state.table_matcher);
        assert!(state.init_command);
    }

    #[test]
    fn test_same_tables_keep_cache() {
        let mut config = configured();
        config.substitutions();
        config.set_tables(["foo"]).unwrap();
        assert!(config.cache_state().substitutions);
    }

    #[test]
    fn test_changing_template_resets_substitutions() {
        let mut config = configured();
        config.substitutions();
        config.table_matcher();
        config.set_replacement("{table}").unwrap();
        assert!(!config.cache_state().substitutions);
        assert!(config.cache_state().table_matcher);
        assert!(config.substitutions().is_empty());
    }

    #[test]
    fn test_same_template_keeps_cache() {
        let mut config = configured();
        config.substitutions();
        config.set_replacement("user_{table}_view").unwrap();
        assert!(config.cache_state().substitutions);
    }

    #[test]
    fn test_template_default_and_reset() {
        let mut config = Configuration::new();
        assert_eq!(config.replacement(), "{table}");
        config.set_replacement("v_{table}").unwrap();
        config.set_replacement("").unwrap();
        assert_eq!(config.replacement(), "{table}");
        assert!(config.is_identity_replacement());
    }

    #[test]
    fn test_template_requires_single_placeholder() {
        let mut config = Configuration::new();
        assert!(matches!(
            config.set_replacement("my_view"),
            Err(ConfigError::InvalidTemplate(_))
        ));
        assert!(matches!(
            config.set_replacement("{table}_{table}"),
            Err(ConfigError::InvalidTemplate(_))
        ));
        assert_eq!(config.replacement(), "{table}");
    }

    #[test]
    fn test_substitution_map() {
        let mut config = Configuration::new();
        config.set_tables(["posts", "comments"]).unwrap();
        assert!(config.substitutions().is_empty());

        config.set_replacement("user_{table}_view").unwrap();
        assert_eq!(config.substitutions().get("posts"), Some("user_posts_view"));
        assert_eq!(
            config.substitutions().get("comments"),
            Some("user_comments_view")
        );
        assert_eq!(config.substitutions().len(), 2);
    }

    #[test]
    fn test_tables_are_deduplicated() {
        let mut config = Configuration::new();
        config.set_tables(["posts", "POSTS", "comments"]).unwrap();
        assert_eq!(config.tables(), &["posts".to_string(), "comments".to_string()]);
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let mut config = Configuration::new();
        let err = config.set_tables(["posts", "bad name"]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTableName(name) if name == "bad name"));
        assert!(config.tables().is_empty());
    }

    #[test]
    fn test_invalid_variable_name_rejected() {
        let mut config = Configuration::new();
        let vars = SessionVariables::new().with("ok", 1).with("no way", 2);
        assert!(matches!(
            config.set_session_variables(vars),
            Err(ConfigError::InvalidVariableName(_))
        ));
        assert!(config.session_variables().is_empty());
    }

    #[test]
    fn test_query_types() {
        let mut config = Configuration::new();
        assert!(config.query_type_matcher().matches("SELECT *"));

        config.set_query_types(["UPDATE"]).unwrap();
        assert!(!config.query_type_matcher().matches("SELECT FROM UPDATE"));
        assert!(config.query_type_matcher().matches("UPDATE *"));

        assert!(matches!(
            config.set_query_types(["SELECT *"]),
            Err(ConfigError::InvalidQueryType(_))
        ));
    }

    #[test]
    fn test_skip_pattern() {
        let mut config = Configuration::new();
        assert!(config.skip_pattern().is_match("SELECT * FROM t use index (i)"));
        assert!(config.skip_pattern().is_match("SELECT * FROM t FORCE  KEY (i)"));
        assert!(!config.skip_pattern().is_match("SELECT * FROM t"));

        config.set_skip_pattern("straight_join").unwrap();
        assert!(config.skip_pattern().is_match("SELECT STRAIGHT_JOIN a FROM t"));
        assert!(matches!(
            config.set_skip_pattern("("),
            Err(ConfigError::InvalidSkipPattern(_))
        ));
    }

    #[test]
    fn test_default_skip_pattern_compiles() {
        let pattern = RegexBuilder::new(DEFAULT_SKIP_PATTERN)
            .case_insensitive(true)
            .build();
        assert!(pattern.is_ok());
        assert_eq!(Configuration::new().skip_pattern().as_str(), DEFAULT_SKIP_PATTERN);
        assert!(Configuration::new().skip_pattern().is_match("FROM t ignore index (i)"));
    }

    #[test]
    fn test_error_hook() {
        let mut config = Configuration::new();
        assert!(config.error_hook().is_none());

        config.set_error_hook(|error| Err(anyhow::anyhow!("hooked: {error}")));
        let hook = config.error_hook().unwrap();
        let result = hook(&anyhow::anyhow!("MyError"));
        assert_eq!(result.unwrap_err().to_string(), "hooked: MyError");

        config.clear_error_hook();
        assert!(config.error_hook().is_none());
    }

    #[test]
    fn test_table_matcher() {
        let mut config = Configuration::new();
        assert!(config.table_matcher().is_none());
        config.set_tables(["posts"]).unwrap();
        assert!(config.table_matcher().unwrap().is_match("FROM posts"));
    }
}
