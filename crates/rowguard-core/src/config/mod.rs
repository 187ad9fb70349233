//! Configuration file for rowguard.
//!
//! A `rowguard.yaml` file describes which tables are redirected, the
//! replacement template and the session variables the replacement views
//! read. It is loaded into a [`RowGuardConfig`] and turned into a validated
//! [`Configuration`] with [`RowGuardConfig::into_configuration`].
//!
//! ```yaml
//! tables: [posts, comments]
//! replacement: "my_{table}_view"
//! variables:
//!   tenant_id: 42
//! ```

pub mod variables;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::configuration::{
    Configuration, DEFAULT_EXCLUDED_COMMANDS, DEFAULT_QUERY_TYPES, DEFAULT_SKIP_PATTERN,
    TABLE_PLACEHOLDER,
};
pub use variables::{SessionValue, SessionVariables};

/// Rowguard configuration as written in a YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RowGuardConfig {
    /// Whether fortification is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tables redirected to their replacement.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Replacement template containing `{table}` once.
    #[serde(default = "default_replacement")]
    pub replacement: String,

    /// Session variables, rendered in order into the init command.
    #[serde(default)]
    pub variables: SessionVariables,

    /// Leading keywords of statements eligible for rewriting.
    #[serde(default = "default_query_types")]
    pub query_types: Vec<String>,

    /// Leading keywords of statements never rewritten.
    #[serde(default = "default_excluded_commands")]
    pub excluded_commands: Vec<String>,

    /// Case-insensitive pattern disqualifying a statement.
    #[serde(default = "default_skip_pattern")]
    pub skip_pattern: String,
}

impl Default for RowGuardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tables: Vec::new(),
            replacement: default_replacement(),
            variables: SessionVariables::new(),
            query_types: default_query_types(),
            excluded_commands: default_excluded_commands(),
            skip_pattern: default_skip_pattern(),
        }
    }
}

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid table name '{0}': only letters, digits and '_' are allowed")]
    InvalidTableName(String),

    #[error("replacement template '{0}' must be empty or include \"{{table}}\" exactly once")]
    InvalidTemplate(String),

    #[error("invalid session variable name '{0}'")]
    InvalidVariableName(String),

    #[error("invalid statement keyword '{0}'")]
    InvalidQueryType(String),

    #[error("invalid skip pattern: {0}")]
    InvalidSkipPattern(#[source] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl RowGuardConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Validate every field and build the runtime configuration.
    pub fn into_configuration(self) -> Result<Configuration, ConfigError> {
        let mut configuration = Configuration::new();
        configuration.set_tables(self.tables)?;
        configuration.set_replacement(self.replacement)?;
        configuration.set_session_variables(self.variables)?;
        if self.query_types.is_empty() {
            return Err(ConfigError::Config(
                "query_types must list at least one statement keyword".to_string(),
            ));
        }
        configuration.set_query_types(self.query_types)?;
        configuration.set_excluded_commands(self.excluded_commands)?;
        configuration.set_skip_pattern(&self.skip_pattern)?;
        Ok(configuration)
    }

    /// Load a file and build the runtime configuration in one step.
    pub fn load(path: impl AsRef<Path>) -> Result<Configuration, ConfigError> {
        Self::from_file(path)?.into_configuration()
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_replacement() -> String {
    TABLE_PLACEHOLDER.to_string()
}

fn default_query_types() -> Vec<String> {
    DEFAULT_QUERY_TYPES.iter().map(|s| s.to_string()).collect()
}

fn default_excluded_commands() -> Vec<String> {
    DEFAULT_EXCLUDED_COMMANDS.iter().map(|s| s.to_string()).collect()
}

fn default_skip_pattern() -> String {
    DEFAULT_SKIP_PATTERN.to_string()
}
