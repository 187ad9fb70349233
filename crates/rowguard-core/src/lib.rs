//! # rowguard-core
//!
//! Configuration model for rowguard, the SQL fortifier that redirects
//! table references to row-filtered views.
//!
//! A [`Configuration`] holds:
//! - the tables to redirect and the replacement template (`my_{table}_view`)
//! - the session variables the views depend on, rendered as an init command
//! - the statement filters deciding which statements are rewritten
//!
//! Derived matchers are computed lazily and reset when their inputs change.

pub mod config;
pub mod configuration;
pub mod matcher;

pub use config::{ConfigError, RowGuardConfig, SessionValue, SessionVariables};
pub use configuration::{
    CacheState, Configuration, DEFAULT_EXCLUDED_COMMANDS, DEFAULT_QUERY_TYPES,
    DEFAULT_SKIP_PATTERN, ErrorHook, TABLE_PLACEHOLDER,
};
pub use matcher::{KeywordMatcher, SubstitutionMap, TableMatcher, is_word_byte};
