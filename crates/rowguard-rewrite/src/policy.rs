//! Eligibility checks run before a statement is scanned.
//!
//! The policy is evaluated from the [`Configuration`] on every call. The
//! configuration may change between two statements, so nothing here is
//! cached.

use rowguard_core::Configuration;
use std::fmt;

/// Why a statement is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// No session variables are configured.
    NoSessionVariables,
    /// The leading keyword is an excluded command such as `SHOW`.
    ExcludedCommand,
    /// The leading keyword is not in the query-type allow-list.
    QueryTypeNotAllowed,
    /// The statement matches the skip pattern (index hints by default).
    SkipPattern,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::NoSessionVariables => "no_session_variables",
            SkipReason::ExcludedCommand => "excluded_command",
            SkipReason::QueryTypeNotAllowed => "query_type_not_allowed",
            SkipReason::SkipPattern => "skip_pattern",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`RewritePolicy::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Eligible,
    Skip(SkipReason),
}

impl Verdict {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Verdict::Eligible)
    }
}

/// Decides whether a statement may be rewritten.
#[derive(Debug, Clone, Copy)]
pub struct RewritePolicy<'c> {
    config: &'c Configuration,
}

impl<'c> RewritePolicy<'c> {
    pub fn new(config: &'c Configuration) -> Self {
        Self { config }
    }

    /// Evaluate `sql`. The keyword checks only inspect the first word of the
    /// statement.
    pub fn evaluate(&self, sql: &str) -> Verdict {
        if self.config.init_command().is_empty() {
            return Verdict::Skip(SkipReason::NoSessionVariables);
        }
        if self.config.excluded_matcher().matches(sql) {
            return Verdict::Skip(SkipReason::ExcludedCommand);
        }
        if !self.config.query_type_matcher().matches(sql) {
            return Verdict::Skip(SkipReason::QueryTypeNotAllowed);
        }
        if self.config.skip_pattern().is_match(sql) {
            return Verdict::Skip(SkipReason::SkipPattern);
        }
        Verdict::Eligible
    }

    pub fn is_eligible(&self, sql: &str) -> bool {
        self.evaluate(sql).is_eligible()
    }
}

/// Shorthand for `RewritePolicy::new(config).evaluate(sql)`.
pub fn evaluate(sql: &str, config: &Configuration) -> Verdict {
    RewritePolicy::new(config).evaluate(sql)
}
