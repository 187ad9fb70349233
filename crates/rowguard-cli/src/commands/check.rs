//! `rowguard check` command implementation.
//!
//! Loads a configuration file, runs it through the validating setters and
//! reports what it derives: table redirections, the init command and
//! settings under which no statement would ever be rewritten.

use anyhow::Result;
use rowguard_core::{Configuration, RowGuardConfig};
use std::fmt;
use std::path::Path;

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Configuration key the finding refers to.
    pub key: &'static str,
    pub message: String,
}

impl CheckFinding {
    fn error(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            key,
            message: message.into(),
        }
    }

    fn warning(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            key,
            message: message.into(),
        }
    }
}

/// Outcome of checking one configuration file.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
    /// Present when the file loaded and validated.
    pub configuration: Option<Configuration>,
}

impl CheckResults {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Error)
            .count()
    }

    pub fn print_summary(&self) {
        if let Some(config) = &self.configuration {
            println!("Tables: {}", config.tables().join(", "));
            println!("Replacement: {}", config.replacement());
            let mut substitutions: Vec<_> = config.substitutions().iter().collect();
            substitutions.sort();
            for (table, replacement) in substitutions {
                println!("  {table} -> {replacement}");
            }
            if config.init_command().is_empty() {
                println!("Init command: (none)");
            } else {
                println!("Init command: {}", config.init_command());
            }
            println!("Query types: {}", config.query_type_matcher().keywords().join(", "));
            println!(
                "Excluded commands: {}",
                config.excluded_matcher().keywords().join(", ")
            );
            println!("Skip pattern: {}", config.skip_pattern().as_str());
        }

        let mut findings: Vec<_> = self.findings.iter().collect();
        findings.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.key.cmp(b.key)));
        if !findings.is_empty() {
            println!();
        }
        for finding in findings {
            println!("  {} [{}]: {}", finding.severity, finding.key, finding.message);
        }
    }
}

/// Check a configuration file without printing anything.
pub fn check_file(config_path: &Path) -> CheckResults {
    let mut results = CheckResults::default();

    let file = match RowGuardConfig::from_file(config_path) {
        Ok(file) => file,
        Err(e) => {
            results
                .findings
                .push(CheckFinding::error("file", format!("{}: {e}", config_path.display())));
            return results;
        }
    };

    if !file.enabled {
        results
            .findings
            .push(CheckFinding::warning("enabled", "fortification is disabled"));
    }

    match file.into_configuration() {
        Ok(config) => {
            results.findings.extend(check_configuration(&config));
            results.configuration = Some(config);
        }
        Err(e) => results.findings.push(CheckFinding::error("config", e.to_string())),
    }
    results
}

/// Settings that validate but make every statement pass through unchanged.
fn check_configuration(config: &Configuration) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    if config.tables().is_empty() {
        findings.push(CheckFinding::warning("tables", "no tables configured"));
    }
    if config.is_identity_replacement() {
        findings.push(CheckFinding::warning(
            "replacement",
            "identity template, table names are never replaced",
        ));
    }
    if config.session_variables().is_empty() {
        findings.push(CheckFinding::warning(
            "variables",
            "no session variables, statements are never rewritten",
        ));
    }
    findings
}

pub fn run(config_path: &Path) -> Result<()> {
    let results = check_file(config_path);
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Configuration check failed with {} error(s)",
            results.error_count()
        );
    }
    Ok(())
}
