//! `rowguard fortify` command implementation.

use anyhow::{Context, Result};
use rowguard_core::{Configuration, RowGuardConfig};
use rowguard_rewrite::{Sql, fortify};
use serde::Serialize;
use std::path::Path;

use super::read_sql;

/// JSON rendering of a fortified statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FortifyOutput {
    pub sql: String,
    pub original: Option<String>,
    pub changed: bool,
    pub stamped: bool,
}

impl From<Sql> for FortifyOutput {
    fn from(sql: Sql) -> Self {
        Self {
            original: sql.original().map(str::to_string),
            changed: sql.is_changed(),
            stamped: sql.is_stamped(),
            sql: sql.into_string(),
        }
    }
}

/// Fortify `sql`, or pass it through untouched when the configuration is
/// disabled.
pub fn fortify_statement(config: &Configuration, enabled: bool, sql: &str) -> Sql {
    if !enabled {
        tracing::debug!("Fortification disabled by configuration");
        return Sql::from(sql);
    }
    fortify(sql, config, |init_command| {
        tracing::debug!(init_command, "Statement will be rewritten")
    })
}

pub fn run(config_path: &Path, json: bool, sql: Option<String>) -> Result<()> {
    let file = RowGuardConfig::from_file(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let enabled = file.enabled;
    let config = file
        .into_configuration()
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    let sql = read_sql(sql)?;
    let fortified = fortify_statement(&config, enabled, &sql);

    if json {
        let output = FortifyOutput::from(fortified);
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{fortified}");
    }
    Ok(())
}
