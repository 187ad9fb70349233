//! CLI command implementations for rowguard.

pub mod anonymize;
pub mod check;
pub mod fortify;
pub mod scan;

use anyhow::{Context, Result};
use std::io::Read;

/// Use the SQL argument when given, otherwise read all of stdin.
pub fn read_sql(sql: Option<String>) -> Result<String> {
    match sql {
        Some(sql) => Ok(sql),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read SQL from stdin")?;
            Ok(buf.trim_end_matches(['\n', '\r']).to_string())
        }
    }
}
