//! `rowguard anonymize` command implementation.

use anyhow::Result;
use rowguard_rewrite::anonymize;

use super::read_sql;

pub fn run(sql: Option<String>) -> Result<()> {
    let sql = read_sql(sql)?;
    println!("{}", anonymize(&sql));
    Ok(())
}
