use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "rowguard", version, about = "Rowguard SQL fortifier")]
struct Cli {
    /// Log filter (e.g. "debug", "rowguard_rewrite=trace"). Overrides RUST_LOG.
    #[arg(long, global = true, env = "ROWGUARD_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fortify a statement with the given configuration file.
    Fortify {
        /// Path to rowguard.yaml
        #[arg(long, short = 'c')]
        config: PathBuf,

        /// Print a JSON object instead of the plain statement
        #[arg(long, default_value_t = false)]
        json: bool,

        /// SQL statement. Read from stdin when omitted.
        sql: Option<String>,
    },

    /// Replace literals in a statement with `?`.
    Anonymize {
        /// SQL statement. Read from stdin when omitted.
        sql: Option<String>,
    },

    /// Print the scanner spans of a statement, one per line.
    Scan {
        /// SQL statement. Read from stdin when omitted.
        sql: Option<String>,
    },

    /// Validate a configuration file and show what it derives.
    Check {
        /// Path to rowguard.yaml
        #[arg(long, short = 'c')]
        config: PathBuf,
    },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match cli.cmd {
        Command::Fortify { config, json, sql } => {
            commands::fortify::run(&config, json, sql)?
        }
        Command::Anonymize { sql } => commands::anonymize::run(sql)?,
        Command::Scan { sql } => commands::scan::run(sql)?,
        Command::Check { config } => commands::check::run(&config)?,
    }

    Ok(())
}
