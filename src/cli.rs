use std::{path::PathBuf, time::Duration};

use clap::{Parser, ValueEnum};

use crate::{
    load::{BatchedInsert, BulkCopy, DEFAULT_BATCH_SIZE, LoadStrategy},
    session::ConnectionParams,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load a retail transactions CSV into the PostgreSQL 'registros' table",
    long_about = None
)]
pub struct Cli {
    /// CSV file to load
    pub file: PathBuf,
    /// PostgreSQL host
    #[arg(long, env = "PGHOST", default_value = "localhost")]
    pub host: String,
    /// PostgreSQL port
    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    pub port: u16,
    /// PostgreSQL database name
    #[arg(long, env = "PGDATABASE", required_unless_present = "dry_run")]
    pub database: Option<String>,
    /// PostgreSQL username
    #[arg(long, env = "PGUSER", required_unless_present = "dry_run")]
    pub user: Option<String>,
    /// PostgreSQL password
    #[arg(
        long,
        env = "PGPASSWORD",
        hide_env_values = true,
        required_unless_present = "dry_run"
    )]
    pub password: Option<String>,
    /// Seconds to wait for the database connection before giving up
    #[arg(long = "connect-timeout")]
    pub connect_timeout: Option<u64>,
    /// How rows are written to the table
    #[arg(long, value_enum, default_value_t = StrategyKind::Copy)]
    pub strategy: StrategyKind,
    /// Rows per INSERT statement when --strategy insert is used
    #[arg(long = "batch-size", default_value_t = DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
    /// CSV delimiter character for reading input (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter, default_value = ",")]
    pub delimiter: u8,
    /// Character encoding of the input file (defaults to utf-8 with windows-1252 fallback)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Transform the file and print a preview without touching the database
    #[arg(long = "dry-run")]
    pub dry_run: bool,
    /// Number of rows shown by --dry-run
    #[arg(long = "preview-rows", default_value_t = 10)]
    pub preview_rows: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Single COPY ... FROM STDIN stream
    Copy,
    /// Parameterized multi-row INSERT statements
    Insert,
}

impl Cli {
    pub fn strategy(&self) -> Box<dyn LoadStrategy> {
        match self.strategy {
            StrategyKind::Copy => Box::new(BulkCopy),
            StrategyKind::Insert => Box::new(BatchedInsert::new(self.batch_size)),
        }
    }

    /// Connection parameters, or `None` when a required one is absent
    /// (only possible with `--dry-run`).
    pub fn connection_params(&self) -> Option<ConnectionParams> {
        Some(ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone()?,
            user: self.user.clone()?,
            password: self.password.clone()?,
            connect_timeout: self.connect_timeout.map(Duration::from_secs),
        })
    }
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
