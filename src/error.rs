//! Error taxonomy for the load pipeline.
//!
//! Every failure aborts the run at the stage where it happened. Leaf helpers
//! in [`crate::coerce`] raise [`TypeConversionError`] / [`DateParseError`];
//! the record stage attaches the column and file line, and the orchestrator
//! wraps the result in a [`PipelineFailure`] naming the [`Stage`].

use std::{fmt, io, path::PathBuf};

use thiserror::Error;

/// A value that could not be converted to the numeric type its column needs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert '{value}' to {expected}")]
pub struct TypeConversionError {
    pub value: String,
    pub expected: &'static str,
}

impl TypeConversionError {
    pub(crate) fn new(value: &str, expected: &'static str) -> Self {
        Self {
            value: value.to_string(),
            expected,
        }
    }
}

/// A value that none of the accepted date layouts could parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse '{value}' as a date")]
pub struct DateParseError {
    pub value: String,
}

/// Failure reported by the database while executing statements or a COPY stream.
#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Postgres(#[from] postgres::Error),
    #[error("copy stream failed")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    /// `reason` is rendered inline and kept out of the source chain: a csv
    /// I/O error already prints its inner `io::Error`.
    #[error("cannot read '{path}': {reason}")]
    FileRead { path: PathBuf, reason: csv::Error },

    #[error("required column '{column}' is missing from the input")]
    MissingColumn { column: String },

    #[error("column '{column}', line {line}")]
    TypeConversion {
        column: String,
        line: u64,
        #[source]
        source: TypeConversionError,
    },

    #[error("column '{column}', line {line}")]
    DateParse {
        column: String,
        line: u64,
        #[source]
        source: DateParseError,
    },

    #[error("cannot connect to {host}:{port}/{database}")]
    Connection {
        host: String,
        port: u16,
        database: String,
        #[source]
        source: postgres::Error,
    },

    #[error("table '{table}' rejected")]
    Schema {
        table: &'static str,
        #[source]
        source: DbError,
    },

    #[error("{strategy} load rejected")]
    Load {
        strategy: &'static str,
        #[source]
        source: DbError,
    },

    #[error("{strategy} load wrote {written} of {expected} row(s)")]
    LoadIncomplete {
        strategy: &'static str,
        expected: u64,
        written: u64,
    },

    #[error("commit failed")]
    Commit(#[source] postgres::Error),
}

/// Steps of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReadFile,
    Clean,
    CoerceTypes,
    DeriveColumns,
    OpenSession,
    ResetTable,
    Load,
    Commit,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::ReadFile => "read-file",
            Stage::Clean => "clean",
            Stage::CoerceTypes => "coerce-types",
            Stage::DeriveColumns => "derive-columns",
            Stage::OpenSession => "open-session",
            Stage::ResetTable => "reset-table",
            Stage::Load => "load",
            Stage::Commit => "commit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal `Failed` state of a run: the stage that aborted it and why.
#[derive(Debug, Error)]
#[error("{stage} failed")]
pub struct PipelineFailure {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl PipelineFailure {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
