//! Run orchestration: read, clean, coerce, derive, then replace the table.
//!
//! [`Pipeline::prepare`] covers the file-only stages and never touches the
//! database; [`Pipeline::publish`] resets the table and loads within an open
//! session. [`Pipeline::run`] chains both inside [`with_session`]. The first
//! failing stage ends the run; nothing is retried.

use std::{
    path::Path,
    time::{Duration, Instant},
};

use encoding_rs::Encoding;
use log::{debug, info};

use crate::{
    coerce::strip_commas_from_text_columns,
    error::{PipelineFailure, Result, Stage},
    io_utils::{self, DEFAULT_CSV_DELIMITER},
    load::LoadStrategy,
    record::{Registro, coerce_rows, derive_periods},
    schema::{TABLE_NAME, reset_table},
    session::{ConnectionParams, Session, with_session},
};

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub rows_read: usize,
    pub rows_loaded: u64,
    pub strategy: &'static str,
    pub elapsed: Duration,
}

pub struct Pipeline {
    strategy: Box<dyn LoadStrategy>,
    delimiter: u8,
    encoding: Option<&'static Encoding>,
}

fn timed<T>(stage: Stage, step: impl FnOnce() -> Result<T>) -> Result<T, PipelineFailure> {
    let started = Instant::now();
    let outcome = step().map_err(|source| PipelineFailure::new(stage, source));
    debug!(
        "Stage '{stage}' finished in {:.3}s",
        started.elapsed().as_secs_f64()
    );
    outcome
}

impl Pipeline {
    pub fn new(strategy: Box<dyn LoadStrategy>) -> Self {
        Self {
            strategy,
            delimiter: DEFAULT_CSV_DELIMITER,
            encoding: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_encoding(mut self, encoding: Option<&'static Encoding>) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Reads `path` and produces the rows to load.
    pub fn prepare(&self, path: &Path) -> Result<Vec<Registro>, PipelineFailure> {
        info!(
            "Reading '{}' (delimiter '{}')",
            path.display(),
            io_utils::printable_delimiter(self.delimiter)
        );
        let raw = timed(Stage::ReadFile, || {
            io_utils::read_raw_table(path, self.delimiter, self.encoding)
        })?;
        info!("Read {} row(s) with columns {:?}", raw.len(), raw.headers);

        let cleaned = timed(Stage::Clean, || {
            Ok(strip_commas_from_text_columns(raw.renamed()))
        })?;
        debug!("Renamed columns: {:?}", cleaned.headers);

        let lines = timed(Stage::CoerceTypes, || coerce_rows(&cleaned))?;
        let records = timed(Stage::DeriveColumns, || Ok(derive_periods(lines)))?;
        Ok(records)
    }

    /// Replaces the destination table's contents with `records`.
    pub fn publish(
        &self,
        session: &mut dyn Session,
        records: &[Registro],
    ) -> Result<u64, PipelineFailure> {
        timed(Stage::ResetTable, || reset_table(session))?;
        let loaded = timed(Stage::Load, || self.strategy.load(session, records))?;
        info!(
            "Loaded {loaded} row(s) into '{TABLE_NAME}' using {}",
            self.strategy.name()
        );
        Ok(loaded)
    }

    pub fn run(
        &self,
        path: &Path,
        params: &ConnectionParams,
    ) -> Result<LoadReport, PipelineFailure> {
        let started = Instant::now();
        let records = self.prepare(path)?;
        let rows_loaded = with_session(params, |session| self.publish(session, &records))?;
        let report = LoadReport {
            rows_read: records.len(),
            rows_loaded,
            strategy: self.strategy.name(),
            elapsed: started.elapsed(),
        };
        info!(
            "Data from '{}' saved to PostgreSQL in {:.2} seconds",
            path.display(),
            report.elapsed.as_secs_f64()
        );
        Ok(report)
    }
}
