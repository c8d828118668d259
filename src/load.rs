//! Strategies for writing transformed rows into the destination table.
//!
//! [`BulkCopy`] submits the whole record set as one CSV `COPY` stream;
//! [`BatchedInsert`] sends parameterized multi-row `INSERT`s. Both run inside
//! the caller's transaction, so a rejected row aborts the whole load.

use csv::{QuoteStyle, WriterBuilder};
use itertools::Itertools;
use log::debug;
use postgres::types::ToSql;

use crate::{
    error::{DbError, Error, Result},
    record::Registro,
    schema::{COLUMNS, TABLE_NAME, column_list},
    session::Session,
};

/// Postgres accepts at most this many bind parameters per statement.
pub const MAX_BIND_PARAMETERS: usize = u16::MAX as usize;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub trait LoadStrategy {
    fn name(&self) -> &'static str;

    /// Writes every record once and returns the number of rows written.
    fn load(&self, session: &mut dyn Session, records: &[Registro]) -> Result<u64>;
}

fn ensure_complete(strategy: &'static str, expected: usize, written: u64) -> Result<u64> {
    if written != expected as u64 {
        return Err(Error::LoadIncomplete {
            strategy,
            expected: expected as u64,
            written,
        });
    }
    Ok(written)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BulkCopy;

impl BulkCopy {
    pub fn statement() -> String {
        format!(
            "COPY {TABLE_NAME} ({}) FROM STDIN WITH (FORMAT csv)",
            column_list()
        )
    }
}

/// Serializes records as headerless CSV in table column order.
///
/// Every field is quoted so that an empty description stays an empty string
/// instead of being read back as NULL.
pub fn copy_payload(records: &[Registro]) -> std::result::Result<Vec<u8>, csv::Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Always)
        .double_quote(true)
        .from_writer(Vec::with_capacity(records.len() * 96));
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

impl LoadStrategy for BulkCopy {
    fn name(&self) -> &'static str {
        "copy"
    }

    fn load(&self, session: &mut dyn Session, records: &[Registro]) -> Result<u64> {
        let payload = copy_payload(records).map_err(|err| Error::Load {
            strategy: self.name(),
            source: DbError::Io(err.into()),
        })?;
        debug!(
            "Submitting {} byte(s) of COPY data for {} row(s)",
            payload.len(),
            records.len()
        );
        let written = session
            .copy_in(&Self::statement(), &payload)
            .map_err(|source| Error::Load {
                strategy: self.name(),
                source,
            })?;
        ensure_complete(self.name(), records.len(), written)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchedInsert {
    batch_size: usize,
}

impl BatchedInsert {
    /// Clamps `batch_size` to `1..=` the largest batch that fits the bind
    /// parameter limit.
    pub fn new(batch_size: usize) -> Self {
        let max_rows = MAX_BIND_PARAMETERS / COLUMNS.len();
        Self {
            batch_size: batch_size.clamp(1, max_rows),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn statement(rows: usize) -> String {
        let width = COLUMNS.len();
        let values = (0..rows)
            .map(|row| {
                let placeholders = (1..=width)
                    .map(|col| format!("${}", row * width + col))
                    .join(", ");
                format!("({placeholders})")
            })
            .join(", ");
        format!("INSERT INTO {TABLE_NAME} ({}) VALUES {values}", column_list())
    }
}

impl Default for BatchedInsert {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

/// Bind values for one record, in table column order.
pub fn insert_params(record: &Registro) -> [&(dyn ToSql + Sync); 9] {
    [
        &record.numero_factura,
        &record.codigo,
        &record.descripcion,
        &record.cantidad,
        &record.fecha_factura,
        &record.precio_unitario,
        &record.id_cliente,
        &record.pais,
        &record.mes,
    ]
}

impl LoadStrategy for BatchedInsert {
    fn name(&self) -> &'static str {
        "insert"
    }

    fn load(&self, session: &mut dyn Session, records: &[Registro]) -> Result<u64> {
        let mut written = 0u64;
        for chunk in records.chunks(self.batch_size) {
            let statement = Self::statement(chunk.len());
            let params = chunk.iter().flat_map(insert_params).collect::<Vec<_>>();
            written += session
                .execute(&statement, &params)
                .map_err(|source| Error::Load {
                    strategy: self.name(),
                    source,
                })?;
        }
        debug!(
            "Inserted {} row(s) in batches of {}",
            written, self.batch_size
        );
        ensure_complete(self.name(), records.len(), written)
    }
}
