#![allow(dead_code)]

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use postgres::types::ToSql;
use retail_load::error::DbError;
use retail_load::session::Session;
use tempfile::{TempDir, tempdir};

pub const RETAIL_HEADER: &str =
    "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country";

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Writes a retail CSV with the standard header followed by `rows`.
    pub fn retail_csv(&self, name: &str, rows: &[&str]) -> PathBuf {
        let mut contents = String::from(RETAIL_HEADER);
        contents.push('\n');
        for row in rows {
            contents.push_str(row);
            contents.push('\n');
        }
        self.write(name, &contents)
    }
}

/// In-memory [`Session`] that records what a load would send to Postgres.
#[derive(Debug, Default)]
pub struct RecordingSession {
    pub batches: Vec<String>,
    pub executed: Vec<(String, Vec<String>)>,
    pub copies: Vec<(String, Vec<u8>)>,
    /// Any statement containing this text is rejected.
    pub reject: Option<String>,
    /// Row count reported by `copy_in` instead of the real one.
    pub copy_rows: Option<u64>,
}

impl RecordingSession {
    pub fn rejecting(fragment: &str) -> Self {
        Self {
            reject: Some(fragment.to_string()),
            ..Self::default()
        }
    }

    fn check(&self, sql: &str) -> Result<(), DbError> {
        match &self.reject {
            Some(fragment) if sql.contains(fragment.as_str()) => Err(DbError::Io(
                io::Error::other(format!("rejected statement containing '{fragment}'")),
            )),
            _ => Ok(()),
        }
    }

    /// Rows submitted through COPY, parsed back as CSV.
    pub fn copied_rows(&self) -> Vec<Vec<String>> {
        self.copies
            .iter()
            .flat_map(|(_, payload)| parse_payload(payload))
            .collect()
    }
}

fn parse_payload(payload: &[u8]) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(payload)
        .records()
        .map(|record| {
            record
                .expect("valid copy payload")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect()
}

impl Session for RecordingSession {
    fn batch_execute(&mut self, sql: &str) -> Result<(), DbError> {
        self.check(sql)?;
        self.batches.push(sql.to_string());
        Ok(())
    }

    fn execute(&mut self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64, DbError> {
        self.check(sql)?;
        let rendered = params.iter().map(|p| format!("{p:?}")).collect();
        self.executed.push((sql.to_string(), rendered));
        Ok((params.len() / 9) as u64)
    }

    fn copy_in(&mut self, sql: &str, payload: &[u8]) -> Result<u64, DbError> {
        self.check(sql)?;
        self.copies.push((sql.to_string(), payload.to_vec()));
        let rows = parse_payload(payload).len() as u64;
        Ok(self.copy_rows.unwrap_or(rows))
    }
}
