//! Input reading for the ReadFile stage.
//!
//! The input is parsed as raw bytes so that a stray latin-1 byte in one
//! description does not abort a whole run. Fields are decoded through
//! [`FieldDecoder`], which either applies an explicitly requested encoding or
//! tries UTF-8 first and falls back to windows-1252.

use std::{
    borrow::Cow,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Result as AnyResult, anyhow};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use log::warn;

use crate::{
    error::{Error, Result},
    mapping::RawTable,
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';

/// Resolves a WHATWG encoding label; `None` means UTF-8 with fallback.
pub fn resolve_encoding(label: Option<&str>) -> AnyResult<Option<&'static Encoding>> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .map(Some)
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(None),
    }
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

/// Decodes CSV fields without ever failing.
#[derive(Debug, Clone, Copy)]
pub struct FieldDecoder {
    explicit: Option<&'static Encoding>,
    fallbacks: usize,
}

impl FieldDecoder {
    pub fn new(explicit: Option<&'static Encoding>) -> Self {
        Self {
            explicit,
            fallbacks: 0,
        }
    }

    pub fn decode<'a>(&mut self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.explicit {
            Some(encoding) => {
                let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
                if had_errors {
                    self.fallbacks += 1;
                }
                text
            }
            None => match std::str::from_utf8(bytes) {
                Ok(text) => Cow::Borrowed(text),
                Err(_) => {
                    self.fallbacks += 1;
                    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
                    text
                }
            },
        }
    }

    pub fn decode_record(&mut self, record: &csv::ByteRecord) -> Vec<String> {
        record
            .iter()
            .map(|field| self.decode(field).into_owned())
            .collect()
    }

    /// Number of fields that were not clean in the expected encoding.
    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    fn label(&self) -> &'static str {
        self.explicit.unwrap_or(UTF_8).name()
    }
}

/// Reads the whole file into memory: header row plus every data row.
pub fn read_raw_table(
    path: &Path,
    delimiter: u8,
    encoding: Option<&'static Encoding>,
) -> Result<RawTable> {
    let file_error = |reason: csv::Error| Error::FileRead {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|err| file_error(err.into()))?;
    let mut reader = open_csv_reader(BufReader::new(file), delimiter);
    let mut decoder = FieldDecoder::new(encoding);

    let mut headers = decoder.decode_record(reader.byte_headers().map_err(file_error)?);
    if let Some(first) = headers.first_mut()
        && let Some(stripped) = first.strip_prefix('\u{feff}')
    {
        *first = stripped.to_string();
    }

    let mut rows = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record).map_err(file_error)? {
        rows.push(decoder.decode_record(&record));
    }

    if decoder.fallbacks() > 0 {
        warn!(
            "{} field(s) in {:?} were not valid {}; decoded permissively",
            decoder.fallbacks(),
            path,
            decoder.label()
        );
    }
    Ok(RawTable::new(headers, rows))
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
