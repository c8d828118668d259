//! Source-to-destination column renaming.
//!
//! The input file uses the retailer's English headers; the destination table
//! uses Spanish column names. Renaming is total over [`COLUMN_MAPPING`] and
//! leaves any other header untouched.

use crate::error::{Error, Result};

/// Fixed rename table, `(source header, destination column)`.
pub const COLUMN_MAPPING: &[(&str, &str)] = &[
    ("InvoiceNo", "numero_factura"),
    ("Age", "edad"),
    ("City", "ciudad"),
    ("Country", "pais"),
    ("UnitPrice", "precio_unitario"),
    ("StockCode", "codigo"),
    ("Description", "descripcion"),
    ("Quantity", "cantidad"),
    ("InvoiceDate", "fecha_factura"),
    ("CustomerID", "id_cliente"),
];

pub fn target_name(source: &str) -> Option<&'static str> {
    COLUMN_MAPPING
        .iter()
        .find(|(from, _)| *from == source)
        .map(|(_, to)| *to)
}

/// Renames every recognised header in place; order is preserved.
pub fn rename_headers(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            target_name(header)
                .map(str::to_string)
                .unwrap_or_else(|| header.clone())
        })
        .collect()
}

/// All-text record set as read from the input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    pub fn renamed(self) -> Self {
        Self {
            headers: rename_headers(&self.headers),
            rows: self.rows,
        }
    }
}
