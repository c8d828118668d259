//! Destination table definition and its drop-and-recreate lifecycle.
//!
//! [`COLUMNS`] is authoritative for column order: the COPY path binds
//! positionally, so the serialized field order of [`crate::record::Registro`]
//! must match it.

use itertools::Itertools;
use log::info;

use crate::{
    error::{Error, Result},
    session::Session,
};

pub const TABLE_NAME: &str = "registros";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Float,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub kind: ColumnKind,
}

const fn column(name: &'static str, sql_type: &'static str, kind: ColumnKind) -> ColumnDef {
    ColumnDef {
        name,
        sql_type,
        kind,
    }
}

pub const COLUMNS: [ColumnDef; 9] = [
    column("numero_factura", "VARCHAR(255)", ColumnKind::Text),
    column("codigo", "VARCHAR(255)", ColumnKind::Text),
    column("descripcion", "TEXT", ColumnKind::Text),
    column("cantidad", "INT", ColumnKind::Integer),
    column("fecha_factura", "DATE", ColumnKind::Date),
    column("precio_unitario", "FLOAT", ColumnKind::Float),
    column("id_cliente", "INT", ColumnKind::Integer),
    column("pais", "VARCHAR(255)", ColumnKind::Text),
    column("mes", "VARCHAR(255)", ColumnKind::Text),
];

pub fn column_kind(name: &str) -> Option<ColumnKind> {
    COLUMNS.iter().find(|c| c.name == name).map(|c| c.kind)
}

/// Comma-separated destination column list in table order.
pub fn column_list() -> String {
    COLUMNS.iter().map(|c| c.name).join(", ")
}

pub fn drop_statement() -> String {
    format!("DROP TABLE IF EXISTS {TABLE_NAME}")
}

pub fn create_statement() -> String {
    let body = COLUMNS
        .iter()
        .map(|c| format!("    {} {}", c.name, c.sql_type))
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {TABLE_NAME} (\n{body}\n)")
}

/// Drops the destination table if present and creates it empty.
///
/// Safe to repeat: both statements are conditional.
pub fn reset_table(session: &mut dyn Session) -> Result<()> {
    let schema_error = |source| Error::Schema {
        table: TABLE_NAME,
        source,
    };
    session
        .batch_execute(&drop_statement())
        .map_err(schema_error)?;
    info!("Table '{TABLE_NAME}' dropped");
    session
        .batch_execute(&create_statement())
        .map_err(schema_error)?;
    info!("Table '{TABLE_NAME}' created");
    Ok(())
}
