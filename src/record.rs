//! Typed rows bound for the destination table.
//!
//! Coercion produces [`InvoiceLine`]s from the cleaned, renamed record set;
//! period derivation then turns each into a [`Registro`], the final shape
//! whose field order mirrors [`crate::schema::COLUMNS`].

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    coerce::{parse_float, parse_int, parse_invoice_date, to_nullable_int},
    error::{Error, Result, TypeConversionError},
    mapping::RawTable,
    period::derive_month_year,
};

#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceLine {
    pub numero_factura: String,
    pub codigo: String,
    pub descripcion: String,
    pub cantidad: i32,
    pub fecha_factura: NaiveDate,
    pub precio_unitario: f64,
    pub id_cliente: i32,
    pub pais: String,
}

/// One destination row. Serialized field order is the table's column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Registro {
    pub numero_factura: String,
    pub codigo: String,
    pub descripcion: String,
    pub cantidad: i32,
    pub fecha_factura: NaiveDate,
    pub precio_unitario: f64,
    pub id_cliente: i32,
    pub pais: String,
    pub mes: String,
}

impl From<InvoiceLine> for Registro {
    fn from(line: InvoiceLine) -> Self {
        let mes = derive_month_year(line.fecha_factura);
        Registro {
            numero_factura: line.numero_factura,
            codigo: line.codigo,
            descripcion: line.descripcion,
            cantidad: line.cantidad,
            fecha_factura: line.fecha_factura,
            precio_unitario: line.precio_unitario,
            id_cliente: line.id_cliente,
            pais: line.pais,
            mes,
        }
    }
}

struct ColumnSlots {
    numero_factura: usize,
    codigo: usize,
    descripcion: usize,
    cantidad: usize,
    fecha_factura: usize,
    precio_unitario: usize,
    id_cliente: usize,
    pais: usize,
}

impl ColumnSlots {
    fn resolve(table: &RawTable) -> Result<Self> {
        Ok(Self {
            numero_factura: table.require_column("numero_factura")?,
            codigo: table.require_column("codigo")?,
            descripcion: table.require_column("descripcion")?,
            cantidad: table.require_column("cantidad")?,
            fecha_factura: table.require_column("fecha_factura")?,
            precio_unitario: table.require_column("precio_unitario")?,
            id_cliente: table.require_column("id_cliente")?,
            pais: table.require_column("pais")?,
        })
    }
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(String::as_str).unwrap_or_default()
}

fn numeric<T>(
    column: &str,
    line: u64,
    parsed: std::result::Result<T, TypeConversionError>,
) -> Result<T> {
    parsed.map_err(|source| Error::TypeConversion {
        column: column.to_string(),
        line,
        source,
    })
}

/// Converts every row of a renamed record set to typed values.
///
/// `line` in errors is the 1-based line of the input file, counting the
/// header as line 1.
pub fn coerce_rows(table: &RawTable) -> Result<Vec<InvoiceLine>> {
    let slots = ColumnSlots::resolve(table)?;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let line = idx as u64 + 2;
            let fecha_factura =
                parse_invoice_date(cell(row, slots.fecha_factura)).map_err(|source| {
                    Error::DateParse {
                        column: "fecha_factura".to_string(),
                        line,
                        source,
                    }
                })?;
            Ok(InvoiceLine {
                numero_factura: cell(row, slots.numero_factura).to_string(),
                codigo: cell(row, slots.codigo).to_string(),
                descripcion: cell(row, slots.descripcion).to_string(),
                cantidad: numeric("cantidad", line, parse_int(cell(row, slots.cantidad)))?,
                fecha_factura,
                precio_unitario: numeric(
                    "precio_unitario",
                    line,
                    parse_float(cell(row, slots.precio_unitario)),
                )?,
                id_cliente: numeric(
                    "id_cliente",
                    line,
                    to_nullable_int(cell(row, slots.id_cliente)),
                )?,
                pais: cell(row, slots.pais).to_string(),
            })
        })
        .collect()
}

/// Appends the `mes` period label to each coerced line.
pub fn derive_periods(lines: Vec<InvoiceLine>) -> Vec<Registro> {
    lines.into_iter().map(Registro::from).collect()
}
