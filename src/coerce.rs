//! Cell-level conversions from input text to destination types.
//!
//! These are pure functions; the record stage in [`crate::record`] applies
//! them per column and attaches row context to any failure.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::{
    error::{DateParseError, TypeConversionError},
    mapping::RawTable,
    schema::{ColumnKind, column_kind},
};

/// Removes every comma from a text value without reallocating.
pub fn strip_commas(value: &mut String) {
    if value.contains(',') {
        value.retain(|c| c != ',');
    }
}

/// Removes commas from every text-typed column, rewriting cells in place.
///
/// A column is text-typed when the destination table declares it as such;
/// numeric and date columns, and headers the table does not know, are left
/// as read.
pub fn strip_commas_from_text_columns(mut table: RawTable) -> RawTable {
    let text_columns = table
        .headers
        .iter()
        .map(|header| column_kind(header) == Some(ColumnKind::Text))
        .collect::<Vec<_>>();
    for row in &mut table.rows {
        for (cell, is_text) in row.iter_mut().zip(&text_columns) {
            if *is_text {
                strip_commas(cell);
            }
        }
    }
    table
}

fn is_nan_token(value: &str) -> bool {
    value.eq_ignore_ascii_case("nan")
}

fn parse_float_text(value: &str, trimmed: &str) -> Result<f64, TypeConversionError> {
    let float: f64 = trimmed
        .parse()
        .map_err(|_| TypeConversionError::new(value, "integer"))?;
    if !float.is_finite() || float.trunc() < i32::MIN as f64 || float.trunc() > i32::MAX as f64 {
        return Err(TypeConversionError::new(value, "integer"));
    }
    Ok(float)
}

/// Parses an `INT` value. Float text is accepted only when it is integral
/// (`"6.0"`); a fractional value such as `"2.9"` is an error.
pub fn parse_int(value: &str) -> Result<i32, TypeConversionError> {
    let trimmed = value.trim();
    if let Ok(parsed) = trimmed.parse::<i32>() {
        return Ok(parsed);
    }
    let float = parse_float_text(value, trimmed)?;
    if float.fract() != 0.0 {
        return Err(TypeConversionError::new(value, "integer"));
    }
    Ok(float as i32)
}

/// Parses a customer identifier. Blank text and NaN become `0`; float text
/// is truncated toward zero (`"17850.7"` is `17850`).
///
/// `0` is the sentinel for an unknown customer; it is indistinguishable from
/// a genuine identifier `0`.
pub fn to_nullable_int(value: &str) -> Result<i32, TypeConversionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || is_nan_token(trimmed) {
        return Ok(0);
    }
    if let Ok(parsed) = trimmed.parse::<i32>() {
        return Ok(parsed);
    }
    Ok(parse_float_text(value, trimmed)?.trunc() as i32)
}

/// Parses a `FLOAT` value. NaN text is rejected.
pub fn parse_float(value: &str) -> Result<f64, TypeConversionError> {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(parsed) if !parsed.is_nan() => Ok(parsed),
        _ => Err(TypeConversionError::new(value, "float")),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%b %d %Y %H:%M:%S",
    "%b %d %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%b %d %Y",
    "%d %b %Y",
    "%B %d, %Y",
];

/// Parses a calendar date, discarding any time of day.
///
/// Slash-separated dates are read month first.
pub fn parse_invoice_date(value: &str) -> Result<NaiveDate, DateParseError> {
    let trimmed = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(parsed.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(parsed.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(parsed);
        }
    }
    Err(DateParseError {
        value: value.to_string(),
    })
}
