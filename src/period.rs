use chrono::{Datelike, NaiveDate};

/// Formats the `mes` label: unpadded month, dash, four-digit year (`3-2011`).
pub fn derive_month_year(date: NaiveDate) -> String {
    format!("{}-{:04}", date.month(), date.year())
}
