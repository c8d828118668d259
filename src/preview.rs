use std::fmt::Write as _;

use crate::{record::Registro, schema::COLUMNS};

fn cells(record: &Registro) -> Vec<String> {
    vec![
        record.numero_factura.clone(),
        record.codigo.clone(),
        record.descripcion.clone(),
        record.cantidad.to_string(),
        record.fecha_factura.format("%Y-%m-%d").to_string(),
        record.precio_unitario.to_string(),
        record.id_cliente.to_string(),
        record.pais.clone(),
        record.mes.clone(),
    ]
}

/// Renders up to `limit` rows as an aligned text table headed by the
/// destination column names.
pub fn render_preview(records: &[Registro], limit: usize) -> String {
    let headers = COLUMNS.iter().map(|c| c.name.to_string()).collect::<Vec<_>>();
    let rows = records.iter().take(limit).map(cells).collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in &rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let line = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| {
            // Embedded newlines would break the grid
            let flat = value.replace(['\r', '\n'], " ");
            format!("{flat:<width$}")
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample(descripcion: &str) -> Registro {
        Registro {
            numero_factura: "536365".into(),
            codigo: "85123A".into(),
            descripcion: descripcion.into(),
            cantidad: 6,
            fecha_factura: NaiveDate::from_ymd_opt(2010, 12, 1).unwrap(),
            precio_unitario: 2.55,
            id_cliente: 0,
            pais: "United Kingdom".into(),
            mes: "12-2010".into(),
        }
    }

    #[test]
    fn preview_aligns_columns_and_honours_limit() {
        let records = vec![sample("HEART"), sample("LANTERN\nWHITE")];
        let rendered = render_preview(&records, 1);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("numero_factura  codigo  descripcion"));
        assert!(lines[2].contains("2010-12-01"));
        assert!(lines[2].ends_with("United Kingdom  12-2010"));
        assert!(!rendered.contains("LANTERN"));
    }
}
