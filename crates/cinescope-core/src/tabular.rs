//! Boundary between raw tabular bytes and the in-memory dataset.
//!
//! Uploaded CSV is read into an all-text frame with no type inference;
//! numeric coercion happens later in the analytics pipeline.

use std::collections::HashSet;

use csv::ReaderBuilder;
use polars::prelude::*;

use crate::error::AnalyticsError;

/// Parses comma-separated bytes with a header row into an all-Utf8 frame.
///
/// Every column comes back as text. A headerless (empty) input yields an
/// empty frame rather than an error; ragged rows and duplicate header
/// names are rejected.
pub fn read_csv_dataset(bytes: &[u8]) -> Result<DataFrame, AnalyticsError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(|name| name.is_empty()) {
        return Ok(DataFrame::empty());
    }

    let mut seen = HashSet::new();
    for name in headers.iter() {
        if !seen.insert(name) {
            return Err(AnalyticsError::Validation(format!(
                "duplicate column name '{name}' in header"
            )));
        }
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (idx, cell) in record.iter().enumerate() {
            cells[idx].push(cell.to_string());
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| Series::new(name.into(), values).into())
        .collect();

    DataFrame::new(columns).map_err(AnalyticsError::from)
}

/// Flattens a frame into header names plus row-major display cells.
///
/// Every cell is rendered through a cast to Utf8; nulls stay `None` so the
/// caller decides how an absent value is shown.
pub fn table_cells(
    df: &DataFrame,
) -> Result<(Vec<String>, Vec<Vec<Option<String>>>), AnalyticsError> {
    let names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut rows = vec![Vec::with_capacity(names.len()); df.height()];
    for column in df.get_columns() {
        let casted = column.cast(&DataType::String)?;
        let values = casted.str()?;
        for (idx, row) in rows.iter_mut().enumerate() {
            row.push(values.get(idx).map(|value| value.to_string()));
        }
    }

    Ok((names, rows))
}
