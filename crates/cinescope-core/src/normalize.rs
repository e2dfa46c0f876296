//! Column normalizer: text columns to numeric-or-missing.

use polars::prelude::*;
use tracing::debug;

use crate::error::AnalyticsError;

/// Coerces the declared columns to `Float64`, turning every cell that does
/// not read as a base-10 number (empty strings included) into a null.
///
/// Bad cell content never fails the operation; only structural dataframe
/// errors do. Declared columns absent from the frame are skipped, and
/// non-declared columns pass through untouched. Runs once per load, before
/// any view or filter touches the frame.
pub fn normalize_numeric_columns(
    df: &DataFrame,
    columns: &[&str],
) -> Result<DataFrame, AnalyticsError> {
    let mut output = df.clone();

    for &name in columns {
        let Ok(column) = df.column(name) else {
            continue;
        };

        let values: Vec<Option<f64>> = match column.dtype() {
            DataType::String => {
                let cells = column.str()?;
                (0..cells.len())
                    .map(|idx| cells.get(idx).and_then(parse_numeric_cell))
                    .collect()
            }
            _ => {
                let casted = column.cast(&DataType::Float64)?;
                let cells = casted.f64()?;
                (0..cells.len())
                    .map(|idx| cells.get(idx).filter(|value| value.is_finite()))
                    .collect()
            }
        };

        let missing = values.iter().filter(|value| value.is_none()).count();
        if missing > 0 {
            debug!(column = name, missing, "cells coerced to null");
        }

        output.replace(name, Series::new(name.into(), values))?;
    }

    Ok(output)
}

fn parse_numeric_cell(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
