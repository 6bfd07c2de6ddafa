//! Flattening of the engine's nested `facet_stats` payload into tables and matrices.
//!
//! The payload looks like:
//!
//! ```text
//! facet_stats
//! ├── dims
//! │   └── <dimension>: [{id}, ...]
//! └── stats
//!     └── <stats kind>
//!         └── <dimension>: [{correlation, count}, ...]            (1D)
//!                          [{<column dimension>: [{...}, ...]}, ...] (2D)
//! ```
//!
//! Every missing key or length disagreement is reported as
//! [`CapyError::MalformedResponse`] with the path that failed.

use ndarray::Array2;
use serde_json::Value;

use crate::types::{CapyError, CapyResult, FacetMatrix, FacetTable, CORRELATION_KEY, FREQUENCY_KEY};

const FACET_STATS: &str = "facet_stats";
const DIMS: &str = "dims";
const STATS: &str = "stats";
const ID: &str = "id";

/// Extract the one-dimensional statistics of `dimension` from the block `stats_kind`.
pub fn extract_table(response: &Value, stats_kind: &str, dimension: &str) -> CapyResult<FacetTable> {
    let fs = member(response, FACET_STATS, "")?;
    let labels = dimension_labels(fs, dimension)?;

    let path = stats_path(stats_kind, dimension);
    let entries = array(stats_entries(fs, stats_kind, dimension)?, &path)?;
    let (frequency, correlation) = flatten_cells(entries, &path)?;

    if frequency.len() != labels.len() {
        return Err(malformed(format!(
            "{path} has {} entries but {FACET_STATS}.{DIMS}.{dimension} has {} labels",
            frequency.len(),
            labels.len()
        )));
    }

    tracing::debug!(dimension, stats_kind, rows = labels.len(), "extracted facet table");
    FacetTable::new(dimension, labels, frequency, correlation)
}

/// Extract the `row × column` statistics from the block `stats_kind`.
///
/// Each entry of `stats.<kind>.<row>` carries the cells of one row under the
/// `column` key.
pub fn extract_matrix(
    response: &Value,
    stats_kind: &str,
    row: &str,
    column: &str,
) -> CapyResult<FacetMatrix> {
    let fs = member(response, FACET_STATS, "")?;
    let row_labels = dimension_labels(fs, row)?;
    let column_labels = dimension_labels(fs, column)?;

    let path = stats_path(stats_kind, row);
    let row_entries = array(stats_entries(fs, stats_kind, row)?, &path)?;
    if row_entries.len() != row_labels.len() {
        return Err(malformed(format!(
            "{path} has {} rows but {FACET_STATS}.{DIMS}.{row} has {} labels",
            row_entries.len(),
            row_labels.len()
        )));
    }

    let (rows, cols) = (row_labels.len(), column_labels.len());
    let mut frequency = Vec::with_capacity(rows * cols);
    let mut correlation = Vec::with_capacity(rows * cols);

    for (i, entry) in row_entries.iter().enumerate() {
        let row_path = format!("{path}[{i}]");
        let cells = array(member(entry, column, &row_path)?, &format!("{row_path}.{column}"))?;
        if cells.len() != cols {
            return Err(malformed(format!(
                "{row_path}.{column} has {} columns but {FACET_STATS}.{DIMS}.{column} has {cols} labels",
                cells.len()
            )));
        }
        let (f, c) = flatten_cells(cells, &format!("{row_path}.{column}"))?;
        frequency.extend(f);
        correlation.extend(c);
    }

    let frequency = Array2::from_shape_vec((rows, cols), frequency)
        .map_err(|e| malformed(format!("{path}: {e}")))?;
    let correlation = Array2::from_shape_vec((rows, cols), correlation)
        .map_err(|e| malformed(format!("{path}: {e}")))?;

    tracing::debug!(row, column, stats_kind, rows, cols, "extracted facet matrix");
    Ok(FacetMatrix {
        row_name: row.to_string(),
        column_name: column.to_string(),
        row_labels,
        column_labels,
        frequency,
        correlation,
    })
}

/// Labels of `dims.<dimension>`, in response order.
fn dimension_labels(fs: &Value, dimension: &str) -> CapyResult<Vec<String>> {
    let dims_path = format!("{FACET_STATS}.{DIMS}");
    let dims = member(fs, DIMS, FACET_STATS)?;
    let path = format!("{dims_path}.{dimension}");
    let entries = array(member(dims, dimension, &dims_path)?, &path)?;

    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let entry_path = format!("{path}[{i}]");
            label_text(member(entry, ID, &entry_path)?, &format!("{entry_path}.{ID}"))
        })
        .collect()
}

fn stats_entries<'a>(fs: &'a Value, stats_kind: &str, dimension: &str) -> CapyResult<&'a Value> {
    let stats = member(fs, STATS, FACET_STATS)?;
    let kind_path = format!("{FACET_STATS}.{STATS}");
    let block = member(stats, stats_kind, &kind_path)?;
    member(block, dimension, &format!("{kind_path}.{stats_kind}"))
}

/// Split a list of `{correlation, count}` cells into parallel columns.
///
/// Shared by the table (one list) and matrix (one list per row) paths.
fn flatten_cells(cells: &[Value], path: &str) -> CapyResult<(Vec<u64>, Vec<f64>)> {
    let mut frequency = Vec::with_capacity(cells.len());
    let mut correlation = Vec::with_capacity(cells.len());

    for (i, cell) in cells.iter().enumerate() {
        let cell_path = format!("{path}[{i}]");
        let count = member(cell, FREQUENCY_KEY, &cell_path)?;
        let count = count.as_u64().ok_or_else(|| {
            malformed(format!("{cell_path}.{FREQUENCY_KEY} is not a non-negative integer: {count}"))
        })?;
        let corr = member(cell, CORRELATION_KEY, &cell_path)?;
        let corr = corr
            .as_f64()
            .ok_or_else(|| malformed(format!("{cell_path}.{CORRELATION_KEY} is not a number: {corr}")))?;
        frequency.push(count);
        correlation.push(corr);
    }

    Ok((frequency, correlation))
}

fn member<'a>(value: &'a Value, key: &str, parent: &str) -> CapyResult<&'a Value> {
    let path = if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    };
    match value {
        Value::Object(map) => map.get(key).ok_or_else(|| malformed(format!("missing {path}"))),
        _ => Err(malformed(format!(
            "expected an object at {}",
            if parent.is_empty() { "<root>" } else { parent }
        ))),
    }
}

fn array<'a>(value: &'a Value, path: &str) -> CapyResult<&'a [Value]> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| malformed(format!("expected an array at {path}")))
}

fn label_text(value: &Value, path: &str) -> CapyResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(malformed(format!("{path} is not a scalar label: {value}"))),
    }
}

fn stats_path(stats_kind: &str, dimension: &str) -> String {
    format!("{FACET_STATS}.{STATS}.{stats_kind}.{dimension}")
}

fn malformed(msg: String) -> CapyError {
    CapyError::MalformedResponse(msg)
}
