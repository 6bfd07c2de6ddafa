//! Core data types for facet statistics tables and matrices.

use std::cmp::Ordering;

use ndarray::{Array2, ArrayView1};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// JSON key under which frequencies are reported, both by the engine and in
/// the tabular output.
pub const FREQUENCY_KEY: &str = "count";

/// JSON key under which correlations are reported.
pub const CORRELATION_KEY: &str = "correlation";

/// One-dimensional facet statistics: a label, count and correlation per
/// facet value, in the order the engine returned them.
///
/// Serializes column-oriented and keyed by the dimension name:
/// `{"color": [...], "count": [...], "correlation": [...]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetTable {
    pub dimension: String,
    pub labels: Vec<String>,
    pub frequency: Vec<u64>,
    pub correlation: Vec<f64>,
}

/// A borrowed view of a single table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetRow<'a> {
    pub label: &'a str,
    pub frequency: u64,
    pub correlation: f64,
}

impl FacetTable {
    /// Create a table, checking that all three columns have the same length.
    pub fn new(
        dimension: impl Into<String>,
        labels: Vec<String>,
        frequency: Vec<u64>,
        correlation: Vec<f64>,
    ) -> CapyResult<Self> {
        let dimension = dimension.into();
        if labels.len() != frequency.len() || labels.len() != correlation.len() {
            return Err(CapyError::MalformedResponse(format!(
                "dimension '{dimension}' has {} labels but {} counts and {} correlations",
                labels.len(),
                frequency.len(),
                correlation.len()
            )));
        }
        Ok(Self {
            dimension,
            labels,
            frequency,
            correlation,
        })
    }

    /// Number of facet values.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate rows in table order.
    pub fn rows(&self) -> impl Iterator<Item = FacetRow<'_>> {
        self.labels
            .iter()
            .zip(&self.frequency)
            .zip(&self.correlation)
            .map(|((label, &frequency), &correlation)| FacetRow {
                label,
                frequency,
                correlation,
            })
    }

    /// Return a copy sorted by correlation, highest first.
    ///
    /// The sort is stable and NaN correlations go last.
    pub fn sorted_by_correlation(&self) -> Self {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| descending_nan_last(self.correlation[a], self.correlation[b]));
        self.permuted(&order)
    }

    /// Return a copy holding only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        let n = n.min(self.len());
        Self {
            dimension: self.dimension.clone(),
            labels: self.labels[..n].to_vec(),
            frequency: self.frequency[..n].to_vec(),
            correlation: self.correlation[..n].to_vec(),
        }
    }

    fn permuted(&self, order: &[usize]) -> Self {
        Self {
            dimension: self.dimension.clone(),
            labels: order.iter().map(|&i| self.labels[i].clone()).collect(),
            frequency: order.iter().map(|&i| self.frequency[i]).collect(),
            correlation: order.iter().map(|&i| self.correlation[i]).collect(),
        }
    }
}

impl Serialize for FacetTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(&self.dimension, &self.labels)?;
        map.serialize_entry(FREQUENCY_KEY, &self.frequency)?;
        map.serialize_entry(CORRELATION_KEY, &self.correlation)?;
        map.end()
    }
}

fn descending_nan_last(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Two-dimensional facet statistics: counts and correlations for every
/// (row value, column value) pair.
///
/// Row and column order is the engine's order; nothing here re-sorts it.
/// Serializes keyed by both dimension names, with nested row arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct FacetMatrix {
    pub row_name: String,
    pub column_name: String,
    pub row_labels: Vec<String>,
    pub column_labels: Vec<String>,
    /// `row_labels.len() × column_labels.len()`
    pub frequency: Array2<u64>,
    /// `row_labels.len() × column_labels.len()`
    pub correlation: Array2<f64>,
}

impl FacetMatrix {
    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.row_labels.len(), self.column_labels.len())
    }

}

impl Serialize for FacetMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(&self.row_name, &self.row_labels)?;
        map.serialize_entry(&self.column_name, &self.column_labels)?;
        map.serialize_entry(FREQUENCY_KEY, &RowsOf(&self.frequency))?;
        map.serialize_entry(CORRELATION_KEY, &RowsOf(&self.correlation))?;
        map.end()
    }
}

/// A matrix as a sequence of row sequences.
struct RowsOf<'a, T>(&'a Array2<T>);

struct RowOf<'a, T>(ArrayView1<'a, T>);

impl<T: Serialize> Serialize for RowsOf<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.rows().into_iter().map(RowOf))
    }
}

impl<T: Serialize> Serialize for RowOf<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Result of a request whose shape is only known at runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FacetResult {
    Table(FacetTable),
    Matrix(FacetMatrix),
}

/// Errors that can occur while querying or reshaping facet statistics.
#[derive(thiserror::Error, Debug)]
pub enum CapyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid cell bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for CapyError {
    fn from(e: reqwest::Error) -> Self {
        CapyError::Transport(e.to_string())
    }
}

/// Convenience result type.
pub type CapyResult<T> = Result<T, CapyError>;
