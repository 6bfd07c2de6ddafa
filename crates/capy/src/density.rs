//! Geo density sampling: turn a heatmap correlation matrix into a point cloud.
//!
//! Each nonzero cell becomes a `step × step` grid of evenly spaced points
//! over its bounding box, where `step = ceil(sqrt(weight))` and the weight
//! is the cell's correlation magnitude rescaled so the smallest nonzero
//! magnitude is at least 1, then truncated.

use std::str::FromStr;

use ndarray::{Array2, ArrayView2};

use crate::types::{CapyError, CapyResult, FacetMatrix};

/// Largest scaled weight a single cell may carry (a 4096 × 4096 grid).
pub const MAX_CELL_WEIGHT: u64 = 1 << 24;

/// A closed interval parsed from a `"start, end"` cell label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub start: f64,
    pub end: f64,
}

impl FromStr for CellBounds {
    type Err = CapyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',').map(str::trim);
        let mut next = || -> CapyResult<f64> {
            parts
                .next()
                .and_then(|p| p.parse::<f64>().ok())
                .ok_or_else(|| CapyError::InvalidBounds(format!("'{s}' is not \"start, end\"")))
        };
        let start = next()?;
        let end = next()?;
        if parts.next().is_some() {
            return Err(CapyError::InvalidBounds(format!("'{s}' has more than two values")));
        }
        Ok(Self { start, end })
    }
}

/// One weighted heatmap cell with its geographic extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub row: usize,
    pub column: usize,
    pub vertical: CellBounds,
    pub horizontal: CellBounds,
    pub weight: u64,
}

impl GeoCell {
    /// Points per side of this cell's sample grid.
    pub fn step(&self) -> usize {
        (self.weight as f64).sqrt().ceil() as usize
    }

    /// Append the cell's `step²` samples as `(vertical, horizontal)` pairs.
    ///
    /// The vertical coordinate varies fastest.
    pub fn sample_into(&self, out: &mut Vec<(f64, f64)>) -> CapyResult<()> {
        let step = self.step();
        let (row, column) = (self.row, self.column);
        let count = step.checked_mul(step).ok_or_else(|| {
            CapyError::InvalidInput(format!("cell ({row}, {column}) grid of {step}² overflows"))
        })?;
        out.try_reserve(count).map_err(|e| {
            CapyError::InvalidInput(format!("cell ({row}, {column}) needs {count} samples: {e}"))
        })?;

        let xs = linspace(self.vertical.start, self.vertical.end, step);
        let ys = linspace(self.horizontal.start, self.horizontal.end, step);
        for &y in &ys {
            for &x in &xs {
                out.push((x, y));
            }
        }
        Ok(())
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (end - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { end } else { start + delta * i as f64 })
                .collect()
        }
    }
}

/// `10^ceil(|log10(m)|)` where `m` is the smallest nonzero correlation magnitude.
///
/// Returns `None` when no finite nonzero value exists or the multiplier
/// itself is not finite (subnormal minima). Minima above 1 are still scaled
/// up: 2.5 gives 10.
pub fn scale_multiplier(correlation: ArrayView2<'_, f64>) -> Option<f64> {
    let min = correlation
        .iter()
        .map(|c| c.abs())
        .filter(|c| c.is_finite() && *c > 0.0)
        .fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return None;
    }
    let multiplier = 10f64.powf(min.log10().abs().ceil());
    multiplier.is_finite().then_some(multiplier)
}

/// Integer weights `trunc(|c| * multiplier)` for every cell.
///
/// NaN cells weigh nothing. A cell whose scaled magnitude is infinite or
/// above [`MAX_CELL_WEIGHT`] is rejected rather than clamped.
pub fn cell_weights(correlation: ArrayView2<'_, f64>, multiplier: f64) -> CapyResult<Array2<u64>> {
    let mut weights = Array2::zeros(correlation.raw_dim());
    for (((row, column), &c), weight) in correlation.indexed_iter().zip(weights.iter_mut()) {
        let scaled = c.abs() * multiplier;
        if scaled.is_nan() {
            continue;
        }
        if !scaled.is_finite() || scaled > MAX_CELL_WEIGHT as f64 {
            return Err(CapyError::InvalidInput(format!(
                "cell ({row}, {column}) correlation {c} scales to {scaled:e}, above the weight limit {MAX_CELL_WEIGHT}"
            )));
        }
        *weight = scaled as u64;
    }
    Ok(weights)
}

/// The nonzero-weight cells of `matrix`, in row-major order over the
/// (`vertical_field`, `horizontal_field`) orientation.
///
/// Each field must name one axis of the matrix. Bounds are only parsed for
/// cells that carry weight.
pub fn geo_cells(
    matrix: &FacetMatrix,
    vertical_field: &str,
    horizontal_field: &str,
) -> CapyResult<Vec<GeoCell>> {
    let (correlation, vertical_labels, horizontal_labels) =
        if vertical_field == matrix.row_name && horizontal_field == matrix.column_name {
            (matrix.correlation.view(), &matrix.row_labels, &matrix.column_labels)
        } else if vertical_field == matrix.column_name && horizontal_field == matrix.row_name {
            (matrix.correlation.t(), &matrix.column_labels, &matrix.row_labels)
        } else {
            return Err(CapyError::InvalidInput(format!(
                "axes ({vertical_field}, {horizontal_field}) do not match matrix ({}, {})",
                matrix.row_name, matrix.column_name
            )));
        };

    let Some(multiplier) = scale_multiplier(correlation) else {
        tracing::warn!(
            vertical_field,
            horizontal_field,
            "correlation matrix has no usable nonzero minimum; no samples"
        );
        return Ok(Vec::new());
    };
    tracing::debug!(multiplier, "density scale multiplier");

    let weights = cell_weights(correlation, multiplier)?;
    let mut cells = Vec::new();
    for ((row, column), &weight) in weights.indexed_iter() {
        if weight == 0 {
            continue;
        }
        cells.push(GeoCell {
            row,
            column,
            vertical: vertical_labels[row].parse()?,
            horizontal: horizontal_labels[column].parse()?,
            weight,
        });
    }
    Ok(cells)
}

/// Sample `matrix` into `(vertical, horizontal)` points whose local density
/// follows the correlation magnitude of each cell.
///
/// A matrix with no nonzero correlation yields no points.
pub fn sample_density(
    matrix: &FacetMatrix,
    vertical_field: &str,
    horizontal_field: &str,
) -> CapyResult<Vec<(f64, f64)>> {
    let cells = geo_cells(matrix, vertical_field, horizontal_field)?;
    let mut points = Vec::new();
    for cell in &cells {
        cell.sample_into(&mut points)?;
    }
    tracing::info!(cells = cells.len(), points = points.len(), "density sampled");
    Ok(points)
}
