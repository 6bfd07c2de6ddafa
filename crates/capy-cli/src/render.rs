//! Plain-text and JSON output for tables, matrices, and point clouds.

use std::fmt::Write;

use capy::{FacetMatrix, FacetResult, FacetTable};

/// Width of the correlation bar in text tables.
const BAR_WIDTH: usize = 30;

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

pub fn render_result(result: &FacetResult, format: OutputFormat) -> serde_json::Result<String> {
    match (format, result) {
        (OutputFormat::Json, r) => serde_json::to_string_pretty(r),
        (OutputFormat::Text, FacetResult::Table(t)) => Ok(render_table(t)),
        (OutputFormat::Text, FacetResult::Matrix(m)) => Ok(render_matrix(m)),
    }
}

/// One line per facet value with a bar proportional to |correlation|.
pub fn render_table(table: &FacetTable) -> String {
    let label_width = table
        .labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(table.dimension.chars().count()))
        .max()
        .unwrap_or(0);
    let max_corr = table
        .correlation
        .iter()
        .filter(|c| c.is_finite())
        .fold(0.0f64, |acc, c| acc.max(c.abs()));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<label_width$}  {:>10}  {:>11}",
        table.dimension, "count", "correlation"
    );
    for row in table.rows() {
        let bar_len = if max_corr > 0.0 && row.correlation.is_finite() {
            ((row.correlation.abs() / max_corr) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        let _ = writeln!(
            out,
            "{:<label_width$}  {:>10}  {:>11.4}  {}",
            row.label,
            row.frequency,
            row.correlation,
            "#".repeat(bar_len)
        );
    }
    out
}

/// Correlation grid with column labels across the top.
pub fn render_matrix(matrix: &FacetMatrix) -> String {
    let row_width = matrix
        .row_labels
        .iter()
        .map(|l| l.chars().count())
        .chain(std::iter::once(matrix.row_name.chars().count()))
        .max()
        .unwrap_or(0);
    let col_width = matrix
        .column_labels
        .iter()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(8);

    let mut out = String::new();
    let _ = write!(out, "{:<row_width$}", matrix.row_name);
    for label in &matrix.column_labels {
        let _ = write!(out, "  {label:>col_width$}");
    }
    out.push('\n');

    for (label, row) in matrix.row_labels.iter().zip(matrix.correlation.rows()) {
        let _ = write!(out, "{label:<row_width$}");
        for value in row {
            let _ = write!(out, "  {value:>col_width$.4}");
        }
        out.push('\n');
    }
    out
}

/// Points as a JSON array of `[x, y]` pairs or as tab-separated lines.
pub fn render_points(points: &[(f64, f64)], format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(points),
        OutputFormat::Text => Ok(points.iter().fold(String::new(), |mut out, (x, y)| {
            let _ = writeln!(out, "{x}\t{y}");
            out
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capy::extract_matrix;
    use serde_json::json;

    fn matrix() -> FacetMatrix {
        let resp = json!({"facet_stats": {
            "dims": {"make": [{"id": "ford"}, {"id": "audi"}], "year": [{"id": "1999"}]},
            "stats": {"pairs": {"make": [
                {"year": [{"correlation": 0.5, "count": 2}]},
                {"year": [{"correlation": 0.125, "count": 1}]}
            ]}}
        }});
        extract_matrix(&resp, "pairs", "make", "year").unwrap()
    }

    fn table() -> FacetTable {
        FacetTable::new(
            "color",
            vec!["red".into(), "blue".into()],
            vec![120, 40],
            vec![0.8, -0.4],
        )
        .unwrap()
    }

    #[test]
    fn test_table_bars_scale_with_magnitude() {
        let text = render_table(&table());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("color"));
        assert!(lines[1].ends_with(&"#".repeat(BAR_WIDTH)));
        assert!(lines[2].ends_with(&"#".repeat(BAR_WIDTH / 2)));
        assert!(lines[2].contains("-0.4000"));
    }

    #[test]
    fn test_matrix_grid() {
        let text = render_matrix(&matrix());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("1999"));
        assert!(lines[1].starts_with("ford") && lines[1].ends_with("0.5000"));
        assert!(lines[2].starts_with("audi") && lines[2].ends_with("0.1250"));
    }

    #[test]
    fn test_json_result_is_column_oriented() {
        let out = render_result(&FacetResult::Table(table()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(
            value,
            json!({"color": ["red", "blue"], "count": [120, 40], "correlation": [0.8, -0.4]})
        );
    }

    #[test]
    fn test_json_matrix_is_nested_rows() {
        let out = render_result(&FacetResult::Matrix(matrix()), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["make"], json!(["ford", "audi"]));
        assert_eq!(value["year"], json!(["1999"]));
        assert_eq!(value["count"], json!([[2], [1]]));
        assert_eq!(value["correlation"], json!([[0.5], [0.125]]));
    }

    #[test]
    fn test_points_formats() {
        let points = [(1.0, 2.5), (3.0, 4.0)];
        assert_eq!(render_points(&points, OutputFormat::Text).unwrap(), "1\t2.5\n3\t4\n");
        let json = render_points(&points, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value, json!([[1.0, 2.5], [3.0, 4.0]]));
    }
}
