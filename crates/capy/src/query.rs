//! Request parameters for the faceted statistics endpoint.

/// Default number of facet values requested per field.
pub const DEFAULT_FACET_LIMIT: i64 = 100;

/// Default heatmap grid level.
pub const DEFAULT_GRID_LEVEL: u32 = 1;

/// Suffix of the synthetic row dimension of a heatmap.
pub const VERTICAL_SUFFIX: &str = "_vertical";

/// Suffix of the synthetic column dimension of a heatmap.
pub const HORIZONTAL_SUFFIX: &str = "_horizontal";

/// Name of a statistics block in the response (and of the `facet.stats` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsKind {
    Default,
    Pairs,
    Heatmap,
}

impl StatsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsKind::Default => "default",
            StatsKind::Pairs => "pairs",
            StatsKind::Heatmap => "heatmap",
        }
    }
}

/// One logical statistics request.
#[derive(Debug, Clone, PartialEq)]
pub enum FacetRequest {
    /// Distinct values of a single field.
    Facet { field: String, limit: i64 },
    /// Numeric buckets `[start, end)` of width `gap` over a single field.
    Range {
        field: String,
        start: f64,
        end: f64,
        gap: f64,
    },
    /// Cross-tabulation of two fields.
    Pairs {
        row: String,
        column: String,
        row_limit: i64,
        column_limit: i64,
    },
    /// Spatial grid over a geographic field, clipped to `geom`.
    Heatmap {
        field: String,
        geom: String,
        level: u32,
    },
}

/// Where the extracted statistics live in the response and how they are laid out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    Table { dimension: String },
    Matrix { row: String, column: String },
}

impl FacetRequest {
    pub fn facet(field: impl Into<String>) -> Self {
        FacetRequest::Facet {
            field: field.into(),
            limit: DEFAULT_FACET_LIMIT,
        }
    }

    pub fn range(field: impl Into<String>, start: f64, end: f64, gap: f64) -> Self {
        FacetRequest::Range {
            field: field.into(),
            start,
            end,
            gap,
        }
    }

    pub fn pairs(row: impl Into<String>, column: impl Into<String>) -> Self {
        FacetRequest::Pairs {
            row: row.into(),
            column: column.into(),
            row_limit: DEFAULT_FACET_LIMIT,
            column_limit: DEFAULT_FACET_LIMIT,
        }
    }

    pub fn heatmap(field: impl Into<String>, geom: impl Into<String>) -> Self {
        FacetRequest::Heatmap {
            field: field.into(),
            geom: geom.into(),
            level: DEFAULT_GRID_LEVEL,
        }
    }

    /// Value sent as `facet.stats`.
    pub fn requested_stats(&self) -> StatsKind {
        match self {
            FacetRequest::Pairs { .. } => StatsKind::Pairs,
            _ => StatsKind::Default,
        }
    }

    /// Statistics block the answer is read from.
    ///
    /// Heatmaps are requested with `default` stats but the engine reports
    /// them under their own block.
    pub fn response_stats(&self) -> StatsKind {
        match self {
            FacetRequest::Heatmap { .. } => StatsKind::Heatmap,
            other => other.requested_stats(),
        }
    }

    pub fn shape(&self) -> ResponseShape {
        match self {
            FacetRequest::Facet { field, .. } | FacetRequest::Range { field, .. } => {
                ResponseShape::Table {
                    dimension: field.clone(),
                }
            }
            FacetRequest::Pairs { row, column, .. } => ResponseShape::Matrix {
                row: row.clone(),
                column: column.clone(),
            },
            FacetRequest::Heatmap { field, .. } => ResponseShape::Matrix {
                row: vertical_dimension(field),
                column: horizontal_dimension(field),
            },
        }
    }
}

/// `<field>_vertical`
pub fn vertical_dimension(field: &str) -> String {
    format!("{field}{VERTICAL_SUFFIX}")
}

/// `<field>_horizontal`
pub fn horizontal_dimension(field: &str) -> String {
    format!("{field}{HORIZONTAL_SUFFIX}")
}

/// Ordered query-string parameters. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl ToString) {
        self.pairs.push((name.into(), value.to_string()));
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `name`, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    pub fn as_slice(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Builds endpoint parameters for requests sharing one free-text query.
///
/// Field names are passed through as-is; an unknown field only shows up
/// later as a missing dimension in the response.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    query: String,
}

impl QueryBuilder {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn build(&self, request: &FacetRequest) -> QueryParams {
        let mut params = QueryParams::new();

        match request {
            FacetRequest::Facet { field, limit } => {
                params.push("facet.field", field);
                params.push("facet.limit", limit);
            }
            FacetRequest::Range {
                field,
                start,
                end,
                gap,
            } => {
                params.push("facet.range", field);
                params.push("facet.range.start", start);
                params.push("facet.range.end", end);
                params.push("facet.range.gap", gap);
            }
            FacetRequest::Pairs { row, column, .. } => {
                params.push("facet.field", row);
                params.push("facet.field", column);
            }
            FacetRequest::Heatmap { field, .. } => {
                params.push("facet.heatmap", field);
            }
        }

        params.push("facet", "true");
        params.push("q", &self.query);
        params.push("q.op", "AND");
        params.push("rows", "0");
        params.push("facet.stats", request.requested_stats().as_str());

        match request {
            FacetRequest::Pairs {
                row,
                column,
                row_limit,
                column_limit,
            } => {
                params.push(format!("f.{row}.facet.limit"), row_limit);
                params.push(format!("f.{column}.facet.limit"), column_limit);
            }
            FacetRequest::Heatmap { geom, level, .. } => {
                params.push("facet.heatmap.gridLevel", level);
                params.push("facet.heatmap.geom", geom);
            }
            _ => {}
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(params: &QueryParams, stats: &str) {
        assert_eq!(params.get("facet"), Some("true"));
        assert_eq!(params.get("q"), Some("state:CA"));
        assert_eq!(params.get("q.op"), Some("AND"));
        assert_eq!(params.get("rows"), Some("0"));
        assert_eq!(params.get("facet.stats"), Some(stats));
    }

    #[test]
    fn test_facet_params() {
        let params = QueryBuilder::new("state:CA").build(&FacetRequest::facet("color"));
        common(&params, "default");
        assert_eq!(params.get("facet.field"), Some("color"));
        assert_eq!(params.get("facet.limit"), Some("100"));
        assert_eq!(params.len(), 7);
    }

    #[test]
    fn test_range_params() {
        let request = FacetRequest::range("year", 1990.0, 2020.0, 2.5);
        let params = QueryBuilder::new("state:CA").build(&request);
        common(&params, "default");
        assert_eq!(params.get("facet.range"), Some("year"));
        assert_eq!(params.get("facet.range.start"), Some("1990"));
        assert_eq!(params.get("facet.range.end"), Some("2020"));
        assert_eq!(params.get("facet.range.gap"), Some("2.5"));
        assert!(params.get("facet.field").is_none());
    }

    #[test]
    fn test_pairs_params_repeat_field() {
        let request = FacetRequest::Pairs {
            row: "make".into(),
            column: "year".into(),
            row_limit: 10,
            column_limit: 5,
        };
        let params = QueryBuilder::new("state:CA").build(&request);
        common(&params, "pairs");
        assert_eq!(params.get_all("facet.field"), vec!["make", "year"]);
        assert_eq!(params.get("f.make.facet.limit"), Some("10"));
        assert_eq!(params.get("f.year.facet.limit"), Some("5"));
        assert!(params.get("facet.limit").is_none());
    }

    #[test]
    fn test_heatmap_params() {
        let request = FacetRequest::Heatmap {
            field: "location".into(),
            geom: "[\"-180 -90\" TO \"180 90\"]".into(),
            level: 3,
        };
        let params = QueryBuilder::new("state:CA").build(&request);
        common(&params, "default");
        assert_eq!(params.get("facet.heatmap"), Some("location"));
        assert_eq!(params.get("facet.heatmap.gridLevel"), Some("3"));
        assert_eq!(params.get("facet.heatmap.geom"), Some("[\"-180 -90\" TO \"180 90\"]"));
    }

    #[test]
    fn test_shapes_and_stats_blocks() {
        assert_eq!(
            FacetRequest::facet("color").shape(),
            ResponseShape::Table {
                dimension: "color".into()
            }
        );
        let heatmap = FacetRequest::heatmap("location", "box");
        assert_eq!(
            heatmap.shape(),
            ResponseShape::Matrix {
                row: "location_vertical".into(),
                column: "location_horizontal".into()
            }
        );
        assert_eq!(heatmap.requested_stats(), StatsKind::Default);
        assert_eq!(heatmap.response_stats(), StatsKind::Heatmap);
        assert_eq!(FacetRequest::pairs("a", "b").response_stats(), StatsKind::Pairs);
    }
}
