//! Statistics commands and their execution against a client.

use clap::{Args, Subcommand};

use capy::{
    CapyResult, CorrelationClient, FacetResult, HttpGet, DEFAULT_FACET_LIMIT, DEFAULT_GRID_LEVEL,
};

use crate::render::{render_points, render_result, OutputFormat};

/// Options shared by every statistics command.
#[derive(Args, Debug, Clone)]
pub struct Common {
    /// Free-text query; terms are combined with AND.
    #[arg(short, long, default_value = "*:*")]
    pub query: String,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Correlation per distinct value of a field.
    Facets {
        field: String,

        /// Maximum number of facet values requested.
        #[arg(long, default_value_t = DEFAULT_FACET_LIMIT)]
        limit: i64,

        /// Sort by correlation, highest first.
        #[arg(long)]
        sort: bool,

        /// Keep only the first N rows (after sorting).
        #[arg(long)]
        top: Option<usize>,

        #[command(flatten)]
        common: Common,
    },

    /// Correlation per numeric bucket of a field.
    Ranges {
        field: String,

        #[arg(long, allow_hyphen_values = true)]
        start: f64,

        #[arg(long, allow_hyphen_values = true)]
        end: f64,

        #[arg(long)]
        gap: f64,

        #[command(flatten)]
        common: Common,
    },

    /// Correlation matrix of two fields.
    Pairs {
        row: String,
        column: String,

        #[arg(long, default_value_t = DEFAULT_FACET_LIMIT)]
        row_limit: i64,

        #[arg(long, default_value_t = DEFAULT_FACET_LIMIT)]
        column_limit: i64,

        #[command(flatten)]
        common: Common,
    },

    /// Correlation grid over a geographic field.
    Heatmap {
        field: String,

        /// Bounding geometry, e.g. '["-180 -90" TO "180 90"]'.
        #[arg(long, allow_hyphen_values = true)]
        geom: String,

        /// Grid resolution level.
        #[arg(long, default_value_t = DEFAULT_GRID_LEVEL)]
        level: u32,

        #[command(flatten)]
        common: Common,
    },

    /// Heatmap sampled into a weighted point cloud.
    GeoPoints {
        field: String,

        #[arg(long, allow_hyphen_values = true)]
        geom: String,

        #[arg(long, default_value_t = DEFAULT_GRID_LEVEL)]
        level: u32,

        #[command(flatten)]
        common: Common,
    },
}

/// Run `command` and return the rendered output.
pub fn execute<H: HttpGet>(client: &CorrelationClient<H>, command: &Command) -> CapyResult<String> {
    match command {
        Command::Facets {
            field,
            limit,
            sort,
            top,
            common,
        } => {
            let mut table = client.facets(field, &common.query, *limit)?;
            if *sort {
                table = table.sorted_by_correlation();
            }
            if let Some(n) = top {
                table = table.head(*n);
            }
            Ok(render_result(&FacetResult::Table(table), common.format)?)
        }

        Command::Ranges {
            field,
            start,
            end,
            gap,
            common,
        } => {
            let table = client.ranges(field, &common.query, *start, *end, *gap)?;
            Ok(render_result(&FacetResult::Table(table), common.format)?)
        }

        Command::Pairs {
            row,
            column,
            row_limit,
            column_limit,
            common,
        } => {
            let matrix = client.pairs(row, column, &common.query, *row_limit, *column_limit)?;
            Ok(render_result(&FacetResult::Matrix(matrix), common.format)?)
        }

        Command::Heatmap {
            field,
            geom,
            level,
            common,
        } => {
            let matrix = client.heatmap(field, &common.query, geom, *level)?;
            Ok(render_result(&FacetResult::Matrix(matrix), common.format)?)
        }

        Command::GeoPoints {
            field,
            geom,
            level,
            common,
        } => {
            let points = client.geo_heatmap_points(field, &common.query, geom, *level)?;
            Ok(render_points(&points, common.format)?)
        }
    }
}
