//! Capy — correlation analysis client for faceted search statistics.
//!
//! Queries a facet statistics endpoint, flattens its nested JSON into
//! tables and matrices, and samples geographic heatmaps into point clouds.

pub mod client;
pub mod density;
pub mod extract;
pub mod query;
pub mod types;

pub use client::{CorrelationClient, HttpGet, ReqwestTransport, DEFAULT_TIMEOUT_MS};
pub use density::{sample_density, CellBounds, GeoCell, MAX_CELL_WEIGHT};
pub use extract::{extract_matrix, extract_table};
pub use query::{
    FacetRequest, QueryBuilder, QueryParams, ResponseShape, StatsKind, DEFAULT_FACET_LIMIT,
    DEFAULT_GRID_LEVEL,
};
pub use types::*;
