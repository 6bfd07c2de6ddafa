//! Client for the faceted statistics endpoint.
//!
//! Transport is pluggable through [`HttpGet`]; [`ReqwestTransport`] is the
//! blocking HTTP implementation. No retries happen at this layer.

use std::time::Duration;

use serde_json::Value;

use crate::density::sample_density;
use crate::extract::{extract_matrix, extract_table};
use crate::query::{
    horizontal_dimension, vertical_dimension, FacetRequest, QueryBuilder, QueryParams,
    ResponseShape,
};
use crate::types::{CapyError, CapyResult, FacetMatrix, FacetResult, FacetTable};

/// Default request timeout.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Synchronous `GET endpoint?params` returning a JSON body.
pub trait HttpGet {
    fn get(&self, endpoint: &str, params: &QueryParams) -> CapyResult<Value>;
}

impl<T: HttpGet + ?Sized> HttpGet for &T {
    fn get(&self, endpoint: &str, params: &QueryParams) -> CapyResult<Value> {
        (**self).get(endpoint, params)
    }
}

/// Blocking reqwest transport.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout_ms: u64) -> Self {
        let builder = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("capy/", env!("CARGO_PKG_VERSION")));
        Self {
            client: build_or_fallback(builder),
        }
    }
}

/// A plain client when the configured one cannot be built. The fallback has
/// no timeout and no user agent, so the failure is logged.
fn build_or_fallback(builder: reqwest::blocking::ClientBuilder) -> reqwest::blocking::Client {
    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!("HTTP client setup failed ({e}); using defaults without timeout or user agent");
            reqwest::blocking::Client::new()
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl HttpGet for ReqwestTransport {
    fn get(&self, endpoint: &str, params: &QueryParams) -> CapyResult<Value> {
        let resp = self.client.get(endpoint).query(params.as_slice()).send()?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CapyError::Transport(format!(
                "{endpoint} returned {status}: {}",
                resp.text().unwrap_or_default()
            )));
        }
        let body = resp.text()?;
        serde_json::from_str(&body)
            .map_err(|e| CapyError::MalformedResponse(format!("response body is not JSON: {e}")))
    }
}

/// Correlation statistics client bound to one endpoint.
pub struct CorrelationClient<H = ReqwestTransport> {
    endpoint: String,
    transport: H,
}

impl CorrelationClient<ReqwestTransport> {
    /// Client using the blocking HTTP transport.
    pub fn connect(endpoint: &str, timeout_ms: u64) -> Self {
        Self::new(endpoint, ReqwestTransport::new(timeout_ms))
    }
}

impl<H: HttpGet> CorrelationClient<H> {
    pub fn new(endpoint: &str, transport: H) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            transport,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &H {
        &self.transport
    }

    /// Send `request` and return the raw response body.
    pub fn fetch(&self, request: &FacetRequest, query: &str) -> CapyResult<Value> {
        let params = QueryBuilder::new(query).build(request);
        tracing::debug!(endpoint = %self.endpoint, params = ?params.as_slice(), "facet stats request");
        self.transport.get(&self.endpoint, &params)
    }

    /// Send `request` and extract the table or matrix its shape calls for.
    pub fn query(&self, request: &FacetRequest, query: &str) -> CapyResult<FacetResult> {
        let response = self.fetch(request, query)?;
        let kind = request.response_stats();
        match request.shape() {
            ResponseShape::Table { dimension } => {
                extract_table(&response, kind.as_str(), &dimension).map(FacetResult::Table)
            }
            ResponseShape::Matrix { row, column } => {
                extract_matrix(&response, kind.as_str(), &row, &column).map(FacetResult::Matrix)
            }
        }
    }

    /// Statistics per distinct value of `field`.
    pub fn facets(&self, field: &str, query: &str, limit: i64) -> CapyResult<FacetTable> {
        let request = FacetRequest::Facet {
            field: field.to_string(),
            limit,
        };
        self.table(&request, query)
    }

    /// Statistics per numeric bucket of `field`.
    pub fn ranges(
        &self,
        field: &str,
        query: &str,
        start: f64,
        end: f64,
        gap: f64,
    ) -> CapyResult<FacetTable> {
        self.table(&FacetRequest::range(field, start, end, gap), query)
    }

    /// Cross-tabulated statistics of `row` against `column`.
    pub fn pairs(
        &self,
        row: &str,
        column: &str,
        query: &str,
        row_limit: i64,
        column_limit: i64,
    ) -> CapyResult<FacetMatrix> {
        let request = FacetRequest::Pairs {
            row: row.to_string(),
            column: column.to_string(),
            row_limit,
            column_limit,
        };
        self.matrix(&request, query)
    }

    /// Spatial grid statistics of `field` inside `geom`.
    pub fn heatmap(&self, field: &str, query: &str, geom: &str, level: u32) -> CapyResult<FacetMatrix> {
        let request = FacetRequest::Heatmap {
            field: field.to_string(),
            geom: geom.to_string(),
            level,
        };
        self.matrix(&request, query)
    }

    /// Heatmap of `field` sampled into a `(vertical, horizontal)` point cloud.
    pub fn geo_heatmap_points(
        &self,
        field: &str,
        query: &str,
        geom: &str,
        level: u32,
    ) -> CapyResult<Vec<(f64, f64)>> {
        let matrix = self.heatmap(field, query, geom, level)?;
        sample_density(&matrix, &vertical_dimension(field), &horizontal_dimension(field))
    }

    fn table(&self, request: &FacetRequest, query: &str) -> CapyResult<FacetTable> {
        match self.query(request, query)? {
            FacetResult::Table(t) => Ok(t),
            FacetResult::Matrix(_) => Err(CapyError::InvalidInput(format!(
                "{request:?} does not produce a table"
            ))),
        }
    }

    fn matrix(&self, request: &FacetRequest, query: &str) -> CapyResult<FacetMatrix> {
        match self.query(request, query)? {
            FacetResult::Matrix(m) => Ok(m),
            FacetResult::Table(_) => Err(CapyError::InvalidInput(format!(
                "{request:?} does not produce a matrix"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell;

    /// Replays one canned body and records what was asked.
    struct Canned {
        body: Value,
        seen: RefCell<Vec<QueryParams>>,
    }

    impl Canned {
        fn new(body: Value) -> Self {
            Self {
                body,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl HttpGet for Canned {
        fn get(&self, endpoint: &str, params: &QueryParams) -> CapyResult<Value> {
            assert_eq!(endpoint, "http://solr/select");
            self.seen.borrow_mut().push(params.clone());
            Ok(self.body.clone())
        }
    }

    struct Down;

    impl HttpGet for Down {
        fn get(&self, _: &str, _: &QueryParams) -> CapyResult<Value> {
            Err(CapyError::Transport("connection refused".into()))
        }
    }

    #[test]
    fn test_transport_builds_with_timeout() {
        let transport = ReqwestTransport::new(250);
        let client = CorrelationClient::new("http://solr/select", transport);
        assert_eq!(client.endpoint(), "http://solr/select");
    }

    #[test]
    fn test_rejected_client_config_falls_back() {
        let builder = reqwest::blocking::Client::builder().user_agent("capy\n/0");
        let _client = build_or_fallback(builder);
    }

    #[test]
    fn test_facets_round_trip() {
        let body = json!({"facet_stats": {
            "dims": {"color": [{"id": "red"}, {"id": "blue"}]},
            "stats": {"default": {"color": [
                {"correlation": 0.8, "count": 120},
                {"correlation": 0.2, "count": 40}
            ]}}
        }});
        let transport = Canned::new(body);
        let client = CorrelationClient::new("http://solr/select", &transport);
        let table = client.facets("color", "make:ford", 25).unwrap();
        assert_eq!(table.labels, vec!["red", "blue"]);
        let seen = transport.seen.borrow();
        assert_eq!(seen[0].get("facet.limit"), Some("25"));
        assert_eq!(seen[0].get("q"), Some("make:ford"));
    }

    #[test]
    fn test_pairs_keeps_dimension_order() {
        let body = json!({"facet_stats": {
            "dims": {
                "b": [{"id": "z"}, {"id": "y"}],
                "a": [{"id": "q"}]
            },
            "stats": {"pairs": {"b": [
                {"a": [{"correlation": 0.1, "count": 1}]},
                {"a": [{"correlation": 0.2, "count": 2}]}
            ]}}
        }});
        let client = CorrelationClient::new("http://solr/select", Canned::new(body));
        let m = client.pairs("b", "a", "*:*", 10, 10).unwrap();
        assert_eq!(m.row_labels, vec!["z", "y"]);
        assert_eq!(m.column_labels, vec!["q"]);
        assert_eq!(m.shape(), (2, 1));
    }

    #[test]
    fn test_heatmap_reads_heatmap_block() {
        let body = json!({"facet_stats": {
            "dims": {
                "loc_vertical": [{"id": "0, 1"}],
                "loc_horizontal": [{"id": "5, 6"}, {"id": "6, 7"}]
            },
            "stats": {"heatmap": {"loc_vertical": [
                {"loc_horizontal": [{"correlation": 0.0, "count": 0}, {"correlation": 0.15, "count": 3}]}
            ]}}
        }});
        let transport = Canned::new(body);
        let client = CorrelationClient::new("http://solr/select", &transport);
        let points = client.geo_heatmap_points("loc", "*:*", "box", 2).unwrap();
        assert_eq!(points, vec![(0.0, 6.0)]);
        let seen = transport.seen.borrow();
        assert_eq!(seen[0].get("facet.stats"), Some("default"));
        assert_eq!(seen[0].get("facet.heatmap.gridLevel"), Some("2"));
    }

    #[test]
    fn test_transport_error_propagates() {
        let client = CorrelationClient::new("http://solr/select", Down);
        let err = client.facets("color", "*:*", 10).unwrap_err();
        assert!(matches!(err, CapyError::Transport(_)));
    }

    #[test]
    fn test_query_dispatches_on_shape() {
        let body = json!({"facet_stats": {
            "dims": {"year": [{"id": 1990.0}]},
            "stats": {"default": {"year": [{"correlation": 0.3, "count": 9}]}}
        }});
        let client = CorrelationClient::new("http://solr/select", Canned::new(body));
        let result = client
            .query(&FacetRequest::range("year", 1990.0, 2000.0, 10.0), "*:*")
            .unwrap();
        match result {
            FacetResult::Table(t) => assert_eq!(t.labels, vec!["1990.0"]),
            FacetResult::Matrix(_) => panic!("expected a table"),
        }
    }
}
