//! Configuration loading and resolution.

use capy::DEFAULT_TIMEOUT_MS;

/// Endpoint used when neither a flag nor the environment names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8983/solr/select";

/// Environment variable naming the statistics endpoint.
pub const ENDPOINT_ENV: &str = "CAPY_ENDPOINT";

/// Environment variable holding the request timeout in milliseconds.
pub const TIMEOUT_ENV: &str = "CAPY_TIMEOUT_MS";

/// Resolve the endpoint URL: explicit flag, then `CAPY_ENDPOINT`, then the default.
pub fn resolve_endpoint(explicit: Option<&str>) -> String {
    if let Some(endpoint) = explicit {
        return endpoint.to_string();
    }

    if let Ok(env_endpoint) = std::env::var(ENDPOINT_ENV) {
        if !env_endpoint.trim().is_empty() {
            return env_endpoint;
        }
    }

    DEFAULT_ENDPOINT.to_string()
}

/// Resolve the request timeout: explicit flag, then `CAPY_TIMEOUT_MS`, then the default.
///
/// An unparseable environment value is ignored with a warning.
pub fn resolve_timeout_ms(explicit: Option<u64>) -> u64 {
    if let Some(ms) = explicit {
        return ms;
    }

    match std::env::var(TIMEOUT_ENV) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring {TIMEOUT_ENV}={raw:?}: not a number of milliseconds");
            DEFAULT_TIMEOUT_MS
        }),
        Err(_) => DEFAULT_TIMEOUT_MS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so the environment is not mutated concurrently.
    #[test]
    fn test_resolution_order() {
        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(TIMEOUT_ENV);
        assert_eq!(resolve_endpoint(None), DEFAULT_ENDPOINT);
        assert_eq!(resolve_timeout_ms(None), DEFAULT_TIMEOUT_MS);

        std::env::set_var(ENDPOINT_ENV, "http://search:8983/solr/cars/select");
        std::env::set_var(TIMEOUT_ENV, "1500");
        assert_eq!(resolve_endpoint(None), "http://search:8983/solr/cars/select");
        assert_eq!(resolve_timeout_ms(None), 1500);

        assert_eq!(resolve_endpoint(Some("http://other/select")), "http://other/select");
        assert_eq!(resolve_timeout_ms(Some(10)), 10);

        std::env::set_var(TIMEOUT_ENV, "soon");
        assert_eq!(resolve_timeout_ms(None), DEFAULT_TIMEOUT_MS);

        std::env::remove_var(ENDPOINT_ENV);
        std::env::remove_var(TIMEOUT_ENV);
    }
}
