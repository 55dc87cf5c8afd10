//! Availability probe: bounded-time liveness check against a backend's
//! `/health` endpoint.
//!
//! A single probe is authoritative for the caller's current decision —
//! there are no retries. Network failure, timeout, and non-success HTTP
//! status all map to `available=false` with a human-readable reason, so
//! preflight can name exactly what is wrong with each backend.

use crate::types::AvailabilityRecord;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Optional body returned by a healthy backend.
#[derive(Debug, Deserialize)]
struct HealthBody {
    version: Option<String>,
}

/// Probe `{base_url}/health`, bounded by `timeout`.
///
/// A `2xx` response yields `available=true` with the version parsed from
/// the body (defaulting to `"unknown"` when the body is absent, not JSON,
/// or carries no version field). Everything else yields `available=false`.
pub async fn probe(
    client: &Client,
    name: &str,
    base_url: &str,
    timeout: Duration,
) -> AvailabilityRecord {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    debug!("Probing {name} at {url}");

    let response = match client.get(&url).timeout(timeout).send().await {
        Ok(r) => r,
        Err(e) if e.is_timeout() => {
            return AvailabilityRecord::down(format!(
                "no response within {}s",
                timeout.as_secs()
            ));
        }
        Err(e) => {
            return AvailabilityRecord::down(format!("connection failed: {e}"));
        }
    };

    if !response.status().is_success() {
        return AvailabilityRecord::down(format!("HTTP {}", response.status()));
    }

    let version = match response.json::<HealthBody>().await {
        Ok(body) => body.version.unwrap_or_else(|| "unknown".to_string()),
        // A healthy service with a non-JSON health body is still healthy.
        Err(_) => "unknown".to_string(),
    };

    debug!("{name} is available (v{version})");
    AvailabilityRecord::up(version)
}
