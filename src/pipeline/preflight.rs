//! Preflight: availability gating before any pipeline work begins.
//!
//! This is a deliberately conservative policy. Partial availability is
//! treated as "not ready", not "degrade gracefully": the region-repair loop
//! specifically depends on the repair backend, so starting a run that can
//! detect but never repair would silently produce a worse result than the
//! caller asked for. If any required backend is down, the run fails here
//! and nothing downstream is ever called.

use crate::backend::{DetectionBackend, EnhancementBackend};
use crate::error::RestoreError;
use crate::types::ServiceStatus;
use tracing::{info, warn};

/// Query every required backend's health concurrently.
///
/// Produces the status record without judging it; [`gate`] turns a
/// not-all-available status into the fatal preflight error.
pub async fn check(
    detection: &dyn DetectionBackend,
    enhancement: &dyn EnhancementBackend,
    repair: &dyn EnhancementBackend,
) -> ServiceStatus {
    let (detection, enhancement, repair) =
        tokio::join!(detection.health(), enhancement.health(), repair.health());
    ServiceStatus {
        detection,
        enhancement,
        repair,
    }
}

/// Fail the run if any required backend is unavailable.
///
/// The error message names every unavailable backend and its probe reason,
/// so the caller can start exactly the missing service(s).
pub fn gate(status: &ServiceStatus) -> Result<(), RestoreError> {
    let mut down: Vec<String> = Vec::new();
    for (name, rec) in [
        ("detection", &status.detection),
        ("enhancement", &status.enhancement),
        ("repair", &status.repair),
    ] {
        if !rec.available {
            down.push(format!(
                "{name}: {}",
                rec.error.as_deref().unwrap_or("unavailable")
            ));
        }
    }

    if down.is_empty() {
        info!("Preflight passed: all backends available");
        Ok(())
    } else {
        let detail = down.join("; ");
        warn!("Preflight failed: {detail}");
        Err(RestoreError::BackendUnavailable { detail })
    }
}
