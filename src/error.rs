//! Error types for the textrestore library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`RestoreError`] — **Fatal**: the restoration run cannot proceed at all
//!   (a required backend failed its preflight probe, the input is not a
//!   decodable image, bad configuration). Returned as `Err(RestoreError)`
//!   from the top-level `restore*` functions.
//!
//! * [`BackendError`] — **Recoverable**: a single backend call failed
//!   (network error, malformed response, bad region geometry). Adapters
//!   convert these into "try the next backend" or "skip this region" and
//!   never let them escape their own call boundary; the pipeline keeps going.
//!
//! The separation encodes the failure policy of the pipeline itself: only
//! Preflight may kill a run, everything downstream degrades.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the textrestore library.
///
/// Individual backend-call failures use [`BackendError`] and are absorbed
/// inside the adapters' fallback chains rather than propagated here.
#[derive(Debug, Error)]
pub enum RestoreError {
    // ── Preflight errors ──────────────────────────────────────────────────
    /// One or more required backends failed their availability probe.
    ///
    /// `detail` names each unavailable backend and the probe's reason so the
    /// caller can remediate (typically: start the missing local service).
    #[error("Required backend(s) unavailable: {detail}\nStart the missing service(s) and retry.")]
    BackendUnavailable { detail: String },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input bytes could not be decoded as an image.
    #[error("Input is not a decodable image: {detail}")]
    ImageDecode { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A recoverable error from a single backend call or region operation.
///
/// Adapters map every variant to "this attempt failed, advance the fallback
/// chain" (whole-image enhancement, detection) or "skip this region and
/// continue" (the repair loop). None of these abort a run.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The HTTP call itself failed: connection refused, timeout, non-2xx.
    #[error("{backend}: call failed: {detail}")]
    CallFailed { backend: String, detail: String },

    /// The backend answered 2xx but the body did not match the expected
    /// shape. Treated exactly like a failed call for fallback purposes.
    #[error("{backend}: malformed response: {detail}")]
    MalformedResponse { backend: String, detail: String },

    /// A region rectangle produced an empty or out-of-bounds pixel area.
    /// The block is excluded from repair; it still appears in the text list.
    #[error("invalid region {rect:?}: {detail}")]
    InvalidRegion { rect: [f64; 4], detail: String },
}

impl BackendError {
    /// Shorthand used by the HTTP adapters.
    pub(crate) fn call(backend: &str, detail: impl std::fmt::Display) -> Self {
        BackendError::CallFailed {
            backend: backend.to_string(),
            detail: detail.to_string(),
        }
    }

    pub(crate) fn malformed(backend: &str, detail: impl std::fmt::Display) -> Self {
        BackendError::MalformedResponse {
            backend: backend.to_string(),
            detail: detail.to_string(),
        }
    }
}
