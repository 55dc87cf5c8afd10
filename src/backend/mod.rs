//! Backend capability traits and their network implementations.
//!
//! Every external capability the pipeline orchestrates sits behind one of
//! two `dyn`-safe async traits:
//!
//! * [`DetectionBackend`] — finds text blocks in an image
//! * [`EnhancementBackend`] — produces an improved version of an image
//!   (whole-image enhancement and region repair share this seam; a repair
//!   call is an enhancement call with a region-scoped instruction)
//!
//! The traits exist so the fallback chains in [`crate::pipeline`] can be
//! exercised in tests with in-process mocks, and so the cloud fallback can
//! slot into the same chain as the local HTTP services. Implementations
//! must map every failure into a [`BackendError`] — the adapters above
//! them rely on errors never escaping a call boundary as a panic.

use crate::error::BackendError;
use crate::types::{AvailabilityRecord, TextBlock};
use async_trait::async_trait;

pub mod cloud;
pub mod http;
pub mod probe;

pub use cloud::CloudBackend;
pub use http::{HttpDetectionBackend, HttpEnhancementBackend};
pub use probe::probe;

/// A text-detection capability.
#[async_trait]
pub trait DetectionBackend: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Detect text blocks in the given image bytes.
    ///
    /// An empty vector is a valid terminal result ("no text found"), not
    /// an error. Errors mean the backend could not be asked at all.
    async fn detect(&self, image: &[u8]) -> Result<Vec<TextBlock>, BackendError>;

    /// Bounded-time liveness check, used by preflight.
    ///
    /// The default reports availability: an in-process backend object has
    /// nothing to probe. Network implementations override this with a real
    /// probe against their `/health` endpoint.
    async fn health(&self) -> AvailabilityRecord {
        AvailabilityRecord::up("unknown")
    }
}

/// An image-enhancement capability, instruction-driven.
#[async_trait]
pub trait EnhancementBackend: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Produce an enhanced version of the image, guided by `prompt`.
    ///
    /// Returns the enhanced image bytes. Implementations never return an
    /// empty buffer on success.
    async fn enhance(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, BackendError>;

    /// Bounded-time liveness check, used by preflight.
    ///
    /// Same default as [`DetectionBackend::health`].
    async fn health(&self) -> AvailabilityRecord {
        AvailabilityRecord::up("unknown")
    }
}
