//! Region Repair Adapter: targeted sub-region enhancement.
//!
//! Same never-fail, always-fallback-to-identity contract as the
//! whole-image chain, but scoped to a single backend: no cloud fallback
//! exists for region repair, so an unreachable backend degrades straight
//! to the identity transform. The orchestrator interprets an identity
//! result as "leave the working image unchanged for this region".
//!
//! The instruction differs when a pixel rectangle is known (region-scoped
//! phrasing referencing offset and size) versus absent (whole-image
//! phrasing). That is a prompt detail only; success and failure handling
//! are identical on both paths.

use crate::backend::EnhancementBackend;
use crate::prompts::{region_repair_prompt, WHOLE_IMAGE_REPAIR_PROMPT};
use crate::types::{EnhancementMethod, EnhancementResult, PixelRect};
use tracing::{debug, warn};

/// Repair one cropped region (or, with `rect = None`, the whole image).
pub async fn repair_region(
    backend: &dyn EnhancementBackend,
    patch: &[u8],
    rect: Option<&PixelRect>,
) -> EnhancementResult {
    let prompt = match rect {
        Some(r) => region_repair_prompt(r),
        None => WHOLE_IMAGE_REPAIR_PROMPT.to_string(),
    };

    match backend.enhance(patch, &prompt).await {
        Ok(bytes) => {
            debug!("{}: region repaired ({} bytes)", backend.name(), bytes.len());
            EnhancementResult::ok(bytes, EnhancementMethod::PrimaryLocal)
        }
        Err(e) => {
            warn!("{}: region repair failed: {e}", backend.name());
            EnhancementResult::identity(patch, e.to_string())
        }
    }
}
