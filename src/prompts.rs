//! Instruction text sent to the enhancement and repair backends.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — the enhancement backends are
//!    instruction-following image models; changing how we phrase "make the
//!    text sharper" changes output quality, and that tuning should happen
//!    in exactly one place.
//!
//! 2. **Testability** — the region-scoped prompt embeds pixel offsets, and
//!    unit tests can check that construction without a live backend.
//!
//! Callers can override the whole-image prompt via
//! [`crate::config::RestoreConfig::enhancement_prompt`]; the constants here
//! are used only when no override is provided.

use crate::types::PixelRect;

/// Default instruction for whole-image enhancement.
pub const DEFAULT_ENHANCEMENT_PROMPT: &str = "Make the text in this image \
clearer and easier to read. Increase resolution and repair any blurred \
characters while preserving the original content and layout.";

/// Instruction for repairing the full image when no region is given.
pub const WHOLE_IMAGE_REPAIR_PROMPT: &str = "Make all text in this image \
clearer, sharper and more legible. Repair any blurred, distorted or \
low-resolution characters while preserving the original content and layout.";

/// Build the instruction for repairing one cropped region.
///
/// The phrasing references the region's pixel offset and size within the
/// full image so the backend has spatial context for the crop it receives.
/// This only affects prompt text; success and failure handling is identical
/// to the whole-image case.
pub fn region_repair_prompt(rect: &PixelRect) -> String {
    format!(
        "Focus on the text region at offset ({}, {}) with size {}x{}. \
         Make the characters in this specific region clearer, sharper and \
         more legible. Repair any blurred or distorted characters.",
        rect.x, rect.y, rect.width, rect.height
    )
}
