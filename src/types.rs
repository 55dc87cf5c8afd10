//! Core data model: text blocks, rectangles, enhancement results and the
//! assembled pipeline output.
//!
//! [`TextBlock::position`] is deliberately kept as the raw coordinate list
//! received from the detection backend rather than a validated rectangle
//! type. A block with a malformed position (wrong arity, non-monotonic
//! bounds) must still appear in the final text list — only the repair loop
//! filters it out — so validation happens at the point of use via
//! [`TextBlock::rect`], not at construction.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Text blocks ──────────────────────────────────────────────────────────

/// One detected span of text with its confidence and normalized bounds.
///
/// Created by the detection adapter from a single detection pass and
/// immutable afterwards: repairing the pixels under a block never changes
/// its `position` or `score`. The displayed confidence always reflects
/// *detection* quality, not post-repair quality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Recognized text, possibly empty.
    pub content: String,
    /// `[x1, y1, x2, y2]` fractional coordinates relative to image size.
    /// Kept raw (any arity) so malformed blocks survive into the text list.
    pub position: Vec<f64>,
    /// Detection confidence in `[0, 1]`.
    pub score: f64,
}

impl TextBlock {
    pub fn new(content: impl Into<String>, position: Vec<f64>, score: f64) -> Self {
        Self {
            content: content.into(),
            position,
            score,
        }
    }

    /// Validate the position into a well-formed rectangle.
    ///
    /// Returns `None` for any position a repair crop must never see:
    /// wrong arity, non-finite values, or non-monotonic bounds
    /// (`x1 >= x2` or `y1 >= y2`).
    pub fn rect(&self) -> Option<Rect> {
        match self.position.as_slice() {
            &[x1, y1, x2, y2] => {
                let all_finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
                if all_finite && x1 < x2 && y1 < y2 {
                    Some(Rect { x1, y1, x2, y2 })
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// A well-formed normalized rectangle: `x1 < x2`, `y1 < y2`, coordinates
/// fractional relative to image width/height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect {
    /// Project onto a concrete image, clamping to its bounds.
    ///
    /// Returns `None` if the clamped region is empty (rectangle entirely
    /// outside the image, or degenerate after rounding).
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<PixelRect> {
        let w = width as f64;
        let h = height as f64;
        let px1 = (self.x1.clamp(0.0, 1.0) * w).floor() as u32;
        let py1 = (self.y1.clamp(0.0, 1.0) * h).floor() as u32;
        let px2 = ((self.x2.clamp(0.0, 1.0) * w).ceil() as u32).min(width);
        let py2 = ((self.y2.clamp(0.0, 1.0) * h).ceil() as u32).min(height);
        if px2 <= px1 || py2 <= py1 {
            return None;
        }
        Some(PixelRect {
            x: px1,
            y: py1,
            width: px2 - px1,
            height: py2 - py1,
        })
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// A non-empty pixel rectangle inside a concrete image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

// ── Enhancement results ──────────────────────────────────────────────────

/// Which backend actually produced an enhancement result.
///
/// Used for UI attribution ("restored with …") and for audit in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnhancementMethod {
    /// The preferred local enhancement backend.
    PrimaryLocal,
    /// A second local backend, when one is configured.
    SecondaryLocal,
    /// The cloud fallback (requires a credential).
    Cloud,
    /// No backend succeeded; the input bytes were returned unchanged.
    IdentityFallback,
}

impl fmt::Display for EnhancementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EnhancementMethod::PrimaryLocal => "primary-local",
            EnhancementMethod::SecondaryLocal => "secondary-local",
            EnhancementMethod::Cloud => "cloud",
            EnhancementMethod::IdentityFallback => "identity-fallback",
        };
        f.write_str(s)
    }
}

/// Outcome of one enhancement or repair attempt.
///
/// Created fresh per adapter call and never merged: the orchestrator keeps
/// at most one current working image plus the latest result's metadata.
#[derive(Debug, Clone)]
pub struct EnhancementResult {
    /// The produced image bytes, or `None` on failure.
    pub image: Option<Vec<u8>>,
    /// Which backend produced the result.
    pub method: EnhancementMethod,
    pub success: bool,
    pub error: Option<String>,
}

impl EnhancementResult {
    /// A successful result from the given backend.
    pub fn ok(image: Vec<u8>, method: EnhancementMethod) -> Self {
        Self {
            image: Some(image),
            method,
            success: true,
            error: None,
        }
    }

    /// The identity fallback: input bytes unchanged, flagged unsuccessful.
    pub fn identity(original: &[u8], error: impl Into<String>) -> Self {
        Self {
            image: Some(original.to_vec()),
            method: EnhancementMethod::IdentityFallback,
            success: false,
            error: Some(error.into()),
        }
    }
}

// ── Service availability ─────────────────────────────────────────────────

/// Result of one availability probe. Ephemeral: recomputed on demand,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub available: bool,
    /// Version reported by the backend's health endpoint, when present.
    pub version: Option<String>,
    /// Human-readable reason when unavailable.
    pub error: Option<String>,
}

impl AvailabilityRecord {
    pub fn up(version: impl Into<String>) -> Self {
        Self {
            available: true,
            version: Some(version.into()),
            error: None,
        }
    }

    pub fn down(error: impl Into<String>) -> Self {
        Self {
            available: false,
            version: None,
            error: Some(error.into()),
        }
    }
}

/// Availability of every backend the pipeline depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub detection: AvailabilityRecord,
    pub enhancement: AvailabilityRecord,
    pub repair: AvailabilityRecord,
}

impl ServiceStatus {
    pub fn all_available(&self) -> bool {
        self.detection.available && self.enhancement.available && self.repair.available
    }

    /// One line per backend, suitable for a status display.
    pub fn report(&self) -> String {
        let line = |name: &str, rec: &AvailabilityRecord| -> String {
            if rec.available {
                format!(
                    "✅ {name}: running (v{})",
                    rec.version.as_deref().unwrap_or("unknown")
                )
            } else {
                format!(
                    "❌ {name}: {}",
                    rec.error.as_deref().unwrap_or("not checked")
                )
            }
        };
        [
            line("detection", &self.detection),
            line("enhancement", &self.enhancement),
            line("repair", &self.repair),
        ]
        .join("\n")
    }
}

// ── Pipeline output ──────────────────────────────────────────────────────

/// The assembled result of a full restoration run.
#[derive(Debug, Clone)]
pub struct RestoreOutput {
    /// The final working image after whole-image enhancement and all
    /// region repairs.
    pub final_image: Vec<u8>,
    /// The original detection result, scores unmodified. Empty when
    /// detection found nothing or no detection was possible.
    pub text_blocks: Vec<TextBlock>,
    /// Which backend produced the whole-image enhancement.
    pub enhancement_method: EnhancementMethod,
    pub stats: RestoreStats,
}

/// Per-run accounting, mirrored into logs at the end of each run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStats {
    /// Blocks returned by detection (including malformed ones).
    pub blocks_detected: usize,
    /// Blocks selected for repair (low score, well-formed rectangle).
    pub regions_selected: usize,
    /// Regions whose repaired patch was pasted into the working image.
    pub regions_repaired: usize,
    /// Selected regions whose repair failed; working image left unchanged.
    pub regions_failed: usize,
    pub detect_duration_ms: u64,
    pub enhance_duration_ms: u64,
    pub repair_duration_ms: u64,
    pub total_duration_ms: u64,
}
