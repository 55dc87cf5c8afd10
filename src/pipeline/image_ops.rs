//! Image buffer operations: decode, sub-region crop, and sub-region paste.
//!
//! Crop and paste both return a *new* PNG buffer rather than mutating
//! their inputs. The orchestrator threads the working image through the
//! repair loop as an explicit accumulator, and keeping "before" and
//! "after" as distinct buffers is what makes the loop's last-write-wins
//! semantics observable in tests and safe against aliasing.
//!
//! PNG is used for every re-encode: the patches exist to carry repaired
//! text, and lossy artefacts on letterforms would undo the repair.

use crate::error::{BackendError, RestoreError};
use crate::types::{PixelRect, Rect};
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use tracing::debug;

/// Decode the run's input image. Failure here is fatal: nothing in the
/// pipeline can proceed without a pixel-accessible buffer.
pub fn decode_input(bytes: &[u8]) -> Result<DynamicImage, RestoreError> {
    image::load_from_memory(bytes).map_err(|e| RestoreError::ImageDecode {
        detail: e.to_string(),
    })
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| BackendError::malformed("image-buffer", format!("PNG encode: {e}")))?;
    Ok(buf)
}

fn decode_working(bytes: &[u8], what: &str) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(bytes)
        .map_err(|e| BackendError::malformed("image-buffer", format!("{what}: {e}")))
}

/// Extract the sub-region of `base` covered by the normalized `rect`.
///
/// Returns a fresh PNG buffer together with the pixel rectangle actually
/// cropped (the repair instruction references it). The rectangle is
/// clamped to the image; a region that clamps to nothing is an
/// [`BackendError::InvalidRegion`].
pub fn crop(base: &[u8], rect: &Rect) -> Result<(Vec<u8>, PixelRect), BackendError> {
    let img = decode_working(base, "crop source")?;
    let (width, height) = img.dimensions();
    let px = rect.to_pixels(width, height).ok_or_else(|| {
        BackendError::InvalidRegion {
            rect: rect.as_array(),
            detail: "zero-area crop after clamping".into(),
        }
    })?;

    debug!(
        "crop: {}x{}+{}+{} out of {width}x{height}",
        px.width, px.height, px.x, px.y
    );
    let region = img.crop_imm(px.x, px.y, px.width, px.height);
    Ok((encode_png(&region)?, px))
}

/// Compose `patch` onto `base` at the position given by `rect`, returning
/// a fresh PNG buffer; neither input changes.
///
/// The patch is drawn at its natural size anchored at the rectangle's
/// top-left corner. Backends normally return patches at the cropped size,
/// but a backend that resizes is tolerated: `overlay` clips at the image
/// edge rather than failing.
pub fn paste(base: &[u8], patch: &[u8], rect: &Rect) -> Result<Vec<u8>, BackendError> {
    let base_img = decode_working(base, "paste base")?;
    let patch_img = decode_working(patch, "paste patch")?;
    let (width, height) = base_img.dimensions();
    let px = rect.to_pixels(width, height).ok_or_else(|| {
        BackendError::InvalidRegion {
            rect: rect.as_array(),
            detail: "paste position outside image".into(),
        }
    })?;

    let mut composed = base_img;
    image::imageops::overlay(&mut composed, &patch_img, i64::from(px.x), i64::from(px.y));
    debug!(
        "paste: {}x{} patch at +{}+{}",
        patch_img.width(),
        patch_img.height(),
        px.x,
        px.y
    );
    encode_png(&composed)
}
