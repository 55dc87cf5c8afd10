//! Top-level restoration entry points and the pipeline state machine.
//!
//! One run moves through the states
//! `Preflight → Detecting&Enhancing → SelectingRegions → RepairingRegion(i)
//! → Assembling`, with failure possible at Preflight only. Everything
//! downstream of preflight degrades through the adapters' fallback chains
//! instead of failing the run.
//!
//! The working image is threaded through the repair loop as an explicit
//! accumulator: each iteration either replaces it with a freshly composed
//! buffer or leaves it untouched. Later repairs therefore operate on the
//! output of earlier ones; where rectangles overlap, the last write wins.

use crate::backend::{
    CloudBackend, DetectionBackend, EnhancementBackend, HttpDetectionBackend,
    HttpEnhancementBackend,
};
use crate::config::RestoreConfig;
use crate::error::RestoreError;
use crate::pipeline::{detect, enhance, image_ops, preflight, repair};
use crate::prompts::DEFAULT_ENHANCEMENT_PROMPT;
use crate::types::{
    EnhancementMethod, RestoreOutput, RestoreStats, ServiceStatus, TextBlock,
};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The full set of backends a run orchestrates, resolved once per run.
struct ResolvedBackends {
    detection: Arc<dyn DetectionBackend>,
    detection_fallback: Option<Arc<dyn DetectionBackend>>,
    enhancement: Arc<dyn EnhancementBackend>,
    cloud_enhancement: Option<Arc<dyn EnhancementBackend>>,
    repair: Arc<dyn EnhancementBackend>,
}

/// Resolve each backend slot, from most-specific to least-specific:
/// a pre-constructed backend injected on the config wins, otherwise an
/// HTTP client is built from the configured URL. The cloud slots resolve
/// to `None` without a credential — that disables the cloud branches of
/// the fallback chains, it is not an error.
fn resolve_backends(config: &RestoreConfig) -> Result<ResolvedBackends, RestoreError> {
    let client = reqwest::Client::builder()
        .build()
        .map_err(|e| RestoreError::Internal(format!("HTTP client: {e}")))?;
    let probe_timeout = Duration::from_secs(config.probe_timeout_secs);

    let detection: Arc<dyn DetectionBackend> = match &config.detection {
        Some(b) => Arc::clone(b),
        None => Arc::new(HttpDetectionBackend::new(
            client.clone(),
            config.detection_url.clone(),
            probe_timeout,
        )),
    };

    let cloud = config.cloud_api_key.as_ref().map(|key| {
        Arc::new(CloudBackend::new(
            client.clone(),
            config.cloud_api_base.clone(),
            key.clone(),
        ))
    });

    let detection_fallback: Option<Arc<dyn DetectionBackend>> =
        match (&config.detection_fallback, &cloud) {
            (Some(b), _) => Some(Arc::clone(b)),
            (None, Some(c)) => Some(Arc::clone(c) as Arc<dyn DetectionBackend>),
            (None, None) => None,
        };

    let enhancement: Arc<dyn EnhancementBackend> = match &config.enhancement {
        Some(b) => Arc::clone(b),
        None => Arc::new(HttpEnhancementBackend::new(
            client.clone(),
            config.enhancement_url.clone(),
            "enhancement",
            probe_timeout,
        )),
    };

    let cloud_enhancement: Option<Arc<dyn EnhancementBackend>> =
        match (&config.cloud_enhancement, &cloud) {
            (Some(b), _) => Some(Arc::clone(b)),
            (None, Some(c)) => Some(Arc::clone(c) as Arc<dyn EnhancementBackend>),
            (None, None) => None,
        };

    let repair: Arc<dyn EnhancementBackend> = match &config.repair {
        Some(b) => Arc::clone(b),
        None => Arc::new(HttpEnhancementBackend::new(
            client,
            config.repair_url.clone(),
            "repair",
            probe_timeout,
        )),
    };

    Ok(ResolvedBackends {
        detection,
        detection_fallback,
        enhancement,
        cloud_enhancement,
        repair,
    })
}

/// Restore a text image: enhance the whole image, then iteratively repair
/// each low-confidence text region.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `image`  — Raw bytes of the input image (any format the `image`
///   crate can decode)
/// * `config` — Run configuration
///
/// # Returns
/// `Ok(RestoreOutput)` on success, even when enhancement fell all the way
/// back to the identity transform or individual region repairs failed
/// (check `output.enhancement_method` and `output.stats`).
///
/// # Errors
/// Returns `Err(RestoreError)` only for fatal conditions:
/// - a required backend failed its preflight probe
/// - the input bytes are not a decodable image
pub async fn restore(
    image: &[u8],
    config: &RestoreConfig,
) -> Result<RestoreOutput, RestoreError> {
    let total_start = Instant::now();

    // Validate the input before touching the network.
    let decoded = image_ops::decode_input(image)?;
    info!(
        "Starting restoration: {}x{} input, {} bytes",
        decoded.width(),
        decoded.height(),
        image.len()
    );
    drop(decoded);

    let backends = resolve_backends(config)?;

    // ── Preflight ────────────────────────────────────────────────────────
    let status = preflight::check(
        backends.detection.as_ref(),
        backends.enhancement.as_ref(),
        backends.repair.as_ref(),
    )
    .await;
    preflight::gate(&status)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_preflight_complete();
    }

    // ── Detecting & Enhancing ────────────────────────────────────────────
    // Independent of each other's output; both read the original bytes.
    let prompt = config
        .enhancement_prompt
        .as_deref()
        .unwrap_or(DEFAULT_ENHANCEMENT_PROMPT);

    let stage_start = Instant::now();
    let enhancement_chain = [
        Some((backends.enhancement.as_ref(), EnhancementMethod::PrimaryLocal)),
        backends
            .cloud_enhancement
            .as_deref()
            .map(|c| (c, EnhancementMethod::Cloud)),
    ];
    let (detection_outcome, enhancement_result) = tokio::join!(
        detect::detect_with_fallback(
            backends.detection.as_ref(),
            backends.detection_fallback.as_deref(),
            image,
        ),
        enhance::enhance_with_fallback(&enhancement_chain, image, prompt),
    );
    let detect_enhance_ms = stage_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_detection_complete(detection_outcome.as_ref().map(Vec::len));
        cb.on_enhancement_complete(enhancement_result.method, enhancement_result.success);
    }

    let enhancement_method = enhancement_result.method;
    // Absent bytes despite success means "no change"; keep the original.
    let mut working: Vec<u8> = enhancement_result
        .image
        .unwrap_or_else(|| image.to_vec());

    let text_blocks: Vec<TextBlock> = match detection_outcome {
        Some(blocks) => blocks,
        None => {
            warn!("No detection possible; skipping the repair loop");
            Vec::new()
        }
    };
    info!(
        "Detection: {} block(s); enhancement via {}",
        text_blocks.len(),
        enhancement_method
    );

    // ── Selecting regions ────────────────────────────────────────────────
    // Positions were computed on the pre-enhancement image and are reused
    // against the enhanced one; this assumes enhancement preserves layout
    // and aspect ratio. Malformed rectangles are excluded here but stay in
    // the returned text list.
    let candidates: Vec<&TextBlock> = text_blocks
        .iter()
        .filter(|b| b.score < config.score_threshold && b.rect().is_some())
        .collect();
    debug!(
        "{} of {} block(s) selected for repair (score < {})",
        candidates.len(),
        text_blocks.len(),
        config.score_threshold
    );

    // ── Repairing regions ────────────────────────────────────────────────
    // Strictly sequential: each iteration reads and replaces the single
    // working buffer, so later repairs see earlier patches.
    let repair_start = Instant::now();
    let total = candidates.len();
    let mut regions_repaired = 0usize;
    let mut regions_failed = 0usize;

    for (i, block) in candidates.iter().enumerate() {
        if let Some(ref cb) = config.progress_callback {
            cb.on_region_start(i, total);
        }
        // Selection guaranteed a well-formed rectangle.
        let rect = match block.rect() {
            Some(r) => r,
            None => continue,
        };

        let (patch, px) = match image_ops::crop(&working, &rect) {
            Ok(cropped) => cropped,
            Err(e) => {
                warn!("Region {}/{total}: crop failed: {e}", i + 1);
                regions_failed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_region_failed(i, total, &e.to_string());
                }
                continue;
            }
        };

        let repaired = repair::repair_region(backends.repair.as_ref(), &patch, Some(&px)).await;
        match repaired.image.filter(|_| repaired.success) {
            Some(patch_bytes) => match image_ops::paste(&working, &patch_bytes, &rect) {
                Ok(composed) => {
                    working = composed;
                    regions_repaired += 1;
                    debug!("Region {}/{total}: repaired and pasted", i + 1);
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_region_repaired(i, total);
                    }
                }
                Err(e) => {
                    warn!("Region {}/{total}: paste failed: {e}", i + 1);
                    regions_failed += 1;
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_region_failed(i, total, &e.to_string());
                    }
                }
            },
            None => {
                // Repair failed; the working image is unchanged for this
                // region and the loop continues.
                regions_failed += 1;
                if let Some(ref cb) = config.progress_callback {
                    cb.on_region_failed(
                        i,
                        total,
                        repaired.error.as_deref().unwrap_or("repair failed"),
                    );
                }
            }
        }
    }
    let repair_duration_ms = repair_start.elapsed().as_millis() as u64;

    // ── Assembling ───────────────────────────────────────────────────────
    let stats = RestoreStats {
        blocks_detected: text_blocks.len(),
        regions_selected: total,
        regions_repaired,
        regions_failed,
        // Detection and enhancement overlap in time; both get the stage's
        // wall-clock duration.
        detect_duration_ms: detect_enhance_ms,
        enhance_duration_ms: detect_enhance_ms,
        repair_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Restoration complete: {}/{} region(s) repaired, {}ms total",
        regions_repaired, total, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(regions_repaired, regions_failed);
    }

    Ok(RestoreOutput {
        final_image: working,
        text_blocks,
        enhancement_method,
        stats,
    })
}

/// Query every required backend's availability without starting a run.
///
/// Ephemeral: probes are recomputed on every call and never cached.
pub async fn check_services(config: &RestoreConfig) -> Result<ServiceStatus, RestoreError> {
    let backends = resolve_backends(config)?;
    Ok(preflight::check(
        backends.detection.as_ref(),
        backends.enhancement.as_ref(),
        backends.repair.as_ref(),
    )
    .await)
}

/// Restore an image read from a file.
pub async fn restore_from_file(
    input_path: impl AsRef<Path>,
    config: &RestoreConfig,
) -> Result<RestoreOutput, RestoreError> {
    let path = input_path.as_ref();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| RestoreError::FileNotFound {
            path: path.to_path_buf(),
        })?;
    restore(&bytes, config).await
}

/// Restore an image and write the final image directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn restore_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &RestoreConfig,
) -> Result<RestoreOutput, RestoreError> {
    let output = restore_from_file(input_path, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RestoreError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                }
            })?;
        }
    }

    let tmp_path = path.with_extension("png.tmp");
    tokio::fs::write(&tmp_path, &output.final_image)
        .await
        .map_err(|e| RestoreError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| RestoreError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`restore`].
///
/// Creates a temporary tokio runtime internally.
pub fn restore_sync(
    image: &[u8],
    config: &RestoreConfig,
) -> Result<RestoreOutput, RestoreError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| RestoreError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(restore(image, config))
}
