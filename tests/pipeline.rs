//! End-to-end pipeline tests over in-process mock backends.
//!
//! No network: every backend is an `Arc<dyn …Backend>` injected through
//! the config, scripted per test. The fixtures are tiny solid-colour PNGs
//! so region geometry can be asserted pixel by pixel.

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use textrestore::{
    restore, AvailabilityRecord, BackendError, DetectionBackend, EnhancementBackend,
    EnhancementMethod, RestoreConfig, RestoreError, TextBlock,
};

// ── Fixtures ─────────────────────────────────────────────────────────────────

const RED: [u8; 4] = [255, 0, 0, 255];
const GREEN: [u8; 4] = [0, 255, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];

fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(rgba)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode fixture");
    buf
}

fn block(score: f64, position: Vec<f64>) -> TextBlock {
    TextBlock::new(format!("block@{score}"), position, score)
}

// ── Mock backends ────────────────────────────────────────────────────────────

struct MockDetector {
    outcome: Result<Vec<TextBlock>, ()>,
    health: AvailabilityRecord,
    calls: AtomicUsize,
}

impl MockDetector {
    fn returning(blocks: Vec<TextBlock>) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(blocks),
            health: AvailabilityRecord::up("test"),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(()),
            health: AvailabilityRecord::up("test"),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl DetectionBackend for MockDetector {
    fn name(&self) -> &str {
        "mock-detection"
    }

    async fn detect(&self, _image: &[u8]) -> Result<Vec<TextBlock>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome
            .clone()
            .map_err(|_| BackendError::CallFailed {
                backend: "mock-detection".into(),
                detail: "scripted failure".into(),
            })
    }

    async fn health(&self) -> AvailabilityRecord {
        self.health.clone()
    }
}

/// Scripted enhancement/repair backend.
enum EnhanceScript {
    /// Return these exact bytes.
    Fixed(Vec<u8>),
    /// Return a solid-colour PNG matching the input's dimensions.
    SolidSameSize([u8; 4]),
    /// Fail every call.
    Fail,
}

struct MockEnhancer {
    script: EnhanceScript,
    health: AvailabilityRecord,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockEnhancer {
    fn new(script: EnhanceScript) -> Arc<Self> {
        Self::with_health(script, AvailabilityRecord::up("test"))
    }

    fn with_health(script: EnhanceScript, health: AvailabilityRecord) -> Arc<Self> {
        Arc::new(Self {
            script,
            health,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnhancementBackend for MockEnhancer {
    fn name(&self) -> &str {
        "mock-enhancer"
    }

    async fn enhance(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.script {
            EnhanceScript::Fixed(bytes) => Ok(bytes.clone()),
            EnhanceScript::SolidSameSize(rgba) => {
                let img = image::load_from_memory(image).map_err(|e| {
                    BackendError::MalformedResponse {
                        backend: "mock-enhancer".into(),
                        detail: e.to_string(),
                    }
                })?;
                let (w, h) = img.dimensions();
                Ok(png(w, h, *rgba))
            }
            EnhanceScript::Fail => Err(BackendError::CallFailed {
                backend: "mock-enhancer".into(),
                detail: "scripted failure".into(),
            }),
        }
    }

    async fn health(&self) -> AvailabilityRecord {
        self.health.clone()
    }
}

fn config_with(
    detection: Arc<MockDetector>,
    enhancement: Arc<MockEnhancer>,
    repair: Arc<MockEnhancer>,
) -> RestoreConfig {
    RestoreConfig::builder()
        .detection(detection)
        .enhancement(enhancement)
        .repair(repair)
        .build()
        .expect("valid config")
}

// ── Preflight gating ─────────────────────────────────────────────────────────

#[tokio::test]
async fn preflight_failure_names_backend_and_stops_before_any_call() {
    let detection = MockDetector::returning(vec![]);
    let enhancement = MockEnhancer::with_health(
        EnhanceScript::Fixed(png(10, 10, GREEN)),
        AvailabilityRecord::down("connection refused"),
    );
    let repair = MockEnhancer::new(EnhanceScript::Fail);
    let config = config_with(
        Arc::clone(&detection),
        Arc::clone(&enhancement),
        Arc::clone(&repair),
    );

    let err = restore(&png(10, 10, RED), &config).await.unwrap_err();

    match err {
        RestoreError::BackendUnavailable { ref detail } => {
            assert!(detail.contains("enhancement"), "got: {detail}");
            assert!(detail.contains("connection refused"), "got: {detail}");
            assert!(!detail.contains("detection:"), "got: {detail}");
        }
        other => panic!("expected BackendUnavailable, got {other:?}"),
    }

    // The pipeline never started: no detect or enhance calls were issued.
    assert_eq!(detection.calls.load(Ordering::SeqCst), 0);
    assert_eq!(enhancement.call_count(), 0);
    assert_eq!(repair.call_count(), 0);
}

#[tokio::test]
async fn undecodable_input_fails_before_preflight() {
    let config = config_with(
        MockDetector::returning(vec![]),
        MockEnhancer::new(EnhanceScript::Fail),
        MockEnhancer::new(EnhanceScript::Fail),
    );
    let err = restore(b"not an image", &config).await.unwrap_err();
    assert!(matches!(err, RestoreError::ImageDecode { .. }));
}

// ── Fallback completeness ────────────────────────────────────────────────────

#[tokio::test]
async fn all_enhancement_failures_yield_identity_with_input_bytes() {
    let input = png(20, 20, RED);
    // High-confidence block: the repair loop must not touch the image.
    let detection = MockDetector::returning(vec![block(0.95, vec![0.1, 0.1, 0.5, 0.5])]);
    let config = config_with(
        detection,
        MockEnhancer::new(EnhanceScript::Fail),
        MockEnhancer::new(EnhanceScript::Fail),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(out.enhancement_method, EnhancementMethod::IdentityFallback);
    assert_eq!(out.final_image, input, "identity fallback returns input bytes");
}

#[tokio::test]
async fn failed_detection_still_produces_an_image() {
    let input = png(20, 20, RED);
    let enhanced = png(20, 20, GREEN);
    let config = config_with(
        MockDetector::failing(),
        MockEnhancer::new(EnhanceScript::Fixed(enhanced.clone())),
        MockEnhancer::new(EnhanceScript::Fail),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert!(out.text_blocks.is_empty());
    assert_eq!(out.final_image, enhanced);
    assert_eq!(out.enhancement_method, EnhancementMethod::PrimaryLocal);
    assert_eq!(out.stats.blocks_detected, 0);
}

// ── Repair idempotence on high-confidence input ──────────────────────────────

#[tokio::test]
async fn high_confidence_blocks_skip_the_repair_loop() {
    let input = png(50, 50, RED);
    let enhanced = png(50, 50, GREEN);
    let detection = MockDetector::returning(vec![
        block(0.7, vec![0.0, 0.0, 0.5, 0.5]), // exactly at threshold: not repaired
        block(0.95, vec![0.5, 0.5, 1.0, 1.0]),
    ]);
    let repair = MockEnhancer::new(EnhanceScript::SolidSameSize(BLUE));
    let config = config_with(
        detection,
        MockEnhancer::new(EnhanceScript::Fixed(enhanced.clone())),
        Arc::clone(&repair),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(repair.call_count(), 0, "no crop/repair/paste calls");
    assert_eq!(
        out.final_image, enhanced,
        "final image equals the post-enhancement image exactly"
    );
    assert_eq!(out.stats.regions_selected, 0);
}

// ── Malformed-rectangle exclusion ────────────────────────────────────────────

#[tokio::test]
async fn malformed_rectangle_is_listed_but_never_repaired() {
    let input = png(50, 50, RED);
    let detection = MockDetector::returning(vec![
        block(0.3, vec![0.1, 0.1, 0.4]),            // wrong arity
        block(0.3, vec![0.6, 0.6, 0.2, 0.9]),       // non-monotonic
        block(0.3, vec![0.1, 0.1, 0.4, 0.4]),       // the only repairable one
    ]);
    let repair = MockEnhancer::new(EnhanceScript::SolidSameSize(BLUE));
    let config = config_with(
        detection,
        MockEnhancer::new(EnhanceScript::Fixed(png(50, 50, GREEN))),
        Arc::clone(&repair),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(out.text_blocks.len(), 3, "malformed blocks stay in the list");
    assert_eq!(repair.call_count(), 1, "only the well-formed block is repaired");
    assert_eq!(out.stats.regions_selected, 1);
    assert_eq!(out.stats.regions_repaired, 1);
}

// ── Sequential composition ───────────────────────────────────────────────────

#[tokio::test]
async fn two_non_overlapping_regions_compose_in_block_order() {
    let input = png(100, 100, RED);
    let enhanced = png(100, 100, GREEN);
    let detection = MockDetector::returning(vec![
        block(0.4, vec![0.0, 0.0, 0.2, 0.2]),
        block(0.5, vec![0.8, 0.8, 1.0, 1.0]),
    ]);
    let repair = MockEnhancer::new(EnhanceScript::SolidSameSize(BLUE));
    let config = config_with(
        detection,
        MockEnhancer::new(EnhanceScript::Fixed(enhanced)),
        Arc::clone(&repair),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(repair.call_count(), 2);
    assert_eq!(out.stats.regions_repaired, 2);

    let img = image::load_from_memory(&out.final_image)
        .expect("decode final image")
        .to_rgba8();
    assert_eq!(img.get_pixel(5, 5).0, BLUE, "first patch applied");
    assert_eq!(img.get_pixel(90, 90).0, BLUE, "second patch applied");
    assert_eq!(img.get_pixel(50, 50).0, GREEN, "between the patches: enhanced");
}

#[tokio::test]
async fn one_failed_region_does_not_abort_the_loop() {
    let input = png(100, 100, RED);

    /// Fails the first call, solid blue afterwards.
    struct FlakyRepair {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EnhancementBackend for FlakyRepair {
        fn name(&self) -> &str {
            "flaky-repair"
        }

        async fn enhance(&self, image: &[u8], _prompt: &str) -> Result<Vec<u8>, BackendError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(BackendError::CallFailed {
                    backend: "flaky-repair".into(),
                    detail: "first call fails".into(),
                });
            }
            let img = image::load_from_memory(image).unwrap();
            let (w, h) = img.dimensions();
            Ok(png(w, h, BLUE))
        }
    }

    let detection = MockDetector::returning(vec![
        block(0.4, vec![0.0, 0.0, 0.2, 0.2]),
        block(0.5, vec![0.8, 0.8, 1.0, 1.0]),
    ]);
    let config = RestoreConfig::builder()
        .detection(detection)
        .enhancement(MockEnhancer::new(EnhanceScript::Fixed(png(100, 100, GREEN))))
        .repair(Arc::new(FlakyRepair {
            calls: AtomicUsize::new(0),
        }))
        .build()
        .expect("valid config");

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(out.stats.regions_failed, 1);
    assert_eq!(out.stats.regions_repaired, 1);

    let img = image::load_from_memory(&out.final_image).unwrap().to_rgba8();
    assert_eq!(img.get_pixel(5, 5).0, GREEN, "failed region left unchanged");
    assert_eq!(img.get_pixel(90, 90).0, BLUE, "later region still repaired");
}

// ── Full success scenario ────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_repairs_only_the_low_confidence_block() {
    let input = png(100, 100, RED);
    let detection = MockDetector::returning(vec![
        block(0.5, vec![0.1, 0.1, 0.3, 0.3]),
        block(0.95, vec![0.5, 0.5, 0.9, 0.9]),
    ]);
    let repair = MockEnhancer::new(EnhanceScript::SolidSameSize(BLUE));
    let config = config_with(
        Arc::clone(&detection),
        MockEnhancer::new(EnhanceScript::Fixed(png(100, 100, GREEN))),
        Arc::clone(&repair),
    );

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(repair.call_count(), 1, "exactly one repair call");
    assert_eq!(out.enhancement_method, EnhancementMethod::PrimaryLocal);

    // Original blocks returned with unmodified scores, repaired or not.
    assert_eq!(out.text_blocks.len(), 2);
    assert_eq!(out.text_blocks[0].score, 0.5);
    assert_eq!(out.text_blocks[1].score, 0.95);
    assert_eq!(out.text_blocks[0].position, vec![0.1, 0.1, 0.3, 0.3]);

    // The region-scoped prompt referenced the crop's pixel offset.
    let prompts = repair.prompts.lock().unwrap();
    assert!(prompts[0].contains("(10, 10)"), "got: {}", prompts[0]);

    assert_eq!(out.stats.blocks_detected, 2);
    assert_eq!(out.stats.regions_selected, 1);
    assert_eq!(out.stats.regions_repaired, 1);
    assert_eq!(out.stats.regions_failed, 0);
}

// ── Secondary detection chain through the orchestrator ───────────────────────

#[tokio::test]
async fn secondary_detector_used_when_primary_fails() {
    let input = png(50, 50, RED);
    let secondary = MockDetector::returning(vec![block(0.9, vec![0.0, 0.0, 1.0, 1.0])]);
    let config = RestoreConfig::builder()
        .detection(MockDetector::failing())
        .detection_fallback(Arc::clone(&secondary) as Arc<dyn DetectionBackend>)
        .enhancement(MockEnhancer::new(EnhanceScript::Fixed(png(50, 50, GREEN))))
        .repair(MockEnhancer::new(EnhanceScript::Fail))
        .build()
        .expect("valid config");

    let out = restore(&input, &config).await.expect("run succeeds");

    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
    assert_eq!(out.text_blocks.len(), 1);
    assert_eq!(out.text_blocks[0].content, "block@0.9");
}
