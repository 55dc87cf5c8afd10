//! reqwest implementations of the local HTTP backends.
//!
//! Wire contracts (the backends are external collaborators; these shapes
//! are consumed, not defined, here):
//!
//! * `POST {detection}/detect` →
//!   `{results: [{text, bbox: [[x,y]×4], confidence}], image_width, image_height}`
//! * `POST {enhancement}/enhance` with `{image, prompt, task}` →
//!   `{enhanced_image: base64|null}`
//!
//! Images travel as base64 in JSON bodies on both requests and responses.

use crate::error::BackendError;
use crate::types::{AvailabilityRecord, TextBlock};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{probe, DetectionBackend, EnhancementBackend};

// ── Detection ────────────────────────────────────────────────────────────

/// The local text-detection service.
pub struct HttpDetectionBackend {
    client: Client,
    base_url: String,
    name: String,
    probe_timeout: Duration,
}

impl HttpDetectionBackend {
    pub fn new(client: Client, base_url: impl Into<String>, probe_timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            name: "detection".to_string(),
            probe_timeout,
        }
    }
}

#[derive(Serialize)]
struct DetectRequest<'a> {
    image: &'a str,
    use_angle_cls: bool,
    use_dilation: bool,
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    #[serde(default)]
    results: Vec<DetectItem>,
    image_width: Option<f64>,
    image_height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DetectItem {
    text: Option<String>,
    /// Four-corner polygon `[[x,y]; 4]` in pixel coordinates.
    bbox: Option<Vec<[f64; 2]>>,
    confidence: Option<f64>,
}

/// Reduce a polygon to its axis-aligned bounding rectangle and normalize
/// by the reported image dimensions.
///
/// When the backend omits its dimensions the divisor defaults to 1, which
/// degrades to raw pixel coordinates. That is a documented limitation of
/// the wire contract, not something silently corrected here — downstream
/// rectangle validation still applies.
fn normalize_bbox(bbox: &[[f64; 2]], width: Option<f64>, height: Option<f64>) -> Vec<f64> {
    let w = width.filter(|v| *v > 0.0).unwrap_or(1.0);
    let h = height.filter(|v| *v > 0.0).unwrap_or(1.0);
    let xs = bbox.iter().map(|p| p[0]);
    let ys = bbox.iter().map(|p| p[1]);
    let x1 = xs.clone().fold(f64::INFINITY, f64::min) / w;
    let x2 = xs.fold(f64::NEG_INFINITY, f64::max) / w;
    let y1 = ys.clone().fold(f64::INFINITY, f64::min) / h;
    let y2 = ys.fold(f64::NEG_INFINITY, f64::max) / h;
    vec![x1, y1, x2, y2]
}

#[async_trait]
impl DetectionBackend for HttpDetectionBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn detect(&self, image: &[u8]) -> Result<Vec<TextBlock>, BackendError> {
        let url = format!("{}/detect", self.base_url.trim_end_matches('/'));
        let body = DetectRequest {
            image: &STANDARD.encode(image),
            use_angle_cls: true,
            use_dilation: true,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::call(&self.name, e))?;

        if !response.status().is_success() {
            return Err(BackendError::call(
                &self.name,
                format!("HTTP {}", response.status()),
            ));
        }

        let parsed: DetectResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(&self.name, e))?;

        let blocks: Vec<TextBlock> = parsed
            .results
            .iter()
            .filter_map(|item| {
                // Items missing any field are dropped, not errors: partial
                // results from the backend are still results.
                let text = item.text.as_deref()?;
                let bbox = item.bbox.as_deref()?;
                let confidence = item.confidence?;
                if bbox.is_empty() {
                    return None;
                }
                Some(TextBlock::new(
                    text,
                    normalize_bbox(bbox, parsed.image_width, parsed.image_height),
                    confidence,
                ))
            })
            .collect();

        debug!(
            "{}: {} of {} raw results usable",
            self.name,
            blocks.len(),
            parsed.results.len()
        );
        Ok(blocks)
    }

    async fn health(&self) -> AvailabilityRecord {
        probe(&self.client, &self.name, &self.base_url, self.probe_timeout).await
    }
}

// ── Enhancement / repair ─────────────────────────────────────────────────

/// A local instruction-driven enhancement service.
///
/// Serves both whole-image enhancement and region repair; the two differ
/// only in the instruction text and the bytes they are handed.
pub struct HttpEnhancementBackend {
    client: Client,
    base_url: String,
    name: String,
    probe_timeout: Duration,
}

impl HttpEnhancementBackend {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        name: impl Into<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            name: name.into(),
            probe_timeout,
        }
    }
}

#[derive(Serialize)]
struct EnhanceRequest<'a> {
    image: &'a str,
    prompt: &'a str,
    task: &'a str,
}

#[derive(Debug, Deserialize)]
struct EnhanceResponse {
    enhanced_image: Option<String>,
}

#[async_trait]
impl EnhancementBackend for HttpEnhancementBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enhance(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/enhance", self.base_url.trim_end_matches('/'));
        let body = EnhanceRequest {
            image: &STANDARD.encode(image),
            prompt,
            task: "image_enhancement",
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::call(&self.name, e))?;

        if !response.status().is_success() {
            return Err(BackendError::call(
                &self.name,
                format!("HTTP {}", response.status()),
            ));
        }

        let parsed: EnhanceResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(&self.name, e))?;

        let b64 = parsed.enhanced_image.ok_or_else(|| {
            BackendError::malformed(&self.name, "enhanced_image was null")
        })?;

        let bytes = STANDARD
            .decode(&b64)
            .map_err(|e| BackendError::malformed(&self.name, format!("invalid base64: {e}")))?;

        if bytes.is_empty() {
            return Err(BackendError::malformed(&self.name, "empty image payload"));
        }

        debug!("{}: received {} enhanced bytes", self.name, bytes.len());
        Ok(bytes)
    }

    async fn health(&self) -> AvailabilityRecord {
        probe(&self.client, &self.name, &self.base_url, self.probe_timeout).await
    }
}
