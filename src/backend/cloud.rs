//! Cloud fallback client.
//!
//! Used only when a credential is configured; its absence disables the
//! cloud branches of the fallback chains without being an error. The cloud
//! provider hosts both an OCR model (detection secondary) and an
//! image-to-image model (enhancement fallback), addressed as
//! `{api_base}/{model}` with bearer authentication.
//!
//! The cloud OCR model reads the whole image and returns text without
//! positions, so the detection impl synthesises a single full-image block
//! with a fixed mid-high confidence. That block is never a repair
//! candidate (its score is above the default threshold), which is the
//! right behaviour for a positionless result.

use crate::error::BackendError;
use crate::types::TextBlock;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{DetectionBackend, EnhancementBackend};

/// Default inference API base for the hosted models.
pub const DEFAULT_CLOUD_API_BASE: &str = "https://api-inference.huggingface.co/models";

/// OCR model used as the detection secondary.
const CLOUD_OCR_MODEL: &str = "microsoft/trocr-base-printed";

/// Image-to-image model used as the enhancement fallback.
const CLOUD_ENHANCE_MODEL: &str = "stabilityai/stable-diffusion-xl-base-1.0";

/// Confidence assigned to the synthetic whole-image block, above the
/// default repair threshold.
const CLOUD_OCR_SCORE: f64 = 0.8;

/// Bearer-authenticated client for the hosted cloud models.
pub struct CloudBackend {
    client: Client,
    api_base: String,
    api_key: String,
}

impl CloudBackend {
    pub fn new(client: Client, api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
        }
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), model)
    }
}

#[derive(Debug, Deserialize)]
struct CloudOcrResponse {
    generated_text: Option<String>,
}

#[async_trait]
impl DetectionBackend for CloudBackend {
    fn name(&self) -> &str {
        "cloud-ocr"
    }

    async fn detect(&self, image: &[u8]) -> Result<Vec<TextBlock>, BackendError> {
        let response = self
            .client
            .post(self.model_url(CLOUD_OCR_MODEL))
            .bearer_auth(&self.api_key)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| BackendError::call(DetectionBackend::name(self), e))?;

        if !response.status().is_success() {
            return Err(BackendError::call(
                DetectionBackend::name(self),
                format!("HTTP {}", response.status()),
            ));
        }

        let parsed: CloudOcrResponse = response
            .json()
            .await
            .map_err(|e| BackendError::malformed(DetectionBackend::name(self), e))?;

        let blocks = match parsed.generated_text {
            Some(text) if !text.is_empty() => {
                // No positions from this model: one block spanning the image.
                vec![TextBlock::new(text, vec![0.0, 0.0, 1.0, 1.0], CLOUD_OCR_SCORE)]
            }
            _ => Vec::new(),
        };
        debug!("{}: {} block(s)", DetectionBackend::name(self), blocks.len());
        Ok(blocks)
    }
}

#[async_trait]
impl EnhancementBackend for CloudBackend {
    fn name(&self) -> &str {
        "cloud"
    }

    async fn enhance(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .post(self.model_url(CLOUD_ENHANCE_MODEL))
            .bearer_auth(&self.api_key)
            .header("x-prompt", prompt)
            .body(image.to_vec())
            .send()
            .await
            .map_err(|e| BackendError::call(EnhancementBackend::name(self), e))?;

        if !response.status().is_success() {
            return Err(BackendError::call(
                EnhancementBackend::name(self),
                format!("HTTP {}", response.status()),
            ));
        }

        // The image-to-image endpoint answers with raw image bytes.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| BackendError::malformed(EnhancementBackend::name(self), e))?;

        if bytes.is_empty() {
            return Err(BackendError::malformed(
                EnhancementBackend::name(self),
                "empty image payload",
            ));
        }
        Ok(bytes.to_vec())
    }
}
