//! Configuration types for a restoration run.
//!
//! All pipeline behaviour is controlled through [`RestoreConfig`], built via
//! its [`RestoreConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across runs, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! The struct mixes URLs, thresholds, an optional credential, and optional
//! injected backends; a positional constructor over that set is unreadable
//! and breaks on every new field. The builder lets callers set only what
//! they care about and rely on documented defaults for the rest.

use crate::backend::{DetectionBackend, EnhancementBackend};
use crate::error::RestoreError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::sync::Arc;

/// Default URL of the local text-detection service.
pub const DEFAULT_DETECTION_URL: &str = "http://localhost:8001";

/// Default URL of the local enhancement service. Region repair defaults to
/// the same process, which also serves `/enhance`.
pub const DEFAULT_ENHANCEMENT_URL: &str = "http://localhost:8000";

/// Configuration for a restoration run.
///
/// Built via [`RestoreConfig::builder()`] or [`RestoreConfig::from_env()`].
///
/// # Example
/// ```rust
/// use textrestore::RestoreConfig;
///
/// let config = RestoreConfig::builder()
///     .detection_url("http://localhost:8001")
///     .score_threshold(0.6)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RestoreConfig {
    /// Base URL of the text-detection service. Default: `http://localhost:8001`.
    pub detection_url: String,

    /// Base URL of the whole-image enhancement service. Default: `http://localhost:8000`.
    pub enhancement_url: String,

    /// Base URL of the region-repair service. Default: `http://localhost:8000`.
    ///
    /// The repair loop depends on this backend specifically, which is why
    /// preflight treats its absence as fatal rather than degradable.
    pub repair_url: String,

    /// Base URL of the hosted cloud models used as fallbacks.
    pub cloud_api_base: String,

    /// Credential for the cloud fallback. `None` disables the cloud
    /// branches of the detection and enhancement chains; that is a normal
    /// configuration, not an error.
    pub cloud_api_key: Option<String>,

    /// Availability-probe timeout in seconds. Default: 5.
    ///
    /// This is the only timeout in the pipeline. Enhancement and repair
    /// calls run unbounded: a hung backend stalls the one run that issued
    /// it, which is a documented limitation rather than a crash risk.
    pub probe_timeout_secs: u64,

    /// Blocks scoring below this are repair candidates. Default: 0.7.
    pub score_threshold: f64,

    /// Custom whole-image enhancement instruction. If `None`, uses
    /// [`crate::prompts::DEFAULT_ENHANCEMENT_PROMPT`].
    pub enhancement_prompt: Option<String>,

    /// Per-stage progress events. Default: no callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Pre-constructed detection backend; takes precedence over
    /// `detection_url`. Useful in tests and for custom middleware.
    pub detection: Option<Arc<dyn DetectionBackend>>,

    /// Pre-constructed secondary detection backend; takes precedence over
    /// the credential-gated cloud OCR fallback.
    pub detection_fallback: Option<Arc<dyn DetectionBackend>>,

    /// Pre-constructed whole-image enhancement backend; takes precedence
    /// over `enhancement_url`.
    pub enhancement: Option<Arc<dyn EnhancementBackend>>,

    /// Pre-constructed cloud enhancement backend; takes precedence over
    /// the credential-gated client built from `cloud_api_base`.
    pub cloud_enhancement: Option<Arc<dyn EnhancementBackend>>,

    /// Pre-constructed region-repair backend; takes precedence over
    /// `repair_url`.
    pub repair: Option<Arc<dyn EnhancementBackend>>,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            detection_url: DEFAULT_DETECTION_URL.to_string(),
            enhancement_url: DEFAULT_ENHANCEMENT_URL.to_string(),
            repair_url: DEFAULT_ENHANCEMENT_URL.to_string(),
            cloud_api_base: crate::backend::cloud::DEFAULT_CLOUD_API_BASE.to_string(),
            cloud_api_key: None,
            probe_timeout_secs: 5,
            score_threshold: 0.7,
            enhancement_prompt: None,
            progress_callback: None,
            detection: None,
            detection_fallback: None,
            enhancement: None,
            cloud_enhancement: None,
            repair: None,
        }
    }
}

impl fmt::Debug for RestoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestoreConfig")
            .field("detection_url", &self.detection_url)
            .field("enhancement_url", &self.enhancement_url)
            .field("repair_url", &self.repair_url)
            .field("cloud_api_base", &self.cloud_api_base)
            .field("cloud_api_key", &self.cloud_api_key.as_ref().map(|_| "<set>"))
            .field("probe_timeout_secs", &self.probe_timeout_secs)
            .field("score_threshold", &self.score_threshold)
            .field("detection", &self.detection.as_ref().map(|_| "<dyn DetectionBackend>"))
            .field("enhancement", &self.enhancement.as_ref().map(|_| "<dyn EnhancementBackend>"))
            .field("repair", &self.repair.as_ref().map(|_| "<dyn EnhancementBackend>"))
            .finish()
    }
}

impl RestoreConfig {
    /// Create a new builder for `RestoreConfig`.
    pub fn builder() -> RestoreConfigBuilder {
        RestoreConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve URLs and the cloud credential from the environment, once at
    /// startup:
    ///
    /// * `DETECTION_SERVICE_URL` — detection backend
    /// * `ENHANCE_SERVICE_URL`   — whole-image enhancement backend
    /// * `REPAIR_SERVICE_URL`    — region-repair backend (defaults to the
    ///   enhancement URL when unset)
    /// * `CLOUD_API_BASE`, `CLOUD_API_KEY` — cloud fallback; an absent key
    ///   disables the cloud branches without being an error
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("DETECTION_SERVICE_URL") {
            if !url.is_empty() {
                config.detection_url = url;
            }
        }
        if let Ok(url) = std::env::var("ENHANCE_SERVICE_URL") {
            if !url.is_empty() {
                config.enhancement_url = url.clone();
                config.repair_url = url;
            }
        }
        if let Ok(url) = std::env::var("REPAIR_SERVICE_URL") {
            if !url.is_empty() {
                config.repair_url = url;
            }
        }
        if let Ok(base) = std::env::var("CLOUD_API_BASE") {
            if !base.is_empty() {
                config.cloud_api_base = base;
            }
        }
        if let Ok(key) = std::env::var("CLOUD_API_KEY") {
            if !key.is_empty() {
                config.cloud_api_key = Some(key);
            }
        }
        config
    }
}

/// Builder for [`RestoreConfig`].
pub struct RestoreConfigBuilder {
    config: RestoreConfig,
}

impl RestoreConfigBuilder {
    pub fn detection_url(mut self, url: impl Into<String>) -> Self {
        self.config.detection_url = url.into();
        self
    }

    pub fn enhancement_url(mut self, url: impl Into<String>) -> Self {
        self.config.enhancement_url = url.into();
        self
    }

    pub fn repair_url(mut self, url: impl Into<String>) -> Self {
        self.config.repair_url = url.into();
        self
    }

    pub fn cloud_api_base(mut self, base: impl Into<String>) -> Self {
        self.config.cloud_api_base = base.into();
        self
    }

    pub fn cloud_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.cloud_api_key = Some(key.into());
        self
    }

    pub fn probe_timeout_secs(mut self, secs: u64) -> Self {
        self.config.probe_timeout_secs = secs.max(1);
        self
    }

    pub fn score_threshold(mut self, t: f64) -> Self {
        self.config.score_threshold = t.clamp(0.0, 1.0);
        self
    }

    pub fn enhancement_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.enhancement_prompt = Some(prompt.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn detection(mut self, backend: Arc<dyn DetectionBackend>) -> Self {
        self.config.detection = Some(backend);
        self
    }

    pub fn detection_fallback(mut self, backend: Arc<dyn DetectionBackend>) -> Self {
        self.config.detection_fallback = Some(backend);
        self
    }

    pub fn enhancement(mut self, backend: Arc<dyn EnhancementBackend>) -> Self {
        self.config.enhancement = Some(backend);
        self
    }

    pub fn cloud_enhancement(mut self, backend: Arc<dyn EnhancementBackend>) -> Self {
        self.config.cloud_enhancement = Some(backend);
        self
    }

    pub fn repair(mut self, backend: Arc<dyn EnhancementBackend>) -> Self {
        self.config.repair = Some(backend);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RestoreConfig, RestoreError> {
        let c = &self.config;
        if !(0.0..=1.0).contains(&c.score_threshold) {
            return Err(RestoreError::InvalidConfig(format!(
                "score threshold must be in [0, 1], got {}",
                c.score_threshold
            )));
        }
        if c.probe_timeout_secs == 0 {
            return Err(RestoreError::InvalidConfig(
                "probe timeout must be ≥ 1s".into(),
            ));
        }
        for (name, url) in [
            ("detection", &c.detection_url),
            ("enhancement", &c.enhancement_url),
            ("repair", &c.repair_url),
        ] {
            if url.is_empty() {
                return Err(RestoreError::InvalidConfig(format!(
                    "{name} URL must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}
