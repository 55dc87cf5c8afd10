//! Enhancement Adapter: the whole-image fallback chain.
//!
//! The chain is an ordered list of attempts with short-circuit on first
//! success — local backend, then cloud (only when a credential made a
//! cloud client available), then the identity transform. Each attempt is
//! independently guarded: an error inside one converts to "try next",
//! never propagates. The adapter therefore *always* returns a result, and
//! the orchestrator always has a usable working image.
//!
//! `success=false` appears only on the identity tail, paired with
//! `method=identity-fallback` and the unchanged input bytes.

use crate::backend::EnhancementBackend;
use crate::types::{EnhancementMethod, EnhancementResult};
use tracing::{info, warn};

/// Run the whole-image enhancement chain.
///
/// `attempts` is evaluated in order; `None` entries (e.g. an unconfigured
/// cloud fallback) are skipped. Falls back to the identity transform when
/// every attempt fails.
pub async fn enhance_with_fallback(
    attempts: &[Option<(&dyn EnhancementBackend, EnhancementMethod)>],
    image: &[u8],
    prompt: &str,
) -> EnhancementResult {
    let mut last_error = String::from("no enhancement backend configured");

    for (backend, method) in attempts.iter().flatten() {
        match backend.enhance(image, prompt).await {
            Ok(bytes) => {
                info!("{}: enhancement succeeded ({method})", backend.name());
                return EnhancementResult::ok(bytes, *method);
            }
            Err(e) => {
                warn!("{}: enhancement failed, trying next: {e}", backend.name());
                last_error = e.to_string();
            }
        }
    }

    info!("All enhancement backends failed, returning original image");
    EnhancementResult::identity(image, last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;

    struct FakeEnhancer {
        name: &'static str,
        output: Option<Vec<u8>>,
    }

    #[async_trait]
    impl EnhancementBackend for FakeEnhancer {
        fn name(&self) -> &str {
            self.name
        }

        async fn enhance(&self, _image: &[u8], _prompt: &str) -> Result<Vec<u8>, BackendError> {
            self.output
                .clone()
                .ok_or_else(|| BackendError::call(self.name, "boom"))
        }
    }

    #[tokio::test]
    async fn first_success_short_circuits() {
        let local = FakeEnhancer {
            name: "local",
            output: Some(vec![1, 1, 1]),
        };
        let cloud = FakeEnhancer {
            name: "cloud",
            output: Some(vec![2, 2, 2]),
        };
        let result = enhance_with_fallback(
            &[
                Some((&local as &dyn EnhancementBackend, EnhancementMethod::PrimaryLocal)),
                Some((&cloud as &dyn EnhancementBackend, EnhancementMethod::Cloud)),
            ],
            b"input",
            "prompt",
        )
        .await;
        assert!(result.success);
        assert_eq!(result.method, EnhancementMethod::PrimaryLocal);
        assert_eq!(result.image, Some(vec![1, 1, 1]));
    }

    #[tokio::test]
    async fn failed_local_advances_to_cloud() {
        let local = FakeEnhancer {
            name: "local",
            output: None,
        };
        let cloud = FakeEnhancer {
            name: "cloud",
            output: Some(vec![2, 2, 2]),
        };
        let result = enhance_with_fallback(
            &[
                Some((&local as &dyn EnhancementBackend, EnhancementMethod::PrimaryLocal)),
                Some((&cloud as &dyn EnhancementBackend, EnhancementMethod::Cloud)),
            ],
            b"input",
            "prompt",
        )
        .await;
        assert!(result.success);
        assert_eq!(result.method, EnhancementMethod::Cloud);
    }

    #[tokio::test]
    async fn all_failing_yields_identity_with_input_bytes() {
        let local = FakeEnhancer {
            name: "local",
            output: None,
        };
        let result = enhance_with_fallback(
            &[
                Some((&local as &dyn EnhancementBackend, EnhancementMethod::PrimaryLocal)),
                None,
            ],
            b"input",
            "prompt",
        )
        .await;
        assert!(!result.success);
        assert_eq!(result.method, EnhancementMethod::IdentityFallback);
        assert_eq!(result.image.as_deref(), Some(&b"input"[..]));
        assert!(result.error.unwrap().contains("boom"));
    }

    #[tokio::test]
    async fn unconfigured_slots_are_skipped() {
        let attempts: [Option<(&dyn EnhancementBackend, EnhancementMethod)>; 2] = [None, None];
        let result = enhance_with_fallback(&attempts, b"input", "prompt").await;
        assert!(!result.success);
        assert_eq!(result.method, EnhancementMethod::IdentityFallback);
        assert_eq!(result.image.as_deref(), Some(&b"input"[..]));
    }
}
