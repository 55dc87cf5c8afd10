//! Detection Adapter: primary/secondary fallback chain over
//! [`DetectionBackend`]s.
//!
//! The chain distinguishes two terminal outcomes the orchestrator treats
//! differently:
//!
//! * `Some(vec![])` — detection *worked* and found no text. The repair
//!   loop is a no-op, and that's the correct answer.
//! * `None` — no detection was possible (every backend errored). The
//!   pipeline continues without a text list rather than failing; only
//!   preflight may kill a run.
//!
//! Zero blocks from the primary still triggers the secondary — the cloud
//! OCR model sometimes reads text a position-aware detector misses — but
//! zero blocks from the secondary is accepted as-is.

use crate::backend::DetectionBackend;
use crate::types::TextBlock;
use tracing::{debug, warn};

/// Run the detection chain: primary, then optional secondary.
pub async fn detect_with_fallback(
    primary: &dyn DetectionBackend,
    secondary: Option<&dyn DetectionBackend>,
    image: &[u8],
) -> Option<Vec<TextBlock>> {
    let primary_outcome = match primary.detect(image).await {
        Ok(blocks) if !blocks.is_empty() => {
            debug!("{}: {} block(s)", primary.name(), blocks.len());
            return Some(blocks);
        }
        Ok(empty) => {
            debug!("{}: zero blocks, trying secondary", primary.name());
            Some(empty)
        }
        Err(e) => {
            warn!("{}: {e}, trying secondary", primary.name());
            None
        }
    };

    let Some(secondary) = secondary else {
        // No secondary configured: an empty primary result stands, a
        // failed primary means no detection was possible.
        return primary_outcome;
    };

    match secondary.detect(image).await {
        // Zero blocks from the secondary is a valid terminal result.
        Ok(blocks) => {
            debug!("{}: {} block(s)", secondary.name(), blocks.len());
            Some(blocks)
        }
        Err(e) => {
            warn!("{}: {e}", secondary.name());
            // Primary "zero blocks" still counts as a successful detection
            // even when the secondary errors.
            primary_outcome
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;

    enum Scripted {
        Blocks(Vec<TextBlock>),
        Fail,
    }

    struct FakeDetector {
        name: &'static str,
        outcome: Scripted,
    }

    #[async_trait]
    impl DetectionBackend for FakeDetector {
        fn name(&self) -> &str {
            self.name
        }

        async fn detect(&self, _image: &[u8]) -> Result<Vec<TextBlock>, BackendError> {
            match &self.outcome {
                Scripted::Blocks(b) => Ok(b.clone()),
                Scripted::Fail => Err(BackendError::call(self.name, "connection refused")),
            }
        }
    }

    fn block(content: &str) -> TextBlock {
        TextBlock::new(content, vec![0.1, 0.1, 0.2, 0.2], 0.9)
    }

    #[tokio::test]
    async fn primary_result_wins_when_non_empty() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Blocks(vec![block("from-primary")]),
        };
        let secondary = FakeDetector {
            name: "s",
            outcome: Scripted::Blocks(vec![block("from-secondary")]),
        };
        let got = detect_with_fallback(&primary, Some(&secondary), b"img")
            .await
            .unwrap();
        assert_eq!(got[0].content, "from-primary");
    }

    #[tokio::test]
    async fn empty_primary_falls_through_to_secondary() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Blocks(vec![]),
        };
        let secondary = FakeDetector {
            name: "s",
            outcome: Scripted::Blocks(vec![block("from-secondary")]),
        };
        let got = detect_with_fallback(&primary, Some(&secondary), b"img")
            .await
            .unwrap();
        assert_eq!(got[0].content, "from-secondary");
    }

    #[tokio::test]
    async fn both_empty_is_empty_list_not_none() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Blocks(vec![]),
        };
        let secondary = FakeDetector {
            name: "s",
            outcome: Scripted::Blocks(vec![]),
        };
        let got = detect_with_fallback(&primary, Some(&secondary), b"img").await;
        assert_eq!(got, Some(vec![]));
    }

    #[tokio::test]
    async fn both_failing_is_none() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Fail,
        };
        let secondary = FakeDetector {
            name: "s",
            outcome: Scripted::Fail,
        };
        let got = detect_with_fallback(&primary, Some(&secondary), b"img").await;
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn empty_primary_survives_secondary_failure() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Blocks(vec![]),
        };
        let secondary = FakeDetector {
            name: "s",
            outcome: Scripted::Fail,
        };
        let got = detect_with_fallback(&primary, Some(&secondary), b"img").await;
        assert_eq!(got, Some(vec![]));
    }

    #[tokio::test]
    async fn failed_primary_without_secondary_is_none() {
        let primary = FakeDetector {
            name: "p",
            outcome: Scripted::Fail,
        };
        let got = detect_with_fallback(&primary, None, b"img").await;
        assert_eq!(got, None);
    }
}
