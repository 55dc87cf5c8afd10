//! # textrestore
//!
//! Restore low-quality text images by orchestrating local AI backends.
//!
//! ## Why this crate?
//!
//! Whole-image enhancement alone often leaves the worst text regions —
//! the smudged seal, the faded line of small print — still unreadable.
//! This crate layers a targeted repair loop on top: it detects text
//! blocks, enhances the whole image, then crops each low-confidence
//! region, asks a repair backend to fix just that patch, and pastes the
//! result back. Every backend call sits behind a fallback chain, so a
//! slow or partially failing backend degrades the result instead of
//! failing the run.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Preflight  probe every required backend; fail fast if any is down
//!  ├─ 2. Detect     text blocks with confidence scores (local → cloud OCR)
//!  │   + Enhance    whole image (local → cloud → identity), concurrently
//!  ├─ 3. Select     blocks with score < 0.7 and a well-formed rectangle
//!  ├─ 4. Repair     sequential crop → repair → paste per region
//!  └─ 5. Output     final image + original text blocks + method + stats
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use textrestore::{restore, RestoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // URLs and the cloud credential resolved from the environment
//!     let config = RestoreConfig::from_env();
//!     let bytes = std::fs::read("scan.jpg")?;
//!     let output = restore(&bytes, &config).await?;
//!     std::fs::write("restored.png", &output.final_image)?;
//!     for block in &output.text_blocks {
//!         println!("{:.2}  {}", block.score, block.content);
//!     }
//!     eprintln!("enhanced via {}", output.enhancement_method);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Only two things fail a run: a required backend missing at preflight,
//! and input bytes that are not an image. Everything else — a detection
//! backend erroring, the enhancement service timing out, one region's
//! repair failing — is absorbed by a fallback chain and reported through
//! [`RestoreOutput::enhancement_method`] and [`RestoreStats`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `textrestore` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! textrestore = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod restore;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{DetectionBackend, EnhancementBackend};
pub use config::{RestoreConfig, RestoreConfigBuilder};
pub use error::{BackendError, RestoreError};
pub use progress::{NoopProgressCallback, ProgressCallback, RestoreProgressCallback};
pub use restore::{check_services, restore, restore_from_file, restore_sync, restore_to_file};
pub use types::{
    AvailabilityRecord, EnhancementMethod, EnhancementResult, PixelRect, Rect, RestoreOutput,
    RestoreStats, ServiceStatus, TextBlock,
};
