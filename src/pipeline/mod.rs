//! Pipeline stages for text-image restoration.
//!
//! Each submodule implements exactly one stage. Keeping stages separate
//! makes each independently testable and lets a stage's backend be swapped
//! without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! preflight ──▶ detect ──┐
//!               enhance ─┴─▶ select regions ──▶ crop/repair/paste loop ──▶ output
//!  (probes)   (concurrent)    (score + rect)        (image_ops + repair)
//! ```
//!
//! 1. [`preflight`] — probe every required backend; fatal if any is down
//! 2. [`detect`]    — primary/secondary detection chain, normalized blocks
//! 3. [`enhance`]   — whole-image chain: local → cloud → identity
//! 4. [`repair`]    — single-backend region repair with identity fallback
//! 5. [`image_ops`] — crop and paste on the working image buffer

pub mod detect;
pub mod enhance;
pub mod image_ops;
pub mod preflight;
pub mod repair;
