//! Pipeline stages for grayscale spool optimisation.
//!
//! Each submodule implements exactly one step, so the rendering engine can
//! be swapped without touching encoding or assembly.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode ──▶ assemble ──▶ report
//! (checks)  (pdfium)   (gray JPEG) (lopdf)     (sizes)
//! ```
//!
//! 1. [`input`]    — existence, permission and `%PDF` magic checks
//! 2. [`render`]   — rasterise every page at the requested DPI; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`encode`]   — single-channel luma conversion and JPEG encoding,
//!    fanned out across blocking threads
//! 4. [`assemble`] — one output page per source page with the original
//!    geometry, then prune, deflate and atomically save
//! 5. [`report`]   — original vs optimised file sizes

pub mod assemble;
pub mod encode;
pub mod input;
pub mod render;
pub mod report;
