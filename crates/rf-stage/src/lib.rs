//! # rf-stage: Reveal Stage System
//!
//! Defines the canonical stages a spin presentation passes through.
//! Renderers never interpret server payloads, only stages.
//!
//! ## Philosophy
//!
//! Every spin, regardless of game variant, moves through the same phases:
//! - Spin accepted → Outcome revealed → Cascades / Bonus → Settlement
//!
//! This crate defines those stages, the per-spin trace, and phase timing.

pub mod stage;
pub mod event;
pub mod trace;
pub mod timing;

pub use stage::*;
pub use event::*;
pub use trace::*;
pub use timing::*;
