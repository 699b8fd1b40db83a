//! # rf-reveal: Spin Presentation Orchestrator
//!
//! Turns one server-computed spin outcome into a timed, interruption-safe
//! reveal: base grid, tumble cascades, multiplier strikes, bonus wheel or
//! free-spins banner, then a single settlement of message and balance.
//!
//! ## Features
//!
//! - **Single spin in flight**: triggers while not idle are rejected, never queued
//! - **Ordered cascades**: tumble steps play strictly in order, one grid update each
//! - **Bonus to completion**: the wheel always reaches its stop before settlement
//! - **Late balance**: the mirrored balance changes only when the spin settles
//! - **Autoplay**: repeats spins under funds and session guards
//!
//! ## Architecture
//!
//! ```text
//! trigger(bet)
//!     │
//!     v
//! SpinOrchestrator ──── GameService::request_spin / request_cascade_spin
//!     │
//!     ├── TumbleCascadeEngine ── ClusterIndex (highlight lookup)
//!     ├── BonusWheelController (wheel / free-spins banner)
//!     └── reconcile() → Settlement
//!           │
//!           v
//!     PresentationSnapshot (watch) + StageEvent stream (broadcast)
//!           ^
//!           │
//! AutoplayDriver ── re-triggers while enabled
//! ```

pub mod autoplay;
pub mod bonus;
pub mod cascade;
pub mod cluster_index;
pub mod config;
pub mod error;
pub mod model;
pub mod orchestrator;
pub mod reconciler;
pub mod service;
pub mod snapshot;

pub use autoplay::*;
pub use bonus::*;
pub use cascade::*;
pub use cluster_index::*;
pub use config::*;
pub use error::*;
pub use model::*;
pub use orchestrator::*;
pub use reconciler::*;
pub use service::*;
pub use snapshot::*;
