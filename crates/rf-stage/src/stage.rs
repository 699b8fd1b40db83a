//! Stage: The core enum defining every phase of a spin presentation
//!
//! A Stage is NOT an animation frame.
//! A Stage is the SEMANTIC MEANING of a moment in the reveal timeline.

use serde::{Deserialize, Serialize};

/// Canonical reveal stage
///
/// The orchestrator emits exactly these stages; renderers and audio layers
/// respond to stages, never to raw server payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Stage {
    // ═══════════════════════════════════════════════════════════════════════
    // SPIN LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════
    /// Spin accepted, outcome requested
    SpinStart {
        /// Bet placed for this spin
        bet: f64,
    },

    /// Suspense hold between outcome arrival and first reveal
    PreReveal {
        /// Configured hold (ms)
        duration_ms: u64,
    },

    /// Base grid shown without cascades
    GridReveal,

    /// Spin fully settled, orchestrator idle again
    SpinEnd,

    /// Outcome request failed, timeline contracted to idle
    SpinFailed {
        /// Failure reason as shown to the player
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // CASCADE
    // ═══════════════════════════════════════════════════════════════════════
    /// Tumble step begins
    TumbleStart {
        /// 0-based step index
        step_index: u32,
        /// Total steps in this spin
        total_steps: u32,
    },

    /// Winning clusters highlighted
    ClusterHighlight {
        step_index: u32,
        /// Number of clusters in the highlight set
        cluster_count: u32,
    },

    /// Multiplier effect (lightning strike)
    MultiplierStrike {
        step_index: u32,
        multiplier: f64,
    },

    /// Highlights cleared, winning symbols removed
    ClusterExplode { step_index: u32 },

    /// Step grid dropped into place
    GridDrop { step_index: u32 },

    /// Last tumble settled
    TumbleEnd {
        /// Steps revealed
        total_steps: u32,
    },

    // ═══════════════════════════════════════════════════════════════════════
    // BONUS
    // ═══════════════════════════════════════════════════════════════════════
    /// Bonus phase entered
    BonusEnter,

    /// Wheel spinning toward its prize
    WheelSpin {
        /// Prize the wheel lands on
        prize: f64,
        /// Total rotation in degrees
        rotation_deg: f64,
    },

    /// Wheel stopped
    WheelStop { prize: f64 },

    /// Free spins banner shown
    FreeSpinsBanner { awarded: u32 },

    /// Bonus phase finished
    BonusExit,

    // ═══════════════════════════════════════════════════════════════════════
    // SETTLEMENT
    // ═══════════════════════════════════════════════════════════════════════
    /// Final message and balance committed
    Settle {
        final_win: f64,
        final_balance: f64,
    },
}

impl Stage {
    /// Get the category for this stage
    pub fn category(&self) -> StageCategory {
        match self {
            Stage::SpinStart { .. }
            | Stage::PreReveal { .. }
            | Stage::GridReveal
            | Stage::SpinEnd
            | Stage::SpinFailed { .. } => StageCategory::SpinLifecycle,

            Stage::TumbleStart { .. }
            | Stage::ClusterHighlight { .. }
            | Stage::MultiplierStrike { .. }
            | Stage::ClusterExplode { .. }
            | Stage::GridDrop { .. }
            | Stage::TumbleEnd { .. } => StageCategory::Cascade,

            Stage::BonusEnter
            | Stage::WheelSpin { .. }
            | Stage::WheelStop { .. }
            | Stage::FreeSpinsBanner { .. }
            | Stage::BonusExit => StageCategory::Bonus,

            Stage::Settle { .. } => StageCategory::Settlement,
        }
    }

    /// Get a simple string name for this stage type
    pub fn type_name(&self) -> &'static str {
        match self {
            Stage::SpinStart { .. } => "spin_start",
            Stage::PreReveal { .. } => "pre_reveal",
            Stage::GridReveal => "grid_reveal",
            Stage::SpinEnd => "spin_end",
            Stage::SpinFailed { .. } => "spin_failed",
            Stage::TumbleStart { .. } => "tumble_start",
            Stage::ClusterHighlight { .. } => "cluster_highlight",
            Stage::MultiplierStrike { .. } => "multiplier_strike",
            Stage::ClusterExplode { .. } => "cluster_explode",
            Stage::GridDrop { .. } => "grid_drop",
            Stage::TumbleEnd { .. } => "tumble_end",
            Stage::BonusEnter => "bonus_enter",
            Stage::WheelSpin { .. } => "wheel_spin",
            Stage::WheelStop { .. } => "wheel_stop",
            Stage::FreeSpinsBanner { .. } => "free_spins_banner",
            Stage::BonusExit => "bonus_exit",
            Stage::Settle { .. } => "settle",
        }
    }

    /// Terminal stages close a spin timeline
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::SpinEnd | Stage::SpinFailed { .. })
    }

    /// Step index carried by cascade stages
    pub fn step_index(&self) -> Option<u32> {
        match self {
            Stage::TumbleStart { step_index, .. }
            | Stage::ClusterHighlight { step_index, .. }
            | Stage::MultiplierStrike { step_index, .. }
            | Stage::ClusterExplode { step_index }
            | Stage::GridDrop { step_index } => Some(*step_index),
            _ => None,
        }
    }

    /// All valid stage type names
    pub fn all_type_names() -> &'static [&'static str] {
        &[
            "spin_start",
            "pre_reveal",
            "grid_reveal",
            "spin_end",
            "spin_failed",
            "tumble_start",
            "cluster_highlight",
            "multiplier_strike",
            "cluster_explode",
            "grid_drop",
            "tumble_end",
            "bonus_enter",
            "wheel_spin",
            "wheel_stop",
            "free_spins_banner",
            "bonus_exit",
            "settle",
        ]
    }

    /// Check if a type name is valid
    pub fn is_valid_type_name(name: &str) -> bool {
        Self::all_type_names().contains(&name.to_lowercase().as_str())
    }
}

/// Stage category for grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    SpinLifecycle,
    Cascade,
    Bonus,
    Settlement,
}

impl StageCategory {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SpinLifecycle => "Spin Lifecycle",
            Self::Cascade => "Cascade",
            Self::Bonus => "Bonus",
            Self::Settlement => "Settlement",
        }
    }
}
