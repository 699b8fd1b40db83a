//! Observable presentation state
//!
//! The orchestrator is the only writer. Renderers subscribe through a
//! `watch` channel and read clones.

use serde::{Deserialize, Serialize};

use crate::cluster_index::ClusterIndex;
use crate::model::{Grid, GridSize, SpecialSymbol};
use crate::reconciler::DisplayMessage;

/// Orchestrator state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestratorState {
    #[default]
    Idle,
    /// Outcome requested, suspense hold running
    AwaitingResult,
    RevealingTumbles,
    /// Bonus sub-game running to completion
    AwaitingBonus,
    Settling,
}

impl OrchestratorState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::AwaitingResult => "Awaiting Result",
            Self::RevealingTumbles => "Revealing Tumbles",
            Self::AwaitingBonus => "Awaiting Bonus",
            Self::Settling => "Settling",
        }
    }
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What the bonus overlay shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusView {
    /// Grid settled, wheel about to appear
    WheelIntro,
    WheelSpinning { prize: f64, rotation_deg: f64 },
    WheelStopped { prize: f64 },
    FreeSpinsBanner { awarded: u32 },
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationSnapshot {
    pub state: OrchestratorState,
    pub grid: Grid,
    pub special_symbol: Option<SpecialSymbol>,
    /// Active winning clusters
    pub highlight: ClusterIndex,
    /// 1-based tumble step on screen, 0 outside a cascade
    pub current_tumble: usize,
    pub total_tumbles: usize,
    /// Multiplier strike in progress
    pub multiplier_event: Option<f64>,
    pub exploding: bool,
    pub bonus: Option<BonusView>,
    pub message: Option<DisplayMessage>,
    /// Mirror of the session balance
    pub balance: f64,
    /// Running win across revealed tumble steps
    pub total_win: f64,
    /// Win of the last settled spin
    pub last_win: f64,
    pub session_expired: bool,
    pub spin_id: Option<String>,
}

impl PresentationSnapshot {
    pub fn new(size: GridSize, balance: f64) -> Self {
        Self {
            state: OrchestratorState::Idle,
            grid: Grid::placeholder(size),
            special_symbol: None,
            highlight: ClusterIndex::empty(),
            current_tumble: 0,
            total_tumbles: 0,
            multiplier_event: None,
            exploding: false,
            bonus: None,
            message: None,
            balance,
            total_win: 0.0,
            last_win: 0.0,
            session_expired: false,
            spin_id: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state.is_idle()
    }

    /// Is cell (r, c) highlighted?
    pub fn is_highlighted(&self, row: usize, col: usize) -> bool {
        self.highlight.contains(row, col)
    }

    /// Reset per-spin presentation state for a new spin
    pub(crate) fn begin_spin(&mut self, spin_id: String) {
        self.state = OrchestratorState::AwaitingResult;
        self.spin_id = Some(spin_id);
        self.message = None;
        self.highlight = ClusterIndex::empty();
        self.current_tumble = 0;
        self.total_tumbles = 0;
        self.multiplier_event = None;
        self.exploding = false;
        self.bonus = None;
        self.total_win = 0.0;
    }

    /// Drop transient reveal effects
    pub(crate) fn clear_effects(&mut self) {
        self.highlight = ClusterIndex::empty();
        self.multiplier_event = None;
        self.exploding = false;
    }
}
