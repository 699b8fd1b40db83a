//! Server-computed spin outcome payloads
//!
//! Everything here is produced by the game service and treated as opaque,
//! already-correct data. The client never detects wins or computes balances.

use serde::{Deserialize, Serialize};

use super::grid::{Grid, GridError, GridSize, Position};
use super::symbol::{SpecialSymbol, Symbol};

/// Game variant, fixes grid dimensions and the outcome request used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameVariant {
    /// 3×3 paylines with a special reel and the fortune wheel bonus
    #[default]
    LineBonus,
    /// 5 rows × 6 columns tumbling clusters with free spins
    Cascade,
}

impl GameVariant {
    pub fn grid_size(&self) -> GridSize {
        match self {
            Self::LineBonus => GridSize::new(3, 3),
            Self::Cascade => GridSize::new(5, 6),
        }
    }

    pub fn game_id(&self) -> &'static str {
        match self {
            Self::LineBonus => "line_bonus",
            Self::Cascade => "cascade",
        }
    }
}

impl std::str::FromStr for GameVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line_bonus" | "line" | "fortune_gems" => Ok(Self::LineBonus),
            "cascade" | "mythic_lightning" => Ok(Self::Cascade),
            other => Err(format!("unknown game variant: {}", other)),
        }
    }
}

/// One win on a tumble step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub symbol: Symbol,
    pub positions: Vec<Position>,
}

impl Cluster {
    pub fn new(symbol: Symbol, positions: Vec<Position>) -> Self {
        Self { symbol, positions }
    }

    pub fn size(&self) -> usize {
        self.positions.len()
    }
}

/// Grid state after one cascade step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TumbleStep {
    /// Grid after this step's wins were replaced
    pub grid: Grid,
    /// Clusters won on this step
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    /// `> 1` renders a multiplier strike before advancing
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Win paid by this step
    #[serde(default)]
    pub win: f64,
}

impl TumbleStep {
    pub fn has_multiplier_event(&self) -> bool {
        self.multiplier > 1.0
    }
}

fn default_multiplier() -> f64 {
    1.0
}

/// Immutable payload for one spin request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinOutcome {
    /// Base grid (final grid when there are no tumbles)
    pub grid: Grid,
    /// Whether a line/cluster win occurred
    #[serde(default)]
    pub line_win: bool,
    #[serde(default)]
    pub base_win: f64,
    /// Special reel token (line-bonus variant)
    #[serde(default)]
    pub special_symbol: Option<SpecialSymbol>,
    /// Ordered cascade steps, empty when nothing tumbled
    #[serde(default)]
    pub tumbles: Vec<TumbleStep>,
    #[serde(default)]
    pub bonus_triggered: bool,
    #[serde(default)]
    pub bonus_win: f64,
    /// Free spins awarded (cascade variant)
    #[serde(default)]
    pub free_spins_awarded: u32,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    pub final_win: f64,
    /// Account balance after this spin, authoritative
    pub final_balance: f64,
    /// Server headline ("BIG WIN!", "Try again!", ...)
    #[serde(default)]
    pub message: String,
}

/// Outcome rejected before any reveal
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OutcomeError {
    #[error("Base grid: {0}")]
    BaseGrid(GridError),

    #[error("Tumble step {step}: {source}")]
    StepGrid { step: usize, source: GridError },

    #[error("Tumble step {step}: cluster cell ({}, {}) outside the grid", .position.row, .position.col)]
    ClusterOutOfBounds { step: usize, position: Position },

    #[error("Non-finite amount in field {0}")]
    NonFinite(&'static str),
}

impl SpinOutcome {
    /// Check the payload against the variant's fixed dimensions
    pub fn validate(&self, size: GridSize) -> Result<(), OutcomeError> {
        self.grid.check_size(size).map_err(OutcomeError::BaseGrid)?;

        for (step, tumble) in self.tumbles.iter().enumerate() {
            tumble
                .grid
                .check_size(size)
                .map_err(|source| OutcomeError::StepGrid { step, source })?;

            let stray = tumble
                .clusters
                .iter()
                .flat_map(|c| c.positions.iter())
                .find(|p| !size.contains(**p));
            if let Some(position) = stray {
                return Err(OutcomeError::ClusterOutOfBounds {
                    step,
                    position: *position,
                });
            }
        }

        let amounts = [
            ("final_win", self.final_win),
            ("final_balance", self.final_balance),
            ("bonus_win", self.bonus_win),
            ("base_win", self.base_win),
            ("multiplier", self.multiplier),
        ];
        for (name, value) in amounts {
            if !value.is_finite() {
                return Err(OutcomeError::NonFinite(name));
            }
        }

        Ok(())
    }

    /// Grid the player sees once every step has been revealed
    pub fn settled_grid(&self) -> &Grid {
        self.tumbles.last().map(|t| &t.grid).unwrap_or(&self.grid)
    }

    /// Steps that render a multiplier strike
    pub fn multiplier_events(&self) -> usize {
        self.tumbles
            .iter()
            .filter(|t| t.has_multiplier_event())
            .count()
    }

    /// Bonus feature this outcome hands to the bonus phase
    pub fn bonus_feature(&self) -> Option<BonusFeature> {
        if self.free_spins_awarded > 0 {
            return Some(BonusFeature::FreeSpins {
                awarded: self.free_spins_awarded,
            });
        }
        if self.bonus_triggered {
            return Some(BonusFeature::FortuneWheel(WheelPrize {
                prize: self.bonus_win,
                final_win: self.final_win,
                final_balance: self.final_balance,
            }));
        }
        None
    }
}

/// Prize the wheel presents, with the balance/win it settles to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelPrize {
    pub prize: f64,
    pub final_win: f64,
    pub final_balance: f64,
}

/// Bonus sub-game triggered by a spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusFeature {
    FortuneWheel(WheelPrize),
    FreeSpins { awarded: u32 },
}

/// Terminal result of a wheel spin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelOutcome {
    /// Prize the wheel stopped on
    pub prize: f64,
    /// Sector index matching the prize, if the prize is on the wheel
    pub sector: Option<usize>,
    /// Total rotation played (degrees)
    pub rotation_deg: f64,
    /// Externally supplied win after the bonus
    pub final_win: f64,
    /// Externally supplied balance after the bonus
    pub final_balance: f64,
}

/// Terminal result of the bonus phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusOutcome {
    Wheel(WheelOutcome),
    FreeSpins { awarded: u32 },
}

impl BonusOutcome {
    pub fn wheel(&self) -> Option<&WheelOutcome> {
        match self {
            Self::Wheel(outcome) => Some(outcome),
            Self::FreeSpins { .. } => None,
        }
    }
}
