//! Presentation data model

pub mod grid;
pub mod outcome;
pub mod symbol;

pub use grid::{Grid, GridError, GridSize, Position};
pub use outcome::{
    BonusFeature, BonusOutcome, Cluster, GameVariant, OutcomeError, SpinOutcome, TumbleStep,
    WheelOutcome, WheelPrize,
};
pub use symbol::{SpecialSymbol, Symbol};
