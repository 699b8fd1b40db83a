//! TumbleCascadeEngine: steps through tumble frames in order
//!
//! Per step:
//! ```text
//! highlight clusters ── dwell ──┬── multiplier > 1 ── strike ──┐
//!                               └──────────────────────────────┤
//!                        clear + explode ── drop step grid ── settle
//! ```
//! The engine does no win detection. It forwards exactly the clusters it is
//! given and reports progress through a signal callback; the caller owns all
//! presentation state.

use std::time::Duration;

use rf_stage::RevealTiming;
use serde::{Deserialize, Serialize};

use crate::model::{Cluster, Grid, TumbleStep};

/// Progress reported while a cascade plays
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CascadeSignal<'a> {
    StepStarted {
        index: usize,
        total: usize,
    },
    /// Mark these clusters as the active highlight set
    Highlight {
        index: usize,
        clusters: &'a [Cluster],
    },
    MultiplierStrike {
        index: usize,
        multiplier: f64,
    },
    StrikeCleared {
        index: usize,
    },
    /// Highlights cleared, winning symbols removed
    Explode {
        index: usize,
    },
    /// Replace the displayed grid
    GridUpdate {
        index: usize,
        grid: &'a Grid,
        win: f64,
    },
    Finished {
        steps: usize,
    },
}

/// Completion report of one cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CascadeSummary {
    pub steps: usize,
    pub grid_updates: usize,
    pub multiplier_events: usize,
    /// Sum of step wins
    pub total_win: f64,
}

/// Sequential tumble player
#[derive(Debug, Clone)]
pub struct TumbleCascadeEngine {
    timing: RevealTiming,
}

impl TumbleCascadeEngine {
    pub fn new(timing: RevealTiming) -> Self {
        Self { timing }
    }

    pub fn timing(&self) -> &RevealTiming {
        &self.timing
    }

    /// Play every step in input order, returning after the last one settles
    ///
    /// An empty list finishes immediately with no dwell.
    pub async fn run<'a>(
        &self,
        steps: &'a [TumbleStep],
        mut on_signal: impl FnMut(CascadeSignal<'a>),
    ) -> CascadeSummary {
        let mut summary = CascadeSummary::default();
        if steps.is_empty() {
            on_signal(CascadeSignal::Finished { steps: 0 });
            return summary;
        }

        let total = steps.len();
        log::debug!("[Cascade] Revealing {} tumble steps", total);

        for (index, step) in steps.iter().enumerate() {
            on_signal(CascadeSignal::StepStarted { index, total });

            on_signal(CascadeSignal::Highlight {
                index,
                clusters: &step.clusters,
            });
            hold(self.timing.highlight_dwell()).await;

            if step.has_multiplier_event() {
                log::debug!(
                    "[Cascade] Step {} multiplier strike x{}",
                    index,
                    step.multiplier
                );
                on_signal(CascadeSignal::MultiplierStrike {
                    index,
                    multiplier: step.multiplier,
                });
                hold(self.timing.multiplier_strike()).await;
                on_signal(CascadeSignal::StrikeCleared { index });
                summary.multiplier_events += 1;
            }

            on_signal(CascadeSignal::Explode { index });
            hold(self.timing.explode()).await;

            on_signal(CascadeSignal::GridUpdate {
                index,
                grid: &step.grid,
                win: step.win,
            });
            summary.grid_updates += 1;
            summary.total_win += step.win;
            hold(self.timing.settle()).await;

            summary.steps += 1;
        }

        on_signal(CascadeSignal::Finished {
            steps: summary.steps,
        });
        summary
    }
}

/// Suspend for a phase; zero-length phases do not yield
pub(crate) async fn hold(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}
