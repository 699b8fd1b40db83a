//! StageTrace: The complete sequence of stage events for one spin
//!
//! A trace captures the full reveal timeline of a game round and can check
//! that the timeline respects ordering rules (strictly increasing tumble steps,
//! bonus before settlement, a single terminal stage).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::StageEvent;
use crate::stage::{Stage, StageCategory};

/// A complete trace of stage events for one spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    /// Spin identifier
    pub spin_id: String,

    /// Game identifier (e.g., "line_bonus", "cascade")
    pub game_id: String,

    /// All events in chronological order
    pub events: Vec<StageEvent>,

    /// When this trace was recorded
    pub recorded_at: DateTime<Utc>,
}

impl StageTrace {
    /// Create a new empty trace
    pub fn new(spin_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Self {
            spin_id: spin_id.into(),
            game_id: game_id.into(),
            events: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    /// Add an event to the trace
    pub fn push(&mut self, event: StageEvent) {
        self.events.push(event);
    }

    /// Add an event and return self (builder pattern)
    pub fn with_event(mut self, event: StageEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Get total duration in milliseconds
    pub fn duration_ms(&self) -> f64 {
        let first = self.events.first().map(|e| e.timestamp_ms).unwrap_or(0.0);
        let last = self.events.last().map(|e| e.timestamp_ms).unwrap_or(0.0);
        last - first
    }

    /// Get events by category
    pub fn events_by_category(&self, category: StageCategory) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.category() == category)
            .collect()
    }

    /// Get events by stage type name
    pub fn events_by_type(&self, type_name: &str) -> Vec<&StageEvent> {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .collect()
    }

    /// Count events of a stage type
    pub fn count(&self, type_name: &str) -> usize {
        self.events
            .iter()
            .filter(|e| e.stage.type_name() == type_name)
            .count()
    }

    /// Check if trace contains a specific stage type
    pub fn has_stage(&self, type_name: &str) -> bool {
        self.events.iter().any(|e| e.stage.type_name() == type_name)
    }

    /// Position of the first event of a stage type
    pub fn position_of(&self, type_name: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.stage.type_name() == type_name)
    }

    /// Step indices of every grid drop, in emission order
    pub fn grid_drops(&self) -> Vec<u32> {
        self.events
            .iter()
            .filter_map(|e| match e.stage {
                Stage::GridDrop { step_index } => Some(step_index),
                _ => None,
            })
            .collect()
    }

    /// Whether the spin went through a bonus phase
    pub fn has_bonus(&self) -> bool {
        self.has_stage("bonus_enter")
    }

    /// Whether the spin ended in failure
    pub fn failed(&self) -> bool {
        self.has_stage("spin_failed")
    }

    /// Validate trace ordering
    pub fn validate(&self) -> TraceValidation {
        let mut validation = TraceValidation {
            starts_with_spin_start: matches!(
                self.events.first().map(|e| &e.stage),
                Some(Stage::SpinStart { .. })
            ),
            ends_with_terminal: self
                .events
                .last()
                .map(|e| e.stage.is_terminal())
                .unwrap_or(false),
            single_terminal: self.events.iter().filter(|e| e.stage.is_terminal()).count() == 1,
            monotonic_time: self
                .events
                .windows(2)
                .all(|w| w[1].timestamp_ms >= w[0].timestamp_ms),
            ordered_steps: true,
            bonus_before_settle: true,
        };

        let mut last_step: Option<u32> = None;
        for event in &self.events {
            if let Stage::TumbleStart { step_index, .. } = event.stage {
                let expected = last_step.map(|s| s + 1).unwrap_or(0);
                if step_index != expected {
                    validation.ordered_steps = false;
                }
                last_step = Some(step_index);
            }
        }

        if let (Some(bonus), Some(settle)) =
            (self.position_of("bonus_exit"), self.position_of("settle"))
        {
            validation.bonus_before_settle = bonus < settle;
        } else if self.has_bonus() && !self.has_stage("bonus_exit") {
            validation.bonus_before_settle = false;
        }

        validation
    }

    /// Get summary statistics
    pub fn summary(&self) -> TraceSummary {
        let settled = self.events.iter().rev().find_map(|e| match e.stage {
            Stage::Settle {
                final_win,
                final_balance,
            } => Some((final_win, final_balance)),
            _ => None,
        });

        TraceSummary {
            spin_id: self.spin_id.clone(),
            event_count: self.events.len(),
            duration_ms: self.duration_ms(),
            tumble_steps: self.count("tumble_start"),
            multiplier_strikes: self.count("multiplier_strike"),
            has_bonus: self.has_bonus(),
            failed: self.failed(),
            final_win: settled.map(|(win, _)| win),
            final_balance: settled.map(|(_, balance)| balance),
        }
    }
}

/// Trace validation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceValidation {
    pub starts_with_spin_start: bool,
    pub ends_with_terminal: bool,
    pub single_terminal: bool,
    pub monotonic_time: bool,
    pub ordered_steps: bool,
    pub bonus_before_settle: bool,
}

impl TraceValidation {
    /// Check if trace is valid
    pub fn is_valid(&self) -> bool {
        self.starts_with_spin_start
            && self.ends_with_terminal
            && self.single_terminal
            && self.monotonic_time
            && self.ordered_steps
            && self.bonus_before_settle
    }

    /// Get validation warnings
    pub fn warnings(&self) -> Vec<&'static str> {
        let mut warnings = Vec::new();
        if !self.starts_with_spin_start {
            warnings.push("Trace does not start with SpinStart");
        }
        if !self.ends_with_terminal {
            warnings.push("Trace does not end with SpinEnd or SpinFailed");
        }
        if !self.single_terminal {
            warnings.push("Trace has more than one terminal stage");
        }
        if !self.monotonic_time {
            warnings.push("Event timestamps go backwards");
        }
        if !self.ordered_steps {
            warnings.push("Tumble steps skipped or replayed");
        }
        if !self.bonus_before_settle {
            warnings.push("Bonus did not finish before settlement");
        }
        warnings
    }
}

/// Trace summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceSummary {
    pub spin_id: String,
    pub event_count: usize,
    pub duration_ms: f64,
    pub tumble_steps: usize,
    pub multiplier_strikes: usize,
    pub has_bonus: bool,
    pub failed: bool,
    pub final_win: Option<f64>,
    pub final_balance: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cascade_trace() -> StageTrace {
        let mut trace = StageTrace::new("spin-1", "cascade");
        trace.push(StageEvent::new(Stage::SpinStart { bet: 50.0 }, 0.0));
        for i in 0..2u32 {
            let t = 100.0 + f64::from(i) * 1000.0;
            trace.push(StageEvent::new(
                Stage::TumbleStart {
                    step_index: i,
                    total_steps: 2,
                },
                t,
            ));
            trace.push(StageEvent::new(Stage::GridDrop { step_index: i }, t + 500.0));
        }
        trace.push(StageEvent::new(
            Stage::Settle {
                final_win: 120.0,
                final_balance: 1070.0,
            },
            2500.0,
        ));
        trace.push(StageEvent::new(Stage::SpinEnd, 2500.0));
        trace
    }

    #[test]
    fn test_valid_trace() {
        let trace = cascade_trace();
        let validation = trace.validate();
        assert!(validation.is_valid(), "{:?}", validation.warnings());
        assert_eq!(trace.grid_drops(), vec![0, 1]);
        assert!((trace.duration_ms() - 2500.0).abs() < 0.001);
    }

    #[test]
    fn test_skipped_step_is_flagged() {
        let mut trace = StageTrace::new("spin-2", "cascade");
        trace.push(StageEvent::new(Stage::SpinStart { bet: 10.0 }, 0.0));
        trace.push(StageEvent::new(
            Stage::TumbleStart {
                step_index: 1,
                total_steps: 2,
            },
            10.0,
        ));
        trace.push(StageEvent::new(Stage::SpinEnd, 20.0));

        let validation = trace.validate();
        assert!(!validation.ordered_steps);
        assert!(validation
            .warnings()
            .contains(&"Tumble steps skipped or replayed"));
    }

    #[test]
    fn test_unfinished_bonus_is_flagged() {
        let trace = StageTrace::new("spin-3", "line_bonus")
            .with_event(StageEvent::new(Stage::SpinStart { bet: 100.0 }, 0.0))
            .with_event(StageEvent::new(Stage::BonusEnter, 10.0))
            .with_event(StageEvent::new(
                Stage::Settle {
                    final_win: 0.0,
                    final_balance: 0.0,
                },
                20.0,
            ))
            .with_event(StageEvent::new(Stage::SpinEnd, 20.0));

        assert!(!trace.validate().bonus_before_settle);
    }

    #[test]
    fn test_summary() {
        let summary = cascade_trace().summary();
        assert_eq!(summary.tumble_steps, 2);
        assert_eq!(summary.final_balance, Some(1070.0));
        assert!(!summary.failed);
        assert!(!summary.has_bonus);
    }
}
