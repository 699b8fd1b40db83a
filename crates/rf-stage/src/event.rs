//! StageEvent: A stage occurrence with metadata
//!
//! Wraps a Stage with its offset into the spin timeline and optional payload.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// A stage event with full metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageEvent {
    /// The canonical stage
    pub stage: Stage,

    /// Milliseconds since the spin was accepted
    pub timestamp_ms: f64,

    /// Additional payload data
    #[serde(default)]
    pub payload: StagePayload,

    /// Spin this event belongs to
    #[serde(default)]
    pub spin_id: Option<String>,
}

impl StageEvent {
    pub fn new(stage: Stage, timestamp_ms: f64) -> Self {
        Self {
            stage,
            timestamp_ms,
            payload: StagePayload::default(),
            spin_id: None,
        }
    }

    /// Create with payload
    pub fn with_payload(stage: Stage, timestamp_ms: f64, payload: StagePayload) -> Self {
        Self {
            stage,
            timestamp_ms,
            payload,
            spin_id: None,
        }
    }

    /// Attach the owning spin
    pub fn for_spin(mut self, spin_id: impl Into<String>) -> Self {
        self.spin_id = Some(spin_id.into());
        self
    }

    /// Get stage type name
    pub fn type_name(&self) -> &'static str {
        self.stage.type_name()
    }
}

/// Additional payload data for a stage event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagePayload {
    /// Win amount at this point of the reveal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub win_amount: Option<f64>,

    /// Bet amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet_amount: Option<f64>,

    /// Multiplier in effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,

    /// Balance committed by this event (settlement only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,

    /// Player-facing message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StagePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with win data
    pub fn with_win(win_amount: f64, bet_amount: Option<f64>) -> Self {
        Self {
            win_amount: Some(win_amount),
            bet_amount,
            ..Default::default()
        }
    }

    pub fn win_amount(mut self, amount: f64) -> Self {
        self.win_amount = Some(amount);
        self
    }

    pub fn bet_amount(mut self, amount: f64) -> Self {
        self.bet_amount = Some(amount);
        self
    }

    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = Some(mult);
        self
    }

    pub fn balance(mut self, balance: f64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Win-to-bet ratio if both amounts are known
    pub fn win_ratio(&self) -> Option<f64> {
        match (self.win_amount, self.bet_amount) {
            (Some(win), Some(bet)) if bet > 0.0 => Some(win / bet),
            _ => None,
        }
    }
}
