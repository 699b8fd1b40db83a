//! ResultReconciler: terminal outcome → displayed message, balance and win
//!
//! Pure and synchronous. Called once, at the settling boundary.

use serde::{Deserialize, Serialize};

use crate::model::{SpinOutcome, WheelOutcome};

/// Headline used when the server sends none
pub const DEFAULT_WIN_HEADLINE: &str = "BIG WIN!";

/// Message shown to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DisplayMessage {
    Win {
        headline: String,
        amount: f64,
        multiplier: f64,
    },
    Loss,
    /// Local funds check failed
    InsufficientFunds,
    SessionExpired,
    /// Request failed, carries the server's text when there is one
    ServiceError(String),
}

impl DisplayMessage {
    pub fn is_win(&self) -> bool {
        matches!(self, Self::Win { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds | Self::SessionExpired | Self::ServiceError(_)
        )
    }
}

impl std::fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Win {
                headline,
                amount,
                multiplier,
            } => write!(
                f,
                "{} +${} (Mult: {}x)",
                headline,
                format_amount(*amount),
                format_amount(*multiplier)
            ),
            Self::Loss => f.write_str("Try Again!"),
            Self::InsufficientFunds => f.write_str("Insufficient balance!"),
            Self::SessionExpired => f.write_str("Session expired. Please login again."),
            Self::ServiceError(text) if text.trim().is_empty() => f.write_str("Error occurred"),
            Self::ServiceError(text) => f.write_str(text),
        }
    }
}

/// Whole amounts print without decimals, anything else with two
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

/// Final visible state of a spin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub message: DisplayMessage,
    pub final_balance: f64,
    pub final_win: f64,
}

/// Map a terminal outcome to the settlement
///
/// Wheel values, when present, supersede the spin payload.
pub fn reconcile(outcome: &SpinOutcome, wheel: Option<&WheelOutcome>) -> Settlement {
    let (final_win, final_balance) = match wheel {
        Some(w) => (w.final_win, w.final_balance),
        None => (outcome.final_win, outcome.final_balance),
    };

    let message = if final_win > 0.0 {
        let headline = outcome.message.trim();
        DisplayMessage::Win {
            headline: if headline.is_empty() {
                DEFAULT_WIN_HEADLINE.to_string()
            } else {
                headline.to_string()
            },
            amount: final_win,
            multiplier: outcome.multiplier,
        }
    } else {
        DisplayMessage::Loss
    };

    Settlement {
        message,
        final_balance,
        final_win,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GameVariant, Grid};

    fn outcome(final_win: f64, final_balance: f64) -> SpinOutcome {
        SpinOutcome {
            grid: Grid::placeholder(GameVariant::LineBonus.grid_size()),
            line_win: final_win > 0.0,
            base_win: final_win,
            special_symbol: None,
            tumbles: Vec::new(),
            bonus_triggered: false,
            bonus_win: 0.0,
            free_spins_awarded: 0,
            multiplier: 2.0,
            final_win,
            final_balance,
            message: String::new(),
        }
    }

    #[test]
    fn test_loss() {
        let settlement = reconcile(&outcome(0.0, 90.0), None);
        assert_eq!(settlement.message, DisplayMessage::Loss);
        assert_eq!(settlement.message.to_string(), "Try Again!");
        assert_eq!(settlement.final_balance, 90.0);
    }

    #[test]
    fn test_win_uses_default_headline() {
        let settlement = reconcile(&outcome(40.0, 130.0), None);
        assert!(settlement.message.is_win());
        assert_eq!(settlement.message.to_string(), "BIG WIN! +$40 (Mult: 2x)");
        assert_eq!(settlement.final_win, 40.0);
    }

    #[test]
    fn test_win_uses_server_headline() {
        let mut out = outcome(12.5, 112.5);
        out.message = "MEGA WIN!".to_string();
        let settlement = reconcile(&out, None);
        assert_eq!(settlement.message.to_string(), "MEGA WIN! +$12.50 (Mult: 2x)");
    }

    #[test]
    fn test_wheel_values_supersede_payload() {
        let out = outcome(0.0, 100.0);
        let wheel = WheelOutcome {
            prize: 500.0,
            sector: Some(4),
            rotation_deg: 2000.0,
            final_win: 500.0,
            final_balance: 600.0,
        };
        let settlement = reconcile(&out, Some(&wheel));
        assert!(settlement.message.is_win());
        assert_eq!(settlement.final_balance, 600.0);
        assert_eq!(settlement.final_win, 500.0);
    }

    #[test]
    fn test_error_texts() {
        assert_eq!(
            DisplayMessage::InsufficientFunds.to_string(),
            "Insufficient balance!"
        );
        assert_eq!(
            DisplayMessage::SessionExpired.to_string(),
            "Session expired. Please login again."
        );
        assert_eq!(
            DisplayMessage::ServiceError(String::new()).to_string(),
            "Error occurred"
        );
        assert_eq!(
            DisplayMessage::ServiceError("Bet too high".into()).to_string(),
            "Bet too high"
        );
        assert!(DisplayMessage::SessionExpired.is_error());
        assert!(!DisplayMessage::Loss.is_error());
    }
}
