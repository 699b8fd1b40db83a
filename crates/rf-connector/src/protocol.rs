//! Wire protocol for the game server
//!
//! Response bodies of the two spin endpoints and the profile endpoint, plus
//! their conversion into [`SpinOutcome`].

use rf_reveal::{Grid, SpecialSymbol, SpinOutcome, TumbleStep};
use serde::{Deserialize, Serialize};

/// Line-bonus spin endpoint
pub const PLAY_SLOT_PATH: &str = "user/play-slot";
/// Cascade spin endpoint
pub const CASCADE_SPIN_PATH: &str = "api/mythic/spin";
/// Profile / balance endpoint
pub const PROFILE_PATH: &str = "user/me";

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server root, e.g. `http://localhost:8080`
    pub base_url: String,

    /// Bearer token (if logged in)
    pub auth_token: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            timeout_ms: 5000,
        }
    }
}

/// Spin request body (both endpoints)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinRequest {
    pub bet: f64,
}

/// Error body returned with any non-2xx status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `GET /user/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileResponse {
    #[serde(default)]
    pub username: String,
    pub balance: f64,
    #[serde(default)]
    pub role: String,
}

/// `POST /user/play-slot`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaySlotResponse {
    pub check_win: bool,
    pub grid: Grid,
    pub special_symbol: SpecialSymbol,
    #[serde(default)]
    pub base_win: f64,
    pub final_win: f64,
    #[serde(default)]
    pub bonus_win: f64,
    #[serde(default = "one")]
    pub multiplier: f64,
    #[serde(default)]
    pub is_fortune_spin: bool,
    #[serde(default)]
    pub balance_change: f64,
    pub current_balance: f64,
}

impl From<PlaySlotResponse> for SpinOutcome {
    fn from(r: PlaySlotResponse) -> Self {
        Self {
            grid: r.grid,
            line_win: r.check_win,
            base_win: r.base_win,
            special_symbol: Some(r.special_symbol),
            tumbles: Vec::new(),
            bonus_triggered: r.is_fortune_spin,
            bonus_win: r.bonus_win,
            free_spins_awarded: 0,
            multiplier: r.multiplier,
            final_win: r.final_win,
            final_balance: r.current_balance,
            message: String::new(),
        }
    }
}

/// `POST /api/mythic/spin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TumbleSpinResponse {
    /// Grid after the last tumble
    pub grid: Grid,
    /// `null` when nothing tumbled
    #[serde(default)]
    pub tumbles: Option<Vec<TumbleStep>>,
    pub total_win: f64,
    #[serde(default)]
    pub base_win: f64,
    #[serde(default = "one")]
    pub total_multiplier: f64,
    pub current_balance: f64,
    #[serde(default)]
    pub scatter_count: u32,
    #[serde(default)]
    pub free_spins_awarded: u32,
    #[serde(default)]
    pub message: String,
}

impl From<TumbleSpinResponse> for SpinOutcome {
    fn from(r: TumbleSpinResponse) -> Self {
        let tumbles = r.tumbles.unwrap_or_default();
        Self {
            grid: r.grid,
            line_win: !tumbles.is_empty(),
            base_win: r.base_win,
            special_symbol: None,
            tumbles,
            bonus_triggered: r.free_spins_awarded > 0,
            bonus_win: 0.0,
            free_spins_awarded: r.free_spins_awarded,
            multiplier: r.total_multiplier,
            final_win: r.total_win,
            final_balance: r.current_balance,
            message: r.message,
        }
    }
}

fn one() -> f64 {
    1.0
}

/// Server wording for a bet above the balance
pub fn is_insufficient_balance(message: &str) -> bool {
    message.to_lowercase().contains("insufficient balance")
}
