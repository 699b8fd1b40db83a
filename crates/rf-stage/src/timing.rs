//! Timing: phase durations for the reveal timeline
//!
//! STAGES don't inherently have timing. This module holds the hold/dwell
//! durations each phase suspends for, grouped into profiles.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Timing profile identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimingProfile {
    /// Normal gameplay speed
    #[default]
    Normal,
    /// Fast/Turbo mode
    Turbo,
    /// Instant (no delays, for testing)
    Instant,
}

impl TimingProfile {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Turbo => "Turbo",
            Self::Instant => "Instant",
        }
    }
}

impl std::str::FromStr for TimingProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "turbo" => Ok(Self::Turbo),
            "instant" => Ok(Self::Instant),
            other => Err(format!("unknown timing profile: {}", other)),
        }
    }
}

/// Hold durations for every suspension point of a spin (ms)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealTiming {
    /// Profile identifier
    pub profile: TimingProfile,

    /// Suspense hold after the outcome arrives
    pub pre_reveal_ms: u64,

    /// Winning clusters stay highlighted this long
    pub highlight_dwell_ms: u64,

    /// Multiplier strike effect
    pub multiplier_strike_ms: u64,

    /// Explode hold after highlights clear
    pub explode_ms: u64,

    /// Settle hold after a step grid drops in
    pub settle_ms: u64,

    /// Pause between grid settlement and the wheel appearing
    pub wheel_lead_in_ms: u64,

    /// Wheel spin-to-stop
    pub wheel_spin_ms: u64,

    /// Pause before the free spins banner
    pub free_spins_lead_in_ms: u64,

    /// Free spins banner hold
    pub free_spins_banner_ms: u64,

    /// Autoplay delay between spins
    pub autoplay_delay_ms: u64,
}

impl Default for RevealTiming {
    fn default() -> Self {
        Self::normal()
    }
}

impl RevealTiming {
    /// Normal gameplay timing
    pub fn normal() -> Self {
        Self {
            profile: TimingProfile::Normal,
            pre_reveal_ms: 2000,
            highlight_dwell_ms: 800,
            multiplier_strike_ms: 1000,
            explode_ms: 500,
            settle_ms: 600,
            wheel_lead_in_ms: 1000,
            wheel_spin_ms: 5000,
            free_spins_lead_in_ms: 500,
            free_spins_banner_ms: 3000,
            autoplay_delay_ms: 1000,
        }
    }

    /// Turbo timing, roughly 40% of normal
    pub fn turbo() -> Self {
        let mut timing = Self::normal().scaled(0.4);
        timing.profile = TimingProfile::Turbo;
        timing
    }

    /// Instant timing (for testing)
    pub fn instant() -> Self {
        Self {
            profile: TimingProfile::Instant,
            ..Self::normal().scaled(0.0)
        }
    }

    /// Create from profile
    pub fn from_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Normal => Self::normal(),
            TimingProfile::Turbo => Self::turbo(),
            TimingProfile::Instant => Self::instant(),
        }
    }

    /// Scale every duration by a factor
    pub fn scaled(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        let scale = |ms: u64| (ms as f64 * factor).round() as u64;
        Self {
            profile: self.profile,
            pre_reveal_ms: scale(self.pre_reveal_ms),
            highlight_dwell_ms: scale(self.highlight_dwell_ms),
            multiplier_strike_ms: scale(self.multiplier_strike_ms),
            explode_ms: scale(self.explode_ms),
            settle_ms: scale(self.settle_ms),
            wheel_lead_in_ms: scale(self.wheel_lead_in_ms),
            wheel_spin_ms: scale(self.wheel_spin_ms),
            free_spins_lead_in_ms: scale(self.free_spins_lead_in_ms),
            free_spins_banner_ms: scale(self.free_spins_banner_ms),
            autoplay_delay_ms: scale(self.autoplay_delay_ms),
        }
    }

    pub fn pre_reveal(&self) -> Duration {
        Duration::from_millis(self.pre_reveal_ms)
    }

    pub fn highlight_dwell(&self) -> Duration {
        Duration::from_millis(self.highlight_dwell_ms)
    }

    pub fn multiplier_strike(&self) -> Duration {
        Duration::from_millis(self.multiplier_strike_ms)
    }

    pub fn explode(&self) -> Duration {
        Duration::from_millis(self.explode_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn wheel_lead_in(&self) -> Duration {
        Duration::from_millis(self.wheel_lead_in_ms)
    }

    pub fn wheel_spin(&self) -> Duration {
        Duration::from_millis(self.wheel_spin_ms)
    }

    pub fn free_spins_lead_in(&self) -> Duration {
        Duration::from_millis(self.free_spins_lead_in_ms)
    }

    pub fn free_spins_banner(&self) -> Duration {
        Duration::from_millis(self.free_spins_banner_ms)
    }

    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }

    /// Length of one tumble step
    pub fn tumble_step_ms(&self, with_strike: bool) -> u64 {
        let strike = if with_strike {
            self.multiplier_strike_ms
        } else {
            0
        };
        self.highlight_dwell_ms + strike + self.explode_ms + self.settle_ms
    }

    /// Expected cascade duration for a step list
    pub fn cascade_ms(&self, steps: usize, strikes: usize) -> u64 {
        let strikes = strikes.min(steps) as u64;
        let steps = steps as u64;
        steps * self.tumble_step_ms(false) + strikes * self.multiplier_strike_ms
    }
}
