//! Reveal Configuration: TOML-based config for one game table

use std::path::Path;

use rf_stage::{RevealTiming, TimingProfile};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{GameVariant, GridSize};

/// Complete orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevealConfig {
    /// Game variant, fixes grid dimensions and request kind
    #[serde(default)]
    pub variant: GameVariant,

    /// Timing profile
    #[serde(default)]
    pub profile: TimingProfile,

    /// Explicit phase durations, overriding the profile
    #[serde(default)]
    pub timing: Option<RevealTiming>,

    /// Bonus wheel presentation
    #[serde(default)]
    pub wheel: WheelConfig,

    /// Autoplay defaults
    #[serde(default)]
    pub autoplay: AutoplayConfig,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            variant: GameVariant::default(),
            profile: TimingProfile::Normal,
            timing: None,
            wheel: WheelConfig::default(),
            autoplay: AutoplayConfig::default(),
        }
    }
}

impl RevealConfig {
    pub fn new(variant: GameVariant) -> Self {
        Self {
            variant,
            ..Default::default()
        }
    }

    /// Same config with a different timing profile
    pub fn with_profile(mut self, profile: TimingProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Same config with explicit phase durations
    pub fn with_timing(mut self, timing: RevealTiming) -> Self {
        self.timing = Some(timing);
        self
    }

    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML string
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        log::info!("[Config] Loaded {}", path.as_ref().display());
        Self::from_toml(&text)
    }

    /// Grid dimensions of the configured variant
    pub fn grid_size(&self) -> GridSize {
        self.variant.grid_size()
    }

    /// Effective phase durations
    pub fn timing(&self) -> RevealTiming {
        self.timing
            .clone()
            .unwrap_or_else(|| RevealTiming::from_profile(self.profile))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.wheel.validate()?;
        let bet = self.autoplay.default_bet;
        if !bet.is_finite() || bet <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "autoplay.default_bet must be positive, got {}",
                bet
            )));
        }
        Ok(())
    }
}

/// Who picks the prize the wheel lands on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WheelPrizeSource {
    /// Wheel animates toward `bonus_win` from the spin outcome
    #[default]
    Payload,
    /// Prize fetched with a separate bonus request
    Server,
}

/// Fortune wheel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    /// Sector prizes, clockwise from the pointer
    #[serde(default = "default_sectors")]
    pub sectors: Vec<f64>,

    /// Minimum full turns before landing
    #[serde(default = "default_min_turns")]
    pub min_turns: u32,

    /// Maximum full turns before landing
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default)]
    pub prize_source: WheelPrizeSource,

    /// Fixed RNG seed for reproducible rotations
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_sectors() -> Vec<f64> {
    vec![1000.0, 50.0, 200.0, 100.0, 500.0, 20.0, 2000.0, 10.0]
}

fn default_min_turns() -> u32 {
    5
}

fn default_max_turns() -> u32 {
    8
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            sectors: default_sectors(),
            min_turns: default_min_turns(),
            max_turns: default_max_turns(),
            prize_source: WheelPrizeSource::Payload,
            seed: None,
        }
    }
}

impl WheelConfig {
    /// Angle covered by one sector (degrees)
    pub fn sector_angle(&self) -> f64 {
        360.0 / self.sectors.len().max(1) as f64
    }

    /// Sector holding this prize, if any
    pub fn sector_of(&self, prize: f64) -> Option<usize> {
        self.sectors
            .iter()
            .position(|s| (s - prize).abs() < f64::EPSILON)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sectors.is_empty() {
            return Err(ConfigError::Invalid(
                "wheel.sectors cannot be empty".to_string(),
            ));
        }
        if self.min_turns == 0 || self.min_turns > self.max_turns {
            return Err(ConfigError::Invalid(format!(
                "wheel turns must satisfy 0 < min <= max, got {}..={}",
                self.min_turns, self.max_turns
            )));
        }
        Ok(())
    }
}

/// Autoplay defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoplayConfig {
    /// Bet used when autoplay starts without an explicit bet
    #[serde(default = "default_bet")]
    pub default_bet: f64,
}

fn default_bet() -> f64 {
    10.0
}

impl Default for AutoplayConfig {
    fn default() -> Self {
        Self {
            default_bet: default_bet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RevealConfig::default();
        assert_eq!(config.grid_size(), GridSize::new(3, 3));
        assert_eq!(config.timing(), RevealTiming::normal());
        assert_eq!(config.wheel.sectors.len(), 8);
        assert_eq!(config.wheel.sector_angle(), 45.0);
        assert_eq!(config.wheel.sector_of(2000.0), Some(6));
        assert_eq!(config.wheel.sector_of(3.0), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            variant = "cascade"
            profile = "instant"

            [wheel]
            prize_source = "server"
            seed = 7

            [autoplay]
            default_bet = 50.0
        "#;
        let config = RevealConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.variant, GameVariant::Cascade);
        assert_eq!(config.grid_size(), GridSize::new(5, 6));
        assert_eq!(config.timing(), RevealTiming::instant());
        assert_eq!(config.wheel.prize_source, WheelPrizeSource::Server);
        assert_eq!(config.wheel.seed, Some(7));
        assert_eq!(config.wheel.min_turns, 5);
        assert_eq!(config.autoplay.default_bet, 50.0);
    }

    #[test]
    fn test_timing_override_wins() {
        let config = RevealConfig::default().with_timing(RevealTiming::turbo());
        assert_eq!(config.timing(), RevealTiming::turbo());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = RevealConfig::new(GameVariant::Cascade).with_profile(TimingProfile::Turbo);
        let text = config.to_toml().unwrap();
        assert_eq!(RevealConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            RevealConfig::from_toml("[wheel]\nsectors = []"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RevealConfig::from_toml("[wheel]\nmin_turns = 9"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            RevealConfig::from_toml("variant = 3"),
            Err(ConfigError::Parse(_))
        ));
    }
}
