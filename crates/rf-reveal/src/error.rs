//! Error types for the reveal core

use thiserror::Error;

use crate::model::OutcomeError;

/// Failure reported by the game-service or session collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceFailure {
    #[error("Session expired or invalid")]
    Unauthorized,

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("{0}")]
    Service(String),

    #[error("Malformed outcome: {0}")]
    Malformed(#[from] OutcomeError),

    #[error("Bonus outcome is not served by this game service")]
    Unsupported,
}

/// Why a `trigger()` did not produce a settled spin
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpinError {
    /// A spin is already in flight
    #[error("Spin already in progress")]
    Busy,

    /// Rejected locally, no request was made
    #[error("Insufficient balance: {balance} < {bet}")]
    InsufficientFunds { balance: f64, bet: f64 },

    #[error("Invalid bet: {0}")]
    InvalidBet(f64),

    /// Session rejected by the game service
    #[error("Session expired")]
    Unauthorized,

    /// Any other request failure
    #[error("Spin request failed: {0}")]
    Service(ServiceFailure),
}

impl SpinError {
    /// Rejections that never left `Idle`
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Busy | Self::InsufficientFunds { .. } | Self::InvalidBet(_)
        )
    }
}

impl From<ServiceFailure> for SpinError {
    fn from(failure: ServiceFailure) -> Self {
        match failure {
            ServiceFailure::Unauthorized => Self::Unauthorized,
            other => Self::Service(other),
        }
    }
}

/// Configuration load/save errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
