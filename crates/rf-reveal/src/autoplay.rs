//! AutoplayDriver: repeats the manual spin under guard conditions
//!
//! Each round: wait for `Idle` → guards → inter-spin delay → guards → trigger.
//! Disabling wakes the delay immediately but never cancels a spin in flight.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::cascade::hold;
use crate::error::{ServiceFailure, SpinError};
use crate::orchestrator::SpinOrchestrator;
use crate::service::{GameService, SessionAuthority};

/// Autoplay switch and bet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoplayState {
    pub enabled: bool,
    pub bet: f64,
}

/// Why an autoplay run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoplayStop {
    /// Switched off by the player
    Stopped,
    /// Mirrored balance below the bet
    InsufficientFunds,
    SessionExpired,
    /// Server refused the bet for insufficient funds
    Declined,
}

impl AutoplayStop {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::InsufficientFunds => "Insufficient balance",
            Self::SessionExpired => "Session expired",
            Self::Declined => "Bet declined",
        }
    }
}

pub struct AutoplayDriver {
    state: watch::Sender<AutoplayState>,
    spins: AtomicUsize,
}

impl AutoplayDriver {
    /// Disabled driver for this bet
    pub fn new(bet: f64) -> Self {
        let (state, _) = watch::channel(AutoplayState {
            enabled: false,
            bet,
        });
        Self {
            state,
            spins: AtomicUsize::new(0),
        }
    }

    /// Flip `enabled`, returning the new value
    pub fn toggle(&self) -> bool {
        let mut enabled = false;
        self.state.send_modify(|s| {
            s.enabled = !s.enabled;
            enabled = s.enabled;
        });
        log::info!(
            "[Autoplay] {}",
            if enabled { "Enabled" } else { "Disabled" }
        );
        enabled
    }

    pub fn enable(&self) {
        self.state.send_if_modified(|s| !std::mem::replace(&mut s.enabled, true));
    }

    pub fn disable(&self) {
        self.state.send_if_modified(|s| std::mem::replace(&mut s.enabled, false));
    }

    pub fn set_bet(&self, bet: f64) {
        self.state.send_modify(|s| s.bet = bet);
    }

    pub fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    pub fn bet(&self) -> f64 {
        self.state.borrow().bet
    }

    pub fn subscribe(&self) -> watch::Receiver<AutoplayState> {
        self.state.subscribe()
    }

    /// Spins this driver completed
    pub fn spins(&self) -> usize {
        self.spins.load(Ordering::Relaxed)
    }

    /// Keep spinning while enabled
    ///
    /// Returns when disabled or a stop condition fires. `enabled` is false on
    /// return.
    pub async fn run<G: GameService, S: SessionAuthority>(
        &self,
        orchestrator: &SpinOrchestrator<G, S>,
    ) -> AutoplayStop {
        let mut switch = self.state.subscribe();
        let mut snapshots = orchestrator.subscribe();
        let delay = orchestrator.timing().autoplay_delay();

        loop {
            if !self.is_enabled() {
                return AutoplayStop::Stopped;
            }

            // Never trigger while a spin is in flight
            let idle = async {
                snapshots.wait_for(|s| s.is_idle()).await.is_ok()
            };
            tokio::select! {
                biased;
                _ = disabled(&mut switch) => return AutoplayStop::Stopped,
                ok = idle => {
                    if !ok {
                        self.disable();
                        return AutoplayStop::Stopped;
                    }
                }
            }

            if let Some(stop) = self.guard(orchestrator) {
                return stop;
            }

            tokio::select! {
                biased;
                _ = disabled(&mut switch) => return AutoplayStop::Stopped,
                _ = hold(delay) => {}
            }

            if let Some(stop) = self.guard(orchestrator) {
                return stop;
            }

            let bet = self.bet();
            match orchestrator.trigger(bet).await {
                Ok(report) => {
                    let n = self.spins.fetch_add(1, Ordering::Relaxed) + 1;
                    log::debug!(
                        "[Autoplay] Spin #{} settled: {}",
                        n,
                        report.settlement.message
                    );
                }
                Err(SpinError::Busy) => {
                    log::debug!("[Autoplay] Orchestrator busy, waiting");
                }
                Err(SpinError::InsufficientFunds { .. }) => {
                    return self.stop(AutoplayStop::InsufficientFunds);
                }
                Err(SpinError::Unauthorized) => {
                    return self.stop(AutoplayStop::SessionExpired);
                }
                Err(SpinError::Service(ServiceFailure::InsufficientFunds)) => {
                    return self.stop(AutoplayStop::Declined);
                }
                Err(SpinError::InvalidBet(bet)) => {
                    log::warn!("[Autoplay] Invalid bet {}", bet);
                    return self.stop(AutoplayStop::Stopped);
                }
                Err(e) => {
                    log::warn!("[Autoplay] Spin failed, continuing: {}", e);
                }
            }
        }
    }

    /// Stop conditions checked before every trigger
    fn guard<G: GameService, S: SessionAuthority>(
        &self,
        orchestrator: &SpinOrchestrator<G, S>,
    ) -> Option<AutoplayStop> {
        if !self.is_enabled() {
            return Some(AutoplayStop::Stopped);
        }
        if orchestrator.is_session_expired() {
            return Some(self.stop(AutoplayStop::SessionExpired));
        }
        let balance = orchestrator.balance();
        let bet = self.bet();
        if balance < bet {
            log::info!("[Autoplay] Balance {} below bet {}", balance, bet);
            return Some(self.stop(AutoplayStop::InsufficientFunds));
        }
        None
    }

    fn stop(&self, reason: AutoplayStop) -> AutoplayStop {
        self.disable();
        log::info!("[Autoplay] Stopped: {}", reason.display_name());
        reason
    }
}

/// Resolves once autoplay is switched off
async fn disabled(switch: &mut watch::Receiver<AutoplayState>) {
    if switch.wait_for(|s| !s.enabled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use rf_stage::TimingProfile;
    use tokio::time::Instant;

    use crate::config::RevealConfig;
    use crate::model::{GameVariant, Grid, SpinOutcome, Symbol};
    use crate::service::{FixedSession, ScriptedGameService};

    fn orchestrator(
        profile: TimingProfile,
        balance: f64,
    ) -> SpinOrchestrator<ScriptedGameService, FixedSession> {
        SpinOrchestrator::new(
            RevealConfig::new(GameVariant::LineBonus).with_profile(profile),
            Arc::new(ScriptedGameService::new()),
            Arc::new(FixedSession::new(balance)),
            balance,
        )
    }

    fn loss(final_balance: f64) -> SpinOutcome {
        SpinOutcome {
            grid: Grid::from_rows(vec![vec![Symbol::King; 3]; 3]).unwrap(),
            line_win: false,
            base_win: 0.0,
            special_symbol: None,
            tumbles: Vec::new(),
            bonus_triggered: false,
            bonus_win: 0.0,
            free_spins_awarded: 0,
            multiplier: 1.0,
            final_win: 0.0,
            final_balance,
            message: String::new(),
        }
    }

    #[test]
    fn test_toggle() {
        let driver = AutoplayDriver::new(10.0);
        assert!(!driver.is_enabled());
        assert!(driver.toggle());
        assert!(driver.is_enabled());
        assert!(!driver.toggle());
        driver.enable();
        driver.set_bet(25.0);
        assert!(driver.is_enabled());
        assert_eq!(driver.bet(), 25.0);
    }

    #[tokio::test]
    async fn test_disabled_driver_returns_immediately() {
        let orch = orchestrator(TimingProfile::Instant, 100.0);
        let driver = AutoplayDriver::new(10.0);
        assert_eq!(driver.run(&orch).await, AutoplayStop::Stopped);
        assert_eq!(orch.service().request_count(), 0);
    }

    #[tokio::test]
    async fn test_spins_until_balance_runs_out() {
        let orch = orchestrator(TimingProfile::Instant, 30.0);
        orch.service()
            .push_outcome(loss(20.0))
            .push_outcome(loss(10.0))
            .push_outcome(loss(0.0));

        let driver = AutoplayDriver::new(10.0);
        driver.enable();
        assert_eq!(driver.run(&orch).await, AutoplayStop::InsufficientFunds);
        assert!(!driver.is_enabled());
        assert_eq!(driver.spins(), 3);
        assert_eq!(orch.service().request_count(), 3);
        assert_eq!(orch.balance(), 0.0);
    }

    #[tokio::test]
    async fn test_service_error_keeps_running() {
        let orch = orchestrator(TimingProfile::Instant, 20.0);
        orch.service()
            .push_failure(ServiceFailure::Service("Database error".into()))
            .push_outcome(loss(5.0));

        let driver = AutoplayDriver::new(10.0);
        driver.enable();
        assert_eq!(driver.run(&orch).await, AutoplayStop::InsufficientFunds);
        assert_eq!(driver.spins(), 1);
        assert_eq!(orch.service().request_count(), 2);
    }

    #[tokio::test]
    async fn test_server_decline_disables() {
        let orch = orchestrator(TimingProfile::Instant, 100.0);
        orch.service().push_failure(ServiceFailure::InsufficientFunds);

        let driver = AutoplayDriver::new(10.0);
        driver.enable();
        assert_eq!(driver.run(&orch).await, AutoplayStop::Declined);
        assert!(!driver.is_enabled());
        assert_eq!(orch.balance(), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_delay() {
        let orch = orchestrator(TimingProfile::Normal, 100.0);
        let driver = AutoplayDriver::new(10.0);
        driver.enable();

        let start = Instant::now();
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            driver.toggle();
        };
        let (stop, _) = tokio::join!(driver.run(&orch), stopper);

        assert_eq!(stop, AutoplayStop::Stopped);
        assert_eq!(start.elapsed(), Duration::from_millis(300));
        assert_eq!(orch.service().request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_lets_spin_in_flight_settle() {
        let orch = orchestrator(TimingProfile::Normal, 100.0);
        orch.service().push_outcome(loss(90.0)).push_outcome(loss(80.0));
        let driver = AutoplayDriver::new(10.0);
        driver.enable();

        let start = Instant::now();
        // 1000ms delay, then the spin sits in its 2000ms pre-reveal
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            assert_eq!(orch.state(), crate::snapshot::OrchestratorState::AwaitingResult);
            driver.toggle();
        };
        let (stop, _) = tokio::join!(driver.run(&orch), stopper);

        assert_eq!(stop, AutoplayStop::Stopped);
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
        assert_eq!(orch.service().request_count(), 1);
        assert_eq!(driver.spins(), 1);
        assert!(orch.snapshot().is_idle());
        assert_eq!(orch.balance(), 90.0);
    }
}
