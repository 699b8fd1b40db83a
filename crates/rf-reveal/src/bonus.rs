//! BonusWheelController: single-shot bonus timeline
//!
//! Fortune wheel: lead-in, spin-to-stop toward the prize, report once.
//! Free spins: lead-in, banner hold, report once.
//! Not re-enterable while running.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rf_stage::RevealTiming;
use thiserror::Error;

use crate::cascade::hold;
use crate::config::WheelConfig;
use crate::model::{BonusFeature, BonusOutcome, WheelOutcome, WheelPrize};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WheelError {
    #[error("Bonus timeline already running")]
    AlreadyRunning,
}

/// Progress reported while the bonus plays
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BonusSignal {
    /// Grid settled, wheel about to appear
    WheelIntro,
    WheelSpin { prize: f64, rotation_deg: f64 },
    WheelStop { prize: f64 },
    FreeSpinsBanner { awarded: u32 },
}

/// Clears the running flag however the timeline ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BonusWheelController {
    config: WheelConfig,
    timing: RevealTiming,
    rng: Mutex<StdRng>,
    running: AtomicBool,
    completed: AtomicUsize,
}

impl BonusWheelController {
    pub fn new(config: WheelConfig, timing: RevealTiming) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            timing,
            rng: Mutex::new(rng),
            running: AtomicBool::new(false),
            completed: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Bonus timelines that reached their terminal outcome
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    /// Play the bonus feature to completion
    pub async fn run(
        &self,
        feature: BonusFeature,
        on_signal: impl FnMut(BonusSignal),
    ) -> Result<BonusOutcome, WheelError> {
        match feature {
            BonusFeature::FortuneWheel(prize) => self
                .spin_wheel(prize, on_signal)
                .await
                .map(BonusOutcome::Wheel),
            BonusFeature::FreeSpins { awarded } => {
                self.show_free_spins(awarded, on_signal).await?;
                Ok(BonusOutcome::FreeSpins { awarded })
            }
        }
    }

    /// Spin the wheel toward a known prize
    pub async fn spin_wheel(
        &self,
        prize: WheelPrize,
        mut on_signal: impl FnMut(BonusSignal),
    ) -> Result<WheelOutcome, WheelError> {
        let _guard = self.acquire()?;

        on_signal(BonusSignal::WheelIntro);
        hold(self.timing.wheel_lead_in()).await;

        let (sector, rotation_deg) = self.landing_rotation(prize.prize);
        log::debug!(
            "[Wheel] Spinning to {} (sector {:?}, {:.1} deg)",
            prize.prize,
            sector,
            rotation_deg
        );
        on_signal(BonusSignal::WheelSpin {
            prize: prize.prize,
            rotation_deg,
        });
        hold(self.timing.wheel_spin()).await;

        on_signal(BonusSignal::WheelStop { prize: prize.prize });
        self.completed.fetch_add(1, Ordering::AcqRel);
        log::info!("[Wheel] Stopped on {}", prize.prize);

        Ok(WheelOutcome {
            prize: prize.prize,
            sector,
            rotation_deg,
            final_win: prize.final_win,
            final_balance: prize.final_balance,
        })
    }

    /// Free spins banner
    pub async fn show_free_spins(
        &self,
        awarded: u32,
        mut on_signal: impl FnMut(BonusSignal),
    ) -> Result<(), WheelError> {
        let _guard = self.acquire()?;

        hold(self.timing.free_spins_lead_in()).await;
        log::info!("[Wheel] {} free spins awarded", awarded);
        on_signal(BonusSignal::FreeSpinsBanner { awarded });
        hold(self.timing.free_spins_banner()).await;

        self.completed.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    /// Rotation landing the pointer on the prize's sector
    ///
    /// Full turns are drawn from `min_turns..=max_turns`. A prize missing from
    /// the sector list lands on a random offset.
    pub fn landing_rotation(&self, prize: f64) -> (Option<usize>, f64) {
        let mut rng = self.rng.lock();
        let turns = rng.random_range(self.config.min_turns..=self.config.max_turns);
        let sector = self.config.sector_of(prize);
        let offset = match sector {
            Some(index) => {
                let angle = self.config.sector_angle();
                let center = index as f64 * angle + angle / 2.0;
                (360.0 - center).rem_euclid(360.0)
            }
            None => rng.random_range(0.0..360.0),
        };
        (sector, f64::from(turns) * 360.0 + offset)
    }

    fn acquire(&self) -> Result<RunningGuard<'_>, WheelError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::warn!("[Wheel] Rejected re-entry while running");
            return Err(WheelError::AlreadyRunning);
        }
        Ok(RunningGuard(&self.running))
    }
}
