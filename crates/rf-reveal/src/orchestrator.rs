//! SpinOrchestrator: top-level reveal state machine
//!
//! ```text
//! Idle → AwaitingResult → [RevealingTumbles] → [AwaitingBonus] → Settling → Idle
//!              │
//!              └── request failed ──────────────────────────────────────→ Idle
//! ```
//!
//! One logical timeline per orchestrator. The presentation snapshot is owned
//! here and published through `watch`; stage events go out on `broadcast` and
//! are recorded into a per-spin `StageTrace`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rf_stage::{RevealTiming, Stage, StageEvent, StagePayload, StageTrace};
use tokio::sync::{broadcast, watch};
use tokio::time::Instant;
use uuid::Uuid;

use crate::bonus::{BonusSignal, BonusWheelController};
use crate::cascade::{hold, CascadeSignal, CascadeSummary, TumbleCascadeEngine};
use crate::cluster_index::ClusterIndex;
use crate::config::{RevealConfig, WheelPrizeSource};
use crate::error::{ServiceFailure, SpinError};
use crate::model::{BonusFeature, BonusOutcome, GameVariant, SpinOutcome};
use crate::reconciler::{reconcile, DisplayMessage, Settlement};
use crate::service::{GameService, SessionAuthority};
use crate::snapshot::{BonusView, OrchestratorState, PresentationSnapshot};

/// Stage event channel capacity
const STAGE_CHANNEL_CAPACITY: usize = 256;

/// Everything that happened during one settled spin
#[derive(Debug, Clone)]
pub struct SpinReport {
    pub spin_id: String,
    pub bet: f64,
    pub outcome: SpinOutcome,
    pub settlement: Settlement,
    pub cascade: CascadeSummary,
    pub bonus: Option<BonusOutcome>,
    pub trace: StageTrace,
    /// Accept → idle
    pub duration: Duration,
}

/// Trace under construction for the spin in flight
struct SpinRun {
    spin_id: String,
    started: Instant,
    trace: StageTrace,
    /// Session rejected after the spin was accepted
    session_lost: bool,
}

impl SpinRun {
    fn new(spin_id: String, variant: GameVariant) -> Self {
        Self {
            trace: StageTrace::new(spin_id.clone(), variant.game_id()),
            spin_id,
            started: Instant::now(),
            session_lost: false,
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

/// Contracts the snapshot to idle if the spin future is dropped early
///
/// Armed on acceptance, disarmed once the spin settled or failed. Leaves the
/// balance mirror alone.
struct AbandonGuard<'a> {
    snapshot: &'a watch::Sender<PresentationSnapshot>,
    spin_id: String,
    armed: bool,
}

impl<'a> AbandonGuard<'a> {
    fn new(snapshot: &'a watch::Sender<PresentationSnapshot>, spin_id: String) -> Self {
        Self {
            snapshot,
            spin_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let spin_id = self.spin_id.as_str();
        let abandoned = self.snapshot.send_if_modified(|snap| {
            if snap.is_idle() || snap.spin_id.as_deref() != Some(spin_id) {
                return false;
            }
            snap.clear_effects();
            snap.bonus = None;
            snap.current_tumble = 0;
            snap.state = OrchestratorState::Idle;
            true
        });
        if abandoned {
            log::warn!("[Orchestrator] Spin {} dropped before settling, back to Idle", spin_id);
        }
    }
}

pub struct SpinOrchestrator<G, S> {
    config: RevealConfig,
    timing: RevealTiming,
    service: Arc<G>,
    session: Arc<S>,
    cascade: TumbleCascadeEngine,
    wheel: BonusWheelController,
    snapshot: watch::Sender<PresentationSnapshot>,
    stages: broadcast::Sender<StageEvent>,
    last_trace: Mutex<Option<StageTrace>>,
}

impl<G: GameService, S: SessionAuthority> SpinOrchestrator<G, S> {
    /// Create an idle orchestrator mirroring `balance`
    pub fn new(config: RevealConfig, service: Arc<G>, session: Arc<S>, balance: f64) -> Self {
        let timing = config.timing();
        let (snapshot, _) = watch::channel(PresentationSnapshot::new(config.grid_size(), balance));
        let (stages, _) = broadcast::channel(STAGE_CHANNEL_CAPACITY);

        log::info!(
            "[Orchestrator] {} table ready ({} grid, {} timing, balance {})",
            config.variant.game_id(),
            config.grid_size(),
            timing.profile.display_name(),
            balance
        );

        Self {
            cascade: TumbleCascadeEngine::new(timing.clone()),
            wheel: BonusWheelController::new(config.wheel.clone(), timing.clone()),
            timing,
            config,
            service,
            session,
            snapshot,
            stages,
            last_trace: Mutex::new(None),
        }
    }

    /// Create and load the balance from the session
    pub async fn connect(
        config: RevealConfig,
        service: Arc<G>,
        session: Arc<S>,
    ) -> Result<Self, SpinError> {
        let balance = session.current_balance().await?;
        Ok(Self::new(config, service, session, balance))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // OBSERVATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Render-facing state stream
    pub fn subscribe(&self) -> watch::Receiver<PresentationSnapshot> {
        self.snapshot.subscribe()
    }

    /// Stage event stream
    pub fn subscribe_stages(&self) -> broadcast::Receiver<StageEvent> {
        self.stages.subscribe()
    }

    pub fn snapshot(&self) -> PresentationSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> OrchestratorState {
        self.snapshot.borrow().state
    }

    pub fn balance(&self) -> f64 {
        self.snapshot.borrow().balance
    }

    pub fn is_session_expired(&self) -> bool {
        self.snapshot.borrow().session_expired
    }

    /// Trace of the most recent spin, settled or failed
    pub fn last_trace(&self) -> Option<StageTrace> {
        self.last_trace.lock().clone()
    }

    pub fn config(&self) -> &RevealConfig {
        &self.config
    }

    pub fn timing(&self) -> &RevealTiming {
        &self.timing
    }

    pub fn wheel(&self) -> &BonusWheelController {
        &self.wheel
    }

    pub fn service(&self) -> &Arc<G> {
        &self.service
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SPIN
    // ═══════════════════════════════════════════════════════════════════════

    /// Run one spin from trigger to settlement
    ///
    /// Rejected without side effects beyond a funds message when the
    /// orchestrator is not idle or the mirrored balance is short.
    pub async fn trigger(&self, bet: f64) -> Result<SpinReport, SpinError> {
        if !bet.is_finite() || bet <= 0.0 {
            return Err(SpinError::InvalidBet(bet));
        }

        let spin_id = Uuid::new_v4().to_string();
        let mut rejection = None;
        self.snapshot.send_if_modified(|snap| {
            if !snap.is_idle() {
                rejection = Some(SpinError::Busy);
                return false;
            }
            if snap.balance < bet {
                rejection = Some(SpinError::InsufficientFunds {
                    balance: snap.balance,
                    bet,
                });
                snap.message = Some(DisplayMessage::InsufficientFunds);
                return true;
            }
            snap.begin_spin(spin_id.clone());
            true
        });
        if let Some(err) = rejection {
            log::debug!("[Orchestrator] Trigger rejected: {}", err);
            return Err(err);
        }

        log::debug!("[Orchestrator] Idle → AwaitingResult (spin {})", spin_id);
        let mut guard = AbandonGuard::new(&self.snapshot, spin_id.clone());
        let mut run = SpinRun::new(spin_id, self.config.variant);
        self.emit(
            &mut run,
            Stage::SpinStart { bet },
            StagePayload::new().bet_amount(bet),
        );

        let outcome = match self.request(bet).await {
            Ok(outcome) => outcome,
            Err(failure) => {
                guard.disarm();
                return Err(self.fail(run, failure));
            }
        };
        if let Err(e) = outcome.validate(self.config.grid_size()) {
            log::error!("[Orchestrator] Rejected malformed outcome: {}", e);
            guard.disarm();
            return Err(self.fail(run, ServiceFailure::Malformed(e)));
        }

        self.emit(
            &mut run,
            Stage::PreReveal {
                duration_ms: self.timing.pre_reveal_ms,
            },
            StagePayload::new(),
        );
        hold(self.timing.pre_reveal()).await;

        let cascade = self.reveal(&mut run, &outcome).await;
        let bonus = self.play_bonus(&mut run, &outcome).await;
        let settlement = self.settle(&mut run, &outcome, bonus.as_ref());
        guard.disarm();

        let duration = run.started.elapsed();
        let trace = run.trace;
        *self.last_trace.lock() = Some(trace.clone());

        Ok(SpinReport {
            spin_id: run.spin_id,
            bet,
            outcome,
            settlement,
            cascade,
            bonus,
            trace,
            duration,
        })
    }

    /// Re-read the authoritative balance (session load/reload)
    ///
    /// Only applies while idle; a spin in flight keeps its mirror untouched.
    pub async fn resync_balance(&self) -> Result<f64, SpinError> {
        if !self.state().is_idle() {
            return Err(SpinError::Busy);
        }

        match self.session.current_balance().await {
            Ok(balance) => {
                let applied = self.snapshot.send_if_modified(|snap| {
                    if !snap.is_idle() {
                        return false;
                    }
                    snap.balance = balance;
                    snap.session_expired = false;
                    if snap.message == Some(DisplayMessage::SessionExpired) {
                        snap.message = None;
                    }
                    true
                });
                if !applied {
                    return Err(SpinError::Busy);
                }
                log::info!("[Orchestrator] Balance re-synced: {}", balance);
                Ok(balance)
            }
            Err(ServiceFailure::Unauthorized) => {
                self.session.on_unauthorized();
                self.snapshot.send_modify(|snap| {
                    snap.session_expired = true;
                    snap.message = Some(DisplayMessage::SessionExpired);
                });
                Err(SpinError::Unauthorized)
            }
            Err(failure) => {
                log::warn!("[Orchestrator] Balance re-sync failed: {}", failure);
                Err(SpinError::Service(failure))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // PHASES
    // ═══════════════════════════════════════════════════════════════════════

    async fn request(&self, bet: f64) -> Result<SpinOutcome, ServiceFailure> {
        match self.config.variant {
            GameVariant::LineBonus => self.service.request_spin(bet).await,
            GameVariant::Cascade => self.service.request_cascade_spin(bet).await,
        }
    }

    /// Contract to idle after a failed request
    fn fail(&self, mut run: SpinRun, failure: ServiceFailure) -> SpinError {
        let unauthorized = failure == ServiceFailure::Unauthorized;
        let message = match &failure {
            ServiceFailure::Unauthorized => DisplayMessage::SessionExpired,
            ServiceFailure::InsufficientFunds => DisplayMessage::InsufficientFunds,
            ServiceFailure::Service(text) => DisplayMessage::ServiceError(text.clone()),
            ServiceFailure::Malformed(_) | ServiceFailure::Unsupported => {
                DisplayMessage::ServiceError(String::new())
            }
        };

        if unauthorized {
            log::warn!("[Orchestrator] Session rejected, re-auth required");
            self.session.on_unauthorized();
        } else {
            log::warn!("[Orchestrator] Spin request failed: {}", failure);
        }

        let reason = message.to_string();
        self.snapshot.send_modify(|snap| {
            snap.clear_effects();
            snap.bonus = None;
            snap.message = Some(message);
            if unauthorized {
                snap.session_expired = true;
            }
            snap.state = OrchestratorState::Idle;
        });
        log::debug!("[Orchestrator] AwaitingResult → Idle (failed)");

        self.emit(
            &mut run,
            Stage::SpinFailed { reason: reason.clone() },
            StagePayload::new().message(reason),
        );
        *self.last_trace.lock() = Some(run.trace);

        SpinError::from(failure)
    }

    /// Show the base grid or play the cascade
    async fn reveal(&self, run: &mut SpinRun, outcome: &SpinOutcome) -> CascadeSummary {
        if outcome.tumbles.is_empty() {
            self.snapshot.send_modify(|snap| {
                snap.grid = outcome.grid.clone();
                snap.special_symbol = outcome.special_symbol;
            });
            self.emit(run, Stage::GridReveal, StagePayload::new());
            return self.cascade.run(&outcome.tumbles, |_| {}).await;
        }

        // Previous grid stays until the first step drops; cascade services
        // report the post-tumble grid as the base grid.
        let total = outcome.tumbles.len();
        self.snapshot.send_modify(|snap| {
            snap.state = OrchestratorState::RevealingTumbles;
            snap.special_symbol = outcome.special_symbol;
            snap.total_tumbles = total;
        });
        log::debug!("[Orchestrator] AwaitingResult → RevealingTumbles ({} steps)", total);

        let size = self.config.grid_size();
        let total_steps = u32::try_from(total).unwrap_or(u32::MAX);
        let summary = self
            .cascade
            .run(&outcome.tumbles, |signal| match signal {
                CascadeSignal::StepStarted { index, .. } => {
                    self.snapshot.send_modify(|snap| snap.current_tumble = index + 1);
                    self.emit(
                        run,
                        Stage::TumbleStart {
                            step_index: step_u32(index),
                            total_steps,
                        },
                        StagePayload::new(),
                    );
                }
                CascadeSignal::Highlight { index, clusters } => {
                    let highlight = ClusterIndex::build(size, clusters);
                    self.snapshot.send_modify(|snap| snap.highlight = highlight);
                    self.emit(
                        run,
                        Stage::ClusterHighlight {
                            step_index: step_u32(index),
                            cluster_count: step_u32(clusters.len()),
                        },
                        StagePayload::new(),
                    );
                }
                CascadeSignal::MultiplierStrike { index, multiplier } => {
                    self.snapshot
                        .send_modify(|snap| snap.multiplier_event = Some(multiplier));
                    self.emit(
                        run,
                        Stage::MultiplierStrike {
                            step_index: step_u32(index),
                            multiplier,
                        },
                        StagePayload::new().multiplier(multiplier),
                    );
                }
                CascadeSignal::StrikeCleared { .. } => {
                    self.snapshot.send_modify(|snap| snap.multiplier_event = None);
                }
                CascadeSignal::Explode { index } => {
                    self.snapshot.send_modify(|snap| {
                        snap.highlight = ClusterIndex::empty();
                        snap.exploding = true;
                    });
                    self.emit(
                        run,
                        Stage::ClusterExplode {
                            step_index: step_u32(index),
                        },
                        StagePayload::new(),
                    );
                }
                CascadeSignal::GridUpdate { index, grid, win } => {
                    self.snapshot.send_modify(|snap| {
                        snap.exploding = false;
                        snap.grid = grid.clone();
                        snap.total_win += win;
                    });
                    self.emit(
                        run,
                        Stage::GridDrop {
                            step_index: step_u32(index),
                        },
                        StagePayload::new().win_amount(win),
                    );
                }
                CascadeSignal::Finished { steps } => {
                    self.emit(
                        run,
                        Stage::TumbleEnd {
                            total_steps: step_u32(steps),
                        },
                        StagePayload::new(),
                    );
                }
            })
            .await;

        self.snapshot.send_modify(PresentationSnapshot::clear_effects);
        summary
    }

    /// Run the triggered bonus to its terminal outcome
    async fn play_bonus(&self, run: &mut SpinRun, outcome: &SpinOutcome) -> Option<BonusOutcome> {
        let feature = outcome.bonus_feature()?;

        self.snapshot.send_modify(|snap| {
            snap.state = OrchestratorState::AwaitingBonus;
            snap.clear_effects();
        });
        log::debug!("[Orchestrator] → AwaitingBonus ({:?})", feature);
        self.emit(run, Stage::BonusEnter, StagePayload::new());

        let feature = self.resolve_bonus(run, feature).await;
        let result = self
            .wheel
            .run(feature, |signal| {
                let (view, stage) = match signal {
                    BonusSignal::WheelIntro => (BonusView::WheelIntro, None),
                    BonusSignal::WheelSpin {
                        prize,
                        rotation_deg,
                    } => (
                        BonusView::WheelSpinning {
                            prize,
                            rotation_deg,
                        },
                        Some(Stage::WheelSpin {
                            prize,
                            rotation_deg,
                        }),
                    ),
                    BonusSignal::WheelStop { prize } => (
                        BonusView::WheelStopped { prize },
                        Some(Stage::WheelStop { prize }),
                    ),
                    BonusSignal::FreeSpinsBanner { awarded } => (
                        BonusView::FreeSpinsBanner { awarded },
                        Some(Stage::FreeSpinsBanner { awarded }),
                    ),
                };
                self.snapshot.send_modify(|snap| snap.bonus = Some(view));
                if let Some(stage) = stage {
                    self.emit(run, stage, StagePayload::new());
                }
            })
            .await;

        self.snapshot.send_modify(|snap| snap.bonus = None);
        self.emit(run, Stage::BonusExit, StagePayload::new());

        match result {
            Ok(bonus) => Some(bonus),
            Err(e) => {
                log::error!("[Orchestrator] Bonus did not run: {}", e);
                None
            }
        }
    }

    /// Fetch the wheel prize when the server decides it
    async fn resolve_bonus(&self, run: &mut SpinRun, feature: BonusFeature) -> BonusFeature {
        let BonusFeature::FortuneWheel(payload) = feature else {
            return feature;
        };
        if self.config.wheel.prize_source != WheelPrizeSource::Server {
            return feature;
        }

        match self.service.request_bonus_outcome().await {
            Ok(prize) => BonusFeature::FortuneWheel(prize),
            Err(failure) => {
                if failure == ServiceFailure::Unauthorized {
                    self.session.on_unauthorized();
                    self.snapshot.send_modify(|snap| snap.session_expired = true);
                    run.session_lost = true;
                }
                log::warn!(
                    "[Orchestrator] Bonus outcome unavailable ({}), using spin payload",
                    failure
                );
                BonusFeature::FortuneWheel(payload)
            }
        }
    }

    /// Commit message, balance and win, then return to idle
    fn settle(
        &self,
        run: &mut SpinRun,
        outcome: &SpinOutcome,
        bonus: Option<&BonusOutcome>,
    ) -> Settlement {
        self.snapshot
            .send_modify(|snap| snap.state = OrchestratorState::Settling);
        log::debug!("[Orchestrator] → Settling");

        let mut settlement = reconcile(outcome, bonus.and_then(BonusOutcome::wheel));
        // The server already booked the spin; balance and win still commit
        if run.session_lost {
            settlement.message = DisplayMessage::SessionExpired;
        }
        self.emit(
            run,
            Stage::Settle {
                final_win: settlement.final_win,
                final_balance: settlement.final_balance,
            },
            StagePayload::new()
                .win_amount(settlement.final_win)
                .balance(settlement.final_balance)
                .message(settlement.message.to_string()),
        );

        self.snapshot.send_modify(|snap| {
            snap.clear_effects();
            snap.bonus = None;
            snap.grid = outcome.settled_grid().clone();
            snap.current_tumble = 0;
            snap.balance = settlement.final_balance;
            snap.last_win = settlement.final_win;
            snap.total_win = settlement.final_win;
            snap.message = Some(settlement.message.clone());
            snap.state = OrchestratorState::Idle;
        });
        log::debug!("[Orchestrator] Settling → Idle");
        log::info!(
            "[Orchestrator] Spin {} settled: {} (balance {})",
            run.spin_id,
            settlement.message,
            settlement.final_balance
        );

        self.emit(run, Stage::SpinEnd, StagePayload::new());
        settlement
    }

    fn emit(&self, run: &mut SpinRun, stage: Stage, payload: StagePayload) {
        let event = StageEvent::with_payload(stage, run.elapsed_ms(), payload)
            .for_spin(run.spin_id.clone());
        // No subscribers is fine
        let _ = self.stages.send(event.clone());
        run.trace.push(event);
    }
}

fn step_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
