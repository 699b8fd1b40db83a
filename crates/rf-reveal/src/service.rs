//! Collaborator boundaries: game service and session authority
//!
//! The orchestrator talks to the outside world only through these two traits.
//! `ScriptedGameService` and `FixedSession` are in-memory implementations used
//! for offline replay and tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::ServiceFailure;
use crate::model::{SpinOutcome, WheelPrize};

/// Server that computes spin outcomes
pub trait GameService: Send + Sync {
    /// Line-bonus spin
    fn request_spin(
        &self,
        bet: f64,
    ) -> impl Future<Output = Result<SpinOutcome, ServiceFailure>> + Send;

    /// Cascade spin, outcome carries tumbles and free spins
    fn request_cascade_spin(
        &self,
        bet: f64,
    ) -> impl Future<Output = Result<SpinOutcome, ServiceFailure>> + Send;

    /// Server-determined wheel prize
    fn request_bonus_outcome(
        &self,
    ) -> impl Future<Output = Result<WheelPrize, ServiceFailure>> + Send {
        async { Err(ServiceFailure::Unsupported) }
    }
}

/// Owner of the authoritative account balance
pub trait SessionAuthority: Send + Sync {
    fn current_balance(&self) -> impl Future<Output = Result<f64, ServiceFailure>> + Send;

    /// Session was rejected, start the re-auth path
    fn on_unauthorized(&self);
}

// ═══════════════════════════════════════════════════════════════════════════
// SCRIPTED GAME SERVICE
// ═══════════════════════════════════════════════════════════════════════════

/// Request observed by a scripted service
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ServiceCall {
    Spin { bet: f64 },
    CascadeSpin { bet: f64 },
    BonusOutcome,
}

/// Replays queued responses in order
#[derive(Debug, Default)]
pub struct ScriptedGameService {
    spins: Mutex<VecDeque<Result<SpinOutcome, ServiceFailure>>>,
    bonuses: Mutex<VecDeque<Result<WheelPrize, ServiceFailure>>>,
    calls: Mutex<Vec<ServiceCall>>,
    latency: Duration,
    requests: AtomicUsize,
}

impl ScriptedGameService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every response this long before replying
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Queue a successful spin outcome
    pub fn push_outcome(&self, outcome: SpinOutcome) -> &Self {
        self.spins.lock().push_back(Ok(outcome));
        self
    }

    /// Queue a failed spin request
    pub fn push_failure(&self, failure: ServiceFailure) -> &Self {
        self.spins.lock().push_back(Err(failure));
        self
    }

    /// Queue a bonus response
    pub fn push_bonus(&self, bonus: Result<WheelPrize, ServiceFailure>) -> &Self {
        self.bonuses.lock().push_back(bonus);
        self
    }

    /// Total requests issued (spins and bonuses)
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Every request, in issue order
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().clone()
    }

    /// Responses not yet consumed
    pub fn pending(&self) -> usize {
        self.spins.lock().len()
    }

    fn record(&self, call: ServiceCall) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().push(call);
    }

    fn next_spin(&self) -> Result<SpinOutcome, ServiceFailure> {
        self.spins
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceFailure::Service("No scripted outcome".to_string())))
    }

    async fn respond<T>(&self, response: T) -> T {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        response
    }
}

impl GameService for ScriptedGameService {
    async fn request_spin(&self, bet: f64) -> Result<SpinOutcome, ServiceFailure> {
        self.record(ServiceCall::Spin { bet });
        let response = self.next_spin();
        self.respond(response).await
    }

    async fn request_cascade_spin(&self, bet: f64) -> Result<SpinOutcome, ServiceFailure> {
        self.record(ServiceCall::CascadeSpin { bet });
        let response = self.next_spin();
        self.respond(response).await
    }

    async fn request_bonus_outcome(&self) -> Result<WheelPrize, ServiceFailure> {
        self.record(ServiceCall::BonusOutcome);
        let response = self
            .bonuses
            .lock()
            .pop_front()
            .unwrap_or(Err(ServiceFailure::Unsupported));
        self.respond(response).await
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// FIXED SESSION
// ═══════════════════════════════════════════════════════════════════════════

/// Session holding a settable balance
#[derive(Debug, Default)]
pub struct FixedSession {
    balance: Mutex<f64>,
    unauthorized_calls: AtomicUsize,
}

impl FixedSession {
    pub fn new(balance: f64) -> Self {
        Self {
            balance: Mutex::new(balance),
            unauthorized_calls: AtomicUsize::new(0),
        }
    }

    /// Move the authoritative balance (e.g. a deposit elsewhere)
    pub fn set_balance(&self, balance: f64) {
        *self.balance.lock() = balance;
    }

    /// How often the re-auth path was invoked
    pub fn unauthorized_calls(&self) -> usize {
        self.unauthorized_calls.load(Ordering::SeqCst)
    }
}

impl SessionAuthority for FixedSession {
    async fn current_balance(&self) -> Result<f64, ServiceFailure> {
        Ok(*self.balance.lock())
    }

    fn on_unauthorized(&self) {
        self.unauthorized_calls.fetch_add(1, Ordering::SeqCst);
    }
}
