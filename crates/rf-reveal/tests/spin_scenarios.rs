//! End-to-end reveal scenarios on a paused clock

use std::sync::Arc;
use std::time::Duration;

use approx::assert_relative_eq;
use rf_reveal::*;
use rf_stage::{RevealTiming, TimingProfile};
use tokio::time::{sleep, Instant};

type Orchestrator = SpinOrchestrator<ScriptedGameService, FixedSession>;

fn orchestrator(config: RevealConfig, balance: f64) -> Orchestrator {
    SpinOrchestrator::new(
        config,
        Arc::new(ScriptedGameService::new()),
        Arc::new(FixedSession::new(balance)),
        balance,
    )
}

fn filled(size: GridSize, symbol: Symbol) -> Grid {
    Grid::from_rows(vec![vec![symbol; size.cols]; size.rows]).unwrap()
}

fn line_outcome(final_win: f64, final_balance: f64) -> SpinOutcome {
    SpinOutcome {
        grid: Grid::from_rows(vec![
            vec![Symbol::Wild, Symbol::Ace, Symbol::King],
            vec![Symbol::GemRed, Symbol::GemRed, Symbol::GemRed],
            vec![Symbol::Jack, Symbol::Queen, Symbol::Seven],
        ])
        .unwrap(),
        line_win: final_win > 0.0,
        base_win: final_win,
        special_symbol: Some(SpecialSymbol::Multiplier(2)),
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

fn cascade_outcome(multipliers: &[f64], final_win: f64, final_balance: f64) -> SpinOutcome {
    let size = GameVariant::Cascade.grid_size();
    let symbols = [Symbol::Crown, Symbol::Trident, Symbol::Eagle, Symbol::Vase];
    let tumbles = multipliers
        .iter()
        .enumerate()
        .map(|(i, &multiplier)| TumbleStep {
            grid: filled(size, symbols[i % symbols.len()]),
            clusters: vec![Cluster::new(
                Symbol::Zeus,
                (0..8).map(|c| Position::new(c / 6, c % 6)).collect(),
            )],
            multiplier,
            win: 5.0,
        })
        .collect();

    SpinOutcome {
        grid: filled(size, Symbol::Zeus),
        line_win: true,
        base_win: 15.0,
        special_symbol: None,
        tumbles,
        bonus_triggered: false,
        bonus_win: 0.0,
        free_spins_awarded: 0,
        multiplier: 3.0,
        final_win,
        final_balance,
        message: "BIG WIN!".to_string(),
    }
}

fn cascade_config() -> RevealConfig {
    RevealConfig::new(GameVariant::Cascade)
}

// ═══════════════════════════════════════════════════════════════════════════
// SCENARIOS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_scenario_a_loss_without_tumbles() {
    let orch = orchestrator(RevealConfig::default(), 100.0);
    let outcome = line_outcome(0.0, 90.0);
    orch.service().push_outcome(outcome.clone());

    let report = orch.trigger(10.0).await.unwrap();

    let snap = orch.snapshot();
    assert_eq!(snap.state, OrchestratorState::Idle);
    assert_eq!(snap.message, Some(DisplayMessage::Loss));
    assert_eq!(snap.balance, 90.0);
    assert_eq!(snap.grid, outcome.grid);
    assert_eq!(snap.special_symbol, Some(SpecialSymbol::Multiplier(2)));
    assert_eq!(report.settlement.final_balance, 90.0);
    assert_eq!(
        orch.service().calls(),
        vec![ServiceCall::Spin { bet: 10.0 }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_three_tumbles_with_strike() {
    let orch = orchestrator(cascade_config(), 500.0);
    orch.service()
        .push_outcome(cascade_outcome(&[1.0, 1.0, 3.0], 45.0, 495.0));

    let report = orch.trigger(50.0).await.unwrap();

    assert_eq!(report.cascade.grid_updates, 3);
    assert_eq!(report.cascade.multiplier_events, 1);
    assert_eq!(report.trace.grid_drops(), vec![0, 1, 2]);
    assert_eq!(report.trace.count("multiplier_strike"), 1);
    assert_relative_eq!(report.cascade.total_win, 15.0);
    assert_eq!(orch.balance(), 495.0);
    assert_eq!(orch.snapshot().grid.get(0, 0), Some(Symbol::Eagle));
    assert_eq!(
        orch.snapshot().message.map(|m| m.to_string()),
        Some("BIG WIN! +$45 (Mult: 3x)".to_string())
    );

    let timing = RevealTiming::normal();
    assert_eq!(
        report.duration,
        Duration::from_millis(timing.pre_reveal_ms + timing.cascade_ms(3, 1))
    );
    assert!(report.trace.validate().is_valid());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_c_wheel_completes_before_settling() {
    let orch = orchestrator(RevealConfig::default(), 1000.0);
    let mut outcome = line_outcome(520.0, 1420.0);
    outcome.special_symbol = Some(SpecialSymbol::Wheel);
    outcome.bonus_triggered = true;
    outcome.bonus_win = 500.0;
    orch.service().push_outcome(outcome);

    let mut states = orch.subscribe();
    let second = async {
        states
            .wait_for(|s| s.state == OrchestratorState::AwaitingBonus)
            .await
            .unwrap();
        let rejected = orch.trigger(100.0).await;
        let balance_during_wheel = orch.balance();
        (rejected, balance_during_wheel)
    };
    let (first, (second, balance_during_wheel)) = tokio::join!(orch.trigger(100.0), second);

    assert_eq!(second.unwrap_err(), SpinError::Busy);
    assert_eq!(balance_during_wheel, 1000.0);
    assert_eq!(orch.service().request_count(), 1);

    let report = first.unwrap();
    assert_eq!(orch.wheel().completed(), 1);
    let wheel = report.bonus.and_then(|b| b.wheel().copied()).unwrap();
    assert_eq!(wheel.prize, 500.0);
    assert_eq!(wheel.sector, Some(4));

    let trace = &report.trace;
    assert_eq!(trace.count("wheel_stop"), 1);
    assert!(trace.position_of("wheel_stop") < trace.position_of("settle"));
    assert!(trace.validate().bonus_before_settle);
    assert_eq!(orch.balance(), 1420.0);
    assert_eq!(report.duration, Duration::from_millis(2000 + 1000 + 5000));
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_autoplay_short_balance() {
    let orch = orchestrator(RevealConfig::default(), 40.0);
    orch.service().push_outcome(line_outcome(0.0, 0.0));

    let driver = AutoplayDriver::new(50.0);
    driver.enable();
    let stop = driver.run(&orch).await;

    assert_eq!(stop, AutoplayStop::InsufficientFunds);
    assert!(!driver.is_enabled());
    assert_eq!(orch.service().request_count(), 0);
    assert_eq!(orch.balance(), 40.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_empty_tumbles_show_grid_without_dwell() {
    let orch = orchestrator(cascade_config(), 100.0);
    let mut outcome = cascade_outcome(&[], 0.0, 90.0);
    outcome.line_win = false;
    orch.service().push_outcome(outcome.clone());

    let report = orch.trigger(10.0).await.unwrap();

    assert_eq!(report.cascade, CascadeSummary::default());
    assert_eq!(report.duration, RevealTiming::normal().pre_reveal());
    assert!(report.trace.has_stage("grid_reveal"));
    assert!(!report.trace.has_stage("tumble_start"));
    assert_eq!(orch.snapshot().grid, outcome.grid);
}

#[tokio::test(start_paused = true)]
async fn test_balance_unchanged_until_settled() {
    let orch = orchestrator(cascade_config(), 500.0);
    orch.service()
        .push_outcome(cascade_outcome(&[1.0, 2.0, 1.0, 1.0], 80.0, 530.0));

    let start = Instant::now();
    let observer = async {
        let mut samples = Vec::new();
        for _ in 0..20 {
            sleep(Duration::from_millis(500)).await;
            let snap = orch.snapshot();
            samples.push((start.elapsed(), snap.state, snap.balance, snap.current_tumble));
        }
        samples
    };
    let (report, samples) = tokio::join!(orch.trigger(50.0), observer);
    let report = report.unwrap();
    let settled_at = report.duration;

    for (at, state, balance, _) in &samples {
        if *at < settled_at {
            assert_ne!(*state, OrchestratorState::Idle, "idle at {:?}", at);
            assert_eq!(*balance, 500.0, "balance moved at {:?}", at);
        } else {
            assert_eq!(*balance, 530.0);
        }
    }

    // Tumble progress only ever moves forward
    let progress: Vec<usize> = samples
        .iter()
        .filter(|(_, state, _, _)| *state == OrchestratorState::RevealingTumbles)
        .map(|(_, _, _, tumble)| *tumble)
        .collect();
    assert!(!progress.is_empty());
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test(start_paused = true)]
async fn test_trigger_while_awaiting_result_is_busy() {
    let service = Arc::new(ScriptedGameService::new().with_latency(Duration::from_millis(500)));
    service.push_outcome(line_outcome(0.0, 90.0));
    let orch = SpinOrchestrator::new(
        RevealConfig::default(),
        service,
        Arc::new(FixedSession::new(100.0)),
        100.0,
    );

    let second = async {
        sleep(Duration::from_millis(100)).await;
        let state = orch.state();
        (state, orch.trigger(10.0).await)
    };
    let (first, (state, second)) = tokio::join!(orch.trigger(10.0), second);

    assert_eq!(state, OrchestratorState::AwaitingResult);
    assert_eq!(second.unwrap_err(), SpinError::Busy);
    assert!(first.is_ok());
    assert_eq!(orch.service().request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unauthorized_skips_reveal() {
    let orch = orchestrator(cascade_config(), 100.0);
    orch.service().push_failure(ServiceFailure::Unauthorized);
    orch.service()
        .push_outcome(cascade_outcome(&[1.0, 3.0], 20.0, 110.0));

    let err = orch.trigger(10.0).await.unwrap_err();
    assert_eq!(err, SpinError::Unauthorized);

    let snap = orch.snapshot();
    assert!(snap.is_idle());
    assert!(snap.session_expired);
    assert_eq!(snap.message, Some(DisplayMessage::SessionExpired));
    assert_eq!(snap.balance, 100.0);
    assert_eq!(orch.session().unauthorized_calls(), 1);

    let trace = orch.last_trace().unwrap();
    assert!(trace.failed());
    assert_eq!(trace.count("tumble_start"), 0);
    assert!(!trace.has_bonus());

    // Autoplay refuses to continue on an expired session
    let driver = AutoplayDriver::new(10.0);
    driver.enable();
    assert_eq!(driver.run(&orch).await, AutoplayStop::SessionExpired);
    assert_eq!(orch.service().pending(), 1);

    // Session reload clears the flag
    orch.resync_balance().await.unwrap();
    assert!(!orch.is_session_expired());
}

#[tokio::test(start_paused = true)]
async fn test_service_error_keeps_balance() {
    let orch = orchestrator(RevealConfig::default(), 100.0);
    orch.service()
        .push_failure(ServiceFailure::Service("Failed to update balance".into()));

    let err = orch.trigger(10.0).await.unwrap_err();
    assert!(matches!(err, SpinError::Service(ServiceFailure::Service(_))));

    let snap = orch.snapshot();
    assert!(snap.is_idle());
    assert_eq!(snap.balance, 100.0);
    assert_eq!(
        snap.message.map(|m| m.to_string()),
        Some("Failed to update balance".to_string())
    );
    assert!(!snap.session_expired);
}

// ═══════════════════════════════════════════════════════════════════════════
// BONUS VARIANTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_free_spins_banner_after_last_tumble() {
    let orch = orchestrator(cascade_config(), 200.0);
    let mut outcome = cascade_outcome(&[1.0, 1.0], 10.0, 160.0);
    outcome.free_spins_awarded = 10;
    outcome.bonus_triggered = true;
    orch.service().push_outcome(outcome);

    let report = orch.trigger(50.0).await.unwrap();

    assert_eq!(report.bonus, Some(BonusOutcome::FreeSpins { awarded: 10 }));
    let trace = &report.trace;
    assert!(trace.position_of("tumble_end") < trace.position_of("free_spins_banner"));
    assert!(trace.position_of("bonus_exit") < trace.position_of("settle"));
    assert_eq!(orch.balance(), 160.0);

    let timing = RevealTiming::normal();
    let expected = timing.pre_reveal_ms
        + timing.cascade_ms(2, 0)
        + timing.free_spins_lead_in_ms
        + timing.free_spins_banner_ms;
    assert_eq!(report.duration, Duration::from_millis(expected));
}

#[tokio::test(start_paused = true)]
async fn test_server_determined_wheel_prize() {
    let mut config = RevealConfig::default().with_profile(TimingProfile::Instant);
    config.wheel.prize_source = WheelPrizeSource::Server;
    config.wheel.seed = Some(3);
    let orch = orchestrator(config, 1000.0);

    let mut outcome = line_outcome(0.0, 900.0);
    outcome.bonus_triggered = true;
    outcome.bonus_win = 50.0;
    orch.service().push_outcome(outcome);
    orch.service().push_bonus(Ok(WheelPrize {
        prize: 2000.0,
        final_win: 2000.0,
        final_balance: 2900.0,
    }));

    let report = orch.trigger(100.0).await.unwrap();

    let wheel = report.bonus.and_then(|b| b.wheel().copied()).unwrap();
    assert_eq!(wheel.prize, 2000.0);
    assert_eq!(wheel.sector, Some(6));
    assert_eq!(orch.balance(), 2900.0);
    assert!(report.settlement.message.is_win());
    assert_eq!(
        orch.service().calls(),
        vec![ServiceCall::Spin { bet: 100.0 }, ServiceCall::BonusOutcome]
    );
}

#[tokio::test(start_paused = true)]
async fn test_server_wheel_failure_falls_back_to_payload() {
    let mut config = RevealConfig::default().with_profile(TimingProfile::Instant);
    config.wheel.prize_source = WheelPrizeSource::Server;
    let orch = orchestrator(config, 1000.0);

    let mut outcome = line_outcome(200.0, 1100.0);
    outcome.bonus_triggered = true;
    outcome.bonus_win = 200.0;
    orch.service().push_outcome(outcome);
    orch.service()
        .push_bonus(Err(ServiceFailure::Service("wheel offline".into())));

    let report = orch.trigger(100.0).await.unwrap();

    let wheel = report.bonus.and_then(|b| b.wheel().copied()).unwrap();
    assert_eq!(wheel.prize, 200.0);
    assert_eq!(orch.balance(), 1100.0);
}

#[tokio::test(start_paused = true)]
async fn test_session_lost_during_wheel_shows_expiry() {
    let mut config = RevealConfig::default().with_profile(TimingProfile::Instant);
    config.wheel.prize_source = WheelPrizeSource::Server;
    let orch = orchestrator(config, 1000.0);

    let mut outcome = line_outcome(200.0, 1100.0);
    outcome.bonus_triggered = true;
    outcome.bonus_win = 200.0;
    orch.service().push_outcome(outcome);
    orch.service().push_bonus(Err(ServiceFailure::Unauthorized));

    let report = orch.trigger(100.0).await.unwrap();

    assert_eq!(report.settlement.message, DisplayMessage::SessionExpired);
    assert_eq!(report.settlement.final_balance, 1100.0);
    let snap = orch.snapshot();
    assert!(snap.is_idle());
    assert!(snap.session_expired);
    assert_eq!(snap.message, Some(DisplayMessage::SessionExpired));
    assert_eq!(snap.balance, 1100.0);
    assert_eq!(orch.session().unauthorized_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_spin_mid_wheel_releases_wheel() {
    let orch = orchestrator(RevealConfig::default(), 1000.0);
    let mut outcome = line_outcome(0.0, 900.0);
    outcome.bonus_triggered = true;
    outcome.bonus_win = 50.0;
    orch.service().push_outcome(outcome);
    orch.service().push_outcome(line_outcome(0.0, 800.0));

    let timing = RevealTiming::normal();
    let cut_at = timing.pre_reveal_ms + timing.wheel_lead_in_ms + 1000;
    let cut = tokio::time::timeout(Duration::from_millis(cut_at), orch.trigger(100.0)).await;
    assert!(cut.is_err());

    let snap = orch.snapshot();
    assert!(snap.is_idle());
    assert_eq!(snap.bonus, None);
    assert_eq!(snap.balance, 1000.0);
    assert!(!orch.wheel().is_running());

    orch.trigger(100.0).await.unwrap();
    assert_eq!(orch.balance(), 800.0);
}

// ═══════════════════════════════════════════════════════════════════════════
// WIRE SHAPE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_recorded_outcome_replays() {
    let json = r#"{
        "grid": [["ZEUS","A","K"],["Q","J","WILD"],["777","GEM_RED","SCATTER"]],
        "line_win": true,
        "base_win": 20.0,
        "special_symbol": "5x",
        "tumbles": [
            {
                "grid": [["A","A","A"],["K","K","K"],["Q","Q","Q"]],
                "clusters": [{"symbol": "ZEUS", "positions": [{"row":0,"col":0},{"row":0,"col":1}]}],
                "multiplier": 2.0,
                "win": 20.0
            }
        ],
        "multiplier": 5.0,
        "final_win": 100.0,
        "final_balance": 190.0,
        "message": "BIG WIN!"
    }"#;
    let outcome: SpinOutcome = serde_json::from_str(json).unwrap();
    assert_eq!(outcome.special_symbol, Some(SpecialSymbol::Multiplier(5)));
    assert!(!outcome.bonus_triggered);

    let orch = orchestrator(
        RevealConfig::default().with_profile(TimingProfile::Instant),
        100.0,
    );
    orch.service().push_outcome(outcome);
    let report = orch.trigger(10.0).await.unwrap();

    assert_eq!(report.cascade.multiplier_events, 1);
    assert_eq!(orch.snapshot().grid.get(2, 2), Some(Symbol::Queen));
    assert_eq!(orch.balance(), 190.0);
    assert_eq!(
        report.settlement.message.to_string(),
        "BIG WIN! +$100 (Mult: 5x)"
    );
}
