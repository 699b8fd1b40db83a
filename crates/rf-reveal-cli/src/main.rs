//! Spin reveal driver
//!
//! Usage:
//!   rf-reveal spin --server URL --token TOKEN --bet 10      - One live spin
//!   rf-reveal autoplay --server URL --token TOKEN --bet 10  - Autoplay until Ctrl-C
//!   rf-reveal replay outcomes.json --bet 10                 - Replay recorded outcomes
//!   rf-reveal config                                        - Print effective config

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use rf_connector::{ConnectorBuilder, GameConnector, HttpSession};
use rf_reveal::{
    AutoplayDriver, FixedSession, GameService, GameVariant, RevealConfig, ScriptedGameService,
    SessionAuthority, SpinOrchestrator, SpinOutcome,
};
use rf_stage::{StageEvent, TimingProfile};
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "rf-reveal", about = "Spin presentation orchestrator")]
struct Cli {
    /// TOML table config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Game variant (line_bonus, cascade)
    #[arg(long, global = true)]
    variant: Option<GameVariant>,

    /// Timing profile (normal, turbo, instant)
    #[arg(short, long, global = true)]
    profile: Option<TimingProfile>,

    /// Print stage events as JSON lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One live spin against the game server
    Spin {
        #[command(flatten)]
        server: ServerArgs,

        /// Bet amount (defaults to the configured autoplay bet)
        #[arg(short, long)]
        bet: Option<f64>,
    },
    /// Autoplay against the game server until stopped
    Autoplay {
        #[command(flatten)]
        server: ServerArgs,

        #[arg(short, long)]
        bet: Option<f64>,
    },
    /// Replay recorded outcomes (a JSON outcome or array of outcomes)
    Replay {
        file: PathBuf,

        #[arg(short, long)]
        bet: Option<f64>,

        /// Starting balance
        #[arg(long, default_value_t = 1000.0)]
        balance: f64,
    },
    /// Print the effective config as TOML
    Config,
}

#[derive(Args)]
struct ServerArgs {
    /// Game server root
    #[arg(short, long, default_value = "http://localhost:8080")]
    server: String,

    /// Bearer token (falls back to RF_REVEAL_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// Request timeout (ms)
    #[arg(long, default_value_t = 5000)]
    timeout: u32,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Spin { server, bet } => {
            let bet = bet.unwrap_or(config.autoplay.default_bet);
            let orch = connect(config, &server).await?;
            print_stages(orch.subscribe_stages(), cli.json);
            spin(&orch, bet).await
        }
        Commands::Autoplay { server, bet } => {
            let bet = bet.unwrap_or(config.autoplay.default_bet);
            let orch = connect(config, &server).await?;
            print_stages(orch.subscribe_stages(), cli.json);
            autoplay(&orch, bet).await
        }
        Commands::Replay { file, bet, balance } => {
            let bet = bet.unwrap_or(config.autoplay.default_bet);
            replay(config, &file, bet, balance, cli.json).await
        }
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn load_config(cli: &Cli) -> Result<RevealConfig> {
    let mut config = match &cli.config {
        Some(path) => RevealConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => RevealConfig::default(),
    };
    if let Some(variant) = cli.variant {
        config.variant = variant;
    }
    if let Some(profile) = cli.profile {
        config = config.with_profile(profile);
    }
    config.validate()?;
    Ok(config)
}

async fn connect(
    config: RevealConfig,
    args: &ServerArgs,
) -> Result<SpinOrchestrator<GameConnector, HttpSession>> {
    let mut builder = ConnectorBuilder::http(&args.server).timeout(args.timeout);
    let token = args
        .token
        .clone()
        .or_else(|| std::env::var("RF_REVEAL_TOKEN").ok());
    if let Some(token) = &token {
        builder = builder.auth(token);
    }
    let connector = builder.build()?;
    if !connector.has_token() {
        bail!("no token: pass --token or set RF_REVEAL_TOKEN");
    }

    let session = Arc::new(connector.session());
    let orch = SpinOrchestrator::connect(config, Arc::new(connector), session)
        .await
        .context("loading balance")?;
    println!("Balance: {}", orch.balance());
    Ok(orch)
}

async fn spin<G: GameService, S: SessionAuthority>(
    orch: &SpinOrchestrator<G, S>,
    bet: f64,
) -> Result<()> {
    let result = orch.trigger(bet).await;
    // Let the stage printer drain before the summary line
    tokio::task::yield_now().await;

    match result {
        Ok(report) => {
            println!(
                "{} | win {} | balance {} | {:.1}s",
                report.settlement.message,
                report.settlement.final_win,
                report.settlement.final_balance,
                report.duration.as_secs_f64()
            );
            Ok(())
        }
        Err(e) => {
            if let Some(message) = orch.snapshot().message {
                println!("{}", message);
            }
            Err(e.into())
        }
    }
}

async fn autoplay<G: GameService, S: SessionAuthority>(
    orch: &SpinOrchestrator<G, S>,
    bet: f64,
) -> Result<()> {
    let driver = AutoplayDriver::new(bet);
    driver.enable();
    println!("Autoplay at {} (Ctrl-C to stop)", bet);

    let mut switch = driver.subscribe();
    let stopper = async {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => driver.disable(),
            _ = switch.wait_for(|s| !s.enabled) => {}
        }
    };
    let (stop, _) = tokio::join!(driver.run(orch), stopper);

    println!(
        "Autoplay ended: {} after {} spins, balance {}",
        stop.display_name(),
        driver.spins(),
        orch.balance()
    );
    Ok(())
}

async fn replay(
    config: RevealConfig,
    file: &Path,
    bet: f64,
    balance: f64,
    json: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let outcomes = parse_outcomes(&text)?;
    log::info!("[Replay] {} outcomes from {}", outcomes.len(), file.display());

    let service = ScriptedGameService::new();
    for outcome in &outcomes {
        service.push_outcome(outcome.clone());
    }

    let orch = SpinOrchestrator::new(
        config,
        Arc::new(service),
        Arc::new(FixedSession::new(balance)),
        balance,
    );
    print_stages(orch.subscribe_stages(), json);

    for _ in 0..outcomes.len() {
        spin(&orch, bet).await?;
    }
    Ok(())
}

/// Accepts a single outcome or an array
fn parse_outcomes(text: &str) -> Result<Vec<SpinOutcome>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let outcomes = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(outcomes)
}

fn print_stages(mut events: broadcast::Receiver<StageEvent>, json: bool) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => print_stage(&event, json),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("[Stages] Dropped {} events", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

fn print_stage(event: &StageEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
        return;
    }

    let mut line = format!("{:>8.0}ms  {}", event.timestamp_ms, event.type_name());
    let payload = &event.payload;
    if let Some(win) = payload.win_amount {
        line.push_str(&format!("  win={}", win));
    }
    if let Some(mult) = payload.multiplier {
        line.push_str(&format!("  x{}", mult));
    }
    if let Some(balance) = payload.balance {
        line.push_str(&format!("  balance={}", balance));
    }
    if let Some(message) = &payload.message {
        line.push_str(&format!("  \"{}\"", message));
    }
    println!("{}", line);
}
