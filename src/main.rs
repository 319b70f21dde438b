//! dreamcore - run the autonomous cycle engine
//!
//! Usage:
//!   dreamcore                              → run until Ctrl-C
//!   dreamcore --max-cycles 100             → stop after 100 cycles
//!   dreamcore --config dreamcore.toml      → load tunables from TOML
//!   dreamcore --dump-config                → print the effective config and exit

use clap::Parser;
use dreamcore_adapters::Collaborators;
use dreamcore_core::{EngineStatus, ShutdownReason};
use dreamcore_engine::{CycleEngine, EngineConfig, EngineHandle};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::{JoinError, JoinHandle};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "dreamcore",
    about = "Autonomous cycle engine: signals in, artifacts out, paradoxes contained",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Path to engine config file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many cycles (default: run until stopped)
    #[arg(long)]
    max_cycles: Option<u64>,

    /// Where the engine state is archived on shutdown
    #[arg(long, default_value = "dreamcore-archive")]
    archive_dir: PathBuf,

    /// Also write logs to daily files in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log as JSON lines instead of text
    #[arg(long, default_value_t = false)]
    log_json: bool,

    /// Seconds between status log lines
    #[arg(long, default_value_t = 30)]
    status_every_secs: u64,

    /// Print the effective config as TOML and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(&cli);

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::default(),
    };
    if cli.max_cycles.is_some() {
        config.schedule.max_cycles = cli.max_cycles;
    }

    if cli.dump_config {
        print!("{}", config.to_toml());
        return Ok(());
    }

    tracing::info!(
        "Starting dreamcore v{} (archive: {})",
        env!("CARGO_PKG_VERSION"),
        cli.archive_dir.display()
    );
    let engine = CycleEngine::new(config, Collaborators::builtin(&cli.archive_dir));
    let handle = engine.handle();
    let task = tokio::spawn(engine.run());

    let every = Duration::from_secs(cli.status_every_secs.max(1));
    let outcome = supervise(&handle, task, every, shutdown_signal()).await;

    log_status(&handle.status().await);
    let reason = outcome??;
    tracing::info!("Engine stopped ({})", reason);
    Ok(())
}

/// Log status every `every` until the engine task ends. `shutdown` is
/// created once by the caller; when it fires the engine is asked to stop.
async fn supervise(
    handle: &EngineHandle,
    mut task: JoinHandle<dreamcore_core::Result<ShutdownReason>>,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<dreamcore_core::Result<ShutdownReason>, JoinError> {
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;

    loop {
        tokio::select! {
            joined = &mut task => return joined,
            _ = ticker.tick() => log_status(&handle.status().await),
            _ = &mut shutdown, if !handle.is_stopped() => handle.stop(),
        }
    }
}

fn log_status(status: &EngineStatus) {
    tracing::info!(
        phase = %status.phase,
        consciousness = %status.consciousness,
        weave = status.reality_weave,
        tolerance = status.paradox_tolerance,
        artifacts = status.artifact_count,
        patterns = status.pattern_count,
        active_conflicts = status.active_conflicts,
        collective = status.collective_connection,
        "cycle {}",
        status.cycles
    );
}

/// Install the subscriber. The returned guard flushes the file layer and
/// must live as long as the process.
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "dreamcore.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    let (text_layer, json_layer) = if cli.log_json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dreamcore=info,dreamcore_engine=info,dreamcore_adapters=info".into()),
        )
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();
    guard
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, stopping engine"),
        _ = terminate => tracing::info!("Received terminate signal, stopping engine"),
    }
}
