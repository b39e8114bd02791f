// SPDX-License-Identifier: MIT

//! `wfd`: load a config profile, wire up the engine (and, for the `server`
//! profile, the HTTP API), and run until a signal arrives (§6).

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use wf_daemon::config::Profile;
use wf_daemon::http::{self, AppState};
use wf_daemon::{DaemonError, Engine, EngineConfig};
use wf_executors::{ExecutorRegistry, LocalConditionEvaluator, LocalExecutor};
use wf_storage::{ChangeBus, Store};

#[derive(Parser)]
#[command(name = "wfd", about = "Workflow engine daemon")]
struct Cli {
    /// Path to the TOML config file selecting standalone/server/client profile.
    #[arg(long, default_value = "wf.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "wfd exiting");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

async fn run() -> Result<(), DaemonError> {
    let cli = Cli::parse();
    let raw = std::fs::read_to_string(&cli.config).map_err(|cause| DaemonError::ConfigRead {
        path: cli.config.display().to_string(),
        cause,
    })?;
    let profile = Profile::parse(&raw)?;

    match profile {
        Profile::Standalone { engine } => run_engine_only(engine).await,
        Profile::Server { engine, server } => run_server(engine, server).await,
        Profile::Client(_) => Err(DaemonError::BadArgs(
            "the client profile has no engine loop to run; use wf-cli against a server profile instead"
                .into(),
        )),
    }
}

/// Build a fresh store, the bundled `local` executor/condition evaluator,
/// and the coalescing change bus, and wire them into an [`Engine`] (§1: the
/// `local` process executor is the only first-party plugin).
fn wire_engine(config: EngineConfig) -> Arc<Engine<wf_core::SystemClock>> {
    let store = Arc::new(Store::new());
    let (bus, _coalescer_task) = ChangeBus::spawn(2_000, 1_000);
    let mut registry = ExecutorRegistry::new();
    registry.register(Arc::new(LocalExecutor::new()));
    let conditions = Arc::new(LocalConditionEvaluator::new());
    Arc::new(Engine::new(
        store,
        Arc::new(bus),
        Arc::new(registry),
        conditions,
        wf_core::SystemClock,
        config,
    ))
}

/// Run the tick loop forever (§4.5 step 4). Idle ticks back off from
/// `block_step_time` up to `max_blocking_time`; any externally observed
/// change (HTTP submission) wakes the loop immediately via `wake`.
async fn tick_loop(
    engine: Arc<Engine<wf_core::SystemClock>>,
    wake: Arc<tokio::sync::Notify>,
    block_step: Duration,
    max_blocking: Duration,
) -> DaemonError {
    let mut backoff = block_step;
    loop {
        let report = engine.tick().await;
        let busy = !report.killed.is_empty() || !report.added.is_empty() || report.advanced > 0;
        backoff = if busy { block_step } else { (backoff * 2).min(max_blocking) };

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = wake.notified() => { backoff = block_step; }
        }
    }
}

async fn run_engine_only(config: EngineConfig) -> Result<(), DaemonError> {
    let block_step = Duration::from_secs(config.block_step_time_secs);
    let max_blocking = Duration::from_secs(config.max_blocking_time_secs);
    let engine = wire_engine(config);
    let wake = Arc::new(tokio::sync::Notify::new());

    tokio::select! {
        err = tick_loop(engine, wake, block_step, max_blocking) => Err(err),
        _ = tokio::signal::ctrl_c() => Err(DaemonError::Signal),
    }
}

async fn run_server(
    engine_config: EngineConfig,
    server: wf_daemon::ServerConfig,
) -> Result<(), DaemonError> {
    let block_step = Duration::from_secs(engine_config.block_step_time_secs);
    let max_blocking = Duration::from_secs(engine_config.max_blocking_time_secs);
    let read_only = engine_config.read_only_mode;

    let engine = wire_engine(engine_config);
    let (changes_tx, _relay_task) = http::spawn_change_relay(engine.bus().clone(), 256);

    let token_contents =
        std::fs::read_to_string(&server.token_file).map_err(|cause| DaemonError::TokenFileRead {
            path: server.token_file.display().to_string(),
            cause,
        })?;
    let tokens = Arc::new(wf_wire::TokenTable::parse(&token_contents));
    let wake = Arc::new(tokio::sync::Notify::new());

    let state = AppState {
        store: engine.store().clone(),
        changes: changes_tx,
        tokens,
        read_only,
        clock: wf_core::SystemClock,
        wake: wake.clone(),
    };
    let app = http::router(state);

    let serve = serve_http(&server.bind, app);

    tokio::select! {
        err = tick_loop(engine, wake, block_step, max_blocking) => Err(err),
        result = serve => result,
        _ = tokio::signal::ctrl_c() => Err(DaemonError::Signal),
    }
}

async fn serve_http(bind: &wf_daemon::BindConfig, app: axum::Router) -> Result<(), DaemonError> {
    match bind {
        wf_daemon::BindConfig::Tcp { port } => {
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", *port))
                .await
                .map_err(DaemonError::Serve)?;
            axum::serve(listener, app).await.map_err(DaemonError::Serve)
        }
        wf_daemon::BindConfig::Tls { cert, key, port } => {
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .map_err(DaemonError::Tls)?;
            let addr = std::net::SocketAddr::from(([0, 0, 0, 0], *port));
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .map_err(DaemonError::Serve)
        }
    }
}
