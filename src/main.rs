//! Strikepoint - headless tactical shooter client
//!
//! This is the main entry point for the client. It handles:
//! - Local simulation of movement, weapons, hit detection and targets
//! - Lobby and game lifecycle against the session directory
//! - Position publishing and remote roster reconciliation

use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use strikepoint_client::app::input::ScriptedInput;
use strikepoint_client::app::notify::ToastLevel;
use strikepoint_client::app::runner::run_session;
use strikepoint_client::app::ClientState;
use strikepoint_client::config::Config;
use strikepoint_client::util::time::{init_client_time, uptime_secs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    // Initialize client time tracking
    init_client_time();

    info!("Starting Strikepoint client");
    info!(
        mode = ?config.mode,
        frame_rate = config.frame_rate,
        session_secs = config.session_secs,
        "Session configured"
    );

    let state = ClientState::new(config.clone());
    let mut toasts = state.notifier.subscribe();
    let mut input = ScriptedInput::new(config.rng_seed, config.weapon);

    // Scene exit: session timer or signal, whichever comes first
    let (exit_tx, exit_rx) = watch::channel(false);
    let session_len = Duration::from_secs(config.session_secs);
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(session_len) => {
                info!("Session time elapsed");
            }
            _ = shutdown_signal() => {}
        }
        let _ = exit_tx.send(true);
    });

    let summary = run_session(&state, &mut input, exit_rx).await?;

    loop {
        match toasts.try_recv() {
            Ok(toast) if toast.level == ToastLevel::Error => {
                warn!(message = %toast.message, "Session reported an error");
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }

    info!(
        frames = summary.frames,
        sim_ms = summary.sim_ms,
        hits = summary.score.hits,
        misses = summary.score.misses,
        points = summary.score.points,
        uptime_secs = uptime_secs(),
        "Client shutdown complete"
    );
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, leaving scene");
        }
        _ = terminate => {
            info!("Received terminate signal, leaving scene");
        }
    }
}
