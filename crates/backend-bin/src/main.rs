// ============================
// crates/backend-bin/src/main.rs
// ============================
//! Tokio / Axum entry-point for the `CodeCollab` server.
use anyhow::Context;
use backend_lib::{
    config::{LogFormat, Settings},
    ws_router, AppState,
};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Real-time collaborative workspace server
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Extra config file layered over `codecollab.toml` / `codecollab.json`
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level used when `RUST_LOG` is not set
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.log_level.to_ascii_lowercase()));

    let registry = tracing_subscriber::registry().with(filter);
    match settings.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("loading settings")?;

    if let Some(bind) = args.bind {
        settings.bind_addr = bind;
    }
    if let Some(level) = args.log_level {
        settings.log_level = level;
    }

    let state = AppState::new(settings).context("invalid settings")?;
    init_tracing(&state.settings);

    let listener = TcpListener::bind(state.settings.bind_addr)
        .await
        .with_context(|| format!("binding {}", state.settings.bind_addr))?;

    ws_router::serve(listener, state, shutdown_signal()).await?;
    Ok(())
}
