use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rollcall_server::ServerConfig;
use rollcall_telemetry::{init_telemetry, LogFormat, TelemetryConfig};

/// Attendance ingestion and live broadcast server.
#[derive(Debug, Parser)]
#[command(name = "rollcall", version)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// Directory holding the static HTML shell.
    #[arg(long, env = "PUBLIC_DIR", default_value = "public")]
    public_dir: PathBuf,

    /// Log output format: pretty or json.
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Before parsing so `.env` values reach clap's env fallbacks.
    let dotenv_path = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&TelemetryConfig {
        format: cli.log_format,
        ..Default::default()
    });

    if let Some(path) = &dotenv_path {
        tracing::info!(path = %path.display(), "Loaded environment file");
    }
    tracing::info!("Starting rollcall server");

    let config = ServerConfig {
        port: cli.port,
        public_dir: cli.public_dir,
        ..Default::default()
    };
    let handle = rollcall_server::start(config)
        .await
        .with_context(|| format!("failed to bind port {}", cli.port))?;

    tracing::info!(port = handle.port, "Server running on port {}", handle.port);
    tracing::info!(
        "Visit http://localhost:{} to access the attendance system",
        handle.port
    );

    shutdown_signal().await;
    handle.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
