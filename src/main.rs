//! MJPEG streaming server CLI application

use anyhow::{Context, Result};
use clap::Parser;
use rpi_mjpeg_streamer::camera::Capture;
use rpi_mjpeg_streamer::config::{Config, SourceKind};
use rpi_mjpeg_streamer::streaming::{FrameBuffer, PublishingSink, StreamStats};
use rpi_mjpeg_streamer::web::{self, AppState};
use rpi_mjpeg_streamer::zoom::ZoomController;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "mjpeg-streamer")]
#[command(about = "MJPEG camera streaming with digital zoom for Raspberry Pi")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to ./config.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HTTP port, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Bind address, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Stream a generated test pattern instead of a camera
    #[arg(long)]
    test_pattern: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(DEFAULT_CONFIG)
            .with_context(|| format!("Failed to load config from {}", DEFAULT_CONFIG))?,
    };
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(bind) = cli.bind.clone() {
        config.server.bind_ip = bind;
    }
    if cli.test_pattern {
        config.camera.source = SourceKind::Test;
    }
    config.validate()?;

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.level))
    };
    fmt().with_env_filter(filter).with_target(false).init();

    info!(
        listen = %config.listen_addr(),
        source = ?config.camera.source,
        resolution = %format!("{}x{}", config.camera.width, config.camera.height),
        "MJPEG streamer starting"
    );

    let frames = Arc::new(FrameBuffer::new());
    let stats = Arc::new(StreamStats::new());
    let sink = Arc::new(PublishingSink::new(frames.clone(), stats.clone()));

    let mut capture =
        Capture::new(&config.camera, sink).context("Failed to create camera pipeline")?;
    let zoom = Arc::new(ZoomController::new(capture.crop_control()));

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr()))?;

    capture.start().context("Failed to start camera")?;

    let stats_task = (config.server.stats_interval_seconds > 0)
        .then(|| spawn_stats_logger(stats.clone(), config.server.stats_interval_seconds));

    let state = AppState::new(frames, zoom, stats);
    info!("Streaming started, press Ctrl+C to stop");

    let outcome = tokio::select! {
        result = web::run_server(listener, state) => result.context("Web server failed"),
        err = capture.failed() => Err(anyhow::Error::new(err).context("Camera pipeline failed")),
        _ = shutdown_signal() => {
            info!("Shutting down");
            Ok(())
        }
    };

    if let Some(task) = stats_task {
        task.abort();
    }

    // Camera goes down on every exit path; Drop covers early returns above
    if let Err(e) = capture.stop() {
        error!(error = %e, "Failed to stop camera cleanly");
    }

    outcome
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
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

fn spawn_stats_logger(stats: Arc<StreamStats>, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let period = Duration::from_secs(interval_secs);
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;

        let mut previous = stats.snapshot();
        loop {
            ticker.tick().await;
            let current = stats.snapshot();
            let secs = period.as_secs_f64();

            info!(
                fps = %format!("{:.1}", current.calculate_fps(&previous, secs)),
                kbps = %format!("{:.0}", current.calculate_bitrate_kbps(&previous, secs)),
                clients = current.clients_active,
                total_clients = current.clients_connected,
                frames_published = current.frames_published,
                "Stats"
            );

            previous = current;
        }
    })
}
