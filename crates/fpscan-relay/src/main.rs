//! Fingerprint scanner relay: entry point.
//!
//! Opens the scanner, starts the capture thread, and serves live frames to
//! every connected WebSocket client until Ctrl+C.
//!
//! # Usage
//!
//! ```text
//! fpscan-relay [OPTIONS]
//!
//! Options:
//!   --config <PATH>             TOML config file
//!   --bind <IP>                 Listen address [default: 0.0.0.0]
//!   --port <PORT>               Listen port [default: 5000]
//!   --device-index <N>          Scanner to open [default: 0]
//!   --width <PX>                Frame width [default: 300]
//!   --height <PX>               Frame height [default: 400]
//!   --poll-interval-ms <MS>     Pause between acquires [default: 100]
//!   --outbound-queue <N>        Frames buffered per client [default: 16]
//!   --log-level <FILTER>        Used when RUST_LOG is unset [default: info]
//!   --simulate                  Use the built-in fake scanner
//! ```
//!
//! Every option also reads an `FPSCAN_*` environment variable (for example
//! `FPSCAN_PORT`).  Precedence: CLI flag, then environment, then the config
//! file, then the built-in default.
//!
//! # Startup and shutdown order
//!
//! 1. Configuration is resolved and validated.
//! 2. The scanner is opened on the capture thread; any failure exits here
//!    with a non-zero status, before a port is bound.
//! 3. The WebSocket server binds and accepts clients.
//! 4. Ctrl+C clears the shared `running` flag.  The accept loop exits, the
//!    capture thread finishes its current iteration, closes the device and
//!    terminates the SDK, and the process exits.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use fpscan_core::{spawn_capture, Broadcaster, CaptureConfig, CaptureHandle, ConnectionRegistry};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fpscan_relay::domain::{FileConfig, RelayConfig};
use fpscan_relay::infrastructure::run_server;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Streams live fingerprint scanner frames to WebSocket clients.
#[derive(Debug, Parser)]
#[command(
    name = "fpscan-relay",
    about = "Streams live fingerprint scanner frames to WebSocket clients",
    version
)]
struct Cli {
    /// TOML configuration file.  Flags below override its values.
    #[arg(long, env = "FPSCAN_CONFIG")]
    config: Option<PathBuf>,

    /// IP address the WebSocket server binds to.
    #[arg(long, env = "FPSCAN_BIND")]
    bind: Option<IpAddr>,

    /// TCP port the WebSocket server listens on.
    #[arg(long, env = "FPSCAN_PORT")]
    port: Option<u16>,

    /// Index of the scanner to open when several are attached.
    #[arg(long, env = "FPSCAN_DEVICE_INDEX")]
    device_index: Option<u32>,

    /// Frame width in pixels.
    #[arg(long, env = "FPSCAN_WIDTH")]
    width: Option<u32>,

    /// Frame height in pixels.
    #[arg(long, env = "FPSCAN_HEIGHT")]
    height: Option<u32>,

    /// Pause between acquire attempts, in milliseconds.
    #[arg(long, env = "FPSCAN_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Frames buffered per client before frames are dropped for it.
    #[arg(long, env = "FPSCAN_OUTBOUND_QUEUE")]
    outbound_queue: Option<usize>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "FPSCAN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Use the built-in simulated scanner instead of real hardware.
    #[arg(long, env = "FPSCAN_SIMULATE")]
    simulate: bool,
}

impl Cli {
    /// Resolves the final [`RelayConfig`] from the config file (if any) and
    /// the flags that were given.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed, or the
    /// merged configuration is invalid.
    fn into_relay_config(self) -> anyhow::Result<RelayConfig> {
        let mut file = match &self.config {
            Some(path) => FileConfig::load(path)
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => FileConfig::default(),
        };

        if let Some(bind) = self.bind {
            file.server.bind_address = bind.to_string();
        }
        if let Some(port) = self.port {
            file.server.port = port;
        }
        if let Some(queue) = self.outbound_queue {
            file.server.outbound_queue = queue;
        }
        if let Some(level) = self.log_level {
            file.server.log_level = level;
        }
        if let Some(index) = self.device_index {
            file.capture.device_index = index;
        }
        if let Some(width) = self.width {
            file.capture.width = width;
        }
        if let Some(height) = self.height {
            file.capture.height = height;
        }
        if let Some(ms) = self.poll_interval_ms {
            file.capture.poll_interval_ms = ms;
        }

        Ok(file.into_relay_config()?)
    }
}

// ── Scanner selection ─────────────────────────────────────────────────────────

/// Opens the scanner on the capture thread.
///
/// Blocks until the device is open, so call it from a blocking context.
fn start_capture(
    simulate: bool,
    config: CaptureConfig,
    broadcaster: Broadcaster,
    running: Arc<AtomicBool>,
) -> anyhow::Result<CaptureHandle> {
    if simulate {
        use fpscan_core::infrastructure::device::mock::MockScanner;

        info!("using the simulated scanner");
        let scanner = MockScanner::new().with_acquire_delay(Duration::from_millis(20));
        return Ok(spawn_capture(scanner, config, broadcaster, running)?);
    }

    #[cfg(feature = "zkfp")]
    {
        use fpscan_core::infrastructure::device::zkfp::ZkfpScanner;

        Ok(spawn_capture(ZkfpScanner::new(), config, broadcaster, running)?)
    }

    #[cfg(not(feature = "zkfp"))]
    {
        anyhow::bail!(
            "built without scanner support; rebuild with `--features zkfp` or pass --simulate"
        )
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let simulate = cli.simulate;
    let config = cli.into_relay_config()?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_thread_names(true)
        .init();

    info!(
        "fingerprint relay starting: ws={}, device={}, frame={}x{}, poll={:?}",
        config.bind_addr,
        config.capture.device_index,
        config.capture.width,
        config.capture.height,
        config.capture.poll_interval
    );

    let registry = Arc::new(ConnectionRegistry::new());
    let running = Arc::new(AtomicBool::new(true));

    // ── Scanner ───────────────────────────────────────────────────────────────
    let capture = {
        let capture_config = config.capture.clone();
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let running = Arc::clone(&running);
        tokio::task::spawn_blocking(move || {
            start_capture(simulate, capture_config, broadcaster, running)
        })
        .await
        .context("capture startup task failed")?
        .context("failed to start capture")?
    };

    // ── Ctrl+C ────────────────────────────────────────────────────────────────
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    // ── Server ────────────────────────────────────────────────────────────────
    let served = run_server(&config, Arc::clone(&registry), Arc::clone(&running)).await;

    // The device is released whether the server stopped cleanly or not.
    running.store(false, Ordering::Relaxed);
    match tokio::task::spawn_blocking(move || capture.stop()).await {
        Ok(Ok(stats)) => info!(
            "capture stopped: {} polls, {} frames, {} acquire failures, {} deliveries",
            stats.polls, stats.frames, stats.acquire_failures, stats.deliveries
        ),
        Ok(Err(_)) => error!("capture thread panicked"),
        Err(e) => error!("failed to join capture thread: {e}"),
    }

    served?;
    info!("fingerprint relay stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
