//! `iolo` Bridge
//!
//! Subscribes to a running kernel's IOPub channel and relays every
//! notification, in order, to a hub over WebSocket (or to stdout).

use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use iolo_bridge::config::DEFAULT_HUB_URL;
use iolo_bridge::exit::parse_hub_url;
use iolo_bridge::sink::{RelaySink, SinkError, StdoutSink, WebSocketSink};
use iolo_bridge::source::ZmqSource;
use iolo_bridge::{Bridge, BridgeConfig, BridgeReport, SinkConfig, StartupError};
use iolo_core::ConnectionDescriptor;
use iolo_core::runtime::{self, Platform};

#[derive(Parser, Debug)]
#[command(name = "iolo")]
#[command(version, about = "iolo - relay a Jupyter kernel's IOPub notifications to a hub")]
struct Args {
    /// Kernel connection file. A bare kernel id or file name is looked up in
    /// the Jupyter runtime directory.
    connection_file: Option<PathBuf>,

    /// Hub WebSocket endpoint
    #[arg(long, default_value = DEFAULT_HUB_URL, env = "IOLO_HUB_URL")]
    hub_url: String,

    /// Write documents to stdout as NDJSON instead of connecting to a hub.
    #[arg(long)]
    stdout: bool,

    /// Log level filter (e.g. "info", "debug", "warn").
    #[arg(long, default_value = "info", env = "IOLO_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "IOLO_LOG_JSON")]
    log_json: bool,

    /// Seconds a single hub write may take before it counts as failed.
    #[arg(long, default_value_t = 10, env = "IOLO_SEND_TIMEOUT_SECS")]
    send_timeout_secs: u64,

    /// Seconds to wait when dialing the hub.
    #[arg(long, default_value_t = 10, env = "IOLO_CONNECT_TIMEOUT_SECS")]
    connect_timeout_secs: u64,

    /// Largest document sent to the hub; bigger ones are dropped.
    #[arg(long, default_value_t = 16 * 1024 * 1024, env = "IOLO_MAX_MESSAGE_BYTES")]
    max_message_bytes: usize,

    /// Consecutive hub write failures tolerated before exiting.
    #[arg(
        long,
        default_value_t = 3,
        env = "IOLO_MAX_CONSECUTIVE_FAILURES",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_consecutive_failures: u32,
}

impl Args {
    fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            max_message_bytes: self.max_message_bytes,
            send_timeout: Duration::from_secs(self.send_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            ..SinkConfig::default()
        }
    }

    const fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            max_consecutive_failures: self.max_consecutive_failures,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    iolo_core::tracing_init::init_tracing(
        &iolo_core::tracing_init::default_filter(&args.log_level),
        args.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        stdout = args.stdout,
        "Starting iolo"
    );

    let shutdown = shutdown_signal()?;

    match start(&args, shutdown).await {
        Ok(report) => {
            let status = report.exit_status();
            info!(
                reason = ?report.reason,
                received = report.stats.received,
                forwarded = report.stats.forwarded,
                dropped_decode = report.stats.dropped_decode,
                dropped_sink = report.stats.dropped_sink,
                exit_code = status.code(),
                "iolo stopped"
            );
            Ok(status.into())
        }
        Err(e) => {
            let status = e.exit_status();
            error!(error = %e, exit_code = status.code(), "Startup failed");
            Ok(status.into())
        }
    }
}

/// Load the connection file, open both ends and relay until done.
async fn start(
    args: &Args,
    shutdown: impl Future<Output = ()>,
) -> Result<BridgeReport, StartupError> {
    let descriptor = load_descriptor(args)?;

    if args.stdout {
        relay(args, descriptor, async { Ok(StdoutSink::new()) }, shutdown).await
    } else {
        let url = parse_hub_url(&args.hub_url)?;
        info!(hub = %url, "Connecting to hub");
        let open_sink = WebSocketSink::open(&url, args.sink_config());
        relay(args, descriptor, open_sink, shutdown).await
    }
}

fn load_descriptor(args: &Args) -> Result<ConnectionDescriptor, StartupError> {
    let arg = args
        .connection_file
        .as_deref()
        .ok_or(StartupError::MissingConnectionFile)?;
    let path = runtime::resolve_connection_file(arg, &runtime::process_env(), Platform::current());
    info!(path = %path.display(), "Loading connection file");

    let descriptor = ConnectionDescriptor::parse(&path)?;
    info!(
        transport = %descriptor.transport(),
        iopub = %descriptor.iopub_address(),
        scheme = descriptor.signature_scheme(),
        "Connection file loaded"
    );
    Ok(descriptor)
}

async fn relay<K: RelaySink>(
    args: &Args,
    descriptor: ConnectionDescriptor,
    open_sink: impl Future<Output = Result<K, SinkError>>,
    shutdown: impl Future<Output = ()>,
) -> Result<BridgeReport, StartupError> {
    let iopub = descriptor.iopub_address();
    let bridge = Bridge::connect(
        descriptor,
        args.bridge_config(),
        open_sink,
        ZmqSource::open(&iopub, ""),
    )
    .await?;
    Ok(bridge.run_until(shutdown).await)
}

/// Completes on Ctrl+C, or SIGTERM on unix.
fn shutdown_signal() -> std::io::Result<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        #[cfg(unix)]
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C shutdown signal");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM shutdown signal");
            }
        }

        #[cfg(not(unix))]
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C shutdown signal"),
            Err(e) => {
                tracing::warn!(error = %e, "Ctrl+C handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    })
}
