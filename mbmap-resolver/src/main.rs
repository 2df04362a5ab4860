//! ISRC → MBID resolver (mbmap-resolver) - Main entry point
//!
//! Builds an ISRC to MusicBrainz recording MBID map from a MusicBrainz
//! dump archive and a CSV feature list, in two streaming passes.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mbmap_common::config::load_toml_config;
use mbmap_common::events::{EventBus, ResolveEvent};
use mbmap_common::human_time::format_count;
use mbmap_resolver::config::{ConfigOverrides, ResolverConfig};
use mbmap_resolver::sink::write_summary;
use mbmap_resolver::{MemberSelector, Resolver};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for mbmap-resolver
///
/// Unset options fall back to MBMAP_* environment variables, then the
/// `[resolver]` section of the config file, then compiled defaults.
#[derive(Parser, Debug)]
#[command(name = "mbmap-resolver")]
#[command(about = "Resolve ISRCs to MusicBrainz recording MBIDs from a dump archive")]
#[command(version)]
struct Args {
    /// MusicBrainz dump archive (.tar.bz2, .tar.gz or .tar)
    #[arg(short, long)]
    archive: Option<PathBuf>,

    /// CSV file listing the ISRCs to resolve
    #[arg(short = 'k', long)]
    sought_keys: Option<PathBuf>,

    /// Output CSV path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Selector for the ISRC alias member, e.g. `contains:recording_isrc|suffix:/isrc`
    #[arg(long)]
    alias_member: Option<MemberSelector>,

    /// Selector for the recording member, e.g. `exact:mbdump/recording`
    #[arg(long)]
    canonical_member: Option<MemberSelector>,

    /// Header of the ISRC column in the sought-key CSV
    #[arg(long)]
    sought_column: Option<String>,

    /// Skip verifying both members exist before pass 1
    #[arg(long)]
    no_preflight: bool,

    /// Records between progress log lines (0 disables)
    #[arg(long)]
    progress_interval: Option<u64>,

    /// Write a JSON run summary to this path
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Config file (default: <config dir>/mbmap/config.toml)
    #[arg(short, long, env = "MBMAP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let toml_config =
        load_toml_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG overrides the config file level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting mbmap-resolver v{}", env!("CARGO_PKG_VERSION"));

    let overrides = ConfigOverrides {
        archive_path: args.archive,
        sought_keys_path: args.sought_keys,
        output_path: args.output,
        alias_member_selector: args.alias_member,
        canonical_member_selector: args.canonical_member,
        sought_column: args.sought_column,
        preflight: args.no_preflight.then_some(false),
        progress_interval: args.progress_interval,
        summary_path: args.summary,
        ..Default::default()
    };
    let config = ResolverConfig::from_sources(overrides, &toml_config)
        .context("Invalid resolver configuration")?;
    let summary_path = config.summary_path.clone();

    let event_bus = EventBus::new(1024);
    let logger = tokio::spawn(log_events(event_bus.subscribe()));

    let cancel = CancellationToken::new();
    let resolver = Resolver::new(config, event_bus).with_cancellation(cancel.clone());
    info!(run_id = %resolver.run_id(), "Resolver initialized");

    let mut task = tokio::task::spawn_blocking(move || resolver.run());
    let joined = tokio::select! {
        joined = &mut task => joined,
        _ = shutdown_signal() => {
            cancel.cancel();
            task.await
        }
    };
    let result = joined.context("Resolver task panicked")?;

    // Resolver dropped: the bus closes and the logger drains
    if let Err(e) = logger.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    let summary = result.context("Resolve run failed")?;

    if let Some(path) = summary_path {
        match write_summary(&path, &summary) {
            Ok(()) => info!("Run summary written to {}", path.display()),
            Err(e) => warn!("Failed to write run summary: {}", e),
        }
    }

    info!("{}", summary.coverage.display_string());
    info!("Output: {}", summary.output_path.display());
    Ok(())
}

/// Log resolver events until the bus closes
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<ResolveEvent>) {
    loop {
        match rx.recv().await {
            Ok(ResolveEvent::ScanProgress {
                pass, records_read, ..
            }) => {
                info!("{}: {} records read", pass, format_count(records_read));
            }
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => debug!(event = %json, "Resolve event"),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            Err(RecvError::Lagged(skipped)) => {
                warn!("Event logger lagged, {} events dropped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling run");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling run");
        },
    }
}
