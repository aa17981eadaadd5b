// podbar - terminal podcast player
// Loads the episode catalog, builds the playback store and hands it to the TUI

use anyhow::{Context, Result};
use clap::Parser;
use podbar::{audio::load_catalog, config::Config, player::PlayerStore, ui::App};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "podbar")]
#[command(about = "A terminal podcast player with a queue, shuffle, loop and seek")]
struct Args {
    /// Episode catalog (JSON array); overrides `catalog_path` from the config
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Directory for log files; overrides `log_dir` from the config
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Also log everything at debug level to <log_dir>/podbar-dev.log
    #[arg(long)]
    dev: bool,
}

fn build_subscriber(
    log_dir: &Path,
    dev: bool,
) -> Result<(impl tracing::Subscriber + Send + Sync + 'static, Vec<WorkerGuard>)> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    // stdout and stderr belong to the TUI, so every layer writes to a file
    let file_appender = tracing_appender::rolling::daily(log_dir, "podbar.log");
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let mut guards = vec![file_guard];

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,podbar=debug"));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_filter(filter);

    // --dev: everything at debug, in its own file so `tail -f` works next to the player
    let dev_layer = if dev {
        let dev_appender = tracing_appender::rolling::never(log_dir, "podbar-dev.log");
        let (dev_writer, dev_guard) = tracing_appender::non_blocking(dev_appender);
        guards.push(dev_guard);
        Some(
            fmt::layer()
                .with_writer(dev_writer)
                .with_ansi(false)
                .with_filter(EnvFilter::new("debug")),
        )
    } else {
        None
    };

    let subscriber = tracing_subscriber::registry().with(file_layer).with(dev_layer);
    Ok((subscriber, guards))
}

fn init_logging(log_dir: &Path, dev: bool) -> Result<Vec<WorkerGuard>> {
    let (subscriber, guards) = build_subscriber(log_dir, dev)?;
    subscriber.try_init()?;
    Ok(guards)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config - falls back to defaults if missing
    let mut config = Config::load()?;
    if let Some(catalog) = args.catalog {
        config.catalog_path = catalog;
    }
    if let Some(log_dir) = args.log_dir {
        config.log_dir = log_dir;
    }

    let _log_guard = init_logging(&config.log_dir, args.dev)?;
    info!("🎧 podbar starting up");

    let catalog = if config.catalog_path.exists() {
        load_catalog(&config.catalog_path)?
    } else {
        warn!("No episode catalog at {}, starting empty", config.catalog_path.display());
        Vec::new()
    };

    // One store per session, owned by the app from here on
    let store = PlayerStore::new();

    let mut app = App::new(&config, catalog, store)?;
    app.run().await?;

    info!("podbar shut down cleanly");
    Ok(())
}
