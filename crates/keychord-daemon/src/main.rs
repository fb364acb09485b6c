//! keychord daemon
//!
//! Watches keyboards and gamepads and reports the configured chords as
//! they are pressed, tapped and released.

mod device;
mod session;
mod snapshot;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use keychord_config::Config;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use session::{ChordEvent, Session};

#[derive(Parser, Debug)]
#[command(name = "keychordd")]
#[command(about = "Chord watcher daemon for keychord")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "~/.config/keychord/config.kdl")]
    config: String,
}

fn load_config(path: &Path) -> Result<Config> {
    keychord_config::parse_config(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Expand tilde in config path
    let config_path: PathBuf = shellexpand::tilde(&args.config).into_owned().into();
    let config = load_config(&config_path)?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.global.log_level.as_filter())),
        )
        .init();

    tracing::info!("Loaded configuration from {}", config_path.display());

    let (mut session, summary) = Session::new(&config);
    tracing::info!(
        "Registered {} combination(s), {} failed",
        summary.registered,
        summary.failed
    );

    let (tx, mut rx) = mpsc::channel(256);
    let mut readers = Vec::new();
    for (info, device) in device::open_devices(&config.devices)? {
        tracing::info!(
            "Watching '{}' ({}) at {}",
            info.name,
            info.vendor_product(),
            info.path.display()
        );
        match device::spawn_reader(info, device, tx.clone()) {
            Ok(handle) => readers.push(handle),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }
    drop(tx);

    if readers.is_empty() {
        tracing::warn!("No matching input devices found");
    }

    let period = Duration::from_secs_f64(1.0 / f64::from(config.global.tick_rate));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    let started = Instant::now();

    tracing::info!("keychord daemon running at {} ticks/s", config.global.tick_rate);

    loop {
        tokio::select! {
            Some(input) = rx.recv() => {
                session.apply(input);
            }
            _ = ticker.tick() => {
                for event in session.tick(started.elapsed().as_secs_f64()) {
                    match event {
                        ChordEvent::Passed { .. } => tracing::debug!("{}", event),
                        _ => tracing::info!("{}", event),
                    }
                }
            }
            _ = hangup.recv() => {
                tracing::info!("Reloading configuration from {}", config_path.display());
                match load_config(&config_path) {
                    Ok(config) => {
                        let summary = session.reload(&config);
                        tracing::info!(
                            "Registered {} combination(s), {} failed",
                            summary.registered,
                            summary.failed
                        );
                    }
                    Err(e) => tracing::error!("{:#}, keeping the previous configuration", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    tracing::info!("Shutting down...");
    for reader in readers {
        reader.abort();
    }

    Ok(())
}
