use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulsewatch::events::{self, Flow};
use pulsewatch::{
    App, AppHandle, HistoricalDataSource, HttpSource, Settings, SyntheticSource, WsConnector,
};

#[derive(Parser, Debug)]
#[command(name = "pulsewatch")]
#[command(about = "Headless real-time telemetry acquisition core")]
struct Args {
    /// Path to a TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// WebSocket endpoint for the live stream
    #[arg(long)]
    stream_url: Option<String>,

    /// Base URL of the historical query service (synthetic data if unset)
    #[arg(long)]
    history_url: Option<String>,

    /// Historical refresh interval in seconds
    #[arg(short, long)]
    refresh: Option<u64>,

    /// Risk indicator above which a sample is a warning
    #[arg(long)]
    threshold: Option<f64>,

    /// Fetch history once, export the snapshot to a JSON file and exit
    #[arg(short, long)]
    export: Option<PathBuf>,
}

impl Args {
    fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(ref url) = self.stream_url {
            settings.stream_url = url.clone();
        }
        if let Some(ref url) = self.history_url {
            settings.history_url = Some(url.clone());
        }
        if let Some(secs) = self.refresh {
            settings.refresh_interval_secs = secs;
        }
        if let Some(threshold) = self.threshold {
            settings.warning_threshold = threshold;
        }
        settings.validate()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())
        .context("failed to load settings")?;
    let settings = args.apply(settings)?;

    let source = build_source(&settings)?;
    let connector = Arc::new(WsConnector::with_timeout(settings.connect_timeout()));
    let handle = App::new(&settings, source, connector)?.spawn();
    info!(
        stream = %settings.stream_url,
        history = handle.source_description(),
        "pulsewatch started"
    );

    // Handle export mode (non-interactive)
    if let Some(ref export_path) = args.export {
        return export_once(handle, export_path, settings.fetch_timeout()).await;
    }

    run(handle).await
}

fn build_source(settings: &Settings) -> Result<Arc<dyn HistoricalDataSource>> {
    match settings.history_url {
        Some(ref url) => {
            let source = HttpSource::new(url, settings.thresholds(), settings.fetch_timeout())
                .with_context(|| format!("failed to build HTTP source for {}", url))?;
            Ok(Arc::new(source))
        }
        None => Ok(Arc::new(SyntheticSource::new(
            settings.synthetic_warning_probability,
        ))),
    }
}

/// Print every snapshot as a JSON line and handle operator commands until
/// quit, end of input or Ctrl-C.
async fn run(handle: AppHandle) -> Result<()> {
    let mut snapshots = handle.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("core stopped unexpectedly");
                    break;
                }
                let line = serde_json::to_string(&*snapshots.borrow_and_update())?;
                println!("{}", line);
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if events::handle_line(&handle, &line) == Flow::Quit {
                        break;
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// Wait for the first historical fetch to settle, then export and exit.
async fn export_once(handle: AppHandle, path: &Path, timeout: Duration) -> Result<()> {
    let settled = handle
        .wait_for(timeout + Duration::from_secs(1), |s| {
            !s.historical_loading && (s.last_updated.is_some() || s.fetch_error.is_some())
        })
        .await;
    if settled.is_none() {
        warn!("historical fetch did not settle, exporting current state");
    }

    let result = handle
        .export_state(path)
        .with_context(|| format!("failed to export to {}", path.display()));
    handle.shutdown().await;
    result?;

    println!("Exported state to {}", path.display());
    Ok(())
}
