use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use timegrid_api_client::TimelineClient;
use timegrid_core::timeline::{canonical_date, DayWindow};
use timegrid_sync::config::{self, SyncConfig};
use timegrid_sync::poll::run_poll;
use timegrid_sync::push::{PushClient, PushConfig};
use timegrid_sync::store::{shared, TimelineStore};

/// Headless synchronizer: keeps a day board converged against the push
/// channel and the snapshot poll.
#[derive(Debug, Parser)]
#[command(name = "timegrid-sync", version)]
struct Args {
    /// Path to a timegrid.toml config file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Visible day (canonical timezone); defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("timegrid_sync=info".parse().unwrap())
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("sync fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let cfg: SyncConfig = config::load_config(args.config.as_deref())?;
    let date = args.date.unwrap_or_else(|| canonical_date(Utc::now()));
    // Fails fast on inverted window hours before any task starts.
    let window = DayWindow::new(date, cfg.board.start_hour, cfg.board.end_hour)?;
    info!(
        %date,
        start_hour = window.start_hour,
        end_hour = window.end_hour,
        server = %cfg.server.url,
        "timegrid-sync starting"
    );

    let mut client = TimelineClient::new(&cfg.server.url, Duration::from_secs(30))?;
    client.set_auth(cfg.server.token.clone());

    let store = shared(TimelineStore::new(date));

    let push_config = PushConfig {
        url: client.push_url()?,
        backoff_base: Duration::from_millis(cfg.sync.push_backoff_base_ms),
        backoff_max: Duration::from_millis(cfg.sync.push_backoff_max_ms),
    };
    let mut push = PushClient::new(push_config, store.clone());
    push.connect();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll_handle = tokio::spawn(run_poll(
        client,
        store.clone(),
        Duration::from_secs(cfg.sync.poll_interval_secs),
        shutdown_rx,
    ));

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested");

    let _ = shutdown_tx.send(true);
    push.disconnect().await;
    let _ = poll_handle.await;

    info!("timegrid-sync stopped");
    Ok(())
}
