//! Periodic full-day snapshot poll.
//!
//! The poll is the consistency fallback behind the push channel: whatever a
//! dropped frame or missed reconnect window loses, the next tick restores.
//! Snapshot application happens inside the store, which protects members
//! with an unconfirmed local edit from being clobbered.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use timegrid_api_client::TimelineClient;

use crate::store::SharedStore;

pub async fn run_poll(
    client: TimelineClient,
    store: SharedStore,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let date = store.lock().await.date();
                match client.fetch_day(date).await {
                    Ok(snapshot) => {
                        let mut guard = store.lock().await;
                        if guard.date() != date {
                            // The operator switched days mid-fetch; this
                            // snapshot describes the wrong one.
                            debug!("discarding stale snapshot for {date}");
                            continue;
                        }
                        let members = snapshot.len();
                        guard.apply_snapshot(snapshot);
                        debug!(members, "day snapshot applied");
                    }
                    Err(e) => error!("day snapshot poll failed: {e:#}"),
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("poll loop shutting down");
                    break;
                }
            }
        }
    }
}
