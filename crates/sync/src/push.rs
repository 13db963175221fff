//! Reconnecting push-channel subscriber.
//!
//! The channel is best-effort: every record it delivers will also arrive via
//! the next snapshot poll, so connection failures are recovered silently with
//! exponential backoff and never surfaced to the operator. A deliberate
//! `disconnect()` is distinguished from a transient drop by a do-not-reconnect
//! flag checked before every reconnect attempt.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use timegrid_api::PushEvent;

use crate::store::SharedStore;

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Full ws(s) URL including the auth token query parameter.
    pub url: String,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl PushConfig {
    pub fn new(url: String) -> Self {
        Self {
            url,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
        }
    }
}

/// Delay before reconnect attempt `attempt` (0-based): `base × 2^attempt`,
/// capped at `max`.
pub fn backoff_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt)).min(max)
}

pub struct PushClient {
    config: PushConfig,
    store: SharedStore,
    task: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

impl PushClient {
    pub fn new(config: PushConfig, store: SharedStore) -> Self {
        Self {
            config,
            store,
            task: None,
            shutdown: None,
        }
    }

    /// Start the subscriber. Idempotent: a no-op while a subscriber task is
    /// already connecting or connected. Returns whether a task was started.
    pub fn connect(&mut self) -> bool {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return false;
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = self.config.clone();
        let store = self.store.clone();
        self.shutdown = Some(shutdown_tx);
        self.task = Some(tokio::spawn(run_push(config, store, shutdown_rx)));
        true
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Deliberate shutdown: set the do-not-reconnect flag, cancel any pending
    /// reconnect sleep, close the socket, and wait for the task to finish.
    pub async fn disconnect(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

async fn run_push(config: PushConfig, store: SharedStore, mut shutdown: watch::Receiver<bool>) {
    let mut attempt: u32 = 0;
    loop {
        if *shutdown.borrow() {
            break;
        }
        match connect_async(config.url.as_str()).await {
            Ok((socket, _)) => {
                info!("push channel connected");
                attempt = 0;
                let (mut write, mut read) = socket.split();
                loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(Message::Text(text))) => handle_frame(&store, &text).await,
                            Some(Ok(Message::Ping(payload))) => {
                                let _ = write.send(Message::Pong(payload)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                info!("push channel closed by server");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("push channel read error: {e}");
                                break;
                            }
                        },
                        _ = shutdown.changed() => {
                            if *shutdown.borrow() {
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        }
                    }
                }
            }
            Err(e) => warn!("push channel connect failed: {e}"),
        }

        if *shutdown.borrow() {
            break;
        }
        let delay = backoff_delay(config.backoff_base, config.backoff_max, attempt);
        attempt = attempt.saturating_add(1);
        debug!(attempt, "push channel reconnecting in {delay:?}");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

/// Parse and apply one frame. Malformed frames are noise, not failure.
async fn handle_frame(store: &SharedStore, text: &str) {
    match serde_json::from_str::<PushEvent>(text) {
        Ok(event) => store.lock().await.apply_event(event),
        Err(e) => debug!("ignoring malformed push frame: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{shared, TimelineStore};
    use chrono::NaiveDate;

    #[test]
    fn backoff_doubles_then_caps() {
        let base = Duration::from_secs(1);
        let max = Duration::from_secs(30);
        assert_eq!(backoff_delay(base, max, 0), Duration::from_secs(1));
        assert_eq!(backoff_delay(base, max, 1), Duration::from_secs(2));
        assert_eq!(backoff_delay(base, max, 2), Duration::from_secs(4));
        assert_eq!(backoff_delay(base, max, 4), Duration::from_secs(16));
        assert_eq!(backoff_delay(base, max, 5), Duration::from_secs(30));
        assert_eq!(backoff_delay(base, max, 20), Duration::from_secs(30));
        // Enormous attempt counts must not overflow.
        assert_eq!(backoff_delay(base, max, u32::MAX), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let store = shared(TimelineStore::new(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        ));
        handle_frame(&store, "not json").await;
        handle_frame(&store, r#"{"event": "mystery", "data": {}}"#).await;
        handle_frame(&store, r#"{"data": {"id": 1}}"#).await;
        let guard = store.lock().await;
        assert_eq!(guard.version(), 0);
        assert!(guard.board().is_empty());
    }

    #[tokio::test]
    async fn valid_frames_reach_the_store() {
        let store = shared(TimelineStore::new(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        ));
        let frame = r#"{"event": "created", "data": {
            "id": 5, "user_id": 2, "task_id": 11,
            "start_at": "2026-08-07T10:00:00.000+09:00",
            "end_at": "2026-08-07T11:00:00.000+09:00"
        }}"#;
        handle_frame(&store, frame).await;
        let guard = store.lock().await;
        assert!(guard.board().contains(5));
        assert_eq!(guard.board().owner_of(5), Some(2));
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_a_noop() {
        let store = shared(TimelineStore::new(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        ));
        let mut client = PushClient::new(PushConfig::new("ws://127.0.0.1:1/api/ws".into()), store);
        assert!(!client.is_running());
        client.disconnect().await;
        assert!(!client.is_running());
    }

    #[tokio::test]
    async fn connect_is_idempotent_and_disconnect_stops_retrying() {
        // Port 1 refuses connections, so the task lives in its backoff loop.
        let store = shared(TimelineStore::new(
            NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        ));
        let config = PushConfig {
            url: "ws://127.0.0.1:1/api/ws".into(),
            backoff_base: Duration::from_secs(60),
            backoff_max: Duration::from_secs(60),
        };
        let mut client = PushClient::new(config, store);
        assert!(client.connect());
        assert!(client.is_running());
        assert!(!client.connect());
        client.disconnect().await;
        assert!(!client.is_running());
    }
}
